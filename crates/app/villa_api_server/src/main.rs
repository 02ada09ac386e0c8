//! Magic Villa API server binary.

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use villa_api::AppState;
use villa_api::config::ApiConfig;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "villa_api_server", about = "Magic Villa API server")]
struct Args {
    /// Port to listen on. Overrides the port of `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep users and sessions in process memory instead of PostgreSQL.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(
                    "info,villa_api=debug,villa_core=debug",
                )),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(url) = args.database_url {
        config.pg_connection_url = url;
    }
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "127.0.0.1".into());
        config.bind_addr = format!("{host}:{port}");
    }
    info!(auth = ?config.auth, "loaded configuration");

    let state = if args.in_memory {
        warn!("in-memory mode: users and sessions are lost on exit");
        AppState::in_memory(config.clone())
    } else {
        info!(
            max_connections = args.max_connections,
            "configuring connection pool"
        );
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&config.pg_connection_url)
            .await?;

        info!("running database migrations");
        villa_api::migrate(&pool).await?;

        AppState::postgres(config.clone(), pool)
    };

    let app = villa_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
