// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use villa_api_client::models::RegistrationRequest;
use villa_api_client::{ApiClient, ClientConfig, FileTokenStore, SessionScope};

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(execute(args))
}

async fn execute(args: Cli) -> Result<()> {
    let store = match &args.session_file {
        Some(path) => FileTokenStore::new(path),
        None => FileTokenStore::default_location(),
    };
    let session = Arc::new(SessionScope::new(Arc::new(store)));
    let client = ApiClient::new(&ClientConfig::new(&args.api_url), session.clone())?;

    match args.command {
        Commands::Register {
            user_name,
            name,
            password,
            role,
        } => {
            let user = client
                .register(&RegistrationRequest {
                    name: name.unwrap_or_else(|| user_name.clone()),
                    user_name,
                    password,
                    role,
                })
                .await?;
            println!("registered {} ({})", user.user_name, user.role);
        }
        Commands::Login {
            user_name,
            password,
        } => {
            let user = client.login(&user_name, &password).await?;
            println!("signed in as {} ({})", user.name, user.role);
        }
        Commands::Whoami => {
            let user = client.me().await?;
            println!("{} ({})", user.name, user.role);
        }
        Commands::Status => match session.user()? {
            Some(user) => println!("{} ({})", user.name, user.role),
            None => println!("Not signed in"),
        },
        Commands::Refresh => {
            let user = client.refresh().await?;
            println!("session refreshed for {}", user.name);
        }
        Commands::Logout => {
            client.logout().await?;
            println!("signed out");
        }
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
