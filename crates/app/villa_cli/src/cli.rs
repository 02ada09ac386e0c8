use std::path::PathBuf;

use clap::{Parser, Subcommand};
use villa_api_client::client::DEFAULT_BASE_URL;

#[derive(Parser, Debug)]
#[command(name = "villa", version, about = "Magic Villa command-line client")]
pub struct Cli {
    /// API server origin.
    #[arg(long, global = true, env = "VILLA_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Where the session is stored. Defaults to the platform data dir.
    #[arg(long, global = true, env = "VILLA_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account.
    Register {
        user_name: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, env = "VILLA_PASSWORD")]
        password: String,
        /// Role to request (defaults to customer).
        #[arg(long)]
        role: Option<String>,
    },
    /// Sign in and store the session.
    Login {
        user_name: String,
        #[arg(long, env = "VILLA_PASSWORD")]
        password: String,
    },
    /// Ask the server who the stored session belongs to.
    Whoami,
    /// Show the stored session without contacting the server.
    Status,
    /// Rotate the stored token pair now.
    Refresh,
    /// Revoke the stored session and forget it.
    Logout,
    /// Print version information.
    Version,
}
