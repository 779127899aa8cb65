use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::server;

#[derive(Parser)]
#[command(name = "stockpulse")]
#[command(about = "Stock price and likes service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the server
    Serve {
        /// Listen port (overrides the PORT environment variable)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let mut config = Config::from_env()?;
            if let Some(port) = port {
                config.port = port;
            }
            server::serve(config).await
        }
    }
}
