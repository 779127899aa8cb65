mod cli;
mod config;
mod constants;
mod error;
mod models;
mod server;
mod services;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if let Err(e) = cli::run().await {
        tracing::error!("fatal: {e}");
        std::process::exit(1);
    }
}
