//! Bank core server binary

use bank_core::{Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting bank core server");

    // Environment overrides on top of defaults
    let config = Config::from_env()?;

    let ledger = Ledger::open(config).await?;
    tracing::info!("Ledger opened successfully");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down bank core server");
    ledger.shutdown().await?;
    Ok(())
}
