//! Main entry point for covchart.

use anyhow::{Context, Result};
use covchart::Pipeline;
use covchart_common::init_logging;
use covchart_config::ConfigLoader;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let (config, path) = ConfigLoader::load().context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!("Starting covchart v{}", env!("CARGO_PKG_VERSION"));
    match &path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }
    info!(
        "Charting {} metrics into {}",
        config.metrics.len(),
        config.output.dir.display()
    );

    let pipeline = Pipeline::from_config(config)?;
    let summary = pipeline.run().await.context("Chart run failed")?;

    info!("Done, {} images written", summary.images.len());
    Ok(())
}
