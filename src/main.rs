use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use retinex_batch::{ensure_output_dir, BatchRunner, Config, RestoreOptions};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::parse();

    ensure!(
        config.weights.exists(),
        "Weights file does not exist: {}",
        config.weights.display()
    );
    ensure!(
        config.input_folder.is_dir(),
        "Input directory does not exist: {}",
        config.input_folder.display()
    );

    ensure_output_dir(&config.output_folder)?;

    let options = RestoreOptions::load(config.opt.as_deref()).with_context(|| match &config.opt {
        Some(path) => format!("Failed to load options: {}", path.display()),
        None => "Failed to build default options".to_string(),
    })?;
    if let Some(name) = &options.name {
        info!("Options: {name}");
    }

    let runner = BatchRunner::with_onnx_model(&config, &options)
        .with_context(|| format!("Failed to load model: {}", config.weights.display()))?;

    let summary = runner.run().context("Batch processing aborted")?;
    info!(
        "Done: {} image(s) written to {}",
        summary.written.len(),
        config.output_folder.display()
    );

    Ok(())
}
