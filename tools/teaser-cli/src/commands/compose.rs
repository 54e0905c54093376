//! Composite sources into an image file.

use std::path::PathBuf;

use anyhow::Context;
use teaser_common::config::AppConfig;
use teaser_grid_model::format::OutputFormat;

use super::{build_compositor, settle_sources, GridArgs};

pub async fn run(
    config: &AppConfig,
    grid: GridArgs,
    output: Option<PathBuf>,
    sources: Vec<String>,
) -> anyhow::Result<()> {
    let mut compositor = build_compositor(config, &grid, &sources)?;
    let output = output.unwrap_or_else(|| default_output(compositor.output_format()));
    println!(
        "Compositing {} source(s) onto a {} grid",
        sources.len(),
        compositor.grid()
    );

    settle_sources(&mut compositor).await;
    let encoded = compositor.export()?;
    tokio::fs::write(&output, &encoded.bytes)
        .await
        .with_context(|| format!("cannot write {}", output.display()))?;

    tracing::info!(
        output = %output.display(),
        format = encoded.mime_type(),
        bytes = encoded.len(),
        "Teaser written"
    );
    println!("  Output: {} ({}, {} bytes)", output.display(), encoded.mime_type(), encoded.len());
    Ok(())
}

/// `teaser.<ext>` in the working directory.
fn default_output(format: OutputFormat) -> PathBuf {
    PathBuf::from(format!("teaser.{}", format.extension()))
}
