//! Composite sources and PUT the result.

use teaser_common::config::AppConfig;
use teaser_compositor::HttpTransport;

use super::{build_compositor, settle_sources, GridArgs};

pub async fn run(
    config: &AppConfig,
    grid: GridArgs,
    url: String,
    sources: Vec<String>,
) -> anyhow::Result<()> {
    let mut compositor = build_compositor(config, &grid, &sources)?;
    let transport = HttpTransport::from_config(&config.upload)?;

    println!("Uploading {} grid to {url}", compositor.grid());
    settle_sources(&mut compositor).await;
    match compositor.save(&url, &transport).await {
        Ok(status) => {
            println!("  Upload complete ({status})");
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("Upload failed: {e}")),
    }
}
