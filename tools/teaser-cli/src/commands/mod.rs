pub mod compose;
pub mod layout;
pub mod upload;

use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use image::Rgba;

use teaser_common::config::AppConfig;
use teaser_compositor::{GridCompositor, HostFetcher, HttpTransport, ImageSurface, LoadState};
use teaser_grid_model::attributes::{AttributeChange, TeaserAttributes};

/// Grid and surface options shared by every subcommand. Anything left
/// unset falls back to the `teaser` section of the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct GridArgs {
    /// Grid shape as columns and rows, e.g. "3,2" or "3x2"
    #[arg(short, long)]
    pub dimensions: Option<String>,

    /// Output format: jpg, jpeg, png or webp
    #[arg(short, long)]
    pub format: Option<String>,

    /// Output quality in [0, 1]
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Surface width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Surface height in pixels
    #[arg(long)]
    pub height: Option<u32>,
}

impl GridArgs {
    /// Config defaults with the command-line overrides applied on top.
    pub fn attributes(&self, config: &AppConfig) -> anyhow::Result<TeaserAttributes> {
        let mut attributes = TeaserAttributes::from_defaults(&config.teaser)
            .context("invalid teaser defaults in config")?;

        let overrides = [
            ("dimensions", self.dimensions.as_deref()),
            ("output-format", self.format.as_deref()),
            ("output-quality", self.quality.as_deref()),
        ];
        for (name, value) in overrides {
            let Some(value) = value else { continue };
            if let Some(change) = AttributeChange::parse(name, value)
                .with_context(|| format!("invalid --{} {value:?}", flag_name(name)))?
            {
                attributes.apply(change);
            }
        }
        Ok(attributes)
    }

    pub fn surface_size(&self, config: &AppConfig) -> (u32, u32) {
        (
            self.width.unwrap_or(config.teaser.width),
            self.height.unwrap_or(config.teaser.height),
        )
    }
}

fn flag_name(attribute: &str) -> &str {
    attribute.strip_prefix("output-").unwrap_or(attribute)
}

/// Build a compositor over a fresh pixel surface and start loading
/// `sources` into cells 0, 1, 2, ...
pub fn build_compositor(
    config: &AppConfig,
    grid: &GridArgs,
    sources: &[String],
) -> anyhow::Result<GridCompositor<ImageSurface>> {
    let attributes = grid.attributes(config)?;
    let (width, height) = grid.surface_size(config);
    anyhow::ensure!(width > 0 && height > 0, "surface must be at least 1x1, got {width}x{height}");

    let capacity = attributes.dimensions.cell_count();
    anyhow::ensure!(
        sources.len() <= capacity,
        "{} sources given but a {} grid only has {capacity} cells",
        sources.len(),
        attributes.dimensions
    );

    let background = Rgba(config.teaser.background);
    let fetcher = HostFetcher::new(HttpTransport::from_config(&config.upload)?);
    let mut compositor = GridCompositor::with_attributes(
        ImageSurface::new(width, height, background),
        Arc::new(fetcher),
        attributes,
    );
    compositor.set_background(background);

    for (index, source) in sources.iter().enumerate() {
        compositor
            .set_source(index, source.as_str())
            .with_context(|| format!("cannot load {source}"))?;
    }
    Ok(compositor)
}

/// Wait for every source and report the ones that failed.
pub async fn settle_sources(compositor: &mut GridCompositor<ImageSurface>) {
    compositor.settle().await;
    for (index, region) in compositor.regions().iter().enumerate() {
        if let LoadState::Failed(reason) = region.state() {
            eprintln!("  cell {index}: {reason}");
        }
    }
}
