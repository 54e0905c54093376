//! Teaser CLI: lay out, composite and upload image grids.
//!
//! Usage:
//!   teaser layout [OPTIONS]                  Print each cell's bounding box
//!   teaser compose [-o <FILE>] <SOURCES>...  Composite sources into a file
//!   teaser upload <URL> <SOURCES>...         Composite and PUT to a URL

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use teaser_common::config::AppConfig;

mod commands;

use commands::GridArgs;

#[derive(Parser)]
#[command(
    name = "teaser",
    about = "Composite images onto a grid and publish the result",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the bounding box of every cell
    Layout {
        #[command(flatten)]
        grid: GridArgs,
    },

    /// Composite sources into an image file
    Compose {
        #[command(flatten)]
        grid: GridArgs,

        /// Output file path [default: teaser.<format extension>]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Image sources in cell order (paths, file://, http:// or https:// URLs)
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Composite sources and PUT the encoded image to a URL
    Upload {
        #[command(flatten)]
        grid: GridArgs,

        /// Destination URL
        url: String,

        /// Image sources in cell order (paths, file://, http:// or https:// URLs)
        #[arg(required = true)]
        sources: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    teaser_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Layout { grid } => commands::layout::run(&config, grid),
        Commands::Compose {
            grid,
            output,
            sources,
        } => commands::compose::run(&config, grid, output, sources).await,
        Commands::Upload { grid, url, sources } => {
            commands::upload::run(&config, grid, url, sources).await
        }
    }
}
