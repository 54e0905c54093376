//! Print the cell layout for a grid.

use teaser_common::config::AppConfig;

use super::{build_compositor, GridArgs};

pub fn run(config: &AppConfig, grid: GridArgs) -> anyhow::Result<()> {
    let compositor = build_compositor(config, &grid, &[])?;
    let (width, height) = grid.surface_size(config);

    println!(
        "Grid {}x{} on {width}x{height} surface",
        compositor.columns(),
        compositor.rows()
    );
    for index in 0..compositor.regions().len() {
        let rect = compositor.bounding_box(index)?;
        println!(
            "  cell {index:>3}: left={:.2} top={:.2} width={:.2} height={:.2}",
            rect.left, rect.top, rect.width, rect.height
        );
    }
    Ok(())
}
