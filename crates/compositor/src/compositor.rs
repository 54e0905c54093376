//! Grid compositor: owns the region collection and its geometry, and
//! drives full and single-cell redraws onto the raster surface.
//!
//! All mutation happens through `&mut self` on one task. Source loads run
//! as tokio tasks and report back through a queue; the compositor applies
//! them in [`GridCompositor::process_pending_loads`], [`GridCompositor::next_load`]
//! or [`GridCompositor::settle`], so a completion never interleaves with a
//! resize or a redraw in progress.

use std::sync::Arc;

use image::Rgba;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use teaser_common::error::{TeaserError, TeaserResult};
use teaser_grid_model::attributes::{AttributeChange, TeaserAttributes};
use teaser_grid_model::dimensions::GridDimensions;
use teaser_grid_model::format::{OutputFormat, OutputQuality};
use teaser_grid_model::geometry::{cell_rect, Rect};

use crate::context::DrawContext;
use crate::loader::{spawn_load, LoadCompletion, SourceFetcher};
use crate::region::{LoadHandler, Region, RegionId};
use crate::surface::RasterSurface;

pub const DEFAULT_BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

pub struct GridCompositor<S: RasterSurface> {
    surface: S,
    grid: GridDimensions,
    /// Row-major. Ids are handed out increasing and only the suffix is ever
    /// removed, so this stays sorted by id.
    regions: Vec<Region>,
    next_region_id: u64,
    output_format: OutputFormat,
    output_quality: OutputQuality,
    background: Rgba<u8>,
    fetcher: Arc<dyn SourceFetcher>,
    completions_tx: UnboundedSender<LoadCompletion>,
    completions_rx: UnboundedReceiver<LoadCompletion>,
    redraw_tx: UnboundedSender<RegionId>,
    redraw_rx: UnboundedReceiver<RegionId>,
}

impl<S: RasterSurface> GridCompositor<S> {
    /// Attach to `surface` with the default 2x2 jpeg/1.0 configuration.
    pub fn new(surface: S, fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self::with_attributes(surface, fetcher, TeaserAttributes::default())
    }

    pub fn with_attributes(
        surface: S,
        fetcher: Arc<dyn SourceFetcher>,
        attributes: TeaserAttributes,
    ) -> Self {
        let (completions_tx, completions_rx) = unbounded_channel();
        let (redraw_tx, redraw_rx) = unbounded_channel();
        let mut compositor = Self {
            surface,
            grid: attributes.dimensions,
            regions: Vec::new(),
            next_region_id: 0,
            output_format: attributes.output_format,
            output_quality: attributes.output_quality,
            background: DEFAULT_BACKGROUND,
            fetcher,
            completions_tx,
            completions_rx,
            redraw_tx,
            redraw_rx,
        };
        compositor.apply_dimensions(attributes.dimensions);
        tracing::debug!(
            dimensions = %attributes.dimensions,
            format = %attributes.output_format,
            quality = %attributes.output_quality,
            width = compositor.surface.width(),
            height = compositor.surface.height(),
            "Compositor attached"
        );
        compositor
    }

    // --- surface -----------------------------------------------------------

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct access for painting outside the grid. The next redraw
    /// overwrites whatever lands inside a cell.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn background(&self) -> Rgba<u8> {
        self.background
    }

    /// Change the placeholder colour and repaint.
    pub fn set_background(&mut self, color: Rgba<u8>) {
        self.background = color;
        self.redraw();
    }

    // --- geometry ----------------------------------------------------------

    /// `[columns, rows]`.
    pub fn dimensions(&self) -> [u32; 2] {
        [self.columns(), self.rows()]
    }

    pub fn grid(&self) -> GridDimensions {
        self.grid
    }

    pub fn columns(&self) -> u32 {
        self.grid.columns()
    }

    pub fn rows(&self) -> u32 {
        (self.regions.len() / self.grid.columns() as usize) as u32
    }

    /// Resize the grid from a textual (`"3x2"`) or structured (`[3, 2]`,
    /// `(3, 2)`) description. On error nothing changes.
    pub fn set_dimensions<D>(&mut self, dimensions: D) -> TeaserResult<()>
    where
        D: TryInto<GridDimensions, Error = TeaserError>,
    {
        let grid = dimensions.try_into()?;
        self.apply_dimensions(grid);
        Ok(())
    }

    /// Resize to an already validated grid.
    ///
    /// Regions at indices below the new cell count are kept in place.
    /// New cells get fresh regions wired to redraw themselves on load;
    /// surplus regions are unregistered and dropped. Ends with a full redraw.
    pub fn apply_dimensions(&mut self, grid: GridDimensions) {
        let previous = self.regions.len();
        let wanted = grid.cell_count();

        self.grid = grid;
        while self.regions.len() < wanted {
            let region = self.new_region();
            self.regions.push(region);
        }
        if self.regions.len() > wanted {
            for mut region in self.regions.drain(wanted..) {
                region.unregister_load_handler();
                tracing::trace!(region = %region.id(), "Region discarded");
            }
        }
        debug_assert_eq!(self.regions.len() % grid.columns() as usize, 0);

        tracing::debug!(
            dimensions = %grid,
            previous,
            regions = self.regions.len(),
            "Grid resized"
        );
        self.redraw();
    }

    fn new_region(&mut self) -> Region {
        let id = RegionId::new(self.next_region_id);
        self.next_region_id += 1;

        let mut region = Region::new(id);
        let redraw = self.redraw_tx.clone();
        let handler: LoadHandler = Arc::new(move |loaded| {
            // Receiver lives as long as the compositor.
            let _ = redraw.send(loaded);
        });
        region.register_load_handler(handler);
        region
    }

    /// Rectangle occupied by cell `index`.
    pub fn bounding_box(&self, index: usize) -> TeaserResult<Rect> {
        if index >= self.regions.len() {
            return Err(TeaserError::IndexOutOfRange {
                index,
                len: self.regions.len(),
            });
        }
        cell_rect(
            index,
            self.grid,
            self.surface.width() as f64,
            self.surface.height() as f64,
        )
    }

    // --- regions -----------------------------------------------------------

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, index: usize) -> TeaserResult<&Region> {
        self.regions.get(index).ok_or(TeaserError::IndexOutOfRange {
            index,
            len: self.regions.len(),
        })
    }

    /// Current index of a region, if it is still part of the grid.
    pub fn region_index(&self, id: RegionId) -> Option<usize> {
        self.regions.binary_search_by_key(&id, Region::id).ok()
    }

    /// Point cell `index` at a new source and start loading it. The cell
    /// shows the background until the load completes.
    pub fn set_source(&mut self, index: usize, source: impl Into<String>) -> TeaserResult<RegionId> {
        let source = source.into();
        let len = self.regions.len();
        let region = self
            .regions
            .get_mut(index)
            .ok_or(TeaserError::IndexOutOfRange { index, len })?;

        let generation = region.set_source(source.clone());
        let id = region.id();
        tracing::debug!(index, region = %id, generation, source = %source, "Source assigned");

        if let Err(e) = spawn_load(
            Arc::clone(&self.fetcher),
            self.completions_tx.clone(),
            id,
            generation,
            source,
        ) {
            self.regions[index].complete_load(generation, Err(e.to_string()));
            return Err(e);
        }
        self.redraw_cell(index)?;
        Ok(id)
    }

    // --- output settings ---------------------------------------------------

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Set the format from a key such as `"PNG"` or `"jpg"`.
    pub fn set_output_format(&mut self, key: &str) -> TeaserResult<()> {
        self.output_format = OutputFormat::from_key(key)?;
        Ok(())
    }

    pub fn output_quality(&self) -> OutputQuality {
        self.output_quality
    }

    /// Set the quality from a number or numeric string.
    pub fn set_output_quality<Q>(&mut self, quality: Q) -> TeaserResult<()>
    where
        Q: TryInto<OutputQuality, Error = TeaserError>,
    {
        self.output_quality = quality.try_into()?;
        Ok(())
    }

    /// Apply one declarative setting by name. Unknown names are ignored.
    pub fn set_attribute(&mut self, name: &str, value: &str) -> TeaserResult<()> {
        if let Some(change) = AttributeChange::parse(name, value)? {
            self.apply_attribute(change);
        }
        Ok(())
    }

    pub fn apply_attribute(&mut self, change: AttributeChange) {
        match change {
            AttributeChange::Dimensions(grid) => self.apply_dimensions(grid),
            AttributeChange::OutputFormat(format) => self.output_format = format,
            AttributeChange::OutputQuality(quality) => self.output_quality = quality,
        }
    }

    pub fn attributes(&self) -> TeaserAttributes {
        TeaserAttributes {
            dimensions: self.grid,
            output_format: self.output_format,
            output_quality: self.output_quality,
        }
    }

    // --- drawing -----------------------------------------------------------

    /// Repaint every cell, in index order.
    pub fn redraw(&mut self) {
        for index in 0..self.regions.len() {
            if let Err(e) = self.paint_cell(index) {
                tracing::error!(index, error = %e, "Failed to paint cell");
            }
        }
    }

    /// Repaint a single cell.
    pub fn redraw_cell(&mut self, index: usize) -> TeaserResult<()> {
        self.paint_cell(index)
    }

    fn paint_cell(&mut self, index: usize) -> TeaserResult<()> {
        let rect = self.bounding_box(index)?;
        let region = &self.regions[index];
        let mut ctx = DrawContext::new(&mut self.surface, self.background);
        ctx.bind(rect)?;
        region.draw(&mut ctx, rect.width, rect.height);
        Ok(())
    }

    // --- load processing ---------------------------------------------------

    /// Regions still waiting on their source.
    pub fn pending_loads(&self) -> usize {
        self.regions.iter().filter(|r| !r.is_settled()).count()
    }

    /// No live region is waiting on a load.
    pub fn is_settled(&self) -> bool {
        self.regions.iter().all(Region::is_settled)
    }

    /// Apply every completion that has already arrived without waiting.
    /// Returns the number of cells repainted.
    pub fn process_pending_loads(&mut self) -> usize {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply_completion(completion);
        }
        self.drain_redraws()
    }

    /// Wait for the next completion and apply it. Returns the number of
    /// cells repainted (0 when the completion was stale or failed).
    pub async fn next_load(&mut self) -> usize {
        match self.completions_rx.recv().await {
            Some(completion) => {
                self.apply_completion(completion);
                self.drain_redraws()
            }
            None => 0,
        }
    }

    /// Wait until every live region has finished loading or failed.
    pub async fn settle(&mut self) {
        self.process_pending_loads();
        while !self.is_settled() {
            self.next_load().await;
        }
    }

    fn apply_completion(&mut self, completion: LoadCompletion) {
        let LoadCompletion {
            region,
            generation,
            result,
        } = completion;

        let Some(index) = self.region_index(region) else {
            tracing::debug!(%region, generation, "Dropping load for discarded region");
            return;
        };
        if let Err(e) = &result {
            tracing::warn!(index, %region, error = %e, "Cell left empty");
        }
        self.regions[index].complete_load(generation, result);
    }

    /// Repaint cells whose load handler fired, looking each one up by
    /// identity so a cell that moved or vanished is handled correctly.
    fn drain_redraws(&mut self) -> usize {
        let mut painted = 0;
        while let Ok(id) = self.redraw_rx.try_recv() {
            match self.region_index(id) {
                Some(index) => match self.redraw_cell(index) {
                    Ok(()) => painted += 1,
                    Err(e) => tracing::error!(index, region = %id, error = %e, "Failed to repaint cell"),
                },
                None => tracing::debug!(region = %id, "Skipping redraw for discarded region"),
            }
        }
        painted
    }
}

impl<S: RasterSurface> std::fmt::Debug for GridCompositor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridCompositor")
            .field("grid", &self.grid)
            .field("regions", &self.regions.len())
            .field("output_format", &self.output_format)
            .field("output_quality", &self.output_quality)
            .field("fetcher", &self.fetcher.name())
            .finish()
    }
}
