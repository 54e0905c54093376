//! A single grid cell: one image source and how to paint it.

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

use crate::context::DrawContext;
use crate::surface::RasterSurface;

/// Stable identity of a region for its whole lifetime, independent of its
/// current position in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(u64);

impl RegionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region-{}", self.0)
    }
}

/// Callback fired once a region's current source has loaded.
pub type LoadHandler = Arc<dyn Fn(RegionId) + Send + Sync>;

/// Load progress of the current source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// No source assigned yet.
    Empty,
    /// Source assigned, fetch/decode in flight.
    Pending,
    Loaded,
    Failed(String),
}

pub struct Region {
    id: RegionId,
    source: Option<String>,
    generation: u64,
    state: LoadState,
    image: Option<RgbaImage>,
    handler: Option<LoadHandler>,
}

impl Region {
    pub fn new(id: RegionId) -> Self {
        Self {
            id,
            source: None,
            generation: 0,
            state: LoadState::Empty,
            image: None,
            handler: None,
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Incremented on every [`Region::set_source`]; completions carry the
    /// generation they were started for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    /// Not waiting on a load.
    pub fn is_settled(&self) -> bool {
        self.state != LoadState::Pending
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// Assign a new source. The previous image is dropped and the region
    /// reads as not loaded until the matching completion arrives.
    pub fn set_source(&mut self, source: impl Into<String>) -> u64 {
        self.source = Some(source.into());
        self.generation += 1;
        self.state = LoadState::Pending;
        self.image = None;
        self.generation
    }

    /// Attach the load callback, replacing (and returning) any previous one.
    pub fn register_load_handler(&mut self, handler: LoadHandler) -> Option<LoadHandler> {
        self.handler.replace(handler)
    }

    pub fn unregister_load_handler(&mut self) -> Option<LoadHandler> {
        self.handler.take()
    }

    pub fn has_load_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Record the outcome of loading source `generation`.
    ///
    /// Returns `false` and changes nothing when the completion is for a
    /// superseded source or the current one already completed. A successful
    /// load fires the registered handler exactly once.
    pub fn complete_load(&mut self, generation: u64, result: Result<RgbaImage, String>) -> bool {
        if generation != self.generation || self.state != LoadState::Pending {
            tracing::trace!(
                region = %self.id,
                generation,
                current = self.generation,
                "Ignoring stale load completion"
            );
            return false;
        }

        match result {
            Ok(image) => {
                self.image = Some(image);
                self.state = LoadState::Loaded;
                if let Some(handler) = &self.handler {
                    handler(self.id);
                }
            }
            Err(message) => {
                self.state = LoadState::Failed(message);
            }
        }
        true
    }

    /// Paint into the context's bound rectangle, scaled to `width` x `height`.
    /// Until the source has loaded the cell is cleared to the background
    /// instead.
    pub fn draw<S: RasterSurface + ?Sized>(
        &self,
        ctx: &mut DrawContext<'_, S>,
        width: f64,
        height: f64,
    ) {
        ctx.clear();
        if let (LoadState::Loaded, Some(image)) = (&self.state, &self.image) {
            ctx.draw_image_sized(image, width, height);
        }
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("generation", &self.generation)
            .field("state", &self.state)
            .field("has_load_handler", &self.handler.is_some())
            .finish()
    }
}
