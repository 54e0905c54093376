//! Destination-rectangle binding over a raster surface.

use image::{Rgba, RgbaImage};

use teaser_common::error::{TeaserError, TeaserResult};
use teaser_grid_model::geometry::Rect;

use crate::surface::RasterSurface;

/// Binds a surface to one destination rectangle at a time.
///
/// Regions never see the surface directly; they paint "into whatever is
/// bound", which is what lets the compositor rebind a fresh context per cell.
pub struct DrawContext<'a, S: RasterSurface + ?Sized> {
    surface: &'a mut S,
    bound: Rect,
    background: Rgba<u8>,
}

impl<'a, S: RasterSurface + ?Sized> DrawContext<'a, S> {
    /// A context with an empty rectangle bound at the origin.
    pub fn new(surface: &'a mut S, background: Rgba<u8>) -> Self {
        Self {
            surface,
            bound: Rect::default(),
            background,
        }
    }

    /// Set the destination for subsequent draw calls.
    pub fn bind(&mut self, rect: Rect) -> TeaserResult<()> {
        if !rect.is_valid() {
            return Err(TeaserError::invalid_geometry(format!(
                "cannot bind {}x{} rectangle",
                rect.width, rect.height
            )));
        }
        self.bound = rect;
        Ok(())
    }

    pub fn bound(&self) -> Rect {
        self.bound
    }

    /// Paint `image` stretched to fill the bound rectangle.
    pub fn draw_image(&mut self, image: &RgbaImage) {
        self.surface.draw_image(image, self.bound);
    }

    /// Paint `image` stretched to `width` x `height`, anchored at the bound
    /// rectangle's top-left corner.
    pub fn draw_image_sized(&mut self, image: &RgbaImage, width: f64, height: f64) {
        let dest = Rect::new(self.bound.left, self.bound.top, width, height);
        self.surface.draw_image(image, dest);
    }

    /// Fill the bound rectangle with the background colour.
    pub fn clear(&mut self) {
        self.surface.fill_rect(self.bound, self.background);
    }
}
