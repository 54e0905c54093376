//! Cell rectangles and the grid tiling function.
//!
//! Rectangles are in surface pixel units but kept as `f64`: a 100px wide
//! surface split into 3 columns gives cells 33.333.. wide. Rasterization
//! snaps edges with [`Rect::pixel_bounds`] so neighbouring cells share an
//! edge instead of leaving a seam.

use serde::{Deserialize, Serialize};

use teaser_common::error::{TeaserError, TeaserResult};

use crate::dimensions::GridDimensions;

/// A destination rectangle on the raster surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin covering `width` x `height`.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Whether the rectangle has a usable (non-negative, finite) size.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }

    /// Area shared with `other` (0.0 when disjoint or only touching).
    pub fn intersection_area(&self, other: &Rect) -> f64 {
        let w = self.right().min(other.right()) - self.left.max(other.left);
        let h = self.bottom().min(other.bottom()) - self.top.max(other.top);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }

    /// Snap to whole pixels as `(x0, y0, x1, y1)`, clamped to the surface.
    ///
    /// Edges are rounded independently, so two rectangles sharing an edge
    /// in `f64` share the same pixel column/row after snapping.
    pub fn pixel_bounds(&self, surface_width: u32, surface_height: u32) -> (u32, u32, u32, u32) {
        let snap = |v: f64, max: u32| -> u32 { v.round().clamp(0.0, max as f64) as u32 };
        let x0 = snap(self.left, surface_width);
        let y0 = snap(self.top, surface_height);
        let x1 = snap(self.right(), surface_width).max(x0);
        let y1 = snap(self.bottom(), surface_height).max(y0);
        (x0, y0, x1, y1)
    }
}

/// Bounding box of cell `index` in a grid laid out row-major over a
/// `surface_width` x `surface_height` surface.
pub fn cell_rect(
    index: usize,
    grid: GridDimensions,
    surface_width: f64,
    surface_height: f64,
) -> TeaserResult<Rect> {
    let len = grid.cell_count();
    if index >= len {
        return Err(TeaserError::IndexOutOfRange { index, len });
    }

    let columns = grid.columns() as usize;
    let row = index / columns;
    let col = index % columns;
    let cell_width = surface_width / grid.columns() as f64;
    let cell_height = surface_height / grid.rows() as f64;

    Ok(Rect {
        left: cell_width * col as f64,
        top: cell_height * row as f64,
        width: cell_width,
        height: cell_height,
    })
}
