//! Teaser Grid Model
//!
//! Value types shared by the compositor and its callers:
//! - **Geometry:** cell rectangles and the row-major tiling function
//! - **Dimensions:** the validated `columns x rows` grid shape and its parser
//! - **Format:** output encoding and quality
//! - **Attributes:** declarative name/value settings parsed into the above
//!
//! Everything here is pure; no surface, image, or network access.

pub mod attributes;
pub mod dimensions;
pub mod format;
pub mod geometry;

pub use attributes::*;
pub use dimensions::*;
pub use format::*;
pub use geometry::*;
