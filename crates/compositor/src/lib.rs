//! Teaser compositor
//!
//! Lays a set of image sources out on a uniform grid over a raster
//! surface, repaints cells as their sources finish loading, and encodes
//! the result for upload.
//!
//! ```text
//! set_source(i) ──► loader (fetch + decode) ──► completion queue
//!                                                     │
//!           load handler ◄── Region::complete_load ◄──┘
//!                 │
//!                 ▼
//!          redraw_cell(i) ──► DrawContext ──► RasterSurface
//!                                                 │
//!                                      export / save (PUT)
//! ```

pub mod compositor;
pub mod context;
pub mod export;
pub mod http;
pub mod loader;
pub mod region;
pub mod surface;

pub use compositor::{GridCompositor, DEFAULT_BACKGROUND};
pub use context::DrawContext;
pub use export::{
    encode_surface, upload, EncodedImage, UploadRequest, UploadResponse, UploadTransport,
};
pub use http::{HttpResponse, HttpTransport};
pub use loader::{decode_image, FsFetcher, HostFetcher, SourceFetcher};
pub use region::{LoadHandler, LoadState, Region, RegionId};
pub use surface::{ImageSurface, RasterSurface};
