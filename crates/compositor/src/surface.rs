//! Raster surfaces the grid paints onto.

use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage, RgbImage};

use teaser_common::error::{TeaserError, TeaserResult};
use teaser_grid_model::format::{OutputFormat, OutputQuality};
use teaser_grid_model::geometry::Rect;

/// The host drawing capability: scaled image blits, solid fills, and
/// encoding the current contents.
pub trait RasterSurface {
    /// Width in pixels.
    fn width(&self) -> u32;

    /// Height in pixels.
    fn height(&self) -> u32;

    /// Paint `image` stretched to exactly fill `dest`.
    fn draw_image(&mut self, image: &RgbaImage, dest: Rect);

    /// Fill `dest` with a solid colour, replacing what was there.
    fn fill_rect(&mut self, dest: Rect, color: Rgba<u8>);

    /// Encode the current contents.
    fn encode(&self, format: OutputFormat, quality: OutputQuality) -> TeaserResult<Vec<u8>>;
}

/// An in-memory RGBA surface.
#[derive(Debug, Clone)]
pub struct ImageSurface {
    pixels: RgbaImage,
}

impl ImageSurface {
    pub fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, background),
        }
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }
}

impl RasterSurface for ImageSurface {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect) {
        let (x0, y0, x1, y1) = dest.pixel_bounds(self.width(), self.height());
        if x1 == x0 || y1 == y0 || image.width() == 0 || image.height() == 0 {
            return;
        }

        let (w, h) = (x1 - x0, y1 - y0);
        if image.dimensions() == (w, h) {
            imageops::overlay(&mut self.pixels, image, x0 as i64, y0 as i64);
        } else {
            let scaled = imageops::resize(image, w, h, FilterType::Triangle);
            imageops::overlay(&mut self.pixels, &scaled, x0 as i64, y0 as i64);
        }
    }

    fn fill_rect(&mut self, dest: Rect, color: Rgba<u8>) {
        let (x0, y0, x1, y1) = dest.pixel_bounds(self.width(), self.height());
        for y in y0..y1 {
            for x in x0..x1 {
                self.pixels.put_pixel(x, y, color);
            }
        }
    }

    fn encode(&self, format: OutputFormat, quality: OutputQuality) -> TeaserResult<Vec<u8>> {
        let (width, height) = self.pixels.dimensions();
        let mut out = Vec::new();

        let result = match format {
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb: RgbImage = self.pixels.convert();
                JpegEncoder::new_with_quality(&mut out, quality.percent()).write_image(
                    rgb.as_raw(),
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )
            }
            OutputFormat::Png => PngEncoder::new(&mut out).write_image(
                self.pixels.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            ),
            OutputFormat::Webp => WebPEncoder::new_lossless(&mut out).write_image(
                self.pixels.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            ),
        };

        result.map_err(|e| TeaserError::encode(format!("{format} {width}x{height}: {e}")))?;
        Ok(out)
    }
}
