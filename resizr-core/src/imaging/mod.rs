//! Image primitives used by the pipeline: validation, resize, format sniffing
//!
//! Pixel work goes through the `image` crate behind the [`ImageProcessor`]
//! trait so tests can wrap or replace it.

use crate::error::{Error, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};

pub const MIME_PNG: &str = "image/png";
pub const MIME_WEBP: &str = "image/webp";
pub const MIME_JPEG: &str = "image/jpeg";

/// Operation value selecting crop-to-fill
pub const FILL: &str = "fill";

/// Largest output accepted, in pixels (about 160 MB as RGBA)
pub const MAX_OUTPUT_PIXELS: u64 = 40_000_000;

/// Decode/resize collaborator
pub trait ImageProcessor: Send + Sync {
    /// Fail with [`Error::Decode`] unless `content` is a supported image
    fn validate(&self, content: &[u8]) -> Result<()>;

    /// Resize to `width` x `height`; `crop` selects crop-to-fill.
    /// A zero dimension is derived from the source aspect ratio.
    fn resize(&self, content: &[u8], width: u32, height: u32, crop: bool) -> Result<Vec<u8>>;
}

/// [`ImageProcessor`] backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterProcessor;

impl RasterProcessor {
    pub fn new() -> Self {
        Self
    }

    fn resize_inner(content: &[u8], width: u32, height: u32, crop: bool) -> Result<Vec<u8>> {
        if width != 0 && height != 0 {
            check_output_size(width, height)?;
        }

        let format = image::guess_format(content).map_err(|e| Error::Decode(e.to_string()))?;
        let source = image::load_from_memory_with_format(content, format)
            .map_err(|e| Error::Decode(e.to_string()))?;

        let (w, h) = target_dimensions((source.width(), source.height()), (width, height));
        check_output_size(w, h)?;
        let resized = if crop {
            source.resize_to_fill(w, h, FilterType::Lanczos3)
        } else {
            source.resize_exact(w, h, FilterType::Lanczos3)
        };

        encode(resized, format)
    }
}

impl ImageProcessor for RasterProcessor {
    fn validate(&self, content: &[u8]) -> Result<()> {
        ImageReader::new(Cursor::new(content))
            .with_guessed_format()
            .map_err(|e| Error::Decode(e.to_string()))?
            .into_dimensions()
            .map(|_| ())
            .map_err(|e| Error::Decode(e.to_string()))
    }

    fn resize(&self, content: &[u8], width: u32, height: u32, crop: bool) -> Result<Vec<u8>> {
        match panic::catch_unwind(AssertUnwindSafe(|| {
            Self::resize_inner(content, width, height, crop)
        })) {
            Ok(result) => result,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "internal error in image codec".to_string());
                Err(Error::Resize(reason))
            }
        }
    }
}

/// Output size for a request. A zero side keeps the source aspect ratio;
/// both zero keeps the source size.
pub fn target_dimensions(source: (u32, u32), requested: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = (source.0.max(1) as u64, source.1.max(1) as u64);
    match requested {
        (0, 0) => (sw as u32, sh as u32),
        (0, h) => (((sw * h as u64 + sh / 2) / sh).max(1) as u32, h),
        (w, 0) => (w, ((sh * w as u64 + sw / 2) / sw).max(1) as u32),
        dims => dims,
    }
}

/// Reject outputs above [`MAX_OUTPUT_PIXELS`] before any pixel buffer is allocated
pub fn check_output_size(width: u32, height: u32) -> Result<()> {
    let pixels = width as u64 * height as u64;
    if pixels > MAX_OUTPUT_PIXELS {
        return Err(Error::Resize(format!(
            "requested size {}x{} exceeds the limit of {} pixels",
            width, height, MAX_OUTPUT_PIXELS
        )));
    }
    Ok(())
}

/// Mime type of encoded bytes. Anything not PNG or WEBP is reported as JPEG.
pub fn sniff(content: &[u8]) -> &'static str {
    match image::guess_format(content) {
        Ok(ImageFormat::Png) => MIME_PNG,
        Ok(ImageFormat::WebP) => MIME_WEBP,
        _ => MIME_JPEG,
    }
}

/// Solid magenta PNG used when no error image is available
pub fn placeholder(width: u32, height: u32) -> Result<Vec<u8>> {
    let canvas = RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([255, 0, 255, 255]));
    encode(DynamicImage::ImageRgba8(canvas), ImageFormat::Png)
}

/// Encode in `format` where supported, JPEG otherwise
fn encode(image: DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let (image, format) = match format {
        ImageFormat::Png | ImageFormat::Tiff => (image, format),
        ImageFormat::WebP | ImageFormat::Gif | ImageFormat::Bmp => {
            (DynamicImage::ImageRgba8(image.to_rgba8()), format)
        }
        _ => (DynamicImage::ImageRgb8(image.to_rgb8()), ImageFormat::Jpeg),
    };

    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).map_err(|e| Error::Resize(e.to_string()))?;
    Ok(out.into_inner())
}
