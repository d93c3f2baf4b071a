//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary and deterministic: the same
//! input bytes and parameters always produce the same output bytes.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory` |
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Cover crop | `crop_imm` to the box aspect, then `resize_exact` with `Lanczos3` |
//! | Colour pass | per-pixel multiply on `RgbaImage` (Rec.601 luma for saturation) |
//! | Sharpening | `DynamicImage::unsharpen` |
//! | Encode → JPEG | `JpegEncoder` with a 72 dpi JFIF density |
//! | Encode → PNG / WebP | `PngEncoder`, `WebPEncoder::new_lossless` |

use super::backend::{BackendError, Dimensions, EncodedImage, ImageBackend};
use super::calculations::{calculate_cover_region, quality_ladder};
use super::params::{ColorAdjust, EnhanceParams, OutputFormat, Quality};
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbaImage};
use std::io::Cursor;

/// Lowest JPEG quality the size-fitting loop will go to.
pub const MIN_FIT_QUALITY: u32 = 40;

/// Density written into every JPEG's JFIF header.
const OUTPUT_DPI: u16 = 72;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode an in-memory image, guessing the format from its magic bytes.
pub fn decode(source: &[u8]) -> Result<DynamicImage, BackendError> {
    if source.is_empty() {
        return Err(BackendError::Decode("empty buffer".into()));
    }
    image::load_from_memory(source).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Crop the centred region with the box's aspect ratio, then resize it to the box.
///
/// Cropping first keeps peak memory at the source plus the target, even for
/// extreme aspect ratios.
pub fn cover_crop(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let source = (img.width(), img.height());
    if source == (width, height) {
        return img.clone();
    }
    let (x, y, w, h) = calculate_cover_region(source, (width, height));
    img.crop_imm(x, y, w, h)
        .resize_exact(width, height, FilterType::Lanczos3)
}

/// Apply brightness, saturation and contrast multipliers in that order.
///
/// Saturation mixes each channel with the Rec.601 luma; contrast pivots
/// around mid-grey (128). Alpha is left untouched.
pub fn apply_color(img: &mut RgbaImage, adjust: ColorAdjust) {
    if adjust.is_identity() {
        return;
    }
    for px in img.pixels_mut() {
        let [r, g, b, a] = px.0;
        let mut c = [
            r as f32 * adjust.brightness,
            g as f32 * adjust.brightness,
            b as f32 * adjust.brightness,
        ];

        let luma = 0.299 * c[0] + 0.587 * c[1] + 0.114 * c[2];
        for v in &mut c {
            *v = luma + (*v - luma) * adjust.saturation;
            *v = (*v - 128.0) * adjust.contrast + 128.0;
        }

        px.0 = [to_channel(c[0]), to_channel(c[1]), to_channel(c[2]), a];
    }
}

#[inline]
fn to_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Encode a finished image into the requested container.
pub fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let result = match format {
        OutputFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
            encoder.set_pixel_density(PixelDensity::dpi(OUTPUT_DPI));
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
        }
        OutputFormat::Png => {
            DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(PngEncoder::new(&mut buf))
        }
        OutputFormat::WebP => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_with_encoder(WebPEncoder::new_lossless(&mut buf)),
    };
    result.map_err(|e| BackendError::Encode(format!("{format} encode failed: {e}")))?;
    Ok(buf)
}

/// Encode, stepping JPEG quality down until the output fits `max_file_size`.
///
/// Lossless formats and outputs that still exceed the limit at the floor
/// quality are returned as-is; the caller decides whether that matters.
fn encode_within_limit(
    img: &DynamicImage,
    params: &EnhanceParams,
) -> Result<(Vec<u8>, Quality), BackendError> {
    let start = params.quality.value();
    let ladder = match (params.max_file_size, params.format.is_lossy()) {
        (Some(_), true) => quality_ladder(start, MIN_FIT_QUALITY),
        _ => vec![start],
    };

    let mut last = None;
    for q in ladder {
        let quality = Quality::new(q);
        let bytes = encode(img, params.format, quality)?;
        let fits = params
            .max_file_size
            .is_none_or(|limit| bytes.len() as u64 <= limit);
        if fits {
            return Ok((bytes, quality));
        }
        last = Some((bytes, quality));
    }

    let (bytes, quality) = last.ok_or_else(|| {
        BackendError::ProcessingFailed("quality ladder produced no attempts".into())
    })?;
    tracing::warn!(
        size = bytes.len(),
        limit = ?params.max_file_size,
        quality = quality.value(),
        "output still exceeds size limit at minimum quality"
    );
    Ok((bytes, quality))
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn enhance(
        &self,
        source: &[u8],
        params: &EnhanceParams,
    ) -> Result<EncodedImage, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "invalid target box {}x{}",
                params.width, params.height
            )));
        }
        let img = decode(source)?;

        let cropped = cover_crop(&img, params.width, params.height);

        let mut rgba = cropped.to_rgba8();
        apply_color(&mut rgba, params.color);
        let colored = DynamicImage::ImageRgba8(rgba);

        let finished = match params.sharpening {
            Some(s) => colored.unsharpen(s.sigma, s.threshold),
            None => colored,
        };

        let (bytes, quality) = encode_within_limit(&finished, params)?;
        Ok(EncodedImage {
            bytes,
            dimensions: Dimensions {
                width: finished.width(),
                height: finished.height(),
            },
            format: params.format,
            quality,
        })
    }
}
