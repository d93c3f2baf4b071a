//! High-level image operations.
//!
//! These functions turn a platform spec (plus optional analysis tuning) into
//! concrete [`EnhanceParams`] and run them through a backend.

use super::backend::{BackendError, Dimensions, EncodedImage, ImageBackend};
use super::params::{EnhanceParams, Quality};
use crate::analysis::LocalTuning;
use crate::platforms::PlatformSpec;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &(impl ImageBackend + ?Sized), source: &[u8]) -> Result<(u32, u32)> {
    let Dimensions { width, height } = backend.identify(source)?;
    Ok((width, height))
}

/// Plan one platform variant without executing it.
///
/// Platform styling is always applied. `tuning` carries the analysis-derived
/// multipliers and sharpen boost used when no remote model touched the image.
pub fn plan_enhancement(spec: &PlatformSpec, tuning: Option<&LocalTuning>) -> EnhanceParams {
    let (color, sharpening) = match tuning {
        Some(t) => (
            spec.styling.color.combine(t.color),
            spec.styling.sharpen.boosted(t.sharpen_boost),
        ),
        None => (spec.styling.color, spec.styling.sharpen),
    };

    EnhanceParams {
        width: spec.width,
        height: spec.height,
        color,
        sharpening: Some(sharpening),
        format: spec.format,
        quality: Quality::from_fraction(spec.quality),
        max_file_size: Some(spec.max_file_size),
    }
}

/// Produce the finished variant of `source` for one platform.
pub fn enhance_for_platform(
    backend: &(impl ImageBackend + ?Sized),
    source: &[u8],
    spec: &PlatformSpec,
    tuning: Option<&LocalTuning>,
) -> Result<EncodedImage> {
    let params = plan_enhancement(spec, tuning);
    let encoded = backend.enhance(source, &params)?;
    if encoded.dimensions != (Dimensions { width: spec.width, height: spec.height }) {
        return Err(BackendError::ProcessingFailed(format!(
            "{} variant came out {}x{}, expected {}x{}",
            spec.id, encoded.dimensions.width, encoded.dimensions.height, spec.width, spec.height
        )));
    }
    Ok(encoded)
}
