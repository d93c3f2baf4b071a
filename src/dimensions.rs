//! Custom output dimensions.
//!
//! A request may override every platform's target box with a caller-supplied
//! size. The caller can give any combination of width, height and aspect
//! ratio; [`normalize`] turns that into one concrete box or rejects it.
//!
//! | Input | Result |
//! |---|---|
//! | width + height | both as given |
//! | width + aspect | height = round(width / aspect) |
//! | height + aspect | width = round(height × aspect) |
//! | aspect only | short edge [`DEFAULT_SHORT_EDGE`], long edge capped at [`MAX_EDGE`] |
//! | width only / height only | square |
//! | width + height + aspect | both as given, if within 1% of the aspect |
//!
//! Each edge must be within [`MIN_EDGE`]`..=`[`MAX_EDGE`] and the resulting
//! ratio within [`MIN_ASPECT`]`..=`[`MAX_ASPECT`].

use crate::imaging::aspect_ratio;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_EDGE: u32 = 50;
pub const MAX_EDGE: u32 = 4096;
pub const MIN_ASPECT: f64 = 0.1;
pub const MAX_ASPECT: f64 = 10.0;
/// Short edge used when only an aspect ratio is given.
pub const DEFAULT_SHORT_EDGE: u32 = 1080;
/// Allowed relative disagreement between width/height and an explicit aspect.
const ASPECT_TOLERANCE: f64 = 0.01;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DimensionError {
    #[error("custom dimensions need at least one of width, height or aspect ratio")]
    Empty,
    #[error("invalid aspect ratio '{0}': expected \"W:H\" or a positive decimal")]
    BadAspect(String),
    #[error("aspect ratio {0:.3} outside {MIN_ASPECT}..={MAX_ASPECT}")]
    AspectOutOfRange(f64),
    #[error("{edge} {value} outside {MIN_EDGE}..={MAX_EDGE}")]
    EdgeOutOfRange { edge: &'static str, value: u32 },
    #[error("{width}x{height} does not match aspect ratio {aspect:.3}")]
    Inconsistent { width: u32, height: u32, aspect: f64 },
}

/// Caller-supplied size override; every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomDimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// `"W:H"` (e.g. `"16:9"`) or a decimal (e.g. `"1.5"`).
    pub aspect_ratio: Option<String>,
}

/// Concrete box that replaces every platform's target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NormalizedDimensions {
    pub width: u32,
    pub height: u32,
    /// Ratio reduced to lowest terms, `[width, height]`.
    pub aspect_ratio: [u32; 2],
}

/// Parse `"W:H"` or a decimal ratio.
pub fn parse_aspect(raw: &str) -> Result<f64, DimensionError> {
    let bad = || DimensionError::BadAspect(raw.to_string());
    let trimmed = raw.trim();
    let ratio = match trimmed.split_once(':') {
        Some((w, h)) => {
            let w: f64 = w.trim().parse().map_err(|_| bad())?;
            let h: f64 = h.trim().parse().map_err(|_| bad())?;
            if h <= 0.0 {
                return Err(bad());
            }
            w / h
        }
        None => trimmed.parse().map_err(|_| bad())?,
    };
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(bad());
    }
    Ok(ratio)
}

/// Resolve a custom size request into one concrete box.
pub fn normalize(custom: &CustomDimensions) -> Result<NormalizedDimensions, DimensionError> {
    let aspect = custom.aspect_ratio.as_deref().map(parse_aspect).transpose()?;
    if let Some(ar) = aspect {
        check_aspect(ar)?;
    }

    let (width, height) = match (custom.width, custom.height, aspect) {
        (Some(w), Some(h), Some(ar)) => {
            check_edges(w, h)?;
            let actual = aspect_ratio(w, h);
            if (actual - ar).abs() / ar > ASPECT_TOLERANCE {
                return Err(DimensionError::Inconsistent {
                    width: w,
                    height: h,
                    aspect: ar,
                });
            }
            (w, h)
        }
        (Some(w), Some(h), None) => (w, h),
        (Some(w), None, Some(ar)) => (w, (w as f64 / ar).round() as u32),
        (None, Some(h), Some(ar)) => ((h as f64 * ar).round() as u32, h),
        (None, None, Some(ar)) => from_aspect(ar),
        (Some(w), None, None) => (w, w),
        (None, Some(h), None) => (h, h),
        (None, None, None) => return Err(DimensionError::Empty),
    };

    check_edges(width, height)?;
    check_aspect(aspect_ratio(width, height))?;

    let divisor = gcd(width, height);
    Ok(NormalizedDimensions {
        width,
        height,
        aspect_ratio: [width / divisor, height / divisor],
    })
}

/// Short edge at the default, long edge scaled down if it would overflow.
fn from_aspect(ar: f64) -> (u32, u32) {
    let short = DEFAULT_SHORT_EDGE as f64;
    let (w, h) = if ar >= 1.0 {
        (short * ar, short)
    } else {
        (short, short / ar)
    };
    let long = w.max(h);
    let scale = if long > MAX_EDGE as f64 {
        MAX_EDGE as f64 / long
    } else {
        1.0
    };
    ((w * scale).round() as u32, (h * scale).round() as u32)
}

fn check_edges(width: u32, height: u32) -> Result<(), DimensionError> {
    for (edge, value) in [("width", width), ("height", height)] {
        if !(MIN_EDGE..=MAX_EDGE).contains(&value) {
            return Err(DimensionError::EdgeOutOfRange { edge, value });
        }
    }
    Ok(())
}

fn check_aspect(ar: f64) -> Result<(), DimensionError> {
    if !(MIN_ASPECT..=MAX_ASPECT).contains(&ar) {
        return Err(DimensionError::AspectOutOfRange(ar));
    }
    Ok(())
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}
