//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which turns a platform spec into concrete settings) and the
//! [`backend`](super::backend) (which does the actual pixel work). This
//! separation allows swapping backends (e.g. for testing with a mock) without
//! changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Sharpening`] — Unsharp-mask parameters (sigma + threshold).
//! - [`ColorAdjust`] — Brightness / saturation / contrast multipliers.
//! - [`OutputFormat`] — Target container: JPEG, PNG or WebP.
//! - [`EnhanceParams`] — Full specification for one platform variant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    /// Build from a 0–1 fraction as stored in platform specs.
    pub fn from_fraction(fraction: f32) -> Self {
        Self::new((fraction * 100.0).round() as u32)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Sharpening parameters for unsharp mask.
///
/// - `sigma`: Standard deviation of the Gaussian blur (higher = more sharpening)
/// - `threshold`: Minimum brightness difference to sharpen (0 = sharpen all pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sharpening {
    pub sigma: f32,
    pub threshold: i32,
}

impl Sharpening {
    /// Light sharpening suitable for small avatars.
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0,
        }
    }

    /// Increase sigma by `boost`, keeping the threshold.
    pub fn boosted(self, boost: f32) -> Self {
        Self {
            sigma: self.sigma + boost,
            threshold: self.threshold,
        }
    }
}

/// Multiplicative colour adjustments. `1.0` leaves a channel untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorAdjust {
    pub brightness: f32,
    pub saturation: f32,
    pub contrast: f32,
}

impl ColorAdjust {
    pub const IDENTITY: Self = Self {
        brightness: 1.0,
        saturation: 1.0,
        contrast: 1.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Compose two adjustments by multiplying each factor.
    pub fn combine(self, other: Self) -> Self {
        Self {
            brightness: self.brightness * other.brightness,
            saturation: self.saturation * other.saturation,
            contrast: self.contrast * other.contrast,
        }
    }
}

impl Default for ColorAdjust {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    /// Whether the encoder honours a quality setting.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg)
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::WebP => image::ImageFormat::WebP,
        }
    }

    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
            Self::WebP => write!(f, "webp"),
        }
    }
}

/// Parameters for producing one platform variant (crop + colour + sharpen + encode).
#[derive(Debug, Clone, PartialEq)]
pub struct EnhanceParams {
    /// Exact output box.
    pub width: u32,
    pub height: u32,
    pub color: ColorAdjust,
    pub sharpening: Option<Sharpening>,
    pub format: OutputFormat,
    pub quality: Quality,
    /// Upper bound on encoded size in bytes; lossy formats step quality down to fit.
    pub max_file_size: Option<u64>,
}
