//! Image processing — pure Rust, in-memory.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resolution metadata** | custom parser (JFIF APP0 + PNG `pHYs`) |
//! | **Cover crop** | Lanczos3 `resize_exact` + centre `crop_imm` |
//! | **Colour / sharpen** | per-pixel multipliers + `unsharpen` |
//! | **Encode** | JPEG / PNG / lossless WebP encoders |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining a platform spec + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod resolution;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, EncodedImage, ImageBackend};
pub use calculations::aspect_ratio;
pub use operations::{enhance_for_platform, get_dimensions, plan_enhancement};
pub use params::{ColorAdjust, EnhanceParams, OutputFormat, Quality, Sharpening};
pub use resolution::{DensityUnit, Resolution, read_resolution};
pub use rust_backend::{RustBackend, decode};
