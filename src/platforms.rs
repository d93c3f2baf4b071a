//! Platform specification table.
//!
//! Each supported destination (LinkedIn, Instagram, ...) has a fixed target
//! box, output format, encoding quality, size limit and a small set of
//! styling deltas applied by the local pipeline. The table is built once at
//! startup and only ever read afterwards.
//!
//! | id | box | format |
//! |---|---|---|
//! | `linkedin` | 400×400 | jpeg |
//! | `linkedin_banner` | 1584×396 | jpeg |
//! | `instagram` | 320×320 | jpeg |
//! | `facebook` | 180×180 | jpeg |
//! | `facebook_cover` | 820×312 | jpeg |
//! | `twitter` | 400×400 | jpeg |
//! | `tiktok` | 200×200 | jpeg |
//! | `youtube` | 800×800 | jpeg |
//! | `whatsapp` | 500×500 | jpeg |
//! | `github` | 460×460 | png |
//! | `discord` | 128×128 | png |
//! | `slack` | 512×512 | png |
//! | `zoom` | 1024×1024 | jpeg |
//! | `gmail` | 250×250 | jpeg |

use crate::imaging::{ColorAdjust, OutputFormat, Sharpening};
use serde::Serialize;
use std::collections::BTreeMap;

const MB: u64 = 1024 * 1024;

/// Per-platform styling deltas applied after the crop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlatformStyling {
    pub color: ColorAdjust,
    pub sharpen: Sharpening,
}

/// Immutable description of one destination platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformSpec {
    pub id: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Aspect ratio as `[width, height]`, e.g. `[4, 1]` for banners.
    pub aspect_ratio: [u32; 2],
    /// Encoding quality as a 0–1 fraction.
    pub quality: f32,
    pub max_file_size: u64,
    pub format: OutputFormat,
    pub styling: PlatformStyling,
}

impl PlatformSpec {
    /// Copy of this spec targeting a different box.
    pub fn with_dimensions(&self, width: u32, height: u32, aspect_ratio: [u32; 2]) -> Self {
        Self {
            width,
            height,
            aspect_ratio,
            ..self.clone()
        }
    }
}

/// Read-only lookup table keyed by platform id.
#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    specs: BTreeMap<String, PlatformSpec>,
}

impl PlatformRegistry {
    /// The built-in table of supported platforms.
    pub fn builtin() -> Self {
        Self::from_specs(builtin_specs())
    }

    pub fn from_specs(specs: impl IntoIterator<Item = PlatformSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    pub fn lookup(&self, id: &str) -> Option<&PlatformSpec> {
        self.specs.get(id)
    }

    /// All platform ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.specs.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlatformSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[allow(clippy::too_many_arguments)]
fn spec(
    id: &str,
    name: &str,
    (width, height): (u32, u32),
    aspect_ratio: [u32; 2],
    quality: f32,
    max_file_size: u64,
    format: OutputFormat,
    (brightness, saturation, contrast): (f32, f32, f32),
    sharpen: Sharpening,
) -> PlatformSpec {
    PlatformSpec {
        id: id.to_string(),
        name: name.to_string(),
        width,
        height,
        aspect_ratio,
        quality,
        max_file_size,
        format,
        styling: PlatformStyling {
            color: ColorAdjust {
                brightness,
                saturation,
                contrast,
            },
            sharpen,
        },
    }
}

fn sharpen(sigma: f32, threshold: i32) -> Sharpening {
    Sharpening { sigma, threshold }
}

#[rustfmt::skip]
fn builtin_specs() -> Vec<PlatformSpec> {
    use OutputFormat::{Jpeg, Png};
    vec![
        spec("linkedin", "LinkedIn", (400, 400), [1, 1], 0.90, 8 * MB, Jpeg,
            (1.05, 1.0, 1.1), sharpen(0.8, 2)),
        spec("linkedin_banner", "LinkedIn Banner", (1584, 396), [4, 1], 0.85, 8 * MB, Jpeg,
            (1.0, 1.05, 1.05), sharpen(0.5, 1)),
        spec("instagram", "Instagram", (320, 320), [1, 1], 0.85, 8 * MB, Jpeg,
            (1.05, 1.15, 1.05), sharpen(0.6, 1)),
        spec("facebook", "Facebook", (180, 180), [1, 1], 0.85, 4 * MB, Jpeg,
            (1.02, 1.05, 1.0), sharpen(0.5, 1)),
        spec("facebook_cover", "Facebook Cover", (820, 312), [205, 78], 0.85, 4 * MB, Jpeg,
            (1.0, 1.05, 1.0), sharpen(0.5, 1)),
        spec("twitter", "X / Twitter", (400, 400), [1, 1], 0.85, 2 * MB, Jpeg,
            (1.02, 1.1, 1.05), sharpen(0.6, 1)),
        spec("tiktok", "TikTok", (200, 200), [1, 1], 0.80, 2 * MB, Jpeg,
            (1.08, 1.2, 1.1), sharpen(0.7, 1)),
        spec("youtube", "YouTube", (800, 800), [1, 1], 0.90, 4 * MB, Jpeg,
            (1.03, 1.1, 1.08), sharpen(0.7, 1)),
        spec("whatsapp", "WhatsApp", (500, 500), [1, 1], 0.80, MB, Jpeg,
            (1.03, 1.05, 1.0), sharpen(0.5, 0)),
        spec("github", "GitHub", (460, 460), [1, 1], 0.90, MB, Png,
            (1.0, 1.0, 1.05), sharpen(0.5, 0)),
        spec("discord", "Discord", (128, 128), [1, 1], 0.90, 8 * MB, Png,
            (1.03, 1.1, 1.05), sharpen(0.4, 0)),
        spec("slack", "Slack", (512, 512), [1, 1], 0.90, MB, Png,
            (1.0, 1.0, 1.05), sharpen(0.5, 0)),
        spec("zoom", "Zoom", (1024, 1024), [1, 1], 0.90, 2 * MB, Jpeg,
            (1.05, 1.0, 1.05), sharpen(0.6, 1)),
        spec("gmail", "Gmail", (250, 250), [1, 1], 0.85, MB, Jpeg,
            (1.02, 1.0, 1.0), sharpen(0.5, 0)),
    ]
}
