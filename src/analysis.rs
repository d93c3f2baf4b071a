//! Source image analysis.
//!
//! Runs once per request, before any platform work starts. The orchestrator
//! uses the result to pick a strategy and build prompts; platform tasks only
//! receive the small `Copy` tuning derived from it.
//!
//! ## Signals
//!
//! All signals are computed on an *analysis raster*: the source downscaled
//! with the Triangle filter so its long edge is at most
//! [`ANALYSIS_MAX_EDGE`] pixels (smaller sources are used as-is). Every
//! normalisation constant is fixed so results are reproducible.
//!
//! | Signal | Definition |
//! |---|---|
//! | brightness | mean of all R, G, B samples / 255 |
//! | contrast | mean per-channel standard deviation / [`STDDEV_SCALE`], clamped to 1 |
//! | saturation | mean over pixels of (max − min channel) / 255 |
//! | sharpness | mean \|4-neighbour Laplacian\| of the greyscale raster / [`SHARPNESS_SCALE`], clamped to 1 |
//! | noise | mean per-channel variance / [`VARIANCE_SCALE`], clamped to 1 |
//!
//! Orientation uses the *source* dimensions. Background complexity is bucketed
//! from sharpness (< 0.15 simple, < 0.35 moderate, else complex).
//!
//! ## Recommendations
//!
//! Fixed threshold rules, evaluated in table order:
//!
//! | Condition | Type | Parameter | Priority |
//! |---|---|---|---|
//! | brightness < 0.4 | brightness | 1.2 | high |
//! | brightness > 0.8 | brightness | 0.9 | medium |
//! | contrast < 0.3 | contrast | 1.15 | medium |
//! | saturation < 0.2 | saturation | 1.1 | low |
//! | saturation > 0.7 | saturation | 0.9 | low |
//! | sharpness < 0.3 | sharpen | 1.0 | high |
//! | noise > 0.5 | denoise | 0.5 | low |
//! | background complex | background_blur | 0.3 | low |

use crate::imaging::{BackendError, ColorAdjust, decode};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use serde::Serialize;

/// Long edge of the raster signals are computed on.
pub const ANALYSIS_MAX_EDGE: u32 = 512;
/// Divisor for the mean channel standard deviation (half the 8-bit range).
pub const STDDEV_SCALE: f64 = 127.5;
/// Divisor for the mean channel variance (`STDDEV_SCALE²`).
pub const VARIANCE_SCALE: f64 = 16_256.25;
/// Divisor for the mean absolute Laplacian response.
pub const SHARPNESS_SCALE: f64 = 32.0;

/// Sigma added to the platform unsharp mask per unit of a sharpen recommendation.
const SHARPEN_BOOST_PER_UNIT: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundComplexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementType {
    Brightness,
    Contrast,
    Saturation,
    Sharpen,
    Denoise,
    BackgroundBlur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// One suggested adjustment derived from the signals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub enhancement: EnhancementType,
    pub parameter: f32,
    pub priority: Priority,
    pub reason: String,
}

/// Derived signals for one source image. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageAnalysis {
    pub width: u32,
    pub height: u32,
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub sharpness: f64,
    pub noise: f64,
    pub orientation: Orientation,
    pub background: BackgroundComplexity,
    pub recommendations: Vec<Recommendation>,
}

/// Adjustments the local pipeline folds in on top of platform styling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTuning {
    pub color: ColorAdjust,
    pub sharpen_boost: f32,
}

impl ImageAnalysis {
    pub fn has_high_priority(&self) -> bool {
        self.recommendations
            .iter()
            .any(|r| r.priority == Priority::High)
    }

    /// Translate the pixel-level recommendations into local multipliers.
    ///
    /// Denoise and background blur need a model and are ignored here.
    pub fn local_tuning(&self) -> LocalTuning {
        let mut color = ColorAdjust::IDENTITY;
        let mut sharpen_boost = 0.0;
        for rec in &self.recommendations {
            match rec.enhancement {
                EnhancementType::Brightness => color.brightness *= rec.parameter,
                EnhancementType::Contrast => color.contrast *= rec.parameter,
                EnhancementType::Saturation => color.saturation *= rec.parameter,
                EnhancementType::Sharpen => sharpen_boost += rec.parameter * SHARPEN_BOOST_PER_UNIT,
                EnhancementType::Denoise | EnhancementType::BackgroundBlur => {}
            }
        }
        LocalTuning {
            color,
            sharpen_boost,
        }
    }
}

/// Decode `source` and analyse it.
pub fn analyze(source: &[u8]) -> Result<ImageAnalysis, BackendError> {
    let img = decode(source)?;
    Ok(analyze_image(&img))
}

/// Analyse an already decoded image.
pub fn analyze_image(img: &DynamicImage) -> ImageAnalysis {
    let (width, height) = (img.width(), img.height());
    let raster = if width.max(height) > ANALYSIS_MAX_EDGE {
        img.resize(ANALYSIS_MAX_EDGE, ANALYSIS_MAX_EDGE, FilterType::Triangle)
    } else {
        img.clone()
    };

    let rgb = raster.to_rgb8();
    let n = (rgb.width() as f64 * rgb.height() as f64).max(1.0);

    let mut sum = [0f64; 3];
    let mut sum_sq = [0f64; 3];
    let mut spread = 0f64;
    for px in rgb.pixels() {
        let [r, g, b] = px.0;
        for (c, v) in [r, g, b].into_iter().enumerate() {
            let v = v as f64;
            sum[c] += v;
            sum_sq[c] += v * v;
        }
        spread += (r.max(g).max(b) - r.min(g).min(b)) as f64;
    }

    let variances: Vec<f64> = (0..3)
        .map(|c| {
            let mean = sum[c] / n;
            (sum_sq[c] / n - mean * mean).max(0.0)
        })
        .collect();

    let brightness = sum.iter().sum::<f64>() / (3.0 * n) / 255.0;
    let contrast =
        (variances.iter().map(|v| v.sqrt()).sum::<f64>() / 3.0 / STDDEV_SCALE).min(1.0);
    let noise = (variances.iter().sum::<f64>() / 3.0 / VARIANCE_SCALE).min(1.0);
    let saturation = spread / n / 255.0;
    let sharpness = (laplacian_energy(&raster.to_luma8()) / SHARPNESS_SCALE).min(1.0);

    let orientation = match width.cmp(&height) {
        std::cmp::Ordering::Greater => Orientation::Landscape,
        std::cmp::Ordering::Less => Orientation::Portrait,
        std::cmp::Ordering::Equal => Orientation::Square,
    };
    let background = if sharpness < 0.15 {
        BackgroundComplexity::Simple
    } else if sharpness < 0.35 {
        BackgroundComplexity::Moderate
    } else {
        BackgroundComplexity::Complex
    };

    let mut analysis = ImageAnalysis {
        width,
        height,
        brightness,
        contrast,
        saturation,
        sharpness,
        noise,
        orientation,
        background,
        recommendations: Vec::new(),
    };
    analysis.recommendations = recommend(&analysis);

    tracing::debug!(
        brightness = format_args!("{brightness:.3}"),
        contrast = format_args!("{contrast:.3}"),
        saturation = format_args!("{saturation:.3}"),
        sharpness = format_args!("{sharpness:.3}"),
        noise = format_args!("{noise:.3}"),
        recommendations = analysis.recommendations.len(),
        "image analysis complete"
    );
    analysis
}

/// Mean absolute response of the 4-neighbour Laplacian over interior pixels.
fn laplacian_energy(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }
    let at = |x: u32, y: u32| gray.get_pixel(x, y).0[0] as f64;
    let mut total = 0f64;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap = 4.0 * at(x, y) - at(x - 1, y) - at(x + 1, y) - at(x, y - 1) - at(x, y + 1);
            total += lap.abs();
        }
    }
    total / ((w - 2) as f64 * (h - 2) as f64)
}

fn recommend(a: &ImageAnalysis) -> Vec<Recommendation> {
    let rule = |enhancement, parameter, priority, reason: &str| Recommendation {
        enhancement,
        parameter,
        priority,
        reason: reason.to_string(),
    };

    let mut recs = Vec::new();
    if a.brightness < 0.4 {
        recs.push(rule(
            EnhancementType::Brightness,
            1.2,
            Priority::High,
            "image appears underexposed",
        ));
    } else if a.brightness > 0.8 {
        recs.push(rule(
            EnhancementType::Brightness,
            0.9,
            Priority::Medium,
            "image appears overexposed",
        ));
    }
    if a.contrast < 0.3 {
        recs.push(rule(
            EnhancementType::Contrast,
            1.15,
            Priority::Medium,
            "low tonal contrast",
        ));
    }
    if a.saturation < 0.2 {
        recs.push(rule(
            EnhancementType::Saturation,
            1.1,
            Priority::Low,
            "colours look muted",
        ));
    } else if a.saturation > 0.7 {
        recs.push(rule(
            EnhancementType::Saturation,
            0.9,
            Priority::Low,
            "colours look oversaturated",
        ));
    }
    if a.sharpness < 0.3 {
        recs.push(rule(
            EnhancementType::Sharpen,
            1.0,
            Priority::High,
            "image lacks fine detail",
        ));
    }
    if a.noise > 0.5 {
        recs.push(rule(
            EnhancementType::Denoise,
            0.5,
            Priority::Low,
            "high per-channel variance",
        ));
    }
    if a.background == BackgroundComplexity::Complex {
        recs.push(rule(
            EnhancementType::BackgroundBlur,
            0.3,
            Priority::Low,
            "busy background draws attention from the subject",
        ));
    }
    recs
}
