//! Heuristic output quality score.
//!
//! A diagnostic in `[60, 100]` built from four header-level checks. It says
//! nothing about how the image looks; the floor of 60 means even a badly
//! wrong output scores "acceptable", so treat the number as a rough signal.
//!
//! | Check | Pass | Miss |
//! |---|---|---|
//! | dimensions equal the target box | 40 | 30 |
//! | container matches the target format | 20 | 15 |
//! | bytes per pixel < 0.5 / < 1.0 / otherwise | 20 / 15 / 10 | |
//! | resolution metadata (JFIF density or PNG `pHYs`) | 20 | 15 |

use crate::imaging::{OutputFormat, read_resolution};
use crate::platforms::PlatformSpec;
use image::ImageReader;
use serde::Serialize;
use std::io::Cursor;

pub const MIN_SCORE: u8 = 60;
pub const MAX_SCORE: u8 = 100;

/// Per-check points, kept for `--verbose` output and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityBreakdown {
    pub dimensions: u8,
    pub format: u8,
    pub compression: u8,
    pub metadata: u8,
}

impl QualityBreakdown {
    pub fn score(&self) -> u8 {
        let raw = self.dimensions as u32 + self.format as u32 + self.compression as u32
            + self.metadata as u32;
        raw.clamp(MIN_SCORE as u32, MAX_SCORE as u32) as u8
    }
}

/// Score encoded `bytes` against the platform they were produced for.
pub fn score(bytes: &[u8], spec: &PlatformSpec) -> u8 {
    assess(bytes, spec).score()
}

pub fn assess(bytes: &[u8], spec: &PlatformSpec) -> QualityBreakdown {
    let header = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok();
    let detected = header
        .as_ref()
        .and_then(|r| r.format())
        .and_then(OutputFormat::from_image_format);
    let dims = header.and_then(|r| r.into_dimensions().ok());

    let dimensions = if dims == Some((spec.width, spec.height)) {
        40
    } else {
        30
    };
    let format = if detected == Some(spec.format) { 20 } else { 15 };

    let (w, h) = dims.unwrap_or((spec.width, spec.height));
    let pixels = (w as f64 * h as f64).max(1.0);
    let bpp = bytes.len() as f64 / pixels;
    let compression = if bpp < 0.5 {
        20
    } else if bpp < 1.0 {
        15
    } else {
        10
    };

    let metadata = if read_resolution(bytes).is_some() {
        20
    } else {
        15
    };

    QualityBreakdown {
        dimensions,
        format,
        compression,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{RustBackend, enhance_for_platform};
    use crate::platforms::PlatformRegistry;
    use crate::test_helpers::{gradient_jpeg, gradient_png};

    fn spec(id: &str) -> PlatformSpec {
        PlatformRegistry::builtin().lookup(id).unwrap().clone()
    }

    #[test]
    fn pipeline_jpeg_scores_full_marks_on_headers() {
        let linkedin = spec("linkedin");
        let out = enhance_for_platform(&RustBackend::new(), &gradient_jpeg(800, 600), &linkedin, None)
            .unwrap();
        let b = assess(&out.bytes, &linkedin);
        assert_eq!(b.dimensions, 40);
        assert_eq!(b.format, 20);
        assert_eq!(b.metadata, 20);
        assert!((MIN_SCORE..=MAX_SCORE).contains(&b.score()));
    }

    #[test]
    fn png_without_phys_loses_metadata_points() {
        let github = spec("github");
        let out = enhance_for_platform(&RustBackend::new(), &gradient_jpeg(500, 500), &github, None)
            .unwrap();
        let b = assess(&out.bytes, &github);
        assert_eq!(b.dimensions, 40);
        assert_eq!(b.format, 20);
        assert_eq!(b.metadata, 15);
    }

    #[test]
    fn wrong_box_and_format_are_penalised() {
        let linkedin = spec("linkedin");
        let b = assess(&gradient_png(100, 100), &linkedin);
        assert_eq!(b.dimensions, 30);
        assert_eq!(b.format, 15);
    }

    #[test]
    fn garbage_still_scores_at_least_the_floor() {
        let s = score(b"definitely not an image, just a long run of text bytes", &spec("discord"));
        assert!(s >= MIN_SCORE);
        assert!(s <= MAX_SCORE);
    }

    #[test]
    fn empty_buffer_scores_in_range() {
        let s = score(&[], &spec("linkedin"));
        assert!((MIN_SCORE..=MAX_SCORE).contains(&s));
    }

    #[test]
    fn breakdown_score_clamps() {
        let low = QualityBreakdown {
            dimensions: 0,
            format: 0,
            compression: 0,
            metadata: 0,
        };
        assert_eq!(low.score(), MIN_SCORE);
        let high = QualityBreakdown {
            dimensions: 40,
            format: 20,
            compression: 20,
            metadata: 20,
        };
        assert_eq!(high.score(), MAX_SCORE);
    }
}
