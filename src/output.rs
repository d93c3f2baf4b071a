//! CLI output formatting.
//!
//! Output is **platform-centric**: every entity leads with a positional index
//! and its display name, with details on indented context lines.
//!
//! ## Optimize
//!
//! ```text
//! Strategy: ai_standard (2 of 3 platforms)
//! 001 GitHub → out/github.png
//!     460x460 png, 212.4 KB, quality 95
//!     Enhancement: ai (relight)
//! 002 LinkedIn → out/linkedin.jpg
//!     400x400 jpeg, 38.1 KB, quality 100
//!     Enhancement: local fallback (relight: remote job timed out)
//! 003 madeup
//!     Error: unsupported platform 'madeup'
//! Done in 1840ms
//! ```
//!
//! ## Platforms
//!
//! ```text
//! 001 linkedin         LinkedIn              400x400   1:1   jpeg  8.0 MB
//! ```
//!
//! ## Analyze
//!
//! ```text
//! 1200x800 landscape, moderate background
//!     Brightness: 0.31  Contrast: 0.42  Saturation: 0.55
//!     Sharpness: 0.18  Noise: 0.12
//! Recommendations
//!     [high] brightness x1.20: image appears underexposed
//! ```
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::analysis::ImageAnalysis;
use crate::platforms::PlatformRegistry;
use crate::prompt::Style;
use crate::types::{AggregateResult, PlatformTaskResult};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

// ============================================================================
// Optimize
// ============================================================================

/// Format the result of one request.
///
/// `output_dir` adds a `→ path` to every written platform.
pub fn format_result(
    result: &AggregateResult,
    platforms: &PlatformRegistry,
    output_dir: Option<&Path>,
) -> Vec<String> {
    let mut lines = vec![format!(
        "Strategy: {} ({} of {} platforms)",
        result.summary.strategy_name, result.summary.successful, result.summary.total
    )];

    for (i, (id, r)) in result.per_platform.iter().enumerate() {
        let title = platforms
            .lookup(id)
            .map(|s| s.name.as_str())
            .unwrap_or(id.as_str());
        let header = format!("{} {}", format_index(i + 1), title);
        match (output_dir, r.format) {
            (Some(dir), Some(format)) if r.success => lines.push(format!(
                "{} → {}",
                header,
                dir.join(format!("{}.{}", id, format.extension())).display()
            )),
            _ => lines.push(header),
        }
        lines.extend(platform_details(r).into_iter().map(|l| format!("{}{}", indent(1), l)));
    }

    lines.push(format!("Done in {}ms", result.total_time_ms));
    lines
}

fn platform_details(r: &PlatformTaskResult) -> Vec<String> {
    let mut lines = Vec::new();
    if let (Some(d), Some(format)) = (r.dimensions, r.format) {
        let mut detail = format!("{}x{} {}", d.width, d.height, format);
        if let Some(size) = r.file_size {
            detail.push_str(&format!(", {}", format_size(size)));
        }
        if let Some(score) = r.quality_score {
            detail.push_str(&format!(", quality {}", score));
        }
        lines.push(detail);
    }
    if let Some(path) = &r.enhancement {
        lines.push(format!("Enhancement: {}", path));
    }
    if let Some(error) = &r.error {
        lines.push(format!("Error: {}", error));
    }
    lines
}

pub fn print_result(result: &AggregateResult, platforms: &PlatformRegistry, output_dir: Option<&Path>) {
    for line in format_result(result, platforms, output_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Platforms and styles
// ============================================================================

pub fn format_platforms(platforms: &PlatformRegistry) -> Vec<String> {
    platforms
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            format!(
                "{} {:<16} {:<20} {:>9} {:>5}  {:<4}  {}",
                format_index(i + 1),
                spec.id,
                spec.name,
                format!("{}x{}", spec.width, spec.height),
                format!("{}:{}", spec.aspect_ratio[0], spec.aspect_ratio[1]),
                spec.format,
                format_size(spec.max_file_size),
            )
        })
        .collect()
}

pub fn print_platforms(platforms: &PlatformRegistry) {
    for line in format_platforms(platforms) {
        println!("{}", line);
    }
}

pub fn format_styles() -> Vec<String> {
    Style::ALL
        .iter()
        .map(|s| format!("{:<14} {}", s.id(), s.description()))
        .collect()
}

pub fn print_styles() {
    for line in format_styles() {
        println!("{}", line);
    }
}

// ============================================================================
// Analyze
// ============================================================================

pub fn format_analysis(analysis: &ImageAnalysis) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{}x{} {}, {} background",
            analysis.width,
            analysis.height,
            serde_label(&analysis.orientation),
            serde_label(&analysis.background),
        ),
        format!(
            "{}Brightness: {:.2}  Contrast: {:.2}  Saturation: {:.2}",
            indent(1),
            analysis.brightness,
            analysis.contrast,
            analysis.saturation
        ),
        format!(
            "{}Sharpness: {:.2}  Noise: {:.2}",
            indent(1),
            analysis.sharpness,
            analysis.noise
        ),
    ];

    if analysis.recommendations.is_empty() {
        lines.push("No recommendations".to_string());
    } else {
        lines.push("Recommendations".to_string());
        for rec in &analysis.recommendations {
            lines.push(format!(
                "{}[{}] {} x{:.2}: {}",
                indent(1),
                serde_label(&rec.priority),
                serde_label(&rec.enhancement),
                rec.parameter,
                rec.reason
            ));
        }
    }
    lines
}

pub fn print_analysis(analysis: &ImageAnalysis) {
    for line in format_analysis(analysis) {
        println!("{}", line);
    }
}

/// The serde name of a unit enum variant, e.g. `background_blur`.
fn serde_label<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_image;
    use crate::imaging::{Dimensions, OutputFormat};
    use crate::types::{EnhancementPath, PlatformError};
    use image::{DynamicImage, Rgb, RgbImage};
    use std::collections::BTreeMap;

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(8 * 1024 * 1024), "8.0 MB");
    }

    // =========================================================================
    // Optimize
    // =========================================================================

    fn sample_result() -> AggregateResult {
        let mut map = BTreeMap::new();
        map.insert(
            "linkedin".to_string(),
            PlatformTaskResult::succeeded(
                vec![0; 2048],
                Dimensions {
                    width: 400,
                    height: 400,
                },
                OutputFormat::Jpeg,
                95,
                EnhancementPath::LocalFallback {
                    provider: "relight".into(),
                    reason: PlatformError::Timeout,
                },
                10,
            ),
        );
        map.insert(
            "madeup".to_string(),
            PlatformTaskResult::failed(PlatformError::UnsupportedPlatform("madeup".into()), 0),
        );
        AggregateResult::assemble(map, "ai_standard", 120, String::new())
    }

    #[test]
    fn format_result_lists_every_platform() {
        let lines = format_result(&sample_result(), &PlatformRegistry::builtin(), Some(Path::new("out")));
        assert_eq!(
            lines,
            vec![
                "Strategy: ai_standard (1 of 2 platforms)",
                "001 LinkedIn → out/linkedin.jpg",
                "    400x400 jpeg, 2.0 KB, quality 95",
                "    Enhancement: local fallback (relight: remote job timed out)",
                "002 madeup",
                "    Error: unsupported platform 'madeup'",
                "Done in 120ms",
            ]
        );
    }

    #[test]
    fn format_result_without_output_dir_omits_paths() {
        let lines = format_result(&sample_result(), &PlatformRegistry::builtin(), None);
        assert_eq!(lines[1], "001 LinkedIn");
    }

    // =========================================================================
    // Listings
    // =========================================================================

    #[test]
    fn format_platforms_one_line_each() {
        let registry = PlatformRegistry::builtin();
        let lines = format_platforms(&registry);
        assert_eq!(lines.len(), registry.len());
        let linkedin = lines.iter().find(|l| l.contains(" linkedin ")).unwrap();
        assert!(linkedin.contains("400x400"));
        assert!(linkedin.contains("1:1"));
        assert!(linkedin.contains("8.0 MB"));
    }

    #[test]
    fn format_styles_lists_all() {
        let lines = format_styles();
        assert_eq!(lines.len(), Style::ALL.len());
        assert!(lines.iter().any(|l| l.starts_with("professional")));
    }

    // =========================================================================
    // Analyze
    // =========================================================================

    #[test]
    fn format_analysis_shows_recommendations() {
        let dark = analyze_image(&DynamicImage::ImageRgb8(RgbImage::from_pixel(
            40,
            20,
            Rgb([20; 3]),
        )));
        let lines = format_analysis(&dark);
        assert!(lines[0].starts_with("40x20 landscape"));
        assert!(lines.contains(&"Recommendations".to_string()));
        assert!(
            lines
                .iter()
                .any(|l| l.contains("[high] brightness x1.20: image appears underexposed"))
        );
    }

    #[test]
    fn serde_label_uses_snake_case() {
        assert_eq!(
            serde_label(&crate::analysis::EnhancementType::BackgroundBlur),
            "background_blur"
        );
    }
}
