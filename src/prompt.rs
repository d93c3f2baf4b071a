//! Style catalogue and enhancement prompts.
//!
//! A prompt is the natural-language instruction sent to a remote model. It is
//! built from three fragments joined into one paragraph:
//!
//! 1. the style's look (lighting, wardrobe, background),
//! 2. the platform's output constraints (name, box, format),
//! 3. one hint per high- or medium-priority analysis recommendation.
//!
//! Generation is pure and deterministic.

use crate::analysis::{EnhancementType, ImageAnalysis, Priority};
use crate::platforms::PlatformSpec;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported style '{0}'")]
pub struct UnsupportedStyle(pub String);

/// Visual style requested for the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Professional,
    Creative,
    Executive,
    Casual,
    Startup,
    Healthcare,
    Academic,
}

impl Style {
    pub const ALL: [Style; 7] = [
        Style::Professional,
        Style::Creative,
        Style::Executive,
        Style::Casual,
        Style::Startup,
        Style::Healthcare,
        Style::Academic,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Style::Professional => "professional",
            Style::Creative => "creative",
            Style::Executive => "executive",
            Style::Casual => "casual",
            Style::Startup => "startup",
            Style::Healthcare => "healthcare",
            Style::Academic => "academic",
        }
    }

    /// One-line description for listings.
    pub fn description(self) -> &'static str {
        match self {
            Style::Professional => "Clean corporate headshot with neutral background",
            Style::Creative => "Vibrant, artistic look with expressive colour",
            Style::Executive => "Authoritative, polished boardroom portrait",
            Style::Casual => "Relaxed, natural and approachable",
            Style::Startup => "Modern, energetic tech-industry look",
            Style::Healthcare => "Trustworthy, calm clinical professional",
            Style::Academic => "Thoughtful, scholarly and understated",
        }
    }

    fn look(self) -> &'static str {
        match self {
            Style::Professional => {
                "Enhance this portrait into a polished professional headshot with soft, even \
                 studio lighting, accurate skin tones and a clean neutral background."
            }
            Style::Creative => {
                "Enhance this portrait with a creative, artistic treatment: rich colour, \
                 expressive lighting and a tasteful stylised background."
            }
            Style::Executive => {
                "Enhance this portrait into an executive headshot with confident contrast, \
                 refined lighting and a dark, understated background."
            }
            Style::Casual => {
                "Enhance this portrait with a relaxed, natural look: warm daylight, gentle \
                 contrast and a softly blurred everyday setting."
            }
            Style::Startup => {
                "Enhance this portrait with a modern startup feel: bright, crisp lighting, \
                 clean colours and a light contemporary background."
            }
            Style::Healthcare => {
                "Enhance this portrait into a trustworthy healthcare headshot with calm, \
                 bright lighting and a clean light background."
            }
            Style::Academic => {
                "Enhance this portrait into an academic headshot with balanced natural \
                 lighting, muted tones and a subtle library or office background."
            }
        }
    }
}

impl FromStr for Style {
    type Err = UnsupportedStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Style::ALL
            .into_iter()
            .find(|style| style.id() == s)
            .ok_or_else(|| UnsupportedStyle(s.to_string()))
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Build the instruction for one (style, platform, analysis) combination.
pub fn prompt_for(style: Style, platform: &PlatformSpec, analysis: &ImageAnalysis) -> String {
    let mut parts = vec![
        style.look().to_string(),
        format!(
            "The result will be used as a {} image at {}x{} pixels ({}), so keep the face \
             centred with room for a square or banner crop.",
            platform.name, platform.width, platform.height, platform.format
        ),
    ];

    parts.extend(
        analysis
            .recommendations
            .iter()
            .filter(|r| r.priority >= Priority::Medium)
            .map(|r| hint(r.enhancement).to_string()),
    );

    parts.push("Preserve the subject's identity and facial features exactly.".to_string());
    parts.join(" ")
}

fn hint(kind: EnhancementType) -> &'static str {
    match kind {
        EnhancementType::Brightness => "Correct the exposure so the face is well lit.",
        EnhancementType::Contrast => "Add gentle contrast for depth.",
        EnhancementType::Saturation => "Balance the colour saturation.",
        EnhancementType::Sharpen => "Restore fine detail and sharpen the eyes.",
        EnhancementType::Denoise => "Reduce visible noise and grain.",
        EnhancementType::BackgroundBlur => "Soften the background to isolate the subject.",
    }
}
