//! Shared request and result types.
//!
//! A request goes in as an [`OptimizationRequest`]; an [`AggregateResult`]
//! comes out holding exactly one [`PlatformTaskResult`] per distinct
//! platform id. Results serialize to the JSON shape printed by `--json`.

use crate::dimensions::CustomDimensions;
use crate::imaging::{Dimensions, OutputFormat};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

// =========================================================================
// Request
// =========================================================================

/// Spending tier for one request, ordered cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetTier {
    Basic,
    Standard,
    Premium,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown budget tier '{0}' (expected basic, standard or premium)")]
pub struct UnknownBudgetTier(pub String);

impl FromStr for BudgetTier {
    type Err = UnknownBudgetTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(BudgetTier::Basic),
            "standard" => Ok(BudgetTier::Standard),
            "premium" => Ok(BudgetTier::Premium),
            other => Err(UnknownBudgetTier(other.to_string())),
        }
    }
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetTier::Basic => write!(f, "basic"),
            BudgetTier::Standard => write!(f, "standard"),
            BudgetTier::Premium => write!(f, "premium"),
        }
    }
}

/// One optimisation request. Builder methods consume and return `self`.
#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    pub image: Arc<[u8]>,
    pub platforms: Vec<String>,
    pub style: String,
    pub budget: BudgetTier,
    pub custom_dimensions: Option<CustomDimensions>,
}

impl OptimizationRequest {
    /// Request with the `professional` style and `basic` budget.
    pub fn new<I, S>(image: impl Into<Arc<[u8]>>, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            image: image.into(),
            platforms: platforms.into_iter().map(Into::into).collect(),
            style: "professional".to_string(),
            budget: BudgetTier::Basic,
            custom_dimensions: None,
        }
    }

    pub fn with_style(self, style: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            ..self
        }
    }

    pub fn with_budget(self, budget: BudgetTier) -> Self {
        Self { budget, ..self }
    }

    pub fn with_dimensions(self, custom: CustomDimensions) -> Self {
        Self {
            custom_dimensions: Some(custom),
            ..self
        }
    }
}

// =========================================================================
// Per-platform result
// =========================================================================

/// Why one platform failed (or why it fell back to local processing).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("unsupported platform '{0}'")]
    UnsupportedPlatform(String),
    #[error("encoding failed: {0}")]
    Encoding(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("remote job timed out")]
    Timeout,
    #[error("internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    pub fn kind(&self) -> &'static str {
        match self {
            PlatformError::UnsupportedPlatform(_) => "unsupported_platform",
            PlatformError::Encoding(_) => "encoding",
            PlatformError::Provider(_) => "provider",
            PlatformError::Timeout => "timeout",
            PlatformError::Internal(_) => "internal",
        }
    }
}

/// Serialized as `{kind, message}` so clients get the full display text.
impl Serialize for PlatformError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PlatformError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

/// Which path produced a platform's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnhancementPath {
    Local,
    Ai { provider: String },
    LocalFallback { provider: String, reason: PlatformError },
}

impl fmt::Display for EnhancementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnhancementPath::Local => write!(f, "local"),
            EnhancementPath::Ai { provider } => write!(f, "ai ({provider})"),
            EnhancementPath::LocalFallback { provider, reason } => {
                write!(f, "local fallback ({provider}: {reason})")
            }
        }
    }
}

/// Outcome for one platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformTaskResult {
    pub success: bool,
    #[serde(
        serialize_with = "serialize_base64",
        skip_serializing_if = "Option::is_none"
    )]
    pub output: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PlatformError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<EnhancementPath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

fn serialize_base64<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(b) => serializer.serialize_str(&BASE64.encode(b)),
        None => serializer.serialize_none(),
    }
}

impl PlatformTaskResult {
    pub fn succeeded(
        output: Vec<u8>,
        dimensions: Dimensions,
        format: OutputFormat,
        quality_score: u8,
        enhancement: EnhancementPath,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            success: true,
            file_size: Some(output.len() as u64),
            output: Some(output),
            error: None,
            quality_score: Some(quality_score),
            dimensions: Some(dimensions),
            processing_time_ms,
            enhancement: Some(enhancement),
            format: Some(format),
        }
    }

    pub fn failed(error: PlatformError, processing_time_ms: u64) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error),
            quality_score: None,
            dimensions: None,
            processing_time_ms,
            enhancement: None,
            format: None,
            file_size: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.enhancement, Some(EnhancementPath::LocalFallback { .. }))
    }

    pub fn is_ai(&self) -> bool {
        matches!(self.enhancement, Some(EnhancementPath::Ai { .. }))
    }
}

// =========================================================================
// Aggregate result
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub strategy_name: String,
}

/// Response for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    /// True iff at least one platform succeeded.
    pub success: bool,
    pub per_platform: BTreeMap<String, PlatformTaskResult>,
    pub summary: Summary,
    pub total_time_ms: u64,
    /// SHA-256 of the source bytes, hex encoded.
    pub source_digest: String,
}

impl AggregateResult {
    pub fn assemble(
        per_platform: BTreeMap<String, PlatformTaskResult>,
        strategy_name: &str,
        total_time_ms: u64,
        source_digest: String,
    ) -> Self {
        let successful = per_platform.values().filter(|r| r.success).count();
        let total = per_platform.len();
        Self {
            success: successful > 0,
            summary: Summary {
                total,
                successful,
                failed: total - successful,
                strategy_name: strategy_name.to_string(),
            },
            per_platform,
            total_time_ms,
            source_digest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_result() -> PlatformTaskResult {
        PlatformTaskResult::succeeded(
            vec![1, 2, 3],
            Dimensions {
                width: 400,
                height: 400,
            },
            OutputFormat::Jpeg,
            90,
            EnhancementPath::Local,
            12,
        )
    }

    #[test]
    fn budget_tier_parses_and_orders() {
        assert_eq!("premium".parse::<BudgetTier>().unwrap(), BudgetTier::Premium);
        assert!("gold".parse::<BudgetTier>().is_err());
        assert!(BudgetTier::Basic < BudgetTier::Standard);
        assert!(BudgetTier::Standard < BudgetTier::Premium);
        assert_eq!(BudgetTier::Standard.to_string(), "standard");
    }

    #[test]
    fn request_builder_defaults_and_overrides() {
        let req = OptimizationRequest::new(vec![1u8, 2], ["linkedin", "github"]);
        assert_eq!(req.style, "professional");
        assert_eq!(req.budget, BudgetTier::Basic);
        assert!(req.custom_dimensions.is_none());

        let req = req
            .with_style("creative")
            .with_budget(BudgetTier::Premium)
            .with_dimensions(CustomDimensions {
                width: Some(500),
                ..CustomDimensions::default()
            });
        assert_eq!(req.style, "creative");
        assert_eq!(req.budget, BudgetTier::Premium);
        assert_eq!(req.platforms, vec!["linkedin", "github"]);
        assert_eq!(&*req.image, &[1, 2]);
    }

    #[test]
    fn success_result_serializes_output_as_base64() {
        let json = serde_json::to_value(ok_result()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["output"], "AQID");
        assert_eq!(json["file_size"], 3);
        assert_eq!(json["dimensions"]["width"], 400);
        assert_eq!(json["format"], "jpeg");
        assert_eq!(json["enhancement"]["kind"], "local");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_result_serializes_error_kind_and_message() {
        let result = PlatformTaskResult::failed(
            PlatformError::UnsupportedPlatform("myspace".into()),
            0,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["kind"], "unsupported_platform");
        assert_eq!(json["error"]["message"], "unsupported platform 'myspace'");
        assert!(json.get("output").is_none());
        assert!(json.get("quality_score").is_none());
    }

    #[test]
    fn fallback_path_carries_reason() {
        let path = EnhancementPath::LocalFallback {
            provider: "relight".into(),
            reason: PlatformError::Timeout,
        };
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json["kind"], "local_fallback");
        assert_eq!(json["provider"], "relight");
        assert_eq!(json["reason"]["kind"], "timeout");
        assert_eq!(path.to_string(), "local fallback (relight: remote job timed out)");
    }

    #[test]
    fn assemble_counts_outcomes() {
        let mut map = BTreeMap::new();
        map.insert("linkedin".to_string(), ok_result());
        map.insert(
            "madeup".to_string(),
            PlatformTaskResult::failed(PlatformError::UnsupportedPlatform("madeup".into()), 0),
        );
        let agg = AggregateResult::assemble(map, "local_only", 40, "ab".into());
        assert!(agg.success);
        assert_eq!(agg.summary.total, 2);
        assert_eq!(agg.summary.successful, 1);
        assert_eq!(agg.summary.failed, 1);
        assert_eq!(agg.summary.strategy_name, "local_only");
    }

    #[test]
    fn assemble_all_failed_is_not_success() {
        let mut map = BTreeMap::new();
        map.insert(
            "x".to_string(),
            PlatformTaskResult::failed(PlatformError::Encoding("boom".into()), 3),
        );
        let agg = AggregateResult::assemble(map, "local_only", 3, String::new());
        assert!(!agg.success);
    }
}
