//! Process-wide optimisation counters.
//!
//! One [`OptimizerStats`] lives inside the orchestrator behind a `Mutex` and
//! is updated once per request, after every platform task has settled.

use crate::types::AggregateResult;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptimizerStats {
    pub requests: u64,
    pub platforms: u64,
    pub successes: u64,
    pub failures: u64,
    pub ai_enhanced: u64,
    pub fallbacks: u64,
}

impl OptimizerStats {
    /// Fold one finished request into the counters.
    pub fn record(&mut self, result: &AggregateResult) {
        self.requests += 1;
        for r in result.per_platform.values() {
            self.platforms += 1;
            if r.success {
                self.successes += 1;
            } else {
                self.failures += 1;
            }
            if r.is_ai() {
                self.ai_enhanced += 1;
            }
            if r.is_fallback() {
                self.fallbacks += 1;
            }
        }
    }

    /// Fraction of platform tasks that succeeded, `None` before any ran.
    pub fn success_rate(&self) -> Option<f64> {
        (self.platforms > 0).then(|| self.successes as f64 / self.platforms as f64)
    }
}

impl fmt::Display for OptimizerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests, {} platforms ({} ok, {} failed)",
            self.requests, self.platforms, self.successes, self.failures
        )?;
        if self.ai_enhanced > 0 || self.fallbacks > 0 {
            write!(
                f,
                ", {} ai, {} fallback",
                self.ai_enhanced, self.fallbacks
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{Dimensions, OutputFormat};
    use crate::types::{EnhancementPath, PlatformError, PlatformTaskResult};
    use std::collections::BTreeMap;

    fn success(path: EnhancementPath) -> PlatformTaskResult {
        PlatformTaskResult::succeeded(
            vec![0],
            Dimensions {
                width: 1,
                height: 1,
            },
            OutputFormat::Png,
            80,
            path,
            1,
        )
    }

    fn aggregate() -> AggregateResult {
        let mut map = BTreeMap::new();
        map.insert(
            "a".into(),
            success(EnhancementPath::Ai {
                provider: "p".into(),
            }),
        );
        map.insert(
            "b".into(),
            success(EnhancementPath::LocalFallback {
                provider: "p".into(),
                reason: PlatformError::Timeout,
            }),
        );
        map.insert(
            "c".into(),
            PlatformTaskResult::failed(PlatformError::UnsupportedPlatform("c".into()), 0),
        );
        AggregateResult::assemble(map, "ai_standard", 5, String::new())
    }

    #[test]
    fn record_counts_every_platform() {
        let mut stats = OptimizerStats::default();
        stats.record(&aggregate());
        stats.record(&aggregate());
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.platforms, 6);
        assert_eq!(stats.successes, 4);
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.ai_enhanced, 2);
        assert_eq!(stats.fallbacks, 2);
    }

    #[test]
    fn success_rate() {
        let mut stats = OptimizerStats::default();
        assert_eq!(stats.success_rate(), None);
        stats.record(&aggregate());
        let rate = stats.success_rate().unwrap();
        assert!((rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn display_local_only() {
        let stats = OptimizerStats {
            requests: 1,
            platforms: 2,
            successes: 2,
            ..OptimizerStats::default()
        };
        assert_eq!(stats.to_string(), "1 requests, 2 platforms (2 ok, 0 failed)");
    }

    #[test]
    fn display_with_remote_work() {
        let mut stats = OptimizerStats::default();
        stats.record(&aggregate());
        assert_eq!(
            stats.to_string(),
            "1 requests, 3 platforms (2 ok, 1 failed), 1 ai, 1 fallback"
        );
    }
}
