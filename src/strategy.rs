//! Processing tier selection.
//!
//! One [`ProcessingStrategy`] is chosen per request and shared read-only by
//! every platform task.
//!
//! | Budget | Condition | Strategy |
//! |---|---|---|
//! | basic | always | `local_only` |
//! | standard | eligible provider and (platforms ≤ limit or high-priority fix) | `ai_standard` |
//! | standard | otherwise | `local_balanced` |
//! | premium | eligible provider | `ai_premium` |
//! | premium | no provider | `local_only` |
//!
//! Providers come from a [`ProviderRegistry`] built once at startup. Among
//! eligible providers the highest `priority` wins, ties broken by id.

use crate::analysis::ImageAnalysis;
use crate::config::{ServiceConfig, StrategyConfig};
use crate::remote::{EnhancementProvider, HttpProvider};
use crate::types::BudgetTier;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const LOCAL_ONLY: &str = "local_only";
pub const LOCAL_BALANCED: &str = "local_balanced";
pub const AI_STANDARD: &str = "ai_standard";
pub const AI_PREMIUM: &str = "ai_premium";

/// The tier chosen for one request. Never mutated after selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingStrategy {
    pub name: &'static str,
    pub include_ai: bool,
    pub provider: Option<String>,
}

impl ProcessingStrategy {
    fn local(name: &'static str) -> Self {
        Self {
            name,
            include_ai: false,
            provider: None,
        }
    }

    fn ai(name: &'static str, provider: &str) -> Self {
        Self {
            name,
            include_ai: true,
            provider: Some(provider.to_string()),
        }
    }
}

/// A provider admitted to the registry.
#[derive(Clone)]
pub struct RegisteredProvider {
    pub id: String,
    pub priority: i32,
    pub min_budget: BudgetTier,
    pub provider: Arc<dyn EnhancementProvider>,
}

/// Providers available for this process, best first.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    entries: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build HTTP providers from config, reading credentials from the
    /// process environment.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::from_config_with_env(config, |name| std::env::var(name).ok())
    }

    /// As [`from_config`](Self::from_config) with an injectable env lookup.
    pub fn from_config_with_env(
        config: &ServiceConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let timeout = Duration::from_secs(config.remote.request_timeout_secs);
        let mut registry = Self::new();

        for (id, provider) in &config.providers {
            if !provider.enabled {
                tracing::debug!(provider = %id, "provider disabled");
                continue;
            }
            let Some(api_key) = env(&provider.api_key_env).filter(|k| !k.is_empty()) else {
                tracing::debug!(provider = %id, env = %provider.api_key_env, "provider credential not set");
                continue;
            };
            match HttpProvider::new(id.clone(), &provider.base_url, api_key, timeout) {
                Ok(http) => {
                    tracing::info!(provider = %id, priority = provider.priority, min_budget = %provider.min_budget, "provider registered");
                    registry.register(id, provider.priority, provider.min_budget, Arc::new(http));
                }
                Err(e) => tracing::warn!(provider = %id, error = %e, "provider skipped"),
            }
        }
        registry
    }

    /// Add or replace a provider.
    pub fn register(
        &mut self,
        id: &str,
        priority: i32,
        min_budget: BudgetTier,
        provider: Arc<dyn EnhancementProvider>,
    ) {
        self.entries.retain(|e| e.id != id);
        self.entries.push(RegisteredProvider {
            id: id.to_string(),
            priority,
            min_budget,
            provider,
        });
        self.entries
            .sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
    }

    pub fn with_provider(
        mut self,
        id: &str,
        priority: i32,
        min_budget: BudgetTier,
        provider: Arc<dyn EnhancementProvider>,
    ) -> Self {
        self.register(id, priority, min_budget, provider);
        self
    }

    /// Highest-preference provider usable at `budget`.
    pub fn best_for(&self, budget: BudgetTier) -> Option<&RegisteredProvider> {
        self.entries.iter().find(|e| e.min_budget <= budget)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn EnhancementProvider>> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| Arc::clone(&e.provider))
    }

    /// Registered ids in preference order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Choose the processing tier for one request.
pub fn select(
    budget: BudgetTier,
    platform_count: usize,
    analysis: &ImageAnalysis,
    providers: &ProviderRegistry,
    config: &StrategyConfig,
) -> ProcessingStrategy {
    let strategy = match budget {
        BudgetTier::Basic => ProcessingStrategy::local(LOCAL_ONLY),
        BudgetTier::Standard => match providers.best_for(BudgetTier::Standard) {
            Some(p)
                if platform_count <= config.standard_ai_platform_limit
                    || analysis.has_high_priority() =>
            {
                ProcessingStrategy::ai(AI_STANDARD, &p.id)
            }
            _ => ProcessingStrategy::local(LOCAL_BALANCED),
        },
        BudgetTier::Premium => match providers.best_for(BudgetTier::Premium) {
            Some(p) => ProcessingStrategy::ai(AI_PREMIUM, &p.id),
            None => ProcessingStrategy::local(LOCAL_ONLY),
        },
    };
    tracing::debug!(%budget, platform_count, strategy = strategy.name, provider = ?strategy.provider, "strategy selected");
    strategy
}
