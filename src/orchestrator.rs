//! Request orchestration: validate, analyse, select, fan out, fan in.
//!
//! ```text
//!              ┌──────────── per platform (tokio task) ────────────┐
//! request ─▶ validate ─▶ analyse ─▶ strategy ─┬─▶ [remote job] ─▶ local pipeline ─▶ score ─┐
//!                                             ├─▶ ...                                       ├─▶ join_all ─▶ AggregateResult
//!                                             └─▶ ...                                       ┘
//! ```
//!
//! Only structural problems with the request itself fail the whole call
//! ([`OptimizeError`]). Everything that goes wrong for one platform, from an
//! unknown id to an encoder error or a panic, becomes a failed
//! [`PlatformTaskResult`] for that platform alone.
//!
//! Pixel work (analysis, crop/encode, scoring) runs on a bounded rayon pool
//! ([`WorkerPool`]) so it never blocks the async runtime that drives remote
//! polling.

use crate::analysis::{self, LocalTuning};
use crate::config::{ProcessingConfig, ServiceConfig, StrategyConfig, effective_threads};
use crate::dimensions::{DimensionError, NormalizedDimensions, normalize};
use crate::imaging::{
    BackendError, EncodedImage, ImageBackend, OutputFormat, RustBackend, enhance_for_platform,
    get_dimensions,
};
use crate::platforms::{PlatformRegistry, PlatformSpec};
use crate::prompt::{Style, UnsupportedStyle, prompt_for};
use crate::quality;
use crate::remote::{EnhancementProvider, JobSpec, PollPolicy, RemoteClient, TerminalOutcome};
use crate::stats::OptimizerStats;
use crate::strategy::{self, ProcessingStrategy, ProviderRegistry};
use crate::types::{
    AggregateResult, EnhancementPath, OptimizationRequest, PlatformError, PlatformTaskResult,
};
use futures_util::future::join_all;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("no platforms requested")]
    NoPlatforms,
    #[error(transparent)]
    UnsupportedStyle(#[from] UnsupportedStyle),
    #[error("invalid custom dimensions: {0}")]
    InvalidDimensions(#[from] DimensionError),
    #[error("worker pool failure: {0}")]
    Worker(String),
}

// ============================================================================
// Worker pool
// ============================================================================

/// Bounded rayon pool for CPU-bound work, awaited from async code.
#[derive(Clone)]
pub struct WorkerPool {
    pool: Arc<rayon::ThreadPool>,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self, OptimizeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("omnishot-worker-{i}"))
            .panic_handler(|_| tracing::error!("worker job panicked"))
            .build()
            .map_err(|e| OptimizeError::Worker(e.to_string()))?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Pool sized from config, capped at the core count.
    pub fn from_config(config: &ProcessingConfig) -> Result<Self, OptimizeError> {
        Self::new(effective_threads(config))
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `job` on the pool and await its result.
    ///
    /// Fails if the job panicked before producing a value.
    pub async fn run<T, F>(&self, job: F) -> Result<T, OptimizeError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(move || {
            let _ = tx.send(job());
        });
        rx.await
            .map_err(|_| OptimizeError::Worker("job ended without a result".to_string()))
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Entry point for optimisation requests. Build once, share across requests.
pub struct Orchestrator {
    platforms: Arc<PlatformRegistry>,
    providers: ProviderRegistry,
    backend: Arc<dyn ImageBackend>,
    workers: WorkerPool,
    remote: RemoteClient,
    strategy_config: StrategyConfig,
    stats: Mutex<OptimizerStats>,
}

impl Orchestrator {
    pub fn new(
        config: &ServiceConfig,
        platforms: PlatformRegistry,
        providers: ProviderRegistry,
    ) -> Result<Self, OptimizeError> {
        Ok(Self {
            platforms: Arc::new(platforms),
            providers,
            backend: Arc::new(RustBackend::new()),
            workers: WorkerPool::from_config(&config.processing)?,
            remote: RemoteClient::new(PollPolicy::from(&config.remote)),
            strategy_config: config.strategy.clone(),
            stats: Mutex::new(OptimizerStats::default()),
        })
    }

    /// Built-in platforms and providers registered from config + environment.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, OptimizeError> {
        Self::new(
            config,
            PlatformRegistry::builtin(),
            ProviderRegistry::from_config(config),
        )
    }

    pub fn with_backend(mut self, backend: Arc<dyn ImageBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn platforms(&self) -> &PlatformRegistry {
        &self.platforms
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.workers
    }

    /// Snapshot of the process-wide counters.
    pub fn stats(&self) -> OptimizerStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Produce one result per distinct requested platform.
    pub async fn optimize(
        &self,
        request: OptimizationRequest,
    ) -> Result<AggregateResult, OptimizeError> {
        let started = Instant::now();

        // -- Validation --------------------------------------------------------
        if request.platforms.is_empty() {
            return Err(OptimizeError::NoPlatforms);
        }
        let style = Style::from_str(&request.style)?;
        let custom = request.custom_dimensions.as_ref().map(normalize).transpose()?;
        if request.image.is_empty() {
            return Err(OptimizeError::InvalidImage("empty image buffer".to_string()));
        }
        let (width, height) = get_dimensions(&*self.backend, &request.image)
            .map_err(|e| OptimizeError::InvalidImage(e.to_string()))?;

        let ids: BTreeSet<String> = request.platforms.iter().cloned().collect();
        tracing::info!(
            width,
            height,
            platforms = ids.len(),
            style = %style,
            budget = %request.budget,
            "optimization request"
        );

        // -- Analysis (once) ---------------------------------------------------
        let image = Arc::clone(&request.image);
        let analysis = {
            let image = Arc::clone(&image);
            self.workers
                .run(move || analysis::analyze(&image))
                .await?
                .map_err(|e| OptimizeError::InvalidImage(e.to_string()))?
        };

        // -- Prompts and strategy (once) ---------------------------------------
        let prompts: BTreeMap<String, String> = ids
            .iter()
            .filter_map(|id| self.platforms.lookup(id))
            .map(|spec| (spec.id.clone(), prompt_for(style, spec, &analysis)))
            .collect();

        let strategy = Arc::new(strategy::select(
            request.budget,
            ids.len(),
            &analysis,
            &self.providers,
            &self.strategy_config,
        ));
        let provider = strategy
            .provider
            .as_deref()
            .and_then(|id| self.providers.get(id));

        let ctx = Arc::new(TaskContext {
            mime_type: source_mime_type(&image),
            tuning: analysis.local_tuning(),
            image: Arc::clone(&image),
            strategy: Arc::clone(&strategy),
            provider,
            custom,
            platforms: Arc::clone(&self.platforms),
            backend: Arc::clone(&self.backend),
            workers: self.workers.clone(),
            remote: self.remote.clone(),
        });

        // -- Fan out -----------------------------------------------------------
        let (ids, handles): (Vec<String>, Vec<_>) = ids
            .into_iter()
            .map(|id| {
                let ctx = Arc::clone(&ctx);
                let prompt = prompts.get(&id).cloned();
                let task_id = id.clone();
                (id, tokio::spawn(async move { ctx.run_platform(task_id, prompt).await }))
            })
            .unzip();

        // -- Fan in ------------------------------------------------------------
        let per_platform: BTreeMap<String, PlatformTaskResult> = ids
            .into_iter()
            .zip(join_all(handles).await)
            .map(|(id, joined)| {
                let result = joined.unwrap_or_else(|e| {
                    tracing::error!(platform = %id, error = %e, "platform task aborted");
                    PlatformTaskResult::failed(
                        PlatformError::Internal(format!("platform task aborted: {e}")),
                        0,
                    )
                });
                (id, result)
            })
            .collect();

        let result = AggregateResult::assemble(
            per_platform,
            strategy.name,
            started.elapsed().as_millis() as u64,
            format!("{:x}", Sha256::digest(&*image)),
        );

        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(&result);

        tracing::info!(
            strategy = result.summary.strategy_name,
            successful = result.summary.successful,
            failed = result.summary.failed,
            total_time_ms = result.total_time_ms,
            "optimization complete"
        );
        Ok(result)
    }
}

fn source_mime_type(image: &[u8]) -> String {
    image::guess_format(image)
        .ok()
        .and_then(OutputFormat::from_image_format)
        .map(|f| f.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn fallback_reason(outcome: &TerminalOutcome) -> PlatformError {
    match outcome {
        TerminalOutcome::TimedOut => PlatformError::Timeout,
        other => PlatformError::Provider(other.reason()),
    }
}

// ============================================================================
// Per-platform task
// ============================================================================

/// Read-only state shared by every platform task of one request.
struct TaskContext {
    image: Arc<[u8]>,
    mime_type: String,
    strategy: Arc<ProcessingStrategy>,
    provider: Option<Arc<dyn EnhancementProvider>>,
    tuning: LocalTuning,
    custom: Option<NormalizedDimensions>,
    platforms: Arc<PlatformRegistry>,
    backend: Arc<dyn ImageBackend>,
    workers: WorkerPool,
    remote: RemoteClient,
}

impl TaskContext {
    async fn run_platform(&self, id: String, prompt: Option<String>) -> PlatformTaskResult {
        let started = Instant::now();
        let elapsed_ms = || started.elapsed().as_millis() as u64;

        let Some(base) = self.platforms.lookup(&id) else {
            tracing::warn!(platform = %id, "unsupported platform");
            return PlatformTaskResult::failed(PlatformError::UnsupportedPlatform(id), elapsed_ms());
        };
        let spec = match self.custom {
            Some(d) => base.with_dimensions(d.width, d.height, d.aspect_ratio),
            None => base.clone(),
        };

        let (mut source, mut path) = (Arc::clone(&self.image), EnhancementPath::Local);
        if let (true, Some(provider), Some(provider_id), Some(prompt)) = (
            self.strategy.include_ai,
            self.provider.as_ref(),
            self.strategy.provider.as_ref(),
            prompt,
        ) {
            let job = JobSpec {
                prompt,
                platform: id.clone(),
                image: Arc::clone(&self.image),
                mime_type: self.mime_type.clone(),
            };
            match self.remote.enhance(&job, Arc::clone(provider)).await {
                TerminalOutcome::Succeeded(bytes) => {
                    source = Arc::from(bytes);
                    path = EnhancementPath::Ai {
                        provider: provider_id.clone(),
                    };
                }
                outcome => {
                    let reason = fallback_reason(&outcome);
                    tracing::warn!(platform = %id, provider = %provider_id, %reason, "falling back to local enhancement");
                    path = EnhancementPath::LocalFallback {
                        provider: provider_id.clone(),
                        reason,
                    };
                }
            }
        }

        let mut finished = self.finish(&source, &spec, &path).await;

        // Remote output that will not decode is redone from the original.
        let unusable = match (&finished, &path) {
            (Err(e), EnhancementPath::Ai { provider }) => Some((provider.clone(), e.to_string())),
            _ => None,
        };
        if let Some((provider, error)) = unusable {
            tracing::warn!(platform = %id, %provider, %error, "remote output unusable, redoing locally");
            path = EnhancementPath::LocalFallback {
                provider,
                reason: PlatformError::Provider(format!("unusable output: {error}")),
            };
            source = Arc::clone(&self.image);
            finished = self.finish(&source, &spec, &path).await;
        }

        match finished {
            Ok((encoded, score)) => {
                tracing::info!(
                    platform = %id,
                    width = encoded.dimensions.width,
                    height = encoded.dimensions.height,
                    bytes = encoded.bytes.len(),
                    quality_score = score,
                    enhancement = %path,
                    "platform done"
                );
                PlatformTaskResult::succeeded(
                    encoded.bytes,
                    encoded.dimensions,
                    encoded.format,
                    score,
                    path,
                    elapsed_ms(),
                )
            }
            Err(e) => {
                tracing::warn!(platform = %id, error = %e, "platform failed");
                PlatformTaskResult::failed(e, elapsed_ms())
            }
        }
    }

    /// Local pipeline + scoring on the worker pool.
    async fn finish(
        &self,
        source: &Arc<[u8]>,
        spec: &PlatformSpec,
        path: &EnhancementPath,
    ) -> Result<(EncodedImage, u8), PlatformError> {
        let tuning = match path {
            EnhancementPath::Ai { .. } => None,
            _ => Some(self.tuning),
        };
        let backend = Arc::clone(&self.backend);
        let source = Arc::clone(source);
        let spec = spec.clone();

        let outcome = self
            .workers
            .run(move || -> Result<(EncodedImage, u8), BackendError> {
                let encoded = enhance_for_platform(&*backend, &source, &spec, tuning.as_ref())?;
                let score = quality::score(&encoded.bytes, &spec);
                Ok((encoded, score))
            })
            .await
            .map_err(|e| PlatformError::Internal(e.to_string()))?;

        outcome.map_err(|e| PlatformError::Encoding(e.to_string()))
    }
}
