//! # Omnishot
//!
//! Turn one photo into platform-compliant variants for every social and
//! professional network you care about, in a single request.
//!
//! # Architecture: Fan-Out Pipeline
//!
//! A request names a source image and a set of platform ids. The source is
//! validated and analysed once, a processing strategy is chosen once, and then
//! every platform runs as an independent task:
//!
//! ```text
//! 1. Validate   bytes + ids + style + custom box   →  OptimizeError on structural problems
//! 2. Analyse    decoded pixels                      →  ImageAnalysis + recommendations
//! 3. Select     budget + analysis + providers       →  ProcessingStrategy
//! 4. Fan out    one task per distinct platform id   →  [remote job] → local pipeline → score
//! 5. Fan in     join every task                     →  AggregateResult
//! ```
//!
//! Failures are isolated per platform: an unknown id, a provider outage or an
//! encoder error produces one failed (or fallback) entry and never affects the
//! other platforms in the same request.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`orchestrator`] | Request entry point: validation, fan-out/fan-in, worker pool, stats |
//! | [`platforms`] | Built-in platform registry (box, aspect, quality, size limit, format, styling) |
//! | [`dimensions`] | Custom width/height/aspect normalisation and validation |
//! | [`analysis`] | Pixel statistics and enhancement recommendations |
//! | [`strategy`] | Budget tier selection and the provider registry |
//! | [`prompt`] | Style catalogue and provider prompt construction |
//! | [`remote`] | Remote enhancement providers: bounded submit/poll client and HTTP wire protocol |
//! | [`imaging`] | Pure-Rust crop, colour, sharpen and size-bounded encode |
//! | [`quality`] | Heuristic output score |
//! | [`types`] | Request, per-platform and aggregate result types |
//! | [`stats`] | Process-wide counters |
//! | [`config`] | `omnishot.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Local Pipeline Always Runs
//!
//! Remote providers return "an enhanced image", not a platform-compliant one.
//! Their output is fed through the same crop/encode pipeline as the source, so
//! every successful entry is guaranteed to match its platform box, format and
//! size limit regardless of which path produced it.
//!
//! ## Bounded Polling
//!
//! Remote jobs are polled by an explicit state machine with a fixed attempt
//! ceiling and an overall task timeout. A provider that never finishes costs at
//! most `max_poll_attempts × poll_interval` before the platform falls back to
//! local processing.
//!
//! ## CPU Work Off the Runtime
//!
//! Decoding, resampling and encoding run on a dedicated rayon pool sized from
//! `[processing] max_workers`. The tokio runtime only drives network I/O and
//! timers, so slow encodes never delay a poll.
//!
//! ## No Globals
//!
//! Provider availability is decided once when the [`strategy::ProviderRegistry`]
//! is built from config and the environment. Counters live inside the
//! [`orchestrator::Orchestrator`]. Tests build as many independent instances as
//! they need.

pub mod analysis;
pub mod config;
pub mod dimensions;
pub mod imaging;
pub mod orchestrator;
pub mod output;
pub mod platforms;
pub mod prompt;
pub mod quality;
pub mod remote;
pub mod stats;
pub mod strategy;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
