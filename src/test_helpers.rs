//! Shared test utilities for the omnishot test suite.
//!
//! Provides synthetic source images built with the `image` crate and a
//! scripted [`EnhancementProvider`] for driving the remote state machine.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let source = gradient_jpeg(800, 600);
//! let provider = ScriptedProvider::stuck(ProviderStatus::Processing)
//!     .with_statuses(vec![Ok(ProviderStatus::Queued)]);
//! ```

use crate::remote::{EnhancementProvider, JobSpec, ProviderError, ProviderStatus};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

// =========================================================================
// Synthetic images
// =========================================================================

/// RGB image with a horizontal red ramp, vertical green ramp and fixed blue.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    }))
}

pub fn encode_image(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

pub fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode_image(&gradient_image(width, height), ImageFormat::Jpeg)
}

pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    encode_image(&gradient_image(width, height), ImageFormat::Png)
}

/// Uniform grey JPEG; useful for predictable analysis results.
pub fn solid_jpeg(width: u32, height: u32, value: u8) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value; 3])));
    encode_image(&img, ImageFormat::Jpeg)
}

// =========================================================================
// Scripted provider
// =========================================================================

/// Provider that replays queued responses, then repeats a fixed status.
///
/// Submissions succeed with `job-N` ids once the scripted submit queue is
/// empty. Call counters let tests assert how many requests were made.
pub struct ScriptedProvider {
    submits: Mutex<VecDeque<Result<String, ProviderError>>>,
    statuses: Mutex<VecDeque<Result<ProviderStatus, ProviderError>>>,
    idle: ProviderStatus,
    output: Result<Vec<u8>, ProviderError>,
    pub submit_calls: AtomicU32,
    pub status_calls: AtomicU32,
    pub fetch_calls: AtomicU32,
}

impl ScriptedProvider {
    /// A provider whose every status check returns `status`.
    pub fn stuck(status: ProviderStatus) -> Self {
        Self {
            submits: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            idle: status,
            output: Ok(Vec::new()),
            submit_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
        }
    }

    pub fn with_submits(self, submits: Vec<Result<String, ProviderError>>) -> Self {
        *self.submits.lock().unwrap() = submits.into();
        self
    }

    pub fn with_statuses(self, statuses: Vec<Result<ProviderStatus, ProviderError>>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn with_output(mut self, bytes: Vec<u8>) -> Self {
        self.output = Ok(bytes);
        self
    }

    pub fn with_output_error(mut self, error: ProviderError) -> Self {
        self.output = Err(error);
        self
    }
}

#[async_trait]
impl EnhancementProvider for ScriptedProvider {
    async fn submit(&self, _job: &JobSpec) -> Result<String, ProviderError> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("job-{n}")))
    }

    async fn status(&self, _job_id: &str) -> Result<ProviderStatus, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.idle.clone()))
    }

    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.output.clone()
    }
}
