//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: identify and enhance. All of them work on in-memory
//! byte buffers; nothing here touches the filesystem.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) — pure Rust, built on the
//! `image` crate.

use super::params::{EnhanceParams, OutputFormat, Quality};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// An encoded platform variant.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub dimensions: Dimensions,
    pub format: OutputFormat,
    /// Quality actually used (may be below the requested one after size fitting).
    pub quality: Quality,
}

/// Trait for image processing backends.
///
/// Every backend must implement both operations so the rest of the
/// codebase is backend-agnostic.
pub trait ImageBackend: Send + Sync {
    /// Get image dimensions without a full decode.
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError>;

    /// Produce one variant: cover-crop, colour pass, sharpen, encode.
    fn enhance(&self, source: &[u8], params: &EnhanceParams)
    -> Result<EncodedImage, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::{ColorAdjust, Sharpening};
    use std::sync::Mutex;

    /// Mock backend that records operations without executing them.
    /// Uses Mutex (not RefCell) so it is Sync and works across worker threads.
    #[derive(Default)]
    pub struct MockBackend {
        pub identify_results: Mutex<Vec<Dimensions>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(usize),
        Enhance {
            source_len: usize,
            width: u32,
            height: u32,
            quality: u32,
            format: OutputFormat,
            sharpening: Option<(f32, i32)>,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                identify_results: Mutex::new(dims),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(source.len()));

            self.identify_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::ProcessingFailed("No mock dimensions".to_string()))
        }

        fn enhance(
            &self,
            source: &[u8],
            params: &EnhanceParams,
        ) -> Result<EncodedImage, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Enhance {
                source_len: source.len(),
                width: params.width,
                height: params.height,
                quality: params.quality.value(),
                format: params.format,
                sharpening: params.sharpening.map(|s| (s.sigma, s.threshold)),
            });
            Ok(EncodedImage {
                bytes: vec![0; 16],
                dimensions: Dimensions {
                    width: params.width,
                    height: params.height,
                },
                format: params.format,
                quality: params.quality,
            })
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let result = backend.identify(&[1, 2, 3]).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Identify(3)]);
    }

    #[test]
    fn mock_identify_without_results_errors() {
        let backend = MockBackend::new();
        assert!(matches!(
            backend.identify(&[1]),
            Err(BackendError::ProcessingFailed(_))
        ));
    }

    #[test]
    fn mock_records_enhance_with_sharpening() {
        let backend = MockBackend::new();

        let out = backend
            .enhance(
                &[0; 8],
                &EnhanceParams {
                    width: 400,
                    height: 500,
                    color: ColorAdjust::IDENTITY,
                    sharpening: Some(Sharpening::light()),
                    format: OutputFormat::Jpeg,
                    quality: Quality::new(85),
                    max_file_size: None,
                },
            )
            .unwrap();
        assert_eq!(out.dimensions.width, 400);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Enhance {
                width: 400,
                height: 500,
                quality: 85,
                sharpening: Some((0.5, 0)),
                ..
            }
        ));
    }

    #[test]
    fn dimensions_pixel_count() {
        let d = Dimensions {
            width: 70_000,
            height: 70_000,
        };
        assert_eq!(d.pixels(), 4_900_000_000);
    }
}
