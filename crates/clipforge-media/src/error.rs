//! Error types for media operations.

use clipforge_models::{AspectRatio, Stage};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Probe failed: {message}")]
    ProbeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Invalid time range [{start}, {end}] for duration {duration}")]
    InvalidTimeRange {
        start: f64,
        end: f64,
        duration: f64,
    },

    #[error("Unsupported target ratio: {0}")]
    UnsupportedRatio(AspectRatio),

    #[error("Incompatible CTA asset {id}: {reason}")]
    IncompatibleAsset { id: String, reason: String },

    #[error("Encoding failed: {message}")]
    EncodingFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Resource exhausted: {0}")]
    Resource(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid processing spec: {0}")]
    Spec(#[from] clipforge_models::spec::SpecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a probe failure error.
    pub fn probe_failed(message: impl Into<String>, stderr: Option<String>) -> Self {
        Self::ProbeFailed {
            message: message.into(),
            stderr,
        }
    }

    /// Create an encoding failure error.
    pub fn encoding_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EncodingFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an incompatible-asset error.
    pub fn incompatible(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IncompatibleAsset {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a resource exhaustion error.
    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource(message.into())
    }

    /// Whether the error was raised before any engine invocation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MediaError::InvalidTimeRange { .. }
                | MediaError::UnsupportedRatio(_)
                | MediaError::Spec(_)
        )
    }
}

/// A pipeline failure, carrying the stage that failed and the cause.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    /// Stage that was executing when the failure occurred
    pub stage: Stage,
    /// Underlying cause
    #[source]
    pub source: MediaError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: MediaError) -> Self {
        Self { stage, source }
    }
}

/// Extension for attaching a stage to a `MediaResult`.
pub trait StageResultExt<T> {
    fn at_stage(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T> StageResultExt<T> for MediaResult<T> {
    fn at_stage(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|source| PipelineError::new(stage, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::new(
            Stage::Encoding,
            MediaError::encoding_failed("FFmpeg exited with non-zero status", None, Some(1)),
        );
        let msg = err.to_string();
        assert!(msg.contains("encoding stage failed"));
        assert!(msg.contains("non-zero status"));
    }

    #[test]
    fn test_validation_classification() {
        assert!(MediaError::InvalidTimeRange {
            start: 0.0,
            end: 10.0,
            duration: 5.0
        }
        .is_validation());
        assert!(MediaError::UnsupportedRatio(AspectRatio::new(9, 16)).is_validation());
        assert!(!MediaError::Timeout(30).is_validation());
    }
}
