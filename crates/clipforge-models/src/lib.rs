//! Shared data models for the ClipForge pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Processing specifications and their component options
//! - Video assets and aspect ratios
//! - Quality presets and encoder configuration
//! - Jobs and pipeline stages

pub mod asset;
pub mod job;
pub mod quality;
pub mod ratio;
pub mod spec;
pub mod time_range;

// Re-export common types
pub use asset::VideoAsset;
pub use job::{Job, JobStatus, Stage};
pub use quality::{EncodingConfig, QualityPreset};
pub use ratio::{AspectRatio, PadColor, ResizeMethod, RATIO_EPSILON};
pub use spec::{BlurOptions, PadOptions, ProcessingSpec, WatermarkPosition, WatermarkSpec};
pub use time_range::TimeRange;
