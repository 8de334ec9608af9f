#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper and transformation pipeline for ClipForge.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeout support via tokio
//! - Geometry planning and filter-graph compositing (crop/pad/stretch,
//!   blurred letterbox, watermark overlay)
//! - CTA clip harmonization and concatenation
//! - A job orchestrator with per-job temp arenas and all-or-nothing
//!   completion
//! - Single-frame preview rendering

pub mod arena;
pub mod command;
pub mod compositor;
pub mod concat;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod preview;
pub mod probe;
pub mod progress;
pub mod transcoder;
pub mod trim;
pub mod watermark;

pub use arena::{sweep_stale, JobArena};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use compositor::{plan_filter, CompositeFilter};
pub use error::{MediaError, MediaResult, PipelineError};
pub use geometry::{CropRect, GeometryPlan};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput};
pub use preview::generate_preview;
pub use probe::probe_video;
pub use progress::{FfmpegProgress, ProgressCallback};
pub use transcoder::{FfmpegTranscoder, RenderOptions, Transcoder};
pub use trim::TrimDirective;
