//! Narrow capability interface over the external media engine.
//!
//! The orchestrator only ever talks to a [`Transcoder`]; the production
//! implementation shells out to FFmpeg, and tests substitute a double.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::watch;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe;
use clipforge_models::VideoAsset;

/// Per-invocation runtime options.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Hard timeout for the engine invocation
    pub timeout_secs: Option<u64>,
    /// Cancellation signal; flipping it to `true` kills the invocation
    pub cancel: Option<watch::Receiver<bool>>,
}

/// The external engine capability surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Inspect a media file.
    async fn probe(&self, path: &Path) -> MediaResult<VideoAsset>;

    /// Render a single frame (previews, thumbnails).
    async fn render_frame(&self, cmd: &FfmpegCommand, options: &RenderOptions) -> MediaResult<()>;

    /// Render a full stream.
    async fn render_stream(&self, cmd: &FfmpegCommand, options: &RenderOptions) -> MediaResult<()>;
}

/// Production transcoder shelling out to ffmpeg/ffprobe.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegTranscoder;

impl FfmpegTranscoder {
    fn runner(options: &RenderOptions) -> FfmpegRunner {
        let mut runner = FfmpegRunner::new();
        if let Some(secs) = options.timeout_secs {
            runner = runner.with_timeout(secs);
        }
        if let Some(cancel) = &options.cancel {
            runner = runner.with_cancel(cancel.clone());
        }
        runner
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn probe(&self, path: &Path) -> MediaResult<VideoAsset> {
        probe::probe_video(path).await
    }

    async fn render_frame(&self, cmd: &FfmpegCommand, options: &RenderOptions) -> MediaResult<()> {
        Self::runner(options).run(cmd).await
    }

    async fn render_stream(&self, cmd: &FfmpegCommand, options: &RenderOptions) -> MediaResult<()> {
        Self::runner(options).run(cmd).await
    }
}
