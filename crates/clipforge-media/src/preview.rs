//! Single-frame preview rendering.
//!
//! Renders the frame at the trim start through the same geometry and
//! compositor logic as a full job, skipping everything else. Preview
//! latency is therefore independent of video length. Idempotent; the
//! only side effect is one temp image, removed before returning.

use std::path::Path;
use tokio::fs;

use crate::command::FfmpegCommand;
use crate::compositor::{plan_filter, CompositeFilter};
use crate::error::MediaResult;
use crate::geometry::GeometryPlan;
use crate::transcoder::{RenderOptions, Transcoder};
use crate::trim::TrimDirective;
use clipforge_models::{ProcessingSpec, VideoAsset};

/// Render a one-frame PNG preview of the spec's geometry settings.
pub async fn generate_preview(
    transcoder: &dyn Transcoder,
    spec: &ProcessingSpec,
    asset: &VideoAsset,
    temp_root: &Path,
) -> MediaResult<Vec<u8>> {
    spec.check_consistency()?;

    // Frame position: the trim start when time cropping is requested
    let seek = match spec.time_range() {
        Some(range) => TrimDirective::resolve(range, asset.duration)?.start,
        None => 0.0,
    };

    let filter = match spec.ratio_change() {
        Some((ratio, method)) => {
            let plan = GeometryPlan::compute(asset.width, asset.height, ratio, method)?;
            plan_filter(&plan, spec.pad_color, spec.blur_options().as_ref())
        }
        None => CompositeFilter::Identity,
    };

    fs::create_dir_all(temp_root).await?;
    let dir = tempfile::Builder::new()
        .prefix("preview-")
        .tempdir_in(temp_root)?;
    let frame_path = dir.path().join("frame.png");

    let mut cmd = FfmpegCommand::new(&asset.path, &frame_path)
        .seek(seek)
        .single_frame();
    cmd = match filter {
        CompositeFilter::Identity => cmd,
        CompositeFilter::Chain(chain) => cmd.video_filter(chain),
        CompositeFilter::Graph {
            filter,
            output_label,
        } => cmd
            .filter_complex(filter)
            .map(format!("[{output_label}]")),
    };

    transcoder
        .render_frame(&cmd, &RenderOptions::default())
        .await?;

    let bytes = fs::read(&frame_path).await?;
    // TempDir drop removes the frame; nothing else to clean up
    Ok(bytes)
}
