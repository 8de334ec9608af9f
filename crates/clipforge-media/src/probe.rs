//! FFprobe asset inspection.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};
use clipforge_models::VideoAsset;

/// Container formats the pipeline accepts as input.
const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv"];

/// FFprobe JSON output format.
#[derive(Debug, serde::Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, serde::Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a media file, producing immutable [`VideoAsset`] metadata.
///
/// A missing audio stream is reported as `has_audio = false`, never as a
/// failure. Fails when the file is unreadable, carries no video stream,
/// or has a non-positive duration.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoAsset> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    check_extension(path)?;

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::probe_failed(
            format!("FFprobe failed for {}", path.display()),
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    if probe.streams.is_empty() {
        return Err(MediaError::probe_failed(
            format!("No streams found in {}", path.display()),
            None,
        ));
    }

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| {
            MediaError::probe_failed(format!("No video stream in {}", path.display()), None)
        })?;

    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    // Duration from the video stream, falling back to the container format
    let duration = video_stream
        .duration
        .as_ref()
        .or(probe.format.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    if duration <= 0.0 {
        return Err(MediaError::probe_failed(
            format!("Non-positive duration for {}", path.display()),
            None,
        ));
    }

    let width = video_stream.width.unwrap_or(0);
    let height = video_stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(MediaError::probe_failed(
            format!("Missing video dimensions for {}", path.display()),
            None,
        ));
    }

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(30.0);

    Ok(VideoAsset {
        id: Uuid::new_v4().simple().to_string(),
        path: path.to_path_buf(),
        duration,
        width,
        height,
        fps,
        has_audio,
    })
}

/// Reject containers the pipeline does not accept.
fn check_extension(path: &Path) -> MediaResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(MediaError::UnsupportedFormat(format!(
            ".{} ({})",
            ext,
            path.display()
        )))
    }
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
    }
    s.parse().ok()
}
