//! Probed video asset metadata.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata for an uploaded media asset, immutable once probed.
///
/// The file itself is owned by the storage layer; the pipeline only
/// references it and never mutates the underlying file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoAsset {
    /// Opaque asset identifier assigned by the storage layer
    pub id: String,
    /// Path to the underlying media file
    pub path: PathBuf,
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Whether the asset carries an audio stream
    pub has_audio: bool,
}

impl VideoAsset {
    /// Source aspect ratio as a decimal (width / height).
    pub fn aspect(&self) -> f64 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f64 / self.height as f64
    }

    /// Duration of a single frame in seconds.
    pub fn frame_interval(&self) -> f64 {
        if self.fps <= 0.0 {
            return 0.0;
        }
        1.0 / self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(width: u32, height: u32, fps: f64) -> VideoAsset {
        VideoAsset {
            id: "a1".into(),
            path: PathBuf::from("/tmp/a1.mp4"),
            duration: 30.0,
            width,
            height,
            fps,
            has_audio: true,
        }
    }

    #[test]
    fn test_aspect() {
        assert!((asset(1920, 1080, 30.0).aspect() - 16.0 / 9.0).abs() < 1e-9);
        assert!((asset(0, 0, 30.0).aspect() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_interval() {
        assert!((asset(1920, 1080, 25.0).frame_interval() - 0.04).abs() < 1e-9);
        assert_eq!(asset(1920, 1080, 0.0).frame_interval(), 0.0);
    }
}
