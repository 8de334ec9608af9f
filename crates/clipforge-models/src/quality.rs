//! Quality presets and encoder configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Pixel format carried on every encode for player compatibility
pub const DEFAULT_PIX_FMT: &str = "yuv420p";

/// Preview/thumbnail render settings
pub const PREVIEW_SCALE_WIDTH: u32 = 480;

/// Quality preset selecting a fixed set of encoder parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    /// CRF 0, veryslow preset
    Lossless,
    /// CRF 18, slow preset
    #[default]
    High,
    /// CRF 23, medium preset
    Medium,
    /// CRF 28, fast preset
    Low,
}

impl QualityPreset {
    pub const ALL: &'static [QualityPreset] = &[
        QualityPreset::Lossless,
        QualityPreset::High,
        QualityPreset::Medium,
        QualityPreset::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Lossless => "lossless",
            QualityPreset::High => "high",
            QualityPreset::Medium => "medium",
            QualityPreset::Low => "low",
        }
    }

    /// Resolve the preset to concrete encoder parameters.
    pub fn resolve(&self) -> EncodingConfig {
        match self {
            QualityPreset::Lossless => EncodingConfig {
                crf: 0,
                preset: "veryslow".to_string(),
                audio_bitrate: "320k".to_string(),
                ..Default::default()
            },
            QualityPreset::High => EncodingConfig {
                crf: 18,
                preset: "slow".to_string(),
                audio_bitrate: "192k".to_string(),
                ..Default::default()
            },
            QualityPreset::Medium => EncodingConfig {
                crf: 23,
                preset: "medium".to_string(),
                audio_bitrate: "128k".to_string(),
                ..Default::default()
            },
            QualityPreset::Low => EncodingConfig {
                crf: 28,
                preset: "fast".to_string(),
                audio_bitrate: "96k".to_string(),
                ..Default::default()
            },
        }
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QualityPreset {
    type Err = QualityPresetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lossless" => Ok(QualityPreset::Lossless),
            "high" => Ok(QualityPreset::High),
            "medium" => Ok(QualityPreset::Medium),
            "low" => Ok(QualityPreset::Low),
            _ => Err(QualityPresetParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown quality preset: {0}")]
pub struct QualityPresetParseError(String);

/// Concrete encoder parameters.
///
/// Output format is fixed to H.264 + AAC in yuv420p so the result plays
/// everywhere regardless of the source container.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoder effort preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    "medium".to_string()
}
fn default_crf() -> u8 {
    23
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    "128k".to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: default_preset(),
            crf: default_crf(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            DEFAULT_PIX_FMT.to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ];

        args.extend(self.extra_args.clone());

        args
    }
}
