//! Processing request specification.
//!
//! A [`ProcessingSpec`] is the fully-resolved description of one job:
//! every field enumerated and validated up front, immutable for the
//! job's lifetime. The HTTP layer deserializes straight into it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

use crate::quality::QualityPreset;
use crate::ratio::{AspectRatio, PadColor, ResizeMethod};
use crate::time_range::TimeRange;

/// Watermark anchor position on the output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl WatermarkPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatermarkPosition::TopLeft => "top-left",
            WatermarkPosition::TopRight => "top-right",
            WatermarkPosition::BottomLeft => "bottom-left",
            WatermarkPosition::BottomRight => "bottom-right",
            WatermarkPosition::Center => "center",
        }
    }
}

impl fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WatermarkPosition {
    type Err = WatermarkPositionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "top-left" => Ok(WatermarkPosition::TopLeft),
            "top-right" => Ok(WatermarkPosition::TopRight),
            "bottom-left" => Ok(WatermarkPosition::BottomLeft),
            "bottom-right" => Ok(WatermarkPosition::BottomRight),
            "center" => Ok(WatermarkPosition::Center),
            _ => Err(WatermarkPositionParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown watermark position: {0}")]
pub struct WatermarkPositionParseError(String);

/// Watermark overlay request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WatermarkSpec {
    /// Path to the watermark image (PNG with optional transparency)
    pub image_path: PathBuf,
    /// Anchor position on the canvas
    #[serde(default)]
    pub position: WatermarkPosition,
}

/// Solid-color padding options, used when blur is disabled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default)]
pub struct PadOptions {
    /// Fill color for the padding region
    pub color: PadColor,
}

/// Blurred-background padding options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Validate)]
pub struct BlurOptions {
    /// Blur strength; larger values produce a larger blur kernel
    #[validate(range(min = 1, max = 50))]
    pub strength: u8,
    /// Width of the alpha feather at the foreground edge, as a fraction
    /// of the padding band (0 = hard edge, 1 = full band)
    #[validate(range(min = 0.0, max = 1.0))]
    pub gradient_blend: f32,
}

impl Default for BlurOptions {
    fn default() -> Self {
        Self {
            strength: 25,
            gradient_blend: 0.3,
        }
    }
}

/// Complete declarative description of one processing job.
///
/// Field names follow the wire format supplied by the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ProcessingSpec {
    /// Trim to `[start_time, end_time]` before other stages
    #[serde(default)]
    pub enable_time_crop: bool,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,

    /// Convert to `target_ratio` using `resize_method`
    #[serde(default)]
    pub enable_ratio_change: bool,
    #[serde(default)]
    pub target_ratio: Option<AspectRatio>,
    #[serde(default)]
    pub resize_method: ResizeMethod,

    /// Fill color for Pad when blur is disabled
    #[serde(default)]
    pub pad_color: PadColor,

    /// Use a blurred copy of the source as the padding background
    #[serde(default)]
    pub blur_background: bool,
    #[serde(default = "default_blur_strength")]
    #[validate(range(min = 1, max = 50))]
    pub blur_strength: u8,
    #[serde(default = "default_gradient_blend")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub gradient_blend: f32,

    /// Append a call-to-action clip after the main video
    #[serde(default)]
    pub enable_cta: bool,
    #[serde(default)]
    pub cta_video_id: Option<String>,

    #[serde(default)]
    pub quality_preset: QualityPreset,

    /// Optional watermark overlay
    #[serde(default)]
    pub watermark_file: Option<PathBuf>,
    #[serde(default)]
    pub watermark_position: Option<WatermarkPosition>,
}

fn default_blur_strength() -> u8 {
    25
}
fn default_gradient_blend() -> f32 {
    0.3
}

impl Default for ProcessingSpec {
    fn default() -> Self {
        Self {
            enable_time_crop: false,
            start_time: None,
            end_time: None,
            enable_ratio_change: false,
            target_ratio: None,
            resize_method: ResizeMethod::default(),
            pad_color: PadColor::default(),
            blur_background: false,
            blur_strength: default_blur_strength(),
            gradient_blend: default_gradient_blend(),
            enable_cta: false,
            cta_video_id: None,
            quality_preset: QualityPreset::default(),
            watermark_file: None,
            watermark_position: None,
        }
    }
}

impl ProcessingSpec {
    /// The requested trim range, when time cropping is enabled and both
    /// endpoints were supplied.
    pub fn time_range(&self) -> Option<TimeRange> {
        if !self.enable_time_crop {
            return None;
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(TimeRange::new(start, end)),
            _ => None,
        }
    }

    /// The requested ratio conversion, when enabled.
    pub fn ratio_change(&self) -> Option<(AspectRatio, ResizeMethod)> {
        if !self.enable_ratio_change {
            return None;
        }
        self.target_ratio.map(|ratio| (ratio, self.resize_method))
    }

    /// Blur options, active only for the Pad method with blur requested.
    pub fn blur_options(&self) -> Option<BlurOptions> {
        if self.blur_background && self.resize_method == ResizeMethod::Pad {
            Some(BlurOptions {
                strength: self.blur_strength,
                gradient_blend: self.gradient_blend,
            })
        } else {
            None
        }
    }

    /// Watermark spec, when a watermark file was supplied.
    pub fn watermark(&self) -> Option<WatermarkSpec> {
        self.watermark_file.as_ref().map(|path| WatermarkSpec {
            image_path: path.clone(),
            position: self.watermark_position.unwrap_or_default(),
        })
    }

    /// Cross-field consistency checks that `Validate` ranges cannot express.
    pub fn check_consistency(&self) -> Result<(), SpecError> {
        if self.enable_time_crop {
            let (start, end) = match (self.start_time, self.end_time) {
                (Some(s), Some(e)) => (s, e),
                _ => return Err(SpecError::MissingTimeRange),
            };
            if start < 0.0 || start >= end {
                return Err(SpecError::InvalidTimeRange { start, end });
            }
        }

        if self.enable_ratio_change {
            let ratio = self.target_ratio.ok_or(SpecError::MissingTargetRatio)?;
            if ratio.is_degenerate() {
                return Err(SpecError::DegenerateRatio(ratio));
            }
        }

        if self.enable_cta && self.cta_video_id.is_none() {
            return Err(SpecError::MissingCtaVideo);
        }

        Ok(())
    }
}

/// Spec validation errors.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("Field validation failed: {0}")]
    Fields(#[from] validator::ValidationErrors),
    #[error("Time cropping enabled but start/end times not provided")]
    MissingTimeRange,
    #[error("Invalid time range: start={start}, end={end}")]
    InvalidTimeRange { start: f64, end: f64 },
    #[error("Ratio change enabled but no target ratio provided")]
    MissingTargetRatio,
    #[error("Target ratio has a zero dimension: {0}")]
    DegenerateRatio(AspectRatio),
    #[error("CTA append enabled but no CTA video id provided")]
    MissingCtaVideo,
}
