//! Aspect ratio, resize method and pad color definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tolerance below which two aspect ratios are treated as equal.
pub const RATIO_EPSILON: f64 = 1e-2;

/// Target aspect ratio specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Standard portrait (9:16) for short-form vertical video
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    /// Standard landscape (16:9)
    pub const LANDSCAPE: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };

    /// Square (1:1)
    pub const SQUARE: AspectRatio = AspectRatio {
        width: 1,
        height: 1,
    };

    /// Create a new aspect ratio.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the aspect ratio as a decimal.
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Whether either dimension is zero (unusable as a target).
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether this ratio matches a decimal ratio within [`RATIO_EPSILON`].
    pub fn matches(&self, other: f64) -> bool {
        (self.as_f64() - other).abs() <= RATIO_EPSILON
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 {
            return Err(AspectRatioParseError::InvalidFormat(s.to_string()));
        }

        let width = parts[0]
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[0].to_string()))?;
        let height = parts[1]
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[1].to_string()))?;

        if width == 0 || height == 0 {
            return Err(AspectRatioParseError::ZeroValue);
        }

        Ok(AspectRatio { width, height })
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT
    }
}

#[derive(Debug, Error)]
pub enum AspectRatioParseError {
    #[error("Invalid aspect ratio format: {0}, expected 'W:H'")]
    InvalidFormat(String),
    #[error("Invalid number in aspect ratio: {0}")]
    InvalidNumber(String),
    #[error("Aspect ratio cannot have zero values")]
    ZeroValue,
}

/// Method used to fit a source into a differently-shaped target canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMethod {
    /// Crop content to the target ratio (center anchored)
    #[default]
    Crop,
    /// Letterbox/pillarbox to the target ratio
    Pad,
    /// Stretch each axis independently (may distort)
    Stretch,
}

impl ResizeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeMethod::Crop => "crop",
            ResizeMethod::Pad => "pad",
            ResizeMethod::Stretch => "stretch",
        }
    }
}

impl fmt::Display for ResizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResizeMethod {
    type Err = ResizeMethodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crop" => Ok(ResizeMethod::Crop),
            "pad" => Ok(ResizeMethod::Pad),
            "stretch" => Ok(ResizeMethod::Stretch),
            _ => Err(ResizeMethodParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown resize method: {0}")]
pub struct ResizeMethodParseError(String);

/// RGB padding color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PadColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PadColor {
    pub const BLACK: PadColor = PadColor { r: 0, g: 0, b: 0 };
    pub const WHITE: PadColor = PadColor {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Render in FFmpeg color syntax ("0xRRGGBB").
    pub fn to_ffmpeg(&self) -> String {
        format!("0x{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Default for PadColor {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for PadColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for PadColor {
    type Err = PadColorParseError;

    /// Parse "#RRGGBB" (leading '#' optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PadColorParseError(s.to_string()));
        }

        let r = u8::from_str_radix(&hex[0..2], 16).map_err(|_| PadColorParseError(s.to_string()))?;
        let g = u8::from_str_radix(&hex[2..4], 16).map_err(|_| PadColorParseError(s.to_string()))?;
        let b = u8::from_str_radix(&hex[4..6], 16).map_err(|_| PadColorParseError(s.to_string()))?;

        Ok(PadColor { r, g, b })
    }
}

#[derive(Debug, Error)]
#[error("Invalid pad color: {0}, expected '#RRGGBB'")]
pub struct PadColorParseError(String);
