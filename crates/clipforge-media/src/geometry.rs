//! Geometry planning for aspect-ratio conversion.
//!
//! Computes the crop window, pad bands or scale factors needed to take a
//! source frame to a target aspect ratio. All emitted dimensions are
//! rounded to the nearest even integer (encoder constraint); even
//! rounding shifts a dimension by at most one pixel.

use crate::error::{MediaError, MediaResult};
use clipforge_models::{AspectRatio, ResizeMethod, RATIO_EPSILON};

/// Longest canvas side allowed before the plan is scaled down.
pub const DEFAULT_MAX_DIMENSION: u32 = 2160;

/// Centered crop window in source coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// Resolved geometry for one job, consumed by the compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryPlan {
    pub method: ResizeMethod,
    pub source_width: u32,
    pub source_height: u32,
    /// Output canvas, always even in both dimensions
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Crop window (Crop method only)
    pub crop: Option<CropRect>,
    /// Foreground dimensions after scaling, centered on the canvas
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub pad_left: u32,
    pub pad_right: u32,
    pub pad_top: u32,
    pub pad_bottom: u32,
}

impl GeometryPlan {
    /// Compute a plan with the default canvas size cap.
    pub fn compute(
        src_width: u32,
        src_height: u32,
        target: AspectRatio,
        method: ResizeMethod,
    ) -> MediaResult<Self> {
        Self::compute_with_max(src_width, src_height, target, method, DEFAULT_MAX_DIMENSION)
    }

    /// Compute a plan, capping the longest canvas side at `max_dimension`.
    pub fn compute_with_max(
        src_width: u32,
        src_height: u32,
        target: AspectRatio,
        method: ResizeMethod,
        max_dimension: u32,
    ) -> MediaResult<Self> {
        if target.is_degenerate() {
            return Err(MediaError::UnsupportedRatio(target));
        }
        if src_width == 0 || src_height == 0 {
            return Err(MediaError::probe_failed(
                format!("Source has degenerate dimensions {}x{}", src_width, src_height),
                None,
            ));
        }

        let source_ratio = src_width as f64 / src_height as f64;
        let target_ratio = target.as_f64();

        match method {
            ResizeMethod::Crop => Ok(Self::plan_crop(
                src_width,
                src_height,
                source_ratio,
                target_ratio,
            )),
            ResizeMethod::Pad => Ok(Self::plan_pad(
                src_width,
                src_height,
                source_ratio,
                target_ratio,
                max_dimension,
            )),
            ResizeMethod::Stretch => Ok(Self::plan_stretch(
                src_width,
                src_height,
                target,
                max_dimension,
            )),
        }
    }

    fn plan_crop(
        src_width: u32,
        src_height: u32,
        source_ratio: f64,
        target_ratio: f64,
    ) -> Self {
        let (crop, canvas_width, canvas_height) =
            if (source_ratio - target_ratio).abs() <= RATIO_EPSILON {
                // Ratios already match: no crop, just enforce even dims
                (None, round_even(src_width as f64), round_even(src_height as f64))
            } else if source_ratio > target_ratio {
                // Source too wide: crop width, centered horizontally
                let crop_width = round_even(src_height as f64 * target_ratio).min(src_width);
                let crop_height = round_even(src_height as f64);
                let rect = CropRect {
                    width: crop_width,
                    height: crop_height,
                    x: (src_width - crop_width) / 2,
                    y: 0,
                };
                (Some(rect), crop_width, crop_height)
            } else {
                // Source too tall: crop height, centered vertically
                let crop_width = round_even(src_width as f64);
                let crop_height = round_even(src_width as f64 / target_ratio).min(src_height);
                let rect = CropRect {
                    width: crop_width,
                    height: crop_height,
                    x: 0,
                    y: (src_height - crop_height) / 2,
                };
                (Some(rect), crop_width, crop_height)
            };

        Self {
            method: ResizeMethod::Crop,
            source_width: src_width,
            source_height: src_height,
            canvas_width,
            canvas_height,
            crop,
            scaled_width: canvas_width,
            scaled_height: canvas_height,
            pad_left: 0,
            pad_right: 0,
            pad_top: 0,
            pad_bottom: 0,
        }
    }

    fn plan_pad(
        src_width: u32,
        src_height: u32,
        source_ratio: f64,
        target_ratio: f64,
        max_dimension: u32,
    ) -> Self {
        if (source_ratio - target_ratio).abs() <= RATIO_EPSILON {
            // Nothing to pad; degenerate to an even-dimension passthrough
            let canvas_width = round_even(src_width as f64);
            let canvas_height = round_even(src_height as f64);
            return Self {
                method: ResizeMethod::Pad,
                source_width: src_width,
                source_height: src_height,
                canvas_width,
                canvas_height,
                crop: None,
                scaled_width: canvas_width,
                scaled_height: canvas_height,
                pad_left: 0,
                pad_right: 0,
                pad_top: 0,
                pad_bottom: 0,
            };
        }

        let (canvas_width, canvas_height) =
            canvas_for_ratio(src_width, src_height, target_ratio, max_dimension);

        // Scale source to fit entirely within the canvas, preserving aspect
        let scale = (canvas_width as f64 / src_width as f64)
            .min(canvas_height as f64 / src_height as f64);
        let scaled_width = round_even(src_width as f64 * scale).min(canvas_width);
        let scaled_height = round_even(src_height as f64 * scale).min(canvas_height);

        let band_x = canvas_width - scaled_width;
        let band_y = canvas_height - scaled_height;
        let pad_left = band_x / 2;
        let pad_top = band_y / 2;

        Self {
            method: ResizeMethod::Pad,
            source_width: src_width,
            source_height: src_height,
            canvas_width,
            canvas_height,
            crop: None,
            scaled_width,
            scaled_height,
            pad_left,
            pad_right: band_x - pad_left,
            pad_top,
            pad_bottom: band_y - pad_top,
        }
    }

    fn plan_stretch(
        src_width: u32,
        src_height: u32,
        target: AspectRatio,
        max_dimension: u32,
    ) -> Self {
        let (canvas_width, canvas_height) =
            canvas_for_ratio(src_width, src_height, target.as_f64(), max_dimension);

        Self {
            method: ResizeMethod::Stretch,
            source_width: src_width,
            source_height: src_height,
            canvas_width,
            canvas_height,
            crop: None,
            scaled_width: canvas_width,
            scaled_height: canvas_height,
            pad_left: 0,
            pad_right: 0,
            pad_top: 0,
            pad_bottom: 0,
        }
    }

    /// Independent horizontal scale factor (Stretch).
    pub fn scale_x(&self) -> f64 {
        self.canvas_width as f64 / self.source_width as f64
    }

    /// Independent vertical scale factor (Stretch).
    pub fn scale_y(&self) -> f64 {
        self.canvas_height as f64 / self.source_height as f64
    }

    /// Width of the padding band on its constrained axis.
    pub fn pad_band(&self) -> u32 {
        (self.pad_left + self.pad_right).max(self.pad_top + self.pad_bottom) / 2
    }

    /// Whether any padding is present.
    pub fn has_padding(&self) -> bool {
        self.pad_left + self.pad_right + self.pad_top + self.pad_bottom > 0
    }

    /// Whether the plan changes nothing about the frame.
    pub fn is_identity(&self) -> bool {
        self.crop.is_none()
            && !self.has_padding()
            && self.canvas_width == self.source_width
            && self.canvas_height == self.source_height
            && self.scaled_width == self.canvas_width
            && self.scaled_height == self.canvas_height
    }
}

/// Round to the nearest even integer.
fn round_even(v: f64) -> u32 {
    (((v / 2.0).round() as u32) * 2).max(2)
}

/// Derive a canvas of the given ratio whose longest side matches the
/// source's longest side, capped at `max_dimension`.
fn canvas_for_ratio(
    src_width: u32,
    src_height: u32,
    target_ratio: f64,
    max_dimension: u32,
) -> (u32, u32) {
    let long_side = src_width.max(src_height).min(max_dimension.max(2)) as f64;

    if target_ratio >= 1.0 {
        let width = round_even(long_side);
        let height = round_even(long_side / target_ratio);
        (width, height)
    } else {
        let height = round_even(long_side);
        let width = round_even(long_side * target_ratio);
        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORTRAIT: AspectRatio = AspectRatio::PORTRAIT;

    #[test]
    fn test_crop_1080p_to_portrait() {
        let plan = GeometryPlan::compute(1920, 1080, PORTRAIT, ResizeMethod::Crop).unwrap();

        let crop = plan.crop.unwrap();
        assert_eq!(crop.width, 608);
        assert_eq!(crop.height, 1080);
        assert_eq!(crop.x, 656);
        assert_eq!(crop.y, 0);
        assert_eq!((plan.canvas_width, plan.canvas_height), (608, 1080));
        assert!(!plan.has_padding());
    }

    #[test]
    fn test_crop_portrait_to_landscape() {
        let plan =
            GeometryPlan::compute(1080, 1920, AspectRatio::LANDSCAPE, ResizeMethod::Crop).unwrap();

        let crop = plan.crop.unwrap();
        assert_eq!(crop.width, 1080);
        assert_eq!(crop.height, 608);
        assert_eq!(crop.y, (1920 - 608) / 2);
    }

    #[test]
    fn test_crop_matching_ratio_is_noop() {
        let plan =
            GeometryPlan::compute(1920, 1080, AspectRatio::LANDSCAPE, ResizeMethod::Crop).unwrap();
        assert!(plan.crop.is_none());
        assert!(plan.is_identity());
    }

    #[test]
    fn test_crop_ratio_within_tolerance() {
        // 1 pixel off 16:9; within epsilon so no crop
        let plan =
            GeometryPlan::compute(1918, 1080, AspectRatio::LANDSCAPE, ResizeMethod::Crop).unwrap();
        assert!(plan.crop.is_none());
    }

    #[test]
    fn test_pad_1080p_to_portrait() {
        let plan = GeometryPlan::compute(1920, 1080, PORTRAIT, ResizeMethod::Pad).unwrap();

        assert_eq!((plan.canvas_width, plan.canvas_height), (1080, 1920));
        assert_eq!((plan.scaled_width, plan.scaled_height), (1080, 608));
        assert_eq!(plan.pad_left + plan.pad_right, 0);
        assert_eq!(plan.pad_top + plan.pad_bottom, 1920 - 608);
        // Centered within one pixel
        assert!(plan.pad_top.abs_diff(plan.pad_bottom) <= 1);
    }

    #[test]
    fn test_pad_matching_ratio_is_noop() {
        let plan = GeometryPlan::compute(1080, 1920, PORTRAIT, ResizeMethod::Pad).unwrap();
        assert!(!plan.has_padding());
        assert!(plan.is_identity());
    }

    #[test]
    fn test_pad_canvas_ratio_matches_target() {
        for (sw, sh) in [(1920, 1080), (1280, 720), (640, 480), (3840, 2160)] {
            let plan = GeometryPlan::compute(sw, sh, PORTRAIT, ResizeMethod::Pad).unwrap();
            let canvas_ratio = plan.canvas_width as f64 / plan.canvas_height as f64;
            assert!(
                (canvas_ratio - PORTRAIT.as_f64()).abs() < 2.0 / plan.canvas_height as f64,
                "canvas {}x{} off target ratio",
                plan.canvas_width,
                plan.canvas_height
            );
            assert_eq!(plan.canvas_width % 2, 0);
            assert_eq!(plan.canvas_height % 2, 0);
        }
    }

    #[test]
    fn test_pad_caps_long_side() {
        let plan =
            GeometryPlan::compute_with_max(3840, 2160, PORTRAIT, ResizeMethod::Pad, 2160).unwrap();
        assert!(plan.canvas_width.max(plan.canvas_height) <= 2160);
    }

    #[test]
    fn test_stretch_scale_factors() {
        let plan = GeometryPlan::compute(1920, 1080, PORTRAIT, ResizeMethod::Stretch).unwrap();

        assert_eq!((plan.canvas_width, plan.canvas_height), (1080, 1920));
        assert!(plan.crop.is_none());
        assert!(!plan.has_padding());
        assert!((plan.scale_x() - 1080.0 / 1920.0).abs() < 1e-9);
        assert!((plan.scale_y() - 1920.0 / 1080.0).abs() < 1e-9);
    }

    #[test]
    fn test_even_dimensions_everywhere() {
        for (sw, sh) in [(1919, 1079), (853, 481), (1921, 1081)] {
            for method in [ResizeMethod::Crop, ResizeMethod::Pad, ResizeMethod::Stretch] {
                let plan = GeometryPlan::compute(sw, sh, PORTRAIT, method).unwrap();
                assert_eq!(plan.canvas_width % 2, 0, "{}x{} {:?}", sw, sh, method);
                assert_eq!(plan.canvas_height % 2, 0);
                assert_eq!(plan.scaled_width % 2, 0);
                assert_eq!(plan.scaled_height % 2, 0);
            }
        }
    }

    #[test]
    fn test_degenerate_target_rejected() {
        let err = GeometryPlan::compute(1920, 1080, AspectRatio::new(0, 16), ResizeMethod::Crop)
            .unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedRatio(_)));
    }

    #[test]
    fn test_pad_band() {
        let plan = GeometryPlan::compute(1920, 1080, PORTRAIT, ResizeMethod::Pad).unwrap();
        assert_eq!(plan.pad_band(), (1920 - 608) / 2);
    }

    #[test]
    fn test_round_even() {
        assert_eq!(round_even(607.5), 608);
        assert_eq!(round_even(1080.0), 1080);
        assert_eq!(round_even(1081.0), 1082);
        assert_eq!(round_even(0.4), 2);
    }
}
