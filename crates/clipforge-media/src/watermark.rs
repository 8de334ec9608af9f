//! Watermark overlay placement and filter construction.

use crate::error::{MediaError, MediaResult};
use clipforge_models::{WatermarkPosition, WatermarkSpec};

/// Margin from the anchored edges, as a fraction of the shorter canvas side.
pub const MARGIN_FRACTION: f64 = 0.05;

/// Largest fraction of the canvas width the watermark may occupy.
pub const MAX_WIDTH_FRACTION: f64 = 0.20;

/// Overlay x/y position expressions for the FFmpeg `overlay` filter.
///
/// `W`/`H` are the canvas dimensions, `w`/`h` the (scaled) watermark's.
pub fn overlay_position(
    position: WatermarkPosition,
    canvas_width: u32,
    canvas_height: u32,
) -> (String, String) {
    let margin = edge_margin(canvas_width, canvas_height);

    match position {
        WatermarkPosition::TopLeft => (margin.to_string(), margin.to_string()),
        WatermarkPosition::TopRight => (format!("W-w-{margin}"), margin.to_string()),
        WatermarkPosition::BottomLeft => (margin.to_string(), format!("H-h-{margin}")),
        WatermarkPosition::BottomRight => (format!("W-w-{margin}"), format!("H-h-{margin}")),
        WatermarkPosition::Center => ("(W-w)/2".to_string(), "(H-h)/2".to_string()),
    }
}

/// Pixel margin for a canvas: 5% of the shorter dimension.
pub fn edge_margin(canvas_width: u32, canvas_height: u32) -> u32 {
    ((canvas_width.min(canvas_height) as f64) * MARGIN_FRACTION).round() as u32
}

/// Largest allowed watermark width for a canvas.
pub fn max_overlay_width(canvas_width: u32) -> u32 {
    ((canvas_width as f64) * MAX_WIDTH_FRACTION).round() as u32
}

/// Build the overlay filter graph for a watermark supplied as the
/// second input (`[1:v]`).
///
/// The watermark is scaled down (never up) to the width bound with its
/// aspect preserved, and composited using its own alpha channel.
pub fn overlay_filter_complex(
    spec: &WatermarkSpec,
    canvas_width: u32,
    canvas_height: u32,
    input_label: &str,
    output_label: &str,
) -> String {
    let max_width = max_overlay_width(canvas_width);
    let (x, y) = overlay_position(spec.position, canvas_width, canvas_height);

    format!(
        "[1:v]scale=w=min(iw\\,{max_width}):h=-1[wm];\
         [{input_label}][wm]overlay={x}:{y}:format=auto[{output_label}]"
    )
}

/// Verify the watermark image exists before any engine invocation.
pub fn check_watermark(spec: &WatermarkSpec) -> MediaResult<()> {
    if spec.image_path.exists() {
        Ok(())
    } else {
        Err(MediaError::FileNotFound(spec.image_path.clone()))
    }
}
