//! Filter-graph construction for geometric compositing.
//!
//! Turns a [`GeometryPlan`] into the FFmpeg filter specification for the
//! crop, stretch, letterbox or blurred-letterbox transform. This module
//! only builds parameter strings; rendering is the engine's job.

use crate::geometry::GeometryPlan;
use clipforge_models::{BlurOptions, PadColor, ResizeMethod};

/// Filter label used for the composed video stream.
pub const COMPOSITE_OUTPUT_LABEL: &str = "vout";

/// A composite operation expressed as FFmpeg filter parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositeFilter {
    /// The plan changes nothing; no filter needed
    Identity,
    /// Single-input `-vf` chain
    Chain(String),
    /// Multi-branch `-filter_complex` graph with a labeled output
    Graph {
        filter: String,
        output_label: String,
    },
}

/// Build the filter for a geometry plan.
///
/// A blurred pad is requested via `blur`; when the plan carries no
/// padding band (source and target ratios already match) the blur is
/// silently dropped and the result is identical to the plain path.
pub fn plan_filter(
    plan: &GeometryPlan,
    pad_color: PadColor,
    blur: Option<&BlurOptions>,
) -> CompositeFilter {
    if plan.is_identity() {
        return CompositeFilter::Identity;
    }

    match plan.method {
        ResizeMethod::Crop => CompositeFilter::Chain(crop_chain(plan)),
        ResizeMethod::Stretch => CompositeFilter::Chain(stretch_chain(plan)),
        ResizeMethod::Pad => match blur {
            Some(options) if plan.has_padding() => CompositeFilter::Graph {
                filter: blurred_pad_graph(plan, options),
                output_label: COMPOSITE_OUTPUT_LABEL.to_string(),
            },
            _ => CompositeFilter::Chain(solid_pad_chain(plan, pad_color)),
        },
    }
}

/// Centered crop, with an even-dimension rescale when no crop is needed.
fn crop_chain(plan: &GeometryPlan) -> String {
    match plan.crop {
        Some(rect) => format!(
            "crop={}:{}:{}:{}",
            rect.width, rect.height, rect.x, rect.y
        ),
        // Ratio already matches; only the even-dimension constraint remains
        None => format!("scale={}:{}", plan.canvas_width, plan.canvas_height),
    }
}

/// Independent-axis stretch to the canvas.
fn stretch_chain(plan: &GeometryPlan) -> String {
    format!("scale={}:{}", plan.canvas_width, plan.canvas_height)
}

/// Scale-to-fit plus solid-color letterbox/pillarbox bands.
fn solid_pad_chain(plan: &GeometryPlan, color: PadColor) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color={color}",
        w = plan.canvas_width,
        h = plan.canvas_height,
        color = color.to_ffmpeg(),
    )
}

/// Blurred-background letterbox.
///
/// The background branch scales the source up to cover the whole canvas
/// (cropping overflow) and blurs it; the sharp foreground is padded onto
/// a transparent canvas and overlaid on top. `gradient_blend` feathers
/// the foreground's alpha over a fraction of the padding band.
fn blurred_pad_graph(plan: &GeometryPlan, blur: &BlurOptions) -> String {
    let sigma = blur_sigma(blur.strength);
    let feather = feather_radius(plan, blur.gradient_blend);

    let mut foreground = format!(
        "[0:v]scale={fw}:{fh}:flags=lanczos,format=rgba,\
         pad={cw}:{ch}:{px}:{py}:color=black@0",
        fw = plan.scaled_width,
        fh = plan.scaled_height,
        cw = plan.canvas_width,
        ch = plan.canvas_height,
        px = plan.pad_left,
        py = plan.pad_top,
    );
    if feather > 0 {
        foreground.push_str(&format!(
            ",boxblur=luma_radius=0:chroma_radius=0:alpha_radius={feather}:alpha_power=1"
        ));
    }

    format!(
        "[0:v]scale={cw}:{ch}:force_original_aspect_ratio=increase,\
         crop={cw}:{ch},gblur=sigma={sigma},format=yuv420p[bg];\
         {foreground}[fg];\
         [bg][fg]overlay=0:0:format=auto,format=yuv420p[{label}]",
        cw = plan.canvas_width,
        ch = plan.canvas_height,
        label = COMPOSITE_OUTPUT_LABEL,
    )
}

/// Gaussian sigma for a blur strength; strictly increasing in strength.
fn blur_sigma(strength: u8) -> f32 {
    strength as f32
}

/// Alpha feather radius in pixels for a gradient blend fraction.
fn feather_radius(plan: &GeometryPlan, gradient_blend: f32) -> u32 {
    let band = plan.pad_band() as f32;
    let radius = (gradient_blend.clamp(0.0, 1.0) * band).round() as u32;
    // boxblur requires the radius to stay under half the plane size
    let limit = plan.canvas_width.min(plan.canvas_height) / 2;
    radius.min(limit.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryPlan;
    use clipforge_models::AspectRatio;

    fn pad_plan() -> GeometryPlan {
        GeometryPlan::compute(1920, 1080, AspectRatio::PORTRAIT, ResizeMethod::Pad).unwrap()
    }

    #[test]
    fn test_crop_filter() {
        let plan =
            GeometryPlan::compute(1920, 1080, AspectRatio::PORTRAIT, ResizeMethod::Crop).unwrap();
        let filter = plan_filter(&plan, PadColor::BLACK, None);
        assert_eq!(
            filter,
            CompositeFilter::Chain("crop=608:1080:656:0".to_string())
        );
    }

    #[test]
    fn test_stretch_filter() {
        let plan = GeometryPlan::compute(1920, 1080, AspectRatio::PORTRAIT, ResizeMethod::Stretch)
            .unwrap();
        let filter = plan_filter(&plan, PadColor::BLACK, None);
        assert_eq!(
            filter,
            CompositeFilter::Chain("scale=1080:1920".to_string())
        );
    }

    #[test]
    fn test_solid_pad_filter() {
        let filter = plan_filter(&pad_plan(), PadColor::BLACK, None);
        match filter {
            CompositeFilter::Chain(chain) => {
                assert!(chain.contains("scale=1080:1920:force_original_aspect_ratio=decrease"));
                assert!(chain.contains("pad=1080:1920"));
                assert!(chain.contains("color=0x000000"));
            }
            other => panic!("expected chain, got {:?}", other),
        }
    }

    #[test]
    fn test_blurred_pad_graph() {
        let blur = BlurOptions {
            strength: 25,
            gradient_blend: 0.5,
        };
        let filter = plan_filter(&pad_plan(), PadColor::BLACK, Some(&blur));
        match filter {
            CompositeFilter::Graph {
                filter,
                output_label,
            } => {
                assert_eq!(output_label, "vout");
                assert!(filter.contains("gblur=sigma=25"));
                assert!(filter.contains("force_original_aspect_ratio=increase"));
                assert!(filter.contains("overlay=0:0"));
                assert!(filter.contains("alpha_radius=328"));
                assert!(filter.contains("[bg]"));
                assert!(filter.contains("[fg]"));
                assert!(filter.ends_with("[vout]"));
            }
            other => panic!("expected graph, got {:?}", other),
        }
    }

    #[test]
    fn test_hard_edge_omits_feather() {
        let blur = BlurOptions {
            strength: 10,
            gradient_blend: 0.0,
        };
        let filter = plan_filter(&pad_plan(), PadColor::BLACK, Some(&blur));
        match filter {
            CompositeFilter::Graph { filter, .. } => {
                assert!(!filter.contains("boxblur"));
            }
            other => panic!("expected graph, got {:?}", other),
        }
    }

    #[test]
    fn test_blur_degenerates_on_matching_ratio() {
        // Source already portrait: blur request must be a no-op identical
        // to the plain path.
        let plan =
            GeometryPlan::compute(1080, 1920, AspectRatio::PORTRAIT, ResizeMethod::Pad).unwrap();
        let blur = BlurOptions {
            strength: 50,
            gradient_blend: 1.0,
        };
        let with_blur = plan_filter(&plan, PadColor::BLACK, Some(&blur));
        let without_blur = plan_filter(&plan, PadColor::BLACK, None);
        assert_eq!(with_blur, without_blur);
        assert_eq!(with_blur, CompositeFilter::Identity);
    }

    #[test]
    fn test_sigma_monotonic() {
        let mut last = 0.0;
        for strength in 1..=50 {
            let sigma = blur_sigma(strength);
            assert!(sigma > last);
            last = sigma;
        }
    }

    #[test]
    fn test_feather_spans_band_at_full_blend() {
        let plan =
            GeometryPlan::compute(1920, 1080, AspectRatio::SQUARE, ResizeMethod::Pad).unwrap();
        assert_eq!(feather_radius(&plan, 1.0), plan.pad_band());
        assert_eq!(feather_radius(&plan, 0.0), 0);
    }

    #[test]
    fn test_feather_clamped_to_plane_limit() {
        // Tall portrait bands can exceed what boxblur accepts; the radius
        // must stay under half the narrow canvas side.
        let plan = pad_plan();
        let feather = feather_radius(&plan, 1.0);
        assert!(feather < plan.canvas_width.min(plan.canvas_height) / 2);
    }
}
