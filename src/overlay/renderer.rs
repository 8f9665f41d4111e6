//! Projects detection boxes onto an overlay surface.

use nalgebra::Matrix3;

use crate::config::OverlayStyle;
use crate::detection::{Detection, Rect};
use crate::overlay::color::Rgba;
use crate::overlay::surface::Surface;

/// Geometry of the video the overlay sits on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceGeometry {
    /// Intrinsic frame size `(width, height)`; `None` before the first frame
    pub intrinsic: Option<(u32, u32)>,
    /// Display pixel density (device pixels per CSS/logical pixel)
    pub density: f32,
}

impl SourceGeometry {
    pub fn new(intrinsic: Option<(u32, u32)>, density: f32) -> Self {
        Self { intrinsic, density }
    }
}

/// Draw `detections` onto `surface`.
///
/// The surface is resized to `intrinsic_size * density` and scaled by
/// `density`, so boxes are given in source-frame pixels. It is always
/// cleared first; when `active` is false or there are no detections the
/// result is a blank surface. Calling this twice with the same inputs yields
/// the same surface.
pub fn render_overlay<S: Surface + ?Sized>(
    surface: &mut S,
    detections: &[Detection],
    active: bool,
    geometry: SourceGeometry,
    style: &OverlayStyle,
) {
    let (width, height) = geometry
        .intrinsic
        .filter(|&(w, h)| w > 0 && h > 0)
        .unwrap_or((style.default_frame_width, style.default_frame_height));
    let density = if geometry.density.is_finite() && geometry.density > 0.0 {
        geometry.density
    } else {
        1.0
    };

    surface.resize(
        (width as f32 * density).round() as u32,
        (height as f32 * density).round() as u32,
    );
    surface.set_transform(Matrix3::new_scaling(density));
    surface.clear();

    if !active || detections.is_empty() {
        return;
    }

    for detection in detections {
        draw_detection(surface, detection, style);
    }
}

/// Accent color for a detection: low-confidence boxes get the warning color.
pub fn accent_color(score: f32, style: &OverlayStyle) -> Rgba {
    if score < style.low_confidence_threshold {
        style.warning_color
    } else {
        style.normal_color
    }
}

/// Text drawn above a box, e.g. `"person 87%"`.
pub fn label_text(detection: &Detection) -> String {
    format!("{} {}%", detection.label, detection.confidence_percent())
}

fn draw_detection<S>(surface: &mut S, detection: &Detection, style: &OverlayStyle)
where
    S: Surface + ?Sized,
{
    let color = accent_color(detection.confidence(), style);
    let bbox = detection.bbox;

    surface.stroke_rect(bbox, color, style.line_width);

    let text = label_text(detection);
    let label_width = surface.measure_text(&text, style.font_px) + 2.0 * style.label_padding;
    // Above the box, pinned to the top edge when there is no room.
    let label_top = (bbox.y - style.label_height).max(0.0);

    surface.fill_rect(
        Rect::new(bbox.x, label_top, label_width, style.label_height),
        color,
    );

    let baseline = label_top + (style.label_height + style.font_px) / 2.0 - 2.0;
    surface.fill_text(
        &text,
        bbox.x + style.label_padding,
        baseline,
        style.font_px,
        style.text_color,
    );
}
