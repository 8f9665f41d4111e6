//! Labelled detections reported by a detector for a single frame.

use serde::{Deserialize, Serialize};

use crate::detection::rect::Rect;

/// One box emitted by the detector for one frame.
///
/// Detections carry no identity across frames; every tick produces a fresh
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label, e.g. `"person"`
    pub label: String,
    /// Detection confidence score in `[0, 1]`
    pub score: f32,
    /// Bounding box in source-frame pixels (TLWH)
    pub bbox: Rect,
}

impl Detection {
    pub fn new(label: impl Into<String>, score: f32, bbox: Rect) -> Self {
        Self {
            label: label.into(),
            score: normalize_score(score),
            bbox,
        }
    }

    /// Score clamped to `[0, 1]`, with NaN read as zero.
    ///
    /// `score` is public and deserializable, so readers go through this
    /// rather than trusting the field.
    pub fn confidence(&self) -> f32 {
        normalize_score(self.score)
    }

    /// Shorthand for a `"person"` detection in TLWH form.
    pub fn person(x: f32, y: f32, width: f32, height: f32, score: f32) -> Self {
        Self::new(PERSON_LABEL, score, Rect::new(x, y, width, height))
    }

    /// Confidence as a whole percentage, as shown on overlay labels.
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence() * 100.0).round() as u32
    }
}

fn normalize_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Label of the category whose count is monitored by default.
pub const PERSON_LABEL: &str = "person";

/// Count the detections whose label equals `label`.
pub fn count_label(detections: &[Detection], label: &str) -> usize {
    detections.iter().filter(|d| d.label == label).count()
}
