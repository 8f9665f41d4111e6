//! Builder for creating Detection objects from various box layouts.

use crate::detection::object::{Detection, PERSON_LABEL};
use crate::detection::rect::Rect;

/// Builder for creating `Detection` objects from various box layouts.
#[derive(Debug, Clone)]
pub struct DetectionBuilder {
    label: String,
    bbox: Rect,
    score: f32,
}

impl Default for DetectionBuilder {
    fn default() -> Self {
        Self {
            label: PERSON_LABEL.to_string(),
            bbox: Rect::default(),
            score: 0.0,
        }
    }
}

impl DetectionBuilder {
    /// Create a new detection builder. The label defaults to `"person"`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the class label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = Rect::from_tlbr(x1, y1, x2, y2);
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::from_xywh(cx, cy, w, h);
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::new(x, y, w, h);
        self
    }

    /// Set the confidence score.
    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        Detection::new(self.label, self.score, self.bbox)
    }
}
