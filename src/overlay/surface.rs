//! Drawing surfaces the overlay renders onto.

use nalgebra::{Matrix3, Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::detection::Rect;
use crate::overlay::color::Rgba;

/// Advance per character, as a fraction of the font size, used by
/// [`DisplayList::measure_text`].
pub const GLYPH_ADVANCE: f32 = 0.6;

/// Minimal 2D drawing context.
///
/// Coordinates passed to drawing calls are in user space and pass through
/// the current transform. `resize` discards all content and resets the
/// transform to identity.
pub trait Surface {
    fn resize(&mut self, width: u32, height: u32);

    fn set_transform(&mut self, transform: Matrix3<f32>);

    /// Erase the whole surface.
    fn clear(&mut self);

    fn stroke_rect(&mut self, rect: Rect, color: Rgba, line_width: f32);

    fn fill_rect(&mut self, rect: Rect, color: Rgba);

    /// Rendered width of `text` in user-space units.
    fn measure_text(&self, text: &str, font_px: f32) -> f32;

    /// Draw `text` with its baseline starting at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f32, y: f32, font_px: f32, color: Rgba);
}

/// A draw call recorded in device pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    StrokeRect {
        rect: Rect,
        color: Rgba,
        line_width: f32,
    },
    FillRect {
        rect: Rect,
        color: Rgba,
    },
    FillText {
        text: String,
        x: f32,
        y: f32,
        font_px: f32,
        color: Rgba,
    },
}

/// Recording surface: keeps device-space draw commands for a host to replay
/// onto a real canvas.
#[derive(Debug, Clone)]
pub struct DisplayList {
    width: u32,
    height: u32,
    transform: Matrix3<f32>,
    commands: Vec<DrawCommand>,
}

impl Default for DisplayList {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl DisplayList {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            transform: Matrix3::identity(),
            commands: Vec::new(),
        }
    }

    /// Surface size in device pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn transform(&self) -> &Matrix3<f32> {
        &self.transform
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_blank(&self) -> bool {
        self.commands.is_empty()
    }

    fn map_point(&self, x: f32, y: f32) -> Point2<f32> {
        self.transform.transform_point(&Point2::new(x, y))
    }

    fn map_rect(&self, rect: Rect) -> Rect {
        let [x1, y1, x2, y2] = rect.to_tlbr();
        let a = self.map_point(x1, y1);
        let b = self.map_point(x2, y2);
        Rect::from_tlbr(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
    }

    fn map_length(&self, len: f32) -> f32 {
        self.transform
            .transform_vector(&Vector2::new(len, 0.0))
            .norm()
    }
}

impl Surface for DisplayList {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.transform = Matrix3::identity();
        self.commands.clear();
    }

    fn set_transform(&mut self, transform: Matrix3<f32>) {
        self.transform = transform;
    }

    fn clear(&mut self) {
        self.commands.clear();
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgba, line_width: f32) {
        let command = DrawCommand::StrokeRect {
            rect: self.map_rect(rect),
            color,
            line_width: self.map_length(line_width),
        };
        self.commands.push(command);
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba) {
        let command = DrawCommand::FillRect {
            rect: self.map_rect(rect),
            color,
        };
        self.commands.push(command);
    }

    fn measure_text(&self, text: &str, font_px: f32) -> f32 {
        text.chars().count() as f32 * font_px * GLYPH_ADVANCE
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font_px: f32, color: Rgba) {
        let origin = self.map_point(x, y);
        let command = DrawCommand::FillText {
            text: text.to_string(),
            x: origin.x,
            y: origin.y,
            font_px: self.map_length(font_px),
            color,
        };
        self.commands.push(command);
    }
}
