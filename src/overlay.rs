//! Detection overlay rendering.
//!
//! The renderer is a pure function of the latest detections, the activity
//! flag and the video geometry. It draws through the [`Surface`] trait;
//! [`DisplayList`] records the resulting draw calls in device pixels.

mod color;
mod renderer;
mod surface;

pub use color::{ParseColorError, Rgba};
pub use renderer::{SourceGeometry, accent_color, label_text, render_overlay};
pub use surface::{DisplayList, DrawCommand, GLYPH_ADVANCE, Surface};
