//! Detections, frames and the detector seam.
//!
//! This module provides the value types produced per sampling tick and the
//! trait that connects an inference backend (Burn, ONNX Runtime, a remote
//! service, ...) to the proctor.

mod builder;
mod detector;
mod frame;
mod object;
mod rect;

pub use builder::DetectionBuilder;
pub use detector::Detector;
pub use frame::Frame;
pub use object::{Detection, PERSON_LABEL, count_label};
pub use rect::Rect;

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnDetector, BurnDetectorError, BurnModel, RawDetection};
