//! Presence monitoring for proctored examinations.
//!
//! A [`Proctor`] samples a live camera stream once per second, asks a
//! [`Detector`] for the people in frame and raises edge-triggered alerts when
//! the count leaves exactly one. Alerts go to a bounded log, counters and
//! session timing are exposed through [`StatusSnapshot`], and the latest
//! detections can be drawn with [`render_overlay`].
//!
//! ```ignore
//! use presence_proctor::{DisplayList, Proctor, ProctorConfig};
//!
//! let mut proctor = Proctor::new(camera, detector, ProctorConfig::default());
//! proctor.start_camera().await?;
//! proctor.start_proctoring().await?;
//!
//! let mut updates = proctor.subscribe_detections();
//! let mut surface = DisplayList::default();
//! while updates.changed().await.is_ok() {
//!     proctor.render_overlay(&mut surface, 2.0);
//! }
//! ```

pub mod camera;
pub mod config;
pub mod detection;
pub mod error;
pub mod monitor;
pub mod overlay;

pub use camera::{CameraSource, FacingMode, PermissionState, StreamConstraints, VideoStream};
pub use config::{OverlayStyle, ProctorConfig};
pub use detection::{Detection, DetectionBuilder, Detector, Frame, PERSON_LABEL, Rect};
pub use error::{CameraError, ConfigError, ProctoringError};
pub use monitor::{
    Alert, AlertKind, AlertLog, PresenceStatus, Proctor, StatusSnapshot, Transition,
    ViolationCounters,
};
pub use overlay::{DisplayList, DrawCommand, Rgba, SourceGeometry, Surface, render_overlay};
