//! Trait for object detection inference backends.

use async_trait::async_trait;

use crate::detection::frame::Frame;
use crate::detection::object::Detection;

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the proctor. Calls
/// may suspend while inference runs and may fail; the scheduler never issues
/// a second call while one is outstanding.
///
/// # Example
///
/// ```ignore
/// use presence_proctor::{Detection, Detector, Frame};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// #[async_trait::async_trait]
/// impl Detector for MyDetector {
///     type Error = std::io::Error;
///
///     fn is_ready(&self) -> bool {
///         true
///     }
///
///     async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
#[async_trait]
pub trait Detector: Send + Sync {
    /// Error type for detection failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Whether the model is loaded and able to serve `detect` calls.
    fn is_ready(&self) -> bool;

    /// Run inference on one frame and return every detection, in
    /// source-frame pixel coordinates.
    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, Self::Error>;
}
