//! Boundary with the capture device.
//!
//! The proctor never talks to hardware directly. A [`CameraSource`] checks
//! capability and permission and opens a [`VideoStream`]; the stream handle
//! is then owned by the proctor and shared read-only with the detection
//! scheduler for the lifetime of one stream.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::detection::Frame;
use crate::error::CameraError;

/// Which camera the stream should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, facing the candidate
    #[default]
    User,
    /// Rear camera
    Environment,
}

/// Requested stream properties. Width and height are preferences, not hard
/// requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: FacingMode,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            facing: FacingMode::User,
        }
    }
}

/// Camera permission as last recorded by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    /// Opening the stream will prompt the user
    Prompt,
    Denied,
}

/// A live capture stream.
///
/// `stop` releases every underlying track and must be idempotent; after it
/// returns, `frame` yields `None`.
pub trait VideoStream: Send + Sync {
    /// The most recent decoded frame, if one is available.
    fn frame(&self) -> Option<Frame>;

    /// Intrinsic resolution as `(width, height)`, once known.
    fn resolution(&self) -> Option<(u32, u32)>;

    /// Release all device tracks.
    fn stop(&self);
}

/// Capture device abstraction consumed by the proctor.
#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Whether the platform exposes a capture API at all.
    fn is_supported(&self) -> bool;

    /// Query the current permission without prompting.
    async fn permission_state(&self) -> PermissionState;

    /// Request access and open a stream.
    async fn open(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Arc<dyn VideoStream>, CameraError>;
}

/// Run the start sequence: capability check, permission query, open.
///
/// A denied permission fails without calling [`CameraSource::open`], so the
/// user is never prompted again.
pub async fn acquire_stream<C>(
    camera: &C,
    constraints: &StreamConstraints,
) -> Result<Arc<dyn VideoStream>, CameraError>
where
    C: CameraSource + ?Sized,
{
    if !camera.is_supported() {
        return Err(CameraError::Unsupported);
    }

    match camera.permission_state().await {
        PermissionState::Denied => return Err(CameraError::PermissionDenied),
        state => tracing::debug!(?state, "Camera permission checked"),
    }

    camera.open(constraints).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullStream;

    impl VideoStream for NullStream {
        fn frame(&self) -> Option<Frame> {
            None
        }

        fn resolution(&self) -> Option<(u32, u32)> {
            None
        }

        fn stop(&self) {}
    }

    struct FakeCamera {
        supported: bool,
        permission: PermissionState,
        opens: AtomicUsize,
    }

    impl FakeCamera {
        fn new(supported: bool, permission: PermissionState) -> Self {
            Self {
                supported,
                permission,
                opens: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CameraSource for FakeCamera {
        fn is_supported(&self) -> bool {
            self.supported
        }

        async fn permission_state(&self) -> PermissionState {
            self.permission
        }

        async fn open(
            &self,
            _constraints: &StreamConstraints,
        ) -> Result<Arc<dyn VideoStream>, CameraError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let stream: Arc<dyn VideoStream> = Arc::new(NullStream);
            Ok(stream)
        }
    }

    #[tokio::test]
    async fn test_denied_permission_never_opens() {
        let camera = FakeCamera::new(true, PermissionState::Denied);
        let result = acquire_stream(&camera, &StreamConstraints::default()).await;

        assert!(matches!(result, Err(CameraError::PermissionDenied)));
        assert_eq!(camera.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_checked_first() {
        let camera = FakeCamera::new(false, PermissionState::Denied);
        let result = acquire_stream(&camera, &StreamConstraints::default()).await;

        assert!(matches!(result, Err(CameraError::Unsupported)));
        assert_eq!(camera.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prompt_opens_stream() {
        let camera = FakeCamera::new(true, PermissionState::Prompt);
        let result = acquire_stream(&camera, &StreamConstraints::default()).await;

        assert!(result.is_ok());
        assert_eq!(camera.opens.load(Ordering::SeqCst), 1);
    }
}
