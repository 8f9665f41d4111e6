//! Error types for the proctoring engine.
//!
//! Camera failure variants render as the message shown to the candidate; the
//! proctor appends that text to the alert log verbatim.

/// Failure to start the capture stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    /// No capture API on this platform
    #[error("Your device does not support camera access.")]
    Unsupported,

    #[error("Camera access was denied. Please allow camera access to continue.")]
    PermissionDenied,

    #[error("No camera found on this device.")]
    NotFound,

    /// Device held by another application
    #[error("Camera is already in use by another application.")]
    DeviceBusy,

    #[error("The requested camera resolution is not supported.")]
    ConstraintsUnsatisfiable,

    /// Any other platform failure; the detail goes to the log only
    #[error("Failed to access camera")]
    Other(String),
}

/// Precondition failure for starting a proctoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProctoringError {
    #[error("camera stream is not active")]
    StreamInactive,

    #[error("detection model is not ready")]
    DetectorNotReady,
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_messages_are_distinct() {
        let all = [
            CameraError::Unsupported,
            CameraError::PermissionDenied,
            CameraError::NotFound,
            CameraError::DeviceBusy,
            CameraError::ConstraintsUnsatisfiable,
            CameraError::Other("ENODEV".to_string()),
        ];
        let mut messages: Vec<String> = all.iter().map(ToString::to_string).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), all.len());
    }

    #[test]
    fn test_other_hides_platform_detail() {
        let err = CameraError::Other("v4l2 ioctl failed".to_string());
        assert_eq!(err.to_string(), "Failed to access camera");
    }
}
