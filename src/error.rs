//! Failure taxonomy for the capture/upload pipeline.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants
//! distinguish the failures a caller reacts to differently: camera access
//! problems, per-frame capture problems, local validation, and transport
//! problems talking to the verification service. In-band service
//! rejections (`{"success": false}`) are not errors; they come back as
//! `UploadResult` values.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The camera endpoint refused access (HTTP 401/403, or a stub
    /// configured to deny).
    #[error("camera access denied")]
    PermissionDenied,

    /// No usable camera behind the configured URL.
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// The source is already open; one handle per session.
    #[error("camera is already in use")]
    DeviceBusy,

    /// A frame could not be captured from an open source.
    #[error("frame capture failed: {0}")]
    Capture(String),

    /// A frame or encode parameter failed local sanity checks.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Caller-supplied input was rejected before any work started.
    #[error("{0}")]
    Validation(String),

    /// The service could not be reached or answered with garbage.
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The service did not answer within the bounded wait. The request is
    /// not retried; the remote side may or may not have processed it.
    #[error("upload timed out after {0:?}")]
    UploadTimeout(Duration),
}

impl Error {
    pub(crate) fn network(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Network(err.into())
    }

    /// A short user-facing status line, phrased the way the service UI
    /// reports problems.
    pub fn status_message(&self) -> String {
        match self {
            Error::PermissionDenied => {
                "Unable to access camera. Please ensure camera permissions are granted.".to_string()
            }
            Error::DeviceUnavailable(_) => {
                "Unable to access camera. Please check that a camera is connected.".to_string()
            }
            Error::DeviceBusy => "Camera is already in use.".to_string(),
            Error::Capture(_) => "Error capturing image. Please try again.".to_string(),
            Error::InvalidFrame(_) => "Error processing captured image.".to_string(),
            Error::Validation(message) => message.clone(),
            Error::Network(_) => {
                "Error connecting to server. Please try again.".to_string()
            }
            Error::UploadTimeout(_) => {
                "Server did not respond in time. Please try again.".to_string()
            }
        }
    }
}
