//! Frame sources.
//!
//! This module abstracts the live video device behind `FrameSource`:
//! - HTTP cameras (MJPEG streams or single-JPEG snapshot endpoints)
//! - Stub source (`stub://` URLs) producing synthetic frames for tests
//!
//! A source is the one exclusive resource in a session: only one open
//! handle is permitted, a second `open()` fails with `DeviceBusy`, and
//! `close()` is idempotent so teardown is safe on every exit path.

mod http;
mod synthetic;

pub use http::HttpCameraSource;
pub use synthetic::SyntheticSource;

use crate::error::{Error, Result};
use crate::frame::Frame;

/// Device constraints for a capture source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Source URL. Supported schemes: http(s):// for MJPEG/JPEG cameras,
    /// stub:// for synthetic frames.
    pub url: String,
    /// Frame width every captured frame is normalized to.
    pub width: u32,
    /// Frame height every captured frame is normalized to.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: "stub://front_camera".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// A live video capture device producing frames on demand.
pub trait FrameSource {
    /// Acquire the device. Fails `DeviceUnavailable` / `PermissionDenied`
    /// if the device cannot be reached, `DeviceBusy` if already open.
    fn open(&mut self) -> Result<()>;

    /// Capture the next frame. Fails `Capture` if the device is not open
    /// or the stream has stopped.
    fn capture_frame(&mut self) -> Result<Frame>;

    /// Release the device. Idempotent; closing a closed source is a no-op.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Capture statistics for health logging.
    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Frame source selected by URL scheme.
pub enum CameraSource {
    Http(HttpCameraSource),
    Synthetic(SyntheticSource),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        let url = url::Url::parse(&config.url)
            .map_err(|e| Error::DeviceUnavailable(format!("bad camera url: {}", e)))?;
        match url.scheme() {
            "http" | "https" => Ok(CameraSource::Http(HttpCameraSource::new(config))),
            "stub" => Ok(CameraSource::Synthetic(SyntheticSource::new(config)?)),
            other => Err(Error::DeviceUnavailable(format!(
                "unsupported camera scheme '{}'; expected http(s) or stub",
                other
            ))),
        }
    }
}

impl FrameSource for CameraSource {
    fn open(&mut self) -> Result<()> {
        match self {
            CameraSource::Http(source) => source.open(),
            CameraSource::Synthetic(source) => source.open(),
        }
    }

    fn capture_frame(&mut self) -> Result<Frame> {
        match self {
            CameraSource::Http(source) => source.capture_frame(),
            CameraSource::Synthetic(source) => source.capture_frame(),
        }
    }

    fn close(&mut self) {
        match self {
            CameraSource::Http(source) => source.close(),
            CameraSource::Synthetic(source) => source.close(),
        }
    }

    fn is_open(&self) -> bool {
        match self {
            CameraSource::Http(source) => source.is_open(),
            CameraSource::Synthetic(source) => source.is_open(),
        }
    }

    fn stats(&self) -> SourceStats {
        match self {
            CameraSource::Http(source) => source.stats(),
            CameraSource::Synthetic(source) => source.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_scheme() {
        let cfg = CameraConfig {
            url: "rtsp://camera-1/stream".to_string(),
            ..CameraConfig::default()
        };
        assert!(matches!(
            CameraSource::new(cfg),
            Err(Error::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn stub_scheme_selects_synthetic_backend() {
        let source = CameraSource::new(CameraConfig::default()).unwrap();
        assert!(matches!(source, CameraSource::Synthetic(_)));
    }
}
