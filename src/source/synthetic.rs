//! Synthetic frame source (`stub://`) for tests and demos.
//!
//! Produces deterministic gradient frames at the configured geometry.
//! Failure behavior is injectable through URL query parameters so the
//! collector and session failure paths can be exercised without a device:
//!
//! - `stub://cam?fail_at=3` fails the third capture with `Capture`
//! - `stub://cam?deny=permission` fails `open()` with `PermissionDenied`
//! - `stub://cam?deny=unavailable` fails `open()` with `DeviceUnavailable`

use super::{CameraConfig, FrameSource, SourceStats};
use crate::error::{Error, Result};
use crate::frame::Frame;

pub struct SyntheticSource {
    config: CameraConfig,
    open: bool,
    frame_count: u64,
    fail_at: Option<u64>,
    deny: Option<Deny>,
}

#[derive(Clone, Copy)]
enum Deny {
    Permission,
    Unavailable,
}

impl SyntheticSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        let url = url::Url::parse(&config.url)
            .map_err(|e| Error::DeviceUnavailable(format!("bad stub url: {}", e)))?;

        let mut fail_at = None;
        let mut deny = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "fail_at" => {
                    let tick: u64 = value.parse().map_err(|_| {
                        Error::DeviceUnavailable("fail_at must be an integer".to_string())
                    })?;
                    fail_at = Some(tick);
                }
                "deny" => {
                    deny = Some(match value.as_ref() {
                        "permission" => Deny::Permission,
                        "unavailable" => Deny::Unavailable,
                        other => {
                            return Err(Error::DeviceUnavailable(format!(
                                "unknown deny mode '{}'",
                                other
                            )))
                        }
                    });
                }
                _ => {}
            }
        }

        Ok(Self {
            config,
            open: false,
            frame_count: 0,
            fail_at,
            deny,
        })
    }

    /// Deterministic gradient mixing position and frame count, so
    /// consecutive frames differ and encode to nonempty JPEGs.
    fn generate_pixels(&self) -> Vec<u8> {
        let pixel_count = (self.config.width * self.config.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, px) in pixels.iter_mut().enumerate() {
            *px = ((i as u64 + self.frame_count) % 256) as u8;
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(Error::DeviceBusy);
        }
        match self.deny {
            Some(Deny::Permission) => return Err(Error::PermissionDenied),
            Some(Deny::Unavailable) => {
                return Err(Error::DeviceUnavailable("stub denied".to_string()))
            }
            None => {}
        }
        self.open = true;
        log::info!("camera opened: {} (synthetic)", self.config.url);
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<Frame> {
        if !self.open {
            return Err(Error::Capture("camera not open".to_string()));
        }
        let tick = self.frame_count + 1;
        if self.fail_at == Some(tick) {
            return Err(Error::Capture(format!("injected failure at frame {}", tick)));
        }
        self.frame_count = tick;
        let pixels = self.generate_pixels();
        Ok(Frame::new(self.config.width, self.config.height, pixels))
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(url: &str) -> SyntheticSource {
        SyntheticSource::new(CameraConfig {
            url: url.to_string(),
            width: 16,
            height: 12,
        })
        .unwrap()
    }

    #[test]
    fn produces_frames_at_configured_geometry() {
        let mut source = stub("stub://cam");
        source.open().unwrap();
        let frame = source.capture_frame().unwrap();
        assert_eq!(frame.width(), 16);
        assert_eq!(frame.height(), 12);
        assert_eq!(frame.pixels().len(), 16 * 12 * 3);
        assert_eq!(source.stats().frames_captured, 1);
    }

    #[test]
    fn double_open_is_device_busy() {
        let mut source = stub("stub://cam");
        source.open().unwrap();
        assert!(matches!(source.open(), Err(Error::DeviceBusy)));
    }

    #[test]
    fn reopen_after_close_succeeds() {
        let mut source = stub("stub://cam");
        source.open().unwrap();
        source.close();
        source.close();
        source.open().unwrap();
    }

    #[test]
    fn injected_failure_fires_at_requested_tick() {
        let mut source = stub("stub://cam?fail_at=2");
        source.open().unwrap();
        assert!(source.capture_frame().is_ok());
        assert!(matches!(source.capture_frame(), Err(Error::Capture(_))));
    }

    #[test]
    fn failed_capture_is_not_counted_as_captured() {
        let mut source = stub("stub://cam?fail_at=2");
        source.open().unwrap();
        source.capture_frame().unwrap();
        assert!(source.capture_frame().is_err());
        assert_eq!(source.stats().frames_captured, 1);
    }

    #[test]
    fn deny_permission_fails_open() {
        let mut source = stub("stub://cam?deny=permission");
        assert!(matches!(source.open(), Err(Error::PermissionDenied)));
    }

    #[test]
    fn capture_on_closed_source_fails() {
        let mut source = stub("stub://cam");
        assert!(matches!(source.capture_frame(), Err(Error::Capture(_))));
    }
}
