//! HTTP camera source.
//!
//! Captures frames from IP cameras that serve MJPEG over HTTP multipart
//! or a single JPEG per request (snapshot endpoints). JPEG frames are
//! decoded in memory and normalized to the configured geometry so every
//! frame entering the pipeline has the same dimensions.

use std::io::Read;

use image::imageops::FilterType;
use image::GenericImageView;

use super::{CameraConfig, FrameSource, SourceStats};
use crate::error::{Error, Result};
use crate::frame::Frame;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

pub struct HttpCameraSource {
    config: CameraConfig,
    stream: Option<HttpStream>,
    frame_count: u64,
}

enum HttpStream {
    Mjpeg(MjpegStream),
    SingleJpeg,
}

impl HttpCameraSource {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            stream: None,
            frame_count: 0,
        }
    }
}

impl FrameSource for HttpCameraSource {
    fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::DeviceBusy);
        }
        let response = ureq::get(&self.config.url).call().map_err(open_error)?;
        let content_type = response.header("Content-Type").unwrap_or("");
        if content_type.to_lowercase().contains("multipart") {
            let reader = response.into_reader();
            self.stream = Some(HttpStream::Mjpeg(MjpegStream::new(reader)));
        } else {
            self.stream = Some(HttpStream::SingleJpeg);
        }
        log::info!("camera opened: {}", self.config.url);
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<Frame> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::Capture("camera not open".to_string()))?;

        let jpeg_bytes = match stream {
            HttpStream::Mjpeg(stream) => stream.read_next_jpeg()?,
            HttpStream::SingleJpeg => fetch_single_jpeg(&self.config.url)?,
        };

        let frame = decode_jpeg(&jpeg_bytes, self.config.width, self.config.height)?;
        self.frame_count += 1;
        Ok(frame)
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            log::info!("camera closed: {}", self.config.url);
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.url.clone(),
        }
    }
}

fn open_error(err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(401, _) | ureq::Error::Status(403, _) => Error::PermissionDenied,
        ureq::Error::Status(code, _) => {
            Error::DeviceUnavailable(format!("camera endpoint returned status {}", code))
        }
        ureq::Error::Transport(t) => Error::DeviceUnavailable(t.to_string()),
    }
}

fn fetch_single_jpeg(url: &str) -> Result<Vec<u8>> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| Error::Capture(format!("fetch jpeg snapshot: {}", e)))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_JPEG_BYTES as u64)
        .read_to_end(&mut bytes)
        .map_err(|e| Error::Capture(format!("read jpeg snapshot: {}", e)))?;
    if bytes.is_empty() {
        return Err(Error::Capture("empty jpeg snapshot".to_string()));
    }
    Ok(bytes)
}

fn decode_jpeg(bytes: &[u8], width: u32, height: u32) -> Result<Frame> {
    let image =
        image::load_from_memory(bytes).map_err(|e| Error::Capture(format!("decode jpeg: {}", e)))?;
    let image = if image.dimensions() == (width, height) {
        image
    } else {
        image.resize_exact(width, height, FilterType::Triangle)
    };
    let rgb = image.into_rgb8();
    Ok(Frame::new(width, height, rgb.into_raw()))
}

struct MjpegStream {
    reader: Box<dyn Read + Send>,
    buffer: Vec<u8>,
}

impl MjpegStream {
    fn new(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    fn read_next_jpeg(&mut self) -> Result<Vec<u8>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            let read = self
                .reader
                .read(&mut chunk)
                .map_err(|e| Error::Capture(format!("read mjpeg chunk: {}", e)))?;
            if read == 0 {
                return Err(Error::Capture("mjpeg stream ended".to_string()));
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.buffer.len() > MAX_JPEG_BYTES * 2 {
                let keep = 2.min(self.buffer.len());
                let drain_len = self.buffer.len() - keep;
                self.buffer.drain(..drain_len);
            }
        }
    }
}

/// Locate one complete JPEG (SOI..EOI) in the buffer.
fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let mut start = None;
    let mut i = 0;
    while i + 1 < buffer.len() {
        if buffer[i] == 0xFF && buffer[i + 1] == 0xD8 {
            start = Some(i);
            break;
        }
        i += 1;
    }
    let start = start?;
    let mut j = start + 2;
    while j + 1 < buffer.len() {
        if buffer[j] == 0xFF && buffer[j + 1] == 0xD9 {
            return Some((start, j + 2));
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_jpeg_between_markers() {
        let mut data = vec![0x00, 0x01];
        data.extend_from_slice(&[0xFF, 0xD8, 0xAA, 0xBB, 0xFF, 0xD9]);
        data.extend_from_slice(&[0x02, 0x03]);
        let (start, end) = find_jpeg_bounds(&data).unwrap();
        assert_eq!(&data[start..end], &[0xFF, 0xD8, 0xAA, 0xBB, 0xFF, 0xD9]);
    }

    #[test]
    fn incomplete_jpeg_yields_none() {
        let data = [0xFF, 0xD8, 0xAA, 0xBB];
        assert!(find_jpeg_bounds(&data).is_none());
    }

    #[test]
    fn capture_before_open_is_capture_error() {
        let mut source = HttpCameraSource::new(CameraConfig {
            url: "http://127.0.0.1:1/stream".to_string(),
            ..CameraConfig::default()
        });
        assert!(matches!(source.capture_frame(), Err(Error::Capture(_))));
    }

    #[test]
    fn close_is_idempotent() {
        let mut source = HttpCameraSource::new(CameraConfig::default());
        source.close();
        source.close();
        assert!(!source.is_open());
    }
}
