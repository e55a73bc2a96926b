//! Frames, encoded images, and batches.
//!
//! - `Frame`: one raw RGB sample from the video device. Ephemeral; produced
//!   and consumed within a single capture tick, never persisted.
//! - `EncodedImage`: an immutable JPEG byte sequence plus its MIME type and
//!   encode quality. This is the interchange unit; it serializes as a
//!   `data:image/jpeg;base64,...` URL.
//! - `Batch`: the fixed-size ordered collection of encoded images gathered
//!   during enrollment. Append-only until full, then handed off by value.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::error::{Error, Result};

pub const JPEG_MIME: &str = "image/jpeg";

/// Default encode quality, matching the interchange format the
/// verification service expects (JPEG at 0.8).
pub const DEFAULT_QUALITY: f32 = 0.8;

/// One raw RGB8 frame.
#[derive(Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Create a frame from an RGB8 pixel buffer. Geometry is not checked
    /// here; the encoder rejects mismatched buffers.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// An encoded still image. Immutable once produced.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    mime: &'static str,
    quality: f32,
}

impl EncodedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Render as a `data:` URL, the wire form the verification service
    /// accepts for both enrollment samples and probes.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(&self.bytes))
    }
}

/// Encode a raw frame as JPEG at the given quality in (0.0, 1.0].
///
/// Lossy, so not deterministic across codec versions, but output size is
/// bounded and non-decreasing with quality. Fails `InvalidFrame` on zero
/// dimensions or a pixel buffer that does not match width*height*3.
pub fn encode_jpeg(frame: &Frame, quality: f32) -> Result<EncodedImage> {
    if frame.width == 0 || frame.height == 0 {
        return Err(Error::InvalidFrame(format!(
            "zero dimension ({}x{})",
            frame.width, frame.height
        )));
    }
    let expected = frame.width as usize * frame.height as usize * 3;
    if frame.pixels.len() != expected {
        return Err(Error::InvalidFrame(format!(
            "pixel buffer is {} bytes, expected {} for {}x{} rgb",
            frame.pixels.len(),
            expected,
            frame.width,
            frame.height
        )));
    }
    if !(quality > 0.0 && quality <= 1.0) {
        return Err(Error::InvalidFrame(format!(
            "quality {} outside (0.0, 1.0]",
            quality
        )));
    }

    // Map the 0.0-1.0 knob onto the codec's 1-100 scale.
    let codec_quality = ((quality * 100.0).round() as u8).clamp(1, 100);

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, codec_quality)
        .encode(
            &frame.pixels,
            frame.width,
            frame.height,
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| Error::InvalidFrame(format!("jpeg encode: {}", e)))?;

    Ok(EncodedImage {
        bytes,
        mime: JPEG_MIME,
        quality,
    })
}

/// Fixed-target ordered collection of encoded images.
pub struct Batch {
    images: Vec<EncodedImage>,
    target: usize,
}

impl Batch {
    pub fn new(target: usize) -> Self {
        Self {
            images: Vec::with_capacity(target),
            target,
        }
    }

    /// Append an image in capture order. Returns false (and drops the
    /// image) once the batch is full.
    pub fn push(&mut self, image: EncodedImage) -> bool {
        if self.images.len() >= self.target {
            return false;
        }
        self.images.push(image);
        true
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn is_full(&self) -> bool {
        self.images.len() >= self.target
    }

    pub fn images(&self) -> &[EncodedImage] {
        &self.images
    }

    /// Wire form: one data URL per image, in capture order.
    pub fn to_data_urls(&self) -> Vec<String> {
        self.images.iter().map(EncodedImage::to_data_url).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut pixels = vec![0u8; (width * height * 3) as usize];
        for (i, px) in pixels.iter_mut().enumerate() {
            *px = (i % 251) as u8;
        }
        Frame::new(width, height, pixels)
    }

    #[test]
    fn encode_rejects_zero_dimensions() {
        let frame = Frame::new(0, 480, vec![]);
        assert!(matches!(
            encode_jpeg(&frame, 0.8),
            Err(Error::InvalidFrame(_))
        ));
    }

    #[test]
    fn encode_rejects_mismatched_buffer() {
        let frame = Frame::new(4, 4, vec![0u8; 7]);
        assert!(matches!(
            encode_jpeg(&frame, 0.8),
            Err(Error::InvalidFrame(_))
        ));
    }

    #[test]
    fn encode_rejects_out_of_range_quality() {
        let frame = gradient_frame(8, 8);
        assert!(encode_jpeg(&frame, 0.0).is_err());
        assert!(encode_jpeg(&frame, 1.5).is_err());
    }

    #[test]
    fn encoded_size_non_decreasing_with_quality() {
        let frame = gradient_frame(64, 48);
        let low = encode_jpeg(&frame, 0.2).unwrap();
        let mid = encode_jpeg(&frame, 0.6).unwrap();
        let high = encode_jpeg(&frame, 0.95).unwrap();
        assert!(low.byte_len() <= mid.byte_len());
        assert!(mid.byte_len() <= high.byte_len());
    }

    #[test]
    fn data_url_carries_jpeg_mime() {
        let frame = gradient_frame(8, 8);
        let image = encode_jpeg(&frame, 0.8).unwrap();
        let url = image.to_data_url();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        // SOI marker survives the base64 round trip.
        let payload = url.split(',').nth(1).unwrap();
        let decoded = BASE64.decode(payload).unwrap();
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn batch_preserves_order_and_caps_at_target() {
        let frame = gradient_frame(8, 8);
        let mut batch = Batch::new(3);
        for _ in 0..3 {
            assert!(batch.push(encode_jpeg(&frame, 0.8).unwrap()));
        }
        assert!(batch.is_full());
        assert!(!batch.push(encode_jpeg(&frame, 0.8).unwrap()));
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.to_data_urls().len(), 3);
    }
}
