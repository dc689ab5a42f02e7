//! Frame encoding to the wire image format.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use remora_core::ImageFormat;
use remora_core::constants::DEFAULT_JPEG_QUALITY;

use crate::errors::SurfaceError;
use crate::surface::Capture;

/// Turns a [`Capture`] into publishable bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameEncoder {
    quality: u8,
}

impl FrameEncoder {
    /// Encoder at `quality`, clamped to 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Effective JPEG quality.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode raw pixels to JPEG; pre-encoded captures pass through.
    ///
    /// Empty output is an error so that nothing blank is ever published.
    pub fn encode(&self, capture: Capture) -> Result<(Bytes, ImageFormat), SurfaceError> {
        let (data, format) = match capture {
            Capture::Encoded { data, format } => (data, format),
            Capture::Raw(image) => (encode_jpeg(image, self.quality)?, ImageFormat::Jpeg),
        };
        if data.is_empty() {
            return Err(SurfaceError::Encode("empty frame".into()));
        }
        Ok((data, format))
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

/// JPEG-encode an RGBA image (alpha is dropped).
pub fn encode_jpeg(image: RgbaImage, quality: u8) -> Result<Bytes, SurfaceError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(SurfaceError::Encode("zero-sized image".into()));
    }
    let rgb = DynamicImage::ImageRgba8(image).into_rgb8();
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)?;
    Ok(Bytes::from(buf.into_inner()))
}
