use std::path::Path;

use super::sniff::{sniff, EncodedKind};
use crate::engine::PIXEL_DEPTH_BYTES;
use crate::error::IngestError;

/// Decoded RGBA pixels, four bytes per pixel, rows packed without padding.
///
/// This is the shape a browser `ImageData` or an `image::RgbaImage` has. The
/// samples are handed to the engine as-is: the engine's native layout is
/// BGRA, so red and blue arrive swapped. Recognition does not depend on
/// channel order, and the ingestor does not reorder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap RGBA samples. `data` must hold exactly `width * height * 4` bytes
    /// and neither dimension may be zero.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, IngestError> {
        if width == 0 || height == 0 {
            return Err(IngestError::invalid(format!(
                "RGBA buffer must not be empty, got {}x{}",
                width, height
            )));
        }
        // With both dimensions non-zero this also bounds the row stride.
        let expected = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(PIXEL_DEPTH_BYTES))
            .ok_or_else(|| IngestError::invalid("RGBA buffer dimensions overflow"))?
            as usize;
        if data.len() != expected {
            return Err(IngestError::invalid(format!(
                "RGBA buffer length mismatch: expected {}, got {}",
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn stride(&self) -> u32 {
        self.width * PIXEL_DEPTH_BYTES
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

impl TryFrom<image::RgbaImage> for PixelBuffer {
    type Error = IngestError;

    fn try_from(img: image::RgbaImage) -> Result<Self, IngestError> {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }
}

/// An image as handed to the ingestor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputImage {
    /// Already-decoded RGBA pixels.
    Pixels(PixelBuffer),
    /// Bytes of an encoded file (BMP, JPEG, PNG, ...) or anything else the
    /// engine's readers may accept.
    Encoded(Vec<u8>),
}

impl InputImage {
    pub fn pixels(width: u32, height: u32, data: Vec<u8>) -> Result<Self, IngestError> {
        PixelBuffer::new(width, height, data).map(InputImage::Pixels)
    }

    pub fn encoded(bytes: impl Into<Vec<u8>>) -> Self {
        InputImage::Encoded(bytes.into())
    }

    /// Read a file from the host filesystem as an encoded stream.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(InputImage::Encoded(bytes))
    }

    /// Short label for logs and reports.
    pub fn kind(&self) -> String {
        match self {
            InputImage::Pixels(_) => "pixels".to_string(),
            InputImage::Encoded(bytes) => match sniff(bytes) {
                EncodedKind::Bitmap => "bmp".to_string(),
                EncodedKind::Passthrough => image::guess_format(bytes)
                    .map(|f| format!("{:?}", f).to_lowercase())
                    .unwrap_or_else(|_| "unknown".to_string()),
            },
        }
    }
}

impl From<PixelBuffer> for InputImage {
    fn from(pixels: PixelBuffer) -> Self {
        InputImage::Pixels(pixels)
    }
}

impl From<Vec<u8>> for InputImage {
    fn from(bytes: Vec<u8>) -> Self {
        InputImage::Encoded(bytes)
    }
}
