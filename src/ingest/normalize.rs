use std::io::Cursor;

use image::{ImageFormat, RgbImage};

use crate::error::IngestError;

/// Decode/encode pair used to rewrite BMP input before the engine reads it.
///
/// The engine's bitmap reader only accepts a subset of valid BMP variants
/// (compression modes, header versions). Round-tripping through a conformant
/// codec yields a plain file the reader is known to handle.
pub trait BitmapCodec {
    fn decode(&self, bytes: &[u8]) -> Result<RgbImage, IngestError>;

    fn encode(&self, pixels: &RgbImage) -> Result<Vec<u8>, IngestError>;

    /// Decode then re-encode `bytes`.
    fn normalize(&self, bytes: &[u8]) -> Result<Vec<u8>, IngestError> {
        let pixels = self.decode(bytes)?;
        self.encode(&pixels)
    }
}

/// `image`-crate codec producing 24-bit uncompressed BMP. Alpha is dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageBmpCodec;

impl BitmapCodec for ImageBmpCodec {
    fn decode(&self, bytes: &[u8]) -> Result<RgbImage, IngestError> {
        let img = image::load_from_memory_with_format(bytes, ImageFormat::Bmp)?;
        Ok(img.to_rgb8())
    }

    fn encode(&self, pixels: &RgbImage) -> Result<Vec<u8>, IngestError> {
        let mut out = Vec::new();
        pixels.write_to(&mut Cursor::new(&mut out), ImageFormat::Bmp)?;
        Ok(out)
    }
}
