//! The ingestor: moves one image at a time into an engine.
//!
//! An `Ingestor` is bound to a single engine handle and owns at most one
//! native allocation, the pixel buffer of the most recent raw submission. The
//! engine reads that buffer in place, so it stays alive until the next
//! submission or until the ingestor is released or dropped. Every submission
//! releases it first, so at most one buffer is ever outstanding, failed
//! submissions included.
//!
//! Submissions on one engine must be serialized by the caller. The ingestor
//! takes `&mut self` and holds no locks.

use super::input::{InputImage, PixelBuffer};
use super::normalize::{BitmapCodec, ImageBmpCodec};
use super::orientation::scan_orientation;
use super::sniff::{sniff, EncodedKind};
use crate::engine::{
    EngineHandle, NativePtr, RecognitionSession, DEFAULT_INPUT_PATH, PIXEL_DEPTH_BYTES,
    SET_IMAGE_FILE_FAILED,
};
use crate::error::IngestError;

/// Native allocation holding the pixels of the last raw submission.
///
/// Not `Clone` or `Copy`: exactly one owner is responsible for freeing it.
#[derive(Debug)]
struct PendingBuffer {
    ptr: NativePtr,
    len: usize,
}

/// Feeds images into an OCR engine.
pub struct Ingestor<E: EngineHandle, C: BitmapCodec = ImageBmpCodec> {
    engine: E,
    codec: C,
    input_path: String,
    pending: Option<PendingBuffer>,
}

impl<E: EngineHandle> Ingestor<E> {
    pub fn new(engine: E) -> Self {
        Self::with_codec(engine, ImageBmpCodec)
    }

    /// Build an ingestor that writes encoded input to `cfg.input_path`.
    pub fn from_config(
        engine: E,
        cfg: &crate::config::IngestConfig,
    ) -> Result<Self, IngestError> {
        Self::new(engine).with_input_path(&cfg.input_path)
    }
}

impl<E: EngineHandle, C: BitmapCodec> Ingestor<E, C> {
    pub fn with_codec(engine: E, codec: C) -> Self {
        Self {
            engine,
            codec,
            input_path: DEFAULT_INPUT_PATH.to_string(),
            pending: None,
        }
    }

    /// Change the virtual path encoded images are written to. The engine
    /// filesystem has no working directory, so `path` must be absolute.
    pub fn with_input_path(mut self, path: &str) -> Result<Self, IngestError> {
        if !path.starts_with('/') {
            return Err(IngestError::invalid(format!(
                "input path must be an absolute engine path, got {:?}",
                path
            )));
        }
        self.input_path = path.to_string();
        Ok(self)
    }

    pub fn input_path(&self) -> &str {
        &self.input_path
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Address and size of the buffer currently lent to the engine.
    pub fn pending_buffer(&self) -> Option<(NativePtr, usize)> {
        self.pending.as_ref().map(|buf| (buf.ptr, buf.len))
    }

    /// Hand `image` to the engine through `session`.
    ///
    /// `angle` is the rotation hint for encoded input; raw pixels only accept
    /// zero. Encoded input is written to the engine's input slot, which is
    /// left in place even when the engine rejects it.
    pub fn submit<S>(
        &mut self,
        session: &mut S,
        image: &InputImage,
        angle: i32,
    ) -> Result<(), IngestError>
    where
        S: RecognitionSession + ?Sized,
    {
        self.release();

        match image {
            InputImage::Pixels(pixels) => self.submit_pixels(session, pixels, angle),
            InputImage::Encoded(bytes) => self.submit_encoded(session, bytes, angle),
        }
    }

    fn submit_pixels<S>(
        &mut self,
        session: &mut S,
        pixels: &PixelBuffer,
        angle: i32,
    ) -> Result<(), IngestError>
    where
        S: RecognitionSession + ?Sized,
    {
        if angle != 0 {
            return Err(IngestError::invalid(
                "non-zero angles are unsupported for raw pixel input",
            ));
        }

        let len = pixels.byte_len();
        let ptr = self.engine.malloc(len)?;
        self.pending = Some(PendingBuffer { ptr, len });
        self.engine.heap_write(ptr, pixels.as_bytes())?;

        log::debug!(
            "submitting {}x{} raw pixels ({} bytes) at {}",
            pixels.width(),
            pixels.height(),
            len,
            ptr
        );
        session.set_image(
            ptr,
            pixels.width(),
            pixels.height(),
            PIXEL_DEPTH_BYTES,
            pixels.stride(),
        );
        Ok(())
    }

    fn submit_encoded<S>(
        &mut self,
        session: &mut S,
        bytes: &[u8],
        angle: i32,
    ) -> Result<(), IngestError>
    where
        S: RecognitionSession + ?Sized,
    {
        let exif_orientation = scan_orientation(bytes);

        match sniff(bytes) {
            EncodedKind::Bitmap => {
                let normalized = self.codec.normalize(bytes)?;
                log::debug!(
                    "normalized bitmap {} -> {} bytes",
                    bytes.len(),
                    normalized.len()
                );
                self.engine.write_file(&self.input_path, &normalized)?;
            }
            EncodedKind::Passthrough => {
                self.engine.write_file(&self.input_path, bytes)?;
            }
        }

        log::debug!(
            "submitting {} encoded bytes via {} (orientation {}, angle {})",
            bytes.len(),
            self.input_path,
            exif_orientation,
            angle
        );
        if session.set_image_file(exif_orientation, angle) == SET_IMAGE_FILE_FAILED {
            log::warn!("engine could not read image at {}", self.input_path);
            return Err(IngestError::UnreadableImage);
        }
        Ok(())
    }

    /// Free the pending buffer, if any. The engine must no longer be
    /// reading from a raw submission when this is called.
    pub fn release(&mut self) {
        if let Some(buf) = self.pending.take() {
            log::trace!("releasing pending buffer {} ({} bytes)", buf.ptr, buf.len);
            self.engine.free(buf.ptr);
        }
    }
}

impl<E: EngineHandle, C: BitmapCodec> Drop for Ingestor<E, C> {
    fn drop(&mut self) {
        self.release();
    }
}
