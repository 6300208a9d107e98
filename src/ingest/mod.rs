//! Image ingestion into an OCR engine.
//!
//! This module turns caller images into something the engine can load:
//! - `input`: the accepted input shapes (`InputImage`, `PixelBuffer`)
//! - `sniff`: BMP detection by magic marker
//! - `orientation`: bounded EXIF orientation tag scan
//! - `normalize`: BMP decode/re-encode (`BitmapCodec`)
//! - `ingestor`: the submission flow and pending buffer ownership
//!
//! Raw pixels go to the engine heap and are submitted in place. Encoded
//! streams go to the engine's virtual input file and are submitted with the
//! detected orientation.
//!
//! The ingestion layer MUST NOT:
//! - Reorder pixel channels (the engine tolerates RGBA-as-BGRA)
//! - Hold more than one native allocation per engine
//! - Retry or try alternate decoders when the engine rejects an image

mod ingestor;
mod input;
pub mod normalize;
pub mod orientation;
pub mod sniff;

pub use ingestor::Ingestor;
pub use input::{InputImage, PixelBuffer};
pub use normalize::{BitmapCodec, ImageBmpCodec};
pub use orientation::{scan_orientation, DEFAULT_ORIENTATION, ORIENTATION_SCAN_WINDOW};
pub use sniff::{is_bitmap, sniff, EncodedKind};
