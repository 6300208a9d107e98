//! OCR image ingestion
//!
//! This crate prepares images for a native OCR engine (a Tesseract-style
//! module exposing a flat heap, a virtual filesystem and image-set calls) and
//! hands them over.
//!
//! # Flow
//!
//! `Ingestor::submit` takes one [`InputImage`]:
//!
//! 1. **Raw pixels** (`InputImage::Pixels`): copied verbatim into a fresh
//!    engine allocation and submitted in place with depth 4 and stride
//!    `width * 4`.
//! 2. **Encoded bytes** (`InputImage::Encoded`): BMP files are decoded and
//!    re-encoded into a plain 24-bit bitmap, everything else is passed
//!    through. The result is written to the engine's input file and
//!    submitted together with the orientation found in the stream's header.
//!
//! The ingestor owns at most one engine allocation at a time and frees it on
//! the next submission or when dropped.
//!
//! # Known limitation
//!
//! Raw pixels are RGBA; the engine's native layout is BGRA. No reordering is
//! done, so red and blue are swapped inside the engine. Text recognition is
//! insensitive to this.
//!
//! # Module Structure
//!
//! - `ingest`: input types, format sniffing, orientation scan, BMP normalization, `Ingestor`
//! - `engine`: engine collaborator traits and the in-process `StubEngine`
//! - `config`: configuration loading
//! - `error`: `IngestError`

pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;

pub use engine::{
    EngineHandle, NativePtr, RecognitionSession, SessionCall, StubEngine, StubReport,
    StubSession, DEFAULT_INPUT_PATH, PIXEL_DEPTH_BYTES, SET_IMAGE_FILE_FAILED,
};
pub use error::IngestError;
pub use ingest::{
    is_bitmap, scan_orientation, sniff, BitmapCodec, EncodedKind, ImageBmpCodec, Ingestor,
    InputImage, PixelBuffer, DEFAULT_ORIENTATION, ORIENTATION_SCAN_WINDOW,
};
