//! Collaborator interfaces of the native OCR engine.
//!
//! - `handle`: the traits the ingestor drives (`EngineHandle`, `RecognitionSession`)
//! - `stub`: in-process engine emulation (tests, `ocr_ingest`)

mod handle;
pub mod stub;

pub use handle::{
    EngineHandle, NativePtr, RecognitionSession, DEFAULT_INPUT_PATH, PIXEL_DEPTH_BYTES,
    SET_IMAGE_FILE_FAILED,
};
pub use stub::{SessionCall, StubEngine, StubReport, StubSession};
