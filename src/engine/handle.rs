use std::fmt;

use anyhow::Result;

/// Bytes per pixel for raw buffers handed to [`RecognitionSession::set_image`].
pub const PIXEL_DEPTH_BYTES: u32 = 4;

/// Result code returned by [`RecognitionSession::set_image_file`] when the
/// engine could not read its input slot.
pub const SET_IMAGE_FILE_FAILED: i32 = 1;

/// Virtual filesystem path the engine reads encoded images from.
pub const DEFAULT_INPUT_PATH: &str = "/input";

/// Address inside the engine's flat heap.
///
/// Engines modelled here are 32-bit address spaces (a WASM linear memory, or a
/// native module compiled for one). Address zero is never a valid allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativePtr(u32);

impl NativePtr {
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    pub const fn addr(self) -> u32 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NativePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Memory and filesystem primitives of a loaded OCR engine.
///
/// # Ownership
///
/// The handle is owned by the caller. Memory returned by `malloc` belongs to
/// the engine's heap; whoever allocated it must hand it back through `free`
/// exactly once.
pub trait EngineHandle {
    /// Allocate `size` bytes on the engine heap.
    fn malloc(&mut self, size: usize) -> Result<NativePtr>;

    /// Release an allocation previously returned by `malloc`.
    fn free(&mut self, ptr: NativePtr);

    /// Copy `bytes` into the heap starting at `ptr`.
    fn heap_write(&mut self, ptr: NativePtr, bytes: &[u8]) -> Result<()>;

    /// Write `bytes` to `path` in the engine's virtual filesystem, replacing
    /// any previous contents.
    fn write_file(&mut self, path: &str, bytes: &[u8]) -> Result<()>;
}

impl<T: EngineHandle + ?Sized> EngineHandle for &mut T {
    fn malloc(&mut self, size: usize) -> Result<NativePtr> {
        (**self).malloc(size)
    }

    fn free(&mut self, ptr: NativePtr) {
        (**self).free(ptr)
    }

    fn heap_write(&mut self, ptr: NativePtr, bytes: &[u8]) -> Result<()> {
        (**self).heap_write(ptr, bytes)
    }

    fn write_file(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        (**self).write_file(path, bytes)
    }
}

/// Image submission entry points of a recognition job bound to an engine.
pub trait RecognitionSession {
    /// Point the engine at raw pixels already resident on its heap.
    ///
    /// The engine reads the buffer in place; it must stay allocated until the
    /// next submission.
    fn set_image(&mut self, ptr: NativePtr, width: u32, height: u32, depth: u32, stride: u32);

    /// Load the encoded image from the engine's input slot.
    ///
    /// Returns [`SET_IMAGE_FILE_FAILED`] when the file cannot be read.
    fn set_image_file(&mut self, exif_orientation: u8, angle: i32) -> i32;
}

impl<T: RecognitionSession + ?Sized> RecognitionSession for &mut T {
    fn set_image(&mut self, ptr: NativePtr, width: u32, height: u32, depth: u32, stride: u32) {
        (**self).set_image(ptr, width, height, depth, stride)
    }

    fn set_image_file(&mut self, exif_orientation: u8, angle: i32) -> i32 {
        (**self).set_image_file(exif_orientation, angle)
    }
}
