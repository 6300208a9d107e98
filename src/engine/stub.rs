//! In-process stand-in for a native OCR engine.
//!
//! `StubEngine` emulates the pieces of a loaded engine module that image
//! ingestion touches: a bounded flat heap with an allocator, a virtual
//! filesystem, and recognition sessions that read from both. Sessions decode
//! the input slot with the `image` crate the way the engine's own readers
//! would, so a stream the engine cannot read yields the failure code.
//!
//! Engine state is shared between the handle, its clones and every session
//! created from it. It is single-threaded (`Rc<RefCell<_>>`), matching the
//! one-flow-per-engine model of the ingestor.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use anyhow::{anyhow, bail, Result};
use serde::Serialize;

use super::handle::{
    EngineHandle, NativePtr, RecognitionSession, DEFAULT_INPUT_PATH, SET_IMAGE_FILE_FAILED,
};

/// First address handed out by the allocator. Keeps zero reserved as null.
const HEAP_BASE: u32 = 16;
const HEAP_ALIGN: u32 = 8;

/// A submission observed by a stub session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum SessionCall {
    SetImage {
        ptr: u32,
        width: u32,
        height: u32,
        depth: u32,
        stride: u32,
        /// Snapshot of `stride * height` heap bytes at call time.
        #[serde(skip)]
        pixels: Vec<u8>,
    },
    SetImageFile {
        exif_orientation: u8,
        angle: i32,
        result: i32,
        /// Decoded format, when the input slot was readable.
        format: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    },
}

/// Serializable summary of stub engine state.
#[derive(Clone, Debug, Serialize)]
pub struct StubReport {
    pub live_allocations: usize,
    pub live_bytes: usize,
    pub total_allocations: u64,
    pub total_frees: u64,
    pub invalid_frees: u64,
    /// Virtual filesystem contents as `path -> byte length`.
    pub files: BTreeMap<String, usize>,
    pub calls: Vec<SessionCall>,
}

struct StubState {
    heap: Vec<u8>,
    heap_limit: usize,
    allocations: BTreeMap<u32, usize>,
    files: HashMap<String, Vec<u8>>,
    input_path: String,
    total_allocations: u64,
    total_frees: u64,
    invalid_frees: u64,
    calls: Vec<SessionCall>,
}

impl StubState {
    fn find_slot(&self, size: usize) -> Option<u32> {
        let mut cursor = HEAP_BASE as usize;
        for (&addr, &len) in &self.allocations {
            if (addr as usize).saturating_sub(cursor) >= size {
                break;
            }
            cursor = align_up(addr as usize + len.max(1));
        }
        let end = cursor.checked_add(size)?;
        if end > self.heap_limit || end > u32::MAX as usize {
            return None;
        }
        Some(cursor as u32)
    }

    fn read(&self, ptr: NativePtr, len: usize) -> Option<&[u8]> {
        let start = ptr.addr() as usize;
        let end = start.checked_add(len)?;
        self.heap.get(start..end)
    }
}

/// Emulated engine handle. Clones share the same engine.
#[derive(Clone)]
pub struct StubEngine {
    state: Rc<RefCell<StubState>>,
}

impl StubEngine {
    pub fn new(heap_limit_bytes: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(StubState {
                heap: Vec::new(),
                heap_limit: heap_limit_bytes,
                allocations: BTreeMap::new(),
                files: HashMap::new(),
                input_path: DEFAULT_INPUT_PATH.to_string(),
                total_allocations: 0,
                total_frees: 0,
                invalid_frees: 0,
                calls: Vec::new(),
            })),
        }
    }

    /// Build an engine from loaded configuration.
    pub fn from_config(cfg: &crate::config::IngestConfig) -> Self {
        Self::new(cfg.stub_engine.heap_limit_bytes).with_input_path(&cfg.input_path)
    }

    /// Change the path sessions read encoded images from.
    pub fn with_input_path(self, path: &str) -> Self {
        self.state.borrow_mut().input_path = path.to_string();
        self
    }

    /// Open a recognition session bound to this engine.
    pub fn session(&self) -> StubSession {
        StubSession {
            state: Rc::clone(&self.state),
        }
    }

    /// Outstanding allocations as `(address, size)`, lowest address first.
    pub fn live_allocations(&self) -> Vec<(NativePtr, usize)> {
        self.state
            .borrow()
            .allocations
            .iter()
            .map(|(&addr, &len)| (NativePtr::new(addr), len))
            .collect()
    }

    pub fn total_allocations(&self) -> u64 {
        self.state.borrow().total_allocations
    }

    pub fn total_frees(&self) -> u64 {
        self.state.borrow().total_frees
    }

    /// Frees of addresses that were not live (double frees included).
    pub fn invalid_frees(&self) -> u64 {
        self.state.borrow().invalid_frees
    }

    /// Copy `len` heap bytes starting at `ptr`.
    pub fn heap_slice(&self, ptr: NativePtr, len: usize) -> Option<Vec<u8>> {
        self.state.borrow().read(ptr, len).map(|bytes| bytes.to_vec())
    }

    /// Contents of a file in the virtual filesystem.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.borrow().files.get(path).cloned()
    }

    /// Submissions observed by every session of this engine, oldest first.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.state.borrow().calls.clone()
    }

    pub fn report(&self) -> StubReport {
        let state = self.state.borrow();
        StubReport {
            live_allocations: state.allocations.len(),
            live_bytes: state.allocations.values().sum(),
            total_allocations: state.total_allocations,
            total_frees: state.total_frees,
            invalid_frees: state.invalid_frees,
            files: state
                .files
                .iter()
                .map(|(path, bytes)| (path.clone(), bytes.len()))
                .collect(),
            calls: state.calls.clone(),
        }
    }
}

impl EngineHandle for StubEngine {
    fn malloc(&mut self, size: usize) -> Result<NativePtr> {
        let mut state = self.state.borrow_mut();
        let addr = state.find_slot(size.max(1)).ok_or_else(|| {
            anyhow!(
                "stub engine out of memory: {} bytes requested, heap limit {}",
                size,
                state.heap_limit
            )
        })?;
        let end = addr as usize + size.max(1);
        if state.heap.len() < end {
            state.heap.resize(end, 0);
        }
        state.allocations.insert(addr, size);
        state.total_allocations += 1;
        Ok(NativePtr::new(addr))
    }

    fn free(&mut self, ptr: NativePtr) {
        if ptr.is_null() {
            return;
        }
        let mut state = self.state.borrow_mut();
        if state.allocations.remove(&ptr.addr()).is_some() {
            state.total_frees += 1;
        } else {
            state.invalid_frees += 1;
            log::warn!("stub engine: free of non-live address {}", ptr);
        }
    }

    fn heap_write(&mut self, ptr: NativePtr, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let start = ptr.addr() as usize;
        let (&base, &len) = state
            .allocations
            .range(..=ptr.addr())
            .next_back()
            .ok_or_else(|| anyhow!("heap write to unallocated address {}", ptr))?;
        let end = start
            .checked_add(bytes.len())
            .ok_or_else(|| anyhow!("heap write length overflow"))?;
        if end > base as usize + len {
            bail!(
                "heap write of {} bytes at {} overruns allocation of {} bytes",
                bytes.len(),
                ptr,
                len
            );
        }
        state.heap[start..end].copy_from_slice(bytes);
        Ok(())
    }

    fn write_file(&mut self, path: &str, bytes: &[u8]) -> Result<()> {
        if !path.starts_with('/') {
            bail!("virtual filesystem paths must be absolute: {}", path);
        }
        self.state
            .borrow_mut()
            .files
            .insert(path.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Recognition session of a [`StubEngine`].
pub struct StubSession {
    state: Rc<RefCell<StubState>>,
}

impl RecognitionSession for StubSession {
    fn set_image(&mut self, ptr: NativePtr, width: u32, height: u32, depth: u32, stride: u32) {
        let mut state = self.state.borrow_mut();
        let len = stride as usize * height as usize;
        let pixels = match state.read(ptr, len) {
            Some(bytes) => bytes.to_vec(),
            None => {
                log::warn!(
                    "stub session: set_image buffer {} (+{} bytes) outside heap",
                    ptr,
                    len
                );
                Vec::new()
            }
        };
        state.calls.push(SessionCall::SetImage {
            ptr: ptr.addr(),
            width,
            height,
            depth,
            stride,
            pixels,
        });
    }

    fn set_image_file(&mut self, exif_orientation: u8, angle: i32) -> i32 {
        let mut state = self.state.borrow_mut();
        let decoded = state.files.get(&state.input_path).map(|bytes| {
            let format = image::guess_format(bytes).ok();
            image::load_from_memory(bytes).map(|img| (format, img.width(), img.height()))
        });
        let call = match decoded {
            Some(Ok((format, width, height))) => SessionCall::SetImageFile {
                exif_orientation,
                angle,
                result: 0,
                format: format.map(|f| format!("{:?}", f).to_lowercase()),
                width: Some(width),
                height: Some(height),
            },
            Some(Err(e)) => {
                log::debug!("stub session: input slot unreadable: {}", e);
                failed_file_call(exif_orientation, angle)
            }
            None => {
                log::debug!("stub session: no file at {}", state.input_path);
                failed_file_call(exif_orientation, angle)
            }
        };
        let result = match call {
            SessionCall::SetImageFile { result, .. } => result,
            _ => SET_IMAGE_FILE_FAILED,
        };
        state.calls.push(call);
        result
    }
}

fn failed_file_call(exif_orientation: u8, angle: i32) -> SessionCall {
    SessionCall::SetImageFile {
        exif_orientation,
        angle,
        result: SET_IMAGE_FILE_FAILED,
        format: None,
        width: None,
        height: None,
    }
}

fn align_up(value: usize) -> usize {
    let align = HEAP_ALIGN as usize;
    value.div_ceil(align) * align
}
