// SPDX-License-Identifier: MIT OR Apache-2.0

//! # In-Memory Device
//!
//! A [`Device`] backed by a mutex-protected byte buffer, for tests and for
//! embedding programs that want to inspect log output programmatically.
//!
//! ## Architecture
//!
//! The buffer lives in an `Arc`, shared between the [`MemoryDevice`] handle you
//! hold and the [`Device`] you bind into a [`LogSystem`](crate::LogSystem).  The
//! background flusher appends to it; your thread reads it.  Every operation takes
//! the buffer's mutex, so reads never observe a partially appended chunk.
//!
//! Remember that lines reach the buffer on the bulk flush period, not when the
//! logging call returns.  Call [`LogSystem::shutdown`](crate::LogSystem::shutdown)
//! (which performs a final flush) before asserting on the contents.
//!
//! # Example
//!
//! ```rust
//! use linewise::{Config, LogSystem, MemoryDevice, Route};
//!
//! let memory = MemoryDevice::new();
//! let system = LogSystem::new();
//! system.init(Config::for_tests("APP", 10).route(Route::all(memory.device())));
//! system.log().warnf("ctx", "main", format_args!("disk at {}%", 91));
//! system.shutdown();
//!
//! assert_eq!(
//!     memory.contents(),
//!     "2009/11/10 15:00:00.000: APP[69910]: file.go#512: ctx: main: Warning: disk at 91%\n"
//! );
//! ```

use crate::device::{Device, Sink};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MemorySink {
    bytes: Mutex<Vec<u8>>,
}

impl Sink for MemorySink {
    fn write_bytes(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.bytes.lock().extend_from_slice(bytes);
        Ok(())
    }
}

/// A synchronized in-memory buffer usable as a [`Device`].
#[derive(Clone)]
pub struct MemoryDevice {
    sink: Arc<MemorySink>,
    device: Device,
}

// ============================================================================
// BOILERPLATE TRAIT IMPLEMENTATIONS
// ============================================================================
//
// - Clone: clones share the same buffer and the same Device identity
// - Debug: delegates to the Device identity
// - Default: an empty buffer
// - PartialEq/Eq: NOT implemented - compare `device()` if identity is wanted

impl Default for MemoryDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDevice")
            .field("device", &self.device)
            .field("len", &self.len())
            .finish()
    }
}

impl MemoryDevice {
    pub fn new() -> Self {
        let sink = Arc::new(MemorySink::default());
        let device = Device::from_arc(sink.clone());
        Self { sink, device }
    }

    /// The device handle to bind.  Always the same identity for this buffer.
    pub fn device(&self) -> Device {
        self.device.clone()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.sink.bytes.lock()).into_owned()
    }

    /// Returns the contents and clears the buffer.
    pub fn drain(&self) -> String {
        let bytes = std::mem::take(&mut *self.sink.bytes.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Copies the contents into `writer` and clears the buffer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<usize> {
        let bytes = std::mem::take(&mut *self.sink.bytes.lock());
        writer.write_all(&bytes)?;
        Ok(bytes.len())
    }

    pub fn reset(&self) {
        self.sink.bytes.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.sink.bytes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
