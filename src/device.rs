// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output devices and the category routing table.
//!
//! Every line linewise writes belongs to one [`Category`] (started/completed,
//! errors, panics, traces, warnings, queries, data dumps, splunk lines).  Each
//! category is bound to at most one [`Device`], and the binding can change at any
//! time, from any thread.
//!
//! # Architecture
//!
//! A [`Device`] is a cheaply cloneable handle around an `Arc<dyn Sink>`.  Two
//! handles are equal when they point at the same allocation, which lets the
//! background writer key its per-destination buffers by device.
//!
//! The [`DeviceTable`] is a fixed array of optional devices, one per category,
//! behind a `parking_lot::RwLock`.  Lookups take the shared lock and clone the
//! handle out; rebinding takes the exclusive lock.  [`DeviceTable::bind_all`]
//! rebinds every category under a single acquisition, so readers never observe a
//! half-applied "all" binding.
//!
//! # Defaults
//!
//! When a [`LogSystem`](crate::LogSystem) is initialized the table is reset to:
//!
//! | Category                                    | Device   |
//! |---------------------------------------------|----------|
//! | `Error`, `Panic`, `Warning`                 | stderr   |
//! | `Start`, `Trace`, `Query`, `Data`, `Splunk` | stdout   |
//!
//! and then the configured [`Route`]s are applied in order.
//!
//! # Examples
//!
//! ```
//! use linewise::{Category, Device, DeviceTable, Route};
//!
//! let table = DeviceTable::new();
//! table.reset(&[Route::only(Category::Trace, Device::stderr())]);
//! assert_eq!(table.get(Category::Trace), Some(Device::stderr()));
//! assert_eq!(table.get(Category::Query), Some(Device::stdout()));
//! ```

use parking_lot::{Mutex, RwLock};
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::sync::{Arc, OnceLock};

/**
A destination for rendered bytes.

Implementations receive whole coalesced chunks (one or more complete lines).  A
sink may block; the background writer isolates every device on its own flusher
thread, so a slow sink only delays itself.
*/
pub trait Sink: Send + Sync + 'static {
    fn write_bytes(&self, bytes: &[u8]) -> std::io::Result<()>;
}

impl<W: Write + Send + 'static> Sink for Mutex<W> {
    fn write_bytes(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut writer = self.lock();
        writer.write_all(bytes)?;
        writer.flush()
    }
}

struct StdoutSink;

impl Sink for StdoutSink {
    fn write_bytes(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut lock = std::io::stdout().lock();
        lock.write_all(bytes)?;
        lock.flush()
    }
}

struct StderrSink;

impl Sink for StderrSink {
    fn write_bytes(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut lock = std::io::stderr().lock();
        lock.write_all(bytes)?;
        lock.flush()
    }
}

static STDOUT: OnceLock<Device> = OnceLock::new();
static STDERR: OnceLock<Device> = OnceLock::new();

/**
A handle to an output destination.

Cloning is cheap (an `Arc` increment).  Equality and hashing are by identity:
two handles are equal only if they were cloned from the same original.
*/
#[derive(Clone)]
pub struct Device {
    sink: Arc<dyn Sink>,
}

impl Device {
    /// Wraps any writer.  Writes are serialized by an internal mutex.
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self::from_sink(Mutex::new(writer))
    }

    /// Wraps a custom [`Sink`].
    pub fn from_sink<S: Sink>(sink: S) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Wraps an already shared [`Sink`], keeping the caller's handle to it.
    pub fn from_arc(sink: Arc<dyn Sink>) -> Self {
        Self { sink }
    }

    /// The process standard output.  Every call returns the same device.
    pub fn stdout() -> Self {
        STDOUT
            .get_or_init(|| Device::from_sink(StdoutSink))
            .clone()
    }

    /// The process standard error.  Every call returns the same device.
    pub fn stderr() -> Self {
        STDERR
            .get_or_init(|| Device::from_sink(StderrSink))
            .clone()
    }

    pub(crate) fn write_bytes(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.sink.write_bytes(bytes)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.sink) as *const () as usize
    }
}

// ============================================================================
// BOILERPLATE TRAIT IMPLEMENTATIONS
// ============================================================================
//
// - PartialEq/Eq/Hash: identity of the shared sink, so a Device can key a map
// - Debug: prints the identity; sinks themselves are not required to be Debug
// - Default: NOT implemented - there is no obvious default destination
// - Ord: NOT implemented - addresses have no meaningful order

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Device {}

impl Hash for Device {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Device({:#x})", self.addr())
    }
}

/// The routable line categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    /// `Started:` and `Completed:` lines.
    Start,
    /// `ERROR:` and `Completed ERROR:` lines, and fatal terminations.
    Error,
    /// Lines written by the panic entry points.
    Panic,
    Trace,
    Warning,
    Query,
    /// `DATA:` lines and blocks.
    Data,
    /// Compact `key=value` lines.
    Splunk,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Start,
        Category::Error,
        Category::Panic,
        Category::Trace,
        Category::Warning,
        Category::Query,
        Category::Data,
        Category::Splunk,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    fn default_device(self) -> Device {
        match self {
            Category::Error | Category::Panic | Category::Warning => Device::stderr(),
            Category::Start
            | Category::Trace
            | Category::Query
            | Category::Data
            | Category::Splunk => Device::stdout(),
        }
    }
}

/**
A binding applied when a [`LogSystem`](crate::LogSystem) is initialized.

`Route::All` is an operation over every category, not a stored binding.  A
`None` device unbinds, which silently drops lines for that category.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    All(Option<Device>),
    Only(Category, Option<Device>),
}

impl Route {
    pub fn all(device: Device) -> Self {
        Route::All(Some(device))
    }

    pub fn only(category: Category, device: Device) -> Self {
        Route::Only(category, Some(device))
    }
}

/// Category → device bindings behind a reader/writer lock.
#[derive(Debug, Default)]
pub struct DeviceTable {
    slots: RwLock<[Option<Device>; 8]>,
}

impl DeviceTable {
    /// An empty table; every category is unbound until [`reset`](Self::reset).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the default bindings, then applies `routes` in order.
    pub fn reset(&self, routes: &[Route]) {
        {
            let mut slots = self.slots.write();
            for category in Category::ALL {
                slots[category.index()] = Some(category.default_device());
            }
        }
        for route in routes {
            self.apply(route);
        }
    }

    pub fn apply(&self, route: &Route) {
        match route {
            Route::All(device) => self.bind_all(device.clone()),
            Route::Only(category, device) => self.bind(*category, device.clone()),
        }
    }

    pub fn get(&self, category: Category) -> Option<Device> {
        self.slots.read()[category.index()].clone()
    }

    pub fn bind(&self, category: Category, device: Option<Device>) {
        self.slots.write()[category.index()] = device;
    }

    pub fn bind_all(&self, device: Option<Device>) {
        let mut slots = self.slots.write();
        for slot in slots.iter_mut() {
            *slot = device.clone();
        }
    }
}
