// SPDX-License-Identifier: MIT OR Apache-2.0

//! The logging pipeline as an owned object.
//!
//! A [`LogSystem`] bundles everything one live pipeline needs: the device
//! table, the dispatcher, the background writer and the per-cycle settings.
//! Embedding programs create one (or use the process-wide instance from
//! [`crate::system`]) and hand it to the [`Logger`](crate::Logger)s they build.
//!
//! # Lifecycle
//!
//! A new system is quiescent: every line is dropped.  [`LogSystem::init`] shuts
//! down any running cycle, resets the device table, and starts a fresh writer.
//! [`LogSystem::shutdown`] stops accepting lines, waits for the writer to flush
//! everything already queued, and returns.  Both are serialized by a lifecycle
//! mutex and are safe to call repeatedly, in any order.
//!
//! ```
//! use linewise::{Config, LogSystem, MemoryDevice, Route};
//!
//! let memory = MemoryDevice::new();
//! let system = LogSystem::new();
//! system.init(Config::for_tests("APP", 0).route(Route::all(memory.device())));
//! system.log().tracef("ctx", "main", format_args!("step {}", 1));
//! system.shutdown();
//! system.shutdown();
//!
//! assert!(memory.contents().ends_with("ctx: main: Trace: step 1\n"));
//! ```

use crate::call_site::{CallSite, Stamp, resolve, timestamp};
use crate::config::{Config, DEFAULT_BULK_PERIOD, DEFAULT_STALL_TIMEOUT, Fatal, TerminationHook};
use crate::device::{Category, Device, DeviceTable};
use crate::dispatch::{Backpressure, Dispatcher};
use crate::uplevel::Uplevel;
use crate::writer::{self, WriterShared};
use crossbeam_channel::bounded;
use parking_lot::{Mutex, RwLock};
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Default)]
struct Lifecycle {
    writer: Option<JoinHandle<()>>,
}

/// One logging pipeline.
pub struct LogSystem {
    devices: DeviceTable,
    dispatcher: Dispatcher,
    shared: WriterShared,
    lifecycle: Mutex<Lifecycle>,
    prefix: RwLock<Arc<str>>,
    deterministic: AtomicBool,
    termination: RwLock<TerminationHook>,
}

impl LogSystem {
    /// A quiescent system.  Nothing is written until [`init`](Self::init).
    pub fn new() -> Arc<Self> {
        let shared = WriterShared::new(DEFAULT_BULK_PERIOD);
        let defaults = Config::default();
        Arc::new(Self {
            devices: DeviceTable::new(),
            dispatcher: Dispatcher::new(shared.pending.clone(), DEFAULT_STALL_TIMEOUT),
            shared,
            lifecycle: Mutex::new(Lifecycle::default()),
            prefix: RwLock::new(Arc::from(defaults.prefix.as_str())),
            deterministic: AtomicBool::new(false),
            termination: RwLock::new(defaults.termination),
        })
    }

    /**
    Starts a logging cycle, shutting down the previous one first.

    The device table is reset to the defaults and then `config`'s routes are
    applied in order.  Safe to call repeatedly.
    */
    pub fn init(&self, config: Config) {
        let mut lifecycle = self.lifecycle.lock();
        self.stop(&mut lifecycle);

        *self.prefix.write() = Arc::from(config.prefix.as_str());
        *self.termination.write() = config.termination;
        self.deterministic.store(config.deterministic, Ordering::Release);
        self.shared.set_bulk_period(config.bulk_period);
        self.devices.reset(&config.routes);

        let (sender, lines) = bounded(config.queue_capacity);
        lifecycle.writer = writer::spawn(lines, self.shared.clone(), config.flush_grace);
        self.dispatcher.start(sender, config.stall_timeout);
    }

    /**
    Stops the current cycle.

    Blocks until every line accepted before the call has been handed to its
    device, or the flush grace has elapsed for devices that are stuck.  A no-op
    when nothing is running.
    */
    pub fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.lock();
        self.stop(&mut lifecycle);
    }

    fn stop(&self, lifecycle: &mut Lifecycle) {
        let was_running = self.dispatcher.close();
        if let Some(writer) = lifecycle.writer.take() {
            let _ = writer.join();
        }
        if was_running {
            self.deterministic.store(false, Ordering::Release);
        }
    }

    /// Whether a cycle is running.
    pub fn is_running(&self) -> bool {
        self.lifecycle.lock().writer.is_some()
    }

    /// How long a handoff may wait on a full queue before logging switches off.
    pub fn set_stall_timeout(&self, timeout: Duration) {
        self.dispatcher.set_stall_timeout(timeout);
    }

    pub fn stall_timeout(&self) -> Duration {
        self.dispatcher.stall_timeout()
    }

    /// Takes effect when the writer next rearms its flush deadline.
    pub fn set_bulk_flush_period(&self, period: Duration) {
        self.shared.set_bulk_period(period);
    }

    pub fn bulk_flush_period(&self) -> Duration {
        self.shared.bulk_period()
    }

    pub fn bind(&self, category: Category, device: Option<Device>) {
        self.devices.bind(category, device);
    }

    pub fn bind_all(&self, device: Option<Device>) {
        self.devices.bind_all(device);
    }

    pub fn device(&self, category: Category) -> Option<Device> {
        self.devices.get(category)
    }

    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }

    /**
    Hands rendered bytes to the background writer.

    Never fails: an absent device, a shut down system, or a stalled queue
    all drop the line.  Blocks for at most the stall timeout.
    */
    pub fn dispatch(&self, device: Option<&Device>, bytes: impl Into<Vec<u8>>) {
        self.dispatcher.dispatch(device, bytes.into());
    }

    /// The package-level proxy: no level gate, attributed to its caller.
    pub fn log(self: &Arc<Self>) -> Uplevel {
        Uplevel::new(self.clone(), None)
    }

    pub fn prefix(&self) -> Arc<str> {
        self.prefix.read().clone()
    }

    pub fn is_deterministic(&self) -> bool {
        self.deterministic.load(Ordering::Acquire)
    }

    /// Stalls and dropped lines since the last init.
    pub fn backpressure(&self) -> Backpressure {
        self.dispatcher.backpressure()
    }

    /// Lines handed to the queue that the writer has not buffered yet.
    pub fn pending(&self) -> i64 {
        self.dispatcher.pending()
    }

    /// Whether a stall has switched logging off.
    pub fn is_logging_off(&self) -> bool {
        self.dispatcher.is_logging_off()
    }

    /// Resolves the prelude fields with this system's deterministic setting.
    pub fn stamp(&self, site: Option<&CallSite>, function: &str) -> Stamp {
        resolve(site, function, self.is_deterministic())
    }

    pub(crate) fn timestamp(&self) -> String {
        timestamp(self.is_deterministic())
    }

    /// Flushes everything, then runs the termination hook.
    pub(crate) fn terminate(&self, fatal: Fatal) {
        self.shutdown();
        let hook = self.termination.read().clone();
        hook(fatal);
    }
}

impl Drop for LogSystem {
    fn drop(&mut self) {
        self.stop(&mut self.lifecycle.lock());
    }
}

impl Debug for LogSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSystem")
            .field("prefix", &self.prefix())
            .field("deterministic", &self.is_deterministic())
            .field("pending", &self.pending())
            .field("logging_off", &self.is_logging_off())
            .finish_non_exhaustive()
    }
}

/*
Boilerplate notes for LogSystem:

- Clone: NOT implemented - systems are shared through Arc
- PartialEq: NOT implemented - compare with Arc::ptr_eq
- Default: NOT implemented - `new` returns an Arc
- Debug: summary of the live state only
*/

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Route;
    use crate::memory_device::MemoryDevice;

    #[test]
    fn quiescent_before_init() {
        let memory = MemoryDevice::new();
        let system = LogSystem::new();
        system.bind_all(Some(memory.device()));
        system.dispatch(Some(&memory.device()), "dropped");
        system.shutdown();
        assert!(memory.is_empty());
        assert!(!system.is_running());
    }

    #[test]
    fn shutdown_is_idempotent_and_final() {
        let memory = MemoryDevice::new();
        let system = LogSystem::new();
        system.init(Config::for_tests("APP", 4).route(Route::all(memory.device())));
        assert!(system.is_running());
        assert!(system.is_deterministic());
        system.dispatch(system.device(Category::Trace).as_ref(), "before");
        system.shutdown();
        system.shutdown();
        system.dispatch(Some(&memory.device()), "after");
        assert_eq!(memory.contents(), "before\n");
        assert!(!system.is_deterministic());
        assert_eq!(system.pending(), 0);
    }

    #[test]
    fn reinit_replaces_routes_and_prefix() {
        let first = MemoryDevice::new();
        let second = MemoryDevice::new();
        let system = LogSystem::new();
        system.init(Config::for_tests("ONE", 1).route(Route::all(first.device())));
        system.dispatch(system.device(Category::Data).as_ref(), "one");
        system.init(Config::for_tests("TWO", 1).route(Route::all(second.device())));
        assert_eq!(&*system.prefix(), "TWO");
        system.dispatch(system.device(Category::Data).as_ref(), "two");
        system.shutdown();
        assert_eq!(first.contents(), "one\n");
        assert_eq!(second.contents(), "two\n");
    }

    #[test]
    fn tunables_round_trip() {
        let system = LogSystem::new();
        system.set_stall_timeout(Duration::from_millis(5));
        system.set_bulk_flush_period(Duration::from_millis(7));
        assert_eq!(system.stall_timeout(), Duration::from_millis(5));
        assert_eq!(system.bulk_flush_period(), Duration::from_millis(7));
    }

    #[test]
    fn terminate_flushes_before_hook() {
        let memory = MemoryDevice::new();
        let seen = Arc::new(Mutex::new(None));
        let system = LogSystem::new();
        let hook_memory = memory.clone();
        let hook_seen = seen.clone();
        system.init(
            Config::for_tests("APP", 4)
                .route(Route::all(memory.device()))
                .termination_hook(move |fatal| {
                    *hook_seen.lock() = Some((fatal, hook_memory.contents()));
                }),
        );
        system.dispatch(Some(&memory.device()), "last words");
        system.terminate(Fatal::Exit(1));
        assert_eq!(
            *seen.lock(),
            Some((Fatal::Exit(1), "last words\n".to_string()))
        );
        assert!(!system.is_running());
    }
}
