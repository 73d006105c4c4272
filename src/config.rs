// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for one [`LogSystem`](crate::LogSystem) lifecycle.
//!
//! A [`Config`] is a plain value handed to
//! [`LogSystem::init`](crate::LogSystem::init).  It names the application prefix
//! that appears in every line, the capacity of the dispatch queue, the routes
//! applied on top of the default device bindings, and the timing tunables.
//!
//! ```
//! use linewise::{Category, Config, Device, Route};
//! use std::time::Duration;
//!
//! let config = Config::new("BILLING", 1024)
//!     .route(Route::only(Category::Data, Device::stderr()))
//!     .stall_timeout(Duration::from_millis(100));
//! assert_eq!(config.prefix(), "BILLING");
//! ```
//!
//! [`Config::for_tests`] switches on deterministic mode (fixed timestamp,
//! `file.go#512`, pid `69910`) and a 50ms bulk flush period so golden-output tests
//! are reproducible and quick.

use crate::device::Route;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_millis(250);
pub const DEFAULT_BULK_PERIOD: Duration = Duration::from_secs(1);
pub const TEST_BULK_PERIOD: Duration = Duration::from_millis(50);
pub const DEFAULT_FLUSH_GRACE: Duration = Duration::from_millis(200);

/**
How a fatal entry point wants the process to end.

The value is handed to the [`TerminationHook`] after the fatal lines have been
flushed.  Its `Display` text doubles as the default panic message.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Fatal {
    /// Written by `err_fatal`; the default hook exits with this status.
    #[error("exit status {0}")]
    Exit(i32),
    /// Written by `err_panic`; the default hook panics.
    #[error("Terminating Program")]
    Panic,
}

/// Invoked after a fatal line has been flushed.  Normally does not return.
pub type TerminationHook = Arc<dyn Fn(Fatal) + Send + Sync>;

/// Exits the process or panics, according to `fatal`.
pub fn terminate(fatal: Fatal) {
    match fatal {
        Fatal::Exit(code) => std::process::exit(code),
        Fatal::Panic => std::panic::panic_any(fatal.to_string()),
    }
}

/// Settings for one init/shutdown cycle.
#[derive(Clone)]
pub struct Config {
    pub(crate) prefix: String,
    pub(crate) queue_capacity: usize,
    pub(crate) routes: Vec<Route>,
    pub(crate) stall_timeout: Duration,
    pub(crate) bulk_period: Duration,
    pub(crate) flush_grace: Duration,
    pub(crate) deterministic: bool,
    pub(crate) termination: TerminationHook,
}

impl Config {
    /**
    Production defaults: 250ms stall timeout, 1s bulk flush period, real
    timestamps, call sites and pid.

    `queue_capacity` may be zero, in which case every handoff is a rendezvous
    with the background writer.
    */
    pub fn new(prefix: impl Into<String>, queue_capacity: usize) -> Self {
        Self {
            prefix: prefix.into(),
            queue_capacity,
            routes: Vec::new(),
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            bulk_period: DEFAULT_BULK_PERIOD,
            flush_grace: DEFAULT_FLUSH_GRACE,
            deterministic: false,
            termination: Arc::new(terminate),
        }
    }

    /// Deterministic output and a 50ms bulk period.
    pub fn for_tests(prefix: impl Into<String>, queue_capacity: usize) -> Self {
        Self::new(prefix, queue_capacity)
            .deterministic(true)
            .bulk_period(TEST_BULK_PERIOD)
    }

    /// Adds a route, applied after the defaults and any earlier routes.
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn routes(mut self, routes: impl IntoIterator<Item = Route>) -> Self {
        self.routes.extend(routes);
        self
    }

    pub fn stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    pub fn bulk_period(mut self, period: Duration) -> Self {
        self.bulk_period = period;
        self
    }

    /// How long shutdown waits for in-flight device writes.
    pub fn flush_grace(mut self, grace: Duration) -> Self {
        self.flush_grace = grace;
        self
    }

    pub fn deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    pub fn termination_hook(mut self, hook: impl Fn(Fatal) + Send + Sync + 'static) -> Self {
        self.termination = Arc::new(hook);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("PREFIX", 0)
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("prefix", &self.prefix)
            .field("queue_capacity", &self.queue_capacity)
            .field("routes", &self.routes)
            .field("stall_timeout", &self.stall_timeout)
            .field("bulk_period", &self.bulk_period)
            .field("flush_grace", &self.flush_grace)
            .field("deterministic", &self.deterministic)
            .finish_non_exhaustive()
    }
}
