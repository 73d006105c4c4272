// SPDX-License-Identifier: MIT OR Apache-2.0

//! The process-wide logging system.
//!
//! Most programs want exactly one pipeline.  This module owns it: a single
//! [`LogSystem`] created on first use and never dropped.  It starts quiescent,
//! like any other system, so nothing is written until [`init`] is called.
//!
//! # Examples
//!
//! ```
//! use linewise::{Config, Level, Logger};
//!
//! linewise::init(Config::new("APP", 1024));
//! let log = Logger::new("startup", || Level::Trace);
//! log.start("main", "main");
//! linewise::shutdown();
//! ```
//!
//! Programs that need several independent pipelines, or tests that must not
//! share state, create their own with [`LogSystem::new`] instead.

use crate::config::Config;
use crate::system::LogSystem;
use crate::uplevel::Uplevel;
use std::sync::{Arc, OnceLock};

static GLOBAL_SYSTEM: OnceLock<Arc<LogSystem>> = OnceLock::new();

/// The process-wide system, created quiescent on first use.
pub fn system() -> Arc<LogSystem> {
    GLOBAL_SYSTEM.get_or_init(LogSystem::new).clone()
}

/// Starts (or restarts) the process-wide system.
pub fn init(config: Config) {
    system().init(config);
}

/// Flushes and stops the process-wide system.  A no-op if it is not running.
pub fn shutdown() {
    if let Some(system) = GLOBAL_SYSTEM.get() {
        system.shutdown();
    }
}

/// The ungated proxy on the process-wide system.
pub fn log() -> Uplevel {
    system().log()
}
