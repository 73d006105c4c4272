// SPDX-License-Identifier: MIT OR Apache-2.0

//! Formatting shorthands for the entry points.
//!
//! Each macro takes the proxy (a [`Logger`](crate::Logger), an
//! [`Uplevel`](crate::Uplevel), or anything that derefs to one) followed by
//! the method's arguments, with the trailing message written as format
//! arguments.  The message is only formatted if the line passes the level gate.
//!
//! ```
//! use linewise::{Config, Level, LogSystem, Logger, MemoryDevice, Route};
//!
//! let memory = MemoryDevice::new();
//! let system = LogSystem::new();
//! system.init(Config::for_tests("APP", 8).route(Route::all(memory.device())));
//! let log = Logger::with_system(&system, "jobs", || Level::Trace);
//!
//! let id = 23;
//! linewise::startf!(log, id, "run", "job {id} queued");
//! linewise::errf!(log, "disk full", id, "run", "writing {}", "out.csv");
//! system.shutdown();
//!
//! let contents = memory.contents();
//! assert!(contents.contains(": 23: run: Started: job 23 queued\n"));
//! assert!(contents.contains(": 23: run: ERROR: writing out.csv: disk full\n"));
//! ```

/// `log.startf(context, function, format_args!(...))`
#[macro_export]
macro_rules! startf {
    ($log:expr, $context:expr, $function:expr, $($arg:tt)+) => {
        $log.startf($context, $function, ::std::format_args!($($arg)+))
    };
}

/// `log.completef(context, function, format_args!(...))`
#[macro_export]
macro_rules! completef {
    ($log:expr, $context:expr, $function:expr, $($arg:tt)+) => {
        $log.completef($context, $function, ::std::format_args!($($arg)+))
    };
}

/// `log.complete_errf(err, context, function, format_args!(...))`
#[macro_export]
macro_rules! complete_errf {
    ($log:expr, $err:expr, $context:expr, $function:expr, $($arg:tt)+) => {
        $log.complete_errf($err, $context, $function, ::std::format_args!($($arg)+))
    };
}

/// `log.errf(err, context, function, format_args!(...))`
#[macro_export]
macro_rules! errf {
    ($log:expr, $err:expr, $context:expr, $function:expr, $($arg:tt)+) => {
        $log.errf($err, $context, $function, ::std::format_args!($($arg)+))
    };
}

/// `log.err_fatalf(err, context, function, format_args!(...))`
#[macro_export]
macro_rules! err_fatalf {
    ($log:expr, $err:expr, $context:expr, $function:expr, $($arg:tt)+) => {
        $log.err_fatalf($err, $context, $function, ::std::format_args!($($arg)+))
    };
}

/// `log.err_panicf(err, context, function, format_args!(...))`
#[macro_export]
macro_rules! err_panicf {
    ($log:expr, $err:expr, $context:expr, $function:expr, $($arg:tt)+) => {
        $log.err_panicf($err, $context, $function, ::std::format_args!($($arg)+))
    };
}

/// `log.tracef(context, function, format_args!(...))`
#[macro_export]
macro_rules! tracef {
    ($log:expr, $context:expr, $function:expr, $($arg:tt)+) => {
        $log.tracef($context, $function, ::std::format_args!($($arg)+))
    };
}

/// `log.warnf(context, function, format_args!(...))`
#[macro_export]
macro_rules! warnf {
    ($log:expr, $context:expr, $function:expr, $($arg:tt)+) => {
        $log.warnf($context, $function, ::std::format_args!($($arg)+))
    };
}

/// `log.queryf(context, function, format_args!(...))`
#[macro_export]
macro_rules! queryf {
    ($log:expr, $context:expr, $function:expr, $($arg:tt)+) => {
        $log.queryf($context, $function, ::std::format_args!($($arg)+))
    };
}

/**
The name of the enclosing function, as a `&'static str`.

Closures report the function they are defined in.

```
fn handle_request() -> &'static str {
    linewise::function_name!()
}
assert_eq!(handle_request(), "handle_request");
```
*/
#[macro_export]
macro_rules! function_name {
    () => {{
        fn __linewise_marker() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __type_name_of(__linewise_marker);
        $crate::hidden::short_function_name(
            match name.strip_suffix("::__linewise_marker") {
                Some(stripped) => stripped,
                None => name,
            },
        )
    }};
}
