//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
# linewise

linewise is a leveled trace-line logger whose logging calls never block for
long.

# Development status

linewise is experimental and the API may change.

# The problem

A logging call sits on the hot path of whatever it is describing.  If the
terminal is paused, a pipe is full, or a file lives on a slow disk, a
synchronous logger turns that stall into a stall of your program.

linewise hands every rendered line to a background writer through a bounded
queue.  The handoff waits at most a stall timeout (250ms by default).  If the
writer cannot keep up, logging switches itself off and drops lines instead of
blocking; when the backlog has drained it switches back on and says so:

```text
**** LOG WARNING: LOGGING WAS OFF - PLEASE REPORT ****
```

The writer coalesces lines per device and writes them on a bulk flush period
(1s by default), each device on its own flusher thread, so one slow device
cannot hold up another.

# The line format

Every line has the same shape:

```text
2009/11/10 15:00:00.000: APP[69910]: handler.rs#42: ctx: serve: Trace: accepted 3 connections
```

timestamp (UTC, millisecond precision), application prefix and pid, call site,
a caller-chosen context value, the function name, then a tag and the message.

| Entry point                 | Tag                             | Device category |
|-----------------------------|---------------------------------|-----------------|
| `start`, `startf`           | `Started:`                      | `Start`         |
| `complete`, `completef`     | `Completed:`                    | `Start`         |
| `complete_err*`             | `Completed ERROR:`              | `Error`         |
| `err`, `errf`               | `ERROR:`                        | `Error`         |
| `err_fatal*`                | `ERROR:` then `TERMINATING`     | `Error`         |
| `err_panic*`                | `ERROR:` then `TERMINATING`     | `Panic`         |
| `tracef`                    | `Trace:`                        | `Trace`         |
| `warnf`                     | `Warning:`                      | `Warning`       |
| `queryf`                    | `Query:`                        | `Query`         |
| `data_*`                    | `DATA:`                         | `Data`          |
| `splunk`                    | (timestamp and `key=value`s)    | `Splunk`        |

# The API

```rust
use linewise::{Config, Level, Logger, Route, MemoryDevice};

let memory = MemoryDevice::new();
linewise::init(Config::new("APP", 1024).route(Route::all(memory.device())));

let log = Logger::new("orders", || Level::Trace);
log.start("order-17", linewise::function_name!());
linewise::warnf!(log, "order-17", "main", "stock low: {} left", 2);
log.complete("order-17", "main");

linewise::shutdown();
assert_eq!(memory.contents().lines().count(), 3);
```

A [`Logger`] carries a level accessor that is evaluated on every call; calls
below the current level cost one comparison.  [`log()`] is the ungated proxy on
the process-wide system.  Programs that prefer not to share global state build
their own [`LogSystem`] and pass it to [`Logger::with_system`].

# Call sites

A direct call is attributed to its own line, captured at compile time with
`#[track_caller]`.  A helper that logs on behalf of its caller goes through
[`Uplevel::up1`]; its lines then carry the caller's file and line, found by
walking the stack.  An empty function name is recovered the same way.  See
[`call_site`] for details.

# Testing

[`Config::for_tests`] fixes the timestamp, file token and pid so output can be
compared byte for byte, and [`MemoryDevice`] captures it.
*/

pub mod call_site;
mod config;
mod device;
mod dispatch;
mod global;
mod level;
mod log_record;
mod logger;
mod macros;
mod memory_device;
mod payload;
mod system;
mod uplevel;
mod writer;

pub use call_site::{CallSite, Stamp, resolve};
pub use config::{
    Config, DEFAULT_BULK_PERIOD, DEFAULT_FLUSH_GRACE, DEFAULT_STALL_TIMEOUT, Fatal,
    TEST_BULK_PERIOD, TerminationHook, terminate,
};
pub use device::{Category, Device, DeviceTable, Route, Sink};
pub use dispatch::{Backpressure, EMPTY_MESSAGE, LOGGING_WAS_OFF};
pub use global::{init, log, shutdown, system};
pub use level::{Level, ParseLevelError};
pub use log_record::LogRecord;
pub use logger::Logger;
pub use memory_device::MemoryDevice;
pub use payload::{Block, Formatter, SplunkPair, SplunkValue};
pub use system::LogSystem;
pub use uplevel::{LevelFn, Uplevel};

#[doc(hidden)]
pub mod hidden {
    pub use crate::call_site::short_function_name;
}
