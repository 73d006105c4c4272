// SPDX-License-Identifier: MIT OR Apache-2.0
use crate::level::Level;
use crate::system::LogSystem;
use crate::uplevel::{LevelFn, Uplevel};
use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

/**
A named, leveled logger.

The level accessor is called on every logging call, so a logger follows
runtime level changes without being rebuilt.  All entry points are reached
through `Deref` to the logger's [`Uplevel`]; [`Logger::up1`] is the same
gate one frame further up, for helpers.

```
use linewise::{Config, Level, LogSystem, Logger, MemoryDevice, Route};

let memory = MemoryDevice::new();
let system = LogSystem::new();
system.init(Config::for_tests("APP", 8).route(Route::all(memory.device())));

let log = Logger::with_system(&system, "billing", || Level::Warning);
log.tracef("ctx", "charge", "filtered out");
log.warnf("ctx", "charge", format_args!("retry {}", 2));
system.shutdown();

assert_eq!(memory.contents().lines().count(), 1);
```
*/
pub struct Logger {
    name: String,
    level: LevelFn,
    direct: Uplevel,
    up1: Uplevel,
}

impl Logger {
    /// A logger on the process-wide system from [`crate::system`].
    pub fn new(name: impl Into<String>, level: impl Fn() -> Level + Send + Sync + 'static) -> Self {
        Self::with_system(&crate::global::system(), name, level)
    }

    pub fn with_system(
        system: &Arc<LogSystem>,
        name: impl Into<String>,
        level: impl Fn() -> Level + Send + Sync + 'static,
    ) -> Self {
        let level: LevelFn = Arc::new(level);
        let direct = Uplevel::new(system.clone(), Some(level.clone()));
        let up1 = direct.up1();
        Self {
            name: name.into(),
            level,
            direct,
            up1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The level right now.
    pub fn level(&self) -> Level {
        (self.level)()
    }

    /// The gated proxy for helpers that log on behalf of their caller.
    pub fn up1(&self) -> &Uplevel {
        &self.up1
    }
}

impl Deref for Logger {
    type Target = Uplevel;

    fn deref(&self) -> &Uplevel {
        &self.direct
    }
}

impl Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .finish_non_exhaustive()
    }
}

/*
Boilerplate notes.

# Logger

Clone would be cheap (two Arcs and a String) but two loggers with one name is
more likely a mistake than a need; wrap it in an Arc instead.
PartialEq/Eq/Hash: the level accessor is a closure, so no meaningful equality.
Default: there is no sensible default name or level.
Display: not meaningful.
Deref to Uplevel is the whole point: the entry points live there.
*/
