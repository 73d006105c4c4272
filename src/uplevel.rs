// SPDX-License-Identifier: MIT OR Apache-2.0

//! The entry points.
//!
//! An [`Uplevel`] is a proxy that renders one kind of line per method and
//! hands it to its [`LogSystem`].  It carries an optional level gate (present
//! when it belongs to a [`Logger`](crate::Logger)) and decides which call site
//! the line is attributed to.
//!
//! # Level gate
//!
//! | Family                                               | Minimum level      |
//! |------------------------------------------------------|--------------------|
//! | `err*`, `complete_err*`, `err_fatal*`, `err_panic*`  | [`Level::Error`]   |
//! | `warnf`                                              | [`Level::Warning`] |
//! | `data_*`, `splunk`                                   | [`Level::Output`]  |
//! | `start*`, `complete*`, `tracef`, `queryf`            | [`Level::Trace`]   |
//!
//! The gate is evaluated on every call.  A filtered call returns before the
//! call site is resolved or anything is formatted.
//!
//! # Call sites
//!
//! A direct call is attributed to the line that made it.  A helper that logs
//! on behalf of its caller calls through [`Uplevel::up1`], which attributes
//! the line one frame further up the stack:
//!
//! ```
//! use linewise::{Config, LogSystem, MemoryDevice, Route, Uplevel};
//!
//! fn audit(log: &Uplevel, what: &str) {
//!     log.up1().tracef("audit", "audit", what);
//! }
//!
//! let memory = MemoryDevice::new();
//! let system = LogSystem::new();
//! system.init(Config::new("APP", 8).route(Route::all(memory.device())));
//! audit(&system.log(), "opened");
//! system.shutdown();
//! assert!(memory.contents().contains(": audit: audit: Trace: opened"));
//! ```
//!
//! An empty function name is filled in with the name of the function the line
//! is attributed to.  [`Uplevel::at`] pins an explicit [`CallSite`] instead,
//! for callers that carry their own source locations.

use crate::call_site::{CallSite, Stamp, Walk, walk};
use crate::config::Fatal;
use crate::device::Category;
use crate::level::Level;
use crate::log_record::LogRecord;
use crate::payload::{Block, Formatter, SplunkPair, write_block_lines};
use crate::system::LogSystem;
use std::fmt::{Debug, Display};
use std::sync::Arc;

/// Reads the current level.  Evaluated on every call, never cached.
pub type LevelFn = Arc<dyn Fn() -> Level + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Attribution {
    Caller,
    Fixed(Option<CallSite>),
}

/// A logging proxy bound to one [`LogSystem`].
#[derive(Clone)]
pub struct Uplevel {
    system: Arc<LogSystem>,
    gate: Option<LevelFn>,
    depth: u32,
    attribution: Attribution,
}

impl Uplevel {
    pub(crate) fn new(system: Arc<LogSystem>, gate: Option<LevelFn>) -> Self {
        Self {
            system,
            gate,
            depth: 0,
            attribution: Attribution::Caller,
        }
    }

    /**
    A proxy one frame further up.

    Its lines are attributed to the caller of the function that logs through
    it.  Proxies compose: `up1().up1()` skips two frames.  A walk past the top
    of the stack yields the `unknown.go#0:` / `missing` sentinels.
    */
    pub fn up1(&self) -> Uplevel {
        Uplevel {
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    /// A proxy whose lines are attributed to `site`.  `None` yields the
    /// `unknown.go#0:` / `missing` sentinels.
    pub fn at(&self, site: Option<CallSite>) -> Uplevel {
        Uplevel {
            attribution: Attribution::Fixed(site),
            ..self.clone()
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn system(&self) -> &Arc<LogSystem> {
        &self.system
    }

    fn enabled(&self, minimum: Level) -> bool {
        match &self.gate {
            None => true,
            Some(level) => level() >= minimum,
        }
    }

    #[track_caller]
    fn stamp(&self, function: &str) -> Stamp {
        let here = match &self.attribution {
            Attribution::Caller => CallSite::here(),
            Attribution::Fixed(site) => return self.system.stamp(site.as_ref(), function),
        };
        // the file token is fixed in deterministic mode
        let walk_site = self.depth > 0 && !self.system.is_deterministic();
        if !walk_site && !function.is_empty() {
            return self.system.stamp(Some(&here), function);
        }
        match walk(self.depth) {
            Walk::Found { site, function: walked } => {
                let site = match site {
                    Some(site) if self.depth > 0 => site,
                    _ => here,
                };
                let function = match walked.as_deref() {
                    Some(walked) if function.is_empty() => walked,
                    _ => function,
                };
                self.system.stamp(Some(&site), function)
            }
            Walk::TooDeep => self.system.stamp(None, function),
            Walk::Unavailable => self.system.stamp(Some(&here), function),
        }
    }

    fn prelude(&self, stamp: &Stamp, context: &dyn Display) -> LogRecord {
        LogRecord::prelude(stamp, &self.system.prefix(), context)
    }

    #[track_caller]
    fn line(&self, context: &dyn Display, function: &str, tag: &str, message: Option<&dyn Display>) -> LogRecord {
        let stamp = self.stamp(function);
        let mut record = self.prelude(&stamp, context);
        record.log(tag);
        if let Some(message) = message {
            record.log(" ");
            record.log_display(message);
        }
        record
    }

    fn emit(&self, category: Category, record: LogRecord) {
        let device = self.system.device(category);
        self.system.dispatch(device.as_ref(), record.into_bytes());
    }

    /// `Started:`
    #[track_caller]
    pub fn start(&self, context: impl Display, function: &str) {
        if !self.enabled(Level::Trace) {
            return;
        }
        let record = self.line(&context, function, "Started:", None);
        self.emit(Category::Start, record);
    }

    /// `Started: <message>`
    #[track_caller]
    pub fn startf(&self, context: impl Display, function: &str, message: impl Display) {
        if !self.enabled(Level::Trace) {
            return;
        }
        let record = self.line(&context, function, "Started:", Some(&message));
        self.emit(Category::Start, record);
    }

    /// `Completed:`
    #[track_caller]
    pub fn complete(&self, context: impl Display, function: &str) {
        if !self.enabled(Level::Trace) {
            return;
        }
        let record = self.line(&context, function, "Completed:", None);
        self.emit(Category::Start, record);
    }

    /// `Completed: <message>`
    #[track_caller]
    pub fn completef(&self, context: impl Display, function: &str, message: impl Display) {
        if !self.enabled(Level::Trace) {
            return;
        }
        let record = self.line(&context, function, "Completed:", Some(&message));
        self.emit(Category::Start, record);
    }

    /// `Completed ERROR: <err>`
    #[track_caller]
    pub fn complete_err(&self, err: impl Display, context: impl Display, function: &str) {
        if !self.enabled(Level::Error) {
            return;
        }
        let record = self.line(&context, function, "Completed ERROR:", Some(&err));
        self.emit(Category::Error, record);
    }

    /// `Completed ERROR: <message>: <err>`
    #[track_caller]
    pub fn complete_errf(
        &self,
        err: impl Display,
        context: impl Display,
        function: &str,
        message: impl Display,
    ) {
        if !self.enabled(Level::Error) {
            return;
        }
        let record = self.line(
            &context,
            function,
            "Completed ERROR:",
            Some(&format_args!("{message}: {err}")),
        );
        self.emit(Category::Error, record);
    }

    /// `ERROR: <err>`
    #[track_caller]
    pub fn err(&self, err: impl Display, context: impl Display, function: &str) {
        if !self.enabled(Level::Error) {
            return;
        }
        let record = self.line(&context, function, "ERROR:", Some(&err));
        self.emit(Category::Error, record);
    }

    /// `ERROR: <message>: <err>`
    #[track_caller]
    pub fn errf(&self, err: impl Display, context: impl Display, function: &str, message: impl Display) {
        if !self.enabled(Level::Error) {
            return;
        }
        let record = self.line(
            &context,
            function,
            "ERROR:",
            Some(&format_args!("{message}: {err}")),
        );
        self.emit(Category::Error, record);
    }

    /**
    Writes `ERROR: <err>` and `TERMINATING` to the error device, shuts the
    system down, and runs the termination hook with [`Fatal::Exit`]`(1)`.

    The default hook exits the process.  With a hook that returns, the
    outcome is handed back so the caller can end the program itself; `None`
    means the level gate filtered the call out and nothing happened.
    */
    #[must_use]
    #[track_caller]
    pub fn err_fatal(&self, err: impl Display, context: impl Display, function: &str) -> Option<Fatal> {
        if !self.enabled(Level::Error) {
            return None;
        }
        Some(self.terminating(Category::Error, Fatal::Exit(1), &err, None, &context, function))
    }

    /// [`err_fatal`](Self::err_fatal) with `ERROR: <message>: <err>`.
    #[must_use]
    #[track_caller]
    pub fn err_fatalf(
        &self,
        err: impl Display,
        context: impl Display,
        function: &str,
        message: impl Display,
    ) -> Option<Fatal> {
        if !self.enabled(Level::Error) {
            return None;
        }
        Some(self.terminating(
            Category::Error,
            Fatal::Exit(1),
            &err,
            Some(&message),
            &context,
            function,
        ))
    }

    /// Like [`err_fatal`](Self::err_fatal), but writes to the panic device and
    /// ends with [`Fatal::Panic`].  The default hook panics.
    #[must_use]
    #[track_caller]
    pub fn err_panic(&self, err: impl Display, context: impl Display, function: &str) -> Option<Fatal> {
        if !self.enabled(Level::Error) {
            return None;
        }
        Some(self.terminating(Category::Panic, Fatal::Panic, &err, None, &context, function))
    }

    #[must_use]
    #[track_caller]
    pub fn err_panicf(
        &self,
        err: impl Display,
        context: impl Display,
        function: &str,
        message: impl Display,
    ) -> Option<Fatal> {
        if !self.enabled(Level::Error) {
            return None;
        }
        Some(self.terminating(
            Category::Panic,
            Fatal::Panic,
            &err,
            Some(&message),
            &context,
            function,
        ))
    }

    #[track_caller]
    fn terminating(
        &self,
        category: Category,
        fatal: Fatal,
        err: &dyn Display,
        message: Option<&dyn Display>,
        context: &dyn Display,
        function: &str,
    ) -> Fatal {
        let stamp = self.stamp(function);
        let mut error = self.prelude(&stamp, context);
        match message {
            Some(message) => error.log_display(format_args!("ERROR: {message}: {err}")),
            None => error.log_display(format_args!("ERROR: {err}")),
        }
        self.emit(category, error);

        let mut terminating = self.prelude(&stamp, context);
        terminating.log("TERMINATING");
        self.emit(category, terminating);

        self.system.terminate(fatal);
        fatal
    }

    /// `Trace: <message>`
    #[track_caller]
    pub fn tracef(&self, context: impl Display, function: &str, message: impl Display) {
        if !self.enabled(Level::Trace) {
            return;
        }
        let record = self.line(&context, function, "Trace:", Some(&message));
        self.emit(Category::Trace, record);
    }

    /// `Warning: <message>`
    #[track_caller]
    pub fn warnf(&self, context: impl Display, function: &str, message: impl Display) {
        if !self.enabled(Level::Warning) {
            return;
        }
        let record = self.line(&context, function, "Warning:", Some(&message));
        self.emit(Category::Warning, record);
    }

    /// `Query: <message>`
    #[track_caller]
    pub fn queryf(&self, context: impl Display, function: &str, message: impl Display) {
        if !self.enabled(Level::Trace) {
            return;
        }
        let record = self.line(&context, function, "Query:", Some(&message));
        self.emit(Category::Query, record);
    }

    /// `DATA: <key>: <value>`
    #[track_caller]
    pub fn data_kv(&self, context: impl Display, function: &str, key: impl Display, value: impl Display) {
        if !self.enabled(Level::Output) {
            return;
        }
        let record = self.line(&context, function, "DATA:", Some(&format_args!("{key}: {value}")));
        self.emit(Category::Data, record);
    }

    /**
    A multi-line `DATA:` block.

    Text is rendered as by [`data_string`](Self::data_string).  A
    [`Block::json`] value is rendered as indented JSON, or as the serialization
    error text if it could not be serialized.
    */
    #[track_caller]
    pub fn data_block(&self, context: impl Display, function: &str, block: impl Into<Block>) {
        if !self.enabled(Level::Output) {
            return;
        }
        let body = block.into().render();
        self.data_lines(&context, function, &body);
    }

    /**
    Writes `DATA:` followed by one tab-indented line per non-empty line of
    `message`.  An empty message writes `DATA: %!ds(MISSING)`.
    */
    #[track_caller]
    pub fn data_string(&self, context: impl Display, function: &str, message: &str) {
        if !self.enabled(Level::Output) {
            return;
        }
        self.data_lines(&context, function, message);
    }

    #[track_caller]
    fn data_lines(&self, context: &dyn Display, function: &str, message: &str) {
        let stamp = self.stamp(function);
        let mut record = self.prelude(&stamp, context);
        if message.is_empty() {
            record.log("DATA: %!ds(MISSING)\n");
        } else {
            let mut body = String::from("DATA:\n");
            write_block_lines(&mut body, message);
            record.log(&body);
        }
        self.emit(Category::Data, record);
    }

    /// A `DATA:` block built from every formatter's output.  With no formatters
    /// only the header is written.
    #[track_caller]
    pub fn data_trace(&self, context: impl Display, function: &str, formatters: &[&dyn Formatter]) {
        if !self.enabled(Level::Output) {
            return;
        }
        let stamp = self.stamp(function);
        let mut record = self.prelude(&stamp, &context);
        let mut body = String::from("DATA:\n");
        for formatter in formatters {
            write_block_lines(&mut body, &formatter.format());
        }
        record.log(&body);
        self.emit(Category::Data, record);
    }

    /// `<timestamp>: key=value key=value`, with no file, context or function.
    pub fn splunk(&self, pairs: &[SplunkPair]) {
        if !self.enabled(Level::Output) {
            return;
        }
        let mut record = LogRecord::new();
        record.log(&self.system.timestamp());
        record.log(":");
        for pair in pairs {
            record.log_display(format_args!(" {pair}"));
        }
        self.emit(Category::Splunk, record);
    }
}

impl Debug for Uplevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uplevel")
            .field("depth", &self.depth)
            .field("gated", &self.gate.is_some())
            .field("attribution", &self.attribution)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::device::Route;
    use crate::memory_device::MemoryDevice;
    use std::sync::atomic::{AtomicU8, Ordering};

    fn system(memory: &MemoryDevice) -> Arc<LogSystem> {
        let system = LogSystem::new();
        system.init(Config::for_tests("UNIT", 8).route(Route::all(memory.device())));
        system
    }

    #[test]
    fn filtered_calls_do_not_reach_the_device() {
        let memory = MemoryDevice::new();
        let system = system(&memory);
        let level = Arc::new(AtomicU8::new(Level::Warning.ordinal()));
        let gate_level = level.clone();
        let gate: LevelFn = Arc::new(move || Level::from_ordinal(i32::from(gate_level.load(Ordering::Relaxed))));
        let log = Uplevel::new(system.clone(), Some(gate));

        log.tracef("ctx", "f", "hidden");
        log.warnf("ctx", "f", "shown");
        level.store(Level::Trace.ordinal(), Ordering::Relaxed);
        log.tracef("ctx", "f", "now shown");
        level.store(Level::Off.ordinal(), Ordering::Relaxed);
        log.err("boom", "ctx", "f");
        assert_eq!(log.err_fatal("boom", "ctx", "f"), None);
        system.shutdown();

        let contents = memory.contents();
        assert_eq!(contents.lines().count(), 2, "{contents}");
        assert!(contents.contains("Warning: shown"));
        assert!(contents.contains("Trace: now shown"));
    }

    #[test]
    fn up1_keeps_gate_and_counts_depth() {
        let memory = MemoryDevice::new();
        let system = system(&memory);
        let log = system.log();
        assert_eq!(log.depth(), 0);
        assert_eq!(log.up1().up1().depth(), 2);
        system.shutdown();
    }

    #[test]
    fn depth_past_the_stack_uses_sentinels() {
        let memory = MemoryDevice::new();
        let system = LogSystem::new();
        system.init(Config::new("APP", 8).route(Route::all(memory.device())));
        let mut deep = system.log();
        for _ in 0..10_000 {
            deep = deep.up1();
        }
        deep.tracef("ctx", "named", "lost");
        system.shutdown();
        let contents = memory.contents();
        assert!(contents.ends_with(": unknown.go#0:: ctx: missing: Trace: lost\n"), "{contents}");
    }

    #[test]
    fn fixed_site_without_location_uses_sentinels() {
        let memory = MemoryDevice::new();
        let system = LogSystem::new();
        system.init(Config::new("APP", 8).route(Route::all(memory.device())));
        system.log().at(None).tracef("ctx", "named", "x");
        system
            .log()
            .at(Some(CallSite::new("src/bin/tool.rs", 99)))
            .tracef("ctx", "named", "y");
        system.shutdown();
        let contents = memory.contents();
        assert!(contents.contains(": unknown.go#0:: ctx: missing: Trace: x\n"), "{contents}");
        assert!(contents.contains(": tool.rs#99: ctx: named: Trace: y\n"), "{contents}");
    }

    #[test]
    fn splunk_line_has_no_prelude() {
        let memory = MemoryDevice::new();
        let system = system(&memory);
        system.log().splunk(&[
            SplunkPair::new("Key1", "Value1"),
            SplunkPair::new("RequestTime", "2019/11/10 15:00:00.000"),
            SplunkPair::new("ResponseCode", 0),
            SplunkPair::new("Slice", vec![1, 2, 3, 4]),
        ]);
        system.shutdown();
        assert_eq!(
            memory.contents(),
            "2009/11/10 15:00:00.000: Key1=Value1 RequestTime=\"2019/11/10 15:00:00.000\" ResponseCode=0 Slice=[1, 2, 3, 4]\n"
        );
    }
}
