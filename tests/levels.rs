// SPDX-License-Identifier: MIT OR Apache-2.0

#[cfg(test)]
mod tests {
    use linewise::{Config, Formatter, Level, LogSystem, Logger, MemoryDevice, Route, Uplevel};
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI32, Ordering};

    struct Bytes(&'static [u8]);

    impl Formatter for Bytes {
        fn format(&self) -> String {
            format!("{:x?}", self.0)
        }
    }

    /// The fixed call sequence; comments give the lines each group adds.
    fn call_everything(l: &Uplevel) {
        // Error: 4
        l.complete_err(io::Error::other("E"), "A", "B");
        l.complete_errf(io::Error::other("E"), "A", "B", "C");
        l.err(io::Error::other("E"), "A", "B");
        l.errf(io::Error::other("E"), "A", "B", "C");

        // Warning: 1
        l.warnf("A", "B", "C");

        // Output: 7
        l.data_kv("A", "B", "C", "D");
        l.data_block("A", "B", "C");
        l.data_string("A", "B", "C");
        l.data_trace("A", "B", &[&Bytes(&[0xEE, 0xEF])]);

        // Trace: 6
        l.start("A", "B");
        l.startf("A", "B", "C");
        l.complete("A", "B");
        l.completef("A", "B", "C");
        l.tracef("A", "B", "C");
        l.queryf("A", "B", "C");
    }

    fn lines_at(level: i32, through_up1: bool) -> usize {
        let memory = MemoryDevice::new();
        let system = LogSystem::new();
        system.init(Config::for_tests("LOG", 0).route(Route::all(memory.device())));
        let log = Logger::with_system(&system, "test", move || Level::from_ordinal(level));
        if through_up1 {
            call_everything(log.up1());
        } else {
            call_everything(&log);
        }
        system.shutdown();
        memory.contents().lines().count()
    }

    #[test]
    fn line_counts_per_level() {
        for (level, expected) in [(0, 0), (1, 4), (2, 5), (3, 12), (4, 18)] {
            assert_eq!(lines_at(level, false), expected, "level {level}");
        }
    }

    #[test]
    fn line_counts_per_level_through_up1() {
        for (level, expected) in [(0, 0), (1, 4), (2, 5), (3, 12), (4, 18)] {
            assert_eq!(lines_at(level, true), expected, "level {level}");
        }
    }

    #[test]
    fn level_is_read_on_every_call() {
        let memory = MemoryDevice::new();
        let system = LogSystem::new();
        system.init(Config::for_tests("LOG", 4).route(Route::all(memory.device())));
        let level = Arc::new(AtomicI32::new(1));
        let read = level.clone();
        let log = Logger::with_system(&system, "dynamic", move || {
            Level::from_ordinal(read.load(Ordering::Relaxed))
        });

        log.tracef("A", "B", "dropped");
        level.store(4, Ordering::Relaxed);
        log.tracef("A", "B", "kept");
        level.store(0, Ordering::Relaxed);
        log.err("E", "A", "B");
        system.shutdown();

        let contents = memory.contents();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.ends_with("Trace: kept\n"));
    }

    #[test]
    fn filtered_calls_skip_formatting() {
        struct Loud;

        impl std::fmt::Display for Loud {
            fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                panic!("formatted a filtered message");
            }
        }

        let system = LogSystem::new();
        system.init(Config::for_tests("LOG", 4).route(Route::all(MemoryDevice::new().device())));
        let log = Logger::with_system(&system, "quiet", || Level::Error);
        log.tracef(Loud, "B", Loud);
        log.warnf("A", "B", Loud);
        log.data_kv("A", "B", Loud, Loud);
        system.shutdown();
    }
}
