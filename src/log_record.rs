// SPDX-License-Identifier: MIT OR Apache-2.0

//! The rendered form of one trace line.
//!
//! Every line written by the [`Uplevel`](crate::Uplevel) entry points shares the
//! same prelude:
//!
//! ```text
//! YYYY/MM/DD HH:MM:SS.ZZZ: APP[PID]: file.rs#LN: Context: Func: Tag: Message
//! ```
//!
//! [`LogRecord`] builds that prelude from a resolved [`Stamp`] and then lets the
//! caller append the tag and message progressively, the same way every
//! entry point does.  Formatting wrappers outside this crate can use it too and
//! hand the result to [`LogSystem::dispatch`](crate::LogSystem::dispatch).
//!
//! # Example
//!
//! ```rust
//! use linewise::{LogRecord, Stamp};
//!
//! let stamp = Stamp {
//!     date_time: "2009/11/10 15:00:00.000".to_string(),
//!     file: "main.rs#12".to_string(),
//!     function: "run".to_string(),
//!     pid: 7,
//! };
//! let mut record = LogRecord::prelude(&stamp, "APP", &"ctx");
//! record.log("Trace: ");
//! record.log_display(format_args!("{} items", 3));
//! assert_eq!(record.to_string(), "2009/11/10 15:00:00.000: APP[7]: main.rs#12: ctx: run: Trace: 3 items");
//! ```

use crate::call_site::Stamp;
use std::fmt::{Display, Write};

/**
A trace line under construction.

Appending never fails; a `Display` implementation that errors simply stops
contributing text.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LogRecord {
    text: String,
}

impl LogRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a record with the standard prelude, ending in `"<function>: "`.
    pub fn prelude(stamp: &Stamp, prefix: &str, context: &dyn Display) -> Self {
        let mut record = Self::new();
        let _ = write!(
            record.text,
            "{}: {}[{}]: {}: {}: {}: ",
            stamp.date_time, prefix, stamp.pid, stamp.file, context, stamp.function
        );
        record
    }

    /// Append the message to the record.
    pub fn log(&mut self, message: &str) {
        self.text.push_str(message);
    }

    /// Append anything displayable, such as `format_args!` output.
    pub fn log_display(&mut self, message: impl Display) {
        let _ = write!(self.text, "{message}");
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.text.into_bytes()
    }
}

impl Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<LogRecord> for Vec<u8> {
    fn from(record: LogRecord) -> Self {
        record.into_bytes()
    }
}

/*
Boilerplate notes for LogRecord:

IMPLEMENTED:
- Debug/Clone/PartialEq/Eq/Hash: derived, the record is plain text
- Default: the empty record
- Display: the text so far

NOT IMPLEMENTED:
- Copy: owns a String
- Ord: no meaningful ordering for lines
*/

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp() -> Stamp {
        Stamp {
            date_time: "2009/11/10 15:00:00.000".to_string(),
            file: "file.go#512".to_string(),
            function: "Basic".to_string(),
            pid: 69910,
        }
    }

    #[test]
    fn prelude_layout() {
        let record = LogRecord::prelude(&stamp(), "EXAMPLE", &1234);
        assert_eq!(
            record.to_string(),
            "2009/11/10 15:00:00.000: EXAMPLE[69910]: file.go#512: 1234: Basic: "
        );
    }

    #[test]
    fn unknown_file_keeps_its_colon() {
        let mut stamp = stamp();
        stamp.file = crate::call_site::UNKNOWN_FILE.to_string();
        let record = LogRecord::prelude(&stamp, "APP", &"ctx");
        assert!(record.to_string().contains(": unknown.go#0:: ctx: "));
    }

    #[test]
    fn progressive_appends() {
        let mut record = LogRecord::new();
        assert!(record.is_empty());
        record.log("Started: ");
        record.log_display(format_args!("walrus[{}]", 500));
        assert_eq!(Vec::from(record), b"Started: walrus[500]".to_vec());
    }
}
