// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordinal severity levels used by [`Logger`](crate::Logger) gates.
//!
//! Each entry point family requires a minimum level:
//!
//! | Family                                   | Minimum            |
//! |------------------------------------------|--------------------|
//! | `complete_err`, `err`, fatal, panic      | [`Level::Error`]   |
//! | `warnf`                                  | [`Level::Warning`] |
//! | `data_kv`, `data_block`, `data_string`, `data_trace` | [`Level::Output`] |
//! | `start`, `complete`, `tracef`, `queryf`  | [`Level::Trace`]   |
//!
//! [`Level::Off`] disables everything.

use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Level {
    /// Nothing is logged.
    #[default]
    Off = 0,
    /// Errors only.
    Error = 1,
    /// Errors and warnings.
    Warning = 2,
    /// Adds the data dumps.
    Output = 3,
    /// Everything, including function entry/exit and queries.
    Trace = 4,
}

impl Level {
    /// The level for an integer, saturating at [`Level::Trace`].
    ///
    /// Negative values map to [`Level::Off`].
    pub const fn from_ordinal(ordinal: i32) -> Self {
        match ordinal {
            i32::MIN..=0 => Level::Off,
            1 => Level::Error,
            2 => Level::Warning,
            3 => Level::Output,
            _ => Level::Trace,
        }
    }

    pub const fn ordinal(self) -> u8 {
        self as u8
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Level::Off => "off",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Output => "output",
            Level::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// Returned when text does not name a [`Level`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level `{0}`; expected off, error, warning, output, trace or 0-4")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    /**
    Parses a level name (case-insensitive) or its ordinal.

    Embedding programs typically read this from their own configuration, e.g. an
    environment variable.
    */
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(ordinal) = trimmed.parse::<u8>() {
            return match ordinal {
                0..=4 => Ok(Level::from_ordinal(i32::from(ordinal))),
                _ => Err(ParseLevelError(s.to_string())),
            };
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "off" => Ok(Level::Off),
            "error" => Ok(Level::Error),
            "warning" | "warn" => Ok(Level::Warning),
            "output" | "data" => Ok(Level::Output),
            "trace" => Ok(Level::Trace),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl From<Level> for i32 {
    fn from(level: Level) -> Self {
        i32::from(level.ordinal())
    }
}
