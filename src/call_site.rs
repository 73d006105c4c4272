// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call-site capture and resolution.
//!
//! A direct call is attributed at compile time.  Every public entry point is
//! `#[track_caller]`, and the location it records is the first frame up the
//! stack that is *not* `#[track_caller]`.
//!
//! A proxy from [`Uplevel::up1`](crate::Uplevel::up1) carries a depth instead,
//! and its lines are attributed by walking the stack with `backtrace`: past the
//! entry point, then `depth` frames further.  The walk also recovers the
//! calling function's name when a call passes an empty one.  Without debug
//! info the walk may find nothing, and the compile-time location is used.
//!
//! ```
//! use linewise::{CallSite, Uplevel};
//!
//! fn report(log: &Uplevel, err: &std::io::Error) {
//!     // attributed to the line that called `report`
//!     log.up1().err(err, "ctx", "report");
//! }
//! # let _ = report;
//! # let site = CallSite::here();
//! # assert!(site.line() > 0);
//! ```
//!
//! [`resolve`] turns an optional [`CallSite`] into the [`Stamp`] every trace line
//! starts with.  A missing call site degrades to the `"unknown.go#0:"` and
//! `"missing"` sentinels rather than failing the call.

use chrono::{DateTime, TimeZone, Utc};
use std::borrow::Cow;
use std::panic::Location;
use std::path::Path;

/// chrono layout of the timestamp that leads each line.
pub const LAYOUT: &str = "%Y/%m/%d %H:%M:%S%.3f";

/// File token used when the call site could not be resolved.
///
/// The trailing colon is part of the token; downstream parsers match on it.
pub const UNKNOWN_FILE: &str = "unknown.go#0:";

/// Function token used when the call site or the function name is unavailable.
pub const MISSING_FUNCTION: &str = "missing";

pub(crate) const DETERMINISTIC_FILE: &str = "file.go#512";
pub(crate) const DETERMINISTIC_PID: u32 = 69910;

/// The fixed instant used in deterministic mode: 2009/11/10 15:00:00.000 UTC.
pub fn deterministic_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2009, 11, 10, 15, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Formats `instant` with [`LAYOUT`].
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format(LAYOUT).to_string()
}

pub(crate) fn timestamp(deterministic: bool) -> String {
    if deterministic {
        format_instant(deterministic_instant())
    } else {
        format_instant(Utc::now())
    }
}

/// A source location a line is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    file: Cow<'static, str>,
    line: u32,
}

impl CallSite {
    /// An explicit location, for callers that carry their own.
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// The location of the nearest caller that is not `#[track_caller]`.
    #[track_caller]
    pub fn here() -> Self {
        Self::from_location(Location::caller())
    }

    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            file: Cow::Borrowed(location.file()),
            line: location.line(),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// `<basename>#<line>`, or `None` when the site carries no usable location.
    pub fn token(&self) -> Option<String> {
        if self.line == 0 {
            return None;
        }
        let base = Path::new(self.file.as_ref())
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())?;
        Some(format!("{base}#{}", self.line))
    }
}

impl From<&'static Location<'static>> for CallSite {
    fn from(location: &'static Location<'static>) -> Self {
        Self::from_location(location)
    }
}

/// The resolved prelude fields of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub date_time: String,
    pub file: String,
    pub function: String,
    pub pid: u32,
}

/**
Resolves the prelude fields for a line.

- `site == None`, or a site without a file name or line, yields
  [`UNKNOWN_FILE`] and [`MISSING_FUNCTION`] regardless of `function`.
- An empty `function` yields [`MISSING_FUNCTION`].  Entry points fill in
  the caller's name from the stack before they get here.
- In deterministic mode the timestamp, file token and pid are fixed so that
  golden-output tests are reproducible.
*/
pub fn resolve(site: Option<&CallSite>, function: &str, deterministic: bool) -> Stamp {
    let function = if function.is_empty() {
        MISSING_FUNCTION
    } else {
        function
    };

    if deterministic {
        return Stamp {
            date_time: timestamp(true),
            file: DETERMINISTIC_FILE.to_string(),
            function: function.to_string(),
            pid: DETERMINISTIC_PID,
        };
    }

    let date_time = timestamp(false);
    let pid = std::process::id();
    match site.and_then(CallSite::token) {
        Some(file) => Stamp {
            date_time,
            file,
            function: function.to_string(),
            pid,
        },
        None => Stamp {
            date_time,
            file: UNKNOWN_FILE.to_string(),
            function: MISSING_FUNCTION.to_string(),
            pid,
        },
    }
}

/// Strips the module path from a `type_name`-style or demangled symbol path,
/// keeping the function.  Closures and generic arguments are dropped.
#[doc(hidden)]
pub fn short_function_name(path: &str) -> &str {
    let mut path = path;
    loop {
        if let Some(stripped) = path.strip_suffix("::{{closure}}") {
            path = stripped;
        } else if let Some(start) = path.rfind("::{closure#").filter(|_| path.ends_with('}')) {
            path = &path[..start];
        } else if let Some(start) = path.rfind("::<").filter(|_| path.ends_with('>')) {
            path = &path[..start];
        } else {
            break;
        }
    }
    path.rsplit("::").next().unwrap_or(path)
}

/// Demangled symbols of the entry points a walk starts from.
const ENTRY_POINTS: &str = "linewise::uplevel::Uplevel";

/// Where a stack walk ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Walk {
    /// The frame at the requested depth.  Either field is `None` when the
    /// frame carries no such debug info.
    Found {
        site: Option<CallSite>,
        function: Option<String>,
    },
    /// The stack ended before the requested depth.
    TooDeep,
    /// No entry point was found on the stack.
    Unavailable,
}

/**
Walks the stack to the caller of the innermost logging entry point, then
`depth` frames further up.

Inlined frames count as frames when debug info describes them.
*/
pub(crate) fn walk(depth: u32) -> Walk {
    let mut entered = false;
    let mut remaining = depth;
    let mut found = None;
    backtrace::trace(|frame| {
        backtrace::resolve_frame(frame, |symbol| {
            if found.is_some() {
                return;
            }
            let name = symbol.name().map(|name| format!("{name:#}"));
            if name.as_deref().is_some_and(|name| name.contains(ENTRY_POINTS)) {
                entered = true;
                return;
            }
            if !entered {
                return;
            }
            if remaining > 0 {
                remaining -= 1;
                return;
            }
            let site = symbol
                .filename()
                .zip(symbol.lineno())
                .map(|(file, line)| CallSite::new(file.to_string_lossy().into_owned(), line));
            found = Some(Walk::Found {
                site,
                function: name.map(|name| short_function_name(&name).to_string()),
            });
        });
        found.is_none()
    });
    match found {
        Some(walk) => walk,
        None if entered => Walk::TooDeep,
        None => Walk::Unavailable,
    }
}
