// SPDX-License-Identifier: MIT OR Apache-2.0

//! The handoff from a logging call to the background writer.
//!
//! Every entry point ends in [`Dispatcher::dispatch`].  It is the only place a
//! logging call can block, and then only for the stall timeout.
//!
//! # Architecture
//!
//! The dispatcher holds the sending half of a bounded crossbeam channel and a
//! small amount of state behind one `parking_lot::Mutex`:
//!
//! 1. An absent device drops the line.
//! 2. Empty bytes are replaced with [`EMPTY_MESSAGE`]; a missing trailing
//!    newline is appended.
//! 3. While shutting down, or before the first init, the line is dropped.
//! 4. While logging is off and lines are still pending, the line is dropped.
//!    Once pending reaches zero the next call switches logging back on and
//!    writes [`LOGGING_WAS_OFF`] straight to its device.
//! 5. The line is offered to the channel with `send_timeout`.  If the stall
//!    timeout elapses first, logging is switched off and the line is dropped.
//!
//! Stalls and the lines they cost are tallied in [`Backpressure`].
//!
//! Nothing here reports an error to the caller.

use crate::device::Device;
use crate::writer::Line;
use crossbeam_channel::{SendTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Written in place of an empty line.
pub const EMPTY_MESSAGE: &str = "**** LOG ERROR: MESSAGE IS EMPTY - PLEASE REPORT ****\n";

/// Written once, synchronously, when logging recovers from a stall.
pub const LOGGING_WAS_OFF: &str = "**** LOG WARNING: LOGGING WAS OFF - PLEASE REPORT ****\n";

/// Backpressure tallies for the current cycle, reset by every init.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Backpressure {
    /// Times a handoff timed out and switched logging off.
    pub stalls: u64,
    /// Lines lost to stalls: the one that timed out plus those dropped while off.
    pub dropped: u64,
}

#[derive(Debug)]
struct DispatchState {
    sender: Option<Sender<Line>>,
    shutting_down: bool,
    logging_off: bool,
    stall_timeout: Duration,
    backpressure: Backpressure,
}

#[derive(Debug)]
pub(crate) struct Dispatcher {
    state: Mutex<DispatchState>,
    pending: Arc<AtomicI64>,
}

impl Dispatcher {
    /// A quiescent dispatcher: every line is dropped until [`start`](Self::start).
    pub(crate) fn new(pending: Arc<AtomicI64>, stall_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(DispatchState {
                sender: None,
                shutting_down: false,
                logging_off: false,
                stall_timeout,
                backpressure: Backpressure::default(),
            }),
            pending,
        }
    }

    pub(crate) fn start(&self, sender: Sender<Line>, stall_timeout: Duration) {
        let mut state = self.state.lock();
        state.sender = Some(sender);
        state.shutting_down = false;
        state.logging_off = false;
        state.stall_timeout = stall_timeout;
        state.backpressure = Backpressure::default();
        self.pending.store(0, Ordering::Release);
    }

    /// Stops accepting lines and drops the sender so the writer sees the queue
    /// disconnect.  Returns whether the dispatcher was running.
    pub(crate) fn close(&self) -> bool {
        let mut state = self.state.lock();
        state.shutting_down = true;
        state.sender.take().is_some()
    }

    pub(crate) fn set_stall_timeout(&self, timeout: Duration) {
        self.state.lock().stall_timeout = timeout;
    }

    pub(crate) fn stall_timeout(&self) -> Duration {
        self.state.lock().stall_timeout
    }

    pub(crate) fn is_logging_off(&self) -> bool {
        self.state.lock().logging_off
    }

    pub(crate) fn backpressure(&self) -> Backpressure {
        self.state.lock().backpressure
    }

    pub(crate) fn pending(&self) -> i64 {
        self.pending.load(Ordering::Acquire)
    }

    pub(crate) fn dispatch(&self, device: Option<&Device>, mut bytes: Vec<u8>) {
        let Some(device) = device else {
            return;
        };
        if bytes.is_empty() {
            bytes = EMPTY_MESSAGE.as_bytes().to_vec();
        } else if bytes.last() != Some(&b'\n') {
            bytes.push(b'\n');
        }

        let mut state = self.state.lock();
        if state.shutting_down {
            return;
        }
        let timeout = state.stall_timeout;
        let Some(sender) = state.sender.clone() else {
            return;
        };

        if state.logging_off {
            if self.pending() > 0 {
                state.backpressure.dropped += 1;
                return;
            }
            state.logging_off = false;
            let _ = device.write_bytes(LOGGING_WAS_OFF.as_bytes());
        }

        // counted before the handoff so the writer's decrement never overtakes it
        self.pending.fetch_add(1, Ordering::AcqRel);
        let line = Line {
            device: device.clone(),
            bytes,
        };
        match sender.send_timeout(line, timeout) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                state.logging_off = true;
                state.backpressure.stalls += 1;
                state.backpressure.dropped += 1;
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
            }
        }
    }
}
