// SPDX-License-Identifier: MIT OR Apache-2.0

//! The background writer.
//!
//! One thread owns the receiving end of the dispatch queue.  Each line it
//! receives is appended to the buffer of its destination [`Device`]; every bulk
//! flush period the non-empty buffers are handed to per-device flusher threads,
//! which perform the actual (possibly slow) sink writes.
//!
//! ```text
//! dispatch ──bounded queue──▶ writer ──bounded──▶ flusher(stdout) ──▶ sink
//!                               │    ──bounded──▶ flusher(memory) ──▶ sink
//!                               └─ deadline rearmed after every bulk flush
//! ```
//!
//! Chunks for a single device travel through one channel to one thread, so they
//! reach the sink in FIFO order.  A device whose sink blocks forever only stalls
//! its own flusher; once [`FLUSH_BACKLOG`] chunks are waiting for it, further
//! chunks for that device are dropped.
//!
//! The deadline is checked after every line as well as on timeout, so a queue
//! that never runs dry still gets flushed once per period.
//!
//! When the queue disconnects (the dispatcher dropped its sender during
//! shutdown) the writer drains what is left, performs a final flush, and waits
//! up to the flush grace for the flushers to finish before returning.

use crate::device::Device;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded, unbounded};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Shortest bulk flush period the writer will arm.
const MIN_BULK_PERIOD: Duration = Duration::from_millis(1);

/// Chunks a flusher may have queued before the writer drops new ones.
pub(crate) const FLUSH_BACKLOG: usize = 64;

/// One rendered line and where it goes.
#[derive(Debug)]
pub(crate) struct Line {
    pub(crate) device: Device,
    pub(crate) bytes: Vec<u8>,
}

/// Settings shared between the system and a running writer.
#[derive(Debug, Clone)]
pub(crate) struct WriterShared {
    /// Lines handed to the queue but not yet buffered by the writer.
    pub(crate) pending: Arc<AtomicI64>,
    /// Bulk flush period in nanoseconds, reread every time the timer is rearmed.
    pub(crate) bulk_period: Arc<AtomicU64>,
}

impl WriterShared {
    pub(crate) fn new(bulk_period: Duration) -> Self {
        let shared = Self {
            pending: Arc::new(AtomicI64::new(0)),
            bulk_period: Arc::new(AtomicU64::new(0)),
        };
        shared.set_bulk_period(bulk_period);
        shared
    }

    pub(crate) fn set_bulk_period(&self, period: Duration) {
        let nanos = u64::try_from(period.as_nanos()).unwrap_or(u64::MAX);
        self.bulk_period.store(nanos, Ordering::Relaxed);
    }

    pub(crate) fn bulk_period(&self) -> Duration {
        Duration::from_nanos(self.bulk_period.load(Ordering::Relaxed)).max(MIN_BULK_PERIOD)
    }
}

/// Starts the writer thread.  Returns `None` if the thread could not be spawned,
/// in which case `lines` is dropped and every handoff fails as disconnected.
pub(crate) fn spawn(
    lines: Receiver<Line>,
    shared: WriterShared,
    flush_grace: Duration,
) -> Option<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("linewise-writer".to_string())
        .spawn(move || writer_loop(lines, Coalescer::new(shared, flush_grace)))
        .ok()
}

fn writer_loop(lines: Receiver<Line>, mut coalescer: Coalescer) {
    let mut next_flush = Instant::now() + coalescer.shared.bulk_period();
    loop {
        match lines.recv_deadline(next_flush) {
            Ok(line) => coalescer.accept(line),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        let now = Instant::now();
        if now >= next_flush {
            coalescer.flush();
            next_flush = now + coalescer.shared.bulk_period();
        }
    }
    coalescer.finish();
}

/// Per-device buffers and the flushers that drain them.
struct Coalescer {
    shared: WriterShared,
    flush_grace: Duration,
    buffers: HashMap<Device, Vec<u8>>,
    flushers: HashMap<Device, Sender<Vec<u8>>>,
    done: Option<Sender<()>>,
    all_done: Receiver<()>,
}

impl Coalescer {
    fn new(shared: WriterShared, flush_grace: Duration) -> Self {
        let (done, all_done) = unbounded();
        Self {
            shared,
            flush_grace,
            buffers: HashMap::new(),
            flushers: HashMap::new(),
            done: Some(done),
            all_done,
        }
    }

    fn accept(&mut self, line: Line) {
        self.buffers
            .entry(line.device)
            .or_default()
            .extend_from_slice(&line.bytes);
        self.shared.pending.fetch_sub(1, Ordering::AcqRel);
    }

    fn flush(&mut self) {
        let ready: Vec<(Device, Vec<u8>)> = self
            .buffers
            .iter_mut()
            .filter(|(_, buffer)| !buffer.is_empty())
            .map(|(device, buffer)| (device.clone(), std::mem::take(buffer)))
            .collect();
        for (device, chunk) in ready {
            match self.flusher(&device).try_send(chunk) {
                Ok(()) => {}
                // backlog full; the chunk is dropped
                Err(TrySendError::Full(_)) => {}
                // flusher thread never started; write inline
                Err(TrySendError::Disconnected(unsent)) => {
                    let _ = device.write_bytes(&unsent);
                }
            }
        }
    }

    fn flusher(&mut self, device: &Device) -> &Sender<Vec<u8>> {
        let done = self.done.clone();
        self.flushers.entry(device.clone()).or_insert_with(|| {
            let (chunks, incoming) = bounded::<Vec<u8>>(FLUSH_BACKLOG);
            let device = device.clone();
            let _ = std::thread::Builder::new()
                .name("linewise-flush".to_string())
                .spawn(move || {
                    for chunk in incoming {
                        let _ = device.write_bytes(&chunk);
                    }
                    drop(done);
                });
            chunks
        })
    }

    /// Final flush, then wait for the flushers to drain or the grace to expire.
    fn finish(mut self) {
        self.flush();
        self.buffers.clear();
        self.flushers.clear();
        self.done = None;
        // nothing is ever sent on `done`; disconnection means every flusher exited
        match Instant::now().checked_add(self.flush_grace) {
            Some(deadline) => while self.all_done.recv_deadline(deadline).is_ok() {},
            None => while self.all_done.recv().is_ok() {},
        }
    }
}
