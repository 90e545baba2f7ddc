//! Progress event types and broadcast channel for harvest telemetry.
//!
//! The coordinator and acquisition engine emit `ProgressEvent`s, which
//! flow through a `tokio::sync::broadcast` channel to all subscribers
//! (progress bars, JSON output). When no subscriber exists, events are
//! silently dropped.

use serde::{Deserialize, Serialize};

/// Bytes between two `BytesWritten` events for one download.
pub const BYTES_STRIDE: u64 = 256 * 1024;

/// A progress event emitted during a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// `creator` or `creator/work` this event belongs to.
    pub key: String,
    /// Monotonically increasing per key.
    pub seq: u64,
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    CreatorStarted { works: u32 },
    CreatorFinished { elapsed_ms: u64 },
    WorkStarted,
    /// The direct path did not work; the alternate path takes over.
    FallbackTriggered { reason: String },
    /// The media body started streaming. `total_bytes` is the declared
    /// content length, if any.
    DownloadStarted {
        path: String,
        total_bytes: Option<u64>,
    },
    BytesWritten { written: u64, total: Option<u64> },
    WorkFinished { outcome: String, elapsed_ms: u64 },
    /// A non-fatal warning occurred.
    Warning { message: String },
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(1024)
}

/// Emit a progress event, silently ignoring send errors (which occur when
/// no receivers are listening).
pub fn emit(tx: &Option<ProgressSender>, key: &str, seq: &mut u64, event: ProgressEventKind) {
    if let Some(ref sender) = tx {
        *seq += 1;
        let _ = sender.send(ProgressEvent {
            key: key.to_string(),
            seq: *seq,
            event,
        });
    }
}

/// Byte accounting for one streamed download.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteCounter {
    pub written: u64,
    /// Declared content length; absent or zero means unknown.
    pub total: Option<u64>,
    last_reported: u64,
}

impl ByteCounter {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            written: 0,
            total: total.filter(|t| *t > 0),
            last_reported: 0,
        }
    }

    /// Add `n` bytes; returns true when a progress report is due.
    pub fn add(&mut self, n: u64) -> bool {
        self.written += n;
        if self.written - self.last_reported >= BYTES_STRIDE {
            self.last_reported = self.written;
            true
        } else {
            false
        }
    }

    /// Fraction complete, when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        self.total
            .map(|t| (self.written as f64 / t as f64).min(1.0))
    }
}
