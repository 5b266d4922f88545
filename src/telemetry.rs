//! Collection telemetry events and sinks.
//!
//! Telemetry complements `tracing` logs with a small set of structured
//! events describing fetch progress, rate limit waits, and retries. The
//! binary can mirror them to stderr as JSON lines for debugging CI runs.

use std::io;

use serde::{Deserialize, Serialize};

use crate::github::error::Resource;

/// A structured telemetry event emitted during collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// A resource fetch began.
    FetchStarted {
        /// Resource being fetched.
        resource: Resource,
    },
    /// A resource fetch completed.
    FetchSucceeded {
        /// Resource that was fetched.
        resource: Resource,
        /// Number of items returned.
        items: usize,
    },
    /// A resource fetch failed and aborted the collection.
    FetchFailed {
        /// Resource whose fetch failed.
        resource: Resource,
        /// Error description.
        message: String,
    },
    /// The client paused because the rate budget reached the threshold.
    RateLimitWait {
        /// Length of the pause in seconds.
        seconds: u64,
        /// Requests remaining when the pause began.
        remaining: u32,
    },
    /// A failed request was scheduled for another attempt.
    RetryScheduled {
        /// Number of the attempt that failed (one-based).
        attempt: u32,
        /// Delay before the next attempt in milliseconds.
        delay_ms: u64,
        /// Description of the failure.
        reason: String,
    },
    /// Checks were collected for an explicit SHA on an unmerged pull request.
    UnmergedWithExplicitSha {
        /// Pull request number.
        number: u64,
        /// The caller-supplied commit SHA.
        sha: String,
    },
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events to stderr as JSON lines (JSONL).
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}

/// Sinks for asserting on emitted telemetry in tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::sync::{Mutex, PoisonError};

    use super::{TelemetryEvent, TelemetrySink};

    /// Sink that keeps every event in memory.
    #[derive(Debug, Default)]
    pub struct RecordingTelemetrySink {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    impl RecordingTelemetrySink {
        /// Returns the events recorded so far, in order.
        #[must_use]
        pub fn events(&self) -> Vec<TelemetryEvent> {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl TelemetrySink for RecordingTelemetrySink {
        fn record(&self, event: TelemetryEvent) {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event);
        }
    }
}
