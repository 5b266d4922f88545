//! Time sources used by the transport client.
//!
//! Waiting for a rate limit reset or a retry delay goes through [`Sleeper`]
//! and every "now" goes through [`Clock`], so tests can drive the client
//! without real wall-clock pauses.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

/// Source of the current Unix time.
pub trait Clock: Send + Sync {
    /// Returns the current time as whole seconds since the Unix epoch.
    fn now_unix(&self) -> u64;
}

/// Clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0)
    }
}

/// Asynchronous pause used for rate limit waits and retry delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the Tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic time sources for tests.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{Clock, Sleeper};

    /// Clock frozen at a fixed instant.
    #[derive(Debug, Clone, Copy)]
    pub struct FixedClock(pub u64);

    impl Clock for FixedClock {
        fn now_unix(&self) -> u64 {
            self.0
        }
    }

    /// Sleeper that returns immediately and remembers every requested pause.
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        pauses: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        /// Returns the pauses requested so far, in order.
        #[must_use]
        pub fn pauses(&self) -> Vec<Duration> {
            self.pauses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.pauses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(duration);
        }
    }
}
