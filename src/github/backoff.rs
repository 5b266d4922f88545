//! Exponential backoff for transient request failures.

use std::time::Duration;

use http::StatusCode;

/// Default delay before the first retry.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
/// Default growth factor between consecutive retries.
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;
/// Default ceiling for a single retry delay.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(60);
/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Classification of a failed request attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request never produced a response (connect, timeout, reset).
    Network,
    /// GitHub answered with a 5xx status.
    Server,
    /// GitHub answered 429 or reported an exhausted budget.
    RateLimited,
    /// Any other client-side status; never retried.
    Client,
}

impl FailureKind {
    /// Classifies a non-success HTTP status.
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimited
        } else if status.is_server_error() {
            Self::Server
        } else {
            Self::Client
        }
    }

    /// Returns true when a retry could plausibly succeed.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        !matches!(self, Self::Client)
    }
}

/// Outcome of asking the policy about a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then try again.
    RetryAfter(Duration),
    /// Give up and surface the failure.
    DoNotRetry,
}

/// Exponential backoff with a ceiling and a bounded number of retries.
///
/// The delay for retry `n` (zero-based) is `base * multiplier^n`, saturating
/// at `max_delay`. Delays never decrease as `n` grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    multiplier: u32,
    max_delay: Duration,
    max_retries: u32,
}

impl BackoffPolicy {
    /// Creates a policy. A zero multiplier is treated as one.
    #[must_use]
    pub const fn new(base: Duration, multiplier: u32, max_delay: Duration, max_retries: u32) -> Self {
        Self {
            base,
            multiplier: if multiplier == 0 { 1 } else { multiplier },
            max_delay,
            max_retries,
        }
    }

    /// Delay before the first retry.
    #[must_use]
    pub const fn base(&self) -> Duration {
        self.base
    }

    /// Growth factor between retries.
    #[must_use]
    pub const fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Upper bound for a single delay.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Number of retries allowed after the initial attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns true while `retries_used` is below the retry budget.
    #[must_use]
    pub const fn can_retry(&self, retries_used: u32) -> bool {
        retries_used < self.max_retries
    }

    /// Computes the delay before retry number `attempt` (zero-based).
    ///
    /// Non-transient failures are never retried. The retry budget is not
    /// consulted here; callers combine this with [`Self::can_retry`].
    #[must_use]
    pub fn next_retry_delay(&self, attempt: u32, kind: FailureKind) -> RetryDecision {
        if !kind.is_transient() {
            return RetryDecision::DoNotRetry;
        }

        let factor = self.multiplier.checked_pow(attempt).unwrap_or(u32::MAX);
        let delay = self
            .base
            .checked_mul(factor)
            .map_or(self.max_delay, |scaled| scaled.min(self.max_delay));
        RetryDecision::RetryAfter(delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_BACKOFF_BASE,
            DEFAULT_BACKOFF_MULTIPLIER,
            DEFAULT_BACKOFF_MAX,
            DEFAULT_MAX_RETRIES,
        )
    }
}
