//! Rate limit budget tracking and the proactive wait policy.
//!
//! GitHub reports the remaining request budget on every response through the
//! `X-RateLimit-Limit`, `X-RateLimit-Remaining`, and `X-RateLimit-Reset`
//! headers. [`RateBudget`] captures those values and [`RateLimitPolicy`]
//! decides how long the client should pause before its next request.

use std::time::Duration;

use http::HeaderMap;

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Default remaining-request count at or below which the client pauses.
pub const DEFAULT_RATE_LIMIT_THRESHOLD: u32 = 10;

/// Rate limit budget extracted from GitHub API response headers.
///
/// # Example
///
/// ```
/// use prsnap::github::rate_limit::RateBudget;
///
/// let budget = RateBudget::new(5000, 4999, 1_700_000_000);
/// assert!(!budget.is_exhausted());
/// assert_eq!(budget.remaining(), 4999);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudget {
    /// Maximum requests allowed in the current window.
    limit: u32,
    /// Remaining requests in the current window.
    remaining: u32,
    /// Unix timestamp when the rate limit resets.
    reset_at: u64,
}

impl RateBudget {
    /// Creates a new rate budget.
    #[must_use]
    pub const fn new(limit: u32, remaining: u32, reset_at: u64) -> Self {
        Self {
            limit,
            remaining,
            reset_at,
        }
    }

    /// Reads the budget from response headers.
    ///
    /// Returns `None` unless both the remaining count and the reset
    /// timestamp are present and numeric. A missing limit falls back to the
    /// remaining count.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let remaining = numeric_header::<u32>(headers, REMAINING_HEADER)?;
        let reset_at = numeric_header::<u64>(headers, RESET_HEADER)?;
        let limit = numeric_header::<u32>(headers, LIMIT_HEADER).unwrap_or(remaining);
        Some(Self::new(limit, remaining, reset_at))
    }

    /// Returns the maximum requests allowed in the current window.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the remaining requests in the current window.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Returns the Unix timestamp when the rate limit resets.
    #[must_use]
    pub const fn reset_at(&self) -> u64 {
        self.reset_at
    }

    /// Returns true if the rate limit has been exhausted.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Seconds until the window resets, measured from `now_unix`.
    ///
    /// Returns 0 when the reset time has already passed.
    #[must_use]
    pub const fn seconds_until_reset(&self, now_unix: u64) -> u64 {
        self.reset_at.saturating_sub(now_unix)
    }
}

fn numeric_header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse().ok())
}

/// Decides whether the client must pause before its next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    threshold: u32,
}

impl RateLimitPolicy {
    /// Creates a policy that pauses once `threshold` or fewer requests
    /// remain.
    #[must_use]
    pub const fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// Returns the configured threshold.
    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Computes the pause required before the next request.
    ///
    /// The wait is zero when no budget has been observed yet, when the
    /// remaining budget is above the threshold, or when the reset time
    /// has already passed. Otherwise it is the time left until the reset.
    #[must_use]
    pub const fn should_wait(&self, budget: Option<&RateBudget>, now_unix: u64) -> Duration {
        match budget {
            Some(observed) if observed.remaining <= self.threshold => {
                Duration::from_secs(observed.seconds_until_reset(now_unix))
            }
            _ => Duration::ZERO,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::{HeaderMap, HeaderValue};
    use rstest::rstest;

    use super::{RateBudget, RateLimitPolicy};

    const NOW: u64 = 1_700_000_000;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[rstest]
    fn seconds_until_reset_returns_zero_when_reset_has_passed() {
        let budget = RateBudget::new(5000, 0, NOW - 5);
        assert_eq!(budget.seconds_until_reset(NOW), 0);
    }

    #[rstest]
    fn seconds_until_reset_counts_from_supplied_clock() {
        let budget = RateBudget::new(5000, 0, NOW + 60);
        assert_eq!(budget.seconds_until_reset(NOW), 60);
    }

    #[rstest]
    fn from_headers_reads_all_values() {
        let map = headers(&[
            ("x-ratelimit-limit", "5000"),
            ("x-ratelimit-remaining", "42"),
            ("x-ratelimit-reset", "1700000100"),
        ]);

        assert_eq!(
            RateBudget::from_headers(&map),
            Some(RateBudget::new(5000, 42, 1_700_000_100))
        );
    }

    #[rstest]
    #[case::missing_reset(&[("x-ratelimit-remaining", "42")])]
    #[case::missing_remaining(&[("x-ratelimit-reset", "1700000100")])]
    #[case::non_numeric(&[("x-ratelimit-remaining", "lots"), ("x-ratelimit-reset", "1700000100")])]
    fn from_headers_ignores_incomplete_budgets(#[case] pairs: &[(&'static str, &'static str)]) {
        assert_eq!(RateBudget::from_headers(&headers(pairs)), None);
    }

    #[rstest]
    fn no_wait_before_any_budget_is_observed() {
        let policy = RateLimitPolicy::new(10);
        assert_eq!(policy.should_wait(None, NOW), Duration::ZERO);
    }

    #[rstest]
    #[case::well_above_threshold(4999, NOW + 600, 0)]
    #[case::just_above_threshold(11, NOW + 600, 0)]
    #[case::exactly_at_threshold(10, NOW + 600, 600)]
    #[case::below_threshold(9, NOW + 600, 600)]
    #[case::exhausted(0, NOW + 30, 30)]
    #[case::reset_in_past(0, NOW - 30, 0)]
    fn waits_at_or_below_threshold_until_reset(
        #[case] remaining: u32,
        #[case] reset_at: u64,
        #[case] expected_seconds: u64,
    ) {
        let policy = RateLimitPolicy::new(10);
        let budget = RateBudget::new(5000, remaining, reset_at);

        assert_eq!(
            policy.should_wait(Some(&budget), NOW),
            Duration::from_secs(expected_seconds)
        );
    }

    #[rstest]
    fn every_budget_at_or_below_threshold_waits_for_future_reset() {
        let policy = RateLimitPolicy::new(10);
        for remaining in 0..=policy.threshold() {
            for offset in [1_u64, 30, 3600] {
                let budget = RateBudget::new(5000, remaining, NOW + offset);
                assert_eq!(
                    policy.should_wait(Some(&budget), NOW),
                    Duration::from_secs(offset),
                    "remaining {remaining} with reset in {offset}s should wait"
                );
            }
        }
    }

    #[rstest]
    fn wait_never_exceeds_time_to_reset() {
        let policy = RateLimitPolicy::new(100);
        for remaining in 0..100 {
            for offset in [0_u64, 1, 59, 3600] {
                let budget = RateBudget::new(5000, remaining, NOW + offset);
                let wait = policy.should_wait(Some(&budget), NOW);
                assert!(
                    wait <= Duration::from_secs(offset),
                    "wait {wait:?} exceeded reset offset {offset}"
                );
            }
        }
    }
}
