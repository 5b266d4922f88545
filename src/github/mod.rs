//! Resilient access to the GitHub REST API.
//!
//! This module owns everything that talks to GitHub: the rate limit and
//! backoff policies, the authenticated transport with lazy pagination, and
//! the gateway that maps raw payloads into typed snapshot records. Errors are
//! reported through [`IntakeError`] so callers never see transport internals.

pub mod backoff;
pub mod clock;
pub mod error;
pub mod gateway;
pub mod locator;
pub mod models;
pub mod pagination;
pub mod rate_limit;
pub mod transport;

pub use backoff::{BackoffPolicy, FailureKind, RetryDecision};
pub use clock::{Clock, Sleeper, SystemClock, TokioSleeper};
pub use error::{IntakeError, Resource};
pub use gateway::{HttpGateway, PullRequestGateway};
pub use locator::{
    CommitSha, PersonalAccessToken, PullRequestLocator, PullRequestNumber, RepositoryName,
    RepositoryOwner,
};
pub use models::PullRequestMetadata;
pub use pagination::Pagination;
pub use rate_limit::{RateBudget, RateLimitPolicy};
pub use transport::{ClientSettings, TransportClient, TransportError};

#[cfg(test)]
pub use gateway::MockPullRequestGateway;
