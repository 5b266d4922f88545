//! Error types for pull request activity collection.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Remote resource kinds fetched while building a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Pull request metadata.
    PullRequest,
    /// Commits on the pull request.
    Commits,
    /// Files changed by the pull request.
    Files,
    /// Conversation comments on the pull request's issue.
    IssueComments,
    /// Inline review comments attached to the diff.
    ReviewComments,
    /// Submitted and pending reviews.
    Reviews,
    /// Check runs reported for the merge commit.
    CheckRuns,
    /// Combined commit status for the merge commit.
    CombinedStatus,
}

impl Resource {
    /// Human-readable label used in messages and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PullRequest => "pull request",
            Self::Commits => "commits",
            Self::Files => "files",
            Self::IssueComments => "issue comments",
            Self::ReviewComments => "review comments",
            Self::Reviews => "reviews",
            Self::CheckRuns => "check runs",
            Self::CombinedStatus => "combined status",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Errors surfaced while collecting pull request activity.
///
/// Collection is all-or-nothing: the first failure aborts the whole
/// snapshot and is returned to the caller as one of these variants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntakeError {
    /// Caller supplied an invalid identifier or an unusable merge SHA.
    #[error("invalid input: {message}")]
    Validation {
        /// Description of the rejected input.
        message: String,
    },

    /// GitHub rejected the credentials (HTTP 401/403).
    #[error("GitHub rejected the token while fetching {resource}: {message}")]
    Authentication {
        /// Resource being fetched when the token was rejected.
        resource: Resource,
        /// Message returned by GitHub.
        message: String,
    },

    /// The requested resource does not exist (HTTP 404).
    #[error("{resource} not found: {message}")]
    NotFound {
        /// Resource that could not be found.
        resource: Resource,
        /// Message returned by GitHub.
        message: String,
    },

    /// The rate limit was still exhausted after every retry.
    #[error("GitHub API rate limit exceeded while fetching {resource}: {message}")]
    RateLimited {
        /// Resource being fetched when retries ran out.
        resource: Resource,
        /// Last reset timestamp (Unix seconds) GitHub reported, when known.
        reset_at: Option<u64>,
        /// Message returned by GitHub.
        message: String,
    },

    /// Server errors or network failures outlasted the retry budget.
    #[error("fetching {resource} failed after {attempts} attempts: {message}")]
    Transient {
        /// Resource being fetched.
        resource: Resource,
        /// Total number of attempts made.
        attempts: u32,
        /// Description of the last failure.
        message: String,
    },

    /// GitHub answered with an unexpected status code.
    #[error("GitHub API error while fetching {resource} (HTTP {status}): {message}")]
    Api {
        /// Resource being fetched.
        resource: Resource,
        /// HTTP status code.
        status: u16,
        /// Message or body returned by GitHub.
        message: String,
    },

    /// A response lacked a required field or carried an unusable value.
    #[error("malformed {resource} response: field `{field}` {message}")]
    MalformedResponse {
        /// Resource whose payload was malformed.
        resource: Resource,
        /// Dotted path of the offending field.
        field: String,
        /// What was wrong with the field.
        message: String,
    },

    /// The whole collection exceeded its time limit.
    #[error("collection did not finish within {seconds} seconds")]
    Timeout {
        /// Configured limit in seconds.
        seconds: u64,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// Writing output failed.
    #[error("I/O error: {message}")]
    Io {
        /// Underlying I/O error message.
        message: String,
    },

    /// Reading or writing git notes failed.
    #[error("git notes error: {message}")]
    Notes {
        /// Underlying git error message.
        message: String,
    },
}
