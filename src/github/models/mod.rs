//! Wire models for GitHub REST payloads.
//!
//! Types prefixed with `Api` are lenient deserialisation targets where every
//! field is optional. The functions in [`mapping`] convert them into the
//! snapshot records, rejecting missing identity fields with
//! [`IntakeError::MalformedResponse`](crate::github::error::IntakeError)
//! rather than substituting defaults.

pub(crate) mod mapping;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::github::locator::CommitSha;
use crate::snapshot::PullRequestState;

/// Pull request metadata needed to assemble a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestMetadata {
    /// Pull request number.
    pub number: u64,
    /// Title of the pull request.
    pub title: String,
    /// Lifecycle state.
    pub state: PullRequestState,
    /// HTML URL for displaying to a user.
    pub html_url: String,
    /// Author login.
    pub author: String,
    /// Login of the user who merged the pull request.
    pub merged_by: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Merge timestamp.
    pub merged_at: Option<DateTime<Utc>>,
    /// Base branch name.
    pub base_branch: String,
    /// Head branch name.
    pub head_branch: String,
    /// Description body.
    pub body: Option<String>,
    /// Label names.
    pub labels: Vec<String>,
    /// Merge commit SHA reported by GitHub.
    pub merge_commit_sha: Option<CommitSha>,
}

impl PullRequestMetadata {
    /// Returns true when GitHub reports the pull request as merged.
    #[must_use]
    pub const fn is_merged(&self) -> bool {
        matches!(self.state, PullRequestState::Merged)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiUser {
    pub(crate) login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiBranch {
    #[serde(rename = "ref")]
    pub(crate) ref_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiLabel {
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiPullRequest {
    pub(crate) number: Option<u64>,
    pub(crate) title: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) html_url: Option<String>,
    pub(crate) user: Option<ApiUser>,
    pub(crate) body: Option<String>,
    pub(crate) created_at: Option<String>,
    pub(crate) merged: Option<bool>,
    pub(crate) merged_at: Option<String>,
    pub(crate) merged_by: Option<ApiUser>,
    pub(crate) merge_commit_sha: Option<String>,
    pub(crate) base: Option<ApiBranch>,
    pub(crate) head: Option<ApiBranch>,
    pub(crate) labels: Option<Vec<ApiLabel>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiGitActor {
    pub(crate) name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCommitDetail {
    pub(crate) message: Option<String>,
    pub(crate) author: Option<ApiGitActor>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCommit {
    pub(crate) sha: Option<String>,
    pub(crate) html_url: Option<String>,
    pub(crate) commit: Option<ApiCommitDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiFile {
    pub(crate) filename: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) additions: Option<u64>,
    pub(crate) deletions: Option<u64>,
    pub(crate) previous_filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiIssueComment {
    pub(crate) id: Option<u64>,
    pub(crate) user: Option<ApiUser>,
    pub(crate) body: Option<String>,
    pub(crate) created_at: Option<String>,
    pub(crate) html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiReviewComment {
    pub(crate) id: Option<u64>,
    pub(crate) user: Option<ApiUser>,
    pub(crate) body: Option<String>,
    pub(crate) created_at: Option<String>,
    pub(crate) html_url: Option<String>,
    pub(crate) path: Option<String>,
    pub(crate) line: Option<u32>,
    pub(crate) original_line: Option<u32>,
    pub(crate) in_reply_to_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiReview {
    pub(crate) id: Option<u64>,
    pub(crate) user: Option<ApiUser>,
    pub(crate) state: Option<String>,
    pub(crate) submitted_at: Option<String>,
    pub(crate) body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiApp {
    pub(crate) name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCheckRun {
    pub(crate) name: Option<String>,
    pub(crate) status: Option<String>,
    pub(crate) conclusion: Option<String>,
    pub(crate) started_at: Option<String>,
    pub(crate) completed_at: Option<String>,
    pub(crate) html_url: Option<String>,
    pub(crate) details_url: Option<String>,
    pub(crate) app: Option<ApiApp>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCommitStatus {
    pub(crate) context: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) target_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiCombinedStatus {
    pub(crate) statuses: Option<Vec<ApiCommitStatus>>,
}
