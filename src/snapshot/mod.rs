//! Immutable record of a pull request's activity.
//!
//! A [`Snapshot`] is only produced when every fetch succeeded, so it is
//! always complete. Its fields are private and exposed through accessors,
//! which keeps the derived totals consistent with the file list.

mod entities;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use entities::{
    ChangeKind, CheckConclusion, CheckRun, CheckSource, Comment, CommentKind, Commit, FileChange,
    PullRequestState, Review, ReviewState,
};

pub use crate::github::locator::CommitSha;

/// Values the collector assembles into a [`Snapshot`].
#[derive(Debug, Clone)]
pub(crate) struct SnapshotParts {
    pub(crate) number: u64,
    pub(crate) title: String,
    pub(crate) state: PullRequestState,
    pub(crate) html_url: String,
    pub(crate) author: String,
    pub(crate) merged_by: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) merged_at: Option<DateTime<Utc>>,
    pub(crate) base_branch: String,
    pub(crate) head_branch: String,
    pub(crate) description: Option<String>,
    pub(crate) labels: Vec<String>,
    pub(crate) linked_issues: Vec<u64>,
    pub(crate) merge_commit_sha: CommitSha,
    pub(crate) participants: Vec<String>,
    pub(crate) commits: Vec<Commit>,
    pub(crate) file_changes: Vec<FileChange>,
    pub(crate) comments: Vec<Comment>,
    pub(crate) reviews: Vec<Review>,
    pub(crate) check_runs: Vec<CheckRun>,
}

/// Complete, read-only activity record for one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    number: u64,
    title: String,
    state: PullRequestState,
    html_url: String,
    author: String,
    merged_by: Option<String>,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
    base_branch: String,
    head_branch: String,
    description: Option<String>,
    labels: Vec<String>,
    linked_issues: Vec<u64>,
    merge_commit_sha: CommitSha,
    participants: Vec<String>,
    commits: Vec<Commit>,
    file_changes: Vec<FileChange>,
    comments: Vec<Comment>,
    reviews: Vec<Review>,
    check_runs: Vec<CheckRun>,
    total_additions: u64,
    total_deletions: u64,
}

impl Snapshot {
    pub(crate) fn from_parts(parts: SnapshotParts) -> Self {
        let total_additions = parts
            .file_changes
            .iter()
            .fold(0_u64, |sum, file| sum.saturating_add(file.additions));
        let total_deletions = parts
            .file_changes
            .iter()
            .fold(0_u64, |sum, file| sum.saturating_add(file.deletions));

        Self {
            number: parts.number,
            title: parts.title,
            state: parts.state,
            html_url: parts.html_url,
            author: parts.author,
            merged_by: parts.merged_by,
            created_at: parts.created_at,
            merged_at: parts.merged_at,
            base_branch: parts.base_branch,
            head_branch: parts.head_branch,
            description: parts.description,
            labels: parts.labels,
            linked_issues: parts.linked_issues,
            merge_commit_sha: parts.merge_commit_sha,
            participants: parts.participants,
            commits: parts.commits,
            file_changes: parts.file_changes,
            comments: parts.comments,
            reviews: parts.reviews,
            check_runs: parts.check_runs,
            total_additions,
            total_deletions,
        }
    }

    /// Pull request number.
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }

    /// Pull request title.
    #[must_use]
    pub const fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PullRequestState {
        self.state
    }

    /// Returns true when the pull request was merged.
    #[must_use]
    pub const fn is_merged(&self) -> bool {
        matches!(self.state, PullRequestState::Merged)
    }

    /// Link to the pull request on GitHub.
    #[must_use]
    pub const fn html_url(&self) -> &str {
        self.html_url.as_str()
    }

    /// Login of the pull request author.
    #[must_use]
    pub const fn author(&self) -> &str {
        self.author.as_str()
    }

    /// Login of the user who merged the pull request.
    #[must_use]
    pub fn merged_by(&self) -> Option<&str> {
        self.merged_by.as_deref()
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Merge timestamp.
    #[must_use]
    pub const fn merged_at(&self) -> Option<DateTime<Utc>> {
        self.merged_at
    }

    /// Branch the pull request merges into.
    #[must_use]
    pub const fn base_branch(&self) -> &str {
        self.base_branch.as_str()
    }

    /// Branch holding the proposed changes.
    #[must_use]
    pub const fn head_branch(&self) -> &str {
        self.head_branch.as_str()
    }

    /// Pull request description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Label names in server order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Issue numbers the description declares as closed, in first-mention
    /// order.
    #[must_use]
    pub fn linked_issues(&self) -> &[u64] {
        &self.linked_issues
    }

    /// Commit the checks were collected for.
    #[must_use]
    pub const fn merge_commit_sha(&self) -> &CommitSha {
        &self.merge_commit_sha
    }

    /// Everyone who authored, merged, committed, commented, or reviewed,
    /// without duplicates.
    #[must_use]
    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    /// Commits in server order.
    #[must_use]
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Changed files in server order.
    #[must_use]
    pub fn file_changes(&self) -> &[FileChange] {
        &self.file_changes
    }

    /// Conversation and inline comments ordered by creation time.
    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Reviews in server order.
    #[must_use]
    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// Check runs and commit statuses, deduplicated by name.
    #[must_use]
    pub fn check_runs(&self) -> &[CheckRun] {
        &self.check_runs
    }

    /// Sum of added lines across every file.
    #[must_use]
    pub const fn total_additions(&self) -> u64 {
        self.total_additions
    }

    /// Sum of deleted lines across every file.
    #[must_use]
    pub const fn total_deletions(&self) -> u64 {
        self.total_deletions
    }

    /// Number of files changed.
    #[must_use]
    pub const fn files_changed(&self) -> usize {
        self.file_changes.len()
    }

    /// Conversation comments only.
    pub fn conversation_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|comment| !comment.is_inline())
    }

    /// Inline review comments only.
    pub fn inline_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|comment| comment.is_inline())
    }

    /// Number of reviews in each state.
    #[must_use]
    pub fn review_counts(&self) -> HashMap<ReviewState, usize> {
        let mut counts = HashMap::new();
        for review in &self.reviews {
            *counts.entry(review.state).or_insert(0_usize) += 1;
        }
        counts
    }

    /// Number of checks with each conclusion.
    #[must_use]
    pub fn check_counts(&self) -> HashMap<CheckConclusion, usize> {
        let mut counts = HashMap::new();
        for check in &self.check_runs {
            *counts.entry(check.conclusion).or_insert(0_usize) += 1;
        }
        counts
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
