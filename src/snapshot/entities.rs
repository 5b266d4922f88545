//! Typed records that make up a pull request snapshot.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::github::locator::CommitSha;

/// Lifecycle state of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    /// Still open.
    Open,
    /// Closed without merging.
    Closed,
    /// Merged into the base branch.
    Merged,
}

impl PullRequestState {
    /// Derives the state from GitHub's `state` string and merge flag.
    #[must_use]
    pub fn from_api(state: &str, merged: bool) -> Option<Self> {
        match (state, merged) {
            (_, true) => Some(Self::Merged),
            ("open", false) => Some(Self::Open),
            ("closed", false) => Some(Self::Closed),
            _ => None,
        }
    }

    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
        }
    }
}

/// A commit on the pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    /// Full commit SHA.
    pub sha: CommitSha,
    /// Full commit message.
    pub message: String,
    /// Author name recorded in the commit.
    pub author: String,
    /// Author email recorded in the commit, when present.
    pub author_email: Option<String>,
    /// Author timestamp.
    pub authored_at: DateTime<Utc>,
    /// Link to the commit on GitHub.
    pub html_url: Option<String>,
}

impl Commit {
    /// First line of the commit message.
    #[must_use]
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// How a file was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Newly created file.
    Added,
    /// Existing file with edited content.
    Modified,
    /// Deleted file.
    Removed,
    /// File moved to a new path.
    Renamed,
    /// File copied from another path.
    Copied,
    /// Mode or type change without content edits.
    Changed,
    /// Listed but not changed.
    Unchanged,
}

impl ChangeKind {
    /// Every kind in display order.
    pub const ALL: [Self; 7] = [
        Self::Added,
        Self::Modified,
        Self::Removed,
        Self::Renamed,
        Self::Copied,
        Self::Changed,
        Self::Unchanged,
    ];

    /// Parses GitHub's file `status` value.
    #[must_use]
    pub fn from_api(status: &str) -> Option<Self> {
        match status {
            "added" => Some(Self::Added),
            "modified" => Some(Self::Modified),
            "removed" => Some(Self::Removed),
            "renamed" => Some(Self::Renamed),
            "copied" => Some(Self::Copied),
            "changed" => Some(Self::Changed),
            "unchanged" => Some(Self::Unchanged),
            _ => None,
        }
    }

    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        }
    }
}

/// A file touched by the pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    /// Path after the change.
    pub path: String,
    /// Kind of change.
    pub kind: ChangeKind,
    /// Lines added.
    pub additions: u64,
    /// Lines deleted.
    pub deletions: u64,
    /// Original path for renames and copies.
    pub previous_path: Option<String>,
}

/// Where a comment was posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommentKind {
    /// Top-level conversation comment.
    Conversation,
    /// Inline comment on the diff.
    InlineReview {
        /// File the comment is attached to.
        path: String,
        /// Line in the new file, absent on outdated comments.
        line: Option<u32>,
        /// Identifier of the comment this replies to.
        in_reply_to: Option<u64>,
    },
}

/// A comment on the pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    /// GitHub comment identifier.
    pub id: u64,
    /// Login of the author.
    pub author: String,
    /// Markdown body.
    pub body: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Link to the comment on GitHub.
    pub html_url: Option<String>,
    /// Conversation or inline placement.
    pub kind: CommentKind,
}

impl Comment {
    /// Returns true for inline review comments.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        matches!(self.kind, CommentKind::InlineReview { .. })
    }
}

/// Verdict of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Approved the changes.
    Approved,
    /// Requested changes.
    ChangesRequested,
    /// Left comments without a verdict.
    Commented,
    /// An earlier review was dismissed.
    Dismissed,
    /// Started but not yet submitted.
    Pending,
}

impl ReviewState {
    /// Every state in display order.
    pub const ALL: [Self; 5] = [
        Self::Approved,
        Self::ChangesRequested,
        Self::Commented,
        Self::Dismissed,
        Self::Pending,
    ];

    /// Parses GitHub's upper-case review `state`.
    #[must_use]
    pub fn from_api(state: &str) -> Option<Self> {
        match state {
            "APPROVED" => Some(Self::Approved),
            "CHANGES_REQUESTED" => Some(Self::ChangesRequested),
            "COMMENTED" => Some(Self::Commented),
            "DISMISSED" => Some(Self::Dismissed),
            "PENDING" => Some(Self::Pending),
            _ => None,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approved => "Approved",
            Self::ChangesRequested => "Changes requested",
            Self::Commented => "Commented",
            Self::Dismissed => "Dismissed",
            Self::Pending => "Pending",
        }
    }
}

/// A review on the pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    /// GitHub review identifier.
    pub id: u64,
    /// Login of the reviewer.
    pub author: String,
    /// Review verdict.
    pub state: ReviewState,
    /// Submission timestamp; pending reviews have none.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Review summary body, when one was written.
    pub body: Option<String>,
}

/// Outcome of a check run or commit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    /// Passed.
    Success,
    /// Failed or errored.
    Failure,
    /// Finished without a pass or fail verdict.
    Neutral,
    /// Cancelled before finishing.
    Cancelled,
    /// Skipped.
    Skipped,
    /// Exceeded its time limit.
    TimedOut,
    /// Needs manual action.
    ActionRequired,
    /// Superseded by a newer run.
    Stale,
    /// Queued or still running.
    Pending,
    /// A conclusion this crate does not recognise.
    Other,
}

impl CheckConclusion {
    /// Maps a check run's `status` and `conclusion` fields.
    #[must_use]
    pub fn from_check_run(status: &str, conclusion: Option<&str>) -> Self {
        if status != "completed" {
            return Self::Pending;
        }
        match conclusion {
            Some("success") => Self::Success,
            Some("failure") => Self::Failure,
            Some("neutral") => Self::Neutral,
            Some("cancelled") => Self::Cancelled,
            Some("skipped") => Self::Skipped,
            Some("timed_out") => Self::TimedOut,
            Some("action_required") => Self::ActionRequired,
            Some("stale") => Self::Stale,
            None => Self::Pending,
            Some(_) => Self::Other,
        }
    }

    /// Maps a commit status `state`.
    #[must_use]
    pub fn from_status_state(state: &str) -> Self {
        match state {
            "success" => Self::Success,
            "failure" | "error" => Self::Failure,
            "pending" => Self::Pending,
            _ => Self::Other,
        }
    }

    /// Returns true for conclusions that count as passing.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true for conclusions that count as failing.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failure | Self::TimedOut | Self::ActionRequired)
    }

    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Neutral => "neutral",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
            Self::TimedOut => "timed_out",
            Self::ActionRequired => "action_required",
            Self::Stale => "stale",
            Self::Pending => "pending",
            Self::Other => "other",
        }
    }
}

/// Which API reported a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSource {
    /// The Checks API.
    CheckRun,
    /// The legacy commit status API.
    CommitStatus,
}

/// A check result for the merge commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRun {
    /// Check name, or status context.
    pub name: String,
    /// Outcome.
    pub conclusion: CheckConclusion,
    /// Wall-clock duration when both start and completion are known.
    pub duration: Option<Duration>,
    /// Reporting API.
    pub source: CheckSource,
    /// Name of the GitHub App that ran the check.
    pub app_name: Option<String>,
    /// Link to the check details.
    pub details_url: Option<String>,
}
