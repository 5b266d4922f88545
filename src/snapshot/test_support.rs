//! Builders for snapshots and their records in tests.

use chrono::{DateTime, Utc};

use super::{
    CheckConclusion, CheckRun, CheckSource, Comment, CommentKind, CommitSha, PullRequestState,
    Review, ReviewState, Snapshot, SnapshotParts,
};

/// SHA used by sample snapshots.
pub const SAMPLE_SHA: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678";

/// Parses an RFC 3339 timestamp, falling back to the Unix epoch.
#[must_use]
pub fn timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).map_or(DateTime::UNIX_EPOCH, |parsed| {
        parsed.with_timezone(&Utc)
    })
}

/// Builds a conversation comment.
#[must_use]
pub fn conversation_comment(id: u64, author: &str, created_at: &str) -> Comment {
    Comment {
        id,
        author: author.to_owned(),
        body: format!("comment {id}"),
        created_at: timestamp(created_at),
        html_url: None,
        kind: CommentKind::Conversation,
    }
}

/// Builds an inline review comment.
#[must_use]
pub fn inline_comment(
    id: u64,
    author: &str,
    created_at: &str,
    path: &str,
    line: Option<u32>,
) -> Comment {
    Comment {
        kind: CommentKind::InlineReview {
            path: path.to_owned(),
            line,
            in_reply_to: None,
        },
        ..conversation_comment(id, author, created_at)
    }
}

/// Builds a submitted review.
#[must_use]
pub fn review(id: u64, author: &str, state: ReviewState) -> Review {
    Review {
        id,
        author: author.to_owned(),
        state,
        submitted_at: Some(timestamp("2024-01-02T09:00:00Z")),
        body: None,
    }
}

/// Builds a check run result.
#[must_use]
pub fn check(name: &str, conclusion: CheckConclusion, source: CheckSource) -> CheckRun {
    CheckRun {
        name: name.to_owned(),
        conclusion,
        duration: None,
        source,
        app_name: None,
        details_url: None,
    }
}

pub(crate) fn sample_parts() -> SnapshotParts {
    SnapshotParts {
        number: 42,
        title: "Add widget support".to_owned(),
        state: PullRequestState::Merged,
        html_url: "https://github.com/octo/widgets/pull/42".to_owned(),
        author: "octocat".to_owned(),
        merged_by: Some("maintainer".to_owned()),
        created_at: timestamp("2024-01-01T08:00:00Z"),
        merged_at: Some(timestamp("2024-01-03T12:00:00Z")),
        base_branch: "main".to_owned(),
        head_branch: "feature/widgets".to_owned(),
        description: Some("Adds widgets.\n\nFixes #12".to_owned()),
        labels: vec!["enhancement".to_owned()],
        linked_issues: vec![12],
        merge_commit_sha: CommitSha::from_hex_unchecked(SAMPLE_SHA),
        participants: vec!["octocat".to_owned(), "maintainer".to_owned()],
        commits: Vec::new(),
        file_changes: Vec::new(),
        comments: Vec::new(),
        reviews: Vec::new(),
        check_runs: Vec::new(),
    }
}

/// A merged sample snapshot with no activity records.
#[must_use]
pub fn sample_snapshot() -> Snapshot {
    Snapshot::from_parts(sample_parts())
}
