//! Tests for the Markdown summary formatter.

#![expect(
    clippy::panic_in_result_fn,
    reason = "Test assertions are expected to panic on failure"
)]

use std::io::{self, Write};
use std::time::Duration;

use rstest::rstest;

use super::*;
use crate::snapshot::test_support::{
    check, conversation_comment, inline_comment, review, sample_parts, sample_snapshot,
    timestamp,
};
use crate::snapshot::{CheckConclusion, CheckSource, Commit, CommitSha, SnapshotParts};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn render(snapshot: &Snapshot, options: &RenderOptions) -> Result<String, Box<dyn std::error::Error>> {
    let mut buffer = Vec::new();
    write_summary(&mut buffer, snapshot, options)?;
    Ok(String::from_utf8(buffer)?)
}

fn render_parts(parts: SnapshotParts) -> Result<String, Box<dyn std::error::Error>> {
    render(&Snapshot::from_parts(parts), &RenderOptions::default())
}

fn assert_contains(haystack: &str, needle: &str) -> Result<(), String> {
    if haystack.contains(needle) {
        Ok(())
    } else {
        Err(format!(
            "expected output to contain '{needle}', got:\n{haystack}"
        ))
    }
}

fn assert_not_contains(haystack: &str, needle: &str) -> Result<(), String> {
    if haystack.contains(needle) {
        Err(format!(
            "expected output to NOT contain '{needle}', got:\n{haystack}"
        ))
    } else {
        Ok(())
    }
}

fn commit(message: &str) -> Result<Commit, IntakeError> {
    Ok(Commit {
        sha: CommitSha::new("abcdef0123456789abcdef0123456789abcdef01")?,
        message: message.to_owned(),
        author: "Octo Cat".to_owned(),
        author_email: None,
        authored_at: timestamp("2024-01-01T09:00:00Z"),
        html_url: None,
    })
}

#[rstest]
fn writes_header_and_metadata() -> TestResult {
    let output = render(&sample_snapshot(), &RenderOptions::default())?;

    assert!(output.starts_with("# 🟣 PR #42: Add widget support\n"));
    assert_contains(&output, "- **Author:** @octocat")?;
    assert_contains(&output, "- **Base:** `main` ← **Head:** `feature/widgets`")?;
    assert_contains(&output, "- **Created:** 2024-01-01 08:00:00 UTC")?;
    assert_contains(&output, "- **Merged:** 2024-01-03 12:00:00 UTC by @maintainer")?;
    assert_contains(&output, "- **Labels:** `enhancement`")?;
    assert_contains(&output, "- **Linked Issues:** #12")?;
    assert_contains(&output, "- **Participants:** @octocat, @maintainer")?;
    assert_contains(&output, "## Description\n\nAdds widgets.\n\nFixes #12")?;
    Ok(())
}

#[rstest]
fn omits_empty_sections() -> TestResult {
    let output = render(&sample_snapshot(), &RenderOptions::default())?;

    for heading in ["## Commits", "## File Changes", "## Reviews", "## Discussion", "## Checks"] {
        assert_not_contains(&output, heading)?;
    }
    assert_contains(
        &output,
        "*Summary for PR #42 at a1b2c3d: 0 commits, 0 comments, 0 reviews, 0 checks, 0 files changed*",
    )?;
    Ok(())
}

#[rstest]
fn truncates_long_commit_summaries() -> TestResult {
    let long = "x".repeat(100);
    let mut parts = sample_parts();
    parts.commits = vec![commit(&format!("{long}\n\nbody text"))?];

    let output = render_parts(parts)?;

    let expected = format!("- `abcdef0` {}... - Octo Cat", "x".repeat(77));
    assert_contains(&output, &expected)?;
    assert_not_contains(&output, "body text")?;
    Ok(())
}

#[rstest]
fn groups_files_by_kind_with_totals() -> TestResult {
    let mut parts = sample_parts();
    parts.file_changes = vec![
        FileChange {
            path: "src/new.rs".to_owned(),
            kind: ChangeKind::Added,
            additions: 10,
            deletions: 0,
            previous_path: None,
        },
        FileChange {
            path: "src/lib.rs".to_owned(),
            kind: ChangeKind::Modified,
            additions: 3,
            deletions: 2,
            previous_path: None,
        },
        FileChange {
            path: "src/moved.rs".to_owned(),
            kind: ChangeKind::Renamed,
            additions: 0,
            deletions: 0,
            previous_path: Some("src/old.rs".to_owned()),
        },
    ];

    let output = render_parts(parts)?;

    assert_contains(&output, "## File Changes (3)")?;
    assert_contains(&output, "**Total changes:** +13 -2")?;
    assert_contains(&output, "### Added (1)\n\n- `src/new.rs` (+10)")?;
    assert_contains(&output, "### Modified (1)\n\n- `src/lib.rs` (+3 -2)")?;
    assert_contains(&output, "- `src/old.rs` → `src/moved.rs` (+0 -0)")?;
    Ok(())
}

#[rstest]
fn groups_reviews_by_state() -> TestResult {
    let mut parts = sample_parts();
    let mut approved = review(1, "alice", ReviewState::Approved);
    approved.body = Some("Looks\n\ngood".to_owned());
    parts.reviews = vec![
        review(2, "bob", ReviewState::ChangesRequested),
        approved,
    ];

    let output = render_parts(parts)?;

    assert_contains(&output, "## Reviews (2)")?;
    assert_contains(&output, "### Approved (1)\n\n- @alice (2024-01-02 09:00:00 UTC)\n  > Looks good")?;
    assert_contains(&output, "### Changes requested (1)\n\n- @bob")?;
    let approved_at = output.find("### Approved").ok_or("missing approved")?;
    let changes_at = output.find("### Changes requested").ok_or("missing changes")?;
    assert!(approved_at < changes_at, "approved reviews should come first");
    Ok(())
}

#[rstest]
fn renders_discussion_with_locations() -> TestResult {
    let mut parts = sample_parts();
    parts.comments = vec![
        conversation_comment(1, "alice", "2024-01-01T10:00:00Z"),
        inline_comment(2, "bob", "2024-01-01T11:00:00Z", "src/lib.rs", Some(7)),
        inline_comment(3, "carol", "2024-01-01T12:00:00Z", "README.md", None),
    ];

    let output = render_parts(parts)?;

    assert_contains(&output, "## Discussion (3 comments)")?;
    assert_contains(&output, "### Conversation (1)\n\n**@alice** (2024-01-01 10:00:00 UTC)\n> comment 1")?;
    assert_contains(&output, "### Code Review Comments (2)")?;
    assert_contains(&output, "**@bob** on `src/lib.rs:7` (2024-01-01 11:00:00 UTC)")?;
    assert_contains(&output, "**@carol** on `README.md` (")?;
    Ok(())
}

#[rstest]
#[case::collapses_whitespace("a  b\n\tc", 500, "> a b c")]
#[case::truncates_with_ellipsis("abcdefghij", 8, "> abcde...")]
#[case::keeps_exact_length("abcdefgh", 8, "> abcdefgh\n")]
fn condenses_comment_bodies(
    #[case] body: &str,
    #[case] max_comment_length: usize,
    #[case] expected: &str,
) -> TestResult {
    let mut parts = sample_parts();
    let mut comment = conversation_comment(1, "alice", "2024-01-01T10:00:00Z");
    comment.body = body.to_owned();
    parts.comments = vec![comment];

    let output = render(
        &Snapshot::from_parts(parts),
        &RenderOptions { max_comment_length },
    )?;

    assert_contains(&output, expected)?;
    Ok(())
}

#[rstest]
fn groups_checks_by_outcome_with_durations() -> TestResult {
    let mut parts = sample_parts();
    let mut build = check("build", CheckConclusion::Success, CheckSource::CheckRun);
    build.duration = Some(Duration::from_millis(12_500));
    build.app_name = Some("GitHub Actions".to_owned());
    build.details_url = Some("https://ci.example/build".to_owned());
    parts.check_runs = vec![
        build,
        check("lint", CheckConclusion::TimedOut, CheckSource::CheckRun),
        check("ci/legacy", CheckConclusion::Pending, CheckSource::CommitStatus),
    ];

    let output = render_parts(parts)?;

    assert_contains(&output, "## Checks (3)")?;
    assert_contains(
        &output,
        "### Successful (1)\n\n- success [build](https://ci.example/build) [GitHub Actions] (12.5s)",
    )?;
    assert_contains(&output, "### Failed (1)\n\n- timed_out lint")?;
    assert_contains(&output, "### Other (1)\n\n- pending ci/legacy")?;
    Ok(())
}

#[rstest]
fn rendering_is_deterministic() -> TestResult {
    let mut parts = sample_parts();
    parts.comments = vec![conversation_comment(1, "alice", "2024-01-01T10:00:00Z")];
    parts.reviews = vec![review(1, "bob", ReviewState::Commented)];
    let snapshot = Snapshot::from_parts(parts);

    let first = render(&snapshot, &RenderOptions::default())?;
    let second = render(&snapshot, &RenderOptions::default())?;

    assert_eq!(first, second);
    Ok(())
}

struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[rstest]
fn write_failures_become_io_errors() {
    let result = write_summary(
        &mut FailingWriter,
        &sample_snapshot(),
        &RenderOptions::default(),
    );

    assert!(
        matches!(result, Err(IntakeError::Io { .. })),
        "expected Io error, got {result:?}"
    );
}
