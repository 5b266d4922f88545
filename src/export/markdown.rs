//! Markdown formatter for pull request snapshots.
//!
//! Sections are written in a fixed order and empty sections are omitted:
//! header, metadata, description, commits, file changes, reviews,
//! discussion, checks, and a footer with counts.

use std::io::Write;

use chrono::{DateTime, Utc};

use crate::github::IntakeError;
use crate::snapshot::{
    ChangeKind, CheckRun, Comment, CommentKind, FileChange, PullRequestState, Review, ReviewState,
    Snapshot,
};

/// Longest commit summary shown before truncation.
const MAX_COMMIT_SUMMARY: usize = 80;
const ELLIPSIS: &str = "...";

/// Options controlling how a snapshot is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Characters kept from each comment or review body, including the
    /// trailing ellipsis when truncated.
    pub max_comment_length: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_comment_length: 500,
        }
    }
}

/// Writes the Markdown summary of `snapshot` to `writer`.
///
/// # Errors
///
/// Returns [`IntakeError::Io`] if writing to the output fails.
pub fn write_summary<W: Write>(
    writer: &mut W,
    snapshot: &Snapshot,
    options: &RenderOptions,
) -> Result<(), IntakeError> {
    write_header(writer, snapshot)?;
    write_metadata(writer, snapshot)?;
    write_description(writer, snapshot)?;
    write_commits(writer, snapshot)?;
    write_file_changes(writer, snapshot)?;
    write_reviews(writer, snapshot, options)?;
    write_discussion(writer, snapshot, options)?;
    write_checks(writer, snapshot)?;
    write_footer(writer, snapshot)
}

fn write_header<W: Write>(writer: &mut W, snapshot: &Snapshot) -> Result<(), IntakeError> {
    let marker = match snapshot.state() {
        PullRequestState::Merged => "🟣",
        PullRequestState::Closed => "🔴",
        PullRequestState::Open => "🟢",
    };
    writeln!(
        writer,
        "# {marker} PR #{}: {}",
        snapshot.number(),
        snapshot.title()
    )
    .map_err(|e| io_error(&e))?;
    Ok(())
}

fn write_metadata<W: Write>(writer: &mut W, snapshot: &Snapshot) -> Result<(), IntakeError> {
    section_heading(writer, "Metadata")?;
    writeln!(writer, "- **Author:** @{}", snapshot.author()).map_err(|e| io_error(&e))?;
    writeln!(
        writer,
        "- **Base:** `{}` ← **Head:** `{}`",
        snapshot.base_branch(),
        snapshot.head_branch()
    )
    .map_err(|e| io_error(&e))?;
    writeln!(
        writer,
        "- **Created:** {}",
        format_timestamp(snapshot.created_at())
    )
    .map_err(|e| io_error(&e))?;

    if let Some(merged_at) = snapshot.merged_at() {
        let merged_by = snapshot
            .merged_by()
            .map(|login| format!(" by @{login}"))
            .unwrap_or_default();
        writeln!(
            writer,
            "- **Merged:** {}{merged_by}",
            format_timestamp(merged_at)
        )
        .map_err(|e| io_error(&e))?;
    }
    if !snapshot.labels().is_empty() {
        let labels = join_mapped(snapshot.labels(), |label| format!("`{label}`"));
        writeln!(writer, "- **Labels:** {labels}").map_err(|e| io_error(&e))?;
    }
    if !snapshot.linked_issues().is_empty() {
        let issues = join_mapped(snapshot.linked_issues(), |issue| format!("#{issue}"));
        writeln!(writer, "- **Linked Issues:** {issues}").map_err(|e| io_error(&e))?;
    }
    let participants = join_mapped(snapshot.participants(), |login| format!("@{login}"));
    writeln!(writer, "- **Participants:** {participants}").map_err(|e| io_error(&e))?;
    writeln!(writer, "- **URL:** {}", snapshot.html_url()).map_err(|e| io_error(&e))?;
    Ok(())
}

fn write_description<W: Write>(writer: &mut W, snapshot: &Snapshot) -> Result<(), IntakeError> {
    let Some(description) = snapshot
        .description()
        .map(str::trim)
        .filter(|text| !text.is_empty())
    else {
        return Ok(());
    };
    section_heading(writer, "Description")?;
    writeln!(writer, "{description}").map_err(|e| io_error(&e))?;
    Ok(())
}

fn write_commits<W: Write>(writer: &mut W, snapshot: &Snapshot) -> Result<(), IntakeError> {
    let commits = snapshot.commits();
    if commits.is_empty() {
        return Ok(());
    }
    section_heading(writer, &format!("Commits ({})", commits.len()))?;
    for commit in commits {
        let sha = match &commit.html_url {
            Some(url) => format!("[`{}`]({url})", commit.sha.short()),
            None => format!("`{}`", commit.sha.short()),
        };
        let summary = truncate(commit.summary(), MAX_COMMIT_SUMMARY);
        writeln!(writer, "- {sha} {summary} - {}", commit.author).map_err(|e| io_error(&e))?;
    }
    Ok(())
}

fn write_file_changes<W: Write>(writer: &mut W, snapshot: &Snapshot) -> Result<(), IntakeError> {
    let files = snapshot.file_changes();
    if files.is_empty() {
        return Ok(());
    }
    section_heading(writer, &format!("File Changes ({})", snapshot.files_changed()))?;
    writeln!(
        writer,
        "**Total changes:** +{} -{}",
        snapshot.total_additions(),
        snapshot.total_deletions()
    )
    .map_err(|e| io_error(&e))?;

    for kind in ChangeKind::ALL {
        let group: Vec<&FileChange> = files.iter().filter(|file| file.kind == kind).collect();
        if group.is_empty() {
            continue;
        }
        subsection_heading(
            writer,
            &format!("{} ({})", capitalise(kind.as_str()), group.len()),
        )?;
        for file in group {
            writeln!(writer, "- {}", describe_file(file)).map_err(|e| io_error(&e))?;
        }
    }
    Ok(())
}

fn describe_file(file: &FileChange) -> String {
    match (file.kind, file.previous_path.as_deref()) {
        (ChangeKind::Renamed | ChangeKind::Copied, Some(previous)) => format!(
            "`{previous}` → `{}` (+{} -{})",
            file.path, file.additions, file.deletions
        ),
        (ChangeKind::Added, _) => format!("`{}` (+{})", file.path, file.additions),
        (ChangeKind::Removed, _) => format!("`{}` (-{})", file.path, file.deletions),
        _ => format!("`{}` (+{} -{})", file.path, file.additions, file.deletions),
    }
}

fn write_reviews<W: Write>(
    writer: &mut W,
    snapshot: &Snapshot,
    options: &RenderOptions,
) -> Result<(), IntakeError> {
    let reviews = snapshot.reviews();
    if reviews.is_empty() {
        return Ok(());
    }
    section_heading(writer, &format!("Reviews ({})", reviews.len()))?;

    for state in ReviewState::ALL {
        let group: Vec<&Review> = reviews.iter().filter(|r| r.state == state).collect();
        if group.is_empty() {
            continue;
        }
        subsection_heading(writer, &format!("{} ({})", state.label(), group.len()))?;
        for review in group {
            let submitted = review
                .submitted_at
                .map_or_else(|| "not submitted".to_owned(), format_timestamp);
            writeln!(writer, "- @{} ({submitted})", review.author).map_err(|e| io_error(&e))?;
            if let Some(body) = review.body.as_deref().filter(|b| !b.trim().is_empty()) {
                writeln!(writer, "  > {}", condense(body, options.max_comment_length))
                    .map_err(|e| io_error(&e))?;
            }
        }
    }
    Ok(())
}

fn write_discussion<W: Write>(
    writer: &mut W,
    snapshot: &Snapshot,
    options: &RenderOptions,
) -> Result<(), IntakeError> {
    let comments = snapshot.comments();
    if comments.is_empty() {
        return Ok(());
    }
    section_heading(writer, &format!("Discussion ({} comments)", comments.len()))?;

    let conversation: Vec<&Comment> = snapshot.conversation_comments().collect();
    if !conversation.is_empty() {
        subsection_heading(writer, &format!("Conversation ({})", conversation.len()))?;
        write_comments(writer, &conversation, options)?;
    }

    let inline: Vec<&Comment> = snapshot.inline_comments().collect();
    if !inline.is_empty() {
        subsection_heading(writer, &format!("Code Review Comments ({})", inline.len()))?;
        write_comments(writer, &inline, options)?;
    }
    Ok(())
}

fn write_comments<W: Write>(
    writer: &mut W,
    comments: &[&Comment],
    options: &RenderOptions,
) -> Result<(), IntakeError> {
    for (index, comment) in comments.iter().enumerate() {
        if index > 0 {
            writeln!(writer).map_err(|e| io_error(&e))?;
        }
        write_comment(writer, comment, options)?;
    }
    Ok(())
}

fn write_comment<W: Write>(
    writer: &mut W,
    comment: &Comment,
    options: &RenderOptions,
) -> Result<(), IntakeError> {
    let location = match &comment.kind {
        CommentKind::Conversation => String::new(),
        CommentKind::InlineReview {
            path,
            line: Some(line),
            ..
        } => format!(" on `{path}:{line}`"),
        CommentKind::InlineReview { path, line: None, .. } => format!(" on `{path}`"),
    };
    writeln!(
        writer,
        "**@{}**{location} ({})",
        comment.author,
        format_timestamp(comment.created_at)
    )
    .map_err(|e| io_error(&e))?;
    writeln!(
        writer,
        "> {}",
        condense(&comment.body, options.max_comment_length)
    )
    .map_err(|e| io_error(&e))?;
    Ok(())
}

fn write_checks<W: Write>(writer: &mut W, snapshot: &Snapshot) -> Result<(), IntakeError> {
    let checks = snapshot.check_runs();
    if checks.is_empty() {
        return Ok(());
    }
    section_heading(writer, &format!("Checks ({})", checks.len()))?;

    let (successful, rest): (Vec<&CheckRun>, Vec<&CheckRun>) = checks
        .iter()
        .partition(|check| check.conclusion.is_success());
    let (failed, other): (Vec<&CheckRun>, Vec<&CheckRun>) = rest
        .into_iter()
        .partition(|check| check.conclusion.is_failure());

    for (title, group) in [
        ("Successful", successful),
        ("Failed", failed),
        ("Other", other),
    ] {
        if group.is_empty() {
            continue;
        }
        subsection_heading(writer, &format!("{title} ({})", group.len()))?;
        for check in group {
            writeln!(writer, "- {}", describe_check(check)).map_err(|e| io_error(&e))?;
        }
    }
    Ok(())
}

fn describe_check(check: &CheckRun) -> String {
    let name = match &check.details_url {
        Some(url) => format!("[{}]({url})", check.name),
        None => check.name.clone(),
    };
    let app = check
        .app_name
        .as_deref()
        .map(|app| format!(" [{app}]"))
        .unwrap_or_default();
    let duration = check
        .duration
        .map(|d| format!(" ({:.1}s)", d.as_secs_f64()))
        .unwrap_or_default();
    format!("{} {name}{app}{duration}", check.conclusion.as_str())
}

fn write_footer<W: Write>(writer: &mut W, snapshot: &Snapshot) -> Result<(), IntakeError> {
    writeln!(writer).map_err(|e| io_error(&e))?;
    writeln!(writer, "---").map_err(|e| io_error(&e))?;
    writeln!(writer).map_err(|e| io_error(&e))?;
    writeln!(
        writer,
        "*Summary for PR #{} at {}: {} commits, {} comments, {} reviews, {} checks, \
         {} files changed*",
        snapshot.number(),
        snapshot.merge_commit_sha().short(),
        snapshot.commits().len(),
        snapshot.comments().len(),
        snapshot.reviews().len(),
        snapshot.check_runs().len(),
        snapshot.files_changed()
    )
    .map_err(|e| io_error(&e))?;
    Ok(())
}

fn section_heading<W: Write>(writer: &mut W, title: &str) -> Result<(), IntakeError> {
    writeln!(writer).map_err(|e| io_error(&e))?;
    writeln!(writer, "## {title}").map_err(|e| io_error(&e))?;
    writeln!(writer).map_err(|e| io_error(&e))?;
    Ok(())
}

fn subsection_heading<W: Write>(writer: &mut W, title: &str) -> Result<(), IntakeError> {
    writeln!(writer).map_err(|e| io_error(&e))?;
    writeln!(writer, "### {title}").map_err(|e| io_error(&e))?;
    writeln!(writer).map_err(|e| io_error(&e))?;
    Ok(())
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn join_mapped<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    items.iter().map(render).collect::<Vec<_>>().join(", ")
}

fn capitalise(label: &str) -> String {
    let mut chars = label.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Collapses whitespace runs to single spaces, then truncates.
fn condense(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&collapsed, max_chars)
}

/// Keeps at most `max_chars` characters, ending in `...` when shortened.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let kept: String = text
        .chars()
        .take(max_chars.saturating_sub(ELLIPSIS.len()))
        .collect();
    format!("{kept}{ELLIPSIS}")
}

/// Converts an I/O error to an [`IntakeError::Io`].
fn io_error(error: &std::io::Error) -> IntakeError {
    IntakeError::Io {
        message: error.to_string(),
    }
}

#[cfg(test)]
#[path = "markdown_tests.rs"]
mod tests;
