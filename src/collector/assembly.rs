//! Pure helpers that combine fetched records into snapshot fields.

use std::collections::HashSet;

use crate::github::models::PullRequestMetadata;
use crate::snapshot::{CheckRun, Comment, Commit, Review};

/// Combines check runs with commit statuses.
///
/// Entries are deduplicated by name in server order, check runs first, so
/// a repeated check run collapses to its first entry and a status only
/// fills a name no check run used.
pub(crate) fn merge_checks(check_runs: Vec<CheckRun>, statuses: Vec<CheckRun>) -> Vec<CheckRun> {
    let mut seen = HashSet::new();
    check_runs
        .into_iter()
        .chain(statuses)
        .filter(|check| seen.insert(check.name.clone()))
        .collect()
}

/// Interleaves conversation and inline comments by creation time.
///
/// The sort is stable, so comments with equal timestamps keep server order
/// with conversation comments ahead of inline ones.
pub(crate) fn merge_comments(conversation: Vec<Comment>, inline: Vec<Comment>) -> Vec<Comment> {
    let mut comments: Vec<Comment> = conversation.into_iter().chain(inline).collect();
    comments.sort_by_key(|comment| comment.created_at);
    comments
}

/// Everyone involved, deduplicated in order of first appearance.
pub(crate) fn collect_participants(
    metadata: &PullRequestMetadata,
    commits: &[Commit],
    comments: &[Comment],
    reviews: &[Review],
) -> Vec<String> {
    let candidates = std::iter::once(metadata.author.as_str())
        .chain(metadata.merged_by.as_deref())
        .chain(comments.iter().map(|comment| comment.author.as_str()))
        .chain(reviews.iter().map(|review| review.author.as_str()))
        .chain(commits.iter().map(|commit| commit.author.as_str()));

    let mut seen = HashSet::new();
    candidates
        .filter(|name| seen.insert(*name))
        .map(ToOwned::to_owned)
        .collect()
}
