//! Total conversion from wire payloads into snapshot records.
//!
//! Every function either produces a fully populated record or fails with
//! [`IntakeError::MalformedResponse`] naming the offending field.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    ApiCheckRun, ApiCombinedStatus, ApiCommit, ApiFile, ApiIssueComment, ApiPullRequest,
    ApiReview, ApiReviewComment, ApiUser, PullRequestMetadata,
};
use crate::github::error::{IntakeError, Resource};
use crate::github::locator::CommitSha;
use crate::snapshot::{
    ChangeKind, CheckConclusion, CheckRun, CheckSource, Comment, CommentKind, Commit, FileChange,
    PullRequestState, Review, ReviewState,
};

fn malformed(resource: Resource, field: &str, message: impl Into<String>) -> IntakeError {
    IntakeError::MalformedResponse {
        resource,
        field: field.to_owned(),
        message: message.into(),
    }
}

fn decode<T: DeserializeOwned>(resource: Resource, value: Value) -> Result<T, IntakeError> {
    serde_json::from_value(value)
        .map_err(|error| malformed(resource, "<payload>", format!("could not be decoded: {error}")))
}

fn required<T>(resource: Resource, field: &str, value: Option<T>) -> Result<T, IntakeError> {
    value.ok_or_else(|| malformed(resource, field, "is missing"))
}

fn required_text(
    resource: Resource,
    field: &str,
    value: Option<String>,
) -> Result<String, IntakeError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(malformed(resource, field, "is empty")),
        None => Err(malformed(resource, field, "is missing")),
    }
}

fn login(resource: Resource, field: &str, user: Option<ApiUser>) -> Result<String, IntakeError> {
    required_text(resource, field, user.and_then(|account| account.login))
}

fn parse_timestamp(resource: Resource, field: &str, raw: &str) -> Result<DateTime<Utc>, IntakeError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| malformed(resource, field, format!("is not an RFC 3339 timestamp: {error}")))
}

fn timestamp(
    resource: Resource,
    field: &str,
    raw: Option<String>,
) -> Result<DateTime<Utc>, IntakeError> {
    let value = required(resource, field, raw)?;
    parse_timestamp(resource, field, &value)
}

fn optional_timestamp(
    resource: Resource,
    field: &str,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, IntakeError> {
    raw.map(|value| parse_timestamp(resource, field, &value))
        .transpose()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

pub(crate) fn map_pull_request(value: Value) -> Result<PullRequestMetadata, IntakeError> {
    const RESOURCE: Resource = Resource::PullRequest;
    let api: ApiPullRequest = decode(RESOURCE, value)?;

    let merged_at = optional_timestamp(RESOURCE, "merged_at", api.merged_at)?;
    let merged = api.merged.unwrap_or(merged_at.is_some());
    let raw_state = required(RESOURCE, "state", api.state)?;
    let state = PullRequestState::from_api(&raw_state, merged)
        .ok_or_else(|| malformed(RESOURCE, "state", format!("has unknown value `{raw_state}`")))?;
    let merge_commit_sha = match api.merge_commit_sha {
        Some(raw) => Some(CommitSha::parse(&raw).ok_or_else(|| {
            malformed(RESOURCE, "merge_commit_sha", "is not a 40-character hexadecimal SHA")
        })?),
        None => None,
    };
    let labels = api
        .labels
        .unwrap_or_default()
        .into_iter()
        .map(|label| required_text(RESOURCE, "labels[].name", label.name))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PullRequestMetadata {
        number: required(RESOURCE, "number", api.number)?,
        title: required(RESOURCE, "title", api.title)?,
        state,
        html_url: required_text(RESOURCE, "html_url", api.html_url)?,
        author: login(RESOURCE, "user.login", api.user)?,
        merged_by: match api.merged_by {
            Some(user) => Some(login(RESOURCE, "merged_by.login", Some(user))?),
            None => None,
        },
        created_at: timestamp(RESOURCE, "created_at", api.created_at)?,
        merged_at,
        base_branch: required_text(RESOURCE, "base.ref", api.base.and_then(|b| b.ref_name))?,
        head_branch: required_text(RESOURCE, "head.ref", api.head.and_then(|h| h.ref_name))?,
        body: non_blank(api.body),
        labels,
        merge_commit_sha,
    })
}

pub(crate) fn map_commit(value: Value) -> Result<Commit, IntakeError> {
    const RESOURCE: Resource = Resource::Commits;
    let api: ApiCommit = decode(RESOURCE, value)?;

    let raw_sha = required(RESOURCE, "sha", api.sha)?;
    let sha = CommitSha::parse(&raw_sha)
        .ok_or_else(|| malformed(RESOURCE, "sha", "is not a 40-character hexadecimal SHA"))?;
    let detail = required(RESOURCE, "commit", api.commit)?;
    let author = required(RESOURCE, "commit.author", detail.author)?;

    Ok(Commit {
        sha,
        message: required(RESOURCE, "commit.message", detail.message)?,
        author: required_text(RESOURCE, "commit.author.name", author.name)?,
        author_email: non_blank(author.email),
        authored_at: timestamp(RESOURCE, "commit.author.date", author.date)?,
        html_url: api.html_url,
    })
}

pub(crate) fn map_file(value: Value) -> Result<FileChange, IntakeError> {
    const RESOURCE: Resource = Resource::Files;
    let api: ApiFile = decode(RESOURCE, value)?;

    let status = required(RESOURCE, "status", api.status)?;
    let kind = ChangeKind::from_api(&status)
        .ok_or_else(|| malformed(RESOURCE, "status", format!("has unknown value `{status}`")))?;

    Ok(FileChange {
        path: required_text(RESOURCE, "filename", api.filename)?,
        kind,
        additions: required(RESOURCE, "additions", api.additions)?,
        deletions: required(RESOURCE, "deletions", api.deletions)?,
        previous_path: non_blank(api.previous_filename),
    })
}

pub(crate) fn map_issue_comment(value: Value) -> Result<Comment, IntakeError> {
    const RESOURCE: Resource = Resource::IssueComments;
    let api: ApiIssueComment = decode(RESOURCE, value)?;

    Ok(Comment {
        id: required(RESOURCE, "id", api.id)?,
        author: login(RESOURCE, "user.login", api.user)?,
        body: api.body.unwrap_or_default(),
        created_at: timestamp(RESOURCE, "created_at", api.created_at)?,
        html_url: api.html_url,
        kind: CommentKind::Conversation,
    })
}

pub(crate) fn map_review_comment(value: Value) -> Result<Comment, IntakeError> {
    const RESOURCE: Resource = Resource::ReviewComments;
    let api: ApiReviewComment = decode(RESOURCE, value)?;

    Ok(Comment {
        id: required(RESOURCE, "id", api.id)?,
        author: login(RESOURCE, "user.login", api.user)?,
        body: api.body.unwrap_or_default(),
        created_at: timestamp(RESOURCE, "created_at", api.created_at)?,
        html_url: api.html_url,
        kind: CommentKind::InlineReview {
            path: required_text(RESOURCE, "path", api.path)?,
            line: api.line.or(api.original_line),
            in_reply_to: api.in_reply_to_id,
        },
    })
}

pub(crate) fn map_review(value: Value) -> Result<Review, IntakeError> {
    const RESOURCE: Resource = Resource::Reviews;
    let api: ApiReview = decode(RESOURCE, value)?;

    let raw_state = required(RESOURCE, "state", api.state)?;
    let state = ReviewState::from_api(&raw_state)
        .ok_or_else(|| malformed(RESOURCE, "state", format!("has unknown value `{raw_state}`")))?;

    Ok(Review {
        id: required(RESOURCE, "id", api.id)?,
        author: login(RESOURCE, "user.login", api.user)?,
        state,
        submitted_at: optional_timestamp(RESOURCE, "submitted_at", api.submitted_at)?,
        body: non_blank(api.body),
    })
}

pub(crate) fn map_check_run(value: Value) -> Result<CheckRun, IntakeError> {
    const RESOURCE: Resource = Resource::CheckRuns;
    let api: ApiCheckRun = decode(RESOURCE, value)?;

    let status = required(RESOURCE, "status", api.status)?;
    let started_at = optional_timestamp(RESOURCE, "started_at", api.started_at)?;
    let completed_at = optional_timestamp(RESOURCE, "completed_at", api.completed_at)?;
    let duration = match (started_at, completed_at) {
        (Some(start), Some(end)) => (end - start).to_std().ok(),
        _ => None,
    };

    Ok(CheckRun {
        name: required_text(RESOURCE, "name", api.name)?,
        conclusion: CheckConclusion::from_check_run(&status, api.conclusion.as_deref()),
        duration,
        source: CheckSource::CheckRun,
        app_name: non_blank(api.app.and_then(|app| app.name)),
        details_url: non_blank(api.details_url).or_else(|| non_blank(api.html_url)),
    })
}

pub(crate) fn map_combined_status(value: Value) -> Result<Vec<CheckRun>, IntakeError> {
    const RESOURCE: Resource = Resource::CombinedStatus;
    let api: ApiCombinedStatus = decode(RESOURCE, value)?;

    api.statuses
        .unwrap_or_default()
        .into_iter()
        .map(|status| {
            let state = required(RESOURCE, "statuses[].state", status.state)?;
            Ok(CheckRun {
                name: required_text(RESOURCE, "statuses[].context", status.context)?,
                conclusion: CheckConclusion::from_status_state(&state),
                duration: None,
                source: CheckSource::CommitStatus,
                app_name: None,
                details_url: non_blank(status.target_url),
            })
        })
        .collect()
}
