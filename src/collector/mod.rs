//! All-or-nothing collection of a pull request snapshot.
//!
//! The collector validates its inputs, fetches metadata, then fetches the
//! independent resources concurrently on the current task. The first failure
//! cancels the remaining in-flight fetches and is returned unchanged; no
//! partial snapshot is ever produced.

mod assembly;
mod linked_issues;

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use self::assembly::{collect_participants, merge_checks, merge_comments};
pub use self::linked_issues::extract_linked_issues;
use crate::github::error::{IntakeError, Resource};
use crate::github::gateway::PullRequestGateway;
use crate::github::locator::{CommitSha, PullRequestLocator};
use crate::github::models::PullRequestMetadata;
use crate::snapshot::{Snapshot, SnapshotParts};
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// Builds [`Snapshot`]s through a [`PullRequestGateway`].
pub struct ActivityCollector<'a, G: PullRequestGateway> {
    gateway: &'a G,
    telemetry: &'a dyn TelemetrySink,
    timeout: Option<Duration>,
}

impl<'a, G: PullRequestGateway> ActivityCollector<'a, G> {
    /// Creates a collector without an overall time limit.
    #[must_use]
    pub const fn new(gateway: &'a G, telemetry: &'a dyn TelemetrySink) -> Self {
        Self {
            gateway,
            telemetry,
            timeout: None,
        }
    }

    /// Bounds the whole collection by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Collects a snapshot for `owner/repo#number`.
    ///
    /// When `merge_commit_sha` is given it selects the commit whose checks
    /// are collected; otherwise the pull request must be merged and GitHub's
    /// merge commit is used.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Validation`] for malformed identifiers or an
    /// unusable merge SHA (before any request is made),
    /// [`IntakeError::Timeout`] when the time limit elapses, or the first
    /// error any fetch reports.
    pub async fn collect(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        merge_commit_sha: Option<&str>,
    ) -> Result<Snapshot, IntakeError> {
        let locator = PullRequestLocator::new(owner, repo, number)?;
        let requested_sha = merge_commit_sha.map(CommitSha::new).transpose()?;

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.collect_for(&locator, requested_sha))
                .await
                .map_err(|_elapsed| IntakeError::Timeout {
                    seconds: limit.as_secs(),
                })?,
            None => self.collect_for(&locator, requested_sha).await,
        }
    }

    /// Collects a snapshot for an already validated locator.
    ///
    /// # Errors
    ///
    /// Returns the first error any fetch reports, or
    /// [`IntakeError::Validation`] when no merge SHA can be determined.
    pub async fn collect_for(
        &self,
        locator: &PullRequestLocator,
        requested_sha: Option<CommitSha>,
    ) -> Result<Snapshot, IntakeError> {
        info!(pull_request = %locator, "collecting pull request activity");

        let metadata = self
            .track(Resource::PullRequest, self.gateway.pull_request(locator), |_| 1)
            .await?;
        if metadata.number != locator.number().get() {
            return Err(IntakeError::MalformedResponse {
                resource: Resource::PullRequest,
                field: "number".to_owned(),
                message: format!(
                    "is {} but #{} was requested",
                    metadata.number,
                    locator.number().get()
                ),
            });
        }
        let merge_sha = resolve_merge_sha(&metadata, requested_sha)?;
        debug!(sha = %merge_sha, "resolved commit for checks");

        let (commits, file_changes, issue_comments, review_comments, reviews) = tokio::try_join!(
            self.track(Resource::Commits, self.gateway.commits(locator), Vec::len),
            self.track(Resource::Files, self.gateway.files(locator), Vec::len),
            self.track(
                Resource::IssueComments,
                self.gateway.issue_comments(locator),
                Vec::len
            ),
            self.track(
                Resource::ReviewComments,
                self.gateway.review_comments(locator),
                Vec::len
            ),
            self.track(Resource::Reviews, self.gateway.reviews(locator), Vec::len),
        )?;

        let (check_runs, statuses) = tokio::try_join!(
            self.track(
                Resource::CheckRuns,
                empty_when_missing(self.gateway.check_runs(locator, &merge_sha)),
                Vec::len
            ),
            self.track(
                Resource::CombinedStatus,
                empty_when_missing(self.gateway.commit_statuses(locator, &merge_sha)),
                Vec::len
            ),
        )?;

        let comments = merge_comments(issue_comments, review_comments);
        let participants = collect_participants(&metadata, &commits, &comments, &reviews);
        let linked_issues = metadata
            .body
            .as_deref()
            .map(extract_linked_issues)
            .unwrap_or_default();

        let snapshot = Snapshot::from_parts(SnapshotParts {
            number: metadata.number,
            title: metadata.title,
            state: metadata.state,
            html_url: metadata.html_url,
            author: metadata.author,
            merged_by: metadata.merged_by,
            created_at: metadata.created_at,
            merged_at: metadata.merged_at,
            base_branch: metadata.base_branch,
            head_branch: metadata.head_branch,
            description: metadata.body,
            labels: metadata.labels,
            linked_issues,
            merge_commit_sha: merge_sha,
            participants,
            commits,
            file_changes,
            comments,
            reviews,
            check_runs: merge_checks(check_runs, statuses),
        });

        info!(
            pull_request = %locator,
            commits = snapshot.commits().len(),
            files = snapshot.files_changed(),
            comments = snapshot.comments().len(),
            reviews = snapshot.reviews().len(),
            checks = snapshot.check_runs().len(),
            "collected pull request snapshot"
        );
        Ok(snapshot)
    }

    async fn track<T, F>(
        &self,
        resource: Resource,
        fetch: F,
        count: fn(&T) -> usize,
    ) -> Result<T, IntakeError>
    where
        F: Future<Output = Result<T, IntakeError>>,
    {
        self.telemetry
            .record(TelemetryEvent::FetchStarted { resource });
        match fetch.await {
            Ok(value) => {
                let items = count(&value);
                debug!(%resource, items, "fetched");
                self.telemetry
                    .record(TelemetryEvent::FetchSucceeded { resource, items });
                Ok(value)
            }
            Err(error) => {
                warn!(%resource, %error, "fetch failed; aborting collection");
                self.telemetry.record(TelemetryEvent::FetchFailed {
                    resource,
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }
}

/// Treats a missing check resource as an empty list.
async fn empty_when_missing<T>(
    fetch: impl Future<Output = Result<Vec<T>, IntakeError>>,
) -> Result<Vec<T>, IntakeError> {
    match fetch.await {
        Err(IntakeError::NotFound { resource, .. }) => {
            debug!(%resource, "no checks reported for commit");
            Ok(Vec::new())
        }
        other => other,
    }
}

fn resolve_merge_sha(
    metadata: &PullRequestMetadata,
    requested: Option<CommitSha>,
) -> Result<CommitSha, IntakeError> {
    if let Some(sha) = requested {
        return Ok(sha);
    }
    if !metadata.is_merged() {
        return Err(IntakeError::Validation {
            message: format!(
                "pull request #{} is not merged; supply a merge commit SHA to collect checks",
                metadata.number
            ),
        });
    }
    metadata
        .merge_commit_sha
        .clone()
        .ok_or_else(|| IntakeError::Validation {
            message: format!(
                "pull request #{} is merged but GitHub reported no merge commit SHA",
                metadata.number
            ),
        })
}
