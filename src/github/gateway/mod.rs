//! Gateways for loading pull request activity.
//!
//! [`PullRequestGateway`] is the seam between the collector and GitHub so
//! the collector can be tested with a mock. [`HttpGateway`] implements it on
//! top of the [`TransportClient`], paginating every list endpoint to
//! completion and mapping each item into a snapshot record.

mod error_mapping;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use self::error_mapping::map_transport_error;
use crate::github::error::{IntakeError, Resource};
use crate::github::locator::{CommitSha, PullRequestLocator};
use crate::github::models::PullRequestMetadata;
use crate::github::models::mapping::{
    map_check_run, map_combined_status, map_commit, map_file, map_issue_comment,
    map_pull_request, map_review, map_review_comment,
};
use crate::github::transport::TransportClient;
use crate::snapshot::{CheckRun, Comment, Commit, FileChange, Review};

/// Gateway that can load every resource a snapshot is built from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestGateway: Send + Sync {
    /// Fetch the pull request metadata.
    async fn pull_request(
        &self,
        locator: &PullRequestLocator,
    ) -> Result<PullRequestMetadata, IntakeError>;

    /// Fetch every commit on the pull request.
    async fn commits(&self, locator: &PullRequestLocator) -> Result<Vec<Commit>, IntakeError>;

    /// Fetch every changed file.
    async fn files(&self, locator: &PullRequestLocator) -> Result<Vec<FileChange>, IntakeError>;

    /// Fetch every conversation comment.
    async fn issue_comments(
        &self,
        locator: &PullRequestLocator,
    ) -> Result<Vec<Comment>, IntakeError>;

    /// Fetch every inline review comment.
    async fn review_comments(
        &self,
        locator: &PullRequestLocator,
    ) -> Result<Vec<Comment>, IntakeError>;

    /// Fetch every review.
    async fn reviews(&self, locator: &PullRequestLocator) -> Result<Vec<Review>, IntakeError>;

    /// Fetch every check run reported for `sha`.
    async fn check_runs(
        &self,
        locator: &PullRequestLocator,
        sha: &CommitSha,
    ) -> Result<Vec<CheckRun>, IntakeError>;

    /// Fetch the legacy commit statuses reported for `sha`.
    async fn commit_statuses(
        &self,
        locator: &PullRequestLocator,
        sha: &CommitSha,
    ) -> Result<Vec<CheckRun>, IntakeError>;
}

/// Gateway backed by the GitHub REST API.
#[derive(Debug)]
pub struct HttpGateway {
    client: TransportClient,
}

impl HttpGateway {
    /// Wraps an authenticated transport client.
    #[must_use]
    pub const fn new(client: TransportClient) -> Self {
        Self { client }
    }

    /// The underlying transport client.
    #[must_use]
    pub const fn client(&self) -> &TransportClient {
        &self.client
    }

    async fn fetch_list<T>(
        &self,
        resource: Resource,
        path: &str,
        items_field: Option<&'static str>,
        map: fn(Value) -> Result<T, IntakeError>,
    ) -> Result<Vec<T>, IntakeError> {
        debug!(%resource, path, "paginating");
        let pages = match items_field {
            Some(field) => self.client.paginate_field(path, &[], field),
            None => self.client.paginate(path, &[]),
        };
        let items = pages
            .try_collect()
            .await
            .map_err(|error| map_transport_error(resource, error))?;
        items.into_iter().map(map).collect()
    }
}

#[async_trait]
impl PullRequestGateway for HttpGateway {
    async fn pull_request(
        &self,
        locator: &PullRequestLocator,
    ) -> Result<PullRequestMetadata, IntakeError> {
        let body = self
            .client
            .request(http::Method::GET, &locator.pull_request_path(), &[])
            .await
            .map_err(|error| map_transport_error(Resource::PullRequest, error))?;
        map_pull_request(body)
    }

    async fn commits(&self, locator: &PullRequestLocator) -> Result<Vec<Commit>, IntakeError> {
        self.fetch_list(Resource::Commits, &locator.commits_path(), None, map_commit)
            .await
    }

    async fn files(&self, locator: &PullRequestLocator) -> Result<Vec<FileChange>, IntakeError> {
        self.fetch_list(Resource::Files, &locator.files_path(), None, map_file)
            .await
    }

    async fn issue_comments(
        &self,
        locator: &PullRequestLocator,
    ) -> Result<Vec<Comment>, IntakeError> {
        self.fetch_list(
            Resource::IssueComments,
            &locator.issue_comments_path(),
            None,
            map_issue_comment,
        )
        .await
    }

    async fn review_comments(
        &self,
        locator: &PullRequestLocator,
    ) -> Result<Vec<Comment>, IntakeError> {
        self.fetch_list(
            Resource::ReviewComments,
            &locator.review_comments_path(),
            None,
            map_review_comment,
        )
        .await
    }

    async fn reviews(&self, locator: &PullRequestLocator) -> Result<Vec<Review>, IntakeError> {
        self.fetch_list(Resource::Reviews, &locator.reviews_path(), None, map_review)
            .await
    }

    async fn check_runs(
        &self,
        locator: &PullRequestLocator,
        sha: &CommitSha,
    ) -> Result<Vec<CheckRun>, IntakeError> {
        self.fetch_list(
            Resource::CheckRuns,
            &locator.check_runs_path(sha),
            Some("check_runs"),
            map_check_run,
        )
        .await
    }

    async fn commit_statuses(
        &self,
        locator: &PullRequestLocator,
        sha: &CommitSha,
    ) -> Result<Vec<CheckRun>, IntakeError> {
        let body = self
            .client
            .request(http::Method::GET, &locator.combined_status_path(sha), &[])
            .await
            .map_err(|error| map_transport_error(Resource::CombinedStatus, error))?;
        map_combined_status(body)
    }
}
