//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.prsnap.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PRSNAP_*`, plus the GitHub Actions
//!    variables `GITHUB_TOKEN` and `GITHUB_REPOSITORY` as fallbacks
//! 4. **Command-line arguments** – `--pr-number`/`-p`, `--token`/`-t`, etc.
//!
//! # Configuration File
//!
//! ```toml
//! repository = "octocat/hello-world"
//! pr_number = 42
//! notes_ref = "refs/notes/pr-summary"
//! max_retries = 5
//! collection_timeout_seconds = 600
//! ```

use std::env;
use std::time::Duration;

use camino::Utf8Path;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::export::RenderOptions;
use crate::github::backoff::BackoffPolicy;
use crate::github::error::IntakeError;
use crate::github::locator::PersonalAccessToken;
use crate::github::rate_limit::{DEFAULT_RATE_LIMIT_THRESHOLD, RateLimitPolicy};
use crate::github::transport::{
    ClientSettings, DEFAULT_API_BASE, DEFAULT_API_VERSION, DEFAULT_REQUEST_TIMEOUT, MAX_PER_PAGE,
};

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use ortho_config::OrthoConfig;
/// use prsnap::PrSnapConfig;
///
/// let config = PrSnapConfig::load().expect("failed to load configuration");
/// config.validate().expect("configuration should be consistent");
/// let (owner, repo) = config.repository_identity().expect("repository required");
/// let number = config.require_pr_number().expect("PR number required");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PRSNAP",
    discovery(
        dotfile_name = ".prsnap.toml",
        config_file_name = "prsnap.toml",
        app_name = "prsnap"
    )
)]
pub struct PrSnapConfig {
    /// Repository owner (e.g., "octocat").
    ///
    /// Can be provided via:
    /// - CLI: `--owner <OWNER>` or `-o <OWNER>`
    /// - Environment: `PRSNAP_OWNER`
    /// - Config file: `owner = "..."`
    #[ortho_config(cli_short = 'o')]
    pub owner: Option<String>,

    /// Repository name (e.g., "hello-world").
    ///
    /// Can be provided via:
    /// - CLI: `--repo <REPO>` or `-r <REPO>`
    /// - Environment: `PRSNAP_REPO`
    /// - Config file: `repo = "..."`
    #[ortho_config(cli_short = 'r')]
    pub repo: Option<String>,

    /// Combined `owner/repo` identifier.
    ///
    /// Used when `owner` and `repo` are not given. Falls back to the
    /// `GITHUB_REPOSITORY` variable set by GitHub Actions.
    #[ortho_config()]
    pub repository: Option<String>,

    /// Pull request number to summarise.
    ///
    /// Can be provided via:
    /// - CLI: `--pr-number <N>` or `-p <N>`
    /// - Environment: `PRSNAP_PR_NUMBER`
    /// - Config file: `pr_number = 42`
    #[ortho_config(cli_short = 'p')]
    pub pr_number: Option<u64>,

    /// Commit whose checks are collected and which receives the note.
    ///
    /// Defaults to the merge commit GitHub reports for a merged pull request.
    #[ortho_config(cli_short = 's')]
    pub merge_commit_sha: Option<String>,

    /// Personal access token for GitHub API authentication.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `PRSNAP_TOKEN` or `GITHUB_TOKEN`
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// REST API base URL; point at `https://host/api/v3` for GitHub
    /// Enterprise.
    #[ortho_config()]
    pub api_base: String,

    /// Value sent in the `X-GitHub-Api-Version` header.
    #[ortho_config()]
    pub api_version: String,

    /// Remaining-request count at or below which requests wait for the reset.
    #[ortho_config()]
    pub rate_limit_threshold: u32,

    /// Retries allowed after the first attempt of a request.
    #[ortho_config()]
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds.
    #[ortho_config()]
    pub backoff_base_ms: u64,

    /// Factor applied to the delay after each retry.
    #[ortho_config()]
    pub backoff_multiplier: u32,

    /// Upper bound on any retry delay, in milliseconds.
    #[ortho_config()]
    pub backoff_max_ms: u64,

    /// Timeout for a single HTTP request, in seconds.
    #[ortho_config()]
    pub request_timeout_seconds: u64,

    /// Optional limit on the whole collection, in seconds.
    #[ortho_config()]
    pub collection_timeout_seconds: Option<u64>,

    /// Items requested per page (1 to 100).
    #[ortho_config()]
    pub per_page: u8,

    /// Path of the local repository that stores notes.
    #[ortho_config()]
    pub repo_path: String,

    /// Notes reference the summary is written to.
    #[ortho_config()]
    pub notes_ref: String,

    /// Remote the notes reference is pushed to.
    #[ortho_config()]
    pub remote: String,

    /// Skips pushing the notes reference after writing the note.
    ///
    /// Can be provided via:
    /// - CLI: `--no-push`
    /// - Config file: `no_push = true`
    ///
    /// Note: Environment variable `PRSNAP_NO_PUSH` is not supported because
    /// `ortho_config` does not load boolean values from the environment.
    #[ortho_config()]
    pub no_push: bool,

    /// Characters of each comment body kept in the rendered summary.
    #[ortho_config()]
    pub max_comment_length: usize,

    /// Log filter used when `RUST_LOG` is unset.
    #[ortho_config()]
    pub log_level: String,

    /// Emits telemetry events as JSON lines on stderr.
    ///
    /// Can be provided via:
    /// - CLI: `--telemetry-jsonl`
    /// - Config file: `telemetry_jsonl = true`
    #[ortho_config()]
    pub telemetry_jsonl: bool,
}

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;
const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;
const DEFAULT_BACKOFF_MAX_MS: u64 = 60_000;
const DEFAULT_NOTES_REF: &str = "refs/notes/pr-summary";
const DEFAULT_REMOTE: &str = "origin";
const DEFAULT_MAX_COMMENT_LENGTH: usize = 500;
const DEFAULT_LOG_LEVEL: &str = "info";

impl Default for PrSnapConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            repository: None,
            pr_number: None,
            merge_commit_sha: None,
            token: None,
            api_base: DEFAULT_API_BASE.to_owned(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            rate_limit_threshold: DEFAULT_RATE_LIMIT_THRESHOLD,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            collection_timeout_seconds: None,
            per_page: MAX_PER_PAGE,
            repo_path: ".".to_owned(),
            notes_ref: DEFAULT_NOTES_REF.to_owned(),
            remote: DEFAULT_REMOTE.to_owned(),
            no_push: false,
            max_comment_length: DEFAULT_MAX_COMMENT_LENGTH,
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
            telemetry_jsonl: false,
        }
    }
}

impl PrSnapConfig {
    /// Resolves the token from configuration or the `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when no source provides a
    /// non-blank token.
    pub fn resolve_token(&self) -> Result<PersonalAccessToken, IntakeError> {
        let raw = self
            .token
            .clone()
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .ok_or_else(|| IntakeError::Configuration {
                message: "GitHub token is required (use --token, PRSNAP_TOKEN or GITHUB_TOKEN)"
                    .to_owned(),
            })?;
        PersonalAccessToken::new(raw)
    }

    /// Returns the pull request number or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when no number is configured.
    pub fn require_pr_number(&self) -> Result<u64, IntakeError> {
        self.pr_number.ok_or_else(|| IntakeError::Configuration {
            message: "pull request number is required (use --pr-number or -p)".to_owned(),
        })
    }

    /// Determines the repository from `owner`/`repo`, `repository`, or the
    /// `GITHUB_REPOSITORY` environment variable, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when no source names a
    /// repository, when only one of `owner` and `repo` is set, when a
    /// combined identifier is not `owner/repo`, or when `repository`
    /// disagrees with `owner`/`repo`.
    pub fn repository_identity(&self) -> Result<(String, String), IntakeError> {
        let combined = self
            .repository
            .as_deref()
            .map(parse_repository)
            .transpose()?;

        match (&self.owner, &self.repo) {
            (Some(owner), Some(repo)) => {
                if let Some((combined_owner, combined_repo)) = combined
                    && (combined_owner != *owner || combined_repo != *repo)
                {
                    return Err(IntakeError::Configuration {
                        message: format!(
                            "repository {combined_owner}/{combined_repo} conflicts with \
                             owner/repo {owner}/{repo}"
                        ),
                    });
                }
                Ok((owner.clone(), repo.clone()))
            }
            (Some(_), None) => Err(IntakeError::Configuration {
                message: "repository name is required alongside owner (use --repo or -r)"
                    .to_owned(),
            }),
            (None, Some(_)) => Err(IntakeError::Configuration {
                message: "repository owner is required alongside repo (use --owner or -o)"
                    .to_owned(),
            }),
            (None, None) => match combined {
                Some(identity) => Ok(identity),
                None => env::var("GITHUB_REPOSITORY")
                    .ok()
                    .as_deref()
                    .map(parse_repository)
                    .transpose()?
                    .ok_or_else(|| IntakeError::Configuration {
                        message: "repository is required (use --owner/--repo, --repository \
                                  or GITHUB_REPOSITORY)"
                            .to_owned(),
                    }),
            },
        }
    }

    /// Checks the configuration for values that cannot work together.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] describing the first
    /// inconsistency found.
    pub fn validate(&self) -> Result<(), IntakeError> {
        if self.backoff_multiplier == 0 {
            return Err(configuration("backoff_multiplier must be at least 1"));
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(configuration(
                "backoff_base_ms must not exceed backoff_max_ms",
            ));
        }
        if !(1..=MAX_PER_PAGE).contains(&self.per_page) {
            return Err(configuration("per_page must be between 1 and 100"));
        }
        if self.max_comment_length == 0 {
            return Err(configuration("max_comment_length must be at least 1"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(configuration("request_timeout_seconds must be at least 1"));
        }
        if self.collection_timeout_seconds == Some(0) {
            return Err(configuration(
                "collection_timeout_seconds must be at least 1 when set",
            ));
        }
        if self.notes_ref.trim().is_empty() {
            return Err(configuration("notes_ref must not be empty"));
        }
        parse_api_base(&self.api_base)?;
        if self.owner.is_some() && self.repo.is_some() && self.repository.is_some() {
            self.repository_identity()?;
        }
        Ok(())
    }

    /// Builds transport settings from the configured values.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when `api_base` is not a valid
    /// URL.
    pub fn client_settings(&self) -> Result<ClientSettings, IntakeError> {
        let mut settings = ClientSettings::for_base(parse_api_base(&self.api_base)?);
        settings.api_version.clone_from(&self.api_version);
        settings.per_page = self.per_page;
        settings.request_timeout = Duration::from_secs(self.request_timeout_seconds);
        settings.rate_limit = RateLimitPolicy::new(self.rate_limit_threshold);
        settings.backoff = BackoffPolicy::new(
            Duration::from_millis(self.backoff_base_ms),
            self.backoff_multiplier,
            Duration::from_millis(self.backoff_max_ms),
            self.max_retries,
        );
        Ok(settings)
    }

    /// Overall collection limit, if configured.
    #[must_use]
    pub fn collection_timeout(&self) -> Option<Duration> {
        self.collection_timeout_seconds.map(Duration::from_secs)
    }

    /// Local repository that stores the notes.
    #[must_use]
    pub fn repository_path(&self) -> &Utf8Path {
        Utf8Path::new(&self.repo_path)
    }

    /// Options for rendering the markdown summary.
    #[must_use]
    pub const fn render_options(&self) -> RenderOptions {
        RenderOptions {
            max_comment_length: self.max_comment_length,
        }
    }
}

fn configuration(message: &str) -> IntakeError {
    IntakeError::Configuration {
        message: message.to_owned(),
    }
}

fn parse_api_base(raw: &str) -> Result<Url, IntakeError> {
    Url::parse(raw).map_err(|error| IntakeError::Configuration {
        message: format!("invalid api_base {raw:?}: {error}"),
    })
}

fn parse_repository(raw: &str) -> Result<(String, String), IntakeError> {
    match raw.trim().split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_owned(), repo.to_owned()))
        }
        _ => Err(IntakeError::Configuration {
            message: format!("repository must be in owner/repo form, got {raw:?}"),
        }),
    }
}

#[cfg(test)]
mod tests;
