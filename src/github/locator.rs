//! Validated identity wrappers and endpoint paths for a pull request.

use std::fmt;

use serde::Serialize;

use super::error::IntakeError;

fn validate_segment(kind: &str, value: &str) -> Result<String, IntakeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IntakeError::Validation {
            message: format!("repository {kind} must not be empty"),
        });
    }
    if trimmed.contains('/') || trimmed.chars().any(char::is_whitespace) {
        return Err(IntakeError::Validation {
            message: format!("repository {kind} `{trimmed}` must be a single path segment"),
        });
    }
    Ok(trimmed.to_owned())
}

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    /// Validates a repository owner.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Validation`] when the value is blank or not a
    /// single path segment.
    pub fn new(value: &str) -> Result<Self, IntakeError> {
        validate_segment("owner", value).map(Self)
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Validates a repository name.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Validation`] when the value is blank or not a
    /// single path segment.
    pub fn new(value: &str) -> Result<Self, IntakeError> {
        validate_segment("name", value).map(Self)
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Pull request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    /// Validates that the number is positive.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Validation`] for zero.
    pub fn new(value: u64) -> Result<Self, IntakeError> {
        if value == 0 {
            return Err(IntakeError::Validation {
                message: "pull request number must be positive".to_owned(),
            });
        }
        Ok(Self(value))
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Personal access token wrapper enforcing presence.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Configuration`] when the supplied string is
    /// blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, IntakeError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IntakeError::Configuration {
                message: "GitHub token must not be empty".to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PersonalAccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("PersonalAccessToken(<redacted>)")
    }
}

/// A full 40-character hexadecimal git commit SHA, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CommitSha(String);

impl CommitSha {
    const LENGTH: usize = 40;
    const SHORT_LENGTH: usize = 7;

    /// Parses a SHA, returning `None` unless it is exactly 40 hex digits.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let well_formed =
            trimmed.len() == Self::LENGTH && trimmed.chars().all(|ch| ch.is_ascii_hexdigit());
        well_formed.then(|| Self(trimmed.to_ascii_lowercase()))
    }

    /// Validates a caller-supplied SHA.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Validation`] unless the value is exactly 40
    /// hexadecimal characters.
    pub fn new(value: &str) -> Result<Self, IntakeError> {
        Self::parse(value).ok_or_else(|| IntakeError::Validation {
            message: format!("`{}` is not a 40-character hexadecimal commit SHA", value.trim()),
        })
    }

    #[cfg(any(test, feature = "test-support"))]
    pub(crate) fn from_hex_unchecked(value: &str) -> Self {
        Self(value.to_ascii_lowercase())
    }

    /// Borrow the full SHA.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The abbreviated seven-character form.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..Self::SHORT_LENGTH).unwrap_or(self.0.as_str())
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Validated pull request identity with REST endpoint path builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestLocator {
    owner: RepositoryOwner,
    repository: RepositoryName,
    number: PullRequestNumber,
}

impl PullRequestLocator {
    /// Validates the identifiers before any network call is made.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Validation`] when the owner or repository is
    /// blank or malformed, or the number is zero.
    pub fn new(owner: &str, repository: &str, number: u64) -> Result<Self, IntakeError> {
        Ok(Self {
            owner: RepositoryOwner::new(owner)?,
            repository: RepositoryName::new(repository)?,
            number: PullRequestNumber::new(number)?,
        })
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    fn repository_path(&self) -> String {
        format!(
            "/repos/{}/{}",
            self.owner.as_str(),
            self.repository.as_str()
        )
    }

    /// Path of the pull request itself.
    #[must_use]
    pub fn pull_request_path(&self) -> String {
        format!("{}/pulls/{}", self.repository_path(), self.number.get())
    }

    /// Path listing the pull request's commits.
    #[must_use]
    pub fn commits_path(&self) -> String {
        format!("{}/commits", self.pull_request_path())
    }

    /// Path listing the files changed by the pull request.
    #[must_use]
    pub fn files_path(&self) -> String {
        format!("{}/files", self.pull_request_path())
    }

    /// Path listing inline review comments.
    #[must_use]
    pub fn review_comments_path(&self) -> String {
        format!("{}/comments", self.pull_request_path())
    }

    /// Path listing submitted reviews.
    #[must_use]
    pub fn reviews_path(&self) -> String {
        format!("{}/reviews", self.pull_request_path())
    }

    /// Path listing conversation comments, which live on the issue.
    #[must_use]
    pub fn issue_comments_path(&self) -> String {
        format!(
            "{}/issues/{}/comments",
            self.repository_path(),
            self.number.get()
        )
    }

    /// Path listing check runs for a commit.
    #[must_use]
    pub fn check_runs_path(&self, sha: &CommitSha) -> String {
        format!("{}/commits/{sha}/check-runs", self.repository_path())
    }

    /// Path of the combined status for a commit.
    #[must_use]
    pub fn combined_status_path(&self, sha: &CommitSha) -> String {
        format!("{}/commits/{sha}/status", self.repository_path())
    }
}

impl fmt::Display for PullRequestLocator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}/{}#{}",
            self.owner.as_str(),
            self.repository.as_str(),
            self.number.get()
        )
    }
}
