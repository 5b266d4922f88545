//! Connection settings for the transport client.

use std::time::Duration;

use url::Url;

use crate::github::backoff::BackoffPolicy;
use crate::github::rate_limit::RateLimitPolicy;

/// Default GitHub REST API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
/// API version sent in the `X-GitHub-Api-Version` header.
pub const DEFAULT_API_VERSION: &str = "2022-11-28";
/// Largest page size GitHub accepts.
pub const MAX_PER_PAGE: u8 = 100;
/// Default timeout for a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the transport client needs besides the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// REST API base, e.g. `https://api.github.com` or a GitHub Enterprise
    /// `https://host/api/v3`.
    pub api_base: Url,
    /// Value of the `X-GitHub-Api-Version` header.
    pub api_version: String,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
    /// Items requested per page when paginating.
    pub per_page: u8,
    /// Timeout applied to every individual request.
    pub request_timeout: Duration,
    /// Proactive rate limit wait policy.
    pub rate_limit: RateLimitPolicy,
    /// Retry policy for transient failures.
    pub backoff: BackoffPolicy,
}

impl ClientSettings {
    /// Settings for `api_base` with every other value at its default.
    #[must_use]
    pub fn for_base(api_base: Url) -> Self {
        Self {
            api_base,
            api_version: DEFAULT_API_VERSION.to_owned(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
            per_page: MAX_PER_PAGE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            rate_limit: RateLimitPolicy::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}
