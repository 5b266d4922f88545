//! Authenticated HTTP transport for the GitHub REST API.
//!
//! [`TransportClient`] owns the connection pool, the bearer token, and the
//! most recently observed [`RateBudget`]. Every request first consults the
//! [`RateLimitPolicy`](super::rate_limit::RateLimitPolicy), then retries
//! rate-limited, server, and network failures according to the
//! [`BackoffPolicy`](super::backoff::BackoffPolicy). Authentication, not-found,
//! and other client errors are returned immediately.

mod response;
mod settings;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use http::header::ACCEPT;
use http::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub(crate) use response::ApiPage;
use response::{extract_github_message, mentions_rate_limit, retry_after};
pub use settings::{
    ClientSettings, DEFAULT_API_BASE, DEFAULT_API_VERSION, DEFAULT_REQUEST_TIMEOUT, MAX_PER_PAGE,
};

use super::backoff::{FailureKind, RetryDecision};
use super::clock::{Clock, Sleeper, SystemClock, TokioSleeper};
use super::locator::PersonalAccessToken;
use super::pagination::Pagination;
use super::rate_limit::RateBudget;
use crate::telemetry::{NoopTelemetrySink, TelemetryEvent, TelemetrySink};

const GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";

/// Failures reported by the transport, independent of which resource was
/// requested.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// GitHub rejected the token (HTTP 401 or 403).
    #[error("GitHub rejected the request with HTTP {status}: {message}")]
    Authentication {
        /// HTTP status code.
        status: u16,
        /// Message returned by GitHub.
        message: String,
    },

    /// The resource does not exist (HTTP 404).
    #[error("resource not found: {message}")]
    NotFound {
        /// Message returned by GitHub.
        message: String,
    },

    /// The rate limit stayed exhausted after every retry.
    #[error("rate limit still exhausted after {attempts} attempts: {message}")]
    RateLimited {
        /// Last reset timestamp (Unix seconds) GitHub reported.
        reset_at: Option<u64>,
        /// Total number of attempts made.
        attempts: u32,
        /// Message returned by GitHub.
        message: String,
    },

    /// Server errors or network failures outlasted the retry budget.
    #[error("request failed after {attempts} attempts: {message}")]
    Transient {
        /// Total number of attempts made.
        attempts: u32,
        /// Description of the last failure.
        message: String,
    },

    /// GitHub answered with an unexpected status code.
    #[error("GitHub returned HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message or raw body returned by GitHub.
        body: String,
    },

    /// A successful response did not contain the expected JSON.
    #[error("response could not be decoded: {message}")]
    Decode {
        /// Decoder error message.
        message: String,
    },

    /// The request URL could not be built or the client could not start.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },
}

/// A failed attempt that may be retried.
struct RetryableFailure {
    kind: FailureKind,
    message: String,
    retry_after: Option<Duration>,
}

enum Attempt {
    Succeeded(ApiPage),
    Retryable(RetryableFailure),
}

/// Authenticated GitHub REST client with rate limiting and retries.
pub struct TransportClient {
    http: reqwest::Client,
    token: PersonalAccessToken,
    settings: ClientSettings,
    budget: Mutex<Option<RateBudget>>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl fmt::Debug for TransportClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TransportClient")
            .field("api_base", &self.settings.api_base.as_str())
            .field("token", &self.token)
            .field("budget", &self.rate_budget())
            .finish_non_exhaustive()
    }
}

impl TransportClient {
    /// Builds a client that sleeps on the Tokio timer and reads the system
    /// clock.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] when the HTTP client cannot
    /// be initialised.
    pub fn new(settings: ClientSettings, token: PersonalAccessToken) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.request_timeout)
            .build()
            .map_err(|error| TransportError::InvalidRequest {
                message: format!("failed to build HTTP client: {error}"),
            })?;

        Ok(Self {
            http,
            token,
            settings,
            budget: Mutex::new(None),
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
            telemetry: Arc::new(NoopTelemetrySink),
        })
    }

    /// Replaces the clock used for rate limit arithmetic.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the sleeper used for waits and retry delays.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replaces the telemetry sink notified about waits and retries.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Settings the client was built with.
    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Most recently observed rate budget, if any response carried one.
    #[must_use]
    pub fn rate_budget(&self) -> Option<RateBudget> {
        *self.budget.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Performs a single request and returns the decoded JSON body.
    ///
    /// An empty success body decodes to [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] describing the final failure once
    /// retries are exhausted or the failure is not retryable.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, TransportError> {
        let url = self.endpoint_url(path, params)?;
        self.execute(&method, &url).await.map(|page| page.body)
    }

    /// Lazily walks a list endpoint whose body is a JSON array.
    ///
    /// No request is issued until the first item is pulled.
    #[must_use]
    pub fn paginate(&self, path: &str, params: &[(&str, &str)]) -> Pagination<'_> {
        Pagination::new(self, self.first_page_url(path, params), None)
    }

    /// Lazily walks a list endpoint whose items sit under `field` of a JSON
    /// object, such as `check_runs`.
    #[must_use]
    pub fn paginate_field(
        &self,
        path: &str,
        params: &[(&str, &str)],
        field: &'static str,
    ) -> Pagination<'_> {
        Pagination::new(self, self.first_page_url(path, params), Some(field))
    }

    pub(crate) async fn get_page(&self, url: &Url) -> Result<ApiPage, TransportError> {
        self.execute(&Method::GET, url).await
    }

    fn first_page_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, TransportError> {
        let per_page = self.settings.per_page.to_string();
        let mut all_params = params.to_vec();
        all_params.push(("per_page", per_page.as_str()));
        self.endpoint_url(path, &all_params)
    }

    fn endpoint_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, TransportError> {
        let base = self.settings.api_base.as_str().trim_end_matches('/');
        let joined = format!("{base}/{}", path.trim_start_matches('/'));
        let mut url = Url::parse(&joined).map_err(|error| TransportError::InvalidRequest {
            message: format!("invalid URL `{joined}`: {error}"),
        })?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// Sends one request, retrying retryable failures.
    ///
    /// Each attempt first waits for the rate budget to reset when it is at
    /// or below the threshold. A retry whose delay is covered by that
    /// pending reset wait skips its own sleep, so an exhausted budget
    /// pauses once per attempt.
    async fn execute(&self, method: &Method, url: &Url) -> Result<ApiPage, TransportError> {
        let mut retries_used: u32 = 0;
        loop {
            self.wait_for_budget().await;

            let failure = match self.attempt(method, url).await? {
                Attempt::Succeeded(page) => return Ok(page),
                Attempt::Retryable(failure) => failure,
            };

            let attempts = retries_used.saturating_add(1);
            let decision = if self.settings.backoff.can_retry(retries_used) {
                self.settings
                    .backoff
                    .next_retry_delay(retries_used, failure.kind)
            } else {
                RetryDecision::DoNotRetry
            };

            match decision {
                RetryDecision::RetryAfter(backoff_delay) => {
                    let delay = self.honour_retry_after(backoff_delay, failure.retry_after);
                    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    warn!(
                        %url,
                        attempt = attempts,
                        delay_ms,
                        reason = %failure.message,
                        "retrying GitHub request"
                    );
                    self.telemetry.record(TelemetryEvent::RetryScheduled {
                        attempt: attempts,
                        delay_ms,
                        reason: failure.message,
                    });
                    if self.pending_budget_wait() < delay {
                        self.sleeper.sleep(delay).await;
                    } else {
                        debug!(%url, "rate limit reset wait covers retry delay");
                    }
                    retries_used = attempts;
                }
                RetryDecision::DoNotRetry => return Err(self.exhausted(failure, attempts)),
            }
        }
    }

    fn honour_retry_after(&self, backoff_delay: Duration, retry_after: Option<Duration>) -> Duration {
        retry_after.map_or(backoff_delay, |requested| {
            backoff_delay
                .max(requested)
                .min(self.settings.backoff.max_delay().max(backoff_delay))
        })
    }

    fn exhausted(&self, failure: RetryableFailure, attempts: u32) -> TransportError {
        match failure.kind {
            FailureKind::RateLimited => TransportError::RateLimited {
                reset_at: self.rate_budget().map(|budget| budget.reset_at()),
                attempts,
                message: failure.message,
            },
            FailureKind::Network | FailureKind::Server | FailureKind::Client => {
                TransportError::Transient {
                    attempts,
                    message: failure.message,
                }
            }
        }
    }

    fn pending_budget_wait(&self) -> Duration {
        self.settings
            .rate_limit
            .should_wait(self.rate_budget().as_ref(), self.clock.now_unix())
    }

    async fn wait_for_budget(&self) {
        let wait = self.pending_budget_wait();
        if wait.is_zero() {
            return;
        }

        let remaining = self
            .rate_budget()
            .map_or(0, |observed| observed.remaining());
        warn!(
            seconds = wait.as_secs(),
            remaining, "rate limit budget low; waiting for reset"
        );
        self.telemetry.record(TelemetryEvent::RateLimitWait {
            seconds: wait.as_secs(),
            remaining,
        });
        self.sleeper.sleep(wait).await;
    }

    fn record_budget(&self, observed: Option<RateBudget>) {
        if let Some(budget) = observed {
            *self.budget.lock().unwrap_or_else(PoisonError::into_inner) = Some(budget);
        }
    }

    async fn attempt(&self, method: &Method, url: &Url) -> Result<Attempt, TransportError> {
        debug!(%method, %url, "sending GitHub request");

        let sent = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(self.token.value())
            .header(ACCEPT, GITHUB_JSON)
            .header(API_VERSION_HEADER, self.settings.api_version.as_str())
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(error) => return Ok(network_failure(&error)),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let observed = RateBudget::from_headers(&headers);
        self.record_budget(observed);

        let text = match response.text().await {
            Ok(text) => text,
            Err(error) => return Ok(network_failure(&error)),
        };
        debug!(%url, status = status.as_u16(), bytes = text.len(), "received GitHub response");

        if status.is_success() {
            return ApiPage::from_parts(&headers, &text)
                .map(Attempt::Succeeded)
                .map_err(|error| TransportError::Decode {
                    message: error.to_string(),
                });
        }

        let message = extract_github_message(&text).unwrap_or_else(|| describe_status(status));
        let budget_exhausted = observed.is_some_and(|budget| budget.is_exhausted());
        classify_failure(status, message, &text, budget_exhausted, retry_after(&headers))
    }
}

fn network_failure(error: &reqwest::Error) -> Attempt {
    Attempt::Retryable(RetryableFailure {
        kind: FailureKind::Network,
        message: error.to_string(),
        retry_after: None,
    })
}

fn describe_status(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", status.as_u16()), ToOwned::to_owned)
}

fn classify_failure(
    status: StatusCode,
    message: String,
    body: &str,
    budget_exhausted: bool,
    retry_after: Option<Duration>,
) -> Result<Attempt, TransportError> {
    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || budget_exhausted
        || (status == StatusCode::FORBIDDEN && mentions_rate_limit(&message));
    if rate_limited {
        return Ok(Attempt::Retryable(RetryableFailure {
            kind: FailureKind::RateLimited,
            message,
            retry_after,
        }));
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TransportError::Authentication {
            status: status.as_u16(),
            message,
        }),
        StatusCode::NOT_FOUND => Err(TransportError::NotFound { message }),
        _ if status.is_server_error() => Ok(Attempt::Retryable(RetryableFailure {
            kind: FailureKind::Server,
            message: format!("HTTP {}: {message}", status.as_u16()),
            retry_after,
        })),
        _ => Err(TransportError::Api {
            status: status.as_u16(),
            body: if body.trim().is_empty() {
                message
            } else {
                body.to_owned()
            },
        }),
    }
}
