//! prsnap library crate: resilient snapshots of GitHub pull request activity.
//!
//! The library fetches everything that happened on a pull request (metadata,
//! commits, file changes, comments, reviews and checks) through a rate-limit
//! aware transport with retries and lazy pagination. Collection is
//! all-or-nothing: it yields an immutable [`Snapshot`] or the first error.
//! Snapshots render to a deterministic Markdown summary that can be stored as
//! a git note on the merge commit, with GitHub Actions annotations and step
//! outputs reporting the result when run inside a workflow.

pub mod actions;
pub mod collector;
pub mod config;
pub mod export;
pub mod github;
pub mod notes;
pub mod snapshot;
pub mod telemetry;

pub use collector::{ActivityCollector, extract_linked_issues};
pub use config::PrSnapConfig;
pub use export::{RenderOptions, write_summary};
pub use github::{
    BackoffPolicy, ClientSettings, CommitSha, HttpGateway, IntakeError, PersonalAccessToken,
    PullRequestGateway, PullRequestLocator, RateLimitPolicy, Resource, TransportClient,
};
pub use notes::{Git2NotesStore, NoteEntry, NotesError, NotesStore};
pub use snapshot::Snapshot;
pub use telemetry::{NoopTelemetrySink, StderrJsonlTelemetrySink, TelemetryEvent, TelemetrySink};
