//! Storage of rendered summaries as git notes.
//!
//! [`NotesStore`] abstracts the operations the command line needs so the
//! rest of the crate does not depend on `git2` directly. [`Git2NotesStore`]
//! is the only implementation.

mod git2_store;

use thiserror::Error;

use crate::github::error::IntakeError;
use crate::github::locator::CommitSha;

pub use git2_store::{BOT_EMAIL, BOT_NAME, Git2NotesStore};

/// Errors raised while reading or writing git notes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotesError {
    /// The configured path is not inside a Git repository.
    #[error("not a git repository: {path}: {message}")]
    NotARepository {
        /// Path that was searched.
        path: String,
        /// Error detail from git.
        message: String,
    },

    /// The commit to annotate does not exist locally.
    #[error("commit not found: {sha}")]
    CommitNotFound {
        /// Requested commit.
        sha: String,
    },

    /// A note already exists and overwriting was not requested.
    #[error("note already exists for {sha} (overwrite with force)")]
    NoteExists {
        /// Annotated commit.
        sha: String,
    },

    /// The named remote is not configured.
    #[error("remote '{name}' not found")]
    RemoteNotFound {
        /// Name of the missing remote.
        name: String,
    },

    /// The remote refused the pushed notes reference.
    #[error("push of {reference} rejected: {message}")]
    PushRejected {
        /// Reference that was pushed.
        reference: String,
        /// Rejection reason reported by the remote.
        message: String,
    },

    /// Any other git failure.
    #[error("git error: {message}")]
    Git {
        /// Error detail from the git2 library.
        message: String,
    },
}

impl From<git2::Error> for NotesError {
    fn from(error: git2::Error) -> Self {
        Self::Git {
            message: error.message().to_owned(),
        }
    }
}

impl From<NotesError> for IntakeError {
    fn from(error: NotesError) -> Self {
        Self::Notes {
            message: error.to_string(),
        }
    }
}

/// One note on a notes reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    /// Commit the note annotates.
    pub commit: CommitSha,
    /// Object id of the note blob.
    pub note_id: String,
}

/// Operations on one notes reference of a repository.
pub trait NotesStore: Send + Sync {
    /// Attaches `content` to `sha`, replacing an existing note when `force`
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::CommitNotFound`] when the commit is unknown
    /// locally, or [`NotesError::NoteExists`] when a note is present and
    /// `force` is false.
    fn add_note(&self, sha: &CommitSha, content: &str, force: bool) -> Result<(), NotesError>;

    /// Reads the note attached to `sha`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the notes reference cannot be read.
    fn note(&self, sha: &CommitSha) -> Result<Option<String>, NotesError>;

    /// Removes the note attached to `sha`, returning whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error when the notes reference cannot be updated.
    fn remove_note(&self, sha: &CommitSha) -> Result<bool, NotesError>;

    /// Lists every note on the reference, ordered by annotated commit.
    ///
    /// A reference that does not exist yet yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error when the notes reference cannot be read.
    fn list_notes(&self) -> Result<Vec<NoteEntry>, NotesError>;

    /// Fetches the notes reference from `remote` and merges it into the
    /// local one; local notes win when both annotate the same commit.
    ///
    /// A remote without the notes reference is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the remote is unknown or the fetch fails.
    fn fetch(&self, remote: &str) -> Result<(), NotesError>;

    /// Pushes the local notes reference to `remote`, fetching and merging
    /// the remote notes first so the push fast-forwards.
    ///
    /// # Errors
    ///
    /// Returns an error when the remote is unknown or rejects the push.
    fn push(&self, remote: &str) -> Result<(), NotesError>;
}
