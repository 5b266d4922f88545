//! Git2-based implementation of [`NotesStore`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use camino::Utf8Path;
use git2::{
    Cred, CredentialType, ErrorCode, FetchOptions, Oid, PushOptions, RemoteCallbacks, Repository,
    Signature,
};
use tracing::{debug, info};

use super::{NoteEntry, NotesError, NotesStore};
use crate::github::locator::{CommitSha, PersonalAccessToken};

/// Committer name used when the repository has no identity configured.
pub const BOT_NAME: &str = "github-actions[bot]";
/// Committer email used when the repository has no identity configured.
pub const BOT_EMAIL: &str = "github-actions[bot]@users.noreply.github.com";

const NOTES_PREFIX: &str = "refs/notes/";

/// Notes store backed by a local repository.
///
/// Uses a `Mutex` to wrap the `Repository` because `git2::Repository` is not
/// `Sync`.
pub struct Git2NotesStore {
    repo: Mutex<Repository>,
    notes_ref: String,
    token: Option<PersonalAccessToken>,
}

impl std::fmt::Debug for Git2NotesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git2NotesStore")
            .field("repo", &"<git2::Repository>")
            .field("notes_ref", &self.notes_ref)
            .finish_non_exhaustive()
    }
}

impl Git2NotesStore {
    /// Opens the repository containing `path` and targets `notes_ref`.
    ///
    /// A short reference name such as `pr-summary` is expanded to
    /// `refs/notes/pr-summary`.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::NotARepository`] when no repository is found.
    pub fn open(path: &Utf8Path, notes_ref: &str) -> Result<Self, NotesError> {
        let repo = Repository::discover(path.as_std_path()).map_err(|error| {
            NotesError::NotARepository {
                path: path.to_string(),
                message: error.message().to_owned(),
            }
        })?;
        Ok(Self::from_repository(repo, notes_ref))
    }

    /// Wraps an already opened repository.
    #[must_use]
    pub fn from_repository(repo: Repository, notes_ref: &str) -> Self {
        Self {
            repo: Mutex::new(repo),
            notes_ref: qualify_notes_ref(notes_ref),
            token: None,
        }
    }

    /// Authenticates HTTPS fetches and pushes with `token`.
    #[must_use]
    pub fn with_token(mut self, token: PersonalAccessToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Fully qualified notes reference.
    #[must_use]
    pub fn notes_ref(&self) -> &str {
        &self.notes_ref
    }

    pub(super) fn repo(&self) -> MutexGuard<'_, Repository> {
        self.repo.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Where fetched remote notes are kept before merging.
    fn tracking_ref(&self, remote: &str) -> String {
        let name = self
            .notes_ref
            .strip_prefix(NOTES_PREFIX)
            .unwrap_or(&self.notes_ref);
        format!("{NOTES_PREFIX}remotes/{remote}/{name}")
    }

    fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        let configured = self.token.as_ref();
        callbacks.credentials(move |_url, _username, allowed| match configured {
            Some(token) if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) => {
                Cred::userpass_plaintext("x-access-token", token.value())
            }
            _ => Cred::default(),
        });
        callbacks
    }

    fn fetch_into_tracking(&self, repo: &Repository, remote: &str) -> Result<(), NotesError> {
        let mut handle = find_remote(repo, remote)?;
        let tracking = self.tracking_ref(remote);
        let refspec = format!("+{}:{tracking}", self.notes_ref);
        let mut options = FetchOptions::new();
        options.remote_callbacks(self.callbacks());

        match handle.fetch(&[refspec.as_str()], Some(&mut options), None) {
            Ok(()) => Ok(()),
            Err(error) if is_missing_remote_ref(&error) => {
                debug!(remote, notes_ref = %self.notes_ref, "remote has no notes yet");
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Brings remote notes into the local reference.
    fn integrate_remote(&self, repo: &Repository, remote: &str) -> Result<(), NotesError> {
        let tracking = self.tracking_ref(remote);
        let Some(remote_tip) = reference_target(repo, &tracking)? else {
            return Ok(());
        };
        let Some(local_tip) = reference_target(repo, &self.notes_ref)? else {
            repo.reference(&self.notes_ref, remote_tip, true, "notes: adopt remote notes")?;
            return Ok(());
        };
        if local_tip == remote_tip || repo.graph_descendant_of(local_tip, remote_tip)? {
            return Ok(());
        }
        if repo.graph_descendant_of(remote_tip, local_tip)? {
            repo.reference(&self.notes_ref, remote_tip, true, "notes: fast-forward")?;
            return Ok(());
        }
        self.merge_diverged(repo, &tracking, remote_tip)
    }

    /// Copies remote-only notes locally, then records a merge commit so the
    /// remote history is an ancestor of the local one.
    fn merge_diverged(
        &self,
        repo: &Repository,
        tracking: &str,
        remote_tip: Oid,
    ) -> Result<(), NotesError> {
        let signature = signature(repo)?;
        let mut copied = 0_usize;
        for entry in repo.notes(Some(tracking))? {
            let (_, annotated) = entry?;
            if find_note_message(repo, &self.notes_ref, annotated)?.is_some() {
                continue;
            }
            if let Some(message) = find_note_message(repo, tracking, annotated)? {
                repo.note(
                    &signature,
                    &signature,
                    Some(&self.notes_ref),
                    annotated,
                    &message,
                    false,
                )?;
                copied += 1;
            }
        }

        let local_commit = repo.find_reference(&self.notes_ref)?.peel_to_commit()?;
        let remote_commit = repo.find_commit(remote_tip)?;
        let tree = local_commit.tree()?;
        repo.commit(
            Some(&self.notes_ref),
            &signature,
            &signature,
            &format!("Merge notes from {tracking}"),
            &tree,
            &[&local_commit, &remote_commit],
        )?;
        debug!(copied, notes_ref = %self.notes_ref, "merged diverged notes");
        Ok(())
    }
}

impl NotesStore for Git2NotesStore {
    fn add_note(&self, sha: &CommitSha, content: &str, force: bool) -> Result<(), NotesError> {
        let repo = self.repo();
        let oid = commit_oid(&repo, sha)?;
        let signature = signature(&repo)?;
        repo.note(
            &signature,
            &signature,
            Some(&self.notes_ref),
            oid,
            content,
            force,
        )
        .map_err(|error| {
            if error.code() == ErrorCode::Exists {
                NotesError::NoteExists {
                    sha: sha.to_string(),
                }
            } else {
                error.into()
            }
        })?;
        info!(sha = %sha.short(), notes_ref = %self.notes_ref, "stored note");
        Ok(())
    }

    fn note(&self, sha: &CommitSha) -> Result<Option<String>, NotesError> {
        let repo = self.repo();
        find_note_message(&repo, &self.notes_ref, parse_oid(sha)?)
    }

    fn remove_note(&self, sha: &CommitSha) -> Result<bool, NotesError> {
        let repo = self.repo();
        let signature = signature(&repo)?;
        match repo.note_delete(parse_oid(sha)?, Some(&self.notes_ref), &signature, &signature) {
            Ok(()) => Ok(true),
            Err(error) if error.code() == ErrorCode::NotFound => {
                debug!(sha = %sha.short(), "no note to remove");
                Ok(false)
            }
            Err(error) => Err(error.into()),
        }
    }

    fn list_notes(&self) -> Result<Vec<NoteEntry>, NotesError> {
        let repo = self.repo();
        let notes = match repo.notes(Some(&self.notes_ref)) {
            Ok(notes) => notes,
            Err(error) if error.code() == ErrorCode::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };
        let mut entries = notes
            .map(|entry| -> Result<NoteEntry, NotesError> {
                let (note_id, annotated) = entry?;
                Ok(NoteEntry {
                    commit: annotated_sha(annotated)?,
                    note_id: note_id.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by(|left, right| left.commit.as_str().cmp(right.commit.as_str()));
        debug!(count = entries.len(), notes_ref = %self.notes_ref, "listed notes");
        Ok(entries)
    }

    fn fetch(&self, remote: &str) -> Result<(), NotesError> {
        let repo = self.repo();
        self.fetch_into_tracking(&repo, remote)?;
        self.integrate_remote(&repo, remote)
    }

    fn push(&self, remote: &str) -> Result<(), NotesError> {
        let repo = self.repo();
        self.fetch_into_tracking(&repo, remote)?;
        self.integrate_remote(&repo, remote)?;
        if reference_target(&repo, &self.notes_ref)?.is_none() {
            debug!(notes_ref = %self.notes_ref, "no local notes to push");
            return Ok(());
        }

        let mut handle = find_remote(&repo, remote)?;
        let refspec = format!("{0}:{0}", self.notes_ref);
        let mut rejection: Option<String> = None;
        {
            let mut callbacks = self.callbacks();
            callbacks.push_update_reference(|_reference, status| {
                if let Some(message) = status {
                    rejection = Some(message.to_owned());
                }
                Ok(())
            });
            let mut options = PushOptions::new();
            options.remote_callbacks(callbacks);
            handle.push(&[refspec.as_str()], Some(&mut options))?;
        }
        if let Some(message) = rejection {
            return Err(NotesError::PushRejected {
                reference: self.notes_ref.clone(),
                message,
            });
        }
        info!(remote, notes_ref = %self.notes_ref, "pushed notes");
        Ok(())
    }
}

fn qualify_notes_ref(notes_ref: &str) -> String {
    if notes_ref.starts_with("refs/") {
        notes_ref.to_owned()
    } else {
        format!("{NOTES_PREFIX}{notes_ref}")
    }
}

fn parse_oid(sha: &CommitSha) -> Result<Oid, NotesError> {
    Ok(Oid::from_str(sha.as_str())?)
}

fn annotated_sha(oid: Oid) -> Result<CommitSha, NotesError> {
    CommitSha::new(&oid.to_string()).map_err(|error| NotesError::Git {
        message: error.to_string(),
    })
}

fn commit_oid(repo: &Repository, sha: &CommitSha) -> Result<Oid, NotesError> {
    let oid = parse_oid(sha)?;
    repo.find_commit(oid)
        .map(|commit| commit.id())
        .map_err(|_| NotesError::CommitNotFound {
            sha: sha.to_string(),
        })
}

/// Repository identity, or the GitHub Actions bot when none is configured.
fn signature(repo: &Repository) -> Result<Signature<'static>, NotesError> {
    repo.signature()
        .or_else(|_| Signature::now(BOT_NAME, BOT_EMAIL))
        .map_err(NotesError::from)
}

fn find_remote<'r>(repo: &'r Repository, name: &str) -> Result<git2::Remote<'r>, NotesError> {
    repo.find_remote(name).map_err(|error| {
        if error.code() == ErrorCode::NotFound {
            NotesError::RemoteNotFound {
                name: name.to_owned(),
            }
        } else {
            error.into()
        }
    })
}

fn reference_target(repo: &Repository, name: &str) -> Result<Option<Oid>, NotesError> {
    match repo.refname_to_id(name) {
        Ok(oid) => Ok(Some(oid)),
        Err(error) if error.code() == ErrorCode::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}

fn find_note_message(
    repo: &Repository,
    notes_ref: &str,
    annotated: Oid,
) -> Result<Option<String>, NotesError> {
    match repo.find_note(Some(notes_ref), annotated) {
        Ok(note) => Ok(Some(note.message().unwrap_or_default().to_owned())),
        Err(error) if error.code() == ErrorCode::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}

fn is_missing_remote_ref(error: &git2::Error) -> bool {
    let message = error.message().to_lowercase();
    message.contains("couldn't find remote ref")
        || message.contains("no match for refspec")
}
