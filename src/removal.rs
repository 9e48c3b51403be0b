//! Removal of on-device track files.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::interaction::{Notice, Notifier, Prompt, Prompter};
use crate::track::TrackDescriptor;

/// Errors from removing a local track.
#[derive(Debug, Error)]
pub enum RemoveError {
    #[error("no track selected")]
    EmptyTrack,

    #[error("track '{title}' is not a local file")]
    NotLocal { title: String },

    #[error("local track '{title}' has no file path")]
    MissingPath { title: String },

    #[error("IO error deleting {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The blocking delete task panicked or was cancelled.
    #[error("delete task aborted: {0}")]
    Aborted(String),
}

impl From<&RemoveError> for Notice {
    fn from(err: &RemoveError) -> Self {
        match err {
            RemoveError::EmptyTrack => Self::EmptyTrack,
            RemoveError::NotLocal { .. } => Self::NotLocal,
            RemoveError::MissingPath { title } => Self::DeleteFailed {
                title: title.clone(),
            },
            RemoveError::Io { path, .. } => Self::DeleteFailed {
                title: path.display().to_string(),
            },
            RemoveError::Aborted(reason) => Self::DeleteFailed {
                title: reason.clone(),
            },
        }
    }
}

/// Deletes local track files off the async path.
#[derive(Clone)]
pub struct LocalTrackRemover {
    notifier: Arc<dyn Notifier>,
    prompter: Arc<dyn Prompter>,
}

impl LocalTrackRemover {
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, prompter: Arc<dyn Prompter>) -> Self {
        Self { notifier, prompter }
    }

    /// Deletes the file behind a local track.
    ///
    /// Returns `Ok(false)` when the file was already gone; only an actual
    /// removal shows the `Deleted` notice.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoveError`], already shown through the notifier.
    #[instrument(skip_all, fields(track_id = track.map_or("", |t| t.id.as_str())))]
    pub async fn remove(&self, track: Option<&TrackDescriptor>) -> Result<bool, RemoveError> {
        let result = Self::delete(track).await;
        match &result {
            Ok(true) => {
                if let Some(track) = track {
                    self.notifier.show(&Notice::Deleted {
                        title: track.title.clone(),
                    });
                }
            }
            Ok(false) => debug!("file already absent"),
            Err(err) => {
                warn!(error = %err, "local removal failed");
                self.notifier.show(&Notice::from(err));
            }
        }
        result
    }

    /// Confirms once, then removes each track in order.
    ///
    /// Returns one result per track, or nothing when the list was empty or
    /// the user did not confirm.
    #[instrument(skip_all, fields(count = tracks.len()))]
    pub async fn remove_batch(&self, tracks: &[TrackDescriptor]) -> Vec<Result<bool, RemoveError>> {
        if tracks.is_empty() {
            self.notifier.show(&Notice::DeleteListEmpty);
            return Vec::new();
        }

        let answer = self
            .prompter
            .confirm(Prompt::ConfirmDelete {
                count: tracks.len(),
            })
            .await;
        if !answer.is_accepted() {
            info!(outcome = ?answer, "batch delete not confirmed");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(tracks.len());
        for track in tracks {
            results.push(self.remove(Some(track)).await);
        }
        results
    }

    async fn delete(track: Option<&TrackDescriptor>) -> Result<bool, RemoveError> {
        let track = track.ok_or(RemoveError::EmptyTrack)?;
        if !track.is_local() {
            return Err(RemoveError::NotLocal {
                title: track.title.clone(),
            });
        }
        let path = track
            .resolved_uri()
            .map(PathBuf::from)
            .ok_or_else(|| RemoveError::MissingPath {
                title: track.title.clone(),
            })?;

        tokio::task::spawn_blocking(move || match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(RemoveError::Io { path, source }),
        })
        .await
        .map_err(|e| RemoveError::Aborted(e.to_string()))?
    }
}

impl std::fmt::Debug for LocalTrackRemover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTrackRemover").finish_non_exhaustive()
    }
}
