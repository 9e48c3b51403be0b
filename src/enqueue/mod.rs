//! Download enqueueing.
//!
//! [`DownloadEnqueuer::enqueue`] runs one track through:
//!
//! 1. guards (track present, not local, downloadable)
//! 2. metadata resolution, the only long suspension point
//! 3. host liveness check
//! 4. address validation
//! 5. the Wi-Fi policy gate (single mode only)
//! 6. local metadata upsert
//! 7. transfer creation, registration with the tracker, and start
//!
//! Errors are shown through the notifier and returned. A duplicate
//! registration is not an error and shows nothing.

mod batch;
mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

pub use batch::{BatchDownloadEnqueuer, BatchReport};
pub use error::EnqueueError;

use crate::interaction::{HostLifetime, Notice, Notifier, Prompt, Prompter};
use crate::network::{DownloadSettings, NetworkStatus, needs_metered_confirmation};
use crate::resolver::MetadataResolver;
use crate::store::LocalStore;
use crate::track::{TrackDescriptor, destination_path};
use crate::tracker::{DownloadTask, TaskRegistration, TaskTracker};
use crate::transfer::TransferEngine;

/// Whether an enqueue call stands alone or is one item of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueMode {
    /// Applies the network gate and shows the "added" notice.
    Single,
    /// The batch wrapper has already applied the gate and owns the notice.
    Batch,
}

/// How an enqueue attempt ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Registered and started.
    Started(DownloadTask),
    /// The track already has an active task.
    Duplicate,
    /// The user did not accept the metered-network prompt.
    Declined,
    /// The host went away while the flow was suspended.
    Abandoned,
}

impl EnqueueOutcome {
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

/// Everything the enqueuer talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn MetadataResolver>,
    pub tracker: Arc<dyn TaskTracker>,
    pub engine: Arc<dyn TransferEngine>,
    pub store: Arc<dyn LocalStore>,
    pub network: Arc<dyn NetworkStatus>,
    pub settings: Arc<dyn DownloadSettings>,
    pub notifier: Arc<dyn Notifier>,
    pub prompter: Arc<dyn Prompter>,
}

/// Turns track descriptors into started, tracked downloads.
pub struct DownloadEnqueuer {
    collaborators: Collaborators,
    download_dir: PathBuf,
    host: HostLifetime,
}

impl DownloadEnqueuer {
    #[must_use]
    pub fn new(collaborators: Collaborators, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            collaborators,
            download_dir: download_dir.into(),
            host: HostLifetime::new(),
        }
    }

    /// Ties the enqueuer to an existing host lifetime.
    #[must_use]
    pub fn with_host(mut self, host: HostLifetime) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub fn host(&self) -> &HostLifetime {
        &self.host
    }

    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Enqueues one track.
    ///
    /// # Errors
    ///
    /// Returns an [`EnqueueError`] for any guard, resolution, or
    /// infrastructure failure. The error has already been shown through the
    /// notifier.
    #[instrument(skip_all, fields(track_id = track.map_or("", |t| t.id.as_str()), mode = ?mode))]
    pub async fn enqueue(
        &self,
        track: Option<&TrackDescriptor>,
        mode: EnqueueMode,
    ) -> Result<EnqueueOutcome, EnqueueError> {
        let result = self.run(track, mode).await;
        if let Err(err) = &result {
            debug!(error = %err, "enqueue failed");
            self.collaborators.notifier.show(&Notice::from(err));
        }
        result
    }

    async fn run(
        &self,
        track: Option<&TrackDescriptor>,
        mode: EnqueueMode,
    ) -> Result<EnqueueOutcome, EnqueueError> {
        let track = track.ok_or(EnqueueError::EmptyTrack)?;
        if track.is_local() {
            return Err(EnqueueError::AlreadyLocal);
        }
        if !track.downloadable {
            return Err(EnqueueError::DownloadForbidden);
        }

        let resolved = self.collaborators.resolver.resolve(track).await;
        if !self.host.is_alive() {
            debug!("host closed during resolution, dropping result");
            return Ok(EnqueueOutcome::Abandoned);
        }
        let resolved = resolved.map_err(|e| {
            warn!(error = %e, "metadata resolution failed");
            EnqueueError::ResolutionFailed(e.user_message())
        })?;

        let uri = resolved
            .resolved_uri()
            .ok_or_else(|| EnqueueError::DownloadUnavailable {
                title: resolved.title.clone(),
            })?
            .to_string();
        if !uri.starts_with("http") {
            return Err(EnqueueError::InvalidAddress { uri });
        }

        if mode == EnqueueMode::Single
            && needs_metered_confirmation(
                self.collaborators.settings.as_ref(),
                self.collaborators.network.as_ref(),
            )
        {
            let outcome = self
                .collaborators
                .prompter
                .confirm(Prompt::MeteredNetwork)
                .await;
            if !self.host.is_alive() {
                debug!("host closed during network prompt, dropping result");
                return Ok(EnqueueOutcome::Abandoned);
            }
            if !outcome.is_accepted() {
                info!(?outcome, "metered download not confirmed");
                return Ok(EnqueueOutcome::Declined);
            }
        }

        let destination = destination_path(&self.download_dir, &resolved);
        self.collaborators.store.upsert(&resolved, false).await?;

        let handle = self
            .collaborators
            .engine
            .create_transfer(&track.id, &uri, &destination)?;
        let registration = TaskRegistration {
            task_id: handle.task_id(),
            track_id: &track.id,
            title: &resolved.title,
            uri: &uri,
            destination: &destination,
        };
        let Some(task) = self.collaborators.tracker.register(&registration).await? else {
            debug!("track already has an active download");
            return Ok(EnqueueOutcome::Duplicate);
        };

        self.collaborators.tracker.notify_observers(&task);
        handle.start()?;
        info!(task_id = task.task_id, path = %destination.display(), "download started");

        if mode == EnqueueMode::Single {
            self.collaborators.notifier.show(&Notice::AddedToQueue {
                title: task.title.clone(),
            });
        }
        Ok(EnqueueOutcome::Started(task))
    }

    pub(crate) fn notifier(&self) -> &dyn Notifier {
        self.collaborators.notifier.as_ref()
    }

    pub(crate) fn prompter(&self) -> &dyn Prompter {
        self.collaborators.prompter.as_ref()
    }

    pub(crate) fn needs_metered_confirmation(&self) -> bool {
        needs_metered_confirmation(
            self.collaborators.settings.as_ref(),
            self.collaborators.network.as_ref(),
        )
    }
}

impl std::fmt::Debug for DownloadEnqueuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadEnqueuer")
            .field("download_dir", &self.download_dir)
            .field("host_alive", &self.host.is_alive())
            .finish_non_exhaustive()
    }
}
