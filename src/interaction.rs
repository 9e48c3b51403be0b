//! User interaction seams.
//!
//! The library never draws anything. It emits [`Notice`]s through a
//! [`Notifier`] and asks questions through a [`Prompter`], which answers with
//! a tagged [`PromptOutcome`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

/// A short, fire-and-forget message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// No track was selected.
    EmptyTrack,
    /// The track is already a local file.
    AlreadyLocal,
    /// Licensing forbids downloading the track.
    DownloadForbidden,
    /// The catalog returned no usable address for the track.
    DownloadUnavailable { title: String },
    /// Something went wrong; `detail` is for logs and verbose output.
    DownloadError { detail: String },
    /// Resolution failed with the resolver's own message.
    ResolutionFailed { message: String },
    /// A single track was registered and started.
    AddedToQueue { title: String },
    /// A batch was submitted.
    BatchAdded { count: usize },
    /// A batch request held no tracks.
    EmptyList,
    /// A local file was removed.
    Deleted { title: String },
    /// A delete request held no tracks.
    DeleteListEmpty,
    /// The track to delete is not a local file.
    NotLocal,
    /// Removing a local file failed.
    DeleteFailed { title: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTrack => write!(f, "no track selected"),
            Self::AlreadyLocal => write!(f, "track is already on this device"),
            Self::DownloadForbidden => write!(f, "this track cannot be downloaded"),
            Self::DownloadUnavailable { title } => {
                write!(f, "download address abnormal for '{title}'")
            }
            Self::DownloadError { .. } => write!(f, "download failed"),
            Self::ResolutionFailed { message } => write!(f, "{message}"),
            Self::AddedToQueue { title } => write!(f, "'{title}' added to download queue"),
            Self::BatchAdded { count } => write!(f, "{count} track(s) added to download queue"),
            Self::EmptyList => write!(f, "download list is empty"),
            Self::Deleted { title } => write!(f, "'{title}' deleted"),
            Self::DeleteListEmpty => write!(f, "delete list is empty"),
            Self::NotLocal => write!(f, "track is not a local file"),
            Self::DeleteFailed { title } => write!(f, "could not delete '{title}'"),
        }
    }
}

/// Shows notices to the user.
pub trait Notifier: Send + Sync {
    fn show(&self, notice: &Notice);
}

/// A question requiring an answer before work continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Wi-Fi is required but the device is on another network.
    MeteredNetwork,
    /// Download `count` tracks?
    ConfirmBatch { count: usize },
    /// Delete `count` local files?
    ConfirmDelete { count: usize },
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MeteredNetwork => {
                write!(f, "Not connected to Wi-Fi. Download over the current network?")
            }
            Self::ConfirmBatch { count } => write!(f, "Download {count} track(s)?"),
            Self::ConfirmDelete { count } => write!(f, "Delete {count} local file(s)?"),
        }
    }
}

/// How the user answered a [`Prompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    Accepted,
    Declined,
    /// Closed without an answer.
    Dismissed,
}

impl PromptOutcome {
    #[must_use]
    pub fn is_accepted(self) -> bool {
        self == Self::Accepted
    }
}

/// Asks the user to confirm something.
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn confirm(&self, prompt: Prompt) -> PromptOutcome;
}

/// Liveness flag for whatever hosts an enqueue flow.
///
/// Clones share state. Once closed, pending continuations drop their results.
#[derive(Debug, Clone)]
pub struct HostLifetime {
    alive: Arc<AtomicBool>,
}

impl HostLifetime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn close(&self) {
        self.alive.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

impl Default for HostLifetime {
    fn default() -> Self {
        Self::new()
    }
}
