//! Track Downloader Library
//!
//! Turns catalog track descriptors into queued, tracked, running file
//! downloads for a music player, without depending on any UI toolkit.
//!
//! # Architecture
//!
//! - [`enqueue`] - the enqueue workflow, single and batch
//! - [`resolver`] - metadata resolution seam and HTTP catalog client
//! - [`tracker`] - task registration with one active task per track
//! - [`transfer`] - transfer engine seam and HTTP streaming engine
//! - [`store`] - local track metadata cache
//! - [`network`] - connection status and the Wi-Fi download policy
//! - [`interaction`] - notices, prompts and host liveness
//! - [`removal`] - deleting on-device tracks
//! - [`debounce`], [`sleep_timer`] - caller-owned player state
//! - [`events`] - typed observer lists
//! - [`db`] - database connection and schema management

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod db;
pub mod debounce;
pub mod enqueue;
pub mod events;
pub mod interaction;
pub mod network;
pub mod removal;
pub mod resolver;
pub mod sleep_timer;
pub mod store;
pub mod track;
pub mod tracker;
pub mod transfer;
mod user_agent;

// Re-export commonly used types
pub use db::{Database, DatabaseOptions, DbError};
pub use debounce::Debouncer;
pub use enqueue::{
    BatchDownloadEnqueuer, BatchReport, Collaborators, DownloadEnqueuer, EnqueueError,
    EnqueueMode, EnqueueOutcome,
};
pub use events::{Observer, Observers, SubscriptionId};
pub use interaction::{HostLifetime, Notice, Notifier, Prompt, PromptOutcome, Prompter};
pub use network::{DownloadSettings, NetworkStatus, PolicySettings, StaticNetworkStatus};
pub use removal::{LocalTrackRemover, RemoveError};
pub use resolver::{HttpMetadataResolver, MetadataResolver, PassthroughResolver, ResolveError};
pub use sleep_timer::{SleepChoice, SleepTimer, SleepTimerError};
pub use store::{LocalStore, SqliteTrackStore, StoreError, StoreEvent, StoredTrack};
pub use track::{SourceType, TrackDescriptor, destination_path};
pub use tracker::{
    DownloadTask, SqliteTaskTracker, TaskEvent, TaskId, TaskRegistration, TaskStatus,
    TaskTracker, TrackerError,
};
pub use transfer::{
    HttpTransferEngine, TransferEngine, TransferError, TransferHandle, TransferListener,
    task_id_for,
};
