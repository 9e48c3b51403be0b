//! File transfers.
//!
//! The enqueuer asks a [`TransferEngine`] for a handle before registering a
//! task, because the engine is what assigns the task id. The handle is only
//! started once the tracker has accepted the registration; a handle dropped
//! unstarted never touches the network.

mod constants;
mod error;
mod http;

use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::TransferError;
pub use http::HttpTransferEngine;

use crate::tracker::{TaskId, TaskStatus};

/// Creates transfer handles.
pub trait TransferEngine: Send + Sync {
    /// Prepares the transfer of track `track_id` from `uri` into
    /// `destination` without starting it.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] if the transfer cannot be described, for
    /// example because `uri` does not parse.
    fn create_transfer(
        &self,
        track_id: &str,
        uri: &str,
        destination: &Path,
    ) -> Result<Box<dyn TransferHandle>, TransferError>;
}

/// A prepared transfer.
pub trait TransferHandle: Send {
    fn task_id(&self) -> TaskId;

    /// Starts the transfer in the background and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::NoRuntime`] when there is nowhere to run it.
    fn start(self: Box<Self>) -> Result<(), TransferError>;
}

/// Receives status changes from running transfers.
#[async_trait]
pub trait TransferListener: Send + Sync {
    async fn on_status(&self, task_id: TaskId, status: TaskStatus, error: Option<&str>);
}

/// Deterministic task id for the transfer of track `track_id` from `uri`
/// into `destination`.
///
/// The first eight bytes of a SHA-256 digest, masked to stay positive in an
/// `i64` column. Two tracks sharing address and file name still get distinct
/// ids, and a track has at most one active task, so an id names one active
/// row.
#[must_use]
pub fn task_id_for(track_id: &str, uri: &str, destination: &Path) -> TaskId {
    let mut hasher = Sha256::new();
    hasher.update(track_id.as_bytes());
    hasher.update(b"\n");
    hasher.update(uri.as_bytes());
    hasher.update(b"\n");
    hasher.update(destination.to_string_lossy().as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0_u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let id = u64::from_be_bytes(prefix) & (u64::MAX >> 1);
    TaskId::try_from(id).unwrap_or(TaskId::MAX)
}
