//! Download task tracking.
//!
//! The tracker owns every [`DownloadTask`]. Registration is the atomic
//! check-and-create for "one active transfer per track": it returns `None`
//! when a `Queued` or `Running` task already exists for the track id.

mod error;
mod sqlite;
mod task;

use async_trait::async_trait;

pub use error::{DbErrorKind, TrackerError};
pub use sqlite::SqliteTaskTracker;
pub use task::{DownloadTask, TaskId, TaskRegistration, TaskStatus};

/// Lifecycle events published by a tracker to its observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// A new task was accepted.
    Registered(DownloadTask),
    /// An active task moved to another status.
    StatusChanged {
        task_id: TaskId,
        status: TaskStatus,
        error: Option<String>,
    },
}

/// Data-access contract for download task registration.
#[async_trait]
pub trait TaskTracker: Send + Sync {
    /// Registers a new task.
    ///
    /// Returns `Ok(None)` when an active task for the same track id exists.
    async fn register(
        &self,
        registration: &TaskRegistration<'_>,
    ) -> Result<Option<DownloadTask>, TrackerError>;

    /// Tells observers that `task` was added.
    fn notify_observers(&self, task: &DownloadTask);
}
