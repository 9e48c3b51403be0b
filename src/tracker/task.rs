//! Download task records and status definitions.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Identifier assigned by the transfer engine when a transfer is created.
pub type TaskId = i64;

/// Lifecycle state of a download task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Registered, transfer not yet running.
    Queued,
    /// Bytes are flowing.
    Running,
    /// File written completely.
    Done,
    /// Transfer gave up.
    Failed,
}

impl TaskStatus {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// True while the task blocks another registration for the same track.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid task status: {s}")),
        }
    }
}

/// A registered download, as stored by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DownloadTask {
    /// Engine-assigned task identifier.
    pub task_id: TaskId,
    /// Catalog id of the track being downloaded.
    pub track_id: String,
    /// Display title shown in task lists.
    pub title: String,
    /// Source address the bytes come from.
    pub uri: String,
    /// Destination file path (stored as text, read via `destination()`).
    #[sqlx(rename = "destination")]
    pub destination_str: String,
    /// Current status (stored as text, parsed via `status()`).
    #[sqlx(rename = "status")]
    pub status_str: String,
    /// Last transfer error, if the task failed.
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl DownloadTask {
    /// Returns the parsed status enum.
    ///
    /// Falls back to `Queued` if the status string is invalid.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status_str.parse().unwrap_or(TaskStatus::Queued)
    }

    #[must_use]
    pub fn destination(&self) -> PathBuf {
        PathBuf::from(&self.destination_str)
    }
}

impl fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>20}  {:<8}  {}  ->  {}",
            self.task_id,
            self.status(),
            self.title,
            self.destination_str
        )
    }
}

/// Input for [`TaskTracker::register`](super::TaskTracker::register).
#[derive(Debug, Clone, Copy)]
pub struct TaskRegistration<'a> {
    pub task_id: TaskId,
    pub track_id: &'a str,
    pub title: &'a str,
    pub uri: &'a str,
    pub destination: &'a Path,
}
