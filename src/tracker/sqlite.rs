//! `SQLite`-backed task tracker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::{DownloadTask, TaskEvent, TaskId, TaskRegistration, TaskStatus, TaskTracker, TrackerError};
use crate::db::Database;
use crate::events::{Observer, Observers, SubscriptionId};
use crate::transfer::TransferListener;

const ACTIVE_STATUSES: &str = "('queued', 'running')";

/// Registration attempts made while other writers hold the lock.
const REGISTER_ATTEMPTS: u32 = 3;
const CONTENTION_BACKOFF: Duration = Duration::from_millis(25);

/// Task tracker persisting to the `download_tasks` table.
///
/// Duplicate detection relies on the partial unique index over active rows,
/// so concurrent registrations for one track resolve inside `SQLite`.
#[derive(Debug)]
pub struct SqliteTaskTracker {
    db: Database,
    observers: Observers<TaskEvent>,
}

impl SqliteTaskTracker {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            db,
            observers: Observers::new(),
        }
    }

    /// Subscribes to task lifecycle events.
    pub fn subscribe(&self, observer: Arc<dyn Observer<TaskEvent>>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Inserts a task unless the track already has an active one.
    ///
    /// Lock contention from other writers is retried a few times with a
    /// short linear backoff.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Database`] if the insert fails for any reason
    /// other than the active-track conflict.
    #[instrument(skip(self, registration), fields(task_id = registration.task_id, track_id = %registration.track_id))]
    pub async fn register_task(
        &self,
        registration: &TaskRegistration<'_>,
    ) -> Result<Option<DownloadTask>, TrackerError> {
        let mut attempt = 1;
        loop {
            match self.insert_task(registration).await {
                Err(err) if err.is_contention() && attempt < REGISTER_ATTEMPTS => {
                    warn!(attempt, error = %err, "task table busy, retrying registration");
                    tokio::time::sleep(CONTENTION_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Ok(Some(task)) => {
                    debug!("task registered");
                    return Ok(Some(task));
                }
                Ok(None) => {
                    debug!("track already has an active task");
                    return Ok(None);
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn insert_task(
        &self,
        registration: &TaskRegistration<'_>,
    ) -> Result<Option<DownloadTask>, TrackerError> {
        let destination = registration.destination.to_string_lossy();
        let task = sqlx::query_as::<_, DownloadTask>(
            r"INSERT INTO download_tasks (task_id, track_id, title, uri, destination, status)
              VALUES (?, ?, ?, ?, ?, ?)
              ON CONFLICT DO NOTHING
              RETURNING *",
        )
        .bind(registration.task_id)
        .bind(registration.track_id)
        .bind(registration.title)
        .bind(registration.uri)
        .bind(destination.as_ref())
        .bind(TaskStatus::Queued.as_str())
        .fetch_optional(self.db.pool())
        .await?;
        Ok(task)
    }

    /// Returns the most recent row for a task id.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, task_id: TaskId) -> Result<Option<DownloadTask>, TrackerError> {
        let task = sqlx::query_as::<_, DownloadTask>(
            r"SELECT * FROM download_tasks WHERE task_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(task_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(task)
    }

    /// Lists every task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<DownloadTask>, TrackerError> {
        let tasks = sqlx::query_as::<_, DownloadTask>(r"SELECT * FROM download_tasks ORDER BY id")
            .fetch_all(self.db.pool())
            .await?;
        Ok(tasks)
    }

    /// # Errors
    ///
    /// Returns [`TrackerError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn list_by_status(
        &self,
        status: TaskStatus,
    ) -> Result<Vec<DownloadTask>, TrackerError> {
        let tasks = sqlx::query_as::<_, DownloadTask>(
            r"SELECT * FROM download_tasks WHERE status = ? ORDER BY id",
        )
        .bind(status.as_str())
        .fetch_all(self.db.pool())
        .await?;
        Ok(tasks)
    }

    /// Returns the queued or running task for a track, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn active_for_track(
        &self,
        track_id: &str,
    ) -> Result<Option<DownloadTask>, TrackerError> {
        let task = sqlx::query_as::<_, DownloadTask>(&format!(
            "SELECT * FROM download_tasks WHERE track_id = ? AND status IN {ACTIVE_STATUSES}"
        ))
        .bind(track_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(task)
    }

    /// Moves an active task to `status` and publishes the change.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::TaskNotFound`] if no active task has this id,
    /// or [`TrackerError::Database`] if the update fails.
    #[instrument(skip(self, error), fields(status = %status))]
    pub async fn update_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        error: Option<&str>,
    ) -> Result<(), TrackerError> {
        let result = sqlx::query(&format!(
            "UPDATE download_tasks
             SET status = ?, last_error = ?, updated_at = datetime('now')
             WHERE task_id = ? AND status IN {ACTIVE_STATUSES}"
        ))
        .bind(status.as_str())
        .bind(error)
        .bind(task_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(TrackerError::TaskNotFound(task_id));
        }

        self.observers.publish(&TaskEvent::StatusChanged {
            task_id,
            status,
            error: error.map(str::to_string),
        });
        Ok(())
    }
}

#[async_trait]
impl TaskTracker for SqliteTaskTracker {
    async fn register(
        &self,
        registration: &TaskRegistration<'_>,
    ) -> Result<Option<DownloadTask>, TrackerError> {
        self.register_task(registration).await
    }

    fn notify_observers(&self, task: &DownloadTask) {
        self.observers.publish(&TaskEvent::Registered(task.clone()));
    }
}

#[async_trait]
impl TransferListener for SqliteTaskTracker {
    async fn on_status(&self, task_id: TaskId, status: TaskStatus, error: Option<&str>) {
        if let Err(err) = self.update_status(task_id, status, error).await {
            warn!(task_id, status = %status, error = %err, "failed to record transfer status");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    async fn tracker() -> SqliteTaskTracker {
        SqliteTaskTracker::new(Database::new_in_memory().await.unwrap())
    }

    fn registration<'a>(task_id: TaskId, track_id: &'a str) -> TaskRegistration<'a> {
        TaskRegistration {
            task_id,
            track_id,
            title: "Children",
            uri: "https://cdn.example.com/children.mp3",
            destination: Path::new("/music/Robert Miles - Children.mp3"),
        }
    }

    #[tokio::test]
    async fn test_register_returns_queued_task() {
        let tracker = tracker().await;
        let task = tracker.register(&registration(1, "t1")).await.unwrap().unwrap();

        assert_eq!(task.task_id, 1);
        assert_eq!(task.track_id, "t1");
        assert_eq!(task.status(), TaskStatus::Queued);
        assert_eq!(
            task.destination(),
            Path::new("/music/Robert Miles - Children.mp3")
        );
    }

    #[tokio::test]
    async fn test_register_rejects_active_duplicate() {
        let tracker = tracker().await;
        assert!(tracker.register(&registration(1, "t1")).await.unwrap().is_some());
        assert!(tracker.register(&registration(2, "t1")).await.unwrap().is_none());
        assert_eq!(tracker.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_allows_other_tracks() {
        let tracker = tracker().await;
        assert!(tracker.register(&registration(1, "t1")).await.unwrap().is_some());
        assert!(tracker.register(&registration(2, "t2")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_status_unknown_task_is_not_found() {
        let tracker = tracker().await;
        let err = tracker
            .update_status(99, TaskStatus::Running, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::TaskNotFound(99)));
    }

    #[tokio::test]
    async fn test_update_status_records_error_and_publishes() {
        let tracker = tracker().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        tracker.subscribe(Arc::new(move |event: &TaskEvent| {
            sink.lock().unwrap().push(event.clone());
        }));

        tracker.register(&registration(5, "t1")).await.unwrap();
        tracker
            .update_status(5, TaskStatus::Failed, Some("HTTP 404"))
            .await
            .unwrap();

        let task = tracker.get(5).await.unwrap().unwrap();
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.last_error.as_deref(), Some("HTTP 404"));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![TaskEvent::StatusChanged {
                task_id: 5,
                status: TaskStatus::Failed,
                error: Some("HTTP 404".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_notify_observers_publishes_registered() {
        let tracker = tracker().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = tracker.subscribe(Arc::new(move |event: &TaskEvent| {
            sink.lock().unwrap().push(event.clone());
        }));

        let task = tracker.register(&registration(1, "t1")).await.unwrap().unwrap();
        tracker.notify_observers(&task);
        assert!(tracker.unsubscribe(id));
        tracker.notify_observers(&task);

        assert_eq!(*seen.lock().unwrap(), vec![TaskEvent::Registered(task)]);
    }

    #[tokio::test]
    async fn test_list_by_status_and_active_for_track() {
        let tracker = tracker().await;
        tracker.register(&registration(1, "t1")).await.unwrap();
        tracker.register(&registration(2, "t2")).await.unwrap();
        tracker.update_status(2, TaskStatus::Done, None).await.unwrap();

        let queued = tracker.list_by_status(TaskStatus::Queued).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].track_id, "t1");
        assert!(tracker.active_for_track("t1").await.unwrap().is_some());
        assert!(tracker.active_for_track("t2").await.unwrap().is_none());
    }
}
