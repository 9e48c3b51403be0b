//! Error types for task tracking.

use std::fmt;

use thiserror::Error;

use super::TaskId;

/// What kind of database failure a tracker call ran into.
///
/// Lets callers tell lock contention, which is worth retrying, from real
/// failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Another connection holds the write lock.
    Contention,
    /// A schema constraint rejected the write.
    Constraint,
    /// No pooled connection became available, or the pool was shut down.
    Pool,
    Other,
}

impl DbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => Self::Pool,
            sqlx::Error::Database(db_error) => {
                let code = db_error.code().unwrap_or_default();
                let text = db_error.message().to_ascii_lowercase();
                // 5 and 6 are SQLITE_BUSY and SQLITE_LOCKED.
                if matches!(code.as_ref(), "5" | "6" | "SQLITE_BUSY" | "SQLITE_LOCKED")
                    || text.contains("database is locked")
                    || text.contains("database is busy")
                {
                    Self::Contention
                } else if db_error.is_unique_violation()
                    || db_error.is_check_violation()
                    || code.starts_with("SQLITE_CONSTRAINT")
                {
                    Self::Constraint
                } else {
                    Self::Other
                }
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for DbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Contention => "contention",
            Self::Constraint => "constraint",
            Self::Pool => "pool",
            Self::Other => "other",
        })
    }
}

/// Errors returned by the task tracker.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    #[error("task database failure [{kind}]: {message}")]
    Database { kind: DbErrorKind, message: String },

    /// No active task carries this id.
    #[error("no active download task with id {0}")]
    TaskNotFound(TaskId),
}

impl From<sqlx::Error> for TrackerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: DbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl TrackerError {
    /// True for lock contention that a later attempt may get past.
    #[must_use]
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            Self::Database {
                kind: DbErrorKind::Contention,
                ..
            }
        )
    }
}
