//! Error types for metadata resolution.

use thiserror::Error;

/// Errors that can occur while resolving a track's playable address.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The catalog could not be reached.
    #[error("cannot reach catalog for track '{track_id}': {reason}")]
    Unreachable {
        /// Track being resolved.
        track_id: String,
        /// Transport error text.
        reason: String,
    },

    /// The catalog answered with a non-success status.
    #[error("catalog returned HTTP {status} for track '{track_id}': {reason}")]
    Status {
        /// Track being resolved.
        track_id: String,
        /// HTTP status code.
        status: u16,
        /// Human-readable explanation.
        reason: String,
    },

    /// The catalog answered with a body we could not read.
    #[error("unexpected catalog response for track '{track_id}': {reason}")]
    InvalidResponse {
        /// Track being resolved.
        track_id: String,
        /// Why the body was rejected.
        reason: String,
    },

    /// The resolver itself is misconfigured.
    #[error("resolver setup failed: {0}")]
    Setup(String),
}

impl ResolveError {
    #[must_use]
    pub fn unreachable(track_id: &str, reason: impl std::fmt::Display) -> Self {
        Self::Unreachable {
            track_id: track_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `Status` error with a reason chosen from the status code.
    #[must_use]
    pub fn status(track_id: &str, status: u16) -> Self {
        let reason = match status {
            404 => "track not found in catalog".to_string(),
            429 => "catalog rate limit exceeded, try again shortly".to_string(),
            s if s >= 500 => "catalog unavailable, try again later".to_string(),
            s => format!("catalog returned HTTP {s}"),
        };
        Self::Status {
            track_id: track_id.to_string(),
            status,
            reason,
        }
    }

    #[must_use]
    pub fn invalid_response(track_id: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidResponse {
            track_id: track_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Short message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unreachable { .. } => {
                "cannot reach the catalog, check your network connection".to_string()
            }
            Self::Status { reason, .. } | Self::InvalidResponse { reason, .. } => reason.clone(),
            Self::Setup(reason) => reason.clone(),
        }
    }
}
