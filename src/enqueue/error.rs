//! Error types for enqueueing downloads.

use thiserror::Error;

use crate::interaction::Notice;
use crate::store::StoreError;
use crate::tracker::TrackerError;
use crate::transfer::TransferError;

/// Why an enqueue attempt stopped.
///
/// Every variant is terminal for the attempt and is shown to the user
/// through the notifier before being returned.
#[derive(Debug, Error)]
pub enum EnqueueError {
    #[error("no track selected")]
    EmptyTrack,

    #[error("track is already stored locally")]
    AlreadyLocal,

    #[error("track is not downloadable")]
    DownloadForbidden,

    /// The resolver succeeded but gave no address.
    #[error("no download address for '{title}'")]
    DownloadUnavailable { title: String },

    /// The resolved address is not an HTTP(S) address.
    #[error("unsupported download address '{uri}'")]
    InvalidAddress { uri: String },

    /// The resolver failed; holds its user-facing message.
    #[error("metadata resolution failed: {0}")]
    ResolutionFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// A batch item's task panicked or was cancelled.
    #[error("enqueue task aborted: {0}")]
    Aborted(String),
}

impl From<&EnqueueError> for Notice {
    fn from(err: &EnqueueError) -> Self {
        match err {
            EnqueueError::EmptyTrack => Self::EmptyTrack,
            EnqueueError::AlreadyLocal => Self::AlreadyLocal,
            EnqueueError::DownloadForbidden => Self::DownloadForbidden,
            EnqueueError::DownloadUnavailable { title } => Self::DownloadUnavailable {
                title: title.clone(),
            },
            EnqueueError::ResolutionFailed(message) => Self::ResolutionFailed {
                message: message.clone(),
            },
            EnqueueError::InvalidAddress { .. }
            | EnqueueError::Store(_)
            | EnqueueError::Tracker(_)
            | EnqueueError::Transfer(_)
            | EnqueueError::Aborted(_) => Self::DownloadError {
                detail: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_errors_map_to_matching_notices() {
        assert_eq!(Notice::from(&EnqueueError::EmptyTrack), Notice::EmptyTrack);
        assert_eq!(Notice::from(&EnqueueError::AlreadyLocal), Notice::AlreadyLocal);
        assert_eq!(
            Notice::from(&EnqueueError::DownloadForbidden),
            Notice::DownloadForbidden
        );
    }

    #[test]
    fn test_invalid_address_maps_to_generic_error() {
        let err = EnqueueError::InvalidAddress {
            uri: "ftp://cdn.example.com/a.mp3".into(),
        };
        match Notice::from(&err) {
            Notice::DownloadError { detail } => assert!(detail.contains("ftp://")),
            other => panic!("unexpected notice: {other:?}"),
        }
    }

    #[test]
    fn test_resolution_failure_keeps_resolver_message() {
        let err = EnqueueError::ResolutionFailed("track not found in catalog".into());
        assert_eq!(
            Notice::from(&err),
            Notice::ResolutionFailed {
                message: "track not found in catalog".into()
            }
        );
    }

    #[test]
    fn test_infrastructure_errors_are_generic() {
        let err = EnqueueError::from(TrackerError::TaskNotFound(1));
        assert!(matches!(Notice::from(&err), Notice::DownloadError { .. }));
    }
}
