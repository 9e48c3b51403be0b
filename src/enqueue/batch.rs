//! Batch enqueueing.

use std::sync::Arc;

use tracing::{Instrument, Span, debug, info, instrument};

use super::{DownloadEnqueuer, EnqueueError, EnqueueMode, EnqueueOutcome};
use crate::interaction::{Notice, Prompt};
use crate::track::TrackDescriptor;

/// Result of a batch request, item outcomes in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Tracks in the request.
    pub requested: usize,
    /// The user turned down the batch or the metered-network prompt.
    pub declined: bool,
    /// The host went away while a prompt was open; nothing was submitted.
    pub abandoned: bool,
    pub outcomes: Vec<Result<EnqueueOutcome, EnqueueError>>,
}

impl BatchReport {
    fn declined(requested: usize) -> Self {
        Self {
            requested,
            declined: true,
            ..Self::default()
        }
    }

    fn abandoned(requested: usize) -> Self {
        Self {
            requested,
            abandoned: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn started(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.as_ref().is_ok_and(EnqueueOutcome::is_started))
            .count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_err()).count()
    }
}

/// Enqueues lists of tracks behind one confirmation.
#[derive(Debug, Clone)]
pub struct BatchDownloadEnqueuer {
    inner: Arc<DownloadEnqueuer>,
}

impl BatchDownloadEnqueuer {
    #[must_use]
    pub fn new(inner: Arc<DownloadEnqueuer>) -> Self {
        Self { inner }
    }

    /// Confirms, applies the network gate once, then submits every track.
    ///
    /// Items are spawned in input order and resolve independently. One
    /// `BatchAdded` notice follows the submissions; per-item failures are
    /// shown by the enqueuer itself.
    #[instrument(skip_all, fields(count = tracks.len()))]
    pub async fn enqueue_batch(&self, tracks: Vec<TrackDescriptor>) -> BatchReport {
        if tracks.is_empty() {
            self.inner.notifier().show(&Notice::EmptyList);
            return BatchReport::default();
        }

        let count = tracks.len();
        let answer = self
            .inner
            .prompter()
            .confirm(Prompt::ConfirmBatch { count })
            .await;
        if !self.inner.host().is_alive() {
            debug!("host closed during batch prompt, dropping answer");
            return BatchReport::abandoned(count);
        }
        if !answer.is_accepted() {
            info!(outcome = ?answer, "batch not confirmed");
            return BatchReport::declined(count);
        }

        if self.inner.needs_metered_confirmation() {
            let answer = self.inner.prompter().confirm(Prompt::MeteredNetwork).await;
            if !self.inner.host().is_alive() {
                debug!("host closed during network prompt, dropping answer");
                return BatchReport::abandoned(count);
            }
            if !answer.is_accepted() {
                info!(outcome = ?answer, "metered batch download not confirmed");
                return BatchReport::declined(count);
            }
        }

        let submissions: Vec<_> = tracks
            .into_iter()
            .map(|track| {
                let enqueuer = Arc::clone(&self.inner);
                tokio::spawn(
                    async move { enqueuer.enqueue(Some(&track), EnqueueMode::Batch).await }
                        .instrument(Span::current()),
                )
            })
            .collect();

        self.inner.notifier().show(&Notice::BatchAdded { count });

        let mut outcomes = Vec::with_capacity(count);
        for submission in submissions {
            outcomes.push(match submission.await {
                Ok(result) => result,
                Err(join_error) => Err(EnqueueError::Aborted(join_error.to_string())),
            });
        }

        let report = BatchReport {
            requested: count,
            outcomes,
            ..BatchReport::default()
        };
        info!(
            started = report.started(),
            failed = report.failed(),
            "batch processed"
        );
        report
    }
}
