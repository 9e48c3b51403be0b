//! Wiring of concrete collaborators for one CLI run.

use std::sync::Arc;

use anyhow::{Context, Result};
use track_downloader::{
    Collaborators, Database, DownloadEnqueuer, HttpMetadataResolver, HttpTransferEngine,
    MetadataResolver, PassthroughResolver, PolicySettings, PromptOutcome, Prompter,
    SqliteTaskTracker, SqliteTrackStore, StaticNetworkStatus, TaskEvent,
};
use tracing::{debug, info};

use super::console::{AutoPrompter, ConsoleNotifier, ConsolePrompter};
use super::settings::Settings;

pub(crate) async fn open_database(settings: &Settings) -> Result<Database> {
    if let Some(parent) = settings.db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory '{}'", parent.display())
        })?;
    }
    let db = Database::new_with_options(&settings.db_path, settings.db_options)
        .await
        .with_context(|| format!("Failed to open database '{}'", settings.db_path.display()))?;
    debug!(path = %settings.db_path.display(), "database ready");
    Ok(db)
}

pub(crate) fn notifier(settings: &Settings) -> Arc<ConsoleNotifier> {
    Arc::new(ConsoleNotifier::new(settings.quiet))
}

pub(crate) fn prompter(settings: &Settings) -> Arc<dyn Prompter> {
    if settings.assume_yes {
        Arc::new(AutoPrompter(PromptOutcome::Accepted))
    } else {
        Arc::new(ConsolePrompter)
    }
}

/// Everything an enqueue command needs, kept alive for the whole run.
pub(crate) struct EnqueueRuntime {
    pub(crate) tracker: Arc<SqliteTaskTracker>,
    pub(crate) engine: Arc<HttpTransferEngine>,
    pub(crate) enqueuer: Arc<DownloadEnqueuer>,
}

pub(crate) fn build_enqueue_runtime(settings: &Settings, db: Database) -> Result<EnqueueRuntime> {
    let tracker = Arc::new(SqliteTaskTracker::new(db.clone()));
    tracker.subscribe(Arc::new(|event: &TaskEvent| match event {
        TaskEvent::Registered(task) => {
            info!(task_id = task.task_id, title = %task.title, "task registered");
        }
        TaskEvent::StatusChanged {
            task_id,
            status,
            error,
        } => info!(task_id, %status, error = error.as_deref().unwrap_or(""), "task status changed"),
    }));

    let engine = Arc::new(
        HttpTransferEngine::with_timeouts(
            settings.timeouts.transfer_connect_secs,
            settings.timeouts.transfer_read_secs,
        )?
        .with_listener(tracker.clone()),
    );

    let resolver: Arc<dyn MetadataResolver> = match &settings.resolver_url {
        Some(url) => Arc::new(HttpMetadataResolver::with_timeouts(
            url,
            settings.timeouts.resolver_connect_secs,
            settings.timeouts.resolver_read_secs,
        )?),
        None => Arc::new(PassthroughResolver::new()),
    };

    let collaborators = Collaborators {
        resolver,
        tracker: tracker.clone(),
        engine: engine.clone(),
        store: Arc::new(SqliteTrackStore::new(db)),
        network: Arc::new(StaticNetworkStatus::new(settings.wifi_connected)),
        settings: Arc::new(PolicySettings::new(settings.require_wifi)),
        notifier: notifier(settings),
        prompter: prompter(settings),
    };

    Ok(EnqueueRuntime {
        tracker,
        engine,
        enqueuer: Arc::new(DownloadEnqueuer::new(
            collaborators,
            settings.download_dir.clone(),
        )),
    })
}
