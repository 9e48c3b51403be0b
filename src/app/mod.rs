//! Command execution for the `track-downloader` binary.

mod catalog;
mod console;
mod runtime;
mod settings;

use std::path::Path;

use anyhow::{Result, bail};
use track_downloader::{
    BatchDownloadEnqueuer, EnqueueMode, EnqueueOutcome, LocalTrackRemover, SqliteTaskTracker,
    TaskId, TaskStatus,
};
use tracing::{info, warn};

use crate::app_config::FileConfig;
use crate::cli::{Args, Command};

pub(crate) use settings::default_log_level;
use settings::Settings;

pub(crate) async fn run(args: Args, file_config: &FileConfig) -> Result<()> {
    let settings = settings::resolve_settings(&args, file_config);

    let Some(command) = args.command else {
        info!("No command given. Run with --help to see available commands.");
        return Ok(());
    };

    match command {
        Command::Enqueue { catalog, id } => enqueue_one(&settings, &catalog, &id).await,
        Command::Batch { catalog, ids } => enqueue_batch(&settings, &catalog, &ids).await,
        Command::Tasks { status } => list_tasks(&settings, status).await,
        Command::Remove { catalog, ids } => remove_local(&settings, &catalog, &ids).await,
    }
}

async fn enqueue_one(settings: &Settings, catalog_path: &Path, id: &str) -> Result<()> {
    let tracks = catalog::load_catalog(catalog_path)?;
    let track = catalog::find_track(&tracks, id)?;

    let db = runtime::open_database(settings).await?;
    let rt = runtime::build_enqueue_runtime(settings, db)?;

    let outcome = rt
        .enqueuer
        .enqueue(Some(track), EnqueueMode::Single)
        .await?;

    match outcome {
        EnqueueOutcome::Started(task) => {
            rt.engine.wait_all().await;
            report_finished(&rt.tracker, task.task_id).await
        }
        EnqueueOutcome::Duplicate => {
            info!(track_id = %id, "track already has an active download");
            Ok(())
        }
        EnqueueOutcome::Declined | EnqueueOutcome::Abandoned => {
            info!(track_id = %id, "download not started");
            Ok(())
        }
    }
}

async fn enqueue_batch(
    settings: &Settings,
    catalog_path: &Path,
    ids: &[String],
) -> Result<()> {
    let tracks = catalog::load_catalog(catalog_path)?;
    let selected = catalog::select_tracks(&tracks, ids)?;

    let db = runtime::open_database(settings).await?;
    let rt = runtime::build_enqueue_runtime(settings, db)?;

    let report = BatchDownloadEnqueuer::new(rt.enqueuer.clone())
        .enqueue_batch(selected)
        .await;
    let finished = rt.engine.wait_all().await;

    info!(
        requested = report.requested,
        started = report.started(),
        failed = report.failed(),
        declined = report.declined,
        abandoned = report.abandoned,
        finished,
        "batch finished"
    );

    for started in report.outcomes.iter().filter_map(|outcome| match outcome {
        Ok(EnqueueOutcome::Started(task)) => Some(task.task_id),
        _ => None,
    }) {
        if let Some(task) = rt.tracker.get(started).await?
            && task.status() == TaskStatus::Failed
        {
            warn!(
                task_id = task.task_id,
                title = %task.title,
                error = task.last_error.as_deref().unwrap_or(""),
                "download failed"
            );
        }
    }

    if report.failed() > 0 {
        bail!(
            "{} of {} track(s) could not be queued",
            report.failed(),
            report.requested
        );
    }
    Ok(())
}

async fn report_finished(tracker: &SqliteTaskTracker, task_id: TaskId) -> Result<()> {
    let Some(task) = tracker.get(task_id).await? else {
        bail!("Task {task_id} disappeared from the tracker");
    };
    if task.status() == TaskStatus::Failed {
        bail!(
            "Download of '{}' failed: {}",
            task.title,
            task.last_error.as_deref().unwrap_or("unknown error")
        );
    }
    info!(path = %task.destination().display(), "download finished");
    Ok(())
}

async fn list_tasks(settings: &Settings, status: Option<TaskStatus>) -> Result<()> {
    let db = runtime::open_database(settings).await?;
    let tracker = SqliteTaskTracker::new(db);

    let tasks = match status {
        Some(status) => tracker.list_by_status(status).await?,
        None => tracker.list().await?,
    };

    if tasks.is_empty() {
        println!("No download tasks");
        return Ok(());
    }
    for task in &tasks {
        println!("{task}");
    }
    Ok(())
}

async fn remove_local(
    settings: &Settings,
    catalog_path: &Path,
    ids: &[String],
) -> Result<()> {
    let tracks = catalog::load_catalog(catalog_path)?;
    let selected = catalog::select_tracks(&tracks, ids)?;
    let remover = LocalTrackRemover::new(runtime::notifier(settings), runtime::prompter(settings));

    if let [track] = selected.as_slice() {
        remover.remove(Some(track)).await?;
        return Ok(());
    }

    let results = remover.remove_batch(&selected).await;
    let failed = results.iter().filter(|result| result.is_err()).count();
    if failed > 0 {
        bail!("{failed} of {} file(s) could not be deleted", selected.len());
    }
    Ok(())
}
