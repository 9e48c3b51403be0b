//! HTTP streaming transfer engine.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use super::{
    CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, TransferEngine, TransferError, TransferHandle,
    TransferListener, task_id_for,
};
use crate::tracker::{TaskId, TaskStatus};
use crate::user_agent::transfer_user_agent;

type RunningSet = Arc<Mutex<JoinSet<()>>>;

/// Streams audio over HTTP into destination files.
///
/// Transfers run as Tokio tasks owned by the engine. Call
/// [`wait_all`](Self::wait_all) before shutting the runtime down.
pub struct HttpTransferEngine {
    client: Client,
    listener: Option<Arc<dyn TransferListener>>,
    running: RunningSet,
}

impl HttpTransferEngine {
    /// Creates an engine with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Client`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, TransferError> {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates an engine with explicit timeouts in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Client`] if the HTTP client cannot be built.
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, TransferError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .user_agent(transfer_user_agent())
            .gzip(true)
            .build()
            .map_err(|e| TransferError::Client(e.to_string()))?;

        Ok(Self {
            client,
            listener: None,
            running: Arc::new(Mutex::new(JoinSet::new())),
        })
    }

    /// Reports status changes of every transfer to `listener`.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn TransferListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Waits for every started transfer to finish.
    ///
    /// Returns how many transfers were awaited.
    pub async fn wait_all(&self) -> usize {
        let mut finished = 0;
        loop {
            let mut set = std::mem::take(&mut *lock_running(&self.running));
            if set.is_empty() {
                return finished;
            }
            while let Some(joined) = set.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "transfer task ended abnormally");
                }
                finished += 1;
            }
        }
    }

    /// Number of transfers started and not yet awaited.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock_running(&self.running).len()
    }
}

impl std::fmt::Debug for HttpTransferEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransferEngine")
            .field("has_listener", &self.listener.is_some())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl TransferEngine for HttpTransferEngine {
    fn create_transfer(
        &self,
        track_id: &str,
        uri: &str,
        destination: &Path,
    ) -> Result<Box<dyn TransferHandle>, TransferError> {
        Url::parse(uri).map_err(|_| TransferError::invalid_url(uri))?;

        Ok(Box::new(HttpTransferHandle {
            task_id: task_id_for(track_id, uri, destination),
            uri: uri.to_string(),
            destination: destination.to_path_buf(),
            client: self.client.clone(),
            listener: self.listener.clone(),
            running: Arc::clone(&self.running),
        }))
    }
}

struct HttpTransferHandle {
    task_id: TaskId,
    uri: String,
    destination: PathBuf,
    client: Client,
    listener: Option<Arc<dyn TransferListener>>,
    running: RunningSet,
}

impl TransferHandle for HttpTransferHandle {
    fn task_id(&self) -> TaskId {
        self.task_id
    }

    fn start(self: Box<Self>) -> Result<(), TransferError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TransferError::NoRuntime)?;
        let span = info_span!("transfer", task_id = self.task_id, uri = %self.uri);
        let running = Arc::clone(&self.running);
        lock_running(&running).spawn_on(self.run().instrument(span), &runtime);
        Ok(())
    }
}

impl HttpTransferHandle {
    async fn run(self) {
        self.report(TaskStatus::Running, None).await;
        match transfer(&self.client, &self.uri, &self.destination).await {
            Ok(bytes) => {
                info!(path = %self.destination.display(), bytes, "transfer complete");
                self.report(TaskStatus::Done, None).await;
            }
            Err(e) => {
                warn!(error = %e, "transfer failed");
                let message = e.to_string();
                self.report(TaskStatus::Failed, Some(&message)).await;
            }
        }
    }

    async fn report(&self, status: TaskStatus, error: Option<&str>) {
        if let Some(listener) = &self.listener {
            listener.on_status(self.task_id, status, error).await;
        }
    }
}

fn lock_running(running: &RunningSet) -> MutexGuard<'_, JoinSet<()>> {
    match running.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

async fn transfer(client: &Client, uri: &str, destination: &Path) -> Result<u64, TransferError> {
    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TransferError::io(parent, e))?;
    }

    let response = client
        .get(uri)
        .send()
        .await
        .map_err(|e| TransferError::network(uri, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransferError::http_status(uri, status.as_u16()));
    }

    // Same artist and title means same file; the newer transfer overwrites.
    let mut file = File::create(destination)
        .await
        .map_err(|e| TransferError::io(destination, e))?;

    let stream_result = stream_to_file(&mut file, response, uri, destination).await;
    if stream_result.is_err() {
        debug!(path = %destination.display(), "cleaning up partial file after error");
        let _ = tokio::fs::remove_file(destination).await;
    }
    stream_result
}

async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    uri: &str,
    destination: &Path,
) -> Result<u64, TransferError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| TransferError::network(uri, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| TransferError::io(destination, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| TransferError::io(destination, e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct RecordingListener {
        seen: Mutex<Vec<(TaskId, TaskStatus, Option<String>)>>,
    }

    #[async_trait]
    impl TransferListener for RecordingListener {
        async fn on_status(&self, task_id: TaskId, status: TaskStatus, error: Option<&str>) {
            self.seen
                .lock()
                .unwrap()
                .push((task_id, status, error.map(str::to_string)));
        }
    }

    #[test]
    fn test_create_transfer_rejects_invalid_url() {
        let engine = HttpTransferEngine::new().unwrap();
        let result = engine.create_transfer("t1", "http//broken", Path::new("/tmp/a.mp3"));
        assert!(matches!(result, Err(TransferError::InvalidUrl { .. })));
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let engine = HttpTransferEngine::new().unwrap();
        let handle = engine
            .create_transfer("t1", "https://cdn.example.com/a.mp3", Path::new("/tmp/a.mp3"))
            .unwrap();
        assert!(matches!(handle.start(), Err(TransferError::NoRuntime)));
    }

    #[test]
    fn test_handle_task_id_matches_helper() {
        let engine = HttpTransferEngine::new().unwrap();
        let dest = Path::new("/tmp/a.mp3");
        let handle = engine
            .create_transfer("t1", "https://cdn.example.com/a.mp3", dest)
            .unwrap();
        assert_eq!(
            handle.task_id(),
            task_id_for("t1", "https://cdn.example.com/a.mp3", dest)
        );
    }

    #[tokio::test]
    async fn test_transfer_writes_file_and_reports_done() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/children.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 audio".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nested").join("Robert Miles - Children.mp3");
        let listener = Arc::new(RecordingListener::default());
        let engine = HttpTransferEngine::new()
            .unwrap()
            .with_listener(listener.clone());

        let uri = format!("{}/children.mp3", server.uri());
        let handle = engine.create_transfer("t1", &uri, &dest).unwrap();
        let task_id = handle.task_id();
        handle.start().unwrap();

        assert_eq!(engine.wait_all().await, 1);
        assert_eq!(std::fs::read(&dest).unwrap(), b"ID3 audio");
        assert_eq!(
            *listener.seen.lock().unwrap(),
            vec![
                (task_id, TaskStatus::Running, None),
                (task_id, TaskStatus::Done, None),
            ]
        );
    }

    #[tokio::test]
    async fn test_transfer_http_error_reports_failed_without_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.mp3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("missing.mp3");
        let listener = Arc::new(RecordingListener::default());
        let engine = HttpTransferEngine::new()
            .unwrap()
            .with_listener(listener.clone());

        let uri = format!("{}/missing.mp3", server.uri());
        engine.create_transfer("t1", &uri, &dest).unwrap().start().unwrap();
        engine.wait_all().await;

        assert!(!dest.exists());
        let seen = listener.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].1, TaskStatus::Failed);
        assert!(seen[1].2.as_deref().unwrap().contains("HTTP 404"));
    }

    #[tokio::test]
    async fn test_wait_all_with_nothing_started() {
        let engine = HttpTransferEngine::new().unwrap();
        assert_eq!(engine.wait_all().await, 0);
        assert_eq!(engine.pending(), 0);
    }
}
