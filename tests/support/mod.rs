//! Test doubles shared by the integration tests.
//!
//! Each integration test binary compiles this module on its own, so not every
//! helper is used everywhere.
#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use track_downloader::{
    Collaborators, DownloadEnqueuer, DownloadTask, LocalStore, MetadataResolver, Notice, Notifier,
    HostLifetime, PolicySettings, Prompt, PromptOutcome, Prompter, ResolveError, StaticNetworkStatus,
    StoreError, TaskId, TaskRegistration, TaskStatus, TaskTracker, TrackDescriptor,
    TrackerError, TransferEngine, TransferError, TransferHandle, task_id_for,
};

pub const STREAM_BASE: &str = "https://stream.example.com/audio";

/// Resolver that fills in `{STREAM_BASE}/{id}.mp3` unless told otherwise.
#[derive(Default)]
pub struct FakeResolver {
    overrides: Mutex<Vec<(String, Result<Option<String>, ResolveError>)>>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every resolution sleeps for `delay` first.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Resolves `track_id` to `uri` (`None` leaves the address empty).
    pub fn set_uri(&self, track_id: &str, uri: Option<&str>) {
        self.overrides
            .lock()
            .unwrap()
            .push((track_id.to_string(), Ok(uri.map(str::to_string))));
    }

    pub fn set_error(&self, track_id: &str, error: ResolveError) {
        self.overrides
            .lock()
            .unwrap()
            .push((track_id.to_string(), Err(error)));
    }
}

#[async_trait]
impl MetadataResolver for FakeResolver {
    async fn resolve(&self, track: &TrackDescriptor) -> Result<TrackDescriptor, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let override_result = self
            .overrides
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, _)| id == &track.id)
            .map(|(_, result)| result.clone());

        let mut resolved = track.clone();
        match override_result {
            Some(Ok(uri)) => resolved.uri = uri,
            Some(Err(error)) => return Err(error),
            None => resolved.uri = Some(format!("{STREAM_BASE}/{}.mp3", track.id)),
        }
        Ok(resolved)
    }
}

/// In-memory tracker with the same "one active task per track" rule as the
/// SQLite tracker.
#[derive(Default)]
pub struct MemoryTracker {
    active: Mutex<HashSet<String>>,
    pub registered: Mutex<Vec<DownloadTask>>,
    pub notified: Mutex<Vec<TaskId>>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered_track_ids(&self) -> Vec<String> {
        self.registered
            .lock()
            .unwrap()
            .iter()
            .map(|task| task.track_id.clone())
            .collect()
    }

    pub fn finish(&self, track_id: &str) {
        self.active.lock().unwrap().remove(track_id);
    }
}

#[async_trait]
impl TaskTracker for MemoryTracker {
    async fn register(
        &self,
        registration: &TaskRegistration<'_>,
    ) -> Result<Option<DownloadTask>, TrackerError> {
        if !self
            .active
            .lock()
            .unwrap()
            .insert(registration.track_id.to_string())
        {
            return Ok(None);
        }
        let task = DownloadTask {
            task_id: registration.task_id,
            track_id: registration.track_id.to_string(),
            title: registration.title.to_string(),
            uri: registration.uri.to_string(),
            destination_str: registration.destination.to_string_lossy().into_owned(),
            status_str: TaskStatus::Queued.as_str().to_string(),
            last_error: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        self.registered.lock().unwrap().push(task.clone());
        Ok(Some(task))
    }

    fn notify_observers(&self, task: &DownloadTask) {
        self.notified.lock().unwrap().push(task.task_id);
    }
}

/// Engine whose handles only count how often they were created and started.
///
/// With `reject` set it refuses every address the way the HTTP engine
/// refuses an unparsable URL.
#[derive(Default)]
pub struct CountingEngine {
    pub created: Arc<AtomicUsize>,
    pub started: Arc<AtomicUsize>,
    pub destinations: Mutex<Vec<String>>,
    pub reject: AtomicBool,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl TransferEngine for CountingEngine {
    fn create_transfer(
        &self,
        track_id: &str,
        uri: &str,
        destination: &Path,
    ) -> Result<Box<dyn TransferHandle>, TransferError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(TransferError::invalid_url(uri));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        self.destinations
            .lock()
            .unwrap()
            .push(destination.to_string_lossy().into_owned());
        Ok(Box::new(CountingHandle {
            task_id: task_id_for(track_id, uri, destination),
            started: Arc::clone(&self.started),
        }))
    }
}

struct CountingHandle {
    task_id: TaskId,
    started: Arc<AtomicUsize>,
}

impl TransferHandle for CountingHandle {
    fn task_id(&self) -> TaskId {
        self.task_id
    }

    fn start(self: Box<Self>) -> Result<(), TransferError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub upserts: Mutex<Vec<(String, bool)>>,
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn upsert(&self, track: &TrackDescriptor, favorite_update: bool) -> Result<(), StoreError> {
        self.upserts
            .lock()
            .unwrap()
            .push((track.id.clone(), favorite_update));
        Ok(())
    }
}

/// Records every notice in order.
#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn count(&self, wanted: &Notice) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|notice| *notice == wanted)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

/// Answers prompts from a script, falling back to a default answer.
pub struct ScriptedPrompter {
    script: Mutex<VecDeque<PromptOutcome>>,
    fallback: PromptOutcome,
    pub asked: Mutex<Vec<Prompt>>,
    closes_host: Mutex<Option<(Prompt, HostLifetime)>>,
}

impl ScriptedPrompter {
    pub fn always(answer: PromptOutcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: answer,
            asked: Mutex::new(Vec::new()),
            closes_host: Mutex::new(None),
        }
    }

    pub fn answers(answers: &[PromptOutcome]) -> Self {
        Self {
            script: Mutex::new(answers.iter().copied().collect()),
            fallback: PromptOutcome::Dismissed,
            asked: Mutex::new(Vec::new()),
            closes_host: Mutex::new(None),
        }
    }

    pub fn asked(&self) -> Vec<Prompt> {
        self.asked.lock().unwrap().clone()
    }

    /// Closes `host` while `prompt` is on screen, before answering it.
    pub fn close_host_on(&self, prompt: Prompt, host: HostLifetime) {
        *self.closes_host.lock().unwrap() = Some((prompt, host));
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, prompt: Prompt) -> PromptOutcome {
        if let Some((trigger, host)) = self.closes_host.lock().unwrap().as_ref()
            && *trigger == prompt
        {
            host.close();
        }
        self.asked.lock().unwrap().push(prompt);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback)
    }
}

/// An enqueuer wired to test doubles, with handles kept for assertions.
pub struct Harness {
    pub resolver: Arc<FakeResolver>,
    pub tracker: Arc<MemoryTracker>,
    pub engine: Arc<CountingEngine>,
    pub store: Arc<MemoryStore>,
    pub network: Arc<StaticNetworkStatus>,
    pub settings: Arc<PolicySettings>,
    pub notifier: Arc<RecordingNotifier>,
    pub prompter: Arc<ScriptedPrompter>,
}

impl Harness {
    /// Wi-Fi connected, Wi-Fi required, every prompt accepted.
    pub fn new() -> Self {
        Self::with_parts(
            FakeResolver::new(),
            ScriptedPrompter::always(PromptOutcome::Accepted),
        )
    }

    pub fn with_parts(resolver: FakeResolver, prompter: ScriptedPrompter) -> Self {
        Self {
            resolver: Arc::new(resolver),
            tracker: Arc::new(MemoryTracker::new()),
            engine: Arc::new(CountingEngine::new()),
            store: Arc::new(MemoryStore::default()),
            network: Arc::new(StaticNetworkStatus::new(true)),
            settings: Arc::new(PolicySettings::new(true)),
            notifier: Arc::new(RecordingNotifier::default()),
            prompter: Arc::new(prompter),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            resolver: self.resolver.clone(),
            tracker: self.tracker.clone(),
            engine: self.engine.clone(),
            store: self.store.clone(),
            network: self.network.clone(),
            settings: self.settings.clone(),
            notifier: self.notifier.clone(),
            prompter: self.prompter.clone(),
        }
    }

    pub fn enqueuer(&self, download_dir: &str) -> Arc<DownloadEnqueuer> {
        Arc::new(DownloadEnqueuer::new(self.collaborators(), download_dir))
    }
}
