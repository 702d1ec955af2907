//! Hand-written fakes for controller tests.
//!
//! Each fake records its calls and can hold an async step in flight with a
//! [`Gate`] so a test can observe intermediate phases.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::{
    ActorContext, Attachment, AudioSessionMode, AuthContext, BridgeError, CacheResolution,
    DownloadPolicy, EngineStatus, MediaStore, PlaybackEngine, StatusListener, UserIdentity,
    WakeLock,
};
use core_playback::{
    AttachmentController, ControllerContext, KeepAwake, MountOptions, Phase, PlaybackState,
};
use core_runtime::PlaybackBroadcast;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};

pub const WAIT: Duration = Duration::from_secs(2);
pub const BASE_URL: &str = "https://chat.example.com";

// ============================================================================
// Gate
// ============================================================================

/// Blocks `pass()` until the test hands out permits.
pub struct Gate {
    permits: Semaphore,
    waiting: AtomicUsize,
}

impl Gate {
    /// Every `pass()` returns immediately.
    pub fn open() -> Arc<Self> {
        Arc::new(Self {
            permits: Semaphore::new(Semaphore::MAX_PERMITS),
            waiting: AtomicUsize::new(0),
        })
    }

    /// Every `pass()` waits for `release`.
    pub fn closed() -> Arc<Self> {
        Arc::new(Self {
            permits: Semaphore::new(0),
            waiting: AtomicUsize::new(0),
        })
    }

    pub async fn pass(&self) {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }

    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    /// Wait until someone is blocked on this gate.
    pub async fn wait_for_waiter(&self) {
        tokio::time::timeout(WAIT, async {
            while self.waiting() == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("nobody reached the gate");
    }
}

// ============================================================================
// MediaStore
// ============================================================================

pub struct FakeMediaStore {
    cached: Mutex<bool>,
    resolve_error: Mutex<Option<String>>,
    download_results: Mutex<VecDeque<Result<String>>>,
    pub resolve_gate: Mutex<Arc<Gate>>,
    pub download_gate: Mutex<Arc<Gate>>,
    pub resolve_calls: Mutex<Vec<(String, Option<String>)>>,
    pub download_calls: Mutex<Vec<(String, String)>>,
}

impl FakeMediaStore {
    pub fn cached() -> Arc<Self> {
        Arc::new(Self::with_cached(true))
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::with_cached(false))
    }

    fn with_cached(cached: bool) -> Self {
        Self {
            cached: Mutex::new(cached),
            resolve_error: Mutex::new(None),
            download_results: Mutex::new(VecDeque::new()),
            resolve_gate: Mutex::new(Gate::open()),
            download_gate: Mutex::new(Gate::open()),
            resolve_calls: Mutex::new(Vec::new()),
            download_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_resolve(&self, message: &str) {
        *self.resolve_error.lock() = Some(message.to_string());
    }

    /// Queue the outcome of the next download. Without one, downloads succeed.
    pub fn push_download_result(&self, result: Result<String>) {
        self.download_results.lock().push_back(result);
    }

    pub fn gate_resolve(&self) -> Arc<Gate> {
        let gate = Gate::closed();
        *self.resolve_gate.lock() = Arc::clone(&gate);
        gate
    }

    pub fn gate_download(&self) -> Arc<Gate> {
        let gate = Gate::closed();
        *self.download_gate.lock() = Arc::clone(&gate);
        gate
    }

    pub fn download_count(&self) -> usize {
        self.download_calls.lock().len()
    }

    pub fn local_path(attachment_id: &str) -> String {
        format!("/cache/chat.example.com/audio/{}.m4a", attachment_id)
    }
}

#[async_trait]
impl MediaStore for FakeMediaStore {
    async fn resolve(&self, attachment_id: &str, mime_type: Option<&str>) -> Result<CacheResolution> {
        self.resolve_calls
            .lock()
            .push((attachment_id.to_string(), mime_type.map(str::to_string)));
        let gate = Arc::clone(&*self.resolve_gate.lock());
        gate.pass().await;

        if let Some(message) = self.resolve_error.lock().clone() {
            return Err(BridgeError::Filesystem(message));
        }
        let path = Self::local_path(attachment_id);
        if *self.cached.lock() {
            Ok(CacheResolution::hit(path))
        } else {
            Ok(CacheResolution::miss(path))
        }
    }

    async fn download(&self, url: &str, destination: &str, _auth: &AuthContext) -> Result<String> {
        self.download_calls
            .lock()
            .push((url.to_string(), destination.to_string()));
        let gate = Arc::clone(&*self.download_gate.lock());
        gate.pass().await;

        let result = self
            .download_results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("file://{}", destination)));
        if result.is_ok() {
            *self.cached.lock() = true;
        }
        result
    }
}

// ============================================================================
// DownloadPolicy
// ============================================================================

pub struct FakePolicy {
    answer: Mutex<Result<bool>>,
    pub calls: AtomicUsize,
}

impl FakePolicy {
    pub fn allow() -> Arc<Self> {
        Self::answering(Ok(true))
    }

    pub fn deny() -> Arc<Self> {
        Self::answering(Ok(false))
    }

    pub fn failing() -> Arc<Self> {
        Self::answering(Err(BridgeError::OperationFailed("settings locked".into())))
    }

    fn answering(answer: Result<bool>) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(answer),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DownloadPolicy for FakePolicy {
    async fn should_auto_download(&self, _: &Attachment, _: &ActorContext) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.answer.lock() {
            Ok(answer) => Ok(*answer),
            Err(err) => Err(BridgeError::OperationFailed(err.to_string())),
        }
    }
}

// ============================================================================
// PlaybackEngine
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Load(String),
    Play,
    Pause,
    Seek(f64),
    Stop,
    SessionMode(AudioSessionMode),
}

#[derive(Default)]
pub struct FakeEngine {
    listener: Mutex<Option<StatusListener>>,
    pub calls: Mutex<Vec<EngineCall>>,
    fail_load: Mutex<usize>,
    fail_play: Mutex<usize>,
    fail_pause: Mutex<usize>,
    fail_seek: Mutex<bool>,
    fail_stop: Mutex<bool>,
    fail_session: Mutex<bool>,
    load_gate: Mutex<Option<Arc<Gate>>>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Push a status update as the native player would.
    pub fn emit(&self, status: EngineStatus) {
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(status);
        }
    }

    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    pub fn fail_next_loads(&self, n: usize) {
        *self.fail_load.lock() = n;
    }

    pub fn fail_next_plays(&self, n: usize) {
        *self.fail_play.lock() = n;
    }

    pub fn fail_next_pauses(&self, n: usize) {
        *self.fail_pause.lock() = n;
    }

    pub fn fail_seeks(&self) {
        *self.fail_seek.lock() = true;
    }

    pub fn fail_stops(&self) {
        *self.fail_stop.lock() = true;
    }

    pub fn fail_session_mode(&self) {
        *self.fail_session.lock() = true;
    }

    pub fn gate_load(&self) -> Arc<Gate> {
        let gate = Gate::closed();
        *self.load_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &EngineCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                EngineCall::Seek(position) => Some(*position),
                _ => None,
            })
            .collect()
    }

    pub fn loads(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                EngineCall::Load(uri) => Some(uri.clone()),
                _ => None,
            })
            .collect()
    }

    fn take_failure(counter: &Mutex<usize>) -> bool {
        let mut remaining = counter.lock();
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl PlaybackEngine for FakeEngine {
    fn set_status_listener(&self, listener: Option<StatusListener>) {
        *self.listener.lock() = listener;
    }

    async fn load(&self, uri: &str) -> Result<()> {
        self.calls.lock().push(EngineCall::Load(uri.to_string()));
        let gate = self.load_gate.lock().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if Self::take_failure(&self.fail_load) {
            return Err(BridgeError::Engine("unsupported codec".into()));
        }
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.calls.lock().push(EngineCall::Play);
        if Self::take_failure(&self.fail_play) {
            return Err(BridgeError::Engine("audio session interrupted".into()));
        }
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.calls.lock().push(EngineCall::Pause);
        if Self::take_failure(&self.fail_pause) {
            return Err(BridgeError::Engine("pause rejected".into()));
        }
        Ok(())
    }

    async fn seek(&self, position_seconds: f64) -> Result<()> {
        self.calls.lock().push(EngineCall::Seek(position_seconds));
        if *self.fail_seek.lock() {
            return Err(BridgeError::Engine("seek rejected".into()));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.calls.lock().push(EngineCall::Stop);
        if *self.fail_stop.lock() {
            return Err(BridgeError::Engine("already released".into()));
        }
        Ok(())
    }

    async fn set_session_mode(&self, mode: &AudioSessionMode) -> Result<()> {
        self.calls.lock().push(EngineCall::SessionMode(*mode));
        if *self.fail_session.lock() {
            return Err(BridgeError::Engine("session busy".into()));
        }
        Ok(())
    }
}

// ============================================================================
// WakeLock
// ============================================================================

#[derive(Default)]
pub struct FakeWakeLock {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    held: Mutex<bool>,
}

impl FakeWakeLock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_held(&self) -> bool {
        *self.held.lock()
    }
}

impl WakeLock for FakeWakeLock {
    fn acquire(&self) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        *self.held.lock() = true;
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
        *self.held.lock() = false;
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Shared collaborators for one test.
pub struct Harness {
    pub store: Arc<FakeMediaStore>,
    pub policy: Arc<FakePolicy>,
    pub wake_lock: Arc<FakeWakeLock>,
    pub keep_awake: KeepAwake,
    pub broadcast: PlaybackBroadcast,
}

impl Harness {
    pub fn new(store: Arc<FakeMediaStore>, policy: Arc<FakePolicy>) -> Self {
        let wake_lock = FakeWakeLock::new();
        Self {
            store,
            policy,
            keep_awake: KeepAwake::new(wake_lock.clone()),
            wake_lock,
            broadcast: PlaybackBroadcast::new(),
        }
    }

    pub fn context(&self) -> ControllerContext {
        let me = UserIdentity::new("u-me", "alice");
        let author = UserIdentity::new("u-other", "bob");
        ControllerContext::new(
            self.store.clone(),
            self.policy.clone(),
            self.keep_awake.clone(),
            ActorContext::new(me, Some(author)),
            AuthContext::new("u-me", "secret-token"),
        )
        .with_broadcast(self.broadcast.clone())
        .with_server_base_url(BASE_URL)
    }

    pub fn mount(&self, attachment_id: &str) -> (AttachmentController, Arc<FakeEngine>) {
        self.mount_with(audio_attachment(attachment_id), MountOptions::default())
    }

    pub fn mount_with(
        &self,
        attachment: Attachment,
        options: MountOptions,
    ) -> (AttachmentController, Arc<FakeEngine>) {
        let engine = FakeEngine::new();
        let controller =
            AttachmentController::mount(attachment, self.context(), engine.clone(), options)
                .expect("mount inside runtime");
        (controller, engine)
    }
}

pub fn audio_attachment(id: &str) -> Attachment {
    Attachment::new(id, Some(format!("/file-upload/{}/voice.m4a", id))).with_mime_type("audio/mp4")
}

/// Wait until the controller reaches `phase`, panicking after [`WAIT`].
pub async fn wait_for_phase(controller: &AttachmentController, phase: Phase) -> PlaybackState {
    let mut rx = controller.subscribe();
    wait_until(&mut rx, |state| state.phase == phase).await
}

pub async fn wait_until(
    rx: &mut watch::Receiver<PlaybackState>,
    predicate: impl FnMut(&PlaybackState) -> bool,
) -> PlaybackState {
    let result = tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .map(|waited| waited.map(|state| *state));
    match result {
        Ok(Ok(state)) => state,
        Ok(Err(_)) => panic!("controller state channel closed"),
        Err(_) => panic!("timed out, last state: {:?}", *rx.borrow()),
    }
}

/// Let spawned tasks run until the queue is drained.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Poll `condition` until it holds, panicking after [`WAIT`].
///
/// For outcomes that publish no state change (a failed play leaves the
/// phase untouched).
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached");
}
