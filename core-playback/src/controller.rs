//! # Attachment Controller
//!
//! Per-attachment state machine driving cache lookup, optional download,
//! engine load and play/pause/seek, plus teardown.
//!
//! ## Overview
//!
//! ```text
//!            press / seek                 spawned ops (resolve, policy, download, load)
//! host ────────────────────┐        ┌──────────────────────────────────────┐
//!                          ▼        ▼                                      │
//!                   ┌─────────────────────┐   handle_event   ┌─────────────┴──┐
//!   engine status ─>│ ordered event queue ├─────────────────>│ ControllerActor │
//!   broadcast    ──>│   (mpsc, unbounded) │                  │  (one task)     │
//!                   └─────────────────────┘                  └───────┬────────┘
//!                                                                    │ watch
//!                                                                    ▼
//!                                                             PlaybackState
//! ```
//!
//! Every input funnels through one queue consumed by a single task, so
//! transitions apply strictly in the order their events were observed. Long
//! operations run in their own tasks and post their result back as an event;
//! a result is applied only if the controller is still in the phase that
//! started it.
//!
//! ## Mutual exclusion
//!
//! Before playing, a controller publishes on the [`PlaybackBroadcast`] and
//! then subscribes for as long as it stays in `Playing`. Whoever was playing
//! receives the signal and pauses without publishing again.
//!
//! ## Lifetime
//!
//! [`AttachmentController::destroy`] (or dropping the controller) cancels
//! every in-flight operation, drops the broadcast subscription, releases the
//! keep-awake hold and stops the engine. Engine errors during teardown are
//! swallowed.

use crate::attachment::resolve_remote_url;
use crate::error::{PlaybackError, Result};
use crate::keep_awake::{KeepAwake, KeepAwakeHold};
use crate::state::{Phase, PlaybackState};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    file_uri, ActorContext, Attachment, AudioSessionMode, AuthContext, CacheResolution,
    DownloadPolicy, EngineStatus, MediaStore, PlaybackEngine, StatusListener,
};
use core_runtime::logging::{redact_url, strip_path};
use core_runtime::{PlaybackBroadcast, Subscription};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, trace, warn, Instrument, Span};
use uuid::Uuid;

/// Identifies one mounted controller in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerId(Uuid);

impl ControllerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ControllerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-mount rendering options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MountOptions {
    /// Rendered inside a reply quote: resolves and loads, ignores presses and seeks.
    pub read_only: bool,
}

impl MountOptions {
    pub fn read_only() -> Self {
        Self { read_only: true }
    }
}

/// Collaborators shared by every controller in the process.
#[derive(Clone)]
pub struct ControllerContext {
    pub media_store: Arc<dyn MediaStore>,
    pub policy: Arc<dyn DownloadPolicy>,
    pub keep_awake: KeepAwake,
    pub broadcast: PlaybackBroadcast,
    pub actor: ActorContext,
    pub auth: AuthContext,
    /// Prefix for server-relative attachment URLs.
    pub server_base_url: Option<String>,
    pub session_mode: AudioSessionMode,
}

impl ControllerContext {
    /// Context on the process-wide broadcast with the default session mode.
    pub fn new(
        media_store: Arc<dyn MediaStore>,
        policy: Arc<dyn DownloadPolicy>,
        keep_awake: KeepAwake,
        actor: ActorContext,
        auth: AuthContext,
    ) -> Self {
        Self {
            media_store,
            policy,
            keep_awake,
            broadcast: PlaybackBroadcast::global().clone(),
            actor,
            auth,
            server_base_url: None,
            session_mode: AudioSessionMode::default(),
        }
    }

    pub fn with_broadcast(mut self, broadcast: PlaybackBroadcast) -> Self {
        self.broadcast = broadcast;
        self
    }

    pub fn with_server_base_url(mut self, url: impl Into<String>) -> Self {
        self.server_base_url = Some(url.into());
        self
    }

    pub fn with_session_mode(mut self, mode: AudioSessionMode) -> Self {
        self.session_mode = mode;
        self
    }
}

impl fmt::Debug for ControllerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerContext")
            .field("broadcast", &self.broadcast)
            .field("keep_awake", &self.keep_awake)
            .field("actor", &self.actor)
            .field("auth", &self.auth)
            .field("server_base_url", &self.server_base_url)
            .field("session_mode", &self.session_mode)
            .finish_non_exhaustive()
    }
}

enum ControllerEvent {
    Press,
    Seek(f64),
    Resolved(BridgeResult<CacheResolution>),
    PolicyDecided(bool),
    Downloaded(BridgeResult<String>),
    Loaded(BridgeResult<()>),
    EngineStatus(EngineStatus),
    /// Broadcast received while subscribed; carries the subscription epoch.
    PauseRequested(u64),
}

impl ControllerEvent {
    fn name(&self) -> &'static str {
        match self {
            ControllerEvent::Press => "press",
            ControllerEvent::Seek(_) => "seek",
            ControllerEvent::Resolved(_) => "resolved",
            ControllerEvent::PolicyDecided(_) => "policy_decided",
            ControllerEvent::Downloaded(_) => "downloaded",
            ControllerEvent::Loaded(_) => "loaded",
            ControllerEvent::EngineStatus(_) => "engine_status",
            ControllerEvent::PauseRequested(_) => "pause_requested",
        }
    }
}

/// Handle to one mounted audio attachment.
///
/// Cheap accessors read the latest published [`PlaybackState`]; the two user
/// intents ([`press`](Self::press), [`seek`](Self::seek)) are queued and never
/// fail.
pub struct AttachmentController {
    id: ControllerId,
    attachment_id: String,
    events: mpsc::UnboundedSender<ControllerEvent>,
    state: watch::Receiver<PlaybackState>,
    torn_down: watch::Receiver<bool>,
    cancel: CancellationToken,
}

impl AttachmentController {
    /// Mount a controller and start resolving the attachment.
    ///
    /// The event loop is spawned on the ambient tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::Internal`] when called outside a tokio runtime.
    pub fn mount(
        attachment: Attachment,
        context: ControllerContext,
        engine: Arc<dyn PlaybackEngine>,
        options: MountOptions,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            PlaybackError::Internal(format!("AttachmentController needs a tokio runtime: {}", e))
        })?;

        let id = ControllerId::new();
        let span = info_span!(
            "audio_attachment",
            controller_id = %id,
            attachment_id = %attachment.id,
        );
        let remote_url = resolve_remote_url(context.server_base_url.as_deref(), &attachment);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PlaybackState::default());
        let (torn_down_tx, torn_down_rx) = watch::channel(false);
        let cancel = CancellationToken::new();

        let attachment_id = attachment.id.clone();
        let actor = ControllerActor {
            attachment,
            remote_url,
            context,
            engine,
            options,
            state: state_tx,
            events: events_tx.clone(),
            cancel: cancel.clone(),
            runtime: runtime.clone(),
            subscription: None,
            hold: None,
            epoch: 0,
            local_path: None,
        };

        runtime.spawn(
            async move {
                actor.run(events_rx).await;
                let _ = torn_down_tx.send(true);
            }
            .instrument(span),
        );

        Ok(Self {
            id,
            attachment_id,
            events: events_tx,
            state: state_rx,
            torn_down: torn_down_rx,
            cancel,
        })
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn attachment_id(&self) -> &str {
        &self.attachment_id
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub fn current_time_seconds(&self) -> f64 {
        self.state.borrow().current_time_seconds
    }

    pub fn duration_seconds(&self) -> f64 {
        self.state.borrow().duration_seconds
    }

    /// `MM:SS` text for the attachment row.
    pub fn display_time(&self) -> String {
        self.state.borrow().display_time()
    }

    /// Observe state changes. Only actual changes are published.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    /// Primary button: download, play or pause depending on the phase.
    pub fn press(&self) {
        self.enqueue(ControllerEvent::Press);
    }

    /// Move the playhead. The target is clamped to `[0, duration]`.
    pub fn seek(&self, target_seconds: f64) {
        self.enqueue(ControllerEvent::Seek(target_seconds));
    }

    pub fn is_destroyed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Tear the controller down and wait until teardown has finished.
    ///
    /// Safe to call from any phase and any number of times.
    pub async fn destroy(&self) {
        self.cancel.cancel();
        let mut torn_down = self.torn_down.clone();
        // Err means the task is gone without reporting, nothing left to wait for.
        let _ = torn_down.wait_for(|done| *done).await;
    }

    fn enqueue(&self, event: ControllerEvent) {
        if self.cancel.is_cancelled() {
            trace!(controller_id = %self.id, event = event.name(), "Controller destroyed, input dropped");
            return;
        }
        if self.events.send(event).is_err() {
            trace!(controller_id = %self.id, "Controller loop gone, input dropped");
        }
    }
}

impl Drop for AttachmentController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl fmt::Debug for AttachmentController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentController")
            .field("id", &self.id)
            .field("attachment_id", &self.attachment_id)
            .field("state", &self.state())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

struct ControllerActor {
    attachment: Attachment,
    remote_url: Option<String>,
    context: ControllerContext,
    engine: Arc<dyn PlaybackEngine>,
    options: MountOptions,
    state: watch::Sender<PlaybackState>,
    events: mpsc::UnboundedSender<ControllerEvent>,
    cancel: CancellationToken,
    runtime: tokio::runtime::Handle,
    subscription: Option<Subscription>,
    hold: Option<KeepAwakeHold>,
    /// Bumped on every subscribe; pause requests from older subscriptions are stale.
    epoch: u64,
    /// Cache destination from the last resolution.
    local_path: Option<String>,
}

impl ControllerActor {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<ControllerEvent>) {
        let cancel = self.cancel.clone();
        self.install_status_listener();
        self.begin_resolution();

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.handle_event(event) => {}
            }
        }

        self.teardown().await;
    }

    async fn handle_event(&mut self, event: ControllerEvent) {
        trace!(event = event.name(), phase = %self.phase(), "Handling event");
        match event {
            ControllerEvent::Press => self.on_press().await,
            ControllerEvent::Seek(target) => self.on_seek(target).await,
            ControllerEvent::Resolved(result) => self.on_resolved(result),
            ControllerEvent::PolicyDecided(allowed) => self.on_policy_decided(allowed),
            ControllerEvent::Downloaded(result) => self.on_downloaded(result),
            ControllerEvent::Loaded(result) => self.on_loaded(result),
            ControllerEvent::EngineStatus(status) => self.on_engine_status(status).await,
            ControllerEvent::PauseRequested(epoch) => self.on_pause_requested(epoch).await,
        }
    }

    // ------------------------------------------------------------------
    // State helpers
    // ------------------------------------------------------------------

    fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    fn set_phase(&self, phase: Phase) {
        let previous = self.phase();
        if previous == phase {
            return;
        }
        self.state.send_modify(|state| state.phase = phase);
        debug!(from = %previous, to = %phase, "Phase transition");
    }

    /// Run `op` in its own task and post its output back as an event.
    /// Output produced after cancellation is discarded.
    fn spawn_op<F, T>(&self, op: F, into_event: fn(T) -> ControllerEvent)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let events = self.events.clone();
        let cancel = self.cancel.clone();
        self.runtime.spawn(
            async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        trace!("Operation abandoned after teardown");
                    }
                    output = op => {
                        let _ = events.send(into_event(output));
                    }
                }
            }
            .instrument(Span::current()),
        );
    }

    fn install_status_listener(&self) {
        let events = self.events.clone();
        let listener: StatusListener = Arc::new(move |status| {
            let _ = events.send(ControllerEvent::EngineStatus(status));
        });
        self.engine.set_status_listener(Some(listener));
    }

    fn release_playback_resources(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if let Some(mut hold) = self.hold.take() {
            hold.release();
        }
    }

    // ------------------------------------------------------------------
    // Resolution / download / load
    // ------------------------------------------------------------------

    fn begin_resolution(&mut self) {
        self.set_phase(Phase::Resolving);
        let store = Arc::clone(&self.context.media_store);
        let attachment_id = self.attachment.id.clone();
        let mime_type = self.attachment.mime_type.clone();
        self.spawn_op(
            async move { store.resolve(&attachment_id, mime_type.as_deref()).await },
            ControllerEvent::Resolved,
        );
    }

    fn on_resolved(&mut self, result: BridgeResult<CacheResolution>) {
        if self.phase() != Phase::Resolving {
            trace!(phase = %self.phase(), "Stale resolution ignored");
            return;
        }

        let resolution = match result {
            Ok(resolution) => resolution,
            Err(err) => {
                warn!(error = %err, "Cache resolution failed");
                self.set_phase(Phase::Failed);
                return;
            }
        };

        self.local_path = Some(resolution.local_path.clone());
        if resolution.exists {
            debug!(file = %strip_path(&resolution.local_path), "Cache hit");
            self.begin_load(file_uri(&resolution.local_path));
            return;
        }

        if self.remote_url.is_none() {
            let err = PlaybackError::MissingUrl(self.attachment.id.clone());
            warn!(error = %err, "Attachment not cached");
            self.set_phase(Phase::Failed);
            return;
        }

        debug!("Cache miss, consulting download policy");
        let policy = Arc::clone(&self.context.policy);
        let attachment = self.attachment.clone();
        let actor = self.context.actor.clone();
        self.spawn_op(
            async move {
                match policy.should_auto_download(&attachment, &actor).await {
                    Ok(allowed) => allowed,
                    Err(err) => {
                        warn!(error = %err, "Download policy failed, falling back to manual download");
                        false
                    }
                }
            },
            ControllerEvent::PolicyDecided,
        );
    }

    fn on_policy_decided(&mut self, allowed: bool) {
        if self.phase() != Phase::Resolving {
            trace!(phase = %self.phase(), "Stale policy decision ignored");
            return;
        }

        if allowed {
            self.begin_download();
        } else {
            self.set_phase(Phase::AwaitingManualDownload);
        }
    }

    fn begin_download(&mut self) {
        let (Some(url), Some(destination)) = (self.remote_url.clone(), self.local_path.clone())
        else {
            warn!("Download requested without a remote URL or destination");
            self.set_phase(Phase::Failed);
            return;
        };

        debug!(url = %redact_url(&url), "Starting download");
        self.set_phase(Phase::Downloading);
        let store = Arc::clone(&self.context.media_store);
        let auth = self.context.auth.clone();
        self.spawn_op(
            async move { store.download(&url, &destination, &auth).await },
            ControllerEvent::Downloaded,
        );
    }

    fn on_downloaded(&mut self, result: BridgeResult<String>) {
        if self.phase() != Phase::Downloading {
            trace!(phase = %self.phase(), "Stale download result ignored");
            return;
        }

        match result {
            Ok(uri) => self.begin_load(file_uri(&uri)),
            Err(err) => {
                let err = PlaybackError::from(err);
                warn!(error = %err, recoverable = err.is_recoverable(), "Download failed");
                self.set_phase(Phase::AwaitingManualDownload);
            }
        }
    }

    fn begin_load(&mut self, uri: String) {
        self.set_phase(Phase::Loading);
        let engine = Arc::clone(&self.engine);
        self.spawn_op(
            async move { engine.load(&uri).await },
            ControllerEvent::Loaded,
        );
    }

    fn on_loaded(&mut self, result: BridgeResult<()>) {
        if self.phase() != Phase::Loading {
            trace!(phase = %self.phase(), "Stale load result ignored");
            return;
        }

        match result {
            Ok(()) => self.set_phase(Phase::Ready),
            Err(err) => {
                warn!(error = %err, "Engine load failed");
                self.set_phase(Phase::AwaitingManualDownload);
            }
        }
    }

    // ------------------------------------------------------------------
    // User intents
    // ------------------------------------------------------------------

    async fn on_press(&mut self) {
        if self.options.read_only {
            trace!("Read-only attachment, press ignored");
            return;
        }

        match self.phase() {
            Phase::AwaitingManualDownload => self.begin_download(),
            Phase::Ready | Phase::Paused => self.play().await,
            Phase::Playing => self.pause().await,
            phase if phase.is_busy() => trace!(%phase, "Press ignored while a step is in flight"),
            phase => trace!(%phase, "Press ignored"),
        }
    }

    async fn on_seek(&mut self, target: f64) {
        if self.options.read_only {
            trace!("Read-only attachment, seek ignored");
            return;
        }

        let current = *self.state.borrow();
        if current.phase.is_terminal() {
            trace!("Seek ignored in failed phase");
            return;
        }
        let Some(position) = current.clamp_position(target) else {
            trace!(seek_target = target, "Seek target not a number, ignored");
            return;
        };

        self.state.send_if_modified(|state| {
            if state.current_time_seconds == position {
                return false;
            }
            state.current_time_seconds = position;
            true
        });

        if current.phase.is_loaded() {
            if let Err(err) = self.engine.seek(position).await {
                warn!(error = %err, position, "Engine seek failed");
            }
        }
    }

    async fn play(&mut self) {
        let prior = self.phase();

        // Publish before subscribing so this controller never pauses itself.
        let notified = self.context.broadcast.publish();
        trace!(notified, "Published playback broadcast");

        self.epoch += 1;
        let epoch = self.epoch;
        let events = self.events.clone();
        self.subscription = Some(self.context.broadcast.subscribe_scoped(move || {
            let _ = events.send(ControllerEvent::PauseRequested(epoch));
        }));
        self.hold = Some(self.context.keep_awake.acquire());

        if let Err(err) = self.engine.set_session_mode(&self.context.session_mode).await {
            warn!(error = %err, "Failed to apply audio session mode");
        }

        match self.engine.play().await {
            Ok(()) => self.set_phase(Phase::Playing),
            Err(err) => {
                warn!(error = %err, "Engine play failed");
                self.release_playback_resources();
                self.set_phase(prior);
            }
        }
    }

    async fn pause(&mut self) {
        match self.engine.pause().await {
            Ok(()) => {
                self.release_playback_resources();
                self.set_phase(Phase::Paused);
            }
            Err(err) => {
                warn!(error = %err, "Engine pause failed, still playing");
            }
        }
    }

    async fn on_pause_requested(&mut self, epoch: u64) {
        if epoch != self.epoch || self.subscription.is_none() || self.phase() != Phase::Playing {
            trace!(epoch, current_epoch = self.epoch, "Stale pause request ignored");
            return;
        }
        debug!("Another attachment started playing, pausing");
        self.pause().await;
    }

    // ------------------------------------------------------------------
    // Engine pushes
    // ------------------------------------------------------------------

    async fn on_engine_status(&mut self, status: EngineStatus) {
        self.state.send_if_modified(|state| {
            let mut changed = false;

            if let Some(duration) = status.duration_seconds {
                if duration.is_finite() && duration > 0.0 && duration != state.duration_seconds {
                    state.duration_seconds = duration;
                    changed = true;
                }
            }
            if state.duration_seconds > 0.0 && state.current_time_seconds > state.duration_seconds
            {
                state.current_time_seconds = state.duration_seconds;
                changed = true;
            }

            let position = status.position_seconds;
            if !position.is_finite() {
                trace!(position, "Non-finite position ignored");
            } else if state.duration_seconds > 0.0 && position > state.duration_seconds {
                trace!(position, duration = state.duration_seconds, "Position past duration ignored");
            } else {
                let position = position.max(0.0);
                if position != state.current_time_seconds {
                    state.current_time_seconds = position;
                    changed = true;
                }
            }

            changed
        });

        if status.finished {
            if self.phase() == Phase::Playing {
                self.finish().await;
            } else {
                trace!(phase = %self.phase(), "Finished status outside playback ignored");
            }
        }
    }

    async fn finish(&mut self) {
        self.set_phase(Phase::Finished);
        if let Err(err) = self.engine.stop().await {
            warn!(error = %err, "Engine stop after finish failed");
        }
        self.state.send_if_modified(|state| {
            let changed = state.current_time_seconds != 0.0;
            state.current_time_seconds = 0.0;
            changed
        });
        self.release_playback_resources();
        self.set_phase(Phase::Ready);
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    async fn teardown(&mut self) {
        debug!(phase = %self.phase(), "Tearing down attachment controller");
        self.release_playback_resources();
        self.engine.set_status_listener(None);
        if let Err(err) = self.engine.stop().await {
            debug!(error = %err, "Engine stop during teardown failed, ignored");
        }
    }
}
