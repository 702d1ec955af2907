//! Playback engine bridge trait and supporting audio types.
//!
//! One engine instance backs exactly one attachment. Hosts wrap their native
//! audio player (AVPlayer, ExoPlayer, a rodio sink, ...) behind
//! [`PlaybackEngine`]; the core only ever loads a local URI and drives
//! play/pause/seek/stop on it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;

/// Status snapshot pushed by the engine at its own discretion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStatus {
    /// Current playback position in seconds.
    pub position_seconds: f64,
    /// Total duration in seconds, when the engine knows it.
    pub duration_seconds: Option<f64>,
    /// `true` exactly once when playback reaches the end of the media.
    pub finished: bool,
}

impl EngineStatus {
    pub fn progress(position_seconds: f64, duration_seconds: Option<f64>) -> Self {
        Self {
            position_seconds,
            duration_seconds,
            finished: false,
        }
    }

    pub fn finished(position_seconds: f64, duration_seconds: Option<f64>) -> Self {
        Self {
            position_seconds,
            duration_seconds,
            finished: true,
        }
    }
}

/// Callback receiving engine status pushes.
pub type StatusListener = Arc<dyn Fn(EngineStatus) + Send + Sync>;

/// Platform audio session behaviour applied before playback starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSessionMode {
    pub allows_recording: bool,
    /// Keep playing when the hardware mute switch is on (iOS).
    pub plays_in_silent_mode: bool,
    pub stays_active_in_background: bool,
    /// Lower other apps' volume instead of stopping them (Android).
    pub duck_others: bool,
    pub play_through_earpiece: bool,
    /// Interrupt other audio instead of mixing with it.
    pub exclusive: bool,
}

impl Default for AudioSessionMode {
    fn default() -> Self {
        Self {
            allows_recording: false,
            plays_in_silent_mode: true,
            stays_active_in_background: true,
            duck_others: true,
            play_through_earpiece: false,
            exclusive: true,
        }
    }
}

/// Platform audio engine for a single attachment.
///
/// Every call may fail with [`BridgeError::Engine`](crate::BridgeError::Engine).
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Install (or clear, with `None`) the status callback.
    fn set_status_listener(&self, listener: Option<StatusListener>);

    /// Load a local media URI. Resolves once the engine is ready to play.
    async fn load(&self, uri: &str) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position in seconds.
    async fn seek(&self, position_seconds: f64) -> Result<()>;

    /// Stop playback and rewind to the start.
    async fn stop(&self) -> Result<()>;

    /// Configure the platform audio session. Engines without a session
    /// concept keep the default no-op.
    async fn set_session_mode(&self, _mode: &AudioSessionMode) -> Result<()> {
        Ok(())
    }
}
