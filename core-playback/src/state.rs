//! Observable playback state of a single attachment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete state of one attachment's download/playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Created, resolution not started.
    #[default]
    Idle,
    /// Looking for a cached local file.
    Resolving,
    /// Not cached and not auto-downloaded; waiting for the user to tap.
    AwaitingManualDownload,
    Downloading,
    /// Local file handed to the engine.
    Loading,
    Ready,
    Playing,
    Paused,
    /// Transient: reached the end, about to rewind to `Ready`.
    Finished,
    /// No sensible retry exists (e.g. no URL at all).
    Failed,
}

impl Phase {
    /// Phases in which the engine has media loaded and accepts control calls.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Phase::Ready | Phase::Playing | Phase::Paused)
    }

    /// Phases with an async step (resolve/policy/download/load) in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Phase::Resolving | Phase::Downloading | Phase::Loading
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Resolving => "resolving",
            Phase::AwaitingManualDownload => "awaiting_manual_download",
            Phase::Downloading => "downloading",
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::Playing => "playing",
            Phase::Paused => "paused",
            Phase::Finished => "finished",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot published to the hosting view.
///
/// `current_time_seconds <= duration_seconds` holds whenever the duration is
/// positive; the controller clamps engine input before storing it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackState {
    pub phase: Phase,
    pub current_time_seconds: f64,
    pub duration_seconds: f64,
}

impl PlaybackState {
    /// Text shown next to the slider: the position once playback has
    /// progressed, otherwise the total length.
    pub fn display_time(&self) -> String {
        if self.current_time_seconds > 0.0 {
            format_time(self.current_time_seconds)
        } else {
            format_time(self.duration_seconds)
        }
    }

    /// Clamp a position into `[0, duration]`. An unknown (zero) duration
    /// clamps everything to 0. Returns `None` for NaN.
    pub fn clamp_position(&self, seconds: f64) -> Option<f64> {
        if seconds.is_nan() {
            return None;
        }
        Some(seconds.max(0.0).min(self.duration_seconds.max(0.0)))
    }
}

/// Render seconds as zero-padded `MM:SS`. Minutes are not wrapped at one hour.
///
/// ```
/// use core_playback::state::format_time;
///
/// assert_eq!(format_time(0.0), "00:00");
/// assert_eq!(format_time(65.9), "01:05");
/// assert_eq!(format_time(3725.0), "62:05");
/// ```
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}
