//! # Attachment Playback Module
//!
//! Drives inline audio attachments in a chat message list.
//!
//! ## Overview
//!
//! This module handles:
//! - The per-attachment state machine ([`AttachmentController`]): cache
//!   lookup, policy-gated download, engine load, play/pause/seek, teardown
//! - "Only one attachment plays at a time" via the process-wide
//!   [`PlaybackBroadcast`](core_runtime::PlaybackBroadcast)
//! - Keeping the device awake while anything plays ([`KeepAwake`])
//! - The preference-driven auto-download policy ([`PreferenceDownloadPolicy`])
//!
//! Host platforms plug in through the traits in `bridge-traits`; nothing here
//! touches an audio device, the network or the filesystem directly.

pub mod attachment;
pub mod controller;
pub mod error;
pub mod keep_awake;
pub mod policy;
pub mod state;

pub use attachment::resolve_remote_url;
pub use controller::{AttachmentController, ControllerContext, ControllerId, MountOptions};
pub use error::{PlaybackError, Result};
pub use keep_awake::{KeepAwake, KeepAwakeHold};
pub use policy::{PreferenceDownloadPolicy, AUDIO_PREFERENCE_KEY};
pub use state::{format_time, Phase, PlaybackState};
