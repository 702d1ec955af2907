//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-playback`). Host applications can
//! depend on `chat-audio-workspace` and enable the documented features without
//! wiring each crate individually:
//!
//! - `desktop-shims` (default): the full service facade with the desktop
//!   `MediaStore`, network monitor and wake lock adapters.
//! - `controller-only`: just the attachment controller, for hosts that bring
//!   every bridge themselves.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;

#[cfg(feature = "controller-only")]
pub use core_playback as playback;
