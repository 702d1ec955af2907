//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the audio attachment core and the
//! platform. Each trait represents a capability the core requires but that
//! must be implemented differently per platform (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Media
//! - [`MediaStore`](media::MediaStore) - Local cache lookup and media download
//! - [`DownloadPolicy`](policy::DownloadPolicy) - Auto-download decision
//! - [`PlaybackEngine`](playback::PlaybackEngine) - Per-attachment audio engine
//! - [`WakeLock`](power::WakeLock) - Keep the device awake during playback
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Wi-Fi vs. cellular detection
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should map platform failures onto its `Network`, `Filesystem` and `Engine`
//! variants so the core can pick the right recovery path.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so one implementation can be
//! shared across every mounted attachment.
//!
//! ## Examples
//!
//! ### Implementing WakeLock
//!
//! ```
//! use bridge_traits::WakeLock;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! #[derive(Default)]
//! struct ScreenOn(AtomicBool);
//!
//! impl WakeLock for ScreenOn {
//!     fn acquire(&self) {
//!         self.0.store(true, Ordering::SeqCst);
//!     }
//!
//!     fn release(&self) {
//!         self.0.store(false, Ordering::SeqCst);
//!     }
//! }
//! ```

pub mod error;
pub mod logging;
pub mod media;
pub mod network;
pub mod playback;
pub mod policy;
pub mod power;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use media::{file_uri, Attachment, AuthContext, CacheResolution, MediaStore};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use playback::{AudioSessionMode, EngineStatus, PlaybackEngine, StatusListener};
pub use policy::{ActorContext, DownloadPolicy, DownloadPreference, UserIdentity};
pub use power::WakeLock;
pub use storage::SettingsStore;
