//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides implementations of the host traits using
//! desktop-appropriate libraries:
//! - `MediaStore` using `tokio::fs` and a streaming `reqwest` download
//! - `SettingsStore` using SQLite-backed key-value store
//! - `NetworkMonitor` using a TCP reachability probe
//! - `WakeLock` as an in-process flag (desktop rarely sleeps mid-playback)
//!
//! The playback engine is not provided here; hosts bring their own.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopNetworkMonitor, FileMediaStore, SqliteSettingsStore};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let store = FileMediaStore::new(FileMediaStore::default_cache_dir(), "chat.example.com")?;
//!     let settings = SqliteSettingsStore::in_memory().await?;
//!     let network = DesktopNetworkMonitor::new();
//!
//!     // Hand these to the audio attachment service
//!     Ok(())
//! }
//! ```

mod media_store;
mod network;
mod power;
mod settings;

pub use media_store::{extension_for_mime, FileMediaStore};
pub use network::DesktopNetworkMonitor;
pub use power::DesktopWakeLock;
pub use settings::SqliteSettingsStore;
