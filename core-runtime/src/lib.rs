//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the audio attachment core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - The process-wide playback broadcast channel
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the playback crates depend
//! on. It establishes the logging conventions and the cross-attachment
//! signalling used to keep a single attachment playing at a time.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod logging;

pub use broadcast::{PlaybackBroadcast, Subscription, SubscriptionHandle};
pub use config::{AudioConfig, AudioConfigBuilder};
pub use error::{Error, Result};
