//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (media store,
//! settings, network monitor, wake lock) into the audio attachment core and
//! mounts one [`AttachmentController`] per rendered attachment. Desktop apps
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) so every bridge except the playback engine has a default.
//!
//! ```ignore
//! use core_service::{AudioAttachmentService, AudioConfig};
//!
//! let config = AudioConfig::builder()
//!     .server_base_url("https://chat.example.com")
//!     .build()?;
//! let service = AudioAttachmentService::builder(config).build().await?;
//!
//! let controller = service.mount(attachment, actor, auth, engine, MountOptions::default())?;
//! controller.press();
//! ```

pub mod error;

pub use error::{Result, ServiceError};

pub use core_playback::{
    AttachmentController, KeepAwake, MountOptions, Phase, PlaybackState,
    PreferenceDownloadPolicy, AUDIO_PREFERENCE_KEY,
};
pub use core_runtime::{AudioConfig, AudioConfigBuilder, PlaybackBroadcast};

use std::sync::Arc;

use bridge_traits::{
    ActorContext, Attachment, AuthContext, DownloadPolicy, DownloadPreference, MediaStore,
    NetworkMonitor, PlaybackEngine, SettingsStore, WakeLock,
};
use core_playback::ControllerContext;
use tracing::{info, warn};

/// Primary façade exposed to host applications.
///
/// Cheap to clone; every clone shares the same collaborators, so all
/// controllers mounted through it keep one wake lock and one broadcast.
#[derive(Clone)]
pub struct AudioAttachmentService {
    config: Arc<AudioConfig>,
    media_store: Arc<dyn MediaStore>,
    policy: Arc<dyn DownloadPolicy>,
    settings: Option<Arc<dyn SettingsStore>>,
    keep_awake: KeepAwake,
    broadcast: PlaybackBroadcast,
}

impl AudioAttachmentService {
    pub fn builder(config: AudioConfig) -> AudioAttachmentServiceBuilder {
        AudioAttachmentServiceBuilder::new(config)
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Broadcast shared by the controllers this service mounts.
    pub fn broadcast(&self) -> &PlaybackBroadcast {
        &self.broadcast
    }

    pub fn keep_awake(&self) -> &KeepAwake {
        &self.keep_awake
    }

    /// Mount a controller for one rendered attachment.
    ///
    /// `engine` is the host's per-attachment audio engine; `actor` and `auth`
    /// describe the signed-in user and the message author.
    pub fn mount(
        &self,
        attachment: Attachment,
        actor: ActorContext,
        auth: AuthContext,
        engine: Arc<dyn PlaybackEngine>,
        options: MountOptions,
    ) -> Result<AttachmentController> {
        let context = ControllerContext::new(
            Arc::clone(&self.media_store),
            Arc::clone(&self.policy),
            self.keep_awake.clone(),
            actor,
            auth,
        )
        .with_broadcast(self.broadcast.clone())
        .with_server_base_url(self.config.base_url())
        .with_session_mode(self.config.session_mode);

        Ok(AttachmentController::mount(
            attachment, context, engine, options,
        )?)
    }

    /// The stored audio auto-download preference, or the configured default.
    pub async fn download_preference(&self) -> Result<DownloadPreference> {
        let settings = self.settings()?;
        let default = self.config.default_download_preference;

        let Some(raw) = settings.get_string(AUDIO_PREFERENCE_KEY).await? else {
            return Ok(default);
        };
        Ok(raw.parse().unwrap_or_else(|err| {
            warn!(value = %raw, error = %err, "Ignoring unknown audio download preference");
            default
        }))
    }

    pub async fn set_download_preference(&self, preference: DownloadPreference) -> Result<()> {
        self.settings()?
            .set_string(AUDIO_PREFERENCE_KEY, preference.as_str())
            .await?;
        info!(preference = %preference, "Audio download preference updated");
        Ok(())
    }

    fn settings(&self) -> Result<&Arc<dyn SettingsStore>> {
        self.settings.as_ref().ok_or_else(|| {
            ServiceError::missing(
                "SettingsStore",
                "The service was built with a custom DownloadPolicy and no SettingsStore",
            )
        })
    }
}

/// Builder collecting the bridges the service needs.
///
/// Anything left unset falls back to the `bridge-desktop` implementation when
/// the `desktop-shims` feature is enabled and fails with
/// [`ServiceError::CapabilityMissing`] otherwise.
pub struct AudioAttachmentServiceBuilder {
    config: AudioConfig,
    media_store: Option<Arc<dyn MediaStore>>,
    settings: Option<Arc<dyn SettingsStore>>,
    network: Option<Arc<dyn NetworkMonitor>>,
    wake_lock: Option<Arc<dyn WakeLock>>,
    policy: Option<Arc<dyn DownloadPolicy>>,
    broadcast: Option<PlaybackBroadcast>,
    isolated_broadcast: bool,
}

impl AudioAttachmentServiceBuilder {
    fn new(config: AudioConfig) -> Self {
        Self {
            config,
            media_store: None,
            settings: None,
            network: None,
            wake_lock: None,
            policy: None,
            broadcast: None,
            isolated_broadcast: false,
        }
    }

    pub fn media_store(mut self, store: Arc<dyn MediaStore>) -> Self {
        self.media_store = Some(store);
        self
    }

    pub fn settings_store(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn network_monitor(mut self, network: Arc<dyn NetworkMonitor>) -> Self {
        self.network = Some(network);
        self
    }

    pub fn wake_lock(mut self, lock: Arc<dyn WakeLock>) -> Self {
        self.wake_lock = Some(lock);
        self
    }

    /// Replace the preference-driven policy entirely.
    pub fn download_policy(mut self, policy: Arc<dyn DownloadPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Share an explicit broadcast instead of the process-wide one.
    pub fn broadcast(mut self, broadcast: PlaybackBroadcast) -> Self {
        self.broadcast = Some(broadcast);
        self
    }

    /// Use a private broadcast sized by `broadcast_capacity_hint`.
    pub fn isolated_broadcast(mut self) -> Self {
        self.isolated_broadcast = true;
        self
    }

    pub async fn build(self) -> Result<AudioAttachmentService> {
        self.config.validate()?;
        let config = self.config;

        let media_store = match self.media_store {
            Some(store) => store,
            None => defaults::media_store(&config)?,
        };

        let wake_lock = match self.wake_lock {
            Some(lock) => lock,
            None => defaults::wake_lock()?,
        };

        let (policy, settings) = match self.policy {
            Some(policy) => (policy, self.settings),
            None => {
                let settings = match self.settings {
                    Some(settings) => settings,
                    None => defaults::settings_store().await?,
                };
                let network = match self.network {
                    Some(network) => network,
                    None => defaults::network_monitor()?,
                };
                let policy = PreferenceDownloadPolicy::new(Arc::clone(&settings), network)
                    .with_default_preference(config.default_download_preference);
                (Arc::new(policy) as Arc<dyn DownloadPolicy>, Some(settings))
            }
        };

        let broadcast = match self.broadcast {
            Some(broadcast) => broadcast,
            None if self.isolated_broadcast => {
                PlaybackBroadcast::with_capacity(config.broadcast_capacity_hint)
            }
            None => PlaybackBroadcast::global().clone(),
        };

        info!(
            server_host = config.server_host().unwrap_or_default(),
            default_preference = %config.default_download_preference,
            "Audio attachment service ready"
        );

        Ok(AudioAttachmentService {
            config: Arc::new(config),
            media_store,
            policy,
            settings,
            keep_awake: KeepAwake::new(wake_lock),
            broadcast,
        })
    }
}

#[cfg(feature = "desktop-shims")]
mod defaults {
    use super::*;
    use bridge_desktop::{
        DesktopNetworkMonitor, DesktopWakeLock, FileMediaStore, SqliteSettingsStore,
    };

    pub(super) fn media_store(config: &AudioConfig) -> Result<Arc<dyn MediaStore>> {
        let host = config.server_host().ok_or_else(|| {
            ServiceError::InitializationFailed("server_base_url has no host".to_string())
        })?;
        let cache_dir = config
            .media_cache_dir()
            .map(|dir| dir.to_path_buf())
            .unwrap_or_else(FileMediaStore::default_cache_dir);
        Ok(Arc::new(FileMediaStore::new(cache_dir, host)?))
    }

    pub(super) fn wake_lock() -> Result<Arc<dyn WakeLock>> {
        Ok(Arc::new(DesktopWakeLock::new()))
    }

    pub(super) async fn settings_store() -> Result<Arc<dyn SettingsStore>> {
        let store = SqliteSettingsStore::new(SqliteSettingsStore::default_path()).await?;
        Ok(Arc::new(store))
    }

    pub(super) fn network_monitor() -> Result<Arc<dyn NetworkMonitor>> {
        Ok(Arc::new(DesktopNetworkMonitor::new()))
    }
}

#[cfg(not(feature = "desktop-shims"))]
mod defaults {
    use super::*;

    const HINT: &str = "Enable the `desktop-shims` feature or provide one on the builder";

    pub(super) fn media_store(_config: &AudioConfig) -> Result<Arc<dyn MediaStore>> {
        Err(ServiceError::missing("MediaStore", HINT))
    }

    pub(super) fn wake_lock() -> Result<Arc<dyn WakeLock>> {
        Err(ServiceError::missing("WakeLock", HINT))
    }

    pub(super) async fn settings_store() -> Result<Arc<dyn SettingsStore>> {
        Err(ServiceError::missing("SettingsStore", HINT))
    }

    pub(super) fn network_monitor() -> Result<Arc<dyn NetworkMonitor>> {
        Err(ServiceError::missing("NetworkMonitor", HINT))
    }
}
