//! Preference-driven auto-download policy.
//!
//! The user picks one of three modes for audio in the app settings; the
//! stored value lives under [`AUDIO_PREFERENCE_KEY`]. Messages the user sent
//! themselves are always fetched.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::{
    ActorContext, Attachment, DownloadPolicy, DownloadPreference, NetworkMonitor, NetworkStatus,
    NetworkType, SettingsStore,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Settings key of the audio auto-download preference.
pub const AUDIO_PREFERENCE_KEY: &str = "audioPreferenceDownload";

/// [`DownloadPolicy`] backed by the stored user preference and the current
/// network type.
pub struct PreferenceDownloadPolicy {
    settings: Arc<dyn SettingsStore>,
    network: Arc<dyn NetworkMonitor>,
    default_preference: DownloadPreference,
}

impl PreferenceDownloadPolicy {
    pub fn new(settings: Arc<dyn SettingsStore>, network: Arc<dyn NetworkMonitor>) -> Self {
        Self {
            settings,
            network,
            default_preference: DownloadPreference::default(),
        }
    }

    /// Preference used when nothing (or garbage) is stored.
    pub fn with_default_preference(mut self, preference: DownloadPreference) -> Self {
        self.default_preference = preference;
        self
    }

    /// Stored preference, or the default.
    pub async fn preference(&self) -> Result<DownloadPreference> {
        let Some(raw) = self.settings.get_string(AUDIO_PREFERENCE_KEY).await? else {
            return Ok(self.default_preference);
        };

        match raw.parse() {
            Ok(preference) => Ok(preference),
            Err(err) => {
                warn!(value = %raw, error = %err, "Ignoring unknown audio download preference");
                Ok(self.default_preference)
            }
        }
    }

    async fn on_wifi(&self) -> Result<bool> {
        let info = self.network.get_network_info().await?;
        Ok(info.status == NetworkStatus::Connected
            && info.network_type == Some(NetworkType::WiFi))
    }
}

#[async_trait]
impl DownloadPolicy for PreferenceDownloadPolicy {
    async fn should_auto_download(
        &self,
        attachment: &Attachment,
        actor: &ActorContext,
    ) -> Result<bool> {
        if actor.is_own_message() {
            debug!(attachment_id = %attachment.id, "Own message, downloading automatically");
            return Ok(true);
        }

        let preference = self.preference().await?;
        let allowed = match preference {
            DownloadPreference::Never => false,
            DownloadPreference::WifiAndMobileData => true,
            DownloadPreference::WifiOnly => self.on_wifi().await?,
        };

        debug!(
            attachment_id = %attachment.id,
            preference = %preference,
            allowed,
            "Evaluated auto-download policy"
        );
        Ok(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{BridgeError, NetworkInfo, UserIdentity};
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Settings {}

        #[async_trait]
        impl SettingsStore for Settings {
            async fn set_string(&self, key: &str, value: &str) -> Result<()>;
            async fn get_string(&self, key: &str) -> Result<Option<String>>;
            async fn delete(&self, key: &str) -> Result<()>;
        }
    }

    mock! {
        Network {}

        #[async_trait]
        impl NetworkMonitor for Network {
            async fn get_network_info(&self) -> Result<NetworkInfo>;
        }
    }

    fn settings_returning(value: Option<&'static str>) -> MockSettings {
        let mut settings = MockSettings::new();
        settings
            .expect_get_string()
            .with(eq(AUDIO_PREFERENCE_KEY))
            .returning(move |_| Ok(value.map(str::to_string)));
        settings
    }

    fn network_on(network_type: NetworkType) -> MockNetwork {
        let mut network = MockNetwork::new();
        network
            .expect_get_network_info()
            .returning(move || Ok(NetworkInfo::connected(network_type)));
        network
    }

    fn someone_else() -> ActorContext {
        ActorContext::new(
            UserIdentity::new("me", "alice"),
            Some(UserIdentity::new("other", "bob")),
        )
    }

    fn attachment() -> Attachment {
        Attachment::new("msg-1", Some("/file-upload/msg-1/voice.m4a".into()))
    }

    #[tokio::test]
    async fn test_never_blocks_download() {
        let policy = PreferenceDownloadPolicy::new(
            Arc::new(settings_returning(Some("never"))),
            Arc::new(network_on(NetworkType::WiFi)),
        );
        assert!(!policy.should_auto_download(&attachment(), &someone_else()).await.unwrap());
    }

    #[tokio::test]
    async fn test_wifi_only_on_wifi() {
        let policy = PreferenceDownloadPolicy::new(
            Arc::new(settings_returning(Some("wifi"))),
            Arc::new(network_on(NetworkType::WiFi)),
        );
        assert!(policy.should_auto_download(&attachment(), &someone_else()).await.unwrap());
    }

    #[tokio::test]
    async fn test_wifi_only_on_cellular() {
        let policy = PreferenceDownloadPolicy::new(
            Arc::new(settings_returning(Some("wifi"))),
            Arc::new(network_on(NetworkType::Cellular)),
        );
        assert!(!policy.should_auto_download(&attachment(), &someone_else()).await.unwrap());
    }

    #[tokio::test]
    async fn test_mobile_data_skips_network_check() {
        let mut network = MockNetwork::new();
        network.expect_get_network_info().never();

        let policy = PreferenceDownloadPolicy::new(
            Arc::new(settings_returning(Some("wifi_mobile_data"))),
            Arc::new(network),
        );
        assert!(policy.should_auto_download(&attachment(), &someone_else()).await.unwrap());
    }

    #[tokio::test]
    async fn test_own_message_always_downloads() {
        let mut settings = MockSettings::new();
        settings.expect_get_string().never();

        let policy = PreferenceDownloadPolicy::new(
            Arc::new(settings),
            Arc::new(network_on(NetworkType::Cellular)),
        );
        let me = UserIdentity::new("me", "alice");
        let actor = ActorContext::new(me.clone(), Some(me));
        assert!(policy.should_auto_download(&attachment(), &actor).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_or_unknown_preference_uses_default() {
        let policy = PreferenceDownloadPolicy::new(
            Arc::new(settings_returning(None)),
            Arc::new(network_on(NetworkType::Cellular)),
        )
        .with_default_preference(DownloadPreference::WifiAndMobileData);
        assert_eq!(policy.preference().await.unwrap(), DownloadPreference::WifiAndMobileData);

        let policy = PreferenceDownloadPolicy::new(
            Arc::new(settings_returning(Some("sometimes"))),
            Arc::new(network_on(NetworkType::Cellular)),
        )
        .with_default_preference(DownloadPreference::Never);
        assert_eq!(policy.preference().await.unwrap(), DownloadPreference::Never);
    }

    #[tokio::test]
    async fn test_errors_propagate() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_string()
            .returning(|_| Err(BridgeError::OperationFailed("locked".into())));

        let policy = PreferenceDownloadPolicy::new(
            Arc::new(settings),
            Arc::new(network_on(NetworkType::WiFi)),
        );
        assert!(policy.should_auto_download(&attachment(), &someone_else()).await.is_err());

        let mut network = MockNetwork::new();
        network
            .expect_get_network_info()
            .returning(|| Err(BridgeError::NotAvailable("no probe".into())));
        let policy = PreferenceDownloadPolicy::new(
            Arc::new(settings_returning(Some("wifi"))),
            Arc::new(network),
        );
        assert!(policy.should_auto_download(&attachment(), &someone_else()).await.is_err());
    }
}
