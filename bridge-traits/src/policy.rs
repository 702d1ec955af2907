//! Auto-download policy abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};
use crate::media::Attachment;

/// A chat user as seen by the download policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub username: String,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// Who is looking at the attachment and who sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    /// The signed-in user.
    pub user: UserIdentity,
    /// Author of the message carrying the attachment, when known.
    pub author: Option<UserIdentity>,
}

impl ActorContext {
    pub fn new(user: UserIdentity, author: Option<UserIdentity>) -> Self {
        Self { user, author }
    }

    /// Whether the signed-in user sent the message.
    pub fn is_own_message(&self) -> bool {
        self.author
            .as_ref()
            .is_some_and(|author| author.id == self.user.id)
    }
}

/// User preference for fetching media without confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadPreference {
    Never,
    #[default]
    #[serde(rename = "wifi")]
    WifiOnly,
    #[serde(rename = "wifi_mobile_data")]
    WifiAndMobileData,
}

impl DownloadPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadPreference::Never => "never",
            DownloadPreference::WifiOnly => "wifi",
            DownloadPreference::WifiAndMobileData => "wifi_mobile_data",
        }
    }
}

impl fmt::Display for DownloadPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownloadPreference {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "never" => Ok(DownloadPreference::Never),
            "wifi" => Ok(DownloadPreference::WifiOnly),
            "wifi_mobile_data" => Ok(DownloadPreference::WifiAndMobileData),
            other => Err(BridgeError::OperationFailed(format!(
                "Unknown download preference: {}",
                other
            ))),
        }
    }
}

/// Decides whether an attachment may be fetched without the user asking.
///
/// Callers treat any `Err` as "no": an uncertain policy must never trigger a
/// silent download.
#[async_trait]
pub trait DownloadPolicy: Send + Sync {
    async fn should_auto_download(
        &self,
        attachment: &Attachment,
        actor: &ActorContext,
    ) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_message_detection() {
        let me = UserIdentity::new("u1", "alice");
        let other = UserIdentity::new("u2", "bob");

        assert!(ActorContext::new(me.clone(), Some(me.clone())).is_own_message());
        assert!(!ActorContext::new(me.clone(), Some(other)).is_own_message());
        assert!(!ActorContext::new(me, None).is_own_message());
    }

    #[test]
    fn preference_string_forms() {
        for pref in [
            DownloadPreference::Never,
            DownloadPreference::WifiOnly,
            DownloadPreference::WifiAndMobileData,
        ] {
            assert_eq!(pref.as_str().parse::<DownloadPreference>().unwrap(), pref);
        }
        assert!("sometimes".parse::<DownloadPreference>().is_err());
    }

    #[test]
    fn preference_serde_matches_stored_values() {
        let json = serde_json::to_string(&DownloadPreference::WifiOnly).unwrap();
        assert_eq!(json, "\"wifi\"");
        let parsed: DownloadPreference = serde_json::from_str("\"wifi_mobile_data\"").unwrap();
        assert_eq!(parsed, DownloadPreference::WifiAndMobileData);
    }
}
