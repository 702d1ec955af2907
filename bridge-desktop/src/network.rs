//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::time::Duration;
use tracing::debug;

const DEFAULT_PROBE_ADDR: &str = "8.8.8.8:53";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Desktop network monitor implementation
///
/// Reachability comes from a TCP connect probe. Desktop platforms don't expose
/// Wi-Fi vs. wired cheaply, so a connected link reports the configured
/// `assumed_type` (Wi-Fi by default, which lets "Wi-Fi only" downloads run).
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    probe_timeout: Duration,
    assumed_type: NetworkType,
}

impl DesktopNetworkMonitor {
    /// Create a new network monitor
    pub fn new() -> Self {
        Self {
            probe_addr: DEFAULT_PROBE_ADDR.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            assumed_type: NetworkType::WiFi,
        }
    }

    /// Probe a different `host:port` (e.g. the chat server)
    pub fn with_probe(mut self, addr: impl Into<String>, timeout: Duration) -> Self {
        self.probe_addr = addr.into();
        self.probe_timeout = timeout;
        self
    }

    /// Report a different link type when connected
    pub fn with_assumed_type(mut self, network_type: NetworkType) -> Self {
        self.assumed_type = network_type;
        self
    }

    async fn check_connectivity(&self) -> NetworkStatus {
        match tokio::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(self.probe_addr.as_str()),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) | Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.check_connectivity().await;

        let info = match status {
            NetworkStatus::Connected => NetworkInfo::connected(self.assumed_type),
            _ => NetworkInfo::disconnected(),
        };

        debug!(status = ?status, network_type = ?info.network_type, "Network info updated");
        Ok(info)
    }
}
