//! Network status and download policy.

use std::sync::atomic::{AtomicBool, Ordering};

/// Reports the current connection type.
pub trait NetworkStatus: Send + Sync {
    fn is_wifi_connected(&self) -> bool;
}

/// Process-wide download preferences.
pub trait DownloadSettings: Send + Sync {
    /// True when downloads should only run on Wi-Fi without asking.
    fn requires_wifi_for_download(&self) -> bool;
}

/// Connection status fixed at construction, updatable at runtime.
#[derive(Debug)]
pub struct StaticNetworkStatus {
    wifi: AtomicBool,
}

impl StaticNetworkStatus {
    #[must_use]
    pub fn new(wifi_connected: bool) -> Self {
        Self {
            wifi: AtomicBool::new(wifi_connected),
        }
    }

    pub fn set_wifi_connected(&self, connected: bool) {
        self.wifi.store(connected, Ordering::Relaxed);
    }
}

impl NetworkStatus for StaticNetworkStatus {
    fn is_wifi_connected(&self) -> bool {
        self.wifi.load(Ordering::Relaxed)
    }
}

/// The "require Wi-Fi for downloads" flag.
///
/// Read at enqueue time; only the settings owner writes it.
#[derive(Debug)]
pub struct PolicySettings {
    require_wifi: AtomicBool,
}

impl PolicySettings {
    #[must_use]
    pub fn new(require_wifi: bool) -> Self {
        Self {
            require_wifi: AtomicBool::new(require_wifi),
        }
    }

    pub fn set_requires_wifi(&self, required: bool) {
        self.require_wifi.store(required, Ordering::Relaxed);
    }
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DownloadSettings for PolicySettings {
    fn requires_wifi_for_download(&self) -> bool {
        self.require_wifi.load(Ordering::Relaxed)
    }
}

/// True when the metered-network confirmation has to be asked.
#[must_use]
pub fn needs_metered_confirmation(
    settings: &dyn DownloadSettings,
    network: &dyn NetworkStatus,
) -> bool {
    settings.requires_wifi_for_download() && !network.is_wifi_connected()
}
