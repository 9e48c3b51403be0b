//! Shared User-Agent strings for resolver and transfer HTTP clients.

const PRODUCT: &str = "track-downloader";

/// User-Agent for audio transfer requests.
#[must_use]
pub(crate) fn transfer_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (transfer)")
}

/// User-Agent for catalog metadata requests.
#[must_use]
pub(crate) fn resolver_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (metadata)")
}
