//! Effective settings: CLI flags over config file over defaults.

use std::env;
use std::path::PathBuf;

use track_downloader::DatabaseOptions;
use track_downloader::resolver::{RESOLVER_CONNECT_TIMEOUT_SECS, RESOLVER_READ_TIMEOUT_SECS};
use track_downloader::transfer::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};

use crate::app_config::FileConfig;
use crate::cli::Args;

const DB_FILE: &str = "tasks.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HttpTimeouts {
    pub(crate) transfer_connect_secs: u64,
    pub(crate) transfer_read_secs: u64,
    pub(crate) resolver_connect_secs: u64,
    pub(crate) resolver_read_secs: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) db_path: PathBuf,
    pub(crate) download_dir: PathBuf,
    pub(crate) resolver_url: Option<String>,
    pub(crate) require_wifi: bool,
    pub(crate) wifi_connected: bool,
    pub(crate) assume_yes: bool,
    pub(crate) quiet: bool,
    pub(crate) timeouts: HttpTimeouts,
    pub(crate) db_options: DatabaseOptions,
}

/// Log level used when `RUST_LOG` is not set.
///
/// Priority: quiet flag > verbose count > config verbosity > info.
pub(crate) fn default_log_level(args: &Args, file: &FileConfig) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => file.verbosity.map_or("info", |v| v.filter()),
        1 => "debug",
        _ => "trace",
    }
}

pub(crate) fn resolve_settings(args: &Args, file: &FileConfig) -> Settings {
    let defaults = DatabaseOptions::default();
    Settings {
        db_path: args
            .db
            .clone()
            .or_else(|| file.db_path.clone())
            .unwrap_or_else(default_db_path),
        download_dir: args
            .download_dir
            .clone()
            .or_else(|| file.download_dir.clone())
            .unwrap_or_else(|| PathBuf::from(".")),
        resolver_url: args
            .resolver_url
            .clone()
            .or_else(|| file.resolver_url.clone()),
        require_wifi: file.require_wifi.unwrap_or(true),
        wifi_connected: !args.metered,
        assume_yes: args.yes,
        quiet: args.quiet,
        timeouts: HttpTimeouts {
            transfer_connect_secs: file
                .transfer_connect_timeout_secs
                .unwrap_or(CONNECT_TIMEOUT_SECS),
            transfer_read_secs: file.transfer_read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
            resolver_connect_secs: file
                .resolver_connect_timeout_secs
                .unwrap_or(RESOLVER_CONNECT_TIMEOUT_SECS),
            resolver_read_secs: file
                .resolver_read_timeout_secs
                .unwrap_or(RESOLVER_READ_TIMEOUT_SECS),
        },
        db_options: DatabaseOptions {
            max_connections: file.db_max_connections.unwrap_or(defaults.max_connections),
            busy_timeout_ms: file.db_busy_timeout_ms.unwrap_or(defaults.busy_timeout_ms),
        },
    }
}

/// `$XDG_DATA_HOME/track-downloader/tasks.db`, then
/// `$HOME/.local/share/track-downloader/tasks.db`, then the working directory.
fn default_db_path() -> PathBuf {
    let non_empty = |name: &str| env::var_os(name).filter(|value| !value.is_empty());
    if let Some(data_home) = non_empty("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join("track-downloader").join(DB_FILE);
    }
    if let Some(home) = non_empty("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("track-downloader")
            .join(DB_FILE);
    }
    PathBuf::from(DB_FILE)
}
