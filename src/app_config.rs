//! Configuration file loading for CLI defaults.
//!
//! The file is a flat list of `key = value` lines (a TOML subset): strings
//! are double-quoted, booleans are `true`/`false`, `#` starts a comment.

use std::env;
use std::fmt::Display;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

const APP_DIR: &str = "track-downloader";
const CONFIG_FILE: &str = "config.toml";

/// File configuration; every field is optional and CLI flags win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Directory downloaded tracks are written to.
    pub download_dir: Option<PathBuf>,
    /// Ask before downloading when not on Wi-Fi.
    pub require_wifi: Option<bool>,
    /// Catalog service base url for metadata resolution.
    pub resolver_url: Option<String>,
    /// `SQLite` database holding tasks and cached tracks.
    pub db_path: Option<PathBuf>,
    pub verbosity: Option<VerbositySetting>,
    pub transfer_connect_timeout_secs: Option<u64>,
    pub transfer_read_timeout_secs: Option<u64>,
    pub resolver_connect_timeout_secs: Option<u64>,
    pub resolver_read_timeout_secs: Option<u64>,
    /// Database pool max connections (1..=20).
    pub db_max_connections: Option<u32>,
    /// Database busy timeout in milliseconds.
    pub db_busy_timeout_ms: Option<u32>,
}

impl FileConfig {
    /// Rejects values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        check_range(
            "transfer_connect_timeout_secs",
            self.transfer_connect_timeout_secs,
            TIMEOUT_RANGE_SECS,
        )?;
        check_range(
            "transfer_read_timeout_secs",
            self.transfer_read_timeout_secs,
            TIMEOUT_RANGE_SECS,
        )?;
        check_range(
            "resolver_connect_timeout_secs",
            self.resolver_connect_timeout_secs,
            TIMEOUT_RANGE_SECS,
        )?;
        check_range(
            "resolver_read_timeout_secs",
            self.resolver_read_timeout_secs,
            TIMEOUT_RANGE_SECS,
        )?;
        check_range("db_max_connections", self.db_max_connections, 1..=20)?;
        check_range("db_busy_timeout_ms", self.db_busy_timeout_ms, 0..=120_000)?;

        if let Some(url) = &self.resolver_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            bail!("`resolver_url` must be an http(s) url, got '{url}'");
        }
        Ok(())
    }
}

const TIMEOUT_RANGE_SECS: RangeInclusive<u64> = 1..=3600;

fn check_range<T>(field: &str, value: Option<T>, allowed: RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + Display,
{
    match value {
        Some(value) if !allowed.contains(&value) => bail!(
            "`{field}` = {value} is out of range {}..={}",
            allowed.start(),
            allowed.end()
        ),
        _ => Ok(()),
    }
}

/// Verbosity labels accepted in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log filter directive this label stands for.
    #[must_use]
    pub fn filter(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/track-downloader/config.toml`
/// 2. `$HOME/.config/track-downloader/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = non_empty_env("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join(CONFIG_FILE));
    }

    let home = non_empty_env("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE),
    )
}

fn non_empty_env(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads `explicit` if given, else the default path when it exists.
///
/// A missing default file yields an empty config; a missing explicit file
/// is an error.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (index, line) in raw.lines().enumerate() {
        let line_no = index + 1;
        let entry = without_comment(line).trim();
        if entry.is_empty() {
            continue;
        }
        let Some((key, value)) = entry.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };
        let key = key.trim();
        apply_entry(&mut cfg, key, value.trim())
            .with_context(|| format!("Invalid `{key}` value on line {line_no}"))?;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn apply_entry(cfg: &mut FileConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "download_dir" => cfg.download_dir = Some(quoted(value)?.into()),
        "db_path" => cfg.db_path = Some(quoted(value)?.into()),
        "resolver_url" => cfg.resolver_url = Some(quoted(value)?),
        "require_wifi" => cfg.require_wifi = Some(boolean(value)?),
        "verbosity" => cfg.verbosity = Some(quoted(value)?.parse()?),
        "transfer_connect_timeout_secs" => cfg.transfer_connect_timeout_secs = Some(unsigned(value)?),
        "transfer_read_timeout_secs" => cfg.transfer_read_timeout_secs = Some(unsigned(value)?),
        "resolver_connect_timeout_secs" => cfg.resolver_connect_timeout_secs = Some(unsigned(value)?),
        "resolver_read_timeout_secs" => cfg.resolver_read_timeout_secs = Some(unsigned(value)?),
        "db_max_connections" => cfg.db_max_connections = Some(unsigned(value)?),
        "db_busy_timeout_ms" => cfg.db_busy_timeout_ms = Some(unsigned(value)?),
        unknown => bail!("Unknown configuration key: '{unknown}'"),
    }
    Ok(())
}

/// Cuts a trailing `#` comment, ignoring `#` inside double quotes.
fn without_comment(line: &str) -> &str {
    let mut quoted = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..index],
            _ => {}
        }
    }
    line
}

fn quoted(value: &str) -> Result<String> {
    match value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => Ok(inner.to_string()),
        None => bail!("Expected double-quoted string"),
    }
}

fn boolean(value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected true or false, got '{value}'"),
    }
}

fn unsigned<T: std::str::FromStr>(value: &str) -> Result<T> {
    if value.starts_with('-') {
        bail!("Negative numbers are not allowed");
    }
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("Expected an integer in range, got '{value}'"))
}

impl std::str::FromStr for VerbositySetting {
    type Err = anyhow::Error;

    fn from_str(label: &str) -> Result<Self> {
        Ok(match label {
            "default" => Self::Default,
            "verbose" => Self::Verbose,
            "quiet" => Self::Quiet,
            "debug" => Self::Debug,
            _ => bail!("Unknown verbosity '{label}', expected default, verbose, quiet or debug"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_stay_unset() {
        let cfg = parse_config_str(
            r#"
download_dir = "/home/listener/Music"
require_wifi = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.download_dir, Some(PathBuf::from("/home/listener/Music")));
        assert_eq!(cfg.require_wifi, Some(false));
        assert!(cfg.resolver_url.is_none());
    }

    #[test]
    fn test_trailing_comments_are_ignored() {
        let cfg = parse_config_str(
            r#"
resolver_url = "https://catalog.example.com/api#v2" # hash inside quotes survives
verbosity = "quiet" # preferred noise level
"#,
        )
        .unwrap();
        assert_eq!(
            cfg.resolver_url.as_deref(),
            Some("https://catalog.example.com/api#v2")
        );
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Quiet));
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let err = parse_config_str("unknown_key = 123").unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("Unknown configuration key"));
        assert!(chain.contains("unknown_key"));
    }

    #[test]
    fn test_line_without_equals_reports_line() {
        let err = parse_config_str("require_wifi true").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_boolean_must_be_true_or_false() {
        let err = parse_config_str("require_wifi = yes").unwrap_err();
        assert!(err.to_string().contains("require_wifi"));
    }

    #[test]
    fn test_paths_must_be_quoted() {
        let err = parse_config_str("db_path = /tmp/tasks.db").unwrap_err();
        assert!(err.to_string().contains("db_path"));
    }

    #[test]
    fn test_all_timeout_keys_parse() {
        let cfg = parse_config_str(
            r"
transfer_connect_timeout_secs = 15
transfer_read_timeout_secs = 120
resolver_connect_timeout_secs = 7
resolver_read_timeout_secs = 45
",
        )
        .unwrap();
        assert_eq!(cfg.transfer_connect_timeout_secs, Some(15));
        assert_eq!(cfg.transfer_read_timeout_secs, Some(120));
        assert_eq!(cfg.resolver_connect_timeout_secs, Some(7));
        assert_eq!(cfg.resolver_read_timeout_secs, Some(45));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = parse_config_str("transfer_connect_timeout_secs = 0")
            .unwrap_err();
        assert!(err.to_string().contains("transfer_connect_timeout_secs"));
    }

    #[test]
    fn test_negative_numbers_rejected() {
        let err = parse_config_str("db_busy_timeout_ms = -1").unwrap_err();
        assert!(err.to_string().contains("db_busy_timeout_ms"));
    }

    #[test]
    fn test_db_pool_keys_parse() {
        let cfg = parse_config_str(
            r"
db_max_connections = 10
db_busy_timeout_ms = 3000
",
        )
        .unwrap();
        assert_eq!(cfg.db_max_connections, Some(10));
        assert_eq!(cfg.db_busy_timeout_ms, Some(3000));
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let err = parse_config_str("db_max_connections = 0").unwrap_err();
        assert!(err.to_string().contains("db_max_connections"));
    }

    #[test]
    fn test_resolver_url_must_be_http() {
        let err = parse_config_str(r#"resolver_url = "ftp://catalog.example.com""#)
            .unwrap_err();
        assert!(err.to_string().contains("resolver_url"));
    }

    #[test]
    fn test_verbosity_filters() {
        assert_eq!(VerbositySetting::Default.filter(), "info");
        assert_eq!(VerbositySetting::Verbose.filter(), "debug");
        assert_eq!(VerbositySetting::Quiet.filter(), "error");
        assert_eq!(VerbositySetting::Debug.filter(), "trace");
    }

    #[test]
    fn test_load_file_config_explicit_missing_file_errors() {
        let err = load_file_config(Some(Path::new("/nonexistent/track-downloader.toml")))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_file_config_explicit_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "require_wifi = true\n").expect("write config");

        let cfg = load_file_config(Some(&path)).expect("config should load");
        assert_eq!(cfg.require_wifi, Some(true));
    }
}
