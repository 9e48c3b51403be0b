//! Playable track descriptors and download naming.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File extension used for every downloaded track.
pub const AUDIO_EXTENSION: &str = "mp3";

/// Separator placed between artist and title in download file names.
pub const ARTIST_TITLE_SEPARATOR: &str = " - ";

/// Where a track's audio lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Streamed from a catalog; can be downloaded.
    #[default]
    Remote,
    /// Already a file on this device.
    Local,
}

impl SourceType {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            _ => Err(format!("invalid source type: {s}")),
        }
    }
}

/// A playable audio item as described by the catalog.
///
/// `uri` stays `None` until the metadata resolver fills it in. For local
/// tracks it holds the on-device file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Stable catalog identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Album name, when the catalog knows it.
    #[serde(default)]
    pub album: Option<String>,
    /// Remote or local.
    #[serde(default)]
    pub source_type: SourceType,
    /// Resolved playable address.
    #[serde(default)]
    pub uri: Option<String>,
    /// Cleared by the catalog when licensing forbids downloads.
    #[serde(default = "default_downloadable")]
    pub downloadable: bool,
}

fn default_downloadable() -> bool {
    true
}

impl TrackDescriptor {
    /// Creates a downloadable remote track with no resolved address yet.
    #[must_use]
    pub fn remote(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            source_type: SourceType::Remote,
            uri: None,
            downloadable: true,
        }
    }

    /// Creates a local track stored at `path`.
    #[must_use]
    pub fn local(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            source_type: SourceType::Local,
            uri: Some(path.into()),
            ..Self::remote(id, title, artist)
        }
    }

    /// Returns the same track with `uri` set.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Returns the same track with the downloadable flag set to `downloadable`.
    #[must_use]
    pub fn with_downloadable(mut self, downloadable: bool) -> Self {
        self.downloadable = downloadable;
        self
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.source_type == SourceType::Local
    }

    /// Returns the resolved address if present and non-empty.
    #[must_use]
    pub fn resolved_uri(&self) -> Option<&str> {
        self.uri.as_deref().filter(|uri| !uri.is_empty())
    }

    /// File name used for the downloaded audio: `"{artist} - {title}.mp3"`.
    #[must_use]
    pub fn download_file_name(&self) -> String {
        format!(
            "{}{ARTIST_TITLE_SEPARATOR}{}.{AUDIO_EXTENSION}",
            self.artist, self.title
        )
    }
}

/// Computes where a track is saved inside `download_dir`.
///
/// Purely a function of artist and title: two tracks sharing both map to the
/// same path and the later transfer overwrites the earlier file. Names are
/// not sanitized.
#[must_use]
pub fn destination_path(download_dir: &Path, track: &TrackDescriptor) -> PathBuf {
    download_dir.join(track.download_file_name())
}
