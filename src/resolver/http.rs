//! HTTP catalog resolver.
//!
//! Calls `GET {base_url}/tracks/{id}` and merges the JSON answer onto the
//! descriptor:
//!
//! ```json
//! { "uri": "https://cdn.example.com/a.mp3", "title": "...", "artist": "...", "album": "..." }
//! ```
//!
//! `uri` may be null. Missing optional fields keep the descriptor's values.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{MetadataResolver, ResolveError};
use crate::track::TrackDescriptor;
use crate::user_agent::resolver_user_agent;

/// Connection timeout for catalog requests.
pub const RESOLVER_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Whole-request timeout for catalog requests.
pub const RESOLVER_READ_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct TrackMetadata {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    album: Option<String>,
}

impl TrackMetadata {
    fn merge_onto(self, track: &TrackDescriptor) -> TrackDescriptor {
        let mut merged = track.clone();
        merged.uri = self.uri;
        if let Some(title) = self.title {
            merged.title = title;
        }
        if let Some(artist) = self.artist {
            merged.artist = artist;
        }
        if self.album.is_some() {
            merged.album = self.album;
        }
        merged
    }
}

/// Resolves tracks against a catalog service.
pub struct HttpMetadataResolver {
    client: Client,
    base_url: Url,
}

impl HttpMetadataResolver {
    /// Creates a resolver for `base_url` with the default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Setup`] if the url is invalid or the HTTP
    /// client cannot be built.
    #[tracing::instrument(skip_all, fields(base_url = %base_url.as_ref()))]
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ResolveError> {
        Self::with_timeouts(
            base_url,
            RESOLVER_CONNECT_TIMEOUT_SECS,
            RESOLVER_READ_TIMEOUT_SECS,
        )
    }

    /// Creates a resolver with explicit timeouts in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Setup`] if the url is invalid or the HTTP
    /// client cannot be built.
    pub fn with_timeouts(
        base_url: impl AsRef<str>,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, ResolveError> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| ResolveError::Setup(format!("invalid resolver url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ResolveError::Setup(format!(
                "resolver url cannot be a base: {base_url}"
            )));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .user_agent(resolver_user_agent())
            .gzip(true)
            .build()
            .map_err(|e| ResolveError::Setup(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn track_url(&self, track_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("tracks").push(track_id);
        }
        url
    }
}

impl std::fmt::Debug for HttpMetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMetadataResolver")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MetadataResolver for HttpMetadataResolver {
    #[tracing::instrument(skip(self, track), fields(resolver = "http", track_id = %track.id))]
    async fn resolve(&self, track: &TrackDescriptor) -> Result<TrackDescriptor, ResolveError> {
        let url = self.track_url(&track.id);
        debug!(api_url = %url, "calling catalog");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(error = %e, "catalog request failed");
            ResolveError::unreachable(&track.id, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "catalog returned error status");
            return Err(ResolveError::status(&track.id, status.as_u16()));
        }

        let metadata = response.json::<TrackMetadata>().await.map_err(|e| {
            warn!(error = %e, "failed to parse catalog response");
            ResolveError::invalid_response(&track.id, "catalog response is not valid track JSON")
        })?;

        Ok(metadata.merge_onto(track))
    }
}
