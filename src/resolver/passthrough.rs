//! Passthrough resolver for catalogs that already carry the address.

use async_trait::async_trait;

use super::{MetadataResolver, ResolveError};
use crate::track::TrackDescriptor;

/// A resolver that returns the descriptor unchanged.
///
/// Used when the catalog file already lists playable uris, and as the
/// fallback when no resolver service is configured.
#[derive(Debug, Default)]
pub struct PassthroughResolver;

impl PassthroughResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetadataResolver for PassthroughResolver {
    #[tracing::instrument(skip(self, track), fields(resolver = "passthrough", track_id = %track.id))]
    async fn resolve(&self, track: &TrackDescriptor) -> Result<TrackDescriptor, ResolveError> {
        Ok(track.clone())
    }
}
