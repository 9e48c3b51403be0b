//! Metadata resolution: turning a catalog descriptor into a playable address.
//!
//! - [`MetadataResolver`] - the seam the enqueuer awaits on
//! - [`PassthroughResolver`] - returns the descriptor unchanged
//! - [`HttpMetadataResolver`] - asks a catalog service over HTTP

mod error;
mod http;
mod passthrough;

use async_trait::async_trait;

pub use error::ResolveError;
pub use http::{HttpMetadataResolver, RESOLVER_CONNECT_TIMEOUT_SECS, RESOLVER_READ_TIMEOUT_SECS};
pub use passthrough::PassthroughResolver;

use crate::track::TrackDescriptor;

/// Fetches full metadata, including the resolved uri, for a track.
///
/// Success with an absent or empty uri is a valid answer: the track exists
/// but cannot be downloaded right now.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Returns a copy of `track` with whatever the source knows filled in.
    async fn resolve(&self, track: &TrackDescriptor) -> Result<TrackDescriptor, ResolveError>;
}
