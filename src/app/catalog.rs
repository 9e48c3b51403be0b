//! JSON track catalogs.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use track_downloader::TrackDescriptor;

/// Reads a catalog file: a JSON array of track descriptors.
pub(crate) fn load_catalog(path: &Path) -> Result<Vec<TrackDescriptor>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse catalog '{}'", path.display()))
}

/// Picks tracks by id, in the order the ids were given.
///
/// An empty `ids` selects the whole catalog.
pub(crate) fn select_tracks(
    catalog: &[TrackDescriptor],
    ids: &[String],
) -> Result<Vec<TrackDescriptor>> {
    if ids.is_empty() {
        return Ok(catalog.to_vec());
    }
    ids.iter()
        .map(|id| find_track(catalog, id).cloned())
        .collect()
}

pub(crate) fn find_track<'a>(catalog: &'a [TrackDescriptor], id: &str) -> Result<&'a TrackDescriptor> {
    match catalog.iter().find(|track| track.id == id) {
        Some(track) => Ok(track),
        None => bail!("Track '{id}' not found in catalog"),
    }
}
