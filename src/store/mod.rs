//! Local track metadata store.
//!
//! Every track that goes through the enqueuer is cached here so the player
//! can list it offline. The favorite flag belongs to the user and is only
//! written when the caller asks for it.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::FromRow;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::events::{Observer, Observers, SubscriptionId};
use crate::track::{SourceType, TrackDescriptor};

/// Errors from the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("track store database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No cached row has this id.
    #[error("track not found: {0}")]
    TrackNotFound(String),
}

/// Changes published by [`SqliteTrackStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    FavoriteChanged { track_id: String, favorite: bool },
}

/// Persists track metadata locally.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Inserts or updates a track.
    ///
    /// With `favorite_update == false` the stored favorite flag is left
    /// untouched (new rows start as non-favorite).
    async fn upsert(&self, track: &TrackDescriptor, favorite_update: bool) -> Result<(), StoreError>;
}

/// A cached row from the `tracks` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StoredTrack {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    #[sqlx(rename = "source_type")]
    pub source_type_str: String,
    pub uri: Option<String>,
    pub downloadable: bool,
    pub is_favorite: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl StoredTrack {
    /// Falls back to `Remote` if the stored string is invalid.
    #[must_use]
    pub fn source_type(&self) -> SourceType {
        self.source_type_str.parse().unwrap_or_default()
    }

    #[must_use]
    pub fn to_descriptor(&self) -> TrackDescriptor {
        TrackDescriptor {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            source_type: self.source_type(),
            uri: self.uri.clone(),
            downloadable: self.downloadable,
        }
    }
}

/// [`LocalStore`] over the `tracks` table.
#[derive(Debug)]
pub struct SqliteTrackStore {
    db: Database,
    observers: Observers<StoreEvent>,
}

impl SqliteTrackStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            db,
            observers: Observers::new(),
        }
    }

    /// Subscribes to favorite changes.
    pub fn subscribe(&self, observer: Arc<dyn Observer<StoreEvent>>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Writes `track`, marking it favorite when `favorite` is `Some(true)`.
    ///
    /// `None` leaves the stored flag as it is.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the statement fails.
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub async fn save(&self, track: &TrackDescriptor, favorite: Option<bool>) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO tracks (id, title, artist, album, source_type, uri, downloadable, is_favorite)
              VALUES (?, ?, ?, ?, ?, ?, ?, COALESCE(?, 0))
              ON CONFLICT(id) DO UPDATE SET
                  title = excluded.title,
                  artist = excluded.artist,
                  album = excluded.album,
                  source_type = excluded.source_type,
                  uri = excluded.uri,
                  downloadable = excluded.downloadable,
                  is_favorite = COALESCE(?, tracks.is_favorite),
                  updated_at = datetime('now')",
        )
        .bind(&track.id)
        .bind(&track.title)
        .bind(&track.artist)
        .bind(track.album.as_deref())
        .bind(track.source_type.as_str())
        .bind(track.uri.as_deref())
        .bind(track.downloadable)
        .bind(favorite)
        .bind(favorite)
        .execute(self.db.pool())
        .await?;

        debug!("track cached");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Option<StoredTrack>, StoreError> {
        let track = sqlx::query_as::<_, StoredTrack>(r"SELECT * FROM tracks WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(track)
    }

    /// Flips the favorite flag of a cached track and returns the new value.
    ///
    /// Observers get a [`StoreEvent::FavoriteChanged`] after the write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TrackNotFound`] if the track is not cached, or
    /// [`StoreError::Database`] if the update fails.
    #[instrument(skip(self))]
    pub async fn toggle_favorite(&self, id: &str) -> Result<bool, StoreError> {
        let favorite = sqlx::query_scalar::<_, bool>(
            r"UPDATE tracks
              SET is_favorite = NOT is_favorite, updated_at = datetime('now')
              WHERE id = ?
              RETURNING is_favorite",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| StoreError::TrackNotFound(id.to_string()))?;

        debug!(favorite, "favorite toggled");
        self.observers.publish(&StoreEvent::FavoriteChanged {
            track_id: id.to_string(),
            favorite,
        });
        Ok(favorite)
    }
}

#[async_trait]
impl LocalStore for SqliteTrackStore {
    async fn upsert(&self, track: &TrackDescriptor, favorite_update: bool) -> Result<(), StoreError> {
        // A favorite update marks the track; anything else keeps the user's choice.
        let favorite = favorite_update.then_some(true);
        self.save(track, favorite).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    async fn store() -> SqliteTrackStore {
        SqliteTrackStore::new(Database::new_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_upsert_inserts_non_favorite() {
        let store = store().await;
        let track = TrackDescriptor::remote("t1", "Children", "Robert Miles")
            .with_uri("https://cdn.example.com/children.mp3");

        store.upsert(&track, false).await.unwrap();

        let stored = store.get("t1").await.unwrap().unwrap();
        assert!(!stored.is_favorite);
        assert_eq!(stored.to_descriptor(), track);
    }

    #[tokio::test]
    async fn test_non_favorite_upsert_keeps_existing_favorite() {
        let store = store().await;
        let track = TrackDescriptor::remote("t1", "Children", "Robert Miles");
        store.upsert(&track, true).await.unwrap();

        let renamed = TrackDescriptor::remote("t1", "Children (Dream Version)", "Robert Miles");
        store.upsert(&renamed, false).await.unwrap();

        let stored = store.get("t1").await.unwrap().unwrap();
        assert!(stored.is_favorite);
        assert_eq!(stored.title, "Children (Dream Version)");
    }

    #[tokio::test]
    async fn test_save_can_clear_favorite() {
        let store = store().await;
        let track = TrackDescriptor::remote("t1", "Children", "Robert Miles");
        store.save(&track, Some(true)).await.unwrap();
        store.save(&track, Some(false)).await.unwrap();

        assert!(!store.get("t1").await.unwrap().unwrap().is_favorite);
    }

    #[tokio::test]
    async fn test_get_missing_track_is_none() {
        let store = store().await;
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_toggle_favorite_flips_and_publishes() {
        let store = store().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(Arc::new(move |event: &StoreEvent| {
            sink.lock().unwrap().push(event.clone());
        }));
        store
            .upsert(&TrackDescriptor::remote("t1", "Children", "Robert Miles"), false)
            .await
            .unwrap();

        assert!(store.toggle_favorite("t1").await.unwrap());
        assert!(store.get("t1").await.unwrap().unwrap().is_favorite);
        assert!(!store.toggle_favorite("t1").await.unwrap());
        assert!(!store.get("t1").await.unwrap().unwrap().is_favorite);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                StoreEvent::FavoriteChanged {
                    track_id: "t1".to_string(),
                    favorite: true,
                },
                StoreEvent::FavoriteChanged {
                    track_id: "t1".to_string(),
                    favorite: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_toggle_favorite_missing_track_publishes_nothing() {
        let store = store().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = store.subscribe(Arc::new(move |event: &StoreEvent| {
            sink.lock().unwrap().push(event.clone());
        }));

        let err = store.toggle_favorite("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::TrackNotFound(ref track_id) if track_id == "nope"));
        assert!(seen.lock().unwrap().is_empty());
        assert!(store.unsubscribe(id));
    }

    #[tokio::test]
    async fn test_unsubscribed_observer_misses_toggle() {
        let store = store().await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = store.subscribe(Arc::new(move |event: &StoreEvent| {
            sink.lock().unwrap().push(event.clone());
        }));
        store
            .upsert(&TrackDescriptor::remote("t1", "Children", "Robert Miles"), true)
            .await
            .unwrap();

        assert!(store.unsubscribe(id));
        assert!(!store.toggle_favorite("t1").await.unwrap());
        assert!(seen.lock().unwrap().is_empty());
    }
}
