//! Stores the session reads once at open and writes on confirmed playback.

use std::collections::{BTreeMap, BTreeSet};

use reelroute_core::{EpisodeKey, PersistedPreference};
use reelroute_db::repo;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Last source that confirmed a successful load. Single record, last write wins.
#[async_trait::async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self) -> Result<Option<PersistedPreference>, StoreError>;
    async fn set(&self, pref: &PersistedPreference) -> Result<(), StoreError>;
}

/// Watched-episode markers per series.
#[async_trait::async_trait]
pub trait WatchProgressStore: Send + Sync {
    async fn mark_watched(&self, native_id: &str, episode: EpisodeKey) -> Result<(), StoreError>;
    /// Season/episode order.
    async fn watched(&self, native_id: &str) -> Result<Vec<EpisodeKey>, StoreError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PreferenceStore for SqliteStore {
    async fn get(&self) -> Result<Option<PersistedPreference>, StoreError> {
        Ok(repo::settings::get_source_preference(&self.pool).await?)
    }

    async fn set(&self, pref: &PersistedPreference) -> Result<(), StoreError> {
        Ok(repo::settings::set_source_preference(&self.pool, pref).await?)
    }
}

#[async_trait::async_trait]
impl WatchProgressStore for SqliteStore {
    async fn mark_watched(&self, native_id: &str, episode: EpisodeKey) -> Result<(), StoreError> {
        Ok(repo::watch_progress::mark_watched(&self.pool, native_id, episode).await?)
    }

    async fn watched(&self, native_id: &str) -> Result<Vec<EpisodeKey>, StoreError> {
        Ok(repo::watch_progress::watched_episodes(&self.pool, native_id).await?)
    }
}

/// Process-local store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    preference: Mutex<Option<PersistedPreference>>,
    watched: Mutex<BTreeMap<String, BTreeSet<EpisodeKey>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preference(pref: PersistedPreference) -> Self {
        Self {
            preference: Mutex::new(Some(pref)),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl PreferenceStore for MemoryStore {
    async fn get(&self) -> Result<Option<PersistedPreference>, StoreError> {
        Ok(self.preference.lock().await.clone())
    }

    async fn set(&self, pref: &PersistedPreference) -> Result<(), StoreError> {
        *self.preference.lock().await = Some(pref.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl WatchProgressStore for MemoryStore {
    async fn mark_watched(&self, native_id: &str, episode: EpisodeKey) -> Result<(), StoreError> {
        self.watched
            .lock()
            .await
            .entry(native_id.to_string())
            .or_default()
            .insert(episode);
        Ok(())
    }

    async fn watched(&self, native_id: &str) -> Result<Vec<EpisodeKey>, StoreError> {
        Ok(self
            .watched
            .lock()
            .await
            .get(native_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }
}
