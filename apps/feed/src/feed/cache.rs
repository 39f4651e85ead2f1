//! Local durable snapshot of the last successfully loaded queue, one blob per
//! user. Read once when a load starts, replaced once per successful refresh.
//! Only opportunities are stored: no decisions, no scores.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::opportunity::Opportunity;
use crate::models::profile::UserId;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache blob is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedFeed {
    pub user_id: UserId,
    pub saved_at: DateTime<Utc>,
    pub opportunities: Vec<Opportunity>,
}

#[async_trait]
pub trait FeedCache: Send + Sync {
    async fn read(&self, user_id: UserId) -> Result<Option<CachedFeed>, CacheError>;

    /// Replaces the user's blob atomically; readers see the old or the new one.
    async fn write(&self, feed: &CachedFeed) -> Result<(), CacheError>;
}

// ────────────────────────────────────────────────────────────────────────────
// File backend
// ────────────────────────────────────────────────────────────────────────────

/// One JSON file per user. Writes go to a temp file in the same directory and
/// are renamed over the old blob.
pub struct FileFeedCache {
    dir: PathBuf,
}

impl FileFeedCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, user_id: UserId) -> PathBuf {
        self.dir.join(format!("feed-{user_id}.json"))
    }
}

#[async_trait]
impl FeedCache for FileFeedCache {
    async fn read(&self, user_id: UserId) -> Result<Option<CachedFeed>, CacheError> {
        let path = self.path_for(user_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cached feed at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, feed: &CachedFeed) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(feed)?;
        let dir = self.dir.clone();
        let path = self.path_for(feed.user_id);

        tokio::task::spawn_blocking(move || -> Result<(), CacheError> {
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await??;

        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis backend
// ────────────────────────────────────────────────────────────────────────────

/// Blob per user under `feed:{user_id}`. A single SET replaces it atomically.
pub struct RedisFeedCache {
    client: redis::Client,
}

impl RedisFeedCache {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn key_for(user_id: UserId) -> String {
        format!("feed:{user_id}")
    }
}

#[async_trait]
impl FeedCache for RedisFeedCache {
    async fn read(&self, user_id: UserId) -> Result<Option<CachedFeed>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(Self::key_for(user_id)).await?;
        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(CacheError::from)
    }

    async fn write(&self, feed: &CachedFeed) -> Result<(), CacheError> {
        let blob = serde_json::to_string(feed)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(Self::key_for(feed.user_id), blob).await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory backend (tests)
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[derive(Default)]
pub struct MemoryFeedCache {
    blobs: std::sync::Mutex<std::collections::HashMap<UserId, CachedFeed>>,
    pub writes: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MemoryFeedCache {
    pub fn seeded(user_id: UserId, opportunities: Vec<Opportunity>) -> Self {
        let cache = Self::default();
        cache.blobs.lock().unwrap().insert(
            user_id,
            CachedFeed {
                user_id,
                saved_at: Utc::now(),
                opportunities,
            },
        );
        cache
    }

    pub fn get(&self, user_id: UserId) -> Option<CachedFeed> {
        self.blobs.lock().unwrap().get(&user_id).cloned()
    }
}

#[cfg(test)]
#[async_trait]
impl FeedCache for MemoryFeedCache {
    async fn read(&self, user_id: UserId) -> Result<Option<CachedFeed>, CacheError> {
        Ok(self.get(user_id))
    }

    async fn write(&self, feed: &CachedFeed) -> Result<(), CacheError> {
        self.writes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.blobs
            .lock()
            .unwrap()
            .insert(feed.user_id, feed.clone());
        Ok(())
    }
}
