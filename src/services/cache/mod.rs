use crate::models::{RecommendationBatch, RecommendationQuery};
use dashmap::DashMap;
use redis::AsyncCommands;
use std::time::{Duration, Instant};
use tracing::warn;
use uuid::Uuid;

struct CacheEntry {
    payload: String,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// Short-TTL result cache. The in-memory map is authoritative for a single
/// process; Redis, when configured, shares entries across replicas. The cache
/// is advisory: any backing-store failure degrades to uncached operation.
pub struct ResultCache {
    entries: DashMap<String, CacheEntry>,
    redis: Option<redis::Client>,
    default_ttl: Duration,
}

impl ResultCache {
    pub fn in_memory(ttl_seconds: u64) -> Self {
        Self {
            entries: DashMap::new(),
            redis: None,
            default_ttl: Duration::from_secs(ttl_seconds),
        }
    }

    pub fn with_redis(client: redis::Client, ttl_seconds: u64) -> Self {
        Self {
            entries: DashMap::new(),
            redis: Some(client),
            default_ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Two requests differing in any parameter must never collide, so the key
    /// covers the caller identity and the full serialized query.
    pub fn cache_key(user_id: Option<Uuid>, query: &RecommendationQuery) -> String {
        let identity = user_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "anonymous".to_string());
        let params = serde_json::to_string(query).unwrap_or_default();
        format!("recommendations:{}:{}", identity, params)
    }

    pub async fn get(&self, key: &str) -> Option<RecommendationBatch> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                match serde_json::from_str(&entry.payload) {
                    Ok(batch) => return Some(batch),
                    Err(e) => warn!("Dropping undecodable cache entry: {}", e),
                }
            }
            drop(entry);
            self.entries.remove(key);
        }

        if let Some(client) = &self.redis {
            match client.get_async_connection().await {
                Ok(mut conn) => match conn.get::<_, Option<String>>(key).await {
                    Ok(Some(payload)) => match serde_json::from_str(&payload) {
                        Ok(batch) => {
                            self.entries.insert(
                                key.to_string(),
                                CacheEntry {
                                    payload,
                                    stored_at: Instant::now(),
                                    ttl: self.default_ttl,
                                },
                            );
                            return Some(batch);
                        }
                        Err(e) => warn!("Undecodable redis cache entry: {}", e),
                    },
                    Ok(None) => {}
                    Err(e) => warn!("Redis cache read failed, continuing uncached: {}", e),
                },
                Err(e) => warn!("Redis unavailable, continuing uncached: {}", e),
            }
        }

        None
    }

    pub async fn set(&self, key: &str, batch: &RecommendationBatch) {
        let payload = match serde_json::to_string(batch) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize batch for cache: {}", e);
                return;
            }
        };

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                payload: payload.clone(),
                stored_at: Instant::now(),
                ttl: self.default_ttl,
            },
        );

        if let Some(client) = &self.redis {
            match client.get_async_connection().await {
                Ok(mut conn) => {
                    let result: redis::RedisResult<()> = conn
                        .set_ex(key, payload, self.default_ttl.as_secs())
                        .await;
                    if let Err(e) = result {
                        warn!("Redis cache write failed, result served uncached next time: {}", e);
                    }
                }
                Err(e) => warn!("Redis unavailable, skipping cache write: {}", e),
            }
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
