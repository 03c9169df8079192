//! Redis-backed latest-price cache.
//!
//! Uses the `redis` crate's `ConnectionManager` (multiplexed,
//! auto-reconnecting) so that a Redis restart degrades `SetLatest`/
//! `GetLatest` to warnings instead of killing the pipeline.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::warn;

use crate::domain::models::PriceUpdate;
use crate::domain::ports::Cache;
use crate::error::CacheError;

pub struct RedisCache {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisCache {
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn, ttl })
    }

    fn key(exchange: &str, pair: &str) -> String {
        format!("latest:{exchange}:{pair}")
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn set_latest(&self, update: &PriceUpdate) -> Result<(), CacheError> {
        let key = Self::key(&update.exchange, &update.pair);
        let payload = serde_json::to_string(update)?;
        let mut conn = self.conn.clone();
        let ttl_secs = self.ttl.as_secs().max(1);
        let () = conn.set_ex(key, payload, ttl_secs).await?;
        Ok(())
    }

    async fn get_latest(&self, exchange: &str, pair: &str) -> Result<Option<PriceUpdate>, CacheError> {
        let key = Self::key(exchange, pair);
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn clean_old(&self, pattern: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let deleted: i64 = conn.del(&keys).await?;
                if deleted == 0 {
                    warn!(pattern, "clean_old scan matched keys but delete removed none");
                }
            }

            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }
        Ok(())
    }
}
