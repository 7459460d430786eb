//! Redis-backed KeyValue implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{info, warn};

use crate::kv::{KeyValue, Result, StoreError};

pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    /// Connect with bounded retries. The connection manager reconnects on
    /// its own afterwards; this only guards startup ordering against a
    /// slower Redis container.
    pub async fn connect(url: &str, max_retries: u32) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut attempt = 0;
        loop {
            match redis::aio::ConnectionManager::new(client.clone()).await {
                Ok(conn) => {
                    info!("Connected to Redis");
                    return Ok(Self { conn });
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(StoreError::Unavailable(format!(
                            "failed to connect after {max_retries} attempts: {e}"
                        )));
                    }
                    warn!(attempt, error = %e, "Redis connection failed, retrying");
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }
        }
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    // Redis rejects EX 0; clamp sub-second TTLs up to one second.
    ttl.as_secs().max(1)
}

#[async_trait]
impl KeyValue for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| StoreError::Operation(e.to_string()))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl))
            .await
            .map_err(|e| StoreError::Operation(e.to_string()))
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        // SET key value NX EX ttl — nil reply means the key already existed.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Operation(e.to_string()))?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| StoreError::Operation(e.to_string()))
    }
}
