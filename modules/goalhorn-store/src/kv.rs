//! The durable key-value boundary.
//!
//! Everything the engine persists (seen-event markers, post-key mappings,
//! goalie cache, claim locks) goes through this trait using atomic
//! primitives only — no read-modify-write without an atomic guard.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store operation failed: {0}")]
    Operation(String),
}

#[async_trait]
pub trait KeyValue: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a key that expires after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Atomically set a key only if it does not exist. Returns true if this
    /// call claimed the key. The one primitive racing workers rely on.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    async fn delete(&self, key: &str) -> Result<()>;
}
