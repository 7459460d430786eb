pub mod kv;
pub mod memory;
pub mod redis_store;

pub use kv::{KeyValue, StoreError};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
