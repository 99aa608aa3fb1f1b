//! Persistent storage: the domain-keyed result cache.

mod cache;
mod pool;

pub use cache::{init_schema, lookup, upsert, CacheEntry};
pub use pool::init_db_pool_with_path;
