//! Response caching
//!
//! Provides the [`ResponseCache`] interface plus two storage backends:
//! - SQLite file store for persistence across runs
//! - In-memory store for ephemeral use

mod memory;
mod sqlite;
mod store;

pub use memory::MemoryCacheStore;
pub use sqlite::SqliteCacheStore;
pub use store::{CacheEntry, CacheStats, ResponseCache};
