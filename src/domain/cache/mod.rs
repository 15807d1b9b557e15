//! Query cache domain: entries, keys, configuration and the overlap gate

mod config;
mod entry;
pub mod key;
mod stats;
mod validator;

pub use config::QueryCacheConfig;
pub use entry::CacheEntry;
pub use stats::{CacheLookup, CacheStats, CacheTier, MissReason};
pub use validator::validate;
