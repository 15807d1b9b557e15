//! Key-value store abstraction shared by the query and embedding caches

mod repository;

pub(crate) use repository::glob_to_regex;
pub use repository::{KeyValueStore, KeyValueStoreExt, MAX_STORE_TTL};

#[cfg(test)]
pub use repository::mock::MockKeyValueStore;
