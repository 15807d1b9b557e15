//! Query cache infrastructure

mod manager;

pub use manager::MultiStageCacheManager;
