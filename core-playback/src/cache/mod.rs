//! # Media Cache
//!
//! Memoizes decoded audio per media key, with at most one fetch+decode in
//! flight per key.

pub mod manager;
pub mod stats;

pub use manager::MediaCache;
pub use stats::CacheStats;
