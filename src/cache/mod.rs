// src/cache/mod.rs

//! Context-keyed result cache.
//!
//! - [`key`] derives [`CacheKey`]s from operation identity and context.
//! - [`store`] holds the bounded, time-expiring [`ResultCache`].
//! - [`stats`] keeps hit/miss/eviction counters.
//!
//! Eviction under pressure drops the *least recently inserted* entries.
//! Reads do not refresh an entry's position, so this is not true LRU.

pub mod key;
pub mod stats;
pub mod store;

pub use key::CacheKey;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use store::{CacheOptimizationReport, CachedValue, ResultCache};
