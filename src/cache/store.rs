// src/cache/store.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::key::CacheKey;
use crate::cache::stats::{CacheStats, CacheStatsSnapshot};
use crate::clock::Clock;
use crate::config::tuning::SharedTuning;
use crate::operation::ExecutionContext;

/// Stored entry. Owned exclusively by the cache; callers only ever see
/// resolved [`CachedValue`]s.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    context: ExecutionContext,
    inserted_at: Instant,
    generation_time: Duration,
    size_bytes: u64,
    /// Monotonic insertion counter; lower means inserted earlier.
    sequence: u64,
}

/// A value resolved from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    pub value: Value,
    /// Time since the entry was stored.
    pub age: Duration,
    /// How long the work took when the value was first produced.
    pub generation_time: Duration,
}

/// Result of a manual maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheOptimizationReport {
    /// Entries dropped because their ttl elapsed.
    pub removed: usize,
    /// Entries compressed in place. Values are stored as structured JSON with
    /// no compression stage, so this is always 0.
    pub compressed: usize,
    /// Entries dropped to get back under the entry limit or memory budget.
    pub rebalanced: usize,
    /// Estimated bytes released by both passes.
    pub memory_freed: u64,
}

/// Bounded, time-expiring key/value store for operation results.
///
/// All mutation goes through one internal lock, so a single cache can be
/// shared by every operation running concurrently in a phase.
#[derive(Debug)]
pub struct ResultCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    max_entries: usize,
    memory_budget_bytes: u64,
    tuning: SharedTuning,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
    sequence: AtomicU64,
}

impl ResultCache {
    pub fn new(
        max_entries: usize,
        memory_budget_bytes: u64,
        tuning: SharedTuning,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
            memory_budget_bytes,
            tuning,
            clock,
            stats: CacheStats::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Look up a value.
    ///
    /// Returns `None` when the entry is missing, older than the current ttl,
    /// or was stored under an incompatible context. Expired entries are left
    /// in place; only maintenance passes delete them. Every call updates the
    /// hit/miss counters.
    pub fn get(&self, key: &CacheKey, context: &ExecutionContext) -> Option<CachedValue> {
        let found = self.lookup(key, context);
        match &found {
            Some(cached) => {
                self.stats.record_hit();
                debug!(key = %key, age_ms = cached.age.as_millis() as u64, "cache hit");
            }
            None => {
                self.stats.record_miss();
                debug!(key = %key, "cache miss");
            }
        }
        found
    }

    /// Like [`get`](Self::get) but without touching the counters.
    ///
    /// Used by the planner to predict hits before execution.
    pub fn contains_valid(&self, key: &CacheKey, context: &ExecutionContext) -> bool {
        self.lookup(key, context).is_some()
    }

    fn lookup(&self, key: &CacheKey, context: &ExecutionContext) -> Option<CachedValue> {
        let ttl = self.tuning.cache_ttl();
        let now = self.clock.now();
        let entries = self.entries.lock();
        let entry = entries.get(key)?;

        let age = now.saturating_duration_since(entry.inserted_at);
        if age >= ttl || !entry.context.is_compatible_with(context) {
            return None;
        }

        Some(CachedValue {
            value: entry.value.clone(),
            age,
            generation_time: entry.generation_time,
        })
    }

    /// Store a value, overwriting any existing entry for `key`.
    ///
    /// An overwrite counts as a fresh insertion for eviction order. If the
    /// entry count exceeds the limit afterwards, the memory-pressure pass runs
    /// immediately.
    ///
    /// Returns the net change in estimated bytes held by the cache.
    pub fn set(
        &self,
        key: CacheKey,
        value: Value,
        context: &ExecutionContext,
        generation_time: Duration,
    ) -> i64 {
        let size_bytes = estimate_size(&key, &value);
        let entry = CacheEntry {
            value,
            context: context.clone(),
            inserted_at: self.clock.now(),
            generation_time,
            size_bytes,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        };

        let (replaced_bytes, over_limit) = {
            let mut entries = self.entries.lock();
            let replaced = entries.insert(key.clone(), entry).map_or(0, |old| old.size_bytes);
            (replaced, entries.len() > self.max_entries)
        };
        self.stats.record_write();
        debug!(key = %key, size_bytes, "cache set");

        let evicted_bytes = if over_limit {
            self.enforce_entry_limit().1
        } else {
            0
        };
        size_bytes as i64 - replaced_bytes as i64 - evicted_bytes as i64
    }

    /// Drop every entry whose age reached the current ttl.
    ///
    /// Returns `(removed, bytes_freed)`.
    pub fn remove_expired(&self) -> (usize, u64) {
        let ttl = self.tuning.cache_ttl();
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let before = entries.len();
        let mut freed = 0u64;
        entries.retain(|_, entry| {
            let alive = now.saturating_duration_since(entry.inserted_at) < ttl;
            if !alive {
                freed += entry.size_bytes;
            }
            alive
        });
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            self.stats.record_expirations(removed as u64);
            debug!(removed, bytes_freed = freed, "removed expired cache entries");
        }
        (removed, freed)
    }

    /// Evict least-recently-inserted entries until the count is within limit.
    ///
    /// Returns `(evicted, bytes_freed)`.
    pub fn enforce_entry_limit(&self) -> (usize, u64) {
        let max_entries = self.max_entries;
        self.evict_oldest_while(|count, _bytes| count > max_entries)
    }

    /// Evict least-recently-inserted entries until the estimated size fits
    /// the memory budget.
    pub fn enforce_memory_budget(&self) -> (usize, u64) {
        let budget = self.memory_budget_bytes;
        self.evict_oldest_while(|_count, bytes| bytes > budget)
    }

    fn evict_oldest_while<F>(&self, over: F) -> (usize, u64)
    where
        F: Fn(usize, u64) -> bool,
    {
        let mut entries = self.entries.lock();
        let mut total: u64 = entries.values().map(|e| e.size_bytes).sum();
        if !over(entries.len(), total) {
            return (0, 0);
        }

        // Decide first, then mutate.
        let mut order: Vec<(u64, CacheKey)> = entries
            .iter()
            .map(|(k, e)| (e.sequence, k.clone()))
            .collect();
        order.sort_unstable_by_key(|(seq, _)| *seq);

        let mut evicted = 0usize;
        let mut freed = 0u64;
        for (_, key) in order {
            if !over(entries.len(), total) {
                break;
            }
            if let Some(entry) = entries.remove(&key) {
                total = total.saturating_sub(entry.size_bytes);
                freed += entry.size_bytes;
                evicted += 1;
            }
        }
        let remaining = entries.len();
        drop(entries);

        if evicted > 0 {
            self.stats.record_evictions(evicted as u64);
            warn!(
                evicted,
                bytes_freed = freed,
                remaining,
                "cache under pressure; evicted oldest inserted entries"
            );
        }
        (evicted, freed)
    }

    /// Manual maintenance: expiry pass, then entry-limit and memory-budget passes.
    pub fn optimize(&self) -> CacheOptimizationReport {
        let (removed, expired_bytes) = self.remove_expired();
        let (by_count, count_bytes) = self.enforce_entry_limit();
        let (by_memory, memory_bytes) = self.enforce_memory_budget();

        let report = CacheOptimizationReport {
            removed,
            compressed: 0,
            rebalanced: by_count + by_memory,
            memory_freed: expired_bytes + count_bytes + memory_bytes,
        };
        info!(
            removed = report.removed,
            compressed = report.compressed,
            rebalanced = report.rebalanced,
            memory_freed = report.memory_freed,
            "cache optimization pass complete"
        );
        report
    }

    /// Remove entries whose key matches `pattern`, or everything when `None`.
    ///
    /// `pattern` is tried as a regular expression first; if it does not
    /// compile it is used as a plain substring.
    pub fn clear(&self, pattern: Option<&str>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();

        match pattern {
            None => entries.clear(),
            Some(p) => match Regex::new(p) {
                Ok(re) => entries.retain(|k, _| !re.is_match(k.as_str())),
                Err(e) => {
                    debug!(
                        pattern = %p,
                        error = %e,
                        "pattern is not a regex; matching as substring"
                    );
                    entries.retain(|k, _| !k.as_str().contains(p));
                }
            },
        }

        let cleared = before - entries.len();
        info!(cleared, pattern = ?pattern, "cache cleared");
        cleared
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Sum of estimated entry sizes.
    pub fn estimated_bytes(&self) -> u64 {
        self.entries.lock().values().map(|e| e.size_bytes).sum()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Estimated in-memory footprint of an entry: serialized value plus key.
fn estimate_size(key: &CacheKey, value: &Value) -> u64 {
    let value_len = serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0);
    (value_len + key.as_str().len()) as u64
}
