//! Bounded memoization with deterministic keys, LRU eviction, and statistics.
//!
//! This module provides [`MemoizingCache`], the generic cache primitive
//! backing both type decomposition and reference resolution. The cache is a
//! plain synchronous map with an explicit recency order: `get` refreshes an
//! entry's recency, `set` evicts the least-recently-accessed entry when a
//! new key would exceed capacity, and nothing else mutates entries.
//!
//! # Key Construction Contract
//!
//! The single most damaging defect class for this component is a cache key
//! that under-discriminates its input: two logically distinct inputs landing
//! on one key make the cache return a different entity's previously-cached
//! result. Key-building functions must therefore be pure, collision-free
//! encodings of the logical input:
//!
//! - Two inputs denoting the same logical entity always produce the same key.
//! - Two inputs denoting different entities never produce the same key, even
//!   if they render identically as text.
//! - When the canonical fields needed to disambiguate an entity cannot be
//!   extracted, key construction fails loudly with
//!   [`SigtreeError::KeyDerivation`] instead of falling back to a constant or
//!   an incidental textual rendering.
//!
//! The callers in this crate honor the contract with typed key structs
//! ([`ReferenceKey`](crate::resolver::ReferenceKey)) and canonical
//! normalization ([`normalize_signature`](crate::decompose::normalize_signature)).
//!
//! # Examples
//!
//! ```rust
//! use sigtree::cache::MemoizingCache;
//!
//! # fn example() -> anyhow::Result<()> {
//! let mut cache = MemoizingCache::new(2, true)?;
//!
//! cache.set("a".to_string(), 1);
//! cache.set("b".to_string(), 2);
//! assert_eq!(cache.get(&"a".to_string()), Some(1));
//!
//! // "b" is now the least recently accessed entry and is evicted first
//! cache.set("c".to_string(), 3);
//! assert!(cache.get(&"b".to_string()).is_none());
//!
//! let stats = cache.stats();
//! assert_eq!(stats.size, 2);
//! assert_eq!(stats.max_size, 2);
//! # Ok(())
//! # }
//! ```

use crate::core::error::SigtreeError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{debug, trace};

/// Default capacity for the type decomposition cache.
pub const DEFAULT_TYPE_CACHE_SIZE: usize = 256;

/// Default capacity for the reference resolution cache.
pub const DEFAULT_REFERENCE_CACHE_SIZE: usize = 512;

/// Per-cache configuration: capacity and an on/off switch.
///
/// Embedded in [`CacheConfig`](crate::coordinator::CacheConfig) for each of
/// the two caches the coordinator owns. Deserializable so host tools can
/// carry the surface in their own configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of entries before LRU eviction kicks in.
    pub max_size: usize,
    /// Whether this cache participates at all. When `false`, lookups bypass
    /// the cache entirely and nothing is stored.
    pub enabled: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_TYPE_CACHE_SIZE,
            enabled: true,
        }
    }
}

impl CacheSettings {
    /// Settings with an explicit capacity, enabled.
    #[must_use]
    pub const fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            enabled: true,
        }
    }

    /// Settings for a disabled cache.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            max_size: 0,
            enabled: false,
        }
    }
}

/// Point-in-time snapshot of a cache's occupancy and lookup counters.
///
/// Snapshots are plain values, not live views: numbers do not change after
/// the snapshot is taken. `hit_rate` is `hit_count / (hit_count + miss_count)`
/// and 0.0 when no lookups have been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStatistics {
    /// Number of entries currently stored.
    pub size: usize,
    /// Configured capacity.
    pub max_size: usize,
    /// Lookups that found a warm entry.
    pub hit_count: u64,
    /// Lookups that found nothing.
    pub miss_count: u64,
    /// `hit_count / (hit_count + miss_count)`, or 0.0 with no lookups.
    pub hit_rate: f64,
}

impl CacheStatistics {
    /// The all-zero snapshot reported for a disabled cache.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            size: 0,
            max_size: 0,
            hit_count: 0,
            miss_count: 0,
            hit_rate: 0.0,
        }
    }
}

/// Bounded memoization cache with LRU eviction and hit/miss statistics.
///
/// Entries are owned exclusively by the cache; eviction destroys the entry
/// but never the referenced value's owner elsewhere (callers store `Arc`s
/// for shared values). Recency is tracked in a separate order list — front
/// is most recently used, back is least recently used: map for O(1) lookup,
/// deque for eviction order.
///
/// All operations are simple synchronous map operations with no in-flight
/// state, so re-entrant use during recursive decomposition is safe.
#[derive(Debug)]
pub struct MemoizingCache<K, V> {
    entries: HashMap<K, V>,
    /// Recency order. Front is most recently used, back is least.
    recency: VecDeque<K>,
    max_size: usize,
    enable_stats: bool,
    hit_count: u64,
    miss_count: u64,
}

impl<K, V> MemoizingCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Creates a cache bounded to `max_size` entries.
    ///
    /// When `enable_stats` is `false`, hit/miss counters stay at zero and
    /// [`stats`](Self::stats) reports occupancy only.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::InvalidCacheSize`] if `max_size` is zero.
    /// There is no clamping: a zero capacity is a programming error, not a
    /// tuning choice.
    pub fn new(max_size: usize, enable_stats: bool) -> Result<Self> {
        if max_size == 0 {
            return Err(SigtreeError::InvalidCacheSize {
                cache: "memoizing".to_string(),
                size: max_size,
            }
            .into());
        }
        Ok(Self {
            entries: HashMap::new(),
            recency: VecDeque::new(),
            max_size,
            enable_stats,
            hit_count: 0,
            miss_count: 0,
        })
    }

    /// Creates a cache from [`CacheSettings`], labeling errors with `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SigtreeError::InvalidCacheSize`] naming `name` when the
    /// settings carry a zero capacity.
    pub fn from_settings(name: &str, settings: &CacheSettings, enable_stats: bool) -> Result<Self> {
        if settings.max_size == 0 {
            return Err(SigtreeError::InvalidCacheSize {
                cache: name.to_string(),
                size: settings.max_size,
            }
            .into());
        }
        Self::new(settings.max_size, enable_stats)
    }

    /// Looks up `key`, recording a hit or miss and refreshing recency on hit.
    pub fn get(&mut self, key: &K) -> Option<V> {
        if self.entries.contains_key(key) {
            self.touch(key);
            if self.enable_stats {
                self.hit_count += 1;
            }
            trace!(?key, "cache hit");
            self.entries.get(key).cloned()
        } else {
            if self.enable_stats {
                self.miss_count += 1;
            }
            trace!(?key, "cache miss");
            None
        }
    }

    /// Inserts or overwrites `key`.
    ///
    /// A new key that would exceed capacity evicts the least-recently-
    /// accessed entry first; overwriting an existing key only refreshes its
    /// recency.
    pub fn set(&mut self, key: K, value: V) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key.clone(), value);
            self.touch(&key);
            return;
        }
        if self.entries.len() >= self.max_size {
            self.evict_lru();
        }
        self.entries.insert(key.clone(), value);
        self.recency.push_front(key);
    }

    /// Removes `key`, returning its value if present.
    ///
    /// Part of the explicit invalidation surface; does not touch hit/miss
    /// counters.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            if let Some(pos) = self.recency.iter().position(|k| k == key) {
                self.recency.remove(pos);
            }
        }
        removed
    }

    /// Keeps only the entries for which `pred` returns `true`.
    ///
    /// Part of the explicit invalidation surface; does not touch hit/miss
    /// counters. Relative recency of surviving entries is preserved.
    pub fn retain(&mut self, mut pred: impl FnMut(&K, &V) -> bool) {
        self.entries.retain(|k, v| pred(k, v));
        let entries = &self.entries;
        self.recency.retain(|k| entries.contains_key(k));
    }

    /// Empties the cache and resets the hit/miss counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.hit_count = 0;
        self.miss_count = 0;
    }

    /// Takes a point-in-time statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> CacheStatistics {
        let lookups = self.hit_count + self.miss_count;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            self.hit_count as f64 / lookups as f64
        };
        CacheStatistics {
            size: self.entries.len(),
            max_size: self.max_size,
            hit_count: self.hit_count,
            miss_count: self.miss_count,
            hit_rate,
        }
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is present, without perturbing recency or statistics.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Configured capacity.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Moves `key` to the front of the recency order.
    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_front(k);
            }
        }
    }

    /// Drops the least-recently-accessed entry.
    fn evict_lru(&mut self) {
        if let Some(lru) = self.recency.pop_back() {
            debug!(key = ?lru, "evicting least recently used cache entry");
            self.entries.remove(&lru);
        }
    }
}
