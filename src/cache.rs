// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tracing::debug;

pub const DEFAULT_TTL_MINUTES: i64 = 5;
pub const CATEGORY_TTL_MINUTES: i64 = 10;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Operation name plus its parameters in canonical (sorted) form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    op: &'static str,
    params: String,
}

impl CacheKey {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            params: String::from("{}"),
        }
    }

    /// Builds a key from `(name, value)` pairs; their order is irrelevant.
    pub fn with_params<I, K, V>(op: &'static str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Serialize,
    {
        let record: BTreeMap<String, serde_json::Value> = params
            .into_iter()
            .map(|(k, v)| {
                (
                    k.into(),
                    serde_json::to_value(v).unwrap_or(serde_json::Value::Null),
                )
            })
            .collect();
        Self {
            op,
            params: serde_json::Value::Object(record.into_iter().collect()).to_string(),
        }
    }

    pub fn op(&self) -> &str {
        self.op
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct Entry<V> {
    value: V,
    written_at: DateTime<Utc>,
    ttl: Duration,
}

pub struct ReportCache<V, C = SystemClock> {
    entries: HashMap<CacheKey, Entry<V>>,
    clock: C,
    default_ttl: Duration,
    stats: CacheStats,
}

impl<V: Clone> ReportCache<V, SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<V: Clone> Default for ReportCache<V, SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone, C: Clock> ReportCache<V, C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
            default_ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
            stats: CacheStats::default(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Returns the cached value, or `None` once it is older than its TTL.
    pub fn get(&mut self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        let fresh = match self.entries.get(key) {
            Some(e) => now - e.written_at < e.ttl,
            None => {
                self.stats.misses += 1;
                debug!(op = key.op(), "cache miss");
                return None;
            }
        };
        if !fresh {
            self.entries.remove(key);
            self.stats.misses += 1;
            debug!(op = key.op(), "cache entry expired");
            return None;
        }
        self.stats.hits += 1;
        debug!(op = key.op(), "cache hit");
        self.entries.get(key).map(|e| e.value.clone())
    }

    pub fn set(&mut self, key: CacheKey, value: V) {
        let ttl = self.default_ttl;
        self.set_with_ttl(key, value, ttl);
    }

    pub fn set_with_ttl(&mut self, key: CacheKey, value: V, ttl: Duration) {
        let written_at = self.clock.now();
        self.entries.insert(
            key,
            Entry {
                value,
                written_at,
                ttl,
            },
        );
    }

    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            debug!(entries = self.entries.len(), "invalidating report cache");
        }
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn key_ignores_parameter_order() {
        let a = CacheKey::with_params("monthly", [("year", 2024), ("month", 6)]);
        let b = CacheKey::with_params("monthly", [("month", 6), ("year", 2024)]);
        assert_eq!(a, b);
        let c = CacheKey::with_params("yearly", [("month", 6), ("year", 2024)]);
        assert_ne!(a, c);
    }

    #[test]
    fn entry_expires_at_ttl_boundary() {
        let clock = clock();
        let mut cache: ReportCache<u32, ManualClock> = ReportCache::with_clock(clock.clone());
        let k = CacheKey::new("x");
        cache.set(k.clone(), 7);
        clock.advance(Duration::minutes(DEFAULT_TTL_MINUTES) - Duration::seconds(1));
        assert_eq!(cache.get(&k), Some(7));
        clock.advance(Duration::seconds(1));
        assert_eq!(cache.get(&k), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn custom_ttl_outlives_default() {
        let clock = clock();
        let mut cache: ReportCache<&str, ManualClock> = ReportCache::with_clock(clock.clone());
        cache.set(CacheKey::new("short"), "a");
        cache.set_with_ttl(
            CacheKey::new("long"),
            "b",
            Duration::minutes(CATEGORY_TTL_MINUTES),
        );
        clock.advance(Duration::minutes(7));
        assert_eq!(cache.get(&CacheKey::new("short")), None);
        assert_eq!(cache.get(&CacheKey::new("long")), Some("b"));
    }
}
