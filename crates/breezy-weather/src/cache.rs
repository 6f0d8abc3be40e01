//! In-memory forecast cache with age-based expiry.
//!
//! Entries are keyed by the raw query string exactly as the caller passed
//! it: "Paris", "paris" and "Paris,FR" are three different entries. There
//! is no size bound; stale entries are ignored on read and only dropped by
//! [`WeatherCache::purge_expired`] or overwritten by a fresh insert.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::types::WeatherData;

/// Default time-to-live for cached forecasts.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock for tests and replays. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start_millis)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Arc<WeatherData>,
    /// Insertion time, epoch milliseconds.
    pub timestamp: i64,
}

#[derive(Debug)]
pub struct WeatherCache<C: Clock = SystemClock> {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
    clock: C,
}

impl WeatherCache<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl Default for WeatherCache<SystemClock> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<C: Clock> WeatherCache<C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry, now: i64) -> bool {
        now.saturating_sub(entry.timestamp) < self.ttl.as_millis() as i64
    }

    /// Cached value for `key` if it is younger than the TTL.
    pub fn get(&self, key: &str) -> Option<Arc<WeatherData>> {
        let now = self.clock.now_millis();
        self.entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| Arc::clone(&entry.data))
    }

    /// Store `data` under `key`, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, data: Arc<WeatherData>) {
        let timestamp = self.clock.now_millis();
        self.entries.insert(key.into(), CacheEntry { data, timestamp });
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_millis();
        let ttl_ms = self.ttl.as_millis() as i64;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_sub(entry.timestamp) < ttl_ms);
        before - self.entries.len()
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    pub(crate) fn sample_data(name: &str) -> WeatherData {
        serde_json::from_value(serde_json::json!({
            "location": {
                "name": name, "region": "", "country": "Testland",
                "lat": 1.0, "lon": 2.0, "tz_id": "UTC",
                "localtime_epoch": 0, "localtime": "2026-10-19 12:00"
            },
            "current": { "temp_c": 20.0, "temp_f": 68.0 },
            "forecast": { "forecastday": [] }
        }))
        .unwrap()
    }

    #[test]
    fn test_fresh_entry_is_returned() {
        let clock = ManualClock::new(1_000);
        let mut cache = WeatherCache::with_clock(DEFAULT_TTL, clock.clone());
        let data = Arc::new(sample_data("Paris"));

        cache.insert("Paris", Arc::clone(&data));
        clock.advance(Duration::from_secs(9 * 60));

        let hit = cache.get("Paris").unwrap();
        assert!(Arc::ptr_eq(&hit, &data));
    }

    #[test]
    fn test_entry_expires_at_ttl() {
        let clock = ManualClock::new(0);
        let mut cache = WeatherCache::with_clock(DEFAULT_TTL, clock.clone());
        cache.insert("Paris", Arc::new(sample_data("Paris")));

        clock.advance(DEFAULT_TTL);
        assert!(cache.get("Paris").is_none());
        // Stale entries are kept until purged or overwritten
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_not_normalized() {
        let mut cache = WeatherCache::with_clock(DEFAULT_TTL, ManualClock::new(0));
        cache.insert("Paris", Arc::new(sample_data("Paris")));

        assert!(cache.get("Paris").is_some());
        assert!(cache.get("paris").is_none());
        assert!(cache.get("Paris,FR").is_none());
    }

    #[test]
    fn test_reinsert_refreshes_timestamp() {
        let clock = ManualClock::new(0);
        let mut cache = WeatherCache::with_clock(DEFAULT_TTL, clock.clone());
        cache.insert("Oslo", Arc::new(sample_data("Oslo")));

        clock.advance(Duration::from_secs(11 * 60));
        assert!(cache.get("Oslo").is_none());

        cache.insert("Oslo", Arc::new(sample_data("Oslo")));
        assert!(cache.get("Oslo").is_some());
    }

    #[test]
    fn test_purge_expired() {
        let clock = ManualClock::new(0);
        let mut cache = WeatherCache::with_clock(Duration::from_secs(60), clock.clone());
        cache.insert("old", Arc::new(sample_data("old")));
        clock.advance(Duration::from_secs(61));
        cache.insert("new", Arc::new(sample_data("new")));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new").is_some());
    }

    #[test]
    fn test_zero_ttl_never_hits() {
        let mut cache = WeatherCache::with_clock(Duration::ZERO, ManualClock::new(5));
        cache.insert("Rome", Arc::new(sample_data("Rome")));
        assert!(cache.get("Rome").is_none());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let mut cache = WeatherCache::with_clock(DEFAULT_TTL, ManualClock::new(0));
        cache.insert("a", Arc::new(sample_data("a")));
        cache.insert("b", Arc::new(sample_data("b")));

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
