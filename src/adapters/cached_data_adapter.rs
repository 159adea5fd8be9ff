//! TTL cache in front of any [`DataPort`].
//!
//! Fetches are cached per `(code, start, end)`. Entries expire after the
//! configured TTL and can be dropped early with [`CachedDataAdapter::invalidate`]
//! or [`CachedDataAdapter::invalidate_all`]. Expired entries are swept on
//! every insert, so the map never outgrows the ranges fetched within one TTL.
//! Errors are never cached.

use crate::domain::error::ArascanError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

type FetchKey = (String, NaiveDate, NaiveDate);

struct TtlEntry {
    bars: Vec<OhlcvBar>,
    created_at: Instant,
}

pub struct CachedDataAdapter<P> {
    inner: P,
    ttl: Duration,
    entries: RwLock<HashMap<FetchKey, TtlEntry>>,
}

impl<P: DataPort> CachedDataAdapter<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn lookup(&self, key: &FetchKey) -> Option<Vec<OhlcvBar>> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .get(key)
            .filter(|entry| entry.created_at.elapsed() < self.ttl)
            .map(|entry| entry.bars.clone())
    }

    /// Drop every cached range of `code`.
    pub fn invalidate(&self, code: &str) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        guard.retain(|(cached, _, _), _| cached != code);
    }

    pub fn invalidate_all(&self) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        guard.clear();
    }

    /// Live (unexpired) entries.
    pub fn len(&self) -> usize {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .values()
            .filter(|entry| entry.created_at.elapsed() < self.ttl)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: DataPort> DataPort for CachedDataAdapter<P> {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, ArascanError> {
        let key = (code.to_string(), start_date, end_date);
        if let Some(bars) = self.lookup(&key) {
            debug!(code, "cache hit");
            return Ok(bars);
        }

        let bars = self.inner.fetch_ohlcv(code, start_date, end_date)?;
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        if guard.len() < before {
            debug!(evicted = before - guard.len(), "expired cache entries dropped");
        }
        guard.insert(
            key,
            TtlEntry {
                bars: bars.clone(),
                created_at: Instant::now(),
            },
        );
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, ArascanError> {
        self.inner.list_symbols()
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, ArascanError> {
        self.inner.get_data_range(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPort {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingPort {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl DataPort for CountingPort {
        fn fetch_ohlcv(
            &self,
            code: &str,
            start_date: NaiveDate,
            _end_date: NaiveDate,
        ) -> Result<Vec<OhlcvBar>, ArascanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ArascanError::Provider {
                    reason: "down".into(),
                });
            }
            Ok(vec![OhlcvBar {
                code: code.to_string(),
                date: start_date,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1,
            }])
        }

        fn list_symbols(&self) -> Result<Vec<String>, ArascanError> {
            Ok(vec!["AAAA".into()])
        }

        fn get_data_range(
            &self,
            _code: &str,
        ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, ArascanError> {
            Ok(None)
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn repeated_fetch_hits_cache() {
        let cache = CachedDataAdapter::new(CountingPort::new(false), Duration::from_secs(60));
        let first = cache.fetch_ohlcv("AAAA", d(1), d(31)).unwrap();
        let second = cache.fetch_ohlcv("AAAA", d(1), d(31)).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn different_range_is_a_separate_entry() {
        let cache = CachedDataAdapter::new(CountingPort::new(false), Duration::from_secs(60));
        cache.fetch_ohlcv("AAAA", d(1), d(31)).unwrap();
        cache.fetch_ohlcv("AAAA", d(2), d(31)).unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache = CachedDataAdapter::new(CountingPort::new(false), Duration::ZERO);
        cache.fetch_ohlcv("AAAA", d(1), d(31)).unwrap();
        cache.fetch_ohlcv("AAAA", d(1), d(31)).unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    fn stored(cache: &CachedDataAdapter<CountingPort>) -> usize {
        cache.entries.read().unwrap().len()
    }

    #[test]
    fn insert_sweeps_expired_entries() {
        let cache = CachedDataAdapter::new(CountingPort::new(false), Duration::ZERO);
        for day in 1..=10 {
            cache.fetch_ohlcv("AAAA", d(day), d(31)).unwrap();
            assert_eq!(stored(&cache), 1);
        }
    }

    #[test]
    fn live_entries_survive_sweep() {
        let cache = CachedDataAdapter::new(CountingPort::new(false), Duration::from_millis(50));
        cache.fetch_ohlcv("AAAA", d(1), d(31)).unwrap();
        cache.fetch_ohlcv("BBBB", d(1), d(31)).unwrap();
        std::thread::sleep(Duration::from_millis(80));

        cache.fetch_ohlcv("CCCC", d(1), d(31)).unwrap();
        assert_eq!(stored(&cache), 1);
        cache.fetch_ohlcv("DDDD", d(1), d(31)).unwrap();
        assert_eq!(stored(&cache), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn invalidate_drops_entries() {
        let cache = CachedDataAdapter::new(CountingPort::new(false), Duration::from_secs(60));
        cache.fetch_ohlcv("AAAA", d(1), d(31)).unwrap();
        cache.fetch_ohlcv("BBBB", d(1), d(31)).unwrap();

        cache.invalidate("AAAA");
        assert_eq!(cache.len(), 1);
        cache.fetch_ohlcv("AAAA", d(1), d(31)).unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 3);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = CachedDataAdapter::new(CountingPort::new(true), Duration::from_secs(60));
        assert!(cache.fetch_ohlcv("AAAA", d(1), d(31)).is_err());
        assert!(cache.fetch_ohlcv("AAAA", d(1), d(31)).is_err());
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }
}
