//! Session-lifetime memoization of price fetches.
//!
//! Keyed by (symbol, start, end). Entries are never invalidated; the cache
//! lives exactly as long as the dashboard session that owns it.

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::PriceSeries;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(symbol: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.to_ascii_uppercase(),
            start,
            end,
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionCache {
    entries: Mutex<HashMap<CacheKey, PriceSeries>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, PriceSeries>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn get(&self, key: &CacheKey) -> Option<PriceSeries> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, series: PriceSeries) {
        self.lock().insert(key, series);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// A [`DataProvider`] that answers repeated requests from a [`SessionCache`].
///
/// Errors are not cached, so a later request for the same key retries.
pub struct CachedProvider<P> {
    inner: P,
    cache: SessionCache,
}

impl<P: DataProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: SessionCache::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }
}

impl<P: DataProvider> DataProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let key = CacheKey::new(symbol, start, end);
        if let Some(series) = self.cache.get(&key) {
            tracing::debug!(symbol, provider = self.inner.name(), "session cache hit");
            return Ok(FetchResult {
                series,
                source: DataSource::SessionCache,
            });
        }

        let result = self.inner.fetch(symbol, start, end)?;
        self.cache.insert(key, result.series.clone());
        Ok(result)
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}
