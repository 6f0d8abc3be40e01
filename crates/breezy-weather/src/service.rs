//! Cached forecast lookups.
//!
//! `WeatherService::get_weather` prefers a cached value younger than the TTL
//! and otherwise fetches, stores the result under the exact query string and
//! returns it. Concurrent misses for the same key are not de-duplicated; each
//! fetches and the last insert wins.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::cache::{Clock, SystemClock, WeatherCache};
use crate::provider::ForecastSource;
use crate::types::{WeatherData, WeatherError};

pub struct WeatherService<S, C: Clock = SystemClock> {
    source: S,
    cache: Mutex<WeatherCache<C>>,
}

impl<S: ForecastSource> WeatherService<S, SystemClock> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self::with_cache(source, WeatherCache::new(ttl))
    }
}

impl<S: ForecastSource, C: Clock> WeatherService<S, C> {
    pub fn with_cache(source: S, cache: WeatherCache<C>) -> Self {
        Self {
            source,
            cache: Mutex::new(cache),
        }
    }

    /// Forecast for `location`, served from cache while fresh.
    pub async fn get_weather(&self, location: &str) -> Result<Arc<WeatherData>, WeatherError> {
        let cached = self.cache.lock().get(location);
        if let Some(hit) = cached {
            tracing::debug!("Weather cache hit for {:?}", location);
            return Ok(hit);
        }

        tracing::debug!("Weather cache miss for {:?}", location);
        let data = Arc::new(self.source.fetch_forecast(location).await?);
        self.cache.lock().insert(location, Arc::clone(&data));
        Ok(data)
    }

    /// Cached value only; never touches the network.
    pub fn cached(&self, location: &str) -> Option<Arc<WeatherData>> {
        self.cache.lock().get(location)
    }

    pub fn purge_expired(&self) -> usize {
        self.cache.lock().purge_expired()
    }

    /// Entries held, stale ones included.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
