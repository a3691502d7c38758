use super::{ProviderError, WeatherProvider, WeatherRecord};
use crate::rate_limit::KEY_PREFIX;
use crate::store::KeyValueStore;
use crate::telemetry::{emit_best_effort, CacheEvent, GatewayEvent, NullSink, TelemetrySink};
use crate::timeout::{TimeoutError, TimeoutPolicy, DEFAULT_PROVIDER_TIMEOUT, DEFAULT_STORE_TIMEOUT};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// How long a fetched record stays in the store.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Where a lookup's record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    #[serde(rename = "cache")]
    Cache,
    #[serde(rename = "api")]
    Provider,
}

/// A successful cache-aside lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub origin: Origin,
    pub record: WeatherRecord,
}

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("city `{city}` not found")]
    CityNotFound { city: String },
    #[error("fetching weather for `{city}` failed")]
    Upstream {
        city: String,
        #[source]
        source: ProviderError,
    },
    /// The store held a value this cache could not have written.
    #[error("cached value at `{key}` is not a valid weather record")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CityNotFound { .. })
    }
}

/// Object-safe lookup interface the HTTP layer depends on.
#[async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn lookup(&self, city: &str) -> Result<CacheLookup, CacheError>;
}

/// Canonical store key for a city: trimmed and lowercased.
pub fn cache_key(city: &str) -> String {
    city.trim().to_lowercase()
}

/// Cache-aside access to weather records.
///
/// A lookup reads the normalized city key from the store; on a miss it asks the provider
/// and writes the record back with a TTL. There is no negative caching and no request
/// coalescing: concurrent misses each fetch and each overwrite the entry.
pub struct WeatherCache<S, P, T = NullSink> {
    store: Arc<S>,
    provider: Arc<P>,
    ttl: Duration,
    store_timeout: TimeoutPolicy,
    provider_timeout: TimeoutPolicy,
    sink: T,
}

impl<S, P> WeatherCache<S, P>
where
    S: KeyValueStore,
    P: WeatherProvider,
{
    pub fn new(store: Arc<S>, provider: Arc<P>) -> Self {
        Self {
            store,
            provider,
            ttl: DEFAULT_TTL,
            store_timeout: TimeoutPolicy::new(DEFAULT_STORE_TIMEOUT),
            provider_timeout: TimeoutPolicy::new(DEFAULT_PROVIDER_TIMEOUT),
            sink: NullSink,
        }
    }
}

impl<S, P, T> WeatherCache<S, P, T> {
    /// Override the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Bound each store call. Panics if `timeout` is zero.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = TimeoutPolicy::new(timeout);
        self
    }

    /// Bound each provider call. Panics if `timeout` is zero.
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = TimeoutPolicy::new(timeout);
        self
    }

    /// Route cache events to `sink`.
    pub fn with_sink<T2>(self, sink: T2) -> WeatherCache<S, P, T2> {
        WeatherCache {
            store: self.store,
            provider: self.provider,
            ttl: self.ttl,
            store_timeout: self.store_timeout,
            provider_timeout: self.provider_timeout,
            sink,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<S, P, T> WeatherCache<S, P, T>
where
    S: KeyValueStore,
    P: WeatherProvider,
    T: TelemetrySink,
    T::Future: Send,
{
    /// Look up `city`, serving from the store when possible.
    ///
    /// # Errors
    /// `CityNotFound` when the provider does not know the city, or the name is blank or
    /// falls in the rate-limit counter namespace,
    /// `Upstream` when the provider fails or times out, `Corrupt` when the stored value
    /// does not decode.
    pub async fn get(&self, city: &str) -> Result<CacheLookup, CacheError> {
        let key = cache_key(city);
        // Counter keys share the store; no city may name one.
        if key.is_empty() || key.starts_with(KEY_PREFIX) {
            return Err(CacheError::CityNotFound { city: city.to_string() });
        }

        if let Some(record) = self.read(&key).await? {
            tracing::info!(target: "weathergate::cache", city = %key, "cache hit");
            self.emit(CacheEvent::Hit { key }).await;
            return Ok(CacheLookup { origin: Origin::Cache, record });
        }

        tracing::info!(target: "weathergate::cache", city = %key, "cache miss, fetching from provider");
        let record = self.fetch(&key).await?;
        self.write_back(&key, &record).await;
        Ok(CacheLookup { origin: Origin::Provider, record })
    }

    async fn read(&self, key: &str) -> Result<Option<WeatherRecord>, CacheError> {
        match self.store_timeout.execute(self.store.get(key)).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).map(Some).map_err(|source| {
                tracing::error!(
                    target: "weathergate::cache",
                    key = %key,
                    error = %source,
                    "cached value failed to decode"
                );
                CacheError::Corrupt { key: key.to_string(), source }
            }),
            Ok(None) => {
                self.emit(CacheEvent::Miss { key: key.to_string() }).await;
                Ok(None)
            }
            Err(e) => {
                // A failed read is a miss, never a hit.
                tracing::warn!(
                    target: "weathergate::cache",
                    op = "get",
                    key = %key,
                    error = %e,
                    "cache read failed, falling through to provider"
                );
                self.emit(CacheEvent::ReadFailed { key: key.to_string() }).await;
                Ok(None)
            }
        }
    }

    async fn fetch(&self, key: &str) -> Result<WeatherRecord, CacheError> {
        let source = match self.provider_timeout.execute(self.provider.fetch(key)).await {
            Ok(record) => return Ok(record),
            Err(TimeoutError::Inner(e)) if e.is_not_found() => {
                tracing::info!(target: "weathergate::cache", city = %key, "provider reports city not found");
                return Err(CacheError::CityNotFound { city: key.to_string() });
            }
            Err(TimeoutError::Inner(e)) => e,
            Err(elapsed @ TimeoutError::Elapsed { .. }) => ProviderError::upstream(elapsed.to_string()),
        };

        tracing::error!(
            target: "weathergate::cache",
            op = "fetch",
            city = %key,
            error = %source,
            "provider fetch failed"
        );
        Err(CacheError::Upstream { city: key.to_string(), source })
    }

    async fn write_back(&self, key: &str, record: &WeatherRecord) {
        let value = match serde_json::to_string(record) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(target: "weathergate::cache", key = %key, error = %e, "record failed to encode, not caching");
                return;
            }
        };

        match self.store_timeout.execute(self.store.set_with_ttl(key, &value, self.ttl)).await {
            Ok(()) => {
                tracing::debug!(target: "weathergate::cache", key = %key, ttl = ?self.ttl, "record cached");
                self.emit(CacheEvent::Stored { key: key.to_string(), ttl: self.ttl }).await;
            }
            Err(e) => {
                // The fresh record is still served.
                tracing::warn!(
                    target: "weathergate::cache",
                    op = "set",
                    key = %key,
                    error = %e,
                    "cache write failed"
                );
                self.emit(CacheEvent::WriteFailed { key: key.to_string() }).await;
            }
        }
    }

    async fn emit(&self, event: CacheEvent) {
        emit_best_effort(self.sink.clone(), GatewayEvent::Cache(event)).await;
    }
}

#[async_trait]
impl<S, P, T> WeatherLookup for WeatherCache<S, P, T>
where
    S: KeyValueStore,
    P: WeatherProvider,
    T: TelemetrySink,
    T::Future: Send,
{
    async fn lookup(&self, city: &str) -> Result<CacheLookup, CacheError> {
        self.get(city).await
    }
}
