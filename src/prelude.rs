//! Convenient re-exports for common weathergate types.
pub use crate::{
    rate_limit::{Decision, FixedWindow, RateLimitLayer, RateLimiter, DEFAULT_LIMIT, DEFAULT_WINDOW},
    server::{router, AppState},
    store::{ConnectionProbe, InMemoryStore, KeyValueStore},
    telemetry::{GatewayEvent, LogSink, MemorySink, NullSink, TelemetrySink},
    timeout::{TimeoutPolicy, DEFAULT_PROVIDER_TIMEOUT, DEFAULT_STORE_TIMEOUT},
    weather::{
        CacheError, CacheLookup, Origin, ProviderError, WeatherCache, WeatherLookup,
        WeatherProvider, WeatherRecord, DEFAULT_TTL,
    },
    GatewayError,
};
