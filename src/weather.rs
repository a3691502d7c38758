//! Weather records, the provider contract, and the cache-aside lookup.
//!
//! - [`WeatherRecord`]: validated, immutable current conditions.
//! - [`WeatherProvider`]: the upstream source of truth, failing with a classified
//!   [`ProviderError`].
//! - [`WeatherCache`]: checks the store, falls back to the provider on a miss, and writes
//!   the result back with a TTL.

pub mod cache;
pub mod provider;
pub mod record;

pub use cache::{cache_key, CacheError, CacheLookup, Origin, WeatherCache, WeatherLookup, DEFAULT_TTL};
pub use provider::{ProviderError, WeatherProvider};
pub use record::{RecordError, WeatherRecord};
