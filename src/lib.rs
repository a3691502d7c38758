#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # weathergate
//!
//! A rate-limited, cache-aside HTTP gateway for current weather by city.
//!
//! ## Pieces
//!
//! - **Store contract**: [`KeyValueStore`] (`GET`, `SET EX`, `INCR`, `EXPIRE`), with an
//!   in-memory implementation here and a Redis one in `weathergate-redis`
//! - **Rate limiting**: [`FixedWindow`], 5 requests per client per 60 second window,
//!   failing open when the store is unavailable
//! - **Cache-aside**: [`WeatherCache`], one-hour entries keyed by lowercased city, no
//!   negative caching
//! - **HTTP**: [`server::router`], an axum router with the limiter as a tower layer
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use weathergate::{FixedWindow, InMemoryStore, RateLimiter};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = Arc::new(InMemoryStore::new());
//! let limiter = FixedWindow::new(store.clone());
//!
//! for _ in 0..5 {
//!     assert!(limiter.admit("203.0.113.9").await.is_allowed());
//! }
//! assert!(!limiter.admit("203.0.113.9").await.is_allowed());
//! # }
//! ```

pub mod error;
#[cfg(feature = "openweather")]
pub mod openweather;
pub mod prelude;
pub mod rate_limit;
pub mod server;
pub mod store;
pub mod telemetry;
pub mod timeout;
pub mod weather;

// Re-exports
pub use error::GatewayError;
#[cfg(feature = "openweather")]
pub use openweather::OpenWeatherProvider;
pub use rate_limit::{Decision, FixedWindow, RateLimitLayer, RateLimiter};
pub use server::{router, AppState};
pub use store::{ConnectionProbe, InMemoryStore, KeyValueStore};
pub use timeout::{TimeoutError, TimeoutPolicy};
pub use weather::{
    CacheError, CacheLookup, Origin, ProviderError, WeatherCache, WeatherLookup, WeatherProvider,
    WeatherRecord,
};
