//! Telemetry for the gateway.
//!
//! The rate limiter and the weather cache emit structured [`GatewayEvent`]s alongside
//! their log lines. Events flow through `TelemetrySink` implementations, which are
//! `tower::Service<GatewayEvent>`s so they compose with standard tower combinators.
//!
//! ```rust
//! use weathergate::telemetry::{CacheEvent, GatewayEvent, MemorySink};
//! use tower::Service;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut sink = MemorySink::new();
//! let event = GatewayEvent::Cache(CacheEvent::Hit { key: "london".into() });
//! sink.call(event.clone()).await.unwrap();
//! assert_eq!(sink.events(), vec![event]);
//! # }
//! ```

pub mod events;
pub mod sinks;

pub use events::{CacheEvent, GatewayEvent, RateLimitEvent};
pub use sinks::{emit_best_effort, LogSink, MemorySink, NullSink, TelemetrySink};
