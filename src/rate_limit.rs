//! Rate limiting primitives.
//!
//! This module provides the building blocks for rate limiting:
//! - [`RateLimiter`]: The core trait for rate limiting logic.
//! - [`FixedWindow`]: Per-client fixed-window counter kept in a [`KeyValueStore`].
//! - [`RateLimitLayer`]: Tower middleware that enforces the limit on HTTP requests.
//! - [`Decision`]: The result of a rate limit check (Allowed/Denied).
//!
//! # Architecture
//!
//! - **Middleware**: `RateLimitLayer` wraps a route. It doesn't know *how* limiting works,
//!   only that it should ask a `RateLimiter` about the caller's identity.
//! - **Logic**: `FixedWindow` counts requests per identity with `INCR` and starts each
//!   window with a single `EXPIRE`.
//! - **Storage**: any [`KeyValueStore`], in-memory or Redis.
//!
//! [`KeyValueStore`]: crate::store::KeyValueStore

use std::time::Duration;

pub mod fixed_window;
pub mod middleware;
pub use fixed_window::{counter_key, FixedWindow, DEFAULT_LIMIT, DEFAULT_WINDOW, KEY_PREFIX};
pub use middleware::{client_identity, RateLimitLayer, RateLimitService};

/// The decision returned by a rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The request is allowed to proceed.
    Allowed {
        /// Requests left in the current window.
        remaining: u64,
        /// Configured limit per window.
        limit: u64,
    },
    /// The request is denied.
    Denied {
        /// Upper bound on how long the caller should wait before retrying.
        /// Useful for `Retry-After` headers.
        wait: Duration,
        /// Configured limit per window, reported back to the client.
        limit: u64,
    },
}

impl Decision {
    /// Helper to check if allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Core interface for rate limiting logic.
///
/// `admit` is infallible: implementations decide their own failure policy. [`FixedWindow`]
/// fails open.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one request from `identity` and decide whether it may proceed.
    async fn admit(&self, identity: &str) -> Decision;
}
