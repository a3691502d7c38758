use std::fmt;
use std::time::Duration;

/// Events emitted by the gateway's rate limiter and cache.
///
/// These are the structured counterpart of the log lines: sinks can count them,
/// forward them, or (in tests) assert on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// Rate limiter decisions
    RateLimit(RateLimitEvent),
    /// Cache-aside lookups
    Cache(CacheEvent),
}

/// Events emitted by the fixed-window rate limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitEvent {
    /// The request fit inside the current window.
    Admitted {
        /// Client identity the counter is keyed on
        identity: String,
        /// Post-increment counter value
        count: i64,
        /// Configured limit per window
        limit: u64,
    },
    /// The request exceeded the window's limit.
    Rejected { identity: String, count: i64, limit: u64 },
    /// The store failed or timed out, so the request was let through unchecked.
    FailedOpen { identity: String },
}

/// Events emitted by the weather cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A fresh record was served from the store.
    Hit { key: String },
    /// The store held nothing for the key; the provider will be consulted.
    Miss { key: String },
    /// A provider record was written back with the given TTL.
    Stored { key: String, ttl: Duration },
    /// The store read failed; the lookup fell through to the provider.
    ReadFailed { key: String },
    /// The write-back after a successful fetch failed; the record was still served.
    WriteFailed { key: String },
}

impl fmt::Display for GatewayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayEvent::RateLimit(event) => write!(f, "RateLimit::{}", event),
            GatewayEvent::Cache(event) => write!(f, "Cache::{}", event),
        }
    }
}

impl fmt::Display for RateLimitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitEvent::Admitted { identity, count, limit } => {
                write!(f, "Admitted({}, {}/{})", identity, count, limit)
            }
            RateLimitEvent::Rejected { identity, count, limit } => {
                write!(f, "Rejected({}, {}/{})", identity, count, limit)
            }
            RateLimitEvent::FailedOpen { identity } => write!(f, "FailedOpen({})", identity),
        }
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheEvent::Hit { key } => write!(f, "Hit({})", key),
            CacheEvent::Miss { key } => write!(f, "Miss({})", key),
            CacheEvent::Stored { key, ttl } => write!(f, "Stored({}, ttl={:?})", key, ttl),
            CacheEvent::ReadFailed { key } => write!(f, "ReadFailed({})", key),
            CacheEvent::WriteFailed { key } => write!(f, "WriteFailed({})", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_namespaced_by_component() {
        let event = GatewayEvent::RateLimit(RateLimitEvent::Rejected {
            identity: "10.0.0.1".into(),
            count: 6,
            limit: 5,
        });
        assert_eq!(event.to_string(), "RateLimit::Rejected(10.0.0.1, 6/5)");

        let event = GatewayEvent::Cache(CacheEvent::Stored {
            key: "london".into(),
            ttl: Duration::from_secs(3600),
        });
        assert_eq!(event.to_string(), "Cache::Stored(london, ttl=3600s)");
    }
}
