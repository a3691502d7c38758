//! Timeout policy for store and provider calls

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

/// Default bound for a single key-value store round trip.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(500);

/// Default bound for a single upstream provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a call wrapped in a [`TimeoutPolicy`].
#[derive(Debug, Clone)]
pub enum TimeoutError<E> {
    /// The call did not finish within the configured bound
    Elapsed { elapsed: Duration, timeout: Duration },
    /// The call finished in time but failed
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for TimeoutError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elapsed { elapsed, timeout } => {
                write!(f, "operation timed out after {:?} (limit: {:?})", elapsed, timeout)
            }
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TimeoutError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Elapsed { .. } => None,
        }
    }
}

impl<E> TimeoutError<E> {
    /// Check if this error is due to timeout
    pub fn is_elapsed(&self) -> bool {
        matches!(self, Self::Elapsed { .. })
    }

    /// Get the inner error if the call failed on its own
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Elapsed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    duration: Duration,
}

impl TimeoutPolicy {
    /// Create a timeout policy. Panics if duration is zero or `Duration::MAX`.
    pub fn new(duration: Duration) -> Self {
        assert!(
            duration > Duration::ZERO && duration < Duration::MAX,
            "timeout duration must be non-zero and finite",
        );
        Self { duration }
    }

    /// Inspect the configured timeout duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub async fn execute<T, E, Fut>(&self, operation: Fut) -> Result<T, TimeoutError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();

        match tokio::time::timeout(self.duration, operation).await {
            Ok(result) => result.map_err(TimeoutError::Inner),
            Err(_) => {
                let elapsed = start.elapsed();
                Err(TimeoutError::Elapsed { elapsed, timeout: self.duration })
            }
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_TIMEOUT)
    }
}
