use crate::rate_limit::{Decision, RateLimiter};
use crate::store::KeyValueStore;
use crate::telemetry::{emit_best_effort, GatewayEvent, NullSink, RateLimitEvent, TelemetrySink};
use crate::timeout::{TimeoutError, TimeoutPolicy, DEFAULT_STORE_TIMEOUT};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Requests admitted per client per window.
pub const DEFAULT_LIMIT: u64 = 5;

/// Length of one counting window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Prefix of every counter key; the client identity follows it verbatim.
pub const KEY_PREFIX: &str = "rate_limit:";

/// Store key of the counter for `identity`.
pub fn counter_key(identity: &str) -> String {
    format!("{KEY_PREFIX}{identity}")
}

/// A fixed-window rate limiter.
///
/// Each identity gets a counter at `rate_limit:<identity>`. The request whose `INCR`
/// returns 1 sets the window's `EXPIRE`; later requests never touch the TTL, so the window
/// lasts exactly `window` from first use. Increment and expire are two round trips, so a
/// counter can briefly exist without a TTL.
///
/// Fails open: a store error or timeout admits the request.
pub struct FixedWindow<S, T = NullSink> {
    store: Arc<S>,
    limit: u64,
    window: Duration,
    timeout: TimeoutPolicy,
    sink: T,
}

impl<S> FixedWindow<S>
where
    S: KeyValueStore + 'static,
{
    /// Create a limiter with the default 5 requests per 60 seconds.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            limit: DEFAULT_LIMIT,
            window: DEFAULT_WINDOW,
            timeout: TimeoutPolicy::new(DEFAULT_STORE_TIMEOUT),
            sink: NullSink,
        }
    }
}

impl<S, T> FixedWindow<S, T> {
    /// Override the per-window limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Override the window length.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Bound each store call. Panics if `timeout` is zero.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = TimeoutPolicy::new(timeout);
        self
    }

    /// Route limiter events to `sink`.
    pub fn with_sink<T2>(self, sink: T2) -> FixedWindow<S, T2> {
        FixedWindow {
            store: self.store,
            limit: self.limit,
            window: self.window,
            timeout: self.timeout,
            sink,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<S, T> FixedWindow<S, T>
where
    S: KeyValueStore + 'static,
    T: TelemetrySink,
    T::Future: Send,
{
    async fn count(&self, key: &str) -> Result<i64, TimeoutError<S::Error>> {
        let current = self.timeout.execute(self.store.incr(key)).await?;
        if current == 1 {
            // Only the request that created the counter starts the window.
            let applied = self.timeout.execute(self.store.expire(key, self.window)).await?;
            if !applied {
                tracing::warn!(
                    target: "weathergate::rate_limit",
                    key = %key,
                    "counter vanished before its window expiry was set"
                );
            }
        }
        Ok(current)
    }

    async fn emit(&self, event: RateLimitEvent) {
        emit_best_effort(self.sink.clone(), GatewayEvent::RateLimit(event)).await;
    }
}

#[async_trait]
impl<S, T> RateLimiter for FixedWindow<S, T>
where
    S: KeyValueStore + 'static,
    T: TelemetrySink,
    T::Future: Send,
{
    async fn admit(&self, identity: &str) -> Decision {
        let key = counter_key(identity);

        let current = match self.count(&key).await {
            Ok(current) => current,
            Err(e) => {
                tracing::error!(
                    target: "weathergate::rate_limit",
                    key = %key,
                    error = %e,
                    "rate limiter store failed, admitting request"
                );
                self.emit(RateLimitEvent::FailedOpen { identity: identity.to_string() }).await;
                return Decision::Allowed { remaining: self.limit, limit: self.limit };
            }
        };

        let used = u64::try_from(current).unwrap_or(0);
        if used > self.limit {
            tracing::info!(
                target: "weathergate::rate_limit",
                identity = %identity,
                count = current,
                limit = self.limit,
                "rate limit exceeded"
            );
            self.emit(RateLimitEvent::Rejected {
                identity: identity.to_string(),
                count: current,
                limit: self.limit,
            })
            .await;
            return Decision::Denied { wait: self.window, limit: self.limit };
        }

        self.emit(RateLimitEvent::Admitted {
            identity: identity.to_string(),
            count: current,
            limit: self.limit,
        })
        .await;
        Decision::Allowed { remaining: self.limit - used, limit: self.limit }
    }
}
