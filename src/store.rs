use async_trait::async_trait;
use std::time::Duration;

/// Abstract interface to the shared expiring key-value store.
///
/// Both the weather cache and the rate limiter keep all of their state here; the four
/// data operations mirror the Redis primitives `GET`, `SET key value EX`, `INCR` and
/// `EXPIRE`. Implementations must make `incr` atomic: two concurrent callers never
/// observe the same post-increment value for one key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the value at `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Overwrite `key` with `value`, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), Self::Error>;

    /// Atomically increment the integer at `key`, creating it at 0 first if absent.
    ///
    /// Returns the post-increment value. An existing expiry is left untouched; a freshly
    /// created key has none.
    async fn incr(&self, key: &str) -> Result<i64, Self::Error>;

    /// Set an expiry on an existing key. Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, Self::Error>;

    /// Round-trip to the backend to confirm it is reachable.
    async fn ping(&self) -> Result<(), Self::Error>;
}

/// Object-safe view of a store's connectivity, used by the health endpoint.
#[async_trait]
pub trait ConnectionProbe: Send + Sync {
    async fn is_connected(&self) -> bool;
}

#[async_trait]
impl<S> ConnectionProbe for S
where
    S: KeyValueStore,
{
    async fn is_connected(&self) -> bool {
        match self.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(target: "weathergate::store", error = %e, "store ping failed");
                false
            }
        }
    }
}

/// Whole seconds for a store TTL. Sub-second TTLs round up so nothing is stored forever.
pub fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::time::Instant;

/// Errors from [`InMemoryStore`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InMemoryStoreError {
    #[error("in-memory store is marked unavailable")]
    Unavailable,
    #[error("value at key `{key}` is not an integer")]
    NotAnInteger { key: String },
    #[error("incrementing `{key}` would overflow")]
    Overflow { key: String },
}

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Simple in-memory expiring store.
///
/// Expiry is measured with `tokio::time::Instant`, so tests can drive it with a paused
/// clock. `set_available(false)` makes every operation fail, simulating a backend outage.
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    data: Arc<Mutex<HashMap<String, Slot>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated availability.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Remaining time-to-live for `key`; `None` when the key is absent or has no expiry.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let guard = self.lock();
        let slot = guard.get(key).filter(|s| s.is_live(now))?;
        slot.expires_at.map(|at| at.saturating_duration_since(now))
    }

    /// Whether `key` currently holds a live value.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock().get(key).is_some_and(|s| s.is_live(now))
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), InMemoryStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(InMemoryStoreError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    type Error = InMemoryStoreError;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        self.check_available()?;
        let now = Instant::now();
        let mut guard = self.lock();
        match guard.get(key) {
            Some(slot) if slot.is_live(now) => Ok(Some(slot.value.clone())),
            Some(_) => {
                guard.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), Self::Error> {
        self.check_available()?;
        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds(ttl));
        self.lock()
            .insert(key.to_string(), Slot { value: value.to_string(), expires_at: Some(expires_at) });
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, Self::Error> {
        self.check_available()?;
        let now = Instant::now();
        let mut guard = self.lock();

        let (current, expires_at) = match guard.get(key).filter(|s| s.is_live(now)) {
            Some(slot) => {
                let parsed = slot
                    .value
                    .parse::<i64>()
                    .map_err(|_| InMemoryStoreError::NotAnInteger { key: key.to_string() })?;
                (parsed, slot.expires_at)
            }
            None => (0, None),
        };

        let next = current
            .checked_add(1)
            .ok_or_else(|| InMemoryStoreError::Overflow { key: key.to_string() })?;
        guard.insert(key.to_string(), Slot { value: next.to_string(), expires_at });
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, Self::Error> {
        self.check_available()?;
        let now = Instant::now();
        let mut guard = self.lock();
        match guard.get_mut(key).filter(|s| s.is_live(now)) {
            Some(slot) => {
                slot.expires_at = Some(now + Duration::from_secs(ttl_seconds(ttl)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), Self::Error> {
        self.check_available()
    }
}
