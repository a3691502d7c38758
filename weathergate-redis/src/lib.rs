//! Redis store for `weathergate` (companion crate).
//!
//! Implements [`KeyValueStore`] with plain `GET`, `SET .. EX`, `INCR`, `EXPIRE` and `PING`
//! commands over a multiplexed [`ConnectionManager`], which reconnects on its own after the
//! server goes away.

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{Client, RedisError};
use std::time::Duration;
use tokio::sync::OnceCell;
use weathergate::store::{ttl_seconds, KeyValueStore};

/// Shared Redis connection.
///
/// The first command opens the connection; construction never touches the network, so a
/// gateway can start while Redis is down and pick it up later.
pub struct RedisStore {
    client: Client,
    manager: OnceCell<ConnectionManager>,
    config: ConnectionManagerConfig,
}

/// One quick retry, then surface the error.
fn default_manager_config() -> ConnectionManagerConfig {
    ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_secs(2))
        .set_response_timeout(Duration::from_secs(2))
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("addr", &self.client.get_connection_info().addr)
            .field("connected", &self.manager.initialized())
            .finish()
    }
}

impl RedisStore {
    /// Parse `url` (e.g. `redis://localhost:6379`) without connecting.
    ///
    /// # Errors
    /// Returns `Err` if the URL is not a valid Redis connection string.
    pub fn open(url: &str) -> Result<Self, RedisError> {
        Ok(Self::from_client(Client::open(url)?))
    }

    /// Wrap an existing client.
    pub fn from_client(client: Client) -> Self {
        Self { client, manager: OnceCell::new(), config: default_manager_config() }
    }

    /// Replace the reconnect and timeout settings used when the connection is opened.
    pub fn with_manager_config(mut self, config: ConnectionManagerConfig) -> Self {
        self.config = config;
        self
    }

    async fn connection(&self) -> Result<ConnectionManager, RedisError> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                let manager =
                    self.client.get_connection_manager_with_config(self.config.clone()).await?;
                tracing::info!(
                    target: "weathergate::redis",
                    addr = %self.client.get_connection_info().addr,
                    "connected to redis"
                );
                Ok::<_, RedisError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    type Error = RedisError;

    async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let mut conn = self.connection().await?;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), Self::Error> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, Self::Error> {
        let mut conn = self.connection().await?;
        let current: i64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;
        Ok(current)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, Self::Error> {
        let mut conn = self.connection().await?;
        let applied: i64 =
            redis::cmd("EXPIRE").arg(key).arg(ttl_seconds(ttl)).query_async(&mut conn).await?;
        Ok(applied == 1)
    }

    async fn ping(&self) -> Result<(), Self::Error> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
