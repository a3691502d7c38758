#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::connect_info::MockConnectInfo;
use axum::Router;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use weathergate::prelude::*;

/// Provider double: answers from a fixed table, counts every call.
#[derive(Clone, Default)]
pub struct StubProvider {
    records: Arc<Mutex<HashMap<String, WeatherRecord>>>,
    calls: Arc<AtomicUsize>,
    upstream_down: bool,
    delay: Option<Duration>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(self, city: &str, record: WeatherRecord) -> Self {
        self.records.lock().unwrap().insert(city.to_string(), record);
        self
    }

    /// Every fetch fails with an upstream error.
    pub fn failing() -> Self {
        Self { upstream_down: true, ..Self::default() }
    }

    /// Every fetch sleeps for `delay` first.
    pub fn slow(self, delay: Duration) -> Self {
        Self { delay: Some(delay), ..self }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for StubProvider {
    async fn fetch(&self, city: &str) -> Result<WeatherRecord, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.upstream_down {
            return Err(ProviderError::upstream("simulated outage"));
        }
        self.records
            .lock()
            .unwrap()
            .get(city)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound { city: city.to_string() })
    }
}

pub fn london() -> WeatherRecord {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    WeatherRecord::new(15.2, "cloudy", 70, 3.1, at).unwrap()
}

pub fn client(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([192, 0, 2, last_octet], 40_000))
}

/// Full gateway over `store` and `provider`, every request arriving from `peer`.
pub fn gateway(store: Arc<InMemoryStore>, provider: StubProvider, peer: SocketAddr) -> Router {
    let limiter = FixedWindow::new(store.clone());
    let cache = WeatherCache::new(store.clone(), Arc::new(provider));
    router(AppState::new(Arc::new(limiter), Arc::new(cache), store)).layer(MockConnectInfo(peer))
}
