//! HTTP surface: `GET /weather/:city` behind the rate limiter, and `GET /health`.

use crate::error::GatewayError;
use crate::rate_limit::{RateLimitLayer, RateLimiter};
use crate::store::ConnectionProbe;
use crate::timeout::{TimeoutPolicy, DEFAULT_STORE_TIMEOUT};
use crate::weather::{Origin, WeatherLookup, WeatherRecord};
use axum::extract::{Path, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Shared collaborators handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<dyn RateLimiter>,
    pub weather: Arc<dyn WeatherLookup>,
    pub store: Arc<dyn ConnectionProbe>,
    /// Bounds the health check's store ping.
    pub store_timeout: TimeoutPolicy,
}

impl AppState {
    pub fn new(
        limiter: Arc<dyn RateLimiter>,
        weather: Arc<dyn WeatherLookup>,
        store: Arc<dyn ConnectionProbe>,
    ) -> Self {
        Self { limiter, weather, store, store_timeout: TimeoutPolicy::new(DEFAULT_STORE_TIMEOUT) }
    }

    /// Override the health probe bound. Panics if `timeout` is zero.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = TimeoutPolicy::new(timeout);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct WeatherResponse {
    pub source: Origin,
    pub data: WeatherRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StoreStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Key kept as `redis` for existing health checkers.
    pub redis: StoreStatus,
}

/// Build the gateway router.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the limiter can
/// key on the peer address.
pub fn router(state: AppState) -> Router {
    let limit = RateLimitLayer::from_shared(state.limiter.clone());

    Router::new()
        .route("/weather/:city", get(get_weather).route_layer(limit))
        .route("/health", get(health))
        .layer(middleware::from_fn(request_span))
        .with_state(state)
}

/// Wrap the whole request, rate limiting included, in a span with a fresh request id.
async fn request_span(req: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %req.method(),
        path = %req.uri().path(),
    );
    next.run(req).instrument(span).await
}

async fn get_weather(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<WeatherResponse>, GatewayError> {
    match state.weather.lookup(&city).await {
        Ok(lookup) => Ok(Json(WeatherResponse { source: lookup.origin, data: lookup.record })),
        Err(e) => {
            let err = GatewayError::from(e);
            if !matches!(err, GatewayError::CityNotFound { .. }) {
                tracing::error!(
                    target: "weathergate::server",
                    city = %city,
                    error = %err,
                    cause = ?std::error::Error::source(&err),
                    "weather lookup failed"
                );
            }
            Err(err)
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    // A hung store reports as disconnected rather than stalling the check.
    let probe = state
        .store_timeout
        .execute(async { Ok::<_, Infallible>(state.store.is_connected().await) })
        .await;
    let redis = if matches!(probe, Ok(true)) {
        StoreStatus::Connected
    } else {
        StoreStatus::Disconnected
    };
    Json(HealthResponse { status: "OK", redis })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::Decision;
    use crate::weather::{CacheError, CacheLookup};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Records the span each admission runs in.
    #[derive(Default)]
    struct SpanRecorder {
        seen: Mutex<Vec<(Option<&'static str>, bool)>>,
    }

    #[async_trait]
    impl RateLimiter for SpanRecorder {
        async fn admit(&self, _identity: &str) -> Decision {
            let span = tracing::Span::current();
            let entry = (
                span.metadata().map(|m| m.name()),
                span.metadata().is_some_and(|m| m.fields().field("request_id").is_some()),
            );
            self.seen.lock().unwrap().push(entry);
            Decision::Allowed { remaining: 1, limit: 1 }
        }
    }

    struct NoCities;

    #[async_trait]
    impl WeatherLookup for NoCities {
        async fn lookup(&self, city: &str) -> Result<CacheLookup, CacheError> {
            Err(CacheError::CityNotFound { city: city.to_string() })
        }
    }

    struct SlowProbe(Duration);

    #[async_trait]
    impl ConnectionProbe for SlowProbe {
        async fn is_connected(&self) -> bool {
            tokio::time::sleep(self.0).await;
            true
        }
    }

    fn app(state: AppState) -> Router {
        router(state).layer(MockConnectInfo(SocketAddr::from(([192, 0, 2, 1], 1))))
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let response = app
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn limiter_runs_inside_the_request_span() {
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry());
        let limiter = Arc::new(SpanRecorder::default());
        let state = AppState::new(
            limiter.clone(),
            Arc::new(NoCities),
            Arc::new(SlowProbe(Duration::ZERO)),
        );

        get_json(app(state), "/weather/london").await;

        assert_eq!(*limiter.seen.lock().unwrap(), vec![(Some("request"), true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn health_probe_uses_the_configured_store_timeout() {
        let build = |timeout: Option<Duration>| {
            let state = AppState::new(
                Arc::new(SpanRecorder::default()),
                Arc::new(NoCities),
                Arc::new(SlowProbe(Duration::from_millis(700))),
            );
            match timeout {
                Some(t) => state.with_store_timeout(t),
                None => state,
            }
        };

        let body = get_json(app(build(None)), "/health").await;
        assert_eq!(body["redis"], "Disconnected");

        let body = get_json(app(build(Some(Duration::from_secs(1)))), "/health").await;
        assert_eq!(body["redis"], "Connected");
    }
}
