use crate::error::GatewayError;
use crate::rate_limit::{Decision, RateLimiter};
use axum::extract::connect_info::MockConnectInfo;
use axum::extract::{ConnectInfo, Request};
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// Identity used when the peer address is unknown; all such requests share one counter.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// The rate-limit identity of a request: the TCP peer IP.
///
/// Forwarded headers (`X-Forwarded-For`, `Forwarded`) are ignored, so behind a reverse
/// proxy every request shares the proxy's counter.
///
/// Resolves the peer the way axum's `ConnectInfo` extractor does: the real connection info
/// first, then a `MockConnectInfo` installed by tests.
pub fn client_identity<B>(req: &axum::http::Request<B>) -> String {
    let extensions = req.extensions();
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
        .or_else(|| {
            extensions.get::<MockConnectInfo<SocketAddr>>().map(|MockConnectInfo(addr)| *addr)
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// A layer that enforces rate limits using a [`RateLimiter`].
pub struct RateLimitLayer<L: ?Sized> {
    limiter: Arc<L>,
}

impl<L> RateLimitLayer<L> {
    /// Create a new rate limit layer.
    pub fn new(limiter: L) -> Self {
        Self { limiter: Arc::new(limiter) }
    }
}

impl<L: ?Sized> RateLimitLayer<L> {
    /// Create a layer around an already shared limiter.
    pub fn from_shared(limiter: Arc<L>) -> Self {
        Self { limiter }
    }
}

impl<L: ?Sized> Clone for RateLimitLayer<L> {
    fn clone(&self) -> Self {
        Self { limiter: self.limiter.clone() }
    }
}

impl<S, L> Layer<S> for RateLimitLayer<L>
where
    L: RateLimiter + ?Sized + 'static,
{
    type Service = RateLimitService<S, L>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService { inner: service, limiter: self.limiter.clone() }
    }
}

/// Middleware service that enforces rate limits.
///
/// Denied requests never reach the inner service; they are answered with `429` carrying
/// the configured limit.
pub struct RateLimitService<S, L: ?Sized> {
    inner: S,
    limiter: Arc<L>,
}

impl<S: Clone, L: ?Sized> Clone for RateLimitService<S, L> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), limiter: self.limiter.clone() }
    }
}

impl<S, L> Service<Request> for RateLimitService<S, L>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    L: RateLimiter + ?Sized + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let limiter = self.limiter.clone();
        // The clone may not be ready; swap so the instance polled in `poll_ready` handles
        // this request.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let identity = client_identity(&req);
            match limiter.admit(&identity).await {
                Decision::Allowed { .. } => inner.call(req).await,
                Decision::Denied { wait, limit } => {
                    Ok(GatewayError::RateLimitExceeded { limit, retry_after: wait }.into_response())
                }
            }
        })
    }
}
