//! User-facing error taxonomy and its HTTP mapping
use crate::weather::CacheError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Duration;

/// Body text of a 429 response.
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded. Try again in a minute.";
/// Body text of a 404 response.
pub const NOT_FOUND_MESSAGE: &str = "City not found";
/// Body text of every 500 response.
pub const INTERNAL_MESSAGE: &str = "Internal Server Error";

/// Every failure a client can observe.
///
/// Response bodies are fixed strings; the causes are logged, never echoed.
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("rate limit of {limit} requests exceeded")]
    RateLimitExceeded { limit: u64, retry_after: Duration },
    #[error("city `{city}` not found")]
    CityNotFound { city: String },
    #[error("upstream weather provider failed")]
    Upstream(#[source] CacheError),
    #[error("internal error")]
    Internal(#[source] CacheError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::CityNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Upstream(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CacheError> for GatewayError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::CityNotFound { city } => Self::CityNotFound { city },
            e @ CacheError::Upstream { .. } => Self::Upstream(e),
            e @ CacheError::Corrupt { .. } => Self::Internal(e),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::RateLimitExceeded { limit, retry_after } => {
                let mut response =
                    (status, Json(json!({ "error": RATE_LIMITED_MESSAGE, "limit": limit })))
                        .into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            Self::CityNotFound { .. } => {
                (status, Json(json!({ "error": NOT_FOUND_MESSAGE }))).into_response()
            }
            Self::Upstream(_) | Self::Internal(_) => {
                (status, Json(json!({ "error": INTERNAL_MESSAGE }))).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::ProviderError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn rate_limited_response_carries_limit_and_retry_after() {
        let response = GatewayError::RateLimitExceeded {
            limit: 5,
            retry_after: Duration::from_secs(60),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
        assert_eq!(
            body_json(response).await,
            json!({ "error": RATE_LIMITED_MESSAGE, "limit": 5 })
        );
    }

    #[tokio::test]
    async fn upstream_detail_is_not_leaked() {
        let err: GatewayError = CacheError::Upstream {
            city: "paris".into(),
            source: ProviderError::upstream("connection refused to 10.0.0.9"),
        }
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(err.into_response()).await;
        assert_eq!(body, json!({ "error": "Internal Server Error" }));
    }

    #[test]
    fn not_found_maps_to_404() {
        let err: GatewayError = CacheError::CityNotFound { city: "atlantis".into() }.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
