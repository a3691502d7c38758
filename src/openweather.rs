//! OpenWeather current-conditions client.
//!
//! Calls `GET {base_url}?q=<city>&appid=<key>&units=metric` and normalizes the response
//! into a [`WeatherRecord`]. A `404` is the only not-found signal; any other failure,
//! including an unexpected body shape, is an upstream error.

use crate::weather::{ProviderError, WeatherProvider, WeatherRecord};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: Main,
    weather: Vec<Condition>,
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

/// OpenWeather API client.
#[derive(Clone)]
pub struct OpenWeatherProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenWeatherProvider {
    /// Build a client against the public OpenWeather endpoint.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be constructed (e.g. TLS backend unavailable).
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, timeout)
    }

    /// Build a client against another endpoint with the same contract.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be constructed.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("weathergate/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base_url: base_url.into(), api_key: api_key.into() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, city: &str) -> Result<WeatherRecord, ProviderError> {
        tracing::debug!(target: "weathergate::openweather", city = %city, "fetching current conditions");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(|e| ProviderError::upstream(format!("request for `{city}` failed: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound { city: city.to_string() });
        }
        if !status.is_success() {
            return Err(ProviderError::upstream(format!(
                "OpenWeather returned {status} for `{city}`"
            )));
        }

        let payload: CurrentResponse = resp.json().await.map_err(|e| {
            ProviderError::upstream(format!("unexpected response body for `{city}`: {e}"))
        })?;

        let description = payload
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| ProviderError::upstream(format!("no conditions reported for `{city}`")))?;

        WeatherRecord::new(
            payload.main.temp,
            description,
            payload.main.humidity,
            payload.wind.speed,
            Utc::now(),
        )
        .map_err(|e| ProviderError::upstream(format!("invalid record for `{city}`: {e}")))
    }
}
