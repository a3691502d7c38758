use super::WeatherRecord;
use async_trait::async_trait;

/// Classified provider failure.
///
/// `NotFound` is a definitive answer about the city and is never retried or cached;
/// everything else is an upstream fault.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("city `{city}` not found by weather provider")]
    NotFound { city: String },
    #[error("weather provider failed: {message}")]
    Upstream { message: String },
}

impl ProviderError {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream { message: message.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Source of truth for current weather by city name.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, city: &str) -> Result<WeatherRecord, ProviderError>;
}

