use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reasons a [`WeatherRecord`] cannot be constructed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("temperature must be a finite number, got {0}")]
    Temperature(f64),
    #[error("wind speed must be finite and non-negative, got {0}")]
    WindSpeed(f64),
    #[error("humidity must be between 0 and 100 percent, got {0}")]
    Humidity(i64),
    #[error("description must not be empty")]
    EmptyDescription,
}

/// Normalized current conditions for one city.
///
/// Immutable: fields are only reachable through accessors, and both construction and
/// deserialization validate every field, so a half-valid record cannot exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecordFields")]
pub struct WeatherRecord {
    #[serde(rename = "temp")]
    temperature: f64,
    description: String,
    humidity: u8,
    #[serde(rename = "windSpeed")]
    wind_speed: f64,
    #[serde(rename = "timestamp")]
    observed_at: DateTime<Utc>,
}

impl WeatherRecord {
    /// Build a record, validating every field.
    ///
    /// # Errors
    /// Returns a [`RecordError`] naming the first invalid field.
    pub fn new(
        temperature: f64,
        description: impl Into<String>,
        humidity: i64,
        wind_speed: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        if !temperature.is_finite() {
            return Err(RecordError::Temperature(temperature));
        }
        if !wind_speed.is_finite() || wind_speed < 0.0 {
            return Err(RecordError::WindSpeed(wind_speed));
        }
        let humidity = u8::try_from(humidity)
            .ok()
            .filter(|h| *h <= 100)
            .ok_or(RecordError::Humidity(humidity))?;
        let description = description.into();
        if description.trim().is_empty() {
            return Err(RecordError::EmptyDescription);
        }

        Ok(Self { temperature, description, humidity, wind_speed, observed_at })
    }

    /// Air temperature in degrees Celsius.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Relative humidity in percent.
    pub fn humidity(&self) -> u8 {
        self.humidity
    }

    pub fn wind_speed(&self) -> f64 {
        self.wind_speed
    }

    /// When the provider observation was fetched.
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

#[derive(Deserialize)]
struct RecordFields {
    temp: f64,
    description: String,
    humidity: i64,
    #[serde(rename = "windSpeed")]
    wind_speed: f64,
    timestamp: DateTime<Utc>,
}

impl TryFrom<RecordFields> for WeatherRecord {
    type Error = RecordError;

    fn try_from(raw: RecordFields) -> Result<Self, Self::Error> {
        WeatherRecord::new(raw.temp, raw.description, raw.humidity, raw.wind_speed, raw.timestamp)
    }
}
