//! Weather readings as delivered by the weather-fetch collaborator.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Physically plausible sea-level pressure range (hPa).
pub const MIN_PRESSURE_HPA: f64 = 850.0;
pub const MAX_PRESSURE_HPA: f64 = 1100.0;

/// Nominal values used when a caller has no reading for a field.
pub mod nominal {
    pub const TEMPERATURE_C: f64 = 22.0;
    pub const HUMIDITY_PCT: f64 = 60.0;
    pub const WIND_SPEED: f64 = 10.0;
    pub const UV_INDEX: f64 = 5.0;
    pub const PRESSURE_HPA: f64 = 1013.0;
    pub const WEATHER_CODE: u16 = 1;
    pub const MONTH: u32 = 6;
}

/// One weather observation for a city. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub city: String,
    /// Air temperature (°C)
    pub temperature: f64,
    /// Relative humidity (%), 0-100
    pub humidity: f64,
    /// Precipitation (mm)
    pub rainfall: f64,
    /// Wind speed (km/h)
    pub wind_speed: f64,
    pub uv_index: f64,
    /// Surface pressure (hPa)
    pub pressure: f64,
    /// Dew point (°C)
    pub dew_point: f64,
    /// WMO weather interpretation code
    pub weather_code: u16,
    pub recorded_at: DateTime<Utc>,
}

impl Default for WeatherReading {
    fn default() -> Self {
        Self {
            city: String::new(),
            temperature: nominal::TEMPERATURE_C,
            humidity: nominal::HUMIDITY_PCT,
            rainfall: 0.0,
            wind_speed: nominal::WIND_SPEED,
            uv_index: nominal::UV_INDEX,
            pressure: nominal::PRESSURE_HPA,
            dew_point: dew_point_celsius(nominal::TEMPERATURE_C, nominal::HUMIDITY_PCT),
            weather_code: nominal::WEATHER_CODE,
            recorded_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl WeatherReading {
    /// Reject malformed or out-of-range readings before they reach scoring
    /// or the normalizer.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fields = [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("rainfall", self.rainfall),
            ("windSpeed", self.wind_speed),
            ("uvIndex", self.uv_index),
            ("pressure", self.pressure),
            ("dewPoint", self.dew_point),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(EngineError::invalid_feature(name, format!("value must be finite, got {value}")));
            }
        }

        if !(0.0..=100.0).contains(&self.humidity) {
            return Err(EngineError::invalid_feature(
                "humidity",
                format!("{:.1}% is outside [0, 100]", self.humidity),
            ));
        }
        if self.rainfall < 0.0 {
            return Err(EngineError::invalid_feature("rainfall", "cannot be negative"));
        }
        if self.wind_speed < 0.0 {
            return Err(EngineError::invalid_feature("windSpeed", "cannot be negative"));
        }
        if self.uv_index < 0.0 {
            return Err(EngineError::invalid_feature("uvIndex", "cannot be negative"));
        }
        if !(MIN_PRESSURE_HPA..=MAX_PRESSURE_HPA).contains(&self.pressure) {
            return Err(EngineError::invalid_feature(
                "pressure",
                format!(
                    "{:.1} hPa is outside [{MIN_PRESSURE_HPA}, {MAX_PRESSURE_HPA}]",
                    self.pressure
                ),
            ));
        }
        Ok(())
    }

    /// Calendar month (1-12) of the observation.
    pub fn month(&self) -> u32 {
        self.recorded_at.month()
    }
}

/// Dew point from temperature and relative humidity (Magnus formula).
pub fn dew_point_celsius(temperature: f64, humidity: f64) -> f64 {
    const A: f64 = 17.27;
    const B: f64 = 237.7;
    let rh = (humidity / 100.0).clamp(0.01, 1.0);
    let gamma = (A * temperature) / (B + temperature) + rh.ln();
    (B * gamma) / (A - gamma)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reading_is_valid() {
        assert!(WeatherReading::default().validate().is_ok());
    }

    #[test]
    fn test_humidity_out_of_range_rejected() {
        let reading = WeatherReading { humidity: 104.0, ..Default::default() };
        let err = reading.validate().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidFeature);
        assert!(err.to_string().contains("humidity"));

        let reading = WeatherReading { humidity: -1.0, ..Default::default() };
        assert!(reading.validate().is_err());
    }

    #[test]
    fn test_humidity_bounds_inclusive() {
        assert!(WeatherReading { humidity: 0.0, ..Default::default() }.validate().is_ok());
        assert!(WeatherReading { humidity: 100.0, ..Default::default() }.validate().is_ok());
    }

    #[test]
    fn test_non_finite_rejected() {
        let reading = WeatherReading { temperature: f64::NAN, ..Default::default() };
        assert!(reading.validate().is_err());
    }

    #[test]
    fn test_negative_rainfall_rejected() {
        let reading = WeatherReading { rainfall: -0.5, ..Default::default() };
        assert!(reading.validate().is_err());
    }

    #[test]
    fn test_dew_point_saturated_equals_temperature() {
        let dp = dew_point_celsius(25.0, 100.0);
        assert!((dp - 25.0).abs() < 0.05);
    }

    #[test]
    fn test_dew_point_below_temperature() {
        let dp = dew_point_celsius(30.0, 50.0);
        assert!(dp < 30.0);
        assert!((dp - 18.4).abs() < 0.5);
    }
}
