//! Disease catalogue entries and the per-call predictions derived from them.

use serde::{Deserialize, Serialize};

use super::WeatherReading;

/// Risk formula signature: weather reading to a score in [0, 1].
pub type RiskFormula = fn(&WeatherReading) -> f64;

/// Static catalogue entry. Fixed at process start, never mutated.
#[derive(Debug, Clone, Copy)]
pub struct DiseaseDefinition {
    pub name: &'static str,
    pub specialty: &'static str,
    /// Doctors needed at full risk (riskLevel = 1.0)
    pub base_doctors_required: u32,
    pub risk_formula: RiskFormula,
    pub symptoms: &'static [&'static str],
    pub prevention_tips: &'static [&'static str],
}

impl DiseaseDefinition {
    /// Raw formula output clamped to [0, 1].
    pub fn risk(&self, weather: &WeatherReading) -> f64 {
        clamp_unit((self.risk_formula)(weather))
    }

    /// `ceil(base_doctors_required × risk_level)`.
    pub fn required_doctors(&self, risk_level: f64) -> u32 {
        required_doctors(self.base_doctors_required, risk_level)
    }

    pub fn predict(&self, weather: &WeatherReading) -> DiseasePrediction {
        let risk_level = self.risk(weather);
        DiseasePrediction {
            disease: self.name.to_string(),
            risk_level,
            required_doctors: self.required_doctors(risk_level),
            specialty: self.specialty.to_string(),
        }
    }
}

/// `ceil(base × risk)` with risk clamped to [0, 1].
pub fn required_doctors(base_doctors_required: u32, risk_level: f64) -> u32 {
    let risk = clamp_unit(risk_level);
    // Bounded by base_doctors_required, so the cast cannot truncate
    (f64::from(base_doctors_required) * risk).ceil() as u32
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Derived per scoring call; never persisted as authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseasePrediction {
    pub disease: String,
    /// Risk score in [0, 1]
    pub risk_level: f64,
    pub required_doctors: u32,
    pub specialty: String,
}
