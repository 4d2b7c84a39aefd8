//! Rule-based disease risk scoring.
//!
//! A fixed catalogue of named risk formulas, one per disease, each mapping a
//! [`WeatherReading`] to a score in [0, 1]. Scoring is a pure function of its
//! inputs.
//!
//! ## Ranked predictions
//!
//! [`RiskFormulaLibrary::predict`] drops every disease whose risk is at or
//! below the inclusion threshold (0.25 by default) and sorts the remainder by
//! descending risk. Equal risks keep catalogue order.

pub mod catalogue;
pub mod formulas;

pub use catalogue::{disease_names, DISEASE_CATALOGUE, NUM_DISEASES};

use tracing::debug;

use crate::config::RiskConfig;
use crate::error::EngineError;
use crate::types::{DiseaseDefinition, DiseasePrediction, WeatherReading};

/// Default inclusion threshold for ranked predictions.
pub const DEFAULT_INCLUSION_THRESHOLD: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct RiskFormulaLibrary {
    catalogue: &'static [DiseaseDefinition],
    inclusion_threshold: f64,
}

impl Default for RiskFormulaLibrary {
    fn default() -> Self {
        Self::new(DEFAULT_INCLUSION_THRESHOLD)
    }
}

impl RiskFormulaLibrary {
    pub fn new(inclusion_threshold: f64) -> Self {
        Self {
            catalogue: &DISEASE_CATALOGUE,
            inclusion_threshold,
        }
    }

    pub fn from_config(config: &RiskConfig) -> Self {
        Self::new(config.inclusion_threshold)
    }

    pub fn catalogue(&self) -> &'static [DiseaseDefinition] {
        self.catalogue
    }

    pub fn inclusion_threshold(&self) -> f64 {
        self.inclusion_threshold
    }

    pub fn definition(&self, disease: &str) -> Option<&'static DiseaseDefinition> {
        self.catalogue.iter().find(|d| d.name.eq_ignore_ascii_case(disease))
    }

    /// Score a single disease for a validated reading.
    pub fn score(&self, disease: &str, weather: &WeatherReading) -> Result<f64, EngineError> {
        weather.validate()?;
        let def = self
            .definition(disease)
            .ok_or_else(|| EngineError::invalid_feature("disease", format!("unknown disease '{disease}'")))?;
        Ok(def.risk(weather))
    }

    /// Risk for every catalogue disease, in catalogue order. Unvalidated;
    /// used by label generators that construct readings themselves.
    pub fn risk_vector(&self, weather: &WeatherReading) -> Vec<f64> {
        self.catalogue.iter().map(|d| d.risk(weather)).collect()
    }

    /// Every catalogue disease scored, in catalogue order, without filtering.
    pub fn score_all(&self, weather: &WeatherReading) -> Result<Vec<DiseasePrediction>, EngineError> {
        weather.validate()?;
        Ok(self.catalogue.iter().map(|d| d.predict(weather)).collect())
    }

    /// Ranked predictions above the inclusion threshold, highest risk first.
    pub fn predict(&self, weather: &WeatherReading) -> Result<Vec<DiseasePrediction>, EngineError> {
        let all = self.score_all(weather)?;
        let ranked = rank_predictions(all, self.inclusion_threshold);

        debug!(
            city = %weather.city,
            included = ranked.len(),
            top = ranked.first().map(|p| p.disease.as_str()).unwrap_or("none"),
            "Rule-based disease risk scored"
        );

        Ok(ranked)
    }
}

/// Drop predictions at or below `threshold` and sort descending by risk.
///
/// The sort is stable, so equal risks keep their incoming order.
pub fn rank_predictions(predictions: Vec<DiseasePrediction>, threshold: f64) -> Vec<DiseasePrediction> {
    let mut kept: Vec<DiseasePrediction> = predictions
        .into_iter()
        .filter(|p| p.risk_level > threshold)
        .collect();
    kept.sort_by(|a, b| b.risk_level.total_cmp(&a.risk_level));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::catalogue::{DENGUE_FEVER, HEAT_STROKE, INFLUENZA};

    fn tropical() -> WeatherReading {
        WeatherReading {
            city: "Chennai".to_string(),
            temperature: 27.0,
            humidity: 82.0,
            rainfall: 12.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_catalogue_size_and_unique_names() {
        let names = disease_names();
        assert_eq!(names.len(), NUM_DISEASES);
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), NUM_DISEASES);
    }

    #[test]
    fn test_dengue_beats_influenza_in_tropics() {
        let lib = RiskFormulaLibrary::default();
        let dengue = lib.score(DENGUE_FEVER, &tropical()).unwrap();
        let flu = lib.score(INFLUENZA, &tropical()).unwrap();
        assert!(dengue > 0.6);
        assert!(dengue > flu);
    }

    #[test]
    fn test_score_case_insensitive_lookup() {
        let lib = RiskFormulaLibrary::default();
        assert!(lib.score("dengue fever", &tropical()).is_ok());
    }

    #[test]
    fn test_unknown_disease_rejected() {
        let lib = RiskFormulaLibrary::default();
        let err = lib.score("Scurvy", &tropical()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidFeature);
    }

    #[test]
    fn test_invalid_reading_rejected_before_scoring() {
        let lib = RiskFormulaLibrary::default();
        let bad = WeatherReading { humidity: 140.0, ..tropical() };
        assert!(lib.predict(&bad).is_err());
        assert!(lib.score(DENGUE_FEVER, &bad).is_err());
    }

    #[test]
    fn test_predict_sorted_and_filtered() {
        let lib = RiskFormulaLibrary::default();
        let ranked = lib.predict(&tropical()).unwrap();
        assert!(!ranked.is_empty());
        assert_eq!(ranked[0].disease, DENGUE_FEVER);
        for pair in ranked.windows(2) {
            assert!(pair[0].risk_level >= pair[1].risk_level);
        }
        assert!(ranked.iter().all(|p| p.risk_level > 0.25));
        assert!(ranked.iter().all(|p| p.disease != INFLUENZA));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let preds = vec![
            DiseasePrediction { disease: "A".into(), risk_level: 0.25, required_doctors: 1, specialty: "x".into() },
            DiseasePrediction { disease: "B".into(), risk_level: 0.2501, required_doctors: 1, specialty: "x".into() },
        ];
        let ranked = rank_predictions(preds, 0.25);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].disease, "B");
    }

    #[test]
    fn test_rank_stable_for_ties() {
        let preds = vec![
            DiseasePrediction { disease: "First".into(), risk_level: 0.5, required_doctors: 1, specialty: "x".into() },
            DiseasePrediction { disease: "Second".into(), risk_level: 0.5, required_doctors: 1, specialty: "x".into() },
        ];
        let ranked = rank_predictions(preds, 0.25);
        assert_eq!(ranked[0].disease, "First");
        assert_eq!(ranked[1].disease, "Second");
    }

    #[test]
    fn test_required_doctors_matches_ceil() {
        let lib = RiskFormulaLibrary::default();
        let heat = WeatherReading { temperature: 38.0, humidity: 65.0, uv_index: 9.0, ..Default::default() };
        let all = lib.score_all(&heat).unwrap();
        let stroke = all.iter().find(|p| p.disease == HEAT_STROKE).unwrap();
        let def = lib.definition(HEAT_STROKE).unwrap();
        let expected = (f64::from(def.base_doctors_required) * stroke.risk_level).ceil() as u32;
        assert_eq!(stroke.required_doctors, expected);
    }

    #[test]
    fn test_custom_threshold() {
        let strict = RiskFormulaLibrary::new(0.9);
        let ranked = strict.predict(&tropical()).unwrap();
        assert!(ranked.iter().all(|p| p.risk_level > 0.9));
    }
}
