//! Daily admission forecasting.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::features::{admission_features, sort_chronological, DayContext};
use super::{require_samples, round_count, Scenario};
use crate::config::{EngineConfig, ScenarioConfig, TrainingConfig};
use crate::error::EngineError;
use crate::nn::training::TrainingMonitor;
use crate::nn::{Activation, FeatureSchema, LossKind, ModelSpec, TrainedModel};
use crate::registry::{ModelRegistry, TrainingHandle};
use crate::types::{
    AdmissionCounts, HistoricalRecord, LabeledPrediction, PredictionSet, TrainingExample,
    ADMISSION_CATEGORIES,
};

pub const SCENARIO: &str = "admission";

/// z-score for a two-sided 95% interval.
const Z_95: f64 = 1.96;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionForecast {
    pub date: NaiveDate,
    pub counts: AdmissionCounts,
    pub total: u32,
    pub predictions: PredictionSet,
}

pub struct AdmissionForecaster {
    registry: Arc<ModelRegistry>,
    spec: ModelSpec,
    training: TrainingConfig,
}

impl AdmissionForecaster {
    pub fn new(registry: Arc<ModelRegistry>, scenario: &ScenarioConfig, training: TrainingConfig) -> Self {
        registry.register(SCENARIO);
        Self {
            registry,
            spec: Self::model_spec(scenario),
            training,
        }
    }

    pub fn from_config(registry: Arc<ModelRegistry>, config: &EngineConfig) -> Self {
        Self::new(registry, &config.scenarios.admission, config.training.clone())
    }

    pub fn model_spec(scenario: &ScenarioConfig) -> ModelSpec {
        ModelSpec {
            scenario: SCENARIO.to_string(),
            schema: FeatureSchema::admission(),
            output_labels: ADMISSION_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            hidden: scenario.hidden.clone(),
            output_activation: Activation::Linear,
            loss: LossKind::MeanSquared,
            scale_targets: true,
            min_samples: scenario.min_samples,
        }
    }

    /// One example per record. History features are derived from the sorted
    /// record list before anything downstream shuffles it.
    pub fn examples(&self, records: &[HistoricalRecord]) -> Result<Vec<TrainingExample>, EngineError> {
        let sorted = sort_chronological(records)?;
        sorted
            .iter()
            .map(|r| {
                let features = admission_features(&self.spec.schema, &sorted, DayContext::from(r))?;
                let target = r.subcategory_counts.as_array().iter().map(|&c| f64::from(c)).collect();
                Ok(TrainingExample::new(features, target))
            })
            .collect()
    }

    pub fn train(
        &self,
        records: &[HistoricalRecord],
        monitor: &mut dyn TrainingMonitor,
    ) -> Result<Arc<TrainedModel>, EngineError> {
        require_samples(&self.spec, records.len())?;
        let examples = self.examples(records)?;
        self.fit_examples(&examples, monitor)
    }

    pub fn train_job(&self, records: &[HistoricalRecord]) -> Result<TrainingHandle, EngineError> {
        require_samples(&self.spec, records.len())?;
        let examples = self.examples(records)?;
        self.spawn_training(examples)
    }

    /// Forecast counts for `day` from the history preceding it.
    pub fn forecast(&self, history: &[HistoricalRecord], day: DayContext) -> Result<AdmissionForecast, EngineError> {
        let model = self.model()?;
        let sorted = sort_chronological(history)?;
        let features = admission_features(&self.spec.schema, &sorted, day)?;
        let raw = model.predict(&features)?;

        let mae = &model.metrics().per_output_validation_mae;
        let predictions: Vec<LabeledPrediction> = model
            .output_labels
            .iter()
            .zip(&raw)
            .enumerate()
            .map(|(i, (label, &value))| {
                let value = value.max(0.0);
                let err = mae.get(i).copied().unwrap_or(0.0);
                LabeledPrediction {
                    label: label.clone(),
                    predicted_value: value,
                    confidence: 1.0 / (1.0 + err / value.max(1.0)),
                    confidence_interval: Some(((value - Z_95 * err).max(0.0), value + Z_95 * err)),
                }
            })
            .collect();

        let mut counts = [0u32; 4];
        for (slot, p) in counts.iter_mut().zip(&predictions) {
            *slot = round_count(p.predicted_value);
        }
        let counts = AdmissionCounts::from_array(counts);

        info!(date = %day.date, total = counts.total(), "Admission forecast");

        Ok(AdmissionForecast {
            date: day.date,
            total: counts.total(),
            counts,
            predictions: PredictionSet {
                scenario: SCENARIO.to_string(),
                generated_at: Utc::now(),
                predictions,
            },
        })
    }
}

impl Scenario for AdmissionForecaster {
    fn name(&self) -> &'static str {
        SCENARIO
    }

    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    fn training_config(&self) -> &TrainingConfig {
        &self.training
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::synthetic::SyntheticLabelGenerator;
    use crate::types::ModelState;

    fn forecaster(epochs: usize) -> AdmissionForecaster {
        let config = EngineConfig::default();
        let training = TrainingConfig { epochs, ..config.training.clone() };
        AdmissionForecaster::new(Arc::new(ModelRegistry::new()), &config.scenarios.admission, training)
    }

    fn history(days: usize) -> Vec<HistoricalRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        SyntheticLabelGenerator::new(7).admission_history(start, days)
    }

    #[test]
    fn test_insufficient_history_rejected() {
        let f = forecaster(5);
        let err = f.train(&history(29), &mut ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
        assert_eq!(f.status(), ModelState::Built);
    }

    #[test]
    fn test_forecast_before_training_fails() {
        let f = forecaster(5);
        let day = DayContext::new(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), false, None);
        let err = f.forecast(&history(10), day).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelNotTrained);
    }

    #[test]
    fn test_examples_preserve_record_count_and_targets() {
        let f = forecaster(5);
        let mut records = history(35);
        records.reverse();
        let examples = f.examples(&records).unwrap();
        assert_eq!(examples.len(), 35);
        let first = records.last().unwrap();
        assert_eq!(examples[0].target[0], f64::from(first.subcategory_counts.emergency));
        // earliest day has no prior history
        assert_eq!(examples[0].features.values()[4], 0.0);
    }

    #[test]
    fn test_train_and_forecast() {
        let f = forecaster(100);
        let records = history(30);
        f.train(&records, &mut ()).unwrap();
        assert_eq!(f.status(), ModelState::Ready);

        let next = records.last().unwrap().date.succ_opt().unwrap();
        let forecast = f.forecast(&records, DayContext::new(next, false, Some(28.0))).unwrap();
        assert_eq!(forecast.predictions.predictions.len(), 4);
        assert_eq!(forecast.total, forecast.counts.total());
        for p in &forecast.predictions.predictions {
            assert!(p.predicted_value >= 0.0);
            assert!(p.confidence > 0.0 && p.confidence <= 1.0);
            let (lo, hi) = p.confidence_interval.unwrap();
            assert!(lo <= p.predicted_value && p.predicted_value <= hi);
        }
    }
}
