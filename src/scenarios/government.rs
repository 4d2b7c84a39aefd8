//! Doctor-requirement validation against government reference data.
//!
//! Ground truth for a reference record is
//! `max(ceil(total_cases / cases_per_doctor), ceil(population / population_per_doctor))`.
//! The rule-based estimate sums `required_doctors` over the ranked disease
//! predictions for the record's weather and scales by population in units of
//! `rule_population_unit` (never below 1). The network learns ground truth
//! from weather plus population, and both estimates are scored against it.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::features::government_features;
use super::{require_samples, round_count, Scenario};
use crate::accuracy::{AccuracyValidator, ComparisonInput};
use crate::config::{EngineConfig, ScenarioConfig, TrainingConfig, ValidationConfig};
use crate::error::EngineError;
use crate::nn::training::TrainingMonitor;
use crate::nn::{Activation, FeatureSchema, LossKind, ModelSpec, TrainedModel};
use crate::registry::{ModelRegistry, TrainingHandle};
use crate::risk::{disease_names, RiskFormulaLibrary};
use crate::synthetic::SyntheticLabelGenerator;
use crate::types::{
    AccuracyComparison, BatchComparisonReport, LabeledPrediction, PredictionSet, ReferenceRecord,
    SkippedRecord, TrainingExample,
};

pub const SCENARIO: &str = "government";
pub const OUTPUT_LABEL: &str = "doctors_required";

/// Synthetic case rate per 100k residents at full formula risk.
const SYNTHETIC_CASES_PER_100K_AT_FULL_RISK: f64 = 400.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorEstimate {
    pub location: String,
    pub ml_doctors: u32,
    pub rule_based_doctors: u32,
    pub predictions: PredictionSet,
}

pub struct GovernmentValidator {
    registry: Arc<ModelRegistry>,
    spec: ModelSpec,
    training: TrainingConfig,
    library: RiskFormulaLibrary,
    accuracy: AccuracyValidator,
    policy: ValidationConfig,
    synthetic_samples: usize,
}

impl GovernmentValidator {
    pub fn new(
        registry: Arc<ModelRegistry>,
        scenario: &ScenarioConfig,
        training: TrainingConfig,
        library: RiskFormulaLibrary,
        policy: ValidationConfig,
    ) -> Self {
        registry.register(SCENARIO);
        Self {
            registry,
            spec: Self::model_spec(scenario),
            training,
            library,
            accuracy: AccuracyValidator::from_config(&policy),
            policy,
            synthetic_samples: scenario.synthetic_samples,
        }
    }

    pub fn from_config(registry: Arc<ModelRegistry>, config: &EngineConfig) -> Self {
        Self::new(
            registry,
            &config.scenarios.government,
            config.training.clone(),
            RiskFormulaLibrary::from_config(&config.risk),
            config.validation.clone(),
        )
    }

    pub fn model_spec(scenario: &ScenarioConfig) -> ModelSpec {
        ModelSpec {
            scenario: SCENARIO.to_string(),
            schema: FeatureSchema::government(),
            output_labels: vec![OUTPUT_LABEL.to_string()],
            hidden: scenario.hidden.clone(),
            output_activation: Activation::Linear,
            loss: LossKind::MeanSquared,
            scale_targets: true,
            min_samples: scenario.min_samples,
        }
    }

    pub fn ground_truth_doctors(&self, record: &ReferenceRecord) -> u64 {
        let cases_per_doctor = u64::from(self.policy.cases_per_doctor.max(1));
        let population_per_doctor = self.policy.population_per_doctor.max(1);
        record
            .total_cases()
            .div_ceil(cases_per_doctor)
            .max(record.population.div_ceil(population_per_doctor))
    }

    pub fn rule_based_doctors(&self, record: &ReferenceRecord) -> Result<u64, EngineError> {
        let ranked = self.library.predict(&record.weather_snapshot)?;
        let per_unit: u64 = ranked.iter().map(|p| u64::from(p.required_doctors)).sum();
        let unit = self.policy.rule_population_unit.max(1) as f64;
        let scale = (record.population as f64 / unit).max(1.0);
        Ok((per_unit as f64 * scale).ceil() as u64)
    }

    pub fn examples(&self, records: &[ReferenceRecord]) -> Result<Vec<TrainingExample>, EngineError> {
        records
            .iter()
            .map(|r| {
                let features = government_features(&self.spec.schema, &r.weather_snapshot, r.population)?;
                Ok(TrainingExample::new(features, vec![self.ground_truth_doctors(r) as f64]))
            })
            .collect()
    }

    /// Reference records whose case counts follow the rule-based formulas.
    pub fn synthetic_records(&self, n: usize, seed: u64) -> Vec<ReferenceRecord> {
        let library = &self.library;
        SyntheticLabelGenerator::new(seed).reference_records(n, &disease_names(), |w| {
            library
                .risk_vector(w)
                .into_iter()
                .map(|r| r * SYNTHETIC_CASES_PER_100K_AT_FULL_RISK)
                .collect()
        })
    }

    fn training_set(&self, records: &[ReferenceRecord]) -> Result<Vec<TrainingExample>, EngineError> {
        let mut examples = self.examples(records)?;
        if examples.len() < self.spec.min_samples && self.synthetic_samples > 0 {
            let top_up = self.synthetic_samples.max(self.spec.min_samples - examples.len());
            info!(real = examples.len(), synthetic = top_up, "Topping up government training set");
            examples.extend(self.examples(&self.synthetic_records(top_up, self.training.seed))?);
        }
        require_samples(&self.spec, examples.len())?;
        Ok(examples)
    }

    pub fn train(
        &self,
        records: &[ReferenceRecord],
        monitor: &mut dyn TrainingMonitor,
    ) -> Result<Arc<TrainedModel>, EngineError> {
        let examples = self.training_set(records)?;
        self.fit_examples(&examples, monitor)
    }

    pub fn train_job(&self, records: &[ReferenceRecord]) -> Result<TrainingHandle, EngineError> {
        let examples = self.training_set(records)?;
        self.spawn_training(examples)
    }

    /// Unrounded network estimate for a record.
    fn ml_estimate(&self, model: &TrainedModel, record: &ReferenceRecord) -> Result<f64, EngineError> {
        let features = government_features(&self.spec.schema, &record.weather_snapshot, record.population)?;
        let out = model.predict(&features)?;
        Ok(out.first().copied().unwrap_or(0.0).max(0.0))
    }

    pub fn predict_doctors(&self, record: &ReferenceRecord) -> Result<DoctorEstimate, EngineError> {
        let model = self.model()?;
        let raw = self.ml_estimate(&model, record)?;
        let rule = self.rule_based_doctors(record)?;
        let mae = model.metrics().per_output_validation_mae.first().copied().unwrap_or(0.0);

        Ok(DoctorEstimate {
            location: record.location.clone(),
            ml_doctors: round_count(raw),
            rule_based_doctors: u32::try_from(rule).unwrap_or(u32::MAX),
            predictions: PredictionSet {
                scenario: SCENARIO.to_string(),
                generated_at: Utc::now(),
                predictions: vec![LabeledPrediction {
                    label: OUTPUT_LABEL.to_string(),
                    predicted_value: raw,
                    confidence: 1.0 / (1.0 + mae / raw.max(1.0)),
                    confidence_interval: Some(((raw - 1.96 * mae).max(0.0), raw + 1.96 * mae)),
                }],
            },
        })
    }

    fn comparison_input(&self, model: &TrainedModel, record: &ReferenceRecord) -> Result<ComparisonInput, EngineError> {
        Ok(ComparisonInput::new(
            self.ground_truth_doctors(record) as f64,
            f64::from(round_count(self.ml_estimate(model, record)?)),
            self.rule_based_doctors(record)? as f64,
        ))
    }

    pub fn compare(&self, record: &ReferenceRecord) -> Result<AccuracyComparison, EngineError> {
        let model = self.model()?;
        let input = self.comparison_input(&model, record)?;
        self.accuracy
            .compare(input.ground_truth, input.ml_prediction, input.rule_based_prediction)
    }

    /// Score both estimators over a reference dataset. Records that cannot
    /// be scored (invalid reading, non-finite estimate) are listed in
    /// `skipped`; the batch fails only when no record is left.
    pub fn validate(&self, records: &[ReferenceRecord]) -> Result<BatchComparisonReport, EngineError> {
        let model = self.model()?;
        let mut comparisons = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();

        for record in records {
            let scored = self.comparison_input(&model, record).and_then(|input| {
                self.accuracy
                    .compare(input.ground_truth, input.ml_prediction, input.rule_based_prediction)
            });
            match scored {
                Ok(c) => comparisons.push(c),
                Err(e) => {
                    warn!(location = %record.location, error = %e, "Reference record skipped");
                    skipped.push(SkippedRecord {
                        location: record.location.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        let report = self.accuracy.aggregate(comparisons, skipped)?;

        info!(
            records = report.len(),
            skipped = report.skipped.len(),
            mean_ml_accuracy = report.mean_ml_accuracy,
            mean_rule_accuracy = report.mean_rule_accuracy,
            winner = %report.overall_winner,
            "Government validation complete"
        );
        Ok(report)
    }
}

impl Scenario for GovernmentValidator {
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
    use crate::types::WeatherReading;
    use std::collections::BTreeMap;

    fn validator(synthetic: usize, epochs: usize) -> GovernmentValidator {
        let config = EngineConfig::default();
        let scenario = ScenarioConfig { synthetic_samples: synthetic, ..config.scenarios.government.clone() };
        let training = TrainingConfig { epochs, ..config.training.clone() };
        GovernmentValidator::new(
            Arc::new(ModelRegistry::new()),
            &scenario,
            training,
            RiskFormulaLibrary::default(),
            config.validation.clone(),
        )
    }

    fn record(cases: u32, population: u64) -> ReferenceRecord {
        let mut counts = BTreeMap::new();
        counts.insert("Dengue Fever".to_string(), cases);
        ReferenceRecord {
            location: "Test".to_string(),
            weather_snapshot: WeatherReading::default(),
            actual_disease_case_counts: counts,
            population,
        }
    }

    #[test]
    fn test_ground_truth_takes_larger_term() {
        let v = validator(0, 1);
        // cases: ceil(120/50)=3, population: ceil(2500/1000)=3
        assert_eq!(v.ground_truth_doctors(&record(120, 2_500)), 3);
        // population dominates
        assert_eq!(v.ground_truth_doctors(&record(10, 150_001)), 151);
        // cases dominate
        assert_eq!(v.ground_truth_doctors(&record(5_001, 1_000)), 101);
        assert_eq!(v.ground_truth_doctors(&record(0, 0)), 0);
    }

    #[test]
    fn test_rule_based_scales_with_population() {
        let v = validator(0, 1);
        let hot = ReferenceRecord {
            weather_snapshot: WeatherReading { temperature: 38.0, humidity: 65.0, uv_index: 9.0, ..Default::default() },
            ..record(0, 50_000)
        };
        let small = v.rule_based_doctors(&hot).unwrap();
        let large = v.rule_based_doctors(&ReferenceRecord { population: 300_000, ..hot.clone() }).unwrap();
        assert!(small > 0);
        assert_eq!(large, small * 3);
    }

    #[test]
    fn test_train_requires_minimum_without_synthetic() {
        let v = validator(0, 1);
        let records: Vec<_> = (0..5).map(|i| record(i * 10, 100_000)).collect();
        assert_eq!(v.train(&records, &mut ()).unwrap_err().kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn test_validate_before_training() {
        let v = validator(0, 1);
        assert_eq!(v.validate(&[record(10, 1000)]).unwrap_err().kind(), ErrorKind::ModelNotTrained);
    }

    #[test]
    fn test_train_on_synthetic_and_validate() {
        let v = validator(100, 30);
        v.train(&[], &mut ()).unwrap();

        let reference = v.synthetic_records(12, 99);
        let report = v.validate(&reference).unwrap();
        assert_eq!(report.len(), 12);
        assert_eq!(report.ml_wins + report.rule_wins + report.ties, 12);
        for c in &report.comparisons {
            assert!((0.0..=100.0).contains(&c.ml_accuracy_percent));
            assert!((0.0..=100.0).contains(&c.rule_accuracy_percent));
        }

        let estimate = v.predict_doctors(&reference[0]).unwrap();
        assert_eq!(estimate.predictions.predictions.len(), 1);
    }

    #[test]
    fn test_invalid_record_skipped_not_fatal() {
        let v = validator(100, 5);
        v.train(&[], &mut ()).unwrap();

        let mut reference = v.synthetic_records(10, 3);
        reference[4].weather_snapshot.humidity = 140.0;
        let bad_location = reference[4].location.clone();

        let report = v.validate(&reference).unwrap();
        assert_eq!(report.len(), 9);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].location, bad_location);
        assert_eq!(report.skipped[0].kind, ErrorKind::InvalidFeature);
        assert!(report.skipped[0].message.contains("humidity"));
        assert_eq!(report.ml_wins + report.rule_wins + report.ties, 9);
    }

    #[test]
    fn test_all_records_invalid_is_insufficient() {
        let v = validator(100, 5);
        v.train(&[], &mut ()).unwrap();
        let mut bad = record(10, 1000);
        bad.weather_snapshot.rainfall = -3.0;
        assert_eq!(v.validate(&[bad]).unwrap_err().kind(), ErrorKind::InsufficientData);
    }
}
