//! Per-disease outbreak probability from weather.
//!
//! The network is trained on labelled readings. When too few real labels
//! exist, the set is topped up with synthetic readings labelled by the
//! rule-based formulas. Every forecast reports the rule-based scores
//! alongside the network output so the two can be compared.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::features::{disease_features, reading_from_disease_features};
use super::{require_samples, Scenario};
use crate::config::{EngineConfig, ScenarioConfig, TrainingConfig};
use crate::error::EngineError;
use crate::nn::training::TrainingMonitor;
use crate::nn::{Activation, FeatureSchema, FeatureVector, LossKind, ModelSpec, TrainedModel};
use crate::registry::{ModelRegistry, TrainingHandle};
use crate::risk::{disease_names, RiskFormulaLibrary};
use crate::synthetic::SyntheticLabelGenerator;
use crate::types::{
    DiseasePrediction, LabeledPrediction, PredictionSet, TrainingExample, WeatherReading,
};

pub const SCENARIO: &str = "disease";

/// Per-disease gap between network probability and rule-based risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAgreement {
    pub per_disease: Vec<(String, f64)>,
    pub mean_abs_difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseForecast {
    pub predictions: PredictionSet,
    /// Ranked rule-based predictions above the inclusion threshold
    pub rule_based: Vec<DiseasePrediction>,
    pub agreement: RuleAgreement,
}

pub struct DiseaseRiskForecaster {
    registry: Arc<ModelRegistry>,
    spec: ModelSpec,
    training: TrainingConfig,
    library: RiskFormulaLibrary,
    synthetic_samples: usize,
}

impl DiseaseRiskForecaster {
    pub fn new(
        registry: Arc<ModelRegistry>,
        scenario: &ScenarioConfig,
        training: TrainingConfig,
        library: RiskFormulaLibrary,
    ) -> Self {
        registry.register(SCENARIO);
        Self {
            registry,
            spec: Self::model_spec(scenario),
            training,
            library,
            synthetic_samples: scenario.synthetic_samples,
        }
    }

    pub fn from_config(registry: Arc<ModelRegistry>, config: &EngineConfig) -> Self {
        Self::new(
            registry,
            &config.scenarios.disease,
            config.training.clone(),
            RiskFormulaLibrary::from_config(&config.risk),
        )
    }

    pub fn model_spec(scenario: &ScenarioConfig) -> ModelSpec {
        ModelSpec {
            scenario: SCENARIO.to_string(),
            schema: FeatureSchema::disease(),
            output_labels: disease_names().into_iter().map(String::from).collect(),
            hidden: scenario.hidden.clone(),
            output_activation: Activation::Sigmoid,
            loss: LossKind::BinaryCrossEntropy,
            scale_targets: false,
            min_samples: scenario.min_samples,
        }
    }

    pub fn library(&self) -> &RiskFormulaLibrary {
        &self.library
    }

    /// Examples from labelled readings. Labels are per-disease probabilities
    /// in catalogue order.
    pub fn examples(&self, labeled: &[(WeatherReading, Vec<f64>)]) -> Result<Vec<TrainingExample>, EngineError> {
        labeled
            .iter()
            .map(|(reading, labels)| {
                if let Some(bad) = labels.iter().find(|p| !(0.0..=1.0).contains(*p)) {
                    return Err(EngineError::invalid_feature("label", format!("probability {bad} outside [0, 1]")));
                }
                Ok(TrainingExample::new(disease_features(&self.spec.schema, reading)?, labels.clone()))
            })
            .collect()
    }

    /// `n` synthetic examples labelled by the rule-based formulas.
    pub fn synthetic_examples(&self, n: usize, seed: u64) -> Result<Vec<TrainingExample>, EngineError> {
        let library = &self.library;
        let labeled = SyntheticLabelGenerator::new(seed).labeled(n, (0.0, 1.0), |w| library.risk_vector(w));
        self.examples(&labeled)
    }

    /// Real examples plus synthetic ones when below the minimum.
    fn training_set(&self, labeled: &[(WeatherReading, Vec<f64>)]) -> Result<Vec<TrainingExample>, EngineError> {
        let mut examples = self.examples(labeled)?;
        if examples.len() < self.spec.min_samples && self.synthetic_samples > 0 {
            let top_up = self.synthetic_samples.max(self.spec.min_samples - examples.len());
            info!(real = examples.len(), synthetic = top_up, "Topping up disease training set");
            examples.extend(self.synthetic_examples(top_up, self.training.seed)?);
        }
        require_samples(&self.spec, examples.len())?;
        Ok(examples)
    }

    pub fn train(
        &self,
        labeled: &[(WeatherReading, Vec<f64>)],
        monitor: &mut dyn TrainingMonitor,
    ) -> Result<Arc<TrainedModel>, EngineError> {
        let examples = self.training_set(labeled)?;
        self.fit_examples(&examples, monitor)
    }

    pub fn train_job(&self, labeled: &[(WeatherReading, Vec<f64>)]) -> Result<TrainingHandle, EngineError> {
        let examples = self.training_set(labeled)?;
        self.spawn_training(examples)
    }

    /// Network probabilities plus rule-based scores for `weather`.
    pub fn predict(&self, weather: &WeatherReading) -> Result<DiseaseForecast, EngineError> {
        let features = disease_features(&self.spec.schema, weather)?;
        self.forecast(weather, &features)
    }

    /// Same as [`Self::predict`], starting from a disease feature vector.
    pub fn predict_features(&self, features: &FeatureVector) -> Result<DiseaseForecast, EngineError> {
        let weather = reading_from_disease_features(&self.spec.schema, features)?;
        self.forecast(&weather, features)
    }

    /// Ranked rule-based predictions for a disease feature vector.
    pub fn rule_risk_from_features(&self, features: &FeatureVector) -> Result<Vec<DiseasePrediction>, EngineError> {
        let weather = reading_from_disease_features(&self.spec.schema, features)?;
        self.library.predict(&weather)
    }

    fn forecast(&self, weather: &WeatherReading, features: &FeatureVector) -> Result<DiseaseForecast, EngineError> {
        let model = self.model()?;
        let probabilities = model.predict(features)?;
        let rule_scores = self.library.risk_vector(weather);

        let predictions: Vec<LabeledPrediction> = model
            .output_labels
            .iter()
            .zip(&probabilities)
            .map(|(label, &p)| {
                let p = p.clamp(0.0, 1.0);
                LabeledPrediction {
                    label: label.clone(),
                    predicted_value: p,
                    confidence: p.max(1.0 - p),
                    confidence_interval: None,
                }
            })
            .collect();

        let per_disease: Vec<(String, f64)> = predictions
            .iter()
            .zip(&rule_scores)
            .map(|(p, &rule)| (p.label.clone(), (p.predicted_value - rule).abs()))
            .collect();
        let mean_abs_difference = if per_disease.is_empty() {
            0.0
        } else {
            per_disease.iter().map(|(_, d)| d).sum::<f64>() / per_disease.len() as f64
        };

        debug!(city = %weather.city, mean_abs_difference, "Disease forecast");

        Ok(DiseaseForecast {
            predictions: PredictionSet {
                scenario: SCENARIO.to_string(),
                generated_at: Utc::now(),
                predictions,
            },
            rule_based: self.library.predict(weather)?,
            agreement: RuleAgreement { per_disease, mean_abs_difference },
        })
    }
}

impl Scenario for DiseaseRiskForecaster {
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
    use crate::risk::NUM_DISEASES;
    use crate::scenarios::features::nominal_disease_features;

    fn forecaster(scenario: ScenarioConfig, epochs: usize) -> DiseaseRiskForecaster {
        let training = TrainingConfig { epochs, ..TrainingConfig::default() };
        DiseaseRiskForecaster::new(
            Arc::new(ModelRegistry::new()),
            &scenario,
            training,
            RiskFormulaLibrary::default(),
        )
    }

    fn default_scenario() -> ScenarioConfig {
        EngineConfig::default().scenarios.disease
    }

    #[test]
    fn test_no_synthetic_top_up_means_insufficient() {
        let scenario = ScenarioConfig { synthetic_samples: 0, ..default_scenario() };
        let f = forecaster(scenario, 3);
        let err = f.train(&[], &mut ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }

    #[test]
    fn test_bad_label_rejected() {
        let f = forecaster(default_scenario(), 3);
        let labeled = vec![(WeatherReading::default(), vec![1.5; NUM_DISEASES])];
        assert_eq!(f.examples(&labeled).unwrap_err().kind(), ErrorKind::InvalidFeature);
    }

    #[test]
    fn test_synthetic_examples_shape() {
        let f = forecaster(default_scenario(), 3);
        let examples = f.synthetic_examples(20, 1).unwrap();
        assert_eq!(examples.len(), 20);
        for e in &examples {
            assert_eq!(e.target.len(), NUM_DISEASES);
            assert!(e.target.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_rule_risk_from_feature_vector() {
        let f = forecaster(default_scenario(), 3);
        let v = nominal_disease_features(
            &FeatureSchema::disease(),
            &[("temperature", 27.0), ("humidity", 82.0), ("rainfall", 12.0)],
        )
        .unwrap();
        let ranked = f.rule_risk_from_features(&v).unwrap();
        assert_eq!(ranked[0].disease, crate::risk::catalogue::DENGUE_FEVER);
        assert!(ranked[0].risk_level > 0.6);
    }

    #[test]
    fn test_train_on_synthetic_and_predict() {
        let f = forecaster(ScenarioConfig { synthetic_samples: 200, ..default_scenario() }, 10);
        f.train(&[], &mut ()).unwrap();

        let reading = WeatherReading { temperature: 30.0, humidity: 85.0, rainfall: 20.0, ..Default::default() };
        let forecast = f.predict(&reading).unwrap();
        assert_eq!(forecast.predictions.predictions.len(), NUM_DISEASES);
        for p in &forecast.predictions.predictions {
            assert!((0.0..=1.0).contains(&p.predicted_value));
            assert!(p.confidence >= 0.5 && p.confidence <= 1.0);
        }
        assert_eq!(forecast.agreement.per_disease.len(), NUM_DISEASES);
        assert!(forecast.agreement.mean_abs_difference <= 1.0);
    }

    #[test]
    fn test_predict_untrained() {
        let f = forecaster(default_scenario(), 3);
        let err = f.predict(&WeatherReading::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelNotTrained);
    }
}
