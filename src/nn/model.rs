//! Model specs and trained model artifacts.
//!
//! A [`ModelSpec`] fixes everything a scenario decides about its network:
//! schema, output labels, hidden widths, output activation, loss, target
//! scaling and minimum sample count. Fitting a spec yields a
//! [`TrainedModel`], which carries the network together with the feature
//! (and optional target) statistics it was trained under. A model is only
//! ever handed out complete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::layer::Activation;
use super::network::{FeedForwardNetwork, NetworkConfig};
use super::normalizer::{FeatureNormalizer, NormalizationStatistics};
use super::schema::{FeatureSchema, FeatureVector};
use super::training::{LossKind, NetworkTrainer, TrainingMonitor, TrainingParams};
use crate::config::TrainingConfig;
use crate::error::EngineError;
use crate::types::{TrainingExample, TrainingMetrics};

/// Artifact format version.
pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub scenario: String,
    pub schema: FeatureSchema,
    pub output_labels: Vec<String>,
    pub hidden: Vec<usize>,
    pub output_activation: Activation,
    pub loss: LossKind,
    /// Standardize regression targets and denormalize on output.
    pub scale_targets: bool,
    pub min_samples: usize,
}

impl ModelSpec {
    pub fn output_width(&self) -> usize {
        self.output_labels.len()
    }

    /// Fresh, untrained network for this spec.
    pub fn build_network(&self, seed: u64) -> Result<FeedForwardNetwork, EngineError> {
        FeedForwardNetwork::build(NetworkConfig {
            name: self.scenario.clone(),
            input_width: self.schema.width(),
            output_width: self.output_width(),
            hidden: self.hidden.clone(),
            output_activation: self.output_activation,
            seed,
        })
    }

    /// Normalize, build and train. Pure with respect to any existing model.
    pub fn fit(
        &self,
        examples: &[TrainingExample],
        config: &TrainingConfig,
        monitor: &mut dyn TrainingMonitor,
    ) -> Result<TrainedModel, EngineError> {
        if examples.len() < self.min_samples {
            return Err(EngineError::InsufficientData {
                scenario: self.scenario.clone(),
                available: examples.len(),
                required: self.min_samples,
            });
        }

        let features: Vec<FeatureVector> = examples.iter().map(|e| e.features.clone()).collect();
        let feature_stats =
            FeatureNormalizer::new(config.normalization_epsilon).fit(&self.schema, &features)?;
        let inputs = features
            .iter()
            .map(|v| feature_stats.transform(v))
            .collect::<Result<Vec<_>, _>>()?;

        let target_stats = if self.scale_targets {
            let rows: Vec<&[f64]> = examples.iter().map(|e| e.target.as_slice()).collect();
            Some(
                FeatureNormalizer::new(config.normalization_epsilon).fit_rows(
                    &format!("{}_targets", self.scenario),
                    self.output_width(),
                    &rows,
                )?,
            )
        } else {
            if let Some(bad) = examples.iter().find(|e| e.target.len() != self.output_width()) {
                return Err(EngineError::invalid_feature(
                    "target",
                    format!("expected {} targets, got {}", self.output_width(), bad.target.len()),
                ));
            }
            None
        };

        let targets = match &target_stats {
            Some(stats) => examples
                .iter()
                .map(|e| stats.transform_values(&e.target))
                .collect::<Result<Vec<_>, _>>()?,
            None => examples.iter().map(|e| e.target.clone()).collect(),
        };

        let mut network = self.build_network(config.seed)?;
        let trainer = NetworkTrainer::new(TrainingParams::from_config(config, self.min_samples, self.loss));
        let metrics = trainer.fit(&mut network, &inputs, &targets, target_stats.as_ref(), monitor)?;

        info!(
            scenario = %self.scenario,
            samples = examples.len(),
            outputs = self.output_width(),
            "Model fitted"
        );

        Ok(TrainedModel {
            version: ARTIFACT_VERSION,
            scenario: self.scenario.clone(),
            schema: self.schema.clone(),
            output_labels: self.output_labels.clone(),
            network,
            feature_stats,
            target_stats,
            metrics,
            trained_at: Utc::now(),
        })
    }
}

/// A fitted network plus everything needed to run it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub version: u32,
    pub scenario: String,
    pub schema: FeatureSchema,
    pub output_labels: Vec<String>,
    pub network: FeedForwardNetwork,
    pub feature_stats: NormalizationStatistics,
    pub target_stats: Option<NormalizationStatistics>,
    pub metrics: TrainingMetrics,
    pub trained_at: DateTime<Utc>,
}

impl TrainedModel {
    /// Raw outputs in original units, one per label. Counts are not rounded
    /// here; that happens once at the consumer boundary.
    pub fn predict(&self, features: &FeatureVector) -> Result<Vec<f64>, EngineError> {
        self.schema.check(features)?;
        let normalized = self.feature_stats.transform(features)?;
        let raw = self.network.predict(&normalized)?;
        match &self.target_stats {
            Some(stats) => stats.denormalize(&raw),
            None => Ok(raw),
        }
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Consistency check for artifacts read back from storage.
    pub fn validate(&self) -> Result<(), String> {
        if self.version != ARTIFACT_VERSION {
            return Err(format!(
                "unsupported artifact version {} (expected {})",
                self.version, ARTIFACT_VERSION
            ));
        }
        if !self.network.is_trained() {
            return Err("artifact holds an untrained network".to_string());
        }
        self.network.validate()?;

        if self.network.input_width() != self.schema.width() {
            return Err(format!(
                "input width mismatch: schema has {}, network has {}",
                self.schema.width(),
                self.network.input_width()
            ));
        }
        if self.network.output_width() != self.output_labels.len() {
            return Err(format!(
                "output width mismatch: {} labels, network has {}",
                self.output_labels.len(),
                self.network.output_width()
            ));
        }
        if self.feature_stats.columns() != self.schema.name()
            || self.feature_stats.width() != self.schema.width()
        {
            return Err("feature statistics do not match schema".to_string());
        }
        if let Some(t) = &self.target_stats {
            if t.width() != self.output_labels.len() {
                return Err("target statistics do not match outputs".to_string());
            }
        }
        Ok(())
    }
}
