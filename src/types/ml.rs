//! ML types: training examples, fit metrics, progress events, prediction sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::nn::FeatureVector;

/// One supervised example. A training set has no required ordering, but
/// history-derived features must be computed before any shuffling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub features: FeatureVector,
    /// One scalar per predicted quantity
    pub target: Vec<f64>,
}

impl TrainingExample {
    pub fn new(features: FeatureVector, target: Vec<f64>) -> Self {
        Self { features, target }
    }
}

/// Result of a completed fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingMetrics {
    /// Training loss after the last epoch (scaled target space)
    pub final_loss: f64,
    /// Training MAE after the last epoch (original units)
    pub final_mae: f64,
    /// Hold-out MAE (original units); `None` when the split held nothing out
    pub validation_mae: Option<f64>,
    /// Hold-out MAE per output, used for prediction intervals
    #[serde(default)]
    pub per_output_validation_mae: Vec<f64>,
    pub training_seconds: f64,
    pub epochs_completed: usize,
    pub train_samples: usize,
    pub validation_samples: usize,
}

/// Progress events emitted by a running training job, in order:
/// `Started`, one `Epoch` per completed epoch, then `Finished`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrainingEvent {
    Started {
        scenario: String,
        total_epochs: usize,
        samples: usize,
    },
    Epoch {
        epoch: usize,
        total_epochs: usize,
        percent: f64,
        loss: f64,
        mae: f64,
        validation_mae: Option<f64>,
    },
    Finished(TrainingMetrics),
}

/// Lifecycle of a scenario's model slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    /// No model has been built for this scenario yet.
    Unbuilt,
    /// A network exists but has not completed a fit.
    Built,
    /// A fit is running. A previously Ready model stays usable meanwhile.
    Fitting,
    /// A trained model is available for inference.
    Ready,
    /// Resources released; no further use.
    Disposed,
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unbuilt => "UNBUILT",
            Self::Built => "BUILT",
            Self::Fitting => "FITTING",
            Self::Ready => "READY",
            Self::Disposed => "DISPOSED",
        }
    }
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One labelled output of a prediction set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabeledPrediction {
    pub label: String,
    pub predicted_value: f64,
    /// 0-1
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_interval: Option<(f64, f64)>,
}

/// Ordered predictions for one scenario call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionSet {
    pub scenario: String,
    pub generated_at: DateTime<Utc>,
    pub predictions: Vec<LabeledPrediction>,
}

impl PredictionSet {
    pub fn get(&self, label: &str) -> Option<&LabeledPrediction> {
        self.predictions.iter().find(|p| p.label == label)
    }
}
