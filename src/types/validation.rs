//! Accuracy comparison results: ML predictor vs rule-based predictor vs ground truth.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Which predictor was closer to ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    #[serde(rename = "ML Model")]
    Ml,
    #[serde(rename = "Rule-Based")]
    RuleBased,
    #[serde(rename = "Tie")]
    Tie,
}

impl Winner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ml => "ML Model",
            Self::RuleBased => "Rule-Based",
            Self::Tie => "Tie",
        }
    }
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stateless comparison for a single reference value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyComparison {
    pub ground_truth: f64,
    pub ml_prediction: f64,
    pub rule_based_prediction: f64,
    pub ml_error: f64,
    pub rule_error: f64,
    pub ml_accuracy_percent: f64,
    pub rule_accuracy_percent: f64,
    pub winner: Winner,
}

/// Aggregate relative error over a batch, as a percentage of total ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeError {
    pub ml_pct: f64,
    pub rule_pct: f64,
}

/// A record left out of a batch because it could not be scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub location: String,
    pub kind: ErrorKind,
    pub message: String,
}

/// Aggregate over a reference dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchComparisonReport {
    pub comparisons: Vec<AccuracyComparison>,
    pub mean_ml_accuracy: f64,
    pub mean_rule_accuracy: f64,
    pub ml_std_accuracy: f64,
    pub rule_std_accuracy: f64,
    pub ml_wins: usize,
    pub rule_wins: usize,
    pub ties: usize,
    pub overall_winner: Winner,
    /// `None` when every ground truth in the batch is zero
    pub relative_error_pct: Option<RelativeError>,
    /// Records that failed scoring; the aggregates cover the rest
    #[serde(default)]
    pub skipped: Vec<SkippedRecord>,
}

impl BatchComparisonReport {
    pub fn len(&self) -> usize {
        self.comparisons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparisons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winner_serializes_as_label() {
        assert_eq!(serde_json::to_string(&Winner::Ml).unwrap(), "\"ML Model\"");
        assert_eq!(serde_json::to_string(&Winner::RuleBased).unwrap(), "\"Rule-Based\"");
        assert_eq!(Winner::Tie.to_string(), "Tie");
    }
}
