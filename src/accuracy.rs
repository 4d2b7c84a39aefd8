//! ML-vs-rule accuracy comparison against ground truth.
//!
//! Accuracy for a single prediction is `max(0, 100 - |pred - truth| / truth * 100)`.
//! A zero ground truth scores 100% only for an (effectively) zero prediction
//! and 0% otherwise, so no division by zero ever reaches the report.
//! The winner is the predictor with the higher accuracy unless the two are
//! within the tie tolerance.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, warn};

use crate::config::{defaults, ValidationConfig};
use crate::error::EngineError;
use crate::types::{AccuracyComparison, BatchComparisonReport, SkippedRecord, Winner};

pub use crate::types::RelativeError;

/// Predictions this close to a zero ground truth count as exact.
const ZERO_TRUTH_EPS: f64 = 1e-9;

/// One (ground truth, ML prediction, rule prediction) triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonInput {
    pub ground_truth: f64,
    pub ml_prediction: f64,
    pub rule_based_prediction: f64,
}

impl ComparisonInput {
    pub fn new(ground_truth: f64, ml_prediction: f64, rule_based_prediction: f64) -> Self {
        Self { ground_truth, ml_prediction, rule_based_prediction }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AccuracyValidator {
    tie_tolerance_pct: f64,
}

impl Default for AccuracyValidator {
    fn default() -> Self {
        Self::new(defaults::TIE_TOLERANCE_PCT)
    }
}

impl AccuracyValidator {
    pub fn new(tie_tolerance_pct: f64) -> Self {
        Self { tie_tolerance_pct }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(config.tie_tolerance_pct)
    }

    pub fn tie_tolerance_pct(&self) -> f64 {
        self.tie_tolerance_pct
    }

    /// Accuracy percentage in [0, 100].
    pub fn accuracy_percent(prediction: f64, ground_truth: f64) -> f64 {
        let error = (prediction - ground_truth).abs();
        if ground_truth == 0.0 {
            return if prediction.abs() < ZERO_TRUTH_EPS { 100.0 } else { 0.0 };
        }
        (100.0 - error / ground_truth.abs() * 100.0).max(0.0)
    }

    /// Winner for a pair of accuracies; a difference under the tolerance is a tie.
    pub fn winner(&self, ml_accuracy: f64, rule_accuracy: f64) -> Winner {
        let diff = ml_accuracy - rule_accuracy;
        if diff.abs() < self.tie_tolerance_pct {
            Winner::Tie
        } else if diff > 0.0 {
            Winner::Ml
        } else {
            Winner::RuleBased
        }
    }

    pub fn compare(
        &self,
        ground_truth: f64,
        ml_prediction: f64,
        rule_based_prediction: f64,
    ) -> Result<AccuracyComparison, EngineError> {
        for (field, v) in [
            ("ground_truth", ground_truth),
            ("ml_prediction", ml_prediction),
            ("rule_based_prediction", rule_based_prediction),
        ] {
            if !v.is_finite() {
                return Err(EngineError::invalid_feature(field, "must be finite"));
            }
        }

        let ml_accuracy_percent = Self::accuracy_percent(ml_prediction, ground_truth);
        let rule_accuracy_percent = Self::accuracy_percent(rule_based_prediction, ground_truth);

        Ok(AccuracyComparison {
            ground_truth,
            ml_prediction,
            rule_based_prediction,
            ml_error: (ml_prediction - ground_truth).abs(),
            rule_error: (rule_based_prediction - ground_truth).abs(),
            ml_accuracy_percent,
            rule_accuracy_percent,
            winner: self.winner(ml_accuracy_percent, rule_accuracy_percent),
        })
    }

    /// Compare every input and aggregate. Inputs that fail comparison are
    /// reported in `skipped` (located by index) instead of failing the batch.
    pub fn compare_batch(&self, inputs: &[ComparisonInput]) -> Result<BatchComparisonReport, EngineError> {
        let mut comparisons = Vec::with_capacity(inputs.len());
        let mut skipped = Vec::new();
        for (i, input) in inputs.iter().enumerate() {
            match self.compare(input.ground_truth, input.ml_prediction, input.rule_based_prediction) {
                Ok(c) => comparisons.push(c),
                Err(e) => skipped.push(SkippedRecord {
                    location: format!("#{i}"),
                    kind: e.kind(),
                    message: e.to_string(),
                }),
            }
        }
        self.aggregate(comparisons, skipped)
    }

    /// Aggregate finished comparisons. Fails with `InsufficientData` only when
    /// nothing was scored.
    pub fn aggregate(
        &self,
        comparisons: Vec<AccuracyComparison>,
        skipped: Vec<SkippedRecord>,
    ) -> Result<BatchComparisonReport, EngineError> {
        if comparisons.is_empty() {
            warn!(skipped = skipped.len(), "No comparisons left to aggregate");
            return Err(EngineError::InsufficientData {
                scenario: "accuracy_batch".to_string(),
                available: 0,
                required: 1,
            });
        }

        let ml: Vec<f64> = comparisons.iter().map(|c| c.ml_accuracy_percent).collect();
        let rule: Vec<f64> = comparisons.iter().map(|c| c.rule_accuracy_percent).collect();
        let mean_ml_accuracy = ml.iter().mean();
        let mean_rule_accuracy = rule.iter().mean();

        let count = |w: Winner| comparisons.iter().filter(|c| c.winner == w).count();

        let report = BatchComparisonReport {
            ml_std_accuracy: ml.iter().population_std_dev(),
            rule_std_accuracy: rule.iter().population_std_dev(),
            ml_wins: count(Winner::Ml),
            rule_wins: count(Winner::RuleBased),
            ties: count(Winner::Tie),
            overall_winner: self.winner(mean_ml_accuracy, mean_rule_accuracy),
            mean_ml_accuracy,
            mean_rule_accuracy,
            relative_error_pct: relative_error_of(&comparisons),
            comparisons,
            skipped,
        };

        debug!(
            n = report.len(),
            skipped = report.skipped.len(),
            mean_ml = report.mean_ml_accuracy,
            mean_rule = report.mean_rule_accuracy,
            winner = %report.overall_winner,
            "Batch comparison complete"
        );

        Ok(report)
    }

    /// Total absolute error relative to total ground truth, per predictor.
    ///
    /// Fails with `DivisionByZeroRisk` when every ground truth is zero.
    pub fn relative_error(report: &BatchComparisonReport) -> Result<RelativeError, EngineError> {
        relative_error_of(&report.comparisons).ok_or_else(|| EngineError::DivisionByZeroRisk {
            context: "batch relative error".to_string(),
        })
    }
}

fn relative_error_of(comparisons: &[AccuracyComparison]) -> Option<RelativeError> {
    let truth: f64 = comparisons.iter().map(|c| c.ground_truth.abs()).sum();
    if truth == 0.0 {
        return None;
    }
    let ml: f64 = comparisons.iter().map(|c| c.ml_error).sum();
    let rule: f64 = comparisons.iter().map(|c| c.rule_error).sum();
    Some(RelativeError {
        ml_pct: ml / truth * 100.0,
        rule_pct: rule / truth * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ml_wins_when_closer() {
        let c = AccuracyValidator::default().compare(10.0, 9.0, 12.0).unwrap();
        assert!((c.ml_accuracy_percent - 90.0).abs() < 1e-9);
        assert!((c.rule_accuracy_percent - 80.0).abs() < 1e-9);
        assert_eq!(c.ml_error, 1.0);
        assert_eq!(c.rule_error, 2.0);
        assert_eq!(c.winner, Winner::Ml);
    }

    #[test]
    fn test_within_tolerance_is_tie() {
        let c = AccuracyValidator::default().compare(100.0, 99.0, 100.5).unwrap();
        assert_eq!(c.winner, Winner::Tie);
    }

    #[test]
    fn test_exact_tolerance_is_not_tie() {
        let v = AccuracyValidator::new(2.0);
        assert_eq!(v.winner(82.0, 80.0), Winner::Ml);
        assert_eq!(v.winner(80.0, 82.0), Winner::RuleBased);
        assert_eq!(v.winner(81.99, 80.0), Winner::Tie);
    }

    #[test]
    fn test_accuracy_floors_at_zero() {
        assert_eq!(AccuracyValidator::accuracy_percent(35.0, 10.0), 0.0);
    }

    #[test]
    fn test_zero_ground_truth() {
        assert_eq!(AccuracyValidator::accuracy_percent(0.0, 0.0), 100.0);
        assert_eq!(AccuracyValidator::accuracy_percent(0.5, 0.0), 0.0);
        let c = AccuracyValidator::default().compare(0.0, 0.0, 3.0).unwrap();
        assert_eq!(c.winner, Winner::Ml);
        assert!(c.ml_accuracy_percent.is_finite());
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(AccuracyValidator::default().compare(f64::NAN, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_batch_aggregates() {
        let inputs = [
            ComparisonInput::new(10.0, 9.0, 12.0),
            ComparisonInput::new(20.0, 20.0, 10.0),
            ComparisonInput::new(50.0, 50.0, 50.5),
        ];
        let report = AccuracyValidator::default().compare_batch(&inputs).unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report.ml_wins, 2);
        assert_eq!(report.rule_wins, 0);
        assert_eq!(report.ties, 1);
        assert_eq!(report.overall_winner, Winner::Ml);
        assert!((report.mean_ml_accuracy - (90.0 + 100.0 + 100.0) / 3.0).abs() < 1e-9);
        assert!(report.ml_std_accuracy > 0.0);
    }

    #[test]
    fn test_empty_batch_is_insufficient_data() {
        let err = AccuracyValidator::default().compare_batch(&[]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InsufficientData);
    }

    #[test]
    fn test_relative_error_zero_truth_guarded() {
        let report = AccuracyValidator::default()
            .compare_batch(&[ComparisonInput::new(0.0, 1.0, 0.0)])
            .unwrap();
        let err = AccuracyValidator::relative_error(&report).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DivisionByZeroRisk);
    }

    #[test]
    fn test_batch_skips_unscorable_inputs() {
        let inputs = [
            ComparisonInput::new(10.0, 9.0, 12.0),
            ComparisonInput::new(20.0, f64::NAN, 10.0),
            ComparisonInput::new(50.0, 50.0, 50.5),
        ];
        let report = AccuracyValidator::default().compare_batch(&inputs).unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].location, "#1");
        assert_eq!(report.skipped[0].kind, crate::error::ErrorKind::InvalidFeature);

        let all_bad = [ComparisonInput::new(f64::INFINITY, 1.0, 1.0)];
        let err = AccuracyValidator::default().compare_batch(&all_bad).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InsufficientData);
    }

    #[test]
    fn test_report_relative_error_none_for_zero_truth() {
        let v = AccuracyValidator::default();
        let zero = v.compare_batch(&[ComparisonInput::new(0.0, 1.0, 0.0)]).unwrap();
        assert!(zero.relative_error_pct.is_none());

        let report = v.compare_batch(&[ComparisonInput::new(10.0, 9.0, 12.0)]).unwrap();
        let rel = report.relative_error_pct.unwrap();
        assert!((rel.ml_pct - 10.0).abs() < 1e-9);
        assert!((rel.rule_pct - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_relative_error_values() {
        let report = AccuracyValidator::default()
            .compare_batch(&[ComparisonInput::new(10.0, 9.0, 12.0), ComparisonInput::new(30.0, 33.0, 30.0)])
            .unwrap();
        let rel = AccuracyValidator::relative_error(&report).unwrap();
        assert!((rel.ml_pct - 10.0).abs() < 1e-9);
        assert!((rel.rule_pct - 5.0).abs() < 1e-9);
    }
}
