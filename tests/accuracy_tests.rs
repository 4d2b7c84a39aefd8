//! Batch accuracy reports and their boundary shape.

use healthcast::accuracy::AccuracyValidator;
use healthcast::{ComparisonInput, ErrorKind, Winner};

#[test]
fn batch_aggregates_wins_and_means() {
    let validator = AccuracyValidator::default();
    let report = validator
        .compare_batch(&[
            ComparisonInput::new(10.0, 9.0, 12.0),   // ML 90 vs 80
            ComparisonInput::new(100.0, 70.0, 95.0), // rule 95 vs 70
            ComparisonInput::new(50.0, 50.0, 50.5),  // tie 100 vs 99
        ])
        .unwrap();

    assert_eq!(report.len(), 3);
    assert_eq!(report.ml_wins, 1);
    assert_eq!(report.rule_wins, 1);
    assert_eq!(report.ties, 1);
    assert!((report.mean_ml_accuracy - 260.0 / 3.0).abs() < 1e-9);
    assert!((report.mean_rule_accuracy - 274.0 / 3.0).abs() < 1e-9);
    assert_eq!(report.overall_winner, Winner::RuleBased);
    assert!(report.ml_std_accuracy > 0.0);
}

#[test]
fn empty_batch_is_insufficient() {
    let err = AccuracyValidator::default().compare_batch(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientData);
}

#[test]
fn zero_truth_is_guarded() {
    let v = AccuracyValidator::default();
    let exact = v.compare(0.0, 0.0, 3.0).unwrap();
    assert_eq!(exact.ml_accuracy_percent, 100.0);
    assert_eq!(exact.rule_accuracy_percent, 0.0);
    assert_eq!(exact.winner, Winner::Ml);

    let report = v.compare_batch(&[ComparisonInput::new(0.0, 1.0, 2.0)]).unwrap();
    let err = AccuracyValidator::relative_error(&report).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DivisionByZeroRisk);
}

#[test]
fn accuracy_never_negative() {
    let c = AccuracyValidator::default().compare(10.0, 40.0, -25.0).unwrap();
    assert_eq!(c.ml_accuracy_percent, 0.0);
    assert_eq!(c.rule_accuracy_percent, 0.0);
    assert_eq!(c.winner, Winner::Tie);
}

#[test]
fn non_finite_input_rejected() {
    let err = AccuracyValidator::default().compare(10.0, f64::NAN, 9.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFeature);
}

#[test]
fn report_serializes_winner_labels() {
    let report = AccuracyValidator::new(2.0)
        .compare_batch(&[ComparisonInput::new(10.0, 9.0, 12.0)])
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["overallWinner"], "ML Model");
    assert_eq!(json["comparisons"][0]["winner"], "ML Model");
    assert_eq!(json["mlWins"], 1);
}
