//! Engine error taxonomy and the structured result envelope handed to callers.
//!
//! Every fallible core operation returns [`EngineError`]. Callers that forward
//! results to a UI layer wrap them in [`Outcome`], which carries a
//! machine-checkable [`ErrorKind`] plus a human-readable message instead of a
//! raw error value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Insufficient data for {scenario}: have {available} samples, need {required}")]
    InsufficientData {
        scenario: String,
        available: usize,
        required: usize,
    },

    #[error("No trained model available for scenario '{scenario}'")]
    ModelNotTrained { scenario: String },

    #[error("Invalid feature '{field}': {reason}")]
    InvalidFeature { field: String, reason: String },

    #[error("Division by zero risk in {context}: ground truth is zero")]
    DivisionByZeroRisk { context: String },

    #[error("Training failed at epoch {epoch}: {reason} (last finite loss: {last_loss:?})")]
    TrainingFailure {
        reason: String,
        epoch: usize,
        last_loss: Option<f64>,
    },

    #[error("Training for '{scenario}' cancelled after epoch {epoch}")]
    TrainingCancelled { scenario: String, epoch: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn invalid_feature(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFeature {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_trained(scenario: impl Into<String>) -> Self {
        Self::ModelNotTrained {
            scenario: scenario.into(),
        }
    }

    /// Machine-checkable kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientData { .. } => ErrorKind::InsufficientData,
            Self::ModelNotTrained { .. } => ErrorKind::ModelNotTrained,
            Self::InvalidFeature { .. } => ErrorKind::InvalidFeature,
            Self::DivisionByZeroRisk { .. } => ErrorKind::DivisionByZeroRisk,
            Self::TrainingFailure { .. } => ErrorKind::TrainingFailure,
            Self::TrainingCancelled { .. } => ErrorKind::TrainingCancelled,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the caller can recover by collecting more data, training, or retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. }
                | Self::ModelNotTrained { .. }
                | Self::InvalidFeature { .. }
                | Self::DivisionByZeroRisk { .. }
                | Self::TrainingCancelled { .. }
        )
    }
}

impl From<crate::storage::StorageError> for EngineError {
    fn from(err: crate::storage::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Error category exposed to callers alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientData,
    ModelNotTrained,
    InvalidFeature,
    DivisionByZeroRisk,
    TrainingFailure,
    TrainingCancelled,
    Storage,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientData => "INSUFFICIENT_DATA",
            Self::ModelNotTrained => "MODEL_NOT_TRAINED",
            Self::InvalidFeature => "INVALID_FEATURE",
            Self::DivisionByZeroRisk => "DIVISION_BY_ZERO_RISK",
            Self::TrainingFailure => "TRAINING_FAILURE",
            Self::TrainingCancelled => "TRAINING_CANCELLED",
            Self::Storage => "STORAGE",
            Self::Config => "CONFIG",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured success/failure envelope for results leaving the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success { data: T },
    Failure { kind: ErrorKind, message: String },
}

impl<T> Outcome<T> {
    pub fn from_result(result: Result<T, EngineError>) -> Self {
        match result {
            Ok(data) => Self::Success { data },
            Err(e) => Self::Failure {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl<T> From<Result<T, EngineError>> for Outcome<T> {
    fn from(result: Result<T, EngineError>) -> Self {
        Self::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = EngineError::InsufficientData {
            scenario: "admission".to_string(),
            available: 12,
            required: 30,
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("have 12 samples, need 30"));
    }

    #[test]
    fn test_training_failure_not_recoverable() {
        let err = EngineError::TrainingFailure {
            reason: "loss diverged".to_string(),
            epoch: 7,
            last_loss: Some(0.4),
        };
        assert_eq!(err.kind(), ErrorKind::TrainingFailure);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_outcome_failure_serializes_kind() {
        let outcome: Outcome<f64> = Outcome::from_result(Err(EngineError::not_trained("disease")));
        assert!(!outcome.is_success());
        assert_eq!(outcome.kind(), Some(ErrorKind::ModelNotTrained));

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["kind"], "model_not_trained");
    }

    #[test]
    fn test_outcome_success() {
        let outcome: Outcome<u32> = Ok(4).into();
        assert!(outcome.is_success());
        assert_eq!(outcome.kind(), None);
    }
}
