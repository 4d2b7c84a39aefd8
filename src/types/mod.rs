//! Shared data model for the risk-scoring, forecasting and validation engine.

pub mod disease;
pub mod history;
pub mod ml;
pub mod validation;
pub mod weather;

pub use disease::{required_doctors, DiseaseDefinition, DiseasePrediction, RiskFormula};
pub use history::{AdmissionCounts, HistoricalRecord, ReferenceRecord, ADMISSION_CATEGORIES};
pub use ml::{
    LabeledPrediction, ModelState, PredictionSet, TrainingEvent, TrainingExample, TrainingMetrics,
};
pub use validation::{
    AccuracyComparison, BatchComparisonReport, RelativeError, SkippedRecord, Winner,
};
pub use weather::{dew_point_celsius, WeatherReading};
