//! healthcast: weather-driven disease risk scoring and hospital demand forecasting
//!
//! Turns weather readings and hospital history into health-risk
//! intelligence for operations staff.
//!
//! ## Architecture
//!
//! - **Risk**: rule-based per-disease risk formulas and ranked predictions
//! - **Neural estimators**: schema-checked normalization, small dense
//!   networks, Adam training with progress events and cancellation
//! - **Scenarios**: admission forecasting, disease probability, and
//!   doctor-requirement validation against government reference data
//! - **Accuracy**: ML vs rule-based scoring against ground truth
//! - **Registry**: per-scenario model slots with atomic replacement, backed
//!   by a persistent model store

pub mod accuracy;
pub mod config;
pub mod error;
pub mod nn;
pub mod registry;
pub mod risk;
pub mod scenarios;
pub mod storage;
pub mod synthetic;
pub mod types;

pub use config::EngineConfig;

pub use error::{EngineError, ErrorKind, Outcome};

pub use types::{
    AccuracyComparison, AdmissionCounts, BatchComparisonReport, DiseaseDefinition,
    DiseasePrediction, HistoricalRecord, LabeledPrediction, ModelState, PredictionSet,
    ReferenceRecord, TrainingEvent, TrainingExample, TrainingMetrics, WeatherReading, Winner,
};

pub use risk::RiskFormulaLibrary;

pub use nn::{FeatureNormalizer, FeatureSchema, FeatureVector, NormalizationStatistics, TrainedModel};

pub use accuracy::{AccuracyValidator, ComparisonInput};

pub use registry::{ModelRegistry, TrainingHandle, TrainingJob};

pub use scenarios::{
    AdmissionForecaster, DiseaseRiskForecaster, GovernmentValidator, Scenario,
};

pub use storage::{ModelStore, StorageError};

pub use synthetic::SyntheticLabelGenerator;
