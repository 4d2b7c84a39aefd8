//! Small feed-forward neural estimators.
//!
//! - `schema`: named, ordered feature schemas and schema-tagged vectors
//! - `normalizer`: z-score statistics (fit / transform / denormalize)
//! - `layer`, `network`: dense layers, forward pass, manual backprop
//! - `training`: mini-batch Adam trainer with hold-out validation
//! - `model`: scenario model specs and trained artifacts
//! - `checkpoint`: atomic JSON file persistence

pub mod checkpoint;
pub mod layer;
pub mod model;
pub mod network;
pub mod normalizer;
pub mod schema;
pub mod training;

pub use layer::{Activation, DenseLayer};
pub use model::{ModelSpec, TrainedModel, ARTIFACT_VERSION};
pub use network::{FeedForwardNetwork, NetworkConfig};
pub use normalizer::{FeatureNormalizer, NormalizationStatistics};
pub use schema::{FeatureSchema, FeatureVector, FieldKind};
pub use training::{LossKind, NetworkTrainer, TrainingMonitor, TrainingParams};
