//! Scenario orchestrators.
//!
//! Each scenario fixes a feature schema (and how it is derived from boundary
//! records), an output schema, and its minimum-data gating, then delegates
//! build/fit/predict to the shared [`crate::nn`] stack and the per-scenario
//! slot in [`ModelRegistry`].
//!
//! | Scenario | Inputs | Outputs |
//! |---|---|---|
//! | [`AdmissionForecaster`] | calendar + admission history | four category counts |
//! | [`DiseaseRiskForecaster`] | weather | one probability per catalogue disease |
//! | [`GovernmentValidator`] | weather + population | doctors required |

pub mod admission;
pub mod disease;
pub mod features;
pub mod government;

pub use admission::{AdmissionForecast, AdmissionForecaster};
pub use disease::{DiseaseForecast, DiseaseRiskForecaster, RuleAgreement};
pub use government::{DoctorEstimate, GovernmentValidator};

use std::sync::Arc;

use crate::config::TrainingConfig;
use crate::error::EngineError;
use crate::nn::training::TrainingMonitor;
use crate::nn::{ModelSpec, TrainedModel};
use crate::registry::{ModelRegistry, TrainingHandle, TrainingJob};
use crate::types::{ModelState, TrainingExample};

/// Names of every scenario, in CLI order.
pub const SCENARIO_NAMES: [&str; 3] = [admission::SCENARIO, disease::SCENARIO, government::SCENARIO];

/// Round a predicted count for reporting. Negative values clamp to zero.
pub fn round_count(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    value.max(0.0).round().min(f64::from(u32::MAX)) as u32
}

/// Shared lifecycle for scenario orchestrators.
pub trait Scenario {
    fn name(&self) -> &'static str;

    fn spec(&self) -> &ModelSpec;

    fn registry(&self) -> &Arc<ModelRegistry>;

    fn training_config(&self) -> &TrainingConfig;

    fn status(&self) -> ModelState {
        self.registry().status(self.name())
    }

    /// Current trained model or `ModelNotTrained`.
    fn model(&self) -> Result<Arc<TrainedModel>, EngineError> {
        self.registry().model(self.name())
    }

    /// Fit on the calling thread and install the result.
    fn fit_examples(
        &self,
        examples: &[TrainingExample],
        monitor: &mut dyn TrainingMonitor,
    ) -> Result<Arc<TrainedModel>, EngineError> {
        self.registry()
            .fit_blocking(self.spec(), examples, self.training_config(), monitor)
    }

    /// Fit on the blocking pool; progress and cancellation via the handle.
    fn spawn_training(&self, examples: Vec<TrainingExample>) -> Result<TrainingHandle, EngineError> {
        TrainingJob::new(
            Arc::clone(self.registry()),
            self.spec().clone(),
            examples,
            self.training_config().clone(),
        )
        .spawn()
    }

    /// Restore a persisted model, if the registry has a store attached.
    fn restore(&self) -> Result<bool, EngineError> {
        self.registry().load_persisted(self.name())
    }
}

/// Fail fast with `InsufficientData` before any feature work.
pub(crate) fn require_samples(spec: &ModelSpec, available: usize) -> Result<(), EngineError> {
    if available < spec.min_samples {
        tracing::warn!(
            scenario = %spec.scenario,
            available,
            required = spec.min_samples,
            "Not enough samples to train"
        );
        return Err(EngineError::InsufficientData {
            scenario: spec.scenario.clone(),
            available,
            required: spec.min_samples,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_count() {
        assert_eq!(round_count(3.4), 3);
        assert_eq!(round_count(3.5), 4);
        assert_eq!(round_count(-2.0), 0);
        assert_eq!(round_count(f64::NAN), 0);
        assert_eq!(round_count(f64::INFINITY), 0);
    }

    #[test]
    fn test_scenario_names_unique() {
        let mut names = SCENARIO_NAMES.to_vec();
        names.dedup();
        assert_eq!(names.len(), 3);
    }
}
