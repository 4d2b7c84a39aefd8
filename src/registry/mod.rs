//! Per-scenario model slots with atomic replacement.
//!
//! Each scenario owns one slot holding an `ArcSwapOption<TrainedModel>`.
//! Predictors load the current `Arc` without locking; a finished fit swaps
//! the new model in with a single store, so a reader sees either the old
//! model or the new one, never a mix of weights and statistics. Only one fit
//! per scenario may run at a time, and a failed or cancelled fit leaves the
//! previous model in place.

mod job;

pub use job::{TrainingHandle, TrainingJob};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use arc_swap::ArcSwapOption;
use tracing::{info, warn};

use crate::config::TrainingConfig;
use crate::error::EngineError;
use crate::nn::training::TrainingMonitor;
use crate::nn::{ModelSpec, TrainedModel};
use crate::storage::ModelStore;
use crate::types::{ModelState, TrainingExample};

#[derive(Default)]
struct ModelSlot {
    model: ArcSwapOption<TrainedModel>,
    fitting: AtomicBool,
    disposed: AtomicBool,
}

impl ModelSlot {
    fn state(&self) -> ModelState {
        if self.disposed.load(Ordering::Acquire) {
            ModelState::Disposed
        } else if self.fitting.load(Ordering::Acquire) {
            ModelState::Fitting
        } else if self.model.load().is_some() {
            ModelState::Ready
        } else {
            ModelState::Built
        }
    }
}

/// Marks a slot as fitting for as long as it lives.
pub(crate) struct FitGuard {
    slot: Arc<ModelSlot>,
}

impl Drop for FitGuard {
    fn drop(&mut self) {
        self.slot.fitting.store(false, Ordering::Release);
    }
}

#[derive(Default)]
pub struct ModelRegistry {
    slots: RwLock<HashMap<String, Arc<ModelSlot>>>,
    store: Option<Arc<ModelStore>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that persists every installed model.
    pub fn with_store(store: Arc<ModelStore>) -> Self {
        Self {
            slots: RwLock::default(),
            store: Some(store),
        }
    }

    pub fn store(&self) -> Option<&Arc<ModelStore>> {
        self.store.as_ref()
    }

    fn existing(&self, scenario: &str) -> Option<Arc<ModelSlot>> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.get(scenario).cloned()
    }

    fn slot(&self, scenario: &str) -> Arc<ModelSlot> {
        if let Some(slot) = self.existing(scenario) {
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.entry(scenario.to_string()).or_default().clone()
    }

    /// Create an empty slot so the scenario reports `Built`.
    pub fn register(&self, scenario: &str) {
        self.slot(scenario);
    }

    pub fn status(&self, scenario: &str) -> ModelState {
        self.existing(scenario)
            .map(|s| s.state())
            .unwrap_or(ModelState::Unbuilt)
    }

    /// Current model, if one is ready.
    pub fn current(&self, scenario: &str) -> Option<Arc<TrainedModel>> {
        let slot = self.existing(scenario)?;
        if slot.disposed.load(Ordering::Acquire) {
            return None;
        }
        slot.model.load_full()
    }

    /// Current model or `ModelNotTrained`.
    pub fn model(&self, scenario: &str) -> Result<Arc<TrainedModel>, EngineError> {
        self.current(scenario)
            .ok_or_else(|| EngineError::not_trained(scenario))
    }

    /// Claim the slot for a fit. Rejects a second concurrent fit.
    pub(crate) fn begin_fit(&self, scenario: &str) -> Result<FitGuard, EngineError> {
        let slot = self.slot(scenario);
        if slot.disposed.load(Ordering::Acquire) {
            return Err(EngineError::TrainingFailure {
                reason: format!("model slot for '{scenario}' has been disposed"),
                epoch: 0,
                last_loss: None,
            });
        }
        if slot
            .fitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(scenario, "Fit requested while another fit is running");
            return Err(EngineError::TrainingFailure {
                reason: format!("a fit for '{scenario}' is already running"),
                epoch: 0,
                last_loss: None,
            });
        }
        Ok(FitGuard { slot })
    }

    /// Persist (when a store is attached) and atomically swap in `model`.
    ///
    /// On a storage error the previous model stays current.
    pub fn install(&self, model: TrainedModel) -> Result<Arc<TrainedModel>, EngineError> {
        if let Err(reason) = model.validate() {
            return Err(EngineError::TrainingFailure {
                reason,
                epoch: model.metrics.epochs_completed,
                last_loss: Some(model.metrics.final_loss),
            });
        }

        let slot = self.slot(&model.scenario);
        if slot.disposed.load(Ordering::Acquire) {
            warn!(scenario = %model.scenario, "Fit finished after the slot was disposed");
            return Err(EngineError::TrainingFailure {
                reason: format!("model slot for '{}' has been disposed", model.scenario),
                epoch: model.metrics.epochs_completed,
                last_loss: Some(model.metrics.final_loss),
            });
        }

        if let Some(store) = &self.store {
            store.save(&model)?;
        }

        let model = Arc::new(model);
        slot.model.store(Some(Arc::clone(&model)));
        info!(scenario = %model.scenario, trained_at = %model.trained_at, "Model installed");
        Ok(model)
    }

    /// Fit on the calling thread and install the result.
    pub fn fit_blocking(
        &self,
        spec: &ModelSpec,
        examples: &[TrainingExample],
        config: &TrainingConfig,
        monitor: &mut dyn TrainingMonitor,
    ) -> Result<Arc<TrainedModel>, EngineError> {
        let _guard = self.begin_fit(&spec.scenario)?;
        let model = spec.fit(examples, config, monitor)?;
        self.install(model)
    }

    /// Restore the persisted model for `scenario`. Returns whether one was found.
    pub fn load_persisted(&self, scenario: &str) -> Result<bool, EngineError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        match store.load(scenario)? {
            Some(model) => {
                self.slot(scenario).model.store(Some(Arc::new(model)));
                info!(scenario, "Restored persisted model");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop the model and refuse further use of the slot.
    pub fn dispose(&self, scenario: &str) {
        if let Some(slot) = self.existing(scenario) {
            slot.disposed.store(true, Ordering::Release);
            slot.model.store(None);
            info!(scenario, "Model slot disposed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::model::tests::{toy_examples, toy_spec};

    fn quick() -> TrainingConfig {
        TrainingConfig { epochs: 5, ..TrainingConfig::default() }
    }

    #[test]
    fn test_lifecycle_states() {
        let registry = ModelRegistry::new();
        assert_eq!(registry.status("toy"), ModelState::Unbuilt);
        registry.register("toy");
        assert_eq!(registry.status("toy"), ModelState::Built);

        let spec = toy_spec(10, false);
        registry.fit_blocking(&spec, &toy_examples(&spec, 20), &quick(), &mut ()).unwrap();
        assert_eq!(registry.status("toy"), ModelState::Ready);

        registry.dispose("toy");
        assert_eq!(registry.status("toy"), ModelState::Disposed);
        assert!(registry.model("toy").is_err());
    }

    #[test]
    fn test_predict_before_fit_is_not_trained() {
        let registry = ModelRegistry::new();
        let err = registry.model("admission").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ModelNotTrained);
    }

    #[test]
    fn test_failed_fit_keeps_previous_model() {
        let registry = ModelRegistry::new();
        let spec = toy_spec(10, false);
        let first = registry.fit_blocking(&spec, &toy_examples(&spec, 20), &quick(), &mut ()).unwrap();

        let err = registry.fit_blocking(&spec, &toy_examples(&spec, 5), &quick(), &mut ());
        assert!(err.is_err());

        let current = registry.model("toy").unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(registry.status("toy"), ModelState::Ready);
    }

    #[test]
    fn test_concurrent_fit_rejected() {
        let registry = ModelRegistry::new();
        let _guard = registry.begin_fit("toy").unwrap();
        assert_eq!(registry.status("toy"), ModelState::Fitting);
        assert!(registry.begin_fit("toy").is_err());
        drop(_guard);
        assert!(registry.begin_fit("toy").is_ok());
    }

    #[test]
    fn test_install_persists_and_restores() {
        let store = Arc::new(ModelStore::temporary().unwrap());
        let registry = ModelRegistry::with_store(Arc::clone(&store));
        let spec = toy_spec(10, false);
        registry.fit_blocking(&spec, &toy_examples(&spec, 20), &quick(), &mut ()).unwrap();

        let fresh = ModelRegistry::with_store(store);
        assert!(fresh.load_persisted("toy").unwrap());
        assert_eq!(fresh.status("toy"), ModelState::Ready);
        assert!(!fresh.load_persisted("missing").unwrap());
    }

    #[test]
    fn test_install_after_dispose_rejected() {
        let store = Arc::new(ModelStore::temporary().unwrap());
        let registry = ModelRegistry::with_store(Arc::clone(&store));
        let spec = toy_spec(10, false);
        registry.register("toy");
        let late = spec.fit(&toy_examples(&spec, 20), &quick(), &mut ()).unwrap();

        registry.dispose("toy");
        let err = registry.install(late).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TrainingFailure);
        assert_eq!(registry.status("toy"), ModelState::Disposed);
        assert!(registry.current("toy").is_none());
        assert!(store.load("toy").unwrap().is_none());
    }
}
