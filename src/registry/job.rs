//! Background training jobs.
//!
//! A [`TrainingJob`] runs a fit on Tokio's blocking pool. The returned
//! [`TrainingHandle`] streams progress events, can cancel the run (checked
//! once per epoch), and resolves to the installed model. A cancelled or
//! failed job never touches the model already in the registry.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::ModelRegistry;
use crate::config::TrainingConfig;
use crate::error::EngineError;
use crate::nn::training::TrainingMonitor;
use crate::nn::{ModelSpec, TrainedModel};
use crate::types::{TrainingEvent, TrainingExample};

pub struct TrainingJob {
    registry: Arc<ModelRegistry>,
    spec: ModelSpec,
    examples: Vec<TrainingExample>,
    config: TrainingConfig,
}

impl TrainingJob {
    pub fn new(
        registry: Arc<ModelRegistry>,
        spec: ModelSpec,
        examples: Vec<TrainingExample>,
        config: TrainingConfig,
    ) -> Self {
        Self { registry, spec, examples, config }
    }

    /// Claim the scenario slot and start training. Must be called from
    /// within a Tokio runtime.
    pub fn spawn(self) -> Result<TrainingHandle, EngineError> {
        let guard = self.registry.begin_fit(&self.spec.scenario)?;
        let scenario = self.spec.scenario.clone();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut monitor = ChannelMonitor { tx, cancel: cancel.clone() };
        let Self { registry, spec, examples, config } = self;

        info!(scenario = %scenario, samples = examples.len(), "Training job spawned");
        let join = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let model = spec.fit(&examples, &config, &mut monitor)?;
            registry.install(model)
        });

        Ok(TrainingHandle { scenario, cancel, events: rx, join })
    }
}

struct ChannelMonitor {
    tx: mpsc::UnboundedSender<TrainingEvent>,
    cancel: CancellationToken,
}

impl TrainingMonitor for ChannelMonitor {
    fn on_event(&mut self, event: TrainingEvent) {
        // The handle may have been dropped; training still completes.
        let _ = self.tx.send(event);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

pub struct TrainingHandle {
    scenario: String,
    cancel: CancellationToken,
    events: mpsc::UnboundedReceiver<TrainingEvent>,
    join: JoinHandle<Result<Arc<TrainedModel>, EngineError>>,
}

impl TrainingHandle {
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Request cancellation; takes effect at the next epoch boundary.
    pub fn cancel(&self) {
        info!(scenario = %self.scenario, "Training cancellation requested");
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next progress event; `None` once the job has finished and all events
    /// were drained.
    pub async fn next_event(&mut self) -> Option<TrainingEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<TrainingEvent> {
        self.events.try_recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the job and return the installed model.
    pub async fn wait(self) -> Result<Arc<TrainedModel>, EngineError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => {
                warn!(scenario = %self.scenario, error = %e, "Training task aborted");
                Err(EngineError::TrainingFailure {
                    reason: format!("training task aborted: {e}"),
                    epoch: 0,
                    last_loss: None,
                })
            }
        }
    }

    /// Wait for the job, forwarding every progress event to `on_event`.
    pub async fn wait_with_progress<F>(mut self, mut on_event: F) -> Result<Arc<TrainedModel>, EngineError>
    where
        F: FnMut(&TrainingEvent),
    {
        while let Some(event) = self.events.recv().await {
            on_event(&event);
        }
        self.wait().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::model::tests::{toy_examples, toy_spec};
    use crate::types::ModelState;

    #[tokio::test]
    async fn test_job_streams_events_and_installs() {
        let registry = Arc::new(ModelRegistry::new());
        let spec = toy_spec(10, false);
        let config = TrainingConfig { epochs: 8, ..TrainingConfig::default() };
        let examples = toy_examples(&spec, 20);

        let handle = TrainingJob::new(Arc::clone(&registry), spec, examples, config).spawn().unwrap();
        let mut epochs = 0;
        let mut finished = false;
        let model = handle
            .wait_with_progress(|e| match e {
                TrainingEvent::Epoch { .. } => epochs += 1,
                TrainingEvent::Finished(_) => finished = true,
                TrainingEvent::Started { .. } => {}
            })
            .await
            .unwrap();

        assert_eq!(epochs, 8);
        assert!(finished);
        assert_eq!(model.scenario, "toy");
        assert_eq!(registry.status("toy"), ModelState::Ready);
    }

    #[tokio::test]
    async fn test_second_job_rejected_while_running() {
        let registry = Arc::new(ModelRegistry::new());
        let spec = toy_spec(10, false);
        let config = TrainingConfig { epochs: 2000, ..TrainingConfig::default() };
        let examples = toy_examples(&spec, 20);

        let handle = TrainingJob::new(Arc::clone(&registry), spec.clone(), examples.clone(), config.clone())
            .spawn()
            .unwrap();
        let second = TrainingJob::new(Arc::clone(&registry), spec, examples, config).spawn();
        assert!(second.is_err());

        handle.cancel();
        let _ = handle.wait().await;
    }

    #[tokio::test]
    async fn test_cancel_keeps_previous_model() {
        let registry = Arc::new(ModelRegistry::new());
        let spec = toy_spec(10, false);
        let examples = toy_examples(&spec, 20);

        let quick = TrainingConfig { epochs: 3, ..TrainingConfig::default() };
        let first = registry.fit_blocking(&spec, &examples, &quick, &mut ()).unwrap();

        let slow = TrainingConfig { epochs: 100_000, ..TrainingConfig::default() };
        let mut handle = TrainingJob::new(Arc::clone(&registry), spec, examples, slow).spawn().unwrap();
        assert_eq!(registry.status("toy"), ModelState::Fitting);

        // Wait until training is under way, then cancel.
        while let Some(event) = handle.next_event().await {
            if matches!(event, TrainingEvent::Epoch { .. }) {
                break;
            }
        }
        handle.cancel();
        let err = handle.wait().await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TrainingCancelled);

        let current = registry.model("toy").unwrap();
        assert!(Arc::ptr_eq(&first, &current));
        assert_eq!(registry.status("toy"), ModelState::Ready);
    }
}
