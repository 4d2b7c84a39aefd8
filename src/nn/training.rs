//! Mini-batch training with manual backpropagation and Adam.
//!
//! Examples are shuffled once to carve out the validation hold-out, then the
//! training portion is reshuffled before every epoch. Hold-out examples never
//! contribute to weight updates. Batch gradients are averaged and clipped to
//! a global L2 norm before the Adam step.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::layer::Activation;
use super::network::{FeedForwardNetwork, LayerGradients};
use super::normalizer::NormalizationStatistics;
use crate::config::TrainingConfig;
use crate::error::EngineError;
use crate::types::{TrainingEvent, TrainingMetrics};

/// Probability clamp for cross-entropy.
const BCE_EPS: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    MeanSquared,
    /// Multi-label binary cross-entropy; targets in [0, 1].
    BinaryCrossEntropy,
}

impl LossKind {
    /// Mean loss over the outputs of one example.
    pub fn loss(self, y: &[f64], t: &[f64]) -> f64 {
        let n = y.len().max(1) as f64;
        match self {
            Self::MeanSquared => y.iter().zip(t).map(|(y, t)| (y - t).powi(2)).sum::<f64>() / n,
            Self::BinaryCrossEntropy => {
                y.iter()
                    .zip(t)
                    .map(|(y, t)| {
                        let p = y.clamp(BCE_EPS, 1.0 - BCE_EPS);
                        -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
                    })
                    .sum::<f64>()
                    / n
            }
        }
    }

    /// dLoss/dz for the output pre-activation.
    pub fn output_delta(self, activation: Activation, y: &[f64], t: &[f64]) -> Vec<f64> {
        let n = y.len().max(1) as f64;
        y.iter()
            .zip(t)
            .map(|(&y, &t)| match (self, activation) {
                (Self::BinaryCrossEntropy, Activation::Sigmoid) => (y - t) / n,
                (Self::BinaryCrossEntropy, act) => {
                    let p = y.clamp(BCE_EPS, 1.0 - BCE_EPS);
                    ((p - t) / (p * (1.0 - p))) * act.derivative_from_output(y) / n
                }
                (Self::MeanSquared, act) => 2.0 * (y - t) * act.derivative_from_output(y) / n,
            })
            .collect()
    }
}

// ============================================================================
// Gradient accumulation
// ============================================================================

struct GradAccum {
    layers: Vec<LayerGradients>,
}

impl GradAccum {
    fn new(network: &FeedForwardNetwork) -> Self {
        Self {
            layers: network.zero_gradients(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &f64> {
        self.layers.iter().flat_map(|l| l.weights.iter().chain(&l.biases))
    }

    /// L2 norm of all accumulated gradients.
    fn grad_norm(&self) -> f64 {
        self.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    fn scale(&mut self, factor: f64) {
        for l in &mut self.layers {
            for v in l.weights.iter_mut().chain(l.biases.iter_mut()) {
                *v *= factor;
            }
        }
    }

    /// Same layout as `FeedForwardNetwork::flatten`.
    fn flatten(&self) -> Vec<f64> {
        let mut flat = Vec::new();
        for l in &self.layers {
            flat.extend_from_slice(&l.weights);
            flat.extend_from_slice(&l.biases);
        }
        flat
    }
}

// ============================================================================
// Adam
// ============================================================================

/// Adam optimizer with decaying base learning rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdamOptimizer {
    /// Base learning rate (decays per step).
    pub lr: f64,
    pub decay: f64,
    pub lr_floor: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    pub steps: u64,
    m: Vec<f64>,
    v: Vec<f64>,
}

impl AdamOptimizer {
    pub fn new(num_params: usize, lr: f64) -> Self {
        Self {
            lr,
            decay: 0.9995,
            lr_floor: lr * 0.1,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            steps: 0,
            m: vec![0.0; num_params],
            v: vec![0.0; num_params],
        }
    }

    pub fn current_lr(&self) -> f64 {
        self.lr
    }

    fn apply(&mut self, weights_flat: &mut [f64], grads_flat: &[f64]) {
        self.steps += 1;
        let t = self.steps as f64;

        // Bias-corrected LR
        let lr_t = self.lr * (1.0 - self.beta2.powf(t)).sqrt() / (1.0 - self.beta1.powf(t));

        for (i, (w, &g)) in weights_flat.iter_mut().zip(grads_flat).enumerate() {
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;
            *w -= lr_t * self.m[i] / (self.v[i].sqrt() + self.eps);
        }

        self.lr = (self.lr * self.decay).max(self.lr_floor);
    }
}

// ============================================================================
// Monitor seam
// ============================================================================

/// Receives progress and answers cancellation checks during a fit.
pub trait TrainingMonitor {
    fn on_event(&mut self, event: TrainingEvent);

    /// Polled at the start of every epoch.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Monitor that ignores events and never cancels.
impl TrainingMonitor for () {
    fn on_event(&mut self, _event: TrainingEvent) {}
}

/// Collects every event; handy for synchronous callers and tests.
impl TrainingMonitor for Vec<TrainingEvent> {
    fn on_event(&mut self, event: TrainingEvent) {
        self.push(event);
    }
}

// ============================================================================
// Trainer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingParams {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
    pub learning_rate: f64,
    pub seed: u64,
    pub max_grad_norm: f64,
    pub min_samples: usize,
    pub loss: LossKind,
}

impl TrainingParams {
    pub fn from_config(config: &TrainingConfig, min_samples: usize, loss: LossKind) -> Self {
        Self {
            epochs: config.epochs,
            batch_size: config.batch_size,
            validation_split: config.validation_split,
            learning_rate: config.learning_rate,
            seed: config.seed,
            max_grad_norm: config.max_grad_norm,
            min_samples,
            loss,
        }
    }
}

/// Trains a network on normalized inputs and (optionally scaled) targets.
#[derive(Debug, Clone)]
pub struct NetworkTrainer {
    params: TrainingParams,
}

impl NetworkTrainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Fit `network` in place.
    ///
    /// `target_scale`, when given, is used to report MAE in original units.
    /// On any error the network may hold partially updated weights; callers
    /// that need the old model intact must train a copy.
    pub fn fit(
        &self,
        network: &mut FeedForwardNetwork,
        inputs: &[Vec<f64>],
        targets: &[Vec<f64>],
        target_scale: Option<&NormalizationStatistics>,
        monitor: &mut dyn TrainingMonitor,
    ) -> Result<TrainingMetrics, EngineError> {
        let p = &self.params;
        let scenario = network.name().to_string();
        let n = inputs.len();

        if n < p.min_samples || n < 2 {
            warn!(scenario = %scenario, available = n, required = p.min_samples, "Not enough examples to train");
            return Err(EngineError::InsufficientData {
                scenario,
                available: n,
                required: p.min_samples.max(2),
            });
        }
        self.check_shapes(network, inputs, targets)?;

        let started = Instant::now();
        let mut rng = StdRng::seed_from_u64(p.seed);

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);
        let n_val = ((n as f64) * p.validation_split).floor() as usize;
        let n_val = n_val.min(n - 1);
        let (val_idx, train_idx) = order.split_at(n_val);
        let val_idx = val_idx.to_vec();
        let mut train_idx = train_idx.to_vec();

        monitor.on_event(TrainingEvent::Started {
            scenario: scenario.clone(),
            total_epochs: p.epochs,
            samples: n,
        });
        info!(
            scenario = %scenario,
            train = train_idx.len(),
            validation = val_idx.len(),
            epochs = p.epochs,
            params = network.num_params(),
            "Training started"
        );

        let mut adam = AdamOptimizer::new(network.num_params(), p.learning_rate);
        let activation = network.output_activation();
        let batch_size = p.batch_size.max(1);
        let mut last_loss: Option<f64> = None;
        let mut final_mae = 0.0;
        let mut validation_mae = None;

        for epoch in 1..=p.epochs {
            if monitor.is_cancelled() {
                let completed = epoch - 1;
                info!(scenario = %scenario, completed, "Training cancelled");
                return Err(EngineError::TrainingCancelled { scenario, epoch: completed });
            }

            train_idx.shuffle(&mut rng);
            let mut loss_sum = 0.0;

            for batch in train_idx.chunks(batch_size) {
                let mut grads = GradAccum::new(network);
                for &i in batch {
                    let cache = network.forward_cached(&inputs[i]);
                    let y = cache.output();
                    loss_sum += p.loss.loss(y, &targets[i]);
                    let delta = p.loss.output_delta(activation, y, &targets[i]);
                    network.backward(&cache, &delta, &mut grads.layers);
                }

                grads.scale(1.0 / batch.len() as f64);
                let norm = grads.grad_norm();
                if norm > p.max_grad_norm {
                    grads.scale(p.max_grad_norm / norm);
                }

                let mut flat = network.flatten();
                adam.apply(&mut flat, &grads.flatten());
                network.unflatten(&flat);
            }

            let loss = loss_sum / train_idx.len() as f64;
            if !loss.is_finite() {
                warn!(scenario = %scenario, epoch, ?last_loss, "Training diverged");
                return Err(EngineError::TrainingFailure {
                    reason: "loss diverged to a non-finite value".to_string(),
                    epoch,
                    last_loss,
                });
            }
            last_loss = Some(loss);

            final_mae = mean(&per_output_mae(network, inputs, targets, &train_idx, target_scale)?);
            validation_mae = if val_idx.is_empty() {
                None
            } else {
                Some(mean(&per_output_mae(network, inputs, targets, &val_idx, target_scale)?))
            };

            debug!(scenario = %scenario, epoch, loss, mae = final_mae, ?validation_mae, lr = adam.current_lr(), "Epoch complete");
            monitor.on_event(TrainingEvent::Epoch {
                epoch,
                total_epochs: p.epochs,
                percent: epoch as f64 / p.epochs as f64 * 100.0,
                loss,
                mae: final_mae,
                validation_mae,
            });
        }

        let per_output_validation_mae = if val_idx.is_empty() {
            per_output_mae(network, inputs, targets, &train_idx, target_scale)?
        } else {
            per_output_mae(network, inputs, targets, &val_idx, target_scale)?
        };

        network.mark_trained();

        let metrics = TrainingMetrics {
            final_loss: last_loss.unwrap_or(0.0),
            final_mae,
            validation_mae,
            per_output_validation_mae,
            training_seconds: started.elapsed().as_secs_f64(),
            epochs_completed: p.epochs,
            train_samples: train_idx.len(),
            validation_samples: val_idx.len(),
        };

        info!(
            scenario = %scenario,
            final_loss = metrics.final_loss,
            final_mae = metrics.final_mae,
            validation_mae = ?metrics.validation_mae,
            seconds = metrics.training_seconds,
            "Training complete"
        );
        monitor.on_event(TrainingEvent::Finished(metrics.clone()));

        Ok(metrics)
    }

    fn check_shapes(
        &self,
        network: &FeedForwardNetwork,
        inputs: &[Vec<f64>],
        targets: &[Vec<f64>],
    ) -> Result<(), EngineError> {
        if inputs.len() != targets.len() {
            return Err(EngineError::invalid_feature(
                "target",
                format!("{} inputs but {} targets", inputs.len(), targets.len()),
            ));
        }
        if let Some(bad) = inputs.iter().find(|x| x.len() != network.input_width()) {
            return Err(EngineError::invalid_feature(
                network.name().to_string(),
                format!("expected {} inputs, got {}", network.input_width(), bad.len()),
            ));
        }
        for t in targets {
            if t.len() != network.output_width() {
                return Err(EngineError::invalid_feature(
                    "target",
                    format!("expected {} targets, got {}", network.output_width(), t.len()),
                ));
            }
            if t.iter().any(|v| !v.is_finite()) {
                return Err(EngineError::invalid_feature("target", "must be finite"));
            }
        }
        Ok(())
    }
}

/// Mean absolute error per output over `indices`, in original units when
/// `target_scale` is given.
fn per_output_mae(
    network: &FeedForwardNetwork,
    inputs: &[Vec<f64>],
    targets: &[Vec<f64>],
    indices: &[usize],
    target_scale: Option<&NormalizationStatistics>,
) -> Result<Vec<f64>, EngineError> {
    let mut sums = vec![0.0; network.output_width()];
    for &i in indices {
        let mut y = network.forward(&inputs[i]);
        let mut t = targets[i].clone();
        if let Some(stats) = target_scale {
            y = stats.denormalize(&y)?;
            t = stats.denormalize(&t)?;
        }
        for (s, (a, b)) in sums.iter_mut().zip(y.iter().zip(&t)) {
            *s += (a - b).abs();
        }
    }
    let count = indices.len().max(1) as f64;
    Ok(sums.into_iter().map(|s| s / count).collect())
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
