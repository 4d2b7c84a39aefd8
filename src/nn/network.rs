//! Feed-forward network: an ordered stack of dense layers.
//!
//! Hidden layers use ReLU; the output layer uses the activation chosen for
//! the scenario (linear counts, non-negative counts, or probabilities).
//! Backpropagation is manual and produces per-layer gradients that the
//! trainer flattens for Adam.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::layer::{Activation, DenseLayer};
use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Model name used in error messages and logs.
    pub name: String,
    pub input_width: usize,
    pub output_width: usize,
    pub hidden: Vec<usize>,
    pub output_activation: Activation,
    /// Weight-init seed.
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedForwardNetwork {
    config: NetworkConfig,
    layers: Vec<DenseLayer>,
    /// Set once a fit completes; inference is refused before that.
    trained: bool,
}

/// Activations recorded during a forward pass, input first.
pub struct ForwardCache {
    pub activations: Vec<Vec<f64>>,
}

impl ForwardCache {
    pub fn output(&self) -> &[f64] {
        self.activations.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Per-layer weight and bias gradients, same shapes as the layers.
#[derive(Debug, Clone)]
pub struct LayerGradients {
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
}

impl FeedForwardNetwork {
    pub fn build(config: NetworkConfig) -> Result<Self, EngineError> {
        if config.input_width == 0 || config.output_width == 0 {
            return Err(EngineError::invalid_feature(
                config.name.clone(),
                "network input and output widths must be positive",
            ));
        }
        if config.hidden.iter().any(|&w| w == 0) {
            return Err(EngineError::invalid_feature(
                config.name.clone(),
                "hidden layer widths must be positive",
            ));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut layers = Vec::with_capacity(config.hidden.len() + 1);
        let mut fan_in = config.input_width;
        for &width in &config.hidden {
            layers.push(DenseLayer::init(fan_in, width, Activation::Relu, &mut rng));
            fan_in = width;
        }
        layers.push(DenseLayer::init(
            fan_in,
            config.output_width,
            config.output_activation,
            &mut rng,
        ));

        Ok(Self {
            config,
            layers,
            trained: false,
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn input_width(&self) -> usize {
        self.config.input_width
    }

    pub fn output_width(&self) -> usize {
        self.config.output_width
    }

    pub fn output_activation(&self) -> Activation {
        self.config.output_activation
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub(crate) fn mark_trained(&mut self) {
        self.trained = true;
    }

    pub fn num_params(&self) -> usize {
        self.layers.iter().map(DenseLayer::num_params).sum()
    }

    /// Single-example inference on an already-normalized input.
    pub fn predict(&self, normalized: &[f64]) -> Result<Vec<f64>, EngineError> {
        if !self.trained {
            return Err(EngineError::not_trained(self.config.name.clone()));
        }
        if normalized.len() != self.config.input_width {
            return Err(EngineError::invalid_feature(
                self.config.name.clone(),
                format!(
                    "expected {} inputs, got {}",
                    self.config.input_width,
                    normalized.len()
                ),
            ));
        }
        Ok(self.forward(normalized))
    }

    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        self.layers
            .iter()
            .fold(x.to_vec(), |acc, layer| layer.forward(&acc))
    }

    pub fn forward_cached(&self, x: &[f64]) -> ForwardCache {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(x.to_vec());
        for layer in &self.layers {
            let next = match activations.last() {
                Some(prev) => layer.forward(prev),
                None => break,
            };
            activations.push(next);
        }
        ForwardCache { activations }
    }

    pub fn zero_gradients(&self) -> Vec<LayerGradients> {
        self.layers
            .iter()
            .map(|l| LayerGradients {
                weights: vec![0.0; l.weights.len()],
                biases: vec![0.0; l.biases.len()],
            })
            .collect()
    }

    /// Accumulate gradients for one example.
    ///
    /// `output_delta` is dLoss/dz for the output layer's pre-activation.
    pub fn backward(&self, cache: &ForwardCache, output_delta: &[f64], grads: &mut [LayerGradients]) {
        let mut delta = output_delta.to_vec();

        for (idx, layer) in self.layers.iter().enumerate().rev() {
            let input = &cache.activations[idx];
            let g = &mut grads[idx];

            for (o, &d) in delta.iter().enumerate() {
                g.biases[o] += d;
                let row = &mut g.weights[o * layer.inputs..(o + 1) * layer.inputs];
                for (gw, &xi) in row.iter_mut().zip(input) {
                    *gw += d * xi;
                }
            }

            if idx == 0 {
                break;
            }

            // Propagate to the previous (hidden, ReLU) layer.
            let prev = &self.layers[idx - 1];
            let mut prev_delta = vec![0.0; layer.inputs];
            for (o, &d) in delta.iter().enumerate() {
                let row = &layer.weights[o * layer.inputs..(o + 1) * layer.inputs];
                for (pd, &w) in prev_delta.iter_mut().zip(row) {
                    *pd += d * w;
                }
            }
            for (pd, &y) in prev_delta.iter_mut().zip(input) {
                *pd *= prev.activation.derivative_from_output(y);
            }
            delta = prev_delta;
        }
    }

    /// All weights then biases, layer by layer.
    pub fn flatten(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.num_params());
        for l in &self.layers {
            flat.extend_from_slice(&l.weights);
            flat.extend_from_slice(&l.biases);
        }
        flat
    }

    pub fn unflatten(&mut self, flat: &[f64]) {
        let mut offset = 0;
        for l in &mut self.layers {
            let n = l.weights.len();
            l.weights.copy_from_slice(&flat[offset..offset + n]);
            offset += n;
            let n = l.biases.len();
            l.biases.copy_from_slice(&flat[offset..offset + n]);
            offset += n;
        }
    }

    /// Structural consistency check for deserialized networks.
    pub fn validate(&self) -> Result<(), String> {
        let expected = self.config.hidden.len() + 1;
        if self.layers.len() != expected {
            return Err(format!(
                "layer count mismatch: config implies {}, found {}",
                expected,
                self.layers.len()
            ));
        }

        let mut fan_in = self.config.input_width;
        for (i, l) in self.layers.iter().enumerate() {
            let width = self
                .config
                .hidden
                .get(i)
                .copied()
                .unwrap_or(self.config.output_width);
            if l.inputs != fan_in || l.outputs != width {
                return Err(format!(
                    "layer {} shape mismatch: expected {}x{}, found {}x{}",
                    i, width, fan_in, l.outputs, l.inputs
                ));
            }
            if l.weights.len() != l.inputs * l.outputs || l.biases.len() != l.outputs {
                return Err(format!("layer {} parameter count mismatch", i));
            }
            fan_in = width;
        }
        Ok(())
    }
}
