//! Dense layer and activation functions.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Unconstrained outputs.
    Linear,
    /// Non-negative outputs; also used on every hidden layer.
    Relu,
    /// Probabilities in [0, 1].
    Sigmoid,
}

impl Activation {
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Linear => x,
            Self::Relu => x.max(0.0),
            Self::Sigmoid => sigmoid(x),
        }
    }

    /// Derivative expressed in terms of the activation's output `y`.
    #[inline]
    pub fn derivative_from_output(self, y: f64) -> f64 {
        match self {
            Self::Linear => 1.0,
            Self::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Sigmoid => y * (1.0 - y),
        }
    }
}

#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Fully connected layer. `weights` is row-major `[outputs x inputs]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    /// Uniform init: He bounds for ReLU layers, Xavier/Glorot otherwise.
    /// Biases start at zero.
    pub fn init(inputs: usize, outputs: usize, activation: Activation, rng: &mut StdRng) -> Self {
        let bound = match activation {
            Activation::Relu => (2.0 / inputs.max(1) as f64).sqrt(),
            Activation::Linear | Activation::Sigmoid => (2.0 / (inputs + outputs).max(1) as f64).sqrt(),
        };
        let weights = (0..inputs * outputs)
            .map(|_| rng.gen::<f64>() * 2.0 * bound - bound)
            .collect();

        Self {
            inputs,
            outputs,
            weights,
            biases: vec![0.0; outputs],
            activation,
        }
    }

    pub fn num_params(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Activated outputs for one input row.
    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        self.weights
            .chunks_exact(self.inputs)
            .zip(&self.biases)
            .map(|(row, b)| {
                let z = row.iter().zip(x).map(|(w, xi)| w * xi).sum::<f64>() + b;
                self.activation.apply(z)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_sigmoid_bounds() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(50.0) <= 1.0);
        assert!(sigmoid(-50.0) >= 0.0);
    }

    #[test]
    fn test_relu_derivative() {
        assert_eq!(Activation::Relu.derivative_from_output(0.0), 0.0);
        assert_eq!(Activation::Relu.derivative_from_output(2.0), 1.0);
    }

    #[test]
    fn test_init_is_seeded() {
        let a = DenseLayer::init(4, 3, Activation::Relu, &mut StdRng::seed_from_u64(7));
        let b = DenseLayer::init(4, 3, Activation::Relu, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert_eq!(a.num_params(), 15);
        let bound = (2.0f64 / 4.0).sqrt();
        assert!(a.weights.iter().all(|w| w.abs() <= bound));
    }

    #[test]
    fn test_forward_known_weights() {
        let layer = DenseLayer {
            inputs: 2,
            outputs: 2,
            weights: vec![1.0, 2.0, -1.0, -1.0],
            biases: vec![0.5, 0.0],
            activation: Activation::Relu,
        };
        assert_eq!(layer.forward(&[1.0, 1.0]), vec![3.5, 0.0]);
    }
}
