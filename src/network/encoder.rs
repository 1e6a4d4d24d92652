use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }
}

/// `y = act(x W + b)` with `W` stored as `in x out`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    #[serde(with = "crate::input::rows")]
    pub weights: DMatrix<f64>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseEncoder {
    pub layers: Vec<DenseLayer>,
}

impl DenseEncoder {
    pub fn input_dim(&self) -> Option<usize> {
        self.layers.first().map(|l| l.weights.nrows())
    }

    pub fn output_dim(&self) -> Option<usize> {
        self.layers.last().map(|l| l.weights.ncols())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.layers.is_empty() {
            return Err("encoder has no layers".to_string());
        }
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.bias.len() != layer.weights.ncols() {
                return Err(format!(
                    "layer {i}: bias has {} entries for {} outputs",
                    layer.bias.len(),
                    layer.weights.ncols()
                ));
            }
            if i > 0 && self.layers[i - 1].weights.ncols() != layer.weights.nrows() {
                return Err(format!(
                    "layer {i}: expects {} inputs but previous layer emits {}",
                    layer.weights.nrows(),
                    self.layers[i - 1].weights.ncols()
                ));
            }
        }
        Ok(())
    }

    /// Encodes `n x in` samples to `n x out`. Caller checks `input_dim`.
    pub fn forward(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let mut h = x.clone();
        for layer in &self.layers {
            let mut next = &h * &layer.weights;
            for mut row in next.row_iter_mut() {
                for (v, b) in row.iter_mut().zip(layer.bias.iter()) {
                    *v = layer.activation.apply(*v + b);
                }
            }
            h = next;
        }
        h
    }
}
