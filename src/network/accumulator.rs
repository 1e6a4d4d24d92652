use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use crate::error::{EvalError, Result};
use crate::network::{NetworkOutput, Tensor};

enum Buffer {
    Rows {
        ncols: usize,
        nrows: usize,
        data: Vec<f64>,
    },
    WeightedMean {
        sum: Vec<f64>,
        weight: f64,
    },
}

impl Buffer {
    fn start(tensor: Tensor, batch_size: usize) -> Self {
        match tensor {
            Tensor::Matrix(m) => {
                let mut data = Vec::with_capacity(m.len());
                push_rows(&mut data, &m);
                Buffer::Rows {
                    ncols: m.ncols(),
                    nrows: m.nrows(),
                    data,
                }
            }
            Tensor::Vector(v) => {
                let w = batch_size as f64;
                Buffer::WeightedMean {
                    sum: v.iter().map(|x| x * w).collect(),
                    weight: w,
                }
            }
        }
    }

    fn merge(&mut self, key: &str, tensor: Tensor, batch_size: usize) -> Result<()> {
        match (self, tensor) {
            (Buffer::Rows { ncols, nrows, data }, Tensor::Matrix(m)) => {
                if m.ncols() != *ncols {
                    return Err(EvalError::precondition(format!(
                        "output {key} changed width from {ncols} to {} between batches",
                        m.ncols()
                    )));
                }
                push_rows(data, &m);
                *nrows += m.nrows();
            }
            (Buffer::WeightedMean { sum, weight }, Tensor::Vector(v)) => {
                if v.len() != sum.len() {
                    return Err(EvalError::precondition(format!(
                        "output {key} changed length from {} to {} between batches",
                        sum.len(),
                        v.len()
                    )));
                }
                let w = batch_size as f64;
                for (s, x) in sum.iter_mut().zip(v.iter()) {
                    *s += x * w;
                }
                *weight += w;
            }
            _ => {
                return Err(EvalError::precondition(format!(
                    "output {key} changed between matrix and vector across batches"
                )));
            }
        }
        Ok(())
    }
}

/// Collects network outputs batch by batch. Matrices are stacked along the
/// sample axis, vectors are averaged with the batch size as weight.
#[derive(Default)]
pub struct OutputAccumulator {
    buffers: BTreeMap<String, Buffer>,
    n_batches: usize,
}

impl OutputAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, output: NetworkOutput, batch_size: usize) -> Result<()> {
        for (key, tensor) in output {
            if let Some(buffer) = self.buffers.get_mut(&key) {
                buffer.merge(&key, tensor, batch_size)?;
            } else {
                self.buffers.insert(key, Buffer::start(tensor, batch_size));
            }
        }
        self.n_batches += 1;
        Ok(())
    }

    pub fn finalize(self) -> OutputSnapshot {
        let mut tensors = BTreeMap::new();
        for (key, buffer) in self.buffers {
            let tensor = match buffer {
                Buffer::Rows { ncols, nrows, data } => {
                    Tensor::Matrix(DMatrix::from_row_slice(nrows, ncols, &data))
                }
                Buffer::WeightedMean { sum, weight } => {
                    let denom = if weight > 0.0 { weight } else { 1.0 };
                    Tensor::Vector(DVector::from_iterator(
                        sum.len(),
                        sum.into_iter().map(|s| s / denom),
                    ))
                }
            };
            tensors.insert(key, tensor);
        }
        OutputSnapshot {
            tensors,
            n_batches: self.n_batches,
        }
    }
}

fn push_rows(data: &mut Vec<f64>, m: &DMatrix<f64>) {
    for row in m.row_iter() {
        data.extend(row.iter().copied());
    }
}

/// Immutable view over everything a model produced during one evaluation.
#[derive(Debug, Clone)]
pub struct OutputSnapshot {
    tensors: BTreeMap<String, Tensor>,
    n_batches: usize,
}

impl OutputSnapshot {
    pub fn n_batches(&self) -> usize {
        self.n_batches
    }

    pub fn get(&self, key: &str) -> Option<&Tensor> {
        self.tensors.get(key)
    }

    pub fn matrix(&self, key: &str) -> Result<&DMatrix<f64>> {
        match self.tensors.get(key) {
            Some(Tensor::Matrix(m)) => Ok(m),
            Some(Tensor::Vector(_)) => Err(EvalError::precondition(format!(
                "model output {key} is a vector, expected a matrix"
            ))),
            None => Err(missing(key)),
        }
    }

    /// First of `keys` present as a matrix.
    pub fn matrix_any(&self, keys: &[&str]) -> Result<&DMatrix<f64>> {
        for key in keys {
            if let Some(Tensor::Matrix(m)) = self.tensors.get(*key) {
                return Ok(m);
            }
        }
        Err(missing(&keys.join(" | ")))
    }

    pub fn vector(&self, key: &str) -> Result<&DVector<f64>> {
        match self.tensors.get(key) {
            Some(Tensor::Vector(v)) => Ok(v),
            Some(Tensor::Matrix(_)) => Err(EvalError::precondition(format!(
                "model output {key} is a matrix, expected a vector"
            ))),
            None => Err(missing(key)),
        }
    }
}

fn missing(key: &str) -> EvalError {
    EvalError::precondition(format!("model did not produce output {key}"))
}

#[cfg(test)]
#[path = "../../tests/src_inline/network/accumulator.rs"]
mod tests;
