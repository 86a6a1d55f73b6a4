//! Parameter initializers.

use burn::tensor::{Distribution, Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

use super::shape::Shape;

/// Initialization policy for parameter nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Init {
    /// Glorot (Xavier) normal: N(0, gain * sqrt(2 / (fan_in + fan_out))).
    GlorotNormal { gain: f64 },
    /// Glorot (Xavier) uniform: U(-a, a) with a = gain * sqrt(6 / (fan_in + fan_out)).
    GlorotUniform { gain: f64 },
    /// Every element set to the same value.
    Constant(f64),
    Zeros,
}

impl Default for Init {
    fn default() -> Self {
        Init::GlorotNormal { gain: 1.0 }
    }
}

/// Fan-in and fan-out of a shape.
///
/// Vectors are treated as a single row, so fan_in = 1 and fan_out = len.
fn fans(shape: &Shape) -> (f64, f64) {
    match shape.dims() {
        [] => (1.0, 1.0),
        [n] => (1.0, *n as f64),
        [rows, cols] => (*rows as f64, *cols as f64),
        dims => {
            let receptive: usize = dims[2..].iter().product();
            ((dims[0] * receptive) as f64, (dims[1] * receptive) as f64)
        }
    }
}

impl Init {
    /// Draws a tensor backing a value of `shape`.
    pub fn tensor<B: Backend>(&self, shape: &Shape, device: &B::Device) -> Tensor<B, 2> {
        let dims = shape.tensor_dims();
        let (fan_in, fan_out) = fans(shape);
        match *self {
            Init::GlorotNormal { gain } => {
                let std = gain * (2.0 / (fan_in + fan_out)).sqrt();
                Tensor::random(dims, Distribution::Normal(0.0, std), device)
            }
            Init::GlorotUniform { gain } => {
                let limit = gain * (6.0 / (fan_in + fan_out)).sqrt();
                Tensor::random(dims, Distribution::Uniform(-limit, limit), device)
            }
            Init::Constant(value) => Tensor::<B, 2>::ones(dims, device).mul_scalar(value),
            Init::Zeros => Tensor::zeros(dims, device),
        }
    }
}
