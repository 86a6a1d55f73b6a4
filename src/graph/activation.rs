//! Element-wise activation functions.

use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

/// Supported activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Activation {
    /// No activation (identity function).
    #[default]
    None,
    /// Rectified Linear Unit: f(x) = max(0, x)
    Relu,
    /// Sigmoid: f(x) = 1 / (1 + exp(-x))
    Sigmoid,
    /// Hyperbolic tangent: f(x) = tanh(x)
    Tanh,
}

impl Activation {
    /// Applies the activation function to a tensor.
    pub fn apply<B: Backend, const D: usize>(&self, tensor: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::None => tensor,
            Activation::Relu => burn::tensor::activation::relu(tensor),
            Activation::Sigmoid => burn::tensor::activation::sigmoid(tensor),
            Activation::Tanh => burn::tensor::activation::tanh(tensor),
        }
    }

    /// Returns true if the output range is bounded.
    pub fn is_bounded(&self) -> bool {
        matches!(self, Activation::Sigmoid | Activation::Tanh)
    }

    /// Returns the upper-case name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Activation::None => "NONE",
            Activation::Relu => "RELU",
            Activation::Sigmoid => "SIGMOID",
            Activation::Tanh => "TANH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::backend::Backend;

    type TestBackend = NdArray;

    #[test]
    fn test_names_are_upper_case_serde_names() {
        for act in [
            Activation::None,
            Activation::Relu,
            Activation::Sigmoid,
            Activation::Tanh,
        ] {
            let json = serde_json::to_string(&act).unwrap();
            assert_eq!(json, format!("\"{}\"", act.name()));
        }
    }

    #[test]
    fn test_tanh_is_bounded() {
        let device = <TestBackend as Backend>::Device::default();
        let input = Tensor::<TestBackend, 1>::from_floats([-50.0, -1.0, 0.0, 1.0, 50.0], &device);
        let output = Activation::Tanh.apply(input);
        let result: Vec<f32> = output.to_data().to_vec().unwrap();

        assert!(Activation::Tanh.is_bounded());
        assert!(result.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert!((result[2] - 0.0).abs() < 1e-6);
        assert!((result[3] - 1.0_f32.tanh()).abs() < 1e-5);
    }

    #[test]
    fn test_relu_clamps_negatives() {
        let device = <TestBackend as Backend>::Device::default();
        let input = Tensor::<TestBackend, 1>::from_floats([-2.0, 0.5], &device);
        let result: Vec<f32> = Activation::Relu.apply(input).to_data().to_vec().unwrap();

        assert!((result[0] - 0.0).abs() < 1e-6);
        assert!((result[1] - 0.5).abs() < 1e-6);
        assert!(!Activation::Relu.is_bounded());
    }
}
