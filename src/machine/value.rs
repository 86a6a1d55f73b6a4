//! Host-side values bound to and read from a machine.

use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

use crate::errors::MachineError;
use crate::graph::Shape;

/// Dense `f32` buffer with a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    shape: Shape,
    data: Vec<f32>,
}

impl Value {
    /// Creates a value, checking that `data` fills `shape`.
    pub fn new(shape: Shape, data: Vec<f32>) -> Result<Self, MachineError> {
        if shape.size() != data.len() {
            return Err(MachineError::InvalidValue {
                expected: shape.size(),
                actual: data.len(),
                shape,
            });
        }
        Ok(Self { shape, data })
    }

    pub fn scalar(value: f32) -> Self {
        Self {
            shape: Shape::scalar(),
            data: vec![value],
        }
    }

    pub fn vector(data: Vec<f32>) -> Self {
        Self {
            shape: Shape::vector(data.len()),
            data,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Returns the only element of a one-element value.
    pub fn as_scalar(&self) -> Option<f32> {
        match self.data.as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::<B, 1>::from_floats(self.data.as_slice(), device).reshape(self.shape.tensor_dims())
    }

    pub(crate) fn from_tensor<B: Backend>(
        shape: Shape,
        tensor: Tensor<B, 2>,
    ) -> Result<Self, MachineError> {
        let data = tensor
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|err| MachineError::Readback {
                message: format!("{err:?}"),
            })?;
        Self::new(shape, data)
    }
}
