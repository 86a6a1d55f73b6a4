//! Operations for the computation graph.
//!
//! Uses a simple enum instead of trait objects for clarity.

use burn::tensor::{Tensor, backend::Backend};

use crate::errors::GraphError;

use super::activation::Activation;
use super::shape::Shape;

/// A computation operation in the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Vector-matrix or matrix-matrix product.
    MatMul,
    /// Element-wise addition; a scalar operand is broadcast.
    Add,
    /// Element-wise subtraction; a scalar operand is broadcast.
    Sub,
    /// Element-wise square.
    Square,
    /// Element-wise absolute value.
    Abs,
    /// Mean over every element, producing a scalar.
    Mean,
    /// Concatenation along `axis`. `dim` is the matching axis of the backing tensor.
    Concat { axis: usize, dim: usize },
    /// Range `start..end` of a vector.
    Slice { start: usize, end: usize },
    /// Element-wise activation.
    Activation(Activation),
}

impl Op {
    /// Returns the operation name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Op::MatMul => "matmul",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Square => "square",
            Op::Abs => "abs",
            Op::Mean => "mean",
            Op::Concat { .. } => "concat",
            Op::Slice { .. } => "slice",
            Op::Activation(_) => "activation",
        }
    }

    fn arity(&self) -> Option<usize> {
        match self {
            Op::MatMul | Op::Add | Op::Sub => Some(2),
            Op::Concat { .. } => None,
            _ => Some(1),
        }
    }

    /// Infers the output shape from the input shapes.
    pub fn output_shape(&self, inputs: &[&Shape]) -> Result<Shape, GraphError> {
        if let Some(expected) = self.arity() {
            if inputs.len() != expected {
                return Err(GraphError::Arity {
                    op: self.name(),
                    expected,
                    actual: inputs.len(),
                });
            }
        }

        match self {
            Op::MatMul => matmul_shape(inputs[0], inputs[1]),
            Op::Add | Op::Sub => elementwise_shape(self.name(), inputs[0], inputs[1]),
            Op::Square | Op::Abs | Op::Activation(_) => Ok(inputs[0].clone()),
            Op::Mean => Ok(Shape::scalar()),
            Op::Concat { axis, .. } => concat_shape(*axis, inputs),
            Op::Slice { start, end } => slice_shape(*start, *end, inputs[0]),
        }
    }

    /// Applies the operation to backing tensors.
    ///
    /// Inputs must already satisfy [`Op::output_shape`].
    pub fn apply<B: Backend>(&self, inputs: Vec<Tensor<B, 2>>) -> Tensor<B, 2> {
        match self {
            Op::Concat { dim, .. } => Tensor::cat(inputs, *dim),
            Op::MatMul => {
                let (lhs, rhs) = binary(inputs);
                lhs.matmul(rhs)
            }
            Op::Add => {
                let (lhs, rhs) = binary(inputs);
                lhs.add(rhs)
            }
            Op::Sub => {
                let (lhs, rhs) = binary(inputs);
                lhs.sub(rhs)
            }
            Op::Square => {
                let input = unary(inputs);
                input.clone().mul(input)
            }
            Op::Abs => unary(inputs).abs(),
            Op::Mean => unary(inputs).mean().reshape([1, 1]),
            Op::Slice { start, end } => unary(inputs).slice([0..1, *start..*end]),
            Op::Activation(activation) => activation.apply(unary(inputs)),
        }
    }
}

fn unary<B: Backend>(mut inputs: Vec<Tensor<B, 2>>) -> Tensor<B, 2> {
    inputs.swap_remove(0)
}

fn binary<B: Backend>(mut inputs: Vec<Tensor<B, 2>>) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let rhs = inputs.swap_remove(1);
    let lhs = inputs.swap_remove(0);
    (lhs, rhs)
}

fn matmul_shape(lhs: &Shape, rhs: &Shape) -> Result<Shape, GraphError> {
    let mismatch = || GraphError::ShapeMismatch {
        op: "matmul",
        left: lhs.clone(),
        right: rhs.clone(),
    };
    match (lhs.dims(), rhs.dims()) {
        ([n], [rows, cols]) if n == rows => Ok(Shape::vector(*cols)),
        ([r, n], [rows, cols]) if n == rows => Ok(Shape::matrix(*r, *cols)),
        _ => Err(mismatch()),
    }
}

fn elementwise_shape(op: &'static str, lhs: &Shape, rhs: &Shape) -> Result<Shape, GraphError> {
    if lhs == rhs || rhs.is_scalar() {
        Ok(lhs.clone())
    } else if lhs.is_scalar() {
        Ok(rhs.clone())
    } else {
        Err(GraphError::ShapeMismatch {
            op,
            left: lhs.clone(),
            right: rhs.clone(),
        })
    }
}

fn concat_shape(axis: usize, inputs: &[&Shape]) -> Result<Shape, GraphError> {
    let Some(first) = inputs.first() else {
        return Err(GraphError::Arity {
            op: "concat",
            expected: 1,
            actual: 0,
        });
    };
    if axis >= first.rank() {
        return Err(GraphError::InvalidOperand {
            op: "concat",
            shape: (*first).clone(),
            expected: "an axis within the operand rank",
        });
    }

    let mut dims = first.dims().to_vec();
    for shape in &inputs[1..] {
        let compatible = shape.rank() == first.rank()
            && shape
                .dims()
                .iter()
                .zip(first.dims())
                .enumerate()
                .all(|(i, (a, b))| i == axis || a == b);
        if !compatible {
            return Err(GraphError::ShapeMismatch {
                op: "concat",
                left: (*first).clone(),
                right: (*shape).clone(),
            });
        }
        dims[axis] += shape.dims()[axis];
    }
    Ok(Shape::new(dims))
}

fn slice_shape(start: usize, end: usize, input: &Shape) -> Result<Shape, GraphError> {
    let [len] = input.dims() else {
        return Err(GraphError::InvalidOperand {
            op: "slice",
            shape: input.clone(),
            expected: "a vector",
        });
    };
    if start >= end || end > *len {
        return Err(GraphError::SliceOutOfBounds {
            start,
            end,
            len: *len,
        });
    }
    Ok(Shape::vector(end - start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_matmul_shapes() {
        let v = Shape::vector(3);
        let m = Shape::matrix(3, 4);
        assert_eq!(Op::MatMul.output_shape(&[&v, &m]).unwrap(), Shape::vector(4));

        let a = Shape::matrix(2, 3);
        assert_eq!(
            Op::MatMul.output_shape(&[&a, &m]).unwrap(),
            Shape::matrix(2, 4)
        );
    }

    #[test]
    fn test_matmul_mismatch() {
        let v = Shape::vector(4);
        let m = Shape::matrix(3, 4);
        let err = Op::MatMul.output_shape(&[&v, &m]).unwrap_err();
        assert!(matches!(err, GraphError::ShapeMismatch { op: "matmul", .. }));
    }

    #[test]
    fn test_elementwise_broadcasts_scalars() {
        let v = Shape::vector(4);
        let s = Shape::scalar();
        assert_eq!(Op::Add.output_shape(&[&v, &s]).unwrap(), v);
        assert_eq!(Op::Sub.output_shape(&[&s, &v]).unwrap(), v);
        assert!(Op::Add.output_shape(&[&v, &Shape::vector(3)]).is_err());
    }

    #[test]
    fn test_concat_shapes() {
        let a = Shape::vector(4);
        let b = Shape::vector(3);
        let op = Op::Concat { axis: 0, dim: 1 };
        assert_eq!(op.output_shape(&[&a, &b]).unwrap(), Shape::vector(7));
        assert!(op.output_shape(&[]).is_err());
        assert!(
            op.output_shape(&[&a, &Shape::matrix(1, 4)]).is_err(),
            "rank mismatch must be rejected"
        );
    }

    #[test]
    fn test_slice_bounds() {
        let v = Shape::vector(8);
        let op = Op::Slice { start: 4, end: 8 };
        assert_eq!(op.output_shape(&[&v]).unwrap(), Shape::vector(4));

        let out_of_bounds = Op::Slice { start: 4, end: 9 };
        assert!(matches!(
            out_of_bounds.output_shape(&[&v]),
            Err(GraphError::SliceOutOfBounds { len: 8, .. })
        ));

        let empty = Op::Slice { start: 2, end: 2 };
        assert!(empty.output_shape(&[&v]).is_err());
    }

    #[test]
    fn test_arity_is_checked() {
        let v = Shape::vector(2);
        assert!(matches!(
            Op::Add.output_shape(&[&v]),
            Err(GraphError::Arity {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_apply_concat_and_slice() {
        let device = <TestBackend as Backend>::Device::default();
        let a = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0]], &device);
        let b = Tensor::<TestBackend, 2>::from_floats([[3.0, 4.0, 5.0]], &device);

        let joined = Op::Concat { axis: 0, dim: 1 }.apply(vec![a, b]);
        assert_eq!(joined.dims(), [1, 5]);

        let tail = Op::Slice { start: 2, end: 5 }.apply(vec![joined]);
        let values: Vec<f32> = tail.to_data().to_vec().unwrap();
        assert_eq!(values, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_apply_matmul_and_mean() {
        let device = <TestBackend as Backend>::Device::default();
        let x = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0]], &device);
        let w = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0], [0.0, 3.0]], &device);

        let product = Op::MatMul.apply(vec![x, w]);
        let values: Vec<f32> = product.clone().to_data().to_vec().unwrap();
        assert_eq!(values, vec![1.0, 6.0]);

        let mean = Op::Mean.apply(vec![Op::Square.apply(vec![product])]);
        assert_eq!(mean.dims(), [1, 1]);
        let value: Vec<f32> = mean.to_data().to_vec().unwrap();
        assert!((value[0] - 18.5).abs() < 1e-5);
    }
}
