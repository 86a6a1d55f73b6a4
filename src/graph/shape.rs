//! Static shapes of graph nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shape of a node: rank 0 (scalar), 1 (vector) or 2 (matrix).
///
/// Every value is backed by a rank-2 tensor at run time; see
/// [`Shape::tensor_dims`] for the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Creates a shape from explicit dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    /// The shape of a scalar.
    pub fn scalar() -> Self {
        Self(vec![])
    }

    /// The shape of a vector with `len` elements.
    pub fn vector(len: usize) -> Self {
        Self(vec![len])
    }

    /// The shape of a `rows × cols` matrix.
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self(vec![rows, cols])
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_vector(&self) -> bool {
        self.0.len() == 1
    }

    pub fn is_matrix(&self) -> bool {
        self.0.len() == 2
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    /// Dimensions of the rank-2 tensor backing a value of this shape.
    ///
    /// Scalars are `[1, 1]`, vectors are row vectors `[1, n]`.
    pub fn tensor_dims(&self) -> [usize; 2] {
        match self.0.as_slice() {
            [] => [1, 1],
            [n] => [1, *n],
            [rows, cols] => [*rows, *cols],
            dims => [1, dims.iter().product()],
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, ")")
    }
}
