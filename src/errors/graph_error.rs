//! Errors raised while building an expression graph.

use thiserror::Error;

use crate::graph::{Node, Shape};

/// Errors that can occur while adding nodes to a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Shape mismatch in {op}: {left} and {right}")]
    ShapeMismatch {
        op: &'static str,
        left: Shape,
        right: Shape,
    },

    #[error("{op} expects {expected}, got {shape}")]
    InvalidOperand {
        op: &'static str,
        shape: Shape,
        expected: &'static str,
    },

    #[error("{op} takes {expected} inputs, got {actual}")]
    Arity {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Slice {start}..{end} out of bounds for a vector of length {len}")]
    SliceOutOfBounds { start: usize, end: usize, len: usize },

    #[error("Node {node} does not belong to graph {graph}")]
    ForeignNode { node: Node, graph: usize },

    #[error("Shapes of rank {rank} are not supported")]
    UnsupportedRank { rank: usize },

    #[error("Invalid gradient request: {message}")]
    InvalidGradRequest { message: String },

    #[error("Invalid network configuration: {message}")]
    InvalidConfig { message: String },
}
