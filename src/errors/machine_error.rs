//! Errors raised by a tape machine.

use thiserror::Error;

use crate::graph::{Node, Shape};

/// Errors that can occur while binding values to, or running, a tape machine.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("Node {node} is not in this machine's graph")]
    ForeignNode { node: Node },

    #[error("Node '{name}' is an operation and cannot be bound")]
    NotBindable { name: String },

    #[error("Input '{name}' has no bound value")]
    Unbound { name: String },

    #[error("Shape mismatch for '{name}': expected {expected}, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: Shape,
        actual: Shape,
    },

    #[error("Value of shape {shape} needs {expected} elements, got {actual}")]
    InvalidValue {
        shape: Shape,
        expected: usize,
        actual: usize,
    },

    #[error("Node '{name}' has no value; run the machine first")]
    NoValue { name: String },

    #[error("Tape already ran; call reset() before running again")]
    TapeExhausted,

    #[error("No gradients available; run the machine with a gradient request first")]
    NoGradients,

    #[error("Machine is closed")]
    Closed,

    #[error("Failed to read tensor data: {message}")]
    Readback { message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
