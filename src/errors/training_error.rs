//! Errors raised by the training driver.

use thiserror::Error;

use super::MachineError;

/// Errors that can occur while training or evaluating a network.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Failed at iteration {iteration}: {source}")]
    Iteration {
        iteration: usize,
        #[source]
        source: MachineError,
    },

    #[error("Evaluation failed: {0}")]
    Evaluation(#[source] MachineError),

    #[error("No training samples")]
    EmptyDataset,

    #[error("Sample has {actual} inputs, network expects {expected}")]
    InputSizeMismatch { expected: usize, actual: usize },

    #[error("Invalid input range [{low}, {high})")]
    InvalidRange { low: f32, high: f32 },
}
