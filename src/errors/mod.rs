//! Error types.

mod graph_error;
mod machine_error;
mod training_error;

pub use graph_error::GraphError;
pub use machine_error::MachineError;
pub use training_error::TrainingError;

use thiserror::Error;

/// Top-level error returned by the demo binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Machine(#[from] MachineError),

    #[error(transparent)]
    Training(#[from] TrainingError),
}
