//! # memnet
//!
//! A small feed-forward network with a memory feedback slice, trained to
//! add three numbers and clip the result to `[-1, 1]`.
//!
//! The network is described as an expression graph, compiled into a tape
//! and executed by a machine backed by [Burn](https://burn.dev) tensors.
//!
//! ## Features
//!
//! - **Expression graph**: shape-checked arena of nodes with `Copy` handles.
//! - **Tape machine**: `reset`/`bind`/`bind_pair`/`run_all`/`close` over a
//!   compiled graph, with autodiff through Burn's `Autodiff` backend.
//! - **Solvers**: SGD and Adam from `burn::optim`.
//!
//! ## Example
//!
//! ```
//! use memnet::prelude::*;
//! use burn::backend::{Autodiff, NdArray};
//!
//! type Backend = Autodiff<NdArray>;
//!
//! let device = <Backend as burn::tensor::backend::Backend>::Device::default();
//!
//! let mut network: Network<Backend> = NetworkConfig::default()
//!     .seed(42)
//!     .build(&device)
//!     .expect("Failed to build network");
//!
//! let config = TrainingConfig::new().iterations(20).seed(42).verbose(false);
//! let report = train(&mut network, &config).unwrap();
//! assert_eq!(report.loss_history.len(), 20);
//!
//! let evaluation = evaluate(&mut network, &[0.5, -0.6, 0.2]).unwrap();
//! assert_eq!(evaluation.predicted.len(), 1);
//! ```

pub mod errors;
pub mod graph;
pub mod machine;
pub mod network;
pub mod solver;
pub mod training;

pub use errors::Error;
pub use network::{Network, NetworkConfig};

/// Backend used by the binary.
#[cfg(not(feature = "wgpu"))]
pub type DefaultBackend = burn::backend::Autodiff<burn::backend::NdArray>;

/// Backend used by the binary.
#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

pub mod prelude {
    pub use crate::errors::{Error, GraphError, MachineError, TrainingError};
    pub use crate::graph::{Activation, ExprGraph, Init, Node, Shape};
    pub use crate::machine::{BurnMachine, TapeMachine, Value};
    pub use crate::network::{Network, NetworkConfig};
    pub use crate::solver::{Solver, SolverKind};
    pub use crate::training::{
        Evaluation, Loss, TrainingConfig, TrainingReport, evaluate, train,
    };
}
