//! Execution of expression graphs.
//!
//! A graph is compiled into a [`Program`]: a flat tape of instructions in
//! execution order. A [`TapeMachine`] runs that tape against bound inputs
//! and stored parameters, and keeps the computed values until it is reset.

mod burn_machine;
mod tape;
mod value;

pub use burn_machine::{BurnMachine, ParameterExport};
pub use tape::{Instruction, Program};
pub use value::Value;

use crate::errors::MachineError;
use crate::graph::Node;

/// Lifecycle of a machine executing one graph.
pub trait TapeMachine {
    /// Clears computed values and gradients so the tape can run again.
    ///
    /// Input bindings and parameter values are kept.
    fn reset(&mut self);

    /// Releases the machine's resources. Every later call except `close`
    /// fails with [`MachineError::Closed`].
    fn close(&mut self) -> Result<(), MachineError>;

    /// Binds `value` to an input, or replaces the value of a parameter.
    fn bind(&mut self, node: Node, value: Value) -> Result<(), MachineError>;

    /// Sets `a` to the current value of `b`.
    fn bind_pair(&mut self, a: Node, b: Node) -> Result<(), MachineError>;

    /// Executes the whole tape, then backpropagates if the graph carries a
    /// gradient request.
    fn run_all(&mut self) -> Result<(), MachineError>;
}
