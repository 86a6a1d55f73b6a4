//! Loss functions for training.

use serde::{Deserialize, Serialize};

use crate::errors::GraphError;
use crate::graph::{ExprGraph, Node};

/// Supported loss functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Loss {
    /// Mean Squared Error: `mean((y - pred)^2)`.
    #[default]
    Mse,
    /// Mean Absolute Error: `mean(|y - pred|)`.
    Mae,
}

impl Loss {
    /// Adds the loss between `targets` and `predictions` to `graph`.
    ///
    /// Returns the scalar cost node.
    pub fn build(
        &self,
        graph: &mut ExprGraph,
        targets: Node,
        predictions: Node,
    ) -> Result<Node, GraphError> {
        let diff = graph.sub(targets, predictions)?;
        let error = match self {
            Loss::Mse => graph.square(diff)?,
            Loss::Mae => graph.abs(diff)?,
        };
        graph.mean(error)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Loss::Mse => "mse",
            Loss::Mae => "mae",
        }
    }
}
