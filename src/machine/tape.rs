//! Compilation of an expression graph into a linear instruction tape.

use std::fmt;

use crate::graph::{ExprGraph, Node, NodeKind, Op};

/// One step of the tape.
#[derive(Debug, Clone)]
pub enum Instruction {
    /// Materialize the value bound to an input.
    LoadInput { node: Node },
    /// Materialize the current value of a parameter.
    LoadParameter { node: Node },
    /// Compute an operation from earlier results.
    Execute { node: Node, op: Op, inputs: Vec<Node> },
}

impl Instruction {
    /// Returns the node whose value this instruction produces.
    pub fn node(&self) -> Node {
        match self {
            Self::LoadInput { node } => *node,
            Self::LoadParameter { node } => *node,
            Self::Execute { node, .. } => *node,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadInput { node } => write!(f, "{node} = load"),
            Self::LoadParameter { node } => write!(f, "{node} = param"),
            Self::Execute { node, op, inputs } => {
                write!(f, "{node} = {}(", op.name())?;
                for (i, input) in inputs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{input}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Instructions in execution order.
#[derive(Debug, Clone)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Compiles every node of `graph`.
    ///
    /// Arena order is topological, so instructions follow node order.
    pub fn compile(graph: &ExprGraph) -> Self {
        let instructions = graph
            .nodes()
            .map(|(node, data)| match data.kind() {
                NodeKind::Input => Instruction::LoadInput { node },
                NodeKind::Parameter { .. } => Instruction::LoadParameter { node },
                NodeKind::Operation { op, inputs } => Instruction::Execute {
                    node,
                    op: op.clone(),
                    inputs: inputs.clone(),
                },
            })
            .collect();
        Self { instructions }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ip, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{ip:>4}: {instruction}")?;
        }
        Ok(())
    }
}
