//! ExprGraph - arena of nodes forming the computation graph.
//!
//! The graph only records structure and shapes. Tensors are created when a
//! machine is built over it (see [`crate::machine::BurnMachine::new`]).

use std::ops::Range;

use crate::errors::GraphError;

use super::activation::Activation;
use super::init::Init;
use super::node::{GraphId, Node, NodeData, NodeKind, next_graph_id};
use super::operation::Op;
use super::shape::Shape;

/// Cost node and the parameters whose gradients are wanted.
#[derive(Debug, Clone)]
pub struct GradRequest {
    cost: Node,
    wrt: Vec<Node>,
}

impl GradRequest {
    pub fn cost(&self) -> Node {
        self.cost
    }

    pub fn wrt(&self) -> &[Node] {
        &self.wrt
    }
}

/// Directed acyclic graph of tensor operations.
///
/// Nodes are appended in topological order: an operation can only refer
/// to nodes that already exist, so arena order is a valid execution order.
///
/// # Example
///
/// ```
/// use memnet::graph::{ExprGraph, Init, Shape};
///
/// let mut graph = ExprGraph::new();
/// let x = graph.input("x", Shape::vector(3)).unwrap();
/// let w = graph.parameter("w", Shape::matrix(3, 4), Init::default()).unwrap();
/// let h = graph.matmul(x, w).unwrap();
///
/// assert_eq!(graph.shape(h).unwrap(), &Shape::vector(4));
/// ```
#[derive(Debug, Clone)]
pub struct ExprGraph {
    id: GraphId,
    nodes: Vec<NodeData>,
    grad: Option<GradRequest>,
}

impl ExprGraph {
    pub fn new() -> Self {
        Self {
            id: next_graph_id(),
            nodes: Vec::new(),
            grad: None,
        }
    }

    /// Returns the unique ID of this graph.
    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns true if `node` was created by this graph.
    pub fn contains(&self, node: Node) -> bool {
        node.graph() == self.id && node.index() < self.nodes.len()
    }

    /// Returns the record of `node`.
    pub fn node(&self, node: Node) -> Result<&NodeData, GraphError> {
        if !self.contains(node) {
            return Err(GraphError::ForeignNode {
                node,
                graph: self.id,
            });
        }
        Ok(&self.nodes[node.index()])
    }

    pub fn shape(&self, node: Node) -> Result<&Shape, GraphError> {
        self.node(node).map(NodeData::shape)
    }

    /// Returns the node name, or a positional label for anonymous nodes.
    pub fn display_name(&self, node: Node) -> String {
        self.node(node)
            .ok()
            .and_then(NodeData::name)
            .map(String::from)
            .unwrap_or_else(|| node.to_string())
    }

    /// Iterates over nodes in execution order.
    pub fn nodes(&self) -> impl Iterator<Item = (Node, &NodeData)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, data)| (Node::new(self.id, index), data))
    }

    /// Returns all learnable parameters in creation order.
    pub fn learnables(&self) -> Vec<Node> {
        self.nodes()
            .filter(|(_, data)| data.is_learnable())
            .map(|(node, _)| node)
            .collect()
    }

    /// Returns the registered gradient request, if any.
    pub fn grad_request(&self) -> Option<&GradRequest> {
        self.grad.as_ref()
    }

    fn push(&mut self, name: Option<String>, shape: Shape, kind: NodeKind) -> Node {
        let node = Node::new(self.id, self.nodes.len());
        self.nodes.push(NodeData::new(name, shape, kind));
        node
    }

    fn push_leaf(&mut self, name: &str, shape: Shape, kind: NodeKind) -> Result<Node, GraphError> {
        if shape.rank() > 2 {
            return Err(GraphError::UnsupportedRank { rank: shape.rank() });
        }
        Ok(self.push(Some(name.to_string()), shape, kind))
    }

    /// Adds an input placeholder.
    pub fn input(&mut self, name: &str, shape: Shape) -> Result<Node, GraphError> {
        self.push_leaf(name, shape, NodeKind::Input)
    }

    /// Adds a learnable parameter.
    pub fn parameter(&mut self, name: &str, shape: Shape, init: Init) -> Result<Node, GraphError> {
        self.push_leaf(
            name,
            shape,
            NodeKind::Parameter {
                init,
                learnable: true,
            },
        )
    }

    /// Adds a parameter that keeps its value across runs but receives no gradient.
    pub fn state(&mut self, name: &str, shape: Shape, init: Init) -> Result<Node, GraphError> {
        self.push_leaf(
            name,
            shape,
            NodeKind::Parameter {
                init,
                learnable: false,
            },
        )
    }

    /// Adds an operation node after checking its operands.
    pub fn apply(&mut self, op: Op, inputs: &[Node]) -> Result<Node, GraphError> {
        let shapes = inputs
            .iter()
            .map(|&node| self.shape(node))
            .collect::<Result<Vec<_>, _>>()?;
        let shape = op.output_shape(&shapes)?;
        Ok(self.push(
            None,
            shape,
            NodeKind::Operation {
                op,
                inputs: inputs.to_vec(),
            },
        ))
    }

    pub fn matmul(&mut self, a: Node, b: Node) -> Result<Node, GraphError> {
        self.apply(Op::MatMul, &[a, b])
    }

    pub fn add(&mut self, a: Node, b: Node) -> Result<Node, GraphError> {
        self.apply(Op::Add, &[a, b])
    }

    pub fn sub(&mut self, a: Node, b: Node) -> Result<Node, GraphError> {
        self.apply(Op::Sub, &[a, b])
    }

    pub fn square(&mut self, a: Node) -> Result<Node, GraphError> {
        self.apply(Op::Square, &[a])
    }

    pub fn abs(&mut self, a: Node) -> Result<Node, GraphError> {
        self.apply(Op::Abs, &[a])
    }

    pub fn mean(&mut self, a: Node) -> Result<Node, GraphError> {
        self.apply(Op::Mean, &[a])
    }

    /// Concatenates nodes along `axis`. Vectors only have axis 0.
    pub fn concat(&mut self, axis: usize, inputs: &[Node]) -> Result<Node, GraphError> {
        let dim = match inputs.first() {
            Some(&first) if self.shape(first)?.is_vector() => 1,
            _ => axis,
        };
        self.apply(Op::Concat { axis, dim }, inputs)
    }

    /// Takes `range` out of a vector.
    pub fn slice(&mut self, a: Node, range: Range<usize>) -> Result<Node, GraphError> {
        self.apply(
            Op::Slice {
                start: range.start,
                end: range.end,
            },
            &[a],
        )
    }

    pub fn activate(&mut self, a: Node, activation: Activation) -> Result<Node, GraphError> {
        self.apply(Op::Activation(activation), &[a])
    }

    pub fn tanh(&mut self, a: Node) -> Result<Node, GraphError> {
        self.activate(a, Activation::Tanh)
    }

    /// Requests gradients of `cost` with respect to `wrt`.
    ///
    /// `cost` must be a scalar and every node in `wrt` a learnable parameter.
    /// A later call replaces the earlier request.
    pub fn grad(&mut self, cost: Node, wrt: &[Node]) -> Result<(), GraphError> {
        if !self.shape(cost)?.is_scalar() {
            return Err(GraphError::InvalidGradRequest {
                message: format!("cost must be a scalar, got {}", self.shape(cost)?),
            });
        }
        if wrt.is_empty() {
            return Err(GraphError::InvalidGradRequest {
                message: "no parameters to differentiate".to_string(),
            });
        }
        for &node in wrt {
            if !self.node(node)?.is_learnable() {
                return Err(GraphError::InvalidGradRequest {
                    message: format!("'{}' is not a learnable parameter", self.display_name(node)),
                });
            }
        }

        let mut wrt = wrt.to_vec();
        wrt.sort();
        wrt.dedup();
        self.grad = Some(GradRequest { cost, wrt });
        Ok(())
    }
}

impl Default for ExprGraph {
    fn default() -> Self {
        Self::new()
    }
}
