//! Node handles and node records stored in an [`ExprGraph`](super::ExprGraph).

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::init::Init;
use super::operation::Op;
use super::shape::Shape;

/// Global counter for unique graph IDs.
static GRAPH_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique identifier for an ExprGraph.
pub type GraphId = usize;

pub(crate) fn next_graph_id() -> GraphId {
    GRAPH_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Handle to a node owned by an [`ExprGraph`](super::ExprGraph).
///
/// Handles are cheap to copy and only meaningful for the graph that
/// created them; every consumer checks [`Node::graph`] before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node {
    graph: GraphId,
    index: usize,
}

impl Node {
    pub(crate) fn new(graph: GraphId, index: usize) -> Self {
        Self { graph, index }
    }

    /// Returns the ID of the owning graph.
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// Returns the position of the node in its graph's arena.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}:n{}", self.graph, self.index)
    }
}

/// What a node is.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Placeholder bound with a value before each run.
    Input,
    /// Tensor owned by the machine across runs.
    Parameter { init: Init, learnable: bool },
    /// Result of an operation over earlier nodes.
    Operation { op: Op, inputs: Vec<Node> },
}

/// Record stored in the graph arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    name: Option<String>,
    shape: Shape,
    kind: NodeKind,
}

impl NodeData {
    pub(crate) fn new(name: Option<String>, shape: Shape, kind: NodeKind) -> Self {
        Self { name, shape, kind }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_input(&self) -> bool {
        matches!(self.kind, NodeKind::Input)
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind, NodeKind::Parameter { .. })
    }

    pub fn is_learnable(&self) -> bool {
        matches!(self.kind, NodeKind::Parameter { learnable: true, .. })
    }
}
