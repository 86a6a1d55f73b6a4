//! Expression graph API.
//!
//! An [`ExprGraph`] owns every node; callers hold [`Node`] handles and
//! compose them with the builder methods. Shapes are checked as nodes are
//! added, so a graph that builds is well-formed.
//!
//! # Example
//!
//! ```
//! use memnet::graph::{Activation, ExprGraph, Init, Shape};
//!
//! let mut graph = ExprGraph::new();
//! let x = graph.input("x", Shape::vector(4)).unwrap();
//! let w = graph.parameter("w", Shape::matrix(4, 1), Init::default()).unwrap();
//! let b = graph.parameter("b", Shape::vector(1), Init::Zeros).unwrap();
//!
//! let h = graph.matmul(x, w).unwrap();
//! let h = graph.add(h, b).unwrap();
//! let pred = graph.activate(h, Activation::Sigmoid).unwrap();
//!
//! assert_eq!(graph.shape(pred).unwrap(), &Shape::vector(1));
//! ```

mod activation;
mod core;
mod init;
mod node;
mod operation;
mod shape;

pub use activation::Activation;
pub use self::core::{ExprGraph, GradRequest};
pub use init::Init;
pub use node::{GraphId, Node, NodeData, NodeKind};
pub use operation::Op;
pub use shape::Shape;
