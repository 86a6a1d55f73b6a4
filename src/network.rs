//! Memory network: a small feed-forward net with a memory feedback slice.
//!
//! The topology is four linear layers. The first hidden layer is
//! concatenated with a memory vector; the third layer's output is split
//! into a new memory slice and a residual that feeds the output layer.

use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, MachineError};
use crate::graph::{Activation, ExprGraph, Init, Node, Shape};
use crate::machine::{BurnMachine, TapeMachine};
use crate::solver::{Solver, SolverKind};
use crate::training::Loss;

/// Configuration for a memory network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Width of the input vector.
    pub input_size: usize,
    /// Width of the first hidden layer.
    pub hidden_size: usize,
    /// Width of the memory vector.
    pub memory_size: usize,
    /// Width of the second and third hidden layers.
    pub recurrent_size: usize,
    /// Width of the prediction.
    pub output_size: usize,
    /// Initializer for every parameter and the memory vector.
    pub init: Init,
    pub output_activation: Activation,
    pub loss: Loss,
    pub solver: SolverKind,
    pub learning_rate: f64,
    /// Seeds the backend RNG before parameters are drawn.
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_size: 3,
            hidden_size: 4,
            memory_size: 4,
            recurrent_size: 8,
            output_size: 1,
            init: Init::default(),
            output_activation: Activation::Tanh,
            loss: Loss::Mse,
            solver: SolverKind::Sgd,
            learning_rate: 0.1,
            seed: None,
        }
    }
}

impl NetworkConfig {
    /// Creates a new NetworkConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_size(mut self, size: usize) -> Self {
        self.input_size = size;
        self
    }

    pub fn hidden_size(mut self, size: usize) -> Self {
        self.hidden_size = size;
        self
    }

    pub fn memory_size(mut self, size: usize) -> Self {
        self.memory_size = size;
        self
    }

    pub fn recurrent_size(mut self, size: usize) -> Self {
        self.recurrent_size = size;
        self
    }

    pub fn output_size(mut self, size: usize) -> Self {
        self.output_size = size;
        self
    }

    pub fn init(mut self, init: Init) -> Self {
        self.init = init;
        self
    }

    pub fn output_activation(mut self, activation: Activation) -> Self {
        self.output_activation = activation;
        self
    }

    pub fn loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    pub fn solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    pub fn learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks that the sizes describe a buildable topology.
    pub fn validate(&self) -> Result<(), GraphError> {
        let sizes = [
            ("input_size", self.input_size),
            ("hidden_size", self.hidden_size),
            ("memory_size", self.memory_size),
            ("recurrent_size", self.recurrent_size),
            ("output_size", self.output_size),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, size)| *size == 0) {
            return Err(GraphError::InvalidConfig {
                message: format!("{name} must be positive"),
            });
        }
        if self.recurrent_size <= self.memory_size {
            return Err(GraphError::InvalidConfig {
                message: format!(
                    "recurrent_size ({}) must exceed memory_size ({})",
                    self.recurrent_size, self.memory_size
                ),
            });
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(GraphError::InvalidConfig {
                message: format!("learning_rate must be positive, got {}", self.learning_rate),
            });
        }
        Ok(())
    }

    /// Builds the expression graph for this configuration.
    pub fn graph(&self) -> Result<NetworkGraph, GraphError> {
        NetworkGraph::new(self)
    }

    /// Builds the graph, a machine over it and the solver.
    pub fn build<B: AutodiffBackend>(&self, device: &B::Device) -> Result<Network<B>, GraphError> {
        let graph = self.graph()?;
        if let Some(seed) = self.seed {
            B::seed(seed);
        }
        let machine = BurnMachine::new(&graph.graph, device);
        let solver = self.solver.build::<B>(self.learning_rate);
        log::debug!(
            "Built network with {} nodes, {} solver at learning rate {}",
            graph.graph.len(),
            self.solver.name(),
            self.learning_rate
        );
        Ok(Network {
            config: self.clone(),
            nodes: graph,
            machine,
            solver,
        })
    }
}

/// Weight and bias of one linear layer.
#[derive(Debug, Clone, Copy)]
pub struct Layer {
    pub weight: Node,
    pub bias: Node,
}

/// Expression graph of a memory network and handles to its named nodes.
#[derive(Debug, Clone)]
pub struct NetworkGraph {
    graph: ExprGraph,
    x: Node,
    y: Node,
    layers: [Layer; 4],
    memory_state: Node,
    memory: Node,
    pred: Node,
    cost: Node,
}

impl NetworkGraph {
    fn new(config: &NetworkConfig) -> Result<Self, GraphError> {
        config.validate()?;
        let mut graph = ExprGraph::new();
        let init = config.init;
        let concat_size = config.hidden_size + config.memory_size;
        let residual_size = config.recurrent_size - config.memory_size;

        let sizes = [
            (config.input_size, config.hidden_size),
            (concat_size, config.recurrent_size),
            (config.recurrent_size, config.recurrent_size),
            (residual_size, config.output_size),
        ];
        let mut layers = Vec::with_capacity(sizes.len());
        for (i, (rows, cols)) in sizes.into_iter().enumerate() {
            layers.push(Layer {
                weight: graph.parameter(&format!("weight{i}"), Shape::matrix(rows, cols), init)?,
                bias: graph.parameter(&format!("bias{i}"), Shape::vector(cols), init)?,
            });
        }
        let layers: [Layer; 4] = [layers[0], layers[1], layers[2], layers[3]];

        let memory_state = graph.state("memory", Shape::vector(config.memory_size), init)?;
        let x = graph.input("x", Shape::vector(config.input_size))?;
        let y = graph.input("y", Shape::vector(config.output_size))?;

        // Input -> hidden 1
        let h1 = linear(&mut graph, x, layers[0])?;

        // Hidden 1 + memory -> hidden 2
        let hm1 = graph.concat(0, &[h1, memory_state])?;
        log::info!(
            "{}, {} = {}",
            graph.shape(h1)?,
            graph.shape(memory_state)?,
            graph.shape(hm1)?
        );
        let h2 = linear(&mut graph, hm1, layers[1])?;

        // Hidden 2 -> hidden 3, split into memory and residual
        let h3 = linear(&mut graph, h2, layers[2])?;
        let memory = graph.slice(h3, 0..config.memory_size)?;
        let residual = graph.slice(h3, config.memory_size..config.recurrent_size)?;

        let output = linear(&mut graph, residual, layers[3])?;
        if !config.output_activation.is_bounded() {
            log::warn!(
                "Output activation {} is unbounded; labels lie in [-1, 1]",
                config.output_activation.name()
            );
        }
        let pred = graph.activate(output, config.output_activation)?;

        let cost = config.loss.build(&mut graph, y, pred)?;

        let mut network = Self {
            graph,
            x,
            y,
            layers,
            memory_state,
            memory,
            pred,
            cost,
        };
        let learnables = network.learnables();
        network.graph.grad(cost, &learnables)?;
        Ok(network)
    }

    pub fn graph(&self) -> &ExprGraph {
        &self.graph
    }

    pub fn x(&self) -> Node {
        self.x
    }

    pub fn y(&self) -> Node {
        self.y
    }

    pub fn layers(&self) -> &[Layer; 4] {
        &self.layers
    }

    /// Returns the memory vector fed into the second layer.
    pub fn memory_state(&self) -> Node {
        self.memory_state
    }

    /// Returns the new memory slice computed by the third layer.
    pub fn memory(&self) -> Node {
        self.memory
    }

    pub fn pred(&self) -> Node {
        self.pred
    }

    pub fn cost(&self) -> Node {
        self.cost
    }

    /// Returns the weights and biases, in layer order.
    pub fn learnables(&self) -> Vec<Node> {
        self.layers
            .iter()
            .flat_map(|layer| [layer.weight, layer.bias])
            .collect()
    }
}

/// `input × weight + bias`, logging the shapes involved.
fn linear(graph: &mut ExprGraph, input: Node, layer: Layer) -> Result<Node, GraphError> {
    let product = graph.matmul(input, layer.weight)?;
    let output = graph.add(product, layer.bias)?;
    log::info!(
        "{} × {} + {} = {}",
        graph.shape(input)?,
        graph.shape(layer.weight)?,
        graph.shape(layer.bias)?,
        graph.shape(output)?
    );
    Ok(output)
}

/// A built memory network: graph handles, the machine and the solver.
pub struct Network<B: AutodiffBackend> {
    config: NetworkConfig,
    nodes: NetworkGraph,
    machine: BurnMachine<B>,
    solver: Box<dyn Solver<B>>,
}

impl<B: AutodiffBackend> Network<B> {
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Returns the graph and its node handles.
    pub fn nodes(&self) -> &NetworkGraph {
        &self.nodes
    }

    pub fn machine(&self) -> &BurnMachine<B> {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut BurnMachine<B> {
        &mut self.machine
    }

    pub fn x(&self) -> Node {
        self.nodes.x
    }

    pub fn y(&self) -> Node {
        self.nodes.y
    }

    pub fn memory_state(&self) -> Node {
        self.nodes.memory_state
    }

    pub fn memory(&self) -> Node {
        self.nodes.memory
    }

    pub fn pred(&self) -> Node {
        self.nodes.pred
    }

    pub fn cost(&self) -> Node {
        self.nodes.cost
    }

    pub fn learnables(&self) -> Vec<Node> {
        self.nodes.learnables()
    }

    /// Applies one solver step with the gradients of the last run.
    pub fn step(&mut self) -> Result<(), MachineError> {
        self.machine.apply_gradients(self.solver.as_mut())
    }

    /// Copies the new memory slice onto the memory vector.
    pub fn carry_memory(&mut self) -> Result<(), MachineError> {
        self.machine
            .bind_pair(self.nodes.memory_state, self.nodes.memory)
    }

    /// Releases the machine.
    pub fn close(&mut self) -> Result<(), MachineError> {
        self.machine.close()
    }
}
