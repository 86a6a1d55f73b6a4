//! Gradient-descent solvers over the learnable parameters of a machine.

use burn::{
    module::{Module, Param},
    optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig},
    tensor::{
        Tensor,
        backend::{AutodiffBackend, Backend},
    },
};
use serde::{Deserialize, Serialize};

/// Learnable parameters of a machine, in the order of its gradient request.
#[derive(Module, Debug)]
pub struct Learnables<B: Backend> {
    params: Vec<Param<Tensor<B, 2>>>,
}

impl<B: Backend> Learnables<B> {
    pub(crate) fn new(tensors: Vec<Tensor<B, 2>>) -> Self {
        Self {
            params: tensors.into_iter().map(Param::from_tensor).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the tracked tensor in `slot`.
    pub fn tensor(&self, slot: usize) -> Option<Tensor<B, 2>> {
        self.params.get(slot).map(|param| param.val())
    }

    pub(crate) fn replace(&mut self, slot: usize, tensor: Tensor<B, 2>) {
        if let Some(param) = self.params.get_mut(slot) {
            *param = Param::from_tensor(tensor);
        }
    }
}

/// Applies one optimization step from a set of gradients.
pub trait Solver<B: AutodiffBackend> {
    /// Returns the parameters after one step against `grads`.
    fn step(&mut self, learnables: Learnables<B>, grads: GradientsParams) -> Learnables<B>;

    fn learning_rate(&self) -> f64;
}

/// Solver backed by a Burn optimizer.
pub struct OptimizerSolver<O> {
    optimizer: O,
    learning_rate: f64,
}

impl<B, O> Solver<B> for OptimizerSolver<O>
where
    B: AutodiffBackend,
    O: Optimizer<Learnables<B>, B>,
{
    fn step(&mut self, learnables: Learnables<B>, grads: GradientsParams) -> Learnables<B> {
        self.optimizer.step(self.learning_rate, learnables, grads)
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

/// Plain stochastic gradient descent: `w -= learning_rate * grad`.
pub fn vanilla<B: AutodiffBackend>(
    learning_rate: f64,
) -> OptimizerSolver<impl Optimizer<Learnables<B>, B>> {
    OptimizerSolver {
        optimizer: SgdConfig::new().init::<B, Learnables<B>>(),
        learning_rate,
    }
}

/// Adam with Burn's default moments.
pub fn adam<B: AutodiffBackend>(
    learning_rate: f64,
) -> OptimizerSolver<impl Optimizer<Learnables<B>, B>> {
    OptimizerSolver {
        optimizer: AdamConfig::new().init::<B, Learnables<B>>(),
        learning_rate,
    }
}

/// Solver selection for a network configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SolverKind {
    #[default]
    Sgd,
    Adam,
}

impl SolverKind {
    pub fn name(&self) -> &'static str {
        match self {
            SolverKind::Sgd => "sgd",
            SolverKind::Adam => "adam",
        }
    }

    pub fn build<B: AutodiffBackend>(self, learning_rate: f64) -> Box<dyn Solver<B>> {
        match self {
            SolverKind::Sgd => Box::new(vanilla::<B>(learning_rate)),
            SolverKind::Adam => Box::new(adam::<B>(learning_rate)),
        }
    }
}
