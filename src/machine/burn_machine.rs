//! Tape machine executing an expression graph on a Burn autodiff backend.

use std::collections::HashMap;

use burn::optim::GradientsParams;
use burn::tensor::{Tensor, backend::AutodiffBackend};
use serde::Serialize;

use crate::errors::MachineError;
use crate::graph::{ExprGraph, Node, NodeData, NodeKind, Shape};
use crate::solver::{Learnables, Solver};

use super::TapeMachine;
use super::tape::{Instruction, Program};
use super::value::Value;

/// Where a parameter's tensor lives.
#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Index into the learnables handed to the solver.
    Learnable(usize),
    /// Held by the machine, no gradient.
    State,
}

/// Snapshot entry for one parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterExport {
    pub name: String,
    pub learnable: bool,
    pub value: Value,
}

/// Executes a compiled [`Program`] with Burn tensors.
///
/// Bindings and parameters persist across runs; computed values and
/// gradients only live until the next [`TapeMachine::reset`].
pub struct BurnMachine<B: AutodiffBackend> {
    graph: ExprGraph,
    program: Program,
    device: B::Device,
    learnables: Option<Learnables<B>>,
    slots: HashMap<Node, Slot>,
    states: HashMap<Node, Tensor<B, 2>>,
    bindings: HashMap<Node, Value>,
    registry: Vec<Option<Tensor<B, 2>>>,
    ip: usize,
    gradients: Option<GradientsParams>,
    closed: bool,
}

impl<B: AutodiffBackend> BurnMachine<B> {
    /// Compiles `graph` and initializes its parameters on `device`.
    ///
    /// Parameters listed in the graph's gradient request become learnables;
    /// every other parameter is held as state.
    pub fn new(graph: &ExprGraph, device: &B::Device) -> Self {
        let program = Program::compile(graph);
        let wrt: Vec<Node> = match graph.grad_request() {
            Some(request) => request.wrt().to_vec(),
            None => graph.learnables(),
        };

        let mut slots = HashMap::new();
        let mut states = HashMap::new();
        let mut learnable_tensors = Vec::with_capacity(wrt.len());

        for (node, data) in graph.nodes() {
            let NodeKind::Parameter { init, .. } = data.kind() else {
                continue;
            };
            let tensor = init.tensor::<B>(data.shape(), device);
            if wrt.contains(&node) {
                slots.insert(node, Slot::Learnable(learnable_tensors.len()));
                learnable_tensors.push(tensor);
            } else {
                slots.insert(node, Slot::State);
                states.insert(node, tensor);
            }
        }

        log::debug!(
            "Compiled {} instructions with {} learnables",
            program.len(),
            learnable_tensors.len()
        );
        log::trace!("Program:\n{program}");

        Self {
            graph: graph.clone(),
            registry: vec![None; program.len()],
            program,
            device: device.clone(),
            learnables: Some(Learnables::new(learnable_tensors)),
            slots,
            states,
            bindings: HashMap::new(),
            ip: 0,
            gradients: None,
            closed: false,
        }
    }

    /// Returns the graph this machine executes.
    pub fn graph(&self) -> &ExprGraph {
        &self.graph
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Returns the number of instructions executed since the last reset.
    pub fn instruction_pointer(&self) -> usize {
        self.ip
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns true if the last run left gradients for the solver.
    pub fn has_gradients(&self) -> bool {
        self.gradients.is_some()
    }

    fn ensure_open(&self) -> Result<(), MachineError> {
        if self.closed {
            return Err(MachineError::Closed);
        }
        Ok(())
    }

    fn check_member(&self, node: Node) -> Result<&NodeData, MachineError> {
        self.graph
            .node(node)
            .map_err(|_| MachineError::ForeignNode { node })
    }

    fn parameter_tensor(&self, node: Node) -> Result<Tensor<B, 2>, MachineError> {
        let missing = || MachineError::NoValue {
            name: self.graph.display_name(node),
        };
        match self.slots.get(&node) {
            Some(Slot::Learnable(slot)) => self
                .learnables
                .as_ref()
                .and_then(|learnables| learnables.tensor(*slot))
                .ok_or_else(missing),
            Some(Slot::State) => self.states.get(&node).cloned().ok_or_else(missing),
            None => Err(missing()),
        }
    }

    fn input_tensor(&self, node: Node, expected: &Shape) -> Result<Tensor<B, 2>, MachineError> {
        let name = self.graph.display_name(node);
        let value = self
            .bindings
            .get(&node)
            .ok_or_else(|| MachineError::Unbound { name: name.clone() })?;
        if value.shape() != expected {
            return Err(MachineError::ShapeMismatch {
                name,
                expected: expected.clone(),
                actual: value.shape().clone(),
            });
        }
        Ok(value.to_tensor(&self.device))
    }

    /// Returns the current tensor of `node`: computed, bound or stored.
    fn current_tensor(&self, node: Node, data: &NodeData) -> Result<Tensor<B, 2>, MachineError> {
        if let Some(tensor) = &self.registry[node.index()] {
            return Ok(tensor.clone());
        }
        match data.kind() {
            NodeKind::Input => self.input_tensor(node, data.shape()),
            NodeKind::Parameter { .. } => self.parameter_tensor(node),
            NodeKind::Operation { .. } => Err(MachineError::NoValue {
                name: self.graph.display_name(node),
            }),
        }
    }

    /// Reads the value of `node` as of the last run.
    ///
    /// Operations need a completed run; inputs and parameters can be read
    /// at any time.
    pub fn read(&self, node: Node) -> Result<Value, MachineError> {
        self.ensure_open()?;
        let data = self.check_member(node)?;
        let tensor = self.current_tensor(node, data)?;
        Value::from_tensor(data.shape().clone(), tensor)
    }

    /// Hands the pending gradients and the learnables to `solver`.
    ///
    /// Gradients are consumed: a second call without a new run fails with
    /// [`MachineError::NoGradients`].
    pub fn apply_gradients(&mut self, solver: &mut dyn Solver<B>) -> Result<(), MachineError> {
        self.ensure_open()?;
        let grads = self.gradients.take().ok_or(MachineError::NoGradients)?;
        let learnables = self.learnables.take().ok_or(MachineError::Closed)?;
        self.learnables = Some(solver.step(learnables, grads));
        Ok(())
    }

    /// Snapshots every parameter in graph order.
    pub fn parameters(&self) -> Result<Vec<ParameterExport>, MachineError> {
        self.ensure_open()?;
        self.graph
            .nodes()
            .filter(|(_, data)| data.is_parameter())
            .map(|(node, data)| {
                let tensor = self.parameter_tensor(node)?;
                Ok(ParameterExport {
                    name: self.graph.display_name(node),
                    learnable: matches!(self.slots.get(&node), Some(Slot::Learnable(_))),
                    value: Value::from_tensor(data.shape().clone(), tensor)?,
                })
            })
            .collect()
    }

    /// Exports the parameter snapshot as pretty-printed JSON.
    pub fn export_parameters(&self) -> Result<String, MachineError> {
        let parameters = self.parameters()?;
        Ok(serde_json::to_string_pretty(&parameters)?)
    }

    fn set_parameter(&mut self, node: Node, tensor: Tensor<B, 2>) {
        match self.slots.get(&node) {
            Some(Slot::Learnable(slot)) => {
                if let Some(learnables) = self.learnables.as_mut() {
                    learnables.replace(*slot, tensor);
                }
            }
            Some(Slot::State) | None => {
                self.states.insert(node, tensor);
            }
        }
    }

    fn backward(&mut self) -> Result<(), MachineError> {
        let Some(request) = self.graph.grad_request() else {
            return Ok(());
        };
        let cost = self.registry[request.cost().index()]
            .clone()
            .ok_or_else(|| MachineError::NoValue {
                name: self.graph.display_name(request.cost()),
            })?;
        let learnables = self.learnables.as_ref().ok_or(MachineError::Closed)?;
        let grads = cost.backward();
        self.gradients = Some(GradientsParams::from_grads(grads, learnables));
        Ok(())
    }
}

impl<B: AutodiffBackend> TapeMachine for BurnMachine<B> {
    fn reset(&mut self) {
        self.registry.iter_mut().for_each(|value| *value = None);
        self.ip = 0;
        self.gradients = None;
    }

    fn close(&mut self) -> Result<(), MachineError> {
        if self.closed {
            return Ok(());
        }
        self.reset();
        self.bindings.clear();
        self.states.clear();
        self.learnables = None;
        self.closed = true;
        log::debug!("Closed machine for graph {}", self.graph.id());
        Ok(())
    }

    fn bind(&mut self, node: Node, value: Value) -> Result<(), MachineError> {
        self.ensure_open()?;
        let data = self.check_member(node)?;
        let (is_input, is_parameter) = (data.is_input(), data.is_parameter());
        let expected = data.shape().clone();
        let name = self.graph.display_name(node);

        if is_input {
            log::trace!("Let {name} = {:?}", value.data());
            self.bindings.insert(node, value);
        } else if is_parameter {
            if value.shape() != &expected {
                return Err(MachineError::ShapeMismatch {
                    name,
                    expected,
                    actual: value.shape().clone(),
                });
            }
            log::trace!("Set parameter {name}");
            let tensor = value.to_tensor(&self.device);
            self.set_parameter(node, tensor);
        } else {
            return Err(MachineError::NotBindable { name });
        }
        Ok(())
    }

    fn bind_pair(&mut self, a: Node, b: Node) -> Result<(), MachineError> {
        self.ensure_open()?;
        self.check_member(a)?;
        let source = self.check_member(b)?;
        let value = Value::from_tensor(source.shape().clone(), self.current_tensor(b, source)?)?;
        log::debug!(
            "Set {} to the value of {}",
            self.graph.display_name(a),
            self.graph.display_name(b)
        );
        self.bind(a, value)
    }

    fn run_all(&mut self) -> Result<(), MachineError> {
        self.ensure_open()?;
        if self.ip != 0 {
            return Err(MachineError::TapeExhausted);
        }

        for instruction in self.program.instructions() {
            let node = instruction.node();
            let tensor = match instruction {
                Instruction::LoadInput { node } => {
                    let shape = self.graph.shape(*node).map_err(|_| MachineError::ForeignNode {
                        node: *node,
                    })?;
                    self.input_tensor(*node, shape)?
                }
                Instruction::LoadParameter { node } => self.parameter_tensor(*node)?,
                Instruction::Execute { op, inputs, .. } => {
                    let operands = inputs
                        .iter()
                        .map(|input| {
                            self.registry[input.index()]
                                .clone()
                                .ok_or_else(|| MachineError::NoValue {
                                    name: self.graph.display_name(*input),
                                })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    op.apply(operands)
                }
            };
            self.registry[node.index()] = Some(tensor);
            self.ip += 1;
        }

        self.backward()?;
        log::debug!("Ran {} instructions", self.ip);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Init;
    use crate::solver::vanilla;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::backend::Backend;

    type TestBackend = Autodiff<NdArray>;

    struct Fixture {
        graph: ExprGraph,
        x: Node,
        y: Node,
        w: Node,
        pred: Node,
        cost: Node,
    }

    /// pred = x × w, cost = mean((y - pred)^2), w = [[1], [2]]
    fn fixture() -> Fixture {
        let mut graph = ExprGraph::new();
        let x = graph.input("x", Shape::vector(2)).unwrap();
        let y = graph.input("y", Shape::vector(1)).unwrap();
        let w = graph
            .parameter("w", Shape::matrix(2, 1), Init::Constant(1.0))
            .unwrap();
        let pred = graph.matmul(x, w).unwrap();
        let diff = graph.sub(y, pred).unwrap();
        let square = graph.square(diff).unwrap();
        let cost = graph.mean(square).unwrap();
        graph.grad(cost, &[w]).unwrap();
        Fixture {
            graph,
            x,
            y,
            w,
            pred,
            cost,
        }
    }

    fn machine(fixture: &Fixture) -> BurnMachine<TestBackend> {
        let device = <TestBackend as Backend>::Device::default();
        let mut machine = BurnMachine::new(&fixture.graph, &device);
        machine
            .bind(
                fixture.w,
                Value::new(Shape::matrix(2, 1), vec![1.0, 2.0]).unwrap(),
            )
            .unwrap();
        machine
    }

    fn scalar(machine: &BurnMachine<TestBackend>, node: Node) -> f32 {
        machine.read(node).unwrap().as_scalar().unwrap()
    }

    #[test]
    fn test_run_computes_forward_pass() {
        let f = fixture();
        let mut vm = machine(&f);

        vm.bind(f.x, Value::vector(vec![1.0, 1.0])).unwrap();
        vm.bind(f.y, Value::vector(vec![2.0])).unwrap();
        vm.run_all().unwrap();

        assert_eq!(vm.instruction_pointer(), vm.program().len());
        assert!((scalar(&vm, f.pred) - 3.0).abs() < 1e-6);
        assert!((scalar(&vm, f.cost) - 1.0).abs() < 1e-6);
        assert!(vm.has_gradients());
    }

    #[test]
    fn test_reset_does_not_leak_previous_run() {
        let f = fixture();
        let mut vm = machine(&f);
        vm.bind(f.y, Value::vector(vec![0.0])).unwrap();

        vm.bind(f.x, Value::vector(vec![1.0, 1.0])).unwrap();
        vm.run_all().unwrap();
        assert!((scalar(&vm, f.pred) - 3.0).abs() < 1e-6);

        vm.reset();
        assert_eq!(vm.instruction_pointer(), 0);
        assert!(!vm.has_gradients());
        assert!(matches!(vm.read(f.pred), Err(MachineError::NoValue { .. })));

        vm.bind(f.x, Value::vector(vec![2.0, -1.0])).unwrap();
        vm.run_all().unwrap();
        assert!((scalar(&vm, f.pred) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_run_without_reset_fails() {
        let f = fixture();
        let mut vm = machine(&f);
        vm.bind(f.x, Value::vector(vec![1.0, 1.0])).unwrap();
        vm.bind(f.y, Value::vector(vec![0.0])).unwrap();

        vm.run_all().unwrap();
        assert!(matches!(vm.run_all(), Err(MachineError::TapeExhausted)));
    }

    #[test]
    fn test_unbound_input_fails_the_run() {
        let f = fixture();
        let mut vm = machine(&f);
        vm.bind(f.x, Value::vector(vec![1.0, 1.0])).unwrap();

        let err = vm.run_all().unwrap_err();
        assert_eq!(err.to_string(), "Input 'y' has no bound value");
    }

    #[test]
    fn test_wrong_shape_fails_the_run() {
        let f = fixture();
        let mut vm = machine(&f);
        vm.bind(f.x, Value::vector(vec![1.0, 1.0, 1.0])).unwrap();
        vm.bind(f.y, Value::vector(vec![0.0])).unwrap();

        let err = vm.run_all().unwrap_err();
        assert!(matches!(err, MachineError::ShapeMismatch { .. }));
        assert_eq!(
            err.to_string(),
            "Shape mismatch for 'x': expected (2), got (3)"
        );
    }

    #[test]
    fn test_wrong_shape_parameter_binding_fails() {
        let f = fixture();
        let mut vm = machine(&f);
        let result = vm.bind(f.w, Value::vector(vec![1.0, 2.0]));
        assert!(matches!(result, Err(MachineError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_foreign_nodes_are_rejected() {
        let f = fixture();
        let mut vm = machine(&f);

        let mut other = ExprGraph::new();
        let z = other.input("z", Shape::vector(2)).unwrap();

        assert!(matches!(
            vm.bind(z, Value::vector(vec![0.0, 0.0])),
            Err(MachineError::ForeignNode { .. })
        ));
        assert!(matches!(
            vm.bind_pair(f.x, z),
            Err(MachineError::ForeignNode { .. })
        ));
        assert!(matches!(
            vm.bind_pair(z, f.x),
            Err(MachineError::ForeignNode { .. })
        ));
    }

    #[test]
    fn test_operations_are_not_bindable() {
        let f = fixture();
        let mut vm = machine(&f);
        let result = vm.bind(f.pred, Value::vector(vec![1.0]));
        assert!(matches!(result, Err(MachineError::NotBindable { .. })));
    }

    #[test]
    fn test_bind_pair_copies_value() {
        let f = fixture();
        let mut vm = machine(&f);
        vm.bind(f.x, Value::vector(vec![3.0, 4.0])).unwrap();
        vm.bind(f.y, Value::vector(vec![0.0])).unwrap();
        vm.run_all().unwrap();

        // y takes the prediction computed by the last run
        vm.bind_pair(f.y, f.pred).unwrap();
        assert_eq!(vm.read(f.y).unwrap().data(), &[11.0]);

        vm.reset();
        vm.run_all().unwrap();
        assert!(scalar(&vm, f.cost).abs() < 1e-6);
    }

    #[test]
    fn test_solver_step_reduces_cost() {
        let f = fixture();
        let mut vm = machine(&f);
        let mut solver = vanilla::<TestBackend>(0.05);
        vm.bind(f.x, Value::vector(vec![1.0, 1.0])).unwrap();
        vm.bind(f.y, Value::vector(vec![1.0])).unwrap();

        vm.run_all().unwrap();
        let before = scalar(&vm, f.cost);
        vm.apply_gradients(&mut solver).unwrap();
        assert!(matches!(
            vm.apply_gradients(&mut solver),
            Err(MachineError::NoGradients)
        ));

        vm.reset();
        vm.run_all().unwrap();
        let after = scalar(&vm, f.cost);
        assert!(after < before, "cost should drop: {before} -> {after}");
    }

    #[test]
    fn test_close_releases_machine() {
        let f = fixture();
        let mut vm = machine(&f);
        vm.close().unwrap();
        vm.close().unwrap();

        assert!(vm.is_closed());
        assert!(matches!(vm.run_all(), Err(MachineError::Closed)));
        assert!(matches!(
            vm.bind(f.x, Value::vector(vec![1.0, 1.0])),
            Err(MachineError::Closed)
        ));
        assert!(matches!(vm.read(f.w), Err(MachineError::Closed)));
    }

    #[test]
    fn test_export_parameters() {
        let f = fixture();
        let vm = machine(&f);

        let parameters = vm.parameters().unwrap();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].name, "w");
        assert!(parameters[0].learnable);
        assert_eq!(parameters[0].value.data(), &[1.0, 2.0]);

        let json = vm.export_parameters().unwrap();
        assert!(json.contains("\"name\": \"w\""));
    }
}
