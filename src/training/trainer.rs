//! Training loop implementation.

use burn::tensor::backend::AutodiffBackend;
use serde::Serialize;

use super::TrainingConfig;
use super::data::{Sample, clipped_sum, generate};
use crate::errors::{MachineError, TrainingError};
use crate::machine::{TapeMachine, Value};
use crate::network::Network;

/// Loss recorded for every training iteration.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub loss_history: Vec<f32>,
}

impl TrainingReport {
    pub fn iterations(&self) -> usize {
        self.loss_history.len()
    }

    /// Mean loss over the first `n` iterations.
    pub fn head_loss(&self, n: usize) -> f32 {
        mean(&self.loss_history[..n.min(self.loss_history.len())])
    }

    /// Mean loss over the last `n` iterations.
    pub fn tail_loss(&self, n: usize) -> f32 {
        mean(&self.loss_history[self.loss_history.len().saturating_sub(n)..])
    }
}

/// Result of running the network on one held-out input.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    /// Clipped sum of the inputs.
    pub expected: f32,
    pub predicted: Vec<f32>,
    pub loss: f32,
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return f32::NAN;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Trains on freshly generated samples, one solver step per sample.
pub fn train<B: AutodiffBackend>(
    network: &mut Network<B>,
    config: &TrainingConfig,
) -> Result<TrainingReport, TrainingError> {
    let samples = generate(
        config.iterations,
        network.config().input_size,
        config.input_range,
        config.seed,
    )?;
    train_on(network, &samples, config)
}

/// Trains on `samples` in order, one solver step per sample.
pub fn train_on<B: AutodiffBackend>(
    network: &mut Network<B>,
    samples: &[Sample],
    config: &TrainingConfig,
) -> Result<TrainingReport, TrainingError> {
    if samples.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    for sample in samples {
        check_width(network, &sample.inputs)?;
    }

    let total = samples.len();
    let mut loss_history = Vec::with_capacity(total);

    for (iteration, sample) in samples.iter().enumerate() {
        let loss = train_step(network, sample, config.carry_memory)
            .map_err(|source| TrainingError::Iteration { iteration, source })?;
        loss_history.push(loss);

        let done = iteration + 1;
        if config.verbose && config.log_every > 0 && (done % config.log_every == 0 || done == total)
        {
            let window = &loss_history[loss_history.len().saturating_sub(config.log_every)..];
            log::info!("Iteration {}/{}: loss = {:.6}", done, total, mean(window));
        }
    }

    Ok(TrainingReport { loss_history })
}

/// Binds the sample, runs forward and backward, then steps the solver.
fn train_step<B: AutodiffBackend>(
    network: &mut Network<B>,
    sample: &Sample,
    carry_memory: bool,
) -> Result<f32, MachineError> {
    bind_sample(network, &sample.inputs, sample.label)?;
    let machine = network.machine_mut();
    machine.reset();
    machine.run_all()?;

    let loss = read_loss(network)?;
    if carry_memory {
        network.carry_memory()?;
    }
    network.step()?;
    Ok(loss)
}

/// Runs the network once on `inputs`, labelled with their clipped sum.
///
/// Parameters are left untouched.
pub fn evaluate<B: AutodiffBackend>(
    network: &mut Network<B>,
    inputs: &[f32],
) -> Result<Evaluation, TrainingError> {
    check_width(network, inputs)?;
    let expected = clipped_sum(inputs);

    let run = |network: &mut Network<B>| -> Result<Evaluation, MachineError> {
        bind_sample(network, inputs, expected)?;
        let pred = network.pred();
        let machine = network.machine_mut();
        machine.reset();
        machine.run_all()?;
        let predicted = machine.read(pred)?.into_data();
        let loss = read_loss(network)?;
        // evaluation leaves no gradients behind
        network.machine_mut().reset();
        Ok(Evaluation {
            expected,
            predicted,
            loss,
        })
    };
    let evaluation = run(network).map_err(TrainingError::Evaluation)?;
    log::debug!(
        "Evaluated {:?}: expected {}, predicted {:?}",
        inputs,
        evaluation.expected,
        evaluation.predicted
    );
    Ok(evaluation)
}

fn check_width<B: AutodiffBackend>(
    network: &Network<B>,
    inputs: &[f32],
) -> Result<(), TrainingError> {
    let expected = network.config().input_size;
    if inputs.len() != expected {
        return Err(TrainingError::InputSizeMismatch {
            expected,
            actual: inputs.len(),
        });
    }
    Ok(())
}

/// Binds `inputs` to x and `label` to every element of y.
fn bind_sample<B: AutodiffBackend>(
    network: &mut Network<B>,
    inputs: &[f32],
    label: f32,
) -> Result<(), MachineError> {
    let (x, y) = (network.x(), network.y());
    let targets = vec![label; network.config().output_size];
    let machine = network.machine_mut();
    machine.bind(x, Value::vector(inputs.to_vec()))?;
    machine.bind(y, Value::vector(targets))
}

fn read_loss<B: AutodiffBackend>(network: &Network<B>) -> Result<f32, MachineError> {
    let cost = network.cost();
    network
        .machine()
        .read(cost)?
        .as_scalar()
        .ok_or_else(|| MachineError::NoValue {
            name: network.machine().graph().display_name(cost),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkConfig;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::backend::Backend;

    type TestBackend = Autodiff<NdArray>;

    fn network(seed: u64) -> Network<TestBackend> {
        let device = <TestBackend as Backend>::Device::default();
        NetworkConfig::new()
            .seed(seed)
            .build(&device)
            .expect("Network build should succeed")
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut net = network(3);
        let config = TrainingConfig::new().iterations(600).seed(3).verbose(false);

        let report = train(&mut net, &config).unwrap();
        assert_eq!(report.iterations(), 600);

        let initial_loss = report.head_loss(100);
        let final_loss = report.tail_loss(100);
        assert!(
            final_loss < initial_loss,
            "Loss should decrease: initial={}, final={}",
            initial_loss,
            final_loss
        );
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let mut net = network(1);
        let result = train_on(&mut net, &[], &TrainingConfig::new());
        assert!(matches!(result, Err(TrainingError::EmptyDataset)));
    }

    #[test]
    fn test_wrong_width_is_rejected_before_training() {
        let mut net = network(1);
        let samples = vec![Sample::new(vec![0.1, 0.2, 0.3]), Sample::new(vec![0.1])];
        let result = train_on(&mut net, &samples, &TrainingConfig::new().verbose(false));
        assert!(matches!(
            result,
            Err(TrainingError::InputSizeMismatch {
                expected: 3,
                actual: 1
            })
        ));

        assert!(matches!(
            evaluate(&mut net, &[0.5, 0.5]),
            Err(TrainingError::InputSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_failures_carry_the_iteration() {
        let mut net = network(1);
        net.close().unwrap();

        let samples = vec![Sample::new(vec![0.1, 0.2, 0.3])];
        let err = train_on(&mut net, &samples, &TrainingConfig::new()).unwrap_err();
        assert!(matches!(
            err,
            TrainingError::Iteration {
                iteration: 0,
                source: MachineError::Closed
            }
        ));
        assert_eq!(err.to_string(), "Failed at iteration 0: Machine is closed");
    }

    #[test]
    fn test_evaluate_does_not_change_parameters() {
        let mut net = network(2);
        let before = net.machine().export_parameters().unwrap();

        let evaluation = evaluate(&mut net, &[0.5, -0.6, 0.2]).unwrap();
        assert!((evaluation.expected - 0.1).abs() < 1e-6);
        assert_eq!(evaluation.predicted.len(), 1);
        assert!(evaluation.loss >= 0.0);

        assert_eq!(net.machine().export_parameters().unwrap(), before);
    }

    #[test]
    fn test_evaluate_leaves_no_pending_gradients() {
        let mut net = network(4);
        evaluate(&mut net, &[0.5, -0.6, 0.2]).unwrap();

        assert!(!net.machine().has_gradients());
        assert!(matches!(net.step(), Err(MachineError::NoGradients)));
    }

    #[test]
    fn test_report_windows() {
        let report = TrainingReport {
            loss_history: vec![4.0, 2.0, 1.0, 1.0],
        };
        assert_eq!(report.head_loss(2), 3.0);
        assert_eq!(report.tail_loss(2), 1.0);
        assert_eq!(report.head_loss(10), 2.0);
    }
}
