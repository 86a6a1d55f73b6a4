use std::io::Write;
use std::process;

use memnet::training::{TrainingConfig, evaluate, train};
use memnet::{DefaultBackend, Error, NetworkConfig};

/// Held-out input checked after training.
const TEST_INPUT: [f32; 3] = [0.5, -0.6, 0.2];

fn run() -> Result<(), Error> {
    let device = <DefaultBackend as burn::tensor::backend::Backend>::Device::default();

    let mut network = NetworkConfig::default().build::<DefaultBackend>(&device)?;
    let report = train(&mut network, &TrainingConfig::default())?;
    log::debug!(
        "Trained for {} iterations, final loss {:.6}",
        report.iterations(),
        report.tail_loss(1)
    );

    let evaluation = evaluate(&mut network, &TEST_INPUT)?;
    println!("Correct output: {}", TEST_INPUT.iter().sum::<f32>());
    println!("Network output: {:?}", evaluation.predicted);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    if let Err(err) = run() {
        log::error!("{err}");
        process::exit(1);
    }
}
