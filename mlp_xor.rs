use std::env;
use std::error::Error;

use multilayer_perceptron::config::{build_network, load_config, parse_config};
use multilayer_perceptron::{Matrix, Network, SimpleRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

// Small MLP learning XOR with one-hot targets.
const EPOCHS: usize = 5_000;
const REPORT_EVERY: usize = 500;

// 2 -> 4 tanh -> 2 sigmoid, used when no configuration file is given.
const DEFAULT_CONFIG: &str = r#"{
    "input_size": 2,
    "hidden": [ { "size": 4, "activation": "tanh", "drop_probability": 0.0 } ],
    "output": { "size": 2, "activation": "sigmoid", "cost": "mse" },
    "learning_rate": 0.5,
    "seed": 42
}"#;

// XOR inputs and one-hot targets: column 0 is "false", column 1 is "true".
fn xor_dataset() -> Result<(Matrix, Matrix), Box<dyn Error>> {
    let inputs = Matrix::from_rows(&[
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ])?;
    let targets = Matrix::from_rows(&[
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
    ])?;
    Ok((inputs, targets))
}

fn train(
    network: &mut Network,
    inputs: &Matrix,
    targets: &Matrix,
    learning_rate: f64,
    rng: &mut SimpleRng,
) -> Result<(), Box<dyn Error>> {
    for epoch in 1..=EPOCHS {
        let report = network.train_step(inputs, targets, learning_rate, rng)?;
        if epoch % REPORT_EVERY == 0 {
            info!(
                epoch,
                loss = report.loss,
                accuracy = report.accuracy,
                "training"
            );
        }
    }
    Ok(())
}

fn test(network: &mut Network, inputs: &Matrix, rng: &mut SimpleRng) -> Result<(), Box<dyn Error>> {
    let predictions = network.predict(inputs, rng)?;
    println!("\nTesting the trained network:");
    for (row, class) in predictions.argmax_rows().into_iter().enumerate() {
        let (Some(x), Some(p)) = (inputs.row(row), predictions.row(row)) else {
            continue;
        };
        println!(
            "Input: {:.0}, {:.0} | Scores: [{:.4}, {:.4}] | Predicted: {}",
            x[0], x[1], p[0], p[1], class
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match env::args().nth(1) {
        Some(path) => load_config(&path)?,
        None => parse_config(DEFAULT_CONFIG)?,
    };
    if config.input_size != 2 || config.output.size != 2 {
        return Err("XOR demo needs input_size 2 and output size 2".into());
    }

    let mut rng = SimpleRng::new(config.seed());
    let mut network = build_network(&config)?;
    network.initialize(&mut rng)?;
    info!(
        layers = network.len(),
        parameters = network.parameter_count(),
        learning_rate = config.learning_rate(),
        "network ready"
    );

    let (inputs, targets) = xor_dataset()?;
    train(&mut network, &inputs, &targets, config.learning_rate(), &mut rng)?;
    test(&mut network, &inputs, &mut rng)?;
    Ok(())
}
