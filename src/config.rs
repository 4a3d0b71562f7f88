//! Network configuration
//!
//! Describes a chain as JSON so experiments do not need code changes. Building
//! a network from a configuration wires the chain but does not initialize it;
//! the caller still owns the random generator and calls `initialize`.
//!
//! # Example
//!
//! ```json
//! {
//!   "input_size": 2,
//!   "hidden": [
//!     { "size": 4, "activation": "tanh", "drop_probability": 0.0 }
//!   ],
//!   "output": { "size": 1, "activation": "sigmoid", "cost": "mse" },
//!   "learning_rate": 0.5,
//!   "seed": 42
//! }
//! ```

use serde::Deserialize;
use std::fs;
use tracing::warn;

use crate::error::{NetworkError, Result};
use crate::network::Network;
use crate::utils::activations::activation_from_name;
use crate::utils::costs::cost_from_name;

pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
pub const DEFAULT_SEED: u64 = 42;

/// One interior dense layer.
#[derive(Debug, Clone, Deserialize)]
pub struct HiddenLayerConfig {
    pub size: usize,
    pub activation: String,
    #[serde(default)]
    pub drop_probability: f64,
}

/// The terminal layer and its cost function.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputLayerConfig {
    pub size: usize,
    pub activation: String,
    pub cost: String,
}

/// Complete chain description plus the two knobs the demo loop needs.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub input_size: usize,
    #[serde(default)]
    pub hidden: Vec<HiddenLayerConfig>,
    pub output: OutputLayerConfig,
    pub learning_rate: Option<f64>,
    pub seed: Option<u64>,
}

impl NetworkConfig {
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate.unwrap_or(DEFAULT_LEARNING_RATE)
    }

    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }
}

/// Loads a network configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use multilayer_perceptron::config::load_config;
///
/// let cfg = load_config("config/xor.json").unwrap();
/// assert_eq!(cfg.input_size, 2);
/// ```
pub fn load_config(path: &str) -> Result<NetworkConfig> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses and validates a configuration from JSON text.
pub fn parse_config(contents: &str) -> Result<NetworkConfig> {
    let config: NetworkConfig = serde_json::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &NetworkConfig) -> Result<()> {
    if config.input_size == 0 {
        return Err(NetworkError::InvalidConfig(
            "input_size must be positive".to_string(),
        ));
    }

    for (index, layer) in config.hidden.iter().enumerate() {
        if layer.size == 0 {
            return Err(NetworkError::InvalidConfig(format!(
                "hidden layer {} size must be positive",
                index
            )));
        }
        if !(0.0..1.0).contains(&layer.drop_probability) {
            return Err(NetworkError::InvalidConfig(format!(
                "hidden layer {} drop_probability must be in [0, 1), got {}",
                index, layer.drop_probability
            )));
        }
        activation_from_name(&layer.activation)?;
    }

    if config.output.size == 0 {
        return Err(NetworkError::InvalidConfig(
            "output size must be positive".to_string(),
        ));
    }
    activation_from_name(&config.output.activation)?;
    cost_from_name(&config.output.cost)?;

    match config.learning_rate {
        Some(rate) if !(rate.is_finite() && rate > 0.0) => {
            return Err(NetworkError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                rate
            )));
        }
        Some(_) => {}
        None => warn!(default = DEFAULT_LEARNING_RATE, "learning_rate not set, using default"),
    }

    if config.seed.is_none() {
        warn!(default = DEFAULT_SEED, "seed not set, using default");
    }

    Ok(())
}

/// Wire an (uninitialized) network from a validated configuration.
pub fn build_network(config: &NetworkConfig) -> Result<Network> {
    let mut network = Network::new(config.input_size)?;
    for layer in &config.hidden {
        network = network.add_dense(
            layer.size,
            activation_from_name(&layer.activation)?,
            layer.drop_probability,
        )?;
    }
    network.with_output(
        config.output.size,
        activation_from_name(&config.output.activation)?,
        cost_from_name(&config.output.cost)?,
    )
}
