//! Multilayer Perceptron Library
//!
//! A minimal feedforward network built from a chain of layers: one input
//! layer, any number of dense layers with optional dropout, and one output
//! layer carrying a cost function. Training runs forward, backward and a plain
//! gradient-descent update over mini-batches.
//!
//! # Modules
//!
//! - `layers`: Layer trait and the Input, Dense and Output layers
//! - `network`: The layer chain and the training step
//! - `utils`: Matrix, RNG, activation and cost functions
//! - `config`: JSON network configuration and network building
//! - `error`: Error type shared by every module

pub mod config;
pub mod error;
pub mod layers;
pub mod network;
pub mod utils;

pub use error::{NetworkError, Result};
pub use layers::{DenseLayer, InputLayer, Layer, LayerNode, OutputLayer};
pub use network::{Network, NetworkState, StepReport};
pub use utils::{Matrix, SimpleRng};
