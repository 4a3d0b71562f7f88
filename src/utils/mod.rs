//! Shared utilities for the layer chain
//!
//! Numeric storage, random number generation, and the activation and cost
//! collaborators the layers are parameterized over.

pub mod activations;
pub mod costs;
pub mod matrix;
pub mod rng;

pub use matrix::Matrix;
pub use rng::SimpleRng;
