//! Layer trait definition for the layer chain
//!
//! This module defines the capabilities every layer in a [`crate::network::Network`]
//! shares. The passes themselves have different inputs per layer kind
//! (raw batch, predecessor output, successor gradient, target), so they live on
//! the concrete types; the trait covers what the chain needs for traversal.

use crate::utils::matrix::Matrix;

/// Position of a layer in its chain and the indices of its neighbors.
///
/// The neighbor fields are non-owning: they index into the network's layer
/// sequence and are only used for topology traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Links {
    pub index: usize,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

/// Core trait for layers in the chain.
///
/// # Example
///
/// ```
/// use multilayer_perceptron::layers::{InputLayer, Layer};
/// use multilayer_perceptron::utils::Matrix;
///
/// let mut input = InputLayer::new(3).unwrap();
/// assert!(input.output().is_none());
///
/// input.forward(&Matrix::zeros(5, 3)).unwrap();
/// assert_eq!(input.output().unwrap().shape(), (5, 3));
/// assert_eq!(input.parameter_count(), 0);
/// ```
pub trait Layer {
    /// Output width (number of features per sample).
    fn size(&self) -> usize;

    /// Result of the most recent forward pass, if any.
    fn output(&self) -> Option<&Matrix>;

    /// Number of trainable values (weights plus biases); zero until initialized.
    fn parameter_count(&self) -> usize;

    fn links(&self) -> Links;

    fn set_links(&mut self, links: Links);
}
