//! Layer abstractions for the layer chain
//!
//! This module provides the Layer trait, the three concrete layer kinds, and
//! the tagged variant the network stores them as.

mod r#trait;
pub mod dense;
pub mod input;
pub mod output;

// Re-export the Layer trait for convenience
pub use r#trait::{Layer, Links};
pub use dense::DenseLayer;
pub use input::InputLayer;
pub use output::OutputLayer;

use crate::utils::matrix::Matrix;

/// One entry of a network's layer sequence.
#[derive(Debug)]
pub enum LayerNode {
    Input(InputLayer),
    Dense(DenseLayer),
    Output(OutputLayer),
}

impl LayerNode {
    /// The parametric part of this layer, if it has one.
    pub fn dense(&self) -> Option<&DenseLayer> {
        match self {
            LayerNode::Input(_) => None,
            LayerNode::Dense(layer) => Some(layer),
            LayerNode::Output(layer) => Some(layer.dense()),
        }
    }

    pub fn dense_mut(&mut self) -> Option<&mut DenseLayer> {
        match self {
            LayerNode::Input(_) => None,
            LayerNode::Dense(layer) => Some(layer),
            LayerNode::Output(layer) => Some(layer.dense_mut()),
        }
    }

    pub fn gradient(&self) -> Option<&Matrix> {
        self.dense().and_then(DenseLayer::gradient)
    }

    pub fn weights(&self) -> Option<&Matrix> {
        self.dense().and_then(DenseLayer::weights)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LayerNode::Input(_) => "input",
            LayerNode::Dense(_) => "dense",
            LayerNode::Output(_) => "output",
        }
    }

    fn as_layer(&self) -> &dyn Layer {
        match self {
            LayerNode::Input(layer) => layer,
            LayerNode::Dense(layer) => layer,
            LayerNode::Output(layer) => layer,
        }
    }

    fn as_layer_mut(&mut self) -> &mut dyn Layer {
        match self {
            LayerNode::Input(layer) => layer,
            LayerNode::Dense(layer) => layer,
            LayerNode::Output(layer) => layer,
        }
    }
}

impl Layer for LayerNode {
    fn size(&self) -> usize {
        self.as_layer().size()
    }

    fn output(&self) -> Option<&Matrix> {
        self.as_layer().output()
    }

    fn parameter_count(&self) -> usize {
        self.as_layer().parameter_count()
    }

    fn links(&self) -> Links {
        self.as_layer().links()
    }

    fn set_links(&mut self, links: Links) {
        self.as_layer_mut().set_links(links);
    }
}
