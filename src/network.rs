//! Network chain
//!
//! An ordered sequence of layers: exactly one [`InputLayer`] at the head,
//! any number of [`DenseLayer`]s, and exactly one [`OutputLayer`] at the tail.
//! Layers refer to their neighbors by index into the sequence.
//!
//! A training step is `forward` (head→tail), `calculate_loss` /
//! `calculate_accuracy` (tail only), `backward` (tail→head), then
//! `update_weights` on every parametric layer. [`Network::train_step`] runs the
//! whole cycle.
//!
//! # Example
//!
//! ```
//! use multilayer_perceptron::network::Network;
//! use multilayer_perceptron::utils::activations::{Sigmoid, Tanh};
//! use multilayer_perceptron::utils::costs::MeanSquaredError;
//! use multilayer_perceptron::utils::{Matrix, SimpleRng};
//!
//! let mut rng = SimpleRng::new(7);
//! let mut network = Network::new(2)
//!     .unwrap()
//!     .add_dense(4, Box::new(Tanh), 0.0)
//!     .unwrap()
//!     .with_output(1, Box::new(Sigmoid), Box::new(MeanSquaredError))
//!     .unwrap();
//! network.initialize(&mut rng).unwrap();
//!
//! let x = Matrix::from_vec(2, 2, vec![0.0, 1.0, 1.0, 0.0]).unwrap();
//! let y = Matrix::from_vec(2, 1, vec![1.0, 1.0]).unwrap();
//! let report = network.train_step(&x, &y, 0.5, &mut rng).unwrap();
//! assert!(report.loss >= 0.0);
//! ```

use tracing::{debug, trace};

use crate::error::{NetworkError, Result};
use crate::layers::{DenseLayer, InputLayer, Layer, LayerNode, Links, OutputLayer};
use crate::utils::activations::Activation;
use crate::utils::costs::Cost;
use crate::utils::matrix::Matrix;
use crate::utils::rng::SimpleRng;

/// Lifecycle of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    /// Some parametric layer has no weights or bias yet.
    Uninitialized,
    /// Every parametric layer is initialized; training steps may run.
    Ready,
}

/// Loss and accuracy measured on the forward pass of a training step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub loss: f64,
    pub accuracy: f64,
}

/// Linear chain of layers.
///
/// The layer sequence is private: callers reach parameters through
/// [`Network::dense_mut`], which cannot replace or reorder layers, so the chain
/// always starts with its input layer and ends with at most one output layer.
#[derive(Debug)]
pub struct Network {
    layers: Vec<LayerNode>,
}

impl Network {
    /// Start a chain with an input layer of `input_size` features.
    ///
    /// Fails with `InvalidLayer` when `input_size` is zero.
    pub fn new(input_size: usize) -> Result<Self> {
        let mut network = Self {
            layers: vec![LayerNode::Input(InputLayer::new(input_size)?)],
        };
        network.wire();
        Ok(network)
    }

    /// Append an interior dense layer.
    ///
    /// # Arguments
    ///
    /// * `size` - Width of the new layer
    /// * `activation` - Its activation
    /// * `drop_probability` - Dropout rate in [0, 1)
    ///
    /// # Returns
    ///
    /// The extended chain, or `InvalidLayer` once the output layer is in place
    pub fn add_dense(
        mut self,
        size: usize,
        activation: Box<dyn Activation>,
        drop_probability: f64,
    ) -> Result<Self> {
        self.ensure_open()?;
        let layer = DenseLayer::new(size, activation, drop_probability)?;
        self.layers.push(LayerNode::Dense(layer));
        self.wire();
        Ok(self)
    }

    /// Terminate the chain with its output layer.
    pub fn with_output(
        mut self,
        size: usize,
        activation: Box<dyn Activation>,
        cost: Box<dyn Cost>,
    ) -> Result<Self> {
        self.ensure_open()?;
        let layer = OutputLayer::new(size, activation, cost)?;
        self.layers.push(LayerNode::Output(layer));
        self.wire();
        debug!(
            layers = self.layers.len(),
            input = self.input_size(),
            output = size,
            "chain wired"
        );
        Ok(self)
    }

    /// Draw weights and bias for every parametric layer, head to tail.
    pub fn initialize(&mut self, rng: &mut SimpleRng) -> Result<()> {
        self.ensure_complete()?;
        for i in 1..self.layers.len() {
            let prev_size = self.layers[i - 1].size();
            if let Some(layer) = self.layers[i].dense_mut() {
                layer.initialize_weights(prev_size, rng)?;
                layer.initialize_bias(rng)?;
            }
        }
        debug!(
            layers = self.layers.len(),
            parameters = self.parameter_count(),
            "network initialized"
        );
        Ok(())
    }

    /// Forward pass head→tail.
    ///
    /// # Arguments
    ///
    /// * `input` - Batch of samples, `batch_size × input_size`
    /// * `rng` - Source of dropout draws
    ///
    /// # Returns
    ///
    /// The prediction, `batch_size × output size`, borrowed from the output layer
    pub fn forward(&mut self, input: &Matrix, rng: &mut SimpleRng) -> Result<&Matrix> {
        self.ensure_complete()?;
        match &mut self.layers[0] {
            LayerNode::Input(layer) => layer.forward(input)?,
            other => {
                return Err(NetworkError::InvalidLayer(format!(
                    "chain head must be an input layer, found {}",
                    other.kind()
                )))
            }
        }

        for i in 1..self.layers.len() {
            let (head, tail) = self.layers.split_at_mut(i);
            let prev_output = head[i - 1].output().ok_or_else(|| {
                NetworkError::OrderingViolation(format!("layer {} produced no output", i - 1))
            })?;
            let layer = tail[0].dense_mut().ok_or_else(|| {
                NetworkError::InvalidLayer(format!("layer {} is not parametric", i))
            })?;
            layer.forward(prev_output, rng)?;
        }

        trace!(batch = input.rows(), "forward pass complete");
        self.prediction()
    }

    /// Loss of the last prediction against `target`.
    pub fn calculate_loss(&self, target: &Matrix) -> Result<f64> {
        self.output_layer()?.calculate_loss(target)
    }

    /// Argmax accuracy of the last prediction against `target`.
    pub fn calculate_accuracy(&self, target: &Matrix) -> Result<f64> {
        self.output_layer()?.calculate_accuracy(target)
    }

    /// Backward pass tail→head.
    pub fn backward(&mut self, target: &Matrix) -> Result<()> {
        self.ensure_complete()?;
        let last = self.layers.len() - 1;
        self.output_layer_mut()?.backward(target)?;

        for i in (1..last).rev() {
            let (head, tail) = self.layers.split_at_mut(i + 1);
            let next = &tail[0];
            let next_gradient = next.gradient().ok_or_else(|| {
                NetworkError::OrderingViolation(format!("layer {} has no gradient", i + 1))
            })?;
            let next_weights = next
                .weights()
                .ok_or(NetworkError::Uninitialized { layer: i + 1 })?;
            match &mut head[i] {
                LayerNode::Dense(layer) => layer.backward(next_gradient, next_weights)?,
                other => {
                    return Err(NetworkError::InvalidLayer(format!(
                        "interior layer {} must be dense, found {}",
                        i,
                        other.kind()
                    )))
                }
            }
        }

        trace!("backward pass complete");
        Ok(())
    }

    /// Gradient-descent update of every parametric layer.
    pub fn update_weights(&mut self, learning_rate: f64) -> Result<()> {
        self.ensure_complete()?;
        for i in 1..self.layers.len() {
            let (head, tail) = self.layers.split_at_mut(i);
            let prev_output = head[i - 1].output().ok_or_else(|| {
                NetworkError::OrderingViolation(format!("layer {} has no output", i - 1))
            })?;
            if let Some(layer) = tail[0].dense_mut() {
                layer.update_weights(prev_output, learning_rate)?;
            }
        }
        Ok(())
    }

    /// One full cycle: forward, loss/accuracy, backward, update.
    ///
    /// # Returns
    ///
    /// Loss and accuracy of the forward pass that produced the gradients, that
    /// is, measured before the update
    pub fn train_step(
        &mut self,
        input: &Matrix,
        target: &Matrix,
        learning_rate: f64,
        rng: &mut SimpleRng,
    ) -> Result<StepReport> {
        self.forward(input, rng)?;
        let report = StepReport {
            loss: self.calculate_loss(target)?,
            accuracy: self.calculate_accuracy(target)?,
        };
        self.backward(target)?;
        self.update_weights(learning_rate)?;
        trace!(loss = report.loss, accuracy = report.accuracy, "train step");
        Ok(report)
    }

    /// Forward pass with dropout switched off for the duration of the call.
    pub fn predict(&mut self, input: &Matrix, rng: &mut SimpleRng) -> Result<Matrix> {
        let flags: Vec<Option<bool>> = self
            .layers
            .iter()
            .map(|layer| layer.dense().map(DenseLayer::is_training))
            .collect();
        self.set_training(false);

        let result = self.forward(input, rng).map(Matrix::clone);

        for (layer, flag) in self.layers.iter_mut().zip(flags) {
            if let (Some(dense), Some(training)) = (layer.dense_mut(), flag) {
                dense.set_training(training);
            }
        }
        result
    }

    /// Enable or disable dropout on every dense layer.
    pub fn set_training(&mut self, training: bool) {
        for layer in &mut self.layers {
            if let Some(dense) = layer.dense_mut() {
                dense.set_training(training);
            }
        }
    }

    /// Lifecycle state, derived from the layers themselves.
    ///
    /// # Returns
    ///
    /// `Ready` when the chain is terminated by an output layer and every
    /// parametric layer holds weights and bias, whether they came from
    /// [`Network::initialize`] or were set by hand through [`Network::dense_mut`].
    pub fn state(&self) -> NetworkState {
        let ready = self.ensure_complete().is_ok()
            && self
                .layers
                .iter()
                .filter_map(LayerNode::dense)
                .all(DenseLayer::is_initialized);
        if ready {
            NetworkState::Ready
        } else {
            NetworkState::Uninitialized
        }
    }

    /// Number of layers, input and output included.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Every layer, head to tail.
    pub fn layers(&self) -> &[LayerNode] {
        &self.layers
    }

    /// Layer at `index`, or `None` past the tail.
    pub fn layer(&self, index: usize) -> Option<&LayerNode> {
        self.layers.get(index)
    }

    /// Mutable access to the parametric part of the layer at `index`.
    ///
    /// The output layer resolves to its inner dense layer. The input layer and
    /// out-of-range indices give `None`. Layers themselves cannot be replaced,
    /// so the chain structure is fixed once built.
    ///
    /// # Arguments
    ///
    /// * `index` - Position in the chain, 0 being the input layer
    ///
    /// # Example
    ///
    /// ```
    /// use multilayer_perceptron::network::{Network, NetworkState};
    /// use multilayer_perceptron::utils::activations::Identity;
    /// use multilayer_perceptron::utils::costs::MeanSquaredError;
    /// use multilayer_perceptron::Matrix;
    ///
    /// let mut network = Network::new(2)
    ///     .unwrap()
    ///     .with_output(1, Box::new(Identity), Box::new(MeanSquaredError))
    ///     .unwrap();
    /// assert!(network.dense_mut(0).is_none());
    ///
    /// let output = network.dense_mut(1).unwrap();
    /// output.set_weights(Matrix::from_vec(2, 1, vec![1.0, -1.0]).unwrap()).unwrap();
    /// output.set_bias(vec![0.0]).unwrap();
    /// assert_eq!(network.state(), NetworkState::Ready);
    /// ```
    pub fn dense_mut(&mut self, index: usize) -> Option<&mut DenseLayer> {
        self.layers.get_mut(index).and_then(LayerNode::dense_mut)
    }

    /// Width of the input layer.
    pub fn input_size(&self) -> usize {
        self.layers[0].size()
    }

    /// Trainable values across the chain; zero until initialized.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.parameter_count()).sum()
    }

    /// The terminal layer, or `InvalidLayer` if the chain is still open.
    pub fn output_layer(&self) -> Result<&OutputLayer> {
        match self.layers.last() {
            Some(LayerNode::Output(layer)) => Ok(layer),
            _ => Err(NetworkError::InvalidLayer(
                "chain has no output layer".to_string(),
            )),
        }
    }

    fn output_layer_mut(&mut self) -> Result<&mut OutputLayer> {
        match self.layers.last_mut() {
            Some(LayerNode::Output(layer)) => Ok(layer),
            _ => Err(NetworkError::InvalidLayer(
                "chain has no output layer".to_string(),
            )),
        }
    }

    fn prediction(&self) -> Result<&Matrix> {
        self.output_layer()?.output().ok_or_else(|| {
            NetworkError::OrderingViolation("output layer produced no prediction".to_string())
        })
    }

    /// Recompute every layer's index links.
    fn wire(&mut self) {
        let len = self.layers.len();
        for (index, layer) in self.layers.iter_mut().enumerate() {
            layer.set_links(Links {
                index,
                prev: index.checked_sub(1),
                next: (index + 1 < len).then_some(index + 1),
            });
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if let Some(LayerNode::Output(_)) = self.layers.last() {
            return Err(NetworkError::InvalidLayer(
                "cannot append a layer after the output layer".to_string(),
            ));
        }
        Ok(())
    }

    fn ensure_complete(&self) -> Result<()> {
        self.output_layer().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::activations::{Identity, Sigmoid, Tanh};
    use crate::utils::costs::MeanSquaredError;

    fn small_network() -> Network {
        Network::new(3)
            .unwrap()
            .add_dense(4, Box::new(Tanh), 0.0)
            .unwrap()
            .add_dense(5, Box::new(Sigmoid), 0.0)
            .unwrap()
            .with_output(2, Box::new(Identity), Box::new(MeanSquaredError))
            .unwrap()
    }

    #[test]
    fn test_links_form_a_chain() {
        let network = small_network();
        assert_eq!(network.len(), 4);
        for (i, layer) in network.layers().iter().enumerate() {
            let links = layer.links();
            assert_eq!(links.index, i);
            assert_eq!(links.prev, i.checked_sub(1));
            assert_eq!(links.next, if i == 3 { None } else { Some(i + 1) });
        }
    }

    #[test]
    fn test_cannot_extend_past_output() {
        let err = small_network()
            .add_dense(3, Box::new(Tanh), 0.0)
            .unwrap_err();
        assert!(matches!(err, NetworkError::InvalidLayer(_)));
    }

    #[test]
    fn test_incomplete_chain_rejected() {
        let mut rng = SimpleRng::new(1);
        let mut network = Network::new(2)
            .unwrap()
            .add_dense(2, Box::new(Tanh), 0.0)
            .unwrap();
        assert!(network.initialize(&mut rng).is_err());
        assert!(network.forward(&Matrix::zeros(1, 2), &mut rng).is_err());
    }

    #[test]
    fn test_state_machine() {
        let mut rng = SimpleRng::new(1);
        let mut network = small_network();
        assert_eq!(network.state(), NetworkState::Uninitialized);
        assert_eq!(network.parameter_count(), 0);

        network.initialize(&mut rng).unwrap();
        assert_eq!(network.state(), NetworkState::Ready);
        assert_eq!(network.parameter_count(), (3 * 4 + 4) + (4 * 5 + 5) + (5 * 2 + 2));
    }

    #[test]
    fn test_state_follows_hand_set_parameters() {
        let mut network = small_network();
        let sizes = [3, 4, 5, 2];
        for i in 1..sizes.len() {
            assert_eq!(network.state(), NetworkState::Uninitialized);
            let layer = network.dense_mut(i).unwrap();
            layer
                .set_weights(Matrix::zeros(sizes[i - 1], sizes[i]))
                .unwrap();
            layer.set_bias(vec![0.0; sizes[i]]).unwrap();
        }
        assert_eq!(network.state(), NetworkState::Ready);

        let mut rng = SimpleRng::new(1);
        let prediction = network.forward(&Matrix::zeros(2, 3), &mut rng).unwrap();
        assert_eq!(prediction.shape(), (2, 2));
    }

    #[test]
    fn test_open_chain_is_never_ready() {
        let mut network = Network::new(2).unwrap();
        assert!(network.dense_mut(0).is_none());
        assert_eq!(network.state(), NetworkState::Uninitialized);
    }

    #[test]
    fn test_forward_before_initialize() {
        let mut rng = SimpleRng::new(1);
        let mut network = small_network();
        let err = network.forward(&Matrix::zeros(2, 3), &mut rng).unwrap_err();
        assert!(matches!(err, NetworkError::Uninitialized { layer: 1 }));
    }

    #[test]
    fn test_backward_before_forward() {
        let mut rng = SimpleRng::new(1);
        let mut network = small_network();
        network.initialize(&mut rng).unwrap();
        let err = network.backward(&Matrix::zeros(2, 2)).unwrap_err();
        assert!(matches!(err, NetworkError::OrderingViolation(_)));
    }

    #[test]
    fn test_update_before_backward() {
        let mut rng = SimpleRng::new(1);
        let mut network = small_network();
        network.initialize(&mut rng).unwrap();
        network.forward(&Matrix::zeros(2, 3), &mut rng).unwrap();
        let err = network.update_weights(0.1).unwrap_err();
        assert!(matches!(err, NetworkError::OrderingViolation(_)));
    }

    #[test]
    fn test_gradient_shapes_match_outputs() {
        let mut rng = SimpleRng::new(3);
        let mut network = small_network();
        network.initialize(&mut rng).unwrap();
        network.forward(&Matrix::zeros(6, 3), &mut rng).unwrap();
        network.backward(&Matrix::zeros(6, 2)).unwrap();

        for layer in &network.layers()[1..] {
            let gradient = layer.gradient().unwrap();
            assert_eq!(gradient.shape(), layer.output().unwrap().shape());
        }
    }
}
