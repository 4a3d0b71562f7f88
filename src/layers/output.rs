//! Output layer: the terminal dense layer of the chain
//!
//! Same affine transform and activation as [`DenseLayer`], but its error signal
//! comes from a cost function against the target instead of from a successor.

use tracing::trace;

use crate::error::{NetworkError, Result};
use crate::layers::{DenseLayer, Layer, Links};
use crate::utils::activations::Activation;
use crate::utils::costs::Cost;
use crate::utils::matrix::Matrix;
use crate::utils::rng::SimpleRng;

/// Dense layer without dropout plus a cost function.
#[derive(Debug)]
pub struct OutputLayer {
    dense: DenseLayer,
    cost: Box<dyn Cost>,
}

impl OutputLayer {
    /// Output layer of width `size`; dropout is always off.
    pub fn new(size: usize, activation: Box<dyn Activation>, cost: Box<dyn Cost>) -> Result<Self> {
        Ok(Self {
            dense: DenseLayer::new(size, activation, 0.0)?,
            cost,
        })
    }

    pub fn initialize_weights(&mut self, prev_size: usize, rng: &mut SimpleRng) -> Result<()> {
        self.dense.initialize_weights(prev_size, rng)
    }

    pub fn initialize_bias(&mut self, rng: &mut SimpleRng) -> Result<()> {
        self.dense.initialize_bias(rng)
    }

    pub fn forward(&mut self, prev_output: &Matrix, rng: &mut SimpleRng) -> Result<&Matrix> {
        self.dense.forward(prev_output, rng)
    }

    /// `gradient = cost'(output, target) ⊙ activation'(pre_activation)`
    pub fn backward(&mut self, target: &Matrix) -> Result<()> {
        let output = self.prediction()?;
        let upstream = self.cost.derivative(output, target)?;
        if upstream.shape() != output.shape() {
            return Err(NetworkError::shape("cost derivative", output.shape(), upstream.shape()));
        }
        trace!(cost = self.cost.name(), "output backward");
        self.dense.apply_local_derivative(upstream)
    }

    pub fn update_weights(&mut self, prev_output: &Matrix, learning_rate: f64) -> Result<()> {
        self.dense.update_weights(prev_output, learning_rate)
    }

    /// Cost of the last prediction against `target`.
    pub fn calculate_loss(&self, target: &Matrix) -> Result<f64> {
        self.cost.loss(self.prediction()?, target)
    }

    /// Fraction of rows whose predicted argmax equals the target argmax.
    pub fn calculate_accuracy(&self, target: &Matrix) -> Result<f64> {
        let predicted = self.prediction()?;
        if predicted.shape() != target.shape() {
            return Err(NetworkError::shape("accuracy", predicted.shape(), target.shape()));
        }
        if predicted.rows() == 0 {
            return Err(NetworkError::shape("accuracy", (1, predicted.cols()), predicted.shape()));
        }

        let hits = predicted
            .argmax_rows()
            .into_iter()
            .zip(target.argmax_rows())
            .filter(|(p, t)| p == t)
            .count();
        Ok(hits as f64 / target.rows() as f64)
    }

    pub fn cost(&self) -> &dyn Cost {
        self.cost.as_ref()
    }

    pub fn dense(&self) -> &DenseLayer {
        &self.dense
    }

    /// The underlying dense layer, for setting parameters by hand.
    pub fn dense_mut(&mut self) -> &mut DenseLayer {
        &mut self.dense
    }

    pub fn weights(&self) -> Option<&Matrix> {
        self.dense.weights()
    }

    pub fn gradient(&self) -> Option<&Matrix> {
        self.dense.gradient()
    }

    fn prediction(&self) -> Result<&Matrix> {
        self.dense.output().ok_or_else(|| {
            NetworkError::OrderingViolation(format!(
                "output layer {} has no prediction; run forward first",
                self.dense.links().index
            ))
        })
    }
}

impl Layer for OutputLayer {
    fn size(&self) -> usize {
        self.dense.size()
    }

    fn output(&self) -> Option<&Matrix> {
        self.dense.output()
    }

    fn parameter_count(&self) -> usize {
        self.dense.parameter_count()
    }

    fn links(&self) -> Links {
        self.dense.links()
    }

    fn set_links(&mut self, links: Links) {
        self.dense.set_links(links);
    }
}
