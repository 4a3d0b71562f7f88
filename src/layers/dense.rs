//! Dense (fully connected) layer implementation
//!
//! Performs `output = activation(prev_output × weights + bias)` with optional
//! inverted dropout, and the matching backward recurrence and gradient-descent
//! update.

use tracing::trace;

use crate::error::{NetworkError, Result};
use crate::layers::{Layer, Links};
use crate::utils::activations::Activation;
use crate::utils::matrix::Matrix;
use crate::utils::rng::SimpleRng;

/// Half-width of the uniform range used for weight and bias initialization.
pub const INIT_LIMIT: f64 = 0.5;

/// Dense layer with weights, bias, activation and optional dropout.
///
/// Weights have shape `prev_size × size` and bias has length `size`. Both are
/// absent until [`DenseLayer::initialize_weights`] and
/// [`DenseLayer::initialize_bias`] have run.
///
/// Every forward pass overwrites `pre_activation` and `output` and invalidates
/// the previous `gradient`; every backward pass overwrites `gradient`.
///
/// # Example
///
/// ```
/// use multilayer_perceptron::layers::{DenseLayer, Layer};
/// use multilayer_perceptron::utils::activations::Relu;
/// use multilayer_perceptron::utils::{Matrix, SimpleRng};
///
/// let mut rng = SimpleRng::new(42);
/// let mut layer = DenseLayer::new(4, Box::new(Relu), 0.0).unwrap();
/// layer.initialize_weights(3, &mut rng).unwrap();
/// layer.initialize_bias(&mut rng).unwrap();
///
/// let batch = Matrix::zeros(2, 3);
/// let output = layer.forward(&batch, &mut rng).unwrap();
/// assert_eq!(output.shape(), (2, 4));
/// assert_eq!(layer.parameter_count(), 3 * 4 + 4);
/// ```
#[derive(Debug)]
pub struct DenseLayer {
    size: usize,
    activation: Box<dyn Activation>,
    drop_probability: f64,
    training: bool,
    weights: Option<Matrix>,
    bias: Option<Vec<f64>>,
    pre_activation: Option<Matrix>,
    output: Option<Matrix>,
    gradient: Option<Matrix>,
    drop_mask: Option<Matrix>,
    scale: Option<f64>,
    pending_update: bool,
    links: Links,
}

impl DenseLayer {
    /// Create a dense layer of width `size`.
    ///
    /// Weights and bias stay absent until initialized or set by hand.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of output features, must be positive
    /// * `activation` - Elementwise activation applied to the affine output
    /// * `drop_probability` - Dropout rate in [0, 1); zero disables dropout entirely
    ///
    /// # Returns
    ///
    /// The layer, or `InvalidLayer` for a zero size or an out-of-range rate
    pub fn new(size: usize, activation: Box<dyn Activation>, drop_probability: f64) -> Result<Self> {
        if size == 0 {
            return Err(NetworkError::InvalidLayer(
                "dense layer size must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&drop_probability) {
            return Err(NetworkError::InvalidLayer(format!(
                "drop_probability must be in [0, 1), got {}",
                drop_probability
            )));
        }

        Ok(Self {
            size,
            activation,
            drop_probability,
            training: true,
            weights: None,
            bias: None,
            pre_activation: None,
            output: None,
            gradient: None,
            drop_mask: None,
            scale: None,
            pending_update: false,
            links: Links::default(),
        })
    }

    /// Draw weights uniformly from [-0.5, 0.5) with shape `prev_size × size`.
    ///
    /// # Arguments
    ///
    /// * `prev_size` - Width of the predecessor layer
    /// * `rng` - Generator the draws are taken from
    pub fn initialize_weights(&mut self, prev_size: usize, rng: &mut SimpleRng) -> Result<()> {
        if prev_size == 0 {
            return Err(NetworkError::InvalidLayer(
                "predecessor size must be positive".to_string(),
            ));
        }
        self.weights = Some(Matrix::random_uniform(
            prev_size,
            self.size,
            -INIT_LIMIT,
            INIT_LIMIT,
            rng,
        ));
        Ok(())
    }

    /// Draw bias uniformly from [-0.5, 0.5) with length `size`.
    pub fn initialize_bias(&mut self, rng: &mut SimpleRng) -> Result<()> {
        let bias = (0..self.size)
            .map(|_| rng.gen_range_f64(-INIT_LIMIT, INIT_LIMIT))
            .collect();
        self.bias = Some(bias);
        Ok(())
    }

    /// Forward pass from the predecessor's output.
    ///
    /// When dropout is active, one Bernoulli(keep_prob) draw per output element
    /// builds the mask and survivors are scaled by `1 / keep_prob`.
    ///
    /// # Arguments
    ///
    /// * `prev_output` - Predecessor output, `batch_size × prev_size`
    /// * `rng` - Source of the dropout draws; untouched when dropout is inactive
    ///
    /// # Returns
    ///
    /// The new output, `batch_size × size`. Fails with `Uninitialized` before
    /// weights and bias exist and with `ShapeMismatch` on a width mismatch.
    pub fn forward(&mut self, prev_output: &Matrix, rng: &mut SimpleRng) -> Result<&Matrix> {
        let weights = self
            .weights
            .as_ref()
            .ok_or(NetworkError::Uninitialized { layer: self.links.index })?;
        let bias = self
            .bias
            .as_ref()
            .ok_or(NetworkError::Uninitialized { layer: self.links.index })?;

        let pre_activation = prev_output.matmul(weights)?.add_row_vector(bias)?;
        let mut output = self.activation.apply(&pre_activation);
        if output.shape() != pre_activation.shape() {
            return Err(NetworkError::shape(
                "activation",
                pre_activation.shape(),
                output.shape(),
            ));
        }

        if self.dropout_active() {
            let keep_prob = 1.0 - self.drop_probability;
            let scale = if keep_prob > 0.0 { 1.0 / keep_prob } else { 0.0 };
            let mut mask = Matrix::zeros(output.rows(), output.cols());
            for value in mask.as_mut_slice() {
                if rng.bernoulli(keep_prob) {
                    *value = 1.0;
                }
            }
            output = output.hadamard(&mask.scale(scale))?;
            self.drop_mask = Some(mask);
            self.scale = Some(scale);
        } else {
            self.drop_mask = None;
            self.scale = None;
        }

        trace!(
            layer = self.links.index,
            batch = prev_output.rows(),
            activation = self.activation.name(),
            "dense forward"
        );

        self.pre_activation = Some(pre_activation);
        self.gradient = None;
        self.pending_update = false;
        Ok(&*self.output.insert(output))
    }

    /// Backward pass from the successor's gradient and weights:
    /// `gradient = (next_gradient × next_weightsᵀ) ⊙ activation'(pre_activation)`.
    pub fn backward(&mut self, next_gradient: &Matrix, next_weights: &Matrix) -> Result<()> {
        let upstream = next_gradient.matmul(&next_weights.transpose())?;
        self.apply_local_derivative(upstream)
    }

    /// Multiply an upstream error by the local activation derivative and store
    /// it as this layer's gradient.
    pub(crate) fn apply_local_derivative(&mut self, upstream: Matrix) -> Result<()> {
        let pre_activation = self.pre_activation.as_ref().ok_or_else(|| {
            NetworkError::OrderingViolation(format!(
                "backward on layer {} before forward",
                self.links.index
            ))
        })?;
        let local = self.activation.derivative(pre_activation);
        let gradient = upstream.hadamard(&local)?;

        trace!(layer = self.links.index, "dense backward");

        self.gradient = Some(gradient);
        self.pending_update = true;
        Ok(())
    }

    /// Plain gradient descent:
    /// `weights -= lr * prev_outputᵀ × gradient`, `bias -= lr * mean(gradient)`.
    pub fn update_weights(&mut self, prev_output: &Matrix, learning_rate: f64) -> Result<()> {
        if !self.pending_update {
            return Err(NetworkError::OrderingViolation(format!(
                "update_weights on layer {} without a preceding backward",
                self.links.index
            )));
        }
        let gradient = self.gradient.as_ref().ok_or_else(|| {
            NetworkError::OrderingViolation(format!(
                "layer {} has no gradient",
                self.links.index
            ))
        })?;
        let weights = self
            .weights
            .as_mut()
            .ok_or(NetworkError::Uninitialized { layer: self.links.index })?;
        let bias = self
            .bias
            .as_mut()
            .ok_or(NetworkError::Uninitialized { layer: self.links.index })?;

        let weight_gradient = prev_output.transpose().matmul(gradient)?;
        weights.sub_assign_scaled(learning_rate, &weight_gradient)?;

        for (b, g) in bias.iter_mut().zip(gradient.mean_rows()) {
            *b -= learning_rate * g;
        }

        self.pending_update = false;
        Ok(())
    }

    /// Replace the weights; the shape must be `prev_size × size` (and match the
    /// current weights, if any).
    pub fn set_weights(&mut self, weights: Matrix) -> Result<()> {
        let expected_rows = self.weights.as_ref().map_or(weights.rows(), Matrix::rows);
        if weights.cols() != self.size || weights.rows() != expected_rows || weights.rows() == 0 {
            return Err(NetworkError::shape(
                "set_weights",
                (expected_rows, self.size),
                weights.shape(),
            ));
        }
        self.weights = Some(weights);
        Ok(())
    }

    /// Replace the bias; its length must equal `size`.
    pub fn set_bias(&mut self, bias: Vec<f64>) -> Result<()> {
        if bias.len() != self.size {
            return Err(NetworkError::shape("set_bias", (1, self.size), (1, bias.len())));
        }
        self.bias = Some(bias);
        Ok(())
    }

    /// Enable or disable dropout for subsequent forward passes.
    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    /// Whether dropout applies on the next forward pass (given a nonzero rate).
    pub fn is_training(&self) -> bool {
        self.training
    }

    /// Both weights and bias are present.
    pub fn is_initialized(&self) -> bool {
        self.weights.is_some() && self.bias.is_some()
    }

    pub fn drop_probability(&self) -> f64 {
        self.drop_probability
    }

    pub fn activation(&self) -> &dyn Activation {
        self.activation.as_ref()
    }

    /// `prev_size × size` weights, once initialized.
    pub fn weights(&self) -> Option<&Matrix> {
        self.weights.as_ref()
    }

    pub fn bias(&self) -> Option<&[f64]> {
        self.bias.as_deref()
    }

    /// Affine output `prev_output × weights + bias` of the last forward pass.
    pub fn pre_activation(&self) -> Option<&Matrix> {
        self.pre_activation.as_ref()
    }

    /// ∂loss/∂pre_activation from the last backward pass. Cleared by forward.
    pub fn gradient(&self) -> Option<&Matrix> {
        self.gradient.as_ref()
    }

    /// 0/1 mask from the last forward pass; `None` when dropout was inactive.
    pub fn drop_mask(&self) -> Option<&Matrix> {
        self.drop_mask.as_ref()
    }

    /// `1 / keep_prob` used on the last forward pass, if dropout ran.
    pub fn scale(&self) -> Option<f64> {
        self.scale
    }

    fn dropout_active(&self) -> bool {
        self.training && self.drop_probability > 0.0
    }
}

impl Layer for DenseLayer {
    fn size(&self) -> usize {
        self.size
    }

    fn output(&self) -> Option<&Matrix> {
        self.output.as_ref()
    }

    fn parameter_count(&self) -> usize {
        match (&self.weights, &self.bias) {
            (Some(w), Some(b)) => w.len() + b.len(),
            (Some(w), None) => w.len(),
            (None, Some(b)) => b.len(),
            (None, None) => 0,
        }
    }

    fn links(&self) -> Links {
        self.links
    }

    fn set_links(&mut self, links: Links) {
        self.links = links;
    }
}
