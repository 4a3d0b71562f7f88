//! Input layer: the source signal at the head of the chain

use crate::error::{NetworkError, Result};
use crate::layers::{Layer, Links};
use crate::utils::matrix::Matrix;

/// Holds the raw batch for the current forward pass.
///
/// Never has parameters and never takes part in the backward pass.
#[derive(Debug, Clone)]
pub struct InputLayer {
    size: usize,
    output: Option<Matrix>,
    links: Links,
}

impl InputLayer {
    /// Create an input layer expecting `size` features per sample.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(NetworkError::InvalidLayer(
                "input size must be positive".to_string(),
            ));
        }
        Ok(Self {
            size,
            output: None,
            links: Links::default(),
        })
    }

    /// Store `input` (batch_size × size) verbatim as this layer's output.
    pub fn forward(&mut self, input: &Matrix) -> Result<()> {
        if input.cols() != self.size {
            return Err(NetworkError::shape(
                "input",
                (input.rows(), self.size),
                input.shape(),
            ));
        }
        self.output = Some(input.clone());
        Ok(())
    }
}

impl Layer for InputLayer {
    fn size(&self) -> usize {
        self.size
    }

    fn output(&self) -> Option<&Matrix> {
        self.output.as_ref()
    }

    fn parameter_count(&self) -> usize {
        0
    }

    fn links(&self) -> Links {
        self.links
    }

    fn set_links(&mut self, links: Links) {
        self.links = links;
    }
}
