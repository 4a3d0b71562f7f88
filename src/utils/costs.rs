//! Cost functions
//!
//! The output layer consumes the [`Cost`] contract: a batch-reduced scalar loss
//! and the matrix of ∂loss/∂predicted. Both require `predicted` and `target`
//! to have identical shapes.
//!
//! The shipped costs sum over the batch, so `derivative` is exactly the
//! elementwise partial of `loss` for any batch size.

use std::fmt;

use crate::error::{NetworkError, Result};
use crate::utils::matrix::Matrix;

/// Probabilities are clamped into [EPS, 1 - EPS] before taking logarithms.
const EPS: f64 = 1e-12;

pub trait Cost {
    /// Scalar loss, summed over the batch.
    fn loss(&self, predicted: &Matrix, target: &Matrix) -> Result<f64>;

    /// ∂loss/∂predicted, same shape as `predicted`.
    fn derivative(&self, predicted: &Matrix, target: &Matrix) -> Result<Matrix>;

    fn name(&self) -> &str;
}

impl fmt::Debug for dyn Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cost({})", self.name())
    }
}

fn check_shapes(predicted: &Matrix, target: &Matrix) -> Result<()> {
    if predicted.shape() != target.shape() {
        return Err(NetworkError::shape("cost", predicted.shape(), target.shape()));
    }
    Ok(())
}

/// Squared error: ½·Σ(p − t)² over the whole batch, derivative `p − t`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSquaredError;

impl Cost for MeanSquaredError {
    fn loss(&self, predicted: &Matrix, target: &Matrix) -> Result<f64> {
        let diff = predicted.sub(target)?;
        let total: f64 = diff.as_slice().iter().map(|d| d * d).sum();
        Ok(0.5 * total)
    }

    fn derivative(&self, predicted: &Matrix, target: &Matrix) -> Result<Matrix> {
        predicted.sub(target)
    }

    fn name(&self) -> &str {
        "mse"
    }
}

/// Categorical cross-entropy against one-hot (or soft) targets: −Σ t·ln p
/// over the whole batch, derivative `−t / p`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropy;

impl Cost for CrossEntropy {
    fn loss(&self, predicted: &Matrix, target: &Matrix) -> Result<f64> {
        check_shapes(predicted, target)?;
        let total: f64 = predicted
            .as_slice()
            .iter()
            .zip(target.as_slice())
            .map(|(&p, &t)| -t * p.clamp(EPS, 1.0 - EPS).ln())
            .sum();
        Ok(total)
    }

    fn derivative(&self, predicted: &Matrix, target: &Matrix) -> Result<Matrix> {
        check_shapes(predicted, target)?;
        let data = predicted
            .as_slice()
            .iter()
            .zip(target.as_slice())
            .map(|(&p, &t)| -t / p.clamp(EPS, 1.0 - EPS))
            .collect();
        Matrix::from_vec(predicted.rows(), predicted.cols(), data)
    }

    fn name(&self) -> &str {
        "cross_entropy"
    }
}

/// Look up a shipped cost by its configuration name.
pub fn cost_from_name(name: &str) -> Result<Box<dyn Cost>> {
    match name.to_lowercase().as_str() {
        "mse" | "mean_squared_error" => Ok(Box::new(MeanSquaredError)),
        "cross_entropy" | "crossentropy" => Ok(Box::new(CrossEntropy)),
        _ => Err(NetworkError::UnknownCost(name.to_string())),
    }
}
