//! Activation functions for neural networks
//!
//! The layer chain only sees the [`Activation`] contract: an elementwise
//! transform and its derivative, both evaluated at the pre-activation. The
//! concrete functions below are collaborators shipped for configuration files,
//! the demo binary and tests:
//! - Identity, Sigmoid, Tanh, ReLU (elementwise)
//! - Softmax (row-wise, with the diagonal of its Jacobian as derivative)

use std::fmt;

use crate::error::{NetworkError, Result};
use crate::utils::matrix::Matrix;

/// Elementwise activation contract.
///
/// `apply` and `derivative` must both return a matrix of the same shape as `x`;
/// `derivative` is evaluated at the pre-activation, not at the activation output.
pub trait Activation {
    fn apply(&self, x: &Matrix) -> Matrix;

    fn derivative(&self, x: &Matrix) -> Matrix;

    /// Short identifier used in logs and configuration files.
    fn name(&self) -> &str;
}

/// Adapter for a plain `fn(x, derivative)` function.
///
/// ```
/// use multilayer_perceptron::utils::activations::{Activation, ActivationFn};
/// use multilayer_perceptron::utils::matrix::Matrix;
///
/// let square = ActivationFn::new("square", |x: &Matrix, derivative: bool| {
///     if derivative { x.scale(2.0) } else { x.map(|v| v * v) }
/// });
/// let x = Matrix::from_vec(1, 2, vec![1.0, 3.0]).unwrap();
/// assert_eq!(square.apply(&x).as_slice(), &[1.0, 9.0]);
/// assert_eq!(square.derivative(&x).as_slice(), &[2.0, 6.0]);
/// ```
pub struct ActivationFn<F> {
    name: String,
    f: F,
}

impl<F> ActivationFn<F>
where
    F: Fn(&Matrix, bool) -> Matrix,
{
    pub fn new(name: &str, f: F) -> Self {
        Self {
            name: name.to_string(),
            f,
        }
    }
}

impl<F> Activation for ActivationFn<F>
where
    F: Fn(&Matrix, bool) -> Matrix,
{
    fn apply(&self, x: &Matrix) -> Matrix {
        (self.f)(x, false)
    }

    fn derivative(&self, x: &Matrix) -> Matrix {
        (self.f)(x, true)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for dyn Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Activation({})", self.name())
    }
}

/// f(x) = x
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Activation for Identity {
    fn apply(&self, x: &Matrix) -> Matrix {
        x.clone()
    }

    fn derivative(&self, x: &Matrix) -> Matrix {
        x.map(|_| 1.0)
    }

    fn name(&self) -> &str {
        "identity"
    }
}

/// Sigmoid activation function (scalar).
///
/// Returns the sigmoid of the input: 1 / (1 + exp(-x))
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Logistic sigmoid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sigmoid;

impl Activation for Sigmoid {
    fn apply(&self, x: &Matrix) -> Matrix {
        x.map(sigmoid)
    }

    fn derivative(&self, x: &Matrix) -> Matrix {
        x.map(|z| {
            let s = sigmoid(z);
            s * (1.0 - s)
        })
    }

    fn name(&self) -> &str {
        "sigmoid"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tanh;

impl Activation for Tanh {
    fn apply(&self, x: &Matrix) -> Matrix {
        x.map(f64::tanh)
    }

    fn derivative(&self, x: &Matrix) -> Matrix {
        x.map(|z| 1.0 - z.tanh().powi(2))
    }

    fn name(&self) -> &str {
        "tanh"
    }
}

/// ReLU; the derivative at exactly zero is taken as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Relu;

impl Activation for Relu {
    fn apply(&self, x: &Matrix) -> Matrix {
        x.map(|z| z.max(0.0))
    }

    fn derivative(&self, x: &Matrix) -> Matrix {
        x.map(|z| if z > 0.0 { 1.0 } else { 0.0 })
    }

    fn name(&self) -> &str {
        "relu"
    }
}

/// Row-wise softmax.
///
/// The derivative is the diagonal of the Jacobian, `s * (1 - s)`, which is what
/// an elementwise contract can express.
#[derive(Debug, Clone, Copy, Default)]
pub struct Softmax;

impl Softmax {
    fn rows(x: &Matrix) -> Matrix {
        let mut out = x.clone();
        let cols = x.cols();
        if cols == 0 {
            return out;
        }
        for row in out.as_mut_slice().chunks_exact_mut(cols) {
            // max-subtraction keeps exp() finite for large logits
            let max_value = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mut sum = 0.0;
            for value in row.iter_mut() {
                *value = (*value - max_value).exp();
                sum += *value;
            }
            let inv_sum = 1.0 / sum;
            for value in row.iter_mut() {
                *value *= inv_sum;
            }
        }
        out
    }
}

impl Activation for Softmax {
    fn apply(&self, x: &Matrix) -> Matrix {
        Softmax::rows(x)
    }

    fn derivative(&self, x: &Matrix) -> Matrix {
        Softmax::rows(x).map(|s| s * (1.0 - s))
    }

    fn name(&self) -> &str {
        "softmax"
    }
}

/// Look up a shipped activation by its configuration name.
pub fn activation_from_name(name: &str) -> Result<Box<dyn Activation>> {
    match name.to_lowercase().as_str() {
        "identity" | "linear" => Ok(Box::new(Identity)),
        "sigmoid" => Ok(Box::new(Sigmoid)),
        "tanh" => Ok(Box::new(Tanh)),
        "relu" => Ok(Box::new(Relu)),
        "softmax" => Ok(Box::new(Softmax)),
        _ => Err(NetworkError::UnknownActivation(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    fn row(values: &[f64]) -> Matrix {
        Matrix::from_vec(1, values.len(), values.to_vec()).unwrap()
    }

    #[test]
    fn test_sigmoid_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < EPSILON);
        let d = Sigmoid.derivative(&row(&[0.0]));
        assert!((d.as_slice()[0] - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_relu_mixed() {
        let x = row(&[-2.0, -1.0, 0.0, 1.0, 2.0]);
        assert_eq!(Relu.apply(&x).as_slice(), &[0.0, 0.0, 0.0, 1.0, 2.0]);
        assert_eq!(Relu.derivative(&x).as_slice(), &[0.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_tanh_derivative_at_zero() {
        let d = Tanh.derivative(&row(&[0.0]));
        assert!((d.as_slice()[0] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_identity() {
        let x = row(&[-3.0, 4.0]);
        assert_eq!(Identity.apply(&x), x);
        assert_eq!(Identity.derivative(&x).as_slice(), &[1.0, 1.0]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let x = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 1000.0, 1001.0, 1002.0]).unwrap();
        let s = Softmax.apply(&x);
        for r in 0..2 {
            let sum: f64 = s.row(r).unwrap().iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
        assert!(s.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_activation_from_name() {
        assert_eq!(activation_from_name("ReLU").unwrap().name(), "relu");
        assert_eq!(activation_from_name("linear").unwrap().name(), "identity");
        assert!(matches!(
            activation_from_name("swish"),
            Err(NetworkError::UnknownActivation(_))
        ));
    }
}
