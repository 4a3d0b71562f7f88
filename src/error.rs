//! Error types for the layer chain
//!
//! Every failure in the core is fatal for the current step and is handed back
//! to the training-loop caller, which decides whether to abort or skip.

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors raised by matrices, layers, the network chain and configuration.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Two operands of a matrix operation have incompatible shapes.
    #[error("shape mismatch in {op}: expected {expected}, found {found}")]
    ShapeMismatch {
        op: &'static str,
        expected: String,
        found: String,
    },

    /// A parametric layer was used before `initialize_weights`/`initialize_bias`.
    #[error("layer {layer} has no parameters; call initialize() first")]
    Uninitialized { layer: usize },

    /// A pass was requested before the pass it depends on produced its cache.
    #[error("ordering violation: {0}")]
    OrderingViolation(String),

    /// The chain or a layer definition is malformed.
    #[error("invalid layer: {0}")]
    InvalidLayer(String),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown activation function '{0}'")]
    UnknownActivation(String),

    #[error("unknown cost function '{0}'")]
    UnknownCost(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NetworkError {
    pub(crate) fn shape(op: &'static str, expected: (usize, usize), found: (usize, usize)) -> Self {
        NetworkError::ShapeMismatch {
            op,
            expected: format!("{} x {}", expected.0, expected.1),
            found: format!("{} x {}", found.0, found.1),
        }
    }
}
