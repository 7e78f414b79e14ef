use thiserror::Error;

/// Errors raised by the classifier adapter.
///
/// Configuration problems (unavailable device, bad hyperparameters) are kept
/// apart from state problems (predicting with an unfitted adapter) so callers
/// can branch on them.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("model must be fitted before prediction")]
    NotFitted,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("expected {expected} features per sample, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("backend error: {0}")]
    Backend(#[from] candle_core::Error),

    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl ClassifierError {
    /// True when the adapter was used before `fit` populated its state.
    pub fn is_state_error(&self) -> bool {
        matches!(self, ClassifierError::NotFitted)
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(self, ClassifierError::Configuration(_))
    }
}

pub type Result<T, E = ClassifierError> = std::result::Result<T, E>;
