//! Survival model port: trait for the pre-trained risk model.
//!
//! The application only needs one operation from the model, so any fitted
//! survival estimator (or a test fake) can sit behind this trait.

use crate::domain::{CurveError, ModelInput, SurvivalCurve};

/// Errors raised by a survival model while predicting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Model expects {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Input column {index} is '{actual}' but the model was trained on '{expected}'")]
    ColumnMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("Input value for '{0}' is not a finite number")]
    NonFiniteInput(String),

    #[error("Invalid survival curve: {0}")]
    Curve(#[from] CurveError),
}

/// Trait for a fitted survival regression model.
///
/// Implementations are immutable after loading and shared across
/// submissions.
pub trait SurvivalModel: Send + Sync {
    /// Number of input columns the model was trained on.
    fn n_features(&self) -> usize;

    /// Column names the model was trained on, when the artifact records them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Predict the survival function for one reconciled input row.
    ///
    /// # Errors
    /// Returns `ModelError::ShapeMismatch` if the row width differs from
    /// [`SurvivalModel::n_features`], or another `ModelError` if the row
    /// cannot be scored.
    fn predict_survival_function(&self, input: &ModelInput) -> Result<SurvivalCurve, ModelError>;
}
