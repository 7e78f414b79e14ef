use ndarray::Array2;

use crate::error::{ClassifierError, Result};

/// Generic classifier interface: fit on a sample matrix and integer labels,
/// then predict labels or per-class probabilities.
pub trait Classifier {
    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()>;

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>>;

    /// `(samples, n_classes)`, columns in the order of [`Classifier::classes`].
    fn predict_proba(&self, x: &Array2<f32>) -> Result<Array2<f32>>;

    fn classes(&self) -> Option<&[i32]>;

    /// Fraction of samples whose predicted label equals `y`.
    fn score(&self, x: &Array2<f32>, y: &[i32]) -> Result<f32> {
        if x.nrows() != y.len() {
            return Err(ClassifierError::InvalidInput(format!(
                "X has {} samples but y has {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(ClassifierError::InvalidInput(
                "cannot score an empty sample matrix".to_string(),
            ));
        }
        let predictions = self.predict(x)?;
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| p == t)
            .count();
        Ok(correct as f32 / y.len() as f32)
    }

    fn name(&self) -> &str {
        "classifier"
    }
}
