use candle_core::{Tensor, D};
use ndarray::Array2;

use crate::error::{ClassifierError, Result};

/// Maps arbitrary non-negative labels onto contiguous class indices.
///
/// Classes are kept sorted, so column `j` of every probability matrix
/// refers to `classes()[j]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<i32>,
}

impl LabelEncoder {
    pub fn fit(y: &[i32]) -> Result<Self> {
        if let Some(bad) = y.iter().find(|&&label| label < 0) {
            return Err(ClassifierError::InvalidInput(format!(
                "labels must be non-negative integers, found {}",
                bad
            )));
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        if classes.len() < 2 {
            return Err(ClassifierError::InvalidInput(format!(
                "need at least two distinct labels to train a classifier, found {}",
                classes.len()
            )));
        }

        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[i32] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn encode(&self, y: &[i32]) -> Result<Vec<u32>> {
        y.iter()
            .map(|label| {
                self.classes
                    .binary_search(label)
                    .map(|idx| idx as u32)
                    .map_err(|_| {
                        ClassifierError::InvalidInput(format!("label {} was not seen during fit", label))
                    })
            })
            .collect()
    }

    pub fn decode(&self, index: usize) -> i32 {
        self.classes[index]
    }
}

/// Turn raw model logits into a `(samples, n_classes)` probability tensor.
///
/// A binary model may emit one logit per sample, either as `(n,)` or
/// `(n, 1)`; its sigmoid `p` is expanded to the two columns `[1 - p, p]`.
/// Wider outputs are softmaxed across classes.
pub fn logits_to_probabilities(logits: &Tensor, n_classes: usize) -> Result<Tensor> {
    let logits = match logits.rank() {
        1 => logits.unsqueeze(1)?,
        2 => logits.clone(),
        rank => {
            return Err(ClassifierError::InvalidInput(format!(
                "model output must be rank 1 or 2, got rank {}",
                rank
            )))
        }
    };

    let (_n_samples, width) = logits.dims2()?;
    if n_classes == 2 && width == 1 {
        let p = candle_nn::ops::sigmoid(&logits)?;
        let q = p.affine(-1.0, 1.0)?;
        Ok(Tensor::cat(&[&q, &p], 1)?)
    } else if width == n_classes {
        Ok(candle_nn::ops::softmax(&logits, D::Minus1)?)
    } else {
        Err(ClassifierError::Configuration(format!(
            "model emitted {} outputs per sample for {} classes",
            width, n_classes
        )))
    }
}

/// Column index of the largest entry of every row; the first one wins ties.
pub fn argmax_rows(probabilities: &Array2<f32>) -> Vec<usize> {
    probabilities
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0usize, f32::NEG_INFINITY), |best, (idx, &value)| {
                    if value > best.1 {
                        (idx, value)
                    } else {
                        best
                    }
                })
                .0
        })
        .collect()
}
