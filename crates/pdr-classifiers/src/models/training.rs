use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use serde::Serialize;
use std::collections::HashMap;

use crate::config::ClassifierParams;
use crate::error::{ClassifierError, Result};
use crate::models::builder::SequenceModel;
use crate::seeding::SeedContext;

/// Encoded training targets, shaped for the loss the model head needs.
#[derive(Debug, Clone)]
pub enum Targets {
    /// `(n,)` f32 zeros and ones, paired with a single-logit head.
    Binary(Tensor),
    /// `(n,)` u32 class indices, paired with one logit per class.
    Categorical(Tensor),
}

impl Targets {
    pub fn new(encoded: &[u32], n_classes: usize, device: &Device) -> Result<Self> {
        if n_classes == 2 {
            let values: Vec<f32> = encoded.iter().map(|&c| c as f32).collect();
            Ok(Targets::Binary(Tensor::from_vec(
                values,
                encoded.len(),
                device,
            )?))
        } else {
            Ok(Targets::Categorical(Tensor::from_slice(
                encoded,
                encoded.len(),
                device,
            )?))
        }
    }

    fn select(&self, idx: &Tensor) -> candle_core::Result<Self> {
        Ok(match self {
            Targets::Binary(t) => Targets::Binary(t.index_select(idx, 0)?),
            Targets::Categorical(t) => Targets::Categorical(t.index_select(idx, 0)?),
        })
    }

    /// Mean loss of a batch of logits against these targets.
    pub fn loss(&self, logits: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Targets::Binary(y) => binary_cross_entropy_with_logits(&logits.flatten_all()?, y),
            Targets::Categorical(y) => candle_nn::loss::cross_entropy(logits, y),
        }
    }
}

/// `max(z, 0) - z * y + log(1 + exp(-|z|))`, averaged. Stays finite for
/// saturated logits where `log(sigmoid(z))` would not.
pub fn binary_cross_entropy_with_logits(
    logits: &Tensor,
    targets: &Tensor,
) -> candle_core::Result<Tensor> {
    let positive = logits.relu()?;
    let zy = logits.mul(targets)?;
    let softplus = logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    positive.sub(&zy)?.add(&softplus)?.mean_all()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub early_stopping_patience: usize,
    pub restore_best_weights: bool,
    pub verbose: u8,
}

impl TrainingOptions {
    /// Options for a fit over `n_samples` rows; the batch never exceeds the
    /// sample count.
    pub fn from_params(params: &ClassifierParams, n_samples: usize) -> Self {
        Self {
            epochs: params.epochs,
            batch_size: params.batch_size.min(n_samples).max(1),
            learning_rate: params.learning_rate,
            early_stopping_patience: params.early_stopping_patience,
            restore_best_weights: params.restore_best_weights,
            verbose: params.verbose,
        }
    }
}

/// Per-fit record of how training went.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingHistory {
    /// Sample-weighted mean training loss of every completed epoch.
    pub epoch_losses: Vec<f32>,
    pub best_epoch: usize,
    pub best_loss: f32,
    pub stopped_early: bool,
    pub restored_best_weights: bool,
}

impl TrainingHistory {
    pub fn epochs_run(&self) -> usize {
        self.epoch_losses.len()
    }
}

/// Watches the training loss and stops once it has not strictly improved
/// for `patience` consecutive epochs. The weights of the best epoch are kept
/// so they can be put back when training stops early.
pub struct EarlyStopping {
    patience: usize,
    keep_best: bool,
    best_loss: f32,
    best_epoch: usize,
    wait: usize,
    best_weights: Option<HashMap<String, Tensor>>,
}

impl EarlyStopping {
    pub fn new(patience: usize, keep_best: bool) -> Self {
        Self {
            patience,
            keep_best,
            best_loss: f32::INFINITY,
            best_epoch: 0,
            wait: 0,
            best_weights: None,
        }
    }

    pub fn best_loss(&self) -> f32 {
        self.best_loss
    }

    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }

    /// Record an epoch's loss; returns `true` when training should stop.
    pub fn on_epoch_end(&mut self, epoch: usize, loss: f32, varmap: &VarMap) -> Result<bool> {
        if loss < self.best_loss {
            self.best_loss = loss;
            self.best_epoch = epoch;
            self.wait = 0;
            if self.keep_best {
                self.best_weights = Some(snapshot_vars(varmap)?);
            }
            return Ok(false);
        }

        self.wait += 1;
        Ok(self.patience > 0 && self.wait >= self.patience)
    }

    /// Write the best-epoch weights back into `varmap`. Returns whether a
    /// snapshot existed.
    pub fn restore_best(&self, varmap: &VarMap) -> Result<bool> {
        match &self.best_weights {
            Some(weights) => {
                restore_vars(varmap, weights)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn lock_vars(
    varmap: &VarMap,
) -> Result<std::sync::MutexGuard<'_, HashMap<String, Var>>> {
    varmap
        .data()
        .lock()
        .map_err(|_| ClassifierError::Configuration("variable map lock poisoned".into()))
}

fn snapshot_vars(varmap: &VarMap) -> Result<HashMap<String, Tensor>> {
    let data = lock_vars(varmap)?;
    let mut snapshot = HashMap::with_capacity(data.len());
    for (name, var) in data.iter() {
        snapshot.insert(name.clone(), var.as_tensor().copy()?);
    }
    Ok(snapshot)
}

fn restore_vars(varmap: &VarMap, weights: &HashMap<String, Tensor>) -> Result<()> {
    let data = lock_vars(varmap)?;
    for (name, var) in data.iter() {
        if let Some(saved) = weights.get(name) {
            var.set(saved)?;
        }
    }
    Ok(())
}

/// Train `model` (whose variables live in `varmap`) with Adam on
/// mini-batches reshuffled every epoch from `seed`.
pub fn train_model(
    model: &dyn SequenceModel,
    varmap: &VarMap,
    xs: &Tensor,
    targets: &Targets,
    opts: &TrainingOptions,
    seed: &SeedContext,
) -> Result<TrainingHistory> {
    let n_samples = xs.dim(0)?;
    let num_batches = n_samples.div_ceil(opts.batch_size);

    log::debug!(
        "Training {} model on {} samples ({} batches of up to {}) for {} epochs",
        model.model_arch(),
        n_samples,
        num_batches,
        opts.batch_size,
        opts.epochs
    );

    let params = ParamsAdamW {
        lr: opts.learning_rate,
        weight_decay: 0.0,
        ..Default::default()
    };
    let mut opt = AdamW::new(varmap.all_vars(), params)?;
    let mut early_stopping =
        EarlyStopping::new(opts.early_stopping_patience, opts.restore_best_weights);
    let mut history = TrainingHistory::default();

    for epoch in 0..opts.epochs {
        let order = seed.permutation(n_samples)?;
        let mut total_loss = 0f32;

        for batch in order.chunks(opts.batch_size) {
            let idx = Tensor::from_slice(batch, batch.len(), xs.device())?;
            let batch_x = xs.index_select(&idx, 0)?;
            let batch_targets = targets.select(&idx)?;

            let logits = model.forward_t(&batch_x, true)?;
            let loss = batch_targets.loss(&logits)?;
            opt.backward_step(&loss)?;

            let loss_value = loss.to_dtype(DType::F32)?.to_scalar::<f32>()?;
            total_loss += loss_value * batch.len() as f32;
        }

        let epoch_loss = total_loss / n_samples as f32;
        history.epoch_losses.push(epoch_loss);
        if opts.verbose > 0 {
            log::info!("Epoch {}/{} - loss: {:.4}", epoch + 1, opts.epochs, epoch_loss);
        } else {
            log::debug!("Epoch {}/{} - loss: {:.4}", epoch + 1, opts.epochs, epoch_loss);
        }

        if !epoch_loss.is_finite() {
            log::warn!("Training loss is not finite at epoch {}, stopping", epoch + 1);
            history.stopped_early = true;
            break;
        }

        if early_stopping.on_epoch_end(epoch, epoch_loss, varmap)? {
            log::info!(
                "Early stopping at epoch {}: no improvement for {} epochs (best {:.4} at epoch {})",
                epoch + 1,
                opts.early_stopping_patience,
                early_stopping.best_loss(),
                early_stopping.best_epoch() + 1
            );
            history.stopped_early = true;
            break;
        }
    }

    if history.stopped_early && opts.restore_best_weights {
        history.restored_best_weights = early_stopping.restore_best(varmap)?;
        if history.restored_best_weights {
            log::info!(
                "Restored model weights from epoch {}",
                early_stopping.best_epoch() + 1
            );
        }
    }
    history.best_epoch = early_stopping.best_epoch();
    history.best_loss = early_stopping.best_loss();

    Ok(history)
}
