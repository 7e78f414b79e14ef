//! Adapter-scoped randomness.
//!
//! Every random draw the adapter makes (weight initialization, dropout masks,
//! epoch shuffling) goes through a [`SeedContext`] owned by that adapter, so
//! seeding one classifier never touches another or any global state.
use candle_core::{Tensor, Var};
use candle_nn::VarMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ClassifierError, Result};

#[derive(Clone, Debug)]
pub struct SeedContext {
    seed: Option<u64>,
    rng: Arc<Mutex<StdRng>>,
}

impl SeedContext {
    /// A seeded context replays the same stream of draws; an unseeded one
    /// draws its state from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            seed,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Rewind a seeded context to the start of its stream. Unseeded
    /// contexts are left alone.
    pub fn reset(&self) -> Result<()> {
        if let Some(seed) = self.seed {
            *self.lock()? = StdRng::seed_from_u64(seed);
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StdRng>> {
        self.rng
            .lock()
            .map_err(|_| ClassifierError::Configuration("random generator lock poisoned".into()))
    }

    /// A random permutation of `0..n`.
    pub fn permutation(&self, n: usize) -> Result<Vec<u32>> {
        let mut indices: Vec<u32> = (0..n as u32).collect();
        indices.shuffle(&mut *self.lock()?);
        Ok(indices)
    }

    /// Inverted-dropout mask: each element is 0 with probability `p`, else
    /// `1 / (1 - p)`.
    pub fn dropout_mask(&self, len: usize, p: f32) -> Result<Vec<f32>> {
        let scale = 1.0 / (1.0 - p);
        let mut rng = self.lock()?;
        Ok((0..len)
            .map(|_| if rng.gen::<f32>() < p { 0.0 } else { scale })
            .collect())
    }

    /// `len` samples from `U(-bound, bound)`.
    pub fn uniform(&self, len: usize, bound: f32) -> Result<Vec<f32>> {
        let mut rng = self.lock()?;
        Ok((0..len).map(|_| rng.gen_range(-bound..=bound)).collect())
    }
}

/// Overwrite every variable of a freshly built model with values drawn from
/// `ctx`, visiting variables in name order so the draw sequence does not
/// depend on hash-map iteration.
///
/// Rank-1 tensors named `*weight` (normalization scales) and
/// `*running_var` start at one, other rank-1 tensors (biases, running means)
/// at zero, and everything else uniformly in `±1/sqrt(fan_in)`.
pub fn reinitialize_vars(varmap: &VarMap, ctx: &SeedContext) -> Result<()> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| ClassifierError::Configuration("variable map lock poisoned".into()))?;

    let mut named: Vec<(&String, &Var)> = data.iter().collect();
    named.sort_by(|a, b| a.0.cmp(b.0));

    for (name, var) in named {
        let dims = var.dims().to_vec();
        let init = if dims.len() <= 1 {
            if name.ends_with("weight") || name.ends_with("running_var") {
                Tensor::ones(dims.as_slice(), var.dtype(), var.device())?
            } else {
                Tensor::zeros(dims.as_slice(), var.dtype(), var.device())?
            }
        } else {
            let fan_in: usize = dims[1..].iter().product();
            let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
            let values = ctx.uniform(var.elem_count(), bound)?;
            Tensor::from_vec(values, dims.as_slice(), var.device())?.to_dtype(var.dtype())?
        };
        log::trace!("[reinitialize_vars] {} {:?}", name, dims);
        var.set(&init)?;
    }

    Ok(())
}
