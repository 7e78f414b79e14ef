use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};

use crate::seeding::SeedContext;

/// A network the adapter can train and query.
///
/// Inputs are `(batch, 1, n_features)` tensors; outputs are raw logits,
/// either one per sample for a two-class problem or one per class.
pub trait SequenceModel {
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor>;

    fn model_arch(&self) -> &'static str {
        "custom"
    }
}

/// Everything a builder needs to allocate a fresh model: a variable
/// builder backed by the adapter's own `VarMap`, and the adapter's seed
/// context for stochastic layers.
pub struct BuildContext {
    vb: VarBuilder<'static>,
    seed: SeedContext,
    device: Device,
}

impl BuildContext {
    pub fn new(varmap: &VarMap, device: &Device, seed: &SeedContext) -> Self {
        let vb: VarBuilder<'static> = VarBuilder::from_varmap(varmap, DType::F32, device);
        Self {
            vb,
            seed: seed.clone(),
            device: device.clone(),
        }
    }

    pub fn vb(&self) -> &VarBuilder<'static> {
        &self.vb
    }

    pub fn seed(&self) -> &SeedContext {
        &self.seed
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

/// Builds an untrained model for a given input width and class count.
///
/// Any `Fn(usize, usize, &BuildContext) -> candle_core::Result<M>` is a
/// builder, so the built-in `build_*_model` functions and ad-hoc closures
/// can both be handed to [`crate::SequenceClassifier::new`].
pub trait ModelBuilder {
    fn build(
        &self,
        n_features: usize,
        n_classes: usize,
        ctx: &BuildContext,
    ) -> candle_core::Result<Box<dyn SequenceModel>>;
}

impl<F, M> ModelBuilder for F
where
    F: Fn(usize, usize, &BuildContext) -> candle_core::Result<M>,
    M: SequenceModel + 'static,
{
    fn build(
        &self,
        n_features: usize,
        n_classes: usize,
        ctx: &BuildContext,
    ) -> candle_core::Result<Box<dyn SequenceModel>> {
        let model = self(n_features, n_classes, ctx)?;
        Ok(Box::new(model))
    }
}
