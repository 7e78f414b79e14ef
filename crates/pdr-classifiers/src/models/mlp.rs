use candle_core::{ModuleT, Result, Tensor};

use crate::building_blocks::layers::DenseHead;
use crate::models::builder::{BuildContext, SequenceModel};

/// Dense baseline: the sequence is flattened and fed straight into the
/// shared classification head. Needs a fixed feature count.
#[derive(Debug, Clone)]
pub struct MlpModel {
    head: DenseHead,
}

pub fn build_mlp_model(n_features: usize, n_classes: usize, ctx: &BuildContext) -> Result<MlpModel> {
    let head = DenseHead::new(n_features, n_classes, 0.2, ctx.seed(), ctx.vb().pp("mlp"))?;
    Ok(MlpModel { head })
}

impl SequenceModel for MlpModel {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let x = xs.flatten_from(1)?;
        self.head.forward_t(&x, train)
    }

    fn model_arch(&self) -> &'static str {
        "mlp"
    }
}
