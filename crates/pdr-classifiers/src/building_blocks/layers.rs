use candle_core::{Module, ModuleT, Result, Tensor};
use candle_nn as nn;

use crate::seeding::SeedContext;

/// Number of output logits for a classification head: a single logit for
/// two classes (sigmoid), one per class otherwise (softmax).
pub fn output_units(n_classes: usize) -> usize {
    if n_classes == 2 {
        1
    } else {
        n_classes
    }
}

/// Inverted dropout whose masks come from the owning adapter's
/// [`SeedContext`] rather than the backend's global generator.
#[derive(Debug, Clone)]
pub struct SeededDropout {
    p: f32,
    ctx: SeedContext,
}

impl SeededDropout {
    pub fn new(p: f32, ctx: &SeedContext) -> Self {
        Self {
            p,
            ctx: ctx.clone(),
        }
    }
}

impl ModuleT for SeededDropout {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        if !train || self.p <= 0.0 {
            return Ok(xs.clone());
        }
        let mask = self
            .ctx
            .dropout_mask(xs.elem_count(), self.p)
            .map_err(|e| candle_core::Error::Msg(e.to_string()))?;
        let mask = Tensor::from_vec(mask, xs.dims(), xs.device())?.to_dtype(xs.dtype())?;
        xs.mul(&mask)
    }
}

/// Non-overlapping max pooling over the last (time) axis of a
/// `(batch, channels, length)` tensor. Trailing elements that do not fill a
/// window are dropped; sequences shorter than one window pass through.
pub fn max_pool1d(xs: &Tensor, size: usize) -> Result<Tensor> {
    let (batch, channels, length) = xs.dims3()?;
    let pooled = length / size;
    if pooled == 0 {
        return Ok(xs.clone());
    }
    xs.narrow(2, 0, pooled * size)?
        .contiguous()?
        .reshape((batch, channels, pooled, size))?
        .max(3)
}

/// `Conv1d(kernel 3, same padding) -> ReLU -> [BatchNorm]`.
#[derive(Debug, Clone)]
pub struct ConvBlock {
    conv: nn::Conv1d,
    norm: Option<nn::BatchNorm>,
}

impl ConvBlock {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        batch_norm: bool,
        vb: nn::VarBuilder,
    ) -> Result<Self> {
        let conv = nn::conv1d(
            in_channels,
            out_channels,
            3,
            nn::Conv1dConfig {
                padding: 1,
                ..Default::default()
            },
            vb.pp("conv"),
        )?;
        let norm = if batch_norm {
            Some(nn::batch_norm(
                out_channels,
                nn::BatchNormConfig {
                    eps: 1e-3,
                    momentum: 0.01,
                    ..Default::default()
                },
                vb.pp("norm"),
            )?)
        } else {
            None
        };
        Ok(Self { conv, norm })
    }
}

impl ModuleT for ConvBlock {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let x = self.conv.forward(xs)?.relu()?;
        match &self.norm {
            Some(norm) => norm.forward_t(&x, train),
            None => Ok(x),
        }
    }
}

/// Dense classification head shared by the built-in architectures:
/// `Dense(64, relu) -> Dropout -> Dense(32, relu) -> Dense(output_units)`.
#[derive(Debug, Clone)]
pub struct DenseHead {
    hidden: nn::Linear,
    dropout: SeededDropout,
    bottleneck: nn::Linear,
    output: nn::Linear,
}

impl DenseHead {
    pub fn new(
        in_features: usize,
        n_classes: usize,
        dropout: f32,
        ctx: &SeedContext,
        vb: nn::VarBuilder,
    ) -> Result<Self> {
        Ok(Self {
            hidden: nn::linear(in_features, 64, vb.pp("hidden"))?,
            dropout: SeededDropout::new(dropout, ctx),
            bottleneck: nn::linear(64, 32, vb.pp("bottleneck"))?,
            output: nn::linear(32, output_units(n_classes), vb.pp("output"))?,
        })
    }
}

impl ModuleT for DenseHead {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let x = self.hidden.forward(xs)?.relu()?;
        let x = self.dropout.forward_t(&x, train)?;
        let x = self.bottleneck.forward(&x)?.relu()?;
        self.output.forward(&x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::{VarBuilder, VarMap};

    #[test]
    fn output_units_collapse_binary_to_one_logit() {
        assert_eq!(output_units(2), 1);
        assert_eq!(output_units(3), 3);
        assert_eq!(output_units(7), 7);
    }

    #[test]
    fn dropout_is_identity_outside_training() {
        let ctx = SeedContext::new(Some(0));
        let dropout = SeededDropout::new(0.5, &ctx);
        let xs = Tensor::ones((4, 8), DType::F32, &Device::Cpu).unwrap();
        let out = dropout.forward_t(&xs, false).unwrap();
        assert_eq!(out.to_vec2::<f32>().unwrap(), xs.to_vec2::<f32>().unwrap());
    }

    #[test]
    fn dropout_zeroes_some_elements_when_training() {
        let ctx = SeedContext::new(Some(0));
        let dropout = SeededDropout::new(0.5, &ctx);
        let xs = Tensor::ones((8, 32), DType::F32, &Device::Cpu).unwrap();
        let out = dropout.forward_t(&xs, true).unwrap();
        let values = out.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert!(values.iter().any(|&v| v == 0.0));
        assert!(values.iter().any(|&v| (v - 2.0).abs() < 1e-6));
    }

    #[test]
    fn max_pool_halves_length_and_keeps_maxima() {
        let xs = Tensor::new(&[[[1f32, 5., 2., 3., 9.]]], &Device::Cpu).unwrap();
        let out = max_pool1d(&xs, 2).unwrap();
        assert_eq!(out.dims(), &[1, 1, 2]);
        assert_eq!(out.flatten_all().unwrap().to_vec1::<f32>().unwrap(), vec![5., 3.]);
    }

    #[test]
    fn max_pool_passes_short_sequences_through() {
        let xs = Tensor::new(&[[[4f32]]], &Device::Cpu).unwrap();
        let out = max_pool1d(&xs, 2).unwrap();
        assert_eq!(out.dims(), &[1, 1, 1]);
    }

    #[test]
    fn conv_block_keeps_sequence_length() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let block = ConvBlock::new(1, 8, true, vb.pp("block")).unwrap();
        let xs = Tensor::ones((3, 1, 10), DType::F32, &Device::Cpu).unwrap();
        let out = block.forward_t(&xs, true).unwrap();
        assert_eq!(out.dims(), &[3, 8, 10]);
    }

    #[test]
    fn dense_head_emits_one_logit_per_class() {
        let ctx = SeedContext::new(Some(3));
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let head = DenseHead::new(16, 4, 0.3, &ctx, vb.pp("head")).unwrap();
        let xs = Tensor::ones((5, 16), DType::F32, &Device::Cpu).unwrap();
        assert_eq!(head.forward_t(&xs, false).unwrap().dims(), &[5, 4]);
    }
}
