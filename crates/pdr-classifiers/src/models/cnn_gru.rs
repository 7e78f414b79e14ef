use candle_core::{ModuleT, Result, Tensor};

use crate::building_blocks::layers::{max_pool1d, ConvBlock, DenseHead, SeededDropout};
use crate::building_blocks::recurrent::GruLayer;
use crate::models::builder::{BuildContext, SequenceModel};

/// Convolutional feature extractor followed by two stacked GRUs.
///
/// ```text
/// (n, 1, L)
///   Conv(64) + BN -> Conv(64) -> MaxPool(2) -> Dropout(0.2)
///   Conv(128) + BN -> MaxPool(2) -> Dropout(0.2)
///   -> (n, L/4, 128)
///   GRU(128, sequences, input dropout 0.2) -> GRU(64, last, input dropout 0.2)
///   Dense(64) -> Dropout(0.3) -> Dense(32) -> logits
/// ```
///
/// Convolutions and recurrences do not depend on `L`, so a fitted model can
/// score sequences of a different length.
#[derive(Debug, Clone)]
pub struct CnnGruModel {
    conv1: ConvBlock,
    conv2: ConvBlock,
    pool_dropout1: SeededDropout,
    conv3: ConvBlock,
    pool_dropout2: SeededDropout,
    gru1_input_dropout: SeededDropout,
    gru1: GruLayer,
    gru2_input_dropout: SeededDropout,
    gru2: GruLayer,
    head: DenseHead,
}

pub fn build_cnn_gru_model(
    _n_features: usize,
    n_classes: usize,
    ctx: &BuildContext,
) -> Result<CnnGruModel> {
    let vb = ctx.vb().pp("cnn_gru");
    let seed = ctx.seed();

    Ok(CnnGruModel {
        conv1: ConvBlock::new(1, 64, true, vb.pp("conv1"))?,
        conv2: ConvBlock::new(64, 64, false, vb.pp("conv2"))?,
        pool_dropout1: SeededDropout::new(0.2, seed),
        conv3: ConvBlock::new(64, 128, true, vb.pp("conv3"))?,
        pool_dropout2: SeededDropout::new(0.2, seed),
        gru1_input_dropout: SeededDropout::new(0.2, seed),
        gru1: GruLayer::gru(128, 128, true, vb.pp("gru1"))?,
        gru2_input_dropout: SeededDropout::new(0.2, seed),
        gru2: GruLayer::gru(128, 64, false, vb.pp("gru2"))?,
        head: DenseHead::new(64, n_classes, 0.3, seed, vb.pp("head"))?,
    })
}

impl SequenceModel for CnnGruModel {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let x = self.conv1.forward_t(xs, train)?;
        let x = self.conv2.forward_t(&x, train)?;
        let x = max_pool1d(&x, 2)?;
        let x = self.pool_dropout1.forward_t(&x, train)?;

        let x = self.conv3.forward_t(&x, train)?;
        let x = max_pool1d(&x, 2)?;
        let x = self.pool_dropout2.forward_t(&x, train)?;

        // channels-first -> (batch, time, channels)
        let x = x.transpose(1, 2)?.contiguous()?;
        let x = self.gru1_input_dropout.forward_t(&x, train)?;
        let x = self.gru1.forward(&x)?;
        let x = self.gru2_input_dropout.forward_t(&x, train)?;
        let x = self.gru2.forward(&x)?;

        self.head.forward_t(&x, train)
    }

    fn model_arch(&self) -> &'static str {
        "cnn_gru"
    }
}
