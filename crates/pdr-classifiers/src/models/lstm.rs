use candle_core::{ModuleT, Result, Tensor};

use crate::building_blocks::layers::{DenseHead, SeededDropout};
use crate::building_blocks::recurrent::LstmLayer;
use crate::models::builder::{BuildContext, SequenceModel};

/// Two stacked LSTMs reading one feature per timestep, each with 0.2
/// dropout on its inputs, then the dense head.
#[derive(Debug, Clone)]
pub struct LstmModel {
    lstm1_input_dropout: SeededDropout,
    lstm1: LstmLayer,
    lstm2_input_dropout: SeededDropout,
    lstm2: LstmLayer,
    head: DenseHead,
}

pub fn build_lstm_model(
    _n_features: usize,
    n_classes: usize,
    ctx: &BuildContext,
) -> Result<LstmModel> {
    let vb = ctx.vb().pp("lstm");
    let seed = ctx.seed();

    Ok(LstmModel {
        lstm1_input_dropout: SeededDropout::new(0.2, seed),
        lstm1: LstmLayer::lstm(1, 128, true, vb.pp("lstm1"))?,
        lstm2_input_dropout: SeededDropout::new(0.2, seed),
        lstm2: LstmLayer::lstm(128, 64, false, vb.pp("lstm2"))?,
        head: DenseHead::new(64, n_classes, 0.3, seed, vb.pp("head"))?,
    })
}

impl SequenceModel for LstmModel {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        // (batch, 1, len) -> (batch, len, 1)
        let x = xs.transpose(1, 2)?.contiguous()?;
        let x = self.lstm1_input_dropout.forward_t(&x, train)?;
        let x = self.lstm1.forward(&x)?;
        let x = self.lstm2_input_dropout.forward_t(&x, train)?;
        let x = self.lstm2.forward(&x)?;
        self.head.forward_t(&x, train)
    }

    fn model_arch(&self) -> &'static str {
        "lstm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeding::SeedContext;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn lstm_output_shape() {
        let varmap = VarMap::new();
        let ctx = BuildContext::new(&varmap, &Device::Cpu, &SeedContext::new(Some(2)));
        let model = build_lstm_model(5, 4, &ctx).unwrap();
        let xs = Tensor::ones((3, 1, 5), DType::F32, &Device::Cpu).unwrap();
        assert_eq!(model.forward_t(&xs, true).unwrap().dims(), &[3, 4]);
    }

    #[test]
    fn training_pass_drops_each_recurrent_input_once() {
        let seed = SeedContext::new(Some(4));
        let varmap = VarMap::new();
        let ctx = BuildContext::new(&varmap, &Device::Cpu, &seed);
        let model = build_lstm_model(5, 2, &ctx).unwrap();

        let xs = Tensor::ones((3, 1, 5), DType::F32, &Device::Cpu).unwrap();
        model.forward_t(&xs, true).unwrap();
        let next_draw = seed.uniform(4, 1.0).unwrap();

        // masks: lstm1 input (3x5x1), lstm2 input (3x5x128), dense head (3x64)
        let replay = SeedContext::new(Some(4));
        for len in [15, 1920, 192] {
            replay.dropout_mask(len, 0.2).unwrap();
        }
        assert_eq!(replay.uniform(4, 1.0).unwrap(), next_draw);
    }
}
