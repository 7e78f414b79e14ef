use candle_core::{Result, Tensor};
use candle_nn::rnn::{self, RNN};
use candle_nn::VarBuilder;

/// Unidirectional recurrent layer over a `(batch, seq_len, features)` input.
///
/// With `return_sequences` the output holds the hidden state of every
/// timestep, `(batch, seq_len, hidden)`; otherwise only the last one,
/// `(batch, hidden)`.
#[derive(Debug, Clone)]
pub struct Recurrent<R: RNN> {
    rnn: R,
    return_sequences: bool,
}

pub type GruLayer = Recurrent<rnn::GRU>;
pub type LstmLayer = Recurrent<rnn::LSTM>;

impl GruLayer {
    pub fn gru(
        input_size: usize,
        hidden_size: usize,
        return_sequences: bool,
        vb: VarBuilder,
    ) -> Result<Self> {
        let rnn = rnn::gru(input_size, hidden_size, rnn::GRUConfig::default(), vb)?;
        Ok(Self {
            rnn,
            return_sequences,
        })
    }
}

impl LstmLayer {
    pub fn lstm(
        input_size: usize,
        hidden_size: usize,
        return_sequences: bool,
        vb: VarBuilder,
    ) -> Result<Self> {
        let rnn = rnn::lstm(input_size, hidden_size, rnn::LSTMConfig::default(), vb)?;
        Ok(Self {
            rnn,
            return_sequences,
        })
    }
}

/// Access to the hidden output `h` of a recurrent cell state.
pub trait HiddenState {
    fn hidden(&self) -> &Tensor;
}

impl HiddenState for rnn::GRUState {
    fn hidden(&self) -> &Tensor {
        self.h()
    }
}

impl HiddenState for rnn::LSTMState {
    fn hidden(&self) -> &Tensor {
        self.h()
    }
}

impl<R> Recurrent<R>
where
    R: RNN,
    R::State: HiddenState,
{
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let (_batch_size, seq_len, _) = xs.dims3()?;
        if seq_len == 0 {
            return Err(candle_core::Error::Msg(
                "recurrent layer received an empty sequence".to_string(),
            ));
        }

        let states = self.rnn.seq(xs)?;
        if self.return_sequences {
            // (batch, hidden) per step -> (batch, seq_len, hidden)
            let hidden: Vec<Tensor> = states.iter().map(|s| s.hidden().clone()).collect();
            Tensor::stack(&hidden, 1)
        } else {
            match states.last() {
                Some(state) => Ok(state.hidden().clone()),
                None => Err(candle_core::Error::Msg(
                    "recurrent layer produced no states".to_string(),
                )),
            }
        }
    }
}
