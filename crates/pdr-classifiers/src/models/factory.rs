use crate::config::{ModelArch, ModelConfig};
use crate::error::Result;
use crate::models::builder::ModelBuilder;
use crate::models::classifier_trait::Classifier;
use crate::models::cnn_gru::build_cnn_gru_model;
use crate::models::lstm::build_lstm_model;
use crate::models::mlp::build_mlp_model;
use crate::models::sequence_classifier::SequenceClassifier;

pub fn model_builder(arch: ModelArch) -> Box<dyn ModelBuilder> {
    match arch {
        ModelArch::CnnGru => Box::new(build_cnn_gru_model),
        ModelArch::Lstm => Box::new(build_lstm_model),
        ModelArch::Mlp => Box::new(build_mlp_model),
    }
}

pub fn build_sequence_classifier(config: &ModelConfig) -> Result<SequenceClassifier> {
    let classifier =
        SequenceClassifier::from_boxed_builder(model_builder(config.model_arch), config.params.clone())?;
    Ok(classifier.with_name(config.model_arch.as_str()))
}

pub fn build_classifier(config: &ModelConfig) -> Result<Box<dyn Classifier>> {
    log::debug!("Building {} classifier", config.model_arch.as_str());
    Ok(Box::new(build_sequence_classifier(config)?))
}
