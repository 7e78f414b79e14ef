pub mod builder;
pub mod classifier_trait;
pub mod cnn_gru;
pub mod factory;
pub mod lstm;
pub mod mlp;
pub mod sequence_classifier;
pub mod training;
