//! pdr-classifiers: deep-learning time-series classifiers behind a generic
//! classifier interface.
//!
//! The crate wraps `candle` models (CNN-GRU, LSTM and a small dense baseline)
//! in [`models::sequence_classifier::SequenceClassifier`], which exposes
//! `fit` / `predict` / `predict_proba` over `ndarray` matrices. Model
//! construction is injected through the [`models::builder::ModelBuilder`]
//! trait so alternate architectures can be swapped in without touching the
//! adapter, and all randomness flows through an adapter-scoped
//! [`seeding::SeedContext`].
pub mod building_blocks;
pub mod config;
pub mod error;
pub mod models;
pub mod probability;
pub mod seeding;
pub mod utils;

pub use config::{FeatureCheck, ModelArch, ModelConfig, ClassifierParams};
pub use error::ClassifierError;
pub use models::classifier_trait::Classifier;
pub use models::sequence_classifier::SequenceClassifier;
