use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ClassifierError, Result};

/// Whether `predict`/`predict_proba` check the feature count seen during `fit`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeatureCheck {
    /// Reject inputs whose column count differs from the fit-time count.
    #[default]
    Strict,
    /// Hand the input to the model as-is; the architecture decides whether
    /// a different sequence length is usable.
    Lenient,
}

/// Hyperparameters of a [`crate::SequenceClassifier`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ClassifierParams {
    pub epochs: usize,
    pub batch_size: usize,
    /// 0 = silent, 1 = per-epoch progress at `info` level.
    pub verbose: u8,
    pub random_seed: Option<u64>,
    pub learning_rate: f64,
    pub early_stopping_patience: usize,
    pub restore_best_weights: bool,
    pub device: String,
    pub feature_check: FeatureCheck,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            verbose: 0,
            random_seed: None,
            learning_rate: 1e-3,
            early_stopping_patience: 10,
            restore_best_weights: true,
            device: String::from("cpu"),
            feature_check: FeatureCheck::Strict,
        }
    }
}

impl ClassifierParams {
    pub fn new(epochs: usize, batch_size: usize, verbose: u8, random_seed: Option<u64>) -> Self {
        Self {
            epochs,
            batch_size,
            verbose,
            random_seed,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_feature_check(mut self, feature_check: FeatureCheck) -> Self {
        self.feature_check = feature_check;
        self
    }

    /// Reject hyperparameters that can never train a model.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(ClassifierError::Configuration(
                "epochs must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ClassifierError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ClassifierError::Configuration(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Built-in model architectures.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelArch {
    #[default]
    CnnGru,
    Lstm,
    Mlp,
}

impl ModelArch {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelArch::CnnGru => "cnn_gru",
            ModelArch::Lstm => "lstm",
            ModelArch::Mlp => "mlp",
        }
    }
}

impl FromStr for ModelArch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "cnn_gru" | "cnngru" => Ok(ModelArch::CnnGru),
            "lstm" => Ok(ModelArch::Lstm),
            "mlp" | "dense" => Ok(ModelArch::Mlp),
            _ => Err(format!(
                "Unknown model architecture: {}. Valid options are: cnn_gru, lstm, mlp",
                s
            )),
        }
    }
}

/// Architecture plus hyperparameters, as read from a JSON config file.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ModelConfig {
    pub model_arch: ModelArch,

    #[serde(flatten)]
    pub params: ClassifierParams,
}

impl ModelConfig {
    pub fn new(model_arch: ModelArch, params: ClassifierParams) -> Self {
        Self { model_arch, params }
    }

    /// Load a config file field by field. Missing or malformed fields fall
    /// back to their defaults with a warning instead of failing the load.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config_json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&config_json)
    }

    pub fn from_json_str(config_json: &str) -> anyhow::Result<Self> {
        let partial: serde_json::Value =
            serde_json::from_str(config_json).context("Config is not valid JSON")?;
        let mut config = ModelConfig::default();

        macro_rules! load_or_default {
            ($($target:ident).+ => $key:literal) => {
                if let Some(val) = partial.get($key) {
                    if let Ok(parsed) = serde_json::from_value(val.clone()) {
                        config.$($target).+ = parsed;
                    } else {
                        log::warn!(
                            "Config Invalid value for '{}', using default: {:?}",
                            $key,
                            config.$($target).+
                        );
                    }
                } else {
                    log::warn!(
                        "Config Missing field '{}', using default: {:?}",
                        $key,
                        config.$($target).+
                    );
                }
            };
        }

        load_or_default!(model_arch => "model_arch");
        load_or_default!(params.epochs => "epochs");
        load_or_default!(params.batch_size => "batch_size");
        load_or_default!(params.verbose => "verbose");
        load_or_default!(params.random_seed => "random_seed");
        load_or_default!(params.learning_rate => "learning_rate");
        load_or_default!(params.early_stopping_patience => "early_stopping_patience");
        load_or_default!(params.restore_best_weights => "restore_best_weights");
        load_or_default!(params.device => "device");
        load_or_default!(params.feature_check => "feature_check");

        Ok(config)
    }
}
