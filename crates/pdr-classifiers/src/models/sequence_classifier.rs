use candle_core::Device;
use candle_nn::VarMap;
use ndarray::Array2;
use std::collections::BTreeMap;

use crate::config::{ClassifierParams, FeatureCheck};
use crate::error::{ClassifierError, Result};
use crate::models::builder::{BuildContext, ModelBuilder, SequenceModel};
use crate::models::classifier_trait::Classifier;
use crate::models::training::{train_model, Targets, TrainingHistory, TrainingOptions};
use crate::probability::{argmax_rows, logits_to_probabilities, LabelEncoder};
use crate::seeding::{reinitialize_vars, SeedContext};
use crate::utils::{get_device, matrix_to_sequence_tensor, tensor_to_matrix};

/// State that only exists once `fit` has succeeded.
struct FittedState {
    model: Box<dyn SequenceModel>,
    varmap: VarMap,
    n_features: usize,
    encoder: LabelEncoder,
    history: TrainingHistory,
}

/// Deep-learning classifier behind a `fit` / `predict` / `predict_proba`
/// interface.
///
/// Rows of `X` are treated as univariate sequences of length `n_features`.
/// The network itself comes from a [`ModelBuilder`]; the adapter owns label
/// encoding, training, and the conversion of logits to class probabilities.
///
/// ```no_run
/// use ndarray::array;
/// use pdr_classifiers::models::mlp::build_mlp_model;
/// use pdr_classifiers::{ClassifierParams, SequenceClassifier};
///
/// let params = ClassifierParams::new(20, 16, 0, Some(7));
/// let mut clf = SequenceClassifier::new(build_mlp_model, params)?;
/// let x = array![[0.0f32, 0.1, 0.2], [1.0, 1.1, 1.2], [0.1, 0.0, 0.2], [1.2, 1.0, 1.1]];
/// clf.fit(&x, &[0, 1, 0, 1])?;
/// let labels = clf.predict(&x)?;
/// # Ok::<(), pdr_classifiers::ClassifierError>(())
/// ```
pub struct SequenceClassifier {
    builder: Box<dyn ModelBuilder>,
    params: ClassifierParams,
    device: Device,
    seed: SeedContext,
    name: String,
    state: Option<FittedState>,
}

impl SequenceClassifier {
    /// Validate `params` and resolve the compute device up front, so an
    /// unusable configuration is reported here rather than mid-training.
    pub fn new<B: ModelBuilder + 'static>(builder: B, params: ClassifierParams) -> Result<Self> {
        Self::from_boxed_builder(Box::new(builder), params)
    }

    pub fn from_boxed_builder(
        builder: Box<dyn ModelBuilder>,
        params: ClassifierParams,
    ) -> Result<Self> {
        params.validate()?;
        let device = get_device(&params.device)?;
        let seed = SeedContext::new(params.random_seed);
        Ok(Self {
            builder,
            params,
            device,
            seed,
            name: String::from("sequence_classifier"),
            state: None,
        })
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Sorted labels seen during the last successful fit.
    pub fn classes(&self) -> Option<&[i32]> {
        self.state.as_ref().map(|s| s.encoder.classes())
    }

    pub fn n_classes(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.encoder.n_classes())
    }

    pub fn n_features(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.n_features)
    }

    pub fn history(&self) -> Option<&TrainingHistory> {
        self.state.as_ref().map(|s| &s.history)
    }

    /// Train a fresh model on `x` (`(samples, features)`) and labels `y`.
    ///
    /// Any previous model is discarded first, including when this fit
    /// fails. With a seed configured, repeated fits on the same data yield
    /// the same trained weights.
    pub fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<&mut Self> {
        self.state = None;

        let (n_samples, n_features) = x.dim();
        if n_samples == 0 {
            return Err(ClassifierError::InvalidInput(
                "cannot fit on an empty sample matrix".to_string(),
            ));
        }
        if n_features == 0 {
            return Err(ClassifierError::InvalidInput(
                "samples must have at least one feature".to_string(),
            ));
        }
        if y.len() != n_samples {
            return Err(ClassifierError::InvalidInput(format!(
                "X has {} samples but y has {} labels",
                n_samples,
                y.len()
            )));
        }

        let encoder = LabelEncoder::fit(y)?;
        let n_classes = encoder.n_classes();
        log::debug!(
            "[{}] fitting on {} samples, {} features, classes {:?}",
            self.name,
            n_samples,
            n_features,
            encoder.classes()
        );

        self.seed.reset()?;
        let varmap = VarMap::new();
        let ctx = BuildContext::new(&varmap, &self.device, &self.seed);
        let model = self.builder.build(n_features, n_classes, &ctx)?;
        reinitialize_vars(&varmap, &self.seed)?;

        let xs = matrix_to_sequence_tensor(x, &self.device)?;
        let targets = Targets::new(&encoder.encode(y)?, n_classes, &self.device)?;
        let opts = TrainingOptions::from_params(&self.params, n_samples);
        let history = train_model(model.as_ref(), &varmap, &xs, &targets, &opts, &self.seed)?;

        self.state = Some(FittedState {
            model,
            varmap,
            n_features,
            encoder,
            history,
        });
        Ok(self)
    }

    /// Class probabilities, `(samples, n_classes)`, columns ordered as
    /// [`Self::classes`]. Every row sums to one.
    pub fn predict_proba(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let state = self.state.as_ref().ok_or(ClassifierError::NotFitted)?;
        self.check_features(state, x)?;

        let n_classes = state.encoder.n_classes();
        if x.nrows() == 0 {
            return Ok(Array2::zeros((0, n_classes)));
        }

        let xs = matrix_to_sequence_tensor(x, &self.device)?;
        let logits = state.model.forward_t(&xs, false)?;
        let probabilities = logits_to_probabilities(&logits, n_classes)?;
        tensor_to_matrix(&probabilities)
    }

    /// Most probable label per sample, drawn from [`Self::classes`].
    pub fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>> {
        let probabilities = self.predict_proba(x)?;
        let state = self.state.as_ref().ok_or(ClassifierError::NotFitted)?;
        Ok(argmax_rows(&probabilities)
            .into_iter()
            .map(|idx| state.encoder.decode(idx))
            .collect())
    }

    /// Flattened values of every trained variable, keyed by name.
    pub fn trained_parameters(&self) -> Result<BTreeMap<String, Vec<f32>>> {
        let state = self.state.as_ref().ok_or(ClassifierError::NotFitted)?;
        let data = state
            .varmap
            .data()
            .lock()
            .map_err(|_| ClassifierError::Configuration("variable map lock poisoned".into()))?;

        let mut parameters = BTreeMap::new();
        for (name, var) in data.iter() {
            let values = var.as_tensor().flatten_all()?.to_vec1::<f32>()?;
            parameters.insert(name.clone(), values);
        }
        Ok(parameters)
    }

    fn check_features(&self, state: &FittedState, x: &Array2<f32>) -> Result<()> {
        let actual = x.ncols();
        if actual == state.n_features {
            return Ok(());
        }
        match self.params.feature_check {
            FeatureCheck::Strict => Err(ClassifierError::FeatureMismatch {
                expected: state.n_features,
                actual,
            }),
            FeatureCheck::Lenient if actual == 0 => Err(ClassifierError::InvalidInput(
                "samples must have at least one feature".to_string(),
            )),
            FeatureCheck::Lenient => {
                log::debug!(
                    "[{}] predicting on {} features, fitted on {}",
                    self.name,
                    actual,
                    state.n_features
                );
                Ok(())
            }
        }
    }
}

impl Classifier for SequenceClassifier {
    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()> {
        SequenceClassifier::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>> {
        SequenceClassifier::predict(self, x)
    }

    fn predict_proba(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        SequenceClassifier::predict_proba(self, x)
    }

    fn classes(&self) -> Option<&[i32]> {
        SequenceClassifier::classes(self)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
