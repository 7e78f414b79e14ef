use ndarray::Array2;
use pdr_classifiers::models::cnn_gru::build_cnn_gru_model;
use pdr_classifiers::models::lstm::build_lstm_model;
use pdr_classifiers::models::mlp::build_mlp_model;
use pdr_classifiers::{Classifier, ClassifierError, ClassifierParams, FeatureCheck, SequenceClassifier};

/// `n_per_class` rows for each label, every feature close to the label value.
fn labelled_sequences(labels: &[i32], n_per_class: usize, n_features: usize) -> (Array2<f32>, Vec<i32>) {
    let mut data = Vec::new();
    let mut y = Vec::new();
    for i in 0..n_per_class {
        for &label in labels {
            for j in 0..n_features {
                let jitter = ((i * 7 + j * 3) % 5) as f32 * 0.05;
                data.push(label as f32 + jitter);
            }
            y.push(label);
        }
    }
    let x = Array2::from_shape_vec((y.len(), n_features), data).expect("failed to create feature matrix");
    (x, y)
}

fn assert_rows_are_distributions(probs: &Array2<f32>) {
    for row in probs.rows() {
        assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)), "{:?}", row);
        assert!((row.sum() - 1.0).abs() < 1e-5, "{:?}", row);
    }
}

#[test]
fn binary_problem_yields_two_probability_columns() {
    let (x, y) = labelled_sequences(&[0, 1], 6, 8);
    let mut clf = SequenceClassifier::new(build_cnn_gru_model, ClassifierParams::new(2, 4, 0, Some(3))).unwrap();
    clf.fit(&x, &y).unwrap();

    let probs = clf.predict_proba(&x).unwrap();
    assert_eq!(probs.dim(), (12, 2));
    assert_rows_are_distributions(&probs);

    let predictions = clf.predict(&x).unwrap();
    assert_eq!(predictions.len(), 12);
    assert!(predictions.iter().all(|p| *p == 0 || *p == 1));
}

#[test]
fn multiclass_problem_maps_back_to_original_labels() {
    let labels = [1, 4, 9];
    let (x, y) = labelled_sequences(&labels, 4, 6);
    let mut clf = SequenceClassifier::new(build_lstm_model, ClassifierParams::new(2, 8, 0, Some(5))).unwrap();
    clf.fit(&x, &y).unwrap();

    assert_eq!(clf.classes(), Some(&labels[..]));
    let probs = clf.predict_proba(&x).unwrap();
    assert_eq!(probs.dim(), (12, 3));
    assert_rows_are_distributions(&probs);

    let predictions = clf.predict(&x).unwrap();
    assert!(predictions.iter().all(|p| labels.contains(p)));
}

#[test]
fn predicting_before_fit_is_a_state_error() {
    let clf = SequenceClassifier::new(build_cnn_gru_model, ClassifierParams::default()).unwrap();
    let x = Array2::<f32>::zeros((2, 5));
    let err = clf.predict_proba(&x).unwrap_err();
    assert!(err.is_state_error());
    assert!(matches!(clf.predict(&x).unwrap_err(), ClassifierError::NotFitted));
}

#[test]
fn seeded_adapters_train_identical_weights() {
    let (x, y) = labelled_sequences(&[0, 2, 3], 5, 4);
    let params = ClassifierParams::new(4, 4, 0, Some(42));

    let mut first = SequenceClassifier::new(build_mlp_model, params.clone()).unwrap();
    let mut second = SequenceClassifier::new(build_mlp_model, params).unwrap();
    first.fit(&x, &y).unwrap();
    second.fit(&x, &y).unwrap();

    let a = first.trained_parameters().unwrap();
    let b = second.trained_parameters().unwrap();
    assert_eq!(a.keys().collect::<Vec<_>>(), b.keys().collect::<Vec<_>>());
    for (name, values) in &a {
        for (u, v) in values.iter().zip(&b[name]) {
            assert!((u - v).abs() < 1e-5, "{} differs: {} vs {}", name, u, v);
        }
    }

    let pa = first.predict_proba(&x).unwrap();
    let pb = second.predict_proba(&x).unwrap();
    assert!(pa.iter().zip(pb.iter()).all(|(u, v)| (u - v).abs() < 1e-5));
    assert_eq!(first.predict(&x).unwrap(), second.predict(&x).unwrap());
}

#[test]
fn refitting_a_seeded_adapter_reproduces_the_first_fit() {
    let (x, y) = labelled_sequences(&[0, 1], 5, 4);
    let mut clf = SequenceClassifier::new(build_mlp_model, ClassifierParams::new(3, 4, 0, Some(8))).unwrap();

    clf.fit(&x, &y).unwrap();
    let before = clf.predict_proba(&x).unwrap();
    clf.fit(&x, &y).unwrap();
    let after = clf.predict_proba(&x).unwrap();

    assert!(before.iter().zip(after.iter()).all(|(u, v)| (u - v).abs() < 1e-5));
}

#[test]
fn refit_replaces_classes_and_feature_count() {
    let mut clf = SequenceClassifier::new(build_mlp_model, ClassifierParams::new(2, 4, 0, Some(1))).unwrap();

    let (x, y) = labelled_sequences(&[0, 1], 4, 3);
    clf.fit(&x, &y).unwrap();
    assert_eq!(clf.n_features(), Some(3));

    let (x, y) = labelled_sequences(&[2, 5, 7, 8], 3, 6);
    clf.fit(&x, &y).unwrap();
    assert_eq!(clf.n_features(), Some(6));
    assert_eq!(clf.classes(), Some(&[2, 5, 7, 8][..]));
    assert_eq!(clf.predict_proba(&x).unwrap().ncols(), 4);
}

#[test]
fn strict_feature_check_rejects_other_widths() {
    let (x, y) = labelled_sequences(&[0, 1], 4, 8);
    let mut clf = SequenceClassifier::new(build_cnn_gru_model, ClassifierParams::new(1, 8, 0, Some(2))).unwrap();
    clf.fit(&x, &y).unwrap();

    let narrow = Array2::<f32>::zeros((3, 5));
    match clf.predict_proba(&narrow) {
        Err(ClassifierError::FeatureMismatch { expected, actual }) => {
            assert_eq!(expected, 8);
            assert_eq!(actual, 5);
        }
        other => panic!("expected a feature mismatch, got {:?}", other.map(|p| p.dim())),
    }
}

#[test]
fn lenient_feature_check_lets_length_agnostic_models_predict() {
    let (x, y) = labelled_sequences(&[0, 1], 4, 8);
    let params = ClassifierParams::new(1, 8, 0, Some(2)).with_feature_check(FeatureCheck::Lenient);
    let mut clf = SequenceClassifier::new(build_cnn_gru_model, params).unwrap();
    clf.fit(&x, &y).unwrap();

    let longer = Array2::<f32>::ones((3, 12));
    let probs = clf.predict_proba(&longer).unwrap();
    assert_eq!(probs.dim(), (3, 2));
    assert_rows_are_distributions(&probs);
}

#[test]
fn batch_size_larger_than_dataset_still_trains() {
    let (x, y) = labelled_sequences(&[0, 1], 2, 4);
    let mut clf = SequenceClassifier::new(build_mlp_model, ClassifierParams::new(2, 512, 0, Some(4))).unwrap();
    clf.fit(&x, &y).unwrap();
    assert_eq!(clf.history().unwrap().epochs_run(), 2);
}

#[test]
fn single_class_and_negative_labels_are_rejected() {
    let mut clf = SequenceClassifier::new(build_mlp_model, ClassifierParams::new(1, 4, 0, None)).unwrap();
    let x = Array2::<f32>::zeros((4, 3));
    assert!(matches!(clf.fit(&x, &[1, 1, 1, 1]).err(), Some(ClassifierError::InvalidInput(_))));
    assert!(matches!(clf.fit(&x, &[0, -1, 0, 1]).err(), Some(ClassifierError::InvalidInput(_))));
}

#[test]
fn separable_data_is_learned() {
    let (x, y) = labelled_sequences(&[0, 3], 20, 5);
    let mut params = ClassifierParams::new(60, 8, 0, Some(21));
    params.learning_rate = 1e-2;
    let mut clf = SequenceClassifier::new(build_mlp_model, params).unwrap();
    clf.fit(&x, &y).unwrap();

    let accuracy = Classifier::score(&clf, &x, &y).unwrap();
    assert!(accuracy >= 0.9, "accuracy {}", accuracy);
    let history = clf.history().unwrap();
    assert!(history.best_loss < history.epoch_losses[0]);
}

#[test]
fn seeded_cnn_gru_adapters_train_identical_weights() {
    let (x, y) = labelled_sequences(&[0, 1], 6, 8);
    let params = ClassifierParams::new(2, 4, 0, Some(17));

    let mut first = SequenceClassifier::new(build_cnn_gru_model, params.clone()).unwrap();
    let mut second = SequenceClassifier::new(build_cnn_gru_model, params).unwrap();
    first.fit(&x, &y).unwrap();
    second.fit(&x, &y).unwrap();

    let a = first.trained_parameters().unwrap();
    let b = second.trained_parameters().unwrap();
    assert!(a.keys().any(|name| name.contains("norm")));
    assert_eq!(a.keys().collect::<Vec<_>>(), b.keys().collect::<Vec<_>>());
    for (name, values) in &a {
        for (u, v) in values.iter().zip(&b[name]) {
            assert!((u - v).abs() < 1e-5, "{} differs: {} vs {}", name, u, v);
        }
    }
    assert_eq!(first.predict(&x).unwrap(), second.predict(&x).unwrap());
}

#[test]
fn early_stopping_ends_fit_and_restores_best_epoch() {
    // labels unrelated to the features, so the loss cannot keep falling
    let (x, _) = labelled_sequences(&[0, 1], 10, 4);
    let y: Vec<i32> = (0..x.nrows()).map(|i| i32::from((i * 7) % 3 == 0)).collect();

    let mut params = ClassifierParams::new(300, 4, 0, Some(13));
    params.learning_rate = 0.5;
    params.early_stopping_patience = 2;
    let mut clf = SequenceClassifier::new(build_mlp_model, params).unwrap();
    clf.fit(&x, &y).unwrap();

    let history = clf.history().unwrap();
    assert!(history.stopped_early);
    assert!(history.restored_best_weights);
    assert!(history.epochs_run() < 300);
    assert!(history.best_epoch < history.epochs_run());
    assert_eq!(history.epoch_losses[history.best_epoch], history.best_loss);
    let min_loss = history.epoch_losses.iter().cloned().fold(f32::INFINITY, f32::min);
    assert_eq!(history.best_loss, min_loss);

    let probs = clf.predict_proba(&x).unwrap();
    assert_rows_are_distributions(&probs);
}

#[test]
fn training_without_a_plateau_keeps_final_weights() {
    let (x, y) = labelled_sequences(&[0, 1], 4, 4);
    let mut params = ClassifierParams::new(3, 8, 0, Some(2));
    params.early_stopping_patience = 10;
    let mut clf = SequenceClassifier::new(build_mlp_model, params).unwrap();
    clf.fit(&x, &y).unwrap();

    let history = clf.history().unwrap();
    assert!(!history.stopped_early);
    assert!(!history.restored_best_weights);
    assert_eq!(history.epochs_run(), 3);
}
