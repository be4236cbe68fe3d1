//! Integration test: fairness metrics over a scored hiring scenario

use equitas::prelude::*;
use ndarray::{Array1, Array2};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Six privileged and four unprivileged applicants with known outcomes
fn ground_truth() -> BinaryLabelDataset {
    let features = Array2::from_shape_vec(
        (10, 2),
        vec![
            1.0, 0.9, //
            1.0, 0.8, //
            1.0, 0.7, //
            1.0, 0.4, //
            1.0, 0.6, //
            1.0, 0.2, //
            0.0, 0.8, //
            0.0, 0.5, //
            0.0, 0.3, //
            0.0, 0.1, //
        ],
    )
    .unwrap();
    let labels = Array1::from(vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
    let inner = StructuredDataset::builder()
        .with_features(&["gender", "skill"], features)
        .with_labels("hired", labels)
        .with_protected_attribute(ProtectedAttribute::new("gender", &[1.0], &[0.0]))
        .build()
        .unwrap();
    BinaryLabelDataset::new(inner, 1.0, 0.0).unwrap()
}

/// Model predictions for the same applicants
fn predictions() -> BinaryLabelDataset {
    let labels = Array1::from(vec![1.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
    ground_truth().with_labels(labels).unwrap()
}

fn descriptor() -> GroupDescriptor {
    GroupDescriptor::new()
        .with_privileged("gender", &[1.0])
        .with_unprivileged("gender", &[0.0])
}

#[test]
fn test_dataset_base_rates_and_parity() {
    let dataset = ground_truth();
    let metric = BinaryLabelDatasetMetric::new(&dataset, descriptor()).unwrap();

    assert!(close(metric.base_rate(None).unwrap(), 0.6));
    assert!(close(metric.base_rate(Some(true)).unwrap(), 4.0 / 6.0));
    assert!(close(metric.base_rate(Some(false)).unwrap(), 0.5));
    assert!(close(
        metric.statistical_parity_difference().unwrap(),
        0.5 - 4.0 / 6.0
    ));
    assert!(close(metric.disparate_impact().unwrap(), 0.75));
}

#[test]
fn test_dataset_metric_respects_weights() {
    // Doubling the weight of every unprivileged favorable row lifts the
    // unprivileged base rate from 1/2 to 2/3
    let dataset = ground_truth();
    let weights = Array1::from(vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 1.0, 1.0]);
    let weighted = dataset.with_weights(weights).unwrap();
    let metric = BinaryLabelDatasetMetric::new(&weighted, descriptor()).unwrap();

    assert!(close(metric.base_rate(Some(false)).unwrap(), 4.0 / 6.0));
    assert!(close(metric.statistical_parity_difference().unwrap(), 0.0));
    assert!(close(metric.disparate_impact().unwrap(), 1.0));
}

#[test]
fn test_consistency_rewards_similar_treatment() {
    // Labels track the skill feature: near neighbors share outcomes
    let features = Array2::from_shape_vec(
        (6, 2),
        vec![1.0, 0.9, 1.0, 0.92, 1.0, 0.88, 0.0, 0.1, 0.0, 0.12, 0.0, 0.08],
    )
    .unwrap();
    let labels = Array1::from(vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    let inner = StructuredDataset::builder()
        .with_features(&["gender", "skill"], features)
        .with_labels("hired", labels)
        .with_protected_attribute(ProtectedAttribute::new("gender", &[1.0], &[0.0]))
        .build()
        .unwrap();
    let dataset = BinaryLabelDataset::new(inner, 1.0, 0.0).unwrap();

    let metric = BinaryLabelDatasetMetric::new(&dataset, descriptor()).unwrap();
    assert!(close(metric.consistency(3).unwrap(), 1.0));
}

#[test]
fn test_classification_confusion_matrix_per_group() {
    let (truth, classified) = (ground_truth(), predictions());
    let metric = ClassificationMetric::new(&truth, &classified, descriptor()).unwrap();

    let privileged = metric.confusion_matrix(Some(true)).unwrap();
    assert!(close(privileged.true_positives, 3.0));
    assert!(close(privileged.false_negatives, 1.0));
    assert!(close(privileged.false_positives, 1.0));
    assert!(close(privileged.true_negatives, 1.0));

    let unprivileged = metric.confusion_matrix(Some(false)).unwrap();
    assert!(close(unprivileged.true_positives, 1.0));
    assert!(close(unprivileged.false_negatives, 1.0));
    assert!(close(unprivileged.false_positives, 0.0));
    assert!(close(unprivileged.true_negatives, 2.0));
}

#[test]
fn test_classification_rates_and_differences() {
    let (truth, classified) = (ground_truth(), predictions());
    let metric = ClassificationMetric::new(&truth, &classified, descriptor()).unwrap();

    assert!(close(metric.true_positive_rate(Some(true)).unwrap(), 0.75));
    assert!(close(metric.true_positive_rate(Some(false)).unwrap(), 0.5));
    assert!(close(metric.false_positive_rate(Some(true)).unwrap(), 0.5));
    assert!(close(metric.false_positive_rate(Some(false)).unwrap(), 0.0));

    assert!(close(metric.equal_opportunity_difference().unwrap(), -0.25));
    assert!(close(metric.average_odds_difference().unwrap(), -0.375));
    assert!(close(metric.average_abs_odds_difference().unwrap(), 0.375));

    assert!(close(metric.selection_rate(Some(true)).unwrap(), 4.0 / 6.0));
    assert!(close(metric.selection_rate(Some(false)).unwrap(), 0.25));
    assert!(close(
        metric.statistical_parity_difference().unwrap(),
        0.25 - 4.0 / 6.0
    ));
    assert!(close(metric.disparate_impact().unwrap(), 0.375));

    assert!(close(metric.accuracy(None).unwrap(), 0.7));
    assert!(close(metric.error_rate(None).unwrap(), 0.3));
}

#[test]
fn test_performance_measures_bundle() {
    let (truth, classified) = (ground_truth(), predictions());
    let metric = ClassificationMetric::new(&truth, &classified, descriptor()).unwrap();
    let measures = metric.performance_measures(Some(true)).unwrap();

    assert!(close(measures.true_positive_rate, 0.75));
    assert!(close(measures.false_positive_rate, 0.5));
    assert!(close(measures.positive_predictive_value, 0.75));
    assert!(close(measures.accuracy, 4.0 / 6.0));
}

#[test]
fn test_entropy_indices_are_zero_for_perfect_predictions() {
    let truth = ground_truth();
    let metric = ClassificationMetric::new(&truth, &truth, descriptor()).unwrap();

    assert!(close(metric.theil_index().unwrap(), 0.0));
    assert!(close(metric.generalized_entropy_index(2.0).unwrap(), 0.0));
}

#[test]
fn test_entropy_indices_grow_with_disparity() {
    let (truth, classified) = (ground_truth(), predictions());
    let metric = ClassificationMetric::new(&truth, &classified, descriptor()).unwrap();

    let theil = metric.theil_index().unwrap();
    assert!(theil > 0.0 && theil.is_finite());
    let ge2 = metric.generalized_entropy_index(2.0).unwrap();
    assert!(ge2 > 0.0 && ge2.is_finite());
}

#[test]
fn test_misalignment_blocks_classification_metric() {
    let truth = ground_truth();
    let mut features = truth.features().clone();
    features[[0, 0]] = 0.0; // different gender column means different rows
    let shuffled = truth.with_features(features).unwrap();

    assert!(ClassificationMetric::new(&truth, &shuffled, descriptor()).is_err());
}

#[test]
fn test_single_group_audit_fails_on_empty_side() {
    // Unprivileged rows stay present but carry zero weight
    let dataset = ground_truth();
    let zeroed = dataset
        .with_weights(Array1::from(vec![
            1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0,
        ]))
        .unwrap();
    let metric = BinaryLabelDatasetMetric::new(&zeroed, descriptor()).unwrap();

    assert!(metric.base_rate(Some(true)).is_ok());
    assert!(matches!(
        metric.base_rate(Some(false)),
        Err(EquitasError::EmptyGroup(_))
    ));
}

#[test]
fn test_metric_engines_do_not_mutate_inputs() {
    let truth = ground_truth();
    let predicted = predictions();
    let truth_before = truth.clone();
    let predicted_before = predicted.clone();

    let dataset_metric = BinaryLabelDatasetMetric::new(&truth, descriptor()).unwrap();
    dataset_metric.statistical_parity_difference().unwrap();
    dataset_metric.consistency(3).unwrap();

    let classification = ClassificationMetric::new(&truth, &predicted, descriptor()).unwrap();
    classification.average_odds_difference().unwrap();
    classification.theil_index().unwrap();

    assert_eq!(truth, truth_before);
    assert_eq!(predicted, predicted_before);
}
