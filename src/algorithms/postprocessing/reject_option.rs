//! Reject option classification (Kamiran et al.)
//!
//! Searches for a score threshold and a critical band around it. Inside the
//! band, where the classifier is least certain, unprivileged instances are
//! granted the favorable label and privileged instances the unfavorable one;
//! outside it the threshold decides. The widest search keeps the rule whose
//! fairness metric lies within the bound and whose balanced accuracy is
//! highest.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::algorithms::{require_group_mass, PostProcessor};
use crate::dataset::{BinaryLabelDataset, GroupDescriptor};
use crate::error::{EquitasError, Result};
use crate::metrics::ClassificationMetric;

/// Group fairness metric the decision rule is tuned against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FairnessCriterion {
    StatisticalParity,
    AverageOdds,
    EqualOpportunity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct DecisionRule {
    threshold: f64,
    margin: f64,
}

/// Post-processor flipping uncertain predictions inside a critical band
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectOptionClassification {
    descriptor: GroupDescriptor,
    criterion: FairnessCriterion,
    num_thresholds: usize,
    num_margins: usize,
    metric_bound: f64,
    fitted: Option<DecisionRule>,
}

impl RejectOptionClassification {
    pub fn new(descriptor: GroupDescriptor) -> Self {
        Self {
            descriptor,
            criterion: FairnessCriterion::StatisticalParity,
            num_thresholds: 50,
            num_margins: 20,
            metric_bound: 0.05,
            fitted: None,
        }
    }

    pub fn with_criterion(mut self, criterion: FairnessCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_num_thresholds(mut self, num_thresholds: usize) -> Self {
        self.num_thresholds = num_thresholds.max(1);
        self
    }

    pub fn with_num_margins(mut self, num_margins: usize) -> Self {
        self.num_margins = num_margins.max(1);
        self
    }

    /// Set the tolerated absolute value of the chosen fairness metric
    pub fn with_metric_bound(mut self, bound: f64) -> Self {
        self.metric_bound = bound.abs();
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Selected `(threshold, margin)` pair, once fitted
    pub fn decision_rule(&self) -> Option<(f64, f64)> {
        self.fitted.map(|rule| (rule.threshold, rule.margin))
    }

    fn criterion_value(&self, metric: &ClassificationMetric<'_>) -> Result<f64> {
        match self.criterion {
            FairnessCriterion::StatisticalParity => metric.statistical_parity_difference(),
            FairnessCriterion::AverageOdds => metric.average_odds_difference(),
            FairnessCriterion::EqualOpportunity => metric.equal_opportunity_difference(),
        }
    }

    fn apply_rule(
        &self,
        classified: &BinaryLabelDataset,
        privileged: &[bool],
        unprivileged: &[bool],
        rule: DecisionRule,
    ) -> Array1<f64> {
        let favorable = classified.favorable_label();
        let unfavorable = classified.unfavorable_label();
        let scores = classified.scores();
        let labels: Vec<f64> = scores
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let by_threshold = if s > rule.threshold {
                    favorable
                } else {
                    unfavorable
                };
                if (s - rule.threshold).abs() <= rule.margin {
                    if unprivileged[i] {
                        favorable
                    } else if privileged[i] {
                        unfavorable
                    } else {
                        by_threshold
                    }
                } else {
                    by_threshold
                }
            })
            .collect();
        Array1::from(labels)
    }
}

impl PostProcessor for RejectOptionClassification {
    fn fit(&mut self, dataset: &BinaryLabelDataset, classified: &BinaryLabelDataset) -> Result<()> {
        self.descriptor.validate()?;
        dataset.align(classified)?;
        require_group_mass(classified, &self.descriptor)?;
        if classified
            .scores()
            .iter()
            .any(|s| !(0.0..=1.0).contains(s))
        {
            return Err(EquitasError::ValidationError(
                "scores must lie in [0, 1] to search decision thresholds".to_string(),
            ));
        }

        let privileged = self.descriptor.mask(classified.inner(), true)?;
        let unprivileged = self.descriptor.mask(classified.inner(), false)?;

        // (rule, |metric|, balanced accuracy), feasibility tracked separately
        let mut best_feasible: Option<(DecisionRule, f64)> = None;
        let mut least_violating: Option<(DecisionRule, f64)> = None;

        for ti in 0..self.num_thresholds {
            let threshold = (ti + 1) as f64 / (self.num_thresholds + 1) as f64;
            let max_margin = threshold.min(1.0 - threshold);
            for mi in 0..self.num_margins {
                let margin = if self.num_margins > 1 {
                    max_margin * mi as f64 / (self.num_margins - 1) as f64
                } else {
                    0.0
                };
                let rule = DecisionRule { threshold, margin };
                let labels = self.apply_rule(classified, &privileged, &unprivileged, rule);
                let adjusted = classified.with_labels(labels)?;
                let metric =
                    ClassificationMetric::new(dataset, &adjusted, self.descriptor.clone())?;
                let value = self.criterion_value(&metric)?;
                let balanced = 0.5
                    * (metric.true_positive_rate(None)? + metric.true_negative_rate(None)?);

                if value.abs() <= self.metric_bound {
                    let replace = match &best_feasible {
                        None => true,
                        Some((_, incumbent)) => balanced > *incumbent,
                    };
                    if replace {
                        best_feasible = Some((rule, balanced));
                    }
                } else {
                    let replace = match &least_violating {
                        None => true,
                        Some((_, incumbent)) => value.abs() < *incumbent,
                    };
                    if replace {
                        least_violating = Some((rule, value.abs()));
                    }
                }
            }
        }

        let rule = match (best_feasible, least_violating) {
            (Some((rule, balanced)), _) => {
                debug!(
                    threshold = rule.threshold,
                    margin = rule.margin,
                    balanced_accuracy = balanced,
                    "selected decision rule within the metric bound"
                );
                rule
            }
            (None, Some((rule, value))) => {
                warn!(
                    metric = value,
                    bound = self.metric_bound,
                    "no decision rule satisfied the bound; keeping the closest"
                );
                rule
            }
            (None, None) => {
                return Err(EquitasError::ComputationError(
                    "threshold search produced no candidates".to_string(),
                ))
            }
        };
        self.fitted = Some(rule);
        Ok(())
    }

    fn predict(&self, classified: &BinaryLabelDataset) -> Result<BinaryLabelDataset> {
        let rule = self
            .fitted
            .ok_or_else(|| EquitasError::NotFitted("RejectOptionClassification".to_string()))?;
        let privileged = self.descriptor.mask(classified.inner(), true)?;
        let unprivileged = self.descriptor.mask(classified.inner(), false)?;
        let labels = self.apply_rule(classified, &privileged, &unprivileged, rule);
        classified.with_labels(labels)
    }
}
