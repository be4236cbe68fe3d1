//! Calibrated equalized odds (Pleiss et al.)
//!
//! Equalizes a generalized error cost between the groups while keeping the
//! scores calibrated. The lower-cost group is mixed toward its trivial
//! predictor, the constant score equal to the group base rate, with exactly
//! the probability that lifts its cost to match the other group's.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::{require_group_mass, PostProcessor};
use crate::dataset::{BinaryLabelDataset, GroupDescriptor};
use crate::error::{EquitasError, Result};

/// Generalized error cost to equalize between the groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostConstraint {
    FalsePositiveRate,
    FalseNegativeRate,
    /// Base-rate-weighted combination of both rates
    Weighted,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct MixRates {
    privileged: f64,
    unprivileged: f64,
    privileged_base_rate: f64,
    unprivileged_base_rate: f64,
}

struct GroupStats {
    base_rate: f64,
    cost: f64,
    trivial_cost: f64,
}

/// Post-processor randomizing one group's scores toward its base rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibratedEqOddsPostprocessing {
    descriptor: GroupDescriptor,
    cost_constraint: CostConstraint,
    threshold: f64,
    seed: Option<u64>,
    fitted: Option<MixRates>,
}

impl CalibratedEqOddsPostprocessing {
    pub fn new(descriptor: GroupDescriptor) -> Self {
        Self {
            descriptor,
            cost_constraint: CostConstraint::Weighted,
            threshold: 0.5,
            seed: None,
            fitted: None,
        }
    }

    pub fn with_cost_constraint(mut self, cost_constraint: CostConstraint) -> Self {
        self.cost_constraint = cost_constraint;
        self
    }

    /// Set the score cutoff used to reassign labels after mixing
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Fix the randomization seed for reproducible mixing
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

/// Base rate and generalized cost of one group under the chosen constraint
fn group_stats(
    dataset: &BinaryLabelDataset,
    classified: &BinaryLabelDataset,
    mask: &[bool],
    constraint: CostConstraint,
    side: &str,
) -> Result<GroupStats> {
    let weights = dataset.weights();
    let favorable = dataset.favorable_mask();
    let scores = classified.scores();

    let mut mass = 0.0;
    let mut favorable_mass = 0.0;
    let mut gfpr_num = 0.0;
    let mut gfnr_num = 0.0;
    for i in 0..mask.len() {
        if !mask[i] {
            continue;
        }
        let w = weights[i];
        mass += w;
        if favorable[i] {
            favorable_mass += w;
            gfnr_num += w * (1.0 - scores[i]);
        } else {
            gfpr_num += w * scores[i];
        }
    }
    if mass <= 0.0 {
        return Err(EquitasError::EmptyGroup(format!(
            "{} group has zero weighted mass",
            side
        )));
    }
    let unfavorable_mass = mass - favorable_mass;
    let base_rate = favorable_mass / mass;

    let needs_gfpr = !matches!(constraint, CostConstraint::FalseNegativeRate);
    let needs_gfnr = !matches!(constraint, CostConstraint::FalsePositiveRate);
    if needs_gfpr && unfavorable_mass <= 0.0 {
        return Err(EquitasError::EmptyGroup(format!(
            "{} group has no unfavorable instances to define a false positive rate",
            side
        )));
    }
    if needs_gfnr && favorable_mass <= 0.0 {
        return Err(EquitasError::EmptyGroup(format!(
            "{} group has no favorable instances to define a false negative rate",
            side
        )));
    }

    let (cost, trivial_cost) = match constraint {
        CostConstraint::FalsePositiveRate => (gfpr_num / unfavorable_mass, base_rate),
        CostConstraint::FalseNegativeRate => (gfnr_num / favorable_mass, 1.0 - base_rate),
        CostConstraint::Weighted => {
            let gfpr = gfpr_num / unfavorable_mass;
            let gfnr = gfnr_num / favorable_mass;
            (
                0.5 * gfpr * (1.0 - base_rate) + 0.5 * gfnr * base_rate,
                base_rate * (1.0 - base_rate),
            )
        }
    };
    Ok(GroupStats {
        base_rate,
        cost,
        trivial_cost,
    })
}

/// Mixing probability lifting the low cost to the high one
fn mix_rate(high: f64, low: f64, trivial_low: f64) -> f64 {
    let denom = trivial_low - low;
    if denom.abs() <= f64::EPSILON {
        return 0.0;
    }
    ((high - low) / denom).clamp(0.0, 1.0)
}

impl PostProcessor for CalibratedEqOddsPostprocessing {
    fn fit(&mut self, dataset: &BinaryLabelDataset, classified: &BinaryLabelDataset) -> Result<()> {
        self.descriptor.validate()?;
        dataset.align(classified)?;
        require_group_mass(dataset, &self.descriptor)?;
        if classified
            .scores()
            .iter()
            .any(|s| !(0.0..=1.0).contains(s))
        {
            return Err(EquitasError::ValidationError(
                "scores must lie in [0, 1] to mix toward base rates".to_string(),
            ));
        }

        let privileged_mask = self.descriptor.mask(dataset.inner(), true)?;
        let unprivileged_mask = self.descriptor.mask(dataset.inner(), false)?;
        let privileged = group_stats(
            dataset,
            classified,
            &privileged_mask,
            self.cost_constraint,
            "privileged",
        )?;
        let unprivileged = group_stats(
            dataset,
            classified,
            &unprivileged_mask,
            self.cost_constraint,
            "unprivileged",
        )?;

        // Mix the cheaper group toward its own trivial predictor
        let (privileged_rate, unprivileged_rate) = if unprivileged.cost > privileged.cost {
            (
                mix_rate(unprivileged.cost, privileged.cost, privileged.trivial_cost),
                0.0,
            )
        } else {
            (
                0.0,
                mix_rate(privileged.cost, unprivileged.cost, unprivileged.trivial_cost),
            )
        };
        debug!(
            privileged_rate,
            unprivileged_rate,
            privileged_cost = privileged.cost,
            unprivileged_cost = unprivileged.cost,
            "fitted calibrated equalized odds mix rates"
        );

        self.fitted = Some(MixRates {
            privileged: privileged_rate,
            unprivileged: unprivileged_rate,
            privileged_base_rate: privileged.base_rate,
            unprivileged_base_rate: unprivileged.base_rate,
        });
        Ok(())
    }

    fn predict(&self, classified: &BinaryLabelDataset) -> Result<BinaryLabelDataset> {
        let rates = self
            .fitted
            .ok_or_else(|| EquitasError::NotFitted("CalibratedEqOddsPostprocessing".to_string()))?;
        let privileged = self.descriptor.mask(classified.inner(), true)?;
        let unprivileged = self.descriptor.mask(classified.inner(), false)?;

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut scores = classified.scores().clone();
        for i in 0..scores.len() {
            // One draw per group row keeps the stream aligned across rates
            if privileged[i] {
                if rng.gen::<f64>() <= rates.privileged {
                    scores[i] = rates.privileged_base_rate;
                }
            } else if unprivileged[i] {
                if rng.gen::<f64>() <= rates.unprivileged {
                    scores[i] = rates.unprivileged_base_rate;
                }
            }
        }

        let favorable = classified.favorable_label();
        let unfavorable = classified.unfavorable_label();
        let threshold = self.threshold;
        let labels = scores.mapv(|s| if s >= threshold { favorable } else { unfavorable });
        classified.with_scores(scores)?.with_labels(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{ProtectedAttribute, StructuredDataset};
    use ndarray::{array, Array1};

    fn truth() -> BinaryLabelDataset {
        let inner = StructuredDataset::new(
            &["group"],
            array![[1.0], [1.0], [0.0], [0.0]],
            "outcome",
            Array1::from(vec![1.0, 0.0, 1.0, 0.0]),
            vec![ProtectedAttribute::new("group", &[1.0], &[0.0])],
        )
        .unwrap();
        BinaryLabelDataset::new(inner, 1.0, 0.0).unwrap()
    }

    fn descriptor() -> GroupDescriptor {
        GroupDescriptor::new()
            .with_privileged("group", &[1.0])
            .with_unprivileged("group", &[0.0])
    }

    fn scored(scores: [f64; 4]) -> BinaryLabelDataset {
        let scores = Array1::from(scores.to_vec());
        let labels = scores.mapv(|s| if s >= 0.5 { 1.0 } else { 0.0 });
        truth().with_scores(scores).unwrap().with_labels(labels).unwrap()
    }

    #[test]
    fn test_weighted_mix_rate_on_skewed_scores() {
        // Privileged cost 0.05, unprivileged 0.15, trivial 0.25
        let dataset = truth();
        let classified = scored([0.9, 0.1, 0.7, 0.3]);
        let mut ceo = CalibratedEqOddsPostprocessing::new(descriptor());
        ceo.fit(&dataset, &classified).unwrap();

        let rates = ceo.fitted.unwrap();
        assert!((rates.privileged - 0.5).abs() < 1e-12);
        assert_eq!(rates.unprivileged, 0.0);
        assert!((rates.privileged_base_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_full_mix_replaces_scores_with_base_rate() {
        // The unprivileged scores sit exactly at the trivial predictor, so
        // the privileged group mixes with probability one
        let dataset = truth();
        let classified = scored([0.9, 0.1, 0.5, 0.5]);
        let mut ceo = CalibratedEqOddsPostprocessing::new(descriptor());
        let adjusted = ceo.fit_predict(&dataset, &classified).unwrap();

        assert!((ceo.fitted.unwrap().privileged - 1.0).abs() < 1e-12);
        assert_eq!(adjusted.scores()[0], 0.5);
        assert_eq!(adjusted.scores()[1], 0.5);
        assert_eq!(adjusted.scores()[2], 0.5);
        assert_eq!(adjusted.scores()[3], 0.5);
        assert_eq!(adjusted.labels(), &Array1::from(vec![1.0, 1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_seeded_predictions_are_reproducible() {
        let dataset = truth();
        let classified = scored([0.9, 0.1, 0.7, 0.3]);
        let mut ceo = CalibratedEqOddsPostprocessing::new(descriptor()).with_seed(11);
        ceo.fit(&dataset, &classified).unwrap();

        let first = ceo.predict(&classified).unwrap();
        let second = ceo.predict(&classified).unwrap();
        assert_eq!(first.scores(), second.scores());
        assert_eq!(first.labels(), second.labels());
    }

    #[test]
    fn test_false_negative_constraint_needs_favorable_instances() {
        // No unprivileged row has the favorable outcome
        let inner = StructuredDataset::new(
            &["group"],
            array![[1.0], [1.0], [0.0], [0.0]],
            "outcome",
            Array1::from(vec![1.0, 0.0, 0.0, 0.0]),
            vec![ProtectedAttribute::new("group", &[1.0], &[0.0])],
        )
        .unwrap();
        let dataset = BinaryLabelDataset::new(inner, 1.0, 0.0).unwrap();
        let classified = dataset
            .with_scores(Array1::from(vec![0.9, 0.1, 0.2, 0.1]))
            .unwrap();

        let mut ceo = CalibratedEqOddsPostprocessing::new(descriptor())
            .with_cost_constraint(CostConstraint::FalseNegativeRate);
        assert!(matches!(
            ceo.fit(&dataset, &classified),
            Err(EquitasError::EmptyGroup(_))
        ));
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let ceo = CalibratedEqOddsPostprocessing::new(descriptor());
        assert!(matches!(
            ceo.predict(&scored([0.9, 0.1, 0.7, 0.3])),
            Err(EquitasError::NotFitted(_))
        ));
    }

    #[test]
    fn test_threshold_is_clamped() {
        let ceo = CalibratedEqOddsPostprocessing::new(descriptor()).with_threshold(1.5);
        assert_eq!(ceo.threshold, 1.0);
    }
}
