//! Privileged/unprivileged group definitions
//!
//! A [`GroupDescriptor`] names which protected-attribute values form the
//! privileged and unprivileged sides of a comparison. Descriptors are not
//! stored on datasets; callers pass them to metric engines and mitigation
//! algorithms per call, so the same dataset can be audited under different
//! group definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dataset::{values_equal, StructuredDataset};
use crate::error::{EquitasError, Result};

/// Defines the privileged and unprivileged groups for a fairness comparison.
///
/// Each side maps protected-attribute names to the encoded values that place
/// an instance in that side. When a side references several attributes, an
/// instance belongs to it only if every referenced attribute matches one of
/// the listed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupDescriptor {
    privileged: BTreeMap<String, Vec<f64>>,
    unprivileged: BTreeMap<String, Vec<f64>>,
}

impl GroupDescriptor {
    /// Create an empty descriptor. Populate it with [`with_privileged`] and
    /// [`with_unprivileged`] before use.
    ///
    /// [`with_privileged`]: GroupDescriptor::with_privileged
    /// [`with_unprivileged`]: GroupDescriptor::with_unprivileged
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion to the privileged side
    pub fn with_privileged(mut self, attribute: &str, values: &[f64]) -> Self {
        self.privileged.insert(attribute.to_string(), values.to_vec());
        self
    }

    /// Add a criterion to the unprivileged side
    pub fn with_unprivileged(mut self, attribute: &str, values: &[f64]) -> Self {
        self.unprivileged
            .insert(attribute.to_string(), values.to_vec());
        self
    }

    /// Build a descriptor from the privileged/unprivileged values a dataset
    /// declares for its protected attributes
    pub fn from_dataset(dataset: &StructuredDataset) -> Self {
        let mut descriptor = Self::new();
        for attr in dataset.protected_attributes() {
            descriptor = descriptor
                .with_privileged(&attr.name, &attr.privileged_values)
                .with_unprivileged(&attr.name, &attr.unprivileged_values);
        }
        descriptor
    }

    /// Criteria for one side of the comparison
    pub fn side(&self, privileged: bool) -> &BTreeMap<String, Vec<f64>> {
        if privileged {
            &self.privileged
        } else {
            &self.unprivileged
        }
    }

    /// Check that the descriptor defines two non-empty, mutually exclusive
    /// sides.
    ///
    /// The sides must share at least one attribute, and for every shared
    /// attribute the two value sets must be disjoint. This guarantees no
    /// instance can satisfy both sides at once.
    pub fn validate(&self) -> Result<()> {
        if self.privileged.is_empty() {
            return Err(EquitasError::ValidationError(
                "group descriptor has no privileged criteria".to_string(),
            ));
        }
        if self.unprivileged.is_empty() {
            return Err(EquitasError::ValidationError(
                "group descriptor has no unprivileged criteria".to_string(),
            ));
        }

        for (attribute, values) in self.privileged.iter().chain(self.unprivileged.iter()) {
            if values.is_empty() {
                return Err(EquitasError::ValidationError(format!(
                    "group criterion for '{}' lists no values",
                    attribute
                )));
            }
        }

        let mut shared = 0usize;
        for (attribute, priv_values) in &self.privileged {
            if let Some(unpriv_values) = self.unprivileged.get(attribute) {
                shared += 1;
                for pv in priv_values {
                    if unpriv_values.iter().any(|uv| values_equal(*pv, *uv)) {
                        return Err(EquitasError::ValidationError(format!(
                            "value {} of '{}' appears in both the privileged and \
                             unprivileged groups",
                            pv, attribute
                        )));
                    }
                }
            }
        }
        if shared == 0 {
            return Err(EquitasError::ValidationError(
                "privileged and unprivileged criteria share no attribute, so the \
                 groups cannot be proven disjoint"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Compute the membership mask for one side of the comparison.
    ///
    /// Fails with [`EquitasError::UndefinedGroup`] when a criterion references
    /// an attribute the dataset does not declare as protected, or a value that
    /// never occurs in the dataset.
    pub fn mask(&self, dataset: &StructuredDataset, privileged: bool) -> Result<Vec<bool>> {
        let criteria = self.side(privileged);
        let mut mask = vec![true; dataset.num_instances()];

        for (attribute, values) in criteria {
            let column = dataset.protected_column(attribute)?;
            for value in values {
                if !column.iter().any(|observed| values_equal(*observed, *value)) {
                    return Err(EquitasError::UndefinedGroup(format!(
                        "value {} of '{}' does not occur in the dataset",
                        value, attribute
                    )));
                }
            }
            for (i, flag) in mask.iter_mut().enumerate() {
                let observed = column[i];
                if !values.iter().any(|v| values_equal(observed, *v)) {
                    *flag = false;
                }
            }
        }

        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ProtectedAttribute;
    use ndarray::{array, Array1};

    fn two_attribute_dataset() -> StructuredDataset {
        let features = array![
            [1.0, 1.0, 10.0],
            [1.0, 0.0, 20.0],
            [0.0, 1.0, 30.0],
            [0.0, 0.0, 40.0],
        ];
        StructuredDataset::new(
            &["sex", "race", "hours"],
            features,
            "hired",
            Array1::from(vec![1.0, 0.0, 1.0, 0.0]),
            vec![
                ProtectedAttribute::new("sex", &[1.0], &[0.0]),
                ProtectedAttribute::new("race", &[1.0], &[0.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn validate_rejects_overlapping_sides() {
        let descriptor = GroupDescriptor::new()
            .with_privileged("sex", &[1.0])
            .with_unprivileged("sex", &[1.0, 0.0]);
        assert!(matches!(
            descriptor.validate(),
            Err(EquitasError::ValidationError(_))
        ));
    }

    #[test]
    fn validate_rejects_disjoint_attributes() {
        let descriptor = GroupDescriptor::new()
            .with_privileged("sex", &[1.0])
            .with_unprivileged("race", &[0.0]);
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn mask_intersects_criteria() {
        let dataset = two_attribute_dataset();
        let descriptor = GroupDescriptor::new()
            .with_privileged("sex", &[1.0])
            .with_privileged("race", &[1.0])
            .with_unprivileged("sex", &[0.0]);
        // Privileged requires sex == 1 AND race == 1.
        let mask = descriptor.mask(&dataset, true).unwrap();
        assert_eq!(mask, vec![true, false, false, false]);
        let mask = descriptor.mask(&dataset, false).unwrap();
        assert_eq!(mask, vec![false, false, true, true]);
    }

    #[test]
    fn mask_rejects_unknown_attribute() {
        let dataset = two_attribute_dataset();
        let descriptor = GroupDescriptor::new()
            .with_privileged("hours", &[10.0])
            .with_unprivileged("sex", &[0.0]);
        assert!(matches!(
            descriptor.mask(&dataset, true),
            Err(EquitasError::UndefinedGroup(_))
        ));
    }

    #[test]
    fn mask_rejects_unobserved_value() {
        let dataset = two_attribute_dataset();
        let descriptor = GroupDescriptor::new()
            .with_privileged("sex", &[2.0])
            .with_unprivileged("sex", &[0.0]);
        assert!(matches!(
            descriptor.mask(&dataset, true),
            Err(EquitasError::UndefinedGroup(_))
        ));
    }

    #[test]
    fn from_dataset_uses_declared_values() {
        let dataset = two_attribute_dataset();
        let descriptor = GroupDescriptor::from_dataset(&dataset);
        descriptor.validate().unwrap();
        let mask = descriptor.mask(&dataset, true).unwrap();
        assert_eq!(mask, vec![true, false, false, false]);
    }
}
