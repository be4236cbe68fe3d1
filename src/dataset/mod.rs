//! Fairness-aware dataset abstractions
//!
//! Provides the core data containers for bias auditing:
//! - [`StructuredDataset`] - feature matrix, labels, scores, and per-instance
//!   weights with protected-attribute bookkeeping
//! - [`BinaryLabelDataset`] - two-valued labels with explicit
//!   favorable/unfavorable semantics
//! - [`GroupDescriptor`] - per-call privileged/unprivileged group definitions

mod structured;
mod binary_label;
mod group;

pub use structured::{
    DatasetConfig, ProtectedAttribute, StructuredDataset, StructuredDatasetBuilder,
};
pub use binary_label::BinaryLabelDataset;
pub use group::GroupDescriptor;

/// Tolerance for comparing encoded column values (labels, protected-attribute
/// codes). Values are exact encodings, not measurements, so the tolerance only
/// absorbs float round-trip noise.
pub(crate) const VALUE_TOL: f64 = 1e-10;

/// Compare two encoded values for equality
#[inline]
pub(crate) fn values_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < VALUE_TOL
}
