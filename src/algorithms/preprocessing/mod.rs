//! Pre-processing algorithms: dataset in, adjusted dataset out

mod disparate_impact_remover;
mod reweighing;

pub use disparate_impact_remover::DisparateImpactRemover;
pub use reweighing::Reweighing;
