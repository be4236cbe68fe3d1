//! In-processing mitigation: models that trade accuracy against group
//! fairness during training

mod grid_search;
mod prejudice_remover;

pub use grid_search::GridSearchReduction;
pub use prejudice_remover::PrejudiceRemover;
