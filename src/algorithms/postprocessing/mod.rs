//! Post-processing mitigation: adjustments applied to a trained model's
//! scored predictions, without touching the model itself

mod calibrated_eq_odds;
mod reject_option;

pub use calibrated_eq_odds::{CalibratedEqOddsPostprocessing, CostConstraint};
pub use reject_option::{FairnessCriterion, RejectOptionClassification};
