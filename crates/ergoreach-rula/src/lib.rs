//! RULA (Rapid Upper Limb Assessment) scoring.
//!
//! [`tables`] holds the constant lookup tables and their bounds-checked
//! accessors; [`scorer`] turns a posture sample into per-arm and trunk/neck
//! scores.

pub mod scorer;
pub mod tables;

pub use scorer::{INVALID_SCORE, LowerArmAdjustment, RulaAssessment, RulaScorer};
pub use tables::{Dimension, LowerBins, TableIndexError, UpperBins};
