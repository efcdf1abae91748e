//! Reach amplification for VR hands.
//!
//! - [`calibration`] – per-hand comfort point / max-reach calibration.
//! - [`curve`] – the tunable response curve and its preset bank.
//! - [`amplifier`] – maps a raw hand position to its amplified position.

pub mod amplifier;
pub mod calibration;
pub mod curve;

pub use amplifier::{Amplification, AmplificationOutcome, PassthroughReason, amplify, amplify_hand};
pub use calibration::{CalibrationStateMachine, ComfortPoint, ReachBoundary};
pub use curve::{AmplificationCurve, CurveBank, CurveError, Extrapolation, Keyframe, ResponseCurve, TangentMode};
