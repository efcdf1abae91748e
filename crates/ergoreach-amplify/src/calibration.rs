//! Per-hand amplification calibration.
//!
//! Calibration is a two-step procedure driven by explicit operator commands:
//! the operator first confirms a comfortable hand position, then confirms
//! their maximum reach.  The resulting [`ComfortPoint`] and [`ReachBoundary`]
//! are stored relative to the shoulder so they follow the operator's body.
//!
//! # Example
//!
//! ```rust
//! use ergoreach_amplify::calibration::CalibrationStateMachine;
//! use ergoreach_perception::{Pose, Vec3};
//! use ergoreach_types::{CalibrationStatus, Side};
//!
//! let shoulder = Pose::at(Vec3::new(0.2, 1.4, 0.0));
//! let mut cal = CalibrationStateMachine::new(Side::Right);
//!
//! cal.begin();
//! cal.confirm(Vec3::new(0.2, 1.2, 0.3), &shoulder).unwrap();
//! cal.confirm(Vec3::new(0.2, 1.4, 0.7), &shoulder).unwrap();
//!
//! assert_eq!(cal.status(), CalibrationStatus::Active);
//! assert!((cal.max_reach_distance() - 0.7).abs() < 1e-5);
//! ```

use ergoreach_perception::geometry::Sphere;
use ergoreach_perception::{Pose, Vec3};
use ergoreach_types::{CalibrationStatus, ErgoError, Side};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Max-reach distance assumed before the first calibration completes (metres).
pub const DEFAULT_MAX_REACH: f32 = 0.75;

pub const PROMPT_COMFORT: &str = "Press Trigger at\ncomfortable position";
pub const PROMPT_MAX: &str = "Press Trigger at\nmax reach";

/// Prompt shown while a hand is not calibrating.
pub fn default_idle_prompt(side: Side) -> &'static str {
    match side {
        Side::Left => "Press X to calibrate",
        Side::Right => "Press A to calibrate",
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Calibration results
// ────────────────────────────────────────────────────────────────────────────

/// The operator's comfortable hand position, in the shoulder's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComfortPoint {
    local: Vec3,
}

impl ComfortPoint {
    /// Capture `hand` (world space) relative to `shoulder`.
    pub fn capture(hand: Vec3, shoulder: &Pose) -> Self {
        Self {
            local: shoulder.inverse_transform_point(hand),
        }
    }

    pub fn local(&self) -> Vec3 {
        self.local
    }

    /// World-space position given the shoulder's current pose.
    pub fn world(&self, shoulder: &Pose) -> Vec3 {
        shoulder.transform_point(self.local)
    }
}

/// Sphere around the shoulder marking the operator's maximum reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReachBoundary {
    radius: f32,
}

impl ReachBoundary {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// The boundary centred on the shoulder's current position.
    pub fn sphere(&self, shoulder: &Pose) -> Sphere {
        Sphere::new(shoulder.position, self.radius)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// State machine
// ────────────────────────────────────────────────────────────────────────────

/// Calibration state of one hand.
///
/// The status is `Active` only while both a [`ComfortPoint`] and a
/// [`ReachBoundary`] exist.
#[derive(Debug, Clone)]
pub struct CalibrationStateMachine {
    side: Side,
    status: CalibrationStatus,
    comfort: Option<ComfortPoint>,
    boundary: Option<ReachBoundary>,
    max_reach_distance: f32,
    reach_radius_scale: f32,
    idle_prompt: String,
}

impl CalibrationStateMachine {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            status: CalibrationStatus::Inactive,
            comfort: None,
            boundary: None,
            max_reach_distance: DEFAULT_MAX_REACH,
            reach_radius_scale: 1.0,
            idle_prompt: default_idle_prompt(side).to_string(),
        }
    }

    /// Replace the prompt shown while inactive.
    pub fn with_idle_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.idle_prompt = prompt.into();
        self
    }

    /// Multiply the measured max reach by `scale` when building the boundary.
    pub fn with_reach_radius_scale(mut self, scale: f32) -> Self {
        self.reach_radius_scale = scale;
        self
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn status(&self) -> CalibrationStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == CalibrationStatus::Active
    }

    /// Human-readable instruction for the current state.
    pub fn prompt(&self) -> &str {
        match self.status {
            CalibrationStatus::Inactive => &self.idle_prompt,
            CalibrationStatus::CalibrateComfort => PROMPT_COMFORT,
            CalibrationStatus::CalibrateMax => PROMPT_MAX,
            CalibrationStatus::Active => "",
        }
    }

    /// Distance from shoulder to hand measured at the last completed
    /// calibration, or [`DEFAULT_MAX_REACH`] before the first one.
    pub fn max_reach_distance(&self) -> f32 {
        self.max_reach_distance
    }

    pub fn comfort_point(&self) -> Option<&ComfortPoint> {
        self.comfort.as_ref()
    }

    pub fn reach_boundary(&self) -> Option<&ReachBoundary> {
        self.boundary.as_ref()
    }

    /// Start (or restart) calibration, discarding any previous result.
    pub fn begin(&mut self) -> CalibrationStatus {
        self.comfort = None;
        self.boundary = None;
        self.status = CalibrationStatus::CalibrateComfort;
        info!(side = %self.side, "calibration started");
        self.status
    }

    /// Confirm the current step with the hand and shoulder poses of this tick.
    ///
    /// Ignored outside the two calibrating states.  Non-finite poses, and a
    /// max reach of zero length, are rejected and leave the state unchanged.
    pub fn confirm(&mut self, hand: Vec3, shoulder: &Pose) -> Result<CalibrationStatus, ErgoError> {
        match self.status {
            CalibrationStatus::Inactive | CalibrationStatus::Active => {
                debug!(side = %self.side, status = ?self.status, "confirm ignored");
                return Ok(self.status);
            }
            _ => {}
        }

        if !hand.is_finite() || !shoulder.is_finite() {
            return Err(self.error("non-finite joint pose"));
        }

        match self.status {
            CalibrationStatus::CalibrateComfort => {
                let comfort = ComfortPoint::capture(hand, shoulder);
                debug!(side = %self.side, local = ?comfort.local(), "comfort point captured");
                self.comfort = Some(comfort);
                self.status = CalibrationStatus::CalibrateMax;
            }
            CalibrationStatus::CalibrateMax => {
                let reach = shoulder.position.distance(hand);
                let radius = reach * self.reach_radius_scale;
                if !(radius > 0.0 && radius.is_finite()) {
                    return Err(self.error(&format!("degenerate reach boundary radius {radius}")));
                }
                self.max_reach_distance = reach;
                self.boundary = Some(ReachBoundary::new(radius));
                self.status = CalibrationStatus::Active;
                info!(side = %self.side, max_reach = reach, radius, "calibration complete");
            }
            CalibrationStatus::Inactive | CalibrationStatus::Active => {}
        }
        Ok(self.status)
    }

    /// Comfort point and reach boundary, when calibrated.
    pub fn calibration(&self) -> Option<(ComfortPoint, ReachBoundary)> {
        match (self.status, self.comfort, self.boundary) {
            (CalibrationStatus::Active, Some(c), Some(b)) => Some((c, b)),
            _ => None,
        }
    }

    fn error(&self, details: &str) -> ErgoError {
        ErgoError::Calibration {
            side: self.side,
            details: details.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ergoreach_perception::Quaternion;

    fn shoulder() -> Pose {
        Pose::at(Vec3::new(0.2, 1.4, 0.0))
    }

    fn calibrated() -> CalibrationStateMachine {
        let mut cal = CalibrationStateMachine::new(Side::Right);
        cal.begin();
        cal.confirm(Vec3::new(0.2, 1.2, 0.3), &shoulder()).unwrap();
        cal.confirm(Vec3::new(0.2, 1.4, 0.6), &shoulder()).unwrap();
        cal
    }

    #[test]
    fn starts_inactive_with_default_prompt() {
        let left = CalibrationStateMachine::new(Side::Left);
        let right = CalibrationStateMachine::new(Side::Right);
        assert_eq!(left.status(), CalibrationStatus::Inactive);
        assert_eq!(left.prompt(), "Press X to calibrate");
        assert_eq!(right.prompt(), "Press A to calibrate");
        assert_eq!(left.max_reach_distance(), DEFAULT_MAX_REACH);
        assert!(left.calibration().is_none());
    }

    #[test]
    fn full_sequence_reaches_active() {
        let mut cal = CalibrationStateMachine::new(Side::Right);
        assert_eq!(cal.begin(), CalibrationStatus::CalibrateComfort);
        assert_eq!(cal.prompt(), PROMPT_COMFORT);

        let s = cal.confirm(Vec3::new(0.2, 1.2, 0.3), &shoulder()).unwrap();
        assert_eq!(s, CalibrationStatus::CalibrateMax);
        assert_eq!(cal.prompt(), PROMPT_MAX);
        assert!(cal.comfort_point().is_some());
        assert!(cal.reach_boundary().is_none());

        let s = cal.confirm(Vec3::new(0.2, 1.4, 0.6), &shoulder()).unwrap();
        assert_eq!(s, CalibrationStatus::Active);
        assert_eq!(cal.prompt(), "");
        assert!((cal.max_reach_distance() - 0.6).abs() < 1e-5);
        assert!((cal.reach_boundary().unwrap().radius() - 0.6).abs() < 1e-5);
    }

    #[test]
    fn confirm_is_ignored_when_inactive_or_active() {
        let mut cal = CalibrationStateMachine::new(Side::Left);
        assert_eq!(
            cal.confirm(Vec3::zero(), &shoulder()).unwrap(),
            CalibrationStatus::Inactive
        );
        assert!(cal.comfort_point().is_none());

        let mut cal = calibrated();
        let before = cal.calibration();
        assert_eq!(
            cal.confirm(Vec3::new(5.0, 5.0, 5.0), &shoulder()).unwrap(),
            CalibrationStatus::Active
        );
        assert_eq!(cal.calibration(), before);
    }

    #[test]
    fn begin_while_active_discards_previous_result() {
        let mut cal = calibrated();
        cal.begin();
        assert_eq!(cal.status(), CalibrationStatus::CalibrateComfort);
        assert!(cal.comfort_point().is_none());
        assert!(cal.reach_boundary().is_none());
        assert!(cal.calibration().is_none());
        // last measurement stays visible until the next one completes
        assert!((cal.max_reach_distance() - 0.6).abs() < 1e-5);
    }

    #[test]
    fn comfort_point_follows_shoulder() {
        let cal = calibrated();
        let (comfort, _) = cal.calibration().unwrap();
        assert!((comfort.local() - Vec3::new(0.0, -0.2, 0.3)).length() < 1e-5);

        let moved = Pose::new(
            Vec3::new(1.0, 1.4, 0.0),
            Quaternion::from_axis_angle(Vec3::up(), 90.0),
        );
        let world = comfort.world(&moved);
        // +Z local rotated 90° about +Y points along +X
        assert!((world - Vec3::new(1.3, 1.2, 0.0)).length() < 1e-4);
    }

    #[test]
    fn reach_scale_enlarges_boundary() {
        let mut cal = CalibrationStateMachine::new(Side::Left).with_reach_radius_scale(1.5);
        cal.begin();
        cal.confirm(Vec3::new(0.2, 1.2, 0.3), &shoulder()).unwrap();
        cal.confirm(Vec3::new(0.2, 1.4, 0.6), &shoulder()).unwrap();
        assert!((cal.reach_boundary().unwrap().radius() - 0.9).abs() < 1e-5);
        assert!((cal.max_reach_distance() - 0.6).abs() < 1e-5);
    }

    #[test]
    fn degenerate_inputs_are_rejected_without_transition() {
        let mut cal = CalibrationStateMachine::new(Side::Right);
        cal.begin();
        let err = cal
            .confirm(Vec3::new(f32::NAN, 0.0, 0.0), &shoulder())
            .unwrap_err();
        assert!(matches!(err, ErgoError::Calibration { side: Side::Right, .. }));
        assert_eq!(cal.status(), CalibrationStatus::CalibrateComfort);

        cal.confirm(Vec3::new(0.2, 1.2, 0.3), &shoulder()).unwrap();
        // hand exactly at the shoulder gives a zero-radius boundary
        assert!(cal.confirm(shoulder().position, &shoulder()).is_err());
        assert_eq!(cal.status(), CalibrationStatus::CalibrateMax);
    }

    #[test]
    fn custom_idle_prompt() {
        let cal = CalibrationStateMachine::new(Side::Left).with_idle_prompt("Hold grip");
        assert_eq!(cal.prompt(), "Hold grip");
    }
}
