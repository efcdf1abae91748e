//! Hand-position amplification.
//!
//! Once a hand is calibrated, its raw position is re-projected along the ray
//! from the comfort point through the hand: the fraction of the way to the
//! reach boundary the hand has travelled is fed through the active
//! [`ResponseCurve`], and the amplified hand is placed at the resulting
//! fraction along the same ray.
//!
//! Every tick is computed from scratch.  Degenerate geometry is not an error:
//! the raw hand position is passed through and the outcome records why.

use ergoreach_perception::geometry::{Ray, Sphere};
use ergoreach_perception::{Pose, Vec3};
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationStateMachine;
use crate::curve::ResponseCurve;

/// Why a hand position was passed through unamplified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughReason {
    /// The hand is not in the `Active` calibration state.
    NotCalibrated,
    /// The hand sits exactly on the comfort point.
    DegenerateDirection,
    /// The ray from the comfort point never leaves the reach boundary.
    NoBoundaryHit,
    /// The comfort point lies on the reach boundary.
    ZeroMaxReach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum AmplificationOutcome {
    Amplified,
    Passthrough(PassthroughReason),
}

/// Result of amplifying one hand for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Amplification {
    pub position: Vec3,
    pub outcome: AmplificationOutcome,
    /// `current_reach / max_reach`, when it could be computed.
    pub percent_reach: Option<f32>,
}

impl Amplification {
    fn passthrough(hand: Vec3, reason: PassthroughReason) -> Self {
        Self {
            position: hand,
            outcome: AmplificationOutcome::Passthrough(reason),
            percent_reach: None,
        }
    }

    pub fn is_amplified(&self) -> bool {
        self.outcome == AmplificationOutcome::Amplified
    }
}

/// Amplify `hand` given a world-space comfort point and reach boundary.
pub fn amplify<C: ResponseCurve + ?Sized>(
    hand: Vec3,
    comfort: Vec3,
    boundary: &Sphere,
    curve: &C,
) -> Amplification {
    let Some(ray) = Ray::new(comfort, hand - comfort) else {
        return Amplification::passthrough(hand, PassthroughReason::DegenerateDirection);
    };
    let Some(max_hit) = boundary.exit_point(&ray) else {
        return Amplification::passthrough(hand, PassthroughReason::NoBoundaryHit);
    };

    let current_reach = comfort.distance(hand);
    let max_reach = comfort.distance(max_hit);
    let Some(toward_max) = (max_hit - comfort).normalized().filter(|_| max_reach > 0.0) else {
        return Amplification::passthrough(hand, PassthroughReason::ZeroMaxReach);
    };

    let percent_reach = current_reach / max_reach;
    let magnitude = curve.evaluate(percent_reach) * max_reach;

    Amplification {
        position: comfort + toward_max * magnitude,
        outcome: AmplificationOutcome::Amplified,
        percent_reach: Some(percent_reach),
    }
}

/// Amplify one hand using its calibration and the shoulder's current pose.
pub fn amplify_hand<C: ResponseCurve + ?Sized>(
    calibration: &CalibrationStateMachine,
    hand: Vec3,
    shoulder: &Pose,
    curve: &C,
) -> Amplification {
    match calibration.calibration() {
        Some((comfort, boundary)) => amplify(
            hand,
            comfort.world(shoulder),
            &boundary.sphere(shoulder),
            curve,
        ),
        None => Amplification::passthrough(hand, PassthroughReason::NotCalibrated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{AmplificationCurve, CurveBank};
    use ergoreach_types::Side;

    fn approx_vec(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    fn unit_sphere() -> Sphere {
        Sphere::new(Vec3::zero(), 1.0)
    }

    fn sample_curve() -> AmplificationCurve {
        AmplificationCurve::piecewise_linear(&[(0.0, 0.0), (0.5, 0.3), (1.0, 1.0)]).unwrap()
    }

    #[test]
    fn half_reach_maps_through_curve() {
        let out = amplify(
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::zero(),
            &unit_sphere(),
            &sample_curve(),
        );
        assert!(out.is_amplified());
        assert!(approx_vec(out.position, Vec3::new(0.3, 0.0, 0.0)));
        assert!((out.percent_reach.unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn hand_at_comfort_point_is_passthrough() {
        let comfort = Vec3::new(0.1, 0.2, 0.3);
        let out = amplify(comfort, comfort, &unit_sphere(), &sample_curve());
        assert_eq!(
            out.outcome,
            AmplificationOutcome::Passthrough(PassthroughReason::DegenerateDirection)
        );
        assert_eq!(out.position, comfort);
    }

    #[test]
    fn near_comfort_point_stays_near_comfort_point() {
        let comfort = Vec3::new(0.0, 0.0, 0.2);
        let hand = comfort + Vec3::new(1e-4, 0.0, 0.0);
        let out = amplify(hand, comfort, &unit_sphere(), &sample_curve());
        assert!(out.is_amplified());
        assert!((out.position - comfort).length() < 1e-4);
    }

    #[test]
    fn identity_curve_returns_raw_hand() {
        let hand = Vec3::new(0.2, -0.3, 0.4);
        let out = amplify(
            hand,
            Vec3::new(0.0, 0.0, 0.1),
            &unit_sphere(),
            &AmplificationCurve::identity(),
        );
        assert!(approx_vec(out.position, hand));
    }

    #[test]
    fn beyond_boundary_is_not_clamped() {
        let mut curve = AmplificationCurve::identity();
        curve.set_extrapolation(crate::curve::Extrapolation::Linear);
        let out = amplify(Vec3::new(1.5, 0.0, 0.0), Vec3::zero(), &unit_sphere(), &curve);
        assert!((out.percent_reach.unwrap() - 1.5).abs() < 1e-5);
        assert!(approx_vec(out.position, Vec3::new(1.5, 0.0, 0.0)));
    }

    #[test]
    fn comfort_outside_boundary_is_passthrough() {
        let hand = Vec3::new(6.0, 0.0, 0.0);
        let out = amplify(hand, Vec3::new(5.0, 0.0, 0.0), &unit_sphere(), &sample_curve());
        assert_eq!(
            out.outcome,
            AmplificationOutcome::Passthrough(PassthroughReason::NoBoundaryHit)
        );
        assert_eq!(out.position, hand);
    }

    #[test]
    fn uncalibrated_hand_is_passthrough() {
        let cal = CalibrationStateMachine::new(Side::Left);
        let hand = Vec3::new(0.3, 1.0, 0.4);
        let out = amplify_hand(&cal, hand, &Pose::at(Vec3::zero()), &CurveBank::default());
        assert_eq!(
            out.outcome,
            AmplificationOutcome::Passthrough(PassthroughReason::NotCalibrated)
        );
        assert_eq!(out.position, hand);
    }

    #[test]
    fn calibrated_hand_amplifies_relative_to_shoulder() {
        let shoulder = Pose::at(Vec3::new(0.0, 1.4, 0.0));
        let mut cal = CalibrationStateMachine::new(Side::Right);
        cal.begin();
        cal.confirm(Vec3::new(0.0, 1.4, 0.0) + Vec3::new(0.0, 0.0, 0.2), &shoulder)
            .unwrap();
        cal.confirm(Vec3::new(0.0, 1.4, 1.0), &shoulder).unwrap();

        // comfort at z = 0.2, boundary exit at z = 1.0, hand at z = 0.6 => 50 %.
        let hand = Vec3::new(0.0, 1.4, 0.6);
        let out = amplify_hand(&cal, hand, &shoulder, &sample_curve());
        assert!(out.is_amplified());
        assert!(approx_vec(out.position, Vec3::new(0.0, 1.4, 0.2 + 0.3 * 0.8)));

        // Moving the body moves the comfort point and boundary with it.
        let moved = Pose::at(Vec3::new(2.0, 1.4, 0.0));
        let out = amplify_hand(&cal, hand + Vec3::new(2.0, 0.0, 0.0), &moved, &sample_curve());
        assert!(approx_vec(out.position, Vec3::new(2.0, 1.4, 0.2 + 0.3 * 0.8)));
    }

    #[test]
    fn serialises_outcome_tag() {
        let out = AmplificationOutcome::Passthrough(PassthroughReason::ZeroMaxReach);
        let json = serde_json::to_string(&out).unwrap();
        assert_eq!(json, r#"{"outcome":"passthrough","reason":"zero_max_reach"}"#);
    }
}
