//! [`RulaScorer`] – discretises posture angles and looks up RULA scores.
//!
//! Each arm gets an upper-limb score from [`UPPER`](crate::tables::UPPER);
//! trunk and neck share one score from [`LOWER`](crate::tables::LOWER).
//!
//! | Angle | 1 | 2 | 3 | 4 |
//! |---|---|---|---|---|
//! | shoulder | < 20 | < 45 | < 90 | ≥ 90 |
//! | lower arm | 60..=100 | otherwise | | |
//! | wrist (left) | < 5 | < 15 | ≥ 15 | |
//! | wrist (right) | < 10 | < 15 | ≥ 15 | |
//! | trunk lean | ≤ 0 | ≤ 20 | ≤ 60 | > 60 |
//! | neck tilt | 0..10 | 10..20 | ≥ 20 | < 0 |
//!
//! Postural adjustments add one bin each:
//! - lower arm: the hand crossed the body midline, **or** (only if it did not)
//!   the hand is out to the side beyond the shoulder;
//! - trunk: twist beyond 10°, side bend beyond 10°;
//! - neck: twist beyond 45°, roll beyond 45°.
//!
//! A bin combination outside the tables scores [`INVALID_SCORE`].
//!
//! # Example
//!
//! ```rust
//! use ergoreach_rula::scorer::{neck_bin, shoulder_bin, trunk_bin};
//!
//! assert_eq!(shoulder_bin(-50.0), 3);
//! assert_eq!(trunk_bin(0.0), 1);
//! assert_eq!(neck_bin(-5.0), 4);
//! ```

use ergoreach_perception::posture::{PostureAngles, PostureSample};
use ergoreach_perception::snapshot::BodyPose;
use ergoreach_types::Side;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::tables::{LowerBins, TableIndexError, UpperBins, lower_score, upper_score};

/// Score reported when a lookup falls outside the tables.
pub const INVALID_SCORE: i32 = -1;

/// Wrist twist is not tracked; its bin is fixed.
pub const WRIST_TWIST_BIN: u8 = 1;

const TRUNK_ADJUST_DEG: f32 = 10.0;
const NECK_ADJUST_DEG: f32 = 45.0;

// ────────────────────────────────────────────────────────────────────────────
// Bins
// ────────────────────────────────────────────────────────────────────────────

pub fn shoulder_bin(angle: f32) -> u8 {
    let a = angle.abs();
    if a < 20.0 {
        1
    } else if a < 45.0 {
        2
    } else if a < 90.0 {
        3
    } else {
        4
    }
}

pub fn lower_arm_bin(elbow: f32) -> u8 {
    if (60.0..=100.0).contains(&elbow.abs()) { 1 } else { 2 }
}

/// Wrist bin boundaries for one hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WristThresholds {
    pub neutral: f32,
    pub moderate: f32,
}

impl WristThresholds {
    pub const LEFT: Self = Self {
        neutral: 5.0,
        moderate: 15.0,
    };
    pub const RIGHT: Self = Self {
        neutral: 10.0,
        moderate: 15.0,
    };

    pub fn bin(&self, angle: f32) -> u8 {
        let a = angle.abs();
        if a < self.neutral {
            1
        } else if a < self.moderate {
            2
        } else {
            3
        }
    }
}

/// Trunk bin from the signed lean angle (positive = forward).
pub fn trunk_bin(lean: f32) -> u8 {
    if lean <= 0.0 {
        1
    } else if lean <= 20.0 {
        2
    } else if lean <= 60.0 {
        3
    } else {
        4
    }
}

/// Neck bin from the signed tilt angle; any extension scores 4.
pub fn neck_bin(tilt: f32) -> u8 {
    if tilt < 0.0 {
        4
    } else if tilt < 10.0 {
        1
    } else if tilt < 20.0 {
        2
    } else {
        3
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Adjustments
// ────────────────────────────────────────────────────────────────────────────

/// Which lower-arm adjustment fired for a hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowerArmAdjustment {
    #[default]
    None,
    MidlineCrossed,
    OutToSide,
}

impl LowerArmAdjustment {
    pub fn increment(self) -> u8 {
        match self {
            LowerArmAdjustment::None => 0,
            LowerArmAdjustment::MidlineCrossed | LowerArmAdjustment::OutToSide => 1,
        }
    }
}

/// Classify the hand of `side` against the body midline and its shoulder.
///
/// Uses the waist's lateral axis, oriented toward the right shoulder.
pub fn lower_arm_adjustment(body: &BodyPose, side: Side) -> LowerArmAdjustment {
    let waist = body.waist.position;
    let mut lateral = body.waist.right();
    if lateral.dot(body.right.shoulder.position - waist) < 0.0 {
        lateral = -lateral;
    }

    let arm = body.arm(side);
    let across = lateral.dot(arm.hand.position - waist);
    let outward = (arm.hand.position - arm.shoulder.position).dot(lateral);
    let (crossed, out) = match side {
        Side::Right => (across < 0.0, outward > 0.0),
        Side::Left => (across > 0.0, outward < 0.0),
    };

    if crossed {
        LowerArmAdjustment::MidlineCrossed
    } else if out {
        LowerArmAdjustment::OutToSide
    } else {
        LowerArmAdjustment::None
    }
}

pub fn trunk_adjustment(angles: &PostureAngles) -> u8 {
    u8::from(angles.trunk_twist.abs() > TRUNK_ADJUST_DEG)
        + u8::from(angles.trunk_side_bend.abs() > TRUNK_ADJUST_DEG)
}

pub fn neck_adjustment(angles: &PostureAngles) -> u8 {
    u8::from(angles.neck_twist.abs() > NECK_ADJUST_DEG)
        + u8::from(angles.neck_roll.abs() > NECK_ADJUST_DEG)
}

// ────────────────────────────────────────────────────────────────────────────
// Assessment
// ────────────────────────────────────────────────────────────────────────────

/// Upper-limb score of one arm, with the bins that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpperAssessment {
    pub bins: UpperBins,
    pub adjustment: LowerArmAdjustment,
    pub score: i32,
}

/// Trunk/neck score, with the bins that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowerAssessment {
    pub bins: LowerBins,
    pub score: i32,
}

/// Full RULA evaluation of one posture sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RulaAssessment {
    pub left: UpperAssessment,
    pub right: UpperAssessment,
    pub lower: LowerAssessment,
}

impl RulaAssessment {
    pub fn upper(&self, side: Side) -> &UpperAssessment {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// `true` when every lookup succeeded.
    pub fn is_valid(&self) -> bool {
        [self.left.score, self.right.score, self.lower.score]
            .iter()
            .all(|&s| s != INVALID_SCORE)
    }
}

/// Scores posture samples.  Holds no per-tick state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulaScorer {
    left_wrist: WristThresholds,
    right_wrist: WristThresholds,
}

impl Default for RulaScorer {
    fn default() -> Self {
        Self {
            left_wrist: WristThresholds::LEFT,
            right_wrist: WristThresholds::RIGHT,
        }
    }
}

impl RulaScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wrist_thresholds(mut self, side: Side, thresholds: WristThresholds) -> Self {
        match side {
            Side::Left => self.left_wrist = thresholds,
            Side::Right => self.right_wrist = thresholds,
        }
        self
    }

    pub fn wrist_thresholds(&self, side: Side) -> WristThresholds {
        match side {
            Side::Left => self.left_wrist,
            Side::Right => self.right_wrist,
        }
    }

    pub fn assess(&self, sample: &PostureSample) -> RulaAssessment {
        RulaAssessment {
            left: self.assess_upper(sample, Side::Left),
            right: self.assess_upper(sample, Side::Right),
            lower: self.assess_lower(&sample.angles),
        }
    }

    /// Upper-limb bins of one arm, adjustments applied.
    pub fn upper_bins(&self, sample: &PostureSample, side: Side) -> (UpperBins, LowerArmAdjustment) {
        let arm = sample.angles.arm(side);
        let adjustment = lower_arm_adjustment(&sample.body, side);
        let bins = UpperBins::new(
            shoulder_bin(arm.shoulder),
            self.wrist_thresholds(side).bin(arm.wrist),
            WRIST_TWIST_BIN,
            lower_arm_bin(arm.elbow) + adjustment.increment(),
        );
        (bins, adjustment)
    }

    /// Trunk/neck bins, adjustments applied.
    pub fn lower_bins(&self, angles: &PostureAngles) -> LowerBins {
        LowerBins::new(
            trunk_bin(angles.trunk_lean) + trunk_adjustment(angles),
            neck_bin(angles.neck_tilt) + neck_adjustment(angles),
        )
    }

    fn assess_upper(&self, sample: &PostureSample, side: Side) -> UpperAssessment {
        let (bins, adjustment) = self.upper_bins(sample, side);
        let score = or_sentinel(upper_score(bins), "upper");
        UpperAssessment {
            bins,
            adjustment,
            score,
        }
    }

    fn assess_lower(&self, angles: &PostureAngles) -> LowerAssessment {
        let bins = self.lower_bins(angles);
        LowerAssessment {
            bins,
            score: or_sentinel(lower_score(bins), "lower"),
        }
    }
}

/// Convert a lookup result into a score, logging out-of-range bins.
pub fn or_sentinel(result: Result<u8, TableIndexError>, table: &str) -> i32 {
    match result {
        Ok(score) => i32::from(score),
        Err(e) => {
            warn!(table, error = %e, "RULA lookup out of range");
            INVALID_SCORE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ergoreach_perception::posture::ArmAngles;
    use ergoreach_perception::snapshot::Arm;
    use ergoreach_perception::{Pose, Quaternion, Vec3};

    fn arm(shoulder_x: f32, hand_x: f32) -> Arm {
        Arm {
            shoulder: Pose::at(Vec3::new(shoulder_x, 1.4, 0.0)),
            elbow: Pose::at(Vec3::new(shoulder_x, 1.1, 0.0)),
            wrist: Pose::at(Vec3::new(hand_x, 1.1, 0.25)),
            hand: Pose::at(Vec3::new(hand_x, 1.1, 0.3)),
            controller: None,
        }
    }

    fn body(left_hand_x: f32, right_hand_x: f32) -> BodyPose {
        BodyPose {
            head: Pose::at(Vec3::new(0.0, 1.7, 0.0)),
            waist: Pose::at(Vec3::new(0.0, 1.0, 0.0)),
            left: arm(-0.2, left_hand_x),
            right: arm(0.2, right_hand_x),
        }
    }

    fn sample(body: BodyPose, angles: PostureAngles) -> PostureSample {
        PostureSample {
            body,
            angles,
            stale: false,
        }
    }

    fn arm_angles(shoulder: f32, elbow: f32, wrist: f32) -> ArmAngles {
        ArmAngles {
            shoulder,
            elbow,
            wrist,
        }
    }

    // ── Bins ────────────────────────────────────────────────────────────────

    #[test]
    fn shoulder_bins_use_absolute_angle() {
        assert_eq!(shoulder_bin(0.0), 1);
        assert_eq!(shoulder_bin(19.9), 1);
        assert_eq!(shoulder_bin(20.0), 2);
        assert_eq!(shoulder_bin(-44.0), 2);
        assert_eq!(shoulder_bin(89.0), 3);
        assert_eq!(shoulder_bin(90.0), 4);
        assert_eq!(shoulder_bin(170.0), 4);
    }

    #[test]
    fn lower_arm_bin_is_one_only_in_working_range() {
        assert_eq!(lower_arm_bin(60.0), 1);
        assert_eq!(lower_arm_bin(100.0), 1);
        assert_eq!(lower_arm_bin(59.9), 2);
        assert_eq!(lower_arm_bin(120.0), 2);
    }

    #[test]
    fn wrist_thresholds_differ_per_side() {
        assert_eq!(WristThresholds::LEFT.bin(7.0), 2);
        assert_eq!(WristThresholds::RIGHT.bin(7.0), 1);
        assert_eq!(WristThresholds::LEFT.bin(15.0), 3);
        assert_eq!(WristThresholds::RIGHT.bin(14.9), 2);
    }

    #[test]
    fn trunk_and_neck_bins_are_signed() {
        assert_eq!(trunk_bin(-10.0), 1);
        assert_eq!(trunk_bin(20.0), 2);
        assert_eq!(trunk_bin(60.0), 3);
        assert_eq!(trunk_bin(61.0), 4);
        assert_eq!(neck_bin(-0.1), 4);
        assert_eq!(neck_bin(0.0), 1);
        assert_eq!(neck_bin(10.0), 2);
        assert_eq!(neck_bin(25.0), 3);
    }

    // ── Adjustments ─────────────────────────────────────────────────────────

    #[test]
    fn hand_across_midline_is_detected() {
        let b = body(0.1, -0.1);
        assert_eq!(lower_arm_adjustment(&b, Side::Right), LowerArmAdjustment::MidlineCrossed);
        assert_eq!(lower_arm_adjustment(&b, Side::Left), LowerArmAdjustment::MidlineCrossed);
    }

    #[test]
    fn hand_out_to_side_is_detected() {
        let b = body(-0.4, 0.4);
        assert_eq!(lower_arm_adjustment(&b, Side::Right), LowerArmAdjustment::OutToSide);
        assert_eq!(lower_arm_adjustment(&b, Side::Left), LowerArmAdjustment::OutToSide);
    }

    #[test]
    fn hand_in_front_of_shoulder_needs_no_adjustment() {
        let b = body(-0.1, 0.1);
        assert_eq!(lower_arm_adjustment(&b, Side::Right), LowerArmAdjustment::None);
        assert_eq!(lower_arm_adjustment(&b, Side::Left), LowerArmAdjustment::None);
    }

    #[test]
    fn lateral_axis_follows_right_shoulder_when_waist_faces_backwards() {
        let mut b = body(-0.4, -0.1);
        b.waist.rotation = Quaternion::from_axis_angle(Vec3::up(), 180.0);
        assert_eq!(lower_arm_adjustment(&b, Side::Right), LowerArmAdjustment::MidlineCrossed);
        assert_eq!(lower_arm_adjustment(&b, Side::Left), LowerArmAdjustment::OutToSide);
    }

    #[test]
    fn midline_and_side_adjustments_never_stack() {
        let scorer = RulaScorer::new();
        let angles = PostureAngles {
            left: arm_angles(10.0, 80.0, 0.0),
            right: arm_angles(10.0, 80.0, 0.0),
            ..PostureAngles::default()
        };
        for i in -20..=20 {
            let x = i as f32 * 0.05;
            let s = sample(body(x, x), angles);
            for side in Side::BOTH {
                let (bins, _) = scorer.upper_bins(&s, side);
                assert!(bins.lower_arm <= 2, "x = {x}, {side}: {bins:?}");
            }
        }
    }

    #[test]
    fn trunk_and_neck_adjustments_are_independent() {
        let angles = PostureAngles {
            trunk_twist: -12.0,
            trunk_side_bend: 11.0,
            neck_twist: 46.0,
            neck_roll: 10.0,
            ..PostureAngles::default()
        };
        assert_eq!(trunk_adjustment(&angles), 2);
        assert_eq!(neck_adjustment(&angles), 1);
        assert_eq!(trunk_adjustment(&PostureAngles::default()), 0);
    }

    // ── Scoring ─────────────────────────────────────────────────────────────

    #[test]
    fn assessment_combines_bins_and_adjustments() {
        let angles = PostureAngles {
            left: arm_angles(30.0, 80.0, 3.0),
            right: arm_angles(30.0, 80.0, 12.0),
            trunk_lean: 30.0,
            trunk_twist: 15.0,
            neck_tilt: 5.0,
            neck_twist: 50.0,
            ..PostureAngles::default()
        };
        let a = RulaScorer::new().assess(&sample(body(-0.1, 0.4), angles));

        assert_eq!(a.left.bins, UpperBins::new(2, 1, 1, 1));
        assert_eq!(a.left.score, 2);

        assert_eq!(a.right.adjustment, LowerArmAdjustment::OutToSide);
        assert_eq!(a.right.bins, UpperBins::new(2, 2, 1, 2));
        assert_eq!(a.right.score, 3);

        assert_eq!(a.lower.bins, LowerBins::new(4, 2));
        assert_eq!(a.lower.score, 5);
        assert!(a.is_valid());
    }

    #[test]
    fn out_of_range_lookup_yields_sentinel() {
        assert_eq!(
            or_sentinel(upper_score(UpperBins::new(1, 1, 1, 4)), "upper"),
            INVALID_SCORE
        );
        assert_eq!(or_sentinel(lower_score(LowerBins::new(1, 1)), "lower"), 1);
    }

    #[test]
    fn stale_sample_scores_like_its_source() {
        let angles = PostureAngles {
            left: arm_angles(50.0, 40.0, 20.0),
            right: arm_angles(95.0, 70.0, 2.0),
            trunk_lean: 70.0,
            neck_tilt: -3.0,
            ..PostureAngles::default()
        };
        let fresh = sample(body(-0.1, 0.1), angles);
        let stale = PostureSample { stale: true, ..fresh };
        let scorer = RulaScorer::new();
        assert_eq!(scorer.assess(&fresh), scorer.assess(&stale));
    }

    #[test]
    fn custom_wrist_thresholds_apply() {
        let scorer = RulaScorer::new().with_wrist_thresholds(
            Side::Left,
            WristThresholds {
                neutral: 1.0,
                moderate: 2.0,
            },
        );
        let angles = PostureAngles {
            left: arm_angles(0.0, 80.0, 3.0),
            ..PostureAngles::default()
        };
        let (bins, _) = scorer.upper_bins(&sample(body(-0.1, 0.1), angles), Side::Left);
        assert_eq!(bins.wrist, 3);
    }
}
