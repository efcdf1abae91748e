//! Per-tick joint snapshots.
//!
//! A [`PoseSnapshot`] is the immutable record an external pose provider hands
//! to the engine once per tick.  Every joint is optional because trackers drop
//! joints all the time.  [`PoseSnapshot::validate`] turns a snapshot into a
//! [`BodyPose`] whose required joints are guaranteed to be present and finite;
//! everything downstream works on `BodyPose` only.

use ergoreach_types::{ErgoError, Side};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::geometry::Pose;

// ────────────────────────────────────────────────────────────────────────────
// Raw snapshot
// ────────────────────────────────────────────────────────────────────────────

/// Tracked joints of one arm as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ArmJoints {
    #[serde(default)]
    pub shoulder: Option<Pose>,
    #[serde(default)]
    pub elbow: Option<Pose>,
    #[serde(default)]
    pub wrist: Option<Pose>,
    #[serde(default)]
    pub hand: Option<Pose>,
    /// Raw controller pose; only its orientation is used, and only for
    /// skeletal tracking.
    #[serde(default)]
    pub controller: Option<Pose>,
}

/// One tick's worth of tracked joint poses (world space).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct PoseSnapshot {
    #[serde(default)]
    pub head: Option<Pose>,
    #[serde(default)]
    pub waist: Option<Pose>,
    #[serde(default)]
    pub left: ArmJoints,
    #[serde(default)]
    pub right: ArmJoints,
}

impl PoseSnapshot {
    /// Joints of the requested arm.
    pub fn arm(&self, side: Side) -> &ArmJoints {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// `true` when every required joint is present, finite and carries a
    /// usable rotation.
    pub fn is_valid(&self) -> bool {
        self.missing_joints().is_empty()
    }

    /// Names of required joints that are absent, non-finite or carry a
    /// zero-norm rotation.
    pub fn missing_joints(&self) -> Vec<String> {
        let mut missing = Vec::new();
        let mut check = |name: String, pose: &Option<Pose>| {
            if resolve_pose(*pose).is_none() {
                missing.push(name);
            }
        };
        check("head".to_string(), &self.head);
        check("waist".to_string(), &self.waist);
        for side in Side::BOTH {
            let arm = self.arm(side);
            check(format!("{side}.shoulder"), &arm.shoulder);
            check(format!("{side}.elbow"), &arm.elbow);
            check(format!("{side}.wrist"), &arm.wrist);
            check(format!("{side}.hand"), &arm.hand);
        }
        missing
    }

    /// Resolve the snapshot into a [`BodyPose`].
    ///
    /// Every rotation is rescaled to unit length.  Returns
    /// [`ErgoError::InvalidTracking`] naming the missing joints when any
    /// required joint is absent, non-finite or has a zero-norm rotation.  A
    /// bad controller is dropped rather than rejected since it is optional.
    pub fn validate(&self) -> Result<BodyPose, ErgoError> {
        match (
            resolve_pose(self.head),
            resolve_pose(self.waist),
            Arm::resolve(&self.left),
            Arm::resolve(&self.right),
        ) {
            (Some(head), Some(waist), Some(left), Some(right)) => {
                Ok(BodyPose {
                    head,
                    waist,
                    left,
                    right,
                })
            }
            _ => Err(ErgoError::InvalidTracking(format!(
                "missing joints: {}",
                self.missing_joints().join(", ")
            ))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validated body pose
// ────────────────────────────────────────────────────────────────────────────

/// A fully-tracked arm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arm {
    pub shoulder: Pose,
    pub elbow: Pose,
    pub wrist: Pose,
    pub hand: Pose,
    pub controller: Option<Pose>,
}

impl Arm {
    fn resolve(joints: &ArmJoints) -> Option<Self> {
        Some(Self {
            shoulder: resolve_pose(joints.shoulder)?,
            elbow: resolve_pose(joints.elbow)?,
            wrist: resolve_pose(joints.wrist)?,
            hand: resolve_pose(joints.hand)?,
            controller: resolve_pose(joints.controller),
        })
    }
}

/// A tracked pose with its rotation rescaled to unit length.
fn resolve_pose(pose: Option<Pose>) -> Option<Pose> {
    pose.and_then(Pose::normalized)
}

/// A snapshot in which every required joint is present and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyPose {
    pub head: Pose,
    pub waist: Pose,
    pub left: Arm,
    pub right: Arm,
}

impl BodyPose {
    pub fn arm(&self, side: Side) -> &Arm {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn arm_mut(&mut self, side: Side) -> &mut Arm {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

impl From<BodyPose> for PoseSnapshot {
    fn from(body: BodyPose) -> Self {
        let joints = |arm: Arm| ArmJoints {
            shoulder: Some(arm.shoulder),
            elbow: Some(arm.elbow),
            wrist: Some(arm.wrist),
            hand: Some(arm.hand),
            controller: arm.controller,
        };
        Self {
            head: Some(body.head),
            waist: Some(body.waist),
            left: joints(body.left),
            right: joints(body.right),
        }
    }
}
