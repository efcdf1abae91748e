//! Posture Sampler.
//!
//! Derives the scalar joint angles used by ergonomic scoring from one tick's
//! [`PoseSnapshot`].
//!
//! | Angle | Definition |
//! |---|---|
//! | elbow | `angle(wrist − elbow, elbow − shoulder)`; 0° with a straight arm |
//! | shoulder | `180 − angle(elbow − shoulder, shoulder − flush)`; 0° with the arm hanging |
//! | wrist | `|angle(hand.forward, wrist − elbow) − neutral_offset|` |
//! | trunk lean | world up → waist→head, about the waist's right axis |
//! | trunk twist | waist right → shoulder line, about world up |
//! | trunk side bend | waist right → shoulder line, about the waist's forward axis |
//! | neck tilt | waist up → head up, about the waist's right axis |
//! | neck twist | waist forward → head forward, about the waist's up axis |
//! | neck roll | waist up → head up, about the waist's forward axis |
//!
//! `flush` is a synthetic point one metre straight below the shoulder.  Lean
//! and tilt are positive for forward flexion.
//!
//! When tracking is lost the sampler keeps returning the last valid sample,
//! flagged as stale, until a valid snapshot arrives again.
//!
//! # Example
//!
//! ```rust
//! use ergoreach_perception::posture::PostureSampler;
//! use ergoreach_perception::snapshot::PoseSnapshot;
//! use ergoreach_types::JointSource;
//!
//! let mut sampler = PostureSampler::new(JointSource::InverseKinematics, 30.0);
//! // Nothing tracked yet: no sample.
//! assert!(sampler.sample(&PoseSnapshot::default()).is_none());
//! ```

use ergoreach_types::{JointSource, Side};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::geometry::{Quaternion, Vec3, angle_deg, signed_angle_about};
use crate::snapshot::{Arm, BodyPose, PoseSnapshot};

/// Distance of the synthetic body-flush reference below the shoulder.
const FLUSH_DROP: f32 = 1.0;

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// Joint angles of one arm, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ArmAngles {
    pub shoulder: f32,
    pub elbow: f32,
    pub wrist: f32,
}

/// Every posture angle derived in one tick, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PostureAngles {
    pub left: ArmAngles,
    pub right: ArmAngles,
    /// Positive when the head is ahead of the waist.
    pub trunk_lean: f32,
    pub trunk_twist: f32,
    /// Shoulder-line tilt measured about the waist's forward axis.
    pub trunk_side_bend: f32,
    pub neck_tilt: f32,
    pub neck_twist: f32,
    /// Sideways head tilt: waist-up to head-up, measured about the waist's
    /// forward axis.
    pub neck_roll: f32,
}

impl PostureAngles {
    pub fn arm(&self, side: Side) -> &ArmAngles {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// A posture sample: the body it was computed from and the derived angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureSample {
    /// The validated body, with synthetic orientations applied for skeletal
    /// tracking.
    pub body: BodyPose,
    pub angles: PostureAngles,
    /// `true` when tracking is currently invalid and this is the last valid
    /// sample being held.
    pub stale: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// PostureSampler
// ────────────────────────────────────────────────────────────────────────────

/// Turns raw snapshots into [`PostureSample`]s and holds the last valid one.
#[derive(Debug, Clone)]
pub struct PostureSampler {
    source: JointSource,
    /// Neutral grip angle of the controller in use, in degrees.
    neutral_offset_deg: f32,
    last_good: Option<PostureSample>,
    tracking_lost: bool,
}

impl PostureSampler {
    /// Create a sampler for the given joint source.
    ///
    /// `neutral_offset_deg` compensates for the ergonomically neutral grip
    /// angle of the controller (e.g. 30° for wand controllers, 0° for
    /// controllers held straight).
    pub fn new(source: JointSource, neutral_offset_deg: f32) -> Self {
        Self {
            source,
            neutral_offset_deg,
            last_good: None,
            tracking_lost: false,
        }
    }

    pub fn source(&self) -> JointSource {
        self.source
    }

    pub fn neutral_offset_deg(&self) -> f32 {
        self.neutral_offset_deg
    }

    /// `true` while the most recent snapshot was invalid.
    pub fn tracking_lost(&self) -> bool {
        self.tracking_lost
    }

    /// The last sample computed from a valid snapshot.
    pub fn last_good(&self) -> Option<&PostureSample> {
        self.last_good.as_ref()
    }

    /// Sample one tick.
    ///
    /// - Valid snapshot: derive orientations (skeletal source only), compute
    ///   angles, remember the sample and return it.
    /// - Invalid snapshot: log once per loss episode and return the last valid
    ///   sample with `stale = true`, or `None` if there never was one.
    pub fn sample(&mut self, snapshot: &PoseSnapshot) -> Option<PostureSample> {
        match snapshot.validate() {
            Ok(mut body) => {
                if self.tracking_lost {
                    info!("body tracking restored");
                    self.tracking_lost = false;
                }
                self.derive_orientations(&mut body);
                let sample = PostureSample {
                    body,
                    angles: self.angles(&body),
                    stale: false,
                };
                debug!(angles = ?sample.angles, "posture sampled");
                self.last_good = Some(sample);
                Some(sample)
            }
            Err(e) => {
                if !self.tracking_lost {
                    warn!(error = %e, "lost body tracking; holding last valid pose");
                    self.tracking_lost = true;
                }
                self.last_good.map(|s| PostureSample { stale: true, ..s })
            }
        }
    }

    /// Rebuild orientations that skeletal trackers do not report.
    ///
    /// The waist is oriented from the shoulder line and the waist→head axis;
    /// hands take their controller's orientation.  Inverse-kinematics bodies
    /// already carry correct orientations and are left untouched.
    fn derive_orientations(&self, body: &mut BodyPose) {
        if self.source != JointSource::Skeletal {
            return;
        }

        let left = body.left.shoulder.position;
        let right = body.right.shoulder.position;
        let waist = body.waist.position;
        let forward = (left - right).cross(waist - left);
        let up = body.head.position - waist;
        match Quaternion::look_rotation(forward, up) {
            Some(rotation) => body.waist.rotation = rotation,
            None => debug!("degenerate torso; keeping reported waist orientation"),
        }

        for side in Side::BOTH {
            let arm = body.arm_mut(side);
            if let Some(controller) = arm.controller {
                arm.hand.rotation = controller.rotation;
            }
        }
    }

    fn arm_angles(&self, arm: &Arm) -> ArmAngles {
        let shoulder = arm.shoulder.position;
        let elbow = arm.elbow.position;
        let wrist = arm.wrist.position;
        let flush = shoulder - Vec3::up() * FLUSH_DROP;

        ArmAngles {
            shoulder: 180.0 - angle_deg(elbow - shoulder, shoulder - flush),
            elbow: angle_deg(wrist - elbow, elbow - shoulder),
            wrist: (angle_deg(arm.hand.forward(), wrist - elbow) - self.neutral_offset_deg).abs(),
        }
    }

    fn angles(&self, body: &BodyPose) -> PostureAngles {
        let waist = body.waist;
        let head = body.head;
        let shoulder_line = body.right.shoulder.position - body.left.shoulder.position;
        let waist_to_head = head.position - waist.position;

        PostureAngles {
            left: self.arm_angles(&body.left),
            right: self.arm_angles(&body.right),
            trunk_lean: signed_angle_about(Vec3::up(), waist_to_head, waist.right()),
            trunk_twist: signed_angle_about(waist.right(), shoulder_line, Vec3::up()),
            trunk_side_bend: signed_angle_about(waist.right(), shoulder_line, waist.forward()),
            neck_tilt: signed_angle_about(waist.up(), head.up(), waist.right()),
            neck_twist: signed_angle_about(waist.forward(), head.forward(), waist.up()),
            neck_roll: signed_angle_about(waist.up(), head.up(), waist.forward()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
