//! `ergoreach-perception` – body geometry.
//!
//! Turns one tick's raw joint poses into the geometric and angular quantities
//! the amplification and ergonomics layers reason about.
//!
//! # Modules
//!
//! - [`geometry`] – [`Vec3`][geometry::Vec3], [`Quaternion`][geometry::Quaternion]
//!   and [`Pose`][geometry::Pose] rigid-body primitives, angle measures and
//!   the analytic [`Sphere`][geometry::Sphere]/[`Ray`][geometry::Ray] query.
//! - [`snapshot`] – [`PoseSnapshot`][snapshot::PoseSnapshot]: the immutable
//!   per-tick joint record handed over by a pose provider, and its validated
//!   form [`BodyPose`][snapshot::BodyPose].
//! - [`posture`] – [`PostureSampler`][posture::PostureSampler]: derives
//!   shoulder, elbow, wrist, trunk and neck angles and holds the last valid
//!   sample while tracking is lost.

pub mod geometry;
pub mod posture;
pub mod snapshot;

pub use geometry::{Pose, Quaternion, Vec3};
pub use posture::{ArmAngles, PostureAngles, PostureSample, PostureSampler};
pub use snapshot::{Arm, ArmJoints, BodyPose, PoseSnapshot};
