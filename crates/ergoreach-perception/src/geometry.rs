//! Rigid-body geometry primitives.
//!
//! Positions are [`Vec3`]s, orientations are unit [`Quaternion`]s and a joint
//! pose is a [`Pose`] (translation + rotation).  The axis convention follows
//! common VR runtimes: `+Y` is up, `+Z` is forward and `+X` is right.
//!
//! Besides the usual vector algebra this module provides the two angle
//! measures used throughout posture analysis ([`angle_deg`] and
//! [`signed_angle_about`]) and the analytic ray/sphere query used by the
//! reach boundary.
//!
//! # Example
//!
//! ```rust
//! use ergoreach_perception::geometry::{Pose, Quaternion, Vec3};
//!
//! // shoulder 1.4 m above the origin, no rotation
//! let shoulder = Pose::new(Vec3::new(0.0, 1.4, 0.0), Quaternion::identity());
//! let hand = Vec3::new(0.2, 1.1, 0.3);
//!
//! let local = shoulder.inverse_transform_point(hand);
//! let back = shoulder.transform_point(local);
//! assert!(back.distance(hand) < 1e-5);
//! ```

use std::ops::{Add, Mul, Neg, Sub};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Squared-magnitude product below which an angle is reported as zero.
const ANGLE_EPSILON: f32 = 1e-15;

/// Squared length below which a vector is treated as zero.
const NORMALIZE_EPSILON: f32 = 1e-12;

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector (metres when used as a position).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Create a new vector.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// World up (`+Y`).
    pub const fn up() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    /// World right (`+X`).
    pub const fn right() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// World forward (`+Z`).
    pub const fn forward() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or `None` for a (near-)zero vector.
    pub fn normalized(self) -> Option<Self> {
        let len_sq = self.length_squared();
        if !len_sq.is_finite() || len_sq < NORMALIZE_EPSILON {
            return None;
        }
        Some(self * (1.0 / len_sq.sqrt()))
    }

    /// Remove the component of `self` along the unit vector `normal`.
    pub fn project_on_plane(self, normal: Self) -> Self {
        self - normal * self.dot(normal)
    }

    /// `true` when every component is finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle_deg` degrees around `axis` (right-hand rule).
    ///
    /// A degenerate axis yields the identity.
    pub fn from_axis_angle(axis: Vec3, angle_deg: f32) -> Self {
        let Some(axis) = axis.normalized() else {
            return Self::identity();
        };
        let half = angle_deg.to_radians() * 0.5;
        let s = half.sin();
        Self::new(half.cos(), axis.x * s, axis.y * s, axis.z * s)
    }

    /// Rotation whose local `+Z` points along `forward` and whose local `+Y`
    /// is as close to `up` as possible.
    ///
    /// Returns `None` when `forward` is degenerate.  When `up` is parallel to
    /// `forward` an arbitrary perpendicular is chosen for the right axis.
    pub fn look_rotation(forward: Vec3, up: Vec3) -> Option<Self> {
        let z = forward.normalized()?;
        let x = match up.cross(z).normalized() {
            Some(x) => x,
            None => {
                let fallback = if z.x.abs() < 0.9 { Vec3::right() } else { Vec3::up() };
                fallback.project_on_plane(z).normalized()?
            }
        };
        let y = z.cross(x);
        Some(Self::from_basis(x, y, z))
    }

    /// Build a quaternion from an orthonormal, right-handed basis given as the
    /// images of the local X, Y and Z axes.
    fn from_basis(x: Vec3, y: Vec3, z: Vec3) -> Self {
        let (m00, m01, m02) = (x.x, y.x, z.x);
        let (m10, m11, m12) = (x.y, y.y, z.y);
        let (m20, m21, m22) = (x.z, y.z, z.z);

        let trace = m00 + m11 + m22;
        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Self::new(0.25 * s, (m21 - m12) / s, (m02 - m20) / s, (m10 - m01) / s)
        } else if m00 > m11 && m00 > m22 {
            let s = (1.0 + m00 - m11 - m22).sqrt() * 2.0;
            Self::new((m21 - m12) / s, 0.25 * s, (m01 + m10) / s, (m02 + m20) / s)
        } else if m11 > m22 {
            let s = (1.0 + m11 - m00 - m22).sqrt() * 2.0;
            Self::new((m02 - m20) / s, (m01 + m10) / s, 0.25 * s, (m12 + m21) / s)
        } else {
            let s = (1.0 + m22 - m00 - m11).sqrt() * 2.0;
            Self::new((m10 - m01) / s, (m02 + m20) / s, (m12 + m21) / s, 0.25 * s)
        };
        q.normalized()
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rescale to unit length, or `None` when the norm is (near-)zero or not
    /// finite.
    pub fn try_normalized(self) -> Option<Self> {
        let norm_sq = self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z;
        if !norm_sq.is_finite() || norm_sq < NORMALIZE_EPSILON {
            return None;
        }
        let n = norm_sq.sqrt();
        Some(Self::new(self.w / n, self.x / n, self.y / n, self.z / n))
    }

    /// Rescale to unit length; a zero quaternion becomes the identity.
    pub fn normalized(self) -> Self {
        self.try_normalized().unwrap_or_else(Self::identity)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// The rotated local `+Z` axis.
    pub fn forward(self) -> Vec3 {
        self.rotate(Vec3::forward())
    }

    /// The rotated local `+Y` axis.
    pub fn up(self) -> Vec3 {
        self.rotate(Vec3::up())
    }

    /// The rotated local `+X` axis.
    pub fn right(self) -> Vec3 {
        self.rotate(Vec3::right())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body pose: translation followed by rotation.
///
/// Represents the pose of a local frame relative to the world: to convert a
/// point expressed in the local frame into world space, rotate it by
/// `rotation` then add `position`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Pose {
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quaternion,
}

impl Pose {
    /// Create a pose from a position and rotation.
    pub fn new(position: Vec3, rotation: Quaternion) -> Self {
        Self { position, rotation }
    }

    /// A pose at `position` with no rotation.
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quaternion::identity())
    }

    /// `true` when every position and rotation component is finite.
    pub fn is_finite(self) -> bool {
        let q = self.rotation;
        self.position.is_finite()
            && q.w.is_finite()
            && q.x.is_finite()
            && q.y.is_finite()
            && q.z.is_finite()
    }

    /// The same pose with a unit rotation.
    ///
    /// Returns `None` when the position is not finite or the rotation has no
    /// usable direction (zero or non-finite norm).
    pub fn normalized(self) -> Option<Self> {
        if !self.position.is_finite() {
            return None;
        }
        Some(Self::new(self.position, self.rotation.try_normalized()?))
    }

    /// The inverse pose (T_B_A for T_A_B).  Assumes a unit rotation.
    pub fn inverse(self) -> Self {
        let inv = self.rotation.conjugate();
        Self::new(-inv.rotate(self.position), inv)
    }

    /// Map a point from this pose's local frame into world space.
    pub fn transform_point(self, local: Vec3) -> Vec3 {
        self.position + self.rotation.rotate(local)
    }

    /// Map a world-space point into this pose's local frame.
    pub fn inverse_transform_point(self, world: Vec3) -> Vec3 {
        self.inverse().transform_point(world)
    }

    pub fn forward(self) -> Vec3 {
        self.rotation.forward()
    }

    pub fn up(self) -> Vec3 {
        self.rotation.up()
    }

    pub fn right(self) -> Vec3 {
        self.rotation.right()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Angles
// ────────────────────────────────────────────────────────────────────────────

/// Unsigned angle between two vectors in degrees, in `[0, 180]`.
///
/// Returns `0.0` when either vector is (near-)zero, so the result is never
/// NaN for finite input.
pub fn angle_deg(a: Vec3, b: Vec3) -> f32 {
    let denominator = (a.length_squared() * b.length_squared()).sqrt();
    if !denominator.is_finite() || denominator < ANGLE_EPSILON {
        return 0.0;
    }
    let cos = (a.dot(b) / denominator).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Signed angle in degrees from `from` to `to`, measured around `axis`.
///
/// Both vectors are projected onto the plane normal to `axis` first, so only
/// the rotation about that axis is measured.  The sign follows the
/// right-hand rule around `axis`.  A degenerate axis falls back to the
/// unsigned [`angle_deg`].
pub fn signed_angle_about(from: Vec3, to: Vec3, axis: Vec3) -> f32 {
    let Some(n) = axis.normalized() else {
        return angle_deg(from, to);
    };
    let a = from.project_on_plane(n);
    let b = to.project_on_plane(n);
    let angle = angle_deg(a, b);
    if n.dot(a.cross(b)) < 0.0 { -angle } else { angle }
}

// ────────────────────────────────────────────────────────────────────────────
// Ray / Sphere
// ────────────────────────────────────────────────────────────────────────────

/// A half-line from `origin` along a unit `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    direction: Vec3,
}

impl Ray {
    /// Create a ray; returns `None` when `direction` is degenerate.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        Some(Self {
            origin,
            direction: direction.normalized()?,
        })
    }

    /// The unit direction of the ray.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// The point at parametric distance `t` along the ray.
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// A sphere used as a ray-intersection target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Where `ray` leaves the sphere.
    ///
    /// Solves `|o + t·d − c|² = r²` and returns the far root, which is the
    /// exit point for rays starting inside the sphere.  Returns `None` when
    /// the ray misses or the whole sphere lies behind the origin.
    pub fn exit_point(&self, ray: &Ray) -> Option<Vec3> {
        if self.radius.is_nan() || self.radius <= 0.0 {
            return None;
        }
        let oc = ray.origin - self.center;
        let b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let t_far = -b + discriminant.sqrt();
        if t_far < 0.0 || !t_far.is_finite() {
            return None;
        }
        Some(ray.point_at(t_far))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_1_SQRT_2;

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-4
    }

    // ── Vec3 ────────────────────────────────────────────────────────────────

    #[test]
    fn cross_of_up_and_forward_is_right() {
        assert!(close(Vec3::up().cross(Vec3::forward()), Vec3::right()));
    }

    #[test]
    fn normalized_zero_is_none() {
        assert!(Vec3::zero().normalized().is_none());
        let n = Vec3::new(3.0, 0.0, 4.0).normalized().unwrap();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn non_finite_vector_is_detected() {
        assert!(!Vec3::new(f32::NAN, 0.0, 0.0).is_finite());
        assert!(Vec3::new(f32::NAN, 0.0, 0.0).normalized().is_none());
    }

    // ── Quaternion ──────────────────────────────────────────────────────────

    #[test]
    fn quarter_turn_about_z_maps_x_to_y() {
        // 90° rotation around Z axis: (cos45°, 0, 0, sin45°)
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        let r = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert!(close(r, Vec3::new(0.0, 1.0, 0.0)), "got {r:?}");
    }

    #[test]
    fn axis_angle_matches_explicit_quaternion() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 2.0), 90.0);
        assert!((q.w - FRAC_1_SQRT_2).abs() < 1e-5);
        assert!((q.z - FRAC_1_SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn look_rotation_identity_for_default_axes() {
        let q = Quaternion::look_rotation(Vec3::forward(), Vec3::up()).unwrap();
        assert!(close(q.forward(), Vec3::forward()));
        assert!(close(q.up(), Vec3::up()));
        assert!(close(q.right(), Vec3::right()));
    }

    #[test]
    fn look_rotation_turned_right() {
        let q = Quaternion::look_rotation(Vec3::new(1.0, 0.0, 0.0), Vec3::up()).unwrap();
        assert!(close(q.forward(), Vec3::new(1.0, 0.0, 0.0)));
        assert!(close(q.up(), Vec3::up()));
        assert!(close(q.right(), Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn look_rotation_orthogonalises_tilted_up() {
        let q = Quaternion::look_rotation(Vec3::forward(), Vec3::new(0.0, 1.0, 1.0)).unwrap();
        assert!(close(q.forward(), Vec3::forward()));
        assert!(close(q.up(), Vec3::up()));
    }

    #[test]
    fn look_rotation_handles_parallel_up() {
        let q = Quaternion::look_rotation(Vec3::up(), Vec3::up()).unwrap();
        assert!(close(q.forward(), Vec3::up()));
        assert!(q.right().dot(Vec3::up()).abs() < 1e-5);
        assert!(Quaternion::look_rotation(Vec3::zero(), Vec3::up()).is_none());
    }

    // ── Pose ────────────────────────────────────────────────────────────────

    #[test]
    fn pose_round_trips_points_through_local_frame() {
        let q = Quaternion::from_axis_angle(Vec3::up(), 37.0);
        let pose = Pose::new(Vec3::new(0.3, 1.4, -0.2), q);
        let world = Vec3::new(0.5, 1.0, 0.4);
        let local = pose.inverse_transform_point(world);
        assert!(close(pose.transform_point(local), world));
    }

    #[test]
    fn inverse_pose_undoes_transform() {
        let pose = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quaternion::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 50.0),
        );
        let p = Vec3::new(-0.4, 0.7, 2.0);
        assert!(close(pose.inverse().transform_point(pose.transform_point(p)), p));
        assert!(close(pose.inverse().inverse().position, pose.position));
    }

    #[test]
    fn scaled_rotation_normalises_to_unit() {
        let q = Quaternion::new(2.0, 0.0, 0.0, 0.0).try_normalized().unwrap();
        assert_eq!(q, Quaternion::identity());
        assert!(Quaternion::new(0.0, 0.0, 0.0, 0.0).try_normalized().is_none());
        assert_eq!(Quaternion::new(0.0, 0.0, 0.0, 0.0).normalized(), Quaternion::identity());

        let pose = Pose::new(Vec3::new(0.0, 1.4, 0.0), Quaternion::new(2.0, 0.0, 0.0, 0.0));
        let fixed = pose.normalized().unwrap();
        let hand = Vec3::new(0.2, 1.2, 0.3);
        assert!(close(fixed.transform_point(fixed.inverse_transform_point(hand)), hand));
        assert!(Pose::at(Vec3::new(f32::NAN, 0.0, 0.0)).normalized().is_none());
    }

    #[test]
    fn local_point_follows_moving_frame() {
        let before = Pose::at(Vec3::new(0.0, 1.4, 0.0));
        let local = before.inverse_transform_point(Vec3::new(0.0, 1.2, 0.3));
        let after = Pose::at(Vec3::new(0.5, 1.4, 0.0));
        assert!(close(after.transform_point(local), Vec3::new(0.5, 1.2, 0.3)));
    }

    // ── Angles ──────────────────────────────────────────────────────────────

    #[test]
    fn angle_between_perpendicular_vectors_is_90() {
        assert!((angle_deg(Vec3::right(), Vec3::up()) - 90.0).abs() < 1e-4);
        assert!((angle_deg(Vec3::right(), -Vec3::right()) - 180.0).abs() < 1e-3);
    }

    #[test]
    fn angle_with_zero_vector_is_zero() {
        assert_eq!(angle_deg(Vec3::zero(), Vec3::up()), 0.0);
    }

    #[test]
    fn signed_angle_follows_right_hand_rule() {
        // +X to +Y about +Z is a positive quarter turn.
        let a = signed_angle_about(Vec3::right(), Vec3::up(), Vec3::forward());
        assert!((a - 90.0).abs() < 1e-4);
        let b = signed_angle_about(Vec3::up(), Vec3::right(), Vec3::forward());
        assert!((b + 90.0).abs() < 1e-4);
    }

    #[test]
    fn signed_angle_ignores_out_of_plane_component() {
        // Tilting `to` along the axis does not change the measured rotation.
        let a = signed_angle_about(Vec3::right(), Vec3::new(0.0, 1.0, 5.0), Vec3::forward());
        assert!((a - 90.0).abs() < 1e-3);
    }

    #[test]
    fn signed_angle_of_axis_aligned_vector_is_zero() {
        assert_eq!(signed_angle_about(Vec3::up(), Vec3::up(), Vec3::up()), 0.0);
    }

    // ── Ray / Sphere ────────────────────────────────────────────────────────

    #[test]
    fn ray_from_center_exits_at_radius() {
        let sphere = Sphere::new(Vec3::zero(), 2.0);
        let ray = Ray::new(Vec3::zero(), Vec3::new(0.0, 0.0, 5.0)).unwrap();
        let hit = sphere.exit_point(&ray).unwrap();
        assert!(close(hit, Vec3::new(0.0, 0.0, 2.0)));
    }

    #[test]
    fn ray_from_off_center_point_exits_on_surface() {
        let sphere = Sphere::new(Vec3::new(0.0, 1.4, 0.0), 0.6);
        let ray = Ray::new(Vec3::new(0.1, 1.2, 0.2), Vec3::new(0.3, 0.1, 1.0)).unwrap();
        let hit = sphere.exit_point(&ray).unwrap();
        assert!((hit.distance(sphere.center) - 0.6).abs() < 1e-4);
        assert!((hit - ray.origin).dot(ray.direction()) > 0.0);
    }

    #[test]
    fn ray_missing_sphere_returns_none() {
        let sphere = Sphere::new(Vec3::new(0.0, 10.0, 0.0), 1.0);
        let ray = Ray::new(Vec3::zero(), Vec3::right()).unwrap();
        assert!(sphere.exit_point(&ray).is_none());
    }

    #[test]
    fn sphere_behind_ray_returns_none() {
        let sphere = Sphere::new(Vec3::new(-5.0, 0.0, 0.0), 1.0);
        let ray = Ray::new(Vec3::zero(), Vec3::right()).unwrap();
        assert!(sphere.exit_point(&ray).is_none());
    }

    #[test]
    fn zero_radius_sphere_never_hits() {
        let sphere = Sphere::new(Vec3::zero(), 0.0);
        let ray = Ray::new(Vec3::zero(), Vec3::right()).unwrap();
        assert!(sphere.exit_point(&ray).is_none());
        assert!(Ray::new(Vec3::zero(), Vec3::zero()).is_none());
    }
}
