//! Amplification curves.
//!
//! An [`AmplificationCurve`] maps the fraction of maximum reach the hand is at
//! (`0` at the comfort point, `1` on the reach boundary) to the fraction of
//! maximum reach the amplified hand should be drawn at.
//!
//! The curve is a sequence of [`Keyframe`]s with strictly increasing inputs.
//! Between two keys the value follows a cubic Hermite segment driven by the
//! keys' tangents; outside the key range it is extended according to the
//! curve's [`Extrapolation`].  Keys whose [`TangentMode`] is not `Free` have
//! their tangents recomputed after every edit.
//!
//! A [`CurveBank`] holds a fixed set of preset curves plus the currently
//! active (possibly edited) curve.
//!
//! # Example
//!
//! ```rust
//! use ergoreach_amplify::curve::{AmplificationCurve, ResponseCurve};
//!
//! let mut curve = AmplificationCurve::identity();
//! assert!((curve.evaluate(0.25) - 0.25).abs() < 1e-6);
//!
//! // Edits that would reorder keys are rejected and leave the curve intact.
//! assert!(curve.shift_control_point(0, 2.0).is_err());
//! assert_eq!(curve.keys().len(), 2);
//! ```

use ergoreach_types::ErgoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input of the middle key of an intensity curve at zero intensity.
pub const BASE_KEY_TIME: f32 = 0.7;

/// Intensities of the default preset bank (after the identity curve).
pub const DEFAULT_INTENSITIES: [f32; 3] = [0.1, 0.2, 0.3];

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Errors raised by curve construction and editing.
///
/// A failed edit never modifies the curve.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CurveError {
    /// The curve needs more keys than were supplied.
    #[error("insufficient keys: need at least {required}, got {actual}")]
    InsufficientKeys { required: usize, actual: usize },

    /// A control-point index does not exist.
    #[error("control point {index} out of range (curve has {len} keys)")]
    IndexOutOfRange { index: usize, len: usize },

    /// The edit would break the strictly increasing input order.
    #[error("moving control point {index} to input {input} would break key ordering")]
    OrderViolation { index: usize, input: f32 },

    /// A non-finite value was supplied.
    #[error("non-finite value supplied for control point {index}")]
    NonFinite { index: usize },

    /// The requested preset does not exist.
    #[error("preset {index} out of range (bank has {len} presets)")]
    PresetOutOfRange { index: usize, len: usize },

    /// The keys are finite but a derived tangent is not (keys too close
    /// together for the rise between them).
    #[error("control point {index} would get a non-finite tangent")]
    NonFiniteTangent { index: usize },

    /// The intensity helper only applies to three-key curves.
    #[error("intensity editing needs a three-key curve, active curve has {len} keys")]
    NotIntensityCurve { len: usize },

    /// A bank needs at least one preset.
    #[error("curve bank needs at least one preset")]
    EmptyBank,
}

impl From<CurveError> for ErgoError {
    fn from(e: CurveError) -> Self {
        ErgoError::Curve(e.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Keyframes
// ────────────────────────────────────────────────────────────────────────────

/// How a key's tangents are determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TangentMode {
    /// Smooth: both tangents equal the secant through the neighbouring keys.
    #[default]
    Auto,
    /// Each tangent points straight at the adjacent key.
    Linear,
    /// Tangents are user supplied and never recomputed.
    Free,
}

/// Behaviour outside the key range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extrapolation {
    /// Hold the end key's value.
    #[default]
    Clamp,
    /// Continue along the end key's outer tangent.
    Linear,
}

/// A single control point of an [`AmplificationCurve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub input: f32,
    pub output: f32,
    #[serde(default)]
    pub in_tangent: f32,
    #[serde(default)]
    pub out_tangent: f32,
    #[serde(default)]
    pub mode: TangentMode,
}

impl Keyframe {
    /// A key with automatically computed tangents.
    pub fn new(input: f32, output: f32, mode: TangentMode) -> Self {
        Self {
            input,
            output,
            in_tangent: 0.0,
            out_tangent: 0.0,
            mode,
        }
    }

    /// A key with explicit tangents.
    pub fn free(input: f32, output: f32, in_tangent: f32, out_tangent: f32) -> Self {
        Self {
            input,
            output,
            in_tangent,
            out_tangent,
            mode: TangentMode::Free,
        }
    }

    fn is_finite(&self) -> bool {
        self.input.is_finite()
            && self.output.is_finite()
            && self.in_tangent.is_finite()
            && self.out_tangent.is_finite()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ResponseCurve
// ────────────────────────────────────────────────────────────────────────────

/// The only capability the amplifier needs from a curve.
pub trait ResponseCurve {
    /// Map `x` to a value.  Must return a finite value for every input.
    fn evaluate(&self, x: f32) -> f32;
}

// ────────────────────────────────────────────────────────────────────────────
// AmplificationCurve
// ────────────────────────────────────────────────────────────────────────────

/// A tunable scalar mapping defined by ordered keyframes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmplificationCurve {
    keys: Vec<Keyframe>,
    #[serde(default)]
    extrapolation: Extrapolation,
}

impl AmplificationCurve {
    /// Build a curve from keys.
    ///
    /// Keys must be finite with strictly increasing inputs; at least one key
    /// is required, and the derived tangents must be finite.
    pub fn new(keys: Vec<Keyframe>) -> Result<Self, CurveError> {
        if keys.is_empty() {
            return Err(CurveError::InsufficientKeys {
                required: 1,
                actual: 0,
            });
        }
        if let Some(index) = keys.iter().position(|k| !k.is_finite()) {
            return Err(CurveError::NonFinite { index });
        }
        if let Some(i) = keys.windows(2).position(|w| w[0].input >= w[1].input) {
            return Err(CurveError::OrderViolation {
                index: i + 1,
                input: keys[i + 1].input,
            });
        }
        let mut curve = Self {
            keys: Vec::new(),
            extrapolation: Extrapolation::default(),
        };
        curve.commit(keys)?;
        Ok(curve)
    }

    /// Straight line through `(0, 0)` and `(1, 1)`: no amplification.
    pub fn identity() -> Self {
        Self {
            keys: vec![
                Keyframe::free(0.0, 0.0, 1.0, 1.0),
                Keyframe::free(1.0, 1.0, 1.0, 1.0),
            ],
            extrapolation: Extrapolation::default(),
        }
    }

    /// Piecewise-linear curve through `points`.
    pub fn piecewise_linear(points: &[(f32, f32)]) -> Result<Self, CurveError> {
        Self::new(
            points
                .iter()
                .map(|&(x, y)| Keyframe::new(x, y, TangentMode::Linear))
                .collect(),
        )
    }

    /// Three-key amplification curve of the given intensity.
    ///
    /// The middle key sits at `(BASE_KEY_TIME − amount, BASE_KEY_TIME)` so the
    /// output reaches 70 % of max reach earlier the larger `amount` is; the
    /// end key rises to `1 + amount / 3`.
    pub fn with_intensity(amount: f32) -> Result<Self, CurveError> {
        let mut curve = Self::new(vec![
            Keyframe::new(0.0, 0.0, TangentMode::Linear),
            Keyframe::new(BASE_KEY_TIME, BASE_KEY_TIME, TangentMode::Auto),
            Keyframe::free(1.0, 1.0, 1.0, 1.0),
        ])?;
        curve.set_intensity(amount)?;
        Ok(curve)
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn extrapolation(&self) -> Extrapolation {
        self.extrapolation
    }

    pub fn set_extrapolation(&mut self, extrapolation: Extrapolation) {
        self.extrapolation = extrapolation;
    }

    /// Move control point `index` along the input axis by `delta`.
    pub fn shift_control_point(&mut self, index: usize, delta: f32) -> Result<(), CurveError> {
        let key = self.key(index)?;
        self.set_control_point(index, key.input + delta, key.output)
    }

    /// Move control point `index` to `(input, output)`.
    ///
    /// Rejected with [`CurveError::OrderViolation`] if `input` does not lie
    /// strictly between the neighbouring keys' inputs.
    pub fn set_control_point(
        &mut self,
        index: usize,
        input: f32,
        output: f32,
    ) -> Result<(), CurveError> {
        self.key(index)?;
        if !input.is_finite() || !output.is_finite() {
            return Err(CurveError::NonFinite { index });
        }
        self.check_order(index, input)?;

        let mut candidate = self.keys.clone();
        candidate[index].input = input;
        candidate[index].output = output;
        self.commit(candidate)
    }

    /// Re-shape a three-key curve to amplification intensity `amount`.
    ///
    /// Key 1 moves to input `BASE_KEY_TIME − amount` (keeping its output),
    /// key 2 moves to `(1, 1 + 0.1·amount/0.3)` and becomes free; key 0 is
    /// linear and key 1 smooth.
    pub fn set_intensity(&mut self, amount: f32) -> Result<(), CurveError> {
        if self.keys.len() != 3 {
            return Err(CurveError::NotIntensityCurve {
                len: self.keys.len(),
            });
        }
        if !amount.is_finite() {
            return Err(CurveError::NonFinite { index: 1 });
        }

        let mut candidate = self.keys.clone();
        candidate[0].mode = TangentMode::Linear;
        candidate[1].input = BASE_KEY_TIME - amount;
        candidate[1].mode = TangentMode::Auto;
        candidate[2].input = 1.0;
        candidate[2].output = 1.0 + 0.1 * amount / 0.3;
        candidate[2].mode = TangentMode::Free;

        for i in 1..candidate.len() {
            if candidate[i - 1].input >= candidate[i].input {
                return Err(CurveError::OrderViolation {
                    index: i,
                    input: candidate[i].input,
                });
            }
        }

        self.commit(candidate)
    }

    /// Recompute tangents on `candidate` and adopt it if every tangent is
    /// finite.
    fn commit(&mut self, mut candidate: Vec<Keyframe>) -> Result<(), CurveError> {
        recompute_tangents(&mut candidate);
        if let Some(index) = candidate.iter().position(|k| !k.is_finite()) {
            return Err(CurveError::NonFiniteTangent { index });
        }
        self.keys = candidate;
        Ok(())
    }

    fn key(&self, index: usize) -> Result<Keyframe, CurveError> {
        self.keys
            .get(index)
            .copied()
            .ok_or(CurveError::IndexOutOfRange {
                index,
                len: self.keys.len(),
            })
    }

    fn check_order(&self, index: usize, input: f32) -> Result<(), CurveError> {
        let after_prev = index == 0 || self.keys[index - 1].input < input;
        let before_next = self.keys.get(index + 1).is_none_or(|next| input < next.input);
        if after_prev && before_next {
            Ok(())
        } else {
            Err(CurveError::OrderViolation { index, input })
        }
    }
}

/// Recompute the tangents of every non-`Free` key.
fn recompute_tangents(keys: &mut [Keyframe]) {
    let n = keys.len();
    if n < 2 {
        if let Some(k) = keys.first_mut().filter(|k| k.mode != TangentMode::Free) {
            k.in_tangent = 0.0;
            k.out_tangent = 0.0;
        }
        return;
    }

    let secant = |a: &Keyframe, b: &Keyframe| (b.output - a.output) / (b.input - a.input);
    for i in 0..n {
        let prev = (i > 0).then(|| secant(&keys[i - 1], &keys[i]));
        let next = (i + 1 < n).then(|| secant(&keys[i], &keys[i + 1]));
        let key = keys[i];
        let (in_t, out_t) = match key.mode {
            TangentMode::Free => continue,
            TangentMode::Linear => {
                let in_t = prev.or(next).unwrap_or(0.0);
                let out_t = next.or(prev).unwrap_or(0.0);
                (in_t, out_t)
            }
            TangentMode::Auto => {
                let t = match (prev, next) {
                    (Some(_), Some(_)) => secant(&keys[i - 1], &keys[i + 1]),
                    (p, n) => p.or(n).unwrap_or(0.0),
                };
                (t, t)
            }
        };
        keys[i].in_tangent = in_t;
        keys[i].out_tangent = out_t;
    }
}

impl ResponseCurve for AmplificationCurve {
    /// Evaluate the curve.
    ///
    /// Defined for every real input: NaN maps to the first key's output, any
    /// non-finite extrapolation result falls back to the end key's value and
    /// an overflowing segment falls back to linear interpolation.
    fn evaluate(&self, x: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if x.is_nan() {
            return first.output;
        }

        if x <= first.input {
            return match self.extrapolation {
                Extrapolation::Clamp => first.output,
                Extrapolation::Linear => {
                    let y = first.output + first.in_tangent * (x - first.input);
                    if y.is_finite() { y } else { first.output }
                }
            };
        }
        if x >= last.input {
            return match self.extrapolation {
                Extrapolation::Clamp => last.output,
                Extrapolation::Linear => {
                    let y = last.output + last.out_tangent * (x - last.input);
                    if y.is_finite() { y } else { last.output }
                }
            };
        }

        // first.input < x < last.input, so 1 <= i <= n - 1.
        let i = self.keys.partition_point(|k| k.input <= x);
        let (k0, k1) = (&self.keys[i - 1], &self.keys[i]);
        let y = hermite(k0, k1, x);
        if y.is_finite() {
            y
        } else {
            // Free tangents near f32::MAX can still overflow the cubic.
            let s = f64::from((x - k0.input) / (k1.input - k0.input));
            let (y0, y1) = (f64::from(k0.output), f64::from(k1.output));
            (y0 + (y1 - y0) * s) as f32
        }
    }
}

/// Cubic Hermite interpolation between two keys.
fn hermite(k0: &Keyframe, k1: &Keyframe, x: f32) -> f32 {
    let dt = k1.input - k0.input;
    let s = (x - k0.input) / dt;
    let s2 = s * s;
    let s3 = s2 * s;

    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;

    h00 * k0.output + h10 * dt * k0.out_tangent + h01 * k1.output + h11 * dt * k1.in_tangent
}

// ────────────────────────────────────────────────────────────────────────────
// CurveBank
// ────────────────────────────────────────────────────────────────────────────

/// A fixed bank of preset curves plus the active, editable curve.
///
/// Presets are never modified; edits apply to the active copy only, and
/// selecting a preset discards them.
#[derive(Debug, Clone)]
pub struct CurveBank {
    presets: Vec<AmplificationCurve>,
    active: AmplificationCurve,
    active_preset: usize,
}

impl Default for CurveBank {
    /// Identity curve followed by the [`DEFAULT_INTENSITIES`] curves.
    fn default() -> Self {
        let mut presets = vec![AmplificationCurve::identity()];
        presets.extend(
            DEFAULT_INTENSITIES
                .iter()
                .filter_map(|&a| AmplificationCurve::with_intensity(a).ok()),
        );
        let active = presets[0].clone();
        Self {
            presets,
            active,
            active_preset: 0,
        }
    }
}

impl CurveBank {
    /// Build a bank; the first preset becomes active.
    pub fn new(presets: Vec<AmplificationCurve>) -> Result<Self, CurveError> {
        let active = presets.first().cloned().ok_or(CurveError::EmptyBank)?;
        Ok(Self {
            presets,
            active,
            active_preset: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn presets(&self) -> &[AmplificationCurve] {
        &self.presets
    }

    /// Index of the most recently selected preset.
    pub fn active_preset(&self) -> usize {
        self.active_preset
    }

    pub fn active(&self) -> &AmplificationCurve {
        &self.active
    }

    /// The active curve, for editing.
    pub fn active_mut(&mut self) -> &mut AmplificationCurve {
        &mut self.active
    }

    /// Replace the active curve with preset `index`.
    ///
    /// Out-of-range indices are rejected and leave the active curve as is.
    pub fn select(&mut self, index: usize) -> Result<(), CurveError> {
        let preset = self.presets.get(index).ok_or(CurveError::PresetOutOfRange {
            index,
            len: self.presets.len(),
        })?;
        self.active = preset.clone();
        self.active_preset = index;
        Ok(())
    }

    /// Apply `extrapolation` to every preset and the active curve.
    pub fn set_extrapolation(&mut self, extrapolation: Extrapolation) {
        for curve in &mut self.presets {
            curve.set_extrapolation(extrapolation);
        }
        self.active.set_extrapolation(extrapolation);
    }
}

impl ResponseCurve for CurveBank {
    fn evaluate(&self, x: f32) -> f32 {
        self.active.evaluate(x)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn sample_curve() -> AmplificationCurve {
        AmplificationCurve::piecewise_linear(&[(0.0, 0.0), (0.5, 0.3), (1.0, 1.0)]).unwrap()
    }

    // ── Evaluation ──────────────────────────────────────────────────────────

    #[test]
    fn identity_is_linear() {
        let c = AmplificationCurve::identity();
        for x in [0.0, 0.1, 0.5, 0.9, 1.0] {
            assert!(approx(c.evaluate(x), x), "f({x}) = {}", c.evaluate(x));
        }
    }

    #[test]
    fn piecewise_linear_hits_keys_and_midpoints() {
        let c = sample_curve();
        assert!(approx(c.evaluate(0.5), 0.3));
        assert!(approx(c.evaluate(0.25), 0.15));
        assert!(approx(c.evaluate(0.75), 0.65));
    }

    #[test]
    fn evaluate_is_defined_everywhere() {
        let mut c = AmplificationCurve::with_intensity(0.3).unwrap();
        for extrapolation in [Extrapolation::Clamp, Extrapolation::Linear] {
            c.set_extrapolation(extrapolation);
            for x in [
                -1e30,
                -3.0,
                -0.0,
                0.3,
                1.0,
                2.5,
                1e30,
                f32::INFINITY,
                f32::NEG_INFINITY,
                f32::NAN,
            ] {
                assert!(c.evaluate(x).is_finite(), "f({x}) not finite for {extrapolation:?}");
            }
        }
    }

    #[test]
    fn clamp_extrapolation_holds_end_values() {
        let c = sample_curve();
        assert!(approx(c.evaluate(-2.0), 0.0));
        assert!(approx(c.evaluate(3.0), 1.0));
    }

    #[test]
    fn linear_extrapolation_follows_end_tangent() {
        let mut c = sample_curve();
        c.set_extrapolation(Extrapolation::Linear);
        // last segment slope is (1.0 - 0.3) / 0.5 = 1.4
        assert!(approx(c.evaluate(1.5), 1.0 + 1.4 * 0.5));
        // first segment slope is 0.6
        assert!(approx(c.evaluate(-0.5), -0.3));
    }

    #[test]
    fn auto_tangents_give_smooth_interior() {
        let c = AmplificationCurve::new(vec![
            Keyframe::new(0.0, 0.0, TangentMode::Auto),
            Keyframe::new(0.5, 0.8, TangentMode::Auto),
            Keyframe::new(1.0, 1.0, TangentMode::Auto),
        ])
        .unwrap();
        let k = c.keys()[1];
        assert!(approx(k.in_tangent, 1.0));
        assert!(approx(k.out_tangent, 1.0));
        // continuous through the middle key
        assert!(approx(c.evaluate(0.5), 0.8));
        assert!((c.evaluate(0.4999) - c.evaluate(0.5001)).abs() < 1e-3);
    }

    #[test]
    fn single_key_curve_is_constant() {
        let c = AmplificationCurve::new(vec![Keyframe::new(0.5, 0.42, TangentMode::Auto)]).unwrap();
        assert!(approx(c.evaluate(-1.0), 0.42));
        assert!(approx(c.evaluate(9.0), 0.42));
    }

    // ── Construction ────────────────────────────────────────────────────────

    #[test]
    fn unsorted_keys_are_rejected() {
        let err = AmplificationCurve::piecewise_linear(&[(0.0, 0.0), (0.6, 0.5), (0.6, 1.0)]).unwrap_err();
        assert_eq!(err, CurveError::OrderViolation { index: 2, input: 0.6 });
        assert!(AmplificationCurve::new(vec![]).is_err());
        assert!(AmplificationCurve::piecewise_linear(&[(f32::NAN, 0.0)]).is_err());
    }

    #[test]
    fn intensity_curve_amplifies() {
        let c = AmplificationCurve::with_intensity(0.3).unwrap();
        let keys = c.keys();
        assert!(approx(keys[1].input, 0.4));
        assert!(approx(keys[1].output, BASE_KEY_TIME));
        assert!(approx(keys[2].output, 1.1));
        assert!(c.evaluate(0.4) > 0.4);
        assert!(approx(c.evaluate(0.0), 0.0));
    }

    // ── Editing ─────────────────────────────────────────────────────────────

    #[test]
    fn shift_within_neighbours_succeeds() {
        let mut c = sample_curve();
        c.shift_control_point(1, -0.1).unwrap();
        assert!(approx(c.keys()[1].input, 0.4));
        assert!(approx(c.evaluate(0.4), 0.3));
    }

    #[test]
    fn shift_past_neighbour_is_rejected_without_change() {
        let mut c = sample_curve();
        let before = c.clone();
        let err = c.shift_control_point(1, 0.6).unwrap_err();
        assert!(matches!(err, CurveError::OrderViolation { index: 1, .. }));
        assert_eq!(c, before);

        // Landing exactly on a neighbour is also a violation.
        assert!(c.shift_control_point(1, -0.5).is_err());
        assert_eq!(c, before);
    }

    #[test]
    fn set_control_point_keeps_order() {
        let mut c = sample_curve();
        c.set_control_point(2, 1.2, 1.1).unwrap();
        assert!(approx(c.evaluate(1.2), 1.1));
        assert!(c.set_control_point(0, 0.7, 0.0).is_err());
        assert!(c.keys().windows(2).all(|w| w[0].input < w[1].input));
    }

    #[test]
    fn edits_reject_bad_index_and_non_finite_values() {
        let mut c = sample_curve();
        assert_eq!(
            c.shift_control_point(7, 0.1).unwrap_err(),
            CurveError::IndexOutOfRange { index: 7, len: 3 }
        );
        assert_eq!(
            c.set_control_point(1, f32::NAN, 0.2).unwrap_err(),
            CurveError::NonFinite { index: 1 }
        );
    }

    #[test]
    fn near_vertical_edit_is_rejected_without_change() {
        let mut c = AmplificationCurve::piecewise_linear(&[(0.0, 0.0), (1.0, 1.0)]).unwrap();
        let before = c.clone();
        // rise of 1e10 over a run of 1e-30 overflows the secant
        let err = c.set_control_point(1, 1e-30, 1e10).unwrap_err();
        assert!(matches!(err, CurveError::NonFiniteTangent { .. }));
        assert_eq!(c, before);
        assert!(c.evaluate(5e-31).is_finite());
        assert!(c.keys().iter().all(|k| k.in_tangent.is_finite() && k.out_tangent.is_finite()));
    }

    #[test]
    fn overflowing_tangents_are_rejected_at_construction() {
        let err = AmplificationCurve::piecewise_linear(&[(0.0, -3e38), (1e-3, 3e38)]).unwrap_err();
        assert!(matches!(err, CurveError::NonFiniteTangent { .. }));
    }

    #[test]
    fn overflowing_segment_falls_back_to_linear() {
        let c = AmplificationCurve::new(vec![
            Keyframe::free(0.0, f32::MAX, 0.0, f32::MAX),
            Keyframe::free(1.0, f32::MAX, -f32::MAX, 0.0),
        ])
        .unwrap();
        for x in [0.1, 0.5, 0.9] {
            assert_eq!(c.evaluate(x), f32::MAX, "f({x})");
        }
    }

    #[test]
    fn set_intensity_rejects_order_breaking_amount() {
        let mut c = AmplificationCurve::with_intensity(0.1).unwrap();
        let before = c.clone();
        assert!(c.set_intensity(0.8).is_err());
        assert_eq!(c, before);
        assert!(matches!(
            sample_curve().set_intensity(f32::NAN),
            Err(CurveError::NonFinite { .. })
        ));
        assert_eq!(
            AmplificationCurve::identity().set_intensity(0.1).unwrap_err(),
            CurveError::NotIntensityCurve { len: 2 }
        );
    }

    // ── CurveBank ───────────────────────────────────────────────────────────

    #[test]
    fn default_bank_starts_with_identity() {
        let bank = CurveBank::default();
        assert_eq!(bank.len(), 1 + DEFAULT_INTENSITIES.len());
        assert_eq!(bank.active_preset(), 0);
        assert!(approx(bank.evaluate(0.5), 0.5));
    }

    #[test]
    fn empty_bank_is_rejected() {
        assert_eq!(CurveBank::new(vec![]).unwrap_err(), CurveError::EmptyBank);
    }

    #[test]
    fn select_swaps_active_curve() {
        let mut bank = CurveBank::default();
        bank.select(3).unwrap();
        assert_eq!(bank.active_preset(), 3);
        assert_eq!(bank.active(), &bank.presets()[3]);
    }

    #[test]
    fn select_out_of_range_is_error_without_change() {
        let mut bank = CurveBank::default();
        bank.select(1).unwrap();
        let err = bank.select(99).unwrap_err();
        assert_eq!(err, CurveError::PresetOutOfRange { index: 99, len: 4 });
        assert_eq!(bank.active_preset(), 1);
        assert_eq!(bank.active(), &bank.presets()[1]);
    }

    #[test]
    fn editing_active_curve_leaves_presets_untouched() {
        let mut bank = CurveBank::default();
        bank.active_mut().set_control_point(1, 1.5, 1.5).unwrap();
        assert!(approx(bank.presets()[0].keys()[1].input, 1.0));
        bank.select(0).unwrap();
        assert!(approx(bank.active().keys()[1].input, 1.0));
    }

    #[test]
    fn bank_extrapolation_applies_everywhere() {
        let mut bank = CurveBank::default();
        bank.set_extrapolation(Extrapolation::Linear);
        assert!(approx(bank.evaluate(2.0), 2.0));
        bank.select(2).unwrap();
        assert_eq!(bank.active().extrapolation(), Extrapolation::Linear);
    }

    #[test]
    fn curve_error_converts_to_ergo_error() {
        let err: ErgoError = CurveError::PresetOutOfRange { index: 5, len: 4 }.into();
        assert!(matches!(err, ErgoError::Curve(ref m) if m.contains("preset 5")));
    }
}
