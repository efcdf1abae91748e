//! [`Session`] – the per-tick engine step.
//!
//! A host loop calls [`Session::tick`] once per frame with that frame's
//! [`PoseSnapshot`] and any operator commands.  Each tick:
//!
//! 1. **Sample** – the [`PostureSampler`] validates the snapshot and derives
//!    posture angles, or falls back to the last valid sample.
//! 2. **Command** – calibration and curve commands are applied in order;
//!    failures are collected, never raised.
//! 3. **Amplify** – each calibrated hand is re-projected through the active
//!    curve.
//! 4. **Score** – the posture sample is scored with the [`RulaScorer`].
//!
//! The whole step runs inside a `tick` tracing span carrying the session id
//! and tick number.
//!
//! # Example
//!
//! ```rust
//! use ergoreach_perception::PoseSnapshot;
//! use ergoreach_runtime::session::{Session, SessionConfig};
//! use ergoreach_types::{CalibrationStatus, Command, Side};
//!
//! let mut session = Session::new(SessionConfig::default()).unwrap();
//! let out = session.tick(&PoseSnapshot::default(), &[Command::BeginCalibration(Side::Left)]);
//!
//! assert_eq!(out.tick, 1);
//! assert!(!out.tracking_valid);
//! assert_eq!(out.left.status, CalibrationStatus::CalibrateComfort);
//! ```

use ergoreach_amplify::calibration::{CalibrationStateMachine, default_idle_prompt};
use ergoreach_amplify::curve::{CurveBank, Extrapolation};
use ergoreach_amplify::{Amplification, amplify_hand};
use ergoreach_perception::{BodyPose, PoseSnapshot, PostureAngles, PostureSample, PostureSampler};
use ergoreach_rula::{RulaAssessment, RulaScorer};
use ergoreach_types::{CalibrationStatus, Command, ErgoError, JointSource, Side};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::provider::PoseProvider;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where joint poses come from; skeletal tracking gets synthetic
    /// orientations.
    pub joint_source: JointSource,
    /// Neutral grip angle of the controller, subtracted from the wrist angle.
    pub controller_angle_offset_deg: f32,
    /// Reach boundary radius as a multiple of the measured max reach.
    pub reach_radius_scale: f32,
    /// Preset selected at startup.
    pub default_preset: usize,
    /// Curve behaviour outside the calibrated range.
    pub extrapolation: Extrapolation,
    pub left_idle_prompt: String,
    pub right_idle_prompt: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            joint_source: JointSource::default(),
            controller_angle_offset_deg: 30.0,
            reach_radius_scale: 1.0,
            default_preset: 0,
            extrapolation: Extrapolation::default(),
            left_idle_prompt: default_idle_prompt(Side::Left).to_string(),
            right_idle_prompt: default_idle_prompt(Side::Right).to_string(),
        }
    }
}

impl SessionConfig {
    fn idle_prompt(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left_idle_prompt,
            Side::Right => &self.right_idle_prompt,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tick output
// ─────────────────────────────────────────────────────────────────────────────

/// Per-hand result of one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandOutput {
    pub status: CalibrationStatus,
    pub prompt: String,
    /// Amplified (or passed-through) hand position; `None` until the first
    /// valid snapshot.
    pub amplification: Option<Amplification>,
}

/// Everything one tick produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutput {
    pub tick: u64,
    pub left: HandOutput,
    pub right: HandOutput,
    pub angles: Option<PostureAngles>,
    pub left_rula: Option<i32>,
    pub right_rula: Option<i32>,
    pub lower_rula: Option<i32>,
    /// `true` when this tick's snapshot had every required joint.
    pub tracking_valid: bool,
    /// `true` when outputs are held from the last valid snapshot.
    pub stale: bool,
    pub command_errors: Vec<ErgoError>,
}

impl TickOutput {
    pub fn hand(&self, side: Side) -> &HandOutput {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Owns all per-operator state: calibrations, curves and the posture sampler.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    tick: u64,
    config: SessionConfig,
    left: CalibrationStateMachine,
    right: CalibrationStateMachine,
    bank: CurveBank,
    sampler: PostureSampler,
    scorer: RulaScorer,
    last_assessment: Option<RulaAssessment>,
}

impl Session {
    /// Build a session from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ErgoError::Curve`] when `default_preset` is not in the bank,
    /// and [`ErgoError::Parse`] for a non-positive reach scale or a
    /// non-finite controller offset.
    pub fn new(config: SessionConfig) -> Result<Self, ErgoError> {
        Self::with_bank(config, CurveBank::default())
    }

    /// Build a session around a custom preset bank.
    pub fn with_bank(config: SessionConfig, mut bank: CurveBank) -> Result<Self, ErgoError> {
        if !(config.reach_radius_scale > 0.0 && config.reach_radius_scale.is_finite()) {
            return Err(ErgoError::Parse(format!(
                "reach_radius_scale must be positive, got {}",
                config.reach_radius_scale
            )));
        }
        if !config.controller_angle_offset_deg.is_finite() {
            return Err(ErgoError::Parse(
                "controller_angle_offset_deg must be finite".to_string(),
            ));
        }

        bank.set_extrapolation(config.extrapolation);
        bank.select(config.default_preset)?;

        let calibration = |side: Side| {
            CalibrationStateMachine::new(side)
                .with_idle_prompt(config.idle_prompt(side))
                .with_reach_radius_scale(config.reach_radius_scale)
        };
        let left = calibration(Side::Left);
        let right = calibration(Side::Right);
        let sampler = PostureSampler::new(config.joint_source, config.controller_angle_offset_deg);

        let id = Uuid::new_v4();
        info!(
            session = %id,
            joint_source = %config.joint_source,
            preset = config.default_preset,
            "session created"
        );

        Ok(Self {
            id,
            tick: 0,
            config,
            left,
            right,
            bank,
            sampler,
            scorer: RulaScorer::new(),
            last_assessment: None,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Number of ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn calibration(&self, side: Side) -> &CalibrationStateMachine {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn curves(&self) -> &CurveBank {
        &self.bank
    }

    pub fn sampler(&self) -> &PostureSampler {
        &self.sampler
    }

    /// RULA breakdown of the most recent tick that had a posture sample.
    pub fn last_assessment(&self) -> Option<&RulaAssessment> {
        self.last_assessment.as_ref()
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    /// Run one tick.  Never fails: command errors are reported in the output.
    pub fn tick(&mut self, snapshot: &PoseSnapshot, commands: &[Command]) -> TickOutput {
        self.tick += 1;
        let span = info_span!("tick", session = %self.id, tick = self.tick);
        let _enter = span.enter();

        let sample = self.sampler.sample(snapshot);
        let body = sample.map(|s| s.body);

        let mut command_errors = Vec::new();
        for command in commands {
            if let Err(e) = self.apply(command, sample.as_ref()) {
                warn!(command = ?command, error = %e, "command rejected");
                command_errors.push(e);
            }
        }

        let assessment = sample.map(|s| self.scorer.assess(&s));
        if assessment.is_some() {
            self.last_assessment = assessment;
        }

        let output = TickOutput {
            tick: self.tick,
            left: self.hand_output(Side::Left, body.as_ref()),
            right: self.hand_output(Side::Right, body.as_ref()),
            angles: sample.map(|s| s.angles),
            left_rula: assessment.map(|a| a.left.score),
            right_rula: assessment.map(|a| a.right.score),
            lower_rula: assessment.map(|a| a.lower.score),
            tracking_valid: sample.is_some_and(|s| !s.stale),
            stale: sample.is_some_and(|s| s.stale),
            command_errors,
        };
        debug!(
            tracking_valid = output.tracking_valid,
            stale = output.stale,
            errors = output.command_errors.len(),
            "tick complete"
        );
        output
    }

    /// Pull the next snapshot and its commands from `provider` and tick.
    ///
    /// Returns `None` once the provider is exhausted.
    pub fn step<P: PoseProvider + ?Sized>(&mut self, provider: &mut P) -> Option<TickOutput> {
        let snapshot = provider.next_snapshot()?;
        let commands = provider.take_commands();
        Some(self.tick(&snapshot, &commands))
    }

    fn calibration_mut(&mut self, side: Side) -> &mut CalibrationStateMachine {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    fn apply(&mut self, command: &Command, sample: Option<&PostureSample>) -> Result<(), ErgoError> {
        match *command {
            Command::BeginCalibration(side) => {
                self.calibration_mut(side).begin();
            }
            Command::ConfirmCalibrationStep(side) => {
                let sample = match sample {
                    Some(s) if !s.stale => s,
                    held => {
                        let details = if held.is_some() {
                            "tracking lost; confirm needs a live pose"
                        } else {
                            "no valid pose has been tracked yet"
                        };
                        return Err(ErgoError::Calibration {
                            side,
                            details: details.to_string(),
                        });
                    }
                };
                let arm = *sample.body.arm(side);
                self.calibration_mut(side).confirm(arm.hand.position, &arm.shoulder)?;
            }
            Command::SelectPreset(index) => {
                self.bank.select(index)?;
                info!(preset = index, "curve preset selected");
            }
            Command::ShiftControlPoint { index, delta } => {
                self.bank.active_mut().shift_control_point(index, delta)?;
            }
            Command::SetControlPoint {
                index,
                input,
                output,
            } => {
                self.bank.active_mut().set_control_point(index, input, output)?;
            }
            Command::SetCurveIntensity(amount) => {
                self.bank.active_mut().set_intensity(amount)?;
                info!(amount, "curve intensity set");
            }
        }
        Ok(())
    }

    fn hand_output(&self, side: Side, body: Option<&BodyPose>) -> HandOutput {
        let calibration = self.calibration(side);
        let amplification = body.map(|b| {
            let arm = b.arm(side);
            amplify_hand(calibration, arm.hand.position, &arm.shoulder, &self.bank)
        });
        HandOutput {
            status: calibration.status(),
            prompt: calibration.prompt().to_string(),
            amplification,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
