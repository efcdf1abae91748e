use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which of the operator's hands a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, left first.
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = ErgoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Side::Left),
            "right" | "r" => Ok(Side::Right),
            other => Err(ErgoError::Parse(format!("unknown side '{other}'"))),
        }
    }
}

/// Lifecycle of the per-hand amplification calibration.
///
/// The only legal forward path is
/// `Inactive → CalibrateComfort → CalibrateMax → Active`; beginning a new
/// calibration from any state jumps back to `CalibrateComfort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    /// Amplification is not running.
    #[default]
    Inactive,
    /// Waiting for the operator to confirm the comfortable hand position.
    CalibrateComfort,
    /// Waiting for the operator to confirm the maximum reach.
    CalibrateMax,
    /// Calibrated; amplification runs every tick.
    Active,
}

/// Where the joint poses fed to the posture sampler come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JointSource {
    /// An inverse-kinematics body model; orientations are authoritative.
    InverseKinematics,
    /// External skeletal tracking; positions only, orientations are derived.
    Skeletal,
    /// Source not specified; treated like `InverseKinematics`.
    #[default]
    None,
}

impl std::fmt::Display for JointSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JointSource::InverseKinematics => write!(f, "inverse_kinematics"),
            JointSource::Skeletal => write!(f, "skeletal"),
            JointSource::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for JointSource {
    type Err = ErgoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inverse_kinematics" | "ik" => Ok(JointSource::InverseKinematics),
            "skeletal" | "kinect" => Ok(JointSource::Skeletal),
            "none" => Ok(JointSource::None),
            other => Err(ErgoError::Parse(format!("unknown joint source '{other}'"))),
        }
    }
}

/// Discrete operator / tooling commands consumed by a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum Command {
    /// Start (or restart) calibration for one hand.
    BeginCalibration(Side),
    /// Confirm the current calibration step for one hand.
    ConfirmCalibrationStep(Side),
    /// Swap the amplification curve for a preset from the bank.
    SelectPreset(usize),
    /// Move a curve control point's input coordinate by `delta`.
    ShiftControlPoint { index: usize, delta: f32 },
    /// Reposition a curve control point.
    SetControlPoint { index: usize, input: f32, output: f32 },
    /// Re-shape a three-key curve to the given amplification intensity.
    SetCurveIntensity(f32),
}

/// Workspace-wide error type.
///
/// None of these are fatal to the tick loop: they are either reported back to
/// the caller of a command or logged and replaced by a fallback value.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ErgoError {
    #[error("Curve Error: {0}")]
    Curve(String),

    #[error("Calibration Error on {side} hand: {details}")]
    Calibration { side: Side, details: String },

    #[error("Invalid Tracking: {0}")]
    InvalidTracking(String),

    #[error("Table Index Out Of Range: {table} index {index} exceeds dimension {dim}")]
    TableIndex {
        table: String,
        index: usize,
        dim: usize,
    },

    #[error("Recording Error: {0}")]
    Recording(String),

    #[error("Parse Error: {0}")]
    Parse(String),
}
