//! RULA score lookup tables.
//!
//! [`UPPER`] is indexed `[shoulder][wrist][wrist_twist][lower_arm]` and
//! [`LOWER`] `[trunk][neck]`, all zero-based.  Bins are one-based, so callers
//! go through [`upper_score`] / [`lower_score`], which validate every bin
//! against its [`Dimension`] before indexing.
//!
//! # Example
//!
//! ```rust
//! use ergoreach_rula::tables::{LowerBins, UpperBins, lower_score, upper_score};
//!
//! assert_eq!(upper_score(UpperBins::new(1, 1, 1, 1)), Ok(1));
//! assert_eq!(lower_score(LowerBins::new(1, 1)), Ok(1));
//! assert!(upper_score(UpperBins::new(1, 1, 1, 4)).is_err());
//! ```

use std::fmt;

use ergoreach_types::ErgoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SHOULDER_BINS: usize = 6;
pub const WRIST_BINS: usize = 4;
pub const WRIST_TWIST_BINS: usize = 2;
pub const LOWER_ARM_BINS: usize = 3;
pub const TRUNK_BINS: usize = 6;
pub const NECK_BINS: usize = 6;

type UpperTable = [[[[u8; LOWER_ARM_BINS]; WRIST_TWIST_BINS]; WRIST_BINS]; SHOULDER_BINS];
type LowerTable = [[u8; NECK_BINS]; TRUNK_BINS];

/// Upper-limb score (RULA table A).
#[rustfmt::skip]
pub static UPPER: UpperTable = [
    [[[1, 2, 2], [2, 2, 3]], [[2, 2, 3], [2, 2, 3]], [[2, 3, 3], [3, 3, 3]], [[3, 3, 4], [3, 3, 4]]],
    [[[2, 3, 3], [3, 3, 4]], [[3, 3, 4], [3, 3, 4]], [[3, 3, 4], [4, 4, 4]], [[4, 4, 5], [4, 4, 5]]],
    [[[3, 3, 4], [3, 4, 4]], [[4, 4, 4], [4, 4, 4]], [[4, 4, 4], [4, 4, 5]], [[5, 5, 5], [5, 5, 5]]],
    [[[4, 4, 4], [4, 4, 4]], [[4, 4, 4], [4, 4, 5]], [[4, 4, 5], [5, 5, 5]], [[5, 5, 6], [5, 5, 6]]],
    [[[5, 5, 6], [5, 6, 6]], [[5, 6, 6], [5, 6, 7]], [[5, 6, 7], [6, 7, 7]], [[6, 7, 7], [7, 7, 8]]],
    [[[7, 8, 9], [7, 8, 9]], [[7, 8, 9], [7, 8, 9]], [[7, 8, 9], [8, 9, 9]], [[8, 9, 9], [9, 9, 9]]],
];

/// Neck/trunk score (RULA table B, legs fixed).
#[rustfmt::skip]
pub static LOWER: LowerTable = [
    [1, 2, 3, 5, 7, 8],
    [2, 2, 3, 5, 7, 8],
    [3, 4, 4, 6, 7, 8],
    [5, 5, 5, 7, 8, 8],
    [6, 6, 6, 7, 8, 9],
    [7, 7, 7, 8, 8, 9],
];

// ────────────────────────────────────────────────────────────────────────────
// Dimensions & errors
// ────────────────────────────────────────────────────────────────────────────

/// A single axis of one of the lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Shoulder,
    Wrist,
    WristTwist,
    LowerArm,
    Trunk,
    Neck,
}

impl Dimension {
    /// Number of bins along this axis.
    pub const fn size(self) -> usize {
        match self {
            Dimension::Shoulder => SHOULDER_BINS,
            Dimension::Wrist => WRIST_BINS,
            Dimension::WristTwist => WRIST_TWIST_BINS,
            Dimension::LowerArm => LOWER_ARM_BINS,
            Dimension::Trunk => TRUNK_BINS,
            Dimension::Neck => NECK_BINS,
        }
    }

    /// Zero-based index for the one-based `bin`.
    pub fn index(self, bin: u8) -> Result<usize, TableIndexError> {
        let bin_index = usize::from(bin);
        if (1..=self.size()).contains(&bin_index) {
            Ok(bin_index - 1)
        } else {
            Err(TableIndexError {
                dimension: self,
                bin,
            })
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Shoulder => "shoulder",
            Dimension::Wrist => "wrist",
            Dimension::WristTwist => "wrist_twist",
            Dimension::LowerArm => "lower_arm",
            Dimension::Trunk => "trunk",
            Dimension::Neck => "neck",
        };
        f.write_str(name)
    }
}

/// A bin that falls outside its table dimension.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{dimension} bin {bin} outside table dimension 1..={}", .dimension.size())]
pub struct TableIndexError {
    pub dimension: Dimension,
    pub bin: u8,
}

impl From<TableIndexError> for ErgoError {
    fn from(e: TableIndexError) -> Self {
        ErgoError::TableIndex {
            table: e.dimension.to_string(),
            index: usize::from(e.bin),
            dim: e.dimension.size(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Lookups
// ────────────────────────────────────────────────────────────────────────────

/// One-based bins for an upper-limb lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpperBins {
    pub shoulder: u8,
    pub wrist: u8,
    pub wrist_twist: u8,
    pub lower_arm: u8,
}

impl UpperBins {
    pub fn new(shoulder: u8, wrist: u8, wrist_twist: u8, lower_arm: u8) -> Self {
        Self {
            shoulder,
            wrist,
            wrist_twist,
            lower_arm,
        }
    }
}

/// One-based bins for a neck/trunk lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowerBins {
    pub trunk: u8,
    pub neck: u8,
}

impl LowerBins {
    pub fn new(trunk: u8, neck: u8) -> Self {
        Self { trunk, neck }
    }
}

pub fn upper_score(bins: UpperBins) -> Result<u8, TableIndexError> {
    let s = Dimension::Shoulder.index(bins.shoulder)?;
    let w = Dimension::Wrist.index(bins.wrist)?;
    let t = Dimension::WristTwist.index(bins.wrist_twist)?;
    let l = Dimension::LowerArm.index(bins.lower_arm)?;
    Ok(UPPER[s][w][t][l])
}

pub fn lower_score(bins: LowerBins) -> Result<u8, TableIndexError> {
    let t = Dimension::Trunk.index(bins.trunk)?;
    let n = Dimension::Neck.index(bins.neck)?;
    Ok(LOWER[t][n])
}
