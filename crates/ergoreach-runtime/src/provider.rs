//! Pose providers.
//!
//! The engine never talks to a tracking runtime directly.  A [`PoseProvider`]
//! hands it one immutable [`PoseSnapshot`] per tick, plus any operator
//! commands that arrived since the previous one.
//!
//! [`ReplayProvider`] plays back a JSON-lines recording in which every line
//! is a [`RecordedFrame`]:
//!
//! ```text
//! {"snapshot":{"head":{"position":{"x":0,"y":1.7,"z":0}}},"commands":[]}
//! {"timestamp":"2026-01-01T12:00:00Z","snapshot":{},"commands":[{"command":"select_preset","args":2}]}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Utc};
use ergoreach_perception::PoseSnapshot;
use ergoreach_types::{Command, ErgoError};
use schemars::{JsonSchema, schema::RootSchema, schema_for};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

// ─────────────────────────────────────────────────────────────────────────────
// PoseProvider
// ─────────────────────────────────────────────────────────────────────────────

/// Source of per-tick joint snapshots.
pub trait PoseProvider {
    /// The next snapshot, or `None` when the source is exhausted.
    fn next_snapshot(&mut self) -> Option<PoseSnapshot>;

    /// Commands that arrived alongside the last snapshot.
    fn take_commands(&mut self) -> Vec<Command> {
        Vec::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recording format
// ─────────────────────────────────────────────────────────────────────────────

/// One line of a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecordedFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub snapshot: PoseSnapshot,
    #[serde(default)]
    pub commands: Vec<Command>,
}

/// JSON Schema describing one recording line.
pub fn recorded_frame_schema() -> RootSchema {
    schema_for!(RecordedFrame)
}

/// Errors while loading a recording.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read recording: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ReplayError> for ErgoError {
    fn from(e: ReplayError) -> Self {
        ErgoError::Recording(e.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ReplayProvider
// ─────────────────────────────────────────────────────────────────────────────

/// Plays back recorded frames in order.
#[derive(Debug, Clone, Default)]
pub struct ReplayProvider {
    frames: VecDeque<RecordedFrame>,
    pending: Vec<Command>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl ReplayProvider {
    pub fn from_frames(frames: Vec<RecordedFrame>) -> Self {
        Self {
            frames: frames.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON-lines recording.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ReplayError> {
        let mut frames = VecDeque::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let frame = serde_json::from_str(trimmed)
                .map_err(|source| ReplayError::Parse { line: i + 1, source })?;
            frames.push_back(frame);
        }
        debug!(frames = frames.len(), "recording parsed");
        Ok(Self {
            frames,
            ..Self::default()
        })
    }

    /// Load a recording from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let provider = Self::from_reader(BufReader::new(File::open(path)?))?;
        info!(path = %path.display(), frames = provider.remaining(), "recording loaded");
        Ok(provider)
    }

    /// Frames not yet played.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_finished(&self) -> bool {
        self.frames.is_empty()
    }

    /// Timestamp of the most recently played frame, when recorded.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }
}

impl PoseProvider for ReplayProvider {
    fn next_snapshot(&mut self) -> Option<PoseSnapshot> {
        let frame = self.frames.pop_front()?;
        self.pending = frame.commands;
        self.last_timestamp = frame.timestamp;
        Some(frame.snapshot)
    }

    fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.pending)
    }
}
