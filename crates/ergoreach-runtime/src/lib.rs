//! `ergoreach-runtime` – the per-tick engine.
//!
//! Wires calibration, amplification, posture sampling and RULA scoring into a
//! single step a host loop calls once per frame.
//!
//! # Modules
//!
//! - [`session`] – [`Session`][session::Session]: owns all per-operator state
//!   and turns `(PoseSnapshot, commands)` into a
//!   [`TickOutput`][session::TickOutput].  Configured through
//!   [`SessionConfig`][session::SessionConfig].
//! - [`provider`] – the [`PoseProvider`][provider::PoseProvider] trait and
//!   [`ReplayProvider`][provider::ReplayProvider], which plays back JSON-lines
//!   recordings.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: the global
//!   `tracing` subscriber with an optional OTLP span exporter.

pub mod provider;
pub mod session;
pub mod telemetry;

pub use provider::{PoseProvider, RecordedFrame, ReplayError, ReplayProvider};
pub use session::{HandOutput, Session, SessionConfig, TickOutput};
pub use telemetry::{TracerProviderGuard, init_tracing};
