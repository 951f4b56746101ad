//! Sextet Control — presets and the control surface.
//!
//! This crate is the boundary between the outside world and the chain:
//!
//! - [`PresetPayload`] — the JSON interchange (and persisted session
//!   state): slot assignments plus a flat normalized parameter map.
//! - [`ControlSurface`] — validates payloads, installs them through a
//!   [`ChainHandle`](sextet_chain::ChainHandle), routes single-knob edits,
//!   and snapshots the running configuration back into a payload.
//! - [`PresetService`] — blocking HTTP client for the external
//!   preset-generation service (30 s timeout, wholesale rejection of
//!   malformed responses).
//!
//! Everything here runs on control threads. Failures are [`ControlError`]
//! values for the UI; none of them disturb the audio thread, which keeps
//! playing the previous configuration.

pub mod error;
pub mod payload;
pub mod service;
pub mod surface;

pub use error::ControlError;
pub use payload::{EngineAssignment, PresetPayload, ResolvedPreset, SlotPlan};
pub use service::PresetService;
pub use surface::ControlSurface;
