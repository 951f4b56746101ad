//! Control-surface error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by preset handling and the preset service.
///
/// None of these ever reach the audio thread; a failed preset leaves the
/// chain exactly as it was.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Payload referenced a slot outside 1..=6.
    #[error("slot {0} out of range (presets address slots 1..=6)")]
    SlotOutOfRange(u32),

    /// Payload referenced an engine id outside 0..=56.
    #[error("engine id {0} out of range (catalogue is 0..=56)")]
    EngineIdOutOfRange(u32),

    /// A parameter value was NaN or infinite.
    #[error("parameter '{key}' has non-finite value")]
    NonFiniteParameter {
        /// The offending flat-map key.
        key: String,
    },

    /// The payload failed to parse as JSON.
    #[error("malformed preset payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The chain's command channel is gone.
    #[error(transparent)]
    Chain(#[from] sextet_chain::ChainError),

    /// Preset service request failed (network, timeout, HTTP status).
    #[error("preset service request failed: {0}")]
    Service(#[from] reqwest::Error),

    /// No endpoint configured for the preset service.
    #[error("no preset service endpoint configured")]
    NoEndpoint,

    /// Failed to read a persisted preset.
    #[error("failed to read preset '{path}': {source}")]
    ReadFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a persisted preset.
    #[error("failed to write preset '{path}': {source}")]
    WriteFile {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
