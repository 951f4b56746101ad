//! Spatial and spectral engines.
//!
//! The FFT-based engines (freeze, gate, vocoder — and the convolution
//! reverb next door) share the [`spectral::Stft`] helper and report its
//! one-frame latency through `reported_latency`.

pub mod chaos;
pub mod freeze;
pub mod gate;
pub mod granular;
pub mod network;
pub mod spectral;
pub mod vocoder;
pub mod width;

pub use chaos::ChaosGenerator;
pub use freeze::SpectralFreeze;
pub use gate::SpectralGate;
pub use granular::GranularCloud;
pub use network::FeedbackNetwork;
pub use vocoder::PhasedVocoder;
pub use width::{DimensionExpander, StereoImager, StereoWidener};
