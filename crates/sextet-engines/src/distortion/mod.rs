//! Distortion engines.
//!
//! House rules for this family: the nonlinearity runs oversampled where its
//! top drive setting pushes meaningful energy past Nyquist/2, every output
//! passes a DC blocker (asymmetric curves rectify), and a final
//! soft-saturation stage keeps `|out| <= 1` even for full-scale input at
//! maximum drive.

pub mod bitcrusher;
pub mod exciter;
pub mod folder;
pub mod multiband;
pub mod pedals;
pub mod tube;

pub use bitcrusher::BitCrusher;
pub use exciter::HarmonicExciter;
pub use folder::WaveFolder;
pub use multiband::MultibandSaturator;
pub use pedals::{KStyleOverdrive, MuffFuzz, RodentDistortion};
pub use tube::VintageTubePreamp;
