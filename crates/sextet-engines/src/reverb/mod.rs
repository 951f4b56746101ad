//! Reverb engines.
//!
//! Decay controls map onto a 0.1–10 s RT60 range through each topology's
//! feedback coefficient, always clamped below unity; mix at 0 returns the
//! dry signal untouched.

pub mod convolution;
pub mod gated;
pub mod plate;
pub mod shimmer;
pub mod spring;

pub use convolution::ConvolutionReverb;
pub use gated::GatedReverb;
pub use plate::PlateReverb;
pub use shimmer::ShimmerReverb;
pub use spring::SpringReverb;
