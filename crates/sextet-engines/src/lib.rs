//! Sextet Engines — the 57-engine effect catalogue.
//!
//! Every engine here implements the [`Engine`](sextet_core::Engine)
//! contract from `sextet-core` and is instantiated through the factory in
//! `sextet-registry`. The modules group the catalogue by algorithmic
//! family:
//!
//! | Module | Engines |
//! |---|---|
//! | [`passthrough`] | Passthrough |
//! | [`dynamics`] | Opto/VCA compressors, transient shaper, gate, limiter, dynamic EQ |
//! | [`eq`] | Parametric and console EQs, ladder/SVF/formant/envelope filters, comb resonator |
//! | [`distortion`] | Tube preamp, wave folder, exciter, bit crusher, multiband saturator, three drive pedals |
//! | [`modulation`] | Choruses, phaser, ring mod, frequency shifter, tremolos, rotary, pitch family |
//! | [`delay`] | Tape, digital, drum, bucket-brigade, buffer repeat |
//! | [`reverb`] | Plate, spring, convolution, shimmer, gated |
//! | [`spatial`] | Wideners, spectral engines, granular, chaos, feedback network |
//! | [`utility`] | Mid-side, gain, mono maker, phase align |
//!
//! House rules every engine follows:
//!
//! - normalized `[0, 1]` parameters mapped through `sextet_core::map`
//! - smoothed targets for anything that touches gain, frequency, or time
//! - output scrubbed (`scrub_stereo`) before returning
//! - DC blockers after asymmetric nonlinearities
//! - feedback paths clamped below unity

pub mod delay;
pub mod distortion;
pub mod dynamics;
pub mod eq;
pub mod modulation;
pub mod passthrough;
pub mod reverb;
pub mod spatial;
pub mod utility;

pub use passthrough::Passthrough;
