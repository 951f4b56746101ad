//! Sextet Core — the engine contract and DSP primitives.
//!
//! This crate is the foundation of the sextet multi-effect engine. It
//! defines the polymorphic [`Engine`] contract every effect in the
//! catalogue honours, the [`ParamUpdate`] batch type that carries
//! normalized parameter changes across threads, and the small DSP building
//! blocks the engines are assembled from.
//!
//! # Contract types
//!
//! - [`Engine`] — object-safe stereo processor contract
//! - [`ParamUpdate`] — sparse, `Copy`, allocation-free parameter batch
//! - [`map`] — normalized `[0, 1]` → musical-range mapping curves
//!
//! # Signal hygiene
//!
//! - [`DenormalGuard`] — scoped CPU flush-to-zero mode for the audio thread
//! - [`scrub`] — NaN/Inf/subnormal removal over buffers
//! - [`DcBlocker`] — mandatory output stage for asymmetric nonlinearities
//! - [`SmoothedParam`] — zipper-free parameter ramping
//!
//! # DSP building blocks
//!
//! - [`Biquad`] (RBJ cookbook), [`StateVariableFilter`], [`OnePole`]
//! - [`InterpolatedDelay`], [`CombFilter`], [`AllpassFilter`]
//! - [`Lfo`], [`EnvelopeFollower`]
//! - [`Oversampler`] — anti-aliased 2×/4× nonlinear processing
//! - [`GrainlessShifter`], [`HilbertPair`] — pitch and frequency shifting
//!
//! # Design principles
//!
//! - **Realtime-safe processing**: nothing in a `process` path allocates,
//!   locks, or panics.
//! - **libm-only math**: the crate stays `no_std`-compatible for embedded
//!   targets; only the denormal guard touches architecture intrinsics.
//! - **Engines own their state**: every primitive is a plain value type the
//!   owning engine resets and re-prepares.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod allpass;
pub mod biquad;
pub mod comb;
pub mod dc_blocker;
pub mod delay_line;
pub mod denormal;
pub mod engine;
pub mod envelope;
pub mod hilbert;
pub mod lfo;
pub mod map;
pub mod math;
pub mod one_pole;
pub mod oversample;
pub mod params;
pub mod pitch;
pub mod scrub;
pub mod smooth;
pub mod svf;

pub use allpass::AllpassFilter;
pub use biquad::Biquad;
pub use comb::CombFilter;
pub use dc_blocker::DcBlocker;
pub use delay_line::{InterpolatedDelay, Interpolation};
pub use denormal::DenormalGuard;
pub use engine::Engine;
pub use envelope::EnvelopeFollower;
pub use hilbert::HilbertPair;
pub use lfo::{Lfo, LfoWaveform};
pub use math::{
    db_to_linear, flush_denormal, linear_to_db, soft_clip, soft_limit, wet_dry_mix,
};
pub use one_pole::OnePole;
pub use oversample::Oversampler;
pub use params::{MAX_PARAMS, ParamUpdate};
pub use pitch::GrainlessShifter;
pub use scrub::{scrub, scrub_stereo};
pub use smooth::SmoothedParam;
pub use svf::{StateVariableFilter, SvfOutput};
