//! Modulation engines: LFO-swept delays, filters, amplitudes, and the
//! pitch-shifting family.
//!
//! Shared conventions: every LFO rate parameter maps exponentially onto
//! `0.01..20 Hz`, depth 0 means no modulation at all, and stereo variants
//! run the right channel's LFO at a phase offset rather than a separate
//! rate so the two sides never drift apart.

pub mod chorus;
pub mod phaser;
pub mod pitch;
pub mod ring;
pub mod rotary;
pub mod tremolo;

pub use chorus::{DigitalChorus, ResonantChorus};
pub use phaser::AnalogPhaser;
pub use pitch::{DetuneDoubler, IntelligentHarmonizer, PitchShifter};
pub use ring::{FrequencyShifter, RingModulator};
pub use rotary::RotarySpeaker;
pub use tremolo::{ClassicTremolo, HarmonicTremolo};
