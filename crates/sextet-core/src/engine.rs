//! The uniform engine contract.
//!
//! Every effect engine in the catalogue implements [`Engine`], the single
//! polymorphic interface the slot chain schedules. The trait is object-safe
//! so the chain can hold `Box<dyn Engine + Send>` and swap implementations at
//! runtime without knowing anything about the algorithm behind them.
//!
//! ## Lifecycle
//!
//! ```text
//! construct → prepare(sample_rate, max_block) → (update_parameters | process | reset)* → drop
//! ```
//!
//! - [`prepare`](Engine::prepare) may allocate (delay lines, FFT plans,
//!   scratch buffers) and is therefore a control-thread operation. It must be
//!   called before the first `process`, and again after any sample-rate or
//!   maximum-block-size change.
//! - [`process`](Engine::process) is the realtime entry point: no allocation,
//!   no blocking, no panics on any finite or non-finite input.
//! - [`reset`](Engine::reset) zeroes signal state (filter memories, delay
//!   lines, envelope followers) while keeping parameter targets, so a
//!   transport restart does not replay stale tails.
//!
//! Calling `process` on an unprepared engine is a contract violation; the
//! chain guarantees it never happens by preparing engines before installing
//! them into a slot.

use crate::params::ParamUpdate;

/// Object-safe contract for all effect engines.
///
/// Engines process stereo audio in place and receive parameters as
/// normalized values in `[0.0, 1.0]` which they map to their internal
/// musical ranges (see [`crate::map`]).
///
/// # Example
///
/// ```rust
/// use sextet_core::{Engine, ParamUpdate, map};
///
/// struct Gain {
///     gain: f32,
/// }
///
/// impl Engine for Gain {
///     fn name(&self) -> &'static str {
///         "Gain"
///     }
///
///     fn parameter_count(&self) -> usize {
///         1
///     }
///
///     fn parameter_name(&self, index: usize) -> &'static str {
///         match index {
///             0 => "Gain",
///             _ => "",
///         }
///     }
///
///     fn prepare(&mut self, _sample_rate: f32, _max_block: usize) {}
///
///     fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
///         for (l, r) in left.iter_mut().zip(right.iter_mut()) {
///             *l *= self.gain;
///             *r *= self.gain;
///         }
///     }
///
///     fn update_parameters(&mut self, update: &ParamUpdate) {
///         if let Some(v) = update.get(0) {
///             self.gain = map::db_gain(v, -24.0, 24.0);
///         }
///     }
///
///     fn reset(&mut self) {}
/// }
/// ```
pub trait Engine: Send {
    /// Human-readable engine name, constant for the engine's lifetime.
    fn name(&self) -> &'static str;

    /// Number of parameters this engine exposes, in `0..=16`.
    ///
    /// Constant for the lifetime of the engine. Indices at or beyond this
    /// count are silently ignored by [`update_parameters`](Self::update_parameters).
    fn parameter_count(&self) -> usize;

    /// Human-readable name of the parameter at `index`.
    ///
    /// Returns `""` for indices outside `0..parameter_count()`.
    fn parameter_name(&self, index: usize) -> &'static str;

    /// Ready the engine for blocks of up to `max_block` frames at `sample_rate`.
    ///
    /// May allocate; not realtime-safe. Must be called before any `process`.
    /// Re-preparing is allowed at any time and implies a full state reset.
    fn prepare(&mut self, sample_rate: f32, max_block: usize);

    /// Process one stereo block in place.
    ///
    /// `left` and `right` have equal length `n`, with `1 <= n <= max_block`
    /// from the preceding [`prepare`](Self::prepare). Realtime-safe: no
    /// allocation, no locks, bounded CPU. The output must contain no NaN or
    /// infinite samples; engines scrub their output before returning.
    fn process(&mut self, left: &mut [f32], right: &mut [f32]);

    /// Apply a batch of normalized parameter changes.
    ///
    /// Absent indices keep their current targets. Values are already clamped
    /// to `[0, 1]` by [`ParamUpdate`]; engines map them to internal ranges
    /// and begin smoothing toward the new targets. Realtime-safe.
    fn update_parameters(&mut self, update: &ParamUpdate);

    /// Zero all signal state while retaining parameter targets.
    ///
    /// Realtime-safe. Called on transport events so a restart is silent.
    fn reset(&mut self);

    /// Latency this engine introduces, in samples.
    ///
    /// Block-based spectral engines report their analysis latency here so a
    /// host can compensate. Most engines have none.
    fn reported_latency(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unity;

    impl Engine for Unity {
        fn name(&self) -> &'static str {
            "Unity"
        }
        fn parameter_count(&self) -> usize {
            0
        }
        fn parameter_name(&self, _index: usize) -> &'static str {
            ""
        }
        fn prepare(&mut self, _sample_rate: f32, _max_block: usize) {}
        fn process(&mut self, _left: &mut [f32], _right: &mut [f32]) {}
        fn update_parameters(&mut self, _update: &ParamUpdate) {}
        fn reset(&mut self) {}
    }

    #[test]
    fn trait_is_object_safe() {
        let mut engine: Box<dyn Engine + Send> = Box::new(Unity);
        engine.prepare(48000.0, 512);
        let mut l = [0.25f32; 16];
        let mut r = [0.25f32; 16];
        engine.process(&mut l, &mut r);
        assert_eq!(engine.reported_latency(), 0);
    }
}
