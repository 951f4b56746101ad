//! Passthrough — the empty-slot engine.
//!
//! Copies input to output unchanged, exposes no parameters, and is the
//! substitute the factory returns for unknown ids. Keeping a real engine in
//! "empty" slots means the chain never branches on null.

use sextet_core::{Engine, ParamUpdate};

/// No-op engine: output is bit-identical to input.
#[derive(Debug, Default, Clone)]
pub struct Passthrough;

impl Passthrough {
    /// Create a passthrough engine. The sample rate is accepted for factory
    /// uniformity and ignored.
    pub fn new(_sample_rate: f32) -> Self {
        Self
    }
}

impl Engine for Passthrough {
    fn name(&self) -> &'static str {
        "Passthrough"
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
