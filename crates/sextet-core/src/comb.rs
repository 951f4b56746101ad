//! Feedback comb filter with damping.
//!
//! The Schroeder/Freeverb building block: a delay line whose output is fed
//! back through a one-pole lowpass. The damping models air absorption, so
//! high frequencies die faster than lows — the defining character of an
//! algorithmic reverb tail.
//!
//! ```text
//! y[n] = buffer[n - D]
//! filt = y * (1 - damp) + filt_prev * damp
//! buffer[n] = x[n] + filt * feedback
//! ```
//!
//! Reference: M. R. Schroeder, "Natural Sounding Artificial Reverberation",
//! JAES 1962; Jezar's Freeverb.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::math::flush_denormal;

/// Damped feedback comb filter.
#[derive(Debug, Clone)]
pub struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
    damp: f32,
    filter_state: f32,
}

impl CombFilter {
    /// Create with a fixed delay length in samples.
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; delay_samples.max(1)],
            index: 0,
            feedback: 0.5,
            damp: 0.2,
            filter_state: 0.0,
        }
    }

    /// Set the feedback amount, clamped to `[0, 0.98]` for stability.
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.98);
    }

    /// Current feedback amount.
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Set damping in `[0, 1]`: 0 = bright, 1 = dark.
    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.filter_state =
            flush_denormal(output * (1.0 - self.damp) + self.filter_state * self.damp);
        self.buffer[self.index] = flush_denormal(input + self.filter_state * self.feedback);
        self.index = (self.index + 1) % self.buffer.len();
        output
    }

    /// Zero the delay buffer and damping state.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.index = 0;
    }

    /// Delay length in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_at_delay_length() {
        let mut comb = CombFilter::new(10);
        comb.set_feedback(0.5);
        comb.set_damp(0.0);
        let mut out = Vec::new();
        out.push(comb.process(1.0));
        for _ in 0..30 {
            out.push(comb.process(0.0));
        }
        assert_eq!(out[0], 0.0);
        assert!((out[10] - 1.0).abs() < 1e-6);
        assert!((out[20] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn impulse_decays_with_feedback_below_one() {
        let mut comb = CombFilter::new(7);
        comb.set_feedback(0.9);
        comb.process(1.0);
        let mut energy_early = 0.0;
        let mut energy_late = 0.0;
        for i in 0..7000 {
            let y = comb.process(0.0);
            if i < 700 {
                energy_early += y * y;
            } else {
                energy_late += y * y;
            }
        }
        assert!(energy_late < energy_early * 0.1);
    }

    #[test]
    fn feedback_clamped() {
        let mut comb = CombFilter::new(8);
        comb.set_feedback(1.5);
        assert!(comb.feedback() <= 0.98);
    }
}
