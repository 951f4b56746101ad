//! One-pole lowpass for damping and tone shaping.
//!
//! ```text
//! y[n] = (1 - coeff) * x[n] + coeff * y[n-1],  coeff = exp(-2π·fc/fs)
//! ```
//!
//! 6 dB/octave, one multiply per sample. Used for high-frequency damping in
//! delay and reverb feedback paths and for simple tone controls.

use crate::math::flush_denormal;
use core::f32::consts::TAU;
use libm::expf;

/// One-pole (6 dB/oct) lowpass filter.
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    coeff: f32,
    freq: f32,
    sample_rate: f32,
}

impl OnePole {
    /// Create with the given cutoff.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut f = Self {
            state: 0.0,
            coeff: 0.0,
            freq: freq_hz,
            sample_rate,
        };
        f.recalculate();
        f
    }

    /// Set the -3 dB cutoff frequency.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.freq = freq_hz.max(1.0);
        self.recalculate();
    }

    /// Update the sample rate, keeping the cutoff.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate();
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(input + self.coeff * (self.state - input));
        self.state
    }

    /// Highpass output: input minus the lowpassed signal.
    #[inline]
    pub fn process_highpass(&mut self, input: f32) -> f32 {
        input - self.process(input)
    }

    /// Zero the filter memory.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }

    fn recalculate(&mut self) {
        let fc = self.freq.clamp(1.0, self.sample_rate * 0.49);
        self.coeff = expf(-TAU * fc / self.sample_rate);
    }
}
