//! DC blocking filter.
//!
//! First-order highpass after Julius O. Smith's DC blocker:
//!
//! ```text
//! y[n] = x[n] - x[n-1] + R * y[n-1]
//! ```
//!
//! The pole `R` sits just inside the unit circle; `R = 1 - 2π·fc/fs` puts
//! the -3 dB corner at `fc`. With the default ~7 Hz corner, DC is attenuated
//! by well over 40 dB while everything audible passes untouched.
//!
//! Every engine with an asymmetric nonlinearity (distortion, compression
//! with fast envelopes, wavefolding) runs one of these per channel at its
//! output; without it, downstream delay and reverb stages accumulate offset
//! until their filters saturate.
//!
//! Reference: Julius O. Smith, "Introduction to Digital Filters with Audio
//! Applications", DC Blocker section.

use core::f32::consts::PI;

/// Default corner frequency in Hz.
const DEFAULT_CUTOFF_HZ: f32 = 7.0;

/// One-pole DC blocking highpass.
#[derive(Debug, Clone)]
pub struct DcBlocker {
    coeff: f32,
    x_prev: f32,
    y_prev: f32,
}

impl DcBlocker {
    /// Create a DC blocker with a ~7 Hz corner at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            coeff: Self::coeff_for(DEFAULT_CUTOFF_HZ, sample_rate),
            x_prev: 0.0,
            y_prev: 0.0,
        }
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = input - self.x_prev + self.coeff * self.y_prev;
        self.x_prev = input;
        self.y_prev = crate::math::flush_denormal(output);
        output
    }

    /// Zero the filter memory.
    pub fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }

    /// Recompute the pole for a new sample rate, keeping the ~7 Hz corner.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.coeff = Self::coeff_for(DEFAULT_CUTOFF_HZ, sample_rate);
    }

    fn coeff_for(cutoff_hz: f32, sample_rate: f32) -> f32 {
        (1.0 - 2.0 * PI * cutoff_hz / sample_rate).clamp(0.9, 0.9999)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_dc() {
        let mut blocker = DcBlocker::new(48000.0);
        let mut out = 0.0;
        for _ in 0..48000 {
            out = blocker.process(1.0);
        }
        assert!(out.abs() < 0.01, "DC remained: {out}");
    }

    #[test]
    fn passes_1khz() {
        let mut blocker = DcBlocker::new(48000.0);
        for i in 0..48000 {
            let t = i as f32 / 48000.0;
            blocker.process(libm::sinf(2.0 * PI * 1000.0 * t));
        }
        let mut peak = 0.0f32;
        for i in 48000..48096 {
            let t = i as f32 / 48000.0;
            let y = blocker.process(libm::sinf(2.0 * PI * 1000.0 * t));
            peak = peak.max(y.abs());
        }
        assert!(peak > 0.95, "1 kHz attenuated to {peak}");
    }

    #[test]
    fn reset_clears_state() {
        let mut blocker = DcBlocker::new(48000.0);
        for _ in 0..100 {
            blocker.process(0.8);
        }
        blocker.reset();
        assert_eq!(blocker.process(0.0), 0.0);
    }
}
