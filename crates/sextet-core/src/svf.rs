//! State-variable filter with simultaneous outputs.
//!
//! Chamberlin topology: one structure yields lowpass, bandpass, highpass,
//! and notch at the same time, with independent cutoff and resonance
//! controls that can be modulated per sample without re-deriving a full
//! coefficient set.
//!
//! Reference: Hal Chamberlin, "Musical Applications of Microprocessors",
//! 2nd ed., state-variable filter chapter.

use crate::math::flush_denormal;
use core::f32::consts::PI;
use libm::sinf;

/// Which output tap a caller wants from the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SvfOutput {
    /// 12 dB/oct lowpass.
    #[default]
    Lowpass,
    /// Bandpass centred at the cutoff.
    Bandpass,
    /// 12 dB/oct highpass.
    Highpass,
    /// Band-reject.
    Notch,
}

/// Chamberlin state-variable filter.
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    low: f32,
    band: f32,
    f: f32,
    q_inv: f32,
    cutoff: f32,
    resonance: f32,
    output: SvfOutput,
    sample_rate: f32,
}

impl StateVariableFilter {
    /// Create with a 1 kHz cutoff and moderate resonance.
    pub fn new(sample_rate: f32) -> Self {
        let mut svf = Self {
            low: 0.0,
            band: 0.0,
            f: 0.0,
            q_inv: 1.0,
            cutoff: 1000.0,
            resonance: 0.707,
            output: SvfOutput::Lowpass,
            sample_rate,
        };
        svf.recalculate();
        svf
    }

    /// Set the cutoff frequency in Hz.
    pub fn set_cutoff(&mut self, freq: f32) {
        self.cutoff = freq.clamp(20.0, self.sample_rate * 0.22);
        self.recalculate();
    }

    /// Set resonance Q (0.5 = heavily damped, 20 = ringing).
    pub fn set_resonance(&mut self, q: f32) {
        self.resonance = q.clamp(0.5, 40.0);
        self.recalculate();
    }

    /// Select which tap [`process`](Self::process) returns.
    pub fn set_output(&mut self, output: SvfOutput) {
        self.output = output;
    }

    /// Update the sample rate, keeping cutoff and resonance.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate();
    }

    /// Process one sample, returning all four taps `(low, band, high, notch)`.
    #[inline]
    pub fn process_all(&mut self, input: f32) -> (f32, f32, f32, f32) {
        let high = input - self.low - self.q_inv * self.band;
        self.band = flush_denormal(self.band + self.f * high);
        self.low = flush_denormal(self.low + self.f * self.band);
        let notch = high + self.low;
        (self.low, self.band, high, notch)
    }

    /// Process one sample, returning the selected tap.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let (low, band, high, notch) = self.process_all(input);
        match self.output {
            SvfOutput::Lowpass => low,
            SvfOutput::Bandpass => band,
            SvfOutput::Highpass => high,
            SvfOutput::Notch => notch,
        }
    }

    /// Zero the integrator state.
    pub fn reset(&mut self) {
        self.low = 0.0;
        self.band = 0.0;
    }

    fn recalculate(&mut self) {
        // Chamberlin: f = 2 sin(π fc / fs), stable for fc < fs/4 or so;
        // cutoff is clamped accordingly in `set_cutoff`.
        self.f = 2.0 * sinf(PI * self.cutoff / self.sample_rate);
        self.q_inv = 1.0 / self.resonance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    fn steady_peak(svf: &mut StateVariableFilter, freq: f32) -> f32 {
        let mut peak = 0.0f32;
        for i in 0..48000 {
            let t = i as f32 / 48000.0;
            let y = svf.process(libm::sinf(TAU * freq * t));
            if i > 24000 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn lowpass_rejects_highs() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(500.0);
        assert!(steady_peak(&mut svf, 100.0) > 0.8);
        svf.reset();
        assert!(steady_peak(&mut svf, 8000.0) < 0.1);
    }

    #[test]
    fn bandpass_peaks_at_centre() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(1000.0);
        svf.set_resonance(4.0);
        svf.set_output(SvfOutput::Bandpass);
        let at_centre = steady_peak(&mut svf, 1000.0);
        svf.reset();
        let off_centre = steady_peak(&mut svf, 100.0);
        assert!(at_centre > 3.0 * off_centre, "{at_centre} vs {off_centre}");
    }

    #[test]
    fn stays_bounded_at_high_resonance() {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(2000.0);
        svf.set_resonance(40.0);
        for i in 0..48000 {
            let t = i as f32 / 48000.0;
            let y = svf.process(libm::sinf(TAU * 2000.0 * t));
            assert!(y.is_finite());
            assert!(y.abs() < 100.0, "diverged: {y}");
        }
    }
}
