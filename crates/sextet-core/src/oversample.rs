//! Oversampling for anti-aliased nonlinear processing.
//!
//! A hard-driven waveshaper generates harmonics past Nyquist that fold back
//! into the audible band as inharmonic grit. Running the shaper at 2× or 4×
//! the host rate pushes those products above the original Nyquist, where the
//! decimation filter removes them:
//!
//! 1. **Upsample**: zero-stuff by the factor, lowpass at the original
//!    Nyquist (windowed-sinc FIR).
//! 2. **Shape**: run the nonlinearity once per oversampled step.
//! 3. **Downsample**: lowpass again, keep every Kth sample.
//!
//! The FIR is a 64-tap Blackman-windowed sinc, comfortably past 80 dB of
//! stopband rejection for the drive levels in this catalogue. The
//! oversampler owns all of its state; distortion engines keep one per
//! channel.

use core::f32::consts::PI;
use libm::{cosf, sinf};

/// FIR length for the anti-aliasing filters.
const TAPS: usize = 64;

/// Supported oversampling factors.
const MIN_FACTOR: usize = 2;
const MAX_FACTOR: usize = 4;

/// Windowed-sinc anti-aliasing FIR with its delay state.
#[derive(Debug, Clone)]
struct AaFir {
    coeffs: [f32; TAPS],
    state: [f32; TAPS],
    pos: usize,
}

impl AaFir {
    /// Design a lowpass at `cutoff` (fraction of the oversampled Nyquist).
    fn design(cutoff: f32, gain: f32) -> Self {
        let mut coeffs = [0.0f32; TAPS];
        let centre = (TAPS - 1) as f32 / 2.0;
        let mut sum = 0.0f32;
        for (i, c) in coeffs.iter_mut().enumerate() {
            let t = i as f32 - centre;
            let sinc = if t.abs() < 1e-6 {
                cutoff
            } else {
                sinf(PI * cutoff * t) / (PI * t)
            };
            // Blackman window
            let w = 0.42 - 0.5 * cosf(2.0 * PI * i as f32 / (TAPS - 1) as f32)
                + 0.08 * cosf(4.0 * PI * i as f32 / (TAPS - 1) as f32);
            *c = sinc * w;
            sum += *c;
        }
        // Normalize DC gain, then scale (upsampling needs a gain of K to
        // compensate for the zero-stuffed energy loss).
        for c in &mut coeffs {
            *c = *c / sum * gain;
        }
        Self {
            coeffs,
            state: [0.0; TAPS],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.state[self.pos] = input;
        let mut acc = 0.0f32;
        let mut idx = self.pos;
        for &c in &self.coeffs {
            acc += c * self.state[idx];
            idx = if idx == 0 { TAPS - 1 } else { idx - 1 };
        }
        self.pos = (self.pos + 1) % TAPS;
        acc
    }

    fn clear(&mut self) {
        self.state = [0.0; TAPS];
        self.pos = 0;
    }
}

/// 2× / 4× oversampler with a per-sample closure API.
///
/// ```rust
/// use sextet_core::{Oversampler, math};
///
/// let mut os = Oversampler::new(4);
/// let out = os.process(0.8, |x| math::fast_tanh(x * 10.0));
/// assert!(out.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct Oversampler {
    factor: usize,
    up: AaFir,
    down: AaFir,
}

impl Oversampler {
    /// Create with the given factor, snapped to 2 or 4.
    pub fn new(factor: usize) -> Self {
        let factor = if factor >= 3 { MAX_FACTOR } else { MIN_FACTOR };
        // Cut slightly below the original Nyquist to keep the transition
        // band inside the stopband at the fold frequency.
        let cutoff = 0.9 / factor as f32;
        Self {
            factor,
            up: AaFir::design(cutoff, factor as f32),
            down: AaFir::design(cutoff, 1.0),
        }
    }

    /// The active oversampling factor.
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Run one input sample through `shaper` at the oversampled rate.
    #[inline]
    pub fn process(&mut self, input: f32, mut shaper: impl FnMut(f32) -> f32) -> f32 {
        let mut out = 0.0;
        for k in 0..self.factor {
            let stuffed = if k == 0 { input } else { 0.0 };
            let interpolated = self.up.process(stuffed);
            let shaped = shaper(interpolated);
            let filtered = self.down.process(shaped);
            if k == 0 {
                out = filtered;
            }
        }
        out
    }

    /// Zero the filter state.
    pub fn reset(&mut self) {
        self.up.clear();
        self.down.clear();
    }

    /// Group delay of the two FIRs at the base rate, in samples.
    pub fn latency(&self) -> usize {
        // Each FIR delays by (TAPS-1)/2 oversampled samples.
        (TAPS - 1) / self.factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_clamped() {
        assert_eq!(Oversampler::new(1).factor(), 2);
        assert_eq!(Oversampler::new(3).factor(), 4);
        assert_eq!(Oversampler::new(8).factor(), 4);
    }

    #[test]
    fn identity_shaper_preserves_tone() {
        // A unity shaper through the oversampler should pass a mid-band sine
        // with near-unity gain (within the FIR passband ripple).
        let mut os = Oversampler::new(2);
        let sr = 48000.0;
        let mut peak = 0.0f32;
        for i in 0..4800 {
            let t = i as f32 / sr;
            let x = libm::sinf(2.0 * PI * 1000.0 * t);
            let y = os.process(x, |v| v);
            if i > 2400 {
                peak = peak.max(y.abs());
            }
        }
        assert!((peak - 1.0).abs() < 0.1, "peak {peak}");
    }

    #[test]
    fn output_finite_under_hard_drive() {
        let mut os = Oversampler::new(4);
        for i in 0..10000 {
            let x = libm::sinf(i as f32 * 0.3);
            let y = os.process(x, |v| crate::math::fast_tanh(v * 50.0));
            assert!(y.is_finite());
        }
    }
}
