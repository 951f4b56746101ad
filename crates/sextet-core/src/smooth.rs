//! Parameter smoothing for zipper-free changes.
//!
//! Stepping a gain, frequency, or delay-time control directly produces
//! audible zipper noise. [`SmoothedParam`] ramps the effective value toward
//! its target with a one-pole lag advanced once per sample:
//!
//! ```text
//! y[n] = y[n-1] + coeff * (target - y[n-1])
//! coeff = 1 - exp(-1 / (tau * sample_rate)),  tau = smoothing_time
//! ```
//!
//! A 5–20 ms time constant settles well within one block at typical block
//! sizes while keeping abrupt control changes inaudible.

use libm::expf;

/// Default smoothing time for most controls, in milliseconds.
const STANDARD_MS: f32 = 15.0;

/// Smoothing time for controls that must track quickly (mix fades, delay
/// head moves), in milliseconds.
const FAST_MS: f32 = 5.0;

/// A parameter value with one-pole exponential smoothing.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    smoothing_ms: f32,
}

impl SmoothedParam {
    /// Create with the standard ~15 ms time constant.
    pub fn standard(initial: f32, sample_rate: f32) -> Self {
        Self::with_time(initial, sample_rate, STANDARD_MS)
    }

    /// Create with the fast ~5 ms time constant.
    pub fn fast(initial: f32, sample_rate: f32) -> Self {
        Self::with_time(initial, sample_rate, FAST_MS)
    }

    /// Create with an explicit smoothing time in milliseconds.
    pub fn with_time(initial: f32, sample_rate: f32, smoothing_ms: f32) -> Self {
        let mut p = Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            smoothing_ms,
        };
        p.set_sample_rate(sample_rate);
        p
    }

    /// Set a new target; the value ramps there over the smoothing time.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set the target and jump to it immediately.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Recompute the coefficient for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if self.smoothing_ms <= 0.0 || sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples = self.smoothing_ms * 0.001 * sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples);
        }
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current smoothed value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// The target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Jump the smoothed value to the target.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    /// True once the value is within 1e-6 of the target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_to_target() {
        let mut p = SmoothedParam::standard(0.0, 48000.0);
        p.set_target(1.0);
        for _ in 0..48000 / 10 {
            p.advance();
        }
        assert!((p.get() - 1.0).abs() < 0.01, "got {}", p.get());
    }

    #[test]
    fn one_time_constant_reaches_63_percent() {
        let mut p = SmoothedParam::with_time(0.0, 48000.0, 10.0);
        p.set_target(1.0);
        for _ in 0..480 {
            p.advance();
        }
        let expected = 1.0 - expf(-1.0);
        assert!((p.get() - expected).abs() < 0.05, "got {}", p.get());
    }

    #[test]
    fn snap_settles_immediately() {
        let mut p = SmoothedParam::standard(0.0, 48000.0);
        p.set_target(0.7);
        p.snap_to_target();
        assert!(p.is_settled());
        assert_eq!(p.advance(), 0.7);
    }

    #[test]
    fn zero_smoothing_is_instant() {
        let mut p = SmoothedParam::with_time(0.0, 48000.0, 0.0);
        p.set_target(0.5);
        assert_eq!(p.advance(), 0.5);
    }
}
