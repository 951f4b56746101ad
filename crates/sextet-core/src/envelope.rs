//! Envelope follower for amplitude tracking.
//!
//! Peak follower with independent attack and release coefficients, the
//! front end of every dynamics engine (compressors, gate, limiter,
//! transient shaper) and of the envelope filter.

use libm::expf;

/// Attack/release peak envelope follower.
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    attack_ms: f32,
    release_ms: f32,
    sample_rate: f32,
}

impl EnvelopeFollower {
    /// Create with 10 ms attack and 100 ms release.
    pub fn new(sample_rate: f32) -> Self {
        let mut follower = Self {
            envelope: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            attack_ms: 10.0,
            release_ms: 100.0,
            sample_rate,
        };
        follower.recalculate();
        follower
    }

    /// Set attack time in milliseconds (time to reach ~63 % of a step).
    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.max(0.01);
        self.recalculate();
    }

    /// Set release time in milliseconds.
    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.release_ms = release_ms.max(0.1);
        self.recalculate();
    }

    /// Current attack time in milliseconds.
    pub fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    /// Current release time in milliseconds.
    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    /// Update the sample rate, keeping times.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate();
    }

    /// Track one sample; returns the envelope level (non-negative).
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let rectified = input.abs();
        let coeff = if rectified > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = coeff * self.envelope + (1.0 - coeff) * rectified;
        self.envelope = crate::math::flush_denormal(self.envelope);
        self.envelope
    }

    /// Current envelope level without advancing.
    pub fn level(&self) -> f32 {
        self.envelope
    }

    /// Zero the envelope.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn recalculate(&mut self) {
        self.attack_coeff = expf(-1.0 / (self.attack_ms * 0.001 * self.sample_rate));
        self.release_coeff = expf(-1.0 / (self.release_ms * 0.001 * self.sample_rate));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_reaches_63_percent_in_one_time_constant() {
        let mut env = EnvelopeFollower::new(48000.0);
        env.set_attack_ms(10.0);
        let samples = (48000.0 * 0.010) as usize;
        let mut level = 0.0;
        for _ in 0..samples {
            level = env.process(1.0);
        }
        assert!((level - 0.632).abs() < 0.05, "got {level}");
    }

    #[test]
    fn release_decays_after_signal_stops() {
        let mut env = EnvelopeFollower::new(48000.0);
        env.set_attack_ms(1.0);
        env.set_release_ms(50.0);
        for _ in 0..4800 {
            env.process(1.0);
        }
        let held = env.level();
        for _ in 0..48000 {
            env.process(0.0);
        }
        assert!(env.level() < held * 0.01);
    }

    #[test]
    fn reset_zeroes() {
        let mut env = EnvelopeFollower::new(48000.0);
        for _ in 0..100 {
            env.process(0.9);
        }
        env.reset();
        assert_eq!(env.level(), 0.0);
    }
}
