//! Lock-free level metering.
//!
//! The audio thread computes peak and RMS per block and publishes them as
//! f32 bit patterns in atomics; any thread reads them without locks. Peak
//! holds the instantaneous maximum with a ~300 ms exponential decay; RMS
//! is a 50 ms one-pole mean-square window.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Readable side of a meter, shared across threads.
#[derive(Debug, Default)]
pub struct MeterOutput {
    peak_bits: AtomicU32,
    rms_bits: AtomicU32,
}

impl MeterOutput {
    /// Current peak level (linear).
    pub fn peak(&self) -> f32 {
        f32::from_bits(self.peak_bits.load(Ordering::Relaxed))
    }

    /// Current RMS level (linear).
    pub fn rms(&self) -> f32 {
        f32::from_bits(self.rms_bits.load(Ordering::Relaxed))
    }
}

/// Audio-side meter state feeding a [`MeterOutput`].
#[derive(Debug)]
pub struct Meter {
    output: Arc<MeterOutput>,
    peak: f32,
    mean_square: f32,
    sample_rate: f32,
}

/// Peak decay time constant in seconds.
const PEAK_DECAY_SECS: f32 = 0.3;

/// RMS window in seconds.
const RMS_WINDOW_SECS: f32 = 0.05;

impl Meter {
    /// Create a meter and its shared output.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            output: Arc::new(MeterOutput::default()),
            peak: 0.0,
            mean_square: 0.0,
            sample_rate,
        }
    }

    /// Handle for readers.
    pub fn output(&self) -> Arc<MeterOutput> {
        Arc::clone(&self.output)
    }

    /// Update the sample rate (affects decay constants).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Fold one stereo block into the meter and publish.
    pub fn publish(&mut self, left: &[f32], right: &[f32]) {
        let n = left.len().max(1);

        let mut block_peak = 0.0f32;
        let mut block_square = 0.0f32;
        for (l, r) in left.iter().zip(right.iter()) {
            block_peak = block_peak.max(l.abs()).max(r.abs());
            block_square += (l * l + r * r) * 0.5;
        }
        block_square /= n as f32;

        // Peak: instant attack, exponential decay sized to the block.
        let block_secs = n as f32 / self.sample_rate;
        let decay = (-block_secs / PEAK_DECAY_SECS).exp();
        self.peak = (self.peak * decay).max(block_peak);

        // RMS: one-pole over mean squares with a 50 ms time constant.
        let rms_coeff = (-block_secs / RMS_WINDOW_SECS).exp();
        self.mean_square = self.mean_square * rms_coeff + block_square * (1.0 - rms_coeff);

        self.output
            .peak_bits
            .store(self.peak.to_bits(), Ordering::Relaxed);
        self.output
            .rms_bits
            .store(self.mean_square.sqrt().to_bits(), Ordering::Relaxed);
    }

    /// Zero the meter state and published values.
    pub fn reset(&mut self) {
        self.peak = 0.0;
        self.mean_square = 0.0;
        self.output.peak_bits.store(0, Ordering::Relaxed);
        self.output.rms_bits.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_tracks_and_decays() {
        let mut meter = Meter::new(48000.0);
        let out = meter.output();
        let loud = vec![0.8f32; 512];
        meter.publish(&loud, &loud);
        assert!((out.peak() - 0.8).abs() < 1e-6);

        // ~1 second of silence decays the peak well below the hit.
        let silent = vec![0.0f32; 512];
        for _ in 0..94 {
            meter.publish(&silent, &silent);
        }
        assert!(out.peak() < 0.05, "peak stuck at {}", out.peak());
    }

    #[test]
    fn rms_settles_near_sine_rms() {
        let mut meter = Meter::new(48000.0);
        let out = meter.output();
        let sine: Vec<f32> = (0..512)
            .map(|i| (core::f32::consts::TAU * 1000.0 * i as f32 / 48000.0).sin())
            .collect();
        for _ in 0..50 {
            meter.publish(&sine, &sine);
        }
        let expected = core::f32::consts::FRAC_1_SQRT_2;
        assert!((out.rms() - expected).abs() < 0.05, "rms {}", out.rms());
    }
}
