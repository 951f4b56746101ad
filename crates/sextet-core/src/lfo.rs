//! Low-frequency oscillator for modulation effects.

use core::f32::consts::TAU;
use libm::sinf;

/// LFO waveform shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoWaveform {
    /// Sine wave.
    #[default]
    Sine,
    /// Triangle wave.
    Triangle,
    /// Rising sawtooth.
    Saw,
    /// Square wave.
    Square,
    /// Stepped random (sample & hold), one step per cycle.
    SampleHold,
}

/// Initial state of the sample-and-hold noise sequence.
const HOLD_SEED: u32 = 0x9e3779b9;

/// Phase-accumulator LFO with selectable waveform.
///
/// Output is bipolar in `[-1, 1]`; use
/// [`next_unipolar`](Lfo::next_unipolar) for `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    increment: f32,
    freq: f32,
    sample_rate: f32,
    waveform: LfoWaveform,
    hold_value: f32,
    hold_seed: u32,
}

impl Lfo {
    /// Create at the given rate and frequency.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut lfo = Self {
            phase: 0.0,
            increment: 0.0,
            freq: freq_hz,
            sample_rate,
            waveform: LfoWaveform::Sine,
            hold_value: 0.0,
            hold_seed: HOLD_SEED,
        };
        lfo.recalculate();
        lfo
    }

    /// Set the oscillation frequency in Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.freq = freq_hz.max(0.0);
        self.recalculate();
    }

    /// Select the waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Set the phase directly, in `[0, 1)` cycles.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.rem_euclid(1.0);
    }

    /// Current phase in cycles.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Update the sample rate, keeping the frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate();
    }

    /// Restart the cycle at phase zero with a fresh sample/hold sequence.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.hold_value = 0.0;
        self.hold_seed = HOLD_SEED;
    }

    /// Advance one sample; bipolar output in `[-1, 1]`.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let value = match self.waveform {
            LfoWaveform::Sine => sinf(TAU * self.phase),
            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            LfoWaveform::Saw => 2.0 * self.phase - 1.0,
            LfoWaveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoWaveform::SampleHold => self.hold_value,
        };

        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
            // xorshift step for the next held random value
            self.hold_seed ^= self.hold_seed << 13;
            self.hold_seed ^= self.hold_seed >> 17;
            self.hold_seed ^= self.hold_seed << 5;
            self.hold_value = (self.hold_seed as f32 / u32::MAX as f32) * 2.0 - 1.0;
        }
        value
    }

    /// Advance one sample; unipolar output in `[0, 1]`.
    #[inline]
    pub fn next_unipolar(&mut self) -> f32 {
        (self.next() + 1.0) * 0.5
    }

    fn recalculate(&mut self) {
        self.increment = if self.sample_rate > 0.0 {
            self.freq / self.sample_rate
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_period_matches_frequency() {
        let mut lfo = Lfo::new(1000.0, 10.0); // 100-sample period
        let first = lfo.next();
        for _ in 0..99 {
            lfo.next();
        }
        let after_period = lfo.next();
        assert!((first - after_period).abs() < 1e-3);
    }

    #[test]
    fn output_bounded_for_all_waveforms() {
        for wf in [
            LfoWaveform::Sine,
            LfoWaveform::Triangle,
            LfoWaveform::Saw,
            LfoWaveform::Square,
            LfoWaveform::SampleHold,
        ] {
            let mut lfo = Lfo::new(48000.0, 5.0);
            lfo.set_waveform(wf);
            for _ in 0..10000 {
                let v = lfo.next();
                assert!((-1.0..=1.0).contains(&v), "{wf:?} out of range: {v}");
            }
        }
    }

    #[test]
    fn unipolar_in_unit_range() {
        let mut lfo = Lfo::new(48000.0, 2.0);
        for _ in 0..10000 {
            let v = lfo.next_unipolar();
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
