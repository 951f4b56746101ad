//! Carrier-based modulators.
//!
//! - [`RingModulator`] — multiplies the input with a sine carrier,
//!   producing sum and difference frequencies (both sidebands).
//! - [`FrequencyShifter`] — single-sideband modulation via a Hilbert
//!   quadrature pair: every component moves by the same number of hertz,
//!   destroying harmonic ratios in a way a pitch shifter does not.

use core::f32::consts::TAU;
use sextet_core::{
    DcBlocker, Engine, HilbertPair, ParamUpdate, SmoothedParam, map, scrub_stereo, wet_dry_mix,
};

// ───────────────────────── Ring Modulator ─────────────────────────

/// Parameter names for [`RingModulator`].
pub const RING_PARAMS: &[&str] = &["Frequency", "Depth", "Mix"];

/// Classic ring modulator.
pub struct RingModulator {
    sample_rate: f32,
    phase: f32,
    frequency: SmoothedParam,
    depth: SmoothedParam,
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl RingModulator {
    /// Create with a 440 Hz carrier.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            phase: 0.0,
            frequency: SmoothedParam::with_time(440.0, sample_rate, 20.0),
            depth: SmoothedParam::standard(1.0, sample_rate),
            mix: SmoothedParam::fast(1.0, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }
}

impl Engine for RingModulator {
    fn name(&self) -> &'static str {
        "Ring Modulator"
    }

    fn parameter_count(&self) -> usize {
        RING_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        RING_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.frequency.set_sample_rate(sample_rate);
        self.depth.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let freq = self.frequency.advance();
            let depth = self.depth.advance();
            let mix = self.mix.advance();

            let carrier = libm::sinf(TAU * self.phase);
            self.phase = (self.phase + freq / self.sample_rate).rem_euclid(1.0);
            // Depth fades between tremolo-free dry and full ring product.
            let modulator = 1.0 - depth + depth * carrier;

            let dry_l = *l;
            let dry_r = *r;
            let wet_l = self.dc[0].process(dry_l * modulator);
            let wet_r = self.dc[1].process(dry_r * modulator);
            *l = wet_dry_mix(dry_l, wet_l, mix);
            *r = wet_dry_mix(dry_r, wet_r, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self
                    .frequency
                    .set_target(map::exponential(value, 1.0, 5000.0)),
                1 => self.depth.set_target(map::unit(value)),
                2 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        for dc in &mut self.dc {
            dc.reset();
        }
        self.frequency.snap_to_target();
        self.depth.snap_to_target();
        self.mix.snap_to_target();
    }
}

// ───────────────────────── Frequency Shifter ─────────────────────────

/// Parameter names for [`FrequencyShifter`].
pub const SHIFTER_PARAMS: &[&str] = &["Shift", "Direction", "Mix"];

/// Single-sideband frequency shifter.
pub struct FrequencyShifter {
    sample_rate: f32,
    hilberts: [HilbertPair; 2],
    phase: f32,
    shift_hz: SmoothedParam,
    /// 0 = down, 1 = up, 2 = both (up on L, down on R).
    direction: usize,
    mix: SmoothedParam,
}

impl FrequencyShifter {
    /// Create with no shift.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            hilberts: [HilbertPair::new(), HilbertPair::new()],
            phase: 0.0,
            shift_hz: SmoothedParam::with_time(0.0, sample_rate, 30.0),
            direction: 1,
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }
}

impl Engine for FrequencyShifter {
    fn name(&self) -> &'static str {
        "Frequency Shifter"
    }

    fn parameter_count(&self) -> usize {
        SHIFTER_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        SHIFTER_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.shift_hz.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let shift = self.shift_hz.advance();
            let mix = self.mix.advance();

            let cos = libm::cosf(TAU * self.phase);
            let sin = libm::sinf(TAU * self.phase);
            self.phase = (self.phase + shift.abs() / self.sample_rate).rem_euclid(1.0);

            let dry = [*l, *r];
            let mut wet = [0.0f32; 2];
            for ch in 0..2 {
                let (i, q) = self.hilberts[ch].process(dry[ch]);
                let up = i * cos - q * sin;
                let down = i * cos + q * sin;
                wet[ch] = match self.direction {
                    0 => down,
                    1 => up,
                    _ => {
                        if ch == 0 {
                            up
                        } else {
                            down
                        }
                    }
                };
                // A negative shift setting swaps the sideband.
                if shift < 0.0 {
                    wet[ch] = if self.direction == 1 { down } else { up };
                }
            }

            *l = wet_dry_mix(dry[0], wet[0], mix);
            *r = wet_dry_mix(dry[1], wet[1], mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                // Bipolar sweep, exponential magnitude up to ±2 kHz.
                0 => {
                    let bipolar = map::bipolar(value);
                    let magnitude = map::exponential(bipolar.abs(), 0.1, 2000.0);
                    self.shift_hz
                        .set_target(if bipolar < 0.0 { -magnitude } else { magnitude });
                }
                1 => self.direction = map::stepped(value, 3),
                2 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for h in &mut self.hilberts {
            h.reset();
        }
        self.phase = 0.0;
        self.shift_hz.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dominant_bin(signal: &[f32], sample_rate: f32) -> f32 {
        // Goertzel-style scan over a coarse grid.
        let mut best = (0.0f32, 0.0f32);
        let mut f = 100.0;
        while f < 3000.0 {
            let mut re = 0.0f32;
            let mut im = 0.0f32;
            for (n, &s) in signal.iter().enumerate() {
                let w = TAU * f * n as f32 / sample_rate;
                re += s * libm::cosf(w);
                im += s * libm::sinf(w);
            }
            let mag = re * re + im * im;
            if mag > best.1 {
                best = (f, mag);
            }
            f += 25.0;
        }
        best.0
    }

    #[test]
    fn ring_mod_produces_sidebands() {
        let mut ring = RingModulator::new(48000.0);
        ring.prepare(48000.0, 4096);
        ring.update_parameters(
            &ParamUpdate::new()
                .with(0, map::exponential_inv(300.0, 1.0, 5000.0))
                .with(1, 1.0)
                .with(2, 1.0),
        );
        let mut l: Vec<f32> = (0..4096)
            .map(|i| libm::sinf(TAU * 1000.0 * i as f32 / 48000.0))
            .collect();
        let mut r = l.clone();
        ring.process(&mut l, &mut r);
        let peak = dominant_bin(&l[1024..], 48000.0);
        // Expect 700 or 1300 Hz, not 1000.
        assert!(
            (peak - 700.0).abs() < 60.0 || (peak - 1300.0).abs() < 60.0,
            "dominant {peak} Hz"
        );
    }

    #[test]
    fn shifter_moves_a_tone_up() {
        let mut shifter = FrequencyShifter::new(48000.0);
        shifter.prepare(48000.0, 8192);
        shifter.update_parameters(
            &ParamUpdate::new().with(0, 0.93).with(1, 0.5).with(2, 1.0),
        );
        // Let the shift smoother settle, then measure.
        let tone = |start: usize, n: usize| -> Vec<f32> {
            (0..n)
                .map(|i| libm::sinf(TAU * 500.0 * (start + i) as f32 / 48000.0))
                .collect()
        };
        let mut l = tone(0, 8192);
        let mut r = l.clone();
        shifter.process(&mut l, &mut r);
        let mut l2 = tone(8192, 8192);
        let mut r2 = l2.clone();
        shifter.process(&mut l2, &mut r2);
        let peak = dominant_bin(&l2[2048..], 48000.0);
        assert!(peak > 550.0, "tone did not move up: {peak} Hz");
    }
}
