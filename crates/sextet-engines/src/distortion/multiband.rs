//! Multiband Saturator — per-band drive over an LR4 crossover.
//!
//! Linkwitz-Riley 4th-order crossovers split the signal into three bands;
//! each band gets its own tanh drive with gain compensation, and the bands
//! sum flat when idle (LR4 halves are allpass-complementary).

use sextet_core::{
    Biquad, DcBlocker, Engine, ParamUpdate, SmoothedParam, biquad, map, math::fast_tanh,
    scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Low Drive",
    "Mid Drive",
    "High Drive",
    "Crossover Low",
    "Crossover High",
    "Mix",
];

/// Butterworth Q for cascaded LR4 sections.
const BUTTERWORTH_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;

/// One channel's crossover state: two split points, two cascaded biquads
/// per branch.
struct Crossover {
    low_lp: [Biquad; 2],
    low_hp: [Biquad; 2],
    high_lp: [Biquad; 2],
    high_hp: [Biquad; 2],
}

impl Crossover {
    fn new() -> Self {
        Self {
            low_lp: [Biquad::new(), Biquad::new()],
            low_hp: [Biquad::new(), Biquad::new()],
            high_lp: [Biquad::new(), Biquad::new()],
            high_hp: [Biquad::new(), Biquad::new()],
        }
    }

    fn tune(&mut self, low_freq: f32, high_freq: f32, sample_rate: f32) {
        let ll = biquad::lowpass(low_freq, BUTTERWORTH_Q, sample_rate);
        let lh = biquad::highpass(low_freq, BUTTERWORTH_Q, sample_rate);
        let hl = biquad::lowpass(high_freq, BUTTERWORTH_Q, sample_rate);
        let hh = biquad::highpass(high_freq, BUTTERWORTH_Q, sample_rate);
        for i in 0..2 {
            self.low_lp[i].set_coefficients(ll);
            self.low_hp[i].set_coefficients(lh);
            self.high_lp[i].set_coefficients(hl);
            self.high_hp[i].set_coefficients(hh);
        }
    }

    /// Split into (low, mid, high).
    #[inline]
    fn split(&mut self, input: f32) -> (f32, f32, f32) {
        let low_stage0 = self.low_lp[0].process(input);
        let low = self.low_lp[1].process(low_stage0);
        let rest_stage0 = self.low_hp[0].process(input);
        let rest = self.low_hp[1].process(rest_stage0);
        let mid_stage0 = self.high_lp[0].process(rest);
        let mid = self.high_lp[1].process(mid_stage0);
        let high_stage0 = self.high_hp[0].process(rest);
        let high = self.high_hp[1].process(high_stage0);
        (low, mid, high)
    }

    fn clear(&mut self) {
        for bq in self
            .low_lp
            .iter_mut()
            .chain(self.low_hp.iter_mut())
            .chain(self.high_lp.iter_mut())
            .chain(self.high_hp.iter_mut())
        {
            bq.clear();
        }
    }
}

/// Three-band saturator.
pub struct MultibandSaturator {
    sample_rate: f32,
    crossovers: [Crossover; 2],
    low_freq: f32,
    high_freq: f32,
    drives: [SmoothedParam; 3],
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl MultibandSaturator {
    /// Create with crossovers at 200 Hz / 3 kHz and no drive.
    pub fn new(sample_rate: f32) -> Self {
        let mut engine = Self {
            sample_rate,
            crossovers: [Crossover::new(), Crossover::new()],
            low_freq: 200.0,
            high_freq: 3000.0,
            drives: core::array::from_fn(|_| SmoothedParam::standard(1.0, sample_rate)),
            mix: SmoothedParam::fast(1.0, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        };
        engine.retune();
        engine
    }

    fn retune(&mut self) {
        for xo in &mut self.crossovers {
            xo.tune(self.low_freq, self.high_freq, self.sample_rate);
        }
    }
}

/// Drive one band with gain compensation.
#[inline]
fn saturate_band(sample: f32, drive: f32) -> f32 {
    if drive <= 1.001 {
        return sample;
    }
    fast_tanh(sample * drive) / fast_tanh(drive * 0.5).max(0.5)
}

impl Engine for MultibandSaturator {
    fn name(&self) -> &'static str {
        "Multiband Saturator"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        for d in &mut self.drives {
            d.set_sample_rate(sample_rate);
        }
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.retune();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let drive_low = self.drives[0].advance();
            let drive_mid = self.drives[1].advance();
            let drive_high = self.drives[2].advance();
            let mix = self.mix.advance();
            let dry = [*l, *r];
            let mut wet = [0.0f32; 2];

            for ch in 0..2 {
                let (low, mid, high) = self.crossovers[ch].split(dry[ch]);
                let sum = saturate_band(low, drive_low)
                    + saturate_band(mid, drive_mid)
                    + saturate_band(high, drive_high);
                wet[ch] = self.dc[ch].process(sum);
            }

            *l = wet_dry_mix(dry[0], wet[0], mix);
            *r = wet_dry_mix(dry[1], wet[1], mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0..=2 => self.drives[index].set_target(map::db_gain(value, 0.0, 30.0)),
                3 => {
                    self.low_freq = map::exponential(value, 60.0, 800.0);
                    self.retune();
                }
                4 => {
                    self.high_freq = map::exponential(value, 1000.0, 10000.0);
                    self.retune();
                }
                5 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for xo in &mut self.crossovers {
            xo.clear();
        }
        for dc in &mut self.dc {
            dc.reset();
        }
        for d in &mut self.drives {
            d.snap_to_target();
        }
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    #[test]
    fn idle_sums_near_flat() {
        let mut sat = MultibandSaturator::new(48000.0);
        sat.prepare(48000.0, 512);
        let mut peak = 0.0f32;
        for block in 0..30 {
            let mut l: Vec<f32> = (0..512)
                .map(|i| 0.5 * libm::sinf(TAU * 1000.0 * (block * 512 + i) as f32 / 48000.0))
                .collect();
            let mut r = l.clone();
            sat.process(&mut l, &mut r);
            if block > 15 {
                for s in &l {
                    peak = peak.max(s.abs());
                }
            }
        }
        assert!((peak - 0.5).abs() < 0.1, "crossover not flat: {peak}");
    }

    #[test]
    fn low_drive_only_distorts_lows() {
        let mut sat = MultibandSaturator::new(48000.0);
        sat.prepare(48000.0, 512);
        sat.update_parameters(&ParamUpdate::new().with(0, 1.0));
        // A high-frequency tone should pass nearly clean.
        let mut residual = 0.0f32;
        for block in 0..30 {
            let src: Vec<f32> = (0..512)
                .map(|i| 0.5 * libm::sinf(TAU * 8000.0 * (block * 512 + i) as f32 / 48000.0))
                .collect();
            let mut l = src.clone();
            let mut r = src.clone();
            sat.process(&mut l, &mut r);
            if block > 15 {
                for (y, x) in l.iter().zip(src.iter()) {
                    residual = residual.max((y - x).abs());
                }
            }
        }
        assert!(residual < 0.15, "high band affected by low drive: {residual}");
    }
}
