//! Mono Maker — collapse the low end to mono.
//!
//! Below the crossover, left and right are summed; above it the stereo
//! image passes. Vinyl-cutting practice turned mixing habit: wide bass
//! wastes headroom and translates badly, so it gets centred.

use sextet_core::{Biquad, Engine, ParamUpdate, SmoothedParam, biquad, map, scrub_stereo};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Frequency", "Amount", "Mix"];

const BUTTERWORTH_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;

/// Bass mono-fold utility.
pub struct MonoMaker {
    sample_rate: f32,
    frequency: f32,
    /// LR4 split per channel.
    lowpass: [[Biquad; 2]; 2],
    highpass: [[Biquad; 2]; 2],
    amount: SmoothedParam,
    mix: SmoothedParam,
}

impl MonoMaker {
    /// Create with a 120 Hz crossover, fully engaged.
    pub fn new(sample_rate: f32) -> Self {
        let mut engine = Self {
            sample_rate,
            frequency: 120.0,
            lowpass: core::array::from_fn(|_| [Biquad::new(), Biquad::new()]),
            highpass: core::array::from_fn(|_| [Biquad::new(), Biquad::new()]),
            amount: SmoothedParam::standard(1.0, sample_rate),
            mix: SmoothedParam::fast(1.0, sample_rate),
        };
        engine.retune();
        engine
    }

    fn retune(&mut self) {
        let lp = biquad::lowpass(self.frequency, BUTTERWORTH_Q, self.sample_rate);
        let hp = biquad::highpass(self.frequency, BUTTERWORTH_Q, self.sample_rate);
        for ch in 0..2 {
            for stage in 0..2 {
                self.lowpass[ch][stage].set_coefficients(lp);
                self.highpass[ch][stage].set_coefficients(hp);
            }
        }
    }
}

impl Engine for MonoMaker {
    fn name(&self) -> &'static str {
        "Mono Maker"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.amount.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.retune();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let amount = self.amount.advance();
            let mix = self.mix.advance();
            let dry_l = *l;
            let dry_r = *r;

            let low_l_stage0 = self.lowpass[0][0].process(dry_l);
            let low_l = self.lowpass[0][1].process(low_l_stage0);
            let low_r_stage0 = self.lowpass[1][0].process(dry_r);
            let low_r = self.lowpass[1][1].process(low_r_stage0);
            let high_l_stage0 = self.highpass[0][0].process(dry_l);
            let high_l = self.highpass[0][1].process(high_l_stage0);
            let high_r_stage0 = self.highpass[1][0].process(dry_r);
            let high_r = self.highpass[1][1].process(high_r_stage0);

            let mono_low = (low_l + low_r) * 0.5;
            let folded_l = low_l + (mono_low - low_l) * amount;
            let folded_r = low_r + (mono_low - low_r) * amount;

            let wet_l = folded_l + high_l;
            let wet_r = folded_r + high_r;
            *l = dry_l + (wet_l - dry_l) * mix;
            *r = dry_r + (wet_r - dry_r) * mix;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    self.frequency = map::exponential(value, 40.0, 500.0);
                    self.retune();
                }
                1 => self.amount.set_target(map::unit(value)),
                2 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for ch in 0..2 {
            for stage in 0..2 {
                self.lowpass[ch][stage].clear();
                self.highpass[ch][stage].clear();
            }
        }
        self.amount.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    #[test]
    fn lows_are_forced_mono() {
        let mut mono = MonoMaker::new(48000.0);
        mono.prepare(48000.0, 512);
        mono.update_parameters(
            &ParamUpdate::new().with(0, map::exponential_inv(200.0, 40.0, 500.0)),
        );
        // 50 Hz in antiphase should collapse to near silence.
        let mut max_diff = 0.0f32;
        let mut max_level = 0.0f32;
        for block in 0..40 {
            let mut l: Vec<f32> = (0..512)
                .map(|i| libm::sinf(TAU * 50.0 * (block * 512 + i) as f32 / 48000.0))
                .collect();
            let mut r: Vec<f32> = l.iter().map(|x| -x).collect();
            mono.process(&mut l, &mut r);
            if block > 20 {
                for (a, b) in l.iter().zip(r.iter()) {
                    max_diff = max_diff.max((a - b).abs());
                    max_level = max_level.max(a.abs());
                }
            }
        }
        assert!(max_diff < 0.01, "lows still stereo: {max_diff}");
        assert!(max_level < 0.05, "antiphase lows should cancel: {max_level}");
    }

    #[test]
    fn highs_keep_their_width() {
        let mut mono = MonoMaker::new(48000.0);
        mono.prepare(48000.0, 512);
        let mut max_diff = 0.0f32;
        for block in 0..40 {
            let mut l: Vec<f32> = (0..512)
                .map(|i| libm::sinf(TAU * 5000.0 * (block * 512 + i) as f32 / 48000.0))
                .collect();
            let mut r: Vec<f32> = l.iter().map(|x| -x).collect();
            mono.process(&mut l, &mut r);
            if block > 20 {
                for (a, b) in l.iter().zip(r.iter()) {
                    max_diff = max_diff.max((a - b).abs());
                }
            }
        }
        assert!(max_diff > 1.0, "highs were collapsed too: {max_diff}");
    }
}
