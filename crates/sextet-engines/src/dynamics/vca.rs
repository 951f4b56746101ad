//! Classic Compressor — feed-forward VCA compressor with soft knee.
//!
//! The textbook log-domain design: RMS-ish envelope detection, a gain
//! computer with threshold/ratio/knee, and separate attack/release
//! ballistics applied to the gain-reduction signal rather than the
//! detector, which keeps the knee clean at fast settings.
//!
//! Reference: Giannoulis, Massberg & Reiss, "Digital Dynamic Range
//! Compressor Design — A Tutorial and Analysis", JAES 2012.

use sextet_core::{
    DcBlocker, Engine, ParamUpdate, SmoothedParam, map,
    math::{db_to_linear, linear_to_db, time_coeff},
    scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Threshold",
    "Ratio",
    "Attack",
    "Release",
    "Knee",
    "Makeup Gain",
    "Input Trim",
    "Auto Release",
    "Mix",
    "Output Trim",
];

/// Feed-forward VCA compressor.
pub struct ClassicCompressor {
    sample_rate: f32,

    threshold_db: f32,
    ratio: f32,
    knee_db: f32,
    attack_coeff: f32,
    release_coeff: f32,
    release_ms: f32,
    auto_release: bool,

    /// Smoothed gain reduction in dB (ballistics state).
    gr_state_db: f32,
    /// Crest-factor tracker for auto release.
    crest: f32,

    input_trim: SmoothedParam,
    makeup: SmoothedParam,
    output_trim: SmoothedParam,
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl ClassicCompressor {
    /// Create with a -18 dB threshold and 4:1 ratio.
    pub fn new(sample_rate: f32) -> Self {
        let mut engine = Self {
            sample_rate,
            threshold_db: -18.0,
            ratio: 4.0,
            knee_db: 6.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            release_ms: 100.0,
            auto_release: false,
            gr_state_db: 0.0,
            crest: 0.0,
            input_trim: SmoothedParam::standard(1.0, sample_rate),
            makeup: SmoothedParam::standard(1.0, sample_rate),
            output_trim: SmoothedParam::standard(1.0, sample_rate),
            mix: SmoothedParam::fast(1.0, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        };
        engine.set_attack_ms(10.0);
        engine.set_release_ms(100.0);
        engine
    }

    fn set_attack_ms(&mut self, ms: f32) {
        self.attack_coeff = time_coeff(ms, self.sample_rate);
    }

    fn set_release_ms(&mut self, ms: f32) {
        self.release_ms = ms;
        self.release_coeff = time_coeff(ms, self.sample_rate);
    }

    fn static_gain_db(&self, input_db: f32) -> f32 {
        let overshoot = input_db - self.threshold_db;
        let half_knee = self.knee_db * 0.5;
        if overshoot <= -half_knee {
            0.0
        } else if overshoot >= half_knee {
            -overshoot * (1.0 - 1.0 / self.ratio)
        } else {
            let t = (overshoot + half_knee) / self.knee_db;
            -(t * t) * overshoot * (1.0 - 1.0 / self.ratio)
        }
    }
}

impl Engine for ClassicCompressor {
    fn name(&self) -> &'static str {
        "Classic Compressor"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.input_trim.set_sample_rate(sample_rate);
        self.makeup.set_sample_rate(sample_rate);
        self.output_trim.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.set_release_ms(self.release_ms);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let trim = self.input_trim.advance();
            let dry_l = *l * trim;
            let dry_r = *r * trim;

            // Stereo-linked peak detection.
            let peak = dry_l.abs().max(dry_r.abs());
            let target_db = self.static_gain_db(linear_to_db(peak));

            // Auto release shortens the tail when the material is transient
            // (high crest factor) and lengthens it on dense program.
            let release = if self.auto_release {
                self.crest = 0.999 * self.crest + 0.001 * peak;
                let transientness = (peak - self.crest).max(0.0);
                let scale = 1.0 / (1.0 + 8.0 * transientness);
                time_coeff(self.release_ms * scale.max(0.1), self.sample_rate)
            } else {
                self.release_coeff
            };

            // Attack when reduction deepens, release when it recovers.
            let coeff = if target_db < self.gr_state_db {
                self.attack_coeff
            } else {
                release
            };
            self.gr_state_db = coeff * self.gr_state_db + (1.0 - coeff) * target_db;

            let gain = db_to_linear(self.gr_state_db) * self.makeup.advance();
            let mix = self.mix.advance();
            let out = self.output_trim.advance();

            let wet_l = self.dc[0].process(dry_l * gain);
            let wet_r = self.dc[1].process(dry_r * gain);
            *l = wet_dry_mix(dry_l, wet_l, mix) * out;
            *r = wet_dry_mix(dry_r, wet_r, mix) * out;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.threshold_db = map::linear(value, -60.0, 0.0),
                1 => self.ratio = map::linear(value, 1.0, 12.0),
                2 => {
                    let ms = map::exponential(value, 0.1, 100.0);
                    self.set_attack_ms(ms);
                }
                3 => {
                    let ms = map::exponential(value, 10.0, 1000.0);
                    self.set_release_ms(ms);
                }
                4 => self.knee_db = map::linear(value, 0.0, 18.0),
                5 => self.makeup.set_target(map::db_gain(value, 0.0, 24.0)),
                6 => self.input_trim.set_target(map::db_gain(value, -12.0, 12.0)),
                7 => self.auto_release = value >= 0.5,
                8 => self.mix.set_target(map::unit(value)),
                9 => self.output_trim.set_target(map::db_gain(value, -12.0, 12.0)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.gr_state_db = 0.0;
        self.crest = 0.0;
        for dc in &mut self.dc {
            dc.reset();
        }
        self.input_trim.snap_to_target();
        self.makeup.snap_to_target();
        self.output_trim.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    fn rms(buf: &[f32]) -> f32 {
        libm::sqrtf(buf.iter().map(|x| x * x).sum::<f32>() / buf.len() as f32)
    }

    fn run_sine(comp: &mut ClassicCompressor, amplitude: f32, blocks: usize) -> f32 {
        let mut tail = Vec::new();
        for block in 0..blocks {
            let mut l: Vec<f32> = (0..512)
                .map(|i| {
                    amplitude * libm::sinf(TAU * 1000.0 * (block * 512 + i) as f32 / 48000.0)
                })
                .collect();
            let mut r = l.clone();
            comp.process(&mut l, &mut r);
            if block >= blocks - 10 {
                tail.extend_from_slice(&l);
            }
        }
        rms(&tail)
    }

    #[test]
    fn steady_state_reduction_at_8_to_1() {
        let mut comp = ClassicCompressor::new(48000.0);
        comp.prepare(48000.0, 512);
        // threshold ≈ -18 dBFS, ratio ≈ 8:1, as in the product scenario.
        comp.update_parameters(
            &ParamUpdate::new()
                .with(0, 0.7)
                .with(1, 0.64)
                .with(2, 0.1)
                .with(3, 0.3),
        );
        let out_rms = run_sine(&mut comp, 1.0, 60);
        let in_rms = 1.0 / core::f32::consts::SQRT_2;
        let reduction_db = 20.0 * libm::log10f(out_rms / in_rms);
        assert!(
            reduction_db < -8.0,
            "expected >= 8 dB reduction, got {reduction_db:.1} dB"
        );
    }

    #[test]
    fn unity_below_threshold() {
        let mut comp = ClassicCompressor::new(48000.0);
        comp.prepare(48000.0, 512);
        comp.update_parameters(&ParamUpdate::new().with(0, 1.0)); // threshold at 0 dB
        let out_rms = run_sine(&mut comp, 0.1, 20);
        let expected = 0.1 / core::f32::consts::SQRT_2;
        assert!(
            (out_rms - expected).abs() / expected < 0.05,
            "rms {out_rms} vs {expected}"
        );
    }

    #[test]
    fn reset_is_deterministic() {
        let mut comp = ClassicCompressor::new(48000.0);
        comp.prepare(48000.0, 128);
        comp.update_parameters(&ParamUpdate::new().with(0, 0.3).with(1, 0.8));

        let run = |comp: &mut ClassicCompressor| -> Vec<f32> {
            comp.reset();
            let mut l: Vec<f32> = (0..128).map(|i| libm::sinf(i as f32 * 0.3)).collect();
            let mut r = l.clone();
            comp.process(&mut l, &mut r);
            l
        };
        let a = run(&mut comp);
        let b = run(&mut comp);
        assert_eq!(a, b);
    }
}
