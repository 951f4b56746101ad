//! Vintage Opto Compressor — program-dependent optical-style compression.
//!
//! Models the electro-optical gain cell of classic levelling amplifiers:
//! a single "Peak Reduction" control instead of a threshold/ratio pair, a
//! gentle fixed knee, and the characteristic two-stage release — fast for
//! the first ~60 ms, then a long light-memory tail whose length grows with
//! how hard the cell was driven.
//!
//! # Signal flow
//!
//! ```text
//! in → sidechain (emphasis shelf) → envelope → opto gain curve
//! in × gain → makeup → DC block → mix → output trim
//! ```

use sextet_core::{
    Biquad, DcBlocker, Engine, EnvelopeFollower, ParamUpdate, SmoothedParam, biquad, map,
    math::{db_to_linear, linear_to_db},
    scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Peak Reduction",
    "Makeup Gain",
    "Emphasis",
    "Attack",
    "Release",
    "Knee",
    "Mix",
    "Output Trim",
];

/// Optical-style levelling compressor.
pub struct VintageOptoCompressor {
    sample_rate: f32,

    // Sidechain
    emphasis: Biquad,
    emphasis_db: f32,
    envelope: EnvelopeFollower,
    /// Slow second release stage (the "light memory").
    slow_envelope: f32,
    slow_coeff: f32,

    // Gain computing
    peak_reduction: f32,
    knee_db: f32,

    // Output
    makeup: SmoothedParam,
    output_trim: SmoothedParam,
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl VintageOptoCompressor {
    /// Create at the given sample rate with a neutral setting.
    pub fn new(sample_rate: f32) -> Self {
        let mut engine = Self {
            sample_rate,
            emphasis: Biquad::new(),
            emphasis_db: 0.0,
            envelope: EnvelopeFollower::new(sample_rate),
            slow_envelope: 0.0,
            slow_coeff: 0.0,
            peak_reduction: 0.0,
            knee_db: 6.0,
            makeup: SmoothedParam::standard(1.0, sample_rate),
            output_trim: SmoothedParam::standard(1.0, sample_rate),
            mix: SmoothedParam::fast(1.0, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        };
        engine.envelope.set_attack_ms(10.0);
        engine.envelope.set_release_ms(60.0);
        engine.recalculate_slow();
        engine.update_emphasis();
        engine
    }

    fn recalculate_slow(&mut self) {
        // Light-memory tail: 0.5–3 s depending on drive.
        let tail_ms = 500.0 + 2500.0 * self.peak_reduction;
        self.slow_coeff = sextet_core::math::time_coeff(tail_ms, self.sample_rate);
    }

    fn update_emphasis(&mut self) {
        self.emphasis
            .set_coefficients(biquad::high_shelf(3000.0, self.emphasis_db, self.sample_rate));
    }

    /// Opto transfer curve: gain reduction in dB for a sidechain level.
    fn gain_reduction_db(&self, level_db: f32) -> f32 {
        // Peak reduction sweeps the effective threshold from 0 down to -40 dB
        // with a drive-dependent soft ratio, like turning up the cell current.
        let threshold_db = -40.0 * self.peak_reduction;
        let ratio = 1.0 + 5.0 * self.peak_reduction; // up to 6:1
        let overshoot = level_db - threshold_db;
        let half_knee = self.knee_db * 0.5;
        if overshoot <= -half_knee {
            0.0
        } else if overshoot >= half_knee {
            -overshoot * (1.0 - 1.0 / ratio)
        } else {
            let t = (overshoot + half_knee) / self.knee_db;
            -(t * t) * overshoot * (1.0 - 1.0 / ratio)
        }
    }
}

impl Engine for VintageOptoCompressor {
    fn name(&self) -> &'static str {
        "Vintage Opto Compressor"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.envelope.set_sample_rate(sample_rate);
        self.makeup.set_sample_rate(sample_rate);
        self.output_trim.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.recalculate_slow();
        self.update_emphasis();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let dry_l = *l;
            let dry_r = *r;

            // Mono sidechain with HF emphasis.
            let side = (dry_l + dry_r) * 0.5;
            let side = self.emphasis.process(side);
            let fast = self.envelope.process(side);

            // Two-stage release: the slow stage only ever decays.
            if fast > self.slow_envelope {
                self.slow_envelope = fast;
            } else {
                self.slow_envelope =
                    self.slow_coeff * self.slow_envelope + (1.0 - self.slow_coeff) * fast;
            }
            let level = fast.max(self.slow_envelope * 0.7);

            let gr_db = self.gain_reduction_db(linear_to_db(level));
            let gain = db_to_linear(gr_db) * self.makeup.advance();

            let mix = self.mix.advance();
            let trim = self.output_trim.advance();
            let wet_l = self.dc[0].process(dry_l * gain);
            let wet_r = self.dc[1].process(dry_r * gain);
            *l = wet_dry_mix(dry_l, wet_l, mix) * trim;
            *r = wet_dry_mix(dry_r, wet_r, mix) * trim;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    self.peak_reduction = map::unit(value);
                    self.recalculate_slow();
                }
                1 => self.makeup.set_target(map::db_gain(value, 0.0, 24.0)),
                2 => {
                    self.emphasis_db = map::linear(value, 0.0, 12.0);
                    self.update_emphasis();
                }
                3 => self
                    .envelope
                    .set_attack_ms(map::exponential(value, 1.0, 100.0)),
                4 => self
                    .envelope
                    .set_release_ms(map::exponential(value, 20.0, 500.0)),
                5 => self.knee_db = map::linear(value, 0.0, 12.0),
                6 => self.mix.set_target(map::unit(value)),
                7 => self.output_trim.set_target(map::db_gain(value, -12.0, 12.0)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.envelope.reset();
        self.slow_envelope = 0.0;
        self.emphasis.clear();
        for dc in &mut self.dc {
            dc.reset();
        }
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

    #[test]
    fn reduces_loud_signal() {
        let mut comp = VintageOptoCompressor::new(48000.0);
        comp.prepare(48000.0, 512);
        comp.update_parameters(&ParamUpdate::new().with(0, 0.9));

        let mut out = Vec::new();
        for block in 0..40 {
            let mut l: Vec<f32> = (0..512)
                .map(|i| libm::sinf(TAU * 1000.0 * (block * 512 + i) as f32 / 48000.0))
                .collect();
            let mut r = l.clone();
            comp.process(&mut l, &mut r);
            if block > 30 {
                out.extend_from_slice(&l);
            }
        }
        assert!(rms(&out) < 0.5, "expected gain reduction, rms {}", rms(&out));
    }

    #[test]
    fn transparent_when_idle() {
        let mut comp = VintageOptoCompressor::new(48000.0);
        comp.prepare(48000.0, 512);
        // Peak reduction at zero: threshold 0 dB, ratio 1:1.
        let mut l = vec![0.1f32; 512];
        let mut r = vec![0.1f32; 512];
        for _ in 0..20 {
            comp.process(&mut l, &mut r);
            l.fill(0.1);
            r.fill(0.1);
        }
        comp.process(&mut l, &mut r);
        assert!((l[256] - 0.1).abs() < 0.02, "got {}", l[256]);
    }

    #[test]
    fn finite_at_extremes() {
        let mut comp = VintageOptoCompressor::new(48000.0);
        comp.prepare(48000.0, 256);
        let mut update = ParamUpdate::new();
        for i in 0..PARAMS.len() {
            update.set(i, 1.0);
        }
        comp.update_parameters(&update);
        let mut l = vec![1.0f32; 256];
        let mut r = vec![-1.0f32; 256];
        for _ in 0..50 {
            comp.process(&mut l, &mut r);
        }
        assert!(l.iter().chain(r.iter()).all(|x| x.is_finite()));
    }
}
