//! Dynamic EQ — a peaking band whose gain rides the band's own energy.
//!
//! A bandpass sidechain tuned to the band frequency feeds an envelope
//! follower; when the band exceeds the threshold the peaking filter's gain
//! moves toward the configured range (cut in Above mode, boost in Below
//! mode). Coefficients are re-derived at a control rate, not per sample.

use sextet_core::{
    Biquad, DcBlocker, Engine, EnvelopeFollower, ParamUpdate, SmoothedParam, biquad, map,
    math::linear_to_db, scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Frequency",
    "Threshold",
    "Ratio",
    "Attack",
    "Release",
    "Q",
    "Gain Range",
    "Mode",
];

/// Coefficient update interval in samples.
const CONTROL_INTERVAL: usize = 32;

/// Single-band dynamic equalizer.
pub struct DynamicEq {
    sample_rate: f32,

    frequency: f32,
    q: f32,
    threshold_db: f32,
    ratio: f32,
    range_db: f32,
    /// false = Above (compress peaks), true = Below (expand dips).
    below_mode: bool,

    sidechain: Biquad,
    envelope: EnvelopeFollower,
    band: [Biquad; 2],
    current_gain_db: SmoothedParam,
    control_counter: usize,

    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl DynamicEq {
    /// Create centred at 1 kHz, inactive until the threshold is lowered.
    pub fn new(sample_rate: f32) -> Self {
        let mut engine = Self {
            sample_rate,
            frequency: 1000.0,
            q: 1.0,
            threshold_db: 0.0,
            ratio: 2.0,
            range_db: -12.0,
            below_mode: false,
            sidechain: Biquad::new(),
            envelope: EnvelopeFollower::new(sample_rate),
            band: [Biquad::new(), Biquad::new()],
            current_gain_db: SmoothedParam::with_time(0.0, sample_rate, 5.0),
            control_counter: 0,
            mix: SmoothedParam::fast(1.0, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        };
        engine.envelope.set_attack_ms(5.0);
        engine.envelope.set_release_ms(80.0);
        engine.retune();
        engine
    }

    fn retune(&mut self) {
        self.sidechain
            .set_coefficients(biquad::bandpass(self.frequency, self.q, self.sample_rate));
        self.apply_band_gain(self.current_gain_db.get());
    }

    fn apply_band_gain(&mut self, gain_db: f32) {
        let coeffs = biquad::peaking(self.frequency, self.q, gain_db, self.sample_rate);
        for bq in &mut self.band {
            bq.set_coefficients(coeffs);
        }
    }

    fn dynamic_gain_db(&self, level_db: f32) -> f32 {
        if self.below_mode {
            // Below: boost when the band falls under the threshold.
            let under = (self.threshold_db - level_db).max(0.0);
            (under * (1.0 - 1.0 / self.ratio)).min(self.range_db.abs())
        } else {
            // Above: cut when the band exceeds the threshold.
            let over = (level_db - self.threshold_db).max(0.0);
            -(over * (1.0 - 1.0 / self.ratio)).min(self.range_db.abs())
        }
    }
}

impl Engine for DynamicEq {
    fn name(&self) -> &'static str {
        "Dynamic EQ"
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
        self.current_gain_db.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.retune();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let dry_l = *l;
            let dry_r = *r;

            let band_level = self.sidechain.process((dry_l + dry_r) * 0.5);
            let level_db = linear_to_db(self.envelope.process(band_level));
            self.current_gain_db
                .set_target(self.dynamic_gain_db(level_db));
            let gain_db = self.current_gain_db.advance();

            // Re-derive the peaking coefficients at control rate.
            if self.control_counter == 0 {
                self.apply_band_gain(gain_db);
            }
            self.control_counter = (self.control_counter + 1) % CONTROL_INTERVAL;

            let wet_l = self.dc[0].process(self.band[0].process(dry_l));
            let wet_r = self.dc[1].process(self.band[1].process(dry_r));
            let mix = self.mix.advance();
            *l = wet_dry_mix(dry_l, wet_l, mix);
            *r = wet_dry_mix(dry_r, wet_r, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    self.frequency = map::exponential(value, 40.0, 16000.0);
                    self.retune();
                }
                1 => self.threshold_db = map::linear(value, -60.0, 0.0),
                2 => self.ratio = map::linear(value, 1.0, 10.0),
                3 => self
                    .envelope
                    .set_attack_ms(map::exponential(value, 0.5, 100.0)),
                4 => self
                    .envelope
                    .set_release_ms(map::exponential(value, 20.0, 1000.0)),
                5 => {
                    self.q = map::exponential(value, 0.3, 8.0);
                    self.retune();
                }
                6 => self.range_db = map::linear(value, -24.0, 0.0),
                7 => self.below_mode = value >= 0.5,
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.sidechain.clear();
        self.envelope.reset();
        for bq in &mut self.band {
            bq.clear();
        }
        for dc in &mut self.dc {
            dc.reset();
        }
        self.current_gain_db.snap_to_target();
        self.control_counter = 0;
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    fn band_rms(engine: &mut DynamicEq, freq: f32, amp: f32) -> f32 {
        let mut tail = Vec::new();
        for block in 0..40 {
            let mut l: Vec<f32> = (0..512)
                .map(|i| amp * libm::sinf(TAU * freq * (block * 512 + i) as f32 / 48000.0))
                .collect();
            let mut r = l.clone();
            engine.process(&mut l, &mut r);
            if block > 30 {
                tail.extend_from_slice(&l);
            }
        }
        libm::sqrtf(tail.iter().map(|x| x * x).sum::<f32>() / tail.len() as f32)
    }

    #[test]
    fn cuts_loud_band_above_threshold() {
        let mut eq = DynamicEq::new(48000.0);
        eq.prepare(48000.0, 512);
        // Band at 1 kHz, threshold -30 dB, strong ratio, full range.
        eq.update_parameters(
            &ParamUpdate::new()
                .with(0, map::exponential_inv(1000.0, 40.0, 16000.0))
                .with(1, 0.5)
                .with(2, 0.8)
                .with(6, 0.0),
        );
        let loud = band_rms(&mut eq, 1000.0, 0.9);
        assert!(loud < 0.9 / core::f32::consts::SQRT_2 * 0.8, "no cut: {loud}");
    }

    #[test]
    fn leaves_quiet_signal_alone() {
        let mut eq = DynamicEq::new(48000.0);
        eq.prepare(48000.0, 512);
        // Threshold at 0 dB: nothing should move.
        eq.update_parameters(&ParamUpdate::new().with(1, 1.0));
        let quiet = band_rms(&mut eq, 1000.0, 0.05);
        let expected = 0.05 / core::f32::consts::SQRT_2;
        assert!((quiet - expected).abs() / expected < 0.1, "rms {quiet}");
    }
}
