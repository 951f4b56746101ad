//! Vintage Console EQ — shelving EQ with transformer-style drive.
//!
//! Low and high shelves with proportional-Q mid bell and a gentle
//! saturation stage between the EQ and the output, after the channel strips
//! of classic British consoles. The drive is subtle by design; this is a
//! colour EQ, not a distortion.

use sextet_core::{
    Biquad, DcBlocker, Engine, ParamUpdate, SmoothedParam, biquad, map, math::fast_tanh,
    scrub_stereo,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Low Gain",
    "Low Freq",
    "Mid Gain",
    "Mid Freq",
    "High Gain",
    "High Freq",
    "Drive",
];

/// Console-style shelving equalizer.
pub struct VintageConsoleEq {
    sample_rate: f32,
    low_gain_db: f32,
    low_freq: f32,
    mid_gain_db: f32,
    mid_freq: f32,
    high_gain_db: f32,
    high_freq: f32,

    low: [Biquad; 2],
    mid: [Biquad; 2],
    high: [Biquad; 2],
    drive: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl VintageConsoleEq {
    /// Create flat with no drive.
    pub fn new(sample_rate: f32) -> Self {
        let mut eq = Self {
            sample_rate,
            low_gain_db: 0.0,
            low_freq: 100.0,
            mid_gain_db: 0.0,
            mid_freq: 1500.0,
            high_gain_db: 0.0,
            high_freq: 8000.0,
            low: [Biquad::new(), Biquad::new()],
            mid: [Biquad::new(), Biquad::new()],
            high: [Biquad::new(), Biquad::new()],
            drive: SmoothedParam::standard(0.0, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        };
        eq.retune();
        eq
    }

    fn retune(&mut self) {
        let low = biquad::low_shelf(self.low_freq, self.low_gain_db, self.sample_rate);
        // Proportional Q: wider bell at small gains, tighter when pushed.
        let mid_q = 0.5 + 0.15 * self.mid_gain_db.abs();
        let mid = biquad::peaking(self.mid_freq, mid_q, self.mid_gain_db, self.sample_rate);
        let high = biquad::high_shelf(self.high_freq, self.high_gain_db, self.sample_rate);
        for ch in 0..2 {
            self.low[ch].set_coefficients(low);
            self.mid[ch].set_coefficients(mid);
            self.high[ch].set_coefficients(high);
        }
    }
}

impl Engine for VintageConsoleEq {
    fn name(&self) -> &'static str {
        "Vintage Console EQ"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.drive.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.retune();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let drive = self.drive.advance();
            let mut sl = *l;
            let mut sr = *r;
            sl = self.low[0].process(sl);
            sr = self.low[1].process(sr);
            sl = self.mid[0].process(sl);
            sr = self.mid[1].process(sr);
            sl = self.high[0].process(sl);
            sr = self.high[1].process(sr);

            if drive > 1e-3 {
                // Gentle transformer-style squash, gain-compensated.
                let amount = 1.0 + drive * 3.0;
                sl = self.dc[0].process(fast_tanh(sl * amount) / fast_tanh(amount));
                sr = self.dc[1].process(fast_tanh(sr * amount) / fast_tanh(amount));
            }
            *l = sl;
            *r = sr;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.low_gain_db = map::linear(value, -15.0, 15.0),
                1 => self.low_freq = map::exponential(value, 35.0, 400.0),
                2 => self.mid_gain_db = map::linear(value, -15.0, 15.0),
                3 => self.mid_freq = map::exponential(value, 250.0, 7000.0),
                4 => self.high_gain_db = map::linear(value, -15.0, 15.0),
                5 => self.high_freq = map::exponential(value, 3000.0, 16000.0),
                6 => self.drive.set_target(map::unit(value)),
                _ => {}
            }
        }
        self.retune();
    }

    fn reset(&mut self) {
        for ch in 0..2 {
            self.low[ch].clear();
            self.mid[ch].clear();
            self.high[ch].clear();
            self.dc[ch].reset();
        }
        self.drive.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    fn steady_peak(eq: &mut VintageConsoleEq, freq: f32) -> f32 {
        let mut peak = 0.0f32;
        for block in 0..30 {
            let mut l: Vec<f32> = (0..512)
                .map(|i| 0.2 * libm::sinf(TAU * freq * (block * 512 + i) as f32 / 48000.0))
                .collect();
            let mut r = l.clone();
            eq.process(&mut l, &mut r);
            if block > 15 {
                for s in &l {
                    peak = peak.max(s.abs());
                }
            }
        }
        peak
    }

    #[test]
    fn low_shelf_boosts_bass() {
        let mut eq = VintageConsoleEq::new(48000.0);
        eq.prepare(48000.0, 512);
        eq.update_parameters(&ParamUpdate::new().with(0, 1.0)); // +15 dB low shelf
        assert!(steady_peak(&mut eq, 60.0) > 0.2 * 3.0);
        assert!(steady_peak(&mut eq, 8000.0) < 0.3);
    }

    #[test]
    fn drive_adds_harmonics_but_stays_bounded() {
        let mut eq = VintageConsoleEq::new(48000.0);
        eq.prepare(48000.0, 512);
        eq.update_parameters(&ParamUpdate::new().with(6, 1.0));
        for _ in 0..20 {
            let mut l: Vec<f32> = (0..512).map(|i| libm::sinf(i as f32 * 0.2)).collect();
            let mut r = l.clone();
            eq.process(&mut l, &mut r);
            assert!(l.iter().all(|x| x.is_finite() && x.abs() <= 1.5));
        }
    }
}
