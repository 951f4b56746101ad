//! Gain Utility — trim, balance, polarity, channel swap.
//!
//! The transparent workhorse. With every control at its default the engine
//! is exactly a wire: the process loop is skipped outright rather than
//! multiplying by a smoothed 1.0 and hoping the rounding cancels.

use sextet_core::{Engine, ParamUpdate, SmoothedParam, map, scrub_stereo};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Gain", "Balance", "Phase Invert", "Channel Swap"];

/// Gain/balance/polarity utility.
pub struct GainUtility {
    gain: SmoothedParam,
    balance: SmoothedParam,
    invert: bool,
    swap: bool,
}

impl GainUtility {
    /// Create neutral.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            gain: SmoothedParam::standard(1.0, sample_rate),
            balance: SmoothedParam::standard(0.0, sample_rate),
            invert: false,
            swap: false,
        }
    }

    fn is_neutral(&self) -> bool {
        self.gain.target() == 1.0
            && self.gain.is_settled()
            && self.balance.target() == 0.0
            && self.balance.is_settled()
            && !self.invert
            && !self.swap
    }
}

impl Engine for GainUtility {
    fn name(&self) -> &'static str {
        "Gain Utility"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.gain.set_sample_rate(sample_rate);
        self.balance.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        if self.is_neutral() {
            return;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let gain = self.gain.advance();
            let balance = self.balance.advance();
            let sign = if self.invert { -1.0 } else { 1.0 };

            let mut sl = *l;
            let mut sr = *r;
            if self.swap {
                core::mem::swap(&mut sl, &mut sr);
            }
            let gain_l = gain * sign * 1.0f32.min(1.0 - balance);
            let gain_r = gain * sign * 1.0f32.min(1.0 + balance);
            *l = sl * gain_l;
            *r = sr * gain_r;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    // Exact unity at centre so the neutral check can hold.
                    let target = if (value - 0.5).abs() < 1e-6 {
                        1.0
                    } else {
                        map::db_gain(value, -24.0, 24.0)
                    };
                    self.gain.set_target(target);
                }
                1 => self.balance.set_target(map::bipolar(value)),
                2 => self.invert = value >= 0.5,
                3 => self.swap = value >= 0.5,
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.gain.snap_to_target();
        self.balance.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_is_bit_identical() {
        let mut util = GainUtility::new(48000.0);
        util.prepare(48000.0, 128);
        let src: Vec<f32> = (0..128).map(|i| libm::sinf(i as f32 * 0.3) * 0.9).collect();
        let mut l = src.clone();
        let mut r = src.clone();
        util.process(&mut l, &mut r);
        assert_eq!(l, src);
        assert_eq!(r, src);
    }

    #[test]
    fn gain_applies() {
        let mut util = GainUtility::new(48000.0);
        util.prepare(48000.0, 128);
        util.update_parameters(&ParamUpdate::new().with(0, 0.625)); // +6 dB
        let mut l = vec![0.25f32; 128];
        let mut r = vec![0.25f32; 128];
        for _ in 0..30 {
            util.process(&mut l, &mut r);
            l.fill(0.25);
            r.fill(0.25);
        }
        util.process(&mut l, &mut r);
        assert!((l[127] - 0.5).abs() < 0.02, "got {}", l[127]);
    }

    #[test]
    fn swap_and_invert() {
        let mut util = GainUtility::new(48000.0);
        util.prepare(48000.0, 16);
        util.update_parameters(&ParamUpdate::new().with(2, 1.0).with(3, 1.0));
        let mut l = vec![0.3f32; 16];
        let mut r = vec![0.7f32; 16];
        util.process(&mut l, &mut r);
        assert!((l[8] + 0.7).abs() < 1e-6);
        assert!((r[8] + 0.3).abs() < 1e-6);
    }
}
