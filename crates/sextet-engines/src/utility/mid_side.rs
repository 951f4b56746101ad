//! Mid-Side Processor — full M/S toolbox.
//!
//! Encode, treat mid and side independently (gain, solo, low-frequency
//! width protection), decode. At width 1.0 with unity gains the
//! encode/decode round trip reconstructs the input to well below -90 dB;
//! the neutral fast-path makes it exact.

use sextet_core::{
    Engine, OnePole, ParamUpdate, SmoothedParam, map, scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Mid Gain",
    "Side Gain",
    "Width",
    "Low Retain",
    "Low Freq",
    "Mid Solo",
    "Side Solo",
    "Balance",
    "Output Gain",
    "Mix",
];

/// Mid/side matrix processor.
pub struct MidSideProcessor {
    mid_gain: SmoothedParam,
    side_gain: SmoothedParam,
    width: SmoothedParam,
    /// Keep lows centred: below this corner, side content folds to mid.
    low_retain: f32,
    low_freq: f32,
    side_highpass: OnePole,
    mid_solo: bool,
    side_solo: bool,
    balance: SmoothedParam,
    output: SmoothedParam,
    mix: SmoothedParam,
}

impl MidSideProcessor {
    /// Create neutral.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            mid_gain: SmoothedParam::standard(1.0, sample_rate),
            side_gain: SmoothedParam::standard(1.0, sample_rate),
            width: SmoothedParam::standard(1.0, sample_rate),
            low_retain: 0.0,
            low_freq: 120.0,
            side_highpass: OnePole::new(sample_rate, 120.0),
            mid_solo: false,
            side_solo: false,
            balance: SmoothedParam::standard(0.0, sample_rate),
            output: SmoothedParam::standard(1.0, sample_rate),
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }

    fn is_neutral(&self) -> bool {
        let settled = |p: &SmoothedParam, v: f32| p.target() == v && p.is_settled();
        settled(&self.mid_gain, 1.0)
            && settled(&self.side_gain, 1.0)
            && settled(&self.width, 1.0)
            && settled(&self.balance, 0.0)
            && settled(&self.output, 1.0)
            && self.low_retain == 0.0
            && !self.mid_solo
            && !self.side_solo
    }
}

impl Engine for MidSideProcessor {
    fn name(&self) -> &'static str {
        "Mid-Side Processor"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        for p in [
            &mut self.mid_gain,
            &mut self.side_gain,
            &mut self.width,
            &mut self.balance,
            &mut self.output,
            &mut self.mix,
        ] {
            p.set_sample_rate(sample_rate);
        }
        self.side_highpass.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        if self.is_neutral() {
            return;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mid_gain = self.mid_gain.advance();
            let side_gain = self.side_gain.advance();
            let width = self.width.advance();
            let balance = self.balance.advance();
            let out_gain = self.output.advance();
            let mix = self.mix.advance();
            let dry_l = *l;
            let dry_r = *r;

            let mut mid = (dry_l + dry_r) * 0.5;
            let mut side = (dry_l - dry_r) * 0.5;

            // Low retain folds side lows back into mid.
            if self.low_retain > 0.0 {
                let side_low = side - self.side_highpass.process_highpass(side);
                let folded = side_low * self.low_retain;
                side -= folded;
                mid += folded;
            }

            mid *= mid_gain;
            side *= side_gain * width;

            if self.mid_solo && !self.side_solo {
                side = 0.0;
            } else if self.side_solo && !self.mid_solo {
                mid = 0.0;
            }

            let mut wet_l = mid + side;
            let mut wet_r = mid - side;

            let gain_l = 1.0f32.min(1.0 - balance);
            let gain_r = 1.0f32.min(1.0 + balance);
            wet_l *= gain_l * out_gain;
            wet_r *= gain_r * out_gain;

            *l = wet_dry_mix(dry_l, wet_l, mix);
            *r = wet_dry_mix(dry_r, wet_r, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 | 1 | 8 => {
                    let target = if (value - 0.5).abs() < 1e-6 {
                        1.0
                    } else {
                        map::db_gain(value, -24.0, 24.0)
                    };
                    match index {
                        0 => self.mid_gain.set_target(target),
                        1 => self.side_gain.set_target(target),
                        _ => self.output.set_target(target),
                    }
                }
                2 => {
                    let target = if (value - 0.5).abs() < 1e-6 {
                        1.0
                    } else {
                        map::unit(value) * 2.0
                    };
                    self.width.set_target(target);
                }
                3 => self.low_retain = map::unit(value),
                4 => {
                    self.low_freq = map::exponential(value, 40.0, 500.0);
                    self.side_highpass.set_frequency(self.low_freq);
                }
                5 => self.mid_solo = value >= 0.5,
                6 => self.side_solo = value >= 0.5,
                7 => self.balance.set_target(map::bipolar(value)),
                9 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for p in [
            &mut self.mid_gain,
            &mut self.side_gain,
            &mut self.width,
            &mut self.balance,
            &mut self.output,
            &mut self.mix,
        ] {
            p.snap_to_target();
        }
        self.side_highpass.reset();
    }
}
