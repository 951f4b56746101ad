//! Transient Shaper — attack/sustain envelope redesign.
//!
//! Two envelope followers with different ballistics track the same signal;
//! their difference isolates the attack portion, and the slow one stands in
//! for sustain. Each region gets its own gain, so drums can be snapped
//! forward or pushed back without a threshold.

use sextet_core::{
    DcBlocker, Engine, EnvelopeFollower, ParamUpdate, SmoothedParam, map,
    math::{db_to_linear, soft_clip},
    scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Attack Gain",
    "Sustain Gain",
    "Attack Time",
    "Release Time",
    "Detection",
    "Smoothing",
    "Soft Clip",
    "Output Gain",
    "Stereo Link",
    "Mix",
];

/// Per-channel detection state.
#[derive(Clone)]
struct Detector {
    fast: EnvelopeFollower,
    slow: EnvelopeFollower,
}

impl Detector {
    fn new(sample_rate: f32) -> Self {
        let mut fast = EnvelopeFollower::new(sample_rate);
        fast.set_attack_ms(1.0);
        fast.set_release_ms(30.0);
        let mut slow = EnvelopeFollower::new(sample_rate);
        slow.set_attack_ms(30.0);
        slow.set_release_ms(300.0);
        Self { fast, slow }
    }

    /// Returns (attack amount, sustain amount), both >= 0.
    #[inline]
    fn track(&mut self, input: f32) -> (f32, f32) {
        let fast = self.fast.process(input);
        let slow = self.slow.process(input);
        ((fast - slow).max(0.0), slow)
    }
}

/// Envelope-difference transient shaper.
pub struct TransientShaper {
    sample_rate: f32,
    detectors: [Detector; 2],
    attack_gain_db: f32,
    sustain_gain_db: f32,
    rms_mode: bool,
    stereo_link: f32,
    gain_smooth: [SmoothedParam; 2],
    soft_clip_on: bool,
    output: SmoothedParam,
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl TransientShaper {
    /// Create with neutral attack/sustain gains.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            detectors: [Detector::new(sample_rate), Detector::new(sample_rate)],
            attack_gain_db: 0.0,
            sustain_gain_db: 0.0,
            rms_mode: false,
            stereo_link: 1.0,
            gain_smooth: [
                SmoothedParam::with_time(1.0, sample_rate, 2.0),
                SmoothedParam::with_time(1.0, sample_rate, 2.0),
            ],
            soft_clip_on: true,
            output: SmoothedParam::standard(1.0, sample_rate),
            mix: SmoothedParam::fast(1.0, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }

    #[inline]
    fn channel_gain(&mut self, ch: usize, sample: f32) -> f32 {
        let detect = if self.rms_mode {
            sample * sample * 2.0
        } else {
            sample.abs()
        };
        let (attack, sustain) = self.detectors[ch].track(detect);
        // Normalize the attack portion against the sustain floor so the
        // shaping amount does not scale with absolute level.
        let denom = (attack + sustain).max(1e-4);
        let attack_weight = attack / denom;
        let sustain_weight = 1.0 - attack_weight;
        let gain_db =
            self.attack_gain_db * attack_weight + self.sustain_gain_db * sustain_weight;
        self.gain_smooth[ch].set_target(db_to_linear(gain_db));
        self.gain_smooth[ch].advance()
    }
}

impl Engine for TransientShaper {
    fn name(&self) -> &'static str {
        "Transient Shaper"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        for d in &mut self.detectors {
            d.fast.set_sample_rate(sample_rate);
            d.slow.set_sample_rate(sample_rate);
        }
        for g in &mut self.gain_smooth {
            g.set_sample_rate(sample_rate);
        }
        self.output.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let dry_l = *l;
            let dry_r = *r;

            let g_l = self.channel_gain(0, dry_l);
            let g_r = self.channel_gain(1, dry_r);
            // Stereo link blends both channel gains toward their minimum.
            let linked = g_l.min(g_r);
            let g_l = g_l + (linked - g_l) * self.stereo_link;
            let g_r = g_r + (linked - g_r) * self.stereo_link;

            let mut wet_l = dry_l * g_l;
            let mut wet_r = dry_r * g_r;
            if self.soft_clip_on {
                wet_l = soft_clip(wet_l);
                wet_r = soft_clip(wet_r);
            }
            wet_l = self.dc[0].process(wet_l);
            wet_r = self.dc[1].process(wet_r);

            let mix = self.mix.advance();
            let out = self.output.advance();
            *l = wet_dry_mix(dry_l, wet_l, mix) * out;
            *r = wet_dry_mix(dry_r, wet_r, mix) * out;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.attack_gain_db = map::linear(value, -24.0, 24.0),
                1 => self.sustain_gain_db = map::linear(value, -24.0, 24.0),
                2 => {
                    let ms = map::exponential(value, 0.5, 50.0);
                    for d in &mut self.detectors {
                        d.fast.set_attack_ms(ms);
                    }
                }
                3 => {
                    let ms = map::exponential(value, 50.0, 1000.0);
                    for d in &mut self.detectors {
                        d.slow.set_release_ms(ms);
                    }
                }
                4 => self.rms_mode = value >= 0.5,
                5 => {
                    let ms = map::linear(value, 0.5, 20.0);
                    for g in &mut self.gain_smooth {
                        *g = SmoothedParam::with_time(g.get(), self.sample_rate, ms);
                    }
                }
                6 => self.soft_clip_on = value >= 0.5,
                7 => self.output.set_target(map::db_gain(value, -12.0, 12.0)),
                8 => self.stereo_link = map::unit(value),
                9 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for d in &mut self.detectors {
            d.fast.reset();
            d.slow.reset();
        }
        for g in &mut self.gain_smooth {
            g.snap_to_target();
        }
        for dc in &mut self.dc {
            dc.reset();
        }
        self.output.snap_to_target();
        self.mix.snap_to_target();
    }
}
