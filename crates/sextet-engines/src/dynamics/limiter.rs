//! Mastering Limiter — lookahead brickwall limiter.
//!
//! The sidechain looks `lookahead` milliseconds into the future (the audio
//! path is delayed by the same amount, reported as latency), so gain
//! reduction is already in place when a peak arrives. A final
//! soft-saturation stage guarantees the ceiling even for intersample
//! excursions the detector underestimates.

use sextet_core::{
    DcBlocker, Engine, InterpolatedDelay, ParamUpdate, SmoothedParam, map,
    math::{db_to_linear, linear_to_db, soft_limit, time_coeff},
    scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Threshold",
    "Ceiling",
    "Release",
    "Lookahead",
    "Knee",
    "Stereo Link",
    "Saturation",
    "Auto Release",
    "Output Trim",
    "Mix",
];

/// Maximum lookahead in milliseconds.
const MAX_LOOKAHEAD_MS: f32 = 10.0;

/// Lookahead brickwall limiter.
pub struct MasteringLimiter {
    sample_rate: f32,

    threshold_db: f32,
    ceiling: f32,
    knee_db: f32,
    release_ms: f32,
    release_coeff: f32,
    attack_coeff: f32,
    auto_release: bool,
    stereo_link: f32,
    saturation: f32,

    lookahead_samples: f32,
    delay: [InterpolatedDelay; 2],
    /// Gain reduction state per channel, in dB (<= 0).
    gr_db: [f32; 2],
    /// Program-density tracker for auto release.
    density: f32,

    output_trim: SmoothedParam,
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl MasteringLimiter {
    /// Create with a -1 dBFS ceiling and no gain reduction.
    pub fn new(sample_rate: f32) -> Self {
        let max_delay = (MAX_LOOKAHEAD_MS * 0.001 * sample_rate) as usize + 8;
        Self {
            sample_rate,
            threshold_db: 0.0,
            ceiling: db_to_linear(-1.0),
            knee_db: 2.0,
            release_ms: 100.0,
            release_coeff: time_coeff(100.0, sample_rate),
            attack_coeff: time_coeff(0.05, sample_rate),
            auto_release: false,
            stereo_link: 1.0,
            saturation: 0.0,
            lookahead_samples: 1.5 * 0.001 * sample_rate,
            delay: [
                InterpolatedDelay::new(max_delay),
                InterpolatedDelay::new(max_delay),
            ],
            gr_db: [0.0; 2],
            density: 0.0,
            output_trim: SmoothedParam::standard(1.0, sample_rate),
            mix: SmoothedParam::fast(1.0, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }

    fn target_gr_db(&self, level: f32) -> f32 {
        let level_db = linear_to_db(level);
        let overshoot = level_db - self.threshold_db;
        let half_knee = self.knee_db * 0.5;
        if overshoot <= -half_knee {
            0.0
        } else if overshoot >= half_knee {
            -overshoot
        } else {
            let t = (overshoot + half_knee) / self.knee_db;
            -(t * t) * overshoot
        }
    }
}

impl Engine for MasteringLimiter {
    fn name(&self) -> &'static str {
        "Mastering Limiter"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        let max_delay = (MAX_LOOKAHEAD_MS * 0.001 * sample_rate) as usize + 8;
        self.delay = [
            InterpolatedDelay::new(max_delay),
            InterpolatedDelay::new(max_delay),
        ];
        self.release_coeff = time_coeff(self.release_ms, sample_rate);
        self.attack_coeff = time_coeff(0.05, sample_rate);
        self.output_trim.set_sample_rate(sample_rate);
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

            // Sidechain sees the incoming (future) sample; the audio path is
            // read from the delay line.
            let delayed_l = self.delay[0].read_write(dry_l, self.lookahead_samples);
            let delayed_r = self.delay[1].read_write(dry_r, self.lookahead_samples);

            let release = if self.auto_release {
                // Dense program ⇒ slower release to avoid pumping.
                self.density = 0.9995 * self.density + 0.0005 * (dry_l.abs() + dry_r.abs());
                time_coeff(
                    self.release_ms * (0.3 + 1.4 * self.density.min(1.0)),
                    self.sample_rate,
                )
            } else {
                self.release_coeff
            };

            let target_l = self.target_gr_db(dry_l.abs());
            let target_r = self.target_gr_db(dry_r.abs());
            let linked = target_l.min(target_r);
            let target_l = target_l + (linked - target_l) * self.stereo_link;
            let target_r = target_r + (linked - target_r) * self.stereo_link;

            for (state, target) in self.gr_db.iter_mut().zip([target_l, target_r]) {
                let coeff = if target < *state { self.attack_coeff } else { release };
                *state = coeff * *state + (1.0 - coeff) * target;
            }

            let ceiling_gain = self.ceiling;
            let drive = 1.0 + self.saturation * 3.0;
            let mut wet_l = delayed_l * db_to_linear(self.gr_db[0]) * ceiling_gain;
            let mut wet_r = delayed_r * db_to_linear(self.gr_db[1]) * ceiling_gain;
            // Saturation stage doubles as the true-peak guarantee.
            wet_l = soft_limit(wet_l * drive, self.ceiling);
            wet_r = soft_limit(wet_r * drive, self.ceiling);
            wet_l = self.dc[0].process(wet_l);
            wet_r = self.dc[1].process(wet_r);

            let mix = self.mix.advance();
            let trim = self.output_trim.advance();
            *l = wet_dry_mix(dry_l, wet_l, mix) * trim;
            *r = wet_dry_mix(dry_r, wet_r, mix) * trim;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.threshold_db = map::linear(value, -24.0, 0.0),
                1 => self.ceiling = db_to_linear(map::linear(value, -12.0, 0.0)),
                2 => {
                    self.release_ms = map::exponential(value, 20.0, 1000.0);
                    self.release_coeff = time_coeff(self.release_ms, self.sample_rate);
                }
                3 => {
                    self.lookahead_samples =
                        map::linear(value, 0.1, MAX_LOOKAHEAD_MS) * 0.001 * self.sample_rate;
                }
                4 => self.knee_db = map::linear(value, 0.0, 6.0),
                5 => self.stereo_link = map::unit(value),
                6 => self.saturation = map::unit(value),
                7 => self.auto_release = value >= 0.5,
                8 => self.output_trim.set_target(map::db_gain(value, -12.0, 12.0)),
                9 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for d in &mut self.delay {
            d.clear();
        }
        self.gr_db = [0.0; 2];
        self.density = 0.0;
        for dc in &mut self.dc {
            dc.reset();
        }
        self.output_trim.snap_to_target();
        self.mix.snap_to_target();
    }

    fn reported_latency(&self) -> usize {
        self.lookahead_samples as usize
    }
}
