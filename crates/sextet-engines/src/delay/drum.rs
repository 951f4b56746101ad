//! Magnetic Drum Echo — multi-head drum delay.
//!
//! The rotating-drum units put several playback heads at fixed fractions
//! of the drum circumference; engaging more heads stacks staggered
//! repeats. Dark, slightly unstable, with a shared regeneration path.

use sextet_core::{
    DcBlocker, Engine, InterpolatedDelay, Interpolation, Lfo, OnePole, ParamUpdate,
    SmoothedParam, map,
    math::{fast_tanh, flush_denormal, ms_to_samples},
    scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Time", "Feedback", "Heads", "Tone", "Mix"];

/// Head positions as fractions of the full drum period.
const HEAD_POSITIONS: [f32; 4] = [1.0, 0.75, 0.5, 0.33];

const MIN_TIME_MS: f32 = 30.0;
const MAX_TIME_MS: f32 = 1200.0;
const FEEDBACK_CEILING: f32 = 0.95;

/// Multi-head drum echo.
pub struct MagneticDrumEcho {
    sample_rate: f32,
    delays: [InterpolatedDelay; 2],
    time_samples: SmoothedParam,
    feedback: f32,
    head_count: usize,
    tone: [OnePole; 2],
    drift: Lfo,
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl MagneticDrumEcho {
    /// Create with two heads engaged.
    pub fn new(sample_rate: f32) -> Self {
        let make_delay = || {
            let mut d =
                InterpolatedDelay::from_time(sample_rate, MAX_TIME_MS * 0.001 + 0.05);
            d.set_interpolation(Interpolation::Cubic);
            d
        };
        Self {
            sample_rate,
            delays: [make_delay(), make_delay()],
            time_samples: SmoothedParam::with_time(
                ms_to_samples(300.0, sample_rate),
                sample_rate,
                150.0,
            ),
            feedback: 0.4,
            head_count: 2,
            tone: [
                OnePole::new(sample_rate, 3000.0),
                OnePole::new(sample_rate, 3000.0),
            ],
            drift: Lfo::new(sample_rate, 0.3),
            mix: SmoothedParam::fast(0.35, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }
}

impl Engine for MagneticDrumEcho {
    fn name(&self) -> &'static str {
        "Magnetic Drum Echo"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let time_ms = self.time_samples.target() * 1000.0 / self.sample_rate;
        self.sample_rate = sample_rate;
        let make_delay = || {
            let mut d =
                InterpolatedDelay::from_time(sample_rate, MAX_TIME_MS * 0.001 + 0.05);
            d.set_interpolation(Interpolation::Cubic);
            d
        };
        self.delays = [make_delay(), make_delay()];
        self.time_samples =
            SmoothedParam::with_time(ms_to_samples(time_ms, sample_rate), sample_rate, 150.0);
        for t in &mut self.tone {
            t.set_sample_rate(sample_rate);
        }
        self.drift.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let period = self.time_samples.advance();
            let drift = 1.0 + self.drift.next() * 0.002;
            let mix = self.mix.advance();

            let dry = [*l, *r];
            let mut wet = [0.0f32; 2];
            for ch in 0..2 {
                // Sum the engaged heads; later heads come back quieter.
                let mut sum = 0.0;
                for (h, &pos) in HEAD_POSITIONS.iter().take(self.head_count).enumerate() {
                    let head_gain = 1.0 / (1.0 + h as f32 * 0.4);
                    sum += self.delays[ch].read((period * pos * drift).max(1.0)) * head_gain;
                }
                let toned = self.tone[ch].process(fast_tanh(sum));
                self.delays[ch].write(dry[ch] + flush_denormal(toned * self.feedback));
                wet[ch] = self.dc[ch].process(toned);
            }

            *l = wet_dry_mix(dry[0], wet[0], mix);
            *r = wet_dry_mix(dry[1], wet[1], mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    let ms = map::exponential(value, MIN_TIME_MS, MAX_TIME_MS);
                    self.time_samples
                        .set_target(ms_to_samples(ms, self.sample_rate));
                }
                1 => self.feedback = map::unit(value) * FEEDBACK_CEILING,
                2 => self.head_count = 1 + map::stepped(value, HEAD_POSITIONS.len()),
                3 => {
                    let hz = map::exponential(value, 1000.0, 8000.0);
                    for t in &mut self.tone {
                        t.set_frequency(hz);
                    }
                }
                4 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for d in &mut self.delays {
            d.clear();
        }
        for t in &mut self.tone {
            t.reset();
        }
        for dc in &mut self.dc {
            dc.reset();
        }
        self.drift.reset();
        self.time_samples.snap_to_target();
        self.mix.snap_to_target();
    }
}
