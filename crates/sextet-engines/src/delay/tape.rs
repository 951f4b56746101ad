//! Tape Echo — saturating feedback delay with wow & flutter.
//!
//! The repeat path models the tape loop: soft saturation on every pass, a
//! tone filter for head-bump-and-rolloff, and slow/fast pitch instability
//! (wow at ~0.5 Hz, flutter at ~6 Hz) modulating the head distance.
//! Feedback is hard-limited below unity so long repeats always decay.

use sextet_core::{
    DcBlocker, Engine, InterpolatedDelay, Interpolation, Lfo, OnePole, ParamUpdate,
    SmoothedParam, map,
    math::{fast_tanh, flush_denormal, ms_to_samples},
    scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Time",
    "Feedback",
    "Wow & Flutter",
    "Saturation",
    "Tone",
    "Mix",
];

/// Delay time bounds (contractual across the delay family).
const MIN_TIME_MS: f32 = 1.0;
const MAX_TIME_MS: f32 = 5000.0;

/// Repeat-path feedback ceiling.
const FEEDBACK_CEILING: f32 = 0.95;

/// Tape-loop echo.
pub struct TapeEcho {
    sample_rate: f32,
    delays: [InterpolatedDelay; 2],
    time_samples: SmoothedParam,
    feedback: f32,
    feedback_state: [f32; 2],
    wow: Lfo,
    flutter: Lfo,
    instability: f32,
    saturation: f32,
    tone: [OnePole; 2],
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl TapeEcho {
    /// Create with a 350 ms head and gentle feedback.
    pub fn new(sample_rate: f32) -> Self {
        let make_delay = || {
            let mut d = InterpolatedDelay::from_time(sample_rate, MAX_TIME_MS * 0.001 + 0.05);
            d.set_interpolation(Interpolation::Cubic);
            d
        };
        let mut wow = Lfo::new(sample_rate, 0.5);
        let flutter = Lfo::new(sample_rate, 6.3);
        wow.set_phase(0.1);
        Self {
            sample_rate,
            delays: [make_delay(), make_delay()],
            time_samples: SmoothedParam::with_time(
                ms_to_samples(350.0, sample_rate),
                sample_rate,
                120.0,
            ),
            feedback: 0.4,
            feedback_state: [0.0; 2],
            wow,
            flutter,
            instability: 0.3,
            saturation: 0.3,
            tone: [
                OnePole::new(sample_rate, 4500.0),
                OnePole::new(sample_rate, 4500.0),
            ],
            mix: SmoothedParam::fast(0.35, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }
}

impl Engine for TapeEcho {
    fn name(&self) -> &'static str {
        "Tape Echo"
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
            let mut d = InterpolatedDelay::from_time(sample_rate, MAX_TIME_MS * 0.001 + 0.05);
            d.set_interpolation(Interpolation::Cubic);
            d
        };
        self.delays = [make_delay(), make_delay()];
        self.time_samples = SmoothedParam::with_time(
            ms_to_samples(time_ms, sample_rate),
            sample_rate,
            120.0,
        );
        self.wow.set_sample_rate(sample_rate);
        self.flutter.set_sample_rate(sample_rate);
        for t in &mut self.tone {
            t.set_sample_rate(sample_rate);
        }
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let base_time = self.time_samples.advance();
            // Wow and flutter move the effective head distance.
            let wobble = self.wow.next() * 0.004 + self.flutter.next() * 0.0008;
            let time = (base_time * (1.0 + wobble * self.instability)).max(1.0);
            let mix = self.mix.advance();

            let dry = [*l, *r];
            let mut wet = [0.0f32; 2];
            for ch in 0..2 {
                let repeat = self.delays[ch].read(time);
                // Saturate the repeat path, not the input.
                let drive = 1.0 + self.saturation * 4.0;
                let shaped = fast_tanh(repeat * drive) / fast_tanh(drive).max(0.5);
                let toned = self.tone[ch].process(shaped);
                self.feedback_state[ch] = flush_denormal(toned * self.feedback);
                self.delays[ch].write(dry[ch] + self.feedback_state[ch]);
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
                // Contract: effective feedback never exceeds 0.95 even when
                // the normalized parameter reads 1.0.
                1 => self.feedback = map::unit(value) * FEEDBACK_CEILING,
                2 => self.instability = map::unit(value),
                3 => self.saturation = map::unit(value),
                4 => {
                    let hz = map::exponential(value, 800.0, 12000.0);
                    for t in &mut self.tone {
                        t.set_frequency(hz);
                    }
                }
                5 => self.mix.set_target(map::unit(value)),
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
        self.feedback_state = [0.0; 2];
        self.wow.reset();
        self.flutter.reset();
        self.time_samples.snap_to_target();
        self.mix.snap_to_target();
    }
}
