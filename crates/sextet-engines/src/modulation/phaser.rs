//! Analog Phaser — swept allpass cascade.
//!
//! Up to eight first-order allpass stages swept by an LFO, with feedback
//! from the cascade output back to its input. Mixing the swept signal with
//! the dry input carves the moving notch pattern.

use sextet_core::{Engine, Lfo, ParamUpdate, SmoothedParam, map, math::flush_denormal, scrub_stereo};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Rate",
    "Depth",
    "Feedback",
    "Stages",
    "Centre Freq",
    "Stereo Spread",
    "Mix",
];

/// Maximum allpass stages.
const MAX_STAGES: usize = 8;

/// First-order allpass with a per-sample tunable coefficient.
#[derive(Clone, Copy, Default)]
struct AllpassStage {
    z1: f32,
}

impl AllpassStage {
    /// `coeff` in (-1, 1): y[n] = -c·x[n] + x[n-1] + c·y[n-1], one-multiply form.
    #[inline]
    fn process(&mut self, input: f32, coeff: f32) -> f32 {
        let output = self.z1 - coeff * input;
        self.z1 = flush_denormal(input + coeff * output);
        output
    }
}

/// One channel of phaser state.
#[derive(Clone, Default)]
struct PhaserChannel {
    stages: [AllpassStage; MAX_STAGES],
    feedback_state: f32,
}

/// Multi-stage stereo phaser.
pub struct AnalogPhaser {
    sample_rate: f32,
    channels: [PhaserChannel; 2],
    lfos: [Lfo; 2],
    depth: SmoothedParam,
    feedback: f32,
    stage_count: usize,
    centre_freq: f32,
    spread: f32,
    mix: SmoothedParam,
}

impl AnalogPhaser {
    /// Create a four-stage phaser at 0.5 Hz.
    pub fn new(sample_rate: f32) -> Self {
        let mut lfos = [Lfo::new(sample_rate, 0.5), Lfo::new(sample_rate, 0.5)];
        lfos[1].set_phase(0.25);
        Self {
            sample_rate,
            channels: [PhaserChannel::default(), PhaserChannel::default()],
            lfos,
            depth: SmoothedParam::standard(0.7, sample_rate),
            feedback: 0.2,
            stage_count: 4,
            centre_freq: 800.0,
            spread: 0.25,
            mix: SmoothedParam::fast(0.5, sample_rate),
        }
    }
}

impl Engine for AnalogPhaser {
    fn name(&self) -> &'static str {
        "Analog Phaser"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        for lfo in &mut self.lfos {
            lfo.set_sample_rate(sample_rate);
        }
        self.depth.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let depth = self.depth.advance();
            let mix = self.mix.advance();

            for ch in 0..2 {
                let dry = if ch == 0 { *l } else { *r };
                // Sweep the allpass corner exponentially around the centre.
                let sweep = self.lfos[ch].next() * depth;
                let freq = (self.centre_freq * libm::powf(4.0, sweep))
                    .clamp(40.0, self.sample_rate * 0.45);
                // Bilinear-transform allpass coefficient for this corner.
                let tan_term = libm::tanf(core::f32::consts::PI * freq / self.sample_rate);
                let coeff = (tan_term - 1.0) / (tan_term + 1.0);

                let channel = &mut self.channels[ch];
                let mut x = dry + channel.feedback_state * self.feedback;
                for stage in channel.stages.iter_mut().take(self.stage_count) {
                    x = stage.process(x, coeff);
                }
                channel.feedback_state = flush_denormal(x);

                let out = dry * (1.0 - mix) + x * mix;
                if ch == 0 {
                    *l = out;
                } else {
                    *r = out;
                }
            }
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    let hz = map::exponential(value, 0.01, 20.0);
                    for lfo in &mut self.lfos {
                        lfo.set_frequency(hz);
                    }
                }
                1 => self.depth.set_target(map::unit(value)),
                2 => self.feedback = map::unit(value) * 0.9,
                3 => self.stage_count = [2, 4, 6, 8][map::stepped(value, 4)],
                4 => self.centre_freq = map::exponential(value, 100.0, 4000.0),
                5 => {
                    self.spread = map::unit(value) * 0.5;
                    self.lfos[1].set_phase(self.lfos[0].phase() + self.spread);
                }
                6 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.channels = [PhaserChannel::default(), PhaserChannel::default()];
        self.lfos[0].reset();
        self.lfos[1].reset();
        self.lfos[1].set_phase(self.spread);
        self.depth.snap_to_target();
        self.mix.snap_to_target();
    }
}
