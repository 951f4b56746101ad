//! Feedback Network — a 4×4 FDN as a playable texture instrument.
//!
//! Four modulated delay lines cross-coupled through a Householder matrix.
//! Where a reverb hides its network behind decay controls, this engine
//! exposes it: size morphs the line lengths live, feedback rides the edge
//! of instability (clamped), diffusion sets the off-diagonal coupling.
//!
//! Reference: Jot & Chaigne, "Digital Delay Networks for Designing
//! Artificial Reverberators", AES 1991.

use sextet_core::{
    Engine, InterpolatedDelay, Interpolation, Lfo, OnePole, ParamUpdate, SmoothedParam, map,
    math::flush_denormal, scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Size",
    "Feedback",
    "Damping",
    "Modulation",
    "Diffusion",
    "Mix",
];

/// Line tunings in ms (mutually prime-ish).
const LINE_MS: [f32; 4] = [31.0, 53.0, 79.0, 113.0];

/// 4×4 feedback texture network.
pub struct FeedbackNetwork {
    sample_rate: f32,
    lines: [InterpolatedDelay; 4],
    damping: [OnePole; 4],
    lfos: [Lfo; 4],
    size: SmoothedParam,
    feedback: f32,
    diffusion: f32,
    mod_depth: f32,
    /// Feedback vector from the previous sample.
    state: [f32; 4],
    mix: SmoothedParam,
}

impl FeedbackNetwork {
    /// Create a small, dark network.
    pub fn new(sample_rate: f32) -> Self {
        let lines = core::array::from_fn(|i| {
            let mut d = InterpolatedDelay::from_time(sample_rate, LINE_MS[i] * 0.004);
            d.set_interpolation(Interpolation::Cubic);
            d
        });
        let lfos = core::array::from_fn(|i| {
            let mut lfo = Lfo::new(sample_rate, 0.2 + i as f32 * 0.13);
            lfo.set_phase(i as f32 * 0.25);
            lfo
        });
        Self {
            sample_rate,
            lines,
            damping: core::array::from_fn(|_| OnePole::new(sample_rate, 5000.0)),
            lfos,
            size: SmoothedParam::with_time(1.0, sample_rate, 200.0),
            feedback: 0.7,
            diffusion: 0.5,
            mod_depth: 0.2,
            state: [0.0; 4],
            mix: SmoothedParam::fast(0.5, sample_rate),
        }
    }

    /// Householder reflection blended with identity by the diffusion amount.
    #[inline]
    fn mix_matrix(&self, input: [f32; 4]) -> [f32; 4] {
        let sum = input.iter().sum::<f32>() * 0.5;
        let reflected = [
            input[0] - sum,
            input[1] - sum,
            input[2] - sum,
            input[3] - sum,
        ];
        core::array::from_fn(|i| {
            input[i] + (reflected[i] - input[i]) * self.diffusion
        })
    }
}

impl Engine for FeedbackNetwork {
    fn name(&self) -> &'static str {
        "Feedback Network"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.lines = core::array::from_fn(|i| {
            let mut d = InterpolatedDelay::from_time(sample_rate, LINE_MS[i] * 0.004);
            d.set_interpolation(Interpolation::Cubic);
            d
        });
        for (i, lfo) in self.lfos.iter_mut().enumerate() {
            lfo.set_sample_rate(sample_rate);
            lfo.set_phase(i as f32 * 0.25);
        }
        for d in &mut self.damping {
            d.set_sample_rate(sample_rate);
        }
        self.size.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let size = self.size.advance();
            let mix = self.mix.advance();
            let dry = [*l, *r];

            // Inject L into even lines, R into odd.
            let injected = self.mix_matrix(self.state);
            let mut outputs = [0.0f32; 4];
            for i in 0..4 {
                let input = if i % 2 == 0 { dry[0] } else { dry[1] } * 0.5
                    + injected[i] * self.feedback;
                let wobble = 1.0 + self.lfos[i].next() * self.mod_depth * 0.01;
                let delay_samples =
                    (LINE_MS[i] * 0.001 * self.sample_rate * size * wobble).max(1.0);
                let out = self.lines[i].read_write(flush_denormal(input), delay_samples);
                outputs[i] = self.damping[i].process(out);
            }
            self.state = outputs;

            let wet_l = (outputs[0] + outputs[2]) * 0.7;
            let wet_r = (outputs[1] + outputs[3]) * 0.7;
            *l = wet_dry_mix(dry[0], wet_l, mix);
            *r = wet_dry_mix(dry[1], wet_r, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                // Size sweeps line lengths from 0.25× to 4×.
                0 => self.size.set_target(map::exponential(value, 0.25, 4.0)),
                1 => self.feedback = map::unit(value) * 0.95,
                2 => {
                    let hz = map::exponential(1.0 - value, 800.0, 12000.0);
                    for d in &mut self.damping {
                        d.set_frequency(hz);
                    }
                }
                3 => self.mod_depth = map::unit(value),
                4 => self.diffusion = map::unit(value),
                5 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        for d in &mut self.damping {
            d.reset();
        }
        for (i, lfo) in self.lfos.iter_mut().enumerate() {
            lfo.reset();
            lfo.set_phase(i as f32 * 0.25);
        }
        self.state = [0.0; 4];
        self.size.snap_to_target();
        self.mix.snap_to_target();
    }
}
