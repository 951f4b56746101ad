//! Chaos Generator — Lorenz-attractor modulation.
//!
//! A Lorenz system integrated at control rate drives amplitude, filter
//! cutoff, or pan. The attractor never repeats but stays bounded, which is
//! exactly the behaviour wanted from a "random but musical" modulator.
//! Rate scales the integration step; smooth lowpasses the modulator before
//! it touches the audio.

use sextet_core::{
    Engine, OnePole, ParamUpdate, SmoothedParam, StateVariableFilter, map, scrub_stereo,
    wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Rate", "Depth", "Smooth", "Target", "Mix"];

/// Lorenz parameters (the classic chaotic set).
const SIGMA: f32 = 10.0;
const RHO: f32 = 28.0;
const BETA: f32 = 8.0 / 3.0;

/// What the attractor modulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChaosTarget {
    Volume,
    Filter,
    Pan,
}

/// Lorenz-driven modulation engine.
pub struct ChaosGenerator {
    /// Attractor state.
    x: f32,
    y: f32,
    z: f32,
    /// Integration step per sample, scaled by rate.
    step: f32,
    depth: SmoothedParam,
    smoother: OnePole,
    target: ChaosTarget,
    filters: [StateVariableFilter; 2],
    mix: SmoothedParam,
}

impl ChaosGenerator {
    /// Create modulating volume, mid rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            x: 0.1,
            y: 0.0,
            z: 0.0,
            step: 4.0 / sample_rate,
            depth: SmoothedParam::standard(0.5, sample_rate),
            smoother: OnePole::new(sample_rate, 20.0),
            target: ChaosTarget::Volume,
            filters: [
                StateVariableFilter::new(sample_rate),
                StateVariableFilter::new(sample_rate),
            ],
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }

    /// One Euler step of the attractor; output normalized to roughly ±1.
    #[inline]
    fn advance_attractor(&mut self) -> f32 {
        let dt = self.step;
        let dx = SIGMA * (self.y - self.x);
        let dy = self.x * (RHO - self.z) - self.y;
        let dz = self.x * self.y - BETA * self.z;
        self.x += dx * dt;
        self.y += dy * dt;
        self.z += dz * dt;
        // x wanders ±20 on the attractor.
        (self.x / 20.0).clamp(-1.5, 1.5)
    }
}

impl Engine for ChaosGenerator {
    fn name(&self) -> &'static str {
        "Chaos Generator"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.depth.set_sample_rate(sample_rate);
        self.smoother.set_sample_rate(sample_rate);
        for f in &mut self.filters {
            f.set_sample_rate(sample_rate);
        }
        self.mix.set_sample_rate(sample_rate);
        self.step = self.step.clamp(0.05 / sample_rate, 50.0 / sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let depth = self.depth.advance();
            let mix = self.mix.advance();
            let raw = self.advance_attractor();
            let modulator = self.smoother.process(raw);

            let dry = [*l, *r];
            let mut wet = dry;
            match self.target {
                ChaosTarget::Volume => {
                    let gain = 1.0 - depth * 0.5 * (modulator + 1.0).clamp(0.0, 2.0) * 0.5;
                    wet[0] *= gain;
                    wet[1] *= gain;
                }
                ChaosTarget::Filter => {
                    let cutoff = 200.0 * libm::powf(40.0, (modulator * depth + 1.0) * 0.5);
                    for f in &mut self.filters {
                        f.set_cutoff(cutoff);
                    }
                    wet[0] = self.filters[0].process(dry[0]);
                    wet[1] = self.filters[1].process(dry[1]);
                }
                ChaosTarget::Pan => {
                    let pan = modulator * depth;
                    let (gl, gr) = sextet_core::math::pan_gains(pan);
                    let mono = (dry[0] + dry[1]) * 0.5;
                    wet[0] = mono * gl * core::f32::consts::SQRT_2;
                    wet[1] = mono * gr * core::f32::consts::SQRT_2;
                }
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
                    // Attractor speed, exponential over ~3 decades.
                    let rate = map::exponential(value, 0.05, 50.0);
                    self.step = rate / 48000.0;
                }
                1 => self.depth.set_target(map::unit(value)),
                2 => {
                    let hz = map::exponential(1.0 - value, 1.0, 200.0);
                    self.smoother.set_frequency(hz);
                }
                3 => {
                    self.target = match map::stepped(value, 3) {
                        0 => ChaosTarget::Volume,
                        1 => ChaosTarget::Filter,
                        _ => ChaosTarget::Pan,
                    };
                }
                4 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.x = 0.1;
        self.y = 0.0;
        self.z = 0.0;
        self.smoother.reset();
        for f in &mut self.filters {
            f.reset();
        }
        self.depth.snap_to_target();
        self.mix.snap_to_target();
    }
}
