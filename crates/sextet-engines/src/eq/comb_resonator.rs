//! Comb Resonator — tuned feedback comb.
//!
//! A short feedback comb whose delay is tuned to a musical frequency turns
//! any input into a pitched resonance. Damping rolls off the upper partials
//! of the ring.

use sextet_core::{
    Engine, InterpolatedDelay, OnePole, ParamUpdate, SmoothedParam, map,
    math::flush_denormal, scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Frequency", "Feedback", "Damping", "Mix"];

/// Lowest tunable frequency in Hz (sets the delay capacity).
const MIN_FREQ: f32 = 40.0;

/// One tuned comb per channel.
struct Resonator {
    delay: InterpolatedDelay,
    damping: OnePole,
}

/// Pitched comb resonator.
pub struct CombResonator {
    sample_rate: f32,
    resonators: [Resonator; 2],
    frequency: SmoothedParam,
    feedback: f32,
    mix: SmoothedParam,
}

impl CombResonator {
    /// Create tuned to 220 Hz.
    pub fn new(sample_rate: f32) -> Self {
        let make = || Resonator {
            delay: InterpolatedDelay::new((sample_rate / MIN_FREQ) as usize + 4),
            damping: OnePole::new(sample_rate, 6000.0),
        };
        Self {
            sample_rate,
            resonators: [make(), make()],
            frequency: SmoothedParam::with_time(220.0, sample_rate, 20.0),
            feedback: 0.8,
            mix: SmoothedParam::fast(0.5, sample_rate),
        }
    }
}

impl Engine for CombResonator {
    fn name(&self) -> &'static str {
        "Comb Resonator"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        let capacity = (sample_rate / MIN_FREQ) as usize + 4;
        for res in &mut self.resonators {
            res.delay = InterpolatedDelay::new(capacity);
            res.damping.set_sample_rate(sample_rate);
        }
        self.frequency.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let [res_l, res_r] = &mut self.resonators;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let freq = self.frequency.advance();
            let delay_samples = (self.sample_rate / freq).max(2.0);
            let mix = self.mix.advance();

            for (sample, res) in [(&mut *l, &mut *res_l), (&mut *r, &mut *res_r)] {
                let dry = *sample;
                let delayed = res.delay.read(delay_samples);
                let fed = flush_denormal(dry + res.damping.process(delayed) * self.feedback);
                res.delay.write(fed);
                *sample = wet_dry_mix(dry, delayed, mix);
            }
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self
                    .frequency
                    .set_target(map::exponential(value, MIN_FREQ, 2000.0)),
                // Hard ceiling below unity keeps the ring finite.
                1 => self.feedback = map::unit(value) * 0.95,
                2 => {
                    let cutoff = map::exponential(1.0 - value, 500.0, 12000.0);
                    for res in &mut self.resonators {
                        res.damping.set_frequency(cutoff);
                    }
                }
                3 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for res in &mut self.resonators {
            res.delay.clear();
            res.damping.reset();
        }
        self.frequency.snap_to_target();
        self.mix.snap_to_target();
    }
}
