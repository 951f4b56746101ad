//! Gated Reverb — big tail, chopped.
//!
//! The 80s snare trick: a dense reverb whose output is cut off by a gate
//! keyed from the dry input. The tail blooms for the gate time after each
//! hit, then slams shut instead of decaying naturally.

use sextet_core::{
    AllpassFilter, CombFilter, Engine, EnvelopeFollower, ParamUpdate, SmoothedParam, map,
    math::{linear_to_db, time_coeff},
    scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Size", "Gate Time", "Threshold", "Damping", "Mix"];

/// Comb tunings (44.1 kHz reference), denser than the plate for a thick
/// early field.
const COMB_TUNINGS: [usize; 6] = [1021, 1117, 1213, 1319, 1429, 1523];
const ALLPASS_TUNINGS: [usize; 3] = [229, 337, 441];

struct Tank {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl Tank {
    fn build(sample_rate: f32, size: f32, offset: usize) -> Self {
        let scale = (sample_rate / 44100.0) * (0.6 + 1.2 * size);
        Self {
            combs: COMB_TUNINGS
                .iter()
                .map(|&t| CombFilter::new(((t + offset) as f32 * scale) as usize + 16))
                .collect(),
            allpasses: ALLPASS_TUNINGS
                .iter()
                .map(|&t| AllpassFilter::new(((t + offset) as f32 * scale) as usize + 8))
                .collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let mut acc = 0.0;
        for comb in &mut self.combs {
            acc += comb.process(input);
        }
        let mut out = acc / self.combs.len() as f32;
        for ap in &mut self.allpasses {
            out = ap.process(out);
        }
        out
    }

    fn clear(&mut self) {
        for c in &mut self.combs {
            c.clear();
        }
        for ap in &mut self.allpasses {
            ap.clear();
        }
    }
}

/// Gated drum reverb.
pub struct GatedReverb {
    sample_rate: f32,
    tanks: [Tank; 2],
    size: f32,
    keyer: EnvelopeFollower,
    threshold_db: f32,
    gate_samples: usize,
    gate_counter: usize,
    /// Gate gain with fast open / fast close ramps.
    gate_gain: f32,
    open_coeff: f32,
    close_coeff: f32,
    mix: SmoothedParam,
}

impl GatedReverb {
    /// Create with a 150 ms gate.
    pub fn new(sample_rate: f32) -> Self {
        let mut keyer = EnvelopeFollower::new(sample_rate);
        keyer.set_attack_ms(0.5);
        keyer.set_release_ms(30.0);
        let mut reverb = Self {
            sample_rate,
            tanks: [
                Tank::build(sample_rate, 0.5, 0),
                Tank::build(sample_rate, 0.5, 19),
            ],
            size: 0.5,
            keyer,
            threshold_db: -35.0,
            gate_samples: (0.15 * sample_rate) as usize,
            gate_counter: 0,
            gate_gain: 0.0,
            open_coeff: time_coeff(0.5, sample_rate),
            close_coeff: time_coeff(8.0, sample_rate),
            mix: SmoothedParam::fast(0.4, sample_rate),
        };
        reverb.apply_settings();
        reverb
    }

    fn apply_settings(&mut self) {
        for tank in &mut self.tanks {
            for comb in &mut tank.combs {
                comb.set_feedback(0.92);
            }
            for ap in &mut tank.allpasses {
                ap.set_feedback(0.6);
            }
        }
    }
}

impl Engine for GatedReverb {
    fn name(&self) -> &'static str {
        "Gated Reverb"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let gate_ms = self.gate_samples as f32 * 1000.0 / self.sample_rate;
        self.sample_rate = sample_rate;
        self.tanks = [
            Tank::build(sample_rate, self.size, 0),
            Tank::build(sample_rate, self.size, 19),
        ];
        self.keyer.set_sample_rate(sample_rate);
        self.gate_samples = (gate_ms * 0.001 * sample_rate) as usize;
        self.open_coeff = time_coeff(0.5, sample_rate);
        self.close_coeff = time_coeff(8.0, sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.apply_settings();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.advance();
            let dry = [*l, *r];
            let feed = (dry[0] + dry[1]) * 0.5;

            // Key the gate from the dry input.
            let level_db = linear_to_db(self.keyer.process(feed));
            if level_db > self.threshold_db {
                self.gate_counter = self.gate_samples;
            }
            let target = if self.gate_counter > 0 {
                self.gate_counter -= 1;
                1.0
            } else {
                0.0
            };
            let coeff = if target > self.gate_gain {
                self.open_coeff
            } else {
                self.close_coeff
            };
            self.gate_gain = coeff * self.gate_gain + (1.0 - coeff) * target;

            let wet_l = self.tanks[0].process(feed) * self.gate_gain;
            let wet_r = self.tanks[1].process(feed) * self.gate_gain;

            *l = wet_dry_mix(dry[0], wet_l, mix);
            *r = wet_dry_mix(dry[1], wet_r, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    self.size = map::unit(value);
                    self.tanks = [
                        Tank::build(self.sample_rate, self.size, 0),
                        Tank::build(self.sample_rate, self.size, 19),
                    ];
                    self.apply_settings();
                }
                1 => {
                    let ms = map::exponential(value, 20.0, 1000.0);
                    self.gate_samples = (ms * 0.001 * self.sample_rate) as usize;
                }
                2 => self.threshold_db = map::linear(value, -60.0, 0.0),
                3 => {
                    let damp = map::unit(value);
                    for tank in &mut self.tanks {
                        for comb in &mut tank.combs {
                            comb.set_damp(damp);
                        }
                    }
                }
                4 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for tank in &mut self.tanks {
            tank.clear();
        }
        self.keyer.reset();
        self.gate_counter = 0;
        self.gate_gain = 0.0;
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_is_cut_after_gate_time() {
        let mut reverb = GatedReverb::new(48000.0);
        reverb.prepare(48000.0, 48000);
        reverb.update_parameters(
            &ParamUpdate::new()
                .with(1, map::exponential_inv(100.0, 20.0, 1000.0))
                .with(2, 0.4)
                .with(4, 1.0),
        );
        // A loud hit then silence.
        let mut l = vec![0.0f32; 48000];
        for s in l.iter_mut().take(480) {
            *s = 0.9;
        }
        let mut r = l.clone();
        reverb.process(&mut l, &mut r);

        let during_gate: f32 = l[1000..5000].iter().map(|x| x * x).sum();
        let after_gate: f32 = l[20000..30000].iter().map(|x| x * x).sum();
        assert!(during_gate > 1e-4, "no bloom: {during_gate}");
        assert!(
            after_gate < during_gate * 0.01,
            "gate never closed: {after_gate} vs {during_gate}"
        );
    }
}
