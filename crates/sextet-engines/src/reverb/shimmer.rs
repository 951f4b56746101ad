//! Shimmer Reverb — pitch-shifted regeneration.
//!
//! A diffuse tank whose feedback path runs through an octave-up pitch
//! shifter: every pass around the loop climbs, stacking a choir of octaves
//! above the source. The shimmer control sets how much of the shifted
//! signal re-enters the loop.

use sextet_core::{
    AllpassFilter, CombFilter, Engine, GrainlessShifter, OnePole, ParamUpdate, SmoothedParam,
    map, math::flush_denormal, scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Size", "Decay", "Shimmer", "Pitch", "Damping", "Mix"];

const COMB_TUNINGS: [usize; 6] = [1309, 1423, 1559, 1693, 1811, 1933];
const ALLPASS_TUNINGS: [usize; 3] = [347, 451, 557];

struct ShimmerTank {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllpassFilter>,
}

impl ShimmerTank {
    fn build(sample_rate: f32, size: f32, offset: usize) -> Self {
        let scale = (sample_rate / 44100.0) * (0.7 + 1.3 * size);
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

/// Octave-climbing reverb.
pub struct ShimmerReverb {
    sample_rate: f32,
    tanks: [ShimmerTank; 2],
    shifter: GrainlessShifter,
    shimmer_filter: OnePole,
    size: f32,
    decay: f32,
    shimmer: f32,
    /// Shimmer regeneration state (mono, shared across channels).
    regen: f32,
    mix: SmoothedParam,
}

impl ShimmerReverb {
    /// Create with the shifter set an octave up.
    pub fn new(sample_rate: f32) -> Self {
        let mut shifter = GrainlessShifter::new(sample_rate, 60.0);
        shifter.set_semitones(12.0);
        let mut reverb = Self {
            sample_rate,
            tanks: [
                ShimmerTank::build(sample_rate, 0.6, 0),
                ShimmerTank::build(sample_rate, 0.6, 17),
            ],
            shifter,
            shimmer_filter: OnePole::new(sample_rate, 6000.0),
            size: 0.6,
            decay: 0.6,
            shimmer: 0.4,
            regen: 0.0,
            mix: SmoothedParam::fast(0.3, sample_rate),
        };
        reverb.apply_settings();
        reverb
    }

    fn apply_settings(&mut self) {
        let feedback = 0.75 + 0.23 * self.decay;
        for tank in &mut self.tanks {
            for comb in &mut tank.combs {
                comb.set_feedback(feedback);
            }
            for ap in &mut tank.allpasses {
                ap.set_feedback(0.55);
            }
        }
    }
}

impl Engine for ShimmerReverb {
    fn name(&self) -> &'static str {
        "Shimmer Reverb"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.tanks = [
            ShimmerTank::build(sample_rate, self.size, 0),
            ShimmerTank::build(sample_rate, self.size, 17),
        ];
        let ratio = self.shifter.ratio();
        self.shifter = GrainlessShifter::new(sample_rate, 60.0);
        self.shifter.set_ratio(ratio);
        self.shimmer_filter.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.apply_settings();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.advance();
            let dry = [*l, *r];
            // Inject the dry feed plus the pitch-shifted return.
            let feed = (dry[0] + dry[1]) * 0.5 + self.regen * self.shimmer;

            let wet_l = self.tanks[0].process(feed);
            let wet_r = self.tanks[1].process(feed);

            // Shift the tank output up and filter the brittle top.
            let shifted = self.shifter.process((wet_l + wet_r) * 0.5);
            self.regen = flush_denormal(self.shimmer_filter.process(shifted)).clamp(-2.0, 2.0);

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
                        ShimmerTank::build(self.sample_rate, self.size, 0),
                        ShimmerTank::build(self.sample_rate, self.size, 17),
                    ];
                    self.apply_settings();
                }
                1 => {
                    self.decay = map::unit(value);
                    self.apply_settings();
                }
                // The regeneration gain is the runaway risk here, so it gets
                // the same sub-unity ceiling as delay feedback.
                2 => self.shimmer = map::unit(value) * 0.9,
                3 => {
                    // Octave up, fifth up, or octave down.
                    let semis = [12.0, 7.0, -12.0][map::stepped(value, 3)];
                    self.shifter.set_semitones(semis);
                }
                4 => {
                    let hz = map::exponential(1.0 - value, 1500.0, 10000.0);
                    self.shimmer_filter.set_frequency(hz);
                }
                5 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for tank in &mut self.tanks {
            tank.clear();
        }
        self.shifter.reset();
        self.shimmer_filter.reset();
        self.regen = 0.0;
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shimmer_adds_energy_above_the_source() {
        // Feed a 500 Hz tone; with shimmer up, the tail should carry more
        // high-frequency energy than with shimmer off.
        let hf_tail = |shimmer: f32| -> f32 {
            let mut reverb = ShimmerReverb::new(48000.0);
            reverb.prepare(48000.0, 48000);
            reverb.update_parameters(
                &ParamUpdate::new().with(1, 0.8).with(2, shimmer).with(5, 1.0),
            );
            let mut l: Vec<f32> = (0..48000)
                .map(|i| {
                    if i < 24000 {
                        0.5 * libm::sinf(core::f32::consts::TAU * 500.0 * i as f32 / 48000.0)
                    } else {
                        0.0
                    }
                })
                .collect();
            let mut r = l.clone();
            reverb.process(&mut l, &mut r);
            // First-difference energy approximates HF content.
            l[30000..]
                .windows(2)
                .map(|w| (w[1] - w[0]) * (w[1] - w[0]))
                .sum()
        };
        let without = hf_tail(0.0);
        let with = hf_tail(1.0);
        assert!(with > without * 1.2, "no shimmer lift: {with} vs {without}");
    }

    #[test]
    fn bounded_forever() {
        let mut reverb = ShimmerReverb::new(48000.0);
        reverb.prepare(48000.0, 512);
        let mut u = ParamUpdate::new();
        for i in 0..PARAMS.len() {
            u.set(i, 1.0);
        }
        reverb.update_parameters(&u);
        for _ in 0..400 {
            let mut l = vec![0.5f32; 512];
            let mut r = vec![0.5f32; 512];
            reverb.process(&mut l, &mut r);
            assert!(l.iter().all(|x| x.is_finite() && x.abs() < 8.0));
        }
    }
}
