//! Digital Delay — clean stereo delay with ping-pong and modulation.

use sextet_core::{
    Engine, InterpolatedDelay, Interpolation, Lfo, OnePole, ParamUpdate, SmoothedParam, map,
    math::{flush_denormal, ms_to_samples},
    scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Time",
    "Feedback",
    "High Cut",
    "Ping Pong",
    "Modulation",
    "Mix",
];

const MIN_TIME_MS: f32 = 1.0;
const MAX_TIME_MS: f32 = 5000.0;
const FEEDBACK_CEILING: f32 = 0.95;

/// Clean feedback delay.
pub struct DigitalDelay {
    sample_rate: f32,
    delays: [InterpolatedDelay; 2],
    time_samples: SmoothedParam,
    feedback: f32,
    high_cut: [OnePole; 2],
    /// 0 = parallel repeats, 1 = full cross-feedback (ping-pong).
    ping_pong: f32,
    mod_lfo: Lfo,
    mod_depth: f32,
    mix: SmoothedParam,
}

impl DigitalDelay {
    /// Create with 400 ms repeats.
    pub fn new(sample_rate: f32) -> Self {
        let make_delay = || {
            let mut d = InterpolatedDelay::from_time(sample_rate, MAX_TIME_MS * 0.001 + 0.05);
            d.set_interpolation(Interpolation::Cubic);
            d
        };
        Self {
            sample_rate,
            delays: [make_delay(), make_delay()],
            time_samples: SmoothedParam::with_time(
                ms_to_samples(400.0, sample_rate),
                sample_rate,
                100.0,
            ),
            feedback: 0.35,
            high_cut: [
                OnePole::new(sample_rate, 10000.0),
                OnePole::new(sample_rate, 10000.0),
            ],
            ping_pong: 0.0,
            mod_lfo: Lfo::new(sample_rate, 0.7),
            mod_depth: 0.0,
            mix: SmoothedParam::fast(0.3, sample_rate),
        }
    }
}

impl Engine for DigitalDelay {
    fn name(&self) -> &'static str {
        "Digital Delay"
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
        self.time_samples =
            SmoothedParam::with_time(ms_to_samples(time_ms, sample_rate), sample_rate, 100.0);
        for f in &mut self.high_cut {
            f.set_sample_rate(sample_rate);
        }
        self.mod_lfo.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let base_time = self.time_samples.advance();
            let wobble = 1.0 + self.mod_lfo.next() * self.mod_depth * 0.003;
            let time = (base_time * wobble).max(1.0);
            let mix = self.mix.advance();

            let dry = [*l, *r];
            let tap_l = self.high_cut[0].process(self.delays[0].read(time));
            // Ping-pong offsets the right tap by half the delay time.
            let right_time = (time * (1.0 + 0.5 * self.ping_pong)).max(1.0);
            let tap_r = self.high_cut[1].process(self.delays[1].read(right_time));

            // Cross-feedback proportional to the ping-pong amount.
            let fb_l = flush_denormal(
                (tap_l * (1.0 - self.ping_pong) + tap_r * self.ping_pong) * self.feedback,
            );
            let fb_r = flush_denormal(
                (tap_r * (1.0 - self.ping_pong) + tap_l * self.ping_pong) * self.feedback,
            );
            self.delays[0].write(dry[0] + fb_l);
            self.delays[1].write(dry[1] + fb_r);

            *l = wet_dry_mix(dry[0], tap_l, mix);
            *r = wet_dry_mix(dry[1], tap_r, mix);
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
                2 => {
                    let hz = map::exponential(value, 1000.0, 18000.0);
                    for f in &mut self.high_cut {
                        f.set_frequency(hz);
                    }
                }
                3 => self.ping_pong = map::unit(value),
                4 => self.mod_depth = map::unit(value),
                5 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for d in &mut self.delays {
            d.clear();
        }
        for f in &mut self.high_cut {
            f.reset();
        }
        self.mod_lfo.reset();
        self.time_samples.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_spacing_matches_time() {
        let mut delay = DigitalDelay::new(48000.0);
        delay.prepare(48000.0, 48000);
        delay.update_parameters(
            &ParamUpdate::new()
                .with(0, map::exponential_inv(200.0, MIN_TIME_MS, MAX_TIME_MS))
                .with(1, 0.6)
                .with(5, 1.0),
        );
        let mut l = vec![0.0f32; 48000];
        l[0] = 1.0;
        let mut r = l.clone();
        delay.process(&mut l, &mut r);
        // Repeats every 9600 samples.
        for k in 1..=3 {
            let centre = k * 9600;
            let peak = l[centre - 100..centre + 100]
                .iter()
                .fold(0.0f32, |a, &b| a.max(b.abs()));
            assert!(peak > 0.05, "repeat {k} missing: {peak}");
        }
    }

    #[test]
    fn ping_pong_alternates_sides() {
        let mut delay = DigitalDelay::new(48000.0);
        delay.prepare(48000.0, 48000);
        delay.update_parameters(
            &ParamUpdate::new()
                .with(0, map::exponential_inv(100.0, MIN_TIME_MS, MAX_TIME_MS))
                .with(1, 0.7)
                .with(3, 1.0)
                .with(5, 1.0),
        );
        let mut l = vec![0.0f32; 48000];
        l[0] = 1.0;
        let mut r = vec![0.0f32; 48000];
        delay.process(&mut l, &mut r);
        // With full ping-pong the right channel must receive energy even
        // though only the left was fed.
        let right_energy: f32 = r.iter().map(|x| x * x).sum();
        assert!(right_energy > 0.01, "no cross-feed: {right_energy}");
    }
}
