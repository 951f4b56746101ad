//! Bucket-Brigade Delay — analog BBD chip emulation.
//!
//! A BBD passes the signal through thousands of capacitor "buckets" at a
//! variable clock; delay time is bucket count over clock rate. Shorter
//! chips clocked slowly get dark and noisy, which is the sound: the
//! anti-aliasing filters close down as the delay lengthens, clock bleed
//! adds a faint hiss, and every stage loses a little level.

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
    "Clock Noise",
    "Tone",
    "Modulation",
    "Mix",
];

const MIN_TIME_MS: f32 = 1.0;
const MAX_TIME_MS: f32 = 1000.0;
const FEEDBACK_CEILING: f32 = 0.95;

/// BBD-voiced delay.
pub struct BucketBrigadeDelay {
    sample_rate: f32,
    delays: [InterpolatedDelay; 2],
    time_samples: SmoothedParam,
    feedback: f32,
    clock_noise: f32,
    noise_state: u32,
    /// Companding filters: input lowpass and reconstruction lowpass.
    aa_in: [OnePole; 2],
    aa_out: [OnePole; 2],
    tone_setting: f32,
    mod_lfo: Lfo,
    mod_depth: f32,
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl BucketBrigadeDelay {
    /// Create with a 300 ms setting.
    pub fn new(sample_rate: f32) -> Self {
        let make_delay = || {
            let mut d = InterpolatedDelay::from_time(sample_rate, MAX_TIME_MS * 0.001 + 0.02);
            d.set_interpolation(Interpolation::Cubic);
            d
        };
        Self {
            sample_rate,
            delays: [make_delay(), make_delay()],
            time_samples: SmoothedParam::with_time(
                ms_to_samples(300.0, sample_rate),
                sample_rate,
                200.0,
            ),
            feedback: 0.4,
            clock_noise: 0.1,
            noise_state: 0x2545f491,
            aa_in: [
                OnePole::new(sample_rate, 3500.0),
                OnePole::new(sample_rate, 3500.0),
            ],
            aa_out: [
                OnePole::new(sample_rate, 3500.0),
                OnePole::new(sample_rate, 3500.0),
            ],
            tone_setting: 0.5,
            mod_lfo: Lfo::new(sample_rate, 0.6),
            mod_depth: 0.2,
            mix: SmoothedParam::fast(0.35, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }

    /// Anti-alias cutoff narrows as the clock slows (longer delay).
    fn update_filters(&mut self) {
        let time_ms = self.time_samples.target() * 1000.0 / self.sample_rate;
        let darkness = (time_ms / MAX_TIME_MS).clamp(0.0, 1.0);
        let base = 2000.0 + 8000.0 * self.tone_setting;
        let cutoff = base * (1.0 - 0.7 * darkness);
        for f in self.aa_in.iter_mut().chain(self.aa_out.iter_mut()) {
            f.set_frequency(cutoff);
        }
    }

    #[inline]
    fn noise(&mut self) -> f32 {
        self.noise_state ^= self.noise_state << 13;
        self.noise_state ^= self.noise_state >> 17;
        self.noise_state ^= self.noise_state << 5;
        (self.noise_state as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

impl Engine for BucketBrigadeDelay {
    fn name(&self) -> &'static str {
        "Bucket-Brigade Delay"
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
            let mut d = InterpolatedDelay::from_time(sample_rate, MAX_TIME_MS * 0.001 + 0.02);
            d.set_interpolation(Interpolation::Cubic);
            d
        };
        self.delays = [make_delay(), make_delay()];
        self.time_samples =
            SmoothedParam::with_time(ms_to_samples(time_ms, sample_rate), sample_rate, 200.0);
        for f in self.aa_in.iter_mut().chain(self.aa_out.iter_mut()) {
            f.set_sample_rate(sample_rate);
        }
        self.mod_lfo.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.update_filters();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let base_time = self.time_samples.advance();
            let wobble = 1.0 + self.mod_lfo.next() * self.mod_depth * 0.004;
            let time = (base_time * wobble).max(1.0);
            let mix = self.mix.advance();
            let hiss = self.noise() * self.clock_noise * 0.002;

            let dry = [*l, *r];
            let mut wet = [0.0f32; 2];
            for ch in 0..2 {
                let tap = self.delays[ch].read(time);
                // Reconstruction filter, stage loss, and clock bleed.
                let reconstructed = self.aa_out[ch].process(fast_tanh(tap * 0.98)) + hiss;
                let input = self.aa_in[ch].process(dry[ch]);
                self.delays[ch]
                    .write(input + flush_denormal(reconstructed * self.feedback));
                wet[ch] = self.dc[ch].process(reconstructed);
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
                    self.update_filters();
                }
                1 => self.feedback = map::unit(value) * FEEDBACK_CEILING,
                2 => self.clock_noise = map::unit(value),
                3 => {
                    self.tone_setting = map::unit(value);
                    self.update_filters();
                }
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
        for f in self.aa_in.iter_mut().chain(self.aa_out.iter_mut()) {
            f.reset();
        }
        for dc in &mut self.dc {
            dc.reset();
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
    fn long_delays_are_darker() {
        let spectral_tilt = |time_param: f32| -> f32 {
            let mut bbd = BucketBrigadeDelay::new(48000.0);
            bbd.prepare(48000.0, 48000);
            bbd.update_parameters(
                &ParamUpdate::new()
                    .with(0, time_param)
                    .with(1, 0.0)
                    .with(2, 0.0)
                    .with(4, 0.0)
                    .with(5, 1.0),
            );
            let mut l: Vec<f32> = (0..48000)
                .map(|i| libm::sinf(core::f32::consts::TAU * 6000.0 * i as f32 / 48000.0))
                .collect();
            let mut r = l.clone();
            bbd.process(&mut l, &mut r);
            l[24000..].iter().map(|x| x * x).sum::<f32>()
        };
        let short = spectral_tilt(0.1);
        let long = spectral_tilt(1.0);
        assert!(long < short, "long BBD should be darker: {long} vs {short}");
    }

    #[test]
    fn stays_finite_under_everything() {
        let mut bbd = BucketBrigadeDelay::new(48000.0);
        bbd.prepare(48000.0, 512);
        let mut u = ParamUpdate::new();
        for i in 0..PARAMS.len() {
            u.set(i, 1.0);
        }
        bbd.update_parameters(&u);
        for _ in 0..100 {
            let mut l = vec![0.8f32; 512];
            let mut r = vec![-0.8f32; 512];
            bbd.process(&mut l, &mut r);
            assert!(l.iter().all(|x| x.is_finite() && x.abs() < 4.0));
        }
    }
}
