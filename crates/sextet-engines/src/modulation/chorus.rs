//! Chorus engines: modulated short delays.
//!
//! - [`DigitalChorus`] — clean two-voice chorus, quadrature LFOs per side.
//! - [`ResonantChorus`] — adds feedback around the delay and a resonant
//!   filter inside the loop for the metallic 80s rack sound.

use sextet_core::{
    Engine, InterpolatedDelay, Interpolation, Lfo, OnePole, ParamUpdate, SmoothedParam, map,
    math::{flush_denormal, ms_to_samples},
    scrub_stereo, wet_dry_mix,
};

/// Maximum base delay plus modulation headroom, in ms.
const MAX_DELAY_MS: f32 = 40.0;

/// Chorus modulation depth at full setting: ±30 cents ≈ ±6 ms sweep on a
/// 20 ms centre at typical rates.
const MAX_DEPTH_MS: f32 = 6.0;

fn make_delay(sample_rate: f32) -> InterpolatedDelay {
    let mut delay = InterpolatedDelay::from_time(sample_rate, MAX_DELAY_MS * 0.001);
    delay.set_interpolation(Interpolation::Cubic);
    delay
}

// ───────────────────────── Digital Chorus ─────────────────────────

/// Parameter names for [`DigitalChorus`].
pub const DIGITAL_PARAMS: &[&str] = &["Rate", "Depth", "Delay", "Spread", "Mix"];

/// Clean dual-voice chorus.
pub struct DigitalChorus {
    sample_rate: f32,
    delays: [InterpolatedDelay; 2],
    lfos: [Lfo; 2],
    base_delay_ms: SmoothedParam,
    depth: SmoothedParam,
    /// Stereo spread: phase offset of the right LFO in cycles.
    spread: f32,
    mix: SmoothedParam,
}

impl DigitalChorus {
    /// Create with a light shimmer.
    pub fn new(sample_rate: f32) -> Self {
        let mut lfos = [Lfo::new(sample_rate, 0.8), Lfo::new(sample_rate, 0.8)];
        lfos[1].set_phase(0.25);
        Self {
            sample_rate,
            delays: [make_delay(sample_rate), make_delay(sample_rate)],
            lfos,
            base_delay_ms: SmoothedParam::standard(20.0, sample_rate),
            depth: SmoothedParam::standard(0.5, sample_rate),
            spread: 0.25,
            mix: SmoothedParam::fast(0.5, sample_rate),
        }
    }
}

impl Engine for DigitalChorus {
    fn name(&self) -> &'static str {
        "Digital Chorus"
    }

    fn parameter_count(&self) -> usize {
        DIGITAL_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        DIGITAL_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.delays = [make_delay(sample_rate), make_delay(sample_rate)];
        for lfo in &mut self.lfos {
            lfo.set_sample_rate(sample_rate);
        }
        self.base_delay_ms.set_sample_rate(sample_rate);
        self.depth.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let [delay_l, delay_r] = &mut self.delays;
        let [lfo_l, lfo_r] = &mut self.lfos;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let base = ms_to_samples(self.base_delay_ms.advance(), self.sample_rate);
            let depth = self.depth.advance()
                * ms_to_samples(MAX_DEPTH_MS, self.sample_rate);
            let mix = self.mix.advance();

            for (sample, delay, lfo) in [
                (&mut *l, &mut *delay_l, &mut *lfo_l),
                (&mut *r, &mut *delay_r, &mut *lfo_r),
            ] {
                let dry = *sample;
                let sweep = base + lfo.next() * depth;
                let wet = delay.read_write(dry, sweep.max(1.0));
                *sample = wet_dry_mix(dry, wet, mix);
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
                2 => self.base_delay_ms.set_target(map::linear(value, 5.0, 30.0)),
                3 => {
                    self.spread = map::unit(value) * 0.5;
                    self.lfos[1].set_phase(self.lfos[0].phase() + self.spread);
                }
                4 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for delay in &mut self.delays {
            delay.clear();
        }
        self.lfos[0].reset();
        self.lfos[1].reset();
        self.lfos[1].set_phase(self.spread);
        self.base_delay_ms.snap_to_target();
        self.depth.snap_to_target();
        self.mix.snap_to_target();
    }
}

// ───────────────────────── Resonant Chorus ─────────────────────────

/// Parameter names for [`ResonantChorus`].
pub const RESONANT_PARAMS: &[&str] = &[
    "Rate",
    "Depth",
    "Delay",
    "Feedback",
    "Filter Freq",
    "Spread",
    "Mix",
];

/// Chorus with feedback and an in-loop damping filter.
pub struct ResonantChorus {
    sample_rate: f32,
    delays: [InterpolatedDelay; 2],
    lfos: [Lfo; 2],
    loop_filters: [OnePole; 2],
    feedback: f32,
    feedback_state: [f32; 2],
    base_delay_ms: SmoothedParam,
    depth: SmoothedParam,
    spread: f32,
    mix: SmoothedParam,
}

impl ResonantChorus {
    /// Create with mild feedback.
    pub fn new(sample_rate: f32) -> Self {
        let mut lfos = [Lfo::new(sample_rate, 0.5), Lfo::new(sample_rate, 0.5)];
        lfos[1].set_phase(0.3);
        Self {
            sample_rate,
            delays: [make_delay(sample_rate), make_delay(sample_rate)],
            lfos,
            loop_filters: [
                OnePole::new(sample_rate, 4000.0),
                OnePole::new(sample_rate, 4000.0),
            ],
            feedback: 0.3,
            feedback_state: [0.0; 2],
            base_delay_ms: SmoothedParam::standard(15.0, sample_rate),
            depth: SmoothedParam::standard(0.5, sample_rate),
            spread: 0.3,
            mix: SmoothedParam::fast(0.5, sample_rate),
        }
    }
}

impl Engine for ResonantChorus {
    fn name(&self) -> &'static str {
        "Resonant Chorus"
    }

    fn parameter_count(&self) -> usize {
        RESONANT_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        RESONANT_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.delays = [make_delay(sample_rate), make_delay(sample_rate)];
        for lfo in &mut self.lfos {
            lfo.set_sample_rate(sample_rate);
        }
        for f in &mut self.loop_filters {
            f.set_sample_rate(sample_rate);
        }
        self.base_delay_ms.set_sample_rate(sample_rate);
        self.depth.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let base = ms_to_samples(self.base_delay_ms.advance(), self.sample_rate);
            let depth = self.depth.advance() * ms_to_samples(MAX_DEPTH_MS, self.sample_rate);
            let mix = self.mix.advance();

            for ch in 0..2 {
                let dry = if ch == 0 { *l } else { *r };
                let sweep = base + self.lfos[ch].next() * depth;
                let injected =
                    flush_denormal(dry + self.feedback_state[ch] * self.feedback);
                let wet = self.delays[ch].read_write(injected, sweep.max(1.0));
                self.feedback_state[ch] = self.loop_filters[ch].process(wet);
                let out = wet_dry_mix(dry, wet, mix);
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
                2 => self.base_delay_ms.set_target(map::linear(value, 3.0, 25.0)),
                // Clamped below the runaway point.
                3 => self.feedback = map::unit(value) * 0.9,
                4 => {
                    let hz = map::exponential(value, 500.0, 12000.0);
                    for f in &mut self.loop_filters {
                        f.set_frequency(hz);
                    }
                }
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
        for delay in &mut self.delays {
            delay.clear();
        }
        for f in &mut self.loop_filters {
            f.reset();
        }
        self.feedback_state = [0.0; 2];
        self.lfos[0].reset();
        self.lfos[1].reset();
        self.lfos[1].set_phase(self.spread);
        self.base_delay_ms.snap_to_target();
        self.depth.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_depth_is_pure_delay() {
        let mut chorus = DigitalChorus::new(48000.0);
        chorus.prepare(48000.0, 512);
        chorus.update_parameters(&ParamUpdate::new().with(1, 0.0).with(4, 1.0));
        // Impulse should come back once, delayed, not smeared.
        let mut l = vec![0.0f32; 4800];
        l[0] = 1.0;
        let mut r = l.clone();
        chorus.process(&mut l, &mut r);
        let energy: f32 = l.iter().map(|x| x * x).sum();
        let peak = l.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        assert!(peak > 0.9, "delayed impulse missing, peak {peak}");
        assert!(energy < 1.2, "smearing detected, energy {energy}");
    }

    #[test]
    fn modulation_varies_the_delay() {
        let mut chorus = DigitalChorus::new(48000.0);
        chorus.prepare(48000.0, 48000);
        chorus.update_parameters(
            &ParamUpdate::new()
                .with(0, map::exponential_inv(5.0, 0.01, 20.0))
                .with(1, 1.0)
                .with(4, 1.0),
        );
        // A steady sine through a swept delay acquires vibrato: its
        // instantaneous amplitude pattern differs from the input's.
        let mut l: Vec<f32> = (0..48000)
            .map(|i| libm::sinf(core::f32::consts::TAU * 440.0 * i as f32 / 48000.0))
            .collect();
        let mut r = l.clone();
        chorus.process(&mut l, &mut r);
        let reference: Vec<f32> = (0..48000)
            .map(|i| libm::sinf(core::f32::consts::TAU * 440.0 * i as f32 / 48000.0))
            .collect();
        let diff: f32 = l[24000..]
            .iter()
            .zip(reference[24000..].iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        assert!(diff > 100.0, "no audible modulation: {diff}");
    }

    #[test]
    fn resonant_feedback_stays_bounded() {
        let mut chorus = ResonantChorus::new(48000.0);
        chorus.prepare(48000.0, 512);
        let mut u = ParamUpdate::new();
        for i in 0..RESONANT_PARAMS.len() {
            u.set(i, 1.0);
        }
        chorus.update_parameters(&u);
        for _ in 0..100 {
            let mut l = vec![0.5f32; 512];
            let mut r = vec![0.5f32; 512];
            chorus.process(&mut l, &mut r);
            assert!(l.iter().all(|x| x.is_finite() && x.abs() < 8.0));
        }
    }
}
