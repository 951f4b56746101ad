//! Rotary Speaker — horn/drum cabinet simulation.
//!
//! Splits at the cabinet crossover (~800 Hz): the horn spins fast, the bass
//! drum slow, each imposing Doppler (delay modulation), amplitude
//! modulation, and stereo panning at its own rotation phase. Speed changes
//! glide with the inertia of the real mechanism — the horn accelerates
//! faster than the heavy drum.

use sextet_core::{
    Engine, InterpolatedDelay, Interpolation, OnePole, ParamUpdate, SmoothedParam, map,
    math::ms_to_samples, scrub_stereo, wet_dry_mix,
};
use core::f32::consts::TAU;

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Speed",
    "Acceleration",
    "Horn/Drum Balance",
    "Mic Distance",
    "Mix",
];

/// Slow/fast rotor speeds in Hz (horn, drum).
const SLOW_HZ: (f32, f32) = (0.8, 0.7);
const FAST_HZ: (f32, f32) = (6.8, 5.7);

/// One rotating element.
struct Rotor {
    phase: f32,
    speed: SmoothedParam,
    delay: InterpolatedDelay,
}

impl Rotor {
    fn new(sample_rate: f32, initial_hz: f32) -> Self {
        let mut delay = InterpolatedDelay::from_time(sample_rate, 0.01);
        delay.set_interpolation(Interpolation::Cubic);
        Self {
            phase: 0.0,
            speed: SmoothedParam::with_time(initial_hz, sample_rate, 800.0),
            delay,
        }
    }

    /// Process one band sample; returns (left, right).
    #[inline]
    fn process(&mut self, input: f32, sample_rate: f32, doppler_depth: f32, am_depth: f32) -> (f32, f32) {
        let hz = self.speed.advance();
        self.phase = (self.phase + hz / sample_rate).rem_euclid(1.0);
        let angle = TAU * self.phase;

        // Doppler: path length swings with rotation.
        let base = ms_to_samples(3.0, sample_rate);
        let sweep = base + libm::sinf(angle) * doppler_depth * base * 0.8;
        let moved = self.delay.read_write(input, sweep.max(1.0));

        // Amplitude dips as the driver faces away; pan follows the cosine.
        let am = 1.0 - am_depth * 0.5 * (1.0 + libm::cosf(angle));
        let pan = libm::cosf(angle) * 0.7;
        let gain_l = (1.0 - pan).min(1.0);
        let gain_r = (1.0 + pan).min(1.0);
        (moved * am * gain_l, moved * am * gain_r)
    }
}

/// Rotary cabinet.
pub struct RotarySpeaker {
    sample_rate: f32,
    crossover: [OnePole; 2],
    horn: Rotor,
    drum: Rotor,
    /// 0 = slow, 1 = fast; the rotors glide toward their target speeds.
    fast_mode: f32,
    inertia: f32,
    balance: f32,
    mic_distance: f32,
    mix: SmoothedParam,
}

impl RotarySpeaker {
    /// Create in slow (chorale) mode.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            crossover: [
                OnePole::new(sample_rate, 800.0),
                OnePole::new(sample_rate, 800.0),
            ],
            horn: Rotor::new(sample_rate, SLOW_HZ.0),
            drum: Rotor::new(sample_rate, SLOW_HZ.1),
            fast_mode: 0.0,
            inertia: 0.5,
            balance: 0.5,
            mic_distance: 0.5,
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }

    fn apply_speed(&mut self) {
        let horn_hz = SLOW_HZ.0 + (FAST_HZ.0 - SLOW_HZ.0) * self.fast_mode;
        let drum_hz = SLOW_HZ.1 + (FAST_HZ.1 - SLOW_HZ.1) * self.fast_mode;
        self.horn.speed.set_target(horn_hz);
        self.drum.speed.set_target(drum_hz);
    }
}

impl Engine for RotarySpeaker {
    fn name(&self) -> &'static str {
        "Rotary Speaker"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        for f in &mut self.crossover {
            f.set_sample_rate(sample_rate);
        }
        self.horn = Rotor::new(sample_rate, SLOW_HZ.0);
        self.drum = Rotor::new(sample_rate, SLOW_HZ.1);
        self.mix.set_sample_rate(sample_rate);
        self.apply_speed();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.advance();
            let dry = [*l, *r];
            let mono = (dry[0] + dry[1]) * 0.5;

            let low = self.crossover[0].process(mono);
            let high = mono - low;

            // Close mics exaggerate both Doppler and AM.
            let doppler = 0.3 + 0.7 * (1.0 - self.mic_distance);
            let am = 0.2 + 0.6 * (1.0 - self.mic_distance);

            let (horn_l, horn_r) = self.horn.process(high, self.sample_rate, doppler, am);
            let (drum_l, drum_r) =
                self.drum
                    .process(low, self.sample_rate, doppler * 0.4, am * 0.5);

            let horn_gain = self.balance * 2.0;
            let drum_gain = (1.0 - self.balance) * 2.0;
            let wet_l = horn_l * horn_gain + drum_l * drum_gain;
            let wet_r = horn_r * horn_gain + drum_r * drum_gain;

            *l = wet_dry_mix(dry[0], wet_l, mix);
            *r = wet_dry_mix(dry[1], wet_r, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    self.fast_mode = map::unit(value);
                    self.apply_speed();
                }
                1 => {
                    self.inertia = map::unit(value);
                    // More inertia = slower glide. Horn is lighter than drum.
                    let horn_ms = 200.0 + 2000.0 * self.inertia;
                    let drum_ms = 500.0 + 4000.0 * self.inertia;
                    self.horn.speed =
                        SmoothedParam::with_time(self.horn.speed.get(), self.sample_rate, horn_ms);
                    self.drum.speed =
                        SmoothedParam::with_time(self.drum.speed.get(), self.sample_rate, drum_ms);
                    self.apply_speed();
                }
                2 => self.balance = map::unit(value),
                3 => self.mic_distance = map::unit(value),
                4 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for f in &mut self.crossover {
            f.reset();
        }
        self.horn.phase = 0.0;
        self.horn.delay.clear();
        self.horn.speed.snap_to_target();
        self.drum.phase = 0.25;
        self.drum.delay.clear();
        self.drum.speed.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_moves_between_channels() {
        let mut rotary = RotarySpeaker::new(48000.0);
        rotary.prepare(48000.0, 48000);
        rotary.update_parameters(&ParamUpdate::new().with(0, 1.0).with(3, 0.0));
        let mut l: Vec<f32> = (0..48000)
            .map(|i| libm::sinf(TAU * 2000.0 * i as f32 / 48000.0) * 0.5)
            .collect();
        let mut r = l.clone();
        rotary.process(&mut l, &mut r);
        // L-R difference should oscillate as the horn sweeps.
        let diff_energy: f32 = l[24000..]
            .iter()
            .zip(r[24000..].iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        assert!(diff_energy > 1.0, "no stereo motion: {diff_energy}");
    }

    #[test]
    fn finite_everywhere() {
        let mut rotary = RotarySpeaker::new(48000.0);
        rotary.prepare(48000.0, 512);
        let mut u = ParamUpdate::new();
        for i in 0..PARAMS.len() {
            u.set(i, 1.0);
        }
        rotary.update_parameters(&u);
        for _ in 0..40 {
            let mut l: Vec<f32> = (0..512).map(|i| libm::sinf(i as f32 * 0.21)).collect();
            let mut r = l.clone();
            rotary.process(&mut l, &mut r);
            assert!(l.iter().chain(r.iter()).all(|x| x.is_finite()));
        }
    }
}
