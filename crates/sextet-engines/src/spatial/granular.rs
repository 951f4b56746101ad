//! Granular Cloud — live granulation of the input.
//!
//! A capture buffer is continuously recorded; grains are launched at a
//! density-controlled rate, each reading from a scattered position with a
//! scattered pitch, shaped by a Hann envelope, and panned across the
//! field. Feedback re-records the cloud into the buffer for avalanche
//! textures. All randomness is a counter-seeded xorshift, so reset makes
//! the cloud reproducible.

use sextet_core::{Engine, ParamUpdate, SmoothedParam, map, scrub_stereo, wet_dry_mix};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Grain Size",
    "Density",
    "Pitch",
    "Scatter",
    "Feedback",
    "Mix",
];

/// Capture buffer length in seconds.
const BUFFER_SECS: f32 = 2.0;

/// Maximum simultaneous grains.
const MAX_GRAINS: usize = 24;

#[derive(Clone, Copy, Default)]
struct Grain {
    active: bool,
    /// Read position in the capture buffer (fractional).
    position: f32,
    /// Playback rate (1.0 = original pitch).
    rate: f32,
    /// Age in samples.
    age: f32,
    /// Length in samples.
    length: f32,
    /// Equal-power pan gains.
    gain_l: f32,
    gain_r: f32,
}

/// Live granulator.
pub struct GranularCloud {
    sample_rate: f32,
    buffer: Vec<f32>,
    write_pos: usize,
    grains: [Grain; MAX_GRAINS],
    /// Samples until the next grain launch.
    spawn_countdown: f32,
    grain_size_ms: f32,
    density: f32,
    pitch_semis: f32,
    scatter: f32,
    feedback: f32,
    rng: u32,
    mix: SmoothedParam,
}

impl GranularCloud {
    /// Create a sparse cloud.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            buffer: vec![0.0; (sample_rate * BUFFER_SECS) as usize],
            write_pos: 0,
            grains: [Grain::default(); MAX_GRAINS],
            spawn_countdown: 0.0,
            grain_size_ms: 80.0,
            density: 0.4,
            pitch_semis: 0.0,
            scatter: 0.3,
            feedback: 0.0,
            rng: 0x51f15eed,
            mix: SmoothedParam::fast(0.5, sample_rate),
        }
    }

    #[inline]
    fn random(&mut self) -> f32 {
        self.rng ^= self.rng << 13;
        self.rng ^= self.rng >> 17;
        self.rng ^= self.rng << 5;
        self.rng as f32 / u32::MAX as f32
    }

    fn launch_grain(&mut self) {
        let scatter = self.scatter;
        let pitch = self.pitch_semis;
        let size = self.grain_size_ms * 0.001 * self.sample_rate;
        let len = self.buffer.len() as f32;

        // Find a free slot; a saturated cloud just drops the grain.
        let Some(slot) = self.grains.iter().position(|g| !g.active) else {
            return;
        };

        // Position scatters behind the write head.
        let max_back = len * 0.45;
        let back = 2400.0 + self.random() * max_back * scatter;
        let position = (self.write_pos as f32 - back).rem_euclid(len);

        // Pitch scatters around the base in ±2 semitone steps.
        let scatter_semis = (self.random() * 2.0 - 1.0) * 4.0 * scatter;
        let rate = libm::powf(2.0, (pitch + scatter_semis) / 12.0);

        let pan = (self.random() * 2.0 - 1.0) * scatter;
        let angle = (pan + 1.0) * 0.25 * core::f32::consts::PI;

        self.grains[slot] = Grain {
            active: true,
            position,
            rate,
            age: 0.0,
            length: size.max(256.0),
            gain_l: libm::cosf(angle),
            gain_r: libm::sinf(angle),
        };
    }
}

impl Engine for GranularCloud {
    fn name(&self) -> &'static str {
        "Granular Cloud"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.buffer = vec![0.0; (sample_rate * BUFFER_SECS) as usize];
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let len = self.buffer.len();
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.advance();
            let dry = [*l, *r];

            // Spawn grains at the density-controlled rate.
            self.spawn_countdown -= 1.0;
            if self.spawn_countdown <= 0.0 {
                self.launch_grain();
                // Density 1 → ~500 grains/s; density 0 → ~4/s.
                let interval = self.sample_rate / (4.0 + 500.0 * self.density);
                let jitter = 0.5 + self.random();
                self.spawn_countdown = interval * jitter;
            }

            // Sum the active grains.
            let mut cloud_l = 0.0;
            let mut cloud_r = 0.0;
            for grain in &mut self.grains {
                if !grain.active {
                    continue;
                }
                let idx = grain.position as usize % len;
                let frac = grain.position - libm::floorf(grain.position);
                let a = self.buffer[idx];
                let b = self.buffer[(idx + 1) % len];
                let sample = a + (b - a) * frac;

                // Hann envelope over the grain's life.
                let window = 0.5
                    - 0.5
                        * libm::cosf(
                            core::f32::consts::TAU * (grain.age / grain.length).min(1.0),
                        );
                cloud_l += sample * window * grain.gain_l;
                cloud_r += sample * window * grain.gain_r;

                grain.position = (grain.position + grain.rate).rem_euclid(len as f32);
                grain.age += 1.0;
                if grain.age >= grain.length {
                    grain.active = false;
                }
            }
            // Loose normalization against density.
            let norm = 1.0 / (1.0 + self.density * 4.0);
            cloud_l *= norm;
            cloud_r *= norm;

            // Record input (plus cloud feedback) into the capture buffer.
            let record =
                (dry[0] + dry[1]) * 0.5 + (cloud_l + cloud_r) * 0.5 * self.feedback;
            self.buffer[self.write_pos] = sextet_core::flush_denormal(record.clamp(-2.0, 2.0));
            self.write_pos = (self.write_pos + 1) % len;

            *l = wet_dry_mix(dry[0], cloud_l, mix);
            *r = wet_dry_mix(dry[1], cloud_r, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.grain_size_ms = map::exponential(value, 10.0, 500.0),
                1 => self.density = map::unit(value),
                2 => self.pitch_semis = map::bipolar(value) * 12.0,
                3 => self.scatter = map::unit(value),
                4 => self.feedback = map::unit(value) * 0.9,
                5 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.grains = [Grain::default(); MAX_GRAINS];
        self.spawn_countdown = 0.0;
        self.rng = 0x51f15eed;
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_emits_grains_from_captured_audio() {
        let mut cloud = GranularCloud::new(48000.0);
        cloud.prepare(48000.0, 48000);
        cloud.update_parameters(&ParamUpdate::new().with(1, 0.8).with(5, 1.0));
        // Capture a tone, then feed silence; the cloud should keep sounding
        // from the buffer.
        let mut l: Vec<f32> = (0..48000)
            .map(|i| {
                if i < 24000 {
                    libm::sinf(core::f32::consts::TAU * 330.0 * i as f32 / 48000.0)
                } else {
                    0.0
                }
            })
            .collect();
        let mut r = l.clone();
        cloud.process(&mut l, &mut r);
        let tail: f32 = l[30000..44000].iter().map(|x| x * x).sum();
        assert!(tail > 0.05, "cloud fell silent: {tail}");
    }

    #[test]
    fn deterministic_after_reset() {
        let mut cloud = GranularCloud::new(48000.0);
        cloud.prepare(48000.0, 9600);
        cloud.update_parameters(&ParamUpdate::new().with(1, 0.6).with(5, 1.0));
        let src: Vec<f32> = (0..9600).map(|i| libm::sinf(i as f32 * 0.04)).collect();
        let mut run = || -> Vec<f32> {
            cloud.reset();
            let mut l = src.clone();
            let mut r = src.clone();
            cloud.process(&mut l, &mut r);
            l
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn bounded_with_feedback() {
        let mut cloud = GranularCloud::new(48000.0);
        cloud.prepare(48000.0, 512);
        let mut u = ParamUpdate::new();
        for i in 0..PARAMS.len() {
            u.set(i, 1.0);
        }
        cloud.update_parameters(&u);
        for _ in 0..200 {
            let mut l = vec![0.5f32; 512];
            let mut r = vec![0.5f32; 512];
            cloud.process(&mut l, &mut r);
            assert!(l.iter().all(|x| x.is_finite() && x.abs() < 16.0));
        }
    }
}
