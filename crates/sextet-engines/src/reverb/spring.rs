//! Spring Reverb — dispersive spring-tank emulation.
//!
//! The signature of a spring is dispersion: high frequencies travel the
//! coil slower than lows, so an impulse smears into the "boing" chirp.
//! Each virtual spring is a long cascade of identical allpass sections
//! (the dispersive line) inside a feedback loop, plus a lowpass for coil
//! damping. The "drip" control emphasises the chirpy early reflections.

use sextet_core::{
    AllpassFilter, Engine, InterpolatedDelay, OnePole, ParamUpdate, SmoothedParam, map,
    math::flush_denormal, scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Tension", "Decay", "Tone", "Drip", "Springs", "Mix"];

/// Dispersive allpass sections per spring.
const DISPERSION_STAGES: usize = 24;

/// One spring: dispersive allpass cascade + delay + damping in a loop.
struct Spring {
    dispersion: Vec<AllpassFilter>,
    line: InterpolatedDelay,
    damping: OnePole,
    loop_delay: f32,
    feedback: f32,
    state: f32,
}

impl Spring {
    fn new(sample_rate: f32, delay_ms: f32) -> Self {
        Self {
            dispersion: (0..DISPERSION_STAGES)
                .map(|i| AllpassFilter::new(3 + (i * 7) % 11))
                .collect(),
            line: InterpolatedDelay::from_time(sample_rate, 0.1),
            damping: OnePole::new(sample_rate, 3500.0),
            loop_delay: delay_ms * 0.001 * sample_rate,
            feedback: 0.5,
            state: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, drip: f32) -> f32 {
        let mut chirp = input + self.state * self.feedback;
        for ap in &mut self.dispersion {
            chirp = ap.process(chirp);
        }
        let delayed = self.line.read_write(chirp, self.loop_delay);
        self.state = flush_denormal(self.damping.process(delayed));
        // Drip taps the dispersive cascade directly (pre-delay chirp).
        delayed + chirp * drip * 0.5
    }

    fn clear(&mut self) {
        for ap in &mut self.dispersion {
            ap.clear();
        }
        self.line.clear();
        self.damping.reset();
        self.state = 0.0;
    }
}

/// Multi-spring tank.
pub struct SpringReverb {
    sample_rate: f32,
    springs: Vec<Spring>,
    spring_count: usize,
    tension: f32,
    drip: f32,
    mix: SmoothedParam,
}

/// Base loop delays per spring in ms, detuned against each other.
const SPRING_DELAYS_MS: [f32; 3] = [33.0, 41.0, 53.0];

impl SpringReverb {
    /// Create a two-spring tank.
    pub fn new(sample_rate: f32) -> Self {
        let mut reverb = Self {
            sample_rate,
            springs: SPRING_DELAYS_MS
                .iter()
                .map(|&ms| Spring::new(sample_rate, ms))
                .collect(),
            spring_count: 2,
            tension: 0.5,
            drip: 0.5,
            mix: SmoothedParam::fast(0.3, sample_rate),
        };
        reverb.apply_settings();
        reverb
    }

    fn apply_settings(&mut self) {
        for (i, spring) in self.springs.iter_mut().enumerate() {
            // Tension shortens the coil (shorter loop, brighter chirp).
            let base = SPRING_DELAYS_MS[i] * 0.001 * self.sample_rate;
            spring.loop_delay = base * (1.3 - 0.6 * self.tension);
            for ap in &mut spring.dispersion {
                ap.set_feedback(0.45 + 0.2 * self.tension);
            }
        }
    }
}

impl Engine for SpringReverb {
    fn name(&self) -> &'static str {
        "Spring Reverb"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.springs = SPRING_DELAYS_MS
            .iter()
            .map(|&ms| Spring::new(sample_rate, ms))
            .collect();
        self.mix.set_sample_rate(sample_rate);
        self.apply_settings();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.advance();
            let dry = [*l, *r];
            let feed = (dry[0] + dry[1]) * 0.5;

            let mut wet_l = 0.0;
            let mut wet_r = 0.0;
            for (i, spring) in self.springs.iter_mut().take(self.spring_count).enumerate() {
                let out = spring.process(feed, self.drip);
                // Alternate spring outputs across the image.
                if i % 2 == 0 {
                    wet_l += out;
                    wet_r += out * 0.6;
                } else {
                    wet_l += out * 0.6;
                    wet_r += out;
                }
            }
            let norm = 1.0 / self.spring_count as f32;
            *l = wet_dry_mix(dry[0], wet_l * norm, mix);
            *r = wet_dry_mix(dry[1], wet_r * norm, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    self.tension = map::unit(value);
                    self.apply_settings();
                }
                1 => {
                    // Loop feedback, kept below unity for guaranteed decay.
                    let feedback = map::unit(value) * 0.9;
                    for spring in &mut self.springs {
                        spring.feedback = feedback;
                    }
                }
                2 => {
                    let hz = map::exponential(value, 1200.0, 8000.0);
                    for spring in &mut self.springs {
                        spring.damping.set_frequency(hz);
                    }
                }
                3 => self.drip = map::unit(value),
                4 => self.spring_count = 1 + map::stepped(value, SPRING_DELAYS_MS.len()),
                5 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for spring in &mut self.springs {
            spring.clear();
        }
        self.mix.snap_to_target();
    }
}
