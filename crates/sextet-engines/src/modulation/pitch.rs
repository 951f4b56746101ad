//! Pitch-shifting engines built on the dual-head delay shifter.
//!
//! - [`PitchShifter`] — chromatic ±12 semitone shifter with fine detune.
//! - [`DetuneDoubler`] — two slightly detuned copies panned wide, the
//!   classic thickening trick.
//! - [`IntelligentHarmonizer`] — scale-aware interval harmony: the shift
//!   snaps to the nearest diatonic interval of the selected key and scale.
//!
//! All three keep transients aligned at the zero-shift point because the
//! underlying shifter degenerates to a fixed short delay when the ratio
//! is 1.

use sextet_core::{
    Engine, GrainlessShifter, ParamUpdate, SmoothedParam, map, scrub_stereo, wet_dry_mix,
};

// ───────────────────────── Pitch Shifter ─────────────────────────

/// Parameter names for [`PitchShifter`].
pub const PITCH_PARAMS: &[&str] = &["Pitch", "Fine", "Window", "Mix"];

/// Chromatic pitch shifter.
pub struct PitchShifter {
    sample_rate: f32,
    shifters: [GrainlessShifter; 2],
    semitones: f32,
    fine_cents: f32,
    window_ms: f32,
    mix: SmoothedParam,
}

impl PitchShifter {
    /// Create at zero shift.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            shifters: [
                GrainlessShifter::new(sample_rate, 45.0),
                GrainlessShifter::new(sample_rate, 45.0),
            ],
            semitones: 0.0,
            fine_cents: 0.0,
            window_ms: 45.0,
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }

    fn apply_ratio(&mut self) {
        let semis = self.semitones + self.fine_cents / 100.0;
        for s in &mut self.shifters {
            s.set_semitones(semis);
        }
    }
}

impl Engine for PitchShifter {
    fn name(&self) -> &'static str {
        "Pitch Shifter"
    }

    fn parameter_count(&self) -> usize {
        PITCH_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PITCH_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.shifters = [
            GrainlessShifter::new(sample_rate, self.window_ms),
            GrainlessShifter::new(sample_rate, self.window_ms),
        ];
        self.mix.set_sample_rate(sample_rate);
        self.apply_ratio();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.advance();
            let dry_l = *l;
            let dry_r = *r;
            *l = wet_dry_mix(dry_l, self.shifters[0].process(dry_l), mix);
            *r = wet_dry_mix(dry_r, self.shifters[1].process(dry_r), mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    // Snap to whole semitones over ±12.
                    self.semitones = libm::roundf(map::bipolar(value) * 12.0);
                    self.apply_ratio();
                }
                1 => {
                    self.fine_cents = map::bipolar(value) * 50.0;
                    self.apply_ratio();
                }
                2 => {
                    self.window_ms = map::linear(value, 20.0, 80.0);
                    self.shifters = [
                        GrainlessShifter::new(self.sample_rate, self.window_ms),
                        GrainlessShifter::new(self.sample_rate, self.window_ms),
                    ];
                    self.apply_ratio();
                }
                3 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for s in &mut self.shifters {
            s.reset();
        }
        self.mix.snap_to_target();
    }

    fn reported_latency(&self) -> usize {
        self.shifters[0].latency()
    }
}

// ───────────────────────── Detune Doubler ─────────────────────────

/// Parameter names for [`DetuneDoubler`].
pub const DETUNE_PARAMS: &[&str] = &["Detune", "Delay", "Width", "Voices", "Mix"];

/// Stereo detune thickener.
pub struct DetuneDoubler {
    sample_rate: f32,
    /// Up to two voices per channel: [channel][voice].
    voices: [[GrainlessShifter; 2]; 2],
    delay_buffers: [Vec<f32>; 2],
    delay_pos: usize,
    detune_cents: f32,
    delay_samples: usize,
    width: f32,
    voice_count: usize,
    mix: SmoothedParam,
}

impl DetuneDoubler {
    /// Create with ±9 cent detune.
    pub fn new(sample_rate: f32) -> Self {
        let make = || GrainlessShifter::new(sample_rate, 40.0);
        let mut doubler = Self {
            sample_rate,
            voices: [[make(), make()], [make(), make()]],
            delay_buffers: [vec![0.0; 4800], vec![0.0; 4800]],
            delay_pos: 0,
            detune_cents: 9.0,
            delay_samples: 0,
            width: 1.0,
            voice_count: 2,
            mix: SmoothedParam::fast(0.5, sample_rate),
        };
        doubler.apply_detune();
        doubler
    }

    fn apply_detune(&mut self) {
        for ch in 0..2 {
            // Opposite detune per channel pulls the image wide.
            let sign = if ch == 0 { 1.0 } else { -1.0 };
            self.voices[ch][0].set_semitones(sign * self.detune_cents / 100.0);
            self.voices[ch][1].set_semitones(-sign * self.detune_cents / 200.0);
        }
    }
}

impl Engine for DetuneDoubler {
    fn name(&self) -> &'static str {
        "Detune Doubler"
    }

    fn parameter_count(&self) -> usize {
        DETUNE_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        DETUNE_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        let make = || GrainlessShifter::new(sample_rate, 40.0);
        self.voices = [[make(), make()], [make(), make()]];
        self.delay_buffers = [
            vec![0.0; (sample_rate * 0.1) as usize],
            vec![0.0; (sample_rate * 0.1) as usize],
        ];
        self.mix.set_sample_rate(sample_rate);
        self.apply_detune();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let len = self.delay_buffers[0].len();
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.advance();
            let dry = [*l, *r];
            let mut wet = [0.0f32; 2];

            for ch in 0..2 {
                // Pre-delay before the doubled voice, like a real overdub.
                self.delay_buffers[ch][self.delay_pos] = dry[ch];
                let read = (self.delay_pos + len - self.delay_samples.min(len - 1)) % len;
                let delayed = self.delay_buffers[ch][read];

                let mut voice_sum = self.voices[ch][0].process(delayed);
                if self.voice_count > 1 {
                    voice_sum = (voice_sum + self.voices[ch][1].process(delayed)) * 0.7;
                }
                wet[ch] = voice_sum;
            }
            self.delay_pos = (self.delay_pos + 1) % len;

            // Width narrows the doubled image toward centre.
            let mid = (wet[0] + wet[1]) * 0.5;
            let side = (wet[0] - wet[1]) * 0.5 * self.width;
            wet[0] = mid + side;
            wet[1] = mid - side;

            *l = wet_dry_mix(dry[0], wet[0], mix);
            *r = wet_dry_mix(dry[1], wet[1], mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    self.detune_cents = map::linear(value, 0.0, 50.0);
                    self.apply_detune();
                }
                1 => {
                    self.delay_samples =
                        (map::linear(value, 0.0, 80.0) * 0.001 * self.sample_rate) as usize;
                }
                2 => self.width = map::unit(value) * 2.0,
                3 => self.voice_count = 1 + map::stepped(value, 2),
                4 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for ch in &mut self.voices {
            for v in ch {
                v.reset();
            }
        }
        for b in &mut self.delay_buffers {
            b.fill(0.0);
        }
        self.delay_pos = 0;
        self.mix.snap_to_target();
    }

    fn reported_latency(&self) -> usize {
        self.voices[0][0].latency()
    }
}

// ───────────────────────── Intelligent Harmonizer ─────────────────────────

/// Parameter names for [`IntelligentHarmonizer`].
pub const HARMONIZER_PARAMS: &[&str] = &[
    "Interval",
    "Key",
    "Scale",
    "Voices",
    "Spread",
    "Level",
    "Mix",
];

/// Scale definitions as semitone sets.
const SCALES: [[bool; 12]; 4] = [
    // Major
    [true, false, true, false, true, true, false, true, false, true, false, true],
    // Natural minor
    [true, false, true, true, false, true, false, true, true, false, true, false],
    // Dorian
    [true, false, true, true, false, true, false, true, false, true, true, false],
    // Pentatonic major
    [true, false, true, false, true, false, false, true, false, true, false, false],
];

/// Snap a chromatic offset (relative to the key root) to the nearest scale
/// degree.
fn snap_to_scale(semitones: i32, key: i32, scale: &[bool; 12]) -> i32 {
    for distance in 0..=6 {
        for candidate in [semitones - distance, semitones + distance] {
            let degree = (candidate - key).rem_euclid(12) as usize;
            if scale[degree] {
                return candidate;
            }
        }
    }
    semitones
}

/// Diatonic harmonizer.
pub struct IntelligentHarmonizer {
    sample_rate: f32,
    voices: [[GrainlessShifter; 2]; 2],
    interval: i32,
    key: i32,
    scale_index: usize,
    voice_count: usize,
    spread: f32,
    level: SmoothedParam,
    mix: SmoothedParam,
}

impl IntelligentHarmonizer {
    /// Create harmonizing a third up in C major.
    pub fn new(sample_rate: f32) -> Self {
        let make = || GrainlessShifter::new(sample_rate, 50.0);
        let mut engine = Self {
            sample_rate,
            voices: [[make(), make()], [make(), make()]],
            interval: 4,
            key: 0,
            scale_index: 0,
            voice_count: 1,
            spread: 0.5,
            level: SmoothedParam::standard(0.8, sample_rate),
            mix: SmoothedParam::fast(0.5, sample_rate),
        };
        engine.retune();
        engine
    }

    fn retune(&mut self) {
        let scale = &SCALES[self.scale_index];
        let first = snap_to_scale(self.interval, self.key, scale);
        // Second voice stacks a diatonic third above the first.
        let second = snap_to_scale(first + 3, self.key, scale);
        for ch in 0..2 {
            self.voices[ch][0].set_semitones(first as f32);
            self.voices[ch][1].set_semitones(second as f32);
        }
    }
}

impl Engine for IntelligentHarmonizer {
    fn name(&self) -> &'static str {
        "Intelligent Harmonizer"
    }

    fn parameter_count(&self) -> usize {
        HARMONIZER_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        HARMONIZER_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        let make = || GrainlessShifter::new(sample_rate, 50.0);
        self.voices = [[make(), make()], [make(), make()]];
        self.level.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.retune();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let level = self.level.advance();
            let mix = self.mix.advance();
            let dry = [*l, *r];
            let mut harmony = [0.0f32; 2];

            for ch in 0..2 {
                let mut sum = self.voices[ch][0].process(dry[ch]);
                if self.voice_count > 1 {
                    sum += self.voices[ch][1].process(dry[ch]) * 0.8;
                }
                harmony[ch] = sum * level;
            }

            // Spread pans voice energy outward by cross-cancelling.
            let side = (harmony[0] - harmony[1]) * 0.5 * (1.0 + self.spread);
            let mid = (harmony[0] + harmony[1]) * 0.5;

            *l = wet_dry_mix(dry[0], mid + side, mix);
            *r = wet_dry_mix(dry[1], mid - side, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    // ±12 semitone target interval before scale snapping.
                    self.interval = libm::roundf(map::bipolar(value) * 12.0) as i32;
                    self.retune();
                }
                1 => {
                    self.key = map::stepped(value, 12) as i32;
                    self.retune();
                }
                2 => {
                    self.scale_index = map::stepped(value, SCALES.len());
                    self.retune();
                }
                3 => self.voice_count = 1 + map::stepped(value, 2),
                4 => self.spread = map::unit(value),
                5 => self.level.set_target(map::unit(value)),
                6 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for ch in &mut self.voices {
            for v in ch {
                v.reset();
            }
        }
        self.level.snap_to_target();
        self.mix.snap_to_target();
    }

    fn reported_latency(&self) -> usize {
        self.voices[0][0].latency()
    }
}
