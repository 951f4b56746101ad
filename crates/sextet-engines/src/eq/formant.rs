//! Formant filters — vowel-shaped resonance banks.
//!
//! Two engines share the vowel tables here:
//!
//! - [`FormantFilter`] (3 params): one morphable vowel, A→E→I→O→U.
//! - [`VocalFormantFilter`] (4 params): adds a brightness tilt and wet/dry
//!   mix for vocal-tract colouring of arbitrary material.
//!
//! Each vowel is three parallel bandpass resonators at the classic soprano
//! formant frequencies; morphing interpolates the centre frequencies and
//! amplitudes between adjacent vowels.

use sextet_core::{
    Biquad, Engine, OnePole, ParamUpdate, SmoothedParam, biquad, map, scrub_stereo, wet_dry_mix,
};

/// Formant table: `[vowel][formant] = (frequency Hz, amplitude)`.
const VOWELS: [[(f32, f32); 3]; 5] = [
    // A
    [(800.0, 1.0), (1150.0, 0.63), (2900.0, 0.1)],
    // E
    [(350.0, 1.0), (2000.0, 0.5), (2800.0, 0.18)],
    // I
    [(270.0, 1.0), (2140.0, 0.25), (2950.0, 0.25)],
    // O
    [(450.0, 1.0), (800.0, 0.28), (2830.0, 0.08)],
    // U
    [(325.0, 1.0), (700.0, 0.16), (2700.0, 0.03)],
];

/// Interpolated formant set for a morph position in `[0, 1]`.
fn morph_vowel(position: f32) -> [(f32, f32); 3] {
    let scaled = position.clamp(0.0, 1.0) * (VOWELS.len() - 1) as f32;
    let idx = (scaled as usize).min(VOWELS.len() - 2);
    let t = scaled - idx as f32;
    core::array::from_fn(|f| {
        let (f0, a0) = VOWELS[idx][f];
        let (f1, a1) = VOWELS[idx + 1][f];
        (f0 + (f1 - f0) * t, a0 + (a1 - a0) * t)
    })
}

/// Shared resonator bank: three bandpass filters per channel.
struct FormantBank {
    sample_rate: f32,
    filters: [[Biquad; 3]; 2],
    amps: [f32; 3],
    q: f32,
}

impl FormantBank {
    fn new(sample_rate: f32) -> Self {
        let mut bank = Self {
            sample_rate,
            filters: core::array::from_fn(|_| core::array::from_fn(|_| Biquad::new())),
            amps: [1.0, 0.5, 0.1],
            q: 6.0,
        };
        bank.tune(0.0);
        bank
    }

    fn tune(&mut self, morph: f32) {
        let formants = morph_vowel(morph);
        for (f, &(freq, amp)) in formants.iter().enumerate() {
            let coeffs = biquad::bandpass(freq, self.q, self.sample_rate);
            for ch in 0..2 {
                self.filters[ch][f].set_coefficients(coeffs);
            }
            self.amps[f] = amp;
        }
    }

    #[inline]
    fn process(&mut self, ch: usize, input: f32) -> f32 {
        let mut acc = 0.0;
        for f in 0..3 {
            acc += self.filters[ch][f].process(input) * self.amps[f];
        }
        // Bandpass banks lose energy; bring the vowel up to signal level.
        acc * 2.5
    }

    fn reset(&mut self) {
        for ch in &mut self.filters {
            for f in ch {
                f.clear();
            }
        }
    }
}

/// Parameter names for [`FormantFilter`].
pub const FORMANT_PARAMS: &[&str] = &["Vowel", "Resonance", "Mix"];

/// Morphable vowel filter.
pub struct FormantFilter {
    bank: FormantBank,
    morph: SmoothedParam,
    mix: SmoothedParam,
    tuned_morph: f32,
}

impl FormantFilter {
    /// Create voiced as "A".
    pub fn new(sample_rate: f32) -> Self {
        Self {
            bank: FormantBank::new(sample_rate),
            morph: SmoothedParam::with_time(0.0, sample_rate, 30.0),
            mix: SmoothedParam::fast(1.0, sample_rate),
            tuned_morph: 0.0,
        }
    }
}

impl Engine for FormantFilter {
    fn name(&self) -> &'static str {
        "Formant Filter"
    }

    fn parameter_count(&self) -> usize {
        FORMANT_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        FORMANT_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.bank.sample_rate = sample_rate;
        self.morph.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.bank.tune(self.morph.target());
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let morph = self.morph.advance();
            // Retune only when the morph has moved audibly.
            if (morph - self.tuned_morph).abs() > 0.005 {
                self.bank.tune(morph);
                self.tuned_morph = morph;
            }
            let mix = self.mix.advance();
            let dry_l = *l;
            let dry_r = *r;
            *l = wet_dry_mix(dry_l, self.bank.process(0, dry_l), mix);
            *r = wet_dry_mix(dry_r, self.bank.process(1, dry_r), mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.morph.set_target(map::unit(value)),
                1 => {
                    self.bank.q = map::exponential(value, 2.0, 20.0);
                    self.bank.tune(self.tuned_morph);
                }
                2 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.bank.reset();
        self.morph.snap_to_target();
        self.mix.snap_to_target();
    }
}

/// Parameter names for [`VocalFormantFilter`].
pub const VOCAL_PARAMS: &[&str] = &["Vowel Morph", "Resonance", "Brightness", "Mix"];

/// Vocal-tract colouring filter with brightness tilt.
pub struct VocalFormantFilter {
    bank: FormantBank,
    morph: SmoothedParam,
    tilt: [OnePole; 2],
    brightness: f32,
    mix: SmoothedParam,
    tuned_morph: f32,
}

impl VocalFormantFilter {
    /// Create voiced as "A" with a neutral tilt.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            bank: FormantBank::new(sample_rate),
            morph: SmoothedParam::with_time(0.0, sample_rate, 30.0),
            tilt: [OnePole::new(sample_rate, 4000.0), OnePole::new(sample_rate, 4000.0)],
            brightness: 0.5,
            mix: SmoothedParam::fast(1.0, sample_rate),
            tuned_morph: 0.0,
        }
    }
}

impl Engine for VocalFormantFilter {
    fn name(&self) -> &'static str {
        "Vocal Formant Filter"
    }

    fn parameter_count(&self) -> usize {
        VOCAL_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        VOCAL_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.bank.sample_rate = sample_rate;
        self.morph.set_sample_rate(sample_rate);
        for t in &mut self.tilt {
            t.set_sample_rate(sample_rate);
        }
        self.mix.set_sample_rate(sample_rate);
        self.bank.tune(self.morph.target());
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let morph = self.morph.advance();
            if (morph - self.tuned_morph).abs() > 0.005 {
                self.bank.tune(morph);
                self.tuned_morph = morph;
            }
            let mix = self.mix.advance();
            let dry_l = *l;
            let dry_r = *r;
            let mut wet_l = self.bank.process(0, dry_l);
            let mut wet_r = self.bank.process(1, dry_r);
            // Brightness: blend toward the lowpassed (dark) or the raw
            // (bright) formant output.
            let dark_l = self.tilt[0].process(wet_l);
            let dark_r = self.tilt[1].process(wet_r);
            wet_l = dark_l + (wet_l - dark_l) * self.brightness * 2.0;
            wet_r = dark_r + (wet_r - dark_r) * self.brightness * 2.0;
            *l = wet_dry_mix(dry_l, wet_l, mix);
            *r = wet_dry_mix(dry_r, wet_r, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.morph.set_target(map::unit(value)),
                1 => {
                    self.bank.q = map::exponential(value, 2.0, 20.0);
                    self.bank.tune(self.tuned_morph);
                }
                2 => self.brightness = map::unit(value),
                3 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.bank.reset();
        for t in &mut self.tilt {
            t.reset();
        }
        self.morph.snap_to_target();
        self.mix.snap_to_target();
    }
}
