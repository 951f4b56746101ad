//! Parametric EQ — three fully parametric peaking bands.
//!
//! | Idx | Name | Range |
//! |-----|------|-------|
//! | 0 | Low Freq | 20–500 Hz |
//! | 1 | Low Gain | ±18 dB |
//! | 2 | Low Q | 0.3–8 |
//! | 3 | Mid Freq | 200–5000 Hz |
//! | 4 | Mid Gain | ±18 dB |
//! | 5 | Mid Q | 0.3–8 |
//! | 6 | High Freq | 2–18 kHz |
//! | 7 | High Gain | ±18 dB |
//! | 8 | High Q | 0.3–8 |

use sextet_core::{Biquad, Engine, ParamUpdate, biquad, map, scrub_stereo};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Low Freq",
    "Low Gain",
    "Low Q",
    "Mid Freq",
    "Mid Gain",
    "Mid Q",
    "High Freq",
    "High Gain",
    "High Q",
];

#[derive(Clone, Copy)]
struct Band {
    freq: f32,
    gain_db: f32,
    q: f32,
}

/// Three-band parametric equalizer.
pub struct ParametricEq {
    sample_rate: f32,
    bands: [Band; 3],
    /// Filters indexed `[band][channel]`.
    filters: [[Biquad; 2]; 3],
}

impl ParametricEq {
    /// Frequency ranges per band.
    const FREQ_RANGES: [(f32, f32); 3] = [(20.0, 500.0), (200.0, 5000.0), (2000.0, 18000.0)];

    /// Create with all bands flat.
    pub fn new(sample_rate: f32) -> Self {
        let defaults = [
            Band { freq: 100.0, gain_db: 0.0, q: 0.7 },
            Band { freq: 1000.0, gain_db: 0.0, q: 0.7 },
            Band { freq: 8000.0, gain_db: 0.0, q: 0.7 },
        ];
        let mut eq = Self {
            sample_rate,
            bands: defaults,
            filters: core::array::from_fn(|_| [Biquad::new(), Biquad::new()]),
        };
        eq.retune_all();
        eq
    }

    fn retune(&mut self, band: usize) {
        let b = self.bands[band];
        let coeffs = biquad::peaking(b.freq, b.q, b.gain_db, self.sample_rate);
        for ch in &mut self.filters[band] {
            ch.set_coefficients(coeffs);
        }
    }

    fn retune_all(&mut self) {
        for band in 0..3 {
            self.retune(band);
        }
    }
}

impl Engine for ParametricEq {
    fn name(&self) -> &'static str {
        "Parametric EQ"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.retune_all();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mut sl = *l;
            let mut sr = *r;
            for band in &mut self.filters {
                sl = band[0].process(sl);
                sr = band[1].process(sr);
            }
            *l = sl;
            *r = sr;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            let band = index / 3;
            if band >= 3 {
                continue;
            }
            let (lo, hi) = Self::FREQ_RANGES[band];
            match index % 3 {
                0 => self.bands[band].freq = map::exponential(value, lo, hi),
                1 => self.bands[band].gain_db = map::linear(value, -18.0, 18.0),
                _ => self.bands[band].q = map::exponential(value, 0.3, 8.0),
            }
            self.retune(band);
        }
    }

    fn reset(&mut self) {
        for band in &mut self.filters {
            for ch in band {
                ch.clear();
            }
        }
    }
}
