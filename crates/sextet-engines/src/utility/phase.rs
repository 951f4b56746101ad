//! Phase Align — multiband phase rotation and inter-channel delay.
//!
//! For lining up multi-mic sources: per-band allpass rotation in four
//! bands, independent sample delay per channel, and global polarity. In
//! the neutral position every stage is skipped and the engine is exactly
//! transparent.

use sextet_core::{
    Biquad, Engine, InterpolatedDelay, ParamUpdate, SmoothedParam, biquad, map, scrub_stereo,
    wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Low Freq",
    "Low Phase",
    "Mid Freq",
    "Mid Phase",
    "High Freq",
    "High Phase",
    "Delay L",
    "Delay R",
    "Polarity",
    "Mix",
];

/// Band centre frequency bounds.
const BAND_RANGES: [(f32, f32); 3] = [(50.0, 400.0), (400.0, 3000.0), (3000.0, 12000.0)];

/// Maximum alignment delay per channel in ms.
const MAX_DELAY_MS: f32 = 10.0;

/// Allpass-based phase alignment tool.
pub struct PhaseAlign {
    sample_rate: f32,
    /// Band allpasses, `[band][channel]`.
    allpasses: [[Biquad; 2]; 3],
    band_freqs: [f32; 3],
    /// Rotation amounts in `[-1, 1]`; 0 bypasses the band.
    band_amounts: [f32; 3],
    delays: [InterpolatedDelay; 2],
    delay_ms: [SmoothedParam; 2],
    polarity_flip: bool,
    mix: SmoothedParam,
}

impl PhaseAlign {
    /// Create neutral.
    pub fn new(sample_rate: f32) -> Self {
        let mut engine = Self {
            sample_rate,
            allpasses: core::array::from_fn(|_| [Biquad::new(), Biquad::new()]),
            band_freqs: [150.0, 1000.0, 6000.0],
            band_amounts: [0.0; 3],
            delays: [
                InterpolatedDelay::from_time(sample_rate, MAX_DELAY_MS * 0.001),
                InterpolatedDelay::from_time(sample_rate, MAX_DELAY_MS * 0.001),
            ],
            delay_ms: [
                SmoothedParam::fast(0.0, sample_rate),
                SmoothedParam::fast(0.0, sample_rate),
            ],
            polarity_flip: false,
            mix: SmoothedParam::fast(1.0, sample_rate),
        };
        engine.retune();
        engine
    }

    fn retune(&mut self) {
        for (band, &freq) in self.band_freqs.iter().enumerate() {
            // Rotation amount steers the allpass Q; the filter is only run
            // when the amount is non-zero.
            let q = 0.3 + 2.0 * self.band_amounts[band].abs();
            let coeffs = biquad::allpass(freq, q, self.sample_rate);
            for ch in 0..2 {
                self.allpasses[band][ch].set_coefficients(coeffs);
            }
        }
    }

    fn is_neutral(&self) -> bool {
        self.band_amounts.iter().all(|&a| a == 0.0)
            && self.delay_ms.iter().all(|d| d.target() == 0.0 && d.is_settled())
            && !self.polarity_flip
    }
}

impl Engine for PhaseAlign {
    fn name(&self) -> &'static str {
        "Phase Align"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.delays = [
            InterpolatedDelay::from_time(sample_rate, MAX_DELAY_MS * 0.001),
            InterpolatedDelay::from_time(sample_rate, MAX_DELAY_MS * 0.001),
        ];
        for d in &mut self.delay_ms {
            d.set_sample_rate(sample_rate);
        }
        self.mix.set_sample_rate(sample_rate);
        self.retune();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        if self.is_neutral() {
            return;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.advance();
            let dry = [*l, *r];
            let mut wet = dry;

            // Per-band rotation. Double application deepens the rotation
            // with the amount's magnitude; sign picks lead vs lag by
            // blending against the dry band.
            for band in 0..3 {
                let amount = self.band_amounts[band];
                if amount == 0.0 {
                    continue;
                }
                for ch in 0..2 {
                    let rotated = self.allpasses[band][ch].process(wet[ch]);
                    wet[ch] = wet[ch] + (rotated - wet[ch]) * amount.abs()
                        * if amount < 0.0 { -1.0 } else { 1.0 };
                }
            }

            // Inter-channel delay.
            for ch in 0..2 {
                let ms = self.delay_ms[ch].advance();
                if ms > 0.001 {
                    let samples = ms * 0.001 * self.sample_rate;
                    wet[ch] = self.delays[ch].read_write(wet[ch], samples);
                } else {
                    self.delays[ch].write(wet[ch]);
                }
            }

            if self.polarity_flip {
                wet[0] = -wet[0];
                wet[1] = -wet[1];
            }

            *l = wet_dry_mix(dry[0], wet[0], mix);
            *r = wet_dry_mix(dry[1], wet[1], mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 | 2 | 4 => {
                    let band = index / 2;
                    let (lo, hi) = BAND_RANGES[band];
                    self.band_freqs[band] = map::exponential(value, lo, hi);
                    self.retune();
                }
                1 | 3 | 5 => {
                    let band = index / 2;
                    // Exact zero at centre keeps the neutral fast-path.
                    let amount = map::bipolar(value);
                    self.band_amounts[band] = if amount.abs() < 1e-6 { 0.0 } else { amount };
                    self.retune();
                }
                6 | 7 => {
                    let ch = index - 6;
                    self.delay_ms[ch].set_target(map::linear(value, 0.0, MAX_DELAY_MS));
                }
                8 => self.polarity_flip = value >= 0.5,
                9 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for band in &mut self.allpasses {
            for ch in band {
                ch.clear();
            }
        }
        for d in &mut self.delays {
            d.clear();
        }
        for d in &mut self.delay_ms {
            d.snap_to_target();
        }
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_is_bit_identical() {
        let mut align = PhaseAlign::new(48000.0);
        align.prepare(48000.0, 256);
        let src: Vec<f32> = (0..256).map(|i| libm::sinf(i as f32 * 0.23) * 0.7).collect();
        let mut l = src.clone();
        let mut r = src.clone();
        align.process(&mut l, &mut r);
        assert_eq!(l, src);
        assert_eq!(r, src);
    }

    #[test]
    fn delay_offsets_one_channel() {
        let mut align = PhaseAlign::new(48000.0);
        align.prepare(48000.0, 512);
        align.update_parameters(&ParamUpdate::new().with(6, 0.5)); // 5 ms on L
        let mut l = vec![0.0f32; 512];
        l[0] = 1.0;
        let mut r = l.clone();
        align.process(&mut l, &mut r);
        // Right passes immediately; left is delayed ~240 samples.
        assert!(r[0] > 0.9);
        let peak_pos = l.iter().enumerate().max_by(|a, b| {
            a.1.abs().partial_cmp(&b.1.abs()).unwrap()
        }).map(|(i, _)| i).unwrap();
        assert!((peak_pos as i32 - 240).abs() < 8, "peak at {peak_pos}");
    }

    #[test]
    fn polarity_flips_both() {
        let mut align = PhaseAlign::new(48000.0);
        align.prepare(48000.0, 64);
        align.update_parameters(&ParamUpdate::new().with(8, 1.0));
        let mut l = vec![0.5f32; 64];
        let mut r = vec![0.25f32; 64];
        align.process(&mut l, &mut r);
        assert!((l[32] + 0.5).abs() < 1e-6);
        assert!((r[32] + 0.25).abs() < 1e-6);
    }

    #[test]
    fn rotation_changes_phase_without_level() {
        let mut align = PhaseAlign::new(48000.0);
        align.prepare(48000.0, 512);
        align.update_parameters(&ParamUpdate::new().with(3, 1.0)); // full mid rotation
        let mut peak = 0.0f32;
        for block in 0..30 {
            let mut l: Vec<f32> = (0..512)
                .map(|i| {
                    0.5 * libm::sinf(
                        core::f32::consts::TAU * 1000.0 * (block * 512 + i) as f32 / 48000.0,
                    )
                })
                .collect();
            let mut r = l.clone();
            align.process(&mut l, &mut r);
            if block > 15 {
                for s in &l {
                    peak = peak.max(s.abs());
                }
            }
        }
        assert!((peak - 0.5).abs() < 0.1, "allpass changed level: {peak}");
    }
}
