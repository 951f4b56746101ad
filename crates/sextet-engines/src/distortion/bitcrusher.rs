//! Bit Crusher — quantization and sample-rate reduction.
//!
//! Bit depth maps the normalized parameter `p` to `2 + 14·p` bits, so the
//! bottom of the range is genuinely destroyed (2-bit) and the top is
//! transparent (16-bit). Downsampling holds each sample for an
//! integer number of frames, producing the characteristic spectral images.

use sextet_core::{
    DcBlocker, Engine, ParamUpdate, SmoothedParam, map, scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Bits", "Downsample", "Mix"];

/// Quantize to a bit depth. Depth may be fractional; the step count
/// interpolates smoothly between depths.
#[inline]
fn quantize(sample: f32, bits: f32) -> f32 {
    let levels = libm::powf(2.0, bits) * 0.5;
    libm::roundf(sample.clamp(-1.0, 1.0) * levels) / levels
}

/// Bit and rate crusher.
pub struct BitCrusher {
    bits: f32,
    /// Hold factor: 1 = no reduction, N = keep every Nth sample.
    hold_factor: usize,
    hold_counter: usize,
    held: [f32; 2],
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl BitCrusher {
    /// Create transparent (16-bit, no downsampling).
    pub fn new(sample_rate: f32) -> Self {
        Self {
            bits: 16.0,
            hold_factor: 1,
            hold_counter: 0,
            held: [0.0; 2],
            mix: SmoothedParam::fast(1.0, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }
}

impl Engine for BitCrusher {
    fn name(&self) -> &'static str {
        "Bit Crusher"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let dry = [*l, *r];

            if self.hold_counter == 0 {
                self.held = [quantize(dry[0], self.bits), quantize(dry[1], self.bits)];
            }
            self.hold_counter = (self.hold_counter + 1) % self.hold_factor;

            let mix = self.mix.advance();
            let wet_l = self.dc[0].process(self.held[0]);
            let wet_r = self.dc[1].process(self.held[1]);
            *l = wet_dry_mix(dry[0], wet_l, mix);
            *r = wet_dry_mix(dry[1], wet_r, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                // Contract: 2 + 14·p bits.
                0 => self.bits = 2.0 + 14.0 * map::unit(value),
                1 => {
                    // 1x (no reduction) up to 64x hold.
                    self.hold_factor = map::exponential(value, 1.0, 64.0) as usize;
                    self.hold_factor = self.hold_factor.max(1);
                }
                2 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.hold_counter = 0;
        self.held = [0.0; 2];
        for dc in &mut self.dc {
            dc.reset();
        }
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_bit_quantization_is_coarse() {
        let mut crusher = BitCrusher::new(48000.0);
        crusher.prepare(48000.0, 512);
        crusher.update_parameters(&ParamUpdate::new().with(0, 0.0)); // 2 bits
        let mut l: Vec<f32> = (0..512).map(|i| libm::sinf(i as f32 * 0.05) * 0.9).collect();
        let mut r = l.clone();
        crusher.process(&mut l, &mut r);
        // 2 bits → 2 levels per polarity → few distinct values (DC blocker
        // smears them slightly, so count coarsely).
        let mut distinct: Vec<i32> = l.iter().map(|x| (x * 4.0) as i32).collect();
        distinct.sort_unstable();
        distinct.dedup();
        assert!(distinct.len() <= 8, "too many levels: {}", distinct.len());
    }

    #[test]
    fn downsample_holds_values() {
        let mut crusher = BitCrusher::new(48000.0);
        crusher.prepare(48000.0, 512);
        crusher.update_parameters(&ParamUpdate::new().with(0, 1.0).with(1, 1.0));
        let mut l: Vec<f32> = (0..512).map(|i| libm::sinf(i as f32 * 0.3)).collect();
        let mut r = l.clone();
        crusher.process(&mut l, &mut r);
        // With a 64x hold the output changes value rarely.
        let changes = l.windows(2).filter(|w| (w[0] - w[1]).abs() > 1e-3).count();
        assert!(changes < 40, "too many changes: {changes}");
    }

    #[test]
    fn sixteen_bit_is_nearly_transparent() {
        let mut crusher = BitCrusher::new(48000.0);
        crusher.prepare(48000.0, 512);
        crusher.update_parameters(&ParamUpdate::new().with(0, 1.0));
        let src: Vec<f32> = (0..512).map(|i| libm::sinf(i as f32 * 0.1) * 0.5).collect();
        let mut l = src.clone();
        let mut r = src.clone();
        crusher.process(&mut l, &mut r);
        let max_err = l
            .iter()
            .zip(src.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_err < 0.01, "16-bit error {max_err}");
    }
}
