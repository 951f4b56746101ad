//! Harmonic Exciter — synthesized top-end sheen.
//!
//! Highpass the source, rectify-and-saturate it to generate fresh upper
//! harmonics, and blend the result back in. Only the generated band is
//! nonlinear; the dry path stays untouched, which is what separates an
//! exciter from an EQ boost.

use sextet_core::{
    DcBlocker, Engine, OnePole, ParamUpdate, SmoothedParam, map, math::fast_tanh, scrub_stereo,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Amount", "Frequency", "Mix"];

/// Aural-exciter style harmonic generator.
pub struct HarmonicExciter {
    highpass: [OnePole; 2],
    amount: SmoothedParam,
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl HarmonicExciter {
    /// Create with the generator band above 3 kHz.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            highpass: [
                OnePole::new(sample_rate, 3000.0),
                OnePole::new(sample_rate, 3000.0),
            ],
            amount: SmoothedParam::standard(0.5, sample_rate),
            mix: SmoothedParam::fast(0.5, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }
}

impl Engine for HarmonicExciter {
    fn name(&self) -> &'static str {
        "Harmonic Exciter"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        for hp in &mut self.highpass {
            hp.set_sample_rate(sample_rate);
        }
        self.amount.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let amount = self.amount.advance();
            let mix = self.mix.advance();
            let dry = [*l, *r];
            let mut excited = [0.0f32; 2];

            for ch in 0..2 {
                let highs = self.highpass[ch].process_highpass(dry[ch]);
                // Asymmetric saturation of the isolated band generates both
                // even and odd products above the crossover.
                let driven = highs * (1.0 + amount * 8.0);
                let generated = fast_tanh(driven + 0.2 * driven.abs());
                excited[ch] = self.dc[ch].process(generated) * amount;
            }

            *l = dry[0] + excited[0] * mix;
            *r = dry[1] + excited[1] * mix;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.amount.set_target(map::unit(value)),
                1 => {
                    let hz = map::exponential(value, 1000.0, 8000.0);
                    for hp in &mut self.highpass {
                        hp.set_frequency(hz);
                    }
                }
                2 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for hp in &mut self.highpass {
            hp.reset();
        }
        for dc in &mut self.dc {
            dc.reset();
        }
        self.amount.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    #[test]
    fn adds_content_above_source() {
        // A 2 kHz tone through the exciter should gain energy that a plain
        // copy does not have.
        let mut exciter = HarmonicExciter::new(48000.0);
        exciter.prepare(48000.0, 512);
        exciter.update_parameters(&ParamUpdate::new().with(0, 1.0).with(2, 1.0));
        let mut diff = 0.0f32;
        for block in 0..30 {
            let src: Vec<f32> = (0..512)
                .map(|i| 0.5 * libm::sinf(TAU * 2000.0 * (block * 512 + i) as f32 / 48000.0))
                .collect();
            let mut l = src.clone();
            let mut r = src.clone();
            exciter.process(&mut l, &mut r);
            if block > 15 {
                for (y, x) in l.iter().zip(src.iter()) {
                    diff += (y - x).abs();
                }
            }
        }
        assert!(diff > 1.0, "no harmonics generated: {diff}");
    }

    #[test]
    fn dry_when_mix_zero() {
        let mut exciter = HarmonicExciter::new(48000.0);
        exciter.prepare(48000.0, 64);
        exciter.update_parameters(&ParamUpdate::new().with(2, 0.0));
        let mut l = vec![0.4f32; 64];
        let mut r = vec![0.4f32; 64];
        for _ in 0..20 {
            exciter.process(&mut l, &mut r);
            l.fill(0.4);
            r.fill(0.4);
        }
        exciter.process(&mut l, &mut r);
        assert!((l[63] - 0.4).abs() < 1e-4);
    }
}
