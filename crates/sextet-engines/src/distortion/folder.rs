//! Wave Folder — West-coast style wavefolding.
//!
//! Gain pushes the signal into reflecting fold boundaries; each fold adds a
//! new pair of harmonics. Runs 4× oversampled — folding is the most
//! alias-prone nonlinearity in the catalogue. A smoothing control blends
//! between hard reflection and a sine-shaped fold.

use sextet_core::{
    DcBlocker, Engine, Oversampler, ParamUpdate, SmoothedParam, map,
    math::{foldback, soft_limit},
    scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Fold", "Bias", "Smooth", "Output Gain", "Mix"];

/// Oversampled wavefolder.
pub struct WaveFolder {
    fold: SmoothedParam,
    bias: SmoothedParam,
    smooth: f32,
    oversamplers: [Oversampler; 2],
    output: SmoothedParam,
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl WaveFolder {
    /// Create with no folding.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            fold: SmoothedParam::standard(1.0, sample_rate),
            bias: SmoothedParam::standard(0.0, sample_rate),
            smooth: 0.0,
            oversamplers: [Oversampler::new(4), Oversampler::new(4)],
            output: SmoothedParam::standard(1.0, sample_rate),
            mix: SmoothedParam::fast(1.0, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }
}

impl Engine for WaveFolder {
    fn name(&self) -> &'static str {
        "Wave Folder"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        for p in [&mut self.fold, &mut self.bias, &mut self.output, &mut self.mix] {
            p.set_sample_rate(sample_rate);
        }
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let fold_gain = self.fold.advance();
            let bias = self.bias.advance();
            let smooth = self.smooth;
            let mix = self.mix.advance();
            let out_gain = self.output.advance();
            let dry = [*l, *r];
            let mut wet = [0.0f32; 2];

            for ch in 0..2 {
                wet[ch] = self.oversamplers[ch].process(dry[ch], |x| {
                    let driven = x * fold_gain + bias;
                    let hard = foldback(driven, 1.0);
                    // Sine folding wraps the same range with a smooth curve.
                    let soft = libm::sinf(core::f32::consts::FRAC_PI_2 * driven);
                    let folded = hard + (soft - hard) * smooth;
                    soft_limit(folded, 1.0)
                });
                wet[ch] = self.dc[ch].process(wet[ch]);
            }

            *l = wet_dry_mix(dry[0], wet[0], mix) * out_gain;
            *r = wet_dry_mix(dry[1], wet[1], mix) * out_gain;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.fold.set_target(map::linear(value, 1.0, 12.0)),
                1 => self.bias.set_target(map::bipolar(value) * 0.5),
                2 => self.smooth = map::unit(value),
                3 => self.output.set_target(map::db_gain(value, -24.0, 6.0)),
                4 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for os in &mut self.oversamplers {
            os.reset();
        }
        for dc in &mut self.dc {
            dc.reset();
        }
        for p in [&mut self.fold, &mut self.bias, &mut self.output, &mut self.mix] {
            p.snap_to_target();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folding_bounds_output() {
        let mut folder = WaveFolder::new(48000.0);
        folder.prepare(48000.0, 512);
        folder.update_parameters(&ParamUpdate::new().with(0, 1.0).with(1, 1.0));
        for _ in 0..30 {
            let mut l: Vec<f32> = (0..512).map(|i| libm::sinf(i as f32 * 0.05)).collect();
            let mut r = l.clone();
            folder.process(&mut l, &mut r);
            assert!(l.iter().all(|x| x.is_finite() && x.abs() <= 1.2));
        }
    }

    #[test]
    fn fold_changes_waveform() {
        let run = |fold: f32| -> Vec<f32> {
            let mut folder = WaveFolder::new(48000.0);
            folder.prepare(48000.0, 512);
            folder.update_parameters(&ParamUpdate::new().with(0, fold));
            let mut l: Vec<f32> = (0..512)
                .map(|i| 0.9 * libm::sinf(core::f32::consts::TAU * 200.0 * i as f32 / 48000.0))
                .collect();
            let mut r = l.clone();
            for _ in 0..5 {
                folder.process(&mut l, &mut r);
                for (i, s) in l.iter_mut().enumerate() {
                    *s = 0.9 * libm::sinf(core::f32::consts::TAU * 200.0 * i as f32 / 48000.0);
                    r[i] = *s;
                }
            }
            folder.process(&mut l, &mut r);
            l
        };
        let clean = run(0.0);
        let folded = run(1.0);
        let diff: f32 = clean
            .iter()
            .zip(folded.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        assert!(diff > 1.0, "folding had no audible effect: {diff}");
    }
}
