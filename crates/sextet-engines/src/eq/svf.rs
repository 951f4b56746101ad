//! State-Variable Filter — multimode 12 dB/oct filter.

use sextet_core::{
    Engine, ParamUpdate, SmoothedParam, StateVariableFilter, SvfOutput, map, scrub_stereo,
    wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Cutoff", "Resonance", "Mode", "Mix"];

/// Multimode state-variable filter engine.
pub struct SvfFilter {
    filters: [StateVariableFilter; 2],
    cutoff: SmoothedParam,
    resonance: f32,
    mix: SmoothedParam,
}

impl SvfFilter {
    /// Create as an open lowpass.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            filters: [
                StateVariableFilter::new(sample_rate),
                StateVariableFilter::new(sample_rate),
            ],
            cutoff: SmoothedParam::with_time(10000.0, sample_rate, 10.0),
            resonance: 0.707,
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }
}

impl Engine for SvfFilter {
    fn name(&self) -> &'static str {
        "State-Variable Filter"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        for f in &mut self.filters {
            f.set_sample_rate(sample_rate);
        }
        self.cutoff.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        // Cutoff smoothing is applied at control rate inside the loop; the
        // Chamberlin structure tolerates per-sample coefficient motion.
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let cutoff = self.cutoff.advance();
            if !self.cutoff.is_settled() {
                for f in &mut self.filters {
                    f.set_cutoff(cutoff);
                }
            }
            let mix = self.mix.advance();
            let dry_l = *l;
            let dry_r = *r;
            *l = wet_dry_mix(dry_l, self.filters[0].process(dry_l), mix);
            *r = wet_dry_mix(dry_r, self.filters[1].process(dry_r), mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    let hz = map::exponential(value, 20.0, 18000.0);
                    self.cutoff.set_target(hz);
                    for f in &mut self.filters {
                        f.set_cutoff(hz);
                    }
                }
                1 => {
                    // Stable below 0.95; the SVF is clamped well before
                    // genuine blow-up either way.
                    self.resonance = map::exponential(value, 0.5, 25.0);
                    for f in &mut self.filters {
                        f.set_resonance(self.resonance);
                    }
                }
                2 => {
                    let mode = match map::stepped(value, 4) {
                        0 => SvfOutput::Lowpass,
                        1 => SvfOutput::Bandpass,
                        2 => SvfOutput::Highpass,
                        _ => SvfOutput::Notch,
                    };
                    for f in &mut self.filters {
                        f.set_output(mode);
                    }
                }
                3 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for f in &mut self.filters {
            f.reset();
        }
        self.cutoff.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    #[test]
    fn highpass_mode_rejects_lows() {
        let mut svf = SvfFilter::new(48000.0);
        svf.prepare(48000.0, 512);
        svf.update_parameters(
            &ParamUpdate::new()
                .with(0, map::exponential_inv(2000.0, 20.0, 18000.0))
                .with(2, 0.6), // highpass
        );
        let mut peak = 0.0f32;
        for block in 0..30 {
            let mut l: Vec<f32> = (0..512)
                .map(|i| 0.5 * libm::sinf(TAU * 100.0 * (block * 512 + i) as f32 / 48000.0))
                .collect();
            let mut r = l.clone();
            svf.process(&mut l, &mut r);
            if block > 15 {
                for s in &l {
                    peak = peak.max(s.abs());
                }
            }
        }
        assert!(peak < 0.05, "lows leaked: {peak}");
    }

    #[test]
    fn mix_zero_is_dry() {
        let mut svf = SvfFilter::new(48000.0);
        svf.prepare(48000.0, 64);
        svf.update_parameters(&ParamUpdate::new().with(3, 0.0));
        // Let the mix smoother settle.
        let mut l = vec![0.3f32; 64];
        let mut r = vec![0.3f32; 64];
        for _ in 0..20 {
            svf.process(&mut l, &mut r);
            l.fill(0.3);
            r.fill(0.3);
        }
        svf.process(&mut l, &mut r);
        assert!((l[63] - 0.3).abs() < 1e-4);
    }
}
