//! Envelope Filter — auto-wah.
//!
//! An envelope follower drives the cutoff of a resonant bandpass: play
//! harder, the filter opens further. Sensitivity scales how far the
//! envelope pushes the sweep; range sets the base frequency.

use sextet_core::{
    Engine, EnvelopeFollower, ParamUpdate, SmoothedParam, StateVariableFilter, SvfOutput, map,
    scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Sensitivity",
    "Range",
    "Resonance",
    "Attack",
    "Release",
    "Mix",
];

/// Envelope-driven wah filter.
pub struct EnvelopeFilter {
    envelope: EnvelopeFollower,
    filters: [StateVariableFilter; 2],
    sensitivity: f32,
    base_freq: f32,
    mix: SmoothedParam,
}

impl EnvelopeFilter {
    /// Create with a medium sweep.
    pub fn new(sample_rate: f32) -> Self {
        let mut envelope = EnvelopeFollower::new(sample_rate);
        envelope.set_attack_ms(5.0);
        envelope.set_release_ms(120.0);
        let mut filters = [
            StateVariableFilter::new(sample_rate),
            StateVariableFilter::new(sample_rate),
        ];
        for f in &mut filters {
            f.set_output(SvfOutput::Bandpass);
            f.set_resonance(4.0);
        }
        Self {
            envelope,
            filters,
            sensitivity: 0.5,
            base_freq: 300.0,
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }
}

impl Engine for EnvelopeFilter {
    fn name(&self) -> &'static str {
        "Envelope Filter"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.envelope.set_sample_rate(sample_rate);
        for f in &mut self.filters {
            f.set_sample_rate(sample_rate);
        }
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let dry_l = *l;
            let dry_r = *r;
            let level = self.envelope.process((dry_l + dry_r) * 0.5);

            // Envelope sweeps the cutoff up to ~3 octaves above base.
            let sweep = (level * self.sensitivity * 10.0).min(1.0);
            let cutoff = self.base_freq * libm::powf(8.0, sweep);
            for f in &mut self.filters {
                f.set_cutoff(cutoff);
            }

            let mix = self.mix.advance();
            // Bandpass wah loses level; compensate.
            *l = wet_dry_mix(dry_l, self.filters[0].process(dry_l) * 1.5, mix);
            *r = wet_dry_mix(dry_r, self.filters[1].process(dry_r) * 1.5, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.sensitivity = map::unit(value),
                1 => self.base_freq = map::exponential(value, 100.0, 1500.0),
                2 => {
                    let q = map::exponential(value, 1.0, 15.0);
                    for f in &mut self.filters {
                        f.set_resonance(q);
                    }
                }
                3 => self
                    .envelope
                    .set_attack_ms(map::exponential(value, 0.5, 50.0)),
                4 => self
                    .envelope
                    .set_release_ms(map::exponential(value, 20.0, 500.0)),
                5 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.envelope.reset();
        for f in &mut self.filters {
            f.reset();
        }
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn louder_input_opens_filter() {
        // Measure high-frequency content for quiet vs loud playing.
        let hf_energy = |amp: f32| -> f32 {
            let mut wah = EnvelopeFilter::new(48000.0);
            wah.prepare(48000.0, 512);
            wah.update_parameters(&ParamUpdate::new().with(0, 1.0));
            let mut acc = 0.0;
            let mut prev = 0.0;
            for block in 0..30 {
                let mut l: Vec<f32> = (0..512)
                    .map(|i| {
                        amp * libm::sinf(
                            core::f32::consts::TAU * 2000.0 * (block * 512 + i) as f32 / 48000.0,
                        )
                    })
                    .collect();
                let mut r = l.clone();
                wah.process(&mut l, &mut r);
                if block > 15 {
                    for &s in &l {
                        let d = s - prev;
                        acc += d * d;
                        prev = s;
                    }
                }
            }
            acc / (amp * amp)
        };
        let quiet = hf_energy(0.05);
        let loud = hf_energy(0.9);
        assert!(loud > quiet, "filter did not open: {loud} vs {quiet}");
    }

    #[test]
    fn finite_output() {
        let mut wah = EnvelopeFilter::new(48000.0);
        wah.prepare(48000.0, 256);
        let mut u = ParamUpdate::new();
        for i in 0..PARAMS.len() {
            u.set(i, 1.0);
        }
        wah.update_parameters(&u);
        let mut l = vec![1.0f32; 256];
        let mut r = vec![1.0f32; 256];
        for _ in 0..40 {
            wah.process(&mut l, &mut r);
        }
        assert!(l.iter().all(|x| x.is_finite()));
    }
}
