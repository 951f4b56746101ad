//! Tremolo engines.
//!
//! - [`ClassicTremolo`] — straight amplitude modulation with selectable
//!   waveform.
//! - [`HarmonicTremolo`] — the brownface trick: split at a crossover and
//!   modulate lows and highs in antiphase, which reads as motion without
//!   the volume dip of straight tremolo.

use sextet_core::{
    Engine, Lfo, LfoWaveform, OnePole, ParamUpdate, SmoothedParam, map, scrub_stereo,
    wet_dry_mix,
};

fn waveform_from(value: f32) -> LfoWaveform {
    match map::stepped(value, 4) {
        0 => LfoWaveform::Sine,
        1 => LfoWaveform::Triangle,
        2 => LfoWaveform::Square,
        _ => LfoWaveform::SampleHold,
    }
}

// ───────────────────────── Classic Tremolo ─────────────────────────

/// Parameter names for [`ClassicTremolo`].
pub const CLASSIC_PARAMS: &[&str] = &["Rate", "Depth", "Waveform", "Stereo Phase"];

/// Amplitude-modulation tremolo.
pub struct ClassicTremolo {
    lfos: [Lfo; 2],
    depth: SmoothedParam,
    stereo_phase: f32,
}

impl ClassicTremolo {
    /// Create at 5 Hz, half depth.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            lfos: [Lfo::new(sample_rate, 5.0), Lfo::new(sample_rate, 5.0)],
            depth: SmoothedParam::standard(0.5, sample_rate),
            stereo_phase: 0.0,
        }
    }
}

impl Engine for ClassicTremolo {
    fn name(&self) -> &'static str {
        "Classic Tremolo"
    }

    fn parameter_count(&self) -> usize {
        CLASSIC_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        CLASSIC_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        for lfo in &mut self.lfos {
            lfo.set_sample_rate(sample_rate);
        }
        self.depth.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let depth = self.depth.advance();
            // Unipolar modulator: depth 0 leaves gain pinned at 1.
            let gain_l = 1.0 - depth * self.lfos[0].next_unipolar();
            let gain_r = 1.0 - depth * self.lfos[1].next_unipolar();
            *l *= gain_l;
            *r *= gain_r;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    let hz = map::exponential(value, 0.01, 20.0);
                    for lfo in &mut self.lfos {
                        lfo.set_frequency(hz);
                    }
                }
                1 => self.depth.set_target(map::unit(value)),
                2 => {
                    let wf = waveform_from(value);
                    for lfo in &mut self.lfos {
                        lfo.set_waveform(wf);
                    }
                }
                3 => {
                    self.stereo_phase = map::unit(value) * 0.5;
                    self.lfos[1].set_phase(self.lfos[0].phase() + self.stereo_phase);
                }
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.lfos[0].reset();
        self.lfos[1].reset();
        self.lfos[1].set_phase(self.stereo_phase);
        self.depth.snap_to_target();
    }
}

// ───────────────────────── Harmonic Tremolo ─────────────────────────

/// Parameter names for [`HarmonicTremolo`].
pub const HARMONIC_PARAMS: &[&str] = &["Rate", "Depth", "Crossover", "Phase", "Mix"];

/// Band-split antiphase tremolo.
pub struct HarmonicTremolo {
    lfo: Lfo,
    splitters: [OnePole; 2],
    depth: SmoothedParam,
    /// Extra phase offset between the low and high modulators, in cycles.
    band_phase: f32,
    mix: SmoothedParam,
}

impl HarmonicTremolo {
    /// Create with the crossover at 800 Hz.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            lfo: Lfo::new(sample_rate, 4.0),
            splitters: [
                OnePole::new(sample_rate, 800.0),
                OnePole::new(sample_rate, 800.0),
            ],
            depth: SmoothedParam::standard(0.7, sample_rate),
            band_phase: 0.5,
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }
}

impl Engine for HarmonicTremolo {
    fn name(&self) -> &'static str {
        "Harmonic Tremolo"
    }

    fn parameter_count(&self) -> usize {
        HARMONIC_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        HARMONIC_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.lfo.set_sample_rate(sample_rate);
        for s in &mut self.splitters {
            s.set_sample_rate(sample_rate);
        }
        self.depth.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let depth = self.depth.advance();
            let mix = self.mix.advance();

            let phase = self.lfo.next_unipolar();
            let low_gain = 1.0 - depth * phase;
            // High band runs offset by `band_phase` of a cycle (0.5 =
            // antiphase, the classic sound).
            let high_mod = (phase + self.band_phase).rem_euclid(1.0);
            let high_gain = 1.0 - depth * high_mod;

            let dry = [*l, *r];
            let mut wet = [0.0f32; 2];
            for ch in 0..2 {
                let low = self.splitters[ch].process(dry[ch]);
                let high = dry[ch] - low;
                wet[ch] = low * low_gain + high * high_gain;
            }

            *l = wet_dry_mix(dry[0], wet[0], mix);
            *r = wet_dry_mix(dry[1], wet[1], mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.lfo.set_frequency(map::exponential(value, 0.01, 20.0)),
                1 => self.depth.set_target(map::unit(value)),
                2 => {
                    let hz = map::exponential(value, 200.0, 3000.0);
                    for s in &mut self.splitters {
                        s.set_frequency(hz);
                    }
                }
                3 => self.band_phase = map::unit(value),
                4 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.lfo.reset();
        for s in &mut self.splitters {
            s.reset();
        }
        self.depth.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_zero_is_transparent() {
        let mut trem = ClassicTremolo::new(48000.0);
        trem.prepare(48000.0, 512);
        trem.update_parameters(&ParamUpdate::new().with(1, 0.0));
        let mut l = vec![0.5f32; 512];
        let mut r = vec![0.5f32; 512];
        for _ in 0..20 {
            trem.process(&mut l, &mut r);
            l.fill(0.5);
            r.fill(0.5);
        }
        trem.process(&mut l, &mut r);
        assert!((l[511] - 0.5).abs() < 1e-3, "got {}", l[511]);
    }

    #[test]
    fn full_depth_modulates_amplitude() {
        let mut trem = ClassicTremolo::new(48000.0);
        trem.prepare(48000.0, 48000);
        trem.update_parameters(
            &ParamUpdate::new()
                .with(0, map::exponential_inv(5.0, 0.01, 20.0))
                .with(1, 1.0),
        );
        let mut l = vec![0.5f32; 48000];
        let mut r = l.clone();
        trem.process(&mut l, &mut r);
        let min = l.iter().fold(f32::MAX, |a, &b| a.min(b.abs()));
        let max = l.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        assert!(min < 0.05 && max > 0.45, "range {min}..{max}");
    }

    #[test]
    fn harmonic_tremolo_holds_total_energy_better_than_classic() {
        // With antiphase bands, broadband input keeps more constant level.
        let mut harm = HarmonicTremolo::new(48000.0);
        harm.prepare(48000.0, 48000);
        harm.update_parameters(&ParamUpdate::new().with(1, 1.0).with(3, 0.5));
        let src: Vec<f32> = (0..48000)
            .map(|i| {
                libm::sinf(core::f32::consts::TAU * 100.0 * i as f32 / 48000.0) * 0.3
                    + libm::sinf(core::f32::consts::TAU * 4000.0 * i as f32 / 48000.0) * 0.3
            })
            .collect();
        let mut l = src.clone();
        let mut r = src.clone();
        harm.process(&mut l, &mut r);
        let rms = |s: &[f32]| libm::sqrtf(s.iter().map(|x| x * x).sum::<f32>() / s.len() as f32);
        let mut min_rms = f32::MAX;
        let mut max_rms = 0.0f32;
        for chunk in l[4800..].chunks(2400) {
            let v = rms(chunk);
            min_rms = min_rms.min(v);
            max_rms = max_rms.max(v);
        }
        // Classic tremolo at full depth would dip to near zero.
        assert!(min_rms > 0.05, "harmonic tremolo dipped too deep: {min_rms}");
        assert!(max_rms > min_rms, "no modulation at all");
    }
}
