//! Spectral Freeze — hold a spectrum indefinitely.
//!
//! When frozen, the engine stops advancing its analysis frames and keeps
//! resynthesising the captured magnitude spectrum, with per-bin phase
//! randomisation each frame so the held sound breathes instead of looping.
//! Blend morphs between the live input and the frozen pad; smear softens
//! the capture by averaging magnitudes over several frames.

use crate::spatial::spectral::Stft;
use rustfft::num_complex::Complex;
use sextet_core::{Engine, ParamUpdate, SmoothedParam, map, scrub_stereo, wet_dry_mix};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Freeze", "Blend", "Smear", "Mix"];

/// One channel of freeze state.
struct FreezeChannel {
    stft: Stft,
    held_magnitudes: Vec<f32>,
    phase_seed: u32,
    initial_seed: u32,
}

impl FreezeChannel {
    fn new(seed: u32) -> Self {
        Self {
            stft: Stft::new(),
            held_magnitudes: vec![0.0; crate::spatial::spectral::FFT_SIZE],
            phase_seed: seed,
            initial_seed: seed,
        }
    }
}

/// Spectrum-hold engine.
pub struct SpectralFreeze {
    channels: [FreezeChannel; 2],
    frozen: bool,
    blend: SmoothedParam,
    smear: f32,
    mix: SmoothedParam,
}

impl SpectralFreeze {
    /// Create unfrozen.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            channels: [FreezeChannel::new(0x1111), FreezeChannel::new(0x2222)],
            frozen: false,
            blend: SmoothedParam::standard(1.0, sample_rate),
            smear: 0.3,
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }
}

impl Engine for SpectralFreeze {
    fn name(&self) -> &'static str {
        "Spectral Freeze"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.blend.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let [ch_l, ch_r] = &mut self.channels;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let blend = self.blend.advance();
            let mix = self.mix.advance();
            let frozen = self.frozen;
            let smear = self.smear;

            for (sample, channel) in [(&mut *l, &mut *ch_l), (&mut *r, &mut *ch_r)] {
                let dry = *sample;
                let held = &mut channel.held_magnitudes;
                let seed = &mut channel.phase_seed;
                let wet = channel.stft.process(dry, &mut |frame: &mut [Complex<f32>]| {
                    if frozen {
                        // Resynthesize from held magnitudes with slowly
                        // randomised phases.
                        for (bin, held_mag) in frame.iter_mut().zip(held.iter()) {
                            *seed ^= *seed << 13;
                            *seed ^= *seed >> 17;
                            *seed ^= *seed << 5;
                            let phase = (*seed as f32 / u32::MAX as f32)
                                * core::f32::consts::TAU;
                            let live = *bin;
                            let frozen_bin = Complex::from_polar(*held_mag, phase);
                            *bin = live * (1.0 - blend) + frozen_bin * blend;
                        }
                    } else {
                        // Track the live spectrum into the hold buffer.
                        for (bin, held_mag) in frame.iter().zip(held.iter_mut()) {
                            let mag = bin.norm();
                            *held_mag = *held_mag * smear + mag * (1.0 - smear);
                        }
                    }
                });
                *sample = wet_dry_mix(dry, wet, mix);
            }
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.frozen = value >= 0.5,
                1 => self.blend.set_target(map::unit(value)),
                2 => self.smear = map::unit(value) * 0.98,
                3 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.stft.reset();
            ch.held_magnitudes.fill(0.0);
            ch.phase_seed = ch.initial_seed;
        }
        self.blend.snap_to_target();
        self.mix.snap_to_target();
    }

    fn reported_latency(&self) -> usize {
        Stft::latency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_pad_sounds_after_input_stops() {
        let mut freeze = SpectralFreeze::new(48000.0);
        freeze.prepare(48000.0, 4096);
        freeze.update_parameters(&ParamUpdate::new().with(1, 1.0).with(3, 1.0));

        // Capture a tone...
        for _ in 0..8 {
            let mut l: Vec<f32> = (0..4096)
                .map(|i| libm::sinf(core::f32::consts::TAU * 440.0 * i as f32 / 48000.0))
                .collect();
            let mut r = l.clone();
            freeze.process(&mut l, &mut r);
        }
        // ...freeze, then feed silence.
        freeze.update_parameters(&ParamUpdate::new().with(0, 1.0));
        let mut energy = 0.0f32;
        for _ in 0..8 {
            let mut l = vec![0.0f32; 4096];
            let mut r = vec![0.0f32; 4096];
            freeze.process(&mut l, &mut r);
            energy += l.iter().map(|x| x * x).sum::<f32>();
        }
        assert!(energy > 0.5, "freeze produced silence: {energy}");
    }

    #[test]
    fn unfrozen_passes_audio_with_latency() {
        let mut freeze = SpectralFreeze::new(48000.0);
        freeze.prepare(48000.0, 8192);
        freeze.update_parameters(&ParamUpdate::new().with(1, 0.0).with(3, 1.0));
        let mut l: Vec<f32> = (0..8192).map(|i| libm::sinf(i as f32 * 0.06)).collect();
        let mut r = l.clone();
        freeze.process(&mut l, &mut r);
        let tail_energy: f32 = l[4096..].iter().map(|x| x * x).sum();
        assert!(tail_energy > 10.0, "no throughput: {tail_energy}");
        assert_eq!(freeze.reported_latency(), Stft::latency());
    }
}
