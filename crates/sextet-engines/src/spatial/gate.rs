//! Spectral Gate — per-bin noise gating.
//!
//! Each FFT bin carries its own envelope and gate: bins below the
//! threshold are attenuated toward the reduction floor, bins above pass.
//! The per-bin attack/release smoothing is what separates this from a
//! crude spectral subtraction — bins fade rather than flutter.

use crate::spatial::spectral::{FFT_SIZE, Stft};
use rustfft::num_complex::Complex;
use sextet_core::{
    Engine, ParamUpdate, SmoothedParam, map, math::linear_to_db, scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Threshold", "Reduction", "Attack", "Release", "Mix"];

struct GateChannel {
    stft: Stft,
    /// Per-bin smoothed gate gain.
    bin_gains: Vec<f32>,
    /// Per-bin magnitude envelope.
    bin_envelopes: Vec<f32>,
}

impl GateChannel {
    fn new() -> Self {
        Self {
            stft: Stft::new(),
            bin_gains: vec![1.0; FFT_SIZE],
            bin_envelopes: vec![0.0; FFT_SIZE],
        }
    }
}

/// Per-bin spectral gate.
pub struct SpectralGate {
    channels: [GateChannel; 2],
    threshold_db: f32,
    reduction_db: f32,
    /// Frame-rate smoothing coefficients (one STFT hop per step).
    attack_coeff: f32,
    release_coeff: f32,
    mix: SmoothedParam,
}

impl SpectralGate {
    /// Create with a -45 dB threshold.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            channels: [GateChannel::new(), GateChannel::new()],
            threshold_db: -45.0,
            reduction_db: -60.0,
            attack_coeff: 0.3,
            release_coeff: 0.85,
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }
}

impl Engine for SpectralGate {
    fn name(&self) -> &'static str {
        "Spectral Gate"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let threshold_db = self.threshold_db;
        let floor = sextet_core::db_to_linear(self.reduction_db);
        let attack = self.attack_coeff;
        let release = self.release_coeff;

        let [ch_l, ch_r] = &mut self.channels;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.advance();
            for (sample, channel) in [(&mut *l, &mut *ch_l), (&mut *r, &mut *ch_r)] {
                let dry = *sample;
                let gains = &mut channel.bin_gains;
                let envelopes = &mut channel.bin_envelopes;
                let wet = channel.stft.process(dry, &mut |frame: &mut [Complex<f32>]| {
                    for ((bin, gain), envelope) in
                        frame.iter_mut().zip(gains.iter_mut()).zip(envelopes.iter_mut())
                    {
                        let mag = bin.norm();
                        // Envelope per bin with shared ballistics.
                        let coeff = if mag > *envelope { attack } else { release };
                        *envelope = coeff * *envelope + (1.0 - coeff) * mag;

                        let open = linear_to_db(*envelope * FFT_SIZE as f32 * 0.01)
                            > threshold_db;
                        let target = if open { 1.0 } else { floor };
                        let gain_coeff = if target > *gain { attack } else { release };
                        *gain = gain_coeff * *gain + (1.0 - gain_coeff) * target;
                        *bin *= *gain;
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
                0 => self.threshold_db = map::linear(value, -80.0, 0.0),
                1 => self.reduction_db = map::linear(value, -80.0, 0.0),
                // Frame-rate coefficients: 0 = instant, near 1 = slow.
                2 => self.attack_coeff = map::linear(value, 0.0, 0.9),
                3 => self.release_coeff = map::linear(value, 0.3, 0.98),
                4 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.stft.reset();
            ch.bin_gains.fill(1.0);
            ch.bin_envelopes.fill(0.0);
        }
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
    fn gates_quiet_noise_but_passes_loud_tone() {
        let run = |amp: f32| -> f32 {
            let mut gate = SpectralGate::new(48000.0);
            gate.prepare(48000.0, 8192);
            gate.update_parameters(&ParamUpdate::new().with(0, 0.5).with(4, 1.0));
            let mut energy = 0.0;
            for block in 0..12 {
                let mut l: Vec<f32> = (0..8192)
                    .map(|i| {
                        amp * libm::sinf(
                            core::f32::consts::TAU * 1000.0
                                * (block * 8192 + i) as f32
                                / 48000.0,
                        )
                    })
                    .collect();
                let mut r = l.clone();
                gate.process(&mut l, &mut r);
                if block > 6 {
                    energy += l.iter().map(|x| x * x).sum::<f32>();
                }
            }
            energy / (amp * amp)
        };
        let loud = run(0.9);
        let quiet = run(0.0005);
        assert!(
            loud > quiet * 10.0,
            "gate not level-dependent: loud {loud}, quiet {quiet}"
        );
    }
}
