//! Phased Vocoder — spectral resynthesis effects.
//!
//! A bank of phase-domain manipulations on the STFT frame: pitch shifting
//! by bin translation, "robot" (zeroed phases lock everything to the frame
//! rate), "whisper" (randomised phases destroy pitch while keeping the
//! spectral envelope), and temporal smearing of magnitudes.

use crate::spatial::spectral::{FFT_SIZE, Stft};
use rustfft::num_complex::Complex;
use sextet_core::{Engine, ParamUpdate, SmoothedParam, map, scrub_stereo, wet_dry_mix};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Pitch", "Robot", "Whisper", "Smear", "Mix"];

struct VocoderChannel {
    stft: Stft,
    smear_magnitudes: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    noise: u32,
}

impl VocoderChannel {
    fn new(seed: u32) -> Self {
        Self {
            stft: Stft::new(),
            smear_magnitudes: vec![0.0; FFT_SIZE],
            scratch: vec![Complex::default(); FFT_SIZE],
            noise: seed,
        }
    }
}

/// Frame-domain vocoder effects.
pub struct PhasedVocoder {
    channels: [VocoderChannel; 2],
    /// Bin translation ratio (1.0 = no shift).
    pitch_ratio: f32,
    robot: f32,
    whisper: f32,
    smear: f32,
    mix: SmoothedParam,
}

impl PhasedVocoder {
    /// Create transparent.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            channels: [VocoderChannel::new(0xace1), VocoderChannel::new(0xbeef)],
            pitch_ratio: 1.0,
            robot: 0.0,
            whisper: 0.0,
            smear: 0.0,
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }
}

impl Engine for PhasedVocoder {
    fn name(&self) -> &'static str {
        "Phased Vocoder"
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
        let pitch_ratio = self.pitch_ratio;
        let robot = self.robot;
        let whisper = self.whisper;
        let smear = self.smear;

        let [ch_l, ch_r] = &mut self.channels;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.advance();
            for (sample, channel) in [(&mut *l, &mut *ch_l), (&mut *r, &mut *ch_r)] {
                let dry = *sample;
                let smear_mags = &mut channel.smear_magnitudes;
                let scratch = &mut channel.scratch;
                let noise = &mut channel.noise;
                let wet = channel.stft.process(dry, &mut |frame: &mut [Complex<f32>]| {
                    let half = FFT_SIZE / 2;

                    // Pitch: translate bins by the ratio (coarse but
                    // effective inside a mix; the half-spectrum is mirrored
                    // to keep the IFFT real).
                    if (pitch_ratio - 1.0).abs() > 1e-3 {
                        scratch[..].fill(Complex::default());
                        for bin in 0..half {
                            let target = (bin as f32 * pitch_ratio) as usize;
                            if target < half {
                                scratch[target] += frame[bin];
                            }
                        }
                        for bin in 1..half {
                            scratch[FFT_SIZE - bin] = scratch[bin].conj();
                        }
                        frame.copy_from_slice(scratch);
                    }

                    for (i, bin) in frame.iter_mut().enumerate().take(half) {
                        let mut mag = bin.norm();
                        let mut phase = bin.arg();

                        // Smear magnitudes across frames.
                        let held = &mut smear_mags[i];
                        *held = *held * smear + mag * (1.0 - smear);
                        mag = mag * (1.0 - smear) + *held * smear;

                        // Robot: drag phases toward zero.
                        phase *= 1.0 - robot;

                        // Whisper: blend toward random phase.
                        if whisper > 0.0 {
                            *noise ^= *noise << 13;
                            *noise ^= *noise >> 17;
                            *noise ^= *noise << 5;
                            let random =
                                (*noise as f32 / u32::MAX as f32) * core::f32::consts::TAU;
                            phase += (random - phase) * whisper;
                        }

                        *bin = Complex::from_polar(mag, phase);
                    }
                    // Mirror for a real output frame.
                    for bin in 1..half {
                        frame[FFT_SIZE - bin] = frame[bin].conj();
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
                0 => {
                    // ±12 semitones.
                    let semis = map::bipolar(value) * 12.0;
                    self.pitch_ratio = libm::powf(2.0, semis / 12.0);
                }
                1 => self.robot = map::unit(value),
                2 => self.whisper = map::unit(value),
                3 => self.smear = map::unit(value) * 0.95,
                4 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.stft.reset();
            ch.smear_magnitudes.fill(0.0);
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
    fn whisper_destroys_periodicity() {
        let autocorr_peak = |whisper: f32| -> f32 {
            let mut vocoder = PhasedVocoder::new(48000.0);
            vocoder.prepare(48000.0, 8192);
            vocoder.update_parameters(&ParamUpdate::new().with(2, whisper).with(4, 1.0));
            let mut out = Vec::new();
            for block in 0..8 {
                let mut l: Vec<f32> = (0..8192)
                    .map(|i| {
                        libm::sinf(
                            core::f32::consts::TAU * 440.0 * (block * 8192 + i) as f32 / 48000.0,
                        )
                    })
                    .collect();
                let mut r = l.clone();
                vocoder.process(&mut l, &mut r);
                if block > 4 {
                    out.extend_from_slice(&l);
                }
            }
            // Autocorrelation at the 440 Hz lag.
            let lag = (48000.0 / 440.0) as usize;
            let n = out.len() - lag;
            let num: f32 = (0..n).map(|i| out[i] * out[i + lag]).sum();
            let den: f32 = out.iter().map(|x| x * x).sum();
            (num / den.max(1e-9)).abs()
        };
        let clean = autocorr_peak(0.0);
        let whispered = autocorr_peak(1.0);
        assert!(
            whispered < clean * 0.7,
            "whisper kept periodicity: {whispered} vs {clean}"
        );
    }

    #[test]
    fn finite_at_extremes() {
        let mut vocoder = PhasedVocoder::new(48000.0);
        vocoder.prepare(48000.0, 2048);
        let mut u = ParamUpdate::new();
        for i in 0..PARAMS.len() {
            u.set(i, 1.0);
        }
        vocoder.update_parameters(&u);
        for _ in 0..20 {
            let mut l: Vec<f32> = (0..2048).map(|i| libm::sinf(i as f32 * 0.1)).collect();
            let mut r = l.clone();
            vocoder.process(&mut l, &mut r);
            assert!(l.iter().all(|x| x.is_finite()));
        }
    }
}
