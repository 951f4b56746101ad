//! Plate Reverb — comb bank with allpass diffusion.
//!
//! Freeverb-derived topology: eight parallel damped combs per channel at
//! mutually prime delays (right channel offset for decorrelation), four
//! series allpasses for diffusion, predelay in front. Size scales the comb
//! tunings; decay sets the comb feedback and is hard-limited below unity.
//!
//! References: Schroeder (JAES 1962); Jezar's Freeverb tunings.

use sextet_core::{
    AllpassFilter, CombFilter, Engine, InterpolatedDelay, ParamUpdate, SmoothedParam, map,
    math::ms_to_samples, scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Size", "Decay", "Damping", "Predelay", "Diffusion", "Mix"];

/// Comb tunings at 44.1 kHz (Freeverb, mutually prime).
const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass tunings at 44.1 kHz.
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];

/// Right-channel decorrelation offset in samples.
const STEREO_SPREAD: usize = 23;

/// Maximum predelay in ms.
const MAX_PREDELAY_MS: f32 = 200.0;

fn scale_tuning(samples_44k: usize, sample_rate: f32, size: f32) -> usize {
    // Size 0.5 is the reference plate; the range sweeps 0.5×–2×.
    let scale = (sample_rate / 44100.0) * (0.5 + 1.5 * size);
    ((samples_44k as f32 * scale) as usize).max(16)
}

/// One channel of plate state.
struct PlateChannel {
    combs: [CombFilter; 8],
    allpasses: [AllpassFilter; 4],
}

impl PlateChannel {
    fn build(sample_rate: f32, size: f32, offset: usize) -> Self {
        Self {
            combs: core::array::from_fn(|i| {
                CombFilter::new(scale_tuning(COMB_TUNINGS[i] + offset, sample_rate, size))
            }),
            allpasses: core::array::from_fn(|i| {
                AllpassFilter::new(scale_tuning(ALLPASS_TUNINGS[i] + offset, sample_rate, size))
            }),
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let mut acc = 0.0;
        for comb in &mut self.combs {
            acc += comb.process(input);
        }
        let mut out = acc * 0.125;
        for ap in &mut self.allpasses {
            out = ap.process(out);
        }
        out
    }

    fn clear(&mut self) {
        for comb in &mut self.combs {
            comb.clear();
        }
        for ap in &mut self.allpasses {
            ap.clear();
        }
    }
}

/// Freeverb-style plate.
pub struct PlateReverb {
    sample_rate: f32,
    channels: [PlateChannel; 2],
    predelay: [InterpolatedDelay; 2],
    predelay_samples: SmoothedParam,
    size: f32,
    decay: f32,
    damping: f32,
    diffusion: f32,
    mix: SmoothedParam,
}

impl PlateReverb {
    /// Create a medium plate.
    pub fn new(sample_rate: f32) -> Self {
        let mut reverb = Self {
            sample_rate,
            channels: [
                PlateChannel::build(sample_rate, 0.5, 0),
                PlateChannel::build(sample_rate, 0.5, STEREO_SPREAD),
            ],
            predelay: [
                InterpolatedDelay::from_time(sample_rate, MAX_PREDELAY_MS * 0.001),
                InterpolatedDelay::from_time(sample_rate, MAX_PREDELAY_MS * 0.001),
            ],
            predelay_samples: SmoothedParam::with_time(0.0, sample_rate, 50.0),
            size: 0.5,
            decay: 0.5,
            damping: 0.4,
            diffusion: 0.5,
            mix: SmoothedParam::fast(0.3, sample_rate),
        };
        reverb.apply_settings();
        reverb
    }

    fn rebuild(&mut self) {
        self.channels = [
            PlateChannel::build(self.sample_rate, self.size, 0),
            PlateChannel::build(self.sample_rate, self.size, STEREO_SPREAD),
        ];
        self.apply_settings();
    }

    fn apply_settings(&mut self) {
        // Decay is RT60 over 0.1..10 s (exponential curve). Each comb gets
        // the Schroeder feedback for its own loop time,
        //   g = 10^(-3 * loop / RT60),
        // so all loops decay 60 dB together; CombFilter still clamps below
        // unity.
        let rt60 = sextet_core::map::exponential(self.decay, 0.1, 10.0);
        for channel in &mut self.channels {
            for comb in &mut channel.combs {
                let loop_secs = comb.capacity() as f32 / self.sample_rate;
                let feedback = libm::powf(10.0, -3.0 * loop_secs / rt60);
                comb.set_feedback(feedback);
                comb.set_damp(self.damping);
            }
            for ap in &mut channel.allpasses {
                ap.set_feedback(0.3 + 0.4 * self.diffusion);
            }
        }
    }
}

impl Engine for PlateReverb {
    fn name(&self) -> &'static str {
        "Plate Reverb"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.predelay = [
            InterpolatedDelay::from_time(sample_rate, MAX_PREDELAY_MS * 0.001),
            InterpolatedDelay::from_time(sample_rate, MAX_PREDELAY_MS * 0.001),
        ];
        self.predelay_samples.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.rebuild();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let predelay = self.predelay_samples.advance();
            let mix = self.mix.advance();
            let dry = [*l, *r];

            // Mono feed into both tanks preserves the input image in the
            // dry path while the tanks decorrelate the tail.
            let feed = (dry[0] + dry[1]) * 0.5;
            let mut wet = [0.0f32; 2];
            for ch in 0..2 {
                let delayed = self.predelay[ch].read_write(feed, predelay);
                wet[ch] = self.channels[ch].process(delayed);
            }

            *l = wet_dry_mix(dry[0], wet[0], mix);
            *r = wet_dry_mix(dry[1], wet[1], mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        let mut needs_rebuild = false;
        for (index, value) in update.iter() {
            match index {
                0 => {
                    self.size = map::unit(value);
                    needs_rebuild = true;
                }
                1 => {
                    self.decay = map::unit(value);
                }
                2 => {
                    self.damping = map::unit(value);
                }
                3 => {
                    let ms = map::linear(value, 0.0, MAX_PREDELAY_MS);
                    self.predelay_samples
                        .set_target(ms_to_samples(ms, self.sample_rate));
                }
                4 => {
                    self.diffusion = map::unit(value);
                }
                5 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
        if needs_rebuild {
            self.rebuild();
        } else {
            self.apply_settings();
        }
    }

    fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
        for pd in &mut self.predelay {
            pd.clear();
        }
        self.predelay_samples.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rms(buf: &[f32]) -> f32 {
        libm::sqrtf(buf.iter().map(|x| x * x).sum::<f32>() / buf.len() as f32)
    }

    #[test]
    fn impulse_grows_a_decaying_tail() {
        let mut plate = PlateReverb::new(48000.0);
        plate.prepare(48000.0, 48000);
        plate.update_parameters(&ParamUpdate::new().with(1, 0.5).with(5, 0.3));

        let mut l = vec![0.0f32; 48000];
        l[0] = 1.0;
        let mut r = l.clone();
        plate.process(&mut l, &mut r);

        // Tail present at 1 s.
        let late = rms(&l[40000..48000]);
        assert!(late > 1e-4, "no tail: {late}");
        assert!(l.iter().all(|x| x.abs() <= 1.0), "overshoot");

        // And it decays over the following seconds.
        let mut decayed = 0.0;
        for _ in 0..4 {
            let mut sl = vec![0.0f32; 48000];
            let mut sr = vec![0.0f32; 48000];
            plate.process(&mut sl, &mut sr);
            decayed = rms(&sl[40000..48000]);
        }
        assert!(decayed < late * 0.5, "tail not decaying: {decayed} vs {late}");
    }

    #[test]
    fn tail_is_decorrelated_across_channels() {
        let mut plate = PlateReverb::new(48000.0);
        plate.prepare(48000.0, 48000);
        plate.update_parameters(&ParamUpdate::new().with(1, 0.7).with(5, 1.0));
        let mut l = vec![0.0f32; 48000];
        l[0] = 1.0;
        let mut r = l.clone();
        plate.process(&mut l, &mut r);
        let diff: f32 = l[10000..20000]
            .iter()
            .zip(r[10000..20000].iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        assert!(diff > 0.05, "channels identical: {diff}");
    }
}
