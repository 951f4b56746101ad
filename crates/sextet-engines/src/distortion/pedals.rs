//! The pedal board: three classic drive circuits.
//!
//! - [`MuffFuzz`] — four-stage fuzz with heavy sustain and a scooped
//!   tone control (the "big muff" topology).
//! - [`RodentDistortion`] — hard-clipping distortion with a post filter
//!   (the "rat" circuit: op-amp gain into diode clipping).
//! - [`KStyleOverdrive`] — soft-clipping overdrive with mid hump (the
//!   "tube screamer"/Klon family).
//!
//! All three run their clipper 2× oversampled, block DC at the output, and
//! guarantee `|out| <= 1` through a final soft limit.

use sextet_core::{
    DcBlocker, Engine, OnePole, Oversampler, ParamUpdate, SmoothedParam, map,
    math::{fast_tanh, hard_clip, soft_limit},
    scrub_stereo,
};

/// Shared output stage: DC block then guarantee the ceiling.
#[inline]
fn finish(dc: &mut DcBlocker, sample: f32, level: f32) -> f32 {
    soft_limit(dc.process(sample) * level, 1.0)
}

// ───────────────────────── Muff Fuzz ─────────────────────────

/// Parameter names for [`MuffFuzz`].
pub const MUFF_PARAMS: &[&str] = &["Sustain", "Tone", "Volume"];

/// Four-stage sustaining fuzz.
pub struct MuffFuzz {
    sustain: SmoothedParam,
    /// Tone: blend between lowpassed and highpassed clipping output.
    tone: f32,
    tone_lp: [OnePole; 2],
    tone_hp: [OnePole; 2],
    volume: SmoothedParam,
    oversamplers: [Oversampler; 2],
    dc: [DcBlocker; 2],
}

impl MuffFuzz {
    /// Create with moderate sustain.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sustain: SmoothedParam::standard(10.0, sample_rate),
            tone: 0.5,
            tone_lp: [OnePole::new(sample_rate, 1200.0), OnePole::new(sample_rate, 1200.0)],
            tone_hp: [OnePole::new(sample_rate, 1200.0), OnePole::new(sample_rate, 1200.0)],
            volume: SmoothedParam::standard(0.5, sample_rate),
            oversamplers: [Oversampler::new(2), Oversampler::new(2)],
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }
}

impl Engine for MuffFuzz {
    fn name(&self) -> &'static str {
        "Muff Fuzz"
    }

    fn parameter_count(&self) -> usize {
        MUFF_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        MUFF_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sustain.set_sample_rate(sample_rate);
        self.volume.set_sample_rate(sample_rate);
        for f in self.tone_lp.iter_mut().chain(self.tone_hp.iter_mut()) {
            f.set_sample_rate(sample_rate);
        }
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let sustain = self.sustain.advance();
            let volume = self.volume.advance();
            let samples = [*l, *r];
            let mut out = [0.0f32; 2];

            for ch in 0..2 {
                // Two cascaded clipping stages inside the oversampler: the
                // first compresses, the second fuzzes.
                let clipped = self.oversamplers[ch].process(samples[ch], |x| {
                    let stage1 = fast_tanh(x * sustain);
                    fast_tanh(stage1 * 3.0)
                });
                // Scooped tone: crossfade lowpass vs highpass around 1.2 kHz.
                let low = self.tone_lp[ch].process(clipped);
                let high = self.tone_hp[ch].process_highpass(clipped);
                let toned = low * (1.0 - self.tone) + high * self.tone;
                out[ch] = finish(&mut self.dc[ch], toned, volume * 2.0);
            }
            *l = out[0];
            *r = out[1];
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.sustain.set_target(map::db_gain(value, 6.0, 40.0)),
                1 => self.tone = map::unit(value),
                2 => self.volume.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for os in &mut self.oversamplers {
            os.reset();
        }
        for f in self.tone_lp.iter_mut().chain(self.tone_hp.iter_mut()) {
            f.reset();
        }
        for dc in &mut self.dc {
            dc.reset();
        }
        self.sustain.snap_to_target();
        self.volume.snap_to_target();
    }
}

// ───────────────────────── Rodent Distortion ─────────────────────────

/// Parameter names for [`RodentDistortion`].
pub const RODENT_PARAMS: &[&str] = &["Distortion", "Filter", "Volume"];

/// Hard-clipping distortion with a post lowpass.
pub struct RodentDistortion {
    gain: SmoothedParam,
    filter: [OnePole; 2],
    volume: SmoothedParam,
    oversamplers: [Oversampler; 2],
    dc: [DcBlocker; 2],
}

impl RodentDistortion {
    /// Create with moderate gain, filter open.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            gain: SmoothedParam::standard(10.0, sample_rate),
            filter: [OnePole::new(sample_rate, 8000.0), OnePole::new(sample_rate, 8000.0)],
            volume: SmoothedParam::standard(0.5, sample_rate),
            oversamplers: [Oversampler::new(2), Oversampler::new(2)],
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }
}

impl Engine for RodentDistortion {
    fn name(&self) -> &'static str {
        "Rodent Distortion"
    }

    fn parameter_count(&self) -> usize {
        RODENT_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        RODENT_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.gain.set_sample_rate(sample_rate);
        self.volume.set_sample_rate(sample_rate);
        for f in &mut self.filter {
            f.set_sample_rate(sample_rate);
        }
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let gain = self.gain.advance();
            let volume = self.volume.advance();
            let samples = [*l, *r];
            let mut out = [0.0f32; 2];

            for ch in 0..2 {
                // Op-amp gain into asymmetric diode clipping.
                let clipped = self.oversamplers[ch].process(samples[ch], |x| {
                    let driven = x * gain;
                    hard_clip(driven, 0.7) + 0.1 * fast_tanh(driven)
                });
                let filtered = self.filter[ch].process(clipped);
                out[ch] = finish(&mut self.dc[ch], filtered, volume * 1.5);
            }
            *l = out[0];
            *r = out[1];
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.gain.set_target(map::db_gain(value, 0.0, 40.0)),
                1 => {
                    // Filter knob closes the lowpass as it is turned up.
                    let hz = map::exponential(1.0 - value, 500.0, 12000.0);
                    for f in &mut self.filter {
                        f.set_frequency(hz);
                    }
                }
                2 => self.volume.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for os in &mut self.oversamplers {
            os.reset();
        }
        for f in &mut self.filter {
            f.reset();
        }
        for dc in &mut self.dc {
            dc.reset();
        }
        self.gain.snap_to_target();
        self.volume.snap_to_target();
    }
}

// ───────────────────────── K-Style Overdrive ─────────────────────────

/// Parameter names for [`KStyleOverdrive`].
pub const KSTYLE_PARAMS: &[&str] = &["Drive", "Tone", "Level"];

/// Soft-clipping overdrive with the classic mid hump.
pub struct KStyleOverdrive {
    drive: SmoothedParam,
    /// Input hump filter: highpass that creates the mid emphasis.
    hump: [OnePole; 2],
    tone: [OnePole; 2],
    level: SmoothedParam,
    oversamplers: [Oversampler; 2],
    dc: [DcBlocker; 2],
}

impl KStyleOverdrive {
    /// Create with light drive.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            drive: SmoothedParam::standard(4.0, sample_rate),
            hump: [OnePole::new(sample_rate, 720.0), OnePole::new(sample_rate, 720.0)],
            tone: [OnePole::new(sample_rate, 5000.0), OnePole::new(sample_rate, 5000.0)],
            level: SmoothedParam::standard(0.7, sample_rate),
            oversamplers: [Oversampler::new(2), Oversampler::new(2)],
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }
}

impl Engine for KStyleOverdrive {
    fn name(&self) -> &'static str {
        "K-Style Overdrive"
    }

    fn parameter_count(&self) -> usize {
        KSTYLE_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        KSTYLE_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.drive.set_sample_rate(sample_rate);
        self.level.set_sample_rate(sample_rate);
        for f in self.hump.iter_mut().chain(self.tone.iter_mut()) {
            f.set_sample_rate(sample_rate);
        }
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let drive = self.drive.advance();
            let level = self.level.advance();
            let samples = [*l, *r];
            let mut out = [0.0f32; 2];

            for ch in 0..2 {
                // The drive path only sees mids-and-up; lows mix back in
                // clean, which is the "transparent" K-circuit trick.
                let lows = self.hump[ch].process(samples[ch]);
                let highs = samples[ch] - lows;
                let driven = self.oversamplers[ch].process(highs, |x| fast_tanh(x * drive));
                let blended = lows + driven;
                let toned = self.tone[ch].process(blended);
                out[ch] = finish(&mut self.dc[ch], toned, level * 1.2);
            }
            *l = out[0];
            *r = out[1];
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.drive.set_target(map::db_gain(value, 0.0, 30.0)),
                1 => {
                    let hz = map::exponential(value, 1000.0, 10000.0);
                    for f in &mut self.tone {
                        f.set_frequency(hz);
                    }
                }
                2 => self.level.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for os in &mut self.oversamplers {
            os.reset();
        }
        for f in self.hump.iter_mut().chain(self.tone.iter_mut()) {
            f.reset();
        }
        for dc in &mut self.dc {
            dc.reset();
        }
        self.drive.snap_to_target();
        self.level.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;
    use sextet_core::Engine;

    fn thd_energy<E: Engine>(engine: &mut E) -> f32 {
        let freq = 1000.0;
        let sr = 48000.0;
        let mut residual = 0.0;
        let mut total = 0.0;
        for block in 0..30 {
            let reference: Vec<f32> = (0..512)
                .map(|i| libm::sinf(TAU * freq * (block * 512 + i) as f32 / sr))
                .collect();
            let mut l: Vec<f32> = reference.iter().map(|x| 0.5 * x).collect();
            let mut r = l.clone();
            engine.process(&mut l, &mut r);
            if block > 15 {
                let mut dot = 0.0;
                let mut norm = 0.0;
                for (y, x) in l.iter().zip(reference.iter()) {
                    dot += y * x;
                    norm += x * x;
                }
                let scale = dot / norm;
                for (y, x) in l.iter().zip(reference.iter()) {
                    let e = y - scale * x;
                    residual += e * e;
                    total += y * y;
                }
            }
        }
        residual / total.max(1e-9)
    }

    #[test]
    fn all_three_pedals_distort_and_stay_bounded() {
        let mut muff = MuffFuzz::new(48000.0);
        muff.prepare(48000.0, 512);
        muff.update_parameters(&ParamUpdate::new().with(0, 0.8));
        assert!(thd_energy(&mut muff) > 0.01);

        let mut rat = RodentDistortion::new(48000.0);
        rat.prepare(48000.0, 512);
        rat.update_parameters(&ParamUpdate::new().with(0, 0.8));
        assert!(thd_energy(&mut rat) > 0.01);

        let mut kstyle = KStyleOverdrive::new(48000.0);
        kstyle.prepare(48000.0, 512);
        kstyle.update_parameters(&ParamUpdate::new().with(0, 0.8));
        assert!(thd_energy(&mut kstyle) > 0.01);

        // Ceiling check at max everything, |input| = 1.
        for engine in [
            &mut muff as &mut dyn Engine,
            &mut rat as &mut dyn Engine,
            &mut kstyle as &mut dyn Engine,
        ] {
            let mut u = ParamUpdate::new();
            for i in 0..3 {
                u.set(i, 1.0);
            }
            engine.update_parameters(&u);
            for _ in 0..20 {
                let mut l: Vec<f32> = (0..512).map(|i| libm::sinf(i as f32 * 0.2)).collect();
                let mut r = l.clone();
                engine.process(&mut l, &mut r);
                for s in l.iter().chain(r.iter()) {
                    assert!(s.is_finite() && s.abs() <= 1.0 + 1e-4, "over ceiling: {s}");
                }
            }
        }
    }

    #[test]
    fn muff_kills_dc_offset() {
        let mut muff = MuffFuzz::new(48000.0);
        muff.prepare(48000.0, 512);
        muff.update_parameters(&ParamUpdate::new().with(0, 1.0));
        let mut mean = 1.0f32;
        for block in 0..100 {
            let mut l = vec![0.5f32; 512];
            let mut r = vec![0.5f32; 512];
            muff.process(&mut l, &mut r);
            if block > 50 {
                mean = l.iter().sum::<f32>() / l.len() as f32;
            }
        }
        assert!(mean.abs() < 0.01, "DC not blocked: {mean}");
    }
}
