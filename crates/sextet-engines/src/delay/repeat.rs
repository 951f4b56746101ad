//! Buffer Repeat — glitch capture-and-stutter.
//!
//! Continuously records into a loop buffer; when stutter is engaged, a
//! slice of the most recent audio replays in a loop, optionally reversed
//! or repitched. Stutter probability is deterministic per slice (a
//! counter-hashed gate) so the effect is reproducible after a reset.

use sextet_core::{Engine, ParamUpdate, SmoothedParam, map, scrub_stereo, wet_dry_mix};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["Size", "Stutter", "Pitch", "Reverse", "Mix"];

/// Maximum capture size in seconds.
const MAX_SIZE_SECS: f32 = 2.0;

/// Capture-and-repeat glitcher.
pub struct BufferRepeat {
    sample_rate: f32,
    buffers: [Vec<f32>; 2],
    write_pos: usize,
    /// Slice length in samples.
    slice_len: usize,
    /// Playback position within the current slice (fractional for pitch).
    play_pos: f32,
    /// Countdown of slices; each slice decides stutter on/off.
    slice_counter: usize,
    stutter_gate: bool,
    stutter_amount: f32,
    pitch_ratio: f32,
    reverse: bool,
    gate_hash: u32,
    mix: SmoothedParam,
}

impl BufferRepeat {
    /// Create with quarter-second slices, stutter off.
    pub fn new(sample_rate: f32) -> Self {
        let capacity = (sample_rate * MAX_SIZE_SECS) as usize;
        Self {
            sample_rate,
            buffers: [vec![0.0; capacity], vec![0.0; capacity]],
            write_pos: 0,
            slice_len: (sample_rate * 0.25) as usize,
            play_pos: 0.0,
            slice_counter: 0,
            stutter_gate: false,
            stutter_amount: 0.0,
            pitch_ratio: 1.0,
            reverse: false,
            gate_hash: 0x9e3779b9,
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }

    /// Decide whether the next slice stutters. Deterministic sequence.
    fn roll_gate(&mut self) {
        self.gate_hash = self
            .gate_hash
            .wrapping_mul(1664525)
            .wrapping_add(1013904223);
        let roll = (self.gate_hash >> 8) as f32 / (u32::MAX >> 8) as f32;
        self.stutter_gate = roll < self.stutter_amount;
        self.play_pos = 0.0;
    }
}

impl Engine for BufferRepeat {
    fn name(&self) -> &'static str {
        "Buffer Repeat"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let slice_secs = self.slice_len as f32 / self.sample_rate;
        self.sample_rate = sample_rate;
        let capacity = (sample_rate * MAX_SIZE_SECS) as usize;
        self.buffers = [vec![0.0; capacity], vec![0.0; capacity]];
        self.slice_len = ((slice_secs * sample_rate) as usize).max(64);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let capacity = self.buffers[0].len();
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.advance();
            let dry = [*l, *r];

            // Always record.
            self.buffers[0][self.write_pos] = dry[0];
            self.buffers[1][self.write_pos] = dry[1];
            self.write_pos = (self.write_pos + 1) % capacity;

            // Slice bookkeeping.
            if self.slice_counter == 0 {
                self.roll_gate();
                self.slice_counter = self.slice_len;
            }
            self.slice_counter -= 1;

            let mut wet = dry;
            if self.stutter_gate {
                // Replay the slice that ended where the gate opened.
                let offset = if self.reverse {
                    self.play_pos
                } else {
                    self.slice_len as f32 - self.play_pos
                };
                let base = (self.write_pos + capacity
                    - self.slice_counter
                    - self.slice_len) % capacity;
                let read = (base as f32 + offset).rem_euclid(capacity as f32);
                let idx = read as usize % capacity;
                let frac = read - libm::floorf(read);
                let next = (idx + 1) % capacity;
                for ch in 0..2 {
                    let a = self.buffers[ch][idx];
                    let b = self.buffers[ch][next];
                    wet[ch] = a + (b - a) * frac;
                }
                self.play_pos += self.pitch_ratio;
                if self.play_pos >= self.slice_len as f32 {
                    self.play_pos = 0.0;
                }
            }

            *l = wet_dry_mix(dry[0], wet[0], mix);
            *r = wet_dry_mix(dry[1], wet[1], mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => {
                    let secs = map::exponential(value, 0.02, MAX_SIZE_SECS * 0.5);
                    self.slice_len = ((secs * self.sample_rate) as usize).max(64);
                }
                1 => self.stutter_amount = map::unit(value),
                2 => {
                    // Half speed to double speed in octave steps.
                    self.pitch_ratio = [0.5, 1.0, 2.0][map::stepped(value, 3)];
                }
                3 => self.reverse = value >= 0.5,
                4 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for b in &mut self.buffers {
            b.fill(0.0);
        }
        self.write_pos = 0;
        self.play_pos = 0.0;
        self.slice_counter = 0;
        self.stutter_gate = false;
        self.gate_hash = 0x9e3779b9;
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_stutter_is_transparent() {
        let mut repeat = BufferRepeat::new(48000.0);
        repeat.prepare(48000.0, 512);
        repeat.update_parameters(&ParamUpdate::new().with(1, 0.0));
        let src: Vec<f32> = (0..512).map(|i| libm::sinf(i as f32 * 0.07)).collect();
        let mut l = src.clone();
        let mut r = src.clone();
        repeat.process(&mut l, &mut r);
        assert_eq!(l, src);
    }

    #[test]
    fn full_stutter_replays_old_audio() {
        let mut repeat = BufferRepeat::new(48000.0);
        repeat.prepare(48000.0, 48000);
        repeat.update_parameters(
            &ParamUpdate::new()
                .with(0, map::exponential_inv(0.05, 0.02, MAX_SIZE_SECS * 0.5))
                .with(1, 1.0)
                .with(4, 1.0),
        );
        // Feed a ramp, then silence; stuttered output must contain non-zero
        // audio during the silent region.
        let mut l: Vec<f32> = (0..48000)
            .map(|i| if i < 24000 { libm::sinf(i as f32 * 0.1) } else { 0.0 })
            .collect();
        let mut r = l.clone();
        repeat.process(&mut l, &mut r);
        let tail_energy: f32 = l[30000..40000].iter().map(|x| x * x).sum();
        assert!(tail_energy > 0.1, "stutter produced silence: {tail_energy}");
    }

    #[test]
    fn deterministic_after_reset() {
        let mut repeat = BufferRepeat::new(48000.0);
        repeat.prepare(48000.0, 4800);
        repeat.update_parameters(&ParamUpdate::new().with(1, 0.5).with(4, 1.0));
        let src: Vec<f32> = (0..4800).map(|i| libm::sinf(i as f32 * 0.03)).collect();

        let mut run = || -> Vec<f32> {
            repeat.reset();
            let mut l = src.clone();
            let mut r = src.clone();
            repeat.process(&mut l, &mut r);
            l
        };
        let a = run();
        let b = run();
        assert_eq!(a, b);
    }
}
