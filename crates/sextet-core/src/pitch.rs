//! Delay-line pitch shifter.
//!
//! Two read heads sweep a circular buffer at a rate offset from the write
//! rate; the rate ratio is the pitch ratio. Each head is faded in and out
//! with a raised-cosine window as it wraps, and the heads run half a buffer
//! apart, so one is always near full gain while the other crosses its
//! splice point. This is the classic "rotating tape head" shifter: no FFT,
//! a few milliseconds of inherent delay, transients kept intact.
//!
//! At a ratio of exactly 1.0 the heads stop sweeping, so instead of
//! parking the signal half a window back, the shifter hands over to a
//! short aligned tap (~2 ms) — transients stay aligned at the zero-shift
//! point. The hand-over is blended over a few milliseconds in each
//! direction so crossing 1.0 never clicks.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use core::f32::consts::PI;
use libm::cosf;

/// Delay of the aligned tap used at ratio 1.0, in milliseconds. Well
/// inside the ±5 ms transient-alignment tolerance of the catalogue.
const ALIGNED_TAP_MS: f32 = 2.0;

/// Ramp time between the aligned tap and the sweeping heads, in ms.
const BLEND_MS: f32 = 5.0;

/// Dual-head crossfaded delay-line pitch shifter.
///
/// `ratio` is the output/input pitch ratio: 2.0 = up an octave,
/// 0.5 = down an octave. Ratios are clamped to `[0.25, 4.0]`.
#[derive(Debug, Clone)]
pub struct GrainlessShifter {
    buffer: Vec<f32>,
    write_pos: usize,
    /// Head phase in samples, relative to the write head.
    head_phase: f32,
    ratio: f32,
    window: f32,
    /// Aligned-tap delay in samples.
    aligned_tap: f32,
    /// 0 = aligned tap, 1 = sweeping heads; ramps on ratio changes.
    head_blend: f32,
    blend_step: f32,
}

impl GrainlessShifter {
    /// Create with a sweep window of `window_ms` (typically 30–60 ms).
    pub fn new(sample_rate: f32, window_ms: f32) -> Self {
        let window = libm::ceilf(sample_rate * window_ms.max(5.0) * 0.001);
        Self {
            buffer: vec![0.0; window as usize + 4],
            write_pos: 0,
            head_phase: 0.0,
            ratio: 1.0,
            window,
            aligned_tap: ALIGNED_TAP_MS * 0.001 * sample_rate,
            head_blend: 0.0,
            blend_step: 1.0 / (BLEND_MS * 0.001 * sample_rate).max(1.0),
        }
    }

    /// Set the pitch ratio (1.0 = no shift).
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio.clamp(0.25, 4.0);
    }

    /// Set the shift in semitones.
    pub fn set_semitones(&mut self, semitones: f32) {
        self.set_ratio(libm::powf(2.0, semitones / 12.0));
    }

    /// Current pitch ratio.
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// True when the ratio sits on the zero-shift point.
    #[inline]
    fn is_unity(&self) -> bool {
        (self.ratio - 1.0).abs() < 1e-6
    }

    #[inline]
    fn read_at(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(0.0, (len - 2) as f32);
        let int = delay as usize;
        let frac = delay - int as f32;
        let last = (self.write_pos + len - 1) % len;
        let a = self.buffer[(last + 2 * len - int) % len];
        let b = self.buffer[(last + 2 * len - int - 1) % len];
        a + (b - a) * frac
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.buffer[self.write_pos] = crate::math::flush_denormal(input);
        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        // Hand over between the aligned tap and the sweeping heads.
        let target = if self.is_unity() { 0.0 } else { 1.0 };
        let delta = (target - self.head_blend).clamp(-self.blend_step, self.blend_step);
        self.head_blend += delta;

        let direct = self.read_at(self.aligned_tap);
        if self.head_blend <= 0.0 {
            return direct;
        }

        // Heads drift at (1 - ratio) samples per sample; wrap on the window.
        self.head_phase += 1.0 - self.ratio;
        self.head_phase = self.head_phase.rem_euclid(self.window);

        let d1 = self.head_phase;
        let d2 = (self.head_phase + self.window * 0.5).rem_euclid(self.window);

        // Raised-cosine gain peaks mid-window, zero at the splice points.
        let g1 = 0.5 - 0.5 * cosf(2.0 * PI * d1 / self.window);
        let g2 = 0.5 - 0.5 * cosf(2.0 * PI * d2 / self.window);
        let norm = (g1 + g2).max(1e-3);
        let heads = (self.read_at(d1) * g1 + self.read_at(d2) * g2) / norm;

        direct + (heads - direct) * self.head_blend
    }

    /// Zero the buffer and head positions.
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
        self.head_phase = 0.0;
        self.head_blend = if self.is_unity() { 0.0 } else { 1.0 };
    }

    /// Current latency in samples: the aligned tap at the zero-shift
    /// point, half the sweep window otherwise.
    pub fn latency(&self) -> usize {
        if self.is_unity() {
            self.aligned_tap as usize
        } else {
            (self.window * 0.5) as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;

    fn dominant_period(signal: &[f32]) -> f32 {
        // Count zero crossings (rising) to estimate the period.
        let mut crossings = 0;
        let mut first = None;
        let mut last = 0;
        for i in 1..signal.len() {
            if signal[i - 1] <= 0.0 && signal[i] > 0.0 {
                crossings += 1;
                if first.is_none() {
                    first = Some(i);
                }
                last = i;
            }
        }
        if crossings < 2 {
            return 0.0;
        }
        (last - first.unwrap()) as f32 / (crossings - 1) as f32
    }

    #[test]
    fn unity_ratio_passes_pitch_through() {
        let mut shifter = GrainlessShifter::new(48000.0, 40.0);
        let mut out = Vec::new();
        for i in 0..9600 {
            let x = libm::sinf(TAU * 440.0 * i as f32 / 48000.0);
            out.push(shifter.process(x));
        }
        let period = dominant_period(&out[4800..]);
        let expected = 48000.0 / 440.0;
        assert!(
            (period - expected).abs() / expected < 0.03,
            "period {period} vs {expected}"
        );
    }

    #[test]
    fn unity_ratio_keeps_transients_aligned() {
        // The zero-shift point must not park audio half a window back: an
        // impulse has to come out within ±5 ms of going in.
        let mut shifter = GrainlessShifter::new(48000.0, 45.0);
        let mut peak_pos = 0;
        let mut peak = 0.0f32;
        for i in 0..2400 {
            let x = if i == 0 { 1.0 } else { 0.0 };
            let y = shifter.process(x);
            if y.abs() > peak {
                peak = y.abs();
                peak_pos = i;
            }
        }
        assert!(peak > 0.5, "impulse lost: {peak}");
        let tolerance = (0.005 * 48000.0) as usize; // ±5 ms
        assert!(
            peak_pos <= tolerance,
            "impulse misaligned by {peak_pos} samples"
        );
        assert!(shifter.latency() <= tolerance);
    }

    #[test]
    fn hand_over_to_heads_is_click_free() {
        // Run a tone at unity, then jump the ratio; the blend must keep
        // every sample step bounded through the transition.
        let mut shifter = GrainlessShifter::new(48000.0, 40.0);
        let mut prev = 0.0f32;
        for i in 0..19200 {
            if i == 9600 {
                shifter.set_ratio(1.26); // up four semitones
            }
            let x = 0.5 * libm::sinf(TAU * 330.0 * i as f32 / 48000.0);
            let y = shifter.process(x);
            let step = (y - prev).abs();
            assert!(step < 0.3, "click of {step} at sample {i}");
            prev = y;
        }
    }

    #[test]
    fn octave_up_halves_period() {
        let mut shifter = GrainlessShifter::new(48000.0, 40.0);
        shifter.set_ratio(2.0);
        let mut out = Vec::new();
        for i in 0..19200 {
            let x = libm::sinf(TAU * 220.0 * i as f32 / 48000.0);
            out.push(shifter.process(x));
        }
        let period = dominant_period(&out[9600..]);
        let expected = 48000.0 / 440.0; // 220 Hz shifted up an octave
        assert!(
            (period - expected).abs() / expected < 0.1,
            "period {period} vs {expected}"
        );
    }

    #[test]
    fn semitone_helper_matches_ratio() {
        let mut shifter = GrainlessShifter::new(48000.0, 40.0);
        shifter.set_semitones(12.0);
        assert!((shifter.ratio() - 2.0).abs() < 1e-4);
        shifter.set_semitones(-12.0);
        assert!((shifter.ratio() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn output_stays_finite() {
        let mut shifter = GrainlessShifter::new(48000.0, 30.0);
        shifter.set_ratio(3.7);
        for i in 0..48000 {
            let y = shifter.process(libm::sinf(i as f32 * 0.2));
            assert!(y.is_finite());
            assert!(y.abs() < 2.0);
        }
    }
}
