//! Shared STFT machinery for the spectral engines.
//!
//! Hann-windowed analysis/synthesis at 75 % overlap (hop = N/4), FFT size
//! 1024. With matching square-root windows on both sides the
//! overlap-add reconstructs unity. The processor hands each engine its
//! frequency-domain frame through a closure; everything around it —
//! buffering, windowing, OLA — lives here once.
//!
//! Latency is one FFT frame, which every spectral engine reports.

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

/// FFT frame size.
pub const FFT_SIZE: usize = 1024;

/// Hop size (75 % overlap).
pub const HOP: usize = FFT_SIZE / 4;

/// Streaming STFT processor for one audio channel.
pub struct Stft {
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    input_buf: Vec<f32>,
    input_fill: usize,
    output_buf: Vec<f32>,
    frame: Vec<Complex<f32>>,
}

impl Stft {
    /// Create a processor with its own FFT plans.
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let window = (0..FFT_SIZE)
            .map(|i| {
                let hann =
                    0.5 - 0.5 * libm::cosf(core::f32::consts::TAU * i as f32 / FFT_SIZE as f32);
                // Square-root Hann on both analysis and synthesis gives
                // unity overlap-add at 75 %.
                libm::sqrtf(hann)
            })
            .collect();
        Self {
            fft: planner.plan_fft_forward(FFT_SIZE),
            ifft: planner.plan_fft_inverse(FFT_SIZE),
            window,
            input_buf: vec![0.0; FFT_SIZE],
            input_fill: 0,
            output_buf: vec![0.0; FFT_SIZE + HOP],
            frame: vec![Complex::default(); FFT_SIZE],
        }
    }

    /// Push one sample, pull one sample. `transform` is invoked once per
    /// hop with the complex spectrum to mutate in place.
    #[inline]
    pub fn process(
        &mut self,
        input: f32,
        transform: &mut dyn FnMut(&mut [Complex<f32>]),
    ) -> f32 {
        self.input_buf[FFT_SIZE - HOP + self.input_fill] = input;
        let out = self.output_buf[self.input_fill];
        self.input_fill += 1;

        if self.input_fill == HOP {
            self.run_frame(transform);
            self.input_fill = 0;
        }
        out
    }

    fn run_frame(&mut self, transform: &mut dyn FnMut(&mut [Complex<f32>])) {
        // Analysis: window the current FFT_SIZE of history.
        for i in 0..FFT_SIZE {
            self.frame[i] = Complex::new(self.input_buf[i] * self.window[i], 0.0);
        }
        self.fft.process(&mut self.frame);

        transform(&mut self.frame);

        self.ifft.process(&mut self.frame);

        // Shift OLA buffer left by one hop and add the synthesis frame.
        self.output_buf.copy_within(HOP.., 0);
        let tail = self.output_buf.len() - HOP;
        self.output_buf[tail..].fill(0.0);
        // rustfft is unnormalized (×N round trip); the Hann product summed
        // at 75 % overlap contributes another ×2.
        let norm = 1.0 / (FFT_SIZE as f32 * 2.0);
        for i in 0..FFT_SIZE {
            self.output_buf[i] += self.frame[i].re * self.window[i] * norm;
        }

        // Slide the input history by one hop.
        self.input_buf.copy_within(HOP.., 0);
        let start = FFT_SIZE - HOP;
        self.input_buf[start..].fill(0.0);
    }

    /// Zero all buffers.
    pub fn reset(&mut self) {
        self.input_buf.fill(0.0);
        self.output_buf.fill(0.0);
        self.input_fill = 0;
    }

    /// Inherent latency in samples.
    pub fn latency() -> usize {
        FFT_SIZE
    }

    /// Bin centre frequency for `bin` at `sample_rate`.
    pub fn bin_hz(bin: usize, sample_rate: f32) -> f32 {
        bin as f32 * sample_rate / FFT_SIZE as f32
    }
}

impl Default for Stft {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_roughly_reconstructs() {
        let mut stft = Stft::new();
        let mut noop = |_frame: &mut [Complex<f32>]| {};
        let mut input = Vec::new();
        let mut output = Vec::new();
        for i in 0..FFT_SIZE * 8 {
            let x = libm::sinf(i as f32 * 0.05) * 0.5;
            input.push(x);
            output.push(stft.process(x, &mut noop));
        }
        // Compare with the FFT_SIZE-sample latency compensated.
        let mut err = 0.0f32;
        let mut count = 0;
        for i in FFT_SIZE * 3..FFT_SIZE * 7 {
            let expected = input[i - FFT_SIZE];
            err += (output[i] - expected).abs();
            count += 1;
        }
        let mean_err = err / count as f32;
        assert!(mean_err < 0.05, "reconstruction error {mean_err}");
    }

    #[test]
    fn latency_constant_matches() {
        assert_eq!(Stft::latency(), FFT_SIZE);
    }
}
