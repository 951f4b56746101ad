//! Convolution Reverb — partitioned FFT convolution over synthesized IRs.
//!
//! The impulse responses are synthesized at prepare time (velvet-noise
//! bursts with exponential decay and a frequency-dependent tilt), one
//! flavour per IR-type step: room, chamber, hall, cathedral. The
//! convolution is uniformly partitioned: the IR is cut into FFT-sized
//! blocks, input spectra are kept in a ring, and each output block is the
//! multiply-accumulate of the two — O(N log N) per block regardless of
//! tail length.
//!
//! Realtime discipline: `prepare` (control thread) synthesizes the IR at
//! its longest decay and allocates everything. `update_parameters` stays
//! allocation-free — Size rescales per-partition gains (an exponential
//! window over the existing spectra), Damping retunes a post filter, and
//! an IR-type change latches for the next `prepare`, which is when the
//! control surface installs engines anyway.
//!
//! The engine buffers input to its internal partition size, so it reports
//! one partition of latency.

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use sextet_core::{Engine, OnePole, ParamUpdate, SmoothedParam, map, scrub_stereo, wet_dry_mix};
use std::sync::Arc;

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &["IR Type", "Size", "Predelay", "Damping", "Mix"];

/// Partition (hop) size in samples; FFT size is twice this.
const PARTITION: usize = 512;
const FFT_SIZE: usize = 2 * PARTITION;

/// IR flavours: (base RT60 seconds, spectral tilt).
const IR_TYPES: [(f32, f32); 4] = [
    (0.4, 0.9),  // room
    (0.9, 0.7),  // chamber
    (1.8, 0.5),  // hall
    (3.2, 0.35), // cathedral
];

/// Longest IR ever synthesized, bounding memory and prepare cost.
const MAX_RT60: f32 = 4.0;

/// Deterministic velvet-noise IR synthesis.
fn synthesize_ir(sample_rate: f32, rt60: f32, tilt: f32, seed: u32) -> Vec<f32> {
    let length = ((rt60 * 1.2) * sample_rate) as usize;
    let mut ir = vec![0.0f32; length.max(PARTITION)];
    let mut state = seed;
    let mut lp = 0.0f32;
    // Velvet noise: sparse ±1 pulses through a decaying envelope.
    let mut next_pulse = 1usize;
    while next_pulse < ir.len() {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let sign = if state & 1 == 0 { 1.0 } else { -1.0 };
        let t = next_pulse as f32 / sample_rate;
        let env = libm::expf(-6.908 * t / rt60); // -60 dB at rt60
        // One-pole tilt darkens the tail more than the onset.
        lp = lp + (sign * env - lp) * (1.0 - tilt * t / rt60).clamp(0.05, 1.0);
        ir[next_pulse] = lp;
        let gap = 8 + (state >> 28) as usize;
        next_pulse += gap;
    }
    ir[0] = 0.8; // direct-ish onset
    ir
}

/// Frequency-domain IR partitions plus input-spectrum ring for one channel.
struct ConvolutionChannel {
    ir_spectra: Vec<Vec<Complex<f32>>>,
    input_ring: Vec<Vec<Complex<f32>>>,
    ring_pos: usize,
    input_accum: Vec<f32>,
    input_fill: usize,
    overlap: Vec<f32>,
    output_buf: Vec<f32>,
    /// Preallocated MAC scratch.
    acc: Vec<Complex<f32>>,
    damping: OnePole,
}

impl ConvolutionChannel {
    fn new(sample_rate: f32) -> Self {
        Self {
            ir_spectra: Vec::new(),
            input_ring: vec![vec![Complex::default(); FFT_SIZE]],
            ring_pos: 0,
            input_accum: vec![0.0; PARTITION],
            input_fill: 0,
            overlap: vec![0.0; PARTITION],
            output_buf: vec![0.0; PARTITION],
            acc: vec![Complex::default(); FFT_SIZE],
            damping: OnePole::new(sample_rate, 8000.0),
        }
    }

    fn load_ir(&mut self, ir: &[f32], fft: &Arc<dyn Fft<f32>>) {
        self.ir_spectra.clear();
        for chunk in ir.chunks(PARTITION) {
            let mut block = vec![Complex::default(); FFT_SIZE];
            for (i, &s) in chunk.iter().enumerate() {
                block[i] = Complex::new(s, 0.0);
            }
            fft.process(&mut block);
            self.ir_spectra.push(block);
        }
        self.input_ring =
            vec![vec![Complex::default(); FFT_SIZE]; self.ir_spectra.len().max(1)];
        self.ring_pos = 0;
    }

    /// Convolve one full partition of input, producing one partition out.
    fn run_partition(
        &mut self,
        fft: &Arc<dyn Fft<f32>>,
        ifft: &Arc<dyn Fft<f32>>,
        partition_gains: &[f32],
    ) {
        // FFT the newest input partition (zero-padded to 2x).
        let mut spectrum = std::mem::replace(
            &mut self.input_ring[self.ring_pos],
            Vec::new(),
        );
        spectrum.fill(Complex::default());
        for (i, &s) in self.input_accum.iter().enumerate() {
            spectrum[i] = Complex::new(s, 0.0);
        }
        fft.process(&mut spectrum);
        self.input_ring[self.ring_pos] = spectrum;

        // Multiply-accumulate across partitions, each weighted by the
        // size-derived decay window.
        self.acc.fill(Complex::default());
        for (k, ir_block) in self.ir_spectra.iter().enumerate() {
            let gain = partition_gains.get(k).copied().unwrap_or(0.0);
            if gain < 1e-6 {
                continue;
            }
            let ring_index =
                (self.ring_pos + self.input_ring.len() - k) % self.input_ring.len();
            let input_block = &self.input_ring[ring_index];
            for i in 0..FFT_SIZE {
                self.acc[i] += input_block[i] * ir_block[i] * gain;
            }
        }
        ifft.process(&mut self.acc);

        // Overlap-add with the tail of the previous block.
        let norm = 1.0 / FFT_SIZE as f32;
        for i in 0..PARTITION {
            self.output_buf[i] = self.acc[i].re * norm + self.overlap[i];
            self.overlap[i] = self.acc[i + PARTITION].re * norm;
        }

        self.ring_pos = (self.ring_pos + 1) % self.input_ring.len();
        self.input_fill = 0;
    }

    fn clear(&mut self) {
        for block in &mut self.input_ring {
            block.fill(Complex::default());
        }
        self.input_accum.fill(0.0);
        self.overlap.fill(0.0);
        self.output_buf.fill(0.0);
        self.input_fill = 0;
        self.ring_pos = 0;
        self.damping.reset();
    }
}

/// Partitioned-convolution reverb.
pub struct ConvolutionReverb {
    sample_rate: f32,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    channels: [ConvolutionChannel; 2],
    /// IR flavour; latches at the next `prepare`.
    ir_type: usize,
    /// Flavour currently loaded in the spectra.
    loaded_ir_type: usize,
    size: f32,
    /// Per-partition gains realising the size control. Preallocated to the
    /// loaded IR's partition count.
    partition_gains: Vec<f32>,
    predelay_buf: [Vec<f32>; 2],
    predelay_pos: usize,
    predelay_samples: usize,
    mix: SmoothedParam,
}

impl ConvolutionReverb {
    /// Create with the "chamber" IR loaded.
    pub fn new(sample_rate: f32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let ifft = planner.plan_fft_inverse(FFT_SIZE);
        let mut reverb = Self {
            sample_rate,
            fft,
            ifft,
            channels: [
                ConvolutionChannel::new(sample_rate),
                ConvolutionChannel::new(sample_rate),
            ],
            ir_type: 1,
            loaded_ir_type: 1,
            size: 0.5,
            partition_gains: Vec::new(),
            predelay_buf: [vec![0.0; 9600], vec![0.0; 9600]],
            predelay_pos: 0,
            predelay_samples: 0,
            mix: SmoothedParam::fast(0.3, sample_rate),
        };
        reverb.rebuild_ir();
        reverb
    }

    /// Synthesize and load the IR bank for the latched type. Allocates;
    /// control-thread only (`new` / `prepare`).
    fn rebuild_ir(&mut self) {
        let (base_rt60, tilt) = IR_TYPES[self.ir_type];
        let built_rt60 = (base_rt60 * 2.0).min(MAX_RT60);
        for (ch, seed) in [(0usize, 0x1234_5678u32), (1, 0x8765_4321)] {
            let ir = synthesize_ir(self.sample_rate, built_rt60, tilt, seed);
            self.channels[ch].load_ir(&ir, &self.fft);
        }
        self.loaded_ir_type = self.ir_type;
        self.partition_gains = vec![1.0; self.channels[0].ir_spectra.len()];
        self.apply_size();
    }

    /// Reweight partitions for the current size. Allocation-free.
    fn apply_size(&mut self) {
        let (base_rt60, _) = IR_TYPES[self.loaded_ir_type];
        let built_rt60 = (base_rt60 * 2.0).min(MAX_RT60);
        let target_rt60 = (base_rt60 * (0.5 + 1.5 * self.size)).clamp(0.1, MAX_RT60);
        // The IR already decays at built_rt60; each partition gets the
        // extra attenuation that turns it into target_rt60.
        let extra = 6.908 * (1.0 / target_rt60 - 1.0 / built_rt60).max(0.0);
        for (k, gain) in self.partition_gains.iter_mut().enumerate() {
            let t = (k * PARTITION) as f32 / self.sample_rate;
            *gain = libm::expf(-extra * t);
        }
    }
}

impl Engine for ConvolutionReverb {
    fn name(&self) -> &'static str {
        "Convolution Reverb"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.predelay_buf = [
            vec![0.0; (sample_rate * 0.2) as usize + 1],
            vec![0.0; (sample_rate * 0.2) as usize + 1],
        ];
        for ch in &mut self.channels {
            ch.damping.set_sample_rate(sample_rate);
        }
        self.mix.set_sample_rate(sample_rate);
        self.rebuild_ir();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let pd_len = self.predelay_buf[0].len();
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mix = self.mix.advance();
            let dry = [*l, *r];
            let mut wet = [0.0f32; 2];

            for ch in 0..2 {
                // Predelay on the way into the convolver.
                self.predelay_buf[ch][self.predelay_pos] = dry[ch];
                let read =
                    (self.predelay_pos + pd_len - self.predelay_samples.min(pd_len - 1)) % pd_len;
                let delayed = self.predelay_buf[ch][read];

                // The output buffer holds the partition convolved from the
                // previous input partition; consume it in lockstep with the
                // fill position.
                let channel = &mut self.channels[ch];
                let fill = channel.input_fill;
                wet[ch] = channel.damping.process(channel.output_buf[fill]);
                channel.input_accum[fill] = delayed;
                channel.input_fill += 1;
                if channel.input_fill == PARTITION {
                    channel.run_partition(&self.fft, &self.ifft, &self.partition_gains);
                }
            }
            self.predelay_pos = (self.predelay_pos + 1) % pd_len;

            *l = wet_dry_mix(dry[0], wet[0] * 0.6, mix);
            *r = wet_dry_mix(dry[1], wet[1] * 0.6, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                // The IR bank is synthesized off the audio path, so a
                // flavour change latches for the next prepare (presets
                // install engines through exactly that path).
                0 => self.ir_type = map::stepped(value, IR_TYPES.len()),
                1 => {
                    self.size = map::unit(value);
                    self.apply_size();
                }
                2 => {
                    self.predelay_samples =
                        (map::linear(value, 0.0, 150.0) * 0.001 * self.sample_rate) as usize;
                }
                3 => {
                    let hz = map::exponential(1.0 - value, 1500.0, 14000.0);
                    for ch in &mut self.channels {
                        ch.damping.set_frequency(hz);
                    }
                }
                4 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.clear();
        }
        for b in &mut self.predelay_buf {
            b.fill(0.0);
        }
        self.predelay_pos = 0;
        self.mix.snap_to_target();
    }

    fn reported_latency(&self) -> usize {
        PARTITION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_shapes_the_tail() {
        let tail_energy = |size: f32| -> f32 {
            let mut reverb = ConvolutionReverb::new(48000.0);
            reverb.prepare(48000.0, 48000);
            reverb.update_parameters(&ParamUpdate::new().with(1, size).with(4, 1.0));
            let mut l = vec![0.0f32; 48000];
            l[0] = 1.0;
            let mut r = l.clone();
            reverb.process(&mut l, &mut r);
            l[24000..].iter().map(|x| x * x).sum()
        };
        let small = tail_energy(0.0);
        let large = tail_energy(1.0);
        assert!(large > small, "large room should outlast small: {large} vs {small}");
    }

    #[test]
    fn ir_type_latches_at_prepare() {
        let tail_energy = |ir_type: f32| -> f32 {
            let mut reverb = ConvolutionReverb::new(48000.0);
            reverb.update_parameters(&ParamUpdate::new().with(0, ir_type).with(4, 1.0));
            // The flavour takes effect here.
            reverb.prepare(48000.0, 48000);
            reverb.update_parameters(&ParamUpdate::new().with(4, 1.0));
            let mut l = vec![0.0f32; 48000];
            l[0] = 1.0;
            let mut r = l.clone();
            reverb.process(&mut l, &mut r);
            l[24000..].iter().map(|x| x * x).sum()
        };
        let room = tail_energy(0.0);
        let cathedral = tail_energy(1.0);
        assert!(
            cathedral > room,
            "cathedral should outlast room: {cathedral} vs {room}"
        );
    }

    #[test]
    fn latency_is_one_partition() {
        let reverb = ConvolutionReverb::new(48000.0);
        assert_eq!(reverb.reported_latency(), PARTITION);
    }

    #[test]
    fn output_finite_with_noise_input() {
        let mut reverb = ConvolutionReverb::new(48000.0);
        reverb.prepare(48000.0, 512);
        let mut u = ParamUpdate::new();
        for i in 0..PARAMS.len() {
            u.set(i, 1.0);
        }
        reverb.update_parameters(&u);
        let mut state = 1u32;
        for _ in 0..60 {
            let mut l: Vec<f32> = (0..512)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    (state as f32 / u32::MAX as f32) * 2.0 - 1.0
                })
                .collect();
            let mut r = l.clone();
            reverb.process(&mut l, &mut r);
            assert!(l.iter().all(|x| x.is_finite() && x.abs() < 4.0));
        }
    }
}
