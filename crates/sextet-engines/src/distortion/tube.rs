//! Vintage Tube Preamp — asymmetric triode-style saturation with tone stack.
//!
//! Two gain stages with bias-dependent asymmetry (even harmonics), a
//! three-band tone stack between them, and a presence shelf at the output.
//! The nonlinearity runs 2× oversampled; the DC blocker after the shaper is
//! not optional — bias shifts the operating point and the offset has to go.

use sextet_core::{
    Biquad, DcBlocker, Engine, Oversampler, ParamUpdate, SmoothedParam, biquad, map,
    math::fast_tanh, scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Drive",
    "Bias",
    "Bass",
    "Mid",
    "Treble",
    "Presence",
    "Output Gain",
    "Mix",
];

/// Triode-ish transfer: tanh with a bias-shifted operating point.
#[inline]
fn tube_shape(x: f32, bias: f32) -> f32 {
    fast_tanh(x + bias) - fast_tanh(bias)
}

/// Two-stage tube preamp.
pub struct VintageTubePreamp {
    sample_rate: f32,
    drive: SmoothedParam,
    bias: f32,
    bass: [Biquad; 2],
    mid: [Biquad; 2],
    treble: [Biquad; 2],
    presence: [Biquad; 2],
    bass_db: f32,
    mid_db: f32,
    treble_db: f32,
    presence_db: f32,
    oversamplers: [Oversampler; 2],
    output: SmoothedParam,
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl VintageTubePreamp {
    /// Create with mild drive and a flat tone stack.
    pub fn new(sample_rate: f32) -> Self {
        let mut amp = Self {
            sample_rate,
            drive: SmoothedParam::standard(1.0, sample_rate),
            bias: 0.1,
            bass: [Biquad::new(), Biquad::new()],
            mid: [Biquad::new(), Biquad::new()],
            treble: [Biquad::new(), Biquad::new()],
            presence: [Biquad::new(), Biquad::new()],
            bass_db: 0.0,
            mid_db: 0.0,
            treble_db: 0.0,
            presence_db: 0.0,
            oversamplers: [Oversampler::new(2), Oversampler::new(2)],
            output: SmoothedParam::standard(1.0, sample_rate),
            mix: SmoothedParam::fast(1.0, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        };
        amp.retune();
        amp
    }

    fn retune(&mut self) {
        let bass = biquad::low_shelf(150.0, self.bass_db, self.sample_rate);
        let mid = biquad::peaking(800.0, 0.8, self.mid_db, self.sample_rate);
        let treble = biquad::high_shelf(3000.0, self.treble_db, self.sample_rate);
        let presence = biquad::high_shelf(6000.0, self.presence_db, self.sample_rate);
        for ch in 0..2 {
            self.bass[ch].set_coefficients(bass);
            self.mid[ch].set_coefficients(mid);
            self.treble[ch].set_coefficients(treble);
            self.presence[ch].set_coefficients(presence);
        }
    }
}

impl Engine for VintageTubePreamp {
    fn name(&self) -> &'static str {
        "Vintage Tube Preamp"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.drive.set_sample_rate(sample_rate);
        self.output.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.retune();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let drive = self.drive.advance();
            let bias = self.bias;
            let mix = self.mix.advance();
            let out_gain = self.output.advance();
            let dry = [*l, *r];
            let mut wet = [0.0f32; 2];

            for ch in 0..2 {
                // Stage 1: driven triode, oversampled.
                let mut s = self.oversamplers[ch]
                    .process(dry[ch] * drive, |x| tube_shape(x, bias));
                // Tone stack between stages.
                s = self.bass[ch].process(s);
                s = self.mid[ch].process(s);
                s = self.treble[ch].process(s);
                // Stage 2: light squash, fixed gain.
                s = tube_shape(s * 1.5, bias * 0.5);
                s = self.presence[ch].process(s);
                wet[ch] = self.dc[ch].process(s);
            }

            *l = wet_dry_mix(dry[0], wet[0], mix) * out_gain;
            *r = wet_dry_mix(dry[1], wet[1], mix) * out_gain;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.drive.set_target(map::db_gain(value, 0.0, 36.0)),
                1 => self.bias = map::linear(value, 0.0, 0.6),
                2 => {
                    self.bass_db = map::linear(value, -12.0, 12.0);
                    self.retune();
                }
                3 => {
                    self.mid_db = map::linear(value, -12.0, 12.0);
                    self.retune();
                }
                4 => {
                    self.treble_db = map::linear(value, -12.0, 12.0);
                    self.retune();
                }
                5 => {
                    self.presence_db = map::linear(value, 0.0, 9.0);
                    self.retune();
                }
                6 => self.output.set_target(map::db_gain(value, -24.0, 12.0)),
                7 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for ch in 0..2 {
            self.bass[ch].clear();
            self.mid[ch].clear();
            self.treble[ch].clear();
            self.presence[ch].clear();
            self.oversamplers[ch].reset();
            self.dc[ch].reset();
        }
        self.drive.snap_to_target();
        self.output.snap_to_target();
        self.mix.snap_to_target();
    }
}
