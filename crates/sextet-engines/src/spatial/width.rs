//! Stereo-field engines built on mid/side math.
//!
//! - [`StereoWidener`] (4 params) — one width knob with bass protection
//!   and an optional Haas delay. Width 0.5 is the neutral point: the
//!   engine is bit-transparent there with the other controls at rest.
//! - [`StereoImager`] (6 params) — three-band width over LR4 crossovers.
//! - [`DimensionExpander`] (4 params) — chorus-derived spatialiser: short
//!   modulated delays mixed in antiphase between the channels.

use sextet_core::{
    Biquad, Engine, InterpolatedDelay, Interpolation, Lfo, OnePole, ParamUpdate, SmoothedParam,
    biquad, map, math::ms_to_samples, scrub_stereo, wet_dry_mix,
};

// ───────────────────────── Stereo Widener ─────────────────────────

/// Parameter names for [`StereoWidener`].
pub const WIDENER_PARAMS: &[&str] = &["Width", "Bass Mono", "Haas Delay", "Mix"];

/// Single-knob M/S widener.
pub struct StereoWidener {
    sample_rate: f32,
    width: SmoothedParam,
    /// Below this frequency the side signal is rolled off; 0 disables.
    bass_mono_freq: f32,
    side_highpass: OnePole,
    haas: InterpolatedDelay,
    haas_ms: SmoothedParam,
    mix: SmoothedParam,
}

impl StereoWidener {
    /// Create at the neutral point.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            width: SmoothedParam::standard(1.0, sample_rate),
            bass_mono_freq: 0.0,
            side_highpass: OnePole::new(sample_rate, 120.0),
            haas: InterpolatedDelay::from_time(sample_rate, 0.03),
            haas_ms: SmoothedParam::fast(0.0, sample_rate),
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }

    /// True when every control sits at its transparent position.
    fn is_neutral(&self) -> bool {
        (self.width.target() - 1.0).abs() < f32::EPSILON
            && self.width.is_settled()
            && self.bass_mono_freq == 0.0
            && self.haas_ms.target() == 0.0
            && self.haas_ms.is_settled()
    }
}

impl Engine for StereoWidener {
    fn name(&self) -> &'static str {
        "Stereo Widener"
    }

    fn parameter_count(&self) -> usize {
        WIDENER_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        WIDENER_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.width.set_sample_rate(sample_rate);
        self.side_highpass.set_sample_rate(sample_rate);
        self.haas = InterpolatedDelay::from_time(sample_rate, 0.03);
        self.haas_ms.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        // The neutral point must be bit-transparent, so skip the math
        // entirely rather than trusting it to cancel.
        if self.is_neutral() {
            return;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let width = self.width.advance();
            let haas_ms = self.haas_ms.advance();
            let mix = self.mix.advance();
            let dry_l = *l;
            let dry_r = *r;

            let mid = (dry_l + dry_r) * 0.5;
            let mut side = (dry_l - dry_r) * 0.5;

            // Bass protection: remove low content from the side channel so
            // widening never unbalances the low end.
            if self.bass_mono_freq > 0.0 {
                side = self.side_highpass.process_highpass(side);
            }
            side *= width;

            let mut wet_l = mid + side;
            let mut wet_r = mid - side;

            if haas_ms > 0.01 {
                let delayed = self
                    .haas
                    .read_write(wet_r, ms_to_samples(haas_ms, self.sample_rate));
                wet_r = delayed;
            } else {
                self.haas.write(wet_r);
            }

            *l = wet_dry_mix(dry_l, wet_l, mix);
            *r = wet_dry_mix(dry_r, wet_r, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                // 0.5 normalized = unity width; the ends are mono and 2x.
                0 => self.width.set_target(map::unit(value) * 2.0),
                1 => {
                    self.bass_mono_freq = if value < 0.01 {
                        0.0
                    } else {
                        map::exponential(value, 40.0, 400.0)
                    };
                    if self.bass_mono_freq > 0.0 {
                        self.side_highpass.set_frequency(self.bass_mono_freq);
                    }
                }
                2 => self.haas_ms.set_target(map::linear(value, 0.0, 25.0)),
                3 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.side_highpass.reset();
        self.haas.clear();
        self.width.snap_to_target();
        self.haas_ms.snap_to_target();
        self.mix.snap_to_target();
    }
}

// ───────────────────────── Stereo Imager ─────────────────────────

/// Parameter names for [`StereoImager`].
pub const IMAGER_PARAMS: &[&str] = &[
    "Low Width",
    "Mid Width",
    "High Width",
    "Crossover Low",
    "Crossover High",
    "Output Trim",
];

const BUTTERWORTH_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;

/// Per-channel three-way LR4 splitter.
struct Splitter {
    low_lp: [Biquad; 2],
    low_hp: [Biquad; 2],
    high_lp: [Biquad; 2],
    high_hp: [Biquad; 2],
}

impl Splitter {
    fn new() -> Self {
        Self {
            low_lp: [Biquad::new(), Biquad::new()],
            low_hp: [Biquad::new(), Biquad::new()],
            high_lp: [Biquad::new(), Biquad::new()],
            high_hp: [Biquad::new(), Biquad::new()],
        }
    }

    fn tune(&mut self, low: f32, high: f32, sample_rate: f32) {
        let ll = biquad::lowpass(low, BUTTERWORTH_Q, sample_rate);
        let lh = biquad::highpass(low, BUTTERWORTH_Q, sample_rate);
        let hl = biquad::lowpass(high, BUTTERWORTH_Q, sample_rate);
        let hh = biquad::highpass(high, BUTTERWORTH_Q, sample_rate);
        for i in 0..2 {
            self.low_lp[i].set_coefficients(ll);
            self.low_hp[i].set_coefficients(lh);
            self.high_lp[i].set_coefficients(hl);
            self.high_hp[i].set_coefficients(hh);
        }
    }

    #[inline]
    fn split(&mut self, x: f32) -> (f32, f32, f32) {
        let low_stage0 = self.low_lp[0].process(x);
        let low = self.low_lp[1].process(low_stage0);
        let rest_stage0 = self.low_hp[0].process(x);
        let rest = self.low_hp[1].process(rest_stage0);
        let mid_stage0 = self.high_lp[0].process(rest);
        let mid = self.high_lp[1].process(mid_stage0);
        let high_stage0 = self.high_hp[0].process(rest);
        let high = self.high_hp[1].process(high_stage0);
        (low, mid, high)
    }

    fn clear(&mut self) {
        for bq in self
            .low_lp
            .iter_mut()
            .chain(self.low_hp.iter_mut())
            .chain(self.high_lp.iter_mut())
            .chain(self.high_hp.iter_mut())
        {
            bq.clear();
        }
    }
}

/// Three-band width control.
pub struct StereoImager {
    sample_rate: f32,
    splitters: [Splitter; 2],
    widths: [SmoothedParam; 3],
    low_freq: f32,
    high_freq: f32,
    trim: SmoothedParam,
}

impl StereoImager {
    /// Create with all bands at unity width.
    pub fn new(sample_rate: f32) -> Self {
        let mut imager = Self {
            sample_rate,
            splitters: [Splitter::new(), Splitter::new()],
            widths: core::array::from_fn(|_| SmoothedParam::standard(1.0, sample_rate)),
            low_freq: 250.0,
            high_freq: 4000.0,
            trim: SmoothedParam::standard(1.0, sample_rate),
        };
        imager.retune();
        imager
    }

    fn retune(&mut self) {
        for s in &mut self.splitters {
            s.tune(self.low_freq, self.high_freq, self.sample_rate);
        }
    }
}

impl Engine for StereoImager {
    fn name(&self) -> &'static str {
        "Stereo Imager"
    }

    fn parameter_count(&self) -> usize {
        IMAGER_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        IMAGER_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        for w in &mut self.widths {
            w.set_sample_rate(sample_rate);
        }
        self.trim.set_sample_rate(sample_rate);
        self.retune();
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let widths = [
                self.widths[0].advance(),
                self.widths[1].advance(),
                self.widths[2].advance(),
            ];
            let trim = self.trim.advance();

            let (l_low, l_mid, l_high) = self.splitters[0].split(*l);
            let (r_low, r_mid, r_high) = self.splitters[1].split(*r);

            let mut out_l = 0.0;
            let mut out_r = 0.0;
            for (band, width) in [(l_low, r_low), (l_mid, r_mid), (l_high, r_high)]
                .into_iter()
                .zip(widths)
            {
                let mid = (band.0 + band.1) * 0.5;
                let side = (band.0 - band.1) * 0.5 * width;
                out_l += mid + side;
                out_r += mid - side;
            }

            *l = out_l * trim;
            *r = out_r * trim;
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0..=2 => self.widths[index].set_target(map::unit(value) * 2.0),
                3 => {
                    self.low_freq = map::exponential(value, 80.0, 600.0);
                    self.retune();
                }
                4 => {
                    self.high_freq = map::exponential(value, 1500.0, 10000.0);
                    self.retune();
                }
                5 => self.trim.set_target(map::db_gain(value, -12.0, 12.0)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for s in &mut self.splitters {
            s.clear();
        }
        for w in &mut self.widths {
            w.snap_to_target();
        }
        self.trim.snap_to_target();
    }
}

// ───────────────────────── Dimension Expander ─────────────────────────

/// Parameter names for [`DimensionExpander`].
pub const DIMENSION_PARAMS: &[&str] = &["Amount", "Size", "Brightness", "Mix"];

/// Chorus-based spatialiser.
pub struct DimensionExpander {
    sample_rate: f32,
    delays: [InterpolatedDelay; 2],
    lfos: [Lfo; 2],
    tone: [OnePole; 2],
    amount: SmoothedParam,
    size_ms: f32,
    mix: SmoothedParam,
}

impl DimensionExpander {
    /// Create with a subtle setting.
    pub fn new(sample_rate: f32) -> Self {
        let make_delay = || {
            let mut d = InterpolatedDelay::from_time(sample_rate, 0.05);
            d.set_interpolation(Interpolation::Cubic);
            d
        };
        let mut lfos = [Lfo::new(sample_rate, 0.25), Lfo::new(sample_rate, 0.25)];
        lfos[1].set_phase(0.5);
        Self {
            sample_rate,
            delays: [make_delay(), make_delay()],
            lfos,
            tone: [
                OnePole::new(sample_rate, 8000.0),
                OnePole::new(sample_rate, 8000.0),
            ],
            amount: SmoothedParam::standard(0.5, sample_rate),
            size_ms: 12.0,
            mix: SmoothedParam::fast(0.5, sample_rate),
        }
    }
}

impl Engine for DimensionExpander {
    fn name(&self) -> &'static str {
        "Dimension Expander"
    }

    fn parameter_count(&self) -> usize {
        DIMENSION_PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        DIMENSION_PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        self.sample_rate = sample_rate;
        let make_delay = || {
            let mut d = InterpolatedDelay::from_time(sample_rate, 0.05);
            d.set_interpolation(Interpolation::Cubic);
            d
        };
        self.delays = [make_delay(), make_delay()];
        for lfo in &mut self.lfos {
            lfo.set_sample_rate(sample_rate);
        }
        for t in &mut self.tone {
            t.set_sample_rate(sample_rate);
        }
        self.amount.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let amount = self.amount.advance();
            let mix = self.mix.advance();
            let dry = [*l, *r];

            let base = ms_to_samples(self.size_ms, self.sample_rate);
            let sweep_l = base * (1.0 + self.lfos[0].next() * 0.3);
            let sweep_r = base * (1.0 + self.lfos[1].next() * 0.3);

            let tap_l = self.tone[0].process(self.delays[0].read_write(dry[0], sweep_l.max(1.0)));
            let tap_r = self.tone[1].process(self.delays[1].read_write(dry[1], sweep_r.max(1.0)));

            // The dimension trick: each side receives its own delayed copy
            // positive and the opposite side negative, widening without an
            // obvious echo.
            let wet_l = dry[0] + (tap_l - tap_r * 0.7) * amount;
            let wet_r = dry[1] + (tap_r - tap_l * 0.7) * amount;

            *l = wet_dry_mix(dry[0], wet_l, mix);
            *r = wet_dry_mix(dry[1], wet_r, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.amount.set_target(map::unit(value)),
                1 => self.size_ms = map::linear(value, 4.0, 40.0),
                2 => {
                    let hz = map::exponential(value, 2000.0, 16000.0);
                    for t in &mut self.tone {
                        t.set_frequency(hz);
                    }
                }
                3 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        for d in &mut self.delays {
            d.clear();
        }
        for t in &mut self.tone {
            t.reset();
        }
        self.lfos[0].reset();
        self.lfos[1].reset();
        self.lfos[1].set_phase(0.5);
        self.amount.snap_to_target();
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widener_neutral_is_bit_identical() {
        let mut widener = StereoWidener::new(48000.0);
        widener.prepare(48000.0, 256);
        widener.update_parameters(&ParamUpdate::new().with(0, 0.5)); // unity width
        let src_l: Vec<f32> = (0..256).map(|i| libm::sinf(i as f32 * 0.13) * 0.7).collect();
        let src_r: Vec<f32> = (0..256).map(|i| libm::cosf(i as f32 * 0.11) * 0.5).collect();
        let mut l = src_l.clone();
        let mut r = src_r.clone();
        widener.process(&mut l, &mut r);
        assert_eq!(l, src_l);
        assert_eq!(r, src_r);
    }

    #[test]
    fn widener_zero_width_is_mono() {
        let mut widener = StereoWidener::new(48000.0);
        widener.prepare(48000.0, 256);
        widener.update_parameters(&ParamUpdate::new().with(0, 0.0));
        let mut l = vec![0.8f32; 256];
        let mut r = vec![-0.8f32; 256];
        for _ in 0..20 {
            widener.process(&mut l, &mut r);
            l.fill(0.8);
            r.fill(-0.8);
        }
        widener.process(&mut l, &mut r);
        assert!((l[255] - r[255]).abs() < 1e-3, "not mono: {} vs {}", l[255], r[255]);
    }

    #[test]
    fn imager_band_widths_act_independently() {
        let mut imager = StereoImager::new(48000.0);
        imager.prepare(48000.0, 512);
        // Collapse lows to mono, keep highs.
        imager.update_parameters(&ParamUpdate::new().with(0, 0.0).with(2, 0.5));
        let mut low_side = 0.0f32;
        for block in 0..30 {
            let mut l: Vec<f32> = (0..512)
                .map(|i| {
                    libm::sinf(core::f32::consts::TAU * 80.0 * (block * 512 + i) as f32 / 48000.0)
                })
                .collect();
            let mut r: Vec<f32> = l.iter().map(|x| -x).collect();
            imager.process(&mut l, &mut r);
            if block > 15 {
                for (a, b) in l.iter().zip(r.iter()) {
                    low_side = low_side.max((a - b).abs());
                }
            }
        }
        assert!(low_side < 0.1, "low band not collapsed: {low_side}");
    }

    #[test]
    fn expander_decorrelates_mono_input() {
        let mut expander = DimensionExpander::new(48000.0);
        expander.prepare(48000.0, 4800);
        expander.update_parameters(&ParamUpdate::new().with(0, 1.0).with(3, 1.0));
        let mut l: Vec<f32> = (0..4800).map(|i| libm::sinf(i as f32 * 0.2)).collect();
        let mut r = l.clone();
        expander.process(&mut l, &mut r);
        let diff: f32 = l.iter().zip(r.iter()).map(|(a, b)| (a - b).abs()).sum();
        assert!(diff > 1.0, "still mono: {diff}");
    }
}
