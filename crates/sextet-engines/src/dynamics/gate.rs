//! Noise Gate — downward expander with hold and hysteresis.
//!
//! Opens fast on signal above the threshold, holds for a programmable time,
//! then closes at the release rate down to the range floor. Hysteresis
//! separates the open and close thresholds so a signal hovering near the
//! threshold does not chatter.

use sextet_core::{
    DcBlocker, Engine, EnvelopeFollower, ParamUpdate, SmoothedParam, map,
    math::{db_to_linear, linear_to_db, time_coeff},
    scrub_stereo, wet_dry_mix,
};

/// Parameter names, in index order.
pub const PARAMS: &[&str] = &[
    "Threshold",
    "Ratio",
    "Attack",
    "Hold",
    "Release",
    "Range",
    "Hysteresis",
    "Mix",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Closed,
    Open,
    Holding,
    Releasing,
}

/// Expander-style noise gate.
pub struct NoiseGate {
    sample_rate: f32,
    envelope: EnvelopeFollower,
    state: GateState,
    threshold_db: f32,
    hysteresis_db: f32,
    ratio: f32,
    range_db: f32,
    attack_coeff: f32,
    release_coeff: f32,
    hold_samples: usize,
    hold_counter: usize,
    /// Current gate gain, ramped by attack/release coefficients.
    gain: f32,
    mix: SmoothedParam,
    dc: [DcBlocker; 2],
}

impl NoiseGate {
    /// Create with a -50 dB threshold.
    pub fn new(sample_rate: f32) -> Self {
        let mut envelope = EnvelopeFollower::new(sample_rate);
        envelope.set_attack_ms(0.5);
        envelope.set_release_ms(20.0);
        Self {
            sample_rate,
            envelope,
            state: GateState::Closed,
            threshold_db: -50.0,
            hysteresis_db: 3.0,
            ratio: 4.0,
            range_db: -80.0,
            attack_coeff: time_coeff(1.0, sample_rate),
            release_coeff: time_coeff(100.0, sample_rate),
            hold_samples: (0.05 * sample_rate) as usize,
            hold_counter: 0,
            gain: 0.0,
            mix: SmoothedParam::fast(1.0, sample_rate),
            dc: [DcBlocker::new(sample_rate), DcBlocker::new(sample_rate)],
        }
    }

    /// Target gain for the current detector level when below threshold.
    fn closed_gain(&self, level_db: f32) -> f32 {
        // Downward expansion toward the range floor.
        let under = (self.threshold_db - level_db).max(0.0);
        let reduction_db = (under * (self.ratio - 1.0)).min(-self.range_db);
        db_to_linear(-reduction_db)
    }
}

impl Engine for NoiseGate {
    fn name(&self) -> &'static str {
        "Noise Gate"
    }

    fn parameter_count(&self) -> usize {
        PARAMS.len()
    }

    fn parameter_name(&self, index: usize) -> &'static str {
        PARAMS.get(index).copied().unwrap_or("")
    }

    fn prepare(&mut self, sample_rate: f32, _max_block: usize) {
        let hold_ms = self.hold_samples as f32 * 1000.0 / self.sample_rate;
        self.sample_rate = sample_rate;
        self.envelope.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        for dc in &mut self.dc {
            dc.set_sample_rate(sample_rate);
        }
        self.hold_samples = (hold_ms * 0.001 * sample_rate) as usize;
        self.reset();
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let dry_l = *l;
            let dry_r = *r;

            let level = self.envelope.process(dry_l.abs().max(dry_r.abs()));
            let level_db = linear_to_db(level);
            let open_at = self.threshold_db;
            let close_at = self.threshold_db - self.hysteresis_db;

            // State transitions
            match self.state {
                GateState::Closed | GateState::Releasing => {
                    if level_db > open_at {
                        self.state = GateState::Open;
                    }
                }
                GateState::Open => {
                    if level_db < close_at {
                        self.state = GateState::Holding;
                        self.hold_counter = self.hold_samples;
                    }
                }
                GateState::Holding => {
                    if level_db > open_at {
                        self.state = GateState::Open;
                    } else if self.hold_counter == 0 {
                        self.state = GateState::Releasing;
                    } else {
                        self.hold_counter -= 1;
                    }
                }
            }

            let (target, coeff) = match self.state {
                GateState::Open | GateState::Holding => (1.0, self.attack_coeff),
                GateState::Closed | GateState::Releasing => {
                    (self.closed_gain(level_db), self.release_coeff)
                }
            };
            self.gain = coeff * self.gain + (1.0 - coeff) * target;

            // Fast gate ramps against an asymmetric signal rectify it;
            // block the offset before it reaches the next slot.
            let mix = self.mix.advance();
            let wet_l = self.dc[0].process(dry_l * self.gain);
            let wet_r = self.dc[1].process(dry_r * self.gain);
            *l = wet_dry_mix(dry_l, wet_l, mix);
            *r = wet_dry_mix(dry_r, wet_r, mix);
        }
        scrub_stereo(left, right);
    }

    fn update_parameters(&mut self, update: &ParamUpdate) {
        for (index, value) in update.iter() {
            match index {
                0 => self.threshold_db = map::linear(value, -80.0, 0.0),
                1 => self.ratio = map::linear(value, 1.0, 10.0),
                2 => self.attack_coeff = time_coeff(
                    map::exponential(value, 0.05, 50.0),
                    self.sample_rate,
                ),
                3 => {
                    self.hold_samples =
                        (map::exponential(value, 1.0, 1000.0) * 0.001 * self.sample_rate) as usize;
                }
                4 => self.release_coeff = time_coeff(
                    map::exponential(value, 10.0, 2000.0),
                    self.sample_rate,
                ),
                5 => self.range_db = map::linear(value, -100.0, 0.0),
                6 => self.hysteresis_db = map::linear(value, 0.0, 12.0),
                7 => self.mix.set_target(map::unit(value)),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.envelope.reset();
        self.state = GateState::Closed;
        self.hold_counter = 0;
        self.gain = 0.0;
        for dc in &mut self.dc {
            dc.reset();
        }
        self.mix.snap_to_target();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(start: usize, n: usize, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amp * libm::sinf(core::f32::consts::TAU * 1000.0 * (start + i) as f32 / 48000.0))
            .collect()
    }

    #[test]
    fn passes_loud_blocks_quiet() {
        let mut gate = NoiseGate::new(48000.0);
        gate.prepare(48000.0, 512);
        // Threshold around -30 dB.
        gate.update_parameters(&ParamUpdate::new().with(0, 0.625).with(4, 0.2));

        // Loud passage opens the gate.
        let mut loud_peak = 0.0f32;
        for block in 0..20 {
            let mut l = tone(block * 512, 512, 0.5);
            let mut r = l.clone();
            gate.process(&mut l, &mut r);
            loud_peak = l.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        }
        assert!(loud_peak > 0.4, "gate should be open, got {loud_peak}");

        // Quiet passage closes it well below the input level.
        let mut quiet_peak = 0.0f32;
        for block in 0..200 {
            let mut l = tone(block * 512, 512, 0.001);
            let mut r = l.clone();
            gate.process(&mut l, &mut r);
            quiet_peak = l.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        }
        assert!(quiet_peak < 0.0005, "gate should attenuate, got {quiet_peak}");
    }

    #[test]
    fn dc_is_blocked_through_an_open_gate() {
        let mut gate = NoiseGate::new(48000.0);
        gate.prepare(48000.0, 512);
        // Threshold low enough that a 0.5 offset holds the gate open.
        gate.update_parameters(&ParamUpdate::new().with(0, 0.2));
        let mut mean = 1.0f32;
        for block in 0..100 {
            let mut l = vec![0.5f32; 512];
            let mut r = vec![0.5f32; 512];
            gate.process(&mut l, &mut r);
            if block > 50 {
                mean = l.iter().sum::<f32>() / l.len() as f32;
            }
        }
        assert!(mean.abs() < 0.01, "DC passed through the gate: {mean}");
    }

    #[test]
    fn finite_everywhere() {
        let mut gate = NoiseGate::new(48000.0);
        gate.prepare(48000.0, 256);
        let mut u = ParamUpdate::new();
        for i in 0..PARAMS.len() {
            u.set(i, 0.9);
        }
        gate.update_parameters(&u);
        let mut l: Vec<f32> = (0..256).map(|i| if i % 7 == 0 { 1.0 } else { 0.0 }).collect();
        let mut r = l.clone();
        for _ in 0..50 {
            gate.process(&mut l, &mut r);
        }
        assert!(l.iter().all(|x| x.is_finite()));
    }
}
