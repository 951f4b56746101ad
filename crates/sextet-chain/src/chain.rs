//! The six-slot serial chain: audio-thread processor and control handle.
//!
//! # Threading model
//!
//! Two halves share nothing but lock-free channels and a small block of
//! atomics:
//!
//! - [`Chain`] lives on the audio thread. `process_block` drains pending
//!   [`SlotCommand`]s at the top of every block — so each block runs
//!   against one consistent engine set — then routes audio through the
//!   slots in order.
//! - [`ChainHandle`] lives on control threads. It constructs and prepares
//!   engines (allocation stays off the audio path), then moves them to the
//!   audio thread through the command channel.
//!
//! Displaced engines are never dropped on the audio thread: the chain
//! pushes them into a reclaim channel drained by [`spawn_reclaim`]
//! (`crate::reclaim::spawn_reclaim`), and only that thread runs their
//! destructors.

use crate::meter::{Meter, MeterOutput};
use crate::reclaim::ReclaimSender;
use crossbeam_channel::{Receiver, Sender, unbounded};
use sextet_core::{DenormalGuard, Engine, ParamUpdate, SmoothedParam, scrub_stereo};
use sextet_registry::EngineId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicUsize, Ordering};

/// Number of slots in the chain.
pub const SLOT_COUNT: usize = 6;

/// Errors surfaced by the control-side handle.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Slot index outside `0..SLOT_COUNT`.
    #[error("slot index {0} out of range (chain has {SLOT_COUNT} slots)")]
    SlotOutOfRange(usize),
    /// The audio side has been dropped.
    #[error("chain is gone; command channel disconnected")]
    Disconnected,
}

/// A control-thread mutation, applied by the audio thread between blocks.
pub enum SlotCommand {
    /// Install a pre-constructed, pre-prepared engine.
    Install {
        /// Slot index, `0..SLOT_COUNT`.
        slot: usize,
        /// Catalogue id the engine was built from.
        id: EngineId,
        /// The engine, ready to process.
        engine: Box<dyn Engine + Send>,
    },
    /// Deliver a parameter batch to the slot's engine.
    Params {
        /// Slot index.
        slot: usize,
        /// Normalized parameter batch.
        update: ParamUpdate,
    },
    /// Set the slot's bypass flag.
    Bypass {
        /// Slot index.
        slot: usize,
        /// True skips the engine entirely.
        bypassed: bool,
    },
    /// Set the slot's dry/wet mix target.
    Mix {
        /// Slot index.
        slot: usize,
        /// Mix in `[0, 1]`; 0 is fully dry.
        mix: f32,
    },
    /// Clear every engine's signal state (transport events).
    ResetAll,
}

/// State shared between the handle and any UI: engine ids, bypass, mix,
/// and the session format, all atomics.
#[derive(Debug)]
pub struct ChainShared {
    sample_rate_bits: AtomicU32,
    max_block: AtomicUsize,
    slot_ids: [AtomicU8; SLOT_COUNT],
    slot_bypass: [AtomicBool; SLOT_COUNT],
    slot_mix_bits: [AtomicU32; SLOT_COUNT],
}

impl ChainShared {
    fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate_bits: AtomicU32::new(sample_rate.to_bits()),
            max_block: AtomicUsize::new(512),
            slot_ids: core::array::from_fn(|_| AtomicU8::new(0)),
            slot_bypass: core::array::from_fn(|_| AtomicBool::new(false)),
            slot_mix_bits: core::array::from_fn(|_| AtomicU32::new(1.0f32.to_bits())),
        }
    }

    /// Current session sample rate.
    pub fn sample_rate(&self) -> f32 {
        f32::from_bits(self.sample_rate_bits.load(Ordering::Acquire))
    }

    /// Current maximum block size.
    pub fn max_block(&self) -> usize {
        self.max_block.load(Ordering::Acquire)
    }

    /// Engine id installed in `slot`.
    pub fn slot_id(&self, slot: usize) -> EngineId {
        EngineId::new(self.slot_ids[slot].load(Ordering::Relaxed))
            .unwrap_or(EngineId::PASSTHROUGH)
    }

    /// Bypass flag of `slot`.
    pub fn slot_bypassed(&self, slot: usize) -> bool {
        self.slot_bypass[slot].load(Ordering::Relaxed)
    }

    /// Mix value of `slot`.
    pub fn slot_mix(&self, slot: usize) -> f32 {
        f32::from_bits(self.slot_mix_bits[slot].load(Ordering::Relaxed))
    }
}

/// One chain position: an optional engine plus bypass and mix staging.
struct Slot {
    engine: Option<Box<dyn Engine + Send>>,
    id: EngineId,
    bypassed: bool,
    mix: SmoothedParam,
}

impl Slot {
    fn new(sample_rate: f32) -> Self {
        Self {
            engine: None,
            id: EngineId::PASSTHROUGH,
            bypassed: false,
            mix: SmoothedParam::fast(1.0, sample_rate),
        }
    }
}

/// Audio-thread half of the chain.
pub struct Chain {
    slots: Vec<Slot>,
    command_rx: Receiver<SlotCommand>,
    reclaim: ReclaimSender,
    shared: Arc<ChainShared>,
    input_meter: Meter,
    output_meter: Meter,
    wet_left: Vec<f32>,
    wet_right: Vec<f32>,
    sample_rate: f32,
    max_block: usize,
    prepared: bool,
    /// Rate-limits the non-finite-sample diagnostic.
    scrub_logged: u32,
}

/// Control-thread half of the chain.
#[derive(Clone)]
pub struct ChainHandle {
    command_tx: Sender<SlotCommand>,
    shared: Arc<ChainShared>,
    input_meter: Arc<MeterOutput>,
    output_meter: Arc<MeterOutput>,
}

/// Build a connected chain/handle pair plus the reclaim receiver.
///
/// Hand the receiver to [`crate::reclaim::spawn_reclaim`] (or drain it from
/// any non-audio thread).
pub fn chain(sample_rate: f32) -> (Chain, ChainHandle, Receiver<Box<dyn Engine + Send>>) {
    let (command_tx, command_rx) = unbounded();
    let (reclaim_tx, reclaim_rx) = unbounded();
    let shared = Arc::new(ChainShared::new(sample_rate));
    let input_meter = Meter::new(sample_rate);
    let output_meter = Meter::new(sample_rate);

    let handle = ChainHandle {
        command_tx,
        shared: Arc::clone(&shared),
        input_meter: input_meter.output(),
        output_meter: output_meter.output(),
    };

    let chain = Chain {
        slots: (0..SLOT_COUNT).map(|_| Slot::new(sample_rate)).collect(),
        command_rx,
        reclaim: ReclaimSender::new(reclaim_tx),
        shared,
        input_meter,
        output_meter,
        wet_left: Vec::new(),
        wet_right: Vec::new(),
        sample_rate,
        max_block: 0,
        prepared: false,
        scrub_logged: 0,
    };

    (chain, handle, reclaim_rx)
}

impl Chain {
    /// Ready the chain for blocks up to `max_block` at `sample_rate`.
    ///
    /// Allocates the wet scratch buffers and re-prepares every installed
    /// engine. Must be called before `process_block`, and again whenever
    /// the host changes the stream format.
    pub fn prepare(&mut self, sample_rate: f32, max_block: usize) {
        self.sample_rate = sample_rate;
        self.max_block = max_block;
        self.wet_left = vec![0.0; max_block];
        self.wet_right = vec![0.0; max_block];
        self.input_meter.set_sample_rate(sample_rate);
        self.output_meter.set_sample_rate(sample_rate);
        for slot in &mut self.slots {
            slot.mix.set_sample_rate(sample_rate);
            if let Some(engine) = slot.engine.as_mut() {
                engine.prepare(sample_rate, max_block);
            }
        }
        self.shared
            .sample_rate_bits
            .store(sample_rate.to_bits(), Ordering::Release);
        self.shared.max_block.store(max_block, Ordering::Release);
        self.prepared = true;
    }

    /// Zero all engine state (transport start/stop).
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            if let Some(engine) = slot.engine.as_mut() {
                engine.reset();
            }
            slot.mix.snap_to_target();
        }
        self.input_meter.reset();
        self.output_meter.reset();
    }

    /// Total reported latency of the occupied slots, in samples.
    pub fn latency_samples(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| !s.bypassed)
            .filter_map(|s| s.engine.as_ref())
            .map(|e| e.reported_latency())
            .sum()
    }

    /// Apply pending control commands. Called at the top of every block so
    /// the whole block runs against one engine set.
    fn drain_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                SlotCommand::Install { slot, id, engine } => {
                    let Some(target) = self.slots.get_mut(slot) else {
                        // Invalid indices are rejected handle-side; a stray
                        // one here goes straight to reclaim.
                        self.reclaim.send(engine);
                        continue;
                    };
                    let old = target.engine.replace(engine);
                    target.id = id;
                    if let Some(old) = old {
                        self.reclaim.send(old);
                    }
                }
                SlotCommand::Params { slot, update } => {
                    if let Some(engine) =
                        self.slots.get_mut(slot).and_then(|s| s.engine.as_mut())
                    {
                        engine.update_parameters(&update);
                    }
                }
                SlotCommand::Bypass { slot, bypassed } => {
                    if let Some(target) = self.slots.get_mut(slot) {
                        target.bypassed = bypassed;
                    }
                }
                SlotCommand::Mix { slot, mix } => {
                    if let Some(target) = self.slots.get_mut(slot) {
                        target.mix.set_target(mix.clamp(0.0, 1.0));
                    }
                }
                SlotCommand::ResetAll => {
                    for slot in &mut self.slots {
                        if let Some(engine) = slot.engine.as_mut() {
                            engine.reset();
                        }
                    }
                }
            }
        }
    }

    /// Process one stereo block in place. Realtime-safe after `prepare`.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert!(self.prepared, "process_block before prepare");
        debug_assert_eq!(left.len(), right.len());
        debug_assert!(left.len() <= self.max_block);

        let _guard = DenormalGuard::new();
        let n = left.len().min(self.max_block);

        self.drain_commands();
        self.input_meter.publish(left, right);

        for slot in &mut self.slots {
            let Some(engine) = slot.engine.as_mut() else {
                continue;
            };
            if slot.bypassed {
                continue;
            }

            // Dry copy, engine on the wet path, per-sample smoothed blend.
            let wet_l = &mut self.wet_left[..n];
            let wet_r = &mut self.wet_right[..n];
            wet_l.copy_from_slice(&left[..n]);
            wet_r.copy_from_slice(&right[..n]);
            engine.process(wet_l, wet_r);

            if slot.mix.is_settled() && slot.mix.target() == 1.0 {
                left[..n].copy_from_slice(wet_l);
                right[..n].copy_from_slice(wet_r);
            } else {
                for i in 0..n {
                    let mix = slot.mix.advance();
                    left[i] += (wet_l[i] - left[i]) * mix;
                    right[i] += (wet_r[i] - right[i]) * mix;
                }
            }
        }

        self.output_meter.publish(left, right);
        let replaced = scrub_stereo(left, right);
        if replaced > 0 && self.scrub_logged < 8 {
            self.scrub_logged += 1;
            tracing::debug!(replaced, "scrubbed non-finite samples from chain output");
        }
    }
}

impl ChainHandle {
    /// Construct, prepare, and install an engine into `slot`.
    ///
    /// All allocation happens here on the calling thread; the audio thread
    /// receives a ready engine. Installing id 0 clears the slot to an
    /// explicit passthrough.
    pub fn install_engine(&self, slot: usize, id: EngineId) -> Result<(), ChainError> {
        self.install_engine_with(slot, id, ParamUpdate::new())
    }

    /// Like [`install_engine`](Self::install_engine), but applies an
    /// initial parameter batch on this thread before the hand-off.
    ///
    /// Engines whose structural parameters do non-realtime work (IR
    /// synthesis, bank selection) rely on this path: the parameters land
    /// before `prepare`, so all allocation stays off the audio thread.
    pub fn install_engine_with(
        &self,
        slot: usize,
        id: EngineId,
        initial: ParamUpdate,
    ) -> Result<(), ChainError> {
        if slot >= SLOT_COUNT {
            return Err(ChainError::SlotOutOfRange(slot));
        }
        let sample_rate = self.shared.sample_rate();
        let max_block = self.shared.max_block();
        let mut engine = sextet_registry::create(id, sample_rate);
        if !initial.is_empty() {
            engine.update_parameters(&initial);
        }
        engine.prepare(sample_rate, max_block);
        if !initial.is_empty() {
            // `prepare` resets smoothing state; re-assert the targets so
            // the first block already runs at the requested values.
            engine.update_parameters(&initial);
        }
        tracing::debug!(slot, id = id.raw(), name = engine.name(), "installing engine");
        self.shared.slot_ids[slot].store(id.raw(), Ordering::Relaxed);
        self.command_tx
            .send(SlotCommand::Install { slot, id, engine })
            .map_err(|_| ChainError::Disconnected)
    }

    /// Send a parameter batch to `slot`.
    pub fn update_slot_parameters(
        &self,
        slot: usize,
        update: ParamUpdate,
    ) -> Result<(), ChainError> {
        if slot >= SLOT_COUNT {
            return Err(ChainError::SlotOutOfRange(slot));
        }
        if update.is_empty() {
            return Ok(());
        }
        self.command_tx
            .send(SlotCommand::Params { slot, update })
            .map_err(|_| ChainError::Disconnected)
    }

    /// Set the bypass flag of `slot`.
    pub fn set_bypass(&self, slot: usize, bypassed: bool) -> Result<(), ChainError> {
        if slot >= SLOT_COUNT {
            return Err(ChainError::SlotOutOfRange(slot));
        }
        self.shared.slot_bypass[slot].store(bypassed, Ordering::Relaxed);
        self.command_tx
            .send(SlotCommand::Bypass { slot, bypassed })
            .map_err(|_| ChainError::Disconnected)
    }

    /// Set the dry/wet mix of `slot`.
    pub fn set_mix(&self, slot: usize, mix: f32) -> Result<(), ChainError> {
        if slot >= SLOT_COUNT {
            return Err(ChainError::SlotOutOfRange(slot));
        }
        let mix = mix.clamp(0.0, 1.0);
        self.shared.slot_mix_bits[slot].store(mix.to_bits(), Ordering::Relaxed);
        self.command_tx
            .send(SlotCommand::Mix { slot, mix })
            .map_err(|_| ChainError::Disconnected)
    }

    /// Ask the audio side to zero all engine state.
    pub fn reset_all(&self) -> Result<(), ChainError> {
        self.command_tx
            .send(SlotCommand::ResetAll)
            .map_err(|_| ChainError::Disconnected)
    }

    /// Shared state snapshot (ids, bypass, mix, format).
    pub fn shared(&self) -> &Arc<ChainShared> {
        &self.shared
    }

    /// Input meter reader.
    pub fn input_meter(&self) -> Arc<MeterOutput> {
        Arc::clone(&self.input_meter)
    }

    /// Output meter reader.
    pub fn output_meter(&self) -> Arc<MeterOutput> {
        Arc::clone(&self.output_meter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_is_bit_identical() {
        let (mut chain, _handle, _reclaim) = chain(48000.0);
        chain.prepare(48000.0, 512);
        let src: Vec<f32> = (0..512).map(|i| (i as f32 * 0.1).sin() * 0.5).collect();
        let mut l = src.clone();
        let mut r = src.clone();
        chain.process_block(&mut l, &mut r);
        assert_eq!(l, src);
        assert_eq!(r, src);
    }

    #[test]
    fn install_routes_audio_through_engine() {
        let (mut chain, handle, _reclaim) = chain(48000.0);
        chain.prepare(48000.0, 512);
        // Gain Utility at -inf... use Muff Fuzz which visibly changes audio.
        handle
            .install_engine(0, EngineId::new(20).unwrap())
            .unwrap();
        let src: Vec<f32> = (0..512).map(|i| (i as f32 * 0.1).sin() * 0.5).collect();
        let mut l = src.clone();
        let mut r = src.clone();
        chain.process_block(&mut l, &mut r);
        assert_ne!(l, src, "engine had no effect");
    }

    #[test]
    fn bypass_restores_transparency() {
        let (mut chain, handle, _reclaim) = chain(48000.0);
        chain.prepare(48000.0, 256);
        handle
            .install_engine(2, EngineId::new(20).unwrap())
            .unwrap();
        handle.set_bypass(2, true).unwrap();
        let src: Vec<f32> = (0..256).map(|i| (i as f32 * 0.2).sin() * 0.4).collect();
        let mut l = src.clone();
        let mut r = src.clone();
        chain.process_block(&mut l, &mut r);
        assert_eq!(l, src);
        assert_eq!(r, src);
    }

    #[test]
    fn mix_zero_restores_transparency() {
        let (mut chain, handle, _reclaim) = chain(48000.0);
        chain.prepare(48000.0, 256);
        handle
            .install_engine(0, EngineId::new(20).unwrap())
            .unwrap();
        handle.set_mix(0, 0.0).unwrap();
        // Let the mix smoother settle.
        for _ in 0..40 {
            let mut l = vec![0.1f32; 256];
            let mut r = vec![0.1f32; 256];
            chain.process_block(&mut l, &mut r);
        }
        let src: Vec<f32> = (0..256).map(|i| (i as f32 * 0.2).sin() * 0.4).collect();
        let mut l = src.clone();
        let mut r = src.clone();
        chain.process_block(&mut l, &mut r);
        for (a, b) in l.iter().zip(src.iter()) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn replaced_engine_lands_on_reclaim_queue() {
        let (mut chain, handle, reclaim) = chain(48000.0);
        chain.prepare(48000.0, 128);
        handle.install_engine(1, EngineId::new(39).unwrap()).unwrap();
        let mut l = vec![0.0f32; 128];
        let mut r = vec![0.0f32; 128];
        chain.process_block(&mut l, &mut r);
        handle.install_engine(1, EngineId::new(15).unwrap()).unwrap();
        chain.process_block(&mut l, &mut r);
        let old = reclaim.try_recv().expect("old engine not reclaimed");
        assert_eq!(old.name(), "Plate Reverb");
    }

    #[test]
    fn out_of_range_slot_is_rejected() {
        let (_chain, handle, _reclaim) = chain(48000.0);
        assert!(matches!(
            handle.install_engine(6, EngineId::PASSTHROUGH),
            Err(ChainError::SlotOutOfRange(6))
        ));
        assert!(handle.set_mix(99, 0.5).is_err());
    }

    #[test]
    fn latency_sums_over_slots() {
        let (mut chain, handle, _reclaim) = chain(48000.0);
        chain.prepare(48000.0, 512);
        assert_eq!(chain.latency_samples(), 0);
        handle.install_engine(0, EngineId::new(47).unwrap()).unwrap(); // spectral freeze
        handle.install_engine(1, EngineId::new(41).unwrap()).unwrap(); // convolution
        let mut l = vec![0.0f32; 512];
        let mut r = vec![0.0f32; 512];
        chain.process_block(&mut l, &mut r);
        assert!(chain.latency_samples() >= 1024 + 512);
    }
}
