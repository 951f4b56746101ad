//! The control surface: installs presets and edits into the chain.
//!
//! Owns the control-side shadow of the chain state (engine ids, bypass,
//! mix, last-sent parameter values) so the current configuration can be
//! snapshotted back into a [`PresetPayload`] for persistence — installing
//! that snapshot reproduces the running chain.

use crate::error::ControlError;
use crate::payload::{EngineAssignment, PresetPayload, ResolvedPreset};
use sextet_chain::{ChainHandle, SLOT_COUNT};
use sextet_core::ParamUpdate;
use sextet_registry::{EngineId, catalog_entry};
use std::collections::BTreeMap;
use std::path::Path;

/// Control-side shadow of one slot.
#[derive(Debug, Clone)]
struct SlotShadow {
    id: EngineId,
    bypass: bool,
    mix: f32,
    /// Last value sent per parameter index.
    values: [Option<f32>; sextet_core::MAX_PARAMS],
}

impl SlotShadow {
    fn new() -> Self {
        Self {
            id: EngineId::PASSTHROUGH,
            bypass: false,
            mix: 1.0,
            values: [None; sextet_core::MAX_PARAMS],
        }
    }
}

/// Mediator between preset payloads, UI edits, and the chain handle.
pub struct ControlSurface {
    handle: ChainHandle,
    slots: Vec<SlotShadow>,
    preset_name: String,
}

impl ControlSurface {
    /// Wrap a chain handle.
    pub fn new(handle: ChainHandle) -> Self {
        Self {
            handle,
            slots: (0..SLOT_COUNT).map(|_| SlotShadow::new()).collect(),
            preset_name: "Init".into(),
        }
    }

    /// The underlying chain handle.
    pub fn handle(&self) -> &ChainHandle {
        &self.handle
    }

    /// Install a full preset. The payload is validated first; on any
    /// error the chain is left untouched.
    pub fn install_preset(&mut self, payload: &PresetPayload) -> Result<(), ControlError> {
        let resolved = payload.resolve()?;
        self.apply_resolved(&resolved)?;
        self.preset_name = resolved.name;
        tracing::info!(preset = %self.preset_name, "installed preset");
        Ok(())
    }

    fn apply_resolved(&mut self, resolved: &ResolvedPreset) -> Result<(), ControlError> {
        for (slot_index, plan) in resolved.slots.iter().enumerate() {
            let shadow = &mut self.slots[slot_index];

            let mut params_pending = !plan.params.is_empty();
            if let Some(id) = plan.engine {
                if id != shadow.id {
                    // Fresh engines take their initial parameters on this
                    // thread, before prepare, so structural parameters
                    // (IR banks, oversampling setups) never allocate on
                    // the audio path.
                    self.handle
                        .install_engine_with(slot_index, id, plan.params)?;
                    shadow.id = id;
                    shadow.values = [None; sextet_core::MAX_PARAMS];
                    params_pending = false;
                }
            }
            if params_pending {
                self.handle.update_slot_parameters(slot_index, plan.params)?;
            }
            for (index, value) in plan.params.iter() {
                shadow.values[index] = Some(value);
            }
            if let Some(bypass) = plan.bypass {
                self.handle.set_bypass(slot_index, bypass)?;
                shadow.bypass = bypass;
            }
            if let Some(mix) = plan.mix {
                self.handle.set_mix(slot_index, mix)?;
                shadow.mix = mix;
            }
        }
        Ok(())
    }

    /// Route a single normalized parameter edit (UI knob) to a slot.
    pub fn edit_parameter(
        &mut self,
        slot: usize,
        index: usize,
        value: f32,
    ) -> Result<(), ControlError> {
        let update = ParamUpdate::new().with(index, value);
        self.handle.update_slot_parameters(slot, update)?;
        if let Some(shadow) = self.slots.get_mut(slot) {
            if index < sextet_core::MAX_PARAMS {
                shadow.values[index] = Some(value.clamp(0.0, 1.0));
            }
        }
        Ok(())
    }

    /// Swap the engine in one slot, keeping the rest of the chain.
    pub fn set_slot_engine(&mut self, slot: usize, id: EngineId) -> Result<(), ControlError> {
        self.handle.install_engine(slot, id)?;
        if let Some(shadow) = self.slots.get_mut(slot) {
            shadow.id = id;
            shadow.values = [None; sextet_core::MAX_PARAMS];
        }
        Ok(())
    }

    /// Set a slot's bypass flag.
    pub fn set_bypass(&mut self, slot: usize, bypassed: bool) -> Result<(), ControlError> {
        self.handle.set_bypass(slot, bypassed)?;
        if let Some(shadow) = self.slots.get_mut(slot) {
            shadow.bypass = bypassed;
        }
        Ok(())
    }

    /// Set a slot's dry/wet mix.
    pub fn set_mix(&mut self, slot: usize, mix: f32) -> Result<(), ControlError> {
        self.handle.set_mix(slot, mix)?;
        if let Some(shadow) = self.slots.get_mut(slot) {
            shadow.mix = mix.clamp(0.0, 1.0);
        }
        Ok(())
    }

    /// Snapshot the current configuration as a payload.
    ///
    /// Re-installing the snapshot reproduces the running chain: engine
    /// ids, bypass flags, slot mixes, and every parameter value the
    /// surface has sent since the engine was installed (index-keyed, so
    /// resolution is exact).
    pub fn current_preset(&self) -> PresetPayload {
        let mut engines = Vec::new();
        let mut parameters = BTreeMap::new();
        for (slot_index, shadow) in self.slots.iter().enumerate() {
            let slot_number = slot_index as u32 + 1;
            engines.push(EngineAssignment {
                slot: slot_number,
                id: u32::from(shadow.id.raw()),
                bypass: shadow.bypass,
            });
            parameters.insert(format!("slot{slot_number}_mix"), shadow.mix);
            let param_count = catalog_entry(shadow.id).params.len();
            for (index, value) in shadow.values.iter().enumerate().take(param_count) {
                if let Some(value) = value {
                    parameters.insert(format!("slot{slot_number}_param{index}"), *value);
                }
            }
        }
        PresetPayload {
            preset_name: self.preset_name.clone(),
            description: None,
            engines,
            parameters,
        }
    }

    /// Persist the current preset as JSON (spec'd session state).
    pub fn save_preset(&self, path: impl AsRef<Path>) -> Result<(), ControlError> {
        let path = path.as_ref();
        std::fs::write(path, self.current_preset().to_json()).map_err(|source| {
            ControlError::WriteFile {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Load and install a persisted preset.
    pub fn load_preset(&mut self, path: impl AsRef<Path>) -> Result<(), ControlError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ControlError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let payload = PresetPayload::from_json(&text)?;
        self.install_preset(&payload)
    }
}
