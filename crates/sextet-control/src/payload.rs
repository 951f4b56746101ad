//! The preset payload: the JSON interchange with the preset-generation
//! service and the session-persistence format.
//!
//! ```json
//! {
//!   "preset_name": "Tape dream",
//!   "description": "wobbly slapback into a big plate",
//!   "engines": [
//!     { "slot": 1, "id": 34, "bypass": false },
//!     { "slot": 4, "id": 39, "bypass": false }
//!   ],
//!   "parameters": {
//!     "slot1_param0": 0.42,
//!     "slot1_feedback": 0.6,
//!     "slot4_mix": 0.3
//!   }
//! }
//! ```
//!
//! Parameter keys come in two spellings: `slot{N}_param{M}` addresses an
//! index directly; `slot{N}_{name}` matches the engine's declared
//! parameter names case-insensitively (separators folded). Unknown keys
//! are ignored; slots absent from `engines` keep their current engine.
//! Two reserved semantic keys, `slot{N}_mix` and `slot{N}_bypass`, always
//! address the slot's own dry/wet and bypass; an engine's own "Mix"
//! parameter remains reachable through its index key.

use crate::error::ControlError;
use serde::{Deserialize, Serialize};
use sextet_core::ParamUpdate;
use sextet_registry::{EngineId, find_param_by_name};
use std::collections::BTreeMap;

/// Number of addressable slots (1-based in the payload).
pub const SLOT_COUNT: usize = sextet_chain::SLOT_COUNT;

/// One slot assignment in the payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineAssignment {
    /// Slot number, 1..=6.
    pub slot: u32,
    /// Engine id, 0..=56.
    pub id: u32,
    /// Whether the slot starts bypassed.
    #[serde(default)]
    pub bypass: bool,
}

/// A full preset payload.
///
/// `parameters` uses a [`BTreeMap`] so serialization is deterministic,
/// which keeps persisted presets diff-friendly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PresetPayload {
    /// Display name.
    pub preset_name: String,
    /// Optional display description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Slot assignments; unlisted slots keep their current engine.
    #[serde(default)]
    pub engines: Vec<EngineAssignment>,
    /// Flat normalized parameter map.
    #[serde(default)]
    pub parameters: BTreeMap<String, f32>,
}

/// A validated, slot-resolved preset ready to install.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPreset {
    /// Display name.
    pub name: String,
    /// Per-slot actions, indexed 0..SLOT_COUNT.
    pub slots: Vec<SlotPlan>,
}

/// What a preset wants from one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotPlan {
    /// New engine to install, if the payload listed this slot.
    pub engine: Option<EngineId>,
    /// Bypass flag, if the payload listed this slot.
    pub bypass: Option<bool>,
    /// Slot dry/wet mix, if a `slot{N}_mix` key addressed it.
    pub mix: Option<f32>,
    /// Engine parameter batch (may be empty).
    pub params: ParamUpdate,
}

impl SlotPlan {
    fn empty() -> Self {
        Self {
            engine: None,
            bypass: None,
            mix: None,
            params: ParamUpdate::new(),
        }
    }
}

impl PresetPayload {
    /// Parse a payload from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ControlError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to pretty JSON (the persisted form).
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".into())
    }

    /// Validate the payload and resolve every key to a slot action.
    ///
    /// Any schema violation rejects the whole payload: a preset is applied
    /// entirely or not at all.
    pub fn resolve(&self) -> Result<ResolvedPreset, ControlError> {
        let mut slots: Vec<SlotPlan> = (0..SLOT_COUNT).map(|_| SlotPlan::empty()).collect();

        for assignment in &self.engines {
            if !(1..=SLOT_COUNT as u32).contains(&assignment.slot) {
                return Err(ControlError::SlotOutOfRange(assignment.slot));
            }
            let Some(id) = u8::try_from(assignment.id)
                .ok()
                .and_then(EngineId::new)
            else {
                return Err(ControlError::EngineIdOutOfRange(assignment.id));
            };
            let plan = &mut slots[(assignment.slot - 1) as usize];
            plan.engine = Some(id);
            plan.bypass = Some(assignment.bypass);
        }

        // Keys resolve against the engine each slot will hold after the
        // assignments above; a parameter for a slot with no engine listed
        // and no current engine can only use index keys.
        for (key, &value) in &self.parameters {
            if !value.is_finite() {
                return Err(ControlError::NonFiniteParameter { key: key.clone() });
            }
            let Some((slot_index, param_key)) = split_key(key) else {
                tracing::debug!(key, "ignoring unrecognised preset key");
                continue;
            };
            if slot_index >= SLOT_COUNT {
                // Out-of-range slot in a parameter key is a schema violation
                // like any other slot reference.
                return Err(ControlError::SlotOutOfRange(slot_index as u32 + 1));
            }
            let plan = &mut slots[slot_index];

            if let Some(index) = param_key.strip_prefix("param").and_then(|s| s.parse().ok()) {
                plan.params.set(index, value.clamp(0.0, 1.0));
                continue;
            }

            // Reserved slot-level keys win over engine names, so the
            // spelling is deterministic; an engine's own "Mix" parameter
            // stays addressable through its index key.
            match param_key {
                "mix" => {
                    plan.mix = Some(value.clamp(0.0, 1.0));
                    continue;
                }
                "bypass" => {
                    plan.bypass = Some(value >= 0.5);
                    continue;
                }
                _ => {}
            }

            // Name-keyed: match against the target engine's declared names.
            if let Some(id) = plan.engine {
                if let Some(index) = find_param_by_name(id, param_key) {
                    plan.params.set(index, value.clamp(0.0, 1.0));
                    continue;
                }
            }
            tracing::debug!(key, "ignoring unknown parameter key");
        }

        Ok(ResolvedPreset {
            name: self.preset_name.clone(),
            slots,
        })
    }
}

/// Split `slot{N}_{rest}` into a zero-based slot index and the rest.
fn split_key(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix("slot")?;
    let underscore = rest.find('_')?;
    let slot: usize = rest[..underscore].parse().ok()?;
    (slot >= 1).then(|| (slot - 1, &rest[underscore + 1..]))
}
