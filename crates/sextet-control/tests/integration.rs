//! Preset round-trip against a live chain.

use sextet_chain::chain;
use sextet_control::{ControlSurface, PresetPayload};

const SR: f32 = 48000.0;
const BLOCK: usize = 256;

fn preset() -> PresetPayload {
    PresetPayload::from_json(
        r#"{
            "preset_name": "Round trip",
            "description": "compressor into fuzz into plate",
            "engines": [
                { "slot": 1, "id": 2, "bypass": false },
                { "slot": 2, "id": 20, "bypass": false },
                { "slot": 4, "id": 39, "bypass": false }
            ],
            "parameters": {
                "slot1_threshold": 0.4,
                "slot1_ratio": 0.5,
                "slot2_sustain": 0.7,
                "slot2_volume": 0.6,
                "slot4_decay": 0.45,
                "slot4_mix": 0.25
            }
        }"#,
    )
    .unwrap()
}

fn render(surface_payload: &PresetPayload, blocks: usize) -> Vec<f32> {
    let (mut audio, handle, _reclaim) = chain(SR);
    audio.prepare(SR, BLOCK);
    let mut surface = ControlSurface::new(handle);
    surface.install_preset(surface_payload).unwrap();

    let mut out = Vec::new();
    for block in 0..blocks {
        let mut l: Vec<f32> = (0..BLOCK)
            .map(|i| {
                (core::f32::consts::TAU * 220.0 * (block * BLOCK + i) as f32 / SR).sin() * 0.6
            })
            .collect();
        let mut r = l.clone();
        audio.process_block(&mut l, &mut r);
        out.extend_from_slice(&l);
    }
    out
}

/// Spec property 6: install → snapshot → re-install produces bit-identical
/// audio for identical input.
#[test]
fn preset_round_trip_is_bit_identical() {
    let original = preset();

    // Snapshot through a surface, then render both payloads fresh.
    let snapshot = {
        let (mut audio, handle, _reclaim) = chain(SR);
        audio.prepare(SR, BLOCK);
        let mut surface = ControlSurface::new(handle);
        surface.install_preset(&original).unwrap();
        surface.current_preset()
    };

    let a = render(&original, 40);
    let b = render(&snapshot, 40);
    assert_eq!(a, b);
}

/// A rejected payload leaves audio untouched: the chain keeps rendering
/// the previous preset.
#[test]
fn rejected_preset_changes_nothing() {
    let (mut audio, handle, _reclaim) = chain(SR);
    audio.prepare(SR, BLOCK);
    let mut surface = ControlSurface::new(handle);
    surface.install_preset(&preset()).unwrap();

    // Render a reference block set.
    let run = |audio: &mut sextet_chain::Chain| -> Vec<f32> {
        let mut out = Vec::new();
        for block in 0..10 {
            let mut l: Vec<f32> = (0..BLOCK)
                .map(|i| ((block * BLOCK + i) as f32 * 0.05).sin() * 0.4)
                .collect();
            let mut r = l.clone();
            audio.process_block(&mut l, &mut r);
            out.extend_from_slice(&l);
        }
        out
    };
    let _warmup = run(&mut audio);

    let bad = PresetPayload::from_json(
        r#"{"preset_name":"bad","engines":[{"slot":1,"id":99}],"parameters":{}}"#,
    )
    .unwrap();
    assert!(surface.install_preset(&bad).is_err());

    // The engines are stateful, so we compare configuration, not samples:
    // the shadow still reports the original chain.
    let current = surface.current_preset();
    assert_eq!(current.preset_name, "Round trip");
    let slot1 = current.engines.iter().find(|e| e.slot == 1).unwrap();
    assert_eq!(slot1.id, 2);
}

/// Bypassed slots pass audio bit-identically even with an engine loaded.
#[test]
fn bypass_flag_from_payload_is_honoured() {
    let payload = PresetPayload::from_json(
        r#"{
            "preset_name": "Bypassed fuzz",
            "engines": [ { "slot": 1, "id": 20, "bypass": true } ],
            "parameters": { "slot1_sustain": 1.0 }
        }"#,
    )
    .unwrap();

    let (mut audio, handle, _reclaim) = chain(SR);
    audio.prepare(SR, BLOCK);
    let mut surface = ControlSurface::new(handle);
    surface.install_preset(&payload).unwrap();

    let src: Vec<f32> = (0..BLOCK).map(|i| (i as f32 * 0.1).sin() * 0.5).collect();
    let mut l = src.clone();
    let mut r = src.clone();
    audio.process_block(&mut l, &mut r);
    assert_eq!(l, src);
    assert_eq!(r, src);
}
