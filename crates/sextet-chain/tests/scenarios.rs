//! End-to-end chain scenarios: the six-slot host driven the way a plugin
//! host would drive it.

use sextet_chain::{SLOT_COUNT, chain, spawn_reclaim};
use sextet_core::ParamUpdate;
use sextet_registry::EngineId;

const SR: f32 = 48000.0;
const BLOCK: usize = 512;

fn sine(start: usize, n: usize, freq: f32, amp: f32) -> Vec<f32> {
    (0..n)
        .map(|i| (core::f32::consts::TAU * freq * (start + i) as f32 / SR).sin() * amp)
        .collect()
}

fn rms(buf: &[f32]) -> f32 {
    (buf.iter().map(|x| x * x).sum::<f32>() / buf.len() as f32).sqrt()
}

fn db(linear: f32) -> f32 {
    20.0 * linear.max(1e-10).log10()
}

/// Scenario A: all six slots explicitly set to passthrough; one second of
/// sine comes out bit-identical.
#[test]
fn scenario_a_passthrough_chain() {
    let (mut audio, handle, _reclaim) = chain(SR);
    audio.prepare(SR, BLOCK);
    for slot in 0..SLOT_COUNT {
        handle.install_engine(slot, EngineId::PASSTHROUGH).unwrap();
    }

    let half = 0.501187; // -6 dBFS
    for block in 0..94 {
        let src = sine(block * BLOCK, BLOCK, 1000.0, half);
        let mut l = src.clone();
        let mut r = src.clone();
        audio.process_block(&mut l, &mut r);
        assert_eq!(l, src, "block {block} not bit-identical");
        assert_eq!(r, src, "block {block} not bit-identical");
    }
}

/// Scenario B: one Classic Compressor squashing a 0 dBFS sine; steady
/// state shows real gain reduction and no onset clicks.
#[test]
fn scenario_b_single_compressor() {
    let (mut audio, handle, _reclaim) = chain(SR);
    audio.prepare(SR, BLOCK);
    handle.install_engine(0, EngineId::new(2).unwrap()).unwrap();
    handle
        .update_slot_parameters(
            0,
            ParamUpdate::new()
                .with(0, 0.3) // threshold
                .with(1, 0.6) // ratio ≈ 8:1
                .with(2, 0.1) // attack
                .with(3, 0.3), // release
        )
        .unwrap();
    handle.set_mix(0, 1.0).unwrap();

    let mut tail = Vec::new();
    let mut prev = 0.0f32;
    let mut max_step = 0.0f32;
    for block in 0..94 {
        let src = sine(block * BLOCK, BLOCK, 1000.0, 1.0);
        let mut l = src.clone();
        let mut r = src.clone();
        audio.process_block(&mut l, &mut r);
        for &s in &l {
            max_step = max_step.max((s - prev).abs());
            prev = s;
        }
        if block > 75 {
            tail.extend_from_slice(&l);
        }
    }
    let in_rms = core::f32::consts::FRAC_1_SQRT_2;
    let reduction = db(rms(&tail) / in_rms);
    assert!(
        reduction <= -8.0,
        "expected >= 8 dB steady-state reduction, got {reduction:.1} dB"
    );
    // No click: a 1 kHz sine at full scale moves ~0.13/sample; anything
    // far beyond that is a discontinuity.
    assert!(max_step < 0.5, "onset click of {max_step}");
}

/// Scenario C: Plate Reverb in slot 4 at 30 % mix turns an impulse into a
/// decaying tail that is gone within four seconds.
#[test]
fn scenario_c_reverb_wet_dry() {
    let (mut audio, handle, _reclaim) = chain(SR);
    audio.prepare(SR, BLOCK);
    handle.install_engine(3, EngineId::new(39).unwrap()).unwrap();
    handle
        .update_slot_parameters(3, ParamUpdate::new().with(1, 0.5)) // decay
        .unwrap();
    handle.set_mix(3, 0.3).unwrap();

    // Let the mix smoother settle before the impulse.
    for _ in 0..20 {
        let mut l = vec![0.0f32; BLOCK];
        let mut r = vec![0.0f32; BLOCK];
        audio.process_block(&mut l, &mut r);
    }

    let seconds = 4;
    let mut output = Vec::with_capacity(seconds * SR as usize);
    for block in 0..(seconds * SR as usize / BLOCK) {
        let mut l = vec![0.0f32; BLOCK];
        let mut r = vec![0.0f32; BLOCK];
        if block == 0 {
            l[0] = 1.0;
            r[0] = 1.0;
        }
        audio.process_block(&mut l, &mut r);
        for s in &l {
            assert!(s.abs() <= 1.0, "overload in reverb tail: {s}");
        }
        output.extend_from_slice(&l);
    }

    let early = rms(&output[(0.2 * SR) as usize..(0.3 * SR) as usize]);
    let at_one_second = rms(&output[(0.9 * SR) as usize..SR as usize]);
    let at_four_seconds = rms(&output[(3.9 * SR) as usize..(4.0 * SR) as usize]);

    assert!(db(early) > -80.0, "no early tail: {} dB", db(early));
    assert!(at_one_second > 0.0, "tail dead at 1 s");
    assert!(
        early > at_one_second,
        "tail not decaying: {early} vs {at_one_second}"
    );
    assert!(
        db(at_four_seconds) < -60.0,
        "tail still audible at 4 s: {} dB",
        db(at_four_seconds)
    );
}

/// Scenario D: Muff Fuzz at max drive eats a DC step; the output carries
/// no sustained offset.
#[test]
fn scenario_d_distortion_dc_block() {
    let (mut audio, handle, _reclaim) = chain(SR);
    audio.prepare(SR, BLOCK);
    handle.install_engine(1, EngineId::new(20).unwrap()).unwrap();
    handle
        .update_slot_parameters(1, ParamUpdate::new().with(0, 1.0).with(2, 1.0))
        .unwrap();
    handle.set_mix(1, 1.0).unwrap();

    let mut mean_late = 0.0f32;
    for block in 0..94 {
        let mut l = vec![0.5f32; BLOCK];
        let mut r = vec![0.5f32; BLOCK];
        audio.process_block(&mut l, &mut r);
        for s in &l {
            assert!(s.is_finite());
        }
        // 100 ms in, the DC component must already be gone.
        if block >= 10 {
            mean_late = l.iter().sum::<f32>() / l.len() as f32;
            assert!(
                mean_late.abs() < 0.01,
                "DC offset of {mean_late} at block {block}"
            );
        }
    }
    assert!(mean_late.abs() < 0.01);
}

/// Scenario E: swapping a reverb for a tube preamp mid-stream produces no
/// gap, no non-finite samples, and the old engine dies on the reclaim
/// thread.
#[test]
fn scenario_e_swap_under_load() {
    let (mut audio, handle, reclaim_rx) = chain(SR);
    audio.prepare(SR, BLOCK);
    let reclaim_thread = spawn_reclaim(reclaim_rx);
    handle.install_engine(0, EngineId::new(39).unwrap()).unwrap();
    handle.set_mix(0, 0.5).unwrap();

    let mut state = 0x8badf00du32;
    let mut pink = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        (state as f32 / u32::MAX as f32) - 0.5
    };

    for block in 0..94 {
        if block == 47 {
            // t = 500 ms: the control thread swaps the engine.
            handle.install_engine(0, EngineId::new(15).unwrap()).unwrap();
        }
        let mut l: Vec<f32> = (0..BLOCK).map(|_| pink()).collect();
        let mut r = l.clone();
        audio.process_block(&mut l, &mut r);
        for s in l.iter().chain(r.iter()) {
            assert!(s.is_finite(), "non-finite sample at swap boundary");
        }
    }

    // Tear down: the reclaim thread must have destroyed exactly the
    // displaced reverb (the tube amp dies with the chain).
    drop(handle);
    drop(audio);
    let reclaimed = reclaim_thread.join().unwrap();
    assert_eq!(reclaimed, 1, "displaced engine not reclaimed off-thread");
}

/// Scenario F: Tape Echo with the feedback parameter slammed to 1.0 stays
/// bounded for ten seconds of driven input.
#[test]
fn scenario_f_feedback_clamp() {
    let (mut audio, handle, _reclaim) = chain(SR);
    audio.prepare(SR, BLOCK);
    handle.install_engine(2, EngineId::new(34).unwrap()).unwrap();
    handle
        .update_slot_parameters(
            2,
            ParamUpdate::new().with(0, 0.3).with(1, 1.0).with(5, 1.0),
        )
        .unwrap();

    let mut last_rms = 0.0f32;
    for block in 0..(10 * SR as usize / BLOCK) {
        let mut l = vec![0.0f32; BLOCK];
        let mut r = vec![0.0f32; BLOCK];
        if block == 0 {
            l[0] = 1.0;
            r[0] = 1.0;
        }
        audio.process_block(&mut l, &mut r);
        last_rms = rms(&l);
        assert!(last_rms.is_finite() && last_rms < 2.0, "diverged: {last_rms}");
    }
    assert!(last_rms < 0.5, "feedback did not settle: {last_rms}");
}

/// Every engine in the catalogue: a bypassed slot is bit-transparent, and
/// a settled mix of zero is bit-transparent, no matter what the engine
/// does on its wet path.
#[test]
fn bypass_and_mix_zero_are_transparent_for_every_engine() {
    for id in EngineId::all() {
        // Bypass.
        let (mut audio, handle, _reclaim) = chain(SR);
        audio.prepare(SR, 128);
        handle.install_engine(0, id).unwrap();
        handle.set_bypass(0, true).unwrap();
        let src: Vec<f32> = (0..128).map(|i| (i as f32 * 0.19).sin() * 0.6).collect();
        let mut l = src.clone();
        let mut r = src.clone();
        audio.process_block(&mut l, &mut r);
        assert_eq!(l, src, "engine {id} leaks through bypass");
        assert_eq!(r, src, "engine {id} leaks through bypass");

        // Mix at zero, after the smoother settles.
        let (mut audio, handle, _reclaim) = chain(SR);
        audio.prepare(SR, 128);
        handle.install_engine(0, id).unwrap();
        handle.set_mix(0, 0.0).unwrap();
        for _ in 0..60 {
            let mut l = vec![0.2f32; 128];
            let mut r = vec![0.2f32; 128];
            audio.process_block(&mut l, &mut r);
        }
        let mut l = src.clone();
        let mut r = src.clone();
        audio.process_block(&mut l, &mut r);
        for (i, (a, b)) in l.iter().zip(src.iter()).enumerate() {
            assert!(
                (a - b).abs() < 2e-6,
                "engine {id} leaks through zero mix at {i}: {a} vs {b}"
            );
        }
    }
}

/// Spec property 10 in miniature: hammer the control side while the audio
/// side runs full tilt; nothing breaks, nothing is lost.
#[test]
fn control_stress_under_processing() {
    let (mut audio, handle, reclaim_rx) = chain(SR);
    audio.prepare(SR, BLOCK);
    let reclaim_thread = spawn_reclaim(reclaim_rx);

    let control = {
        let handle = handle.clone();
        std::thread::spawn(move || {
            for i in 0..1000u32 {
                let slot = (i as usize) % SLOT_COUNT;
                let id = EngineId::new((i % 57) as u8).unwrap();
                handle.install_engine(slot, id).unwrap();
                for j in 0..10u32 {
                    let update =
                        ParamUpdate::new().with((j % 16) as usize, (j as f32) / 10.0);
                    handle.update_slot_parameters(slot, update).unwrap();
                }
            }
        })
    };

    // The audio thread keeps its deadline discipline: process continuously
    // until the control storm is over, then drain the stragglers.
    while !control.is_finished() {
        let mut l = vec![0.1f32; BLOCK];
        let mut r = vec![0.1f32; BLOCK];
        audio.process_block(&mut l, &mut r);
        for s in &l {
            assert!(s.is_finite());
        }
    }
    control.join().unwrap();
    for _ in 0..4 {
        let mut l = vec![0.1f32; BLOCK];
        let mut r = vec![0.1f32; BLOCK];
        audio.process_block(&mut l, &mut r);
    }

    drop(handle);
    drop(audio);
    let reclaimed = reclaim_thread.join().unwrap();
    // 1000 installs across 6 slots: everything displaced must reach the
    // reclaim thread (the final occupants die with the chain).
    assert_eq!(reclaimed, 1000 - SLOT_COUNT);
}
