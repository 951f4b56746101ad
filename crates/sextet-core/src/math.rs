//! Small math helpers shared across the engine catalogue.

use libm::{expf, log10f, powf};

/// Convert decibels to linear amplitude.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    powf(10.0, db / 20.0)
}

/// Convert linear amplitude to decibels, floored at -120 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * log10f(linear.abs().max(1e-6))
}

/// Fast tanh approximation (Padé 3,2), accurate to ~1e-3 over ±4.
///
/// Saturates exactly to ±1 outside that range. Good enough for waveshaping;
/// not a drop-in for analysis code.
#[inline]
pub fn fast_tanh(x: f32) -> f32 {
    if x > 4.0 {
        1.0
    } else if x < -4.0 {
        -1.0
    } else {
        let x2 = x * x;
        x * (27.0 + x2) / (27.0 + 9.0 * x2)
    }
}

/// Cubic soft clipper: linear below ±1/3, polynomial knee, flat above ±1.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    if x > 1.0 {
        1.0
    } else if x < -1.0 {
        -1.0
    } else {
        1.5 * x - 0.5 * x * x * x
    }
}

/// Hard clip at ±threshold.
#[inline]
pub fn hard_clip(x: f32, threshold: f32) -> f32 {
    x.clamp(-threshold, threshold)
}

/// Reflect the signal back when it crosses ±threshold (wavefolding).
#[inline]
pub fn foldback(x: f32, threshold: f32) -> f32 {
    if threshold <= 0.0 {
        return 0.0;
    }
    let mut y = x;
    // Two reflections cover any drive the catalogue can produce; beyond that
    // the folds alias anyway and the residual clamp keeps the range bound.
    for _ in 0..4 {
        if y > threshold {
            y = 2.0 * threshold - y;
        } else if y < -threshold {
            y = -2.0 * threshold - y;
        } else {
            break;
        }
    }
    y.clamp(-threshold, threshold)
}

/// Transparent limiter curve: unity below ~0.5·ceiling, tanh knee above.
///
/// Guarantees `|output| <= ceiling` for any finite input.
#[inline]
pub fn soft_limit(x: f32, ceiling: f32) -> f32 {
    if ceiling <= 0.0 {
        return 0.0;
    }
    ceiling * fast_tanh(x / ceiling)
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Milliseconds to a (fractional) sample count.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * 0.001 * sample_rate
}

/// Sample count to milliseconds.
#[inline]
pub fn samples_to_ms(samples: f32, sample_rate: f32) -> f32 {
    if sample_rate > 0.0 {
        samples * 1000.0 / sample_rate
    } else {
        0.0
    }
}

/// Flush a single value to zero when it is small enough to go subnormal.
///
/// Subnormal floats slow most CPUs down by one to two orders of magnitude.
/// Use inside feedback loops (combs, delays, allpasses) where a decaying
/// signal would otherwise crawl through the subnormal range.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Crossfade dry and wet: `dry + (wet - dry) * mix`.
#[inline]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    dry + (wet - dry) * mix
}

/// Equal-power pan gains for a position in `[-1, 1]`.
#[inline]
pub fn pan_gains(position: f32) -> (f32, f32) {
    let p = (position.clamp(-1.0, 1.0) + 1.0) * 0.25 * core::f32::consts::PI;
    (libm::cosf(p), libm::sinf(p))
}

/// One-pole coefficient for a time constant given in milliseconds.
#[inline]
pub fn time_coeff(ms: f32, sample_rate: f32) -> f32 {
    expf(-1.0 / (ms.max(0.01) * 0.001 * sample_rate))
}
