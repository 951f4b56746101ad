//! Normalized-to-musical parameter mapping curves.
//!
//! Engines receive every parameter as a normalized value in `[0.0, 1.0]` and
//! map it to an internal musical range. The curve choice matters as much as
//! the range: frequencies and times are perceived logarithmically, so they
//! use an exponential map; gains are specified in dB and converted to linear
//! at the end; pan-like controls are bipolar around a centre.
//!
//! All functions clamp their normalized input first, so engines can feed
//! them raw values without a separate guard.

use crate::math::db_to_linear;
use libm::powf;

/// Clamp a normalized value to `[0, 1]`.
#[inline]
pub fn unit(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Linear map onto `[lo, hi]`.
#[inline]
pub fn linear(v: f32, lo: f32, hi: f32) -> f32 {
    lo + unit(v) * (hi - lo)
}

/// Exponential map onto `[lo, hi]`; requires `lo > 0`.
///
/// Equal normalized steps correspond to equal ratios, which matches pitch
/// and time perception. Use for frequencies (`20..20_000 Hz`), LFO rates
/// (`0.01..20 Hz`), and delay/decay times.
#[inline]
pub fn exponential(v: f32, lo: f32, hi: f32) -> f32 {
    lo * powf(hi / lo, unit(v))
}

/// Map onto a dB range, returned in dB.
#[inline]
pub fn db(v: f32, lo_db: f32, hi_db: f32) -> f32 {
    linear(v, lo_db, hi_db)
}

/// Map onto a dB range, returned as linear gain.
#[inline]
pub fn db_gain(v: f32, lo_db: f32, hi_db: f32) -> f32 {
    db_to_linear(linear(v, lo_db, hi_db))
}

/// Bipolar map onto `[-1, 1]`, centre at 0.5.
#[inline]
pub fn bipolar(v: f32) -> f32 {
    unit(v) * 2.0 - 1.0
}

/// Quantize onto one of `count` discrete steps, returned as an index.
///
/// `count` must be at least 1; the top of the range maps to `count - 1`.
#[inline]
pub fn stepped(v: f32, count: usize) -> usize {
    debug_assert!(count >= 1);
    let idx = (unit(v) * count as f32) as usize;
    idx.min(count - 1)
}

/// Recover a normalized value from a linear-mapped one. Inverse of [`linear`].
#[inline]
pub fn linear_inv(value: f32, lo: f32, hi: f32) -> f32 {
    if (hi - lo).abs() < f32::EPSILON {
        0.0
    } else {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

/// Recover a normalized value from an exponential-mapped one. Inverse of
/// [`exponential`].
#[inline]
pub fn exponential_inv(value: f32, lo: f32, hi: f32) -> f32 {
    if lo <= 0.0 || value <= 0.0 {
        return 0.0;
    }
    (libm::logf(value / lo) / libm::logf(hi / lo)).clamp(0.0, 1.0)
}
