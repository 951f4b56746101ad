//! Scoped flush-to-zero floating-point mode.
//!
//! Subnormal ("denormal") floats are handled in microcode on mainstream
//! CPUs, costing 10–100× a normal multiply. Reverb tails and feedback loops
//! decay straight through the subnormal range, so a chain that forgets to
//! flush them misses real-time deadlines under exactly the conditions that
//! are hardest to reproduce.
//!
//! [`DenormalGuard`] sets the FTZ (flush-to-zero) and DAZ (denormals-are-
//! zero) bits of the SSE control register for its lifetime and restores the
//! previous state on drop, on every exit path. Guards nest: each one
//! restores whatever mode it observed. On targets without an equivalent
//! mode the guard is a no-op and the per-sample
//! [`flush_denormal`](crate::math::flush_denormal) in feedback loops carries
//! the load alone.

// The one place in the workspace that must touch the FPU control register.
#![allow(unsafe_code)]

/// RAII guard holding the CPU in flush-to-zero / denormals-are-zero mode.
///
/// ```rust
/// use sextet_core::DenormalGuard;
///
/// let _guard = DenormalGuard::new();
/// // ... process a block ...
/// // prior FP mode restored when `_guard` drops
/// ```
#[derive(Debug)]
pub struct DenormalGuard {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    saved_mxcsr: u32,
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl DenormalGuard {
    /// FTZ (bit 15) and DAZ (bit 6) of MXCSR.
    const FTZ_DAZ: u32 = (1 << 15) | (1 << 6);

    /// Enter flush-to-zero mode, remembering the current MXCSR.
    pub fn new() -> Self {
        #[cfg(target_arch = "x86")]
        use core::arch::x86::{_mm_getcsr, _mm_setcsr};
        #[cfg(target_arch = "x86_64")]
        use core::arch::x86_64::{_mm_getcsr, _mm_setcsr};

        // SAFETY: reading and writing MXCSR only changes rounding/flush
        // behaviour of subsequent SSE math on this thread; the saved value is
        // restored on drop.
        let saved_mxcsr = unsafe {
            let saved = _mm_getcsr();
            _mm_setcsr(saved | Self::FTZ_DAZ);
            saved
        };
        Self { saved_mxcsr }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl Drop for DenormalGuard {
    fn drop(&mut self) {
        #[cfg(target_arch = "x86")]
        use core::arch::x86::_mm_setcsr;
        #[cfg(target_arch = "x86_64")]
        use core::arch::x86_64::_mm_setcsr;

        // SAFETY: restores the exact mode observed in `new`.
        unsafe {
            _mm_setcsr(self.saved_mxcsr);
        }
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
impl DenormalGuard {
    /// No hardware flush mode on this target; the guard is inert.
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for DenormalGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_constructs_and_drops() {
        let guard = DenormalGuard::new();
        drop(guard);
    }

    #[test]
    fn guards_nest() {
        let outer = DenormalGuard::new();
        {
            let _inner = DenormalGuard::new();
        }
        drop(outer);
    }

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    #[test]
    fn subnormal_arithmetic_flushes_inside_guard() {
        let _guard = DenormalGuard::new();
        let tiny = f32::MIN_POSITIVE; // smallest normal
        // Dividing the smallest normal by 2 lands in the subnormal range;
        // with FTZ set the result must flush to zero.
        let result = core::hint::black_box(tiny) / core::hint::black_box(2.0f32);
        assert_eq!(result, 0.0);
    }
}
