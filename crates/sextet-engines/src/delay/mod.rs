//! Delay engines.
//!
//! Family contract: delay time maps exponentially over `1..5000 ms` (or
//! the unit's mechanical subset), the repeat-path feedback is hard-limited
//! at 0.95 regardless of the normalized setting, and mix at 0 returns the
//! dry signal untouched.

pub mod bbd;
pub mod digital;
pub mod drum;
pub mod repeat;
pub mod tape;

pub use bbd::BucketBrigadeDelay;
pub use digital::DigitalDelay;
pub use drum::MagneticDrumEcho;
pub use repeat::BufferRepeat;
pub use tape::TapeEcho;
