//! Sextet Chain — the six-slot serial effect host.
//!
//! Audio flows `input → slot 1 → … → slot 6 → output`, each slot wrapping
//! its engine in a per-sample-smoothed dry/wet mix and an independent
//! bypass. Control flows the other way: a cloneable [`ChainHandle`]
//! constructs engines off-thread and ships them (and parameter batches)
//! to the audio side over a lock-free channel; displaced engines leave
//! through the reclaim channel and die on the reclaim thread.
//!
//! ```rust
//! use sextet_chain::{chain, spawn_reclaim};
//! use sextet_registry::EngineId;
//!
//! let (mut chain, handle, reclaim_rx) = chain(48000.0);
//! let reclaim_thread = spawn_reclaim(reclaim_rx);
//!
//! chain.prepare(48000.0, 512);
//! handle.install_engine(0, EngineId::new(39).unwrap()).unwrap(); // Plate Reverb
//! handle.set_mix(0, 0.3).unwrap();
//!
//! let mut left = vec![0.0f32; 512];
//! let mut right = vec![0.0f32; 512];
//! chain.process_block(&mut left, &mut right);
//! # drop(handle); drop(chain); let _ = reclaim_thread.join();
//! ```

pub mod chain;
pub mod meter;
pub mod reclaim;

pub use chain::{Chain, ChainError, ChainHandle, ChainShared, SLOT_COUNT, SlotCommand, chain};
pub use meter::{Meter, MeterOutput};
pub use reclaim::spawn_reclaim;
