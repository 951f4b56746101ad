//! Deferred engine destruction.
//!
//! Dropping an engine frees delay lines and FFT plans — heap work that has
//! no business on the audio thread. Displaced engines travel over a
//! channel to a reclaim thread, which is the only place their destructors
//! run.

use crossbeam_channel::{Receiver, Sender};
use sextet_core::Engine;
use std::thread::JoinHandle;

/// Audio-side sender that never blocks and never drops on failure paths
/// it can avoid.
pub struct ReclaimSender {
    tx: Sender<Box<dyn Engine + Send>>,
}

impl ReclaimSender {
    pub(crate) fn new(tx: Sender<Box<dyn Engine + Send>>) -> Self {
        Self { tx }
    }

    /// Hand an engine to the reclaim thread.
    ///
    /// If the receiver is gone the engine is dropped here; that only
    /// happens during teardown, when the audio thread is no longer under a
    /// deadline.
    pub(crate) fn send(&self, engine: Box<dyn Engine + Send>) {
        if let Err(returned) = self.tx.send(engine) {
            drop(returned.0);
        }
    }
}

/// Spawn a thread that drains the reclaim queue until the chain drops.
pub fn spawn_reclaim(rx: Receiver<Box<dyn Engine + Send>>) -> JoinHandle<usize> {
    std::thread::Builder::new()
        .name("sextet-reclaim".into())
        .spawn(move || {
            let mut reclaimed = 0usize;
            while let Ok(engine) = rx.recv() {
                tracing::debug!(name = engine.name(), "reclaiming engine");
                drop(engine);
                reclaimed += 1;
            }
            reclaimed
        })
        .expect("spawn reclaim thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn reclaim_thread_drains_and_counts() {
        let (tx, rx) = unbounded();
        let handle = spawn_reclaim(rx);
        let sender = ReclaimSender::new(tx);
        for _ in 0..5 {
            sender.send(sextet_registry::create_raw(0, 48000.0));
        }
        drop(sender);
        assert_eq!(handle.join().unwrap(), 5);
    }
}
