//! Level crossing: move a slowly-changing value between domains
//!
//! A level carries no events; only its current value matters. The receiver
//! passes each sample through a [`MultiReg`] and always reads the most
//! recently settled value. There is no change detection and no handshake,
//! which is exactly why this is only suitable for status and configuration
//! bits that change rarely relative to the crossing latency. A value that
//! changes faster than the receiver samples is skipped, by design.
//!
//! The whole 32-bit word crosses atomically in this model, so the per-bit
//! skew a hardware multi-bit crossing can glitch through does not arise
//! here; the latency contract is the same.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::synchro::MultiReg;
use crate::wire::Wire32;
use crate::DEFAULT_STAGES;

/// Shared state for one level crossing. Split exactly once.
pub struct LevelCrossing {
    value: Wire32,
    taken: AtomicBool,
}

impl LevelCrossing {
    /// Create a crossing whose initial settled value is `reset`.
    pub const fn new(reset: u32) -> Self {
        LevelCrossing {
            value: Wire32::new(reset),
            taken: AtomicBool::new(false),
        }
    }

    /// Split into sender and receiver halves with the default synchronizer
    /// depth. Returns `None` if the crossing was already split.
    pub fn split(&self) -> Option<(LevelSender<'_>, LevelReceiver<'_>)> {
        self.split_stages()
    }

    /// Split for two domains that share a clock: the receiver reads the
    /// sender's value directly.
    pub fn split_sync(&self) -> Option<(LevelSender<'_>, LevelReceiver<'_, 0>)> {
        self.split_stages()
    }

    /// Split with an explicit synchronizer depth.
    pub fn split_stages<const STAGES: usize>(
        &self,
    ) -> Option<(LevelSender<'_>, LevelReceiver<'_, STAGES>)> {
        (!self.taken.fetch_or(true, Ordering::SeqCst)).then(|| {
            let reset = self.value.read();
            (
                LevelSender { value: &self.value },
                LevelReceiver {
                    value: &self.value,
                    sync: MultiReg::new(reset),
                },
            )
        })
    }
}

/// The writing half of a level crossing. Lives in the source domain.
pub struct LevelSender<'a> {
    value: &'a Wire32,
}

impl LevelSender<'_> {
    /// Publish a new level. Takes effect at the receiver after its
    /// synchronizer delay.
    pub fn set(&mut self, value: u32) {
        self.value.write(value);
    }
}

/// The reading half of a level crossing. Lives in the destination domain.
pub struct LevelReceiver<'a, const STAGES: usize = DEFAULT_STAGES> {
    value: &'a Wire32,
    sync: MultiReg<u32, STAGES>,
}

impl<const STAGES: usize> LevelReceiver<'_, STAGES> {
    /// Advance one destination-domain clock edge; returns the settled value.
    pub fn tick(&mut self) -> u32 {
        self.sync.tick(self.value.read())
    }
}

#[cfg(test)]
mod test {
    use super::LevelCrossing;

    #[test]
    fn split_once() {
        let crossing = LevelCrossing::new(0);
        assert!(crossing.split().is_some());
        assert!(crossing.split().is_none());
    }

    #[test]
    fn reset_value_reads_back_before_any_write() {
        let crossing = LevelCrossing::new(0b11);
        let (_tx, mut rx) = crossing.split().unwrap();
        assert_eq!(rx.tick(), 0b11);
    }

    #[test]
    fn new_value_settles_after_stages() {
        let crossing = LevelCrossing::new(0);
        let (mut tx, mut rx) = crossing.split().unwrap();

        tx.set(0xA5);
        assert_eq!(rx.tick(), 0);
        assert_eq!(rx.tick(), 0xA5);
        assert_eq!(rx.tick(), 0xA5);
    }

    #[test]
    fn receiver_reads_the_latest_settled_value() {
        let crossing = LevelCrossing::new(0);
        let (mut tx, mut rx) = crossing.split().unwrap();

        // Fast flapping can be skipped; the final value always lands.
        tx.set(1);
        tx.set(2);
        tx.set(3);
        for _ in 0..4 {
            rx.tick();
        }
        assert_eq!(rx.tick(), 3);
    }

    #[test]
    fn zero_stage_split_reads_through() {
        let crossing = LevelCrossing::new(0);
        let (mut tx, mut rx) = crossing.split_sync().unwrap();
        tx.set(9);
        assert_eq!(rx.tick(), 9);
    }
}
