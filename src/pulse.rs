//! Pulse crossing: move a single-cycle event between domains, exactly once
//!
//! A strobe cannot cross a clock boundary directly: the destination may
//! sample right past it (loss) or catch it twice (duplication). The crossing
//! here sends a *toggle* instead. Each event flips a single bit; the
//! destination passes that bit through a [`MultiReg`] and emits a strobe
//! whenever the settled value differs from the last one it saw. Only one bit
//! ever crosses, so metastability cannot corrupt the payload, and the edge
//! reconstruction cannot miss a settled transition.
//!
//! ```
//! use xclk::pulse::PulseCrossing;
//!
//! static CROSSING: PulseCrossing = PulseCrossing::new();
//!
//! let (mut tx, mut rx) = CROSSING.split().unwrap();
//! tx.pulse();
//! let seen = (0..4).filter(|_| rx.tick()).count();
//! assert_eq!(seen, 1);
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

use crate::synchro::MultiReg;
use crate::wire::BitWire;
use crate::DEFAULT_STAGES;

/// Shared state for one pulse crossing.
///
/// Allocate one (typically as a `static`), then [`split()`](Self::split) it
/// into the sending and receiving halves. The state can be split exactly
/// once.
pub struct PulseCrossing {
    toggle: BitWire,
    taken: AtomicBool,
}

impl PulseCrossing {
    pub const fn new() -> Self {
        PulseCrossing {
            toggle: BitWire::new(false),
            taken: AtomicBool::new(false),
        }
    }

    /// Split into sender and receiver halves with the default synchronizer
    /// depth.
    ///
    /// Returns `None` if the crossing was already split.
    pub fn split(&self) -> Option<(PulseSender<'_>, PulseReceiver<'_>)> {
        self.split_stages()
    }

    /// Split for two domains that share a clock: no synchronizer stages,
    /// no added latency. The caller asserts the shared clock; nothing
    /// checks it.
    pub fn split_sync(&self) -> Option<(PulseSender<'_>, PulseReceiver<'_, 0>)> {
        self.split_stages()
    }

    /// Split with an explicit synchronizer depth.
    pub fn split_stages<const STAGES: usize>(
        &self,
    ) -> Option<(PulseSender<'_>, PulseReceiver<'_, STAGES>)> {
        (!self.taken.fetch_or(true, Ordering::SeqCst)).then(|| {
            (
                PulseSender {
                    toggle: &self.toggle,
                    state: false,
                },
                PulseReceiver {
                    toggle: &self.toggle,
                    sync: MultiReg::new(false),
                    prev: false,
                },
            )
        })
    }
}

/// The sending half of a pulse crossing. Lives in the source domain.
pub struct PulseSender<'a> {
    toggle: &'a BitWire,
    state: bool,
}

impl PulseSender<'_> {
    /// Raise one event.
    ///
    /// The receiver observes it exactly once, after its synchronizer delay.
    /// Events raised closer together than that delay coalesce: the receiver
    /// sees at most one event for the pair. Callers that cannot tolerate
    /// coalescing must space their pulses by the crossing latency; this
    /// primitive does not serialize overlapping raises.
    pub fn pulse(&mut self) {
        self.state = !self.state;
        self.toggle.write(self.state);
    }
}

/// The receiving half of a pulse crossing. Lives in the destination domain.
pub struct PulseReceiver<'a, const STAGES: usize = DEFAULT_STAGES> {
    toggle: &'a BitWire,
    sync: MultiReg<bool, STAGES>,
    prev: bool,
}

impl<const STAGES: usize> PulseReceiver<'_, STAGES> {
    /// Advance one destination-domain clock edge.
    ///
    /// Returns `true` on the edge where a crossed event becomes visible.
    pub fn tick(&mut self) -> bool {
        let settled = self.sync.tick(self.toggle.read());
        let fired = settled != self.prev;
        self.prev = settled;
        fired
    }
}
