//! Request/acknowledge bus bridge
//!
//! Carries a register-bus transaction from an initiating domain into a
//! target domain and returns the acknowledge and read-data, with exactly one
//! transaction in flight at a time.
//!
//! The address, write-data and write-enable fields do not get a synchronizer
//! each; that would be slow, and worse, the bits could settle on different
//! edges. Instead the initiator copies the whole [`BusRequest`] into the
//! crossing wires once and then leaves them alone until the acknowledge
//! comes back, so the target can read them directly any time after the
//! single-bit request toggle has settled. The same argument covers the
//! read-data path in reverse: the target captures read-data into a holding
//! wire at the moment it acknowledges and does not touch it again until the
//! next request, so the settled acknowledge toggle is all the initiator
//! needs to read the word safely.
//!
//! There is no timeout and no retry. A target that never responds holds the
//! initiator busy forever; keeping the far domain live is the caller's
//! responsibility.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::synchro::MultiReg;
use crate::wire::{BitWire, Wire32};
use crate::{Error, DEFAULT_STAGES};

#[cfg(feature = "defmt-03")]
use defmt_03 as defmt;

/// One bus transaction request.
///
/// Construct it as a single value at request time; the bridge copies it into
/// the crossing wires exactly once. The "fields stay stable until
/// acknowledge" requirement of the handshake is therefore met by
/// construction rather than by discipline.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt_03::Format))]
pub struct BusRequest {
    /// Within-channel register offset.
    pub addr: u16,
    /// Write data. Ignored by the target on reads.
    pub wdata: u32,
    /// Write enable.
    pub we: bool,
}

impl BusRequest {
    /// A read of `addr`.
    pub const fn read(addr: u16) -> Self {
        BusRequest {
            addr,
            wdata: 0,
            we: false,
        }
    }

    /// A write of `wdata` to `addr`.
    pub const fn write(addr: u16, wdata: u32) -> Self {
        BusRequest {
            addr,
            wdata,
            we: true,
        }
    }
}

/// Shared state for one bus bridge. Split exactly once.
pub struct BusBridge {
    addr: Wire32,
    wdata: Wire32,
    we: BitWire,
    rdata: Wire32,
    req: BitWire,
    ack: BitWire,
    taken: AtomicBool,
}

impl BusBridge {
    pub const fn new() -> Self {
        BusBridge {
            addr: Wire32::new(0),
            wdata: Wire32::new(0),
            we: BitWire::new(false),
            rdata: Wire32::new(0),
            req: BitWire::new(false),
            ack: BitWire::new(false),
            taken: AtomicBool::new(false),
        }
    }

    /// Split into initiator and target halves with the default synchronizer
    /// depth. Returns `None` if the bridge was already split.
    pub fn split(&self) -> Option<(BusInitiator<'_>, BusTarget<'_>)> {
        self.split_stages()
    }

    /// Split for two domains that share a clock.
    ///
    /// No synchronizer stages: a transaction ticked through the target and
    /// then the initiator completes within the same shared cycle. This is an
    /// explicit mode; the caller guarantees the shared clock.
    pub fn split_sync(&self) -> Option<(BusInitiator<'_, 0>, BusTarget<'_, 0>)> {
        self.split_stages()
    }

    /// Split with an explicit synchronizer depth.
    pub fn split_stages<const STAGES: usize>(
        &self,
    ) -> Option<(BusInitiator<'_, STAGES>, BusTarget<'_, STAGES>)> {
        (!self.taken.fetch_or(true, Ordering::SeqCst)).then(|| {
            (
                BusInitiator {
                    bridge: self,
                    req_state: false,
                    ack_sync: MultiReg::new(false),
                    ack_prev: false,
                    pending: false,
                },
                BusTarget {
                    bridge: self,
                    req_sync: MultiReg::new(false),
                    req_prev: false,
                    ack_state: false,
                    cycle: false,
                },
            )
        })
    }
}

/// The initiating half of a bus bridge. Lives in the initiator's domain.
pub struct BusInitiator<'a, const STAGES: usize = DEFAULT_STAGES> {
    bridge: &'a BusBridge,
    req_state: bool,
    ack_sync: MultiReg<bool, STAGES>,
    ack_prev: bool,
    pending: bool,
}

impl<const STAGES: usize> BusInitiator<'_, STAGES> {
    /// Issue a transaction.
    ///
    /// Refuses with [`Error::WouldBlock`] while a previous transaction is
    /// outstanding; at most one is ever in flight. On success, poll
    /// [`tick()`](Self::tick) for the completion.
    pub fn request(&mut self, req: BusRequest) -> Result<(), Error> {
        if self.pending {
            return Err(Error::WouldBlock);
        }
        self.bridge.addr.write(req.addr.into());
        self.bridge.wdata.write(req.wdata);
        self.bridge.we.write(req.we);
        // Fields are now held; only the toggle crosses from here on.
        self.req_state = !self.req_state;
        self.bridge.req.write(self.req_state);
        self.pending = true;
        debug!("BUS REQ {:#06x} we={}", req.addr, req.we);
        Ok(())
    }

    /// Advance one initiator-domain clock edge.
    ///
    /// Returns the read-data exactly once, on the edge where the
    /// acknowledge becomes visible. For writes the returned word is
    /// whatever the target captured; callers normally discard it.
    pub fn tick(&mut self) -> Option<u32> {
        let settled = self.ack_sync.tick(self.bridge.ack.read());
        let fired = settled != self.ack_prev;
        self.ack_prev = settled;
        if fired && !self.pending {
            warn!("bus ack with no transaction pending");
        }
        (fired && self.pending).then(|| {
            self.pending = false;
            self.bridge.rdata.read()
        })
    }

    /// Indicates if a transaction is outstanding.
    pub fn is_busy(&self) -> bool {
        self.pending
    }
}

/// The responding half of a bus bridge. Lives in the target's domain.
pub struct BusTarget<'a, const STAGES: usize = DEFAULT_STAGES> {
    bridge: &'a BusBridge,
    req_sync: MultiReg<bool, STAGES>,
    req_prev: bool,
    ack_state: bool,
    cycle: bool,
}

impl<const STAGES: usize> BusTarget<'_, STAGES> {
    /// Advance one target-domain clock edge.
    ///
    /// A settled request toggle raises an internal cycle flag; while it is
    /// held, every tick returns the pending request. The flag only drops
    /// when the target [`respond`](Self::respond)s, so a request can never
    /// be missed by slow polling.
    pub fn tick(&mut self) -> Option<BusRequest> {
        let settled = self.req_sync.tick(self.bridge.req.read());
        if settled != self.req_prev {
            self.req_prev = settled;
            self.cycle = true;
            trace!("BUS CYC");
        }
        self.cycle.then(|| BusRequest {
            addr: self.bridge.addr.read() as u16,
            wdata: self.bridge.wdata.read(),
            we: self.bridge.we.read(),
        })
    }

    /// Complete the pending transaction.
    ///
    /// Captures `rdata` into the holding wire (held there until the next
    /// request) and toggles the acknowledge back to the initiator. Must only
    /// be called while a cycle is pending.
    pub fn respond(&mut self, rdata: u32) {
        debug_assert!(self.cycle, "respond() without a pending bus cycle");
        self.bridge.rdata.write(rdata);
        self.cycle = false;
        self.ack_state = !self.ack_state;
        self.bridge.ack.write(self.ack_state);
    }
}
