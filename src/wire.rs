//! Single-writer wires that span a domain boundary
//!
//! A wire is the only thing two domains ever share. Exactly one side of a
//! crossing writes a given wire; the other side only samples it, and only
//! acts on the sample after its synchronizer says the value has settled.
//! The crossing primitives uphold that split by construction: each split
//! handle carries the write path for its own wires and read paths for the
//! peer's.
//!
//! Sequentially-consistent ordering keeps a wire write visible before the
//! handshake bit that announces it, which is what makes the "held stable,
//! gated by a single bit" pattern sound.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// A one-bit wire.
#[repr(transparent)]
pub struct BitWire(AtomicBool);

impl BitWire {
    pub const fn new(val: bool) -> Self {
        BitWire(AtomicBool::new(val))
    }
    pub fn read(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
    pub fn write(&self, val: bool) {
        self.0.store(val, Ordering::SeqCst)
    }
}

/// A 32-bit wire.
#[repr(transparent)]
pub struct Wire32(AtomicU32);

impl Wire32 {
    pub const fn new(val: u32) -> Self {
        Wire32(AtomicU32::new(val))
    }
    pub fn read(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
    pub fn write(&self, val: u32) {
        self.0.store(val, Ordering::SeqCst)
    }
}
