//! Clock-domain crossing primitives for independently-clocked state machines
//!
//! `xclk` models the signals that may safely cross between two execution
//! domains that share no common time base: single-shot event pulses, slowly
//! changing status levels, register-bus transactions, and flow-controlled
//! byte streams. Each primitive is a shareable state object that splits into
//! two domain-side handles; a domain advances by calling `tick()` on its
//! handle, one call per clock edge. Handles are `Send`, so the two domains
//! may be two threads, or two interleaved loops driven by a simulator.
//!
//! Every register that crosses the boundary is written by exactly one side
//! and read by the other only after a synchronizer confirms the value has
//! settled. That single-writer discipline replaces locking; there are no
//! mutexes and no blocking calls anywhere in this crate.
//!
//! See each module for the primitive's contract. The [`channel`] module
//! composes the primitives into a buffered, bidirectional channel between a
//! "system" domain and a "device" domain.

#![no_std]

#[macro_use]
mod log;

#[cfg(feature = "defmt-03")]
use defmt_03 as defmt;

mod wire;

pub mod bridge;
pub mod channel;
pub mod fifo;
pub mod level;
pub mod pulse;
pub mod stream;
pub mod synchro;

/// Default number of synchronizer stages for a crossing.
///
/// Two registers is the conventional minimum for metastability hardening.
pub const DEFAULT_STAGES: usize = 2;

/// The error type for non-blocking operations.
///
/// Nothing in this crate waits. An operation that cannot make progress
/// right now refuses with `WouldBlock`; the caller retries on a later tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt_03::Format))]
pub enum Error {
    /// The primitive cannot accept this operation until an in-flight
    /// handshake completes, or until downstream drains.
    WouldBlock,
}
