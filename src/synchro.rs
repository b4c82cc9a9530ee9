//! Multi-stage synchronizer registers
//!
//! A [`MultiReg`] is the domain-local half of every crossing in this crate:
//! a chain of `STAGES` registers that a foreign signal passes through before
//! the local domain is allowed to act on it. In hardware the chain gives a
//! metastable sample time to resolve; in this model it reproduces the same
//! latency and sampling behavior, so code written against it keeps the
//! contracts that the hardware version would enforce.
//!
//! `STAGES == 0` collapses the chain to a plain wire. That is the
//! synchronous fast path: when both domains provably share a clock, the
//! crossing adds no latency at all.

use crate::DEFAULT_STAGES;

/// A shift register of `STAGES` flip-flops.
///
/// One `tick` is one clock edge in the owning domain: the first stage
/// samples `input`, every later stage takes its predecessor's value, and
/// the new settled output (the last stage) is returned. A change on `input`
/// reaches the output after `STAGES` edges.
pub struct MultiReg<T, const STAGES: usize = DEFAULT_STAGES> {
    stages: [T; STAGES],
}

impl<T: Copy, const STAGES: usize> MultiReg<T, STAGES> {
    /// Create a synchronizer with every stage holding `reset`.
    pub fn new(reset: T) -> Self {
        MultiReg {
            stages: [reset; STAGES],
        }
    }

    /// Advance one clock edge, sampling `input`. Returns the settled output.
    pub fn tick(&mut self, input: T) -> T {
        if STAGES == 0 {
            // Just wires
            return input;
        }
        self.stages.copy_within(..STAGES - 1, 1);
        self.stages[0] = input;
        self.stages[STAGES - 1]
    }
}

#[cfg(test)]
mod test {
    use super::MultiReg;

    #[test]
    fn change_settles_after_stages() {
        let mut sync: MultiReg<bool, 2> = MultiReg::new(false);
        assert!(!sync.tick(true));
        assert!(sync.tick(true));
        assert!(sync.tick(true));
    }

    #[test]
    fn three_stages() {
        let mut sync: MultiReg<u32, 3> = MultiReg::new(0);
        assert_eq!(sync.tick(7), 0);
        assert_eq!(sync.tick(7), 0);
        assert_eq!(sync.tick(7), 7);
    }

    #[test]
    fn zero_stages_is_a_wire() {
        let mut sync: MultiReg<u32, 0> = MultiReg::new(0);
        assert_eq!(sync.tick(0xDEAD), 0xDEAD);
        assert_eq!(sync.tick(0xBEEF), 0xBEEF);
    }

    #[test]
    fn samples_come_out_in_order() {
        let mut sync: MultiReg<u32, 2> = MultiReg::new(0);
        sync.tick(1);
        assert_eq!(sync.tick(2), 1);
        assert_eq!(sync.tick(2), 2);
    }
}
