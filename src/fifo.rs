//! Elastic buffers
//!
//! A [`Fifo`] is a domain-local ring of 9-bit entries (a data byte plus the
//! end-of-record marker) that decouples a producer or consumer from the
//! crossing's handshake latency. `writable`/`readable` gate traffic at full
//! domain speed; the crossing behind the FIFO then only ever moves
//! FIFO-to-FIFO traffic, amortizing the per-item round trip over a burst.
//!
//! A full FIFO backpressures; nothing is ever dropped and there is no
//! overflow path. Depth trades memory for sustained throughput under
//! crossing latency.

use crate::stream::StreamItem;
use crate::Error;

/// A fixed-depth FIFO of stream items.
pub struct Fifo<const DEPTH: usize> {
    entries: [StreamItem; DEPTH],
    read_at: usize,
    len: usize,
}

impl<const DEPTH: usize> Fifo<DEPTH> {
    const EMPTY: StreamItem = StreamItem::new(0, false);

    pub const fn new() -> Self {
        Fifo {
            entries: [Self::EMPTY; DEPTH],
            read_at: 0,
            len: 0,
        }
    }

    /// Indicates if there is room for another item.
    pub fn is_writable(&self) -> bool {
        self.len < DEPTH
    }

    /// Indicates if there is an item to read.
    pub fn is_readable(&self) -> bool {
        self.len > 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        DEPTH
    }

    /// Append an item, or refuse with [`Error::WouldBlock`] when full.
    pub fn push(&mut self, item: StreamItem) -> Result<(), Error> {
        if !self.is_writable() {
            return Err(Error::WouldBlock);
        }
        self.entries[(self.read_at + self.len) % DEPTH] = item;
        self.len += 1;
        Ok(())
    }

    /// Take the oldest item.
    pub fn pop(&mut self) -> Option<StreamItem> {
        let item = self.peek()?;
        self.read_at = (self.read_at + 1) % DEPTH;
        self.len -= 1;
        Some(item)
    }

    /// The oldest item, without consuming it.
    ///
    /// This is what a crossing source gets offered on every tick until it
    /// accepts; only then does the item come off with [`pop`](Self::pop).
    pub fn peek(&self) -> Option<StreamItem> {
        self.is_readable().then(|| self.entries[self.read_at])
    }

    pub fn clear(&mut self) {
        self.read_at = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod test {
    use super::Fifo;
    use crate::stream::StreamItem;
    use crate::Error;

    #[test]
    fn fill_then_drain_in_order() {
        let mut fifo: Fifo<4> = Fifo::new();
        assert!(fifo.is_empty());
        assert!(!fifo.is_readable());

        for i in 0..4 {
            fifo.push(StreamItem::new(i, i == 3)).unwrap();
        }
        assert!(!fifo.is_writable());
        assert_eq!(fifo.len(), 4);

        for i in 0..4 {
            assert_eq!(fifo.pop(), Some(StreamItem::new(i, i == 3)));
        }
        assert_eq!(fifo.pop(), None);
    }

    #[test]
    fn full_fifo_backpressures_without_dropping() {
        let mut fifo: Fifo<2> = Fifo::new();
        fifo.push(StreamItem::new(1, false)).unwrap();
        fifo.push(StreamItem::new(2, false)).unwrap();

        assert_eq!(fifo.push(StreamItem::new(3, false)), Err(Error::WouldBlock));

        // The refused push changed nothing.
        assert_eq!(fifo.pop(), Some(StreamItem::new(1, false)));
        assert_eq!(fifo.pop(), Some(StreamItem::new(2, false)));
        assert_eq!(fifo.pop(), None);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut fifo: Fifo<4> = Fifo::new();
        fifo.push(StreamItem::new(9, true)).unwrap();

        assert_eq!(fifo.peek(), Some(StreamItem::new(9, true)));
        assert_eq!(fifo.peek(), Some(StreamItem::new(9, true)));
        assert_eq!(fifo.len(), 1);
        assert_eq!(fifo.pop(), Some(StreamItem::new(9, true)));
        assert_eq!(fifo.peek(), None);
    }

    #[test]
    fn wraparound_keeps_order() {
        let mut fifo: Fifo<3> = Fifo::new();
        for round in 0u8..10 {
            fifo.push(StreamItem::new(round, false)).unwrap();
            fifo.push(StreamItem::new(round.wrapping_add(100), false)).unwrap();
            assert_eq!(fifo.pop(), Some(StreamItem::new(round, false)));
            assert_eq!(
                fifo.pop(),
                Some(StreamItem::new(round.wrapping_add(100), false))
            );
        }
        assert!(fifo.is_empty());
    }

    #[test]
    fn clear_resets() {
        let mut fifo: Fifo<2> = Fifo::new();
        fifo.push(StreamItem::new(1, false)).unwrap();
        fifo.clear();
        assert!(fifo.is_empty());
        assert!(fifo.is_writable());
        assert_eq!(fifo.pop(), None);
    }
}
