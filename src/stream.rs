//! Byte-stream crossing: flow-controlled items across a domain boundary
//!
//! Moves one item at a time (a byte plus an end-of-record marker) from a
//! ready/valid interface in the source domain to a ready/valid interface in
//! the destination domain. Order is preserved, nothing is lost, nothing is
//! duplicated, at any relative clock rate.
//!
//! The handshake holds a `send` level while an item is in flight and an
//! `ack` level while the destination is working it off; both levels cross
//! through multi-stage synchronizers and the far side reacts to their
//! *edges*. The source only re-asserts `ready` to its producer after the
//! acknowledge round trip, so a second item can never overwrite one whose
//! acceptance is unconfirmed. The payload wire itself needs no synchronizer:
//! it is written before `send` rises and not touched again until the
//! acknowledge confirms the destination latched it.
//!
//! At most one item is ever in flight, so sustained throughput is bounded by
//! the handshake round trip, not by either clock. Wrap the endpoints in
//! [`Fifo`](crate::fifo::Fifo)s (see [`channel`](crate::channel)) to amortize
//! that cost over bursts.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::synchro::MultiReg;
use crate::wire::{BitWire, Wire32};
use crate::DEFAULT_STAGES;

#[cfg(feature = "defmt-03")]
use defmt_03 as defmt;

/// One stream item: a data byte plus an end-of-record marker.
///
/// On the crossing wire and in the FIFOs this is a 9-bit quantity, eight
/// data bits and the marker.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt_03::Format))]
pub struct StreamItem {
    pub data: u8,
    pub last: bool,
}

impl StreamItem {
    const LAST: u32 = 1 << 8;

    pub const fn new(data: u8, last: bool) -> Self {
        StreamItem { data, last }
    }

    pub(crate) fn to_bits(self) -> u32 {
        u32::from(self.data) | if self.last { Self::LAST } else { 0 }
    }

    pub(crate) fn from_bits(bits: u32) -> Self {
        StreamItem {
            data: bits as u8,
            last: bits & Self::LAST != 0,
        }
    }
}

/// Shared state for one byte-stream crossing. Split exactly once.
pub struct StreamCrossing {
    payload: Wire32,
    send: BitWire,
    ack: BitWire,
    taken: AtomicBool,
}

impl StreamCrossing {
    pub const fn new() -> Self {
        StreamCrossing {
            payload: Wire32::new(0),
            send: BitWire::new(false),
            ack: BitWire::new(false),
            taken: AtomicBool::new(false),
        }
    }

    /// Split into source and sink halves with the default synchronizer
    /// depth. Returns `None` if the crossing was already split.
    pub fn split(&self) -> Option<(StreamSource<'_>, StreamSink<'_>)> {
        self.split_stages()
    }

    /// Split for two domains that share a clock: no synchronizer stages.
    ///
    /// The ready/valid contract and the one-item-in-flight sequencing are
    /// unchanged; only the synchronizer latency disappears.
    pub fn split_sync(&self) -> Option<(StreamSource<'_, 0>, StreamSink<'_, 0>)> {
        self.split_stages()
    }

    /// Split with an explicit synchronizer depth.
    pub fn split_stages<const STAGES: usize>(
        &self,
    ) -> Option<(StreamSource<'_, STAGES>, StreamSink<'_, STAGES>)> {
        (!self.taken.fetch_or(true, Ordering::SeqCst)).then(|| {
            (
                StreamSource {
                    xing: self,
                    send: false,
                    ack_sync: MultiReg::new(false),
                    ack_settled: false,
                    ack_settled_d: false,
                    ready: false,
                },
                StreamSink {
                    xing: self,
                    send_sync: MultiReg::new(false),
                    send_settled: false,
                    send_settled_d: false,
                    valid: false,
                    ack: false,
                    item: StreamItem::new(0, false),
                },
            )
        })
    }
}

/// The producing half of a stream crossing. Lives in the source domain.
pub struct StreamSource<'a, const STAGES: usize = DEFAULT_STAGES> {
    xing: &'a StreamCrossing,
    send: bool,
    ack_sync: MultiReg<bool, STAGES>,
    ack_settled: bool,
    ack_settled_d: bool,
    ready: bool,
}

impl<const STAGES: usize> StreamSource<'_, STAGES> {
    /// Advance one source-domain clock edge, offering `item` if the
    /// producer has one.
    ///
    /// Returns `true` on the edge where the offered item is accepted. Until
    /// then the producer must keep offering the *same* item on every tick;
    /// that holds the payload stable across the crossing, the stream
    /// equivalent of the bus bridge's held request fields. After acceptance,
    /// offer the next item (or `None`).
    pub fn tick(&mut self, item: Option<StreamItem>) -> bool {
        let valid = item.is_some();
        let accepted = valid && self.ready;
        if let Some(item) = item {
            // Payload goes straight across; the hold-until-accepted contract
            // keeps it stable while `send` is in flight.
            self.xing.payload.write(item.to_bits());
        }

        // Next-state terms all use this edge's pre-update registers.
        let send = (self.send || (valid && !self.ready)) && !self.ack_settled;
        let ready = self.ack_settled && !self.ack_settled_d;

        self.ack_settled_d = self.ack_settled;
        self.ack_settled = self.ack_sync.tick(self.xing.ack.read());
        self.send = send;
        self.ready = ready;
        self.xing.send.write(send);

        accepted
    }
}

/// The consuming half of a stream crossing. Lives in the destination domain.
pub struct StreamSink<'a, const STAGES: usize = DEFAULT_STAGES> {
    xing: &'a StreamCrossing,
    send_sync: MultiReg<bool, STAGES>,
    send_settled: bool,
    send_settled_d: bool,
    valid: bool,
    ack: bool,
    item: StreamItem,
}

impl<const STAGES: usize> StreamSink<'_, STAGES> {
    /// Advance one destination-domain clock edge.
    ///
    /// `ready` is the consumer's flow control for this edge. Returns the
    /// valid item, if any: with `ready` true the item is thereby consumed;
    /// with `ready` false it is only an offer and stays valid for later
    /// ticks. Valid holds until consumed, like a one-slot buffer.
    pub fn tick(&mut self, ready: bool) -> Option<StreamItem> {
        let out = self.valid.then_some(self.item);
        let consumed = self.valid && ready;

        // Rising edge of the settled send level: the payload wire is stable
        // now, latch it.
        let arrival = self.send_settled && !self.send_settled_d;
        if arrival {
            self.item = StreamItem::from_bits(self.xing.payload.read());
        }

        let valid = (self.valid && !ready) || arrival;
        // Hold ack while the far side still asserts send; drop it once the
        // send level falls, re-arming the crossing.
        let ack = (self.ack && self.send_settled) || consumed;

        self.send_settled_d = self.send_settled;
        self.send_settled = self.send_sync.tick(self.xing.send.read());
        self.valid = valid;
        self.ack = ack;
        self.xing.ack.write(ack);

        out
    }
}

#[cfg(test)]
mod test {
    use super::{StreamCrossing, StreamItem};

    /// Push `items` through a split crossing, ticking the sink once per
    /// `sink_every` source ticks. Returns what the sink consumed.
    fn run<const STAGES: usize>(
        source: &mut super::StreamSource<'_, STAGES>,
        sink: &mut super::StreamSink<'_, STAGES>,
        items: &[StreamItem],
        sink_every: usize,
        ticks: usize,
    ) -> std::vec::Vec<StreamItem> {
        let mut sent = 0;
        let mut received = std::vec::Vec::new();
        for t in 0..ticks {
            let offer = items.get(sent).copied();
            if source.tick(offer) {
                sent += 1;
            }
            if t % sink_every == 0 {
                if let Some(item) = sink.tick(true) {
                    received.push(item);
                }
            }
        }
        received
    }

    extern crate std;

    const ABC: [StreamItem; 3] = [
        StreamItem::new(0x41, false),
        StreamItem::new(0x42, false),
        StreamItem::new(0x43, true),
    ];

    #[test]
    fn split_once() {
        let crossing = StreamCrossing::new();
        assert!(crossing.split().is_some());
        assert!(crossing.split().is_none());
    }

    #[test]
    fn nine_bit_packing_round_trips() {
        let item = StreamItem::new(0xA5, true);
        assert_eq!(item.to_bits(), 0x1A5);
        assert_eq!(StreamItem::from_bits(0x1A5), item);
        assert_eq!(StreamItem::from_bits(0x41), StreamItem::new(0x41, false));
    }

    #[test]
    fn slow_sink_receives_exactly_the_sequence() {
        // Destination clock 4x slower than the source, ready held high:
        // 0x41, 0x42, 0x43(last), nothing extra, nothing missing.
        let crossing = StreamCrossing::new();
        let (mut source, mut sink) = crossing.split().unwrap();
        let received = run(&mut source, &mut sink, &ABC, 4, 400);
        assert_eq!(received, ABC);
    }

    #[test]
    fn fast_sink_receives_exactly_the_sequence() {
        let crossing = StreamCrossing::new();
        let (mut source, mut sink) = crossing.split().unwrap();

        // Source 4x slower: tick the sink four times per source tick.
        let mut sent = 0;
        let mut received = std::vec::Vec::new();
        for _ in 0..200 {
            let offer = ABC.get(sent).copied();
            if source.tick(offer) {
                sent += 1;
            }
            for _ in 0..4 {
                if let Some(item) = sink.tick(true) {
                    received.push(item);
                }
            }
        }
        assert_eq!(received, ABC);
    }

    #[test]
    fn matched_clocks_receive_exactly_the_sequence() {
        let crossing = StreamCrossing::new();
        let (mut source, mut sink) = crossing.split().unwrap();
        let received = run(&mut source, &mut sink, &ABC, 1, 200);
        assert_eq!(received, ABC);
    }

    #[test]
    fn sink_backpressure_holds_the_item() {
        let crossing = StreamCrossing::new();
        let (mut source, mut sink) = crossing.split().unwrap();

        let item = StreamItem::new(0x5A, false);
        // Sink not ready: the item stays offered, never consumed, and the
        // source never accepts a second one.
        let mut accepted = 0;
        for _ in 0..50 {
            if source.tick(Some(item)) {
                accepted += 1;
            }
            let offer = sink.tick(false);
            if let Some(offered) = offer {
                assert_eq!(offered, item);
            }
        }
        assert_eq!(accepted, 0);

        // Release the backpressure: exactly one item comes through.
        let mut received = std::vec::Vec::new();
        let mut done = false;
        for _ in 0..50 {
            if source.tick((!done).then_some(item)) {
                done = true;
            }
            if let Some(got) = sink.tick(true) {
                received.push(got);
            }
        }
        assert_eq!(received.len(), 1);
        assert_eq!(received[0], item);
    }

    #[test]
    fn idle_source_produces_nothing() {
        let crossing = StreamCrossing::new();
        let (mut source, mut sink) = crossing.split().unwrap();
        for _ in 0..50 {
            assert!(!source.tick(None));
            assert!(sink.tick(true).is_none());
        }
    }

    #[test]
    fn sync_split_carries_the_sequence() {
        let crossing = StreamCrossing::new();
        let (mut source, mut sink) = crossing.split_sync().unwrap();
        let received = run(&mut source, &mut sink, &ABC, 1, 100);
        assert_eq!(received, ABC);
    }

    #[test]
    fn long_burst_preserves_order_and_count() {
        let crossing = StreamCrossing::new();
        let (mut source, mut sink) = crossing.split().unwrap();

        let items: std::vec::Vec<StreamItem> = (0..32)
            .map(|i| StreamItem::new(i as u8, i == 31))
            .collect();
        let received = run(&mut source, &mut sink, &items, 3, 4000);
        assert_eq!(received, items);
    }
}
