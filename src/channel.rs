//! Composite duplex channel between a "system" and a "device" domain
//!
//! Assembles the crossing primitives into one bidirectional, flow-controlled
//! channel: a byte-stream crossing per direction, elastic FIFOs on the
//! system side, a device-to-system detach event pulse, and a
//! system-to-device flush-configuration level. The device-side endpoints are
//! meant for an opaque protocol engine; this module moves its bytes and
//! signals, never interprets them.
//!
//! The system side advances with [`SystemHandle::poll`], one call per system
//! clock edge. The device side advances each of its endpoints with the
//! corresponding `DeviceHandle` call, one per device clock edge per signal.
//!
//! ```
//! use xclk::channel::{ChannelState, Config};
//! use xclk::stream::StreamItem;
//!
//! static CHANNEL: ChannelState = ChannelState::new();
//!
//! let (mut sys, mut dev) = CHANNEL.split::<4>(Config::new()).unwrap();
//! sys.write(StreamItem::new(b'!', true)).unwrap();
//! loop {
//!     sys.poll();
//!     if let Some(item) = dev.recv(true) {
//!         assert_eq!(item.data, b'!');
//!         break;
//!     }
//! }
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

use crate::fifo::Fifo;
use crate::level::{LevelCrossing, LevelReceiver, LevelSender};
use crate::pulse::{PulseCrossing, PulseReceiver, PulseSender};
use crate::stream::{StreamCrossing, StreamItem, StreamSink, StreamSource};
use crate::{Error, DEFAULT_STAGES};

#[cfg(feature = "defmt-03")]
use defmt_03 as defmt;

bitflags::bitflags! {
    /// Flush behavior requested of the protocol engine, crossed to the
    /// device domain as a level.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct FlushConfig: u32 {
        /// Flush buffered data as soon as possible.
        const NOW = 1 << 0;
        /// Flush on a timeout, so data never sits buffered indefinitely.
        const ON_TIMEOUT = 1 << 1;
    }
}

bitflags::bitflags! {
    /// What a [`SystemHandle::poll`] call observed.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct Events: u32 {
        /// The device raised its detach/reboot request pulse.
        const DETACH = 1 << 0;
        /// Received data is waiting in [`SystemHandle::read`].
        const READABLE = 1 << 1;
        /// [`SystemHandle::write`] currently has room.
        const WRITABLE = 1 << 2;
    }
}

/// Per-instance customization for the protocol engine on the device side.
///
/// The channel does not interpret any of this; it carries the values to
/// whoever constructs the engine. Unset fields mean "keep the engine's
/// defaults".
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt_03::Format))]
pub struct EngineConfig {
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub manufacturer: Option<&'static str>,
    pub product: Option<&'static str>,
    pub serial: Option<&'static str>,
    /// Whether the engine should expose its runtime detach interface. When
    /// disabled, [`DeviceHandle::raise_detach`] is never expected to fire.
    pub dfu_runtime: bool,
}

impl EngineConfig {
    pub const fn new() -> Self {
        EngineConfig {
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial: None,
            dfu_runtime: true,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Construction-time channel configuration.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    /// Initial flush behavior published to the device side.
    pub flush: FlushConfig,
    /// Engine customization handed through to the device side.
    pub engine: EngineConfig,
}

impl Config {
    pub const fn new() -> Self {
        Config {
            flush: FlushConfig::empty(),
            engine: EngineConfig::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state for one duplex channel. Split exactly once.
///
/// Allocate as a `static` and split it into the two domain-side handles.
pub struct ChannelState {
    /// System-to-device stream.
    tx: StreamCrossing,
    /// Device-to-system stream.
    rx: StreamCrossing,
    /// Device-to-system detach request.
    detach: PulseCrossing,
    /// System-to-device flush configuration.
    flush: LevelCrossing,
    taken: AtomicBool,
}

impl ChannelState {
    pub const fn new() -> Self {
        ChannelState {
            tx: StreamCrossing::new(),
            rx: StreamCrossing::new(),
            detach: PulseCrossing::new(),
            flush: LevelCrossing::new(0),
            taken: AtomicBool::new(false),
        }
    }

    /// Split into the system and device handles, with `DEPTH`-entry elastic
    /// FIFOs and the default synchronizer depth.
    ///
    /// Returns `None` if the channel was already split.
    pub fn split<const DEPTH: usize>(
        &self,
        config: Config,
    ) -> Option<(SystemHandle<'_, DEPTH>, DeviceHandle<'_>)> {
        self.split_stages(config)
    }

    /// Split for a system domain that shares the device clock.
    ///
    /// All crossings collapse to zero synchronizer stages. The explicit
    /// constructor is the mode switch; nothing verifies the shared clock.
    pub fn split_sync<const DEPTH: usize>(
        &self,
        config: Config,
    ) -> Option<(SystemHandle<'_, DEPTH, 0>, DeviceHandle<'_, 0>)> {
        self.split_stages(config)
    }

    /// Split with an explicit synchronizer depth.
    pub fn split_stages<const DEPTH: usize, const STAGES: usize>(
        &self,
        config: Config,
    ) -> Option<(SystemHandle<'_, DEPTH, STAGES>, DeviceHandle<'_, STAGES>)> {
        if self.taken.fetch_or(true, Ordering::SeqCst) {
            return None;
        }
        // First split of each inner crossing; cannot fail past the gate
        // above.
        let (tx_source, tx_sink) = self.tx.split_stages::<STAGES>()?;
        let (rx_source, rx_sink) = self.rx.split_stages::<STAGES>()?;
        let (detach_tx, detach_rx) = self.detach.split_stages::<STAGES>()?;
        let (mut flush_tx, flush_rx) = self.flush.split_stages::<STAGES>()?;

        flush_tx.set(config.flush.bits());

        Some((
            SystemHandle {
                tx_fifo: Fifo::new(),
                rx_fifo: Fifo::new(),
                tx: tx_source,
                rx: rx_sink,
                detach: detach_rx,
                flush: flush_tx,
            },
            DeviceHandle {
                rx: tx_sink,
                tx: rx_source,
                detach: detach_tx,
                flush: flush_rx,
                engine: config.engine,
            },
        ))
    }
}

/// The system side of a channel: buffered stream endpoints plus the
/// auxiliary signals. Lives in the system domain.
pub struct SystemHandle<'a, const DEPTH: usize = 4, const STAGES: usize = DEFAULT_STAGES> {
    tx_fifo: Fifo<DEPTH>,
    rx_fifo: Fifo<DEPTH>,
    tx: StreamSource<'a, STAGES>,
    rx: StreamSink<'a, STAGES>,
    detach: PulseReceiver<'a, STAGES>,
    flush: LevelSender<'a>,
}

impl<const DEPTH: usize, const STAGES: usize> SystemHandle<'_, DEPTH, STAGES> {
    /// Queue an item toward the device.
    ///
    /// Refuses with [`Error::WouldBlock`] when the elastic buffer is full;
    /// nothing is ever dropped.
    pub fn write(&mut self, item: StreamItem) -> Result<(), Error> {
        self.tx_fifo.push(item)
    }

    /// Take the next item received from the device, if any.
    pub fn read(&mut self) -> Option<StreamItem> {
        self.rx_fifo.pop()
    }

    /// Indicates if [`write`](Self::write) currently has room.
    pub fn is_writable(&self) -> bool {
        self.tx_fifo.is_writable()
    }

    /// Indicates if [`read`](Self::read) currently has data.
    pub fn is_readable(&self) -> bool {
        self.rx_fifo.is_readable()
    }

    /// Publish a new flush configuration to the device side.
    ///
    /// Takes effect there after the level-crossing delay.
    pub fn set_flush(&mut self, flush: FlushConfig) {
        self.flush.set(flush.bits());
    }

    /// Advance one system-domain clock edge.
    ///
    /// Moves FIFO traffic through both stream crossings, samples the detach
    /// event, and reports what is now observable. Call it from the system
    /// domain's main loop, once per tick, whether or not there is traffic.
    pub fn poll(&mut self) -> Events {
        // Offer the TX head until the crossing takes it.
        if self.tx.tick(self.tx_fifo.peek()) {
            self.tx_fifo.pop();
        }

        // RX consumes only when the elastic buffer has room; the crossing
        // holds the item (and backpressures the device) otherwise.
        let ready = self.rx_fifo.is_writable();
        if let Some(item) = self.rx.tick(ready) {
            if ready {
                // `ready` checked capacity, this cannot refuse.
                let _ = self.rx_fifo.push(item);
            }
        }

        let mut events = Events::empty();
        if self.detach.tick() {
            debug!("DETACH");
            events |= Events::DETACH;
        }
        if self.rx_fifo.is_readable() {
            events |= Events::READABLE;
        }
        if self.tx_fifo.is_writable() {
            events |= Events::WRITABLE;
        }
        events
    }
}

/// The device side of a channel: raw stream endpoints and auxiliary signals
/// for the protocol engine. Lives in the device domain.
pub struct DeviceHandle<'a, const STAGES: usize = DEFAULT_STAGES> {
    rx: StreamSink<'a, STAGES>,
    tx: StreamSource<'a, STAGES>,
    detach: PulseSender<'a>,
    flush: LevelReceiver<'a, STAGES>,
    engine: EngineConfig,
}

impl<const STAGES: usize> DeviceHandle<'_, STAGES> {
    /// Advance the system-to-device endpoint one device tick.
    ///
    /// Same contract as [`StreamSink::tick`]: with `ready` true a returned
    /// item is consumed, with `ready` false it remains offered.
    pub fn recv(&mut self, ready: bool) -> Option<StreamItem> {
        self.rx.tick(ready)
    }

    /// Advance the device-to-system endpoint one device tick.
    ///
    /// Same contract as [`StreamSource::tick`]: keep offering the same item
    /// until the call returns `true`.
    pub fn send(&mut self, item: Option<StreamItem>) -> bool {
        self.tx.tick(item)
    }

    /// Advance the flush-configuration level one device tick and return the
    /// settled value.
    pub fn flush_config(&mut self) -> FlushConfig {
        FlushConfig::from_bits_truncate(self.flush.tick())
    }

    /// Raise the detach/reboot request pulse toward the system side.
    ///
    /// Observed there once, as [`Events::DETACH`]. Raises spaced closer
    /// than the crossing latency coalesce.
    pub fn raise_detach(&mut self) {
        self.detach.pulse();
    }

    /// The engine customization this channel was constructed with.
    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }
}
