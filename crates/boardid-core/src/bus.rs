//! Bus transport abstraction
//!
//! A `BusTransport` is one physical low-speed bus with byte-addressed
//! devices behind 7-bit addresses. Backends (Linux i2c-dev, the in-memory
//! emulator) implement it; everything above only talks to this trait.
//!
//! All access is sequential. A `BusSet` hands out one `&mut` transport at a
//! time, which is all the serialization the bus needs.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

/// Errors reported by a bus transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// No device acknowledged the address
    #[error("no acknowledge from device 0x{addr:02X}")]
    Nack {
        /// Device address
        addr: u8,
    },

    /// The transfer timed out
    #[error("bus transfer timed out")]
    Timeout,

    /// No transport is configured for this bus id
    #[error("no transport for bus {0}")]
    NoSuchBus(u8),

    /// Any other transport failure
    #[error("bus fault: {0}")]
    Fault(String),
}

impl BusError {
    /// Whether this error just means "nothing is there"
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::Nack { .. })
    }
}

/// Byte-level access to devices on one bus
pub trait BusTransport {
    /// Check whether a device answers at `addr`
    ///
    /// Never fails; any error counts as absence.
    fn probe(&mut self, addr: u8) -> bool {
        let mut buf = [0u8; 1];
        self.read_block(addr, 0, &mut buf).is_ok()
    }

    /// Read `buf.len()` bytes starting at `register`
    fn read_block(&mut self, addr: u8, register: u8, buf: &mut [u8]) -> Result<(), BusError>;

    /// Write `data` starting at `register`
    ///
    /// The caller is responsible for the settle delay afterwards.
    fn write_block(&mut self, addr: u8, register: u8, data: &[u8]) -> Result<(), BusError>;

    /// Block until a device's internal write cycle has completed
    fn settle(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    fn probe(&mut self, addr: u8) -> bool {
        (**self).probe(addr)
    }

    fn read_block(&mut self, addr: u8, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        (**self).read_block(addr, register, buf)
    }

    fn write_block(&mut self, addr: u8, register: u8, data: &[u8]) -> Result<(), BusError> {
        (**self).write_block(addr, register, data)
    }

    fn settle(&mut self, duration: Duration) {
        (**self).settle(duration)
    }
}

/// The buses of one assembly, keyed by bus id
pub struct BusSet<B> {
    buses: BTreeMap<u8, B>,
}

impl<B: BusTransport> BusSet<B> {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            buses: BTreeMap::new(),
        }
    }

    /// Add a transport for `bus_id`, replacing any previous one
    pub fn insert(&mut self, bus_id: u8, bus: B) {
        self.buses.insert(bus_id, bus);
    }

    /// Borrow the transport for `bus_id`
    pub fn get(&self, bus_id: u8) -> Option<&B> {
        self.buses.get(&bus_id)
    }

    /// Mutably borrow the transport for `bus_id`
    pub fn get_mut(&mut self, bus_id: u8) -> Result<&mut B, BusError> {
        self.buses.get_mut(&bus_id).ok_or(BusError::NoSuchBus(bus_id))
    }

    /// Bus ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.buses.keys().copied()
    }

    /// Number of buses
    pub fn len(&self) -> usize {
        self.buses.len()
    }

    /// Whether the set has no buses
    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }
}

impl<B: BusTransport> Default for BusSet<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: BusTransport> FromIterator<(u8, B)> for BusSet<B> {
    fn from_iter<I: IntoIterator<Item = (u8, B)>>(iter: I) -> Self {
        Self {
            buses: iter.into_iter().collect(),
        }
    }
}
