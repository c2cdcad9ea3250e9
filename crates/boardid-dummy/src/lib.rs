//! boardid-dummy - In-memory EEPROM emulator for testing
//!
//! This crate provides a dummy bus that emulates small I2C EEPROMs in
//! memory. It's useful for testing and dry runs without real hardware.
//!
//! The emulation follows the behaviour of 24Cxx-style parts closely enough
//! to catch layout and timing mistakes:
//!
//! - page writes wrap around within the page instead of spilling over
//! - a device does not acknowledge while its write cycle is in progress,
//!   i.e. until the bus has been given a settle delay
//! - sequential reads wrap around at the end of the device

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use boardid_core::bus::{BusError, BusTransport};

/// Configuration for the emulated devices
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Device size in bytes
    pub size: usize,
    /// Page-write size in bytes
    pub page_size: usize,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            size: 256,
            page_size: 16,
        }
    }
}

/// A bus transfer seen by the emulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    /// Block read
    Read {
        /// Device address
        addr: u8,
        /// Start register
        register: u8,
        /// Number of bytes
        len: usize,
    },
    /// Block write
    Write {
        /// Device address
        addr: u8,
        /// Start register
        register: u8,
        /// Bytes written
        data: Vec<u8>,
    },
}

/// Dummy bus
///
/// Holds any number of emulated EEPROMs keyed by address. Every transfer
/// is logged so tests can check exactly what touched the bus.
pub struct DummyBus {
    config: DummyConfig,
    devices: BTreeMap<u8, Vec<u8>>,
    faulty: BTreeSet<u8>,
    busy: Option<u8>,
    ops: Vec<BusOp>,
    settles: usize,
}

impl DummyBus {
    /// Create a bus with no devices
    pub fn new(config: DummyConfig) -> Self {
        Self {
            config,
            devices: BTreeMap::new(),
            faulty: BTreeSet::new(),
            busy: None,
            ops: Vec::new(),
            settles: 0,
        }
    }

    /// Create a bus with no devices and default geometry
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Add an erased device at `addr`
    pub fn with_device(mut self, addr: u8) -> Self {
        self.add_device(addr);
        self
    }

    /// Add an erased device at `addr`
    pub fn add_device(&mut self, addr: u8) {
        self.devices.insert(addr, vec![0xFF; self.config.size]);
    }

    /// Add a device at `addr` with pre-filled contents
    pub fn add_device_with_data(&mut self, addr: u8, initial_data: &[u8]) {
        let mut data = vec![0xFF; self.config.size];
        let len = initial_data.len().min(data.len());
        data[..len].copy_from_slice(&initial_data[..len]);
        self.devices.insert(addr, data);
    }

    /// Make every transfer to `addr` time out
    pub fn set_faulty(&mut self, addr: u8) {
        self.faulty.insert(addr);
    }

    /// Contents of the device at `addr`
    pub fn data(&self, addr: u8) -> Option<&[u8]> {
        self.devices.get(&addr).map(Vec::as_slice)
    }

    /// Mutable contents of the device at `addr`
    pub fn data_mut(&mut self, addr: u8) -> Option<&mut [u8]> {
        self.devices.get_mut(&addr).map(Vec::as_mut_slice)
    }

    /// Every transfer so far
    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    /// Number of block writes so far
    pub fn write_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, BusOp::Write { .. }))
            .count()
    }

    /// Number of settle delays so far
    pub fn settle_count(&self) -> usize {
        self.settles
    }

    /// Forget the transfer log
    pub fn clear_ops(&mut self) {
        self.ops.clear();
        self.settles = 0;
    }

    fn device(&mut self, addr: u8) -> Result<&mut Vec<u8>, BusError> {
        if self.faulty.contains(&addr) {
            return Err(BusError::Timeout);
        }
        if self.busy == Some(addr) {
            log::debug!("dummy: 0x{:02X} busy in write cycle, NACK", addr);
            return Err(BusError::Nack { addr });
        }
        self.devices.get_mut(&addr).ok_or(BusError::Nack { addr })
    }
}

impl BusTransport for DummyBus {
    fn read_block(&mut self, addr: u8, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.ops.push(BusOp::Read {
            addr,
            register,
            len: buf.len(),
        });
        let mem = self.device(addr)?;
        let size = mem.len();
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = mem[(register as usize + i) % size];
        }
        Ok(())
    }

    fn write_block(&mut self, addr: u8, register: u8, data: &[u8]) -> Result<(), BusError> {
        self.ops.push(BusOp::Write {
            addr,
            register,
            data: data.to_vec(),
        });
        let page_size = self.config.page_size;
        let mem = self.device(addr)?;
        let size = mem.len();

        // The address counter only increments within the current page; a
        // short last page (size not a page multiple) wraps at the device end
        let start = register as usize % size;
        let page_base = start - start % page_size;
        let page_len = page_size.min(size - page_base);
        for (i, &byte) in data.iter().enumerate() {
            let offset = (start - page_base + i) % page_len;
            mem[page_base + offset] = byte;
        }

        self.busy = Some(addr);
        Ok(())
    }

    fn settle(&mut self, _duration: Duration) {
        // No delay needed for in-memory operations
        self.settles += 1;
        self.busy = None;
    }
}
