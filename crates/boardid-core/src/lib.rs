//! boardid-core - Board identity records for board ID EEPROMs
//!
//! This crate provides the core functionality for detecting, reading,
//! programming and clearing the small identity EEPROM that each board in an
//! assembly carries on a shared low-speed bus.
//!
//! # Architecture
//!
//! - [`record`] - the in-memory identity of one board (`BoardRecord`)
//! - [`codec`] - the fixed on-device layout and its encode/decode rules
//! - [`bus`] - the `BusTransport` capability and the set of buses
//! - [`table`] - the board type / model name lookup table
//! - [`slot`] - one device position with presence detection
//! - [`collection`] - the ordered set of slots for one assembly
//! - [`source`] - where operator-supplied field values come from
//! - [`config`] - deploy-time configuration (gates, timing, topology)
//!
//! # Example
//!
//! ```ignore
//! use boardid_core::{BoardCollection, BusSet, Config};
//!
//! let config = Config::from_toml_file("boardid.toml")?;
//! let mut collection = BoardCollection::new(&config, table, &mut buses)?;
//! for report in collection.read_all(&mut buses) {
//!     println!("{}", report);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bus;
pub mod codec;
pub mod collection;
pub mod config;
pub mod error;
pub mod progress;
pub mod record;
pub mod slot;
pub mod source;
pub mod table;

pub use bus::{BusError, BusSet, BusTransport};
pub use collection::{BatchOutcome, BoardCollection, Gate, GateRefusal, SlotReport, SlotStatus};
pub use config::{Config, Protection, SlotDef, Timing};
pub use error::{Error, Result};
pub use progress::{NoProgress, Progress};
pub use record::{BoardRecord, Revision};
pub use slot::{BoardSlot, Presence};
pub use source::{LineSource, Substitutions, ValidationError, ValueSource};
pub use table::BoardTypeTable;
