//! The set of board slots that make up one assembly
//!
//! Slots are kept in declaration order; every batch operation walks them in
//! that order, so prompting order is the same on every run. Write and clear
//! are guarded by the deploy-time gates in [`Protection`].

use core::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::bus::{BusSet, BusTransport};
use crate::config::{Config, Protection};
use crate::error::Result;
use crate::progress::Progress;
use crate::record::BoardRecord;
use crate::slot::{BoardSlot, Presence};
use crate::source::ValueSource;
use crate::table::BoardTypeTable;

/// A destructive operation's gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Guards `write_all`
    Write,
    /// Guards `clear_all`
    Clear,
}

impl Gate {
    /// Configuration key that enables this gate
    pub fn key(self) -> &'static str {
        match self {
            Self::Write => "write_enable",
            Self::Clear => "clear_enable",
        }
    }

    fn operation(self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Clear => "clear",
        }
    }
}

/// A batch operation refused because its gate is disabled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRefusal {
    /// The disabled gate
    pub gate: Gate,
    /// Configuration file that holds the gate, if known
    pub origin: Option<PathBuf>,
}

impl fmt::Display for GateRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is disabled: set `{} = true` in the [protection] section of ",
            self.gate.operation(),
            self.gate.key()
        )?;
        match &self.origin {
            Some(path) => write!(f, "{}", path.display()),
            None => write!(f, "the configuration file"),
        }
    }
}

/// Result of a gated batch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The gate was closed; nothing was touched
    Refused(GateRefusal),
    /// The operation ran over every present slot
    Completed {
        /// Slots operated on, in order
        processed: Vec<String>,
        /// Slots skipped because no device was present
        skipped: Vec<String>,
    },
}

/// What one slot looked like in a read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    /// Device present, record decoded
    Present {
        /// Decoded record
        record: BoardRecord,
        /// Board type display name
        type_name: Option<String>,
        /// Model display name
        model_name: Option<String>,
    },
    /// A device answered but its record has not been read yet
    NotRead,
    /// No device answered
    NotPresent,
    /// The bus failed while probing or reading this slot
    Fault(String),
}

/// One line of a collection report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotReport {
    /// Slot name
    pub name: String,
    /// Bus id
    pub bus: u8,
    /// Device address
    pub address: u8,
    /// Whether the slot is optional
    pub optional: bool,
    /// What was found
    pub status: SlotStatus,
}

impl SlotReport {
    /// Whether this is a mandatory slot with no working device
    pub fn is_missing_mandatory(&self) -> bool {
        !self.optional && matches!(self.status, SlotStatus::NotPresent | SlotStatus::Fault(_))
    }
}

impl fmt::Display for SlotReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.optional { "optional" } else { "mandatory" };
        write!(
            f,
            "{:12} bus {} @ 0x{:02X} ({}): ",
            self.name, self.bus, self.address, kind
        )?;
        match &self.status {
            SlotStatus::Present {
                record,
                type_name,
                model_name,
            } => write!(
                f,
                "{} / {} rev {} serial '{}' batch '{}' test '{}'",
                type_name.as_deref().unwrap_or("?"),
                model_name.as_deref().unwrap_or("?"),
                record.revision,
                record.serial_number,
                record.batch_date,
                record.test_date
            ),
            SlotStatus::NotRead => write!(f, "present (record not read)"),
            SlotStatus::NotPresent if self.optional => write!(f, "not present"),
            SlotStatus::NotPresent => write!(f, "NOT PRESENT (mandatory board missing)"),
            SlotStatus::Fault(msg) => write!(f, "FAULT: {}", msg),
        }
    }
}

/// One assembly's fixed, ordered set of board slots
pub struct BoardCollection {
    slots: Vec<BoardSlot>,
    protection: Protection,
    table: Arc<BoardTypeTable>,
}

impl BoardCollection {
    /// Build the collection from `config` and probe every slot
    ///
    /// The configuration is validated first; an inconsistent topology is
    /// rejected before any bus access.
    pub fn new<B: BusTransport>(
        config: &Config,
        table: Arc<BoardTypeTable>,
        buses: &mut BusSet<B>,
    ) -> Result<Self> {
        config.validate()?;
        let slots = config
            .slots
            .iter()
            .map(|def| BoardSlot::new(def.clone(), config.timing.settle))
            .collect::<Result<Vec<_>>>()?;
        let mut collection = Self {
            slots,
            protection: config.protection.clone(),
            table,
        };
        collection.probe_all(buses);
        Ok(collection)
    }

    /// Slots in declaration order
    pub fn slots(&self) -> &[BoardSlot] {
        &self.slots
    }

    /// Look up a slot by name
    pub fn slot(&self, name: &str) -> Option<&BoardSlot> {
        self.slots.iter().find(|s| s.name() == name)
    }

    /// The gates this collection enforces
    pub fn protection(&self) -> &Protection {
        &self.protection
    }

    /// The board type table
    pub fn table(&self) -> &BoardTypeTable {
        &self.table
    }

    /// Probe every slot
    pub fn probe_all<B: BusTransport>(&mut self, buses: &mut BusSet<B>) {
        for slot in &mut self.slots {
            match buses.get_mut(slot.bus_id()) {
                Ok(bus) => {
                    slot.probe(bus);
                }
                Err(e) => {
                    log::error!("{}: {}", slot.name(), e);
                    slot.mark_fault(e);
                }
            }
            if !slot.is_present() && !slot.is_optional() {
                log::warn!("{}: mandatory board not detected", slot.name());
            }
        }
    }

    /// Report every slot from its in-memory state, without bus access
    ///
    /// A present slot whose record was never read (or was cleared since)
    /// is reported as [`SlotStatus::NotRead`], never with placeholder
    /// values.
    pub fn snapshot(&self) -> Vec<SlotReport> {
        self.slots.iter().map(|slot| self.report(slot, None)).collect()
    }

    /// Read every present slot and report all slots
    ///
    /// A transport failure on one slot is reported for that slot and the
    /// remaining slots are still read.
    pub fn read_all<B: BusTransport>(&mut self, buses: &mut BusSet<B>) -> Vec<SlotReport> {
        let mut failures = Vec::with_capacity(self.slots.len());
        for slot in &mut self.slots {
            let result = buses
                .get_mut(slot.bus_id())
                .map_err(|e| crate::Error::transport(slot.name(), e))
                .and_then(|bus| slot.read(bus));
            failures.push(result.err().map(|e| {
                log::error!("{}", e);
                e.to_string()
            }));
        }

        self.slots
            .iter()
            .zip(failures)
            .map(|(slot, failure)| self.report(slot, failure))
            .collect()
    }

    fn report(&self, slot: &BoardSlot, failure: Option<String>) -> SlotReport {
        let status = match (failure, slot.presence()) {
            (Some(msg), _) => SlotStatus::Fault(msg),
            (None, Presence::Present) if !slot.is_record_loaded() => SlotStatus::NotRead,
            (None, Presence::Present) => {
                let record = slot.record().clone();
                SlotStatus::Present {
                    type_name: self.table.type_name(record.board_type).map(str::to_string),
                    model_name: self
                        .table
                        .model_name(record.board_type, record.board_id)
                        .map(str::to_string),
                    record,
                }
            }
            (None, Presence::Fault(e)) => SlotStatus::Fault(e.to_string()),
            (None, Presence::Absent | Presence::Unknown) => SlotStatus::NotPresent,
        };
        SlotReport {
            name: slot.name().to_string(),
            bus: slot.bus_id(),
            address: slot.address(),
            optional: slot.is_optional(),
            status,
        }
    }

    fn check_gate(&self, gate: Gate) -> Option<GateRefusal> {
        let enabled = match gate {
            Gate::Write => self.protection.write_enable,
            Gate::Clear => self.protection.clear_enable,
        };
        if enabled {
            return None;
        }
        let refusal = GateRefusal {
            gate,
            origin: self.protection.origin.clone(),
        };
        log::warn!("{}", refusal);
        Some(refusal)
    }

    /// Collect values and program every present slot, in order
    ///
    /// With `use_prior_values_as_defaults`, each slot is read first so the
    /// operator is offered the values already on the device. Stops at the
    /// first transport failure.
    pub fn write_all<B: BusTransport>(
        &mut self,
        buses: &mut BusSet<B>,
        source: &mut dyn ValueSource,
        use_prior_values_as_defaults: bool,
    ) -> Result<BatchOutcome> {
        self.write_all_on(buses, source, use_prior_values_as_defaults, Local::now().date_naive())
    }

    /// [`write_all`](Self::write_all) with an explicit date for `today`
    pub fn write_all_on<B: BusTransport>(
        &mut self,
        buses: &mut BusSet<B>,
        source: &mut dyn ValueSource,
        use_prior_values_as_defaults: bool,
        today: NaiveDate,
    ) -> Result<BatchOutcome> {
        if let Some(refusal) = self.check_gate(Gate::Write) {
            return Ok(BatchOutcome::Refused(refusal));
        }

        let mut processed = Vec::new();
        let mut skipped = Vec::new();
        for slot in &mut self.slots {
            if !slot.is_present() {
                log::info!("{}: not present, skipping", slot.name());
                skipped.push(slot.name().to_string());
                continue;
            }
            let bus = buses
                .get_mut(slot.bus_id())
                .map_err(|e| crate::Error::transport(slot.name(), e))?;

            if use_prior_values_as_defaults {
                slot.read(bus)?;
            }
            slot.collect_from_source(source, &self.table, today)?;
            slot.write(bus, &self.table)?;
            processed.push(slot.name().to_string());
        }

        Ok(BatchOutcome::Completed { processed, skipped })
    }

    /// Clear every present slot, in order
    ///
    /// Stops at the first transport failure.
    pub fn clear_all<B: BusTransport>(
        &mut self,
        buses: &mut BusSet<B>,
        half_only: bool,
        progress: &mut dyn Progress,
    ) -> Result<BatchOutcome> {
        if let Some(refusal) = self.check_gate(Gate::Clear) {
            return Ok(BatchOutcome::Refused(refusal));
        }

        let mut processed = Vec::new();
        let mut skipped = Vec::new();
        for slot in &mut self.slots {
            if !slot.is_present() {
                log::info!("{}: not present, skipping", slot.name());
                skipped.push(slot.name().to_string());
                continue;
            }
            let bus = buses
                .get_mut(slot.bus_id())
                .map_err(|e| crate::Error::transport(slot.name(), e))?;
            slot.clear(bus, half_only, progress)?;
            processed.push(slot.name().to_string());
        }

        Ok(BatchOutcome::Completed { processed, skipped })
    }
}
