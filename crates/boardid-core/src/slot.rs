//! One board ID device position
//!
//! A `BoardSlot` binds a fixed bus/address/offset to the record codec and
//! keeps track of whether a device answered the last probe. Write and clear
//! silently skip absent slots so a missing optional board never blocks a
//! batch run.

use std::time::Duration;

use chrono::NaiveDate;
use zerocopy::IntoBytes;

use crate::bus::{BusError, BusTransport};
use crate::codec::{self, ShortForm, FIELD_LEN};
use crate::config::SlotDef;
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::record::{BoardRecord, Revision};
use crate::source::{Substitutions, ValueSource};
use crate::table::BoardTypeTable;

/// Value written over the device when clearing
pub const ERASED_BYTE: u8 = 0xFF;

/// Token the operator can type for the current date
pub const TODAY_TOKEN: &str = "today";

/// Date format substituted for [`TODAY_TOKEN`]
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Outcome of the last probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// Not probed yet
    Unknown,
    /// A device acknowledged
    Present,
    /// Nothing acknowledged the address
    Absent,
    /// The probe hit a transport error other than a missing acknowledge
    Fault(BusError),
}

/// One physical device position
#[derive(Debug, Clone)]
pub struct BoardSlot {
    def: SlotDef,
    settle: Duration,
    presence: Presence,
    record: BoardRecord,
    record_loaded: bool,
}

impl BoardSlot {
    /// Create a slot; it stays absent until probed
    ///
    /// Fails if the definition's geometry is inconsistent.
    pub fn new(def: SlotDef, settle: Duration) -> Result<Self> {
        def.validate()?;
        let record = BoardRecord::new(def.board_type);
        Ok(Self {
            def,
            settle,
            presence: Presence::Unknown,
            record,
            record_loaded: false,
        })
    }

    /// Slot name
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Slot definition
    pub fn def(&self) -> &SlotDef {
        &self.def
    }

    /// Bus id
    pub fn bus_id(&self) -> u8 {
        self.def.bus
    }

    /// Device address
    pub fn address(&self) -> u8 {
        self.def.address
    }

    /// Whether absence is tolerated
    pub fn is_optional(&self) -> bool {
        self.def.optional
    }

    /// Result of the last probe
    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    /// Whether the last probe found a device
    pub fn is_present(&self) -> bool {
        self.presence == Presence::Present
    }

    /// Current in-memory record
    pub fn record(&self) -> &BoardRecord {
        &self.record
    }

    /// Whether the in-memory record came from the device or the operator
    ///
    /// False until the first `read`, `set_record` or `collect_from_source`,
    /// and again after `clear`.
    pub fn is_record_loaded(&self) -> bool {
        self.record_loaded
    }

    /// Replace the in-memory record
    ///
    /// The board type always stays the slot's own.
    pub fn set_record(&mut self, record: BoardRecord) {
        self.record = BoardRecord {
            board_type: self.def.board_type,
            ..record
        };
        self.record_loaded = true;
    }

    /// Record that the slot's bus could not be reached
    pub(crate) fn mark_fault(&mut self, err: BusError) {
        self.presence = Presence::Fault(err);
    }

    fn register(&self, offset: u8) -> Result<u8> {
        self.def.base_offset.checked_add(offset).ok_or_else(|| {
            Error::Config(format!(
                "slot '{}': offset 0x{:02X}+0x{:02X} is beyond 8-bit register space",
                self.def.name, self.def.base_offset, offset
            ))
        })
    }

    /// Detect the device with a one-byte read of the base register
    ///
    /// Never fails: a missing acknowledge means absent, anything else is
    /// kept as a fault so the caller can tell them apart.
    pub fn probe<B: BusTransport + ?Sized>(&mut self, bus: &mut B) -> &Presence {
        let mut buf = [0u8; 1];
        self.presence = match bus.read_block(self.def.address, self.def.base_offset, &mut buf) {
            Ok(()) => Presence::Present,
            Err(e) if e.is_absence() => Presence::Absent,
            Err(e) => {
                log::error!("{}: probe failed: {}", self.def.name, e);
                Presence::Fault(e)
            }
        };
        log::debug!(
            "{}: bus {} address 0x{:02X}: {:?}",
            self.def.name,
            self.def.bus,
            self.def.address,
            self.presence
        );
        &self.presence
    }

    /// Read the short form and free-text fields into the in-memory record
    ///
    /// Does nothing for an absent slot.
    pub fn read<B: BusTransport + ?Sized>(&mut self, bus: &mut B) -> Result<()> {
        if !self.is_present() {
            log::debug!("{}: not present, skipping read", self.def.name);
            return Ok(());
        }

        let mut short = [0u8; ShortForm::LEN];
        self.read_raw(bus, codec::SHORT_FORM_OFFSET, &mut short)?;
        let short = ShortForm::decode(&short);

        if short.board_type != self.def.board_type {
            log::warn!(
                "{}: device reports board type {} but slot expects {}",
                self.def.name,
                short.board_type,
                self.def.board_type
            );
        }

        let serial_number = self.read_text(bus, codec::SERIAL_OFFSET)?;
        let batch_date = self.read_text(bus, codec::BATCH_DATE_OFFSET)?;
        let test_date = self.read_text(bus, codec::TEST_DATE_OFFSET)?;

        self.record = BoardRecord {
            board_type: self.def.board_type,
            board_id: short.board_id,
            revision: short.revision(),
            serial_number,
            batch_date,
            test_date,
        };
        self.record_loaded = true;
        Ok(())
    }

    fn read_raw<B: BusTransport + ?Sized>(&self, bus: &mut B, offset: u8, buf: &mut [u8]) -> Result<()> {
        bus.read_block(self.def.address, self.register(offset)?, buf)
            .map_err(|e| Error::transport(&self.def.name, e))
    }

    fn read_text<B: BusTransport + ?Sized>(&self, bus: &mut B, offset: u8) -> Result<String> {
        let mut buf = [0u8; FIELD_LEN];
        self.read_raw(bus, offset, &mut buf)?;
        Ok(codec::decode_text(&buf))
    }

    /// Encode the in-memory record and write it to the device
    ///
    /// Writes the eight text fields in layout order, then the short form.
    /// Does nothing for an absent slot. A failure partway through leaves
    /// the fields written so far on the device.
    pub fn write<B: BusTransport + ?Sized>(&mut self, bus: &mut B, table: &BoardTypeTable) -> Result<()> {
        if !self.is_present() {
            log::debug!("{}: not present, skipping write", self.def.name);
            return Ok(());
        }

        let encoded = codec::encode_record(&self.record, table)?;
        for field in &encoded.fields {
            log::trace!("{}: writing {} at +0x{:02X}", self.def.name, field.name, field.offset);
            self.write_paged(bus, self.register(field.offset)?, &field.bytes)?;
        }
        self.write_paged(
            bus,
            self.register(codec::SHORT_FORM_OFFSET)?,
            encoded.short_form.as_bytes(),
        )?;

        log::info!(
            "{}: wrote {} rev {} serial '{}'",
            self.def.name,
            table.model_name(self.record.board_type, self.record.board_id).unwrap_or("?"),
            self.record.revision,
            self.record.serial_number
        );
        Ok(())
    }

    /// Write `data` at `register`, split at device page boundaries, with
    /// the settle delay after every block
    fn write_paged<B: BusTransport + ?Sized>(&self, bus: &mut B, register: u8, data: &[u8]) -> Result<()> {
        let page = self.def.page_size as usize;
        let mut addr = register as usize;
        let mut rest = data;

        while !rest.is_empty() {
            let room = page - addr % page;
            let (chunk, tail) = rest.split_at(room.min(rest.len()));
            bus.write_block(self.def.address, addr as u8, chunk)
                .map_err(|e| Error::transport(&self.def.name, e))?;
            bus.settle(self.settle);
            addr += chunk.len();
            rest = tail;
        }
        Ok(())
    }

    /// Fill the device (or its first half) with 0xFF, one page at a time
    ///
    /// Does nothing for an absent slot.
    pub fn clear<B: BusTransport + ?Sized>(
        &mut self,
        bus: &mut B,
        half_only: bool,
        progress: &mut dyn Progress,
    ) -> Result<()> {
        if !self.is_present() {
            log::debug!("{}: not present, skipping clear", self.def.name);
            return Ok(());
        }

        let size = self.def.size as usize;
        let end = if half_only { size / 2 } else { size };
        let page = self.def.page_size as usize;
        let blank = vec![ERASED_BYTE; page];

        progress.begin(&self.def.name, end);
        let mut addr = 0;
        while addr < end {
            let len = page.min(end - addr);
            log::trace!("{}: clearing 0x{:02X}..0x{:02X}", self.def.name, addr, addr + len);
            bus.write_block(self.def.address, addr as u8, &blank[..len])
                .map_err(|e| Error::transport(&self.def.name, e))?;
            bus.settle(self.settle);
            addr += len;
            progress.advance(addr);
        }
        progress.finish();

        log::info!("{}: cleared 0x00..0x{:02X}", self.def.name, end);
        self.record = BoardRecord::new(self.def.board_type);
        self.record_loaded = false;
        Ok(())
    }

    /// Ask `source` for new field values, using the current record as
    /// defaults
    ///
    /// `today` is what the operator gets for typing `today` as the test
    /// date.
    pub fn collect_from_source(
        &mut self,
        source: &mut dyn ValueSource,
        table: &BoardTypeTable,
        today: NaiveDate,
    ) -> Result<()> {
        let board_type = self.def.board_type;
        let models = table.models(board_type);
        if models.is_empty() {
            return Err(Error::UnknownBoardType(board_type));
        }

        let type_name = table.type_name(board_type).unwrap_or("?");
        let label = format!("{} ({}) model", self.def.name, type_name);
        let default = match self.record.board_id as usize {
            id if id < models.len() => id,
            _ => 0,
        };
        let board_id = source.select_one(models, &label, default)?;
        let board_id = u8::try_from(board_id).map_err(|_| Error::UnknownModel {
            board_type,
            board_id: u8::MAX,
        })?;
        if board_id as usize >= models.len() {
            return Err(Error::UnknownModel { board_type, board_id });
        }

        let no_subs = Substitutions::new();
        let revision = loop {
            let answer = source.get_text(
                "Revision",
                FIELD_LEN,
                &self.record.revision.to_string(),
                "",
                &no_subs,
            )?;
            match answer.parse::<Revision>() {
                Ok(rev) => break rev,
                Err(e) => source.reject(&e),
            }
        };

        let serial_number = source.get_text(
            "Serial number",
            FIELD_LEN,
            &self.record.serial_number,
            &self.def.serial_prefix,
            &no_subs,
        )?;
        let batch_date = source.get_text(
            "Batch date",
            FIELD_LEN,
            &self.record.batch_date,
            "",
            &no_subs,
        )?;

        let mut today_subs = Substitutions::new();
        today_subs.insert(TODAY_TOKEN.to_string(), today.format(DATE_FORMAT).to_string());
        let test_date = source.get_text(
            "Test date",
            FIELD_LEN,
            &self.record.test_date,
            "",
            &today_subs,
        )?;

        self.record = BoardRecord {
            board_type,
            board_id,
            revision,
            serial_number,
            batch_date,
            test_date,
        };
        self.record_loaded = true;
        Ok(())
    }
}
