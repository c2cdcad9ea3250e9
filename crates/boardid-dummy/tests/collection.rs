//! End-to-end collection tests against the EEPROM emulator

use std::io::Cursor;
use std::sync::Arc;

use boardid_core::{
    BatchOutcome, BoardCollection, BoardRecord, BoardTypeTable, BusSet, Config, Gate, LineSource,
    NoProgress, Progress, Revision, SlotStatus,
};
use boardid_dummy::{BusOp, DummyBus, DummyConfig};
use chrono::NaiveDate;

const TABLE: &str = r#"
{
    "type": { "1": "Carrier", "2": "Sensor" },
    "id": {
        "Carrier": ["CarrierV2", "CarrierV3"],
        "Sensor": ["SensorA", "SensorB"]
    }
}
"#;

fn config(write_enable: bool, clear_enable: bool) -> Config {
    let toml = format!(
        r#"
[protection]
write_enable = {}
clear_enable = {}

[timing]
settle_ms = 0

[[slot]]
name = "carrier"
bus = 0
address = 0x50
board_type = 1

[[slot]]
name = "sensor"
bus = 0
address = 0x51
board_type = 2
optional = true

[[slot]]
name = "aux"
bus = 1
address = 0x50
board_type = 2
base_offset = 0x80
"#,
        write_enable, clear_enable
    );
    Config::from_toml_str(&toml).unwrap()
}

fn table() -> Arc<BoardTypeTable> {
    Arc::new(BoardTypeTable::from_json_str(TABLE).unwrap())
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
}

fn answers(text: &str) -> LineSource<Cursor<Vec<u8>>, Vec<u8>> {
    LineSource::new(Cursor::new(text.as_bytes().to_vec()), Vec::new())
}

/// Bus 0 has the carrier only (sensor absent), bus 1 has aux
fn buses() -> BusSet<DummyBus> {
    let mut buses = BusSet::new();
    buses.insert(0, DummyBus::new_default().with_device(0x50));
    buses.insert(1, DummyBus::new_default().with_device(0x50));
    buses
}

fn total_writes(buses: &BusSet<DummyBus>) -> usize {
    buses.ids().map(|id| buses.get(id).unwrap().write_count()).sum()
}

fn writes_to(buses: &BusSet<DummyBus>, bus: u8, addr: u8) -> usize {
    buses
        .get(bus)
        .unwrap()
        .ops()
        .iter()
        .filter(|op| matches!(op, BusOp::Write { addr: a, .. } if *a == addr))
        .count()
}

#[test]
fn test_probe_at_construction() {
    let mut buses = buses();
    let collection = BoardCollection::new(&config(false, false), table(), &mut buses).unwrap();

    let present: Vec<bool> = collection.slots().iter().map(|s| s.is_present()).collect();
    assert_eq!(present, [true, false, true]);
}

#[test]
fn test_write_then_read_round_trip() {
    let mut buses = buses();
    let mut collection = BoardCollection::new(&config(true, false), table(), &mut buses).unwrap();

    // carrier: model 0, rev 2.1, serial SN1234, keep dates
    // aux: model 1, rev 3, serial AUX9, batch 2024-04, test today
    let mut source = answers("0\n2.1\nSN1234\n\n\n1\n3\nAUX9\n2024-04\ntoday\n");
    let outcome = collection
        .write_all_on(&mut buses, &mut source, false, today())
        .unwrap();
    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            processed: vec!["carrier".into(), "aux".into()],
            skipped: vec!["sensor".into()],
        }
    );

    // Fresh collection reads back what was written
    let mut collection = BoardCollection::new(&config(true, false), table(), &mut buses).unwrap();
    let reports = collection.read_all(&mut buses);

    match &reports[0].status {
        SlotStatus::Present {
            record,
            type_name,
            model_name,
        } => {
            assert_eq!(
                record,
                &BoardRecord {
                    board_type: 1,
                    board_id: 0,
                    revision: Revision::new(2, 1),
                    serial_number: "SN1234".into(),
                    batch_date: String::new(),
                    test_date: String::new(),
                }
            );
            assert_eq!(type_name.as_deref(), Some("Carrier"));
            assert_eq!(model_name.as_deref(), Some("CarrierV2"));
        }
        other => panic!("carrier not present: {:?}", other),
    }
    assert_eq!(reports[1].status, SlotStatus::NotPresent);
    match &reports[2].status {
        SlotStatus::Present { record, .. } => {
            assert_eq!(record.board_id, 1);
            assert_eq!(record.revision, Revision::new(3, 0));
            assert_eq!(record.serial_number, "AUX9");
            assert_eq!(record.batch_date, "2024-04");
            assert_eq!(record.test_date, "2024-05-06");
        }
        other => panic!("aux not present: {:?}", other),
    }
}

#[test]
fn test_record_lands_at_base_offset() {
    let mut buses = buses();
    let mut collection = BoardCollection::new(&config(true, false), table(), &mut buses).unwrap();
    let mut source = answers("1\n1.2\nC1\n\n\n0\n\nA1\n\n\n");
    collection
        .write_all_on(&mut buses, &mut source, false, today())
        .unwrap();

    let carrier = buses.get(0).unwrap().data(0x50).unwrap();
    assert_eq!(&carrier[0x10..0x20], b"    Carrier     ");
    assert_eq!(&carrier[0x20..0x30], b"   CarrierV3    ");
    assert_eq!(&carrier[0x30..0x40], b"     Rev1.2     ");
    assert_eq!(&carrier[0x7D..0x80], &[1, 1, 0x12]);
    assert!(carrier[0x80..].iter().all(|&b| b == 0xFF));

    let aux = buses.get(1).unwrap().data(0x50).unwrap();
    assert!(aux[..0x80].iter().all(|&b| b == 0xFF));
    assert_eq!(&aux[0x90..0xA0], b"     Sensor     ");
    assert_eq!(&aux[0xFD..0x100], &[2, 0, 0x10]);
}

#[test]
fn test_one_write_sequence_per_present_slot() {
    let mut buses = buses();
    let mut collection = BoardCollection::new(&config(true, false), table(), &mut buses).unwrap();
    let mut source = answers("0\n\n\n\n\n0\n\n\n\n\n");
    collection
        .write_all_on(&mut buses, &mut source, false, today())
        .unwrap();

    // 8 fields + short form per slot; the absent optional slot sees none
    assert_eq!(writes_to(&buses, 0, 0x50), 9);
    assert_eq!(writes_to(&buses, 0, 0x51), 0);
    assert_eq!(writes_to(&buses, 1, 0x50), 9);
    for id in buses.ids() {
        let bus = buses.get(id).unwrap();
        assert_eq!(bus.settle_count(), bus.write_count());
    }
}

#[test]
fn test_write_gate_refuses_without_bus_writes() {
    let mut buses = buses();
    let mut collection = BoardCollection::new(&config(false, true), table(), &mut buses).unwrap();
    let mut source = answers("");

    let outcome = collection
        .write_all_on(&mut buses, &mut source, true, today())
        .unwrap();
    match outcome {
        BatchOutcome::Refused(refusal) => {
            assert_eq!(refusal.gate, Gate::Write);
            assert!(refusal.to_string().contains("write_enable = true"));
        }
        other => panic!("expected refusal, got {:?}", other),
    }
    assert_eq!(total_writes(&buses), 0);
}

#[test]
fn test_clear_gate_refuses_without_bus_writes() {
    let mut buses = buses();
    let mut collection = BoardCollection::new(&config(true, false), table(), &mut buses).unwrap();

    let outcome = collection
        .clear_all(&mut buses, false, &mut NoProgress)
        .unwrap();
    assert!(matches!(
        outcome,
        BatchOutcome::Refused(ref r) if r.gate == Gate::Clear
    ));
    assert_eq!(total_writes(&buses), 0);
}

#[test]
fn test_seed_defaults_from_device() {
    let mut buses = buses();
    let mut collection = BoardCollection::new(&config(true, false), table(), &mut buses).unwrap();
    let mut source = answers("1\n4.2\nSN77\nB1\nT1\n1\n\nX\n\n\n");
    collection
        .write_all_on(&mut buses, &mut source, false, today())
        .unwrap();

    // Accept every default: values must come back from the device
    let mut collection = BoardCollection::new(&config(true, false), table(), &mut buses).unwrap();
    let mut source = answers("\n\n\n\n\n\n\n\n\n\n");
    collection
        .write_all_on(&mut buses, &mut source, true, today())
        .unwrap();

    let carrier = collection.slot("carrier").unwrap().record();
    assert_eq!(carrier.board_id, 1);
    assert_eq!(carrier.revision, Revision::new(4, 2));
    assert_eq!(carrier.serial_number, "SN77");
    assert_eq!(carrier.batch_date, "B1");
    assert_eq!(carrier.test_date, "T1");

    let output = String::from_utf8(source.into_output()).unwrap();
    assert!(output.contains("Serial number [SN77]: "));
}

#[test]
fn test_snapshot_never_reports_unread_records() {
    let mut buses = buses();
    let mut collection = BoardCollection::new(&config(true, false), table(), &mut buses).unwrap();
    let mut source = answers("1\n4.2\nSN77\nB1\nT1\n0\n\n\n\n\n");
    collection
        .write_all_on(&mut buses, &mut source, false, today())
        .unwrap();

    // A fresh collection has only probed; nothing has been decoded yet
    let mut collection = BoardCollection::new(&config(true, false), table(), &mut buses).unwrap();
    let snapshot = collection.snapshot();
    assert_eq!(snapshot[0].status, SlotStatus::NotRead);
    assert_eq!(snapshot[1].status, SlotStatus::NotPresent);
    assert_eq!(snapshot[2].status, SlotStatus::NotRead);

    collection.read_all(&mut buses);
    let snapshot = collection.snapshot();
    match &snapshot[0].status {
        SlotStatus::Present {
            record, model_name, ..
        } => {
            assert_eq!(record.serial_number, "SN77");
            assert_eq!(record.revision, Revision::new(4, 2));
            assert_eq!(model_name.as_deref(), Some("CarrierV3"));
        }
        other => panic!("carrier not decoded: {:?}", other),
    }

    // Clearing invalidates the in-memory record again
    let mut collection = BoardCollection::new(&config(true, true), table(), &mut buses).unwrap();
    collection.read_all(&mut buses);
    collection.clear_all(&mut buses, true, &mut NoProgress).unwrap();
    assert_eq!(collection.snapshot()[0].status, SlotStatus::NotRead);
}

#[test]
fn test_optional_and_mandatory_absent_reported() {
    let mut buses = BusSet::new();
    // Only aux's bus has a device; the mandatory carrier is missing too
    buses.insert(0, DummyBus::new_default());
    buses.insert(1, DummyBus::new_default().with_device(0x50));
    let mut collection = BoardCollection::new(&config(true, true), table(), &mut buses).unwrap();

    let snapshot = collection.snapshot();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot[0].status, SlotStatus::NotPresent);
    assert!(snapshot[0].is_missing_mandatory());
    assert_eq!(snapshot[1].status, SlotStatus::NotPresent);
    assert!(!snapshot[1].is_missing_mandatory());
    assert_eq!(snapshot[2].status, SlotStatus::NotRead);
    assert!(!snapshot[2].is_missing_mandatory());

    // Writing still runs for the one present slot
    let mut source = answers("0\n\n\n\n\n");
    let outcome = collection
        .write_all_on(&mut buses, &mut source, false, today())
        .unwrap();
    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            processed: vec!["aux".into()],
            skipped: vec!["carrier".into(), "sensor".into()],
        }
    );
    assert_eq!(buses.get(0).unwrap().write_count(), 0);
}

#[test]
fn test_missing_bus_is_fault() {
    let mut buses = BusSet::new();
    buses.insert(0, DummyBus::new_default().with_device(0x50));
    let collection = BoardCollection::new(&config(true, true), table(), &mut buses).unwrap();

    let snapshot = collection.snapshot();
    assert!(matches!(snapshot[2].status, SlotStatus::Fault(_)));
}

#[test]
fn test_read_all_continues_after_fault() {
    let mut buses = buses();
    let mut collection = BoardCollection::new(&config(true, true), table(), &mut buses).unwrap();
    buses.get_mut(0).unwrap().set_faulty(0x50);

    let reports = collection.read_all(&mut buses);
    assert!(matches!(reports[0].status, SlotStatus::Fault(_)));
    assert!(matches!(reports[2].status, SlotStatus::Present { .. }));
}

#[test]
fn test_write_all_stops_on_transport_failure() {
    let mut buses = buses();
    let mut collection = BoardCollection::new(&config(true, true), table(), &mut buses).unwrap();
    buses.get_mut(0).unwrap().set_faulty(0x50);

    let mut source = answers("0\n\n\n\n\n0\n\n\n\n\n");
    let err = collection
        .write_all_on(&mut buses, &mut source, false, today())
        .unwrap_err();
    assert!(err.to_string().contains("carrier"));
    assert_eq!(buses.get(1).unwrap().write_count(), 0);
}

struct CountingProgress {
    begun: Vec<(String, usize)>,
    last: usize,
    finished: usize,
}

impl Progress for CountingProgress {
    fn begin(&mut self, label: &str, total_bytes: usize) {
        self.begun.push((label.to_string(), total_bytes));
    }

    fn advance(&mut self, bytes_done: usize) {
        self.last = bytes_done;
    }

    fn finish(&mut self) {
        self.finished += 1;
    }
}

#[test]
fn test_clear_all_half_and_full() {
    let mut buses = BusSet::new();
    let mut bus0 = DummyBus::new_default();
    bus0.add_device_with_data(0x50, &[0u8; 256]);
    bus0.add_device_with_data(0x51, &[0u8; 256]);
    buses.insert(0, bus0);
    let mut bus1 = DummyBus::new_default();
    bus1.add_device_with_data(0x50, &[0u8; 256]);
    buses.insert(1, bus1);

    let mut collection = BoardCollection::new(&config(false, true), table(), &mut buses).unwrap();
    let mut progress = CountingProgress {
        begun: Vec::new(),
        last: 0,
        finished: 0,
    };

    collection.clear_all(&mut buses, true, &mut progress).unwrap();
    let carrier = buses.get(0).unwrap().data(0x50).unwrap();
    assert!(carrier[..128].iter().all(|&b| b == 0xFF));
    assert!(carrier[128..].iter().all(|&b| b == 0x00));
    assert_eq!(
        progress.begun,
        [
            ("carrier".to_string(), 128),
            ("sensor".to_string(), 128),
            ("aux".to_string(), 128)
        ]
    );
    assert_eq!(progress.last, 128);
    assert_eq!(progress.finished, 3);

    collection.clear_all(&mut buses, false, &mut progress).unwrap();
    for (bus, addr) in [(0, 0x50), (0, 0x51), (1, 0x50)] {
        let data = buses.get(bus).unwrap().data(addr).unwrap();
        assert!(data.iter().all(|&b| b == 0xFF));
    }

    // A cleared device reads back as empty text, not garbage
    let reports = collection.read_all(&mut buses);
    match &reports[0].status {
        SlotStatus::Present { record, .. } => {
            assert_eq!(record.serial_number, "");
            assert_eq!(record.board_id, 0xFF);
        }
        other => panic!("carrier not present: {:?}", other),
    }
}

#[test]
fn test_small_pages_never_wrap() {
    let config = Config::from_toml_str(
        r#"
[protection]
write_enable = true

[timing]
settle_ms = 0

[[slot]]
name = "carrier"
bus = 0
address = 0x50
board_type = 1
base_offset = 0x04
page_size = 8
"#,
    )
    .unwrap();

    let mut buses = BusSet::new();
    buses.insert(
        0,
        DummyBus::new(DummyConfig {
            size: 256,
            page_size: 8,
        })
        .with_device(0x50),
    );
    let mut collection = BoardCollection::new(&config, table(), &mut buses).unwrap();
    let mut source = answers("1\n2.1\nSN1234\n2024-01\ntoday\n");
    collection
        .write_all_on(&mut buses, &mut source, false, today())
        .unwrap();

    // Unaligned 16-byte fields need three blocks each on 8-byte pages
    let bus = buses.get(0).unwrap();
    for op in bus.ops() {
        if let BusOp::Write { register, data, .. } = op {
            let first = *register as usize / 8;
            let last = (*register as usize + data.len() - 1) / 8;
            assert_eq!(first, last, "write at 0x{:02X} crosses a page", register);
        }
    }
    assert_eq!(bus.write_count(), 8 * 3 + 1);

    // The emulator wraps within a page, so any bad split would corrupt this
    let mut collection = BoardCollection::new(&config, table(), &mut buses).unwrap();
    let reports = collection.read_all(&mut buses);
    match &reports[0].status {
        SlotStatus::Present {
            record, model_name, ..
        } => {
            assert_eq!(model_name.as_deref(), Some("CarrierV3"));
            assert_eq!(record.serial_number, "SN1234");
            assert_eq!(record.batch_date, "2024-01");
            assert_eq!(record.test_date, "2024-05-06");
        }
        other => panic!("carrier not present: {:?}", other),
    }
}
