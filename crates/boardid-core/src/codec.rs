//! On-device record layout
//!
//! Each board ID record occupies 128 bytes starting at the slot's base
//! offset. Eight 16-byte text fields are followed by the 3-byte binary
//! short form, which overlaps the tail of the trailing spacer:
//!
//! | Offset | Field |
//! |--------|-------|
//! | +0x00  | spacer |
//! | +0x10  | board type name |
//! | +0x20  | board model name |
//! | +0x30  | revision label (`Rev<major>.<minor>`) |
//! | +0x40  | serial number |
//! | +0x50  | batch date |
//! | +0x60  | test date |
//! | +0x70  | spacer |
//! | +0x7D  | short form `[board_type, board_id, packed revision]` |
//!
//! Text fields are ASCII, centered in 16 character cells with spaces. When
//! the padding is odd, the extra space goes on the right.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{Error, Result};
use crate::record::{BoardRecord, Revision};
use crate::table::BoardTypeTable;

/// Width of every text field
pub const FIELD_LEN: usize = 16;

/// Total size of one record window
pub const RECORD_LEN: usize = 0x80;

/// Offset of the leading spacer field
pub const SPACER_HEAD_OFFSET: u8 = 0x00;
/// Offset of the board type name field
pub const TYPE_NAME_OFFSET: u8 = 0x10;
/// Offset of the board model name field
pub const MODEL_NAME_OFFSET: u8 = 0x20;
/// Offset of the revision label field
pub const REVISION_OFFSET: u8 = 0x30;
/// Offset of the serial number field
pub const SERIAL_OFFSET: u8 = 0x40;
/// Offset of the batch date field
pub const BATCH_DATE_OFFSET: u8 = 0x50;
/// Offset of the test date field
pub const TEST_DATE_OFFSET: u8 = 0x60;
/// Offset of the trailing spacer field
pub const SPACER_TAIL_OFFSET: u8 = 0x70;
/// Offset of the binary short form
pub const SHORT_FORM_OFFSET: u8 = 0x7D;

/// Binary identity tuple stored after the text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct ShortForm {
    /// Board type code
    pub board_type: u8,
    /// Model index
    pub board_id: u8,
    /// Packed revision byte
    pub revision: u8,
}

impl ShortForm {
    /// Size of the short form on the device
    pub const LEN: usize = core::mem::size_of::<Self>();

    /// Build the short form for a record
    pub fn from_record(record: &BoardRecord) -> Self {
        Self {
            board_type: record.board_type,
            board_id: record.board_id,
            revision: record.revision.pack(),
        }
    }

    /// Decode the short form from raw device bytes
    pub fn decode(bytes: &[u8; Self::LEN]) -> Self {
        zerocopy::transmute!(*bytes)
    }

    /// Unpacked revision
    pub fn revision(&self) -> Revision {
        Revision::unpack(self.revision)
    }
}

/// One encoded text field and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedField {
    /// Field name, for logging
    pub name: &'static str,
    /// Offset relative to the slot's base offset
    pub offset: u8,
    /// Field contents
    pub bytes: [u8; FIELD_LEN],
}

/// A complete record, ready to be written in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord {
    /// The eight text fields, in write order
    pub fields: Vec<EncodedField>,
    /// The binary short form, written last
    pub short_form: ShortForm,
}

/// Center `text` in a 16-byte field padded with spaces
pub fn encode_text(field: &'static str, text: &str) -> Result<[u8; FIELD_LEN]> {
    if !text.is_ascii() {
        return Err(Error::FieldNotAscii(field));
    }
    let bytes = text.as_bytes();
    if bytes.len() > FIELD_LEN {
        return Err(Error::FieldTooLong {
            field,
            len: bytes.len(),
            max: FIELD_LEN,
        });
    }

    let left = (FIELD_LEN - bytes.len()) / 2;
    let mut out = [b' '; FIELD_LEN];
    out[left..left + bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

/// Decode a text field, stripping the centering padding
///
/// Erased (0xFF) and zero bytes count as padding, so a cleared device
/// decodes to empty strings.
pub fn decode_text(bytes: &[u8]) -> String {
    let cleaned: Vec<u8> = bytes
        .iter()
        .map(|&b| if b == 0xFF || b == 0x00 { b' ' } else { b })
        .collect();
    String::from_utf8_lossy(&cleaned).trim().to_string()
}

/// Encode a record into its text fields and short form
///
/// The type and model names are resolved through `table`; the record's
/// free-text fields must already be validated (ASCII, at most 16 bytes).
pub fn encode_record(record: &BoardRecord, table: &BoardTypeTable) -> Result<EncodedRecord> {
    let type_name = table
        .type_name(record.board_type)
        .ok_or(Error::UnknownBoardType(record.board_type))?;
    let model_name =
        table
            .model_name(record.board_type, record.board_id)
            .ok_or(Error::UnknownModel {
                board_type: record.board_type,
                board_id: record.board_id,
            })?;

    let field = |name, offset, text: &str| -> Result<EncodedField> {
        Ok(EncodedField {
            name,
            offset,
            bytes: encode_text(name, text)?,
        })
    };

    let fields = vec![
        field("spacer", SPACER_HEAD_OFFSET, "")?,
        field("type", TYPE_NAME_OFFSET, type_name)?,
        field("model", MODEL_NAME_OFFSET, model_name)?,
        field("revision", REVISION_OFFSET, &record.revision.label())?,
        field("serial", SERIAL_OFFSET, &record.serial_number)?,
        field("batch date", BATCH_DATE_OFFSET, &record.batch_date)?,
        field("test date", TEST_DATE_OFFSET, &record.test_date)?,
        field("spacer", SPACER_TAIL_OFFSET, "")?,
    ];

    Ok(EncodedRecord {
        fields,
        short_form: ShortForm::from_record(record),
    })
}

/// Decode a whole 128-byte record window
///
/// Only the short form and the three free-text fields are authoritative;
/// the name and revision text fields are derived from the short form when
/// writing and are ignored here.
pub fn decode_record(window: &[u8; RECORD_LEN]) -> BoardRecord {
    let text = |offset: u8| decode_text(&window[offset as usize..offset as usize + FIELD_LEN]);
    let so = SHORT_FORM_OFFSET as usize;
    let short = ShortForm::decode(&[window[so], window[so + 1], window[so + 2]]);

    BoardRecord {
        board_type: short.board_type,
        board_id: short.board_id,
        revision: short.revision(),
        serial_number: text(SERIAL_OFFSET),
        batch_date: text(BATCH_DATE_OFFSET),
        test_date: text(TEST_DATE_OFFSET),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::IntoBytes;

    fn table() -> BoardTypeTable {
        BoardTypeTable::from_json_str(
            r#"{"type": {"1": "Carrier"}, "id": {"Carrier": ["CarrierV2", "CarrierV3"]}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_text_round_trip() {
        let samples = [
            "",
            "A",
            "SN1234",
            "odd",
            "2024-01-31",
            "exactly16chars!!",
            "  padded  ",
        ];
        for s in samples {
            let encoded = encode_text("test", s).unwrap();
            assert_eq!(decode_text(&encoded), s.trim(), "round trip of {:?}", s);
        }
    }

    #[test]
    fn test_odd_padding_goes_right() {
        assert_eq!(&encode_text("t", "abc").unwrap(), b"      abc       ");
        assert_eq!(&encode_text("t", "ab").unwrap(), b"       ab       ");
    }

    #[test]
    fn test_encode_rejects_long_and_non_ascii() {
        assert!(matches!(
            encode_text("serial", "seventeen chars!!"),
            Err(Error::FieldTooLong { len: 17, .. })
        ));
        assert!(matches!(
            encode_text("serial", "caf\u{e9}"),
            Err(Error::FieldNotAscii("serial"))
        ));
    }

    #[test]
    fn test_decode_erased_field() {
        assert_eq!(decode_text(&[0xFF; FIELD_LEN]), "");
        assert_eq!(decode_text(&[0x00; FIELD_LEN]), "");
    }

    #[test]
    fn test_short_form_bytes() {
        let short = ShortForm {
            board_type: 1,
            board_id: 2,
            revision: 0x21,
        };
        assert_eq!(short.as_bytes(), &[1, 2, 0x21]);
        assert_eq!(ShortForm::decode(&[1, 2, 0x21]), short);
        assert_eq!(short.revision(), Revision::new(2, 1));
    }

    #[test]
    fn test_encode_record_layout() {
        let record = BoardRecord {
            board_type: 1,
            board_id: 1,
            revision: Revision::new(2, 1),
            serial_number: "SN1234".into(),
            batch_date: "2024-01".into(),
            test_date: String::new(),
        };
        let encoded = encode_record(&record, &table()).unwrap();
        let offsets: Vec<u8> = encoded.fields.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, [0x00, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70]);
        assert_eq!(decode_text(&encoded.fields[1].bytes), "Carrier");
        assert_eq!(decode_text(&encoded.fields[2].bytes), "CarrierV3");
        assert_eq!(decode_text(&encoded.fields[3].bytes), "Rev2.1");
        assert_eq!(encoded.short_form.as_bytes(), &[1, 1, 0x21]);
    }

    #[test]
    fn test_encode_record_unknown_model() {
        let record = BoardRecord {
            board_type: 1,
            board_id: 5,
            ..Default::default()
        };
        assert!(matches!(
            encode_record(&record, &table()),
            Err(Error::UnknownModel {
                board_type: 1,
                board_id: 5
            })
        ));
    }

    #[test]
    fn test_decode_record_window() {
        let mut window = [b' '; RECORD_LEN];
        window[SERIAL_OFFSET as usize..][..FIELD_LEN]
            .copy_from_slice(&encode_text("serial", "SN1").unwrap());
        window[SHORT_FORM_OFFSET as usize..][..3].copy_from_slice(&[3, 4, 0x52]);

        let record = decode_record(&window);
        assert_eq!(record.board_type, 3);
        assert_eq!(record.board_id, 4);
        assert_eq!(record.revision, Revision::new(5, 2));
        assert_eq!(record.serial_number, "SN1");
        assert_eq!(record.batch_date, "");
    }
}
