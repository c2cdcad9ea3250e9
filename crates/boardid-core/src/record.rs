//! Board identity record

use core::fmt;
use core::str::FromStr;

use crate::source::ValidationError;

/// Hardware revision, stored on the device as one packed byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Revision {
    /// Major revision (upper nibble when packed)
    pub major: u8,
    /// Minor revision (lower nibble when packed)
    pub minor: u8,
}

impl Revision {
    /// Largest value either component can hold once packed
    pub const MAX_COMPONENT: u8 = 0x0F;

    /// Create a revision
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Pack into the on-device byte, `major << 4 | minor`
    ///
    /// Components above 15 are truncated to their low nibble.
    pub fn pack(self) -> u8 {
        pack_revision(self.major, Some(self.minor))
    }

    /// Unpack the on-device byte
    pub fn unpack(byte: u8) -> Self {
        Self {
            major: byte >> 4,
            minor: byte & 0x0F,
        }
    }

    /// Label written to the revision text field, e.g. `Rev2.1`
    pub fn label(self) -> String {
        format!("Rev{}.{}", self.major, self.minor)
    }
}

impl Default for Revision {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Revision {
    type Err = ValidationError;

    /// Parse `major[.minor]`, optionally prefixed with `Rev`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("Rev")
            .or_else(|| trimmed.strip_prefix("rev"))
            .unwrap_or(trimmed);
        let bad = || ValidationError::BadRevision(s.to_string());

        let (major, minor) = match body.split_once('.') {
            Some((major, minor)) => (major, Some(minor)),
            None => (body, None),
        };
        let major: u8 = major.trim().parse().map_err(|_| bad())?;
        let minor: u8 = match minor.map(str::trim) {
            Some("") | None => 0,
            Some(m) => m.parse().map_err(|_| bad())?,
        };
        if major > Self::MAX_COMPONENT || minor > Self::MAX_COMPONENT {
            return Err(bad());
        }
        Ok(Self { major, minor })
    }
}

/// Pack a revision byte; an omitted minor counts as 0
pub fn pack_revision(major: u8, minor: Option<u8>) -> u8 {
    (major << 4) | (minor.unwrap_or(0) & 0x0F)
}

/// One board's identity fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoardRecord {
    /// Index into the board type table's type list
    pub board_type: u8,
    /// Index into the model list for `board_type`
    pub board_id: u8,
    /// Hardware revision
    pub revision: Revision,
    /// Serial number (at most 16 characters)
    pub serial_number: String,
    /// Batch date (at most 16 characters)
    pub batch_date: String,
    /// Test date (at most 16 characters)
    pub test_date: String,
}

impl BoardRecord {
    /// A fresh record for a board of the given type
    pub fn new(board_type: u8) -> Self {
        Self {
            board_type,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_all() {
        for major in 0..=15u8 {
            for minor in 0..=15u8 {
                let rev = Revision::new(major, minor);
                assert_eq!(Revision::unpack(rev.pack()), rev);
            }
        }
    }

    #[test]
    fn test_pack_without_minor() {
        assert_eq!(pack_revision(3, None), 3 << 4);
        assert_eq!(Revision::unpack(pack_revision(3, None)), Revision::new(3, 0));
    }

    #[test]
    fn test_parse_revision() {
        assert_eq!("2.1".parse::<Revision>().unwrap(), Revision::new(2, 1));
        assert_eq!("2".parse::<Revision>().unwrap(), Revision::new(2, 0));
        assert_eq!("2.".parse::<Revision>().unwrap(), Revision::new(2, 0));
        assert_eq!("Rev4.15".parse::<Revision>().unwrap(), Revision::new(4, 15));
        assert!("16.0".parse::<Revision>().is_err());
        assert!("1.16".parse::<Revision>().is_err());
        assert!("a.b".parse::<Revision>().is_err());
        assert!("".parse::<Revision>().is_err());
    }

    #[test]
    fn test_label() {
        assert_eq!(Revision::new(2, 1).label(), "Rev2.1");
        assert_eq!(Revision::new(2, 1).to_string(), "2.1");
    }
}
