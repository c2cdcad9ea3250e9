//! Deploy-time configuration
//!
//! Parses configuration files in TOML format:
//!
//! ```toml
//! board_types = "/usr/share/boardid/board_types.json"
//!
//! [protection]
//! write_enable = false
//! clear_enable = false
//!
//! [timing]
//! settle_ms = 100
//!
//! [[slot]]
//! name = "carrier"
//! bus = 1
//! address = 0x50
//! board_type = 1
//! base_offset = 0x00
//! optional = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::codec::RECORD_LEN;
use crate::error::{Error, Result};

/// Default device size (a 2-Kbit EEPROM)
pub const DEFAULT_DEVICE_SIZE: u16 = 256;

/// Default page-write size
pub const DEFAULT_PAGE_SIZE: u16 = 16;

/// Default settle delay after each block write
pub const DEFAULT_SETTLE_MS: u64 = 100;

/// Destructive-operation gates
///
/// Both gates are off unless the configuration turns them on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Protection {
    /// Allow `write_all`
    pub write_enable: bool,
    /// Allow `clear_all`
    pub clear_enable: bool,
    /// File the gates were read from, named in refusal notices
    pub origin: Option<PathBuf>,
}

impl Protection {
    /// Gates with both operations enabled and no origin file
    pub fn unlocked() -> Self {
        Self {
            write_enable: true,
            clear_enable: true,
            origin: None,
        }
    }
}

/// Device timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Pause after every block write
    pub settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
        }
    }
}

/// One device position in the assembly topology
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct SlotDef {
    /// Unique slot name, used in prompts and reports
    pub name: String,
    /// Bus the device sits on
    pub bus: u8,
    /// 7-bit device address
    #[serde(deserialize_with = "deserialize_hex_u8")]
    pub address: u8,
    /// Board type code expected in this position
    pub board_type: u8,
    /// Offset of the record window within the device
    #[serde(default, deserialize_with = "deserialize_hex_u8")]
    pub base_offset: u8,
    /// Whether the board may be legitimately missing
    #[serde(default)]
    pub optional: bool,
    /// Device size in bytes
    #[serde(default = "default_device_size")]
    pub size: u16,
    /// Device page-write size in bytes
    #[serde(default = "default_page_size")]
    pub page_size: u16,
    /// Prefix prepended to operator-entered serial numbers
    #[serde(default)]
    pub serial_prefix: String,
}

fn default_device_size() -> u16 {
    DEFAULT_DEVICE_SIZE
}

fn default_page_size() -> u16 {
    DEFAULT_PAGE_SIZE
}

impl SlotDef {
    /// A mandatory slot with default device geometry
    pub fn new(name: impl Into<String>, bus: u8, address: u8, board_type: u8) -> Self {
        Self {
            name: name.into(),
            bus,
            address,
            board_type,
            base_offset: 0,
            optional: false,
            size: DEFAULT_DEVICE_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            serial_prefix: String::new(),
        }
    }

    /// Set the record window offset
    pub fn with_base_offset(mut self, base_offset: u8) -> Self {
        self.base_offset = base_offset;
        self
    }

    /// Mark the slot as optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Set the device page size
    pub fn with_page_size(mut self, page_size: u16) -> Self {
        self.page_size = page_size;
        self
    }

    /// Record window as a half-open byte range within the device
    pub fn record_window(&self) -> core::ops::Range<usize> {
        let start = self.base_offset as usize;
        start..start + RECORD_LEN
    }

    /// Check the device geometry and that the record window fits
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 || self.size > 256 {
            return Err(Error::Config(format!(
                "slot '{}': size {} must be 1..=256 (8-bit register addressing)",
                self.name, self.size
            )));
        }
        if self.page_size == 0 || self.size % self.page_size != 0 {
            return Err(Error::Config(format!(
                "slot '{}': page size {} does not divide device size {}",
                self.name, self.page_size, self.size
            )));
        }
        if self.record_window().end > self.size as usize {
            return Err(Error::Config(format!(
                "slot '{}': record at 0x{:02X} does not fit in a {}-byte device",
                self.name, self.base_offset, self.size
            )));
        }
        Ok(())
    }
}

/// Deserialize a u8 that can be hex (0x...) or decimal
fn deserialize_hex_u8<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrInt {
        Int(u8),
        Str(String),
    }

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(n),
        HexOrInt::Str(s) => parse_number(&s).map_err(serde::de::Error::custom),
    }
}

/// Parse a number that can be hex (0x...) or decimal
pub fn parse_number(s: &str) -> std::result::Result<u8, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| format!("invalid number: {}", e))
    }
}

/// TOML configuration file structure
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    board_types: Option<PathBuf>,
    #[serde(default)]
    protection: ProtectionSection,
    #[serde(default)]
    timing: TimingSection,
    #[serde(default)]
    slot: Vec<SlotDef>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ProtectionSection {
    #[serde(default)]
    write_enable: bool,
    #[serde(default)]
    clear_enable: bool,
}

#[derive(Debug, serde::Deserialize)]
struct TimingSection {
    #[serde(default = "default_settle_ms")]
    settle_ms: u64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

fn default_settle_ms() -> u64 {
    DEFAULT_SETTLE_MS
}

/// Complete deploy-time configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Board type table file, if configured
    pub board_types: Option<PathBuf>,
    /// Destructive-operation gates
    pub protection: Protection,
    /// Device timing
    pub timing: Timing,
    /// Slots in declaration order
    pub slots: Vec<SlotDef>,
}

impl Config {
    /// Load a configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.protection.origin = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;

        let config = Self {
            board_types: file.board_types,
            protection: Protection {
                write_enable: file.protection.write_enable,
                clear_enable: file.protection.clear_enable,
                origin: None,
            },
            timing: Timing {
                settle: Duration::from_millis(file.timing.settle_ms),
            },
            slots: file.slot,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the topology for consistency
    pub fn validate(&self) -> Result<()> {
        if self.slots.is_empty() {
            return Err(Error::Config("no slots defined".into()));
        }

        for (i, slot) in self.slots.iter().enumerate() {
            slot.validate()?;

            for other in &self.slots[..i] {
                if other.name == slot.name {
                    return Err(Error::Config(format!("duplicate slot name '{}'", slot.name)));
                }
                let same_device = other.bus == slot.bus && other.address == slot.address;
                let a = slot.record_window();
                let b = other.record_window();
                if same_device && a.start < b.end && b.start < a.end {
                    return Err(Error::Config(format!(
                        "slots '{}' and '{}' overlap on bus {} address 0x{:02X}",
                        other.name, slot.name, slot.bus, slot.address
                    )));
                }
            }
        }
        Ok(())
    }

    /// Bus ids referenced by the topology, ascending and unique
    pub fn bus_ids(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.slots.iter().map(|s| s.bus).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
