//! Board type table
//!
//! Maps board type codes to display names, and each board type to the
//! ordered list of model names a model index selects from. The table is
//! loaded once from a JSON file:
//!
//! ```json
//! {
//!     "type": { "1": "Carrier", "2": "Sensor" },
//!     "id": {
//!         "Carrier": ["CarrierV2", "CarrierV3"],
//!         "Sensor": ["SensorA"]
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Raw JSON layout of the table file
#[derive(Debug, serde::Deserialize)]
struct TableFile {
    #[serde(rename = "type")]
    types: BTreeMap<String, String>,
    #[serde(rename = "id", default)]
    models: BTreeMap<String, Vec<String>>,
}

/// Parse a type code key, decimal or 0x-prefixed hex
fn parse_code(s: &str) -> Result<u8> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|_| Error::Table(format!("invalid board type code '{}'", s)))
}

/// Read-only lookup from board type codes to type and model names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardTypeTable {
    types: BTreeMap<u8, String>,
    models: BTreeMap<String, Vec<String>>,
}

impl BoardTypeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the table from a JSON file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let table = Self::from_json_str(&content)?;
        log::debug!(
            "Loaded {} board types from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse the table from a JSON string
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: TableFile = serde_json::from_str(content)?;

        let mut types = BTreeMap::new();
        for (code, name) in file.types {
            let code = parse_code(&code)?;
            if types.insert(code, name).is_some() {
                return Err(Error::Table(format!("board type {} listed twice", code)));
            }
        }

        for type_name in file.models.keys() {
            if !types.values().any(|name| name == type_name) {
                log::warn!("Model list for unknown board type '{}' ignored", type_name);
            }
        }

        Ok(Self {
            types,
            models: file.models,
        })
    }

    /// Add a board type with its models
    pub fn insert(&mut self, code: u8, name: impl Into<String>, models: Vec<String>) {
        let name = name.into();
        self.models.insert(name.clone(), models);
        self.types.insert(code, name);
    }

    /// Display name of a board type
    pub fn type_name(&self, code: u8) -> Option<&str> {
        self.types.get(&code).map(String::as_str)
    }

    /// Ordered model names for a board type, empty if unknown
    pub fn models(&self, code: u8) -> &[String] {
        self.type_name(code)
            .and_then(|name| self.models.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Display name of a model
    pub fn model_name(&self, code: u8, index: u8) -> Option<&str> {
        self.models(code).get(index as usize).map(String::as_str)
    }

    /// Iterate over `(code, type name, models)` in code order
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str, &[String])> {
        self.types
            .iter()
            .map(move |(&code, name)| (code, name.as_str(), self.models(code)))
    }

    /// Number of board types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the table has no board types
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
