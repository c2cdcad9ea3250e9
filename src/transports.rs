//! Transport registration and dispatch
//!
//! Transports are feature-gated. A transport string is the transport name
//! optionally followed by options, e.g. `dummy:absent=0x51/0x52,size=256`.

use boardid_core::{BusSet, BusTransport, Config};

/// Information about a transport
pub struct TransportInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available transports (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_transports() -> Vec<TransportInfo> {
    let mut transports = Vec::new();

    #[cfg(feature = "linux-i2c")]
    transports.push(TransportInfo {
        name: "linux_i2c",
        aliases: &["linux-i2c", "i2c-dev"],
        description: "Linux i2c-dev interface, one /dev/i2c-N per bus (devdir=<dir>)",
    });

    #[cfg(feature = "dummy")]
    transports.push(TransportInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory EEPROM emulator (absent=<addr>/<addr>,size=<bytes>)",
    });

    transports
}

/// Generate help text listing all available transports
pub fn transport_help() -> String {
    let transports = available_transports();

    if transports.is_empty() {
        return "No transports available (recompile with transport features enabled)".to_string();
    }

    let mut help = String::from("Available transports:\n");
    for t in &transports {
        help.push_str(&format!("  {:10} - {}\n", t.name, t.description));
        if !t.aliases.is_empty() {
            help.push_str(&format!("  {:10}   aliases: {}\n", "", t.aliases.join(", ")));
        }
    }
    help
}

/// Resolve a transport name or alias to its primary name
pub fn find_transport(name: &str) -> Option<&'static str> {
    available_transports()
        .into_iter()
        .find(|t| t.name == name || t.aliases.contains(&name))
        .map(|t| t.name)
}

/// Parse a transport string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_transport_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// Open one transport per bus referenced by `config`
#[allow(unused_variables)]
pub fn open_buses(
    transport: &str,
    config: &Config,
) -> Result<BusSet<Box<dyn BusTransport>>, Box<dyn std::error::Error>> {
    let (name, options) = parse_transport_string(transport);
    let canonical_name = find_transport(name).ok_or_else(|| unknown_transport_error(name))?;

    let mut buses: BusSet<Box<dyn BusTransport>> = BusSet::new();
    match canonical_name {
        #[cfg(feature = "linux-i2c")]
        "linux_i2c" => {
            for bus_id in config.bus_ids() {
                let bus = boardid_linux_i2c::open_linux_i2c(&options, bus_id).map_err(|e| {
                    format!(
                        "Failed to open I2C bus {}: {}\n\
                         Make sure i2c-dev is loaded and you have read/write permissions.\n\
                         You may need to: sudo usermod -aG i2c $USER",
                        bus_id, e
                    )
                })?;
                buses.insert(bus_id, bus);
            }
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            let dummy = parse_dummy_options(&options)?;
            for bus_id in config.bus_ids() {
                buses.insert(bus_id, Box::new(dummy.build(bus_id, config)));
            }
            log::info!(
                "Using dummy transport ({} buses, contents are not persisted)",
                buses.len()
            );
        }

        _ => return Err(unknown_transport_error(name)),
    }

    Ok(buses)
}

/// Options of the dummy transport
#[cfg(feature = "dummy")]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DummyOptions {
    /// Addresses left unpopulated on every bus
    pub absent: Vec<u8>,
    /// Emulated device size in bytes
    pub size: Option<usize>,
}

#[cfg(feature = "dummy")]
impl DummyOptions {
    /// Build the emulated bus for `bus_id`, with one erased device per slot
    pub fn build(&self, bus_id: u8, config: &Config) -> boardid_dummy::DummyBus {
        let mut dummy_config = boardid_dummy::DummyConfig::default();
        if let Some(size) = self.size {
            dummy_config.size = size;
        }
        let mut bus = boardid_dummy::DummyBus::new(dummy_config);
        for slot in config.slots.iter().filter(|s| s.bus == bus_id) {
            if !self.absent.contains(&slot.address) {
                bus.add_device(slot.address);
            }
        }
        bus
    }
}

/// Parse the dummy transport options
#[cfg(feature = "dummy")]
pub fn parse_dummy_options(options: &[(&str, &str)]) -> Result<DummyOptions, String> {
    use boardid_core::config::parse_number;

    let mut parsed = DummyOptions::default();
    for (key, value) in options {
        match *key {
            "absent" => {
                for addr in value.split('/').filter(|a| !a.is_empty()) {
                    let addr = parse_number(addr).map_err(|e| format!("Invalid absent address: {}", e))?;
                    parsed.absent.push(addr);
                }
            }
            "size" => {
                let size: usize = value
                    .parse()
                    .map_err(|_| format!("Invalid size value: {}", value))?;
                let page_size = boardid_dummy::DummyConfig::default().page_size;
                if size == 0 || size > 256 || size % page_size != 0 {
                    return Err(format!(
                        "Invalid dummy size: {} (must be a multiple of {} up to 256)",
                        size, page_size
                    ));
                }
                parsed.size = Some(size);
            }
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }
    Ok(parsed)
}

fn unknown_transport_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown transport: {}\n\n", name);
    msg.push_str(&transport_help());
    msg.push_str("\nUse 'boardid list-transports' for more details");
    msg.into()
}
