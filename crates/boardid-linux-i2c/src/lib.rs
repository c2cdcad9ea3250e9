//! boardid-linux-i2c - Linux i2c-dev support
//!
//! This crate drives board ID EEPROMs through the Linux `/dev/i2c-N`
//! character devices.
//!
//! # Overview
//!
//! Every I2C adapter the kernel knows about is exposed as `/dev/i2c-N`,
//! where N is the adapter number. Bus ids in the boardid topology are
//! these adapter numbers. Transfers use the `I2C_RDWR` ioctl, so the
//! register pointer write and the data read happen in one combined
//! transaction.
//!
//! # Usage with boardid CLI
//!
//! ```bash
//! # Read every board using /dev/i2c-N
//! boardid -t linux_i2c read
//!
//! # Adapter nodes in another directory
//! boardid -t linux_i2c:devdir=/run/i2c probe
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with i2c-dev support (`CONFIG_I2C_CHARDEV`)
//! - Read/write access to `/dev/i2c-N`, usually via the `i2c` group

pub mod device;
pub mod error;

// Re-exports
pub use device::{map_errno, parse_options, LinuxI2c, LinuxI2cConfig};
pub use error::{LinuxI2cError, Result};

/// Open the adapter for `bus_id` and return a boxed transport
///
/// This is a convenience function for use in the CLI transport dispatch.
///
/// # Options
///
/// - `devdir=/dev` - Optional: directory holding the `i2c-N` nodes
pub fn open_linux_i2c(
    options: &[(&str, &str)],
    bus_id: u8,
) -> std::result::Result<Box<dyn boardid_core::bus::BusTransport>, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    let bus = LinuxI2c::open(&config, bus_id)?;
    Ok(Box::new(bus))
}
