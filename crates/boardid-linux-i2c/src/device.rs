//! Linux I2C adapter implementation
//!
//! This module provides the `LinuxI2c` struct that implements the
//! `BusTransport` trait on top of the i2c-dev `I2C_RDWR` ioctl, so every
//! register access is a single combined transfer with a repeated start.

use crate::error::{LinuxI2cError, Result};

use boardid_core::bus::{BusError, BusTransport};
use nix::errno::Errno;

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Directory holding the i2c-dev nodes
const DEFAULT_DEVDIR: &str = "/dev";

/// Linux i2c-dev ioctl constants
mod ioctl {
    use nix::{ioctl_read_bad, ioctl_write_ptr_bad};

    const I2C_FUNCS: u16 = 0x0705;
    const I2C_RDWR: u16 = 0x0707;

    /// Adapter supports plain I2C-level commands
    pub const I2C_FUNC_I2C: libc::c_ulong = 0x0000_0001;

    /// Message flag: read from the device
    pub const I2C_M_RD: u16 = 0x0001;

    /// Kernel `struct i2c_msg`
    #[repr(C)]
    pub struct I2cMsg {
        pub addr: u16,
        pub flags: u16,
        pub len: u16,
        pub buf: *mut u8,
    }

    /// Kernel `struct i2c_rdwr_ioctl_data`
    #[repr(C)]
    pub struct I2cRdwrIoctlData {
        pub msgs: *mut I2cMsg,
        pub nmsgs: u32,
    }

    ioctl_read_bad!(i2c_funcs, I2C_FUNCS, libc::c_ulong);
    ioctl_write_ptr_bad!(i2c_rdwr, I2C_RDWR, I2cRdwrIoctlData);
}

use ioctl::I2cMsg;

/// Configuration for opening Linux I2C adapters
#[derive(Debug, Clone)]
pub struct LinuxI2cConfig {
    /// Directory containing the `i2c-N` nodes
    pub devdir: PathBuf,
}

impl Default for LinuxI2cConfig {
    fn default() -> Self {
        Self {
            devdir: PathBuf::from(DEFAULT_DEVDIR),
        }
    }
}

impl LinuxI2cConfig {
    /// Path of the adapter node for `bus_id`
    pub fn device_path(&self, bus_id: u8) -> PathBuf {
        self.devdir.join(format!("i2c-{}", bus_id))
    }
}

/// One Linux I2C adapter
pub struct LinuxI2c {
    file: File,
    path: String,
}

impl LinuxI2c {
    /// Open adapter `bus_id` under the configured device directory
    pub fn open(config: &LinuxI2cConfig, bus_id: u8) -> Result<Self> {
        Self::open_path(&config.device_path(bus_id))
    }

    /// Open an adapter node by path
    pub fn open_path(path: &Path) -> Result<Self> {
        let path_str = path.display().to_string();
        log::debug!("linux_i2c: Opening device {}", path_str);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| LinuxI2cError::OpenFailed {
                path: path_str.clone(),
                source: e,
            })?;

        let mut funcs: libc::c_ulong = 0;
        unsafe {
            ioctl::i2c_funcs(file.as_raw_fd(), &mut funcs).map_err(|e| {
                LinuxI2cError::FuncsFailed {
                    path: path_str.clone(),
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }
        if funcs & ioctl::I2C_FUNC_I2C == 0 {
            return Err(LinuxI2cError::NotSupported(path_str));
        }

        log::info!("linux_i2c: Opened {} (funcs=0x{:08X})", path_str, funcs);
        Ok(Self {
            file,
            path: path_str,
        })
    }

    /// Path of the adapter node
    pub fn path(&self) -> &str {
        &self.path
    }

    fn transfer(&mut self, msgs: &mut [I2cMsg]) -> std::result::Result<(), BusError> {
        let data = ioctl::I2cRdwrIoctlData {
            msgs: msgs.as_mut_ptr(),
            nmsgs: msgs.len() as u32,
        };
        let addr = msgs.first().map(|m| m.addr as u8).unwrap_or(0);
        unsafe { ioctl::i2c_rdwr(self.file.as_raw_fd(), &data) }
            .map(|_| ())
            .map_err(|e| map_errno(e, addr))
    }
}

impl BusTransport for LinuxI2c {
    fn read_block(&mut self, addr: u8, register: u8, buf: &mut [u8]) -> std::result::Result<(), BusError> {
        let len = u16::try_from(buf.len())
            .map_err(|_| BusError::Fault(format!("read of {} bytes too long", buf.len())))?;
        let mut reg = [register];
        let mut msgs = [
            I2cMsg {
                addr: addr as u16,
                flags: 0,
                len: 1,
                buf: reg.as_mut_ptr(),
            },
            I2cMsg {
                addr: addr as u16,
                flags: ioctl::I2C_M_RD,
                len,
                buf: buf.as_mut_ptr(),
            },
        ];
        self.transfer(&mut msgs)
    }

    fn write_block(&mut self, addr: u8, register: u8, data: &[u8]) -> std::result::Result<(), BusError> {
        // Register address and payload go out in one message
        let mut frame = Vec::with_capacity(data.len() + 1);
        frame.push(register);
        frame.extend_from_slice(data);
        let len = u16::try_from(frame.len())
            .map_err(|_| BusError::Fault(format!("write of {} bytes too long", data.len())))?;

        let mut msgs = [I2cMsg {
            addr: addr as u16,
            flags: 0,
            len,
            buf: frame.as_mut_ptr(),
        }];
        self.transfer(&mut msgs)
    }
}

/// Translate an ioctl failure into a bus error
///
/// i2c-dev reports a missing acknowledge as ENXIO or EREMOTEIO depending
/// on the adapter driver.
pub fn map_errno(errno: Errno, addr: u8) -> BusError {
    match errno {
        Errno::ENXIO | Errno::EREMOTEIO => BusError::Nack { addr },
        Errno::ETIMEDOUT => BusError::Timeout,
        other => BusError::Fault(other.desc().to_string()),
    }
}

/// Parse transport options from a list of key-value pairs
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxI2cConfig, String> {
    let mut config = LinuxI2cConfig::default();

    for (key, value) in options {
        match *key {
            "devdir" => {
                if value.is_empty() {
                    return Err("devdir must not be empty".to_string());
                }
                config.devdir = PathBuf::from(value);
            }
            _ => {
                log::warn!("linux_i2c: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_default() {
        let config = parse_options(&[]).unwrap();
        assert_eq!(config.device_path(3), PathBuf::from("/dev/i2c-3"));
    }

    #[test]
    fn test_parse_options_devdir() {
        let config = parse_options(&[("devdir", "/tmp/fake")]).unwrap();
        assert_eq!(config.device_path(0), PathBuf::from("/tmp/fake/i2c-0"));
        assert!(parse_options(&[("devdir", "")]).is_err());
    }

    #[test]
    fn test_errno_mapping() {
        assert_eq!(map_errno(Errno::ENXIO, 0x50), BusError::Nack { addr: 0x50 });
        assert_eq!(map_errno(Errno::EREMOTEIO, 0x51), BusError::Nack { addr: 0x51 });
        assert_eq!(map_errno(Errno::ETIMEDOUT, 0x50), BusError::Timeout);
        assert!(matches!(map_errno(Errno::EIO, 0x50), BusError::Fault(_)));
    }

    #[test]
    fn test_open_missing_node() {
        let config = LinuxI2cConfig {
            devdir: PathBuf::from("/nonexistent-boardid-test"),
        };
        assert!(matches!(
            LinuxI2c::open(&config, 0),
            Err(LinuxI2cError::OpenFailed { .. })
        ));
    }
}
