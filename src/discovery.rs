//! Serial port discovery
//!
//! The instrument has no identification handshake, so discovery is simply "the
//! first port that opens". Candidates are tried in the order the OS reports them.

use std::fmt;

use serialport::{SerialPortInfo, SerialPortType};
use tracing::{debug, info};

use crate::error::{AppResult, AtlasError};
use crate::session::SerialSession;

/// Serial ports currently present, in OS order.
pub fn available_ports() -> AppResult<Vec<SerialPortInfo>> {
    serialport::available_ports().map_err(AtlasError::Discovery)
}

/// Names of the ports to try, in order.
pub fn candidate_ports() -> AppResult<Vec<String>> {
    Ok(available_ports()?
        .into_iter()
        .map(|port| port.port_name)
        .collect())
}

/// Try `open` on each candidate and return the first success.
///
/// Failures are logged and skipped; `None` means every candidate failed.
pub fn connect_first<T, I, F>(candidates: I, mut open: F) -> Option<T>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
    F: FnMut(&str) -> AppResult<T>,
{
    for candidate in candidates {
        let name = candidate.as_ref();
        match open(name) {
            Ok(connected) => {
                info!(port = name, "instrument connected");
                return Some(connected);
            }
            Err(err) => debug!(port = name, error = %err, "candidate rejected"),
        }
    }
    None
}

/// Open a session on the first serial port that accepts the Atlas settings.
pub fn auto_connect() -> AppResult<Option<SerialSession>> {
    let candidates = candidate_ports()?;
    debug!(count = candidates.len(), "scanning serial ports");
    Ok(connect_first(candidates, SerialSession::open))
}

/// Human-readable summary of one port, for `atlas ports`.
pub struct PortDescription<'a>(pub &'a SerialPortInfo);

impl fmt::Display for PortDescription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.port_name)?;
        match &self.0.port_type {
            SerialPortType::UsbPort(usb) => {
                write!(f, " - USB (VID: 0x{:04x}, PID: 0x{:04x})", usb.vid, usb.pid)?;
                if let Some(product) = &usb.product {
                    write!(f, " {product}")?;
                }
                Ok(())
            }
            SerialPortType::BluetoothPort => write!(f, " - Bluetooth"),
            SerialPortType::PciPort => write!(f, " - PCI"),
            SerialPortType::Unknown => write!(f, " - Unknown"),
        }
    }
}
