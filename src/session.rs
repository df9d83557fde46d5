//! Instrument session
//!
//! An [`InstrumentSession`] owns one link to an Atlas instrument and runs the
//! request/response exchange described in [`crate::protocol`]. The link is any
//! blocking [`InstrumentLink`]; on hardware it is a `serialport` handle opened by
//! [`SerialSession::open`].
//!
//! Every read is all-or-error: a timeout in any phase returns
//! [`AtlasError::ProtocolTimeout`] and discards whatever was decoded so far. The
//! link stays open and the caller decides whether to retry. Dropping the session
//! closes the link.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, debug_span, warn};

use crate::conversion::ohms_to_celsius;
use crate::error::{AppResult, AtlasError};
use crate::protocol::{self, Frame, RawSample, REQUEST};

/// Line rate of the instrument firmware.
pub const BAUD_RATE: u32 = 250_000;

/// Per-read timeout on the serial link.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// A session over a real serial port.
pub type SerialSession = InstrumentSession<Box<dyn SerialPort>>;

/// Blocking byte link to an instrument.
pub trait InstrumentLink: Read + Write {
    /// Drop bytes already received but not yet read, returning how many.
    ///
    /// Called before every request so the tail of an abandoned frame is not
    /// parsed as the next header.
    fn discard_input(&mut self) -> io::Result<usize> {
        Ok(0)
    }
}

impl InstrumentLink for Box<dyn SerialPort> {
    fn discard_input(&mut self) -> io::Result<usize> {
        let pending = self.bytes_to_read()?;
        if pending > 0 {
            self.clear(ClearBuffer::Input)?;
        }
        Ok(pending as usize)
    }
}

/// Exclusive owner of one instrument link.
pub struct InstrumentSession<L> {
    port_name: String,
    link: BufReader<L>,
}

impl SerialSession {
    /// Open `port_name` at 250000 baud with a 1 s read timeout and DTR/RTS asserted.
    ///
    /// Nothing is sent to the instrument; success only means the OS accepted the
    /// port configuration.
    pub fn open(port_name: &str) -> AppResult<Self> {
        let connection_error = |source: serialport::Error| AtlasError::Connection {
            port: port_name.to_string(),
            source,
        };

        let mut port = serialport::new(port_name, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(connection_error)?;
        port.write_data_terminal_ready(true)
            .map_err(connection_error)?;
        port.write_request_to_send(true)
            .map_err(connection_error)?;

        debug!(port = port_name, baud = BAUD_RATE, "serial link opened");
        Ok(Self::from_link(port_name, port))
    }
}

impl<L: InstrumentLink> InstrumentSession<L> {
    /// Wrap an already open link.
    pub fn from_link(port_name: impl Into<String>, link: L) -> Self {
        Self {
            port_name: port_name.into(),
            link: BufReader::new(link),
        }
    }

    /// Identifier of the port this session talks to.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// The underlying link.
    pub fn link(&self) -> &L {
        self.link.get_ref()
    }

    /// Request one frame and decode it completely.
    pub fn read_frame(&mut self) -> AppResult<Frame> {
        let span = debug_span!("read_frame", port = %self.port_name);
        let _guard = span.enter();

        self.send_request()?;
        let frame = protocol::read_frame(&mut self.link)?;
        debug!(
            header_lines = frame.header.len(),
            samples = frame.samples.len(),
            "frame received"
        );
        Ok(frame)
    }

    /// Request one batch of resistance samples, in emission order.
    pub fn read_resistances(&mut self) -> AppResult<Vec<RawSample>> {
        Ok(self.read_frame()?.samples)
    }

    /// Request one batch and convert it to °C rounded to `digits`.
    ///
    /// Samples outside the thermistor's valid range come back as `None` in place.
    pub fn read_celsius(&mut self, digits: i32) -> AppResult<Vec<Option<f64>>> {
        Ok(self
            .read_resistances()?
            .into_iter()
            .map(|sample| ohms_to_celsius(sample.ohms(), digits))
            .collect())
    }

    /// Close the link.
    pub fn close(self) {}

    fn send_request(&mut self) -> AppResult<()> {
        // Leftovers from an abandoned frame would be parsed as the next header
        let buffered = self.link.buffer().len();
        self.link.consume(buffered);
        let link = self.link.get_mut();
        let stale = buffered + link.discard_input()?;
        if stale > 0 {
            warn!(bytes = stale, "discarding stale input before request");
        }

        link.write_all(&[REQUEST])?;
        link.flush()?;
        Ok(())
    }
}

impl<L> fmt::Debug for InstrumentSession<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentSession")
            .field("port_name", &self.port_name)
            .finish_non_exhaustive()
    }
}

impl<L> Drop for InstrumentSession<L> {
    fn drop(&mut self) {
        debug!(port = %self.port_name, "closing serial link");
    }
}
