//! Mock Atlas instrument
//!
//! An in-memory stand-in for the serial link, used by the test suite and by
//! `atlas read --mock`. It behaves like the real firmware at the byte level:
//!
//! - every `r` written queues one response frame
//! - reads hand out queued bytes, at most `chunk_size` at a time
//! - an empty queue reports `TimedOut`, like a serial port past its read timeout
//!
//! # Example
//!
//! ```
//! use atlas_daq::mock::{FrameBuilder, MockLink};
//! use atlas_daq::session::InstrumentSession;
//!
//! let frame = FrameBuilder::new().ohms([10_000, 12_000]);
//! let mut session = InstrumentSession::from_link("mock", MockLink::new(&frame));
//! assert_eq!(session.read_resistances().unwrap().len(), 2);
//! ```

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use crate::protocol::{PayloadWord, RawSample, FOOTER_LINES, HEADER_TERMINATOR, REQUEST};
use crate::session::InstrumentLink;

/// Builds the bytes of one instrument response.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    header: Vec<String>,
    footer: Vec<String>,
    words: Vec<[u8; 2]>,
    terminated: bool,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuilder {
    /// Empty header, blank footer, no samples, sentinel appended.
    pub fn new() -> Self {
        Self {
            header: Vec::new(),
            footer: vec![String::new(); FOOTER_LINES],
            words: Vec::new(),
            terminated: true,
        }
    }

    /// A plausible frame from a four-channel probe, one channel open.
    pub fn demo() -> Self {
        Self::new()
            .header_line("Atlas thermistor array")
            .header_line("fw 1,4 ch 4")
            .footer(["min 9500", "max 12000", "ref 2,048", "ok"])
            .ohms([10_000, 9_500, 0, 12_000])
    }

    /// Append a header line (the terminator is added by [`build`](Self::build)).
    pub fn header_line(mut self, line: impl Into<String>) -> Self {
        self.header.push(line.into());
        self
    }

    /// Replace the footer block.
    pub fn footer(mut self, lines: [&str; FOOTER_LINES]) -> Self {
        self.footer = lines.iter().map(|line| line.to_string()).collect();
        self
    }

    /// Append samples, saturating values the wire cannot carry.
    pub fn ohms(mut self, ohms: impl IntoIterator<Item = u32>) -> Self {
        self.words.extend(
            ohms.into_iter()
                .map(|o| PayloadWord::Sample(RawSample::saturating_from_ohms(o)).encode()),
        );
        self
    }

    /// Append a literal payload word, sentinel included.
    pub fn word(mut self, bytes: [u8; 2]) -> Self {
        self.words.push(bytes);
        self
    }

    /// Leave the trailing sentinel off.
    pub fn unterminated(mut self) -> Self {
        self.terminated = false;
        self
    }

    /// Serialize to wire bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        let terminator = HEADER_TERMINATOR.to_string();
        for line in self.header.iter().chain([&terminator]).chain(&self.footer) {
            bytes.extend_from_slice(line.as_bytes());
            bytes.extend_from_slice(b"\r\n");
        }
        for word in &self.words {
            bytes.extend_from_slice(word);
        }
        if self.terminated {
            bytes.extend_from_slice(&PayloadWord::EndOfStream.encode());
        }
        bytes
    }
}

/// Scripted serial link answering `r` requests with a fixed response.
#[derive(Debug, Clone)]
pub struct MockLink {
    response: Vec<u8>,
    pending: VecDeque<u8>,
    written: Vec<u8>,
    requests: usize,
    chunk_size: usize,
    cut_after: Option<usize>,
}

impl MockLink {
    /// Link that answers every request with `frame`.
    pub fn new(frame: &FrameBuilder) -> Self {
        Self::with_response(frame.build())
    }

    /// Link that answers every request with raw `bytes`.
    pub fn with_response(bytes: Vec<u8>) -> Self {
        Self {
            response: bytes,
            pending: VecDeque::new(),
            written: Vec::new(),
            requests: 0,
            chunk_size: 64,
            cut_after: None,
        }
    }

    /// Link that never answers.
    pub fn silent() -> Self {
        Self::with_response(Vec::new())
    }

    /// Deliver at most `size` bytes per read call (minimum 1).
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Stop each response after `bytes` bytes, then go quiet.
    pub fn cut_after(mut self, bytes: usize) -> Self {
        self.cut_after = Some(bytes);
        self
    }

    /// Push extra bytes into the receive queue, as line noise or a late reply would.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes);
    }

    /// Number of request bytes received.
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Everything written by the host so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    fn queue_response(&mut self) {
        let len = self
            .cut_after
            .map_or(self.response.len(), |cut| cut.min(self.response.len()));
        self.pending.extend(&self.response[..len]);
    }
}

impl InstrumentLink for MockLink {
    fn discard_input(&mut self) -> io::Result<usize> {
        let pending = self.pending.len();
        self.pending.clear();
        Ok(pending)
    }
}

impl Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "mock instrument has nothing to send",
            ));
        }
        let n = buf.len().min(self.chunk_size).min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            self.written.push(byte);
            if byte == REQUEST {
                self.requests += 1;
                self.queue_response();
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
