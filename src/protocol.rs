//! Atlas wire protocol
//!
//! One request byte (`r`) makes the instrument answer with a mixed text/binary frame:
//!
//! ```text
//! <header line>\n      zero or more, content opaque
//! r\n                  header terminator, discarded
//! <footer line>\n      exactly four, content opaque
//! <u16 le> ...         ohms / 4, one word per sample
//! 0xFF 0xFF            end-of-stream sentinel, discarded
//! ```
//!
//! Text lines are trimmed and have decimal commas rewritten to decimal points (the
//! firmware formats numbers with the host locale). The binary payload is untouched.
//!
//! Framing is modelled by [`FrameDecoder`], a sans-I/O state machine fed one line or
//! one payload word at a time. [`read_frame`] drives it over any blocking `BufRead`.

use std::fmt;
use std::io::{self, BufRead};

use tracing::{debug, trace};

use crate::error::{AppResult, AtlasError};

/// Byte sent to the instrument to request one frame.
pub const REQUEST: u8 = b'r';

/// Text line that ends the header block.
pub const HEADER_TERMINATOR: &str = "r";

/// Number of text lines that follow the header terminator.
pub const FOOTER_LINES: usize = 4;

/// Each payload count is worth this many ohms.
pub const OHMS_PER_COUNT: u32 = 4;

/// Decoded value of the `0xFFFF` end-of-stream word.
pub const SENTINEL_OHMS: u32 = u16::MAX as u32 * OHMS_PER_COUNT;

/// Position of the decoder inside one response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Collecting header lines until a line equal to `r` arrives.
    AwaitingHeaderTerminator,
    /// Consuming the fixed footer block.
    ReadingFooter {
        /// Footer lines still expected.
        remaining: usize,
    },
    /// Decoding 2-byte words until the sentinel.
    ReadingPayload,
    /// Sentinel seen; the frame is fully consumed.
    Complete,
}

impl FrameState {
    fn footer(remaining: usize) -> Self {
        if remaining == 0 {
            FrameState::ReadingPayload
        } else {
            FrameState::ReadingFooter { remaining }
        }
    }
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameState::AwaitingHeaderTerminator => write!(f, "awaiting the header terminator"),
            FrameState::ReadingFooter { remaining } => {
                write!(f, "reading footer ({remaining} lines left)")
            }
            FrameState::ReadingPayload => write!(f, "reading payload"),
            FrameState::Complete => write!(f, "frame complete"),
        }
    }
}

/// One resistance measurement in ohms, as decoded from the payload.
///
/// Always a multiple of [`OHMS_PER_COUNT`] and never equal to [`SENTINEL_OHMS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawSample(u32);

impl RawSample {
    /// Largest resistance a payload word can carry.
    pub const MAX_OHMS: u32 = SENTINEL_OHMS - OHMS_PER_COUNT;

    /// Build a sample from a resistance, if the wire format can represent it.
    pub fn from_ohms(ohms: u32) -> Option<Self> {
        (ohms % OHMS_PER_COUNT == 0 && ohms <= Self::MAX_OHMS).then_some(Self(ohms))
    }

    /// Nearest representable sample at or below `ohms`, capped at [`Self::MAX_OHMS`].
    pub fn saturating_from_ohms(ohms: u32) -> Self {
        Self(ohms.min(Self::MAX_OHMS) / OHMS_PER_COUNT * OHMS_PER_COUNT)
    }

    /// Resistance in ohms.
    pub fn ohms(self) -> u32 {
        self.0
    }

    /// Payload word for this sample.
    pub fn to_le_bytes(self) -> [u8; 2] {
        // MAX_OHMS / 4 fits in u16
        ((self.0 / OHMS_PER_COUNT) as u16).to_le_bytes()
    }
}

impl From<RawSample> for u32 {
    fn from(value: RawSample) -> Self {
        value.0
    }
}

impl fmt::Display for RawSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Ω", self.0)
    }
}

/// A decoded 2-byte payload word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadWord {
    /// A resistance sample.
    Sample(RawSample),
    /// The `0xFFFF` terminator.
    EndOfStream,
}

impl PayloadWord {
    /// Decode a little-endian word, scaling counts to ohms.
    pub fn decode(bytes: [u8; 2]) -> Self {
        let ohms = u32::from(u16::from_le_bytes(bytes)) * OHMS_PER_COUNT;
        if ohms == SENTINEL_OHMS {
            PayloadWord::EndOfStream
        } else {
            PayloadWord::Sample(RawSample(ohms))
        }
    }

    /// Encode back into wire bytes.
    pub fn encode(self) -> [u8; 2] {
        match self {
            PayloadWord::Sample(sample) => sample.to_le_bytes(),
            PayloadWord::EndOfStream => u16::MAX.to_le_bytes(),
        }
    }
}

/// Trim a received text line and rewrite decimal commas.
pub fn normalize_line(raw: &str) -> String {
    raw.trim().replace(',', ".")
}

/// A fully decoded response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Header lines before the terminator, normalized.
    pub header: Vec<String>,
    /// The fixed footer lines, normalized. Content is not interpreted.
    pub footer: Vec<String>,
    /// Samples in emission order, sentinel excluded.
    pub samples: Vec<RawSample>,
}

/// What the decoder needs next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// A newline-terminated text line.
    Line,
    /// Exactly two payload bytes.
    Word,
    /// Nothing; call [`FrameDecoder::finish`].
    Nothing,
}

/// Sans-I/O framing state machine for one response.
#[derive(Debug)]
pub struct FrameDecoder {
    state: FrameState,
    frame: Frame,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Decoder positioned at the start of a response.
    pub fn new() -> Self {
        Self {
            state: FrameState::AwaitingHeaderTerminator,
            frame: Frame::default(),
        }
    }

    /// Current state.
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Kind of input the current state consumes.
    pub fn expects(&self) -> Expect {
        match self.state {
            FrameState::AwaitingHeaderTerminator | FrameState::ReadingFooter { .. } => {
                Expect::Line
            }
            FrameState::ReadingPayload => Expect::Word,
            FrameState::Complete => Expect::Nothing,
        }
    }

    /// Feed one text line (with or without its line ending).
    pub fn push_line(&mut self, raw: &str) -> AppResult<()> {
        let line = normalize_line(raw);
        trace!(state = %self.state, line = %line, "frame line");
        match self.state {
            FrameState::AwaitingHeaderTerminator if line == HEADER_TERMINATOR => {
                self.transition(FrameState::footer(FOOTER_LINES));
            }
            FrameState::AwaitingHeaderTerminator => self.frame.header.push(line),
            FrameState::ReadingFooter { remaining } => {
                self.frame.footer.push(line);
                self.transition(FrameState::footer(remaining - 1));
            }
            state => {
                return Err(AtlasError::UnexpectedInput {
                    state,
                    received: "a text line",
                })
            }
        }
        Ok(())
    }

    /// Feed one 2-byte payload word.
    pub fn push_word(&mut self, bytes: [u8; 2]) -> AppResult<()> {
        if self.state != FrameState::ReadingPayload {
            return Err(AtlasError::UnexpectedInput {
                state: self.state,
                received: "a payload word",
            });
        }
        match PayloadWord::decode(bytes) {
            PayloadWord::Sample(sample) => {
                trace!(ohms = sample.ohms(), "payload sample");
                self.frame.samples.push(sample);
            }
            PayloadWord::EndOfStream => self.transition(FrameState::Complete),
        }
        Ok(())
    }

    /// Hand out the frame once the sentinel has been seen.
    pub fn finish(self) -> AppResult<Frame> {
        match self.state {
            FrameState::Complete => Ok(self.frame),
            phase => Err(AtlasError::UnexpectedEof { phase }),
        }
    }

    fn transition(&mut self, next: FrameState) {
        debug!(from = %self.state, to = %next, "frame state transition");
        self.state = next;
    }
}

/// Read one complete frame from a blocking reader.
///
/// The request byte must already have been sent. Either the whole frame is
/// returned or an error is; partially decoded samples are dropped.
pub fn read_frame<R: BufRead>(reader: &mut R) -> AppResult<Frame> {
    let mut decoder = FrameDecoder::new();
    let mut line = Vec::with_capacity(64);
    loop {
        match decoder.expects() {
            Expect::Line => {
                read_line(reader, &mut line, decoder.state())?;
                decoder.push_line(&String::from_utf8_lossy(&line))?;
            }
            Expect::Word => {
                let mut word = [0u8; 2];
                reader
                    .read_exact(&mut word)
                    .map_err(|err| classify_read_error(err, decoder.state()))?;
                decoder.push_word(word)?;
            }
            Expect::Nothing => return decoder.finish(),
        }
    }
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>, phase: FrameState) -> AppResult<()> {
    buf.clear();
    reader
        .read_until(b'\n', buf)
        .map_err(|err| classify_read_error(err, phase))?;
    // A line without its newline means the stream ended under us
    if buf.last() != Some(&b'\n') {
        return Err(AtlasError::UnexpectedEof { phase });
    }
    Ok(())
}

/// Map a link read failure onto the protocol error for `phase`.
pub(crate) fn classify_read_error(err: io::Error, phase: FrameState) -> AtlasError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            AtlasError::ProtocolTimeout { phase }
        }
        io::ErrorKind::UnexpectedEof => AtlasError::UnexpectedEof { phase },
        _ => AtlasError::Io(err),
    }
}
