//! Custom error types for the application.
//!
//! This module defines the primary error type, `AtlasError`, for the whole crate.
//! Using the `thiserror` crate, it gives one consistent place for every failure that
//! can happen between opening a serial port and handing back a batch of readings.
//!
//! ## Error Hierarchy
//!
//! - **`Connection`**: the serial port could not be opened or configured (missing
//!   device, permission denied, already in use). Discovery moves on to the next
//!   candidate when it sees this.
//! - **`ProtocolTimeout`**: the instrument stopped answering before a required line
//!   or payload word arrived. The session stays open; the read is abandoned.
//! - **`UnexpectedEof`**: the link reported end of stream mid-frame. Real serial
//!   ports time out instead, but injected links can end.
//! - **`UnexpectedInput`**: the frame decoder was fed a line while it expected a
//!   payload word, or the other way round.
//! - **`Io`**: any other link failure.
//! - **`Config`** / **`Configuration`**: configuration loading and validation.
//!
//! Out-of-domain resistances are not errors at all: the conversion engine returns
//! `None` for them and the batch carries on.

use crate::protocol::FrameState;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, AtlasError>;

/// Every failure the Atlas crate can report.
#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Failed to open serial port '{port}': {source}")]
    Connection {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Instrument did not answer within the read timeout while {phase}")]
    ProtocolTimeout { phase: FrameState },

    #[error("Unexpected end of stream from instrument while {phase}")]
    UnexpectedEof { phase: FrameState },

    #[error("Frame decoder received {received} while {state}")]
    UnexpectedInput {
        state: FrameState,
        received: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to enumerate serial ports: {0}")]
    Discovery(#[source] serialport::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),
}

impl From<figment::Error> for AtlasError {
    fn from(value: figment::Error) -> Self {
        AtlasError::Config(Box::new(value))
    }
}

impl AtlasError {
    /// Whether retrying the same operation on the same session can succeed.
    ///
    /// Timeouts leave the link open, so the caller may issue another request.
    /// Everything else needs a new session or a fixed configuration.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AtlasError::ProtocolTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_the_phase() {
        let err = AtlasError::ProtocolTimeout {
            phase: FrameState::ReadingPayload,
        };
        assert_eq!(
            err.to_string(),
            "Instrument did not answer within the read timeout while reading payload"
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn connection_error_keeps_port_and_source() {
        let err = AtlasError::Connection {
            port: "/dev/ttyACM7".to_string(),
            source: serialport::Error::new(serialport::ErrorKind::NoDevice, "gone"),
        };
        let message = err.to_string();
        assert!(message.contains("/dev/ttyACM7"));
        assert!(message.contains("gone"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_retryable());
    }

    #[test]
    fn io_errors_convert_with_question_mark() {
        fn fails() -> AppResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(AtlasError::Io(_))));
    }
}
