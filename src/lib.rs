//! # Atlas DAQ Core Library
//!
//! Host-side acquisition for the Atlas thermistor instrument. The instrument sits
//! on a serial port at 250000 baud and answers a single `r` request with a
//! text header, a fixed footer and a binary stream of resistance samples. This
//! crate speaks that protocol and turns the samples into temperatures.
//!
//! ## Crate Structure
//!
//! - **`conversion`**: Steinhart-Hart resistance to °C conversion with an explicit
//!   valid domain; out-of-range samples become `None`.
//! - **`protocol`**: the framing state machine (`FrameDecoder`) and payload codec.
//! - **`session`**: `InstrumentSession`, owner of one link, with `read_resistances`
//!   and `read_celsius`.
//! - **`discovery`**: port enumeration and "first port that opens" selection.
//! - **`mock`**: an in-memory instrument for tests and demos.
//! - **`config`**: Figment-based configuration (TOML file + `ATLAS_` environment).
//! - **`logging`**: `tracing-subscriber` setup.
//! - **`error`**: the `AtlasError` enum shared by all of the above.
//!
//! ## Example
//!
//! ```no_run
//! use atlas_daq::{discovery, conversion::DEFAULT_DIGITS};
//!
//! if let Some(mut atlas) = discovery::auto_connect()? {
//!     println!("{:?}", atlas.read_celsius(DEFAULT_DIGITS)?);
//! }
//! # Ok::<(), atlas_daq::AtlasError>(())
//! ```

pub mod config;
pub mod conversion;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod mock;
pub mod protocol;
pub mod session;

pub use conversion::{ohms_to_celsius, SteinhartHart, DEFAULT_DIGITS};
pub use error::{AppResult, AtlasError};
pub use protocol::{Frame, FrameDecoder, FrameState, PayloadWord, RawSample};
pub use session::{InstrumentLink, InstrumentSession, SerialSession};
