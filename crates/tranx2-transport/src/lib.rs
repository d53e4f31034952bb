//! Serial transport for TranX-2 loop decoders.
//!
//! The decoder hardware talks over a plain RS-232 link. This crate opens the
//! device node, puts it into raw mode with the requested line settings and
//! hands back a [`SerialStream`] that the protocol layers read from.
//!
//! This is the lowest layer of tranx2. Nothing here knows about the wire
//! protocol itself.

pub mod error;
pub mod options;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use options::{Parity, SerialOptions, DEFAULT_BAUD_RATE, DEFAULT_MINIMUM_READ_SIZE};
pub use traits::SerialStream;

#[cfg(unix)]
pub use serial::SerialPort;
