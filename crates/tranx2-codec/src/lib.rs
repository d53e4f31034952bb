//! Line codec for the TranX-2 serial protocol.
//!
//! The decoder emits one ASCII line per record, terminated by `\r\n`:
//! - `#` + 4 hex digits: a 16-bit noise level sample
//! - `$` + 24 hex digits: a transponder passing
//!
//! All fields are fixed width and big-endian, so a line is validated
//! structurally (length, marker) before any field is parsed.

pub mod codec;
pub mod error;
pub mod marker;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_line, decode_noise, decode_passing, encode_noise, encode_passing, Message, Passing,
    LINE_TERMINATOR, MAX_TRANSPONDER_ID, NOISE_MSG_LEN, PASSING_MSG_LEN,
};
pub use error::{DecodeError, EncodeError, Field, Result, StreamError};
pub use marker::{MessageKind, NOISE_MARKER, PASSING_MARKER};
pub use reader::{LineConfig, Reader, DEFAULT_MAX_LINE_LENGTH};
pub use writer::Writer;
