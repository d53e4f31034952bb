//! TranX-2 transponder decoder protocol.
//!
//! TranX-2 loop decoders report transponder passings and loop noise levels as
//! hex-encoded ASCII lines over a serial link. This crate bundles the pieces
//! needed to talk to one.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial port setup (termios raw mode, baud rate, `VMIN`/`VTIME`)
//! - [`codec`]: line encoding and decoding, the filtering `Reader` and the `Writer`
//! - [`client`]: callback-driven dispatch loop (behind the `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use tranx2_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use tranx2_codec::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use tranx2_client::*;
}
