//! Push-style client for TranX-2 decoders.
//!
//! A [`Client`] owns one byte source and calls back into a [`Handler`] for
//! every passing, noise sample and malformed line it reads. Protocol errors
//! are reported per line; only a failing source stops the loop.
//!
//! ```no_run
//! use tranx2_client::{Callbacks, Client};
//!
//! let handler = Callbacks {
//!     on_passing: |rec| println!("passing: {rec:?}"),
//!     on_noise: |noise| println!("noise: {noise}"),
//!     on_error: |err| eprintln!("bad line: {err}"),
//! };
//! let mut client = Client::new("/dev/ttyUSB0", handler);
//! client.listen()?;
//! let err = client.serve();
//! eprintln!("decoder stream ended: {err}");
//! # Ok::<(), tranx2_client::ClientError>(())
//! ```

pub mod client;
pub mod error;
pub mod handler;

pub use client::Client;
pub use error::{ClientError, Result};
pub use handler::{Callbacks, Event, Handler};
