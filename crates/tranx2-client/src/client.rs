use std::io::Read;
use std::path::PathBuf;

use tracing::{debug, info};
use tranx2_codec::{LineConfig, Message, Reader, StreamError};
use tranx2_transport::{SerialOptions, SerialStream};

use crate::error::{ClientError, Result};
use crate::handler::Handler;

/// Reads a decoder's line stream and dispatches every record to a [`Handler`].
///
/// A client owns its byte source exclusively. By default the source is a
/// serial port opened with [`listen`](Client::listen); any other `Read`
/// source can be attached with [`from_stream`](Client::from_stream) or
/// [`set_stream`](Client::set_stream).
pub struct Client<H, T = SerialStream> {
    opts: SerialOptions,
    handler: H,
    conn: Option<Reader<T>>,
    line_config: LineConfig,
}

impl<H: Handler> Client<H, SerialStream> {
    /// Create a client for the given serial device with default line settings
    /// (9600 baud, 8N1, reads return once at least 2 bytes arrived).
    ///
    /// Nothing is opened until [`listen`](Client::listen).
    pub fn new(port_name: impl Into<PathBuf>, handler: H) -> Self {
        Self {
            opts: SerialOptions::new(port_name),
            handler,
            conn: None,
            line_config: LineConfig::default(),
        }
    }

    /// Open the serial port and attach it as the source.
    ///
    /// A previously attached source is dropped first.
    pub fn listen(&mut self) -> Result<()> {
        self.close();

        #[cfg(not(unix))]
        {
            return Err(tranx2_transport::TransportError::Open {
                path: self.opts.port_name.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "serial ports are only supported on Unix",
                ),
            }
            .into());
        }

        #[cfg(unix)]
        {
            let stream = tranx2_transport::SerialPort::open(&self.opts)?;
            info!(port = %self.opts.port_name.display(), "client listening");
            self.conn = Some(Reader::with_config(stream, self.line_config.clone()));
            Ok(())
        }
    }
}

impl<H: Handler, T: Read> Client<H, T> {
    /// Create a client already attached to `stream`.
    pub fn from_stream(stream: T, handler: H) -> Self {
        Self {
            opts: SerialOptions::default(),
            handler,
            conn: Some(Reader::new(stream)),
            line_config: LineConfig::default(),
        }
    }

    /// Replace the source. Bytes buffered from the old source are discarded.
    pub fn set_stream(&mut self, stream: T) {
        self.conn = Some(Reader::with_config(stream, self.line_config.clone()));
    }

    /// Set the line length limit for this and any future source.
    pub fn with_line_config(mut self, config: LineConfig) -> Self {
        if let Some(reader) = self.conn.as_mut() {
            reader.set_max_line_length(config.max_line_length);
        }
        self.line_config = config;
        self
    }

    pub fn options(&self) -> &SerialOptions {
        &self.opts
    }

    /// Serial settings used by the next [`listen`](Client::listen).
    pub fn options_mut(&mut self) -> &mut SerialOptions {
        &mut self.opts
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Run the dispatch loop until the source fails.
    ///
    /// Each passing or noise line results in exactly one callback. Lines that
    /// fail to decode go to [`Handler::on_error`] and the loop continues;
    /// empty lines and lines with an unknown marker produce no callback.
    ///
    /// The loop only ends when the next line cannot be obtained. The returned
    /// error is that source error, typically `StreamError::EndOfStream` or an
    /// I/O error, wrapped in [`ClientError::Stream`]. The source stays attached
    /// so the caller decides whether to retry, [`close`](Client::close) or reopen.
    pub fn serve(&mut self) -> ClientError {
        let Self { handler, conn, .. } = self;
        let Some(reader) = conn.as_mut() else {
            return ClientError::NotConnected;
        };

        let mut passings = 0u64;
        let mut noises = 0u64;
        let mut errors = 0u64;

        loop {
            match reader.read_message() {
                Ok(Message::Passing(rec)) => {
                    passings += 1;
                    handler.on_passing(rec);
                }
                Ok(Message::Noise(noise)) => {
                    noises += 1;
                    handler.on_noise(noise);
                }
                Err(StreamError::Decode(err)) => {
                    errors += 1;
                    debug!(error = %err, "line failed to decode");
                    handler.on_error(err);
                }
                Err(err) => {
                    debug!(passings, noises, errors, error = %err, "serve loop ended");
                    return ClientError::Stream(err);
                }
            }
        }
    }

    /// Drop the attached source, closing it. Safe to call more than once.
    pub fn close(&mut self) {
        if self.conn.take().is_some() {
            debug!("client source closed");
        }
    }
}

impl<H, T> std::fmt::Debug for Client<H, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("port", &self.opts.port_name)
            .field("connected", &self.conn.is_some())
            .field("max_line_length", &self.line_config.max_line_length)
            .finish()
    }
}
