/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The serial port could not be opened or configured.
    #[error("transport error: {0}")]
    Transport(#[from] tranx2_transport::TransportError),

    /// The byte source failed or reached end of stream.
    #[error("stream error: {0}")]
    Stream(#[from] tranx2_codec::StreamError),

    /// `serve` was called before `listen` or `set_stream`.
    #[error("client is not connected")]
    NotConnected,
}

impl ClientError {
    /// True when the source ended cleanly.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, ClientError::Stream(err) if err.is_end_of_stream())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
