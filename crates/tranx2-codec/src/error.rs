/// Field of a protocol line, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Prefix,
    TransponderId,
    PassingTicks,
    Hits,
    Strength,
    Trailing,
    NoiseLevel,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Prefix => "prefix",
            Field::TransponderId => "transponder id",
            Field::PassingTicks => "passing ticks",
            Field::Hits => "hits",
            Field::Strength => "strength",
            Field::Trailing => "trailing",
            Field::NoiseLevel => "noise level",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur while decoding a single protocol line.
///
/// These are local to one line. Readers and clients report them and carry on
/// with the next line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The trimmed line is not the fixed width of its message kind.
    #[error("invalid message length {len} (expected {expected}): {line:?}")]
    Length {
        line: String,
        len: usize,
        expected: usize,
    },

    /// The line does not start with the marker of the requested kind.
    #[error("unexpected marker {found:?} (expected {expected:?}): {line:?}")]
    Marker {
        line: String,
        found: char,
        expected: char,
    },

    /// A field's hex text could not be decoded.
    #[error("failed to parse {field}: {source}: {line:?}")]
    Field {
        field: Field,
        line: String,
        source: hex::FromHexError,
    },
}

impl DecodeError {
    /// The raw (trimmed) line that failed to decode.
    pub fn line(&self) -> &str {
        match self {
            DecodeError::Length { line, .. }
            | DecodeError::Marker { line, .. }
            | DecodeError::Field { line, .. } => line,
        }
    }

    /// The offending field, if the failure was a field decode.
    pub fn field(&self) -> Option<Field> {
        match self {
            DecodeError::Field { field, .. } => Some(*field),
            _ => None,
        }
    }
}

/// Errors that can occur while encoding a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Transponder id does not fit the 24-bit wire field.
    #[error("transponder id overflow ({0:#x}, max 0xffffff)")]
    TransponderIdOverflow(u32),
}

/// Errors that can occur while reading or writing a protocol stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A line was read but did not decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A record could not be encoded; nothing was written.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// An I/O error occurred on the underlying source or sink.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source reached end of stream.
    #[error("end of stream")]
    EndOfStream,

    /// The sink accepted zero bytes mid-message.
    #[error("stream closed while writing")]
    WriteZero,
}

impl StreamError {
    /// True for failures of the underlying byte source (including end of stream),
    /// as opposed to a single bad line.
    pub fn is_source_error(&self) -> bool {
        matches!(self, StreamError::Io(_) | StreamError::EndOfStream)
    }

    /// True when the source ran out of data cleanly.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, StreamError::EndOfStream)
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
