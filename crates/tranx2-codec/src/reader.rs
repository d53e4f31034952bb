use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::codec::{decode_line, decode_noise, decode_passing, first_marker, Message, Passing};
use crate::error::{Result, StreamError};
use crate::marker::MessageKind;

/// Default upper bound for a single line, terminator excluded.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 1024;

/// Configuration for the line reader.
#[derive(Debug, Clone)]
pub struct LineConfig {
    /// Longest line returned in one piece. Longer lines are split into
    /// `max_line_length`-sized pieces, each returned as its own line.
    pub max_line_length: usize,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Reads protocol lines from any `Read` source.
///
/// [`read_passing`](Reader::read_passing) and [`read_noise`](Reader::read_noise)
/// return only their own record kind and **discard** every line of the other
/// kind they pass over. Nothing is queued: a caller alternating between the two
/// loses whatever was interleaved. Use [`read_message`](Reader::read_message)
/// to see both kinds in stream order.
pub struct Reader<T> {
    inner: T,
    buf: BytesMut,
    config: LineConfig,
}

impl<T: Read> Reader<T> {
    /// Create a new reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, LineConfig::default())
    }

    /// Create a new reader with explicit configuration.
    pub fn with_config(inner: T, config: LineConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next line (blocking), without its `\n` or `\r\n` terminator.
    ///
    /// A trailing fragment without terminator is returned as a final line.
    /// Returns `Err(StreamError::EndOfStream)` once the source is exhausted.
    pub fn read_line(&mut self) -> Result<Bytes> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(StreamError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Err(StreamError::EndOfStream);
                }
                let mut rest = self.buf.split();
                strip_cr(&mut rest);
                return Ok(rest.freeze());
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read until the next passing line and decode it.
    ///
    /// Empty lines and lines of any other kind are skipped. A passing line
    /// that fails to decode is returned as `StreamError::Decode` without
    /// retrying; the next call continues after it.
    pub fn read_passing(&mut self) -> Result<Passing> {
        let line = self.next_line_of(MessageKind::Passing)?;
        Ok(decode_passing(&line)?)
    }

    /// Read until the next noise line and decode it.
    ///
    /// Mirror of [`read_passing`](Reader::read_passing).
    pub fn read_noise(&mut self) -> Result<u16> {
        let line = self.next_line_of(MessageKind::Noise)?;
        Ok(decode_noise(&line)?)
    }

    /// Read the next record of either kind.
    ///
    /// Empty lines and lines with an unknown marker are skipped.
    pub fn read_message(&mut self) -> Result<Message> {
        loop {
            let line = self.read_line()?;
            match decode_line(&line) {
                Some(result) => return Ok(result?),
                None => trace!(len = line.len(), "skipping uninterpreted line"),
            }
        }
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    ///
    /// Bytes already buffered but not yet returned as lines are lost.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the maximum line length for subsequent reads.
    pub fn set_max_line_length(&mut self, max_line_length: usize) {
        self.config.max_line_length = max_line_length;
    }

    /// Current reader configuration.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    fn next_line_of(&mut self, kind: MessageKind) -> Result<Bytes> {
        loop {
            let line = self.read_line()?;
            match first_marker(&line) {
                Some(marker) if marker == kind.marker() => return Ok(line),
                Some(marker) => trace!(
                    wanted = kind.name(),
                    marker = %char::from(marker),
                    "discarding line"
                ),
                None => {}
            }
        }
    }

    fn take_line(&mut self) -> Option<Bytes> {
        let max = self.config.max_line_length.max(1);
        let window = self.buf.len().min(max + 1);

        if let Some(pos) = self.buf[..window].iter().position(|b| *b == b'\n') {
            let mut line = self.buf.split_to(pos + 1);
            line.truncate(pos);
            strip_cr(&mut line);
            return Some(line.freeze());
        }

        if self.buf.len() > max {
            trace!(max, "splitting overlong line");
            return Some(self.buf.split_to(max).freeze());
        }

        None
    }
}

fn strip_cr(line: &mut BytesMut) {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::error::{DecodeError, Field};

    const PASSINGS_WITH_NOISE: &str = "#0970\r\n#096F\r\n#0971\r\n#096E\r\n#096C\r\n#0968\r\n#096D\r\n#096E\r\n#0970\r\n#0971\r\n#096F\r\n$09000235BF3436E021358700\r\n#096F\r\n#0970\r\n#096E\r\n#096C\r\n#0974\r\n$09000235BF34374BDD318700\r\n#0974\r\n#096D\r\n#096F\r\n#0971\r\n#0973\r\n#096D\r\n$09000235BF3437BEAC3E8800\r\n";

    fn reader(input: &str) -> Reader<Cursor<Vec<u8>>> {
        Reader::new(Cursor::new(input.as_bytes().to_vec()))
    }

    fn passing(passing_ticks: u32, hits: u8, strength: u8) -> Passing {
        Passing {
            transponder_id: 144831,
            passing_ticks,
            hits,
            strength,
            prefix: 2304,
            trailing: 0,
        }
    }

    #[test]
    fn read_passings_skipping_noise() {
        let mut r = reader(PASSINGS_WITH_NOISE);
        let mut got = Vec::new();
        let err = loop {
            match r.read_passing() {
                Ok(rec) => got.push(rec),
                Err(err) => break err,
            }
        };

        assert!(matches!(err, StreamError::EndOfStream));
        assert_eq!(
            got,
            vec![
                passing(876011553, 53, 135),
                passing(876039133, 49, 135),
                passing(876068524, 62, 136),
            ]
        );
    }

    #[test]
    fn first_passing_after_noise_run() {
        let mut r = reader(PASSINGS_WITH_NOISE);
        assert_eq!(r.read_passing().unwrap(), passing(876011553, 53, 135));
    }

    #[test]
    fn read_noise_levels() {
        let mut r = reader("#0970\r\n#096F\r\n#0971\r\n#096E\r\n#096C\r\n#0968\r\n#096D\r\n#096E\r\n#0970\r\n");
        let mut got = Vec::new();
        let err = loop {
            match r.read_noise() {
                Ok(noise) => got.push(noise),
                Err(err) => break err,
            }
        };

        assert!(err.is_end_of_stream());
        assert_eq!(got, vec![2416, 2415, 2417, 2414, 2412, 2408, 2413, 2414, 2416]);
    }

    #[test]
    fn read_noise_discards_passings() {
        let mut r = reader("$09000235BF3436E021358700\r\n\r\n#0970\r\n");
        assert_eq!(r.read_noise().unwrap(), 2416);
        assert!(r.read_passing().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn alternating_reads_drop_the_other_kind() {
        let mut r = reader("#0970\r\n$09000235BF3436E021358700\r\n#096F\r\n#0971\r\n");
        assert_eq!(r.read_passing().unwrap(), passing(876011553, 53, 135));
        // #0970 was consumed while looking for the passing.
        assert_eq!(r.read_noise().unwrap(), 2415);
        assert_eq!(r.read_noise().unwrap(), 2417);
    }

    #[test]
    fn passing_errors_are_returned_not_retried() {
        let cases = [
            ("$09000235BF3436E0213587\r\n", None),
            ("$09M00235BF3036E021358700\r\n", Some(Field::Prefix)),
            ("$090002M5BF3036E021358700\r\n", Some(Field::TransponderId)),
            ("$09000235BF3M36E021358700\r\n", Some(Field::PassingTicks)),
            ("$09000235BF3036E021M58700\r\n", Some(Field::Hits)),
            ("$09000235BF3036E02155M700\r\n", Some(Field::Strength)),
            ("$09000235BF3036E02135870M\r\n", Some(Field::Trailing)),
        ];
        let input: String = cases.iter().map(|(line, _)| *line).collect();
        let mut r = reader(&input);

        for (line, field) in cases {
            let err = r.read_passing().unwrap_err();
            match (err, field) {
                (StreamError::Decode(DecodeError::Length { .. }), None) => {}
                (StreamError::Decode(err), Some(field)) => {
                    assert_eq!(err.field(), Some(field), "line {line:?}")
                }
                (other, _) => panic!("unexpected error for {line:?}: {other}"),
            }
        }
        assert!(r.read_passing().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn noise_errors_are_returned() {
        let mut r = reader("#090\r\n#097J\r\n");
        assert!(matches!(
            r.read_noise(),
            Err(StreamError::Decode(DecodeError::Length { .. }))
        ));
        assert!(matches!(
            r.read_noise(),
            Err(StreamError::Decode(DecodeError::Field {
                field: Field::NoiseLevel,
                ..
            }))
        ));
    }

    #[test]
    fn read_message_sees_both_kinds_in_order() {
        let mut r = reader("#0970\r\n\r\n?garbage\r\n$09000235BF3436E021358700\r\n#09\r\n");
        assert_eq!(r.read_message().unwrap(), Message::Noise(2416));
        assert_eq!(
            r.read_message().unwrap(),
            Message::Passing(passing(876011553, 53, 135))
        );
        assert!(matches!(
            r.read_message(),
            Err(StreamError::Decode(DecodeError::Length { .. }))
        ));
        assert!(r.read_message().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn read_line_strips_terminators() {
        let mut r = reader("#0970\r\n#096F\n\r\nlast");
        assert_eq!(r.read_line().unwrap().as_ref(), b"#0970");
        assert_eq!(r.read_line().unwrap().as_ref(), b"#096F");
        assert!(r.read_line().unwrap().is_empty());
        assert_eq!(r.read_line().unwrap().as_ref(), b"last");
        assert!(matches!(r.read_line(), Err(StreamError::EndOfStream)));
    }

    #[test]
    fn unterminated_final_line_is_decoded() {
        let mut r = reader("#0970\r\n#096F");
        assert_eq!(r.read_noise().unwrap(), 2416);
        assert_eq!(r.read_noise().unwrap(), 2415);
        assert!(r.read_noise().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn empty_source_is_end_of_stream() {
        let mut r = reader("");
        assert!(matches!(r.read_passing(), Err(StreamError::EndOfStream)));
    }

    #[test]
    fn overlong_line_is_split() {
        let cfg = LineConfig { max_line_length: 8 };
        let input = b"$0123456789ABCDEF\r\n#0970\r\n".to_vec();
        let mut r = Reader::with_config(Cursor::new(input), cfg);

        assert_eq!(r.read_line().unwrap().as_ref(), b"$0123456");
        assert_eq!(r.read_line().unwrap().as_ref(), b"789ABCDE");
        assert_eq!(r.read_line().unwrap().as_ref(), b"F");
        assert_eq!(r.read_line().unwrap().as_ref(), b"#0970");
    }

    #[test]
    fn overlong_passing_fails_decode_then_stream_continues() {
        let cfg = LineConfig { max_line_length: 32 };
        let mut input = b"$".to_vec();
        input.extend(std::iter::repeat(b'A').take(40));
        input.extend_from_slice(b"\r\n$09000235BF3436E021358700\r\n");
        let mut r = Reader::with_config(Cursor::new(input), cfg);

        assert!(matches!(
            r.read_passing(),
            Err(StreamError::Decode(DecodeError::Length { len: 32, .. }))
        ));
        // The rest of the overlong line has no marker and is skipped.
        assert_eq!(r.read_passing().unwrap(), passing(876011553, 53, 135));
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: b"#0970\r\n$09000235BF3436E021358700\r\n".to_vec(),
            pos: 0,
        };
        let mut r = Reader::new(byte_reader);

        assert_eq!(r.read_noise().unwrap(), 2416);
        assert_eq!(r.read_passing().unwrap(), passing(876011553, 53, 135));
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let source = FailOnceThenData {
            kind: ErrorKind::Interrupted,
            failed: false,
            data: Cursor::new(b"#0970\r\n".to_vec()),
        };
        let mut r = Reader::new(source);
        assert_eq!(r.read_noise().unwrap(), 2416);
    }

    #[test]
    fn read_error_propagates_unwrapped() {
        let source = FailOnceThenData {
            kind: ErrorKind::BrokenPipe,
            failed: false,
            data: Cursor::new(b"#0970\r\n".to_vec()),
        };
        let mut r = Reader::new(source);
        let err = r.read_noise().unwrap_err();
        assert!(err.is_source_error());
        assert!(matches!(err, StreamError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    struct FailOnceThenData {
        kind: ErrorKind,
        failed: bool,
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailOnceThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(std::io::Error::from(self.kind));
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut r = reader("");
        r.set_max_line_length(64);
        assert_eq!(r.config().max_line_length, 64);

        let _ = r.get_ref();
        let _ = r.get_mut();
        let _inner = r.into_inner();
    }
}
