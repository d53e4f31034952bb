use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError, Field};
use crate::marker::{MessageKind, NOISE_MARKER, PASSING_MARKER};

/// Largest transponder id the 24-bit wire field can carry.
pub const MAX_TRANSPONDER_ID: u32 = 0x00FF_FFFF;

/// Passing line length, marker included, terminator excluded.
pub const PASSING_MSG_LEN: usize = 25;

/// Noise line length, marker included, terminator excluded.
pub const NOISE_MSG_LEN: usize = 5;

/// Every line the decoder emits ends with CR LF.
pub const LINE_TERMINATOR: &[u8; 2] = b"\r\n";

const PREFIX: Range<usize> = 1..5;
const TRANSPONDER_ID: Range<usize> = 5..11;
const PASSING_TICKS: Range<usize> = 11..19;
const HITS: Range<usize> = 19..21;
const STRENGTH: Range<usize> = 21..23;
const TRAILING: Range<usize> = 23..25;
const NOISE_LEVEL: Range<usize> = 1..5;

/// A transponder crossing the loop.
///
/// `transponder_id` is 24 bits on the wire. Values above
/// [`MAX_TRANSPONDER_ID`] are rejected by the encoder rather than truncated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Passing {
    /// ID of the passing transponder.
    pub transponder_id: u32,
    /// Milliseconds since the decoder was started.
    pub passing_ticks: u32,
    /// Number of loop reads while the transponder passed.
    pub hits: u8,
    /// Signal strength.
    pub strength: u8,
    /// Opaque leading field; meaning undocumented by the vendor.
    pub prefix: u16,
    /// Opaque trailing field; meaning undocumented by the vendor.
    pub trailing: u8,
}

impl Passing {
    /// Encode into a standalone, terminated line.
    pub fn to_bytes(&self) -> Result<Bytes, EncodeError> {
        let mut buf = BytesMut::with_capacity(PASSING_MSG_LEN + LINE_TERMINATOR.len());
        encode_passing(self, &mut buf)?;
        Ok(buf.freeze())
    }
}

/// A decoded protocol line of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Passing(Passing),
    Noise(u16),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Passing(_) => MessageKind::Passing,
            Message::Noise(_) => MessageKind::Noise,
        }
    }

    /// Append the wire form of this message to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<(), EncodeError> {
        match self {
            Message::Passing(rec) => encode_passing(rec, dst),
            Message::Noise(noise) => {
                encode_noise(*noise, dst);
                Ok(())
            }
        }
    }
}

/// Decode a passing line.
///
/// Leading and trailing CR/LF bytes are ignored, so lines may be passed with
/// or without their terminator. Fields are validated in wire order and the
/// first bad field aborts decoding.
pub fn decode_passing(line: &[u8]) -> Result<Passing, DecodeError> {
    let line = trim_line(line);
    check_shape(line, MessageKind::Passing, PASSING_MSG_LEN)?;

    let prefix = decode_field::<2>(line, PREFIX, Field::Prefix)?;
    let transponder_id = decode_field::<3>(line, TRANSPONDER_ID, Field::TransponderId)?;
    let passing_ticks = decode_field::<4>(line, PASSING_TICKS, Field::PassingTicks)?;
    let [hits] = decode_field::<1>(line, HITS, Field::Hits)?;
    let [strength] = decode_field::<1>(line, STRENGTH, Field::Strength)?;
    let [trailing] = decode_field::<1>(line, TRAILING, Field::Trailing)?;

    Ok(Passing {
        transponder_id: u32::from_be_bytes([
            0,
            transponder_id[0],
            transponder_id[1],
            transponder_id[2],
        ]),
        passing_ticks: u32::from_be_bytes(passing_ticks),
        hits,
        strength,
        prefix: u16::from_be_bytes(prefix),
        trailing,
    })
}

/// Decode a noise level line.
pub fn decode_noise(line: &[u8]) -> Result<u16, DecodeError> {
    let line = trim_line(line);
    check_shape(line, MessageKind::Noise, NOISE_MSG_LEN)?;

    let noise = decode_field::<2>(line, NOISE_LEVEL, Field::NoiseLevel)?;
    Ok(u16::from_be_bytes(noise))
}

/// Route a raw line to the matching decoder by its marker byte.
///
/// Leading CR/LF bytes are skipped before the marker is read. Returns `None`
/// for empty lines and for lines whose marker is not known; those are not
/// protocol messages.
pub fn decode_line(line: &[u8]) -> Option<Result<Message, DecodeError>> {
    let kind = MessageKind::from_marker(first_marker(line)?)?;
    Some(match kind {
        MessageKind::Passing => decode_passing(line).map(Message::Passing),
        MessageKind::Noise => decode_noise(line).map(Message::Noise),
    })
}

/// Encode a passing into the wire format.
///
/// Wire format (hex digits, uppercase, big-endian):
/// ```text
/// ┌────┬────────┬───────────────┬──────────────┬──────┬──────────┬──────────┬──────┐
/// │ $  │ Prefix │ TransponderID │ PassingTicks │ Hits │ Strength │ Trailing │ CRLF │
/// │ 1B │ 4      │ 6             │ 8            │ 2    │ 2        │ 2        │ 2B   │
/// └────┴────────┴───────────────┴──────────────┴──────┴──────────┴──────────┴──────┘
/// ```
///
/// Nothing is written to `dst` when the transponder id overflows.
pub fn encode_passing(rec: &Passing, dst: &mut BytesMut) -> Result<(), EncodeError> {
    if rec.transponder_id > MAX_TRANSPONDER_ID {
        return Err(EncodeError::TransponderIdOverflow(rec.transponder_id));
    }
    dst.reserve(PASSING_MSG_LEN + LINE_TERMINATOR.len());
    dst.put_u8(PASSING_MARKER);
    put_hex(dst, &rec.prefix.to_be_bytes());
    put_hex(dst, &rec.transponder_id.to_be_bytes()[1..]);
    put_hex(dst, &rec.passing_ticks.to_be_bytes());
    put_hex(dst, &[rec.hits, rec.strength, rec.trailing]);
    dst.put_slice(LINE_TERMINATOR);
    Ok(())
}

/// Encode a noise level into the wire format: `#`, 4 hex digits, CRLF.
pub fn encode_noise(noise: u16, dst: &mut BytesMut) {
    dst.reserve(NOISE_MSG_LEN + LINE_TERMINATOR.len());
    dst.put_u8(NOISE_MARKER);
    put_hex(dst, &noise.to_be_bytes());
    dst.put_slice(LINE_TERMINATOR);
}

/// First byte after any leading CR/LF, or `None` for a blank line.
pub(crate) fn first_marker(line: &[u8]) -> Option<u8> {
    line.iter().copied().find(|b| *b != b'\r' && *b != b'\n')
}

fn trim_line(line: &[u8]) -> &[u8] {
    let is_terminator = |b: &u8| *b == b'\r' || *b == b'\n';
    let start = line
        .iter()
        .position(|b| !is_terminator(b))
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !is_terminator(b))
        .map_or(start, |pos| pos + 1);
    &line[start..end]
}

fn check_shape(line: &[u8], kind: MessageKind, expected: usize) -> Result<(), DecodeError> {
    if line.len() != expected {
        return Err(DecodeError::Length {
            line: lossy(line),
            len: line.len(),
            expected,
        });
    }
    if line[0] != kind.marker() {
        return Err(DecodeError::Marker {
            line: lossy(line),
            found: char::from(line[0]),
            expected: char::from(kind.marker()),
        });
    }
    Ok(())
}

fn decode_field<const N: usize>(
    line: &[u8],
    range: Range<usize>,
    field: Field,
) -> Result<[u8; N], DecodeError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(&line[range], &mut out).map_err(|source| DecodeError::Field {
        field,
        line: lossy(line),
        source,
    })?;
    Ok(out)
}

fn put_hex(dst: &mut BytesMut, bytes: &[u8]) {
    dst.put_slice(hex::encode_upper(bytes).as_bytes());
}

fn lossy(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PASSING: &[u8] = b"$09000235BF3436E021358700";

    fn sample() -> Passing {
        Passing {
            transponder_id: 144831,
            passing_ticks: 876011553,
            hits: 53,
            strength: 135,
            prefix: 2304,
            trailing: 0,
        }
    }

    #[test]
    fn test_decode_sample_passing() {
        assert_eq!(decode_passing(SAMPLE_PASSING).unwrap(), sample());
    }

    #[test]
    fn test_decode_sample_noise() {
        assert_eq!(decode_noise(b"#0970\r\n").unwrap(), 2416);
        assert_eq!(decode_noise(b"#0970").unwrap(), 2416);
    }

    #[test]
    fn test_decode_tolerates_surrounding_terminators() {
        assert_eq!(decode_passing(b"\r\n$09000235BF3436E021358700\r\n").unwrap(), sample());
        assert_eq!(decode_noise(b"\n\r\n#096F").unwrap(), 2415);
    }

    #[test]
    fn test_decode_accepts_lowercase_hex() {
        assert_eq!(decode_noise(b"#096f").unwrap(), 2415);
        assert_eq!(decode_passing(b"$09000235bf3436e021358700").unwrap(), sample());
    }

    #[test]
    fn test_encode_sample_passing() {
        let mut buf = BytesMut::new();
        encode_passing(&sample(), &mut buf).unwrap();
        assert_eq!(buf.as_ref(), b"$09000235BF3436E021358700\r\n");
    }

    #[test]
    fn test_encode_noise_is_uppercase() {
        let mut buf = BytesMut::new();
        encode_noise(2415, &mut buf);
        encode_noise(0xABCD, &mut buf);
        assert_eq!(buf.as_ref(), b"#096F\r\n#ABCD\r\n");
    }

    #[test]
    fn test_passing_roundtrip_extremes() {
        let records = [
            Passing::default(),
            sample(),
            Passing {
                transponder_id: MAX_TRANSPONDER_ID,
                passing_ticks: u32::MAX,
                hits: u8::MAX,
                strength: u8::MAX,
                prefix: u16::MAX,
                trailing: u8::MAX,
            },
        ];
        for rec in records {
            let wire = rec.to_bytes().unwrap();
            assert_eq!(wire.len(), PASSING_MSG_LEN + 2);
            assert_eq!(decode_passing(&wire).unwrap(), rec);
        }
    }

    #[test]
    fn test_noise_roundtrip_all_values() {
        let mut buf = BytesMut::new();
        for noise in 0..=u16::MAX {
            buf.clear();
            encode_noise(noise, &mut buf);
            assert_eq!(decode_noise(&buf).unwrap(), noise);
        }
    }

    #[test]
    fn test_encode_rejects_transponder_overflow() {
        let rec = Passing {
            transponder_id: u32::MAX,
            ..sample()
        };
        let mut buf = BytesMut::new();
        let err = encode_passing(&rec, &mut buf).unwrap_err();
        assert_eq!(err, EncodeError::TransponderIdOverflow(u32::MAX));
        assert!(buf.is_empty());

        let rec = Passing {
            transponder_id: MAX_TRANSPONDER_ID + 1,
            ..sample()
        };
        assert!(rec.to_bytes().is_err());
    }

    #[test]
    fn test_length_errors() {
        let passing_lines: [&[u8]; 5] = [
            b"$09000235BF3436E0213587",
            b"$09000235BF3436E02135870000",
            b"$",
            b"",
            b"\r\n",
        ];
        for line in passing_lines {
            assert!(
                matches!(decode_passing(line), Err(DecodeError::Length { expected: 25, .. })),
                "line {:?}",
                String::from_utf8_lossy(line)
            );
        }
        let noise_lines: [&[u8]; 3] = [b"#090", b"#09700", b"#"];
        for line in noise_lines {
            assert!(matches!(
                decode_noise(line),
                Err(DecodeError::Length { expected: 5, .. })
            ));
        }
    }

    #[test]
    fn test_length_checked_before_content() {
        let err = decode_passing(b"$ZZZZ").unwrap_err();
        assert!(matches!(err, DecodeError::Length { len: 5, .. }));
    }

    #[test]
    fn test_marker_mismatch() {
        let err = decode_noise(b"$0970").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Marker {
                found: '$',
                expected: '#',
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_hex_names_field() {
        let cases = [
            (b"$09M00235BF3036E021358700", Field::Prefix),
            (b"$090002M5BF3036E021358700", Field::TransponderId),
            (b"$09000235BF3M36E021358700", Field::PassingTicks),
            (b"$09000235BF3036E021M58700", Field::Hits),
            (b"$09000235BF3036E02155M700", Field::Strength),
            (b"$09000235BF3036E02135870M", Field::Trailing),
        ];
        for (line, field) in cases {
            let err = decode_passing(line).unwrap_err();
            assert_eq!(err.field(), Some(field), "{err}");
        }

        let err = decode_noise(b"#097J").unwrap_err();
        assert_eq!(err.field(), Some(Field::NoiseLevel));
    }

    #[test]
    fn test_first_bad_field_wins() {
        // Both prefix and hits are corrupt; prefix is reported.
        let err = decode_passing(b"$0M000235BF3036E021M58700").unwrap_err();
        assert_eq!(err.field(), Some(Field::Prefix));
    }

    #[test]
    fn test_decode_line_routes_by_marker() {
        assert_eq!(
            decode_line(SAMPLE_PASSING),
            Some(Ok(Message::Passing(sample())))
        );
        assert_eq!(decode_line(b"#0970"), Some(Ok(Message::Noise(2416))));
        assert!(matches!(
            decode_line(b"#097j"),
            Some(Err(DecodeError::Field { .. }))
        ));
        assert_eq!(decode_line(b""), None);
        assert_eq!(decode_line(b"\r\n"), None);
        assert_eq!(decode_line(b"@0970"), None);
        assert_eq!(decode_line(b"\r#0970"), Some(Ok(Message::Noise(2416))));
    }

    #[test]
    fn test_message_encode_and_kind() {
        let mut buf = BytesMut::new();
        let noise = Message::Noise(2416);
        let passing = Message::Passing(sample());
        noise.encode(&mut buf).unwrap();
        passing.encode(&mut buf).unwrap();

        assert_eq!(noise.kind(), MessageKind::Noise);
        assert_eq!(passing.kind(), MessageKind::Passing);
        assert_eq!(
            buf.as_ref(),
            b"#0970\r\n$09000235BF3436E021358700\r\n".as_ref()
        );
    }
}
