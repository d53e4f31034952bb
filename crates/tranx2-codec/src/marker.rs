//! Message marker bytes.
//!
//! The first byte of every protocol line says what kind of record follows.
//! Lines starting with anything else are not interpreted.

/// Noise level sample.
pub const NOISE_MARKER: u8 = b'#';

/// Transponder passing.
pub const PASSING_MARKER: u8 = b'$';

/// Kind of record carried by a protocol line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Noise,
    Passing,
}

impl MessageKind {
    /// Classify a line by its marker byte.
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            NOISE_MARKER => Some(Self::Noise),
            PASSING_MARKER => Some(Self::Passing),
            _ => None,
        }
    }

    /// The marker byte that introduces this kind of line.
    pub fn marker(self) -> u8 {
        match self {
            Self::Noise => NOISE_MARKER,
            Self::Passing => PASSING_MARKER,
        }
    }

    /// Human-readable name for logs and output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Noise => "noise",
            Self::Passing => "passing",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_markers() {
        assert_eq!(MessageKind::from_marker(b'#'), Some(MessageKind::Noise));
        assert_eq!(MessageKind::from_marker(b'$'), Some(MessageKind::Passing));
        assert_eq!(MessageKind::from_marker(b'@'), None);
        assert_eq!(MessageKind::from_marker(b'\r'), None);
    }

    #[test]
    fn marker_matches_classification() {
        for kind in [MessageKind::Noise, MessageKind::Passing] {
            assert_eq!(MessageKind::from_marker(kind.marker()), Some(kind));
        }
        assert_eq!(MessageKind::Passing.to_string(), "passing");
    }
}
