use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, TransportError};

/// Line speed the TranX-2 decoder ships with.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Smallest complete read the decoder can produce (a bare `\r\n`).
pub const DEFAULT_MINIMUM_READ_SIZE: u8 = 2;

/// Longest inter-character timeout termios can express (255 deciseconds).
const MAX_INTER_CHARACTER_TIMEOUT: Duration = Duration::from_millis(25_500);

/// Parity checking mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Options for opening a serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialOptions {
    /// Device node, e.g. `/dev/ttyUSB0`.
    pub port_name: PathBuf,
    /// Line speed in bits per second.
    pub baud_rate: u32,
    /// Character size, 5 to 8 bits.
    pub data_bits: u8,
    /// 1 or 2 stop bits.
    pub stop_bits: u8,
    pub parity: Parity,
    /// Minimum number of bytes a blocking read waits for (`VMIN`).
    pub minimum_read_size: u8,
    /// Maximum gap between bytes before a read returns (`VTIME`).
    ///
    /// Resolution is 100 ms. `None` waits indefinitely.
    pub inter_character_timeout: Option<Duration>,
}

impl SerialOptions {
    /// Default decoder settings for the given device node.
    pub fn new(port_name: impl Into<PathBuf>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Check that every option can be applied to a port.
    pub fn validate(&self) -> Result<()> {
        if self.port_name.as_os_str().is_empty() {
            return Err(TransportError::InvalidOption {
                name: "port_name",
                value: String::new(),
            });
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(TransportError::InvalidOption {
                name: "data_bits",
                value: self.data_bits.to_string(),
            });
        }
        if !(1..=2).contains(&self.stop_bits) {
            return Err(TransportError::InvalidOption {
                name: "stop_bits",
                value: self.stop_bits.to_string(),
            });
        }
        if let Some(timeout) = self.inter_character_timeout {
            if timeout > MAX_INTER_CHARACTER_TIMEOUT {
                return Err(TransportError::InvalidOption {
                    name: "inter_character_timeout",
                    value: format!("{timeout:?}"),
                });
            }
        }
        Ok(())
    }

    /// `VTIME` value in deciseconds, rounded up so a non-zero timeout never becomes 0.
    pub fn vtime(&self) -> u8 {
        match self.inter_character_timeout {
            None => 0,
            Some(timeout) => {
                let deciseconds = timeout.as_millis().div_ceil(100);
                deciseconds.min(u8::MAX as u128) as u8
            }
        }
    }
}

impl Default for SerialOptions {
    fn default() -> Self {
        Self {
            port_name: PathBuf::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            minimum_read_size: DEFAULT_MINIMUM_READ_SIZE,
            inter_character_timeout: None,
        }
    }
}
