use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Which half of the serial transport failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    Read,
    Write,
}

impl fmt::Display for TransportOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportOp::Read => f.write_str("read"),
            TransportOp::Write => f.write_str("write"),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Payload does not fit in a single frame.
    #[error("cannot encode a {0} byte payload")]
    Encoding(usize),

    /// Missing delimiters or an invalid escape sequence.
    #[error("malformed frame")]
    Framing,

    #[error("checksum mismatch: computed {expected:#04x}, received {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },

    /// Fewer bytes than the frame header declares.
    #[error("frame truncated")]
    TruncatedFrame,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("serial {0} failed")]
    Transport(TransportOp),

    /// Well-formed frame with unexpected content.
    #[error("unexpected response: {0}")]
    Protocol(&'static str),

    /// Sensor executed the command with a non-zero state code.
    #[error("sensor reported error state {0:#04x}")]
    Device(u8),

    #[error("output buffer too small, {needed} bytes required")]
    BufferTooSmall { needed: usize },
}
