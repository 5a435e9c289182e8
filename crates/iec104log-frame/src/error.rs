/// Reasons an octet buffer could not be decoded into a structured frame.
///
/// Decoding never fails with an error value: a `DecodeError` always travels
/// inside [`Frame::Malformed`](crate::Frame::Malformed) together with the
/// original octets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Fewer than the six APCI octets were captured.
    #[error("truncated control field ({len} bytes, need 6)")]
    Truncated { len: usize },

    /// The first octet is not the 0x68 start character.
    #[error("bad start byte 0x{0:02X} (expected 0x68)")]
    BadStartByte(u8),

    /// The APDU length octet disagrees with the captured buffer.
    #[error("length mismatch (declared {declared}, captured {actual})")]
    LengthMismatch { declared: u8, actual: usize },

    /// A U-format control octet that maps to no known function.
    #[error("unknown U-format function 0x{0:02X}")]
    UnknownUFunction(u8),
}

impl DecodeError {
    /// Short, stable reason text used in rendered views.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Truncated { .. } => "truncated control field",
            Self::BadStartByte(_) => "bad start byte",
            Self::LengthMismatch { .. } => "length mismatch",
            Self::UnknownUFunction(_) => "unknown U-format function",
        }
    }
}

/// Errors from parsing hex-encoded octet text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    /// A whitespace-separated token is not a valid hex octet.
    #[error("invalid hex octet {token:?} at position {index}")]
    InvalidOctet { index: usize, token: String },
}
