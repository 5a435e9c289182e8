//! Space-separated hex text, the form captured octets are persisted in.

use std::fmt::Write as _;

use bytes::Bytes;
use serde::Serializer;

use crate::error::HexError;

/// Parse whitespace-separated hex octets, e.g. `"68 04 07 00 00 00"`.
///
/// Empty or all-whitespace input yields an empty buffer.
pub fn parse_hex(text: &str) -> Result<Bytes, HexError> {
    let mut out = Vec::with_capacity(text.len() / 3 + 1);
    for (index, token) in text.split_whitespace().enumerate() {
        let octet = u8::from_str_radix(token, 16)
            .ok()
            .filter(|_| token.len() <= 2)
            .ok_or_else(|| HexError::InvalidOctet {
                index,
                token: token.to_string(),
            })?;
        out.push(octet);
    }
    Ok(Bytes::from(out))
}

/// Render octets as upper-case, space-separated hex pairs.
pub fn to_hex(octets: &[u8]) -> String {
    let mut out = String::with_capacity(octets.len() * 3);
    for (i, octet) in octets.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{octet:02X}");
    }
    out
}

pub(crate) fn serialize_hex<S: Serializer>(octets: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_hex(octets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spaced_octets() {
        let bytes = parse_hex(" 68 04 07 00 00 00 ").unwrap();
        assert_eq!(bytes.as_ref(), &[0x68, 0x04, 0x07, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn accepts_lower_case_and_single_digits() {
        let bytes = parse_hex("0e a 7").unwrap();
        assert_eq!(bytes.as_ref(), &[0x0E, 0x0A, 0x07]);
    }

    #[test]
    fn empty_text_is_empty_buffer() {
        assert!(parse_hex("   ").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_tokens() {
        let err = parse_hex("68 zz").unwrap_err();
        assert_eq!(
            err,
            HexError::InvalidOctet {
                index: 1,
                token: "zz".to_string()
            }
        );
        assert!(parse_hex("680").is_err());
    }

    #[test]
    fn renders_upper_case_pairs() {
        assert_eq!(to_hex(&[0x68, 0x0e, 0x00]), "68 0E 00");
        assert_eq!(to_hex(&[]), "");
    }
}
