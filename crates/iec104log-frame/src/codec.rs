use bytes::Bytes;
use serde::Serialize;

use crate::asdu::{Asdu, AsduProfile};
use crate::error::DecodeError;
use crate::hex::to_hex;
use crate::types::{FrameType, UFunction};

/// Start character of every APDU.
pub const START_BYTE: u8 = 0x68;

/// APCI header: start (1) + length (1) + control field (4) = 6 bytes.
pub const APCI_SIZE: usize = 6;

/// Largest value the APDU length octet may carry.
pub const MAX_APDU_LENGTH: u8 = 253;

/// Largest complete APDU on the wire (start + length + 253).
pub const MAX_FRAME_SIZE: usize = MAX_APDU_LENGTH as usize + 2;

/// Length octet and control field of a decoded APDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Apci {
    /// Declared APDU length (octets after the length field).
    pub length: u8,
    pub control: [u8; 4],
}

impl Apci {
    /// Control field as space-separated hex.
    pub fn control_hex(&self) -> String {
        to_hex(&self.control)
    }
}

/// A decoded APDU.
///
/// ```text
/// ┌───────┬────────┬──────────────────────────┬─────────────────┐
/// │ 0x68  │ Length │ Control field (4B)       │ ASDU (I only)   │
/// └───────┴────────┴──────────────────────────┴─────────────────┘
///   I:  c1 bit0 = 0     send seq = c1>>1 | c2<<7, recv seq = c3>>1 | c4<<7
///   S:  c1 bits = 01    recv seq = c3>>1 | c4<<7
///   U:  c1 bits = 11    function bit set in c1
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    IFormat {
        apci: Apci,
        send_seq: u16,
        recv_seq: u16,
        /// `None` when the capture ends inside the ASDU header.
        asdu: Option<Asdu>,
    },
    SFormat {
        apci: Apci,
        recv_seq: u16,
    },
    UFormat {
        apci: Apci,
        function: UFunction,
    },
    Malformed {
        raw: Bytes,
        reason: DecodeError,
    },
}

impl Frame {
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::IFormat { .. } => FrameType::Information,
            Self::SFormat { .. } => FrameType::Supervisory,
            Self::UFormat { .. } => FrameType::Unnumbered,
            Self::Malformed { .. } => FrameType::Malformed,
        }
    }

    pub fn apci(&self) -> Option<&Apci> {
        match self {
            Self::IFormat { apci, .. } | Self::SFormat { apci, .. } | Self::UFormat { apci, .. } => {
                Some(apci)
            }
            Self::Malformed { .. } => None,
        }
    }

    pub fn send_seq(&self) -> Option<u16> {
        match self {
            Self::IFormat { send_seq, .. } => Some(*send_seq),
            _ => None,
        }
    }

    pub fn recv_seq(&self) -> Option<u16> {
        match self {
            Self::IFormat { recv_seq, .. } | Self::SFormat { recv_seq, .. } => Some(*recv_seq),
            _ => None,
        }
    }

    pub fn asdu(&self) -> Option<&Asdu> {
        match self {
            Self::IFormat { asdu, .. } => asdu.as_ref(),
            _ => None,
        }
    }

    pub fn function(&self) -> Option<UFunction> {
        match self {
            Self::UFormat { function, .. } => Some(*function),
            _ => None,
        }
    }

    pub fn malformed_reason(&self) -> Option<&DecodeError> {
        match self {
            Self::Malformed { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Decode an APDU using the IEC-104 field widths.
pub fn decode(raw: &[u8]) -> Frame {
    decode_with(raw, &AsduProfile::default())
}

/// Decode an APDU with explicit ASDU field widths.
///
/// Total over all inputs: anything structurally invalid becomes
/// [`Frame::Malformed`]. A capture shorter than its declared length is
/// decoded as far as it goes, with the ASDU marked truncated.
pub fn decode_with(raw: &[u8], profile: &AsduProfile) -> Frame {
    match decode_apci(raw) {
        Ok(apci) => decode_body(raw, apci, profile),
        Err(reason) => malformed(raw, reason),
    }
}

fn decode_apci(raw: &[u8]) -> Result<Apci, DecodeError> {
    if raw.len() < APCI_SIZE {
        return Err(DecodeError::Truncated { len: raw.len() });
    }
    if raw[0] != START_BYTE {
        return Err(DecodeError::BadStartByte(raw[0]));
    }

    let length = raw[1];
    let declared_total = usize::from(length) + 2;
    if !(4..=MAX_APDU_LENGTH).contains(&length) || raw.len() > declared_total {
        return Err(DecodeError::LengthMismatch {
            declared: length,
            actual: raw.len(),
        });
    }

    Ok(Apci {
        length,
        control: [raw[2], raw[3], raw[4], raw[5]],
    })
}

fn decode_body(raw: &[u8], apci: Apci, profile: &AsduProfile) -> Frame {
    let [c1, c2, c3, c4] = apci.control;
    let short_capture = raw.len() < usize::from(apci.length) + 2;

    if c1 & 0x01 == 0 {
        let asdu = Asdu::parse(&raw[APCI_SIZE..], profile).map(|mut asdu| {
            asdu.truncated |= short_capture;
            asdu
        });
        return Frame::IFormat {
            apci,
            send_seq: sequence_number(c1, c2),
            recv_seq: sequence_number(c3, c4),
            asdu,
        };
    }

    // S and U frames are exactly the APCI.
    if apci.length != 4 {
        return malformed(
            raw,
            DecodeError::LengthMismatch {
                declared: apci.length,
                actual: raw.len(),
            },
        );
    }

    if c1 & 0x03 == 0x01 {
        return Frame::SFormat {
            apci,
            recv_seq: sequence_number(c3, c4),
        };
    }

    match UFunction::from_control(c1) {
        Some(function) => Frame::UFormat { apci, function },
        None => malformed(raw, DecodeError::UnknownUFunction(c1)),
    }
}

/// 15-bit sequence number; bit 0 of the low octet is not part of it.
fn sequence_number(low: u8, high: u8) -> u16 {
    (u16::from(low) >> 1) | (u16::from(high) << 7)
}

fn malformed(raw: &[u8], reason: DecodeError) -> Frame {
    Frame::Malformed {
        raw: Bytes::copy_from_slice(raw),
        reason,
    }
}
