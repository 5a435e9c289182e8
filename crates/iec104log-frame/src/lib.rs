//! Decoder for IEC 60870-5-104 application protocol data units.
//!
//! Every captured APDU starts with a 6-byte APCI:
//! - the 0x68 start character
//! - the APDU length (octets that follow, 4..=253)
//! - a 4-byte control field whose low bits select I, S or U format
//!
//! I-format frames carry an ASDU with a type identification, cause of
//! transmission, common address and information objects.
//!
//! [`decode`] is total: it never panics and never returns an error value.
//! Structurally invalid input becomes [`Frame::Malformed`] with a reason.

pub mod asdu;
pub mod codec;
pub mod element;
pub mod error;
pub mod hex;
pub mod time;
pub mod types;

pub use asdu::{Asdu, AsduProfile, InformationObject, VariableStructure};
pub use codec::{decode, decode_with, Apci, Frame, APCI_SIZE, MAX_FRAME_SIZE, START_BYTE};
pub use element::{DoublePoint, InfoValue, Quality, Scalar};
pub use error::{DecodeError, HexError};
pub use hex::{parse_hex, to_hex};
pub use time::Cp56Time2a;
pub use types::{Cause, FrameType, TypeId, UFunction};
