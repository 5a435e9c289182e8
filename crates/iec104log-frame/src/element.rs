//! Information element layouts and typed values.

use serde::Serialize;

use crate::hex::serialize_hex;
use crate::time::{Cp56Time2a, CP56_SIZE};
use crate::types::TypeId;

/// Quality descriptor bits shared by QDS, SIQ, DIQ and BCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Quality {
    pub overflow: bool,
    pub blocked: bool,
    pub substituted: bool,
    pub not_topical: bool,
    pub invalid: bool,
}

impl Quality {
    /// Decode a QDS octet (overflow in bit 0).
    pub fn from_qds(octet: u8) -> Self {
        Self {
            overflow: octet & 0x01 != 0,
            ..Self::from_upper_bits(octet)
        }
    }

    /// Decode the BL/SB/NT/IV bits carried in the upper nibble of SIQ/DIQ.
    pub fn from_upper_bits(octet: u8) -> Self {
        Self {
            overflow: false,
            blocked: octet & 0x10 != 0,
            substituted: octet & 0x20 != 0,
            not_topical: octet & 0x40 != 0,
            invalid: octet & 0x80 != 0,
        }
    }

    pub fn is_good(&self) -> bool {
        *self == Self::default()
    }
}

/// Double-point state (DPI / DCS).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DoublePoint {
    Intermediate,
    Off,
    On,
    Indeterminate,
}

impl DoublePoint {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Intermediate,
            1 => Self::Off,
            2 => Self::On,
            _ => Self::Indeterminate,
        }
    }
}

/// A decoded information element value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfoValue {
    SinglePoint {
        on: bool,
        quality: Quality,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    DoublePoint {
        state: DoublePoint,
        quality: Quality,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    StepPosition {
        value: i8,
        transient: bool,
        quality: Quality,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    Bitstring {
        bits: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        quality: Option<Quality>,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    Normalized {
        raw: i16,
        value: f32,
        #[serde(skip_serializing_if = "Option::is_none")]
        quality: Option<Quality>,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    Scaled {
        value: i16,
        quality: Quality,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    ShortFloat {
        value: f32,
        quality: Quality,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    IntegratedTotal {
        counter: i32,
        sequence: u8,
        carry: bool,
        adjusted: bool,
        invalid: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    SingleCommand {
        on: bool,
        select: bool,
        qualifier: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    DoubleCommand {
        state: DoublePoint,
        select: bool,
        qualifier: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    RegulatingStep {
        /// 1 = next step lower, 2 = next step higher.
        step: u8,
        select: bool,
        qualifier: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    SetpointNormalized {
        raw: i16,
        value: f32,
        select: bool,
        qualifier: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    SetpointScaled {
        value: i16,
        select: bool,
        qualifier: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    SetpointFloat {
        value: f32,
        select: bool,
        qualifier: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    EndOfInit {
        cause: u8,
        after_parameter_change: bool,
    },
    Interrogation {
        qualifier: u8,
    },
    CounterInterrogation {
        request: u8,
        freeze: u8,
    },
    Read {},
    ClockSync {
        time: Cp56Time2a,
    },
    Test {
        pattern: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        time: Option<Cp56Time2a>,
    },
    ResetProcess {
        qualifier: u8,
    },
    Delay {
        millis: u16,
    },
    /// Octets of an element whose type identification has no known layout.
    Raw {
        #[serde(serialize_with = "serialize_hex")]
        octets: Vec<u8>,
    },
    /// Octets of an element cut short by the end of the capture.
    Incomplete {
        #[serde(serialize_with = "serialize_hex")]
        octets: Vec<u8>,
    },
}

/// Primary scalar of an element, as shown in single-column views.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

impl InfoValue {
    /// The element's main value, if it has a single obvious one.
    pub fn scalar(&self) -> Option<Scalar> {
        let scalar = match self {
            Self::SinglePoint { on, .. } | Self::SingleCommand { on, .. } => {
                Scalar::Int(i64::from(*on))
            }
            Self::DoublePoint { state, .. } | Self::DoubleCommand { state, .. } => {
                Scalar::Int(*state as i64)
            }
            Self::StepPosition { value, .. } => Scalar::Int(i64::from(*value)),
            Self::Bitstring { bits, .. } => Scalar::Int(i64::from(*bits)),
            Self::Normalized { value, .. } | Self::SetpointNormalized { value, .. } => {
                Scalar::Float(round4(*value))
            }
            Self::Scaled { value, .. } | Self::SetpointScaled { value, .. } => {
                Scalar::Int(i64::from(*value))
            }
            Self::ShortFloat { value, .. } | Self::SetpointFloat { value, .. } => {
                Scalar::Float(round4(*value))
            }
            Self::IntegratedTotal { counter, .. } => Scalar::Int(i64::from(*counter)),
            Self::RegulatingStep { step, .. } => Scalar::Int(i64::from(*step)),
            Self::Interrogation { qualifier }
            | Self::ResetProcess { qualifier }
            | Self::EndOfInit {
                cause: qualifier, ..
            } => Scalar::Int(i64::from(*qualifier)),
            Self::CounterInterrogation { request, .. } => Scalar::Int(i64::from(*request)),
            Self::Test { pattern, .. } => Scalar::Int(i64::from(*pattern)),
            Self::Delay { millis } => Scalar::Int(i64::from(*millis)),
            Self::Read {} | Self::ClockSync { .. } | Self::Raw { .. } | Self::Incomplete { .. } => {
                return None
            }
        };
        Some(scalar)
    }

    /// Quality descriptor, for monitor-direction elements that carry one.
    pub fn quality(&self) -> Option<Quality> {
        match self {
            Self::SinglePoint { quality, .. }
            | Self::DoublePoint { quality, .. }
            | Self::StepPosition { quality, .. }
            | Self::Scaled { quality, .. }
            | Self::ShortFloat { quality, .. } => Some(*quality),
            Self::Bitstring { quality, .. } | Self::Normalized { quality, .. } => *quality,
            _ => None,
        }
    }

    /// Time tag attached to the element, if any.
    pub fn time(&self) -> Option<Cp56Time2a> {
        match self {
            Self::ClockSync { time } => Some(*time),
            Self::SinglePoint { time, .. }
            | Self::DoublePoint { time, .. }
            | Self::StepPosition { time, .. }
            | Self::Bitstring { time, .. }
            | Self::Normalized { time, .. }
            | Self::Scaled { time, .. }
            | Self::ShortFloat { time, .. }
            | Self::IntegratedTotal { time, .. }
            | Self::SingleCommand { time, .. }
            | Self::DoubleCommand { time, .. }
            | Self::RegulatingStep { time, .. }
            | Self::SetpointNormalized { time, .. }
            | Self::SetpointScaled { time, .. }
            | Self::SetpointFloat { time, .. }
            | Self::Test { time, .. } => *time,
            _ => None,
        }
    }
}

fn round4(value: f32) -> f64 {
    (f64::from(value) * 10_000.0).round() / 10_000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Body {
    Siq,
    Diq,
    Vti,
    Bsi,
    Nva,
    Sva,
    Float,
    Bcr,
    Sco,
    Dco,
    Rco,
    SetNva,
    SetSva,
    SetFloat,
    Coi,
    Qoi,
    Qcc,
    Empty,
    Clock,
    Fbp,
    Qrp,
    Cp16,
}

impl Body {
    fn size(self) -> usize {
        match self {
            Self::Siq
            | Self::Diq
            | Self::Vti
            | Self::Sco
            | Self::Dco
            | Self::Rco
            | Self::Coi
            | Self::Qoi
            | Self::Qcc
            | Self::Qrp => 1,
            Self::Nva | Self::Sva | Self::Fbp | Self::Cp16 => 2,
            Self::SetNva | Self::SetSva => 3,
            Self::Bsi | Self::Float => 4,
            Self::Bcr | Self::SetFloat => 5,
            Self::Clock => CP56_SIZE,
            Self::Empty => 0,
        }
    }
}

/// Octet layout of one information element for a given type identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementLayout {
    body: Body,
    quality: bool,
    time: bool,
}

impl ElementLayout {
    const fn new(body: Body, quality: bool, time: bool) -> Self {
        Self {
            body,
            quality,
            time,
        }
    }

    /// Layout for a type identification, or `None` when it is unknown.
    pub fn for_type(type_id: TypeId) -> Option<Self> {
        use Body::*;
        let layout = match type_id.code() {
            1 => Self::new(Siq, false, false),
            3 => Self::new(Diq, false, false),
            5 => Self::new(Vti, true, false),
            7 => Self::new(Bsi, true, false),
            9 => Self::new(Nva, true, false),
            11 => Self::new(Sva, true, false),
            13 => Self::new(Float, true, false),
            15 => Self::new(Bcr, false, false),
            21 => Self::new(Nva, false, false),
            30 => Self::new(Siq, false, true),
            31 => Self::new(Diq, false, true),
            32 => Self::new(Vti, true, true),
            33 => Self::new(Bsi, true, true),
            34 => Self::new(Nva, true, true),
            35 => Self::new(Sva, true, true),
            36 => Self::new(Float, true, true),
            37 => Self::new(Bcr, false, true),
            45 => Self::new(Sco, false, false),
            46 => Self::new(Dco, false, false),
            47 => Self::new(Rco, false, false),
            48 => Self::new(SetNva, false, false),
            49 => Self::new(SetSva, false, false),
            50 => Self::new(SetFloat, false, false),
            51 => Self::new(Bsi, false, false),
            58 => Self::new(Sco, false, true),
            59 => Self::new(Dco, false, true),
            60 => Self::new(Rco, false, true),
            61 => Self::new(SetNva, false, true),
            62 => Self::new(SetSva, false, true),
            63 => Self::new(SetFloat, false, true),
            64 => Self::new(Bsi, false, true),
            70 => Self::new(Coi, false, false),
            100 => Self::new(Qoi, false, false),
            101 => Self::new(Qcc, false, false),
            102 => Self::new(Empty, false, false),
            103 => Self::new(Clock, false, false),
            104 => Self::new(Fbp, false, false),
            105 => Self::new(Qrp, false, false),
            106 => Self::new(Cp16, false, false),
            107 => Self::new(Fbp, false, true),
            _ => return None,
        };
        Some(layout)
    }

    /// Total element size in octets.
    pub fn size(&self) -> usize {
        self.body.size() + usize::from(self.quality) + if self.time { CP56_SIZE } else { 0 }
    }

    /// Decode one element. `octets` must be exactly [`size`](Self::size) long;
    /// a shorter slice yields [`InfoValue::Incomplete`].
    pub fn decode(&self, octets: &[u8]) -> InfoValue {
        if octets.len() < self.size() {
            return InfoValue::Incomplete {
                octets: octets.to_vec(),
            };
        }

        let body_len = self.body.size();
        let body = &octets[..body_len];
        let qds = if self.quality {
            Some(Quality::from_qds(octets[body_len]))
        } else {
            None
        };
        let time = if self.time {
            Cp56Time2a::parse(&octets[body_len + usize::from(self.quality)..])
        } else {
            None
        };

        decode_body(self.body, body, qds, time)
    }
}

fn decode_body(
    body: Body,
    octets: &[u8],
    qds: Option<Quality>,
    time: Option<Cp56Time2a>,
) -> InfoValue {
    let quality = qds.unwrap_or_default();
    match body {
        Body::Siq => InfoValue::SinglePoint {
            on: octets[0] & 0x01 != 0,
            quality: Quality::from_upper_bits(octets[0]),
            time,
        },
        Body::Diq => InfoValue::DoublePoint {
            state: DoublePoint::from_bits(octets[0]),
            quality: Quality::from_upper_bits(octets[0]),
            time,
        },
        Body::Vti => {
            // 7-bit two's complement value.
            let value = ((octets[0] << 1) as i8) >> 1;
            InfoValue::StepPosition {
                value,
                transient: octets[0] & 0x80 != 0,
                quality,
                time,
            }
        }
        Body::Bsi => InfoValue::Bitstring {
            bits: u32::from_le_bytes([octets[0], octets[1], octets[2], octets[3]]),
            quality: qds,
            time,
        },
        Body::Nva => {
            let raw = i16::from_le_bytes([octets[0], octets[1]]);
            InfoValue::Normalized {
                raw,
                value: normalized(raw),
                quality: qds,
                time,
            }
        }
        Body::Sva => InfoValue::Scaled {
            value: i16::from_le_bytes([octets[0], octets[1]]),
            quality,
            time,
        },
        Body::Float => InfoValue::ShortFloat {
            value: f32::from_le_bytes([octets[0], octets[1], octets[2], octets[3]]),
            quality,
            time,
        },
        Body::Bcr => InfoValue::IntegratedTotal {
            counter: i32::from_le_bytes([octets[0], octets[1], octets[2], octets[3]]),
            sequence: octets[4] & 0x1F,
            carry: octets[4] & 0x20 != 0,
            adjusted: octets[4] & 0x40 != 0,
            invalid: octets[4] & 0x80 != 0,
            time,
        },
        Body::Sco => InfoValue::SingleCommand {
            on: octets[0] & 0x01 != 0,
            select: octets[0] & 0x80 != 0,
            qualifier: (octets[0] >> 2) & 0x1F,
            time,
        },
        Body::Dco => InfoValue::DoubleCommand {
            state: DoublePoint::from_bits(octets[0]),
            select: octets[0] & 0x80 != 0,
            qualifier: (octets[0] >> 2) & 0x1F,
            time,
        },
        Body::Rco => InfoValue::RegulatingStep {
            step: octets[0] & 0x03,
            select: octets[0] & 0x80 != 0,
            qualifier: (octets[0] >> 2) & 0x1F,
            time,
        },
        Body::SetNva => {
            let raw = i16::from_le_bytes([octets[0], octets[1]]);
            InfoValue::SetpointNormalized {
                raw,
                value: normalized(raw),
                select: octets[2] & 0x80 != 0,
                qualifier: octets[2] & 0x7F,
                time,
            }
        }
        Body::SetSva => InfoValue::SetpointScaled {
            value: i16::from_le_bytes([octets[0], octets[1]]),
            select: octets[2] & 0x80 != 0,
            qualifier: octets[2] & 0x7F,
            time,
        },
        Body::SetFloat => InfoValue::SetpointFloat {
            value: f32::from_le_bytes([octets[0], octets[1], octets[2], octets[3]]),
            select: octets[4] & 0x80 != 0,
            qualifier: octets[4] & 0x7F,
            time,
        },
        Body::Coi => InfoValue::EndOfInit {
            cause: octets[0] & 0x7F,
            after_parameter_change: octets[0] & 0x80 != 0,
        },
        Body::Qoi => InfoValue::Interrogation {
            qualifier: octets[0],
        },
        Body::Qcc => InfoValue::CounterInterrogation {
            request: octets[0] & 0x3F,
            freeze: octets[0] >> 6,
        },
        Body::Empty => InfoValue::Read {},
        Body::Clock => match Cp56Time2a::parse(octets) {
            Some(time) => InfoValue::ClockSync { time },
            None => InfoValue::Incomplete {
                octets: octets.to_vec(),
            },
        },
        Body::Fbp => InfoValue::Test {
            pattern: u16::from_le_bytes([octets[0], octets[1]]),
            time,
        },
        Body::Qrp => InfoValue::ResetProcess {
            qualifier: octets[0],
        },
        Body::Cp16 => InfoValue::Delay {
            millis: u16::from_le_bytes([octets[0], octets[1]]),
        },
    }
}

fn normalized(raw: i16) -> f32 {
    f32::from(raw) / 32768.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_float_with_quality() {
        let layout = ElementLayout::for_type(TypeId(13)).unwrap();
        assert_eq!(layout.size(), 5);

        let mut octets = 12.5f32.to_le_bytes().to_vec();
        octets.push(0x81);
        let value = layout.decode(&octets);

        assert_eq!(value.scalar(), Some(Scalar::Float(12.5)));
        let quality = value.quality().unwrap();
        assert!(quality.overflow);
        assert!(quality.invalid);
        assert!(!quality.blocked);
    }

    #[test]
    fn single_point_with_time_tag() {
        let layout = ElementLayout::for_type(TypeId::M_SP_TB_1).unwrap();
        assert_eq!(layout.size(), 8);

        let octets = [0x11, 0x00, 0x00, 0x05, 0x0A, 0x01, 0x01, 0x19];
        match layout.decode(&octets) {
            InfoValue::SinglePoint { on, quality, time } => {
                assert!(on);
                assert!(quality.blocked);
                let time = time.expect("time tag present");
                assert_eq!(time.hour, 10);
                assert_eq!(time.year, 25);
            }
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn normalized_value_scales_raw() {
        let layout = ElementLayout::for_type(TypeId(21)).unwrap();
        let value = layout.decode(&0x4000i16.to_le_bytes());
        assert_eq!(value.scalar(), Some(Scalar::Float(0.5)));
        assert_eq!(value.quality(), None);
    }

    #[test]
    fn step_position_sign_extends() {
        let layout = ElementLayout::for_type(TypeId(5)).unwrap();
        let value = layout.decode(&[0xFF, 0x00]);
        match value {
            InfoValue::StepPosition {
                value, transient, ..
            } => {
                assert_eq!(value, -1);
                assert!(transient);
            }
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn single_command_fields() {
        let layout = ElementLayout::for_type(TypeId::C_SC_NA_1).unwrap();
        match layout.decode(&[0x85]) {
            InfoValue::SingleCommand {
                on,
                select,
                qualifier,
                ..
            } => {
                assert!(on);
                assert!(select);
                assert_eq!(qualifier, 1);
            }
            other => panic!("unexpected value: {other:?}"),
        }
    }

    #[test]
    fn short_input_is_incomplete() {
        let layout = ElementLayout::for_type(TypeId::M_ME_TF_1).unwrap();
        let value = layout.decode(&[0x00, 0x00]);
        assert!(matches!(value, InfoValue::Incomplete { ref octets } if octets.len() == 2));
    }

    #[test]
    fn unknown_type_has_no_layout() {
        assert!(ElementLayout::for_type(TypeId(2)).is_none());
        assert!(ElementLayout::for_type(TypeId(255)).is_none());
    }

    #[test]
    fn values_serialize_with_kind_tag() {
        let value = InfoValue::Interrogation { qualifier: 20 };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["kind"], "interrogation");
        assert_eq!(json["qualifier"], 20);

        let raw = InfoValue::Raw {
            octets: vec![0xAB, 0x01],
        };
        let json = serde_json::to_value(&raw).unwrap();
        assert_eq!(json["octets"], "AB 01");
    }
}
