use serde::Serialize;

use crate::element::{ElementLayout, InfoValue};
use crate::types::{Cause, TypeId};

/// Field widths of the ASDU header and information object addresses.
///
/// IEC 60870-5-104 fixes these at 2/2/3 octets; the narrower widths of
/// IEC 60870-5-101 links are accepted for captures bridged from serial lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsduProfile {
    /// Cause of transmission size: 1, or 2 with an originator address.
    pub cause_size: usize,
    /// Common address size: 1 or 2.
    pub common_address_size: usize,
    /// Information object address size: 1 to 3.
    pub ioa_size: usize,
}

impl AsduProfile {
    /// A profile with the given widths, or `None` when any is out of range.
    pub fn new(cause_size: usize, common_address_size: usize, ioa_size: usize) -> Option<Self> {
        let valid = (1..=2).contains(&cause_size)
            && (1..=2).contains(&common_address_size)
            && (1..=3).contains(&ioa_size);
        valid.then_some(Self {
            cause_size,
            common_address_size,
            ioa_size,
        })
    }

    /// The same profile with every width pulled into its legal range.
    pub fn clamped(&self) -> Self {
        Self {
            cause_size: self.cause_size.clamp(1, 2),
            common_address_size: self.common_address_size.clamp(1, 2),
            ioa_size: self.ioa_size.clamp(1, 3),
        }
    }

    /// Octets before the first information object.
    pub fn header_size(&self) -> usize {
        let profile = self.clamped();
        2 + profile.cause_size + profile.common_address_size
    }
}

impl Default for AsduProfile {
    fn default() -> Self {
        Self {
            cause_size: 2,
            common_address_size: 2,
            ioa_size: 3,
        }
    }
}

/// Variable structure qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VariableStructure {
    /// SQ: one address followed by consecutive elements.
    pub sequence: bool,
    /// Number of information objects or elements.
    pub count: u8,
}

impl VariableStructure {
    pub fn from_octet(octet: u8) -> Self {
        Self {
            sequence: octet & 0x80 != 0,
            count: octet & 0x7F,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InformationObject {
    pub ioa: u32,
    pub value: InfoValue,
}

/// Application service data unit carried by an I-format frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asdu {
    pub type_id: TypeId,
    pub structure: VariableStructure,
    pub cause: Cause,
    pub originator: Option<u8>,
    pub common_address: u16,
    pub objects: Vec<InformationObject>,
    /// The capture ended before all announced objects were present.
    pub truncated: bool,
    /// Octets left over after the announced objects.
    pub trailing: usize,
}

impl Asdu {
    /// Decode an ASDU from the octets following the APCI.
    ///
    /// Returns `None` when the header itself is incomplete. Objects are
    /// decoded as far as the octets allow; shortfalls set `truncated`.
    /// Out-of-range profile widths are clamped.
    pub fn parse(octets: &[u8], profile: &AsduProfile) -> Option<Self> {
        let profile = profile.clamped();
        if octets.len() < profile.header_size() {
            return None;
        }

        let type_id = TypeId(octets[0]);
        let structure = VariableStructure::from_octet(octets[1]);
        let cause = Cause::from_octet(octets[2]);
        let originator = (profile.cause_size >= 2).then(|| octets[3]);
        let ca_at = 2 + profile.cause_size;
        let common_address = if profile.common_address_size >= 2 {
            u16::from_le_bytes([octets[ca_at], octets[ca_at + 1]])
        } else {
            u16::from(octets[ca_at])
        };

        let mut asdu = Self {
            type_id,
            structure,
            cause,
            originator,
            common_address,
            objects: Vec::with_capacity(usize::from(structure.count)),
            truncated: false,
            trailing: 0,
        };

        let body = &octets[profile.header_size()..];
        let consumed = match ElementLayout::for_type(type_id) {
            Some(layout) => asdu.parse_objects(body, &layout, profile.ioa_size),
            None => asdu.parse_unknown(body, profile.ioa_size),
        };
        asdu.trailing = body.len().saturating_sub(consumed);

        Some(asdu)
    }

    /// Address of the first information object, if any was decoded.
    pub fn first_ioa(&self) -> Option<u32> {
        self.objects.first().map(|object| object.ioa)
    }

    fn parse_objects(&mut self, body: &[u8], layout: &ElementLayout, ioa_size: usize) -> usize {
        let count = usize::from(self.structure.count);
        let element_size = layout.size();
        let mut pos = 0usize;

        if self.structure.sequence {
            if count == 0 {
                return 0;
            }
            let Some(base) = read_ioa(body, pos, ioa_size) else {
                self.truncated = true;
                return body.len();
            };
            pos += ioa_size;
            for i in 0..count {
                let ioa = base + i as u32;
                if !self.push_element(body, &mut pos, ioa, layout, element_size) {
                    break;
                }
            }
        } else {
            for _ in 0..count {
                let Some(ioa) = read_ioa(body, pos, ioa_size) else {
                    self.truncated = true;
                    return body.len();
                };
                pos += ioa_size;
                if !self.push_element(body, &mut pos, ioa, layout, element_size) {
                    break;
                }
            }
        }

        pos
    }

    fn push_element(
        &mut self,
        body: &[u8],
        pos: &mut usize,
        ioa: u32,
        layout: &ElementLayout,
        size: usize,
    ) -> bool {
        let remaining = &body[(*pos).min(body.len())..];
        if remaining.len() < size {
            self.objects.push(InformationObject {
                ioa,
                value: InfoValue::Incomplete {
                    octets: remaining.to_vec(),
                },
            });
            self.truncated = true;
            *pos = body.len();
            return false;
        }
        self.objects.push(InformationObject {
            ioa,
            value: layout.decode(&remaining[..size]),
        });
        *pos += size;
        true
    }

    fn parse_unknown(&mut self, body: &[u8], ioa_size: usize) -> usize {
        if self.structure.count == 0 {
            return 0;
        }
        match read_ioa(body, 0, ioa_size) {
            Some(ioa) => self.objects.push(InformationObject {
                ioa,
                value: InfoValue::Raw {
                    octets: body[ioa_size..].to_vec(),
                },
            }),
            None => self.truncated = true,
        }
        body.len()
    }
}

fn read_ioa(body: &[u8], pos: usize, size: usize) -> Option<u32> {
    let octets = body.get(pos..pos.checked_add(size)?)?;
    Some(
        octets
            .iter()
            .rev()
            .fold(0u32, |acc, octet| (acc << 8) | u32::from(*octet)),
    )
}
