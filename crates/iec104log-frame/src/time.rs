use std::fmt;

use serde::{Serialize, Serializer};

/// Wire size of a CP56Time2a time tag.
pub const CP56_SIZE: usize = 7;

/// Seven-octet binary time tag (CP56Time2a).
///
/// ```text
/// octet 0-1  milliseconds within the minute (LE, 0..=59999)
/// octet 2    minutes (bits 0-5), IV invalid flag (bit 7)
/// octet 3    hours (bits 0-4), SU summer time flag (bit 7)
/// octet 4    day of month (bits 0-4), day of week (bits 5-7)
/// octet 5    month (bits 0-3)
/// octet 6    year within century (bits 0-6)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cp56Time2a {
    pub millisecond: u16,
    pub minute: u8,
    pub invalid: bool,
    pub hour: u8,
    pub summer_time: bool,
    pub day: u8,
    pub weekday: u8,
    pub month: u8,
    pub year: u8,
}

impl Cp56Time2a {
    /// Decode a time tag from exactly seven octets.
    pub fn from_octets(octets: &[u8; CP56_SIZE]) -> Self {
        Self {
            millisecond: u16::from_le_bytes([octets[0], octets[1]]),
            minute: octets[2] & 0x3F,
            invalid: octets[2] & 0x80 != 0,
            hour: octets[3] & 0x1F,
            summer_time: octets[3] & 0x80 != 0,
            day: octets[4] & 0x1F,
            weekday: (octets[4] >> 5) & 0x07,
            month: octets[5] & 0x0F,
            year: octets[6] & 0x7F,
        }
    }

    /// Decode from the front of a slice, if enough octets are present.
    pub fn parse(octets: &[u8]) -> Option<Self> {
        let tag: &[u8; CP56_SIZE] = octets.get(..CP56_SIZE)?.try_into().ok()?;
        Some(Self::from_octets(tag))
    }
}

impl fmt::Display for Cp56Time2a {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "20{:02}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.millisecond / 1000,
            self.millisecond % 1000
        )?;
        if self.invalid {
            f.write_str(" (invalid)")?;
        }
        Ok(())
    }
}

impl Serialize for Cp56Time2a {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_fields_and_flags() {
        // 2024-03-15 13:45:12.345, Friday, summer time.
        let octets = [0x39, 0x30, 0x2D, 0x8D, 0xAF, 0x03, 0x18];
        let time = Cp56Time2a::from_octets(&octets);

        assert_eq!(time.millisecond, 12_345);
        assert_eq!(time.minute, 45);
        assert_eq!(time.hour, 13);
        assert!(time.summer_time);
        assert!(!time.invalid);
        assert_eq!(time.day, 15);
        assert_eq!(time.weekday, 5);
        assert_eq!(time.month, 3);
        assert_eq!(time.year, 24);
        assert_eq!(time.to_string(), "2024-03-15 13:45:12.345");
    }

    #[test]
    fn short_slice_yields_none() {
        assert!(Cp56Time2a::parse(&[0, 0, 0]).is_none());
    }

    #[test]
    fn invalid_flag_is_rendered() {
        let time = Cp56Time2a::from_octets(&[0, 0, 0x80, 0, 1, 1, 0]);
        assert!(time.invalid);
        assert!(time.to_string().ends_with("(invalid)"));
    }
}
