//! Enumerated protocol codes and their static label tables.
//!
//! Unknown codes never fail: they render a generic label so that any
//! captured value can be displayed.

use serde::Serialize;

/// Label rendered for type identifications missing from the table.
pub const UNKNOWN_TYPE_LABEL: &str = "unknown type identification";

/// Label rendered for causes of transmission missing from the table.
pub const UNKNOWN_CAUSE_LABEL: &str = "unknown cause";

/// APDU format discriminated by the low bits of control octet 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FrameType {
    #[serde(rename = "I")]
    Information,
    #[serde(rename = "S")]
    Supervisory,
    #[serde(rename = "U")]
    Unnumbered,
    #[serde(rename = "MALFORMED")]
    Malformed,
}

impl FrameType {
    /// Short code: `I`, `S`, `U` or `MALFORMED`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Information => "I",
            Self::Supervisory => "S",
            Self::Unnumbered => "U",
            Self::Malformed => "MALFORMED",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Information => "I-format (information transfer)",
            Self::Supervisory => "S-format (supervisory)",
            Self::Unnumbered => "U-format (unnumbered control)",
            Self::Malformed => "malformed frame",
        }
    }

    /// Parse a short code, case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "I" => Some(Self::Information),
            "S" => Some(Self::Supervisory),
            "U" => Some(Self::Unnumbered),
            "MALFORMED" => Some(Self::Malformed),
            _ => None,
        }
    }
}

/// U-format control functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UFunction {
    StartdtAct,
    StartdtCon,
    StopdtAct,
    StopdtCon,
    TestfrAct,
    TestfrCon,
}

impl UFunction {
    /// Map control octet 1 of a U-format APCI to its function.
    ///
    /// Exactly one function bit may be set; any other pattern is unknown.
    pub fn from_control(octet: u8) -> Option<Self> {
        match octet {
            0x07 => Some(Self::StartdtAct),
            0x0B => Some(Self::StartdtCon),
            0x13 => Some(Self::StopdtAct),
            0x23 => Some(Self::StopdtCon),
            0x43 => Some(Self::TestfrAct),
            0x83 => Some(Self::TestfrCon),
            _ => None,
        }
    }

    pub fn control_octet(self) -> u8 {
        match self {
            Self::StartdtAct => 0x07,
            Self::StartdtCon => 0x0B,
            Self::StopdtAct => 0x13,
            Self::StopdtCon => 0x23,
            Self::TestfrAct => 0x43,
            Self::TestfrCon => 0x83,
        }
    }

    /// Stable identifier, e.g. `STARTDT_ACT`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartdtAct => "STARTDT_ACT",
            Self::StartdtCon => "STARTDT_CON",
            Self::StopdtAct => "STOPDT_ACT",
            Self::StopdtCon => "STOPDT_CON",
            Self::TestfrAct => "TESTFR_ACT",
            Self::TestfrCon => "TESTFR_CON",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::StartdtAct => "STARTDT act",
            Self::StartdtCon => "STARTDT con",
            Self::StopdtAct => "STOPDT act",
            Self::StopdtCon => "STOPDT con",
            Self::TestfrAct => "TESTFR act",
            Self::TestfrCon => "TESTFR con",
        }
    }
}

/// ASDU type identification (octet 6 of an I-format APDU).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeId(pub u8);

impl TypeId {
    pub const M_SP_NA_1: TypeId = TypeId(1);
    pub const M_ME_NC_1: TypeId = TypeId(13);
    pub const M_SP_TB_1: TypeId = TypeId(30);
    pub const M_ME_TF_1: TypeId = TypeId(36);
    pub const C_SC_NA_1: TypeId = TypeId(45);
    pub const C_IC_NA_1: TypeId = TypeId(100);
    pub const C_CS_NA_1: TypeId = TypeId(103);

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn is_known(self) -> bool {
        type_entry(self.0).is_some()
    }

    /// IEC mnemonic such as `M_SP_NA_1`, or `UNKNOWN`.
    pub fn mnemonic(self) -> &'static str {
        type_entry(self.0).map_or("UNKNOWN", |(mnemonic, _)| mnemonic)
    }

    pub fn description(self) -> &'static str {
        type_entry(self.0).map_or(UNKNOWN_TYPE_LABEL, |(_, desc)| desc)
    }

    /// Hex code as rendered in views, e.g. `0x64`.
    pub fn hex(self) -> String {
        format!("0x{:02X}", self.0)
    }

    /// Combined label, e.g. `C_IC_NA_1 interrogation command`.
    pub fn label(self) -> String {
        match type_entry(self.0) {
            Some((mnemonic, desc)) => format!("{mnemonic} {desc}"),
            None => format!("{UNKNOWN_TYPE_LABEL} ({})", self.0),
        }
    }
}

fn type_entry(code: u8) -> Option<(&'static str, &'static str)> {
    let entry = match code {
        1 => ("M_SP_NA_1", "single-point information"),
        3 => ("M_DP_NA_1", "double-point information"),
        5 => ("M_ST_NA_1", "step position information"),
        7 => ("M_BO_NA_1", "bitstring of 32 bit"),
        9 => ("M_ME_NA_1", "measured value, normalized value"),
        11 => ("M_ME_NB_1", "measured value, scaled value"),
        13 => ("M_ME_NC_1", "measured value, short floating point"),
        15 => ("M_IT_NA_1", "integrated totals"),
        21 => ("M_ME_ND_1", "measured value, normalized without quality"),
        30 => ("M_SP_TB_1", "single-point information with time tag"),
        31 => ("M_DP_TB_1", "double-point information with time tag"),
        32 => ("M_ST_TB_1", "step position information with time tag"),
        33 => ("M_BO_TB_1", "bitstring of 32 bit with time tag"),
        34 => ("M_ME_TD_1", "measured value, normalized with time tag"),
        35 => ("M_ME_TE_1", "measured value, scaled with time tag"),
        36 => ("M_ME_TF_1", "measured value, short floating point with time tag"),
        37 => ("M_IT_TB_1", "integrated totals with time tag"),
        45 => ("C_SC_NA_1", "single command"),
        46 => ("C_DC_NA_1", "double command"),
        47 => ("C_RC_NA_1", "regulating step command"),
        48 => ("C_SE_NA_1", "set-point command, normalized value"),
        49 => ("C_SE_NB_1", "set-point command, scaled value"),
        50 => ("C_SE_NC_1", "set-point command, short floating point"),
        51 => ("C_BO_NA_1", "bitstring of 32 bit command"),
        58 => ("C_SC_TA_1", "single command with time tag"),
        59 => ("C_DC_TA_1", "double command with time tag"),
        60 => ("C_RC_TA_1", "regulating step command with time tag"),
        61 => ("C_SE_TA_1", "set-point command, normalized with time tag"),
        62 => ("C_SE_TB_1", "set-point command, scaled with time tag"),
        63 => ("C_SE_TC_1", "set-point command, short floating point with time tag"),
        64 => ("C_BO_TA_1", "bitstring of 32 bit command with time tag"),
        70 => ("M_EI_NA_1", "end of initialization"),
        100 => ("C_IC_NA_1", "interrogation command"),
        101 => ("C_CI_NA_1", "counter interrogation command"),
        102 => ("C_RD_NA_1", "read command"),
        103 => ("C_CS_NA_1", "clock synchronization command"),
        104 => ("C_TS_NA_1", "test command"),
        105 => ("C_RP_NA_1", "reset process command"),
        106 => ("C_CD_NA_1", "delay acquisition command"),
        107 => ("C_TS_TA_1", "test command with time tag"),
        _ => return None,
    };
    Some(entry)
}

/// Cause of transmission with its flag bits split out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Cause {
    /// Cause code (bits 0-5).
    pub code: u8,
    /// P/N bit: negative confirmation.
    pub negative: bool,
    /// T bit: test frame.
    pub test: bool,
}

impl Cause {
    pub fn from_octet(octet: u8) -> Self {
        Self {
            code: octet & 0x3F,
            negative: octet & 0x40 != 0,
            test: octet & 0x80 != 0,
        }
    }

    /// Reassemble the octet as captured.
    pub fn to_octet(self) -> u8 {
        let mut octet = self.code & 0x3F;
        if self.negative {
            octet |= 0x40;
        }
        if self.test {
            octet |= 0x80;
        }
        octet
    }

    pub fn is_known(self) -> bool {
        cause_description(self.code).is_some()
    }

    pub fn description(self) -> &'static str {
        cause_description(self.code).unwrap_or(UNKNOWN_CAUSE_LABEL)
    }

    /// Display label; unknown codes carry their numeric value.
    pub fn label(self) -> String {
        match cause_description(self.code) {
            Some(desc) => desc.to_string(),
            None => format!("{UNKNOWN_CAUSE_LABEL} ({})", self.code),
        }
    }
}

fn cause_description(code: u8) -> Option<&'static str> {
    let desc = match code {
        1 => "periodic, cyclic",
        2 => "background scan",
        3 => "spontaneous",
        4 => "initialized",
        5 => "request or requested",
        6 => "activation",
        7 => "activation confirmation",
        8 => "deactivation",
        9 => "deactivation confirmation",
        10 => "activation termination",
        11 => "return information caused by a remote command",
        12 => "return information caused by a local command",
        13 => "file transfer",
        20 => "interrogated by station interrogation",
        21 => "interrogated by group 1 interrogation",
        22 => "interrogated by group 2 interrogation",
        23 => "interrogated by group 3 interrogation",
        24 => "interrogated by group 4 interrogation",
        25 => "interrogated by group 5 interrogation",
        26 => "interrogated by group 6 interrogation",
        27 => "interrogated by group 7 interrogation",
        28 => "interrogated by group 8 interrogation",
        29 => "interrogated by group 9 interrogation",
        30 => "interrogated by group 10 interrogation",
        31 => "interrogated by group 11 interrogation",
        32 => "interrogated by group 12 interrogation",
        33 => "interrogated by group 13 interrogation",
        34 => "interrogated by group 14 interrogation",
        35 => "interrogated by group 15 interrogation",
        36 => "interrogated by group 16 interrogation",
        37 => "requested by general counter request",
        38 => "requested by group 1 counter request",
        39 => "requested by group 2 counter request",
        40 => "requested by group 3 counter request",
        41 => "requested by group 4 counter request",
        44 => "unknown type identification",
        45 => "unknown cause of transmission",
        46 => "unknown common address of ASDU",
        47 => "unknown information object address",
        _ => return None,
    };
    Some(desc)
}
