//! The 56 documented NMOS 6502 instruction mnemonics.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Instruction mnemonics of the documented 6502 instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Mnemonic {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
}

/// Every mnemonic, in alphabetical order.
pub const ALL_MNEMONICS: [Mnemonic; 56] = [
    Mnemonic::Adc,
    Mnemonic::And,
    Mnemonic::Asl,
    Mnemonic::Bcc,
    Mnemonic::Bcs,
    Mnemonic::Beq,
    Mnemonic::Bit,
    Mnemonic::Bmi,
    Mnemonic::Bne,
    Mnemonic::Bpl,
    Mnemonic::Brk,
    Mnemonic::Bvc,
    Mnemonic::Bvs,
    Mnemonic::Clc,
    Mnemonic::Cld,
    Mnemonic::Cli,
    Mnemonic::Clv,
    Mnemonic::Cmp,
    Mnemonic::Cpx,
    Mnemonic::Cpy,
    Mnemonic::Dec,
    Mnemonic::Dex,
    Mnemonic::Dey,
    Mnemonic::Eor,
    Mnemonic::Inc,
    Mnemonic::Inx,
    Mnemonic::Iny,
    Mnemonic::Jmp,
    Mnemonic::Jsr,
    Mnemonic::Lda,
    Mnemonic::Ldx,
    Mnemonic::Ldy,
    Mnemonic::Lsr,
    Mnemonic::Nop,
    Mnemonic::Ora,
    Mnemonic::Pha,
    Mnemonic::Php,
    Mnemonic::Pla,
    Mnemonic::Plp,
    Mnemonic::Rol,
    Mnemonic::Ror,
    Mnemonic::Rti,
    Mnemonic::Rts,
    Mnemonic::Sbc,
    Mnemonic::Sec,
    Mnemonic::Sed,
    Mnemonic::Sei,
    Mnemonic::Sta,
    Mnemonic::Stx,
    Mnemonic::Sty,
    Mnemonic::Tax,
    Mnemonic::Tay,
    Mnemonic::Tsx,
    Mnemonic::Txa,
    Mnemonic::Txs,
    Mnemonic::Tya,
];

impl Mnemonic {
    /// Canonical upper-case spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Adc => "ADC",
            Self::And => "AND",
            Self::Asl => "ASL",
            Self::Bcc => "BCC",
            Self::Bcs => "BCS",
            Self::Beq => "BEQ",
            Self::Bit => "BIT",
            Self::Bmi => "BMI",
            Self::Bne => "BNE",
            Self::Bpl => "BPL",
            Self::Brk => "BRK",
            Self::Bvc => "BVC",
            Self::Bvs => "BVS",
            Self::Clc => "CLC",
            Self::Cld => "CLD",
            Self::Cli => "CLI",
            Self::Clv => "CLV",
            Self::Cmp => "CMP",
            Self::Cpx => "CPX",
            Self::Cpy => "CPY",
            Self::Dec => "DEC",
            Self::Dex => "DEX",
            Self::Dey => "DEY",
            Self::Eor => "EOR",
            Self::Inc => "INC",
            Self::Inx => "INX",
            Self::Iny => "INY",
            Self::Jmp => "JMP",
            Self::Jsr => "JSR",
            Self::Lda => "LDA",
            Self::Ldx => "LDX",
            Self::Ldy => "LDY",
            Self::Lsr => "LSR",
            Self::Nop => "NOP",
            Self::Ora => "ORA",
            Self::Pha => "PHA",
            Self::Php => "PHP",
            Self::Pla => "PLA",
            Self::Plp => "PLP",
            Self::Rol => "ROL",
            Self::Ror => "ROR",
            Self::Rti => "RTI",
            Self::Rts => "RTS",
            Self::Sbc => "SBC",
            Self::Sec => "SEC",
            Self::Sed => "SED",
            Self::Sei => "SEI",
            Self::Sta => "STA",
            Self::Stx => "STX",
            Self::Sty => "STY",
            Self::Tax => "TAX",
            Self::Tay => "TAY",
            Self::Tsx => "TSX",
            Self::Txa => "TXA",
            Self::Txs => "TXS",
            Self::Tya => "TYA",
        }
    }

    /// Resolves a mnemonic name. Matching is ASCII case-insensitive.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_MNEMONICS
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
    }

    /// Returns true for the eight conditional branches, which only take a
    /// relative operand.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            Self::Bcc
                | Self::Bcs
                | Self::Beq
                | Self::Bmi
                | Self::Bne
                | Self::Bpl
                | Self::Bvc
                | Self::Bvs
        )
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown mnemonic name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mnemonic: {0}")]
pub struct UnknownMnemonic(pub String);

impl FromStr for Mnemonic {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownMnemonic(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{Mnemonic, ALL_MNEMONICS};

    #[test]
    fn names_are_unique_and_round_trip() {
        let names: HashSet<_> = ALL_MNEMONICS.iter().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), ALL_MNEMONICS.len());
        for mnemonic in ALL_MNEMONICS {
            assert_eq!(Mnemonic::from_name(mnemonic.as_str()), Some(mnemonic));
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(Mnemonic::from_name("lda"), Some(Mnemonic::Lda));
        assert_eq!(Mnemonic::from_name("StX"), Some(Mnemonic::Stx));
        assert_eq!("bit".parse::<Mnemonic>(), Ok(Mnemonic::Bit));
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(Mnemonic::from_name("LDAA"), None);
        assert_eq!(Mnemonic::from_name(""), None);
        let err = "XYZ".parse::<Mnemonic>().unwrap_err();
        assert_eq!(err.to_string(), "unknown mnemonic: XYZ");
    }

    #[test]
    fn exactly_eight_branches() {
        let branches = ALL_MNEMONICS.iter().filter(|m| m.is_branch()).count();
        assert_eq!(branches, 8);
        assert!(Mnemonic::Bne.is_branch());
        assert!(!Mnemonic::Jmp.is_branch());
    }
}
