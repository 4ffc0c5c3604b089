//! Static opcode table for the documented NMOS 6502 instruction set.
//!
//! The table is the single source of truth for encoding and decoding. Lookup
//! indexes are built on first use and shared read-only across threads.

use std::collections::HashMap;
use std::sync::OnceLock;

use thiserror::Error;

use crate::addressing::AddressingMode;
use crate::mnemonic::Mnemonic;

/// One row of the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct OpcodeEntry {
    /// Instruction mnemonic.
    pub mnemonic: Mnemonic,
    /// Addressing mode selecting this opcode.
    pub mode: AddressingMode,
    /// Encoded opcode byte.
    pub opcode: u8,
    /// Instruction length in bytes, opcode included.
    pub len: u8,
}

impl OpcodeEntry {
    const fn new(mnemonic: Mnemonic, mode: AddressingMode, opcode: u8) -> Self {
        Self {
            mnemonic,
            mode,
            opcode,
            len: mode.instruction_len(),
        }
    }
}

/// Lookup failures against the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OpcodeError {
    /// The mnemonic exists but has no encoding for the requested mode.
    #[error("{mnemonic} does not support {mode} addressing")]
    UnsupportedMode {
        /// Requested mnemonic.
        mnemonic: Mnemonic,
        /// Requested mode.
        mode: AddressingMode,
    },
}

use AddressingMode::{
    Absolute, AbsoluteX, AbsoluteY, Accumulator, Immediate, Implied, Indirect, IndirectX,
    IndirectY, Relative, ZeroPage, ZeroPageX, ZeroPageY,
};
use Mnemonic::{
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc, Cld, Cli, Clv, Cmp,
    Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp, Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha,
    Php, Pla, Plp, Rol, Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa,
    Txs, Tya,
};

/// Number of documented opcodes.
pub const OPCODE_COUNT: usize = 151;

/// Every documented opcode, grouped by mnemonic.
pub static OPCODE_TABLE: [OpcodeEntry; OPCODE_COUNT] = [
    OpcodeEntry::new(Adc, Immediate, 0x69),
    OpcodeEntry::new(Adc, ZeroPage, 0x65),
    OpcodeEntry::new(Adc, ZeroPageX, 0x75),
    OpcodeEntry::new(Adc, Absolute, 0x6D),
    OpcodeEntry::new(Adc, AbsoluteX, 0x7D),
    OpcodeEntry::new(Adc, AbsoluteY, 0x79),
    OpcodeEntry::new(Adc, IndirectX, 0x61),
    OpcodeEntry::new(Adc, IndirectY, 0x71),
    OpcodeEntry::new(And, Immediate, 0x29),
    OpcodeEntry::new(And, ZeroPage, 0x25),
    OpcodeEntry::new(And, ZeroPageX, 0x35),
    OpcodeEntry::new(And, Absolute, 0x2D),
    OpcodeEntry::new(And, AbsoluteX, 0x3D),
    OpcodeEntry::new(And, AbsoluteY, 0x39),
    OpcodeEntry::new(And, IndirectX, 0x21),
    OpcodeEntry::new(And, IndirectY, 0x31),
    OpcodeEntry::new(Asl, Accumulator, 0x0A),
    OpcodeEntry::new(Asl, ZeroPage, 0x06),
    OpcodeEntry::new(Asl, ZeroPageX, 0x16),
    OpcodeEntry::new(Asl, Absolute, 0x0E),
    OpcodeEntry::new(Asl, AbsoluteX, 0x1E),
    OpcodeEntry::new(Bcc, Relative, 0x90),
    OpcodeEntry::new(Bcs, Relative, 0xB0),
    OpcodeEntry::new(Beq, Relative, 0xF0),
    OpcodeEntry::new(Bit, ZeroPage, 0x24),
    OpcodeEntry::new(Bit, Absolute, 0x2C),
    OpcodeEntry::new(Bmi, Relative, 0x30),
    OpcodeEntry::new(Bne, Relative, 0xD0),
    OpcodeEntry::new(Bpl, Relative, 0x10),
    OpcodeEntry::new(Brk, Implied, 0x00),
    OpcodeEntry::new(Bvc, Relative, 0x50),
    OpcodeEntry::new(Bvs, Relative, 0x70),
    OpcodeEntry::new(Clc, Implied, 0x18),
    OpcodeEntry::new(Cld, Implied, 0xD8),
    OpcodeEntry::new(Cli, Implied, 0x58),
    OpcodeEntry::new(Clv, Implied, 0xB8),
    OpcodeEntry::new(Cmp, Immediate, 0xC9),
    OpcodeEntry::new(Cmp, ZeroPage, 0xC5),
    OpcodeEntry::new(Cmp, ZeroPageX, 0xD5),
    OpcodeEntry::new(Cmp, Absolute, 0xCD),
    OpcodeEntry::new(Cmp, AbsoluteX, 0xDD),
    OpcodeEntry::new(Cmp, AbsoluteY, 0xD9),
    OpcodeEntry::new(Cmp, IndirectX, 0xC1),
    OpcodeEntry::new(Cmp, IndirectY, 0xD1),
    OpcodeEntry::new(Cpx, Immediate, 0xE0),
    OpcodeEntry::new(Cpx, ZeroPage, 0xE4),
    OpcodeEntry::new(Cpx, Absolute, 0xEC),
    OpcodeEntry::new(Cpy, Immediate, 0xC0),
    OpcodeEntry::new(Cpy, ZeroPage, 0xC4),
    OpcodeEntry::new(Cpy, Absolute, 0xCC),
    OpcodeEntry::new(Dec, ZeroPage, 0xC6),
    OpcodeEntry::new(Dec, ZeroPageX, 0xD6),
    OpcodeEntry::new(Dec, Absolute, 0xCE),
    OpcodeEntry::new(Dec, AbsoluteX, 0xDE),
    OpcodeEntry::new(Dex, Implied, 0xCA),
    OpcodeEntry::new(Dey, Implied, 0x88),
    OpcodeEntry::new(Eor, Immediate, 0x49),
    OpcodeEntry::new(Eor, ZeroPage, 0x45),
    OpcodeEntry::new(Eor, ZeroPageX, 0x55),
    OpcodeEntry::new(Eor, Absolute, 0x4D),
    OpcodeEntry::new(Eor, AbsoluteX, 0x5D),
    OpcodeEntry::new(Eor, AbsoluteY, 0x59),
    OpcodeEntry::new(Eor, IndirectX, 0x41),
    OpcodeEntry::new(Eor, IndirectY, 0x51),
    OpcodeEntry::new(Inc, ZeroPage, 0xE6),
    OpcodeEntry::new(Inc, ZeroPageX, 0xF6),
    OpcodeEntry::new(Inc, Absolute, 0xEE),
    OpcodeEntry::new(Inc, AbsoluteX, 0xFE),
    OpcodeEntry::new(Inx, Implied, 0xE8),
    OpcodeEntry::new(Iny, Implied, 0xC8),
    OpcodeEntry::new(Jmp, Absolute, 0x4C),
    OpcodeEntry::new(Jmp, Indirect, 0x6C),
    OpcodeEntry::new(Jsr, Absolute, 0x20),
    OpcodeEntry::new(Lda, Immediate, 0xA9),
    OpcodeEntry::new(Lda, ZeroPage, 0xA5),
    OpcodeEntry::new(Lda, ZeroPageX, 0xB5),
    OpcodeEntry::new(Lda, Absolute, 0xAD),
    OpcodeEntry::new(Lda, AbsoluteX, 0xBD),
    OpcodeEntry::new(Lda, AbsoluteY, 0xB9),
    OpcodeEntry::new(Lda, IndirectX, 0xA1),
    OpcodeEntry::new(Lda, IndirectY, 0xB1),
    OpcodeEntry::new(Ldx, Immediate, 0xA2),
    OpcodeEntry::new(Ldx, ZeroPage, 0xA6),
    OpcodeEntry::new(Ldx, ZeroPageY, 0xB6),
    OpcodeEntry::new(Ldx, Absolute, 0xAE),
    OpcodeEntry::new(Ldx, AbsoluteY, 0xBE),
    OpcodeEntry::new(Ldy, Immediate, 0xA0),
    OpcodeEntry::new(Ldy, ZeroPage, 0xA4),
    OpcodeEntry::new(Ldy, ZeroPageX, 0xB4),
    OpcodeEntry::new(Ldy, Absolute, 0xAC),
    OpcodeEntry::new(Ldy, AbsoluteX, 0xBC),
    OpcodeEntry::new(Lsr, Accumulator, 0x4A),
    OpcodeEntry::new(Lsr, ZeroPage, 0x46),
    OpcodeEntry::new(Lsr, ZeroPageX, 0x56),
    OpcodeEntry::new(Lsr, Absolute, 0x4E),
    OpcodeEntry::new(Lsr, AbsoluteX, 0x5E),
    OpcodeEntry::new(Nop, Implied, 0xEA),
    OpcodeEntry::new(Ora, Immediate, 0x09),
    OpcodeEntry::new(Ora, ZeroPage, 0x05),
    OpcodeEntry::new(Ora, ZeroPageX, 0x15),
    OpcodeEntry::new(Ora, Absolute, 0x0D),
    OpcodeEntry::new(Ora, AbsoluteX, 0x1D),
    OpcodeEntry::new(Ora, AbsoluteY, 0x19),
    OpcodeEntry::new(Ora, IndirectX, 0x01),
    OpcodeEntry::new(Ora, IndirectY, 0x11),
    OpcodeEntry::new(Pha, Implied, 0x48),
    OpcodeEntry::new(Php, Implied, 0x08),
    OpcodeEntry::new(Pla, Implied, 0x68),
    OpcodeEntry::new(Plp, Implied, 0x28),
    OpcodeEntry::new(Rol, Accumulator, 0x2A),
    OpcodeEntry::new(Rol, ZeroPage, 0x26),
    OpcodeEntry::new(Rol, ZeroPageX, 0x36),
    OpcodeEntry::new(Rol, Absolute, 0x2E),
    OpcodeEntry::new(Rol, AbsoluteX, 0x3E),
    OpcodeEntry::new(Ror, Accumulator, 0x6A),
    OpcodeEntry::new(Ror, ZeroPage, 0x66),
    OpcodeEntry::new(Ror, ZeroPageX, 0x76),
    OpcodeEntry::new(Ror, Absolute, 0x6E),
    OpcodeEntry::new(Ror, AbsoluteX, 0x7E),
    OpcodeEntry::new(Rti, Implied, 0x40),
    OpcodeEntry::new(Rts, Implied, 0x60),
    OpcodeEntry::new(Sbc, Immediate, 0xE9),
    OpcodeEntry::new(Sbc, ZeroPage, 0xE5),
    OpcodeEntry::new(Sbc, ZeroPageX, 0xF5),
    OpcodeEntry::new(Sbc, Absolute, 0xED),
    OpcodeEntry::new(Sbc, AbsoluteX, 0xFD),
    OpcodeEntry::new(Sbc, AbsoluteY, 0xF9),
    OpcodeEntry::new(Sbc, IndirectX, 0xE1),
    OpcodeEntry::new(Sbc, IndirectY, 0xF1),
    OpcodeEntry::new(Sec, Implied, 0x38),
    OpcodeEntry::new(Sed, Implied, 0xF8),
    OpcodeEntry::new(Sei, Implied, 0x78),
    OpcodeEntry::new(Sta, ZeroPage, 0x85),
    OpcodeEntry::new(Sta, ZeroPageX, 0x95),
    OpcodeEntry::new(Sta, Absolute, 0x8D),
    OpcodeEntry::new(Sta, AbsoluteX, 0x9D),
    OpcodeEntry::new(Sta, AbsoluteY, 0x99),
    OpcodeEntry::new(Sta, IndirectX, 0x81),
    OpcodeEntry::new(Sta, IndirectY, 0x91),
    OpcodeEntry::new(Stx, ZeroPage, 0x86),
    OpcodeEntry::new(Stx, ZeroPageY, 0x96),
    OpcodeEntry::new(Stx, Absolute, 0x8E),
    OpcodeEntry::new(Sty, ZeroPage, 0x84),
    OpcodeEntry::new(Sty, ZeroPageX, 0x94),
    OpcodeEntry::new(Sty, Absolute, 0x8C),
    OpcodeEntry::new(Tax, Implied, 0xAA),
    OpcodeEntry::new(Tay, Implied, 0xA8),
    OpcodeEntry::new(Tsx, Implied, 0xBA),
    OpcodeEntry::new(Txa, Implied, 0x8A),
    OpcodeEntry::new(Txs, Implied, 0x9A),
    OpcodeEntry::new(Tya, Implied, 0x98),
];

fn pair_index() -> &'static HashMap<(Mnemonic, AddressingMode), &'static OpcodeEntry> {
    static INDEX: OnceLock<HashMap<(Mnemonic, AddressingMode), &'static OpcodeEntry>> =
        OnceLock::new();
    INDEX.get_or_init(|| {
        OPCODE_TABLE
            .iter()
            .map(|entry| ((entry.mnemonic, entry.mode), entry))
            .collect()
    })
}

fn byte_index() -> &'static [Option<&'static OpcodeEntry>; 256] {
    static INDEX: OnceLock<[Option<&'static OpcodeEntry>; 256]> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut index = [None; 256];
        for entry in &OPCODE_TABLE {
            index[usize::from(entry.opcode)] = Some(entry);
        }
        index
    })
}

/// Looks up the encoding for a mnemonic in a given addressing mode.
///
/// # Errors
///
/// Returns [`OpcodeError::UnsupportedMode`] when the pair is not part of the
/// documented instruction set.
pub fn lookup(mnemonic: Mnemonic, mode: AddressingMode) -> Result<&'static OpcodeEntry, OpcodeError> {
    pair_index()
        .get(&(mnemonic, mode))
        .copied()
        .ok_or(OpcodeError::UnsupportedMode { mnemonic, mode })
}

/// Returns true when `mnemonic` has an encoding for `mode`.
#[must_use]
pub fn supports(mnemonic: Mnemonic, mode: AddressingMode) -> bool {
    pair_index().contains_key(&(mnemonic, mode))
}

/// Reverse lookup from an opcode byte. Undocumented opcodes yield `None`.
#[must_use]
pub fn opcode_entry(opcode: u8) -> Option<&'static OpcodeEntry> {
    byte_index()[usize::from(opcode)]
}

/// Addressing modes available for `mnemonic`, in table order.
#[must_use]
pub fn modes_for(mnemonic: Mnemonic) -> Vec<AddressingMode> {
    OPCODE_TABLE
        .iter()
        .filter(|entry| entry.mnemonic == mnemonic)
        .map(|entry| entry.mode)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::rstest;

    use super::{lookup, modes_for, opcode_entry, supports, OpcodeError, OPCODE_TABLE};
    use crate::addressing::AddressingMode;
    use crate::mnemonic::{Mnemonic, ALL_MNEMONICS};

    #[test]
    fn opcode_bytes_are_unique() {
        let bytes: HashSet<u8> = OPCODE_TABLE.iter().map(|e| e.opcode).collect();
        assert_eq!(bytes.len(), OPCODE_TABLE.len());
    }

    #[test]
    fn mnemonic_mode_pairs_are_unique() {
        let pairs: HashSet<_> = OPCODE_TABLE.iter().map(|e| (e.mnemonic, e.mode)).collect();
        assert_eq!(pairs.len(), OPCODE_TABLE.len());
    }

    #[test]
    fn every_mnemonic_has_an_encoding() {
        for mnemonic in ALL_MNEMONICS {
            assert!(!modes_for(mnemonic).is_empty(), "{mnemonic} has no modes");
        }
    }

    #[test]
    fn reverse_index_matches_table() {
        for entry in &OPCODE_TABLE {
            assert_eq!(opcode_entry(entry.opcode), Some(entry));
        }
        let defined = (0u8..=255).filter(|b| opcode_entry(*b).is_some()).count();
        assert_eq!(defined, 151);
    }

    #[rstest]
    #[case(Mnemonic::Lda, AddressingMode::Absolute, 0xAD, 3)]
    #[case(Mnemonic::Lda, AddressingMode::ZeroPage, 0xA5, 2)]
    #[case(Mnemonic::Ldx, AddressingMode::Absolute, 0xAE, 3)]
    #[case(Mnemonic::Ldy, AddressingMode::ZeroPage, 0xA4, 2)]
    #[case(Mnemonic::Sta, AddressingMode::Absolute, 0x8D, 3)]
    #[case(Mnemonic::Stx, AddressingMode::ZeroPage, 0x86, 2)]
    #[case(Mnemonic::Sty, AddressingMode::Absolute, 0x8C, 3)]
    #[case(Mnemonic::Adc, AddressingMode::Absolute, 0x6D, 3)]
    #[case(Mnemonic::Sbc, AddressingMode::ZeroPage, 0xE5, 2)]
    #[case(Mnemonic::And, AddressingMode::Absolute, 0x2D, 3)]
    #[case(Mnemonic::Ora, AddressingMode::ZeroPage, 0x05, 2)]
    #[case(Mnemonic::Eor, AddressingMode::Absolute, 0x4D, 3)]
    #[case(Mnemonic::Cmp, AddressingMode::ZeroPage, 0xC5, 2)]
    #[case(Mnemonic::Cpx, AddressingMode::Absolute, 0xEC, 3)]
    #[case(Mnemonic::Cpy, AddressingMode::ZeroPage, 0xC4, 2)]
    #[case(Mnemonic::Bit, AddressingMode::Absolute, 0x2C, 3)]
    #[case(Mnemonic::Jmp, AddressingMode::Indirect, 0x6C, 3)]
    #[case(Mnemonic::Asl, AddressingMode::Accumulator, 0x0A, 1)]
    #[case(Mnemonic::Bne, AddressingMode::Relative, 0xD0, 2)]
    #[case(Mnemonic::Brk, AddressingMode::Implied, 0x00, 1)]
    fn known_encodings(
        #[case] mnemonic: Mnemonic,
        #[case] mode: AddressingMode,
        #[case] opcode: u8,
        #[case] len: u8,
    ) {
        let entry = lookup(mnemonic, mode).unwrap();
        assert_eq!(entry.opcode, opcode);
        assert_eq!(entry.len, len);
    }

    #[rstest]
    #[case(Mnemonic::Jmp, AddressingMode::ZeroPage)]
    #[case(Mnemonic::Lda, AddressingMode::ZeroPageY)]
    #[case(Mnemonic::Sta, AddressingMode::Immediate)]
    #[case(Mnemonic::Stx, AddressingMode::AbsoluteY)]
    #[case(Mnemonic::Bit, AddressingMode::Immediate)]
    fn unsupported_pairs(#[case] mnemonic: Mnemonic, #[case] mode: AddressingMode) {
        assert!(!supports(mnemonic, mode));
        assert_eq!(
            lookup(mnemonic, mode),
            Err(OpcodeError::UnsupportedMode { mnemonic, mode })
        );
    }

    #[test]
    fn unsupported_mode_message() {
        let err = lookup(Mnemonic::Jmp, AddressingMode::Immediate).unwrap_err();
        assert_eq!(err.to_string(), "JMP does not support immediate addressing");
    }

    #[test]
    fn modes_for_lists_table_order() {
        assert_eq!(
            modes_for(Mnemonic::Ldx),
            vec![
                AddressingMode::Immediate,
                AddressingMode::ZeroPage,
                AddressingMode::ZeroPageY,
                AddressingMode::Absolute,
                AddressingMode::AbsoluteY,
            ]
        );
    }
}
