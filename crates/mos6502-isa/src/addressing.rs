//! Addressing modes of the 6502 and their operand layout.

use std::fmt;

/// The thirteen documented 6502 addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddressingMode {
    /// No operand (`CLC`).
    Implied,
    /// Operates on the accumulator (`ASL A`).
    Accumulator,
    /// One-byte literal operand (`LDA #$10`).
    Immediate,
    /// One-byte address in page zero (`LDA $10`).
    ZeroPage,
    /// Zero-page address indexed by X (`LDA $10,X`).
    ZeroPageX,
    /// Zero-page address indexed by Y (`LDX $10,Y`).
    ZeroPageY,
    /// Full 16-bit address (`LDA $1234`).
    Absolute,
    /// Absolute address indexed by X (`LDA $1234,X`).
    AbsoluteX,
    /// Absolute address indexed by Y (`LDA $1234,Y`).
    AbsoluteY,
    /// Pointer at a 16-bit address (`JMP ($1234)`).
    Indirect,
    /// Indexed indirect through page zero (`LDA ($10,X)`).
    IndirectX,
    /// Indirect indexed through page zero (`LDA ($10),Y`).
    IndirectY,
    /// Signed 8-bit branch displacement (`BNE label`).
    Relative,
}

/// Every addressing mode, in declaration order.
pub const ALL_ADDRESSING_MODES: [AddressingMode; 13] = [
    AddressingMode::Implied,
    AddressingMode::Accumulator,
    AddressingMode::Immediate,
    AddressingMode::ZeroPage,
    AddressingMode::ZeroPageX,
    AddressingMode::ZeroPageY,
    AddressingMode::Absolute,
    AddressingMode::AbsoluteX,
    AddressingMode::AbsoluteY,
    AddressingMode::Indirect,
    AddressingMode::IndirectX,
    AddressingMode::IndirectY,
    AddressingMode::Relative,
];

impl AddressingMode {
    /// Number of operand bytes following the opcode.
    #[must_use]
    pub const fn operand_len(self) -> u8 {
        match self {
            Self::Implied | Self::Accumulator => 0,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::IndirectX
            | Self::IndirectY
            | Self::Relative => 1,
            Self::Absolute | Self::AbsoluteX | Self::AbsoluteY | Self::Indirect => 2,
        }
    }

    /// Total instruction length in bytes, opcode included.
    #[must_use]
    pub const fn instruction_len(self) -> u8 {
        1 + self.operand_len()
    }

    /// Human-readable name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Implied => "implied",
            Self::Accumulator => "accumulator",
            Self::Immediate => "immediate",
            Self::ZeroPage => "zero page",
            Self::ZeroPageX => "zero page,X",
            Self::ZeroPageY => "zero page,Y",
            Self::Absolute => "absolute",
            Self::AbsoluteX => "absolute,X",
            Self::AbsoluteY => "absolute,Y",
            Self::Indirect => "indirect",
            Self::IndirectX => "(indirect,X)",
            Self::IndirectY => "(indirect),Y",
            Self::Relative => "relative",
        }
    }

    /// Renders an operand in assembler syntax.
    ///
    /// `value` is the raw operand (little-endian bytes already combined). For
    /// [`AddressingMode::Relative`] the caller passes the branch target, not
    /// the displacement.
    #[must_use]
    pub fn format_operand(self, value: u16) -> String {
        match self {
            Self::Implied => String::new(),
            Self::Accumulator => "A".to_string(),
            Self::Immediate => format!("#${value:02X}"),
            Self::ZeroPage => format!("${value:02X}"),
            Self::ZeroPageX => format!("${value:02X},X"),
            Self::ZeroPageY => format!("${value:02X},Y"),
            Self::Absolute | Self::Relative => format!("${value:04X}"),
            Self::AbsoluteX => format!("${value:04X},X"),
            Self::AbsoluteY => format!("${value:04X},Y"),
            Self::Indirect => format!("(${value:04X})"),
            Self::IndirectX => format!("(${value:02X},X)"),
            Self::IndirectY => format!("(${value:02X}),Y"),
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
