//! Instruction decoder: maps raw bytes back to table entries and operands.

use thiserror::Error;

use crate::addressing::AddressingMode;
use crate::opcodes::{opcode_entry, OpcodeEntry};

/// A decoded instruction located at a specific address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// Address of the opcode byte.
    pub address: u16,
    /// Matching opcode table row.
    pub entry: OpcodeEntry,
    /// Raw operand, little-endian bytes combined. Zero when the mode has no
    /// operand.
    pub operand: u16,
}

impl DecodedInstruction {
    /// Instruction length in bytes.
    #[must_use]
    pub const fn byte_len(&self) -> u8 {
        self.entry.len
    }

    /// Branch destination for relative instructions.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_lossless
    )]
    pub const fn branch_target(&self) -> Option<u16> {
        if !matches!(self.entry.mode, AddressingMode::Relative) {
            return None;
        }
        let displacement = self.operand as u8 as i8;
        Some(
            self.address
                .wrapping_add(2)
                .wrapping_add_signed(displacement as i16),
        )
    }

    /// Operand value as it should appear in assembler syntax.
    #[must_use]
    pub fn display_operand(&self) -> String {
        let value = self.branch_target().unwrap_or(self.operand);
        self.entry.mode.format_operand(value)
    }

    /// Re-encodes the instruction into its byte sequence.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let [lo, hi] = self.operand.to_le_bytes();
        match self.entry.mode.operand_len() {
            0 => vec![self.entry.opcode],
            1 => vec![self.entry.opcode, lo],
            _ => vec![self.entry.opcode, lo, hi],
        }
    }
}

/// Reasons a byte sequence could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeFault {
    /// There were no bytes to decode.
    #[error("no bytes to decode")]
    Empty,
    /// The opcode byte is not part of the documented instruction set.
    #[error("undefined opcode ${opcode:02X}")]
    UndefinedOpcode {
        /// Offending byte.
        opcode: u8,
    },
    /// The opcode needs more operand bytes than remain.
    #[error("truncated instruction: opcode ${opcode:02X} needs {needed} bytes, {available} available")]
    Truncated {
        /// Opcode byte.
        opcode: u8,
        /// Full instruction length.
        needed: u8,
        /// Bytes remaining, opcode included.
        available: usize,
    },
}

/// Result of decoding one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedOrFault {
    /// Successfully decoded instruction.
    Instruction(DecodedInstruction),
    /// Decoding failed.
    Fault(DecodeFault),
}

impl DecodedOrFault {
    /// Returns the decoded instruction if present.
    #[must_use]
    pub const fn instruction(self) -> Option<DecodedInstruction> {
        match self {
            Self::Instruction(i) => Some(i),
            Self::Fault(_) => None,
        }
    }

    /// Returns the fault if decoding failed.
    #[must_use]
    pub const fn fault(self) -> Option<DecodeFault> {
        match self {
            Self::Instruction(_) => None,
            Self::Fault(f) => Some(f),
        }
    }
}

impl From<DecodedOrFault> for Result<DecodedInstruction, DecodeFault> {
    fn from(value: DecodedOrFault) -> Self {
        match value {
            DecodedOrFault::Instruction(i) => Ok(i),
            DecodedOrFault::Fault(f) => Err(f),
        }
    }
}

/// Instruction decoder for the documented 6502 instruction set.
pub struct Decoder;

impl Decoder {
    /// Decodes the instruction at the start of `bytes`, which is assumed to
    /// live at `address`.
    ///
    /// Never panics: empty, undefined and truncated inputs are reported as
    /// faults.
    #[must_use]
    pub fn decode(bytes: &[u8], address: u16) -> DecodedOrFault {
        let Some(&opcode) = bytes.first() else {
            return DecodedOrFault::Fault(DecodeFault::Empty);
        };

        let Some(entry) = opcode_entry(opcode) else {
            return DecodedOrFault::Fault(DecodeFault::UndefinedOpcode { opcode });
        };

        let needed = entry.len;
        if bytes.len() < usize::from(needed) {
            return DecodedOrFault::Fault(DecodeFault::Truncated {
                opcode,
                needed,
                available: bytes.len(),
            });
        }

        let operand = match needed {
            1 => 0,
            2 => u16::from(bytes[1]),
            _ => u16::from_le_bytes([bytes[1], bytes[2]]),
        };

        DecodedOrFault::Instruction(DecodedInstruction {
            address,
            entry: *entry,
            operand,
        })
    }
}
