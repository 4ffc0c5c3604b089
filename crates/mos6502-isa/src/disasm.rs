//! Linear disassembly of raw 6502 machine code.
//!
//! Bytes are decoded front to back. Undefined opcodes and instructions cut
//! short by the end of the input are rendered as `.byte` rows so that every
//! input byte appears in exactly one row.

use std::fmt;

use crate::decoder::{DecodedOrFault, Decoder};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Disassembler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyOptions {
    /// Address of the first input byte.
    pub start_address: u16,
}

/// A single disassembled row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Address of the first byte of this row.
    pub address: u16,
    /// Raw bytes covered by this row.
    pub bytes: Vec<u8>,
    /// Instruction mnemonic, or `.byte` for data.
    pub mnemonic: String,
    /// Formatted operand text (e.g. `$0420,X`).
    pub operands: String,
    /// Whether this row holds a byte that does not start a documented
    /// instruction.
    pub is_illegal: bool,
}

impl DisassemblyRow {
    fn data(address: u16, byte: u8) -> Self {
        Self {
            address,
            bytes: vec![byte],
            mnemonic: ".byte".to_string(),
            operands: format!("${byte:02X}"),
            is_illegal: true,
        }
    }
}

impl fmt::Display for DisassemblyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex: Vec<String> = self.bytes.iter().map(|b| format!("{b:02X}")).collect();
        let text = if self.operands.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.operands)
        };
        write!(f, "{:04X}  {:<8}  {text}", self.address, hex.join(" "))
    }
}

/// Disassembles `bytes` from start to end.
///
/// Addresses wrap at `$FFFF`.
#[must_use]
pub fn disassemble(bytes: &[u8], options: DisassemblyOptions) -> Vec<DisassemblyRow> {
    let mut rows = Vec::new();
    let mut offset = 0usize;
    let mut address = options.start_address;

    while offset < bytes.len() {
        let (row, len) = match Decoder::decode(&bytes[offset..], address) {
            DecodedOrFault::Instruction(decoded) => (
                DisassemblyRow {
                    address,
                    bytes: decoded.encode(),
                    mnemonic: decoded.entry.mnemonic.to_string(),
                    operands: decoded.display_operand(),
                    is_illegal: false,
                },
                decoded.byte_len(),
            ),
            DecodedOrFault::Fault(_) => (DisassemblyRow::data(address, bytes[offset]), 1),
        };
        offset += usize::from(len);
        address = address.wrapping_add(u16::from(len));
        rows.push(row);
    }

    rows
}
