//! Instruction and directive encoding (second pass).
//!
//! Converts addressed statements into bytes, resolving label references
//! against the complete symbol table from the first pass.

use mos6502_isa::AddressingMode;
use thiserror::Error;

use crate::addressing::{OperandValue, ResolvedInstruction};
use crate::parser::Statement;
use crate::symbols::SymbolTable;

/// Second-pass encoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Reference to a label that was never defined.
    #[error("undefined symbol '{0}'")]
    UndefinedSymbol(String),
    /// Branch displacement outside `-128..=127`.
    #[error("branch target ${target:04X} out of range (offset {offset})")]
    BranchOutOfRange {
        /// Branch destination.
        target: u16,
        /// Displacement from the following instruction.
        offset: i32,
    },
    /// Resolved value too wide for a one-byte operand.
    #[error("value ${value:04X} does not fit in one byte")]
    ValueOutOfRange {
        /// Resolved value.
        value: u16,
    },
}

fn resolve_value(value: &OperandValue, symbols: &SymbolTable) -> Result<u16, EncodeError> {
    match value {
        OperandValue::Number(n) => Ok(n.value),
        OperandValue::Symbol(name) => symbols
            .address(name)
            .ok_or_else(|| EncodeError::UndefinedSymbol(name.clone())),
    }
}

fn branch_displacement(target: u16, address: u16) -> Result<u8, EncodeError> {
    let offset = i32::from(target) - (i32::from(address) + 2);
    let displacement =
        i8::try_from(offset).map_err(|_| EncodeError::BranchOutOfRange { target, offset })?;
    Ok(displacement.to_le_bytes()[0])
}

/// Encodes an instruction located at `address`.
///
/// # Errors
///
/// Returns an [`EncodeError`] for undefined symbols, out-of-range branches,
/// and symbol values too wide for a one-byte operand.
pub fn encode_instruction(
    instruction: &ResolvedInstruction,
    symbols: &SymbolTable,
    address: u16,
) -> Result<Vec<u8>, EncodeError> {
    let entry = instruction.entry;
    let mut bytes = vec![entry.opcode];

    let value = match &instruction.operand.value {
        Some(v) => resolve_value(v, symbols)?,
        None => 0,
    };

    match entry.mode.operand_len() {
        0 => {}
        1 if entry.mode == AddressingMode::Relative => {
            bytes.push(branch_displacement(value, address)?);
        }
        1 => {
            let byte = u8::try_from(value).map_err(|_| EncodeError::ValueOutOfRange { value })?;
            bytes.push(byte);
        }
        _ => bytes.extend_from_slice(&value.to_le_bytes()),
    }

    Ok(bytes)
}

/// Encodes any statement located at `address`. Labels, origin changes and
/// reserved space produce no bytes.
///
/// # Errors
///
/// Propagates [`encode_instruction`] errors and undefined symbols in
/// `!word` lists.
pub fn encode_statement(
    statement: &Statement,
    symbols: &SymbolTable,
    address: u16,
) -> Result<Vec<u8>, EncodeError> {
    match statement {
        Statement::Label(_) | Statement::Origin(_) | Statement::Reserved { .. } => Ok(Vec::new()),
        Statement::Bytes(bytes) => Ok(bytes.clone()),
        Statement::Words(words) => {
            let mut bytes = Vec::with_capacity(words.len() * 2);
            for word in words {
                bytes.extend_from_slice(&resolve_value(word, symbols)?.to_le_bytes());
            }
            Ok(bytes)
        }
        Statement::Fill { count, value } => Ok(vec![*value; usize::from(*count)]),
        Statement::Instruction(instruction) => encode_instruction(instruction, symbols, address),
    }
}
