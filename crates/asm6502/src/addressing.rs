//! Addressing-mode resolution.
//!
//! Turns the operand syntax written after a mnemonic into a concrete
//! [`AddressingMode`] backed by an opcode table row. Zero-page versus
//! absolute is chosen from the literal's syntactic width, never from its
//! value, so `LDA $0023` stays absolute.

use std::fmt;

use mos6502_isa::{lookup, modes_for, supports, AddressingMode, Mnemonic, OpcodeEntry};
use thiserror::Error;

use crate::lexer::{Number, Width};

/// An operand value as written: a literal or a label reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandValue {
    /// Numeric literal.
    Number(Number),
    /// Reference to a label resolved in the second pass.
    Symbol(String),
}

impl fmt::Display for OperandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.width == Width::Byte => write!(f, "${:02X}", n.value),
            Self::Number(n) => write!(f, "${:04X}", n.value),
            Self::Symbol(name) => f.write_str(name),
        }
    }
}

/// Index register suffix on a direct operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRegister {
    /// `,X`
    X,
    /// `,Y`
    Y,
}

/// Operand shape produced by the statement parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandSyntax {
    /// Nothing after the mnemonic.
    None,
    /// `A`
    Accumulator,
    /// `#value`
    Immediate(OperandValue),
    /// `value`, `value,X` or `value,Y`
    Direct {
        /// Address or branch target.
        value: OperandValue,
        /// Optional index suffix.
        index: Option<IndexRegister>,
    },
    /// `(value)`
    Indirect(OperandValue),
    /// `(value,X)`
    IndexedIndirect(OperandValue),
    /// `(value),Y`
    IndirectIndexed(OperandValue),
}

/// Normalized operand: a concrete mode plus the value to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandDescriptor {
    /// Resolved addressing mode.
    pub mode: AddressingMode,
    /// Operand value, absent for implied and accumulator modes.
    pub value: Option<OperandValue>,
}

/// A mnemonic bound to its opcode table row and operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstruction {
    /// Opcode table row chosen for the instruction.
    pub entry: &'static OpcodeEntry,
    /// Operand to encode.
    pub operand: OperandDescriptor,
}

impl ResolvedInstruction {
    /// Encoded length in bytes.
    #[must_use]
    pub fn size(&self) -> u16 {
        u16::from(self.entry.len)
    }
}

/// Resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The operand syntax does not describe any addressing mode.
    #[error("invalid operand for {mnemonic}: {reason}")]
    InvalidOperand {
        /// Instruction being resolved.
        mnemonic: Mnemonic,
        /// What is wrong with the operand.
        reason: String,
    },
    /// A valid mode that this mnemonic has no encoding for.
    #[error("{mnemonic} does not support {mode} addressing")]
    UnsupportedMode {
        /// Instruction being resolved.
        mnemonic: Mnemonic,
        /// Mode derived from the operand.
        mode: AddressingMode,
    },
}

/// Resolves the addressing mode for `mnemonic` with the given operand.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidOperand`] when no mode can be derived and
/// [`ResolveError::UnsupportedMode`] when the derived mode is not encodable.
pub fn resolve(
    mnemonic: Mnemonic,
    syntax: OperandSyntax,
) -> Result<ResolvedInstruction, ResolveError> {
    let invalid = |reason: String| ResolveError::InvalidOperand { mnemonic, reason };

    let (mode, value) = match syntax {
        OperandSyntax::None => {
            let mode = if !supports(mnemonic, AddressingMode::Implied)
                && supports(mnemonic, AddressingMode::Accumulator)
            {
                AddressingMode::Accumulator
            } else {
                AddressingMode::Implied
            };
            (mode, None)
        }
        OperandSyntax::Accumulator => (AddressingMode::Accumulator, None),
        OperandSyntax::Immediate(value) => {
            if let OperandValue::Number(n) = &value {
                if n.value > 0xFF {
                    return Err(invalid(format!(
                        "immediate value ${:04X} does not fit in one byte",
                        n.value
                    )));
                }
            }
            (AddressingMode::Immediate, Some(value))
        }
        OperandSyntax::Direct { value, index } if mnemonic.is_branch() => {
            if index.is_some() {
                return Err(invalid("branch targets cannot be indexed".to_string()));
            }
            (AddressingMode::Relative, Some(value))
        }
        OperandSyntax::Direct { value, index } => {
            (select_direct_mode(mnemonic, &value, index), Some(value))
        }
        OperandSyntax::Indirect(value) => (AddressingMode::Indirect, Some(value)),
        OperandSyntax::IndexedIndirect(value) => {
            require_zero_page(&value).map_err(invalid)?;
            (AddressingMode::IndirectX, Some(value))
        }
        OperandSyntax::IndirectIndexed(value) => {
            require_zero_page(&value).map_err(invalid)?;
            (AddressingMode::IndirectY, Some(value))
        }
    };

    let entry = lookup(mnemonic, mode)
        .map_err(|_| ResolveError::UnsupportedMode { mnemonic, mode })?;

    Ok(ResolvedInstruction {
        entry,
        operand: OperandDescriptor { mode, value },
    })
}

/// Picks zero-page or absolute for a direct operand.
///
/// Byte-width literals prefer zero page and fall back to absolute when the
/// mnemonic has no zero-page form. Word-width literals are never demoted.
/// Symbols take the absolute form when one exists so their size is known in
/// the first pass.
fn select_direct_mode(
    mnemonic: Mnemonic,
    value: &OperandValue,
    index: Option<IndexRegister>,
) -> AddressingMode {
    let (zero_page, absolute) = match index {
        None => (AddressingMode::ZeroPage, AddressingMode::Absolute),
        Some(IndexRegister::X) => (AddressingMode::ZeroPageX, AddressingMode::AbsoluteX),
        Some(IndexRegister::Y) => (AddressingMode::ZeroPageY, AddressingMode::AbsoluteY),
    };

    match value {
        OperandValue::Number(n) if n.width == Width::Byte => {
            if supports(mnemonic, zero_page) {
                zero_page
            } else {
                absolute
            }
        }
        OperandValue::Number(_) => absolute,
        OperandValue::Symbol(_) => {
            if !supports(mnemonic, absolute) && supports(mnemonic, zero_page) {
                zero_page
            } else {
                absolute
            }
        }
    }
}

fn require_zero_page(value: &OperandValue) -> Result<(), String> {
    match value {
        OperandValue::Number(n) if n.width == Width::Word => Err(format!(
            "indirect pointer {value} must be a zero-page address"
        )),
        _ => Ok(()),
    }
}

/// Length an instruction would take if its operand resolved.
///
/// The operand shape fixes the length on its own, since every mode it can
/// map to has one length. Without a usable shape the mnemonic decides when
/// all of its modes share a length.
#[must_use]
pub fn placeholder_size(mnemonic: Mnemonic, syntax: Option<&OperandSyntax>) -> Option<u16> {
    let mode = match syntax {
        Some(OperandSyntax::None | OperandSyntax::Accumulator) => AddressingMode::Implied,
        Some(OperandSyntax::Immediate(_)) => AddressingMode::Immediate,
        Some(OperandSyntax::Direct { .. }) if mnemonic.is_branch() => AddressingMode::Relative,
        Some(OperandSyntax::Direct { value, index }) => {
            select_direct_mode(mnemonic, value, *index)
        }
        Some(OperandSyntax::Indirect(_)) => AddressingMode::Indirect,
        Some(OperandSyntax::IndexedIndirect(_)) => AddressingMode::IndirectX,
        Some(OperandSyntax::IndirectIndexed(_)) => AddressingMode::IndirectY,
        None => {
            let lengths: Vec<u8> = modes_for(mnemonic)
                .into_iter()
                .map(AddressingMode::instruction_len)
                .collect();
            let first = *lengths.first()?;
            return lengths
                .iter()
                .all(|&len| len == first)
                .then_some(u16::from(first));
        }
    };
    Some(u16::from(mode.instruction_len()))
}

#[cfg(test)]
mod tests {
    use mos6502_isa::{AddressingMode, Mnemonic};
    use rstest::rstest;

    use super::{
        placeholder_size, resolve, IndexRegister, OperandSyntax, OperandValue, ResolveError,
    };
    use crate::lexer::{Number, Width};

    fn byte(value: u16) -> OperandValue {
        OperandValue::Number(Number {
            value,
            width: Width::Byte,
        })
    }

    fn word(value: u16) -> OperandValue {
        OperandValue::Number(Number {
            value,
            width: Width::Word,
        })
    }

    fn symbol(name: &str) -> OperandValue {
        OperandValue::Symbol(name.to_string())
    }

    fn direct(value: OperandValue, index: Option<IndexRegister>) -> OperandSyntax {
        OperandSyntax::Direct { value, index }
    }

    #[rstest]
    #[case(Mnemonic::Lda, direct(byte(0x23), None), AddressingMode::ZeroPage, 2)]
    #[case(Mnemonic::Lda, direct(word(0x0420), None), AddressingMode::Absolute, 3)]
    #[case(Mnemonic::Lda, direct(word(0x0023), None), AddressingMode::Absolute, 3)]
    #[case(Mnemonic::Lda, direct(byte(0x10), Some(IndexRegister::X)), AddressingMode::ZeroPageX, 2)]
    #[case(Mnemonic::Lda, direct(byte(0x10), Some(IndexRegister::Y)), AddressingMode::AbsoluteY, 3)]
    #[case(Mnemonic::Ldx, direct(byte(0x10), Some(IndexRegister::Y)), AddressingMode::ZeroPageY, 2)]
    #[case(Mnemonic::Jmp, direct(byte(0x12), None), AddressingMode::Absolute, 3)]
    #[case(Mnemonic::Jmp, OperandSyntax::Indirect(word(0xFFFC)), AddressingMode::Indirect, 3)]
    #[case(Mnemonic::Lda, OperandSyntax::Immediate(byte(0x01)), AddressingMode::Immediate, 2)]
    #[case(Mnemonic::Lda, OperandSyntax::IndexedIndirect(byte(0x40)), AddressingMode::IndirectX, 2)]
    #[case(Mnemonic::Sta, OperandSyntax::IndirectIndexed(byte(0x40)), AddressingMode::IndirectY, 2)]
    #[case(Mnemonic::Asl, OperandSyntax::None, AddressingMode::Accumulator, 1)]
    #[case(Mnemonic::Ror, OperandSyntax::Accumulator, AddressingMode::Accumulator, 1)]
    #[case(Mnemonic::Rts, OperandSyntax::None, AddressingMode::Implied, 1)]
    #[case(Mnemonic::Bne, direct(symbol("loop"), None), AddressingMode::Relative, 2)]
    #[case(Mnemonic::Beq, direct(word(0x0600), None), AddressingMode::Relative, 2)]
    #[case(Mnemonic::Lda, direct(symbol("data"), None), AddressingMode::Absolute, 3)]
    #[case(Mnemonic::Stx, direct(symbol("ptr"), Some(IndexRegister::Y)), AddressingMode::ZeroPageY, 2)]
    fn resolves_modes(
        #[case] mnemonic: Mnemonic,
        #[case] syntax: OperandSyntax,
        #[case] mode: AddressingMode,
        #[case] size: u16,
    ) {
        let resolved = resolve(mnemonic, syntax).unwrap();
        assert_eq!(resolved.operand.mode, mode);
        assert_eq!(resolved.entry.mode, mode);
        assert_eq!(resolved.size(), size);
    }

    #[test]
    fn absolute_load_uses_ad() {
        let resolved = resolve(Mnemonic::Lda, direct(word(0x0420), None)).unwrap();
        assert_eq!(resolved.entry.opcode, 0xAD);
    }

    #[rstest]
    #[case(Mnemonic::Lda, OperandSyntax::Immediate(word(0x1234)))]
    #[case(Mnemonic::Bne, direct(byte(0x10), Some(IndexRegister::X)))]
    #[case(Mnemonic::Lda, OperandSyntax::IndexedIndirect(word(0x0040)))]
    #[case(Mnemonic::Lda, OperandSyntax::IndirectIndexed(word(0x1240)))]
    fn invalid_operands(#[case] mnemonic: Mnemonic, #[case] syntax: OperandSyntax) {
        assert!(matches!(
            resolve(mnemonic, syntax),
            Err(ResolveError::InvalidOperand { .. })
        ));
    }

    #[rstest]
    #[case(Mnemonic::Sta, OperandSyntax::Immediate(byte(0x01)), AddressingMode::Immediate)]
    #[case(Mnemonic::Lda, OperandSyntax::None, AddressingMode::Implied)]
    #[case(Mnemonic::Lda, OperandSyntax::Indirect(word(0x1234)), AddressingMode::Indirect)]
    #[case(Mnemonic::Nop, OperandSyntax::Accumulator, AddressingMode::Accumulator)]
    #[case(Mnemonic::Stx, direct(word(0x1234), Some(IndexRegister::X)), AddressingMode::AbsoluteX)]
    fn unsupported_modes(
        #[case] mnemonic: Mnemonic,
        #[case] syntax: OperandSyntax,
        #[case] mode: AddressingMode,
    ) {
        assert_eq!(
            resolve(mnemonic, syntax),
            Err(ResolveError::UnsupportedMode { mnemonic, mode })
        );
    }

    #[test]
    fn operand_value_display() {
        assert_eq!(byte(0x0F).to_string(), "$0F");
        assert_eq!(word(0x0F).to_string(), "$000F");
        assert_eq!(symbol("loop").to_string(), "loop");
    }

    #[rstest]
    #[case(Mnemonic::Sta, Some(OperandSyntax::Immediate(byte(0x01))), Some(2))]
    #[case(Mnemonic::Ldx, Some(OperandSyntax::IndirectIndexed(byte(0x10))), Some(2))]
    #[case(Mnemonic::Jmp, Some(OperandSyntax::IndexedIndirect(byte(0x10))), Some(2))]
    #[case(Mnemonic::Stx, Some(direct(word(0x1234), Some(IndexRegister::X))), Some(3))]
    #[case(Mnemonic::Bne, Some(direct(symbol("loop"), Some(IndexRegister::X))), Some(2))]
    #[case(Mnemonic::Inx, Some(OperandSyntax::Accumulator), Some(1))]
    #[case(Mnemonic::Bne, None, Some(2))]
    #[case(Mnemonic::Rts, None, Some(1))]
    #[case(Mnemonic::Lda, None, None)]
    fn placeholder_sizes(
        #[case] mnemonic: Mnemonic,
        #[case] syntax: Option<OperandSyntax>,
        #[case] size: Option<u16>,
    ) {
        assert_eq!(placeholder_size(mnemonic, syntax.as_ref()), size);
    }
}
