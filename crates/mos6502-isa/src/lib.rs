//! Instruction-set core for the MOS 6502.
//!
//! Provides the documented opcode table, addressing modes, an instruction
//! decoder, and a linear disassembler. All tables are read-only process-wide
//! data.

/// Instruction mnemonics.
pub mod mnemonic;
pub use mnemonic::{Mnemonic, UnknownMnemonic, ALL_MNEMONICS};

/// Addressing modes and operand formatting.
pub mod addressing;
pub use addressing::{AddressingMode, ALL_ADDRESSING_MODES};

/// Static opcode table and lookup helpers.
pub mod opcodes;
pub use opcodes::{
    lookup, modes_for, opcode_entry, supports, OpcodeEntry, OpcodeError, OPCODE_COUNT,
    OPCODE_TABLE,
};

/// Instruction decoder.
pub mod decoder;
pub use decoder::{DecodeFault, DecodedInstruction, DecodedOrFault, Decoder};

/// Linear disassembler.
pub mod disasm;
pub use disasm::{disassemble, DisassemblyOptions, DisassemblyRow};

#[cfg(test)]
use proptest as _;
