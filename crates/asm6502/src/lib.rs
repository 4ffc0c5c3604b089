//! Two-pass assembler for the MOS 6502.
//!
//! Source text flows through the [`lexer`] and [`parser`] into statements,
//! [`symbols`] assigns addresses and binds labels, and [`encoder`] fills an
//! [`emission::EmissionBuffer`]. [`assembler`] drives the passes and collects
//! [`diagnostics`].

use clap as _;
#[cfg(test)]
use proptest as _;
#[cfg(test)]
use tempfile as _;
use tracing_subscriber as _;

/// Addressing-mode resolution for parsed operands.
pub mod addressing;
/// Assembly unit state machine and top-level entry points.
pub mod assembler;
/// Diagnostic records and collections.
pub mod diagnostics;
/// Address-keyed byte store.
pub mod emission;
/// Second-pass encoding.
pub mod encoder;
/// Tokenizer.
pub mod lexer;
/// Statement parser.
pub mod parser;
/// Symbol table and first-pass address assignment.
pub mod symbols;

pub use assembler::{
    assemble, assemble_with_config, AssemblerConfig, AssemblyOutput, AssemblyState, AssemblyUnit,
    ListingEntry,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
