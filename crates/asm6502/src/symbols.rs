//! Symbol table and first-pass address assignment.
//!
//! The first pass walks parsed statements with a virtual location counter,
//! binding each label to the address of the statement that follows it. No
//! bytes are produced here.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::parser::{ParsedStatement, Statement};

/// Size of the 6502 address space.
pub const ADDRESS_SPACE: u32 = 0x1_0000;

/// A label with its assigned address and definition line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// The address assigned to this label.
    pub address: u16,
    /// Source line number where the label was defined.
    pub defined_at: usize,
}

/// Label name to definition. Names are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Defines `name`. The first definition wins; a redefinition returns the
    /// existing entry.
    ///
    /// # Errors
    ///
    /// Returns the earlier definition when `name` is already bound.
    pub fn define(&mut self, name: &str, symbol: Symbol) -> Result<(), Symbol> {
        if let Some(existing) = self.entries.get(name) {
            return Err(*existing);
        }
        self.entries.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Looks up a label.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    /// Returns the address bound to `name`.
    #[must_use]
    pub fn address(&self, name: &str) -> Option<u16> {
        self.entries.get(name).map(|s| s.address)
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no labels are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.entries.iter().map(|(name, symbol)| (name.as_str(), symbol))
    }

    /// Labels ordered by address, then name.
    #[must_use]
    pub fn by_address(&self) -> Vec<(&str, &Symbol)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by_key(|(name, symbol)| (symbol.address, *name));
        sorted
    }
}

/// First-pass error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct SymbolError {
    /// Kind of error.
    pub kind: SymbolErrorKind,
    /// Source line where the error occurred.
    pub line: usize,
    /// Source column where the error occurred.
    pub column: usize,
}

/// Classification of first-pass findings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolErrorKind {
    /// Label defined more than once.
    #[error("duplicate symbol '{name}' (first defined at line {first_definition})")]
    DuplicateSymbol {
        /// The label name.
        name: String,
        /// Line of the first definition.
        first_definition: usize,
    },
    /// Statement would extend past `$FFFF`.
    #[error("address overflow: ${address:05X} exceeds 16-bit address space")]
    AddressOverflow {
        /// First address past the statement.
        address: u32,
    },
    /// Label defined after code that ends exactly at `$FFFF`. The label is
    /// not bound; assembly continues.
    #[error("label '{name}' would be bound past $FFFF")]
    LabelOutOfRange {
        /// The label name.
        name: String,
    },
    /// Origin directive moved the location counter backwards. Legal.
    #[error("origin moves location counter backwards from ${current:04X} to ${requested:04X}")]
    OriginBackwards {
        /// Location counter before the directive.
        current: u32,
        /// Requested origin.
        requested: u16,
    },
}

impl SymbolErrorKind {
    /// Fatal findings stop assembly after the first pass.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::AddressOverflow { .. })
    }
}

/// A statement with its assigned address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressedStatement {
    /// Address where the statement's bytes begin.
    pub address: u16,
    /// Number of bytes the statement emits.
    pub size: u32,
    /// The parsed statement.
    pub parsed: ParsedStatement,
}

/// Result of first-pass address assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Statements with their assigned addresses, up to any fatal error.
    pub statements: Vec<AddressedStatement>,
    /// Labels collected so far.
    pub symbols: SymbolTable,
    /// Location counter after the last statement.
    pub end_address: u32,
    /// Errors and warnings in source order.
    pub errors: Vec<SymbolError>,
}

impl Assignment {
    /// Returns true when a fatal error ended the pass early.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.errors.iter().any(|e| e.kind.is_fatal())
    }
}

/// Assigns addresses to `statements` starting at `start_address`.
///
/// Duplicate labels keep their first definition and are reported. An origin
/// below the current location counter is reported as a warning. A statement
/// that would extend past `$FFFF` is fatal and ends the pass. A label after
/// code ending exactly at `$FFFF` is reported and left unbound.
#[must_use]
pub fn assign_addresses(statements: &[ParsedStatement], start_address: u16) -> Assignment {
    let mut symbols = SymbolTable::new();
    let mut addressed = Vec::with_capacity(statements.len());
    let mut errors = Vec::new();
    let mut pc: u32 = u32::from(start_address);

    for parsed in statements {
        let error = |kind| SymbolError {
            kind,
            line: parsed.line,
            column: parsed.column,
        };

        if let Statement::Origin(requested) = parsed.statement {
            if u32::from(requested) < pc {
                warn!(current = pc, requested, "origin moves backwards");
                errors.push(error(SymbolErrorKind::OriginBackwards {
                    current: pc,
                    requested,
                }));
            }
            debug!(origin = requested, line = parsed.line, "origin set");
            pc = u32::from(requested);
            addressed.push(AddressedStatement {
                address: requested,
                size: 0,
                parsed: parsed.clone(),
            });
            continue;
        }

        let size = parsed.statement.size();
        let end = pc.saturating_add(size);
        if end > ADDRESS_SPACE {
            errors.push(error(SymbolErrorKind::AddressOverflow { address: end }));
            break;
        }
        // Only zero-size statements remain once the counter reaches $10000.
        let Ok(address) = u16::try_from(pc) else {
            if let Statement::Label(name) = &parsed.statement {
                warn!(label = %name, "label past end of address space");
                errors.push(error(SymbolErrorKind::LabelOutOfRange { name: name.clone() }));
            }
            continue;
        };

        if let Statement::Label(name) = &parsed.statement {
            let symbol = Symbol {
                address,
                defined_at: parsed.line,
            };
            if let Err(existing) = symbols.define(name, symbol) {
                errors.push(error(SymbolErrorKind::DuplicateSymbol {
                    name: name.clone(),
                    first_definition: existing.defined_at,
                }));
            }
        }

        addressed.push(AddressedStatement {
            address,
            size,
            parsed: parsed.clone(),
        });
        pc = end;
    }

    Assignment {
        statements: addressed,
        symbols,
        end_address: pc,
        errors,
    }
}
