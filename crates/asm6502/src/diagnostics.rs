//! Structured diagnostics for an assembly run.
//!
//! Every phase reports into one [`Diagnostics`] collection. Records carry a
//! source line and column and format for stderr in the usual style:
//!
//! ```text
//! program.asm:10:5: error: undefined symbol 'loop'
//! ```

use std::fmt;

use thiserror::Error;

use crate::emission::EmissionError;
use crate::encoder::EncodeError;
use crate::lexer::LexErrorKind;
use crate::parser::{ParseError, ParseErrorKind};
use crate::symbols::{SymbolError, SymbolErrorKind};

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Informational; output is still usable.
    Warning,
    /// The affected statement produced no bytes.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Classification of diagnostics by phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    /// Lexing, parsing or operand resolution.
    #[error(transparent)]
    Parse(ParseErrorKind),
    /// First pass: symbols and address assignment.
    #[error(transparent)]
    Symbol(SymbolErrorKind),
    /// Second pass: encoding.
    #[error(transparent)]
    Encode(EncodeError),
    /// Second pass: placing bytes.
    #[error(transparent)]
    Emission(EmissionError),
}

impl DiagnosticKind {
    /// Severity of this kind.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::Symbol(SymbolErrorKind::OriginBackwards { .. })
            | Self::Parse(ParseErrorKind::ImplicitLabel { .. }) => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Fatal diagnostics abort the run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Symbol(kind) => kind.is_fatal(),
            _ => false,
        }
    }

    /// Short stable name of the diagnostic class.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        use crate::addressing::ResolveError;

        match self {
            Self::Parse(ParseErrorKind::Lex(lex)) => match lex {
                LexErrorKind::MalformedNumber(_) => "MalformedNumber",
                LexErrorKind::NumberOutOfRange(_) => "NumberOutOfRange",
                LexErrorKind::UnknownDirective(_) => "UnknownDirective",
                LexErrorKind::UnexpectedCharacter(_) => "UnexpectedCharacter",
            },
            Self::Parse(ParseErrorKind::Resolve(ResolveError::InvalidOperand { .. })) => {
                "InvalidOperand"
            }
            Self::Parse(ParseErrorKind::Resolve(ResolveError::UnsupportedMode { .. })) => {
                "UnsupportedMode"
            }
            Self::Parse(ParseErrorKind::UnknownMnemonic(_)) => "UnknownMnemonic",
            Self::Parse(ParseErrorKind::Syntax { .. }) => "Syntax",
            Self::Parse(ParseErrorKind::ImplicitLabel { .. }) => "ImplicitLabel",
            Self::Parse(ParseErrorKind::ValueOutOfRange { .. })
            | Self::Encode(EncodeError::ValueOutOfRange { .. }) => "ValueOutOfRange",
            Self::Symbol(SymbolErrorKind::DuplicateSymbol { .. }) => "DuplicateSymbol",
            Self::Symbol(SymbolErrorKind::AddressOverflow { .. })
            | Self::Emission(EmissionError::OutOfRange { .. }) => "AddressOverflow",
            Self::Symbol(SymbolErrorKind::OriginBackwards { .. }) => "OriginBackwards",
            Self::Symbol(SymbolErrorKind::LabelOutOfRange { .. }) => "LabelOutOfRange",
            Self::Encode(EncodeError::UndefinedSymbol(_)) => "UndefinedSymbol",
            Self::Encode(EncodeError::BranchOutOfRange { .. }) => "BranchOutOfRange",
            Self::Emission(EmissionError::AddressCollision { .. }) => "AddressCollision",
        }
    }
}

/// A diagnostic record with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// What happened.
    pub kind: DiagnosticKind,
    /// 1-indexed source line.
    pub line: usize,
    /// 1-indexed source column.
    pub column: usize,
}

impl Diagnostic {
    /// Creates a diagnostic at a source position.
    #[must_use]
    pub const fn new(kind: DiagnosticKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }

    /// Severity of the record.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Formats as `unit:line:col: severity: message`.
    #[must_use]
    pub fn format_for_stderr(&self, unit: &str) -> String {
        format!(
            "{unit}:{}:{}: {}: {}",
            self.line,
            self.column,
            self.severity(),
            self.kind
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.line,
            self.column,
            self.severity(),
            self.kind
        )
    }
}

impl std::error::Error for Diagnostic {}

impl From<ParseError> for Diagnostic {
    fn from(e: ParseError) -> Self {
        Self::new(DiagnosticKind::Parse(e.kind), e.line, e.column)
    }
}

impl From<SymbolError> for Diagnostic {
    fn from(e: SymbolError) -> Self {
        Self::new(DiagnosticKind::Symbol(e.kind), e.line, e.column)
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Adds a record.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.records.push(diagnostic);
    }

    /// Returns true if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records in their current order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    /// Number of error-severity records.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.iter()
            .filter(|d| d.severity() == Severity::Error)
            .count()
    }

    /// Number of warning-severity records.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.len() - self.error_count()
    }

    /// Returns true if any record is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Returns the first record, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Diagnostic> {
        self.records.first()
    }

    /// Orders records by source line, keeping insertion order within a line.
    pub fn sort_by_line(&mut self) {
        self.records.sort_by_key(|d| d.line);
    }

    /// Formats every record for stderr, one per line.
    #[must_use]
    pub fn format_for_stderr(&self, unit: &str) -> String {
        self.records
            .iter()
            .map(|d| d.format_for_stderr(unit))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.records.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.records.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use mos6502_isa::Mnemonic;

    use super::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
    use crate::emission::EmissionError;
    use crate::encoder::EncodeError;
    use crate::parser::ParseErrorKind;
    use crate::symbols::SymbolErrorKind;

    fn undefined(line: usize) -> Diagnostic {
        Diagnostic::new(
            DiagnosticKind::Encode(EncodeError::UndefinedSymbol(format!("l{line}"))),
            line,
            5,
        )
    }

    #[test]
    fn formats_with_unit_name() {
        let d = undefined(10);
        assert_eq!(
            d.format_for_stderr("prog.asm"),
            "prog.asm:10:5: error: undefined symbol 'l10'"
        );
        assert_eq!(d.to_string(), "10:5: error: undefined symbol 'l10'");
    }

    #[test]
    fn sorts_stably_by_line() {
        let collision = Diagnostic::new(
            DiagnosticKind::Emission(EmissionError::AddressCollision { address: 0x0400 }),
            3,
            1,
        );
        let mut diagnostics: Diagnostics =
            vec![undefined(7), undefined(3), collision.clone(), undefined(1)]
                .into_iter()
                .collect();
        diagnostics.sort_by_line();
        let lines: Vec<usize> = diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 3, 3, 7]);
        assert_eq!(diagnostics.iter().nth(2), Some(&collision));
    }

    #[test]
    fn severity_and_counts() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        diagnostics.push(undefined(1));
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::Symbol(SymbolErrorKind::OriginBackwards {
                current: 0x10,
                requested: 0,
            }),
            2,
            1,
        ));
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.warning_count(), 1);
        assert!(diagnostics.has_errors());
        assert_eq!(
            diagnostics.iter().nth(1).map(Diagnostic::severity),
            Some(Severity::Warning)
        );
    }

    #[test]
    fn codes_name_the_taxonomy() {
        let overflow = DiagnosticKind::Symbol(SymbolErrorKind::AddressOverflow { address: 0x10002 });
        assert_eq!(overflow.code(), "AddressOverflow");
        assert!(overflow.is_fatal());
        let unknown = DiagnosticKind::Parse(ParseErrorKind::UnknownMnemonic("XYZ".into()));
        assert_eq!(unknown.code(), "UnknownMnemonic");
        assert!(!unknown.is_fatal());
        let implicit = DiagnosticKind::Parse(ParseErrorKind::ImplicitLabel {
            name: "INXX".into(),
            similar: Mnemonic::Inx,
        });
        assert_eq!(implicit.severity(), Severity::Warning);
        let past_top =
            DiagnosticKind::Symbol(SymbolErrorKind::LabelOutOfRange { name: "end".into() });
        assert_eq!(past_top.code(), "LabelOutOfRange");
        assert_eq!(past_top.severity(), Severity::Error);
        assert!(!past_top.is_fatal());
    }
}
