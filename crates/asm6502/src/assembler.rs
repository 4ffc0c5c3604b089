//! Top-level assembler pipeline.
//!
//! An [`AssemblyUnit`] owns everything produced for one source text and
//! walks it through two passes:
//!
//! 1. **Pass 1** (`CollectingSymbols`): address assignment and label binding
//! 2. **Pass 2** (`EmittingCode`): encoding into the emission buffer
//!
//! The unit finishes in `Done` when the statements are exhausted, even if
//! non-fatal diagnostics were recorded, and in `Failed` after a fatal error.

use tracing::{debug, info, warn};

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::emission::EmissionBuffer;
use crate::encoder::encode_statement;
use crate::lexer::Lexer;
use crate::parser::{parse_program, ParsedStatement, Statement};
use crate::symbols::{assign_addresses, AddressedStatement, SymbolTable};

/// Assembly settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssemblerConfig {
    /// Initial location counter.
    pub origin: u16,
    /// Byte used for gaps when flattening the output to an image.
    pub fill_byte: u8,
}

/// Lifecycle of an [`AssemblyUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    /// Pass 1 is pending or running.
    CollectingSymbols,
    /// Pass 2 is running.
    EmittingCode,
    /// All statements processed.
    Done,
    /// A fatal error stopped assembly.
    Failed,
}

/// A listing row: one per statement that produced bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Address of the first byte.
    pub address: u16,
    /// Emitted bytes.
    pub bytes: Vec<u8>,
    /// 1-indexed source line.
    pub line: usize,
    /// Source text of the line, without trailing whitespace.
    pub source: String,
}

impl std::fmt::Display for ListingEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hex: Vec<String> = self.bytes.iter().map(|b| format!("{b:02X}")).collect();
        let hex = if hex.len() > 3 {
            format!("{} ..", hex[..3].join(" "))
        } else {
            hex.join(" ")
        };
        write!(f, "{:04X}  {hex:<11} {:>5}  {}", self.address, self.line, self.source)
    }
}

/// Everything an assembly run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOutput {
    /// State of the unit when the output was taken; `Done` or `Failed`
    /// after [`AssemblyUnit::run`].
    pub state: AssemblyState,
    /// Emitted bytes. Partial when diagnostics contain errors.
    pub emission: EmissionBuffer,
    /// Labels bound during pass 1.
    pub symbols: SymbolTable,
    /// Errors and warnings ordered by source line.
    pub diagnostics: Diagnostics,
    /// Listing rows in emission order.
    pub listing: Vec<ListingEntry>,
    /// Gap byte for [`AssemblyOutput::image`].
    pub fill_byte: u8,
}

impl AssemblyOutput {
    /// Returns true when assembly finished without errors. Warnings are
    /// allowed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == AssemblyState::Done && !self.diagnostics.has_errors()
    }

    /// Flat image from the lowest to the highest emitted address.
    #[must_use]
    pub fn image(&self) -> Option<(u16, Vec<u8>)> {
        self.emission.to_image(self.fill_byte)
    }
}

/// One source text being assembled.
///
/// Callers either [`run`](Self::run) to completion or drive the passes with
/// [`step`](Self::step) and inspect the unit between them.
#[derive(Debug)]
pub struct AssemblyUnit<'s> {
    source: &'s str,
    config: AssemblerConfig,
    state: AssemblyState,
    statements: Vec<AddressedStatement>,
    symbols: SymbolTable,
    emission: EmissionBuffer,
    listing: Vec<ListingEntry>,
    diagnostics: Diagnostics,
}

impl<'s> AssemblyUnit<'s> {
    /// Creates a unit with the default configuration.
    #[must_use]
    pub fn new(source: &'s str) -> Self {
        Self::with_config(source, AssemblerConfig::default())
    }

    /// Creates a unit with an explicit configuration.
    #[must_use]
    pub const fn with_config(source: &'s str, config: AssemblerConfig) -> Self {
        Self {
            source,
            config,
            state: AssemblyState::CollectingSymbols,
            statements: Vec::new(),
            symbols: SymbolTable::new(),
            emission: EmissionBuffer::new(),
            listing: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AssemblyState {
        self.state
    }

    /// Returns true once the unit is `Done` or `Failed`.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.state, AssemblyState::Done | AssemblyState::Failed)
    }

    /// Labels bound so far. Complete once pass 1 has run.
    #[must_use]
    pub const fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Bytes emitted so far.
    #[must_use]
    pub const fn emission(&self) -> &EmissionBuffer {
        &self.emission
    }

    /// Diagnostics recorded so far, in the order they were found.
    #[must_use]
    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn transition(&mut self, next: AssemblyState) {
        debug!(from = ?self.state, to = ?next, "assembly state change");
        self.state = next;
    }

    /// Runs the pass for the current state and returns the new state.
    /// Does nothing once the unit is finished.
    pub fn step(&mut self) -> AssemblyState {
        match self.state {
            AssemblyState::CollectingSymbols => self.collect_symbols(),
            AssemblyState::EmittingCode => self.emit_code(),
            AssemblyState::Done | AssemblyState::Failed => {}
        }
        self.state
    }

    fn collect_symbols(&mut self) {
        let program = parse_program(Lexer::new(self.source));
        debug!(
            statements = program.statements.len(),
            errors = program.errors.len(),
            warnings = program.warnings.len(),
            "parsed source"
        );
        self.diagnostics
            .extend(program.errors.into_iter().map(Diagnostic::from));
        self.diagnostics
            .extend(program.warnings.into_iter().map(Diagnostic::from));

        let assignment = assign_addresses(&program.statements, self.config.origin);
        let fatal = assignment.is_fatal();
        self.diagnostics
            .extend(assignment.errors.into_iter().map(Diagnostic::from));
        debug!(
            symbols = assignment.symbols.len(),
            end = assignment.end_address,
            "pass 1 complete"
        );
        self.statements = assignment.statements;
        self.symbols = assignment.symbols;

        if fatal {
            self.transition(AssemblyState::Failed);
        } else {
            self.transition(AssemblyState::EmittingCode);
        }
    }

    fn emit_code(&mut self) {
        let lines: Vec<&str> = self.source.lines().collect();
        for addressed in &self.statements {
            emit_statement(
                addressed,
                &self.symbols,
                &lines,
                &mut self.emission,
                &mut self.listing,
                &mut self.diagnostics,
            );
        }
        self.transition(AssemblyState::Done);
    }

    /// Runs the remaining passes and returns the output.
    #[must_use]
    pub fn run(mut self) -> AssemblyOutput {
        while !self.is_finished() {
            self.step();
        }
        self.into_output()
    }

    /// Consumes the unit in its current state. Diagnostics are ordered by
    /// source line.
    #[must_use]
    pub fn into_output(mut self) -> AssemblyOutput {
        self.diagnostics.sort_by_line();
        info!(
            state = ?self.state,
            bytes = self.emission.len(),
            errors = self.diagnostics.error_count(),
            warnings = self.diagnostics.warning_count(),
            "assembly finished"
        );

        AssemblyOutput {
            state: self.state,
            emission: self.emission,
            symbols: self.symbols,
            diagnostics: self.diagnostics,
            listing: self.listing,
            fill_byte: self.config.fill_byte,
        }
    }
}

fn emit_statement(
    addressed: &AddressedStatement,
    symbols: &SymbolTable,
    lines: &[&str],
    emission: &mut EmissionBuffer,
    listing: &mut Vec<ListingEntry>,
    diagnostics: &mut Diagnostics,
) {
    let ParsedStatement {
        statement,
        line,
        column,
    } = &addressed.parsed;
    if matches!(
        statement,
        Statement::Label(_) | Statement::Origin(_) | Statement::Reserved { .. }
    ) {
        return;
    }

    let bytes = match encode_statement(statement, symbols, addressed.address) {
        Ok(bytes) => bytes,
        Err(e) => {
            diagnostics.push(Diagnostic::new(DiagnosticKind::Encode(e), *line, *column));
            return;
        }
    };
    if bytes.is_empty() {
        return;
    }

    if let Err(e) = emission.emit(addressed.address, &bytes) {
        warn!(address = addressed.address, line = *line, "emission rejected: {e}");
        diagnostics.push(Diagnostic::new(DiagnosticKind::Emission(e), *line, *column));
        return;
    }

    listing.push(ListingEntry {
        address: addressed.address,
        bytes,
        line: *line,
        source: lines
            .get(line.saturating_sub(1))
            .map_or_else(String::new, |text| text.trim_end().to_string()),
    });
}

/// Assembles `source` with the default configuration.
#[must_use]
pub fn assemble(source: &str) -> AssemblyOutput {
    assemble_with_config(source, AssemblerConfig::default())
}

/// Assembles `source` with `config`.
#[must_use]
#[tracing::instrument(skip(source))]
pub fn assemble_with_config(source: &str, config: AssemblerConfig) -> AssemblyOutput {
    AssemblyUnit::with_config(source, config).run()
}
