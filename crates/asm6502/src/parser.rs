//! Statement parser.
//!
//! Groups each line's tokens into statements: label definitions, origin
//! changes, data directives and instructions. Instruction operands are
//! resolved to a concrete addressing mode here, since the instruction length
//! must be known before the first pass.
//!
//! # Syntax
//!
//! ```text
//! [label[:]] MNEMONIC [operand] [; comment]
//! * = $0400
//! !byte $01, 2, %11
//! !word $1234, label
//! !fill 16, $EA
//! ```

use mos6502_isa::{Mnemonic, ALL_MNEMONICS};
use thiserror::Error;

use crate::addressing::{
    placeholder_size, resolve, IndexRegister, OperandSyntax, OperandValue, ResolveError,
    ResolvedInstruction,
};
use crate::lexer::{Directive, LexError, LexErrorKind, Lexer, Register, Token, TokenKind};

/// A parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Label definition bound to the current address.
    Label(String),
    /// `* = addr`
    Origin(u16),
    /// `!byte` values.
    Bytes(Vec<u8>),
    /// `!word` values, emitted little-endian.
    Words(Vec<OperandValue>),
    /// `!fill count, value`
    Fill {
        /// Number of bytes.
        count: u16,
        /// Byte to repeat.
        value: u8,
    },
    /// Machine instruction.
    Instruction(ResolvedInstruction),
    /// Space held for an instruction whose operand failed to resolve, so
    /// later labels keep their addresses. Emits nothing.
    Reserved {
        /// Bytes held.
        size: u16,
    },
}

impl Statement {
    /// Number of bytes this statement emits.
    #[must_use]
    pub fn size(&self) -> u32 {
        match self {
            Self::Label(_) | Self::Origin(_) => 0,
            Self::Bytes(bytes) => u32::try_from(bytes.len()).unwrap_or(u32::MAX),
            Self::Words(words) => u32::try_from(words.len() * 2).unwrap_or(u32::MAX),
            Self::Fill { count, .. } => u32::from(*count),
            Self::Instruction(instruction) => u32::from(instruction.size()),
            Self::Reserved { size } => u32::from(*size),
        }
    }
}

/// A statement with the position of its first token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    /// The statement.
    pub statement: Statement,
    /// 1-indexed source line.
    pub line: usize,
    /// 1-indexed source column.
    pub column: usize,
}

/// Parse error classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Lexical error on the line.
    #[error(transparent)]
    Lex(#[from] LexErrorKind),
    /// Operand resolution failure.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Identifier in mnemonic position that names no instruction.
    #[error("unknown mnemonic '{0}'")]
    UnknownMnemonic(String),
    /// Token that does not fit the statement grammar.
    #[error("unexpected '{found}', expected {expected}")]
    Syntax {
        /// Text of the offending token, empty at end of line.
        found: String,
        /// What the grammar expected instead.
        expected: &'static str,
    },
    /// Data value too large for its slot.
    #[error("value ${value:04X} exceeds maximum ${max:02X}")]
    ValueOutOfRange {
        /// Value as written.
        value: u16,
        /// Largest allowed value.
        max: u16,
    },
    /// Colon-less label alone on its line whose name is one edit away from
    /// a mnemonic. Reported as a warning.
    #[error("label '{name}' has no ':' and resembles mnemonic {similar}")]
    ImplicitLabel {
        /// The label name.
        name: String,
        /// The mnemonic it resembles.
        similar: Mnemonic,
    },
}

impl ParseErrorKind {
    /// Warnings keep the statement; everything else drops it.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self, Self::ImplicitLabel { .. })
    }
}

/// A parse error tagged with its source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column.
    pub column: usize,
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        Self {
            kind: ParseErrorKind::Lex(e.kind),
            line: e.line,
            column: e.column,
        }
    }
}

/// Statements and errors collected from a whole source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedProgram {
    /// Statements in source order.
    pub statements: Vec<ParsedStatement>,
    /// Errors in source order.
    pub errors: Vec<ParseError>,
    /// Warnings in source order.
    pub warnings: Vec<ParseError>,
}

/// Parses every line produced by `lexer`.
///
/// Lines with a lexical error are skipped entirely. Label definitions that
/// precede a malformed statement on the same line are kept.
///
/// An instruction whose operand fails to resolve is replaced by
/// [`Statement::Reserved`] when its length can still be inferred, so the
/// layout matches what a corrected source would produce. Unknown mnemonics
/// and malformed directives hold no space.
#[must_use]
pub fn parse_program(lexer: Lexer<'_>) -> ParsedProgram {
    let mut program = ParsedProgram::default();
    let mut line_tokens: Vec<Token> = Vec::new();
    let mut line_failed = false;

    for item in lexer {
        match item {
            Err(e) => {
                program.errors.push(e.into());
                line_failed = true;
            }
            Ok(token) if token.kind == TokenKind::EndOfLine => {
                if !line_failed {
                    let mut parser = LineParser::new(&line_tokens);
                    if let Err(e) = parser.parse() {
                        program.errors.push(e);
                    }
                    program.statements.extend(parser.statements);
                    program.warnings.extend(parser.warnings);
                }
                line_tokens.clear();
                line_failed = false;
            }
            Ok(token) => line_tokens.push(token),
        }
    }

    program
}

/// Parses a single source line. Convenience for tests and tools.
///
/// # Errors
///
/// Returns the first lexical or syntax error on the line.
pub fn parse_line(text: &str) -> Result<Vec<ParsedStatement>, ParseError> {
    let mut program = parse_program(Lexer::new(text));
    if program.errors.is_empty() {
        Ok(program.statements)
    } else {
        Err(program.errors.remove(0))
    }
}

struct LineParser<'t> {
    tokens: &'t [Token],
    pos: usize,
    statements: Vec<ParsedStatement>,
    warnings: Vec<ParseError>,
}

impl<'t> LineParser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        let end = tokens
            .iter()
            .position(|t| matches!(t.kind, TokenKind::Comment(_)))
            .unwrap_or(tokens.len());
        Self {
            tokens: &tokens[..end],
            pos: 0,
            statements: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn push(&mut self, statement: Statement, at: &Token) {
        self.statements.push(ParsedStatement {
            statement,
            line: at.line,
            column: at.column,
        });
    }

    fn error_at(kind: ParseErrorKind, at: &Token) -> ParseError {
        ParseError {
            kind,
            line: at.line,
            column: at.column,
        }
    }

    fn end_position(&self) -> (usize, usize) {
        self.tokens
            .last()
            .map_or((0, 1), |t| (t.line, t.column + t.text.chars().count()))
    }

    fn syntax_error(&self, expected: &'static str) -> ParseError {
        match self.peek() {
            Some(token) => Self::error_at(
                ParseErrorKind::Syntax {
                    found: token.text.clone(),
                    expected,
                },
                token,
            ),
            None => {
                let (line, column) = self.end_position();
                ParseError {
                    kind: ParseErrorKind::Syntax {
                        found: String::new(),
                        expected,
                    },
                    line,
                    column,
                }
            }
        }
    }

    fn parse(&mut self) -> Result<(), ParseError> {
        while let Some(token) = self.peek() {
            let TokenKind::LabelDef { name, explicit } = &token.kind else {
                break;
            };
            if !explicit {
                let next = self.tokens.get(self.pos + 1).map(|t| &t.kind);
                let starts_statement = matches!(
                    next,
                    None | Some(TokenKind::Mnemonic(_) | TokenKind::Directive(_))
                );
                // Only the first token of a line may be a colon-less label.
                if self.pos > 0 || !starts_statement {
                    return Err(Self::error_at(
                        ParseErrorKind::UnknownMnemonic(name.clone()),
                        token,
                    ));
                }
                if next.is_none() {
                    if let Some(similar) = resembled_mnemonic(name) {
                        self.warnings.push(Self::error_at(
                            ParseErrorKind::ImplicitLabel {
                                name: name.clone(),
                                similar,
                            },
                            token,
                        ));
                    }
                }
            }
            self.push(Statement::Label(name.clone()), token);
            self.pos += 1;
        }

        let Some(head) = self.advance() else {
            return Ok(());
        };

        let statement = match &head.kind {
            TokenKind::Mnemonic(mnemonic) => self.instruction(*mnemonic, head)?,
            TokenKind::Directive(Directive::Origin) => self.origin()?,
            TokenKind::Directive(Directive::Byte) => self.bytes()?,
            TokenKind::Directive(Directive::Word) => self.words()?,
            TokenKind::Directive(Directive::Fill) => self.fill()?,
            _ => {
                self.pos -= 1;
                return Err(self.syntax_error("mnemonic or directive"));
            }
        };

        if self.peek().is_some() {
            return Err(self.syntax_error("end of line"));
        }

        self.push(statement, head);
        Ok(())
    }

    fn instruction(&mut self, mnemonic: Mnemonic, head: &Token) -> Result<Statement, ParseError> {
        let tokens = self.tokens;
        let operand_tokens = &tokens[self.pos..];
        self.pos = tokens.len();
        let at = operand_tokens.first().unwrap_or(head);

        let syntax = operand_syntax(operand_tokens);
        let reserved = placeholder_size(mnemonic, syntax.as_ref());
        let result = match syntax {
            Some(syntax) => resolve(mnemonic, syntax),
            None => {
                let text: String = operand_tokens.iter().map(|t| t.text.as_str()).collect();
                Err(ResolveError::InvalidOperand {
                    mnemonic,
                    reason: format!("cannot parse '{text}'"),
                })
            }
        };

        match result {
            Ok(resolved) => Ok(Statement::Instruction(resolved)),
            Err(e) => {
                if let Some(size) = reserved {
                    self.push(Statement::Reserved { size }, head);
                }
                Err(Self::error_at(e.into(), at))
            }
        }
    }

    fn origin(&mut self) -> Result<Statement, ParseError> {
        if !matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Equals)) {
            return Err(self.syntax_error("'='"));
        }
        self.pos += 1;
        let address = self.number("origin address")?;
        Ok(Statement::Origin(address))
    }

    fn number(&mut self, expected: &'static str) -> Result<u16, ParseError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Number(n)) => {
                self.pos += 1;
                Ok(n.value)
            }
            _ => Err(self.syntax_error(expected)),
        }
    }

    fn byte_value(&mut self, expected: &'static str) -> Result<u8, ParseError> {
        let Some(at) = self.peek() else {
            return Err(self.syntax_error(expected));
        };
        let value = self.number(expected)?;
        u8::try_from(value)
            .map_err(|_| Self::error_at(ParseErrorKind::ValueOutOfRange { value, max: 0xFF }, at))
    }

    fn separator(&mut self) -> bool {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn bytes(&mut self) -> Result<Statement, ParseError> {
        let mut values = vec![self.byte_value("byte value")?];
        while self.separator() {
            values.push(self.byte_value("byte value")?);
        }
        Ok(Statement::Bytes(values))
    }

    fn words(&mut self) -> Result<Statement, ParseError> {
        let mut values = Vec::new();
        loop {
            let value = self.peek().and_then(|t| operand_value(&t.kind));
            let Some(value) = value else {
                return Err(self.syntax_error("word value or label"));
            };
            self.pos += 1;
            values.push(value);
            if !self.separator() {
                break;
            }
        }
        Ok(Statement::Words(values))
    }

    fn fill(&mut self) -> Result<Statement, ParseError> {
        let count = self.number("fill count")?;
        let value = if self.separator() {
            self.byte_value("fill value")?
        } else {
            0
        };
        Ok(Statement::Fill { count, value })
    }
}

/// Mnemonic one insertion, deletion or substitution away from `name`.
fn resembled_mnemonic(name: &str) -> Option<Mnemonic> {
    let upper = name.to_ascii_uppercase();
    ALL_MNEMONICS
        .into_iter()
        .find(|m| one_edit_apart(upper.as_bytes(), m.as_str().as_bytes()))
}

fn one_edit_apart(a: &[u8], b: &[u8]) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    match long.len() - short.len() {
        0 => short.iter().zip(long).filter(|(x, y)| x != y).count() == 1,
        1 => (0..long.len())
            .any(|skip| long[..skip] == short[..skip] && long[skip + 1..] == short[skip..]),
        _ => false,
    }
}

fn operand_value(kind: &TokenKind) -> Option<OperandValue> {
    match kind {
        TokenKind::Number(n) => Some(OperandValue::Number(*n)),
        TokenKind::LabelRef(name) => Some(OperandValue::Symbol(name.clone())),
        _ => None,
    }
}

fn operand_syntax(tokens: &[Token]) -> Option<OperandSyntax> {
    use TokenKind::{CloseParen, Comma, Hash, OpenParen, Register as Reg};

    let kinds: Vec<&TokenKind> = tokens.iter().map(|t| &t.kind).collect();
    match kinds.as_slice() {
        [] => Some(OperandSyntax::None),
        [Reg(Register::A)] => Some(OperandSyntax::Accumulator),
        [Hash, v] => operand_value(v).map(OperandSyntax::Immediate),
        [v] => operand_value(v).map(|value| OperandSyntax::Direct { value, index: None }),
        [v, Comma, Reg(r)] => {
            let index = match r {
                Register::X => IndexRegister::X,
                Register::Y => IndexRegister::Y,
                Register::A => return None,
            };
            operand_value(v).map(|value| OperandSyntax::Direct {
                value,
                index: Some(index),
            })
        }
        [OpenParen, v, CloseParen] => operand_value(v).map(OperandSyntax::Indirect),
        [OpenParen, v, Comma, Reg(Register::X), CloseParen] => {
            operand_value(v).map(OperandSyntax::IndexedIndirect)
        }
        [OpenParen, v, CloseParen, Comma, Reg(Register::Y)] => {
            operand_value(v).map(OperandSyntax::IndirectIndexed)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use mos6502_isa::{AddressingMode, Mnemonic};

    use super::{parse_line, parse_program, ParseErrorKind, Statement};
    use crate::addressing::{OperandValue, ResolveError};
    use crate::lexer::{LexErrorKind, Lexer, Number, Width};

    fn single(text: &str) -> Statement {
        let mut statements = parse_line(text).unwrap();
        assert_eq!(statements.len(), 1, "{statements:?}");
        statements.remove(0).statement
    }

    fn error_kind(text: &str) -> ParseErrorKind {
        parse_line(text).unwrap_err().kind
    }

    #[test]
    fn parses_absolute_instruction() {
        let Statement::Instruction(instruction) = single("LDA $0420") else {
            panic!("expected instruction");
        };
        assert_eq!(instruction.entry.mnemonic, Mnemonic::Lda);
        assert_eq!(instruction.operand.mode, AddressingMode::Absolute);
        assert_eq!(
            instruction.operand.value,
            Some(OperandValue::Number(Number {
                value: 0x0420,
                width: Width::Word
            }))
        );
    }

    #[test]
    fn parses_every_operand_shape() {
        let cases = [
            ("ASL", AddressingMode::Accumulator),
            ("ASL A", AddressingMode::Accumulator),
            ("LDA #$01", AddressingMode::Immediate),
            ("LDA $20", AddressingMode::ZeroPage),
            ("LDA $20,X", AddressingMode::ZeroPageX),
            ("LDX $20,Y", AddressingMode::ZeroPageY),
            ("LDA $2000,X", AddressingMode::AbsoluteX),
            ("LDA $2000,y", AddressingMode::AbsoluteY),
            ("JMP ($FFFC)", AddressingMode::Indirect),
            ("LDA ($20,X)", AddressingMode::IndirectX),
            ("LDA ($20),Y", AddressingMode::IndirectY),
            ("BEQ $0600", AddressingMode::Relative),
        ];
        for (text, mode) in cases {
            let Statement::Instruction(instruction) = single(text) else {
                panic!("{text}: expected instruction");
            };
            assert_eq!(instruction.operand.mode, mode, "{text}");
        }
    }

    #[test]
    fn labels_before_statements() {
        let statements = parse_line("start: spin: NOP ; spin").unwrap();
        let kinds: Vec<_> = statements.into_iter().map(|s| s.statement).collect();
        assert!(matches!(&kinds[0], Statement::Label(n) if n == "start"));
        assert!(matches!(&kinds[1], Statement::Label(n) if n == "spin"));
        assert!(matches!(&kinds[2], Statement::Instruction(_)));

        let statements = parse_line("loop NOP").unwrap();
        assert!(matches!(&statements[0].statement, Statement::Label(n) if n == "loop"));
    }

    #[test]
    fn colon_less_label_only_first_on_line() {
        assert_eq!(
            error_kind("lop: INXX"),
            ParseErrorKind::UnknownMnemonic("INXX".to_string())
        );
        assert_eq!(
            error_kind("start: loop NOP"),
            ParseErrorKind::UnknownMnemonic("loop".to_string())
        );
        let program = parse_program(Lexer::new("lop: INXX\nNOP\n"));
        assert_eq!(program.errors.len(), 1);
        assert!(matches!(&program.statements[0].statement, Statement::Label(n) if n == "lop"));
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn lone_label_resembling_mnemonic_warns() {
        let program = parse_program(Lexer::new("INXX\nloop\nen\n"));
        assert!(program.errors.is_empty());
        assert_eq!(program.statements.len(), 3);
        assert_eq!(program.warnings.len(), 1);
        assert_eq!(program.warnings[0].line, 1);
        assert_eq!(
            program.warnings[0].kind,
            ParseErrorKind::ImplicitLabel {
                name: "INXX".to_string(),
                similar: Mnemonic::Inx
            }
        );
        assert!(program.warnings[0].kind.is_warning());
        assert_eq!(
            program.warnings[0].kind.to_string(),
            "label 'INXX' has no ':' and resembles mnemonic INX"
        );
    }

    #[test]
    fn unresolved_instruction_reserves_its_length() {
        let program = parse_program(Lexer::new("STA #$01\nLDX ($10),Y\nLDA ($20\nNOP\n"));
        assert_eq!(program.errors.len(), 3);
        let sizes: Vec<_> = program
            .statements
            .iter()
            .map(|s| (s.line, s.statement.size()))
            .collect();
        // the unparseable LDA operand leaves no length to infer
        assert_eq!(sizes, vec![(1, 2), (2, 2), (4, 1)]);
        assert_eq!(program.statements[0].statement, Statement::Reserved { size: 2 });
    }

    #[test]
    fn directives() {
        assert_eq!(single("* = $0400"), Statement::Origin(0x0400));
        assert_eq!(single("!byte $01, 2, %11"), Statement::Bytes(vec![1, 2, 3]));
        assert_eq!(
            single("!word $1234, table"),
            Statement::Words(vec![
                OperandValue::Number(Number {
                    value: 0x1234,
                    width: Width::Word
                }),
                OperandValue::Symbol("table".to_string()),
            ])
        );
        assert_eq!(
            single("!fill 4, $EA"),
            Statement::Fill {
                count: 4,
                value: 0xEA
            }
        );
        assert_eq!(single("!fill 2"), Statement::Fill { count: 2, value: 0 });
    }

    #[test]
    fn statement_sizes() {
        assert_eq!(single("LDA $0420").size(), 3);
        assert_eq!(single("LDA $20").size(), 2);
        assert_eq!(single("!byte 1,2,3").size(), 3);
        assert_eq!(single("!word 1,2").size(), 4);
        assert_eq!(single("!fill 10").size(), 10);
        assert_eq!(single("* = $10").size(), 0);
    }

    #[test]
    fn unknown_mnemonic() {
        assert_eq!(
            error_kind("LDAA $10"),
            ParseErrorKind::UnknownMnemonic("LDAA".to_string())
        );
        assert_eq!(
            error_kind("FOO BAR"),
            ParseErrorKind::UnknownMnemonic("FOO".to_string())
        );
    }

    #[test]
    fn malformed_operand_is_invalid_operand() {
        assert!(matches!(
            error_kind("LDA ($20"),
            ParseErrorKind::Resolve(ResolveError::InvalidOperand { .. })
        ));
        assert!(matches!(
            error_kind("LDA $20,A"),
            ParseErrorKind::Resolve(ResolveError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn unsupported_mode_is_reported() {
        assert_eq!(
            error_kind("STA #$01"),
            ParseErrorKind::Resolve(ResolveError::UnsupportedMode {
                mnemonic: Mnemonic::Sta,
                mode: AddressingMode::Immediate
            })
        );
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(
            error_kind("* $0400"),
            ParseErrorKind::Syntax { expected: "'='", .. }
        ));
        assert!(matches!(
            error_kind("!byte"),
            ParseErrorKind::Syntax { expected: "byte value", .. }
        ));
        assert!(matches!(
            error_kind("!byte label"),
            ParseErrorKind::Syntax { .. }
        ));
        assert!(matches!(
            error_kind("* = $10 $20"),
            ParseErrorKind::Syntax { expected: "end of line", .. }
        ));
    }

    #[test]
    fn byte_values_must_fit() {
        assert_eq!(
            error_kind("!byte $01, $123"),
            ParseErrorKind::ValueOutOfRange {
                value: 0x123,
                max: 0xFF
            }
        );
    }

    #[test]
    fn program_recovers_after_errors() {
        let program = parse_program(Lexer::new("LDA @\nbad: XYZ $10\nNOP\n"));
        assert_eq!(program.errors.len(), 2);
        assert!(matches!(
            program.errors[0].kind,
            ParseErrorKind::Lex(LexErrorKind::UnexpectedCharacter('@'))
        ));
        assert_eq!(program.errors[1].line, 2);
        // label on the bad line survives, followed by NOP
        assert_eq!(program.statements.len(), 2);
        assert_eq!(program.statements[1].line, 3);
    }
}
