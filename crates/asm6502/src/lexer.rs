//! Line-oriented tokenizer for 6502 assembly source.
//!
//! The lexer is lazy: it tokenizes one source line at a time as the caller
//! pulls tokens. Every line, including a final line without a trailing
//! newline, ends with an [`TokenKind::EndOfLine`] token. A lexical error
//! abandons the rest of its line; scanning resumes on the next line.

use std::collections::VecDeque;
use std::fmt;
use std::iter::Enumerate;
use std::str::Lines;

use mos6502_isa::Mnemonic;
use thiserror::Error;

/// Syntactic width of a numeric literal, derived from how it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// At most two hex digits, eight binary digits, or a decimal value up to 255.
    Byte,
    /// Anything wider.
    Word,
}

/// A numeric literal with its value and syntactic width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Number {
    /// Parsed value.
    pub value: u16,
    /// Width implied by the literal's spelling.
    pub width: Width,
}

impl Number {
    /// Creates a number whose width is taken from its value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        let width = if value <= 0xFF {
            Width::Byte
        } else {
            Width::Word
        };
        Self { value, width }
    }
}

/// Index and accumulator register names usable in operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Register {
    A,
    X,
    Y,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::A => "A",
            Self::X => "X",
            Self::Y => "Y",
        };
        f.write_str(name)
    }
}

/// Assembler directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// `* = addr`
    Origin,
    /// `!byte`, `!by`, `!8`
    Byte,
    /// `!word`, `!wo`, `!16`
    Word,
    /// `!fill`, `!fi`
    Fill,
}

impl Directive {
    fn from_bang_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "byte" | "by" | "8" => Some(Self::Byte),
            "word" | "wo" | "16" => Some(Self::Word),
            "fill" | "fi" => Some(Self::Fill),
            _ => None,
        }
    }
}

/// Token classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Instruction mnemonic at statement position.
    Mnemonic(Mnemonic),
    /// `A`, `X` or `Y` in operand position.
    Register(Register),
    /// Numeric literal.
    Number(Number),
    /// Directive marker.
    Directive(Directive),
    /// Label definition at statement position.
    LabelDef {
        /// Label name without the colon.
        name: String,
        /// Whether the definition was written with a trailing colon.
        explicit: bool,
    },
    /// Label reference in operand position.
    LabelRef(String),
    /// `#`
    Hash,
    /// `,`
    Comma,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `=`
    Equals,
    /// Comment text after `;`, trimmed.
    Comment(String),
    /// End of a source line.
    EndOfLine,
}

/// A token with its literal text and 1-indexed position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Classification.
    pub kind: TokenKind,
    /// Literal source text.
    pub text: String,
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column.
    pub column: usize,
}

/// Lexical error classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    /// Numeric literal with no digits or with stray characters.
    #[error("malformed numeric literal '{0}'")]
    MalformedNumber(String),
    /// Numeric literal above `$FFFF`.
    #[error("numeric literal '{0}' exceeds $FFFF")]
    NumberOutOfRange(String),
    /// `!name` that is not a known directive.
    #[error("unknown directive '!{0}'")]
    UnknownDirective(String),
    /// Character that cannot start any token.
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
}

/// A lexical error tagged with its source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct LexError {
    /// What went wrong.
    pub kind: LexErrorKind,
    /// 1-indexed line.
    pub line: usize,
    /// 1-indexed column.
    pub column: usize,
}

/// Item type produced by [`Lexer`].
pub type LexResult = Result<Token, LexError>;

/// Lazy tokenizer over a source text.
///
/// Cloning a lexer restarts from the clone point.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    lines: Enumerate<Lines<'a>>,
    pending: VecDeque<LexResult>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer positioned at the start of `source`.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines().enumerate(),
            pending: VecDeque::new(),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = LexResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            let (index, text) = self.lines.next()?;
            self.pending.extend(LineScanner::new(text, index + 1).scan());
        }
    }
}

/// Tokenizes the whole source, splitting tokens from errors.
#[must_use]
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    for item in Lexer::new(source) {
        match item {
            Ok(token) => tokens.push(token),
            Err(error) => errors.push(error),
        }
    }
    (tokens, errors)
}

struct LineScanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    statement_start: bool,
}

impl LineScanner {
    fn new(text: &str, line: usize) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line,
            statement_start: true,
        }
    }

    fn scan(mut self) -> Vec<LexResult> {
        let mut out = Vec::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            match self.next_token(c) {
                Ok(token) => out.push(Ok(token)),
                Err(error) => {
                    out.push(Err(error));
                    break;
                }
            }
        }
        out.push(Ok(Token {
            kind: TokenKind::EndOfLine,
            text: String::new(),
            line: self.line,
            column: self.chars.len() + 1,
        }));
        out
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn text_from(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            text: self.text_from(start),
            line: self.line,
            column: start + 1,
        }
    }

    const fn error(&self, kind: LexErrorKind, start: usize) -> LexError {
        LexError {
            kind,
            line: self.line,
            column: start + 1,
        }
    }

    fn next_token(&mut self, c: char) -> LexResult {
        let start = self.pos;
        match c {
            ';' => {
                let comment: String = self.chars[start + 1..].iter().collect();
                self.pos = self.chars.len();
                Ok(self.token(TokenKind::Comment(comment.trim().to_string()), start))
            }
            '$' => self.number(16, start),
            '%' => self.number(2, start),
            '0'..='9' => self.number(10, start),
            '#' => Ok(self.single(TokenKind::Hash, start)),
            ',' => Ok(self.single(TokenKind::Comma, start)),
            '(' => Ok(self.single(TokenKind::OpenParen, start)),
            ')' => Ok(self.single(TokenKind::CloseParen, start)),
            '=' => Ok(self.single(TokenKind::Equals, start)),
            '*' if self.statement_start => {
                self.statement_start = false;
                Ok(self.single(TokenKind::Directive(Directive::Origin), start))
            }
            '!' => self.directive(start),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.identifier(start)),
            other => Err(self.error(LexErrorKind::UnexpectedCharacter(other), start)),
        }
    }

    fn single(&mut self, kind: TokenKind, start: usize) -> Token {
        self.pos += 1;
        self.token(kind, start)
    }

    fn consume_word(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
    }

    fn number(&mut self, radix: u32, start: usize) -> LexResult {
        if radix != 10 {
            self.pos += 1;
        }
        let digits_start = self.pos;
        self.consume_word();
        let text = self.text_from(start);
        let digits: String = self.chars[digits_start..self.pos].iter().collect();

        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(self.error(LexErrorKind::MalformedNumber(text), start));
        }

        let value = u32::from_str_radix(&digits, radix)
            .ok()
            .and_then(|v| u16::try_from(v).ok());
        let Some(value) = value else {
            return Err(self.error(LexErrorKind::NumberOutOfRange(text), start));
        };

        let byte_wide = match radix {
            16 => digits.len() <= 2,
            2 => digits.len() <= 8,
            _ => value <= 0xFF,
        };
        let width = if byte_wide { Width::Byte } else { Width::Word };

        Ok(self.token(TokenKind::Number(Number { value, width }), start))
    }

    fn directive(&mut self, start: usize) -> LexResult {
        self.pos += 1;
        let name_start = self.pos;
        self.consume_word();
        let name: String = self.chars[name_start..self.pos].iter().collect();
        let Some(directive) = Directive::from_bang_name(&name) else {
            return Err(self.error(LexErrorKind::UnknownDirective(name), start));
        };
        self.statement_start = false;
        Ok(self.token(TokenKind::Directive(directive), start))
    }

    fn identifier(&mut self, start: usize) -> Token {
        self.consume_word();
        let name = self.text_from(start);

        if !self.statement_start {
            let register = match name.to_ascii_uppercase().as_str() {
                "A" => Some(Register::A),
                "X" => Some(Register::X),
                "Y" => Some(Register::Y),
                _ => None,
            };
            let kind = register.map_or(TokenKind::LabelRef(name), TokenKind::Register);
            return self.token(kind, start);
        }

        if self.peek() == Some(':') {
            self.pos += 1;
            return self.token(
                TokenKind::LabelDef {
                    name,
                    explicit: true,
                },
                start,
            );
        }

        match Mnemonic::from_name(&name) {
            Some(mnemonic) => {
                self.statement_start = false;
                self.token(TokenKind::Mnemonic(mnemonic), start)
            }
            None => self.token(
                TokenKind::LabelDef {
                    name,
                    explicit: false,
                },
                start,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use mos6502_isa::Mnemonic;
    use rstest::rstest;

    use super::{
        tokenize, Directive, LexErrorKind, Lexer, Number, Register, TokenKind, Width,
    };

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(source);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn instruction_with_absolute_operand() {
        assert_eq!(
            kinds("LDA $0420"),
            vec![
                TokenKind::Mnemonic(Mnemonic::Lda),
                TokenKind::Number(Number {
                    value: 0x0420,
                    width: Width::Word
                }),
                TokenKind::EndOfLine,
            ]
        );
    }

    #[rstest]
    #[case("$23", 0x23, Width::Byte)]
    #[case("$0023", 0x23, Width::Word)]
    #[case("$ffff", 0xFFFF, Width::Word)]
    #[case("255", 255, Width::Byte)]
    #[case("256", 256, Width::Word)]
    #[case("%1010", 0b1010, Width::Byte)]
    #[case("%000000001", 1, Width::Word)]
    fn numeric_literal_widths(#[case] literal: &str, #[case] value: u16, #[case] width: Width) {
        let source = format!("LDA {literal}");
        let tokens = kinds(&source);
        assert_eq!(tokens[1], TokenKind::Number(Number { value, width }));
    }

    #[test]
    fn number_new_picks_width_from_value() {
        assert_eq!(Number::new(0x12).width, Width::Byte);
        assert_eq!(Number::new(0x123).width, Width::Word);
    }

    #[test]
    fn positions_are_one_indexed() {
        let (tokens, _) = tokenize("\n  STA $20,X");
        let sta = &tokens[1];
        assert_eq!((sta.line, sta.column), (2, 3));
        let comma = tokens.iter().find(|t| t.kind == TokenKind::Comma).unwrap();
        assert_eq!(comma.column, 10);
        assert_eq!(comma.text, ",");
    }

    #[test]
    fn labels_and_registers() {
        assert_eq!(
            kinds("loop: lda table,x"),
            vec![
                TokenKind::LabelDef {
                    name: "loop".to_string(),
                    explicit: true
                },
                TokenKind::Mnemonic(Mnemonic::Lda),
                TokenKind::LabelRef("table".to_string()),
                TokenKind::Comma,
                TokenKind::Register(Register::X),
                TokenKind::EndOfLine,
            ]
        );
        assert_eq!(
            kinds("start")[0],
            TokenKind::LabelDef {
                name: "start".to_string(),
                explicit: false
            }
        );
    }

    #[test]
    fn directives_and_origin() {
        assert_eq!(
            kinds("* = $0400"),
            vec![
                TokenKind::Directive(Directive::Origin),
                TokenKind::Equals,
                TokenKind::Number(Number {
                    value: 0x0400,
                    width: Width::Word
                }),
                TokenKind::EndOfLine,
            ]
        );
        for spelling in ["!byte", "!BY", "!8"] {
            assert_eq!(kinds(spelling)[0], TokenKind::Directive(Directive::Byte));
        }
        for spelling in ["!word", "!wo", "!16"] {
            assert_eq!(kinds(spelling)[0], TokenKind::Directive(Directive::Word));
        }
        assert_eq!(kinds("!fi 4")[0], TokenKind::Directive(Directive::Fill));
    }

    #[test]
    fn comments_are_surfaced() {
        assert_eq!(
            kinds("NOP ; do nothing"),
            vec![
                TokenKind::Mnemonic(Mnemonic::Nop),
                TokenKind::Comment("do nothing".to_string()),
                TokenKind::EndOfLine,
            ]
        );
    }

    #[test]
    fn every_line_ends_with_end_of_line() {
        let tokens = kinds("NOP\n\nNOP");
        let eols = tokens
            .iter()
            .filter(|k| matches!(k, TokenKind::EndOfLine))
            .count();
        assert_eq!(eols, 3);
        assert!(kinds("").is_empty());
    }

    #[rstest]
    #[case("LDA $", LexErrorKind::MalformedNumber("$".to_string()))]
    #[case("LDA $12G4", LexErrorKind::MalformedNumber("$12G4".to_string()))]
    #[case("LDA 12ab", LexErrorKind::MalformedNumber("12ab".to_string()))]
    #[case("LDA $10000", LexErrorKind::NumberOutOfRange("$10000".to_string()))]
    #[case("LDA 70000", LexErrorKind::NumberOutOfRange("70000".to_string()))]
    #[case("!text \"hi\"", LexErrorKind::UnknownDirective("text".to_string()))]
    #[case("LDA @1", LexErrorKind::UnexpectedCharacter('@'))]
    #[case("LDA *", LexErrorKind::UnexpectedCharacter('*'))]
    fn lexical_errors(#[case] source: &str, #[case] expected: LexErrorKind) {
        let (_, errors) = tokenize(source);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, expected);
    }

    #[test]
    fn error_skips_rest_of_line_and_recovers() {
        let items: Vec<_> = Lexer::new("LDA @1, X\nNOP").collect();
        assert!(items[0].is_ok());
        let error = items[1].as_ref().unwrap_err();
        assert_eq!((error.line, error.column), (1, 5));
        assert_eq!(items[2].as_ref().unwrap().kind, TokenKind::EndOfLine);
        assert_eq!(
            items[3].as_ref().unwrap().kind,
            TokenKind::Mnemonic(Mnemonic::Nop)
        );
        assert_eq!(items.len(), 5);
    }

    #[test]
    fn lexer_is_restartable_by_clone() {
        let mut lexer = Lexer::new("CLC\nSEC");
        let snapshot = lexer.clone();
        let first: Vec<_> = lexer.by_ref().collect();
        let second: Vec<_> = snapshot.collect();
        assert_eq!(first, second);
        assert!(lexer.next().is_none());
    }
}
