//! Tokenizer for filter text.
//!
//! The tokenizer is a small state machine: after a field it expects an
//! operator, after a value-taking operator an optional literal, after a
//! complete condition or a closed group a joiner (`AND`, `OR` or `)`), and
//! after a joiner or `(` a new term. Each position only accepts what the state
//! allows, so a keyword inside a literal or a bracket inside a quoted string is
//! never misread.
//!
//! ```text
//! [Age] GTE 18 AND ([Name] CONTAINS "Jo" OR [Tags] IN {a,b})
//! ^^^^^ ^^^ ^^ ^^^ ^^^^^^ ^^^^^^^^ ^^^^ ^^ ^^^^^^ ^^ ^^^^^^
//! field op  lit logic     ...
//! ```

use tracing::trace;

use crate::error::{Quote, SyntaxError};
use crate::filter::MAX_DEPTH;
use crate::op::{Logic, Op};

/// Byte range of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

/// How a literal was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralStyle {
    Bare,
    SingleQuoted,
    DoubleQuoted,
    Array,
}

/// What a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `(`
    GroupOpen,
    /// `)`
    GroupClose,
    /// `AND` / `OR`
    Logic(Logic),
    /// `[name]`; the token text is the name without brackets.
    Field,
    Operator(Op),
    /// Raw literal text, quotes and braces included.
    Literal(LiteralStyle),
}

/// A lexical token borrowing its text from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub span: Span,
    pub text: &'a str,
}

/// Splits filter text into tokens.
///
/// # Example
///
/// ```
/// use sift_filter::token::{tokenize, TokenKind};
/// use sift_filter::Op;
///
/// let tokens = tokenize("[Age] gte 18").unwrap();
/// assert_eq!(tokens.len(), 3);
/// assert_eq!(tokens[0].text, "Age");
/// assert_eq!(tokens[1].kind, TokenKind::Operator(Op::Gte));
/// assert_eq!(tokens[2].text, "18");
/// ```
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    let tokens = Tokenizer::new(input).collect::<Result<Vec<_>, _>>()?;
    trace!(tokens = tokens.len(), "tokenized filter text");
    Ok(tokens)
}

/// What the tokenizer accepts next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Term,
    Operator,
    Literal,
    Joiner,
}

/// Iterator over the tokens of filter text.
///
/// Yields at most one error, after which it is exhausted.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    expect: Expect,
    /// Offsets of currently open `(`.
    groups: Vec<usize>,
    last: Option<TokenKind>,
    last_field: Option<(&'a str, usize)>,
    last_logic: Option<(Logic, usize)>,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            input,
            pos: 0,
            expect: Expect::Term,
            groups: Vec::new(),
            last: None,
            last_field: None,
            last_logic: None,
            done: false,
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn emit(&mut self, kind: TokenKind, start: usize, end: usize, text: &'a str) -> Token<'a> {
        self.pos = end;
        self.last = Some(kind);
        Token {
            kind,
            span: Span::new(start, end),
            text,
        }
    }

    /// The whitespace-delimited chunk at `pos`, for error messages.
    fn word_at(&self, pos: usize) -> String {
        self.input[pos..]
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    fn next_token(&mut self) -> Option<Result<Token<'a>, SyntaxError>> {
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let rest = &self.input[start..];
            let c = match rest.chars().next() {
                Some(c) => c,
                None => return self.finish().map(Err),
            };

            return Some(match self.expect {
                Expect::Term => self.lex_term(c, start),
                Expect::Operator => self.lex_operator(c, start),
                Expect::Literal => {
                    if matches!(c, ')' | '(' | '[' | ']' | '}') {
                        // No literal: the condition compares against absence.
                        self.expect = Expect::Joiner;
                        continue;
                    }
                    self.lex_literal(c, start)
                }
                Expect::Joiner => self.lex_joiner(c, start),
            });
        }
    }

    fn lex_term(&mut self, c: char, start: usize) -> Result<Token<'a>, SyntaxError> {
        match c {
            '[' => self.lex_field(start),
            '(' => {
                if self.groups.len() + 1 >= MAX_DEPTH {
                    return Err(SyntaxError::TooDeep {
                        max: MAX_DEPTH,
                        offset: start,
                    });
                }
                self.groups.push(start);
                Ok(self.emit(TokenKind::GroupOpen, start, start + 1, "("))
            }
            ')' if self.last == Some(TokenKind::GroupOpen) => Err(SyntaxError::EmptyGroup {
                offset: self.groups.last().copied().unwrap_or(start),
            }),
            _ => Err(SyntaxError::ExpectedTerm {
                found: self.word_at(start),
                offset: start,
            }),
        }
    }

    fn lex_field(&mut self, start: usize) -> Result<Token<'a>, SyntaxError> {
        let input = self.input;
        let body = &input[start + 1..];
        let close = body
            .find(']')
            .ok_or(SyntaxError::UnterminatedField { offset: start })?;
        let name = &body[..close];
        if name.contains('[') {
            return Err(SyntaxError::UnterminatedField { offset: start });
        }
        if name.trim().is_empty() {
            return Err(SyntaxError::EmptyField { offset: start });
        }
        self.expect = Expect::Operator;
        self.last_field = Some((name, start));
        Ok(self.emit(TokenKind::Field, start, start + close + 2, name))
    }

    fn lex_operator(&mut self, c: char, start: usize) -> Result<Token<'a>, SyntaxError> {
        let field = self.last_field.map(|(f, _)| f).unwrap_or_default().to_string();
        if matches!(c, '[' | '(' | ')') {
            return Err(SyntaxError::MissingOperator {
                field,
                offset: start,
            });
        }
        let input = self.input;
        let rest = &input[start..];
        match Op::longest_prefix(rest) {
            Some((op, len)) => {
                self.expect = if op.takes_value() {
                    Expect::Literal
                } else {
                    Expect::Joiner
                };
                Ok(self.emit(TokenKind::Operator(op), start, start + len, &rest[..len]))
            }
            None => Err(SyntaxError::ValueWhereOperatorExpected {
                field,
                found: self.word_at(start),
                offset: start,
            }),
        }
    }

    fn lex_literal(&mut self, c: char, start: usize) -> Result<Token<'a>, SyntaxError> {
        let input = self.input;
        let (style, end) = match c {
            '"' | '\'' => {
                let quote = Quote::from_char(c).unwrap_or(Quote::Double);
                let end = self
                    .scan_quoted(start, quote)
                    .ok_or(SyntaxError::UnclosedQuote {
                        quote,
                        offset: start,
                    })?;
                let style = match quote {
                    Quote::Single => LiteralStyle::SingleQuoted,
                    Quote::Double => LiteralStyle::DoubleQuoted,
                };
                (style, end)
            }
            '{' => (LiteralStyle::Array, self.scan_array(start)?),
            _ => {
                let rest = &input[start..];
                let len = rest
                    .find(|ch: char| ch.is_whitespace() || "()[]{}".contains(ch))
                    .unwrap_or(rest.len());
                (LiteralStyle::Bare, start + len)
            }
        };
        self.expect = Expect::Joiner;
        let text = &input[start..end];
        Ok(self.emit(TokenKind::Literal(style), start, end, text))
    }

    /// End offset (exclusive) of the quoted run opening at `start`.
    fn scan_quoted(&self, start: usize, quote: Quote) -> Option<usize> {
        let mut chars = self.input[start..].char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            if c == '\\' {
                chars.next();
            } else if c == quote.as_char() {
                return Some(start + i + 1);
            }
        }
        None
    }

    /// End offset (exclusive) of the array literal opening at `start`.
    fn scan_array(&self, start: usize) -> Result<usize, SyntaxError> {
        let mut fresh = true;
        let mut i = start + 1;
        while let Some(c) = self.input[i..].chars().next() {
            match c {
                '}' => return Ok(i + 1),
                '{' => return Err(SyntaxError::NestedArray { offset: i }),
                ',' => fresh = true,
                '"' | '\'' if fresh => {
                    let quote = Quote::from_char(c).unwrap_or(Quote::Double);
                    i = self
                        .scan_quoted(i, quote)
                        .ok_or(SyntaxError::UnclosedQuote { quote, offset: i })?;
                    fresh = false;
                    continue;
                }
                c if c.is_whitespace() => {}
                _ => fresh = false,
            }
            i += c.len_utf8();
        }
        Err(SyntaxError::UnterminatedArray { offset: start })
    }

    fn lex_joiner(&mut self, c: char, start: usize) -> Result<Token<'a>, SyntaxError> {
        if c == ')' {
            if self.groups.pop().is_none() {
                return Err(SyntaxError::UnopenedGroup { offset: start });
            }
            return Ok(self.emit(TokenKind::GroupClose, start, start + 1, ")"));
        }
        let input = self.input;
        let rest = &input[start..];
        match Logic::keyword_prefix(rest) {
            Some((logic, len)) => {
                self.expect = Expect::Term;
                self.last_logic = Some((logic, start));
                Ok(self.emit(TokenKind::Logic(logic), start, start + len, &rest[..len]))
            }
            None => Err(SyntaxError::ExpectedLogic {
                found: self.word_at(start),
                offset: start,
            }),
        }
    }

    /// End-of-input checks.
    fn finish(&mut self) -> Option<SyntaxError> {
        self.done = true;
        if self.expect == Expect::Operator {
            let (field, offset) = self.last_field.unwrap_or_default();
            return Some(SyntaxError::MissingOperator {
                field: field.to_string(),
                offset,
            });
        }
        if let Some(&offset) = self.groups.last() {
            return Some(SyntaxError::UnclosedGroup { offset });
        }
        if let (Some(TokenKind::Logic(_)), Some((logic, offset))) = (self.last, self.last_logic) {
            return Some(SyntaxError::DanglingLogic {
                logic: logic.keyword().to_string(),
                offset,
            });
        }
        None
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_token();
        if matches!(item, Some(Err(_)) | None) {
            self.done = true;
        }
        item
    }
}
