/*
 * Copyright Cedar Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Scanner turning Cedar schema text into [`Token`]s.

use smol_str::SmolStr;
use std::fmt::Display;
use std::sync::Arc;

use super::err::{ParseError, ParseErrorKind, Result};
use super::{Loc, Position};
use crate::ast::{is_ident_continue, is_ident_start};

/// The kinds of token in the Cedar schema syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier, including keywords such as `entity` and `in`
    Ident,
    /// Double-quoted string literal
    String,
    /// `::`
    DoubleColon,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `<`
    LAngle,
    /// `>`
    RAngle,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `?`
    Question,
    /// `=`
    Equals,
    /// `@`
    At,
    /// End of input
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ident => "identifier",
            Self::String => "string literal",
            Self::DoubleColon => "`::`",
            Self::LBrace => "`{`",
            Self::RBrace => "`}`",
            Self::LBracket => "`[`",
            Self::RBracket => "`]`",
            Self::LAngle => "`<`",
            Self::RAngle => "`>`",
            Self::LParen => "`(`",
            Self::RParen => "`)`",
            Self::Comma => "`,`",
            Self::Semicolon => "`;`",
            Self::Colon => "`:`",
            Self::Question => "`?`",
            Self::Equals => "`=`",
            Self::At => "`@`",
            Self::Eof => "end of input",
        };
        f.write_str(s)
    }
}

/// A token with its raw text and, for string literals, its decoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    /// Kind of token
    pub kind: TokenKind,
    /// Raw text, including the quotes of a string literal
    pub text: &'src str,
    /// Decoded string value for string literals; the text itself for every
    /// other kind
    pub value: SmolStr,
    /// Where the token is
    pub loc: Loc,
}

impl Token<'_> {
    /// Line and column of the token's first character
    pub fn pos(&self) -> Position {
        self.loc.start
    }

    /// Is this the identifier `word`?
    pub fn is_ident(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }

    /// Describe the token for "unexpected ..." messages
    pub(crate) fn describe(&self) -> SmolStr {
        match self.kind {
            TokenKind::Ident => format!("identifier `{}`", self.text).into(),
            TokenKind::String => format!("string literal {}", self.text).into(),
            kind => kind.to_string().into(),
        }
    }
}

/// Pull-based scanner over one source text. Whitespace and comments between
/// tokens are skipped. Once the end of input is reached, every further call
/// to [`Scanner::next_token`] returns another [`TokenKind::Eof`] token.
#[derive(Debug)]
pub struct Scanner<'src> {
    src: &'src str,
    shared_src: Arc<str>,
    filename: Arc<str>,
    pos: Position,
    done: bool,
}

impl<'src> Scanner<'src> {
    /// Scan `src`. `filename` is used only in locations.
    pub fn new(filename: &str, src: &'src str) -> Self {
        Self {
            src,
            shared_src: Arc::from(src),
            filename: Arc::from(filename),
            pos: Position::start(),
            done: false,
        }
    }

    fn rest(&self) -> &'src str {
        self.src.get(self.pos.offset..).unwrap_or_default()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos = self.pos.advance(c);
        Some(c)
    }

    fn loc_from(&self, start: Position) -> Loc {
        Loc::new(
            start,
            self.pos.offset - start.offset,
            Arc::clone(&self.shared_src),
            Arc::clone(&self.filename),
        )
    }

    fn text_from(&self, start: Position) -> &'src str {
        self.src
            .get(start.offset..self.pos.offset)
            .unwrap_or_default()
    }

    fn err_from(&self, start: Position, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.loc_from(start))
    }

    /// Skip whitespace, `//` line comments and `/* */` block comments.
    /// Block comments do not nest.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.pos;
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => (),
                            None => {
                                return Err(ParseError::new(
                                    ParseErrorKind::UnterminatedComment,
                                    Loc::new(
                                        start,
                                        2,
                                        Arc::clone(&self.shared_src),
                                        Arc::clone(&self.filename),
                                    ),
                                ))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token<'src>> {
        self.skip_trivia()?;
        let start = self.pos;
        let kind = match self.bump() {
            None => TokenKind::Eof,
            Some(c) if is_ident_start(c) => {
                while self.peek().is_some_and(is_ident_continue) {
                    self.bump();
                }
                TokenKind::Ident
            }
            Some('"') => return self.string_literal(start),
            Some(':') => {
                if self.peek() == Some(':') {
                    self.bump();
                    TokenKind::DoubleColon
                } else {
                    TokenKind::Colon
                }
            }
            Some('{') => TokenKind::LBrace,
            Some('}') => TokenKind::RBrace,
            Some('[') => TokenKind::LBracket,
            Some(']') => TokenKind::RBracket,
            Some('<') => TokenKind::LAngle,
            Some('>') => TokenKind::RAngle,
            Some('(') => TokenKind::LParen,
            Some(')') => TokenKind::RParen,
            Some(',') => TokenKind::Comma,
            Some(';') => TokenKind::Semicolon,
            Some('?') => TokenKind::Question,
            Some('=') => TokenKind::Equals,
            Some('@') => TokenKind::At,
            Some(c) => return Err(self.err_from(start, ParseErrorKind::UnexpectedChar(c))),
        };
        let text = self.text_from(start);
        Ok(Token {
            kind,
            text,
            value: SmolStr::new(text),
            loc: self.loc_from(start),
        })
    }

    /// Scan the rest of a string literal whose opening quote started at `start`
    fn string_literal(&mut self, start: Position) -> Result<Token<'src>> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(self.err_from(start, ParseErrorKind::UnterminatedString))
                }
                Some('"') => break,
                Some('\\') => {
                    let escape_start = Position {
                        offset: self.pos.offset - 1,
                        line: self.pos.line,
                        column: self.pos.column - 1,
                    };
                    value.push(self.escape(escape_start, start)?);
                }
                Some(c) => value.push(c),
            }
        }
        let text = self.text_from(start);
        Ok(Token {
            kind: TokenKind::String,
            text,
            value: value.into(),
            loc: self.loc_from(start),
        })
    }

    /// Decode the escape sequence after a backslash at `escape_start`
    fn escape(&mut self, escape_start: Position, literal_start: Position) -> Result<char> {
        let c = match self.bump() {
            None | Some('\n') => {
                return Err(self.err_from(literal_start, ParseErrorKind::UnterminatedString))
            }
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some('"') => '"',
            Some('0') => '\0',
            Some('x') => {
                let digits_start = self.pos.offset;
                for _ in 0..2 {
                    if self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                        self.bump();
                    }
                }
                let digits = self.src.get(digits_start..self.pos.offset).unwrap_or_default();
                match u8::from_str_radix(digits, 16) {
                    Ok(code) if digits.len() == 2 => char::from(code),
                    _ => {
                        return Err(self.err_from(
                            escape_start,
                            ParseErrorKind::InvalidEscape(self.text_from(escape_start).into()),
                        ))
                    }
                }
            }
            Some(_) => {
                return Err(self.err_from(
                    escape_start,
                    ParseErrorKind::InvalidEscape(self.text_from(escape_start).into()),
                ))
            }
        };
        Ok(c)
    }
}

impl<'src> Iterator for Scanner<'src> {
    type Item = Result<Token<'src>>;

    /// Yields every token up to and including the single [`TokenKind::Eof`],
    /// or up to and including the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let tok = self.next_token();
        if matches!(&tok, Ok(Token { kind: TokenKind::Eof, .. }) | Err(_)) {
            self.done = true;
        }
        Some(tok)
    }
}
