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

use miette::Diagnostic;
use smol_str::SmolStr;
use std::fmt::Display;
use thiserror::Error;

use super::Loc;
use crate::err::{DuplicateKind, ErrorKind};

/// An error from the scanner or parser, with the location it applies to
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{loc}: {kind}")]
pub struct ParseError {
    kind: ParseErrorKind,
    loc: Loc,
}

impl ParseError {
    /// Construct a new `ParseError`
    pub fn new(kind: impl Into<ParseErrorKind>, loc: Loc) -> Self {
        Self {
            kind: kind.into(),
            loc,
        }
    }

    /// What went wrong
    pub fn error_kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Where it went wrong
    pub fn loc(&self) -> &Loc {
        &self.loc
    }

    /// The pipeline-wide kind of this error
    pub fn kind(&self) -> ErrorKind {
        self.kind.kind()
    }
}

impl Diagnostic for ParseError {
    impl_diagnostic_from_source_loc_field!(loc);

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.kind.help()
    }
}

/// Everything the scanner and parser can reject
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// The input is not valid UTF-8
    #[error("input is not valid UTF-8")]
    InvalidUtf8,
    /// A character that cannot start any token
    #[error("unexpected character `{}`", .0.escape_debug())]
    UnexpectedChar(char),
    /// Unsupported escape sequence in a string literal
    #[error("invalid escape `{0}` in string literal")]
    InvalidEscape(SmolStr),
    /// String literal interrupted by a newline or the end of input
    #[error("unterminated string literal")]
    UnterminatedString,
    /// Block comment not closed before the end of input
    #[error("unterminated block comment")]
    UnterminatedComment,
    /// A token the grammar does not allow here
    #[error("unexpected {found}, expected {expected}")]
    Unexpected {
        /// Description of what the grammar allows here
        expected: SmolStr,
        /// Description of the token found
        found: SmolStr,
    },
    /// Use of the reserved identifier `in` as a name
    #[error("`in` is a reserved identifier and cannot be used as a name")]
    Reserved,
    /// Duplicate name within one map
    #[error("duplicate {kind} `{name}`")]
    Duplicate {
        /// Which map
        kind: DuplicateKind,
        /// The duplicated name
        name: SmolStr,
    },
    /// The same name declared as both an enumerated and a standard entity type
    #[error("`{0}` is declared both as an enumerated and as a standard entity type")]
    EntityEnumConflict(SmolStr),
    /// `__cedar::<name>` where `<name>` is neither a primitive nor a known
    /// extension type
    #[error("unknown extension type `{0}`")]
    UnknownExtension(SmolStr),
    /// More `Set` and record types nested inside one another than allowed
    #[error("types are nested more than {max} deep", max = crate::nesting::MAX_NESTING_DEPTH)]
    NestingTooDeep,
    /// `namespace` blocks nested inside one another too deeply to parse
    #[error("namespace blocks are nested too deeply")]
    NamespacesTooDeep,
}

impl ParseErrorKind {
    /// The pipeline-wide kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUtf8
            | Self::UnexpectedChar(_)
            | Self::UnterminatedComment
            | Self::Unexpected { .. } => ErrorKind::Syntax,
            Self::InvalidEscape(_) => ErrorKind::InvalidEscape,
            Self::UnterminatedString => ErrorKind::UnterminatedString,
            Self::Reserved => ErrorKind::Reserved,
            Self::Duplicate { kind, .. } => ErrorKind::Duplicate(*kind),
            Self::EntityEnumConflict(_) => ErrorKind::EntityEnumConflict,
            Self::UnknownExtension(_) => ErrorKind::UnknownType,
            Self::NestingTooDeep | Self::NamespacesTooDeep => ErrorKind::NestingTooDeep,
        }
    }

    fn help(&self) -> Option<Box<dyn Display + '_>> {
        match self {
            Self::InvalidEscape(_) => Some(Box::new(
                r#"supported escapes are `\n`, `\r`, `\t`, `\\`, `\'`, `\"`, `\0` and `\xHH`"#,
            )),
            Self::Reserved => Some(Box::new("write `\"in\"` to use it as an action name or attribute")),
            Self::UnknownExtension(_) => Some(Box::new(format!(
                "known extension types are {}",
                itertools::join(crate::extensions::KNOWN_EXTENSIONS, ", ")
            ))),
            _ => None,
        }
    }

    /// Shorthand for [`ParseErrorKind::Unexpected`]
    pub(crate) fn unexpected(expected: impl Into<SmolStr>, found: impl Into<SmolStr>) -> Self {
        Self::Unexpected {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, ParseError>;
