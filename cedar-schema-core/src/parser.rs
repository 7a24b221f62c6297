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

//! Parser for the Cedar schema text syntax.
//!
//! [`parse_schema`] is the entry point; [`lexer::Scanner`] is usable on its
//! own for tooling that only needs tokens.

mod err;
pub mod lexer;
mod loc;
mod text_to_ast;

pub use err::{ParseError, ParseErrorKind, Result};
pub use loc::{Loc, Position};

use std::sync::Arc;

use crate::ast;

/// Parse a schema in the Cedar text syntax. `filename` appears only in
/// error locations. Parsing stops at the first error.
pub fn parse_schema(filename: &str, src: &str) -> Result<ast::Schema> {
    text_to_ast::Parser::new(filename, src).parse()
}

/// Like [`parse_schema`], for input that has not yet been checked to be
/// UTF-8
pub fn parse_schema_bytes(filename: &str, bytes: &[u8]) -> Result<ast::Schema> {
    match std::str::from_utf8(bytes) {
        Ok(src) => parse_schema(filename, src),
        Err(e) => {
            let src = String::from_utf8_lossy(bytes);
            let valid = src.get(..e.valid_up_to()).unwrap_or_default();
            let start = valid.chars().fold(Position::start(), Position::advance);
            Err(ParseError::new(
                ParseErrorKind::InvalidUtf8,
                Loc::new(start, 1, Arc::from(src.as_ref()), Arc::from(filename)),
            ))
        }
    }
}
