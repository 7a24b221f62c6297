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

use std::fmt::Display;
use std::sync::Arc;

/// A 1-based line and column (counted in characters) in a source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// Byte offset into the source
    pub offset: usize,
    /// Line, starting at 1
    pub line: usize,
    /// Column, starting at 1
    pub column: usize,
}

impl Position {
    /// The position of the first character of a source text
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// The position just after `c`, if `c` is at this position
    pub(crate) fn advance(self, c: char) -> Self {
        if c == '\n' {
            Self {
                offset: self.offset + c.len_utf8(),
                line: self.line + 1,
                column: 1,
            }
        } else {
            Self {
                offset: self.offset + c.len_utf8(),
                line: self.line,
                column: self.column + 1,
            }
        }
    }
}

/// Represents a source location: a byte range and its starting line and
/// column, the source code which that range indexes into, and the name of the
/// file the source came from (used only in messages)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Loc {
    /// `SourceSpan` indicating a specific source code location or range
    pub span: miette::SourceSpan,
    /// Line and column where the span starts
    pub start: Position,
    /// Original source code (which the above source span indexes into)
    pub src: Arc<str>,
    /// Name of the file the source came from; may be empty
    pub filename: Arc<str>,
}

impl Loc {
    /// Create a new `Loc` covering `len` bytes starting at `start`
    pub fn new(start: Position, len: usize, src: Arc<str>, filename: Arc<str>) -> Self {
        Self {
            span: (start.offset, len).into(),
            start,
            src,
            filename,
        }
    }

    /// Line where the location starts, starting at 1
    pub fn line(&self) -> usize {
        self.start.line
    }

    /// Column where the location starts, starting at 1
    pub fn column(&self) -> usize {
        self.start.column
    }

    /// Get the actual source snippet indicated, or `None` if the `Loc` isn't
    /// internally consistent (its `SourceSpan` isn't a valid index into its
    /// `src`)
    pub fn snippet(&self) -> Option<&str> {
        self.src
            .get(self.span.offset()..self.span.offset() + self.span.len())
    }
}

impl Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.filename.is_empty() {
            write!(f, "{}:", self.filename)?;
        }
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}
