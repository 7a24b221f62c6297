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
//! This module defines the publicly exported error types.

use miette::Diagnostic;
use thiserror::Error;

pub use cedar_schema_core::fmt::ToTextError;
pub use cedar_schema_core::json_schema::{JsonSchemaError, JsonSchemaErrorKind, SchemaPath};
pub use cedar_schema_core::parser::{Loc, ParseError, ParseErrorKind};
pub use cedar_schema_core::resolver::{ResolveError, ResolveErrorKind, ResolveErrors};

use crate::ErrorKind;

/// Errors loading, formatting or resolving a schema
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum SchemaError {
    /// Error in a schema written in the Cedar schema syntax
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),
    /// Error in a schema written in the JSON schema syntax, or content the
    /// JSON syntax cannot express
    #[error(transparent)]
    #[diagnostic(transparent)]
    Json(#[from] JsonSchemaError),
    /// Content the Cedar schema syntax cannot express
    #[error(transparent)]
    #[diagnostic(transparent)]
    ToText(#[from] ToTextError),
    /// Errors resolving the schema
    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveErrors),
}

impl SchemaError {
    /// The kind of the (first) error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(e) => e.kind(),
            Self::Json(e) => e.kind(),
            Self::ToText(e) => e.kind(),
            Self::Resolve(e) => e.first().kind(),
        }
    }

    /// The kinds of every error. Only resolution reports more than one.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self {
            Self::Resolve(e) => e.kinds().collect(),
            _ => vec![self.kind()],
        }
    }
}
