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

use crate::ast::NameError;
use crate::err::{DuplicateKind, ErrorKind};

/// Location of a value inside a JSON schema document, as the sequence of
/// object keys leading to it. Displayed as a JSON pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SchemaPath(Vec<SmolStr>);

impl SchemaPath {
    /// The document root
    pub fn root() -> Self {
        Self::default()
    }

    /// This path extended by one key
    pub fn child(&self, key: impl Into<SmolStr>) -> Self {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Self(keys)
    }

    /// Is this the document root?
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The keys leading to the value
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(SmolStr::as_str)
    }
}

impl Display for SchemaPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for key in &self.0 {
            write!(f, "/{}", key.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

/// An error loading or emitting a JSON schema, with the path of the offending
/// value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonSchemaError {
    kind: JsonSchemaErrorKind,
    path: SchemaPath,
}

impl Display for JsonSchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_root() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "in `{}`: {}", self.path, self.kind)
        }
    }
}

impl std::error::Error for JsonSchemaError {}

impl Diagnostic for JsonSchemaError {
    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.kind.help()
    }
}

impl JsonSchemaError {
    pub(crate) fn new(kind: JsonSchemaErrorKind, path: &SchemaPath) -> Self {
        Self {
            kind,
            path: path.clone(),
        }
    }

    /// What went wrong
    pub fn error_kind(&self) -> &JsonSchemaErrorKind {
        &self.kind
    }

    /// Where in the document it went wrong
    pub fn path(&self) -> &SchemaPath {
        &self.path
    }

    /// The pipeline-wide kind of this error
    pub fn kind(&self) -> ErrorKind {
        self.kind.kind()
    }
}

impl From<serde_json::Error> for JsonSchemaError {
    fn from(e: serde_json::Error) -> Self {
        Self {
            kind: JsonSchemaErrorKind::Serde(e.to_string().into()),
            path: SchemaPath::root(),
        }
    }
}

/// Everything the JSON loader and emitter can reject
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum JsonSchemaErrorKind {
    /// Malformed JSON, an unknown or missing field, or a value of the wrong
    /// JSON type. Carries the message from `serde_json`, which includes a
    /// line and column.
    #[error("{0}")]
    Serde(SmolStr),
    /// The same key twice in one object
    #[error("duplicate key `{0}`")]
    DuplicateKey(SmolStr),
    /// A key that must be an identifier or a name is not one
    #[error("{err}")]
    InvalidName {
        /// The offending key or value
        name: SmolStr,
        /// Why it is not valid
        err: NameError,
    },
    /// A `Set` type without `element`
    #[error("`Set` type is missing `element`")]
    SetMissingElement,
    /// A type object without a field its `type` requires
    #[error("`{type_name}` type is missing `{field}`")]
    MissingField {
        /// The `type` tag
        type_name: SmolStr,
        /// The missing field
        field: &'static str,
    },
    /// A type object with a field its `type` does not allow
    #[error("`{field}` is not allowed on a `{type_name}` type")]
    UnexpectedField {
        /// The `type` tag
        type_name: SmolStr,
        /// The unexpected field
        field: &'static str,
    },
    /// An entity `shape` that is not a `Record` type
    #[error("`{0}` must be a `Record` type")]
    NotARecord(&'static str),
    /// `required` outside a record attribute
    #[error("`required` is only allowed on record attributes")]
    MisplacedRequired,
    /// `annotations` on a type object that has nowhere to keep them
    #[error("`annotations` are only allowed here on `Record` types")]
    MisplacedAnnotations,
    /// An `Extension` type naming an extension outside the known set
    #[error("unknown extension type `{0}`")]
    UnknownExtension(SmolStr),
    /// An enumerated entity type that also has `shape`, `tags` or
    /// `memberOfTypes`
    #[error("an enumerated entity type cannot have `{0}`")]
    EnumWithField(&'static str),
    /// `enum: []`
    #[error("an enumerated entity type must list at least one value")]
    EmptyEnum,
    /// The same value twice in one `enum`
    #[error("duplicate enum value `{0}`")]
    DuplicateEnumValue(SmolStr),
    /// AST content with no JSON representation
    #[error("{0}")]
    Unsupported(&'static str),
    /// More `Set` and record types nested inside one another than allowed
    #[error("types are nested more than {} deep", crate::nesting::MAX_NESTING_DEPTH)]
    NestingTooDeep,
}

impl JsonSchemaErrorKind {
    /// The pipeline-wide kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Serde(_)
            | Self::MissingField { .. }
            | Self::UnexpectedField { .. }
            | Self::NotARecord(_)
            | Self::MisplacedRequired
            | Self::MisplacedAnnotations
            | Self::EnumWithField(_)
            | Self::EmptyEnum => ErrorKind::InvalidJson,
            Self::InvalidName {
                err: NameError::Reserved,
                ..
            } => ErrorKind::Reserved,
            Self::InvalidName { .. } => ErrorKind::InvalidJson,
            Self::DuplicateKey(_) => ErrorKind::Duplicate(DuplicateKind::JsonKey),
            Self::SetMissingElement => ErrorKind::SetMissingElement,
            Self::UnknownExtension(_) => ErrorKind::UnknownType,
            Self::DuplicateEnumValue(_) => ErrorKind::Duplicate(DuplicateKind::EnumValue),
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::NestingTooDeep => ErrorKind::NestingTooDeep,
        }
    }

    fn help(&self) -> Option<Box<dyn Display + '_>> {
        match self {
            Self::UnknownExtension(_) => Some(Box::new(format!(
                "known extension types are {}",
                itertools::join(crate::extensions::KNOWN_EXTENSIONS, ", ")
            ))),
            Self::SetMissingElement => Some(Box::new(
                "write the element type as `\"element\": { \"type\": ... }`",
            )),
            _ => None,
        }
    }
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, JsonSchemaError>;
