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

//! The closed set of error kinds shared by every stage of the pipeline.
//!
//! Each stage has its own error type with its own context (source locations
//! for the parser, schema paths for the JSON loader, declaration names for the
//! resolver), but all of them can report which [`ErrorKind`] they are.

use std::fmt::Display;

/// Which map a duplicate name was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DuplicateKind {
    /// Two namespace blocks with the same fully-qualified path
    Namespace,
    /// Two entity type declarations with the same name
    EntityType,
    /// Two action declarations with the same name
    Action,
    /// Two common type declarations with the same name
    CommonType,
    /// Two record attributes with the same key
    Attribute,
    /// Two annotations with the same key on one declaration
    Annotation,
    /// Two identical values in one enumerated entity type
    EnumValue,
    /// Two `principal`, `resource` or `context` entries in one `appliesTo`
    AppliesToEntry,
    /// Two identical keys in one JSON object
    JsonKey,
}

impl Display for DuplicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Namespace => "namespace",
            Self::EntityType => "entity type",
            Self::Action => "action",
            Self::CommonType => "common type",
            Self::Attribute => "attribute",
            Self::Annotation => "annotation",
            Self::EnumValue => "enum value",
            Self::AppliesToEntry => "`appliesTo` entry",
            Self::JsonKey => "key",
        };
        f.write_str(s)
    }
}

/// Kind of an error raised anywhere in the schema pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// Malformed input to the scanner or parser
    Syntax,
    /// Unsupported escape sequence in a string literal
    InvalidEscape,
    /// String literal interrupted by a newline or the end of input
    UnterminatedString,
    /// Use of the reserved identifier `in` as a name
    Reserved,
    /// Duplicate name in one of the schema's maps
    Duplicate(DuplicateKind),
    /// Malformed JSON, or JSON that does not have the schema's shape
    InvalidJson,
    /// A JSON `Set` type without an `element`
    SetMissingElement,
    /// Reference to an unknown or disabled extension type
    UnknownType,
    /// An action's context is not a record type
    ContextNotRecord,
    /// `memberOf` names an entity type or action that is not declared
    UnknownParent,
    /// A type reference names an entity type that is not declared
    UnknownRef,
    /// The same entity type is declared both as enumerated and as standard
    EntityEnumConflict,
    /// The entity type or action hierarchy has a cycle
    Cycle,
    /// The AST holds content the Cedar schema syntax cannot express
    Unsupported,
    /// Types nested more deeply than [`crate::nesting::MAX_NESTING_DEPTH`]
    NestingTooDeep,
    /// A broken internal invariant
    Internal,
}

impl ErrorKind {
    /// Shorthand for `ErrorKind::Duplicate(DuplicateKind::EntityType)`
    pub const DUPLICATE_ENTITY: Self = Self::Duplicate(DuplicateKind::EntityType);
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax error"),
            Self::InvalidEscape => write!(f, "invalid escape"),
            Self::UnterminatedString => write!(f, "unterminated string"),
            Self::Reserved => write!(f, "reserved identifier"),
            Self::Duplicate(kind) => write!(f, "duplicate {kind}"),
            Self::InvalidJson => write!(f, "invalid JSON"),
            Self::SetMissingElement => write!(f, "set type missing element"),
            Self::UnknownType => write!(f, "unknown type"),
            Self::ContextNotRecord => write!(f, "context is not a record"),
            Self::UnknownParent => write!(f, "unknown parent"),
            Self::UnknownRef => write!(f, "unknown reference"),
            Self::EntityEnumConflict => write!(f, "entity and enum conflict"),
            Self::Cycle => write!(f, "cycle"),
            Self::Unsupported => write!(f, "unsupported"),
            Self::NestingTooDeep => write!(f, "nesting too deep"),
            Self::Internal => write!(f, "internal error"),
        }
    }
}
