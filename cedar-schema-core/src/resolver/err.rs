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
use itertools::Itertools;
use miette::Diagnostic;
use nonempty::NonEmpty;
use smol_str::SmolStr;
use std::fmt::Display;
use thiserror::Error;

use super::EntityUid;
use crate::ast::Name;
use crate::err::{DuplicateKind, ErrorKind};
use crate::parser::Loc;

/// One problem found while resolving a schema, with the location of the
/// declaration it was found in when that declaration was parsed from text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ResolveError {
    kind: ResolveErrorKind,
    loc: Option<Loc>,
}

impl ResolveError {
    pub(crate) fn new(kind: ResolveErrorKind, loc: Option<&Loc>) -> Self {
        Self {
            kind,
            loc: loc.cloned(),
        }
    }

    /// What went wrong
    pub fn error_kind(&self) -> &ResolveErrorKind {
        &self.kind
    }

    /// The declaration it went wrong in, if known
    pub fn loc(&self) -> Option<&Loc> {
        self.loc.as_ref()
    }

    /// The pipeline-wide kind of this error
    pub fn kind(&self) -> ErrorKind {
        self.kind.kind()
    }
}

impl Diagnostic for ResolveError {
    impl_diagnostic_from_source_loc_opt_field!(loc);

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.kind.help()
    }
}

/// Everything the resolver can reject
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ResolveErrorKind {
    /// Two fragments declare the same entity type
    #[error("entity type `{0}` is declared more than once")]
    DuplicateEntityType(Name),
    /// Two fragments declare the same entity type, one of them as enumerated
    #[error("`{0}` is declared both as an enumerated and as a standard entity type")]
    EntityEnumConflict(Name),
    /// Two fragments declare the same action
    #[error("action `{0}` is declared more than once")]
    DuplicateAction(EntityUid),
    /// Two fragments declare the same common type
    #[error("common type `{0}` is declared more than once")]
    DuplicateCommonType(Name),
    /// `memberOf` of an entity type names an undeclared entity type
    #[error("entity type `{entity}` is a member of undeclared entity type `{parent}`")]
    UnknownEntityParent {
        /// The declared entity type
        entity: Name,
        /// Its undeclared parent
        parent: Name,
    },
    /// `memberOf` of an action names an undeclared action
    #[error("action `{action}` is a member of undeclared action `{parent}`")]
    UnknownActionParent {
        /// The declared action
        action: EntityUid,
        /// Its undeclared parent
        parent: EntityUid,
    },
    /// A type or `appliesTo` list refers to an undeclared entity type
    #[error("undeclared entity type `{name}` referenced in {referenced_in}")]
    UnknownEntityType {
        /// The (qualified) name that was not found
        name: Name,
        /// The declaration containing the reference
        referenced_in: SmolStr,
    },
    /// A JSON common type reference names no common type
    #[error("undeclared common type `{name}` referenced in {referenced_in}")]
    UnknownCommonType {
        /// The name as written
        name: Name,
        /// The declaration containing the reference
        referenced_in: SmolStr,
    },
    /// A type names an extension type that does not exist
    #[error("unknown extension type `{name}` referenced in {referenced_in}")]
    UnknownExtension {
        /// The extension name
        name: SmolStr,
        /// The declaration containing the reference
        referenced_in: SmolStr,
    },
    /// A type names an extension type that exists but is not enabled
    #[error("extension type `{name}` referenced in {referenced_in} is not enabled")]
    DisabledExtension {
        /// The extension name
        name: SmolStr,
        /// The declaration containing the reference
        referenced_in: SmolStr,
    },
    /// Resolving a type, with every common type in it inlined, nests more
    /// `Set` and record types than allowed
    #[error(
        "types in {referenced_in} are nested more than {max} deep once common types are inlined",
        max = crate::nesting::MAX_NESTING_DEPTH
    )]
    NestingTooDeep {
        /// The declaration containing the type
        referenced_in: SmolStr,
    },
    /// Common types refer to one another through a chain too long to follow
    #[error("common type `{0}` starts a chain of common type references that is too long to inline")]
    CommonTypeChainTooLong(Name),
    /// The context of an action resolves to something other than a record
    #[error("context of action `{0}` is not a record type")]
    ContextNotRecord(EntityUid),
    /// The entity type hierarchy has a cycle
    #[error("entity type hierarchy has a cycle through {}", fmt_list(.0))]
    EntityTypeCycle(NonEmpty<Name>),
    /// The action hierarchy has a cycle
    #[error("action hierarchy has a cycle through {}", fmt_list(.0))]
    ActionCycle(NonEmpty<EntityUid>),
}

fn fmt_list<T: Display>(items: &NonEmpty<T>) -> String {
    items.iter().map(|item| format!("`{item}`")).join(", ")
}

impl ResolveErrorKind {
    /// The pipeline-wide kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateEntityType(_) => ErrorKind::Duplicate(DuplicateKind::EntityType),
            Self::EntityEnumConflict(_) => ErrorKind::EntityEnumConflict,
            Self::DuplicateAction(_) => ErrorKind::Duplicate(DuplicateKind::Action),
            Self::DuplicateCommonType(_) => ErrorKind::Duplicate(DuplicateKind::CommonType),
            Self::UnknownEntityParent { .. } | Self::UnknownActionParent { .. } => {
                ErrorKind::UnknownParent
            }
            Self::UnknownEntityType { .. } | Self::UnknownCommonType { .. } => {
                ErrorKind::UnknownRef
            }
            Self::UnknownExtension { .. } | Self::DisabledExtension { .. } => {
                ErrorKind::UnknownType
            }
            Self::ContextNotRecord(_) => ErrorKind::ContextNotRecord,
            Self::NestingTooDeep { .. } | Self::CommonTypeChainTooLong(_) => {
                ErrorKind::NestingTooDeep
            }
            Self::EntityTypeCycle(_) | Self::ActionCycle(_) => ErrorKind::Cycle,
        }
    }

    fn help(&self) -> Option<Box<dyn Display + '_>> {
        match self {
            Self::UnknownExtension { .. } => Some(Box::new(format!(
                "known extension types are {}",
                itertools::join(crate::extensions::KNOWN_EXTENSIONS, ", ")
            ))),
            Self::DisabledExtension { name, .. } => Some(Box::new(format!(
                "enable the cargo feature that provides `{name}`, or include it in the `Extensions` passed to the resolver"
            ))),
            Self::ContextNotRecord(_) => Some(Box::new(
                "declare the context as a record type, or as a common type that is a record",
            )),
            Self::CommonTypeChainTooLong(_) => Some(Box::new(
                "shorten the chain by referring to the type at its end directly",
            )),
            Self::UnknownEntityType { name, .. } if !name.is_unqualified() => None,
            Self::UnknownEntityType { .. } => Some(Box::new(
                "bare names are looked up in the anonymous namespace, then in the enclosing namespace",
            )),
            _ => None,
        }
    }
}

/// All the problems found while resolving a schema. There is always at least
/// one.
///
/// The first error is the primary one; the others are available through
/// [`ResolveErrors::iter`] and as [`Diagnostic::related`] diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.first())]
pub struct ResolveErrors(NonEmpty<ResolveError>);

impl ResolveErrors {
    pub(crate) fn new(errs: NonEmpty<ResolveError>) -> Self {
        Self(errs)
    }

    /// The primary error
    pub fn first(&self) -> &ResolveError {
        self.0.first()
    }

    /// Iterate over every error, in the order they were found
    pub fn iter(&self) -> impl Iterator<Item = &ResolveError> {
        self.0.iter()
    }

    /// Number of errors; at least 1
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The kinds of every error, in order
    pub fn kinds(&self) -> impl Iterator<Item = ErrorKind> + '_ {
        self.iter().map(ResolveError::kind)
    }
}

impl From<ResolveError> for ResolveErrors {
    fn from(err: ResolveError) -> Self {
        Self(NonEmpty::new(err))
    }
}

impl IntoIterator for ResolveErrors {
    type Item = ResolveError;
    type IntoIter = <NonEmpty<ResolveError> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Diagnostic for ResolveErrors {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.first().source_code()
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        self.first().labels()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.first().help()
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        if self.0.tail.is_empty() {
            None
        } else {
            Some(Box::new(
                self.0.tail.iter().map(|err| err as &dyn Diagnostic),
            ))
        }
    }
}
