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

//! The schema AST: a faithful record of what was parsed from either syntax.
//!
//! Names of declarations are always unqualified [`Id`]s (action names are
//! arbitrary strings); the namespace they belong to is the key of the
//! enclosing [`Namespace`] in [`Schema::namespaces`]. References appearing in
//! types, `memberOf` lists and `appliesTo` lists are [`Name`]s that may or may
//! not be qualified; the resolver decides what they refer to.

use educe::Educe;
use nonempty::NonEmpty;
use smol_str::SmolStr;
use std::collections::BTreeMap;

mod annotation;
pub use annotation::*;
mod name;
pub use name::*;
mod types;
pub use types::*;

use crate::parser::Loc;

/// A whole schema: namespaces keyed by their fully-qualified path, where
/// `None` is the anonymous namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// Namespace definitions
    pub namespaces: BTreeMap<Option<Name>, Namespace>,
}

impl Schema {
    /// An empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Does the schema declare nothing at all?
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Get a namespace definition
    pub fn namespace(&self, ns: Option<&Name>) -> Option<&Namespace> {
        self.namespaces.get(&ns.cloned())
    }

    /// Get a namespace definition for modification, creating an empty one if
    /// it does not exist yet
    pub fn namespace_mut(&mut self, ns: Option<Name>) -> &mut Namespace {
        self.namespaces.entry(ns).or_default()
    }

    /// Iterate over every entity type declaration with its namespace
    pub fn entity_types(&self) -> impl Iterator<Item = (Option<&Name>, &Id, &EntityType)> {
        self.namespaces.iter().flat_map(|(ns, def)| {
            def.entity_types
                .iter()
                .map(move |(id, ety)| (ns.as_ref(), id, ety))
        })
    }

    /// Iterate over every action declaration with its namespace
    pub fn actions(&self) -> impl Iterator<Item = (Option<&Name>, &SmolStr, &Action)> {
        self.namespaces.iter().flat_map(|(ns, def)| {
            def.actions
                .iter()
                .map(move |(id, action)| (ns.as_ref(), id, action))
        })
    }
}

/// Declarations of one namespace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    /// Namespace-level annotations
    pub annotations: Annotations,
    /// Entity type declarations, standard and enumerated
    pub entity_types: BTreeMap<Id, EntityType>,
    /// Action declarations, by action name
    pub actions: BTreeMap<SmolStr, Action>,
    /// Common type declarations
    pub common_types: BTreeMap<Id, CommonType>,
}

impl Namespace {
    /// Does this namespace declare nothing and carry no annotations?
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty() && !self.has_declarations()
    }

    /// Does this namespace declare at least one entity type, action or
    /// common type?
    pub fn has_declarations(&self) -> bool {
        !(self.entity_types.is_empty() && self.actions.is_empty() && self.common_types.is_empty())
    }
}

/// Declaration of an entity type
#[derive(Educe, Debug, Clone)]
#[educe(PartialEq, Eq)]
pub struct EntityType {
    /// Standard or enumerated
    pub kind: EntityTypeKind,
    /// Annotations
    pub annotations: Annotations,
    /// Source location of the declared name, when parsed from text
    #[educe(PartialEq(ignore))]
    pub loc: Option<Loc>,
}

impl EntityType {
    /// A standard entity type with no annotations
    pub fn standard(
        member_of: impl IntoIterator<Item = Name>,
        shape: Option<RecordType>,
        tags: Option<Type>,
    ) -> Self {
        Self {
            kind: EntityTypeKind::Standard(StandardEntityType {
                member_of: member_of.into_iter().collect(),
                shape,
                tags,
            }),
            annotations: Annotations::new(),
            loc: None,
        }
    }

    /// An enumerated entity type with no annotations
    pub fn enumeration(choices: NonEmpty<SmolStr>) -> Self {
        Self {
            kind: EntityTypeKind::Enum { choices },
            annotations: Annotations::new(),
            loc: None,
        }
    }

    /// Is this an enumerated entity type?
    pub fn is_enum(&self) -> bool {
        matches!(self.kind, EntityTypeKind::Enum { .. })
    }
}

/// An entity type is either standard or enumerated, never both
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityTypeKind {
    /// Entity type with parents, attributes and tags
    Standard(StandardEntityType),
    /// Entity type whose only entities have the listed IDs
    Enum {
        /// Entity IDs, in declaration order
        choices: NonEmpty<SmolStr>,
    },
}

/// Body of a standard entity type declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandardEntityType {
    /// Entity types that entities of this type can be members of
    pub member_of: Vec<Name>,
    /// Attributes. `None` when no shape was written, which is not the same
    /// declaration as an explicit empty record.
    pub shape: Option<RecordType>,
    /// Type of the values of entity tags, if the entity type has tags
    pub tags: Option<Type>,
}

/// Declaration of an action
#[derive(Educe, Debug, Clone, Default)]
#[educe(PartialEq, Eq)]
pub struct Action {
    /// Action groups this action belongs to
    pub member_of: Vec<ActionRef>,
    /// Principal, resource and context types. `None` for an action that only
    /// serves as a group.
    pub applies_to: Option<AppliesTo>,
    /// Annotations
    pub annotations: Annotations,
    /// Source location of the declared name, when parsed from text
    #[educe(PartialEq(ignore))]
    pub loc: Option<Loc>,
}

/// Reference to an action, e.g. in `memberOf`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionRef {
    /// Action entity type. `None` is shorthand for `Action` in the namespace
    /// of the referring declaration.
    pub ty: Option<Name>,
    /// Action ID
    pub id: SmolStr,
}

impl ActionRef {
    /// A reference to the action `id` of the default action entity type
    pub fn default_type(id: impl Into<SmolStr>) -> Self {
        Self {
            ty: None,
            id: id.into(),
        }
    }
}

/// The `appliesTo` block of an action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliesTo {
    /// Principal entity types
    pub principal_types: Vec<Name>,
    /// Resource entity types
    pub resource_types: Vec<Name>,
    /// Context type, which must resolve to a record
    pub context: Option<Type>,
}

/// Declaration of a common type
#[derive(Educe, Debug, Clone)]
#[educe(PartialEq, Eq)]
pub struct CommonType {
    /// The aliased type
    pub ty: Type,
    /// Annotations
    pub annotations: Annotations,
    /// Source location of the declared name, when parsed from text
    #[educe(PartialEq(ignore))]
    pub loc: Option<Loc>,
}

impl CommonType {
    /// A common type with no annotations
    pub fn new(ty: impl Into<Type>) -> Self {
        Self {
            ty: ty.into(),
            annotations: Annotations::new(),
            loc: None,
        }
    }
}
