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
//! The resolved view of a schema: every name fully qualified, every common
//! type inlined and both hierarchies transitively closed.

use nonempty::NonEmpty;
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use crate::ast::{Annotations, Id, Name, PrimitiveType};
use crate::transitive_closure::TCNode;

/// Unique id of an entity: its fully-qualified type and its ID string. Action
/// IDs use the entity type `<namespace>::Action`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityUid {
    ty: Name,
    id: SmolStr,
}

impl EntityUid {
    /// Build an entity UID
    pub fn new(ty: Name, id: impl Into<SmolStr>) -> Self {
        Self { ty, id: id.into() }
    }

    /// The entity type
    pub fn entity_type(&self) -> &Name {
        &self.ty
    }

    /// The entity ID
    pub fn id(&self) -> &SmolStr {
        &self.id
    }
}

impl Display for EntityUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::", self.ty)?;
        crate::fmt::write_quoted(f, &self.id)
    }
}

/// A type with nothing left to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedType {
    /// `String`, `Long` or `Bool`
    Primitive(PrimitiveType),
    /// Homogeneous set
    Set(Box<ResolvedType>),
    /// Record
    Record(ResolvedRecord),
    /// Entity of the named, fully-qualified entity type
    Entity(Name),
    /// Enabled extension type
    Extension(Id),
}

impl ResolvedType {
    /// Shorthand for a set of `element`
    pub fn set(element: ResolvedType) -> Self {
        Self::Set(Box::new(element))
    }

    /// The record, if this type is one
    pub fn as_record(&self) -> Option<&ResolvedRecord> {
        match self {
            Self::Record(rty) => Some(rty),
            _ => None,
        }
    }

    /// The number of `Set` and record types enclosing one another along the
    /// deepest path through this type
    pub fn nesting_depth(&self) -> usize {
        let mut max = 0;
        let mut pending = vec![(self, 0)];
        while let Some((ty, depth)) = pending.pop() {
            match ty {
                Self::Set(element) => pending.push((element.as_ref(), depth + 1)),
                Self::Record(rty) => {
                    max = max.max(depth + 1);
                    pending.extend(rty.attributes.values().map(|attr| (&attr.ty, depth + 1)));
                }
                Self::Primitive(_) | Self::Entity(_) | Self::Extension(_) => max = max.max(depth),
            }
        }
        max
    }
}

impl From<PrimitiveType> for ResolvedType {
    fn from(prim: PrimitiveType) -> Self {
        Self::Primitive(prim)
    }
}

/// Resolved record type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRecord {
    /// Attributes by key
    pub attributes: BTreeMap<SmolStr, ResolvedAttribute>,
    /// Annotations on the record type itself
    pub annotations: Annotations,
}

impl ResolvedRecord {
    /// Get the attribute with key `key`, if present
    pub fn attr(&self, key: &str) -> Option<&ResolvedAttribute> {
        self.attributes.get(key)
    }

    /// Does the record have no attributes?
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Resolved record attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttribute {
    /// Attribute type
    pub ty: ResolvedType,
    /// Must the attribute be present?
    pub required: bool,
    /// Attribute annotations
    pub annotations: Annotations,
}

/// Whether a resolved entity type is standard or enumerated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedEntityKind {
    /// Any entity ID is valid
    Standard,
    /// Only these entities exist
    Enum {
        /// The entities, in declaration order
        choices: NonEmpty<EntityUid>,
    },
}

/// Contains entity type information. The `memberOf` relation is kept as
/// written and also reversed to `descendants`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntityType {
    /// The name of the entity type.
    pub(crate) name: Name,

    /// Entity types this type was declared to be a member of.
    pub member_of_types: BTreeSet<Name>,

    /// The set of entity types that can be members of this entity type,
    /// directly or transitively.
    pub descendants: BTreeSet<Name>,

    /// Attributes. Empty for enumerated entity types and for entity types
    /// declared without a shape.
    pub attributes: ResolvedRecord,

    /// Type of tag values, if entities of this type have tags
    pub tags: Option<ResolvedType>,

    /// Standard or enumerated
    pub kind: ResolvedEntityKind,

    /// Annotations on the declaration
    pub annotations: Annotations,
}

impl ResolvedEntityType {
    /// The fully-qualified name of the entity type
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Get the type of the attribute with the given key, if it exists
    pub fn attr(&self, attr: &str) -> Option<&ResolvedAttribute> {
        self.attributes.attr(attr)
    }

    /// The entities of an enumerated entity type
    pub fn enum_choices(&self) -> Option<&NonEmpty<EntityUid>> {
        match &self.kind {
            ResolvedEntityKind::Standard => None,
            ResolvedEntityKind::Enum { choices } => Some(choices),
        }
    }
}

impl TCNode<Name> for ResolvedEntityType {
    fn get_key(&self) -> Name {
        self.name.clone()
    }

    fn add_edge_to(&mut self, k: Name) {
        self.descendants.insert(k);
    }

    fn out_edges(&self) -> Box<dyn Iterator<Item = &Name> + '_> {
        Box::new(self.descendants.iter())
    }

    fn has_edge_to(&self, e: &Name) -> bool {
        self.descendants.contains(e)
    }
}

/// Principal, resource and context types of an action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAppliesTo {
    /// Principal entity types
    pub principal_types: BTreeSet<Name>,
    /// Resource entity types
    pub resource_types: BTreeSet<Name>,
    /// Context record; empty when none was declared
    pub context: ResolvedRecord,
}

/// Contains information about an action. As for entity types, the `memberOf`
/// relation is also reversed to `descendants`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    /// The UID of the action.
    pub(crate) uid: EntityUid,

    /// Action groups this action was declared to be a member of
    pub member_of: BTreeSet<EntityUid>,

    /// The set of actions that are members of this action, directly or
    /// transitively.
    pub descendants: BTreeSet<EntityUid>,

    /// `None` for an action that only serves as a group
    pub applies_to: Option<ResolvedAppliesTo>,

    /// Annotations on the declaration
    pub annotations: Annotations,
}

impl ResolvedAction {
    /// The UID of the action
    pub fn uid(&self) -> &EntityUid {
        &self.uid
    }

    /// The context record, if the action has an `appliesTo` block
    pub fn context(&self) -> Option<&ResolvedRecord> {
        self.applies_to.as_ref().map(|applies_to| &applies_to.context)
    }
}

impl TCNode<EntityUid> for ResolvedAction {
    fn get_key(&self) -> EntityUid {
        self.uid.clone()
    }

    fn add_edge_to(&mut self, k: EntityUid) {
        self.descendants.insert(k);
    }

    fn out_edges(&self) -> Box<dyn Iterator<Item = &EntityUid> + '_> {
        Box::new(self.descendants.iter())
    }

    fn has_edge_to(&self, e: &EntityUid) -> bool {
        self.descendants.contains(e)
    }
}

/// A fully resolved schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub(crate) entity_types: BTreeMap<Name, ResolvedEntityType>,
    pub(crate) actions: BTreeMap<EntityUid, ResolvedAction>,
    pub(crate) namespaces: BTreeMap<Option<Name>, Annotations>,
}

impl ResolvedSchema {
    /// Look up an entity type by its fully-qualified name
    pub fn entity_type(&self, name: &Name) -> Option<&ResolvedEntityType> {
        self.entity_types.get(name)
    }

    /// Iterate over the entity types, in name order
    pub fn entity_types(&self) -> impl Iterator<Item = (&Name, &ResolvedEntityType)> {
        self.entity_types.iter()
    }

    /// Look up an action by its UID
    pub fn action(&self, uid: &EntityUid) -> Option<&ResolvedAction> {
        self.actions.get(uid)
    }

    /// Iterate over the actions, in UID order
    pub fn actions(&self) -> impl Iterator<Item = (&EntityUid, &ResolvedAction)> {
        self.actions.iter()
    }

    /// Annotations of each namespace, by fully-qualified path (`None` for the
    /// anonymous namespace)
    pub fn namespaces(&self) -> impl Iterator<Item = (Option<&Name>, &Annotations)> {
        self.namespaces.iter().map(|(ns, annos)| (ns.as_ref(), annos))
    }

    /// Annotations of one namespace, if it was declared
    pub fn namespace_annotations(&self, ns: Option<&Name>) -> Option<&Annotations> {
        self.namespaces.get(&ns.cloned())
    }

    /// The `Action` entity types of every namespace that declares actions
    pub fn action_entity_types(&self) -> BTreeSet<&Name> {
        self.actions.keys().map(EntityUid::entity_type).collect()
    }

    /// Is `name` a declared entity type or the action entity type of a
    /// namespace?
    pub fn is_known_entity_type(&self, name: &Name) -> bool {
        self.entity_types.contains_key(name) || self.actions.keys().any(|uid| uid.ty == *name)
    }
}
