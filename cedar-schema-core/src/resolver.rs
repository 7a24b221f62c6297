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
//! Turns one or more schema ASTs into a [`ResolvedSchema`].
//!
//! Resolution runs in four phases: index every declaration by its
//! fully-qualified name, resolve entity types, resolve actions, then close
//! both hierarchies. Errors do not stop resolution; every problem found is
//! returned together in [`ResolveErrors`].
//!
//! A bare reference `N` written inside namespace `NS` is looked up in this
//! order:
//! 1. the primitive types `String`, `Long`, `Bool` and `Boolean`;
//! 2. a common type `NS::N`;
//! 3. a common type `N` in the anonymous namespace;
//! 4. an entity type `N` in the anonymous namespace;
//! 5. the extension types;
//! 6. otherwise, the entity type `NS::N`, which must be declared.
//!
//! A reference containing `::` is already qualified: it names the common type
//! with that name if there is one, and otherwise an entity type.
//!
//! Common types are inlined on demand and memoized. A common type that is
//! referenced while it is itself being resolved is treated as a reference to
//! an entity type of the same name, which is then reported as undeclared
//! unless such an entity type exists.

use nonempty::NonEmpty;
use smol_str::{SmolStr, ToSmolStr};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

use crate::ast::{
    Action, ActionRef, Annotations, EntityType, EntityTypeKind, Id, Name, PrimitiveType, RecordType, Schema,
    Type,
};
use crate::extensions::Extensions;
use crate::nesting::{stack_exhausted, too_deep};
use crate::parser::Loc;
use crate::transitive_closure::{compute_tc, TcError};

mod err;
pub use err::*;
mod types;
pub use types::*;

/// Basename of the entity type of the actions of a namespace
pub const ACTION_ENTITY_TYPE: &str = "Action";

/// The entity type of the actions declared in `ns`
pub fn action_entity_type(ns: Option<&Name>) -> Name {
    Name::declared_in(ns, Id::new_unchecked(ACTION_ENTITY_TYPE))
}

/// Resolves schemas against a set of enabled extension types
#[derive(Debug, Clone)]
pub struct Resolver<'e> {
    extensions: &'e Extensions,
}

impl<'e> Resolver<'e> {
    /// A resolver that accepts the extension types enabled in `extensions`
    pub fn new(extensions: &'e Extensions) -> Self {
        Self { extensions }
    }

    /// Resolve a single schema
    pub fn resolve(&self, schema: &Schema) -> Result<ResolvedSchema, ResolveErrors> {
        self.resolve_fragments([schema])
    }

    /// Resolve several schema fragments together, as if they were one schema.
    /// References may cross fragments. Declaring the same entity type, action
    /// or common type in two fragments is an error.
    pub fn resolve_fragments<'a>(
        &self,
        fragments: impl IntoIterator<Item = &'a Schema>,
    ) -> Result<ResolvedSchema, ResolveErrors> {
        let mut run = Run::new(self.extensions);
        for fragment in fragments {
            run.index(fragment);
        }
        run.resolve_common_types();
        let entity_types = run.resolve_entity_types();
        let actions = run.resolve_actions();
        let schema = run.close_hierarchies(entity_types, actions);
        match NonEmpty::from_vec(run.errors) {
            None => {
                debug!(
                    entity_types = schema.entity_types.len(),
                    actions = schema.actions.len(),
                    "resolved schema"
                );
                Ok(schema)
            }
            Some(errs) => {
                debug!(errors = errs.len(), "schema resolution failed");
                Err(ResolveErrors::new(errs))
            }
        }
    }
}

/// The declaration a reference appears in, for error messages
#[derive(Debug, Clone)]
struct Site<'a> {
    description: SmolStr,
    loc: Option<&'a Loc>,
}

/// Memoization state of one common type
#[derive(Debug)]
enum CommonEntry<'a> {
    Unresolved {
        ty: &'a Type,
        ns: Option<&'a Name>,
        loc: Option<&'a Loc>,
    },
    InProgress,
    /// The resolved type and its nesting depth, or `None` if resolving the
    /// type reported an error
    Resolved(Option<(ResolvedType, usize)>),
}

/// State of one resolution run
#[derive(Debug)]
struct Run<'a, 'e> {
    extensions: &'e Extensions,
    common_types: BTreeMap<Name, CommonEntry<'a>>,
    entity_types: BTreeMap<Name, (&'a EntityType, Option<&'a Name>)>,
    actions: BTreeMap<EntityUid, (&'a Action, Option<&'a Name>)>,
    /// Declared entity types plus the action entity type of each namespace
    /// that has actions
    known_entity_types: BTreeSet<Name>,
    namespaces: BTreeMap<Option<Name>, Annotations>,
    errors: Vec<ResolveError>,
    /// `Set` and record types enclosing the type being resolved
    depth: usize,
}

impl<'a, 'e> Run<'a, 'e> {
    fn new(extensions: &'e Extensions) -> Self {
        Self {
            extensions,
            common_types: BTreeMap::new(),
            entity_types: BTreeMap::new(),
            actions: BTreeMap::new(),
            known_entity_types: BTreeSet::new(),
            namespaces: BTreeMap::new(),
            errors: Vec::new(),
            depth: 0,
        }
    }

    fn error(&mut self, kind: ResolveErrorKind, loc: Option<&Loc>) {
        self.errors.push(ResolveError::new(kind, loc));
    }

    /// Phase 1: record every declaration of `fragment` under its
    /// fully-qualified name
    fn index(&mut self, fragment: &'a Schema) {
        for (ns, def) in &fragment.namespaces {
            let ns = ns.as_ref();
            let annotations = self.namespaces.entry(ns.cloned()).or_default();
            for (key, value) in def.annotations.iter() {
                annotations.insert(key.clone(), value.clone());
            }

            for (id, ct) in &def.common_types {
                let name = Name::declared_in(ns, id.clone());
                match self.common_types.entry(name) {
                    Entry::Vacant(v) => {
                        v.insert(CommonEntry::Unresolved {
                            ty: &ct.ty,
                            ns,
                            loc: ct.loc.as_ref(),
                        });
                    }
                    Entry::Occupied(o) => {
                        let kind = ResolveErrorKind::DuplicateCommonType(o.key().clone());
                        self.error(kind, ct.loc.as_ref());
                    }
                }
            }

            for (id, ety) in &def.entity_types {
                let name = Name::declared_in(ns, id.clone());
                match self.entity_types.entry(name) {
                    Entry::Vacant(v) => {
                        self.known_entity_types.insert(v.key().clone());
                        v.insert((ety, ns));
                    }
                    Entry::Occupied(o) => {
                        let kind = if o.get().0.is_enum() == ety.is_enum() {
                            ResolveErrorKind::DuplicateEntityType(o.key().clone())
                        } else {
                            ResolveErrorKind::EntityEnumConflict(o.key().clone())
                        };
                        self.error(kind, ety.loc.as_ref());
                    }
                }
            }

            if !def.actions.is_empty() {
                self.known_entity_types.insert(action_entity_type(ns));
            }
            for (id, action) in &def.actions {
                let uid = EntityUid::new(action_entity_type(ns), id.clone());
                match self.actions.entry(uid) {
                    Entry::Vacant(v) => {
                        v.insert((action, ns));
                    }
                    Entry::Occupied(o) => {
                        let kind = ResolveErrorKind::DuplicateAction(o.key().clone());
                        self.error(kind, action.loc.as_ref());
                    }
                }
            }
        }
    }

    /// Resolve every common type, so that errors in unused ones are reported
    /// too. Each one is resolved in its own namespace.
    fn resolve_common_types(&mut self) {
        let names: Vec<Name> = self.common_types.keys().cloned().collect();
        for name in names {
            let site = Site {
                description: format!("common type `{name}`").into(),
                loc: None,
            };
            self.inline_common_type(&name, &site);
        }
    }

    /// Phase 2
    fn resolve_entity_types(&mut self) -> BTreeMap<Name, ResolvedEntityType> {
        let decls: Vec<_> = self
            .entity_types
            .iter()
            .map(|(name, (ety, ns))| (name.clone(), *ety, *ns))
            .collect();
        decls
            .into_iter()
            .map(|(name, ety, ns)| {
                let site = Site {
                    description: format!("entity type `{name}`").into(),
                    loc: ety.loc.as_ref(),
                };
                let resolved = match &ety.kind {
                    EntityTypeKind::Standard(def) => {
                        let mut member_of_types = BTreeSet::new();
                        for parent in &def.member_of {
                            let parent = self.entity_name(parent, ns);
                            if self.known_entity_types.contains(&parent) {
                                member_of_types.insert(parent);
                            } else {
                                let kind = ResolveErrorKind::UnknownEntityParent {
                                    entity: name.clone(),
                                    parent,
                                };
                                self.error(kind, site.loc);
                            }
                        }
                        let attributes = def
                            .shape
                            .as_ref()
                            .and_then(|shape| self.resolve_record(shape, ns, &site))
                            .unwrap_or_default();
                        let tags = def
                            .tags
                            .as_ref()
                            .and_then(|tags| self.resolve_type(tags, ns, &site));
                        ResolvedEntityType {
                            name: name.clone(),
                            member_of_types,
                            descendants: BTreeSet::new(),
                            attributes,
                            tags,
                            kind: ResolvedEntityKind::Standard,
                            annotations: ety.annotations.clone(),
                        }
                    }
                    EntityTypeKind::Enum { choices } => ResolvedEntityType {
                        name: name.clone(),
                        member_of_types: BTreeSet::new(),
                        descendants: BTreeSet::new(),
                        attributes: ResolvedRecord::default(),
                        tags: None,
                        kind: ResolvedEntityKind::Enum {
                            choices: choices.clone().map(|id| EntityUid::new(name.clone(), id)),
                        },
                        annotations: ety.annotations.clone(),
                    },
                };
                (name, resolved)
            })
            .collect()
    }

    /// Phase 3
    fn resolve_actions(&mut self) -> BTreeMap<EntityUid, ResolvedAction> {
        let decls: Vec<_> = self
            .actions
            .iter()
            .map(|(uid, (action, ns))| (uid.clone(), *action, *ns))
            .collect();
        decls
            .into_iter()
            .map(|(uid, action, ns)| {
                let site = Site {
                    description: format!("action `{uid}`").into(),
                    loc: action.loc.as_ref(),
                };
                let mut member_of = BTreeSet::new();
                for parent in &action.member_of {
                    let parent = self.action_uid(parent, ns);
                    if self.actions.contains_key(&parent) {
                        member_of.insert(parent);
                    } else {
                        let kind = ResolveErrorKind::UnknownActionParent {
                            action: uid.clone(),
                            parent,
                        };
                        self.error(kind, site.loc);
                    }
                }
                let applies_to = action.applies_to.as_ref().map(|applies_to| {
                    let principal_types = self.entity_type_list(&applies_to.principal_types, ns, &site);
                    let resource_types = self.entity_type_list(&applies_to.resource_types, ns, &site);
                    let context = match &applies_to.context {
                        None => ResolvedRecord::default(),
                        Some(ty) => match self.resolve_type(ty, ns, &site) {
                            Some(ResolvedType::Record(rty)) => rty,
                            Some(_) => {
                                self.error(ResolveErrorKind::ContextNotRecord(uid.clone()), site.loc);
                                ResolvedRecord::default()
                            }
                            None => ResolvedRecord::default(),
                        },
                    };
                    ResolvedAppliesTo {
                        principal_types,
                        resource_types,
                        context,
                    }
                });
                let resolved = ResolvedAction {
                    uid: uid.clone(),
                    member_of,
                    descendants: BTreeSet::new(),
                    applies_to,
                    annotations: action.annotations.clone(),
                };
                (uid, resolved)
            })
            .collect()
    }

    /// Phase 4: reverse `memberOf` into direct children, then close both
    /// hierarchies, reporting cycles
    fn close_hierarchies(
        &mut self,
        mut entity_types: BTreeMap<Name, ResolvedEntityType>,
        mut actions: BTreeMap<EntityUid, ResolvedAction>,
    ) -> ResolvedSchema {
        let mut entity_children: BTreeMap<Name, BTreeSet<Name>> = BTreeMap::new();
        for (name, ety) in &entity_types {
            for parent in &ety.member_of_types {
                entity_children
                    .entry(parent.clone())
                    .or_default()
                    .insert(name.clone());
            }
        }
        for (name, ety) in entity_types.iter_mut() {
            ety.descendants = entity_children.remove(name).unwrap_or_default();
        }

        let mut action_children: BTreeMap<EntityUid, BTreeSet<EntityUid>> = BTreeMap::new();
        for (uid, action) in &actions {
            for parent in &action.member_of {
                action_children
                    .entry(parent.clone())
                    .or_default()
                    .insert(uid.clone());
            }
        }
        for (uid, action) in actions.iter_mut() {
            action.descendants = action_children.remove(uid).unwrap_or_default();
        }

        if let Err(TcError::HasCycle { vertices_with_loop }) = compute_tc(&mut entity_types, true) {
            let loc = self.entity_loc(vertices_with_loop.first());
            self.error(ResolveErrorKind::EntityTypeCycle(vertices_with_loop), loc);
        }
        if let Err(TcError::HasCycle { vertices_with_loop }) = compute_tc(&mut actions, true) {
            let loc = self.action_loc(vertices_with_loop.first());
            self.error(ResolveErrorKind::ActionCycle(vertices_with_loop), loc);
        }

        ResolvedSchema {
            entity_types,
            actions,
            namespaces: std::mem::take(&mut self.namespaces),
        }
    }

    fn entity_loc(&self, name: &Name) -> Option<&'a Loc> {
        let (ety, _) = self.entity_types.get(name)?;
        let ety: &'a EntityType = *ety;
        ety.loc.as_ref()
    }

    fn action_loc(&self, uid: &EntityUid) -> Option<&'a Loc> {
        let (action, _) = self.actions.get(uid)?;
        let action: &'a Action = *action;
        action.loc.as_ref()
    }

    /// The entity type an entity type reference names. A bare name is looked
    /// up in the anonymous namespace first and otherwise qualified with `ns`.
    fn entity_name(&self, name: &Name, ns: Option<&Name>) -> Name {
        if name.is_unqualified() && self.known_entity_types.contains(name) {
            name.clone()
        } else {
            name.qualify_with(ns)
        }
    }

    /// The UID an action reference names. The action type defaults to the
    /// `Action` type of `ns`, and a bare action type is qualified with `ns`.
    fn action_uid(&self, aref: &ActionRef, ns: Option<&Name>) -> EntityUid {
        let ty = match &aref.ty {
            Some(ty) => ty.qualify_with(ns),
            None => action_entity_type(ns),
        };
        EntityUid::new(ty, aref.id.clone())
    }

    fn entity_type_list(
        &mut self,
        names: &[Name],
        ns: Option<&Name>,
        site: &Site<'_>,
    ) -> BTreeSet<Name> {
        names
            .iter()
            .filter_map(|name| {
                let name = self.entity_name(name, ns);
                self.check_entity_type(name, site)
            })
            .collect()
    }

    /// `Some(name)` if `name` is a declared entity type; otherwise reports it
    fn check_entity_type(&mut self, name: Name, site: &Site<'_>) -> Option<Name> {
        if self.known_entity_types.contains(&name) {
            Some(name)
        } else {
            let kind = ResolveErrorKind::UnknownEntityType {
                name,
                referenced_in: site.description.clone(),
            };
            self.error(kind, site.loc);
            None
        }
    }

    /// Resolve `ty`, written in namespace `ns`. Returns `None` if an error was
    /// reported.
    fn resolve_type(&mut self, ty: &'a Type, ns: Option<&'a Name>, site: &Site<'_>) -> Option<ResolvedType> {
        match ty {
            Type::Primitive(prim) => Some(ResolvedType::Primitive(*prim)),
            Type::Set(element) => {
                if !self.enter(site) {
                    return None;
                }
                let element = self.resolve_type(element, ns, site);
                self.depth -= 1;
                element.map(ResolvedType::set)
            }
            Type::Record(rty) => self.resolve_record(rty, ns, site).map(ResolvedType::Record),
            Type::EntityRef(name) => {
                let name = self.entity_name(name, ns);
                self.check_entity_type(name, site).map(ResolvedType::Entity)
            }
            Type::CommonRef(name) => self.resolve_common_ref(name, ns, site),
            Type::Extension(id) => self.extension(id, site),
            Type::EntityOrCommon(name) => self.resolve_entity_or_common(name, ns, site),
        }
    }

    /// Resolves every attribute, so that all errors are reported
    fn resolve_record(
        &mut self,
        rty: &'a RecordType,
        ns: Option<&'a Name>,
        site: &Site<'_>,
    ) -> Option<ResolvedRecord> {
        if !self.enter(site) {
            return None;
        }
        let mut ok = true;
        let mut attributes = BTreeMap::new();
        for (key, attr) in &rty.attributes {
            match self.resolve_type(&attr.ty, ns, site) {
                Some(ty) => {
                    attributes.insert(
                        key.clone(),
                        ResolvedAttribute {
                            ty,
                            required: attr.required,
                            annotations: attr.annotations.clone(),
                        },
                    );
                }
                None => ok = false,
            }
        }
        self.depth -= 1;
        ok.then(|| ResolvedRecord {
            attributes,
            annotations: rty.annotations.clone(),
        })
    }

    fn resolve_entity_or_common(
        &mut self,
        name: &Name,
        ns: Option<&'a Name>,
        site: &Site<'_>,
    ) -> Option<ResolvedType> {
        if let Some(builtin) = name.as_builtin() {
            return match PrimitiveType::from_name(builtin.as_str()) {
                Some(prim) => Some(prim.into()),
                None => self.extension(builtin, site),
            };
        }
        if !name.is_unqualified() {
            if self.common_types.contains_key(name) {
                return self.inline_common_type(name, site);
            }
            return self
                .check_entity_type(name.clone(), site)
                .map(ResolvedType::Entity);
        }

        let id = name.basename();
        if let Some(prim) = PrimitiveType::from_name(id.as_str()) {
            return Some(prim.into());
        }
        if let Some(common) = self.common_type_name(id, ns) {
            return self.inline_common_type(&common, site);
        }
        if self.known_entity_types.contains(name) {
            return Some(ResolvedType::Entity(name.clone()));
        }
        if Extensions::is_known(id.as_str()) {
            return self.extension(id, site);
        }
        self.check_entity_type(name.qualify_with(ns), site)
            .map(ResolvedType::Entity)
    }

    fn resolve_common_ref(
        &mut self,
        name: &Name,
        ns: Option<&'a Name>,
        site: &Site<'_>,
    ) -> Option<ResolvedType> {
        let common = if name.is_unqualified() {
            self.common_type_name(name.basename(), ns)
        } else {
            self.common_types.contains_key(name).then(|| name.clone())
        };
        match common {
            Some(common) => self.inline_common_type(&common, site),
            None => match PrimitiveType::from_name(name.basename().as_str()) {
                Some(prim) if name.is_unqualified() => Some(prim.into()),
                _ => {
                    let kind = ResolveErrorKind::UnknownCommonType {
                        name: name.clone(),
                        referenced_in: site.description.clone(),
                    };
                    self.error(kind, site.loc);
                    None
                }
            },
        }
    }

    /// The declared common type a bare `id` written in `ns` names: `ns::id`
    /// if declared, otherwise `id` in the anonymous namespace if declared
    fn common_type_name(&self, id: &Id, ns: Option<&Name>) -> Option<Name> {
        let local = Name::declared_in(ns, id.clone());
        if self.common_types.contains_key(&local) {
            return Some(local);
        }
        let top = Name::unqualified(id.clone());
        self.common_types.contains_key(&top).then_some(top)
    }

    /// Resolve the common type `name`, which must be declared, through the
    /// cache. `site` is where the reference to it appears.
    fn inline_common_type(&mut self, name: &Name, site: &Site<'_>) -> Option<ResolvedType> {
        let entry = self.common_types.get_mut(name)?;
        match std::mem::replace(entry, CommonEntry::InProgress) {
            CommonEntry::Unresolved { ty, ns, loc } => {
                trace!(common_type = %name, "resolving common type");
                let declaration = Site {
                    description: format!("common type `{name}`").into(),
                    loc,
                };
                let resolved = if stack_exhausted() {
                    self.error(ResolveErrorKind::CommonTypeChainTooLong(name.clone()), loc);
                    None
                } else {
                    let enclosing = std::mem::replace(&mut self.depth, 0);
                    let resolved = self.resolve_type(ty, ns, &declaration).map(|ty| {
                        let depth = ty.nesting_depth();
                        (ty, depth)
                    });
                    self.depth = enclosing;
                    resolved
                };
                trace!(common_type = %name, ok = resolved.is_some(), "resolved common type");
                self.common_types
                    .insert(name.clone(), CommonEntry::Resolved(resolved.clone()));
                self.embed(resolved, site)
            }
            CommonEntry::InProgress => {
                trace!(common_type = %name, "common type refers to itself");
                self.check_entity_type(name.clone(), site)
                    .map(ResolvedType::Entity)
            }
            CommonEntry::Resolved(resolved) => {
                self.common_types
                    .insert(name.clone(), CommonEntry::Resolved(resolved.clone()));
                self.embed(resolved, site)
            }
        }
    }

    /// Place an inlined common type inside the `Set` and record types
    /// currently open
    fn embed(
        &mut self,
        resolved: Option<(ResolvedType, usize)>,
        site: &Site<'_>,
    ) -> Option<ResolvedType> {
        let (ty, depth) = resolved?;
        if too_deep(self.depth + depth) {
            self.nesting_error(site);
            return None;
        }
        Some(ty)
    }

    /// Open one more `Set` or record type. Reports an error and returns
    /// `false` if that nests too deep.
    fn enter(&mut self, site: &Site<'_>) -> bool {
        if too_deep(self.depth + 1) {
            self.nesting_error(site);
            return false;
        }
        self.depth += 1;
        true
    }

    fn nesting_error(&mut self, site: &Site<'_>) {
        let kind = ResolveErrorKind::NestingTooDeep {
            referenced_in: site.description.clone(),
        };
        self.error(kind, site.loc);
    }

    fn extension(&mut self, id: &Id, site: &Site<'_>) -> Option<ResolvedType> {
        let kind = if !Extensions::is_known(id.as_str()) {
            ResolveErrorKind::UnknownExtension {
                name: id.to_smolstr(),
                referenced_in: site.description.clone(),
            }
        } else if !self.extensions.is_enabled(id.as_str()) {
            ResolveErrorKind::DisabledExtension {
                name: id.to_smolstr(),
                referenced_in: site.description.clone(),
            }
        } else {
            return Some(ResolvedType::Extension(id.clone()));
        };
        self.error(kind, site.loc);
        None
    }
}

// PANIC SAFETY: unit tests
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{Attribute, CommonType, Namespace};
    use crate::err::{DuplicateKind, ErrorKind};
    use crate::json_schema::from_json_value;
    use crate::nesting::MAX_NESTING_DEPTH;
    use crate::parser::parse_schema;
    use cool_asserts::assert_matches;
    use miette::Diagnostic;
    use serde_json::json;

    const STRING: ResolvedType = ResolvedType::Primitive(PrimitiveType::String);
    const LONG: ResolvedType = ResolvedType::Primitive(PrimitiveType::Long);
    const BOOL: ResolvedType = ResolvedType::Primitive(PrimitiveType::Bool);

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn id(s: &str) -> Id {
        s.parse().unwrap()
    }

    fn uid(ty: &str, id: &str) -> EntityUid {
        EntityUid::new(name(ty), id)
    }

    #[track_caller]
    fn resolve_text(src: &str) -> ResolvedSchema {
        let schema = parse_schema("test.cedarschema", src).unwrap();
        Resolver::new(&Extensions::all_available())
            .resolve(&schema)
            .unwrap_or_else(|errs| panic!("resolution failed: {:?}", miette::Report::new(errs)))
    }

    #[track_caller]
    fn resolve_text_err(src: &str) -> ResolveErrors {
        let schema = parse_schema("test.cedarschema", src).unwrap();
        match Resolver::new(&Extensions::all_available()).resolve(&schema) {
            Ok(resolved) => panic!("expected resolution to fail, got {resolved:?}"),
            Err(errs) => errs,
        }
    }

    #[track_caller]
    fn attr_ty<'a>(resolved: &'a ResolvedSchema, ety: &str, attr: &str) -> &'a ResolvedType {
        &resolved
            .entity_type(&name(ety))
            .unwrap()
            .attr(attr)
            .unwrap()
            .ty
    }

    #[test]
    fn entity_with_shape_and_parents() {
        let resolved = resolve_text(
            r#"entity Group; entity User in [Group] = { "name": String, "age"?: Long };"#,
        );
        let user = resolved.entity_type(&name("User")).unwrap();
        assert_eq!(user.name(), &name("User"));
        assert_eq!(user.member_of_types, BTreeSet::from([name("Group")]));
        assert!(user.attr("name").unwrap().required);
        assert!(!user.attr("age").unwrap().required);
        assert_eq!(user.attr("age").unwrap().ty, LONG);
        let group = resolved.entity_type(&name("Group")).unwrap();
        assert_eq!(group.descendants, BTreeSet::from([name("User")]));
        assert!(group.attributes.is_empty());
    }

    #[test]
    fn extension_in_context() {
        let resolved = resolve_text(
            r#"entity User; entity Doc;
            action view appliesTo { principal: [User], resource: [Doc], context: { "ip": __cedar::ipaddr } };"#,
        );
        let view = resolved.action(&uid("Action", "view")).unwrap();
        assert_eq!(view.uid().to_string(), r#"Action::"view""#);
        let applies_to = view.applies_to.as_ref().unwrap();
        assert_eq!(applies_to.principal_types, BTreeSet::from([name("User")]));
        assert_eq!(applies_to.resource_types, BTreeSet::from([name("Doc")]));
        assert_eq!(
            view.context().unwrap().attr("ip").unwrap().ty,
            ResolvedType::Extension(id("ipaddr"))
        );
    }

    #[test]
    fn anonymous_entity_from_namespace() {
        let resolved = resolve_text("entity GlobalGroup; namespace App { entity User in [GlobalGroup]; }");
        let user = resolved.entity_type(&name("App::User")).unwrap();
        assert_eq!(user.member_of_types, BTreeSet::from([name("GlobalGroup")]));
        assert_eq!(
            resolved.entity_type(&name("GlobalGroup")).unwrap().descendants,
            BTreeSet::from([name("App::User")])
        );
    }

    #[test]
    fn common_types_are_inlined() {
        let resolved = resolve_text(r#"type Name = String; entity U = { "a": Name, "b": Name };"#);
        assert_eq!(*attr_ty(&resolved, "U", "a"), STRING);
        assert_eq!(*attr_ty(&resolved, "U", "b"), STRING);
    }

    #[test]
    fn common_type_lookup_order() {
        let resolved = resolve_text(
            r#"
            type T = Long;
            type Top = { "x": Bool };
            namespace NS {
                type T = String;
                entity E = { "local": T, "top": Top, "qualified": NS::T, "other": Other::C };
            }
            namespace Other { type C = Set<T>; }
            "#,
        );
        assert_eq!(*attr_ty(&resolved, "NS::E", "local"), STRING);
        assert_matches!(attr_ty(&resolved, "NS::E", "top"), ResolvedType::Record(rty) => {
            assert_eq!(rty.attr("x").unwrap().ty, BOOL);
        });
        assert_eq!(*attr_ty(&resolved, "NS::E", "qualified"), STRING);
        // `T` inside `Other` falls back to the top-level common type
        assert_eq!(
            attr_ty(&resolved, "NS::E", "other"),
            &ResolvedType::set(LONG)
        );
    }

    #[test]
    fn entity_reference_lookup_order() {
        let resolved = resolve_text(
            r#"
            entity Shared;
            namespace App {
                entity Shared;
                entity Local;
                entity E = {
                    "shared": Shared,
                    "local": Local,
                    "qualified": App::Shared,
                    "ext": ipaddr,
                    "dec": decimal,
                };
            }
            "#,
        );
        // the anonymous namespace is consulted before the enclosing one
        assert_eq!(*attr_ty(&resolved, "App::E", "shared"), ResolvedType::Entity(name("Shared")));
        assert_eq!(
            attr_ty(&resolved, "App::E", "qualified"),
            &ResolvedType::Entity(name("App::Shared"))
        );
        assert_eq!(*attr_ty(&resolved, "App::E", "local"), ResolvedType::Entity(name("App::Local")));
        assert_eq!(*attr_ty(&resolved, "App::E", "ext"), ResolvedType::Extension(id("ipaddr")));
        assert_eq!(*attr_ty(&resolved, "App::E", "dec"), ResolvedType::Extension(id("decimal")));
    }

    #[test]
    fn boolean_is_bool() {
        let resolved = resolve_text(
            r#"type B = Boolean; entity E = { "a": Boolean, "b": Bool, "c": B, "d": __cedar::Boolean };"#,
        );
        for attr in ["a", "b", "c", "d"] {
            assert_eq!(*attr_ty(&resolved, "E", attr), BOOL, "{attr}");
        }
    }

    #[test]
    fn tags_and_annotations() {
        let resolved = resolve_text(
            r#"@doc("ns") namespace N { @doc("user") entity User tags Set<String>; }"#,
        );
        let user = resolved.entity_type(&name("N::User")).unwrap();
        assert_eq!(user.tags, Some(ResolvedType::set(STRING)));
        assert_eq!(user.annotations.get("doc").unwrap(), "user");
        assert_eq!(
            resolved
                .namespace_annotations(Some(&name("N")))
                .unwrap()
                .get("doc")
                .unwrap(),
            "ns"
        );
    }

    #[test]
    fn enum_entities() {
        let resolved = resolve_text(r#"namespace App { entity Color enum ["red", "green"]; }"#);
        let color = resolved.entity_type(&name("App::Color")).unwrap();
        let choices: Vec<_> = color.enum_choices().unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(choices, vec![r#"App::Color::"red""#, r#"App::Color::"green""#]);
        assert!(color.attributes.is_empty());
    }

    #[test]
    fn action_hierarchy() {
        let resolved = resolve_text(
            r#"
            namespace App {
                action all;
                action read in [all];
                action view in [read, Action::"all"];
                action "edit" in App::Action::"all";
            }
            "#,
        );
        let all = resolved.action(&uid("App::Action", "all")).unwrap();
        assert_eq!(
            all.descendants,
            BTreeSet::from([
                uid("App::Action", "edit"),
                uid("App::Action", "read"),
                uid("App::Action", "view"),
            ])
        );
        let read = resolved.action(&uid("App::Action", "read")).unwrap();
        assert_eq!(read.descendants, BTreeSet::from([uid("App::Action", "view")]));
        let view = resolved.action(&uid("App::Action", "view")).unwrap();
        assert_eq!(
            view.member_of,
            BTreeSet::from([uid("App::Action", "all"), uid("App::Action", "read")])
        );
        assert!(view.applies_to.is_none());
        assert_eq!(
            resolved.action_entity_types(),
            BTreeSet::from([&name("App::Action")])
        );
    }

    #[test]
    fn action_entity_type_is_declared() {
        let resolved = resolve_text(
            r#"namespace App { action view; entity Log = { "action": Action, "q": App::Action }; }"#,
        );
        assert_eq!(*attr_ty(&resolved, "App::Log", "action"), ResolvedType::Entity(name("App::Action")));
        assert!(resolved.is_known_entity_type(&name("App::Action")));
        assert!(!resolved.is_known_entity_type(&name("Action")));
    }

    #[test]
    fn absent_context_is_empty_record() {
        let resolved = resolve_text("entity U; action a appliesTo { principal: U, resource: U };");
        let a = resolved.action(&uid("Action", "a")).unwrap();
        assert!(a.context().unwrap().is_empty());
    }

    #[test]
    fn context_through_common_type() {
        let resolved = resolve_text(
            r#"type Ctx = { "n": Long }; entity U; action a appliesTo { principal: U, resource: U, context: Ctx };"#,
        );
        let a = resolved.action(&uid("Action", "a")).unwrap();
        assert_eq!(a.context().unwrap().attr("n").unwrap().ty, LONG);
    }

    #[test]
    fn context_not_record() {
        let errs = resolve_text_err(
            "type C = Long; entity U; action a appliesTo { principal: U, resource: U, context: C };",
        );
        assert_eq!(errs.kinds().collect::<Vec<_>>(), vec![ErrorKind::ContextNotRecord]);
        assert_eq!(
            errs.to_string(),
            r#"context of action `Action::"a"` is not a record type"#
        );
        assert_eq!(errs.first().loc().unwrap().snippet(), Some("a"));
        assert!(errs.help().is_some());
    }

    #[test]
    fn entity_cycle() {
        let errs = resolve_text_err("entity A in [B]; entity B in [A];");
        assert_eq!(errs.kinds().collect::<Vec<_>>(), vec![ErrorKind::Cycle]);
        assert_matches!(errs.first().error_kind(), ResolveErrorKind::EntityTypeCycle(names) => {
            assert_eq!(names.iter().collect::<Vec<_>>(), vec![&name("A"), &name("B")]);
        });
        assert_eq!(
            errs.to_string(),
            "entity type hierarchy has a cycle through `A`, `B`"
        );
    }

    #[test]
    fn action_cycle() {
        let errs = resolve_text_err("action a in b; action b in c; action c in a; action d in a;");
        assert_matches!(errs.first().error_kind(), ResolveErrorKind::ActionCycle(uids) => {
            assert_eq!(uids.len(), 3);
        });
        assert_eq!(errs.first().kind(), ErrorKind::Cycle);
    }

    #[test]
    fn unknown_parents() {
        let errs = resolve_text_err("entity A in [Missing]; action a in [nope];");
        assert_eq!(
            errs.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec![
                "entity type `A` is a member of undeclared entity type `Missing`",
                r#"action `Action::"a"` is a member of undeclared action `Action::"nope"`"#,
            ]
        );
        assert!(errs.kinds().all(|kind| kind == ErrorKind::UnknownParent));
    }

    #[test]
    fn unknown_references() {
        let errs = resolve_text_err(
            r#"namespace App {
                entity E = { "a": Nope, "b": Other::Thing };
                action a appliesTo { principal: [Ghost], resource: [E] };
            }"#,
        );
        assert_eq!(
            errs.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec![
                "undeclared entity type `App::Nope` referenced in entity type `App::E`",
                "undeclared entity type `Other::Thing` referenced in entity type `App::E`",
                r#"undeclared entity type `App::Ghost` referenced in action `App::Action::"a"`"#,
            ]
        );
        assert!(errs.kinds().all(|kind| kind == ErrorKind::UnknownRef));
        let related = errs.related().unwrap().count();
        assert_eq!(related, 2);
    }

    #[test]
    fn self_referential_common_type() {
        let errs = resolve_text_err(r#"type T = { "next": T }; entity E = { "t": T };"#);
        assert_eq!(
            errs.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["undeclared entity type `T` referenced in common type `T`"]
        );

        // with an entity type of the same name the reference is benign
        let resolved =
            resolve_text(r#"namespace N { entity T; type T = { "t": T }; entity E = { "t": T }; }"#);
        assert_matches!(attr_ty(&resolved, "N::E", "t"), ResolvedType::Record(rty) => {
            assert_eq!(rty.attr("t").unwrap().ty, ResolvedType::Entity(name("N::T")));
        });
    }

    #[test]
    fn mutually_recursive_common_types_report_once() {
        let errs = resolve_text_err("type A = B; type B = A; entity E = { \"a\": A, \"b\": B };");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs.first().kind(), ErrorKind::UnknownRef);
    }

    #[test]
    fn disabled_extension() {
        let schema = parse_schema("", r#"entity E = { "ip": ipaddr, "d": __cedar::decimal };"#).unwrap();
        let exts = Extensions::specific(["decimal"]);
        let errs = Resolver::new(&exts).resolve(&schema).unwrap_err();
        assert_eq!(
            errs.to_string(),
            "extension type `ipaddr` referenced in entity type `E` is not enabled"
        );
        assert_eq!(errs.kinds().collect::<Vec<_>>(), vec![ErrorKind::UnknownType]);
        assert!(Resolver::new(&Extensions::all_available()).resolve(&schema).is_ok());
    }

    #[test]
    fn json_references() {
        let schema = from_json_value(json!({
            "": {
                "commonTypes": { "Ctx": { "type": "Record", "attributes": {} } },
                "entityTypes": {
                    "User": {
                        "shape": {
                            "type": "Record",
                            "attributes": {
                                "flag": { "type": "Boolean" },
                                "manager": { "type": "Entity", "name": "User" },
                                "ctx": { "type": "Ctx" },
                                "either": { "type": "EntityOrCommon", "name": "Ctx" },
                                "ext": { "type": "Extension", "name": "datetime" },
                            }
                        }
                    }
                },
                "actions": {}
            }
        }))
        .unwrap();
        let resolved = Resolver::new(&Extensions::all_available()).resolve(&schema).unwrap();
        assert_eq!(*attr_ty(&resolved, "User", "flag"), BOOL);
        assert_eq!(*attr_ty(&resolved, "User", "manager"), ResolvedType::Entity(name("User")));
        assert_eq!(*attr_ty(&resolved, "User", "ctx"), ResolvedType::Record(ResolvedRecord::default()));
        assert_eq!(*attr_ty(&resolved, "User", "either"), ResolvedType::Record(ResolvedRecord::default()));
        assert_eq!(*attr_ty(&resolved, "User", "ext"), ResolvedType::Extension(id("datetime")));
    }

    #[test]
    fn unknown_common_type_in_json() {
        let schema = from_json_value(json!({
            "NS": {
                "entityTypes": {
                    "E": { "shape": { "type": "Record", "attributes": { "a": { "type": "Missing" } } } }
                },
                "actions": {}
            }
        }))
        .unwrap();
        let errs = Resolver::new(&Extensions::all_available()).resolve(&schema).unwrap_err();
        assert_eq!(
            errs.to_string(),
            "undeclared common type `Missing` referenced in entity type `NS::E`"
        );
        assert_eq!(errs.first().kind(), ErrorKind::UnknownRef);
        assert_eq!(errs.first().loc(), None);
    }

    fn fragment(ns: Option<&str>, def: Namespace) -> Schema {
        let mut schema = Schema::new();
        schema.namespaces.insert(ns.map(name), def);
        schema
    }

    #[test]
    fn fragments_share_declarations() {
        let mut first = Namespace::default();
        first
            .entity_types
            .insert(id("User"), EntityType::standard([name("Shared::Group")], None, None));
        let mut second = Namespace::default();
        second
            .entity_types
            .insert(id("Group"), EntityType::standard(Vec::<Name>::new(), None, None));
        second
            .common_types
            .insert(id("T"), CommonType::new(Type::EntityOrCommon(name("Group"))));
        let fragments = [fragment(Some("App"), first), fragment(Some("Shared"), second)];
        let resolved = Resolver::new(&Extensions::all_available())
            .resolve_fragments(&fragments)
            .unwrap();
        assert_eq!(
            resolved.entity_type(&name("Shared::Group")).unwrap().descendants,
            BTreeSet::from([name("App::User")])
        );
        assert_eq!(resolved.namespaces().count(), 2);
    }

    #[test]
    fn duplicates_across_fragments() {
        let mut def = Namespace::default();
        def.entity_types
            .insert(id("E"), EntityType::standard(Vec::<Name>::new(), None, None));
        def.entity_types
            .insert(id("C"), EntityType::standard(Vec::<Name>::new(), None, None));
        def.actions.insert("act".into(), Action::default());
        def.common_types
            .insert(id("T"), CommonType::new(PrimitiveType::Long));
        let mut enum_def = def.clone();
        enum_def
            .entity_types
            .insert(id("C"), EntityType::enumeration(nonempty::nonempty!["a".into()]));

        let fragments = [fragment(Some("N"), def), fragment(Some("N"), enum_def)];
        let errs = Resolver::new(&Extensions::all_available())
            .resolve_fragments(&fragments)
            .unwrap_err();
        assert_eq!(
            errs.kinds().collect::<Vec<_>>(),
            vec![
                ErrorKind::Duplicate(DuplicateKind::CommonType),
                ErrorKind::EntityEnumConflict,
                ErrorKind::Duplicate(DuplicateKind::EntityType),
                ErrorKind::Duplicate(DuplicateKind::Action),
            ]
        );
        assert_eq!(
            errs.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec![
                "common type `N::T` is declared more than once",
                "`N::C` is declared both as an enumerated and as a standard entity type",
                "entity type `N::E` is declared more than once",
                r#"action `N::Action::"act"` is declared more than once"#,
            ]
        );
    }

    #[test]
    fn resolution_is_repeatable() {
        let schema = parse_schema(
            "",
            r#"type T = { "a": Set<Long> }; entity A; entity B in [A] = { "t": T }; action x appliesTo { principal: B, resource: A };"#,
        )
        .unwrap();
        let copy = schema.clone();
        let extensions = Extensions::all_available();
        let resolver = Resolver::new(&extensions);
        let first = resolver.resolve(&schema).unwrap();
        let second = resolver.resolve(&copy).unwrap();
        assert_eq!(first, second);
        assert_eq!(schema, copy);
    }

    #[test]
    fn records_keep_annotations() {
        let mut def = Namespace::default();
        let mut shape = RecordType::new([(
            SmolStr::from("a"),
            Attribute {
                annotations: [(id("doc"), SmolStr::from("attr"))].into_iter().collect(),
                ..Attribute::required(PrimitiveType::String)
            },
        )]);
        shape.annotations.insert(id("doc"), "record".into());
        def.entity_types
            .insert(id("E"), EntityType::standard(Vec::<Name>::new(), Some(shape), None));
        let resolved = Resolver::new(&Extensions::all_available())
            .resolve(&fragment(None, def))
            .unwrap();
        let ety = resolved.entity_type(&name("E")).unwrap();
        assert_eq!(ety.attributes.annotations.get("doc").unwrap(), "record");
        assert_eq!(ety.attr("a").unwrap().annotations.get("doc").unwrap(), "attr");
    }

    fn nested_sets(depth: usize) -> String {
        format!("{}Long{}", "Set<".repeat(depth), ">".repeat(depth))
    }

    #[test]
    fn inlining_counts_toward_nesting_depth() {
        let src = format!(
            "type Deep = {}; entity Ok {{ a: Long }}; entity E {{ a: Deep }};",
            nested_sets(MAX_NESTING_DEPTH)
        );
        let errs = resolve_text_err(&src);
        assert_eq!(errs.kinds().collect::<Vec<_>>(), vec![ErrorKind::NestingTooDeep]);
        assert_eq!(
            errs.first().to_string(),
            "types in entity type `E` are nested more than 32 deep once common types are inlined"
        );

        let src = format!(
            "type Deep = {}; entity E {{ a: Deep }};",
            nested_sets(MAX_NESTING_DEPTH - 1)
        );
        let resolved = resolve_text(&src);
        assert_eq!(
            resolved.entity_types[&name("E")].attributes.attr("a").unwrap().ty.nesting_depth(),
            MAX_NESTING_DEPTH - 1
        );
    }

    #[test]
    fn chained_common_types_count_toward_nesting_depth() {
        // `T<i>` has depth 40 - i once inlined
        let src: String = (0..40)
            .map(|i| format!("type T{i} = Set<T{}>;\n", i + 1))
            .chain(["type T40 = Long;".to_string()])
            .collect();
        let errs = resolve_text_err(&src);
        assert_eq!(errs.kinds().collect::<Vec<_>>(), vec![ErrorKind::NestingTooDeep]);
        assert_eq!(
            errs.first().to_string(),
            "types in common type `T7` are nested more than 32 deep once common types are inlined"
        );
    }

    #[test]
    fn very_deep_types_are_errors() {
        let mut schema = Schema::new();
        let ty = (0..10_000).fold(Type::from(PrimitiveType::Long), |ty, _| Type::set(ty));
        schema
            .namespace_mut(None)
            .common_types
            .insert(id("T"), CommonType::new(ty));
        let errs = Resolver::new(&Extensions::all_available())
            .resolve(&schema)
            .unwrap_err();
        assert_eq!(errs.kinds().collect::<Vec<_>>(), vec![ErrorKind::NestingTooDeep]);
        let mut ty = schema.namespace_mut(None).common_types.remove(&id("T")).unwrap().ty;
        while let Type::Set(element) = ty {
            ty = *element;
        }

        // each declaration is shallow, but inlining them nests without bound
        let src: String = (0..10_000)
            .map(|i| format!("type T{i} = Set<T{}>;\n", i + 1))
            .chain(["type T10000 = Long;".to_string()])
            .collect();
        let errs = resolve_text_err(&src);
        assert!(errs.kinds().all(|kind| kind == ErrorKind::NestingTooDeep));
    }

    #[test]
    fn long_alias_chains_are_errors() {
        let src: String = (0..20_000)
            .map(|i| format!("type T{i} = T{};\n", i + 1))
            .chain(["type T20000 = Long;".to_string()])
            .collect();
        let errs = resolve_text_err(&src);
        assert!(errs.kinds().all(|kind| kind == ErrorKind::NestingTooDeep));
        assert!(errs
            .iter()
            .all(|err| matches!(err.error_kind(), ResolveErrorKind::CommonTypeChainTooLong(_))));
        assert!(errs.first().to_string().contains("too long to inline"));
    }
}
