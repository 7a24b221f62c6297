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

//! Conversion from the schema AST to the raw JSON structures.

use smol_str::{SmolStr, ToSmolStr};

use super::err::{JsonSchemaError, JsonSchemaErrorKind, Result};
use super::raw::{
    CheckedMap, JsonAction, JsonActionRef, JsonAppliesTo, JsonEntityType, JsonNamespace,
    JsonSchema, JsonType,
};
use super::SchemaPath;
use crate::ast::{
    Action, Annotations, AppliesTo, EntityType, EntityTypeKind, Name, Namespace, PrimitiveType,
    RecordType, Schema, Type,
};
use crate::nesting::too_deep;

/// `type` tags with a fixed meaning, which a common type reference cannot
/// use as its tag
const TYPE_TAGS: [&str; 9] = [
    "String",
    "Long",
    "Bool",
    "Boolean",
    "Set",
    "Record",
    "Entity",
    "EntityOrCommon",
    "Extension",
];

fn emit_annotations(annotations: &Annotations) -> CheckedMap<SmolStr> {
    annotations
        .iter()
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect()
}

fn emit_names(names: &[Name]) -> Vec<SmolStr> {
    names.iter().map(ToSmolStr::to_smolstr).collect()
}

pub(crate) fn emit_schema(schema: &Schema) -> Result<JsonSchema> {
    let root = SchemaPath::root();
    schema
        .namespaces
        .iter()
        .map(|(name, ns)| {
            let key = name
                .as_ref()
                .map(ToSmolStr::to_smolstr)
                .unwrap_or_default();
            let path = root.child(key.clone());
            Ok((key, emit_namespace(ns, &path)?))
        })
        .collect::<Result<Vec<_>>>()
        .map(|entries| entries.into_iter().collect())
}

fn emit_namespace(ns: &Namespace, path: &SchemaPath) -> Result<JsonNamespace> {
    let ct_path = path.child("commonTypes");
    let common_types = ns
        .common_types
        .iter()
        .map(|(id, ct)| {
            let mut ty = emit_type(&ct.ty, &ct_path.child(id.as_str()), Owner::Declaration, 0)?;
            ty.annotations = emit_annotations(&ct.annotations);
            Ok((id.as_str(), ty))
        })
        .collect::<Result<Vec<_>>>()?;
    let et_path = path.child("entityTypes");
    let entity_types = ns
        .entity_types
        .iter()
        .map(|(id, ety)| Ok((id.as_str(), emit_entity_type(ety, &et_path.child(id.as_str()))?)))
        .collect::<Result<Vec<_>>>()?;
    let action_path = path.child("actions");
    let actions = ns
        .actions
        .iter()
        .map(|(id, action)| Ok((id.as_str(), emit_action(action, &action_path.child(id.clone()))?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(JsonNamespace {
        annotations: emit_annotations(&ns.annotations),
        common_types: common_types.into_iter().collect(),
        entity_types: entity_types.into_iter().collect(),
        actions: actions.into_iter().collect(),
    })
}

fn emit_entity_type(ety: &EntityType, path: &SchemaPath) -> Result<JsonEntityType> {
    let mut json = match &ety.kind {
        EntityTypeKind::Enum { choices } => JsonEntityType {
            choices: Some(choices.iter().cloned().collect()),
            ..JsonEntityType::default()
        },
        EntityTypeKind::Standard(body) => JsonEntityType {
            member_of_types: (!body.member_of.is_empty()).then(|| emit_names(&body.member_of)),
            shape: body
                .shape
                .as_ref()
                .map(|shape| emit_record(shape, &path.child("shape"), Owner::Nested, 0))
                .transpose()?,
            tags: body
                .tags
                .as_ref()
                .map(|tags| emit_type(tags, &path.child("tags"), Owner::Nested, 0))
                .transpose()?,
            ..JsonEntityType::default()
        },
    };
    json.annotations = emit_annotations(&ety.annotations);
    Ok(json)
}

fn emit_action(action: &Action, path: &SchemaPath) -> Result<JsonAction> {
    let member_of = action
        .member_of
        .iter()
        .map(|r| JsonActionRef {
            ty: r.ty.as_ref().map(ToSmolStr::to_smolstr),
            id: r.id.clone(),
        })
        .collect::<Vec<_>>();
    Ok(JsonAction {
        member_of: (!member_of.is_empty()).then_some(member_of),
        applies_to: action
            .applies_to
            .as_ref()
            .map(|a| emit_applies_to(a, &path.child("appliesTo")))
            .transpose()?,
        annotations: emit_annotations(&action.annotations),
    })
}

fn emit_applies_to(applies_to: &AppliesTo, path: &SchemaPath) -> Result<JsonAppliesTo> {
    Ok(JsonAppliesTo {
        principal_types: Some(emit_names(&applies_to.principal_types)),
        resource_types: Some(emit_names(&applies_to.resource_types)),
        context: applies_to
            .context
            .as_ref()
            .map(|ctx| emit_type(ctx, &path.child("context"), Owner::Nested, 0))
            .transpose()?,
    })
}

/// Who the `annotations` of an emitted type object belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Owner {
    /// The enclosing attribute or common type declaration
    Declaration,
    /// The type itself
    Nested,
}

/// `depth` is the number of `Set` and record types enclosing `ty`
fn emit_type(ty: &Type, path: &SchemaPath, owner: Owner, depth: usize) -> Result<JsonType> {
    if matches!(ty, Type::Set(_) | Type::Record(_)) && too_deep(depth + 1) {
        return Err(JsonSchemaError::new(JsonSchemaErrorKind::NestingTooDeep, path));
    }
    Ok(match ty {
        Type::Primitive(PrimitiveType::Bool) => JsonType::tagged("Boolean"),
        Type::Primitive(prim) => JsonType::tagged(prim.as_str()),
        Type::Set(element) => JsonType {
            element: Some(Box::new(emit_type(
                element,
                &path.child("element"),
                Owner::Nested,
                depth + 1,
            )?)),
            ..JsonType::tagged("Set")
        },
        Type::Record(rty) => emit_record(rty, path, owner, depth)?,
        Type::EntityRef(name) => JsonType {
            name: Some(name.to_smolstr()),
            ..JsonType::tagged("Entity")
        },
        Type::CommonRef(name) if !TYPE_TAGS.contains(&name.to_smolstr().as_str()) => {
            JsonType::tagged(name.to_smolstr())
        }
        Type::CommonRef(name) | Type::EntityOrCommon(name) => JsonType {
            name: Some(name.to_smolstr()),
            ..JsonType::tagged("EntityOrCommon")
        },
        Type::Extension(id) => JsonType {
            name: Some(id.as_str().into()),
            ..JsonType::tagged("Extension")
        },
    })
}

fn emit_record(
    rty: &RecordType,
    path: &SchemaPath,
    owner: Owner,
    depth: usize,
) -> Result<JsonType> {
    if owner == Owner::Declaration && !rty.annotations.is_empty() {
        return Err(JsonSchemaError::new(
            JsonSchemaErrorKind::Unsupported(
                "annotations on a record type that is directly the type of an attribute or common type",
            ),
            path,
        ));
    }
    let attrs_path = path.child("attributes");
    let attributes = rty
        .attributes
        .iter()
        .map(|(key, attr)| {
            let mut json = emit_type(
                &attr.ty,
                &attrs_path.child(key.clone()),
                Owner::Declaration,
                depth + 1,
            )?;
            json.required = (!attr.required).then_some(false);
            json.annotations = emit_annotations(&attr.annotations);
            Ok((key.clone(), json))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(JsonType {
        attributes: Some(attributes.into_iter().collect()),
        annotations: emit_annotations(&rty.annotations),
        ..JsonType::tagged("Record")
    })
}
