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

//! Conversion from the raw JSON structures to the schema AST, validating
//! names and type objects along the way.

use nonempty::NonEmpty;
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet};

use super::err::{JsonSchemaError, JsonSchemaErrorKind, Result};
use super::raw::{
    CheckedMap, JsonAction, JsonActionRef, JsonAppliesTo, JsonEntityType, JsonNamespace,
    JsonSchema, JsonType,
};
use super::SchemaPath;
use crate::ast::{
    Action, ActionRef, Annotations, AppliesTo, Attribute, CommonType, EntityType, Id, Name,
    Namespace, PrimitiveType, RecordType, Schema, Type,
};
use crate::extensions::Extensions;
use crate::nesting::too_deep;

/// Where a type object appears, which decides who owns its `annotations`
/// and whether it may say `required`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Value of a record attribute: `annotations` and `required` belong to
    /// the attribute
    Attribute,
    /// Value of a common type declaration: `annotations` belong to the
    /// declaration
    CommonType,
    /// Anywhere else: `annotations` are allowed only on records
    Nested,
}

fn parse_id(s: &str, path: &SchemaPath) -> Result<Id> {
    s.parse().map_err(|err| {
        JsonSchemaError::new(
            JsonSchemaErrorKind::InvalidName {
                name: s.into(),
                err,
            },
            path,
        )
    })
}

fn parse_name(s: &str, path: &SchemaPath) -> Result<Name> {
    s.parse().map_err(|err| {
        JsonSchemaError::new(
            JsonSchemaErrorKind::InvalidName {
                name: s.into(),
                err,
            },
            path,
        )
    })
}

fn parse_names(names: Option<Vec<SmolStr>>, path: &SchemaPath) -> Result<Vec<Name>> {
    names
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, name)| parse_name(name, &path.child(i.to_string())))
        .collect()
}

fn load_annotations(raw: CheckedMap<SmolStr>, path: &SchemaPath) -> Result<Annotations> {
    let path = path.child("annotations");
    raw.checked(&path)?
        .into_iter()
        .map(|(key, value)| parse_id(&key, &path.child(key.clone())).map(|id| (id, value)))
        .collect()
}

pub(crate) fn load_schema(raw: JsonSchema) -> Result<Schema> {
    let root = SchemaPath::root();
    let mut schema = Schema::new();
    for (key, ns) in raw.checked(&root)? {
        let path = root.child(key.clone());
        let ns_name = if key.is_empty() {
            None
        } else {
            Some(parse_name(&key, &path)?)
        };
        schema.namespaces.insert(ns_name, load_namespace(ns, &path)?);
    }
    Ok(schema)
}

fn load_namespace(raw: JsonNamespace, path: &SchemaPath) -> Result<Namespace> {
    let mut ns = Namespace {
        annotations: load_annotations(raw.annotations, path)?,
        ..Namespace::default()
    };

    let ct_path = path.child("commonTypes");
    for (key, raw_ty) in raw.common_types.checked(&ct_path)? {
        let path = ct_path.child(key.clone());
        let id = parse_id(&key, &path)?;
        let annotations = load_annotations(raw_ty.annotations.clone(), &path)?;
        let ty = load_type(raw_ty, &path, Position::CommonType, 0)?;
        ns.common_types.insert(
            id,
            CommonType {
                ty,
                annotations,
                loc: None,
            },
        );
    }

    let et_path = path.child("entityTypes");
    for (key, raw_ety) in raw.entity_types.checked(&et_path)? {
        let path = et_path.child(key.clone());
        let id = parse_id(&key, &path)?;
        ns.entity_types.insert(id, load_entity_type(raw_ety, &path)?);
    }

    let action_path = path.child("actions");
    for (key, raw_action) in raw.actions.checked(&action_path)? {
        let path = action_path.child(key.clone());
        let action = load_action(raw_action, &path)?;
        ns.actions.insert(key, action);
    }
    Ok(ns)
}

fn load_entity_type(raw: JsonEntityType, path: &SchemaPath) -> Result<EntityType> {
    let annotations = load_annotations(raw.annotations, path)?;
    let mut ety = match raw.choices {
        Some(choices) => {
            let conflicting = [
                ("shape", raw.shape.is_some()),
                ("tags", raw.tags.is_some()),
                ("memberOfTypes", raw.member_of_types.is_some()),
            ];
            if let Some((field, _)) = conflicting.into_iter().find(|(_, present)| *present) {
                return Err(JsonSchemaError::new(
                    JsonSchemaErrorKind::EnumWithField(field),
                    path,
                ));
            }
            let path = path.child("enum");
            let mut seen = BTreeSet::new();
            for choice in &choices {
                if !seen.insert(choice) {
                    return Err(JsonSchemaError::new(
                        JsonSchemaErrorKind::DuplicateEnumValue(choice.clone()),
                        &path,
                    ));
                }
            }
            let choices = NonEmpty::from_vec(choices).ok_or_else(|| {
                JsonSchemaError::new(JsonSchemaErrorKind::EmptyEnum, &path)
            })?;
            EntityType::enumeration(choices)
        }
        None => {
            let member_of = parse_names(raw.member_of_types, &path.child("memberOfTypes"))?;
            let shape = raw
                .shape
                .map(|shape| {
                    let path = path.child("shape");
                    match load_type(shape, &path, Position::Nested, 0)? {
                        Type::Record(rty) => Ok(rty),
                        _ => Err(JsonSchemaError::new(
                            JsonSchemaErrorKind::NotARecord("shape"),
                            &path,
                        )),
                    }
                })
                .transpose()?;
            let tags = raw
                .tags
                .map(|tags| load_type(tags, &path.child("tags"), Position::Nested, 0))
                .transpose()?;
            EntityType::standard(member_of, shape, tags)
        }
    };
    ety.annotations = annotations;
    Ok(ety)
}

fn load_action(raw: JsonAction, path: &SchemaPath) -> Result<Action> {
    let member_of_path = path.child("memberOf");
    let member_of = raw
        .member_of
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, r)| load_action_ref(r, &member_of_path.child(i.to_string())))
        .collect::<Result<Vec<_>>>()?;
    let applies_to = raw
        .applies_to
        .map(|a| load_applies_to(a, &path.child("appliesTo")))
        .transpose()?;
    Ok(Action {
        member_of,
        applies_to,
        annotations: load_annotations(raw.annotations, path)?,
        loc: None,
    })
}

fn load_action_ref(raw: JsonActionRef, path: &SchemaPath) -> Result<ActionRef> {
    let ty = raw
        .ty
        .map(|ty| parse_name(&ty, &path.child("type")))
        .transpose()?;
    Ok(ActionRef { ty, id: raw.id })
}

fn load_applies_to(raw: JsonAppliesTo, path: &SchemaPath) -> Result<AppliesTo> {
    Ok(AppliesTo {
        principal_types: parse_names(raw.principal_types, &path.child("principalTypes"))?,
        resource_types: parse_names(raw.resource_types, &path.child("resourceTypes"))?,
        context: raw
            .context
            .map(|ctx| load_type(ctx, &path.child("context"), Position::Nested, 0))
            .transpose()?,
    })
}

/// Which optional fields of a type object are present
fn present_fields(raw: &JsonType) -> [(&'static str, bool); 3] {
    [
        ("element", raw.element.is_some()),
        ("attributes", raw.attributes.is_some()),
        ("name", raw.name.is_some()),
    ]
}

/// `depth` is the number of `Set` and record types enclosing `raw`
fn load_type(raw: JsonType, path: &SchemaPath, position: Position, depth: usize) -> Result<Type> {
    if raw.required.is_some() && position != Position::Attribute {
        return Err(JsonSchemaError::new(
            JsonSchemaErrorKind::MisplacedRequired,
            path,
        ));
    }
    let type_name = raw.type_name.clone();
    let allowed: &[&str] = match type_name.as_str() {
        "Set" => &["element"],
        "Record" => &["attributes"],
        "Entity" | "EntityOrCommon" | "Extension" => &["name"],
        _ => &[],
    };
    if let Some((field, _)) = present_fields(&raw)
        .into_iter()
        .find(|(field, present)| *present && !allowed.contains(field))
    {
        return Err(JsonSchemaError::new(
            JsonSchemaErrorKind::UnexpectedField { type_name, field },
            path,
        ));
    }
    if !raw.annotations.is_empty() && position == Position::Nested && type_name != "Record" {
        return Err(JsonSchemaError::new(
            JsonSchemaErrorKind::MisplacedAnnotations,
            path,
        ));
    }
    let missing = |field: &'static str| {
        JsonSchemaError::new(
            JsonSchemaErrorKind::MissingField {
                type_name: type_name.clone(),
                field,
            },
            path,
        )
    };

    if matches!(type_name.as_str(), "Set" | "Record") && too_deep(depth + 1) {
        return Err(JsonSchemaError::new(JsonSchemaErrorKind::NestingTooDeep, path));
    }

    match type_name.as_str() {
        "Set" => {
            let element = raw.element.ok_or_else(|| {
                JsonSchemaError::new(JsonSchemaErrorKind::SetMissingElement, path)
            })?;
            Ok(Type::set(load_type(
                *element,
                &path.child("element"),
                Position::Nested,
                depth + 1,
            )?))
        }
        "Record" => {
            let attrs_path = path.child("attributes");
            let raw_attrs = raw.attributes.ok_or_else(|| missing("attributes"))?;
            let mut attributes = BTreeMap::new();
            for (key, raw_attr) in raw_attrs.checked(&attrs_path)? {
                let path = attrs_path.child(key.clone());
                let required = raw_attr.required.unwrap_or(true);
                let annotations = load_annotations(raw_attr.annotations.clone(), &path)?;
                let ty = load_type(raw_attr, &path, Position::Attribute, depth + 1)?;
                attributes.insert(
                    key,
                    Attribute {
                        ty,
                        required,
                        annotations,
                    },
                );
            }
            let annotations = match position {
                Position::Nested => load_annotations(raw.annotations, path)?,
                Position::Attribute | Position::CommonType => Annotations::new(),
            };
            Ok(Type::Record(RecordType {
                attributes,
                annotations,
            }))
        }
        "Entity" => {
            let name = raw.name.ok_or_else(|| missing("name"))?;
            Ok(Type::EntityRef(parse_name(&name, &path.child("name"))?))
        }
        "EntityOrCommon" => {
            let name = raw.name.ok_or_else(|| missing("name"))?;
            Ok(Type::EntityOrCommon(parse_name(&name, &path.child("name"))?))
        }
        "Extension" => {
            let name = raw.name.ok_or_else(|| missing("name"))?;
            if Extensions::is_known(&name) {
                Ok(Type::Extension(parse_id(&name, &path.child("name"))?))
            } else {
                Err(JsonSchemaError::new(
                    JsonSchemaErrorKind::UnknownExtension(name),
                    &path.child("name"),
                ))
            }
        }
        other => match PrimitiveType::from_name(other) {
            Some(prim) => Ok(prim.into()),
            None => Ok(Type::CommonRef(parse_name(other, &path.child("type"))?)),
        },
    }
}
