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

//! End-to-end tests through the public `Schema` API

// PANIC SAFETY: tests
#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]

use cedar_schema::ast::{CommonType, EntityTypeKind, Id, Name, PrimitiveType, Type};
use cedar_schema::{
    EntityUid, ErrorKind, ResolveErrorKind, ResolvedType, Schema, SchemaError, MAX_NESTING_DEPTH,
};
use cedar_schema_core::test_utils::{expect_err, ExpectedErrorMessageBuilder};
use cool_asserts::assert_matches;
use serde_json::json;
use similar_asserts::assert_eq;
use std::collections::BTreeSet;

fn name(s: &str) -> Name {
    s.parse().unwrap()
}

fn id(s: &str) -> Id {
    s.parse().unwrap()
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[track_caller]
fn text(src: &str) -> Schema {
    init_logging();
    let mut schema = Schema::new();
    schema
        .load_text("test.cedarschema", src.as_bytes())
        .unwrap_or_else(|e| panic!("failed to parse:\n{src}\n{:?}", miette::Report::new(e)));
    schema
}

#[track_caller]
fn json(value: serde_json::Value) -> Schema {
    init_logging();
    let mut schema = Schema::new();
    schema
        .load_json(value.to_string().as_bytes())
        .unwrap_or_else(|e| panic!("failed to load {value}: {e}"));
    schema
}

fn dump_text(schema: &Schema) -> String {
    String::from_utf8(schema.dump_text().unwrap()).unwrap()
}

fn dump_json_value(schema: &Schema) -> serde_json::Value {
    serde_json::from_slice(&schema.dump_json().unwrap()).unwrap()
}

const STRING: ResolvedType = ResolvedType::Primitive(PrimitiveType::String);
const LONG: ResolvedType = ResolvedType::Primitive(PrimitiveType::Long);
const BOOL: ResolvedType = ResolvedType::Primitive(PrimitiveType::Bool);

#[test]
fn basic_round_trip() {
    let src = r#"entity User in [Group] = { "name": String, "age"?: Long };"#;
    let schema = text(src);
    let ns = schema.ast().namespace(None).unwrap();
    assert_eq!(ns.entity_types.len(), 1);
    assert_matches!(&ns.entity_types[&id("User")].kind, EntityTypeKind::Standard(user) => {
        assert_eq!(user.member_of, vec![name("Group")]);
        let shape = user.shape.as_ref().unwrap();
        assert!(shape.attributes["name"].required);
        assert_eq!(shape.attributes["name"].ty, Type::Primitive(PrimitiveType::String));
        assert!(!shape.attributes["age"].required);
        assert_eq!(shape.attributes["age"].ty, Type::Primitive(PrimitiveType::Long));
    });
    assert_eq!(
        dump_text(&schema),
        "entity User in [Group] {\n  age?: Long,\n  name: String,\n};\n"
    );

    // `Group` is not declared
    let errs = schema.resolve().unwrap_err();
    assert_eq!(errs.kinds().collect::<Vec<_>>(), vec![ErrorKind::UnknownParent]);

    let schema = text(&format!("entity Group; {src}"));
    let resolved = schema.resolve().unwrap();
    let user = resolved.entity_type(&name("User")).unwrap();
    assert_eq!(user.member_of_types, BTreeSet::from([name("Group")]));
    let name_attr = user.attr("name").unwrap();
    assert_eq!(name_attr.ty, STRING);
    assert!(name_attr.required);
    let age_attr = user.attr("age").unwrap();
    assert_eq!(age_attr.ty, LONG);
    assert!(!age_attr.required);
    let group = resolved.entity_type(&name("Group")).unwrap();
    assert!(group.descendants.contains(&name("User")));
    assert_eq!(
        dump_text(&schema),
        "entity Group;\n\nentity User in [Group] {\n  age?: Long,\n  name: String,\n};\n"
    );
    assert_eq!(text(&dump_text(&schema)), schema);
}

#[test]
fn extension_in_context() {
    let src = r#"action view appliesTo { principal: [User], resource: [Doc], context: { "ip": __cedar::ipaddr } };"#;
    let errs = text(src).resolve().unwrap_err();
    assert_eq!(
        errs.kinds().collect::<Vec<_>>(),
        vec![ErrorKind::UnknownRef, ErrorKind::UnknownRef]
    );

    let resolved = text(&format!("entity User; entity Doc; {src}")).resolve().unwrap();
    let view_uid = EntityUid::new(name("Action"), "view");
    let view = resolved.action(&view_uid).unwrap();
    assert_eq!(view.uid().to_string(), r#"Action::"view""#);
    let ip = view.context().unwrap().attr("ip").unwrap();
    assert_eq!(ip.ty, ResolvedType::Extension(id("ipaddr")));
    assert!(ip.required);
    let applies_to = view.applies_to.as_ref().unwrap();
    assert_eq!(applies_to.principal_types, BTreeSet::from([name("User")]));
    assert_eq!(applies_to.resource_types, BTreeSet::from([name("Doc")]));
}

#[test]
fn namespace_qualification() {
    let schema = text("entity GlobalGroup; namespace App { entity User in [GlobalGroup]; }");
    let resolved = schema.resolve().unwrap();
    let user = resolved.entity_type(&name("App::User")).unwrap();
    assert_eq!(user.member_of_types, BTreeSet::from([name("GlobalGroup")]));
    assert!(resolved.entity_type(&name("User")).is_none());
    assert!(resolved.entity_type(&name("App::GlobalGroup")).is_none());
    assert_eq!(
        resolved
            .entity_type(&name("GlobalGroup"))
            .unwrap()
            .descendants,
        BTreeSet::from([name("App::User")])
    );
    assert_eq!(
        dump_text(&schema),
        "entity GlobalGroup;\n\nnamespace App {\n  entity User in [GlobalGroup];\n}\n"
    );
}

#[test]
fn common_type_inlining() {
    let schema = text(r#"type Name = String; entity U = { "a": Name, "b": Name };"#);
    let resolved = schema.resolve().unwrap();
    let u = resolved.entity_type(&name("U")).unwrap();
    assert_eq!(u.attr("a").unwrap().ty, STRING);
    assert_eq!(u.attr("b").unwrap().ty, STRING);
    assert_eq!(u.attributes.attributes.len(), 2);
    // the AST keeps the reference
    assert_matches!(
        &schema.ast().namespace(None).unwrap().entity_types[&id("U")].kind,
        EntityTypeKind::Standard(body) => {
            assert_eq!(
                body.shape.as_ref().unwrap().attributes["a"].ty,
                Type::EntityOrCommon(name("Name"))
            );
        }
    );
}

#[test]
fn json_boolean_normalization() {
    let with_tag = |tag: &str| {
        json(json!({ "": {
            "entityTypes": {
                "E": { "shape": { "type": "Record", "attributes": {
                    "flag": { "type": tag },
                    "flags": { "type": "Set", "element": { "type": tag } },
                }}},
            },
            "actions": {},
        }}))
    };
    let bool_schema = with_tag("Bool");
    let boolean_schema = with_tag("Boolean");
    let resolved_bool = bool_schema.resolve().unwrap();
    let resolved_boolean = boolean_schema.resolve().unwrap();
    assert_eq!(resolved_bool, resolved_boolean);
    let e = resolved_bool.entity_type(&name("E")).unwrap();
    assert_eq!(e.attr("flag").unwrap().ty, BOOL);
    assert_eq!(e.attr("flags").unwrap().ty, ResolvedType::set(BOOL));

    let first = bool_schema.dump_json().unwrap();
    assert_eq!(first, boolean_schema.dump_json().unwrap());
    let dumped = dump_json_value(&bool_schema);
    assert_eq!(
        dumped[""]["entityTypes"]["E"]["shape"]["attributes"]["flag"],
        json!({ "type": "Boolean" })
    );
    let mut reloaded = Schema::new();
    reloaded.load_json(&first).unwrap();
    assert_eq!(reloaded.dump_json().unwrap(), first);
}

#[test]
fn cycle_in_entity_hierarchy() {
    let schema = text("entity A in [B]; entity B in [A];");
    let errs = schema.resolve().unwrap_err();
    assert_eq!(errs.len(), 1);
    assert_matches!(errs.first().error_kind(), ResolveErrorKind::EntityTypeCycle(names) => {
        assert_eq!(names.iter().cloned().collect::<BTreeSet<_>>(), BTreeSet::from([name("A"), name("B")]));
    });
    let err = SchemaError::from(errs);
    assert_eq!(err.kind(), ErrorKind::Cycle);
    expect_err(
        "entity A in [B]; entity B in [A];",
        &err,
        &ExpectedErrorMessageBuilder::error("entity type hierarchy has a cycle through `A`, `B`"),
    );
}

#[test]
fn empty_schema() {
    let schema = Schema::new();
    assert_eq!(schema.dump_json().unwrap(), b"{}");
    assert_eq!(schema.dump_text().unwrap(), b"");
    assert_eq!(text(""), schema);
    assert_eq!(json(json!({})), schema);
    let resolved = schema.resolve().unwrap();
    assert_eq!(resolved.entity_types().count(), 0);
    assert_eq!(resolved.actions().count(), 0);
}

#[test]
fn empty_and_annotation_only_namespaces() {
    let schema = text(r#"namespace A {} @doc("x") namespace B {}"#);
    assert_eq!(dump_text(&schema), "namespace A {\n}\n\n@doc(\"x\")\nnamespace B {\n}\n");
    assert_eq!(
        dump_json_value(&schema),
        json!({
            "A": { "entityTypes": {}, "actions": {} },
            "B": { "annotations": { "doc": "x" }, "entityTypes": {}, "actions": {} },
        })
    );
    assert_eq!(text(&dump_text(&schema)), schema);
    assert_eq!(json(dump_json_value(&schema)), schema);
    let resolved = schema.resolve().unwrap();
    assert_eq!(
        resolved.namespace_annotations(Some(&name("B"))).unwrap().get("doc").unwrap(),
        "x"
    );
}

#[test]
fn empty_records() {
    let schema = text("entity E = { a: {}, b: { c: {} } }; entity F {};");
    assert_eq!(
        dump_text(&schema),
        "entity E {\n  a: {},\n  b: {\n    c: {},\n  },\n};\n\nentity F {};\n"
    );
    assert_eq!(text(&dump_text(&schema)), schema);
    let resolved = schema.resolve().unwrap();
    let e = resolved.entity_type(&name("E")).unwrap();
    assert!(e.attr("a").unwrap().ty.as_record().unwrap().is_empty());
    let b = e.attr("b").unwrap().ty.as_record().unwrap();
    assert!(b.attr("c").unwrap().ty.as_record().unwrap().is_empty());
    assert!(resolved.entity_type(&name("F")).unwrap().attributes.is_empty());
}

#[test]
fn trailing_commas() {
    let schema = text("entity E = { a: Long, b: { c: Long, }, };");
    assert_eq!(dump_text(&schema), "entity E {\n  a: Long,\n  b: {\n    c: Long,\n  },\n};\n");
    text("entity A; action a appliesTo { principal: A, resource: [A], };");

    for src in [
        "entity E in [A, B,];",
        "action a in [b,];",
        "action a appliesTo { principal: [A,] };",
        "entity E = { , };",
    ] {
        let err = Schema::new()
            .load_text("commas.cedarschema", src.as_bytes())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax, "for {src}");
    }
}

#[test]
fn string_escapes() {
    let src = r#"@doc("\x01\x7f\x85\0\'\"\\\n\r\t") entity A;"#;
    let schema = text(src);
    let doc = schema.ast().namespace(None).unwrap().entity_types[&id("A")]
        .annotations
        .get("doc")
        .unwrap()
        .clone();
    assert_eq!(doc, "\u{1}\u{7f}\u{85}\0'\"\\\n\r\t");
    let formatted = dump_text(&schema);
    assert_eq!(
        formatted,
        "@doc(\"\\x01\\x7f\\x85\\0\\'\\\"\\\\\\n\\r\\t\")\nentity A;\n"
    );
    assert_eq!(text(&formatted), schema);
    assert_eq!(json(dump_json_value(&schema)), schema);

    for (src, kind) in [
        (r#"@doc("\q") entity A;"#, ErrorKind::InvalidEscape),
        (r#"@doc("\x4") entity A;"#, ErrorKind::InvalidEscape),
        (r#"@doc("\u{41}") entity A;"#, ErrorKind::InvalidEscape),
        ("@doc(\"abc\n\") entity A;", ErrorKind::UnterminatedString),
        (r#"@doc("abc) entity A;"#, ErrorKind::UnterminatedString),
    ] {
        let err = Schema::new().load_text("", src.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), kind, "for {src}");
    }
}

#[test]
fn unusual_action_names() {
    let schema = text(r#"action "", "1st", "in", "a b";"#);
    assert_eq!(
        dump_text(&schema),
        "action \"\";\n\naction \"1st\";\n\naction \"a b\";\n\naction \"in\";\n"
    );
    assert_eq!(text(&dump_text(&schema)), schema);
    let resolved = schema.resolve().unwrap();
    for id in ["", "1st", "in", "a b"] {
        assert!(resolved.action(&EntityUid::new(name("Action"), id)).is_some(), "{id:?}");
    }

    let err = Schema::new().load_text("", b"action in;").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reserved);
}

#[test]
fn unusual_record_keys() {
    let schema = text(r#"entity E = { "": Long, "1a": String, "in"?: Bool, _x: Long };"#);
    assert_eq!(
        dump_text(&schema),
        "entity E {\n  \"\": Long,\n  \"1a\": String,\n  _x: Long,\n  \"in\"?: Bool,\n};\n"
    );
    assert_eq!(text(&dump_text(&schema)), schema);
    let resolved = schema.resolve().unwrap();
    let e = resolved.entity_type(&name("E")).unwrap();
    assert_eq!(e.attr("").unwrap().ty, LONG);
    assert_eq!(e.attr("in").unwrap().ty, BOOL);

    let err = Schema::new().load_text("", b"entity E = { in: Long };").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reserved);
}

#[test]
fn parse_errors_carry_a_position() {
    let src = "entity A;\nentity ;";
    let err = Schema::new()
        .load_text("pos.cedarschema", src.as_bytes())
        .unwrap_err();
    assert_matches!(&err, SchemaError::Parse(_));
    assert!(
        err.to_string().starts_with("pos.cedarschema:2:8: "),
        "{err}"
    );
    cedar_schema_core::test_utils::expect_source_snippet(src, &err, ";");
}

#[test]
fn json_errors() {
    let mut schema = Schema::new();
    assert_eq!(schema.load_json(b"{").unwrap_err().kind(), ErrorKind::InvalidJson);
    let set_without_element = json!({ "": {
        "commonTypes": { "T": { "type": "Set" } },
        "entityTypes": {},
        "actions": {},
    }});
    let err = schema
        .load_json(set_without_element.to_string().as_bytes())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SetMissingElement);
    let unknown_ext = json!({ "": {
        "commonTypes": { "T": { "type": "Extension", "name": "uuid" } },
        "entityTypes": {},
        "actions": {},
    }});
    let err = schema.load_json(unknown_ext.to_string().as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownType);
    assert!(schema.ast().is_empty());
}

#[test]
fn text_and_json_agree() {
    let src = r#"
        type Ctx = { ip?: ipaddr, "when": __cedar::datetime };
        @doc("groups")
        entity Group, Team in [Org];
        entity Org tags Set<String>;
        entity Status enum ["on", "off"];
        namespace App {
            entity Doc = { owner: User, tags?: Set<String>, status: Status };
            entity User in [Group];
            action read, "write";
            action edit in [read, App::Action::"write"] appliesTo {
                principal: User, resource: [Doc], context: Ctx,
            };
        }
    "#;
    let from_text = text(src);
    let from_json = json(dump_json_value(&from_text));
    assert_eq!(from_json.dump_json().unwrap(), from_text.dump_json().unwrap());
    assert_eq!(dump_text(&from_json), dump_text(&from_text));

    let resolved = from_text.resolve().unwrap();
    assert_eq!(resolved, from_json.resolve().unwrap());
    let edit = resolved
        .action(&EntityUid::new(name("App::Action"), "edit"))
        .unwrap();
    assert_eq!(
        edit.member_of,
        BTreeSet::from([
            EntityUid::new(name("App::Action"), "read"),
            EntityUid::new(name("App::Action"), "write"),
        ])
    );
    let ctx = edit.context().unwrap();
    assert_eq!(ctx.attr("ip").unwrap().ty, ResolvedType::Extension(id("ipaddr")));
    assert_eq!(ctx.attr("when").unwrap().ty, ResolvedType::Extension(id("datetime")));
    let doc = resolved.entity_type(&name("App::Doc")).unwrap();
    assert_eq!(doc.attr("owner").unwrap().ty, ResolvedType::Entity(name("App::User")));
    assert_eq!(doc.attr("status").unwrap().ty, ResolvedType::Entity(name("Status")));
    assert!(resolved.entity_type(&name("Org")).unwrap().tags.is_some());
    assert_eq!(
        resolved.entity_type(&name("Org")).unwrap().descendants,
        BTreeSet::from([name("App::User"), name("Group"), name("Team")])
    );
}

#[test]
fn nesting_up_to_the_limit_round_trips() {
    let src = format!(
        "entity E {{ a: {}Long{} }};\naction a appliesTo {{ context: {}Long{} }};\n",
        "Set<".repeat(MAX_NESTING_DEPTH - 1),
        ">".repeat(MAX_NESTING_DEPTH - 1),
        "{ a: ".repeat(MAX_NESTING_DEPTH),
        " }".repeat(MAX_NESTING_DEPTH),
    );
    let schema = text(&src);
    assert_eq!(json(dump_json_value(&schema)).ast(), schema.ast());
    assert_eq!(text(&dump_text(&schema)).ast(), schema.ast());
    let resolved = schema.resolve().unwrap();
    let action = resolved.action(&EntityUid::new(name("Action"), "a")).unwrap();
    let context = action.context().unwrap();
    assert_eq!(ResolvedType::Record(context.clone()).nesting_depth(), MAX_NESTING_DEPTH);
}

#[test]
fn deep_nesting_is_an_error() {
    init_logging();
    let depth = 10_000;
    let src = format!("type T = {}Long{};", "Set<".repeat(depth), ">".repeat(depth));
    let mut schema = Schema::new();
    let err = schema.load_text("deep.cedarschema", src.as_bytes()).unwrap_err();
    let msg = format!(
        "deep.cedarschema:1:{}: types are nested more than 32 deep",
        10 + 4 * MAX_NESTING_DEPTH
    );
    expect_err(src.as_str(), &err, &ExpectedErrorMessageBuilder::error(&msg));
    assert_eq!(err.kind(), ErrorKind::NestingTooDeep);

    let json_src = format!(
        r#"{{ "": {{ "entityTypes": {{}}, "actions": {{}}, "commonTypes": {{ "T": {}{{ "type": "Long" }}{} }} }} }}"#,
        r#"{ "type": "Set", "element": "#.repeat(depth),
        " }".repeat(depth)
    );
    let err = schema.load_json(json_src.as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidJson);
    assert!(schema.ast().is_empty());

    // an AST built directly has no limit of its own
    let mut ast = schema.into_ast();
    let ty = (0..depth).fold(Type::from(PrimitiveType::Long), |ty, _| Type::set(ty));
    ast.namespace_mut(None)
        .common_types
        .insert(id("T"), CommonType::new(ty));
    let schema = Schema::from_ast(ast);
    assert_eq!(schema.dump_text().unwrap_err().kind(), ErrorKind::NestingTooDeep);
    assert_eq!(schema.dump_json().unwrap_err().kind(), ErrorKind::NestingTooDeep);
    let errs = schema.resolve().unwrap_err();
    assert_eq!(errs.kinds().collect::<Vec<_>>(), vec![ErrorKind::NestingTooDeep]);

    // dismantle one level at a time
    let mut ast = schema.into_ast();
    let mut ty = ast
        .namespace_mut(None)
        .common_types
        .remove(&id("T"))
        .unwrap()
        .ty;
    while let Type::Set(element) = ty {
        ty = *element;
    }
}

#[test]
fn deeply_nested_namespaces_are_an_error() {
    let depth = 20_000;
    let src = format!("{}entity E;{}", "namespace A { ".repeat(depth), "}".repeat(depth));
    let mut schema = Schema::new();
    let err = schema.load_text("deep.cedarschema", src.as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NestingTooDeep);
    assert!(schema.ast().is_empty());

    let src = format!("{}entity E;{}", "namespace A { ".repeat(3), "}".repeat(3));
    let schema = text(&src);
    let resolved = schema.resolve().unwrap();
    assert!(resolved.entity_type(&name("A::A::A::E")).is_some());
}
