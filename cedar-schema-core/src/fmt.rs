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

//! `Display` implementations for formatting a [`Schema`] in the Cedar schema
//! syntax.
//!
//! The output is canonical: declarations are sorted by name, every record
//! attribute sits on its own line with a trailing comma, lists are always
//! bracketed, and strings use a fixed set of escapes.

use miette::Diagnostic;
use smol_str::SmolStr;
use std::fmt::{Display, Write};
use thiserror::Error;

use crate::ast::{
    is_bare_ident, Action, ActionRef, Annotations, AppliesTo, EntityType, EntityTypeKind,
    Namespace, RecordType, Schema, Type, BUILTIN_NAMESPACE,
};
use crate::err::ErrorKind;
use crate::nesting::{too_deep, MAX_NESTING_DEPTH};

/// Number of spaces of indentation per level
pub const NUM_INDENTATION_SPACES: usize = 2;

/// Helper struct to indent with `NUM_INDENTATION_SPACES` spaces at each level
#[derive(Debug)]
struct BaseIndentation(String);

impl BaseIndentation {
    /// Do not use any base indentation.
    fn none() -> Self {
        BaseIndentation(String::new())
    }

    /// Indent base using `NUM_INDENTATION_SPACES` more than current self.
    fn next(&self) -> Self {
        BaseIndentation(" ".repeat(self.0.len() + NUM_INDENTATION_SPACES))
    }
}

impl Display for BaseIndentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Support for formatting with a given base indentation (spaces) that should
/// be applied after newlines.
trait IndentedDisplay {
    fn fmt_indented(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        base_indentation: &BaseIndentation,
    ) -> std::fmt::Result;
}

/// Display a type supporting indentation with the given amount of base indentation
struct Indented<'a, T: IndentedDisplay>(&'a T, &'a BaseIndentation);

impl<T: IndentedDisplay> Display for Indented<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt_indented(f, self.1)
    }
}

/// Write `s` as a string literal
pub(crate) fn write_quoted(f: &mut impl Write, s: &str) -> std::fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\'' => f.write_str("\\'")?,
            '\0' => f.write_str("\\0")?,
            '\u{1}'..='\u{1f}' | '\u{7f}'..='\u{9f}' => write!(f, "\\x{:02x}", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// `s` as a string literal in the Cedar schema syntax
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    // PANIC SAFETY: writing to a `String` does not fail
    #[allow(clippy::expect_used)]
    write_quoted(&mut out, s).expect("writing to a String should not fail");
    out
}

/// Write an action name or record key bare if the syntax allows it, quoted
/// otherwise
fn write_key(f: &mut impl Write, s: &str) -> std::fmt::Result {
    if is_bare_ident(s) {
        f.write_str(s)
    } else {
        write_quoted(f, s)
    }
}

fn write_list<T>(
    f: &mut std::fmt::Formatter<'_>,
    items: &[T],
    mut write_item: impl FnMut(&mut std::fmt::Formatter<'_>, &T) -> std::fmt::Result,
) -> std::fmt::Result {
    f.write_char('[')?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_item(f, item)?;
    }
    f.write_char(']')
}

/// Write the blank line that goes before every declaration but the first
fn separate(f: &mut std::fmt::Formatter<'_>, first: &mut bool) -> std::fmt::Result {
    if *first {
        *first = false;
        Ok(())
    } else {
        writeln!(f)
    }
}

impl IndentedDisplay for Annotations {
    fn fmt_indented(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        base_indentation: &BaseIndentation,
    ) -> std::fmt::Result {
        for (key, value) in self.iter() {
            write!(f, "{base_indentation}@{key}")?;
            if !value.is_empty() {
                f.write_char('(')?;
                write_quoted(f, value)?;
                f.write_char(')')?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let base = BaseIndentation::none();
        let mut first = true;
        for (name, ns) in &self.namespaces {
            if name.is_none() && !ns.has_declarations() {
                continue;
            }
            separate(f, &mut first)?;
            match name {
                // Invariant: Namespace always prints a newline at the end
                None => ns.fmt_indented(f, &base)?,
                Some(name) => {
                    ns.annotations.fmt_indented(f, &base)?;
                    writeln!(f, "namespace {name} {{")?;
                    ns.fmt_indented(f, &base.next())?;
                    writeln!(f, "}}")?;
                }
            }
        }
        Ok(())
    }
}

impl IndentedDisplay for Namespace {
    fn fmt_indented(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        base_indentation: &BaseIndentation,
    ) -> std::fmt::Result {
        let mut first = true;
        for (id, ct) in &self.common_types {
            separate(f, &mut first)?;
            ct.annotations.fmt_indented(f, base_indentation)?;
            writeln!(
                f,
                "{base_indentation}type {id} = {};",
                Indented(&ct.ty, base_indentation)
            )?;
        }
        for (id, ety) in &self.entity_types {
            separate(f, &mut first)?;
            ety.annotations.fmt_indented(f, base_indentation)?;
            writeln!(
                f,
                "{base_indentation}entity {id}{};",
                Indented(ety, base_indentation)
            )?;
        }
        for (name, action) in &self.actions {
            separate(f, &mut first)?;
            action.annotations.fmt_indented(f, base_indentation)?;
            write!(f, "{base_indentation}action ")?;
            write_key(f, name)?;
            writeln!(f, "{};", Indented(action, base_indentation))?;
        }
        Ok(())
    }
}

/// Everything after the entity type's name, up to the `;`
impl IndentedDisplay for EntityType {
    fn fmt_indented(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        base_indentation: &BaseIndentation,
    ) -> std::fmt::Result {
        match &self.kind {
            EntityTypeKind::Enum { choices } => {
                f.write_str(" enum ")?;
                write_list(f, &choices.iter().collect::<Vec<_>>(), |f, choice| {
                    write_quoted(f, choice)
                })
            }
            EntityTypeKind::Standard(body) => {
                if !body.member_of.is_empty() {
                    f.write_str(" in ")?;
                    write_list(f, &body.member_of, |f, name| write!(f, "{name}"))?;
                }
                if let Some(shape) = &body.shape {
                    write!(f, " {}", Indented(shape, base_indentation))?;
                }
                if let Some(tags) = &body.tags {
                    write!(f, " tags {}", Indented(tags, base_indentation))?;
                }
                Ok(())
            }
        }
    }
}

impl Display for ActionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.ty {
            Some(ty) => {
                write!(f, "{ty}::")?;
                write_quoted(f, &self.id)
            }
            None => write_key(f, &self.id),
        }
    }
}

/// Everything after the action's name, up to the `;`
impl IndentedDisplay for Action {
    fn fmt_indented(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        base_indentation: &BaseIndentation,
    ) -> std::fmt::Result {
        if !self.member_of.is_empty() {
            f.write_str(" in ")?;
            write_list(f, &self.member_of, |f, r| write!(f, "{r}"))?;
        }
        if let Some(applies_to) = &self.applies_to {
            write!(f, " appliesTo {}", Indented(applies_to, base_indentation))?;
        }
        Ok(())
    }
}

impl IndentedDisplay for AppliesTo {
    fn fmt_indented(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        base_indentation: &BaseIndentation,
    ) -> std::fmt::Result {
        if self.principal_types.is_empty()
            && self.resource_types.is_empty()
            && self.context.is_none()
        {
            return f.write_str("{}");
        }
        let inner = base_indentation.next();
        writeln!(f, "{{")?;
        if !self.principal_types.is_empty() {
            write!(f, "{inner}principal: ")?;
            write_list(f, &self.principal_types, |f, name| write!(f, "{name}"))?;
            writeln!(f, ",")?;
        }
        if !self.resource_types.is_empty() {
            write!(f, "{inner}resource: ")?;
            write_list(f, &self.resource_types, |f, name| write!(f, "{name}"))?;
            writeln!(f, ",")?;
        }
        if let Some(context) = &self.context {
            writeln!(f, "{inner}context: {},", Indented(context, &inner))?;
        }
        write!(f, "{base_indentation}}}")
    }
}

impl IndentedDisplay for RecordType {
    fn fmt_indented(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        base_indentation: &BaseIndentation,
    ) -> std::fmt::Result {
        if self.attributes.is_empty() {
            return f.write_str("{}");
        }
        let inner = base_indentation.next();
        writeln!(f, "{{")?;
        for (key, attr) in &self.attributes {
            attr.annotations.fmt_indented(f, &inner)?;
            write!(f, "{inner}")?;
            write_key(f, key)?;
            if !attr.required {
                f.write_char('?')?;
            }
            writeln!(f, ": {},", Indented(&attr.ty, &inner))?;
        }
        write!(f, "{base_indentation}}}")
    }
}

impl IndentedDisplay for Type {
    fn fmt_indented(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        base_indentation: &BaseIndentation,
    ) -> std::fmt::Result {
        match self {
            Self::Primitive(prim) => write!(f, "{prim}"),
            Self::Set(element) => write!(f, "Set<{}>", Indented(element.as_ref(), base_indentation)),
            Self::Record(rty) => rty.fmt_indented(f, base_indentation),
            Self::EntityRef(name) | Self::CommonRef(name) | Self::EntityOrCommon(name) => {
                write!(f, "{name}")
            }
            Self::Extension(id) => write!(f, "{BUILTIN_NAMESPACE}::{id}"),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_indented(f, &BaseIndentation::none())
    }
}

/// AST content the Cedar schema syntax has no way to write
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[non_exhaustive]
pub enum ToTextError {
    /// The anonymous namespace has no `namespace` block to annotate
    #[error("annotations on the anonymous namespace cannot be written in the Cedar schema syntax")]
    #[diagnostic(help("move the declarations into a named namespace, or use the JSON syntax"))]
    AnonymousNamespaceAnnotations,
    /// Records are written as `{ ... }`, which has no place for annotations
    #[error("annotations on a record type in `{0}` cannot be written in the Cedar schema syntax")]
    #[diagnostic(help("annotate the attributes or the declaration instead, or use the JSON syntax"))]
    RecordAnnotations(SmolStr),
    /// More `Set` and record types nested inside one another than allowed
    #[error("types in `{0}` are nested more than {max} deep", max = MAX_NESTING_DEPTH)]
    NestingTooDeep(SmolStr),
}

impl ToTextError {
    /// The pipeline-wide kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AnonymousNamespaceAnnotations | Self::RecordAnnotations(_) => {
                ErrorKind::Unsupported
            }
            Self::NestingTooDeep(_) => ErrorKind::NestingTooDeep,
        }
    }
}

/// `depth` is the number of `Set` and record types enclosing `rty`
fn check_record(
    rty: &RecordType,
    depth: usize,
    declaration: &dyn Fn() -> SmolStr,
) -> Result<(), ToTextError> {
    if too_deep(depth + 1) {
        return Err(ToTextError::NestingTooDeep(declaration()));
    }
    if !rty.annotations.is_empty() {
        return Err(ToTextError::RecordAnnotations(declaration()));
    }
    rty.attributes
        .values()
        .try_for_each(|attr| check_type(&attr.ty, depth + 1, declaration))
}

fn check_type(ty: &Type, depth: usize, declaration: &dyn Fn() -> SmolStr) -> Result<(), ToTextError> {
    match ty {
        Type::Record(rty) => check_record(rty, depth, declaration),
        Type::Set(element) => {
            if too_deep(depth + 1) {
                return Err(ToTextError::NestingTooDeep(declaration()));
            }
            check_type(element, depth + 1, declaration)
        }
        Type::Primitive(_)
        | Type::EntityRef(_)
        | Type::CommonRef(_)
        | Type::Extension(_)
        | Type::EntityOrCommon(_) => Ok(()),
    }
}

fn check_expressible(schema: &Schema) -> Result<(), ToTextError> {
    for (ns_name, ns) in &schema.namespaces {
        if ns_name.is_none() && !ns.annotations.is_empty() {
            return Err(ToTextError::AnonymousNamespaceAnnotations);
        }
        let prefix = ns_name
            .as_ref()
            .map(|ns| format!("{ns}::"))
            .unwrap_or_default();
        for (id, ct) in &ns.common_types {
            check_type(&ct.ty, 0, &|| SmolStr::from(format!("{prefix}{id}")))?;
        }
        for (id, ety) in &ns.entity_types {
            if let EntityTypeKind::Standard(def) = &ety.kind {
                let declaration = || SmolStr::from(format!("{prefix}{id}"));
                if let Some(shape) = &def.shape {
                    check_record(shape, 0, &declaration)?;
                }
                if let Some(tags) = &def.tags {
                    check_type(tags, 0, &declaration)?;
                }
            }
        }
        for (name, action) in &ns.actions {
            if let Some(ctx) = action.applies_to.as_ref().and_then(|a| a.context.as_ref()) {
                check_type(ctx, 0, &|| {
                    SmolStr::from(format!("{prefix}Action::{}", quote(name)))
                })?;
            }
        }
    }
    Ok(())
}

/// Format `schema` in the Cedar schema syntax, failing on content the syntax
/// cannot express instead of dropping it, and on types nested more than
/// [`MAX_NESTING_DEPTH`] deep
pub fn to_cedar_schema_str(schema: &Schema) -> Result<String, ToTextError> {
    check_expressible(schema)?;
    Ok(schema.to_string())
}
