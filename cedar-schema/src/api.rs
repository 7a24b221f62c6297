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
//! This module contains the public API of the crate.

use std::str::FromStr;
use tracing::debug;

pub use cedar_schema_core::ast;
pub use cedar_schema_core::err::{DuplicateKind, ErrorKind};
pub use cedar_schema_core::extensions::Extensions;
pub use cedar_schema_core::nesting::MAX_NESTING_DEPTH;
pub use cedar_schema_core::resolver::{
    EntityUid, ResolvedAction, ResolvedAppliesTo, ResolvedAttribute, ResolvedEntityKind,
    ResolvedEntityType, ResolvedRecord, ResolvedSchema, ResolvedType,
};
use cedar_schema_core::{fmt, json_schema, parser, resolver::Resolver};

mod err;
pub use err::*;

/// A Cedar schema, as parsed from either syntax.
///
/// The schema is kept exactly as loaded; [`Schema::resolve`] produces a
/// separate [`ResolvedSchema`] and leaves this value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema(ast::Schema);

impl Schema {
    /// An empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an AST built some other way
    pub fn from_ast(schema: ast::Schema) -> Self {
        Self(schema)
    }

    /// The underlying AST
    pub fn ast(&self) -> &ast::Schema {
        &self.0
    }

    /// The underlying AST, for modification
    pub fn ast_mut(&mut self) -> &mut ast::Schema {
        &mut self.0
    }

    /// Take the underlying AST
    pub fn into_ast(self) -> ast::Schema {
        self.0
    }

    /// Replace the contents of this schema with the schema in `src`, written
    /// in the Cedar schema syntax. `filename` is only used in error messages.
    /// On error the schema is left unchanged.
    pub fn load_text(&mut self, filename: &str, src: &[u8]) -> Result<(), SchemaError> {
        let schema = parser::parse_schema_bytes(filename, src)?;
        log_loaded("text", &schema);
        self.0 = schema;
        Ok(())
    }

    /// Replace the contents of this schema with the schema in `json`, written
    /// in the JSON schema syntax. On error the schema is left unchanged.
    pub fn load_json(&mut self, json: &[u8]) -> Result<(), SchemaError> {
        let schema = json_schema::from_json_slice(json)?;
        log_loaded("JSON", &schema);
        self.0 = schema;
        Ok(())
    }

    /// Format the schema in the Cedar schema syntax. The output is canonical:
    /// declarations and attributes are sorted, and formatting the same
    /// schema always gives the same bytes.
    pub fn dump_text(&self) -> Result<Vec<u8>, SchemaError> {
        let text = fmt::to_cedar_schema_str(&self.0)?;
        debug!(bytes = text.len(), "formatted schema as text");
        Ok(text.into_bytes())
    }

    /// Emit the schema in the JSON schema syntax, pretty-printed with sorted
    /// object keys
    pub fn dump_json(&self) -> Result<Vec<u8>, SchemaError> {
        let json = json_schema::to_json_string(&self.0)?;
        debug!(bytes = json.len(), "emitted schema as JSON");
        Ok(json.into_bytes())
    }

    /// Emit the schema as a JSON value
    pub fn to_json_value(&self) -> Result<serde_json::Value, SchemaError> {
        Ok(json_schema::to_json_value(&self.0)?)
    }

    /// Resolve the schema with every extension type enabled by the crate's
    /// cargo features
    pub fn resolve(&self) -> Result<ResolvedSchema, ResolveErrors> {
        self.resolve_with_extensions(&Extensions::all_available())
    }

    /// Resolve the schema, accepting only the extension types in `extensions`
    pub fn resolve_with_extensions(
        &self,
        extensions: &Extensions,
    ) -> Result<ResolvedSchema, ResolveErrors> {
        debug!(namespaces = self.0.namespaces.len(), "resolving schema");
        Resolver::new(extensions).resolve(&self.0)
    }

    /// Resolve several schemas together, as fragments of one schema.
    /// Declarations in one fragment may refer to declarations in another.
    pub fn resolve_fragments<'a>(
        fragments: impl IntoIterator<Item = &'a Schema>,
        extensions: &Extensions,
    ) -> Result<ResolvedSchema, ResolveErrors> {
        Resolver::new(extensions).resolve_fragments(fragments.into_iter().map(Schema::ast))
    }
}

impl FromStr for Schema {
    type Err = SchemaError;

    /// Parse a schema in the Cedar schema syntax
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        Ok(Self(parser::parse_schema("", src)?))
    }
}

impl From<ast::Schema> for Schema {
    fn from(schema: ast::Schema) -> Self {
        Self(schema)
    }
}

fn log_loaded(syntax: &str, schema: &ast::Schema) {
    debug!(
        syntax,
        namespaces = schema.namespaces.len(),
        entity_types = schema.entity_types().count(),
        actions = schema.actions().count(),
        "loaded schema"
    );
}

// PANIC SAFETY: unit tests
#[allow(clippy::unwrap_used, clippy::panic)]
#[cfg(test)]
mod test {
    use super::*;
    use cool_asserts::assert_matches;

    #[test]
    fn failed_load_keeps_previous_schema() {
        let mut schema = Schema::new();
        schema.load_text("a", b"entity A;").unwrap();
        let before = schema.clone();
        assert_matches!(schema.load_text("b", b"entity ;"), Err(SchemaError::Parse(_)));
        assert_matches!(schema.load_json(b"{ not json"), Err(SchemaError::Json(_)));
        assert_eq!(schema, before);
    }

    #[test]
    fn load_replaces_contents() {
        let mut schema: Schema = "entity A;".parse().unwrap();
        schema.load_json(br#"{ "B": { "entityTypes": {}, "actions": {} } }"#).unwrap();
        assert_eq!(schema.ast().namespaces.len(), 1);
        assert!(schema.ast().entity_types().next().is_none());
    }
}
