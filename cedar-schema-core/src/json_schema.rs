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

//! The Cedar JSON schema format.
//!
//! Loading goes through serde into plain structures, which are then checked
//! and converted to the AST with the JSON path of every value at hand for
//! error messages. Emitting builds the same structures and hands them to
//! `serde_json`; object keys come out sorted because `serde_json::Value`
//! keeps objects in a `BTreeMap`.

mod emit;
mod err;
mod load;
mod raw;

pub use err::{JsonSchemaError, JsonSchemaErrorKind, Result, SchemaPath};

use crate::ast::Schema;

/// Load a schema from JSON bytes
pub fn from_json_slice(json: &[u8]) -> Result<Schema> {
    let raw: raw::JsonSchema = serde_json::from_slice(json)?;
    load::load_schema(raw)
}

/// Load a schema from a JSON string
pub fn from_json_str(json: &str) -> Result<Schema> {
    from_json_slice(json.as_bytes())
}

/// Load a schema from an already-parsed JSON value
pub fn from_json_value(json: serde_json::Value) -> Result<Schema> {
    let raw: raw::JsonSchema = serde_json::from_value(json)?;
    load::load_schema(raw)
}

/// Emit a schema as a JSON value with sorted object keys
pub fn to_json_value(schema: &Schema) -> Result<serde_json::Value> {
    let raw = emit::emit_schema(schema)?;
    // PANIC SAFETY: the raw structures only have string keys and no custom serializers that fail
    #[allow(clippy::expect_used)]
    Ok(serde_json::to_value(raw).expect("serializing a JSON schema should not fail"))
}

/// Emit a schema as pretty-printed JSON with sorted object keys
pub fn to_json_string(schema: &Schema) -> Result<String> {
    let value = to_json_value(schema)?;
    // PANIC SAFETY: serializing a `serde_json::Value` does not fail
    #[allow(clippy::expect_used)]
    Ok(serde_json::to_string_pretty(&value).expect("serializing a JSON value should not fail"))
}
