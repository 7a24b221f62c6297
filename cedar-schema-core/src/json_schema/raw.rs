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

//! The JSON schema format as plain serde structures, before any name is
//! validated. Shared by the loader and the emitter.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use super::err::{JsonSchemaError, JsonSchemaErrorKind, Result};
use super::SchemaPath;

/// A JSON object whose keys are kept in a `BTreeMap`. Unlike a plain map,
/// a repeated key is recorded rather than silently overwriting, so that the
/// loader can report it with its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CheckedMap<V> {
    entries: BTreeMap<SmolStr, V>,
    duplicate: Option<SmolStr>,
}

impl<V> Default for CheckedMap<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            duplicate: None,
        }
    }
}

impl<V> CheckedMap<V> {
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries, or an error naming the first repeated key
    pub(crate) fn checked(self, path: &SchemaPath) -> Result<BTreeMap<SmolStr, V>> {
        match self.duplicate {
            Some(key) => Err(JsonSchemaError::new(
                JsonSchemaErrorKind::DuplicateKey(key),
                path,
            )),
            None => Ok(self.entries),
        }
    }
}

impl<K: Into<SmolStr>, V> FromIterator<(K, V)> for CheckedMap<V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            duplicate: None,
        }
    }
}

impl<V: Serialize> Serialize for CheckedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(&self.entries)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for CheckedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(CheckedMapVisitor(PhantomData))
    }
}

struct CheckedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for CheckedMapVisitor<V> {
    type Value = CheckedMap<V>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("a JSON object")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> std::result::Result<Self::Value, M::Error> {
        let mut checked = CheckedMap::default();
        while let Some((key, value)) = map.next_entry::<SmolStr, V>()? {
            if checked.entries.insert(key.clone(), value).is_some() && checked.duplicate.is_none() {
                checked.duplicate = Some(key);
            }
        }
        Ok(checked)
    }
}

/// Top level: namespaces by path, `""` for the anonymous namespace
pub(crate) type JsonSchema = CheckedMap<JsonNamespace>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonNamespace {
    #[serde(default)]
    #[serde(skip_serializing_if = "CheckedMap::is_empty")]
    pub annotations: CheckedMap<SmolStr>,
    #[serde(default)]
    #[serde(skip_serializing_if = "CheckedMap::is_empty")]
    pub common_types: CheckedMap<JsonType>,
    pub entity_types: CheckedMap<JsonEntityType>,
    pub actions: CheckedMap<JsonAction>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonEntityType {
    pub member_of_types: Option<Vec<SmolStr>>,
    pub shape: Option<JsonType>,
    pub tags: Option<JsonType>,
    #[serde(rename = "enum")]
    pub choices: Option<Vec<SmolStr>>,
    #[serde(default)]
    #[serde(skip_serializing_if = "CheckedMap::is_empty")]
    pub annotations: CheckedMap<SmolStr>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonAction {
    pub member_of: Option<Vec<JsonActionRef>>,
    pub applies_to: Option<JsonAppliesTo>,
    #[serde(default)]
    #[serde(skip_serializing_if = "CheckedMap::is_empty")]
    pub annotations: CheckedMap<SmolStr>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct JsonActionRef {
    #[serde(rename = "type")]
    pub ty: Option<SmolStr>,
    pub id: SmolStr,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonAppliesTo {
    pub principal_types: Option<Vec<SmolStr>>,
    pub resource_types: Option<Vec<SmolStr>>,
    pub context: Option<JsonType>,
}

/// A type object. Which fields are allowed depends on `type`, and is checked
/// when converting to the AST; the fields themselves are all optional here.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct JsonType {
    #[serde(rename = "type")]
    pub type_name: SmolStr,
    pub element: Option<Box<JsonType>>,
    pub attributes: Option<CheckedMap<JsonType>>,
    pub name: Option<SmolStr>,
    pub required: Option<bool>,
    #[serde(default)]
    #[serde(skip_serializing_if = "CheckedMap::is_empty")]
    pub annotations: CheckedMap<SmolStr>,
}

impl JsonType {
    /// A type object with only a `type` tag
    pub fn tagged(type_name: impl Into<SmolStr>) -> Self {
        Self {
            type_name: type_name.into(),
            element: None,
            attributes: None,
            name: None,
            required: None,
            annotations: CheckedMap::default(),
        }
    }
}

// PANIC SAFETY: unit tests
#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod test {
    use super::*;
    use cool_asserts::assert_matches;
    use serde_json::json;

    #[test]
    fn checked_map_records_first_duplicate() {
        let map: CheckedMap<u32> =
            serde_json::from_str(r#"{ "a": 1, "b": 2, "a": 3, "b": 4 }"#).unwrap();
        let err = map.checked(&SchemaPath::root().child("x")).unwrap_err();
        assert_matches!(err.error_kind(), JsonSchemaErrorKind::DuplicateKey(k) => assert_eq!(k, "a"));
        assert_eq!(err.to_string(), "in `/x`: duplicate key `a`");
    }

    #[test]
    fn checked_map_serializes_as_object() {
        let map: CheckedMap<u32> = [("b", 2), ("a", 1)].into_iter().collect();
        assert_eq!(serde_json::to_value(&map).unwrap(), json!({ "a": 1, "b": 2 }));
        assert_eq!(map.checked(&SchemaPath::root()).unwrap().len(), 2);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_value::<JsonNamespace>(
            json!({ "entityTypes": {}, "actions": {}, "extra": 1 })
        )
        .is_err());
        assert!(serde_json::from_value::<JsonType>(json!({ "type": "Long", "extra": 1 })).is_err());
        assert!(serde_json::from_value::<JsonNamespace>(json!({ "entityTypes": {} })).is_err());
    }

    #[test]
    fn absent_options_are_not_serialized() {
        assert_eq!(
            serde_json::to_value(JsonType::tagged("Long")).unwrap(),
            json!({ "type": "Long" })
        );
        assert_eq!(
            serde_json::to_value(JsonEntityType::default()).unwrap(),
            json!({})
        );
    }
}
