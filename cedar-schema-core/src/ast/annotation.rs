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

use serde::Serialize;
use smol_str::SmolStr;
use std::collections::BTreeMap;

use super::Id;

/// Annotations attached to a namespace, declaration, attribute or type.
///
/// Keys are identifiers; values are strings, where `@key` with no value is
/// the same as `@key("")`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Annotations(BTreeMap<Id, SmolStr>);

impl Annotations {
    /// Create a new empty `Annotations` (with no annotations)
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Tell if it's empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of annotations
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get the value of the annotation with key `key`, if present
    pub fn get(&self, key: &str) -> Option<&SmolStr> {
        self.0
            .iter()
            .find_map(|(k, v)| (k.as_str() == key).then_some(v))
    }

    /// Add an annotation. Returns the previous value if `key` was already
    /// present, which callers treat as a duplicate.
    pub fn insert(&mut self, key: Id, value: SmolStr) -> Option<SmolStr> {
        self.0.insert(key, value)
    }

    /// Iterate over the annotations in key order
    pub fn iter(&self) -> impl Iterator<Item = (&Id, &SmolStr)> {
        self.0.iter()
    }
}

impl FromIterator<(Id, SmolStr)> for Annotations {
    fn from_iter<T: IntoIterator<Item = (Id, SmolStr)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Annotations {
    type Item = (Id, SmolStr);
    type IntoIter = std::collections::btree_map::IntoIter<Id, SmolStr>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
