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

use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fmt::Display;

use super::{Annotations, Id, Name};

/// Primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    /// `String`
    String,
    /// `Long`
    Long,
    /// `Bool`, also spelled `Boolean` on input
    Bool,
}

impl PrimitiveType {
    /// Look up a primitive type by name, accepting `Boolean` as an alias for
    /// `Bool`
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" => Some(Self::String),
            "Long" => Some(Self::Long),
            "Bool" | "Boolean" => Some(Self::Bool),
            _ => None,
        }
    }

    /// Canonical spelling in the Cedar schema syntax
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Long => "Long",
            Self::Bool => "Bool",
        }
    }
}

impl Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type as written in a schema, before any reference is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// `String`, `Long` or `Bool`
    Primitive(PrimitiveType),
    /// Homogeneous set
    Set(Box<Type>),
    /// Record
    Record(RecordType),
    /// Reference that must resolve to an entity type
    EntityRef(Name),
    /// Reference that must resolve to a common type
    CommonRef(Name),
    /// Extension type, e.g. `ipaddr`
    Extension(Id),
    /// Reference that may resolve to an entity type, a common type, or a
    /// primitive or extension type spelled by name. Resolution decides.
    EntityOrCommon(Name),
}

impl Type {
    /// Shorthand for a set of `element`
    pub fn set(element: Type) -> Self {
        Self::Set(Box::new(element))
    }

    /// Is this [`Type`] an empty record?
    pub fn is_empty_record(&self) -> bool {
        matches!(self, Self::Record(rty) if rty.attributes.is_empty())
    }
}

impl From<PrimitiveType> for Type {
    fn from(prim: PrimitiveType) -> Self {
        Self::Primitive(prim)
    }
}

impl From<RecordType> for Type {
    fn from(rty: RecordType) -> Self {
        Self::Record(rty)
    }
}

/// Record type: attributes by key, plus annotations on the record itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordType {
    /// Attribute types by key. Keys are arbitrary strings.
    pub attributes: BTreeMap<SmolStr, Attribute>,
    /// Annotations on the record type itself
    pub annotations: Annotations,
}

impl RecordType {
    /// A record with the given attributes and no annotations
    pub fn new(attributes: impl IntoIterator<Item = (SmolStr, Attribute)>) -> Self {
        Self {
            attributes: attributes.into_iter().collect(),
            annotations: Annotations::new(),
        }
    }
}

/// Type of one record attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute type
    pub ty: Type,
    /// `false` for `key?: Type`
    pub required: bool,
    /// Annotations on the attribute
    pub annotations: Annotations,
}

impl Attribute {
    /// A required attribute with no annotations
    pub fn required(ty: impl Into<Type>) -> Self {
        Self {
            ty: ty.into(),
            required: true,
            annotations: Annotations::new(),
        }
    }

    /// An optional attribute with no annotations
    pub fn optional(ty: impl Into<Type>) -> Self {
        Self {
            ty: ty.into(),
            required: false,
            annotations: Annotations::new(),
        }
    }
}
