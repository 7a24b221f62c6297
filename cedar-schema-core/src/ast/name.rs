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

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smol_str::SmolStr;
use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// The identifier which may never name a declaration, because the grammar
/// uses it for `memberOf` clauses
pub const RESERVED_ID: &str = "in";

/// First segment of the built-in namespace that holds primitive and
/// extension types (`__cedar::Long`, `__cedar::ipaddr`, ...)
pub const BUILTIN_NAMESPACE: &str = "__cedar";

/// Can `c` start an identifier?
pub(crate) fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

/// Can `c` appear after the first character of an identifier?
pub(crate) fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Is `s` an identifier according to the scanner's rules? This includes the
/// reserved identifier `in`.
pub fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_continue),
        _ => false,
    }
}

/// Can `s` be written unquoted where the grammar accepts either an identifier
/// or a string (action names, record keys, action IDs)?
pub fn is_bare_ident(s: &str) -> bool {
    is_valid_ident(s) && s != RESERVED_ID
}

/// Errors constructing an [`Id`] or a [`Name`] from a string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// The string is not an identifier
    #[error("`{0}` is not a valid identifier")]
    InvalidIdent(SmolStr),
    /// The string is the reserved identifier `in`
    #[error("`{RESERVED_ID}` is a reserved identifier")]
    Reserved,
    /// A `::`-separated path with an empty or malformed segment
    #[error("`{0}` is not a valid name")]
    InvalidName(SmolStr),
}

/// Identifiers. Anything in an `Id` is a valid identifier: it starts with a
/// letter or underscore, continues with letters, digits or underscores, and is
/// not the reserved identifier `in`.
//
// For now, internally, `Id`s are just owned `SmolStr`s.
#[derive(Serialize, Debug, PartialEq, Eq, Clone, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Id(SmolStr);

impl Id {
    /// Create a new `Id` where it is the caller's responsibility to ensure
    /// that the string is indeed a valid, unreserved identifier. The scanner
    /// uses this for identifier tokens it has already checked.
    pub(crate) fn new_unchecked(s: impl Into<SmolStr>) -> Self {
        Self(s.into())
    }

    /// Get the underlying string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the underlying string
    pub fn into_smolstr(self) -> SmolStr {
        self.0
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Id {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == RESERVED_ID {
            Err(NameError::Reserved)
        } else if is_valid_ident(s) {
            Ok(Self(s.into()))
        } else {
            Err(NameError::InvalidIdent(s.into()))
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = SmolStr::deserialize(deserializer)?;
        s.parse()
            .map_err(|err| serde::de::Error::custom(format!("invalid id `{s}`: {err}")))
    }
}

/// A name which is a basename [`Id`] optionally preceded by a `::`-separated
/// namespace path, e.g. `PhotoApp::Internal::User`.
///
/// Names are ordered component-wise, so `A` < `A::B` < `B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    /// Namespace path, outermost first. Empty for an unqualified name.
    path: Vec<Id>,
    /// Basename
    id: Id,
}

impl Name {
    /// Create a `Name` with no namespace
    pub fn unqualified(id: Id) -> Self {
        Self {
            path: Vec::new(),
            id,
        }
    }

    /// Create a `Name` from a namespace path and a basename
    pub fn new(path: impl IntoIterator<Item = Id>, id: Id) -> Self {
        Self {
            path: path.into_iter().collect(),
            id,
        }
    }

    /// Create the name `id` declared in the namespace `ns` (or in the
    /// anonymous namespace, when `ns` is `None`)
    pub fn declared_in(ns: Option<&Self>, id: Id) -> Self {
        match ns {
            Some(ns) => Self {
                path: ns.components().cloned().collect(),
                id,
            },
            None => Self::unqualified(id),
        }
    }

    /// Create a name from its components, outermost first. Returns `None` if
    /// there are no components.
    pub fn from_components(components: impl IntoIterator<Item = Id>) -> Option<Self> {
        let mut path: Vec<Id> = components.into_iter().collect();
        let id = path.pop()?;
        Some(Self { path, id })
    }

    /// Get the basename
    pub fn basename(&self) -> &Id {
        &self.id
    }

    /// Iterate over the namespace path components (not including the basename)
    pub fn namespace_components(&self) -> impl Iterator<Item = &Id> {
        self.path.iter()
    }

    /// Iterate over all components, including the basename
    pub fn components(&self) -> impl Iterator<Item = &Id> {
        self.path.iter().chain(std::iter::once(&self.id))
    }

    /// The namespace this name lives in, or `None` for an unqualified name
    pub fn namespace(&self) -> Option<Self> {
        Self::from_components(self.path.iter().cloned())
    }

    /// Does this name have no namespace path?
    pub fn is_unqualified(&self) -> bool {
        self.path.is_empty()
    }

    /// If this name is unqualified, prefix it with `ns`; otherwise it is
    /// already fully qualified and is returned unchanged.
    pub fn qualify_with(&self, ns: Option<&Self>) -> Self {
        if self.is_unqualified() {
            Self::declared_in(ns, self.id.clone())
        } else {
            self.clone()
        }
    }

    /// Append all of `other`'s components to this name. Used for nested
    /// namespace blocks.
    pub fn join(&self, other: &Self) -> Self {
        Self {
            path: self
                .components()
                .chain(other.namespace_components())
                .cloned()
                .collect(),
            id: other.id.clone(),
        }
    }

    /// Is this a name in the built-in `__cedar` namespace? If so, return its
    /// basename.
    pub fn as_builtin(&self) -> Option<&Id> {
        match self.path.as_slice() {
            [ns] if ns.as_str() == BUILTIN_NAMESPACE => Some(&self.id),
            _ => None,
        }
    }
}

impl From<Id> for Name {
    fn from(id: Id) -> Self {
        Self::unqualified(id)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components().cmp(other.components())
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for elem in &self.path {
            write!(f, "{elem}::")?;
        }
        write!(f, "{}", self.id)
    }
}

impl FromStr for Name {
    type Err = NameError;

    /// Parse a name in normalized form: `::`-separated identifiers with no
    /// whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components = s
            .split("::")
            .map(|part| match part.parse::<Id>() {
                Ok(id) => Ok(id),
                Err(NameError::Reserved) => Err(NameError::Reserved),
                Err(_) => Err(NameError::InvalidName(s.into())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_components(components).ok_or_else(|| NameError::InvalidName(s.into()))
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = SmolStr::deserialize(deserializer)?;
        s.parse()
            .map_err(|err| serde::de::Error::custom(format!("invalid name `{s}`: {err}")))
    }
}
