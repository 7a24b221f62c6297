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

//! Registry of the extension types a schema may refer to.
//!
//! The set of names the syntax recognizes is closed. Which of them a resolved
//! schema may actually use is configured with cargo features (`ipaddr`,
//! `decimal`, `datetime`), the same way Cedar gates its extension functions.

use smol_str::SmolStr;

/// Every extension type name the schema syntax recognizes
pub const KNOWN_EXTENSIONS: [&str; 4] = ["ipaddr", "decimal", "datetime", "duration"];

/// Set of extension types enabled for resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extensions {
    enabled: Vec<SmolStr>,
}

impl Extensions {
    /// All extension types enabled by the crate's cargo features
    pub fn all_available() -> Self {
        #[allow(unused_mut)]
        let mut enabled = Vec::new();
        #[cfg(feature = "ipaddr")]
        enabled.push(SmolStr::new_static("ipaddr"));
        #[cfg(feature = "decimal")]
        enabled.push(SmolStr::new_static("decimal"));
        #[cfg(feature = "datetime")]
        {
            enabled.push(SmolStr::new_static("datetime"));
            enabled.push(SmolStr::new_static("duration"));
        }
        Self { enabled }
    }

    /// No extension types at all
    pub fn none() -> Self {
        Self {
            enabled: Vec::new(),
        }
    }

    /// Only the given extension types. Names outside [`KNOWN_EXTENSIONS`] are
    /// ignored.
    pub fn specific<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            enabled: names
                .into_iter()
                .filter(|name| Self::is_known(name))
                .map(SmolStr::new)
                .collect(),
        }
    }

    /// Is `name` one of the extension type names the syntax recognizes?
    pub fn is_known(name: &str) -> bool {
        KNOWN_EXTENSIONS.contains(&name)
    }

    /// Is `name` enabled in this set?
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.iter().any(|ext| ext == name)
    }

    /// Iterate over the enabled extension type names
    pub fn enabled(&self) -> impl Iterator<Item = &SmolStr> {
        self.enabled.iter()
    }
}

impl Default for Extensions {
    fn default() -> Self {
        Self::all_available()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_is_independent_of_enabled() {
        let none = Extensions::none();
        assert!(Extensions::is_known("ipaddr"));
        assert!(!none.is_enabled("ipaddr"));
        assert!(!Extensions::is_known("Decimal"));
    }

    #[test]
    fn specific_drops_unknown_names() {
        let exts = Extensions::specific(["decimal", "bogus"]);
        assert_eq!(exts.enabled().collect::<Vec<_>>(), vec!["decimal"]);
    }

    #[cfg(all(feature = "ipaddr", feature = "decimal", feature = "datetime"))]
    #[test]
    fn all_available_with_default_features() {
        let exts = Extensions::all_available();
        for name in KNOWN_EXTENSIONS {
            assert!(exts.is_enabled(name), "{name} should be enabled");
        }
    }
}
