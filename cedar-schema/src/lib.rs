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
//! Load, format, convert and resolve Cedar schemas.
//!
//! A [`Schema`] holds the parsed form of a schema, loaded from either the
//! Cedar schema syntax or the JSON schema syntax. It can be written back out
//! in either syntax and resolved into a [`ResolvedSchema`].
//!
//! ```
//! use cedar_schema::Schema;
//!
//! let mut schema = Schema::new();
//! schema
//!     .load_text("photos.cedarschema", br#"entity User = { "name": String };"#)
//!     .unwrap();
//! let json = schema.dump_json().unwrap();
//! assert!(String::from_utf8(json).unwrap().contains("\"User\""));
//! ```
#![forbid(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

/// Rust public API
mod api;
pub use api::*;
