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

//! Scanner, parser, formatter and resolver for Cedar schemas.
//!
//! A schema can be read from either the Cedar schema syntax
//! ([`parser::parse_schema`]) or the JSON schema syntax
//! ([`json_schema::from_json_slice`]). Both produce the same
//! [`ast::Schema`], which can be written back out with
//! [`fmt::to_cedar_schema_str`] or [`json_schema::to_json_value`], and turned
//! into a [`resolver::ResolvedSchema`] with every reference fully qualified.
#![forbid(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

#[macro_use]
mod error_macros;

pub mod ast;
pub mod err;
pub mod extensions;
pub mod fmt;
pub mod json_schema;
pub mod nesting;
pub mod parser;
pub mod resolver;
pub mod transitive_closure;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;
