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
use itertools::Itertools;
use nonempty::NonEmpty;
use std::fmt::Debug;
use std::fmt::Display;
use thiserror::Error;

/// Error type for errors raised during transitive closure computation. This
/// error type is parametrized by a type `K` which is the type of a unique
/// identifier for graph nodes and the type returned by `get_key` on the
/// `TCNode` trait.
#[derive(Debug, Error)]
pub enum TcError<K: Debug + Display> {
    /// Error raised when `compute_tc` is asked to enforce a DAG and finds that
    /// the graph is not one
    #[error("input graph has a cycle through {}", fmt_vertices(.vertices_with_loop))]
    HasCycle {
        /// Because the transitive closure is computed first, every vertex on a
        /// cycle manifests as a vertex with a loop
        vertices_with_loop: NonEmpty<K>,
    },
}

impl<K: Debug + Display> TcError<K> {
    pub(crate) fn has_cycle(vertices_with_loop: NonEmpty<K>) -> Self {
        Self::HasCycle { vertices_with_loop }
    }
}

fn fmt_vertices<K: Display>(vertices: &NonEmpty<K>) -> String {
    vertices.iter().map(|v| format!("`{v}`")).join(", ")
}

/// Type alias for convenience
pub type Result<T, K> = std::result::Result<T, TcError<K>>;
