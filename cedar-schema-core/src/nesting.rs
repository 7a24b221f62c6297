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

//! How deeply types may nest.
//!
//! Every stage that walks a [`Type`] recursively stops at
//! [`MAX_NESTING_DEPTH`] nested `Set` and record types, and also when the
//! remaining stack runs low, so that deeply nested input is reported as an
//! error instead of overflowing the stack.

use crate::ast::Type;

/// The most `Set` and record types that may enclose one another. A
/// schema whose types stay within this limit emits JSON that `serde_json`
/// reads back within its own recursion limit.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Stack space to keep in reserve while descending into a nested type
const REQUIRED_STACK_SPACE: usize = 1024 * 100;

/// Is the stack too close to running out to descend any further?
#[inline(always)]
pub(crate) fn stack_exhausted() -> bool {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if stacker::remaining_stack().unwrap_or(REQUIRED_STACK_SPACE) < REQUIRED_STACK_SPACE {
            return true;
        }
    }
    false
}

/// May a walk that has entered `depth` nested types go one level deeper?
pub(crate) fn too_deep(depth: usize) -> bool {
    depth > MAX_NESTING_DEPTH || stack_exhausted()
}

impl Type {
    /// The number of `Set` and record types enclosing one another along the
    /// deepest path through this type. Primitive types and references have
    /// depth 0. Computed without recursion.
    pub fn nesting_depth(&self) -> usize {
        let mut max = 0;
        let mut pending = vec![(self, 0)];
        while let Some((ty, depth)) = pending.pop() {
            match ty {
                Type::Set(element) => pending.push((element.as_ref(), depth + 1)),
                Type::Record(rty) => {
                    max = max.max(depth + 1);
                    pending.extend(rty.attributes.values().map(|attr| (&attr.ty, depth + 1)));
                }
                _ => max = max.max(depth),
            }
        }
        max
    }
}
