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
//! Module containing code to compute the transitive closure of a graph.
//! This is a generic utility; the resolver uses it for both the entity type
//! hierarchy and the action hierarchy.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Display};

mod err;
pub use err::*;
use nonempty::NonEmpty;

/// Trait used to generalize transitive closure computation. This trait should
/// be implemented for types representing a node in the hierarchy where we need
/// to compute the transitive closure of the hierarchy starting from only
/// direct adjacencies. This trait is parametrized by a type `K` which
/// represents a unique identifier for graph nodes.
pub trait TCNode<K> {
    /// Extract a unique identifier for the node.
    fn get_key(&self) -> K;

    /// Add an edge out of this node to the node with key `k`.
    fn add_edge_to(&mut self, k: K);

    /// Retrieve an iterator for the edges out of this node.
    fn out_edges(&self) -> Box<dyn Iterator<Item = &K> + '_>;

    /// Return true when there is an edge between this node and the node with
    /// key `k`.
    fn has_edge_to(&self, k: &K) -> bool;
}

/// Given a graph as a map from keys with type `K` to implementations of
/// `TCNode` with type `V`, compute the transitive closure of the hierarchy.
/// Edges to keys that are not in `nodes` are kept but not followed.
///
/// If `enforce_dag`, then also check that the hierarchy is a DAG. The error
/// names every node that lies on a cycle.
pub fn compute_tc<K, V>(nodes: &mut BTreeMap<K, V>, enforce_dag: bool) -> Result<(), K>
where
    K: Clone + Ord + Debug + Display,
    V: TCNode<K>,
{
    // Reachability is computed over the direct edges only, so a node's
    // closure never depends on the order in which the others are saturated.
    let direct: BTreeMap<K, Vec<K>> = nodes
        .iter()
        .map(|(k, node)| (k.clone(), node.out_edges().cloned().collect()))
        .collect();

    for (node_id, node) in nodes.iter_mut() {
        for ancestor in reachable_from(node_id, &direct) {
            if !node.has_edge_to(&ancestor) {
                node.add_edge_to(ancestor);
            }
        }
    }

    if enforce_dag {
        return enforce_dag_from_tc(nodes);
    }
    Ok(())
}

/// Every key reachable from `start` by following one or more edges
fn reachable_from<K: Clone + Ord>(start: &K, direct: &BTreeMap<K, Vec<K>>) -> BTreeSet<K> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<&K> = direct.get(start).into_iter().flatten().collect();
    while let Some(k) = stack.pop() {
        if seen.insert(k.clone()) {
            stack.extend(direct.get(k).into_iter().flatten());
        }
    }
    seen
}

/// Once the transitive closure is computed, a cycle manifests as a node with
/// an edge to itself.
fn enforce_dag_from_tc<K, V>(nodes: &BTreeMap<K, V>) -> Result<(), K>
where
    K: Clone + Ord + Debug + Display,
    V: TCNode<K>,
{
    let looping = nodes
        .values()
        .filter_map(|node| {
            let key = node.get_key();
            node.has_edge_to(&key).then_some(key)
        })
        .collect::<Vec<_>>();
    match NonEmpty::from_vec(looping) {
        Some(vertices) => Err(TcError::has_cycle(vertices)),
        None => Ok(()),
    }
}
