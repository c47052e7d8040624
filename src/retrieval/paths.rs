//! Path enumeration over a subgraph snapshot: ancestor-ward (incoming
//! edges, terminating at a target entity type) and descendant-ward
//! (outgoing edges, depth-bounded, retaining intermediate paths).
//!
//! Both are path-accumulating BFS. Cycle safety is per path: a node already
//! on the current path is never revisited, so enumeration terminates even on
//! cyclic graphs. The frontier may reach a node again via a different path;
//! distinct paths are distinct evidence.

use crate::graph::{EntityType, RelationType};
use crate::retrieval::subgraph::SubgraphSnapshot;
use std::collections::VecDeque;

/// An ordered walk through the subgraph: `nodes[i] -edges[i]-> nodes[i+1]`
/// in presentation order. `edges.len() == nodes.len() - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPath {
    pub nodes: Vec<String>,
    pub edges: Vec<RelationType>,
}

impl GraphPath {
    fn single(start: &str) -> Self {
        Self {
            nodes: vec![start.to_string()],
            edges: Vec::new(),
        }
    }

    fn extended(&self, node: &str, edge: RelationType) -> Self {
        let mut nodes = self.nodes.clone();
        nodes.push(node.to_string());
        let mut edges = self.edges.clone();
        edges.push(edge);
        Self { nodes, edges }
    }

    fn contains(&self, node: &str) -> bool {
        self.nodes.iter().any(|n| n == node)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Reverse node and edge order. An ancestor-ward walk is enumerated
    /// leaf-to-root; reversing it yields root-first presentation order where
    /// every edge again points in its natural stored direction.
    pub fn reversed(&self) -> Self {
        let mut nodes = self.nodes.clone();
        nodes.reverse();
        let mut edges = self.edges.clone();
        edges.reverse();
        Self { nodes, edges }
    }
}

/// Enumerate all paths from `start` along incoming edges that terminate at
/// an entity of `target_type`. Paths that dead-end before reaching the
/// target are discarded. A node whose entity row is missing from the
/// snapshot is treated as a dead end.
pub fn ancestor_paths(
    snap: &SubgraphSnapshot,
    start: &str,
    target_type: EntityType,
) -> Vec<GraphPath> {
    let mut results = Vec::new();
    let mut queue: VecDeque<GraphPath> = VecDeque::new();
    queue.push_back(GraphPath::single(start));

    while let Some(path) = queue.pop_front() {
        let last = path.nodes.last().expect("path is never empty");
        for (parent, rel_type) in snap.incoming(last) {
            if path.contains(parent) {
                continue;
            }
            let Some(parent_entity) = snap.entity(parent) else {
                continue;
            };
            let extended = path.extended(parent, *rel_type);
            if parent_entity.entity_type == target_type {
                results.push(extended);
            } else {
                queue.push_back(extended);
            }
        }
    }
    results
}

/// Enumerate all paths from `start` along outgoing edges, up to `max_depth`
/// hops. Every path of length >= 1 is retained, not only maximal ones;
/// intermediate-depth context is also meaningful.
pub fn descendant_paths(
    snap: &SubgraphSnapshot,
    start: &str,
    max_depth: usize,
) -> Vec<GraphPath> {
    let mut results = Vec::new();
    let mut queue: VecDeque<GraphPath> = VecDeque::new();
    queue.push_back(GraphPath::single(start));

    while let Some(path) = queue.pop_front() {
        if path.len() >= max_depth {
            continue;
        }
        let last = path.nodes.last().expect("path is never empty");
        for (child, rel_type) in snap.outgoing(last) {
            if path.contains(child) {
                continue;
            }
            let extended = path.extended(child, *rel_type);
            results.push(extended.clone());
            queue.push_back(extended);
        }
    }
    results
}
