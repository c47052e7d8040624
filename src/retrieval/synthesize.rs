//! Deterministic natural-language rendering of graph paths.
//!
//! A pure function of the path and the snapshot: the same inputs always
//! produce the same sentence.

use crate::retrieval::paths::GraphPath;
use crate::retrieval::subgraph::SubgraphSnapshot;

/// Render a path (presentation order, length >= 1 edge) into one sentence:
///
/// `The <type> '<text>' <relation> the <type> '<text>', which <relation>
/// the <type> '<text>'.`
///
/// Returns None when the path is too short or any node cannot be resolved
/// in the snapshot; partial sentences are never produced.
pub fn synthesize_path(snap: &SubgraphSnapshot, path: &GraphPath) -> Option<String> {
    if path.nodes.len() < 2 || path.edges.len() != path.nodes.len() - 1 {
        return None;
    }

    let mut entities = Vec::with_capacity(path.nodes.len());
    for id in &path.nodes {
        entities.push(snap.entity(id)?);
    }

    let mut sentence = String::new();
    let first = entities[0];
    let second = entities[1];
    sentence.push_str(&format!(
        "The {} '{}' {} the {} '{}'",
        first.entity_type.display_phrase(),
        first.display_text(),
        path.edges[0].display_phrase(),
        second.entity_type.display_phrase(),
        second.display_text(),
    ));

    for (i, edge) in path.edges.iter().enumerate().skip(1) {
        let next = entities[i + 1];
        sentence.push_str(&format!(
            ", which {} the {} '{}'",
            edge.display_phrase(),
            next.entity_type.display_phrase(),
            next.display_text(),
        ));
    }

    sentence.push('.');
    Some(capitalize(&sentence))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
