//! Bounded local subgraph materialization.
//!
//! The store keeps relationships as flat rows with no adjacency index, so
//! each query loads a hop-bounded neighborhood around its seed nodes into an
//! in-memory snapshot once, walks that, and discards it. Traversal never
//! re-queries the store.

use crate::db::Db;
use crate::error::Result;
use crate::graph::{self, Entity, RelationType, Relationship};
use std::collections::{HashMap, HashSet};

/// Immutable in-memory view of one query's local neighborhood: entities by
/// id plus both adjacency directions.
pub struct SubgraphSnapshot {
    entities: HashMap<String, Entity>,
    outgoing: HashMap<String, Vec<(String, RelationType)>>,
    incoming: HashMap<String, Vec<(String, RelationType)>>,
    relationship_count: usize,
}

impl SubgraphSnapshot {
    /// Build a snapshot from already-fetched rows. The loader uses this;
    /// tests construct snapshots directly.
    pub fn from_parts(entities: Vec<Entity>, relationships: Vec<Relationship>) -> Self {
        let entities: HashMap<String, Entity> = entities
            .into_iter()
            .map(|e| (e.entity_id.clone(), e))
            .collect();
        let mut outgoing: HashMap<String, Vec<(String, RelationType)>> = HashMap::new();
        let mut incoming: HashMap<String, Vec<(String, RelationType)>> = HashMap::new();
        let relationship_count = relationships.len();
        for rel in relationships {
            outgoing
                .entry(rel.source_entity_id.clone())
                .or_default()
                .push((rel.target_entity_id.clone(), rel.relationship_type));
            incoming
                .entry(rel.target_entity_id)
                .or_default()
                .push((rel.source_entity_id, rel.relationship_type));
        }
        Self {
            entities,
            outgoing,
            incoming,
            relationship_count,
        }
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Edges leaving `id`: (target id, relationship type).
    pub fn outgoing(&self, id: &str) -> &[(String, RelationType)] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Edges entering `id`: (source id, relationship type).
    pub fn incoming(&self, id: &str) -> &[(String, RelationType)] {
        self.incoming.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationship_count
    }
}

/// Expand outward from the seed ids for at most `hop_budget` rounds, one
/// batched relationship fetch per round, then fetch all visited entities in
/// one batch. Terminates early when a round discovers nothing new, and in at
/// most `hop_budget` rounds regardless of cycles.
pub async fn load_subgraph(
    db: &Db,
    seed_ids: &[String],
    hop_budget: usize,
) -> Result<SubgraphSnapshot> {
    let mut visited: HashSet<String> = seed_ids.iter().cloned().collect();
    let mut frontier: HashSet<String> = visited.clone();
    let mut seen_rels: HashSet<String> = HashSet::new();
    let mut relationships: Vec<Relationship> = Vec::new();

    for round in 0..hop_budget {
        if frontier.is_empty() {
            break;
        }
        let batch = graph::fetch_relationships_touching(db, &frontier).await?;
        log::debug!(
            "Subgraph round {}: {} frontier nodes, {} relationships",
            round + 1,
            frontier.len(),
            batch.len()
        );

        let mut next_frontier = HashSet::new();
        for rel in batch {
            for id in [&rel.source_entity_id, &rel.target_entity_id] {
                if !visited.contains(id.as_str()) {
                    next_frontier.insert(id.clone());
                }
            }
            // Touching queries re-return edges across rounds
            if seen_rels.insert(rel.relationship_id.clone()) {
                relationships.push(rel);
            }
        }
        visited.extend(next_frontier.iter().cloned());
        frontier = next_frontier;
    }

    let entities = graph::fetch_entities(db, &visited).await?;
    Ok(SubgraphSnapshot::from_parts(entities, relationships))
}
