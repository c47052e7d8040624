//! Semantic seed retrieval: embed the query, then rank stored entities of
//! the requested types by vector similarity.

use crate::db::Db;
use crate::error::Result;
use crate::gateways::Embedder;
use crate::graph::{self, Entity, EntityType};

/// Return the `k` entities of the given types most similar to the query.
///
/// The score paired with each entity is raw cosine similarity (higher =
/// closer, order-preserving in distance). Returns an empty vec, not an
/// error, when no entities of the target types exist.
pub async fn find_seeds<E>(
    db: &Db,
    embedder: &E,
    query: &str,
    entity_types: &[EntityType],
    k: usize,
) -> Result<Vec<(Entity, f32)>>
where
    E: Embedder + ?Sized,
{
    let start = std::time::Instant::now();
    let query_vec = embedder.embed(query).await?;
    log::debug!("Query embedding took {:?}", start.elapsed());

    let seeds = graph::find_nearest(db, entity_types, &query_vec, k).await?;
    log::debug!(
        "Seed retrieval: {} candidates for types {:?}",
        seeds.len(),
        entity_types
    );
    Ok(seeds)
}
