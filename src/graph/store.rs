//! Graph Store data access: append-only writes from the construction
//! pipeline, read-only batch fetches and similarity search for retrieval.
//!
//! Relationships are flat rows with no native adjacency; retrieval code
//! compensates by materializing a bounded subgraph snapshot (see
//! `retrieval::subgraph`) instead of re-querying mid-traversal.

use crate::db::Db;
use crate::error::{PaperkgError, Result};
use crate::graph::{Entity, EntityType, RelationType, Relationship};
use rusqlite::params;
use std::collections::HashSet;
use uuid::Uuid;

/// Parameters for a new entity row. The id is assigned on insert.
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub entity_type: EntityType,
    pub source_document_id: Option<String>,
    pub name: String,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
}

/// Insert a new entity and return it with its assigned id.
pub async fn create_entity(db: &Db, new: NewEntity) -> Result<Entity> {
    let entity = Entity {
        entity_id: Uuid::new_v4().to_string(),
        entity_type: new.entity_type,
        source_document_id: new.source_document_id,
        name: new.name,
        content: new.content,
        embedding: new.embedding,
    };
    let row = entity.clone();
    db.with_connection(move |conn| {
        let blob = row.embedding.as_deref().map(embedding_to_blob);
        conn.execute(
            "INSERT INTO entities (entity_id, entity_type, source_document_id, name, content, embedding) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.entity_id,
                row.entity_type.as_str(),
                row.source_document_id,
                row.name,
                row.content,
                blob,
            ],
        )?;
        Ok(())
    })
    .await?;
    Ok(entity)
}

/// Insert a directed edge. Duplicate (source, target, type) rows are allowed.
pub async fn create_relationship(
    db: &Db,
    source_entity_id: &str,
    target_entity_id: &str,
    relationship_type: RelationType,
) -> Result<Relationship> {
    let rel = Relationship {
        relationship_id: Uuid::new_v4().to_string(),
        source_entity_id: source_entity_id.to_string(),
        target_entity_id: target_entity_id.to_string(),
        relationship_type,
    };
    let row = rel.clone();
    db.with_connection(move |conn| {
        conn.execute(
            "INSERT INTO relationships (relationship_id, source_entity_id, target_entity_id, relationship_type) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                row.relationship_id,
                row.source_entity_id,
                row.target_entity_id,
                row.relationship_type.as_str(),
            ],
        )?;
        Ok(())
    })
    .await?;
    Ok(rel)
}

/// Fetch one entity by id.
pub async fn fetch_entity(db: &Db, entity_id: &str) -> Result<Option<Entity>> {
    let id = entity_id.to_string();
    db.with_connection(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT entity_id, entity_type, source_document_id, name, content, embedding \
             FROM entities WHERE entity_id = ?1",
        )?;
        let mut rows = stmt.query([&id])?;
        match rows.next()? {
            Some(row) => Ok(Some(decode_entity_row(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            )?)),
            None => Ok(None),
        }
    })
    .await
}

/// Fetch a batch of entities by id. Missing ids are silently absent from the
/// result; callers that care about broken links detect them by lookup.
pub async fn fetch_entities(db: &Db, ids: &HashSet<String>) -> Result<Vec<Entity>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = ids.iter().cloned().collect();
    db.with_connection(move |conn| {
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT entity_id, entity_type, source_document_id, name, content, embedding \
             FROM entities WHERE entity_id IN ({})",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(ids.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(decode_entity_row(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            )?);
        }
        Ok(out)
    })
    .await
}

/// Fetch every relationship touching any of the given entity ids, as either
/// source or target. One batched query per frontier round.
pub async fn fetch_relationships_touching(
    db: &Db,
    ids: &HashSet<String>,
) -> Result<Vec<Relationship>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<String> = ids.iter().cloned().collect();
    db.with_connection(move |conn| {
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT relationship_id, source_entity_id, target_entity_id, relationship_type \
             FROM relationships \
             WHERE source_entity_id IN ({ph}) OR target_entity_id IN ({ph})",
            ph = placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut bound: Vec<&String> = ids.iter().collect();
        bound.extend(ids.iter());
        let mut rows = stmt.query(rusqlite::params_from_iter(bound))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let type_str: String = row.get(3)?;
            out.push(Relationship {
                relationship_id: row.get(0)?,
                source_entity_id: row.get(1)?,
                target_entity_id: row.get(2)?,
                relationship_type: type_str.parse()?,
            });
        }
        Ok(out)
    })
    .await
}

/// Return the `k` entities of the given types closest to the query vector,
/// paired with their cosine similarity (higher = closer). Entities without
/// an embedding are skipped. Empty when no entities of those types exist.
///
/// Full-scan scoring in-process; the store has no native vector index.
pub async fn find_nearest(
    db: &Db,
    entity_types: &[EntityType],
    query_vec: &[f32],
    k: usize,
) -> Result<Vec<(Entity, f32)>> {
    if entity_types.is_empty() || k == 0 {
        return Ok(Vec::new());
    }
    let types: Vec<&'static str> = entity_types.iter().map(|t| t.as_str()).collect();
    let rows = db
        .with_connection(move |conn| {
            let placeholders = types.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                "SELECT entity_id, entity_type, source_document_id, name, content, embedding \
                 FROM entities \
                 WHERE entity_type IN ({}) AND embedding IS NOT NULL",
                placeholders
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(rusqlite::params_from_iter(types.iter()))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(decode_entity_row(
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                )?);
            }
            Ok(out)
        })
        .await?;

    let mut scored: Vec<(Entity, f32)> = rows
        .into_iter()
        .filter_map(|entity| {
            let emb = entity.embedding.as_deref()?;
            if emb.len() != query_vec.len() {
                return None;
            }
            let score = cosine_similarity(query_vec, emb);
            Some((entity, score))
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    Ok(scored)
}

/// Count entities per type. Types with no rows report zero.
pub async fn count_entities_by_type(db: &Db) -> Result<Vec<(EntityType, i64)>> {
    let counts = db
        .with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT entity_type, COUNT(*) FROM entities GROUP BY entity_type",
            )?;
            let mut rows = stmt.query([])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let type_str: String = row.get(0)?;
                out.push((type_str.parse::<EntityType>()?, row.get::<_, i64>(1)?));
            }
            Ok(out)
        })
        .await?;
    Ok(EntityType::all()
        .iter()
        .map(|t| {
            let n = counts
                .iter()
                .find(|(ct, _)| ct == t)
                .map(|(_, n)| *n)
                .unwrap_or(0);
            (*t, n)
        })
        .collect())
}

/// Count relationships per type. Types with no rows report zero.
pub async fn count_relationships_by_type(db: &Db) -> Result<Vec<(RelationType, i64)>> {
    let counts = db
        .with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT relationship_type, COUNT(*) FROM relationships GROUP BY relationship_type",
            )?;
            let mut rows = stmt.query([])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let type_str: String = row.get(0)?;
                out.push((type_str.parse::<RelationType>()?, row.get::<_, i64>(1)?));
            }
            Ok(out)
        })
        .await?;
    Ok(RelationType::all()
        .iter()
        .map(|t| {
            let n = counts
                .iter()
                .find(|(ct, _)| ct == t)
                .map(|(_, n)| *n)
                .unwrap_or(0);
            (*t, n)
        })
        .collect())
}

fn decode_entity_row(
    entity_id: String,
    entity_type: String,
    source_document_id: Option<String>,
    name: String,
    content: String,
    embedding: Option<Vec<u8>>,
) -> Result<Entity> {
    let embedding = match embedding {
        Some(blob) => Some(parse_embedding(&blob).ok_or_else(|| {
            PaperkgError::Parse(format!("Malformed embedding blob for entity {}", entity_id))
        })?),
        None => None,
    };
    Ok(Entity {
        entity_id,
        entity_type: entity_type.parse()?,
        source_document_id,
        name,
        content,
        embedding,
    })
}

/// Serialize an embedding as a little-endian f32 byte array.
pub(crate) fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Parse embedding BLOB to Vec<f32>. None if the length is not a multiple of 4.
pub(crate) fn parse_embedding(blob: &[u8]) -> Option<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return None;
    }
    blob.chunks(4)
        .map(|bytes| {
            let arr: [u8; 4] = bytes.try_into().ok()?;
            Some(f32::from_le_bytes(arr))
        })
        .collect()
}

/// Cosine similarity between two equal-length vectors, 0.0 when either has
/// zero magnitude. Order-preserving in distance: higher means closer.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(
        a.len(),
        b.len(),
        "Vectors must have same length for cosine similarity"
    );

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use std::path::Path;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Db, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Db::new(&db_path);
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
            .await
            .unwrap();
        (db, temp_dir)
    }

    fn new_entity(entity_type: EntityType, name: &str, embedding: Option<Vec<f32>>) -> NewEntity {
        NewEntity {
            entity_type,
            source_document_id: Some("doc-1".to_string()),
            name: name.to_string(),
            content: format!("content of {}", name),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_entity_round_trip() {
        let (db, _temp) = setup_test_db().await;
        let created = create_entity(
            &db,
            NewEntity {
                entity_type: EntityType::Paragraph,
                source_document_id: Some("doc-1".to_string()),
                name: "Paragraph 1".to_string(),
                content: "Exact paragraph text.".to_string(),
                embedding: Some(vec![0.5, 0.25, -1.0]),
            },
        )
        .await
        .unwrap();

        let fetched = fetch_entity(&db, &created.entity_id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "Exact paragraph text.");
        assert_eq!(fetched.entity_type, EntityType::Paragraph);
        assert_eq!(fetched.embedding.unwrap(), vec![0.5, 0.25, -1.0]);
    }

    #[tokio::test]
    async fn test_fetch_entity_missing() {
        let (db, _temp) = setup_test_db().await;
        assert!(fetch_entity(&db, "no-such-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_relationships_touching_either_end() {
        let (db, _temp) = setup_test_db().await;
        let a = create_entity(&db, new_entity(EntityType::Section, "A", None))
            .await
            .unwrap();
        let b = create_entity(&db, new_entity(EntityType::Paragraph, "B", None))
            .await
            .unwrap();
        let c = create_entity(&db, new_entity(EntityType::Claim, "C", None))
            .await
            .unwrap();
        create_relationship(&db, &a.entity_id, &b.entity_id, RelationType::ContainsParagraph)
            .await
            .unwrap();
        create_relationship(&db, &b.entity_id, &c.entity_id, RelationType::States)
            .await
            .unwrap();

        let ids: HashSet<String> = [b.entity_id.clone()].into_iter().collect();
        let rels = fetch_relationships_touching(&db, &ids).await.unwrap();
        // b is target of one edge and source of another
        assert_eq!(rels.len(), 2);
    }

    #[tokio::test]
    async fn test_find_nearest_filters_by_type() {
        let (db, _temp) = setup_test_db().await;
        create_entity(
            &db,
            new_entity(EntityType::Paragraph, "near", Some(vec![1.0, 0.0])),
        )
        .await
        .unwrap();
        create_entity(
            &db,
            new_entity(EntityType::Paragraph, "far", Some(vec![0.0, 1.0])),
        )
        .await
        .unwrap();
        create_entity(
            &db,
            new_entity(EntityType::Claim, "other-type", Some(vec![1.0, 0.0])),
        )
        .await
        .unwrap();

        let hits = find_nearest(&db, &[EntityType::Paragraph], &[1.0, 0.0], 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.name, "near");
        assert!(hits[0].1 > hits[1].1);
    }

    #[tokio::test]
    async fn test_find_nearest_empty_store() {
        let (db, _temp) = setup_test_db().await;
        let hits = find_nearest(&db, &[EntityType::Paragraph], &[1.0, 0.0], 5)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_find_nearest_skips_unembedded() {
        let (db, _temp) = setup_test_db().await;
        create_entity(&db, new_entity(EntityType::Paragraph, "no-vec", None))
            .await
            .unwrap();
        let hits = find_nearest(&db, &[EntityType::Paragraph], &[1.0, 0.0], 5)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_counts_by_type() {
        let (db, _temp) = setup_test_db().await;
        create_entity(&db, new_entity(EntityType::Paragraph, "p", None))
            .await
            .unwrap();
        let counts = count_entities_by_type(&db).await.unwrap();
        let para = counts
            .iter()
            .find(|(t, _)| *t == EntityType::Paragraph)
            .unwrap();
        assert_eq!(para.1, 1);
        let paper = counts
            .iter()
            .find(|(t, _)| *t == EntityType::ResearchPaper)
            .unwrap();
        assert_eq!(paper.1, 0);
    }

    #[test]
    fn test_embedding_blob_round_trip() {
        let vec = vec![1.0f32, -0.5, 3.25, 0.0];
        let blob = embedding_to_blob(&vec);
        assert_eq!(parse_embedding(&blob).unwrap(), vec);
    }

    #[test]
    fn test_parse_embedding_invalid_length() {
        let blob = vec![0u8, 1, 2, 3, 4]; // 5 bytes
        assert!(parse_embedding(&blob).is_none());
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_magnitude() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
