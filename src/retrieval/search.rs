//! The search-and-explain flow: seed on paragraphs, load the local
//! subgraph, enumerate ancestor-ward and descendant-ward paths from each
//! seed, and synthesize a deduplicated, lexicographically sorted list of
//! explanation sentences.

use crate::config::RetrievalConfig;
use crate::db::Db;
use crate::error::{PaperkgError, Result};
use crate::gateways::Embedder;
use crate::graph::EntityType;
use crate::retrieval::{ancestor_paths, descendant_paths, load_subgraph, seed, synthesize_path};
use std::collections::BTreeSet;

/// Sentinel returned when no paragraph seeds match the query at all.
pub const NO_MATCHES_MESSAGE: &str = "No matching paragraphs found in the knowledge graph.";

/// Sentinel returned when seeds matched but nothing about them could be
/// explained. Distinct from NO_MATCHES_MESSAGE: these are different failure
/// modes, worth distinguishing in tests and UI messaging.
pub const NO_CONNECTIONS_MESSAGE: &str =
    "Found matching paragraphs, but they have no relationships in the graph.";

/// Sentinel returned when the query itself could not be embedded.
/// Retrieval is best-effort; gateway failures surface as a result rather
/// than a fault.
pub const EMBEDDING_FAILED_MESSAGE: &str = "Failed to generate embedding for the query.";

/// Answer a free-text query with explanation sentences.
///
/// Ancestor-ward paths terminate at ResearchPaper entities and are rendered
/// root-first (the natural stored edge direction), so the canonical chain
/// reads `paper has section ..., which contains paragraph ...`.
/// Descendant-ward paths are rendered as walked. Output is deduplicated by
/// rendered string and sorted lexicographically for determinism.
pub async fn search_and_explain<E>(
    db: &Db,
    embedder: &E,
    query: &str,
    cfg: &RetrievalConfig,
) -> Result<Vec<String>>
where
    E: Embedder + ?Sized,
{
    let seeds =
        match seed::find_seeds(db, embedder, query, &[EntityType::Paragraph], cfg.default_k).await
        {
            Ok(seeds) => seeds,
            Err(PaperkgError::Embedding(e)) => {
                log::warn!("Query embedding failed: {}", e);
                return Ok(vec![EMBEDDING_FAILED_MESSAGE.to_string()]);
            }
            Err(e) => return Err(e),
        };

    if seeds.is_empty() {
        return Ok(vec![NO_MATCHES_MESSAGE.to_string()]);
    }

    let seed_ids: Vec<String> = seeds.iter().map(|(e, _)| e.entity_id.clone()).collect();
    let snap = load_subgraph(db, &seed_ids, cfg.hop_budget).await?;
    log::debug!(
        "Loaded subgraph: {} entities, {} relationships",
        snap.entity_count(),
        snap.relationship_count()
    );

    if snap.relationship_count() == 0 {
        return Ok(vec![NO_CONNECTIONS_MESSAGE.to_string()]);
    }

    let mut sentences: BTreeSet<String> = BTreeSet::new();
    for seed_id in &seed_ids {
        for path in ancestor_paths(&snap, seed_id, EntityType::ResearchPaper) {
            if let Some(sentence) = synthesize_path(&snap, &path.reversed()) {
                sentences.insert(sentence);
            }
        }
        for path in descendant_paths(&snap, seed_id, cfg.descendant_depth) {
            if let Some(sentence) = synthesize_path(&snap, &path) {
                sentences.insert(sentence);
            }
        }
    }

    if sentences.is_empty() {
        return Ok(vec![NO_CONNECTIONS_MESSAGE.to_string()]);
    }

    // BTreeSet iteration order is already lexicographic
    Ok(sentences.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use crate::graph::{create_entity, create_relationship, Entity, NewEntity, RelationType};
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    struct StubEmbedder {
        vector: Vec<f32>,
        fail: bool,
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            if self.fail {
                Err(PaperkgError::Embedding("stub failure".to_string()))
            } else {
                Ok(self.vector.clone())
            }
        }
    }

    fn embedder() -> StubEmbedder {
        StubEmbedder {
            vector: vec![1.0, 0.0],
            fail: false,
        }
    }

    fn cfg() -> RetrievalConfig {
        RetrievalConfig::default()
    }

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

    async fn add(
        db: &Db,
        entity_type: EntityType,
        name: &str,
        content: &str,
        embedding: Option<Vec<f32>>,
    ) -> Entity {
        create_entity(
            db,
            NewEntity {
                entity_type,
                source_document_id: Some("doc".to_string()),
                name: name.to_string(),
                content: content.to_string(),
                embedding,
            },
        )
        .await
        .unwrap()
    }

    /// Paper A -HAS_SECTION-> Section B -CONTAINS_PARAGRAPH-> Paragraph C
    /// -STATES-> Claim D, with C embedded near the stub query vector.
    async fn build_linear_chain(db: &Db) -> (Entity, Entity, Entity, Entity) {
        let a = add(db, EntityType::ResearchPaper, "Paper A", "Title: Paper A", None).await;
        let b = add(db, EntityType::Section, "Section B", "Summary of B.", None).await;
        let c = add(
            db,
            EntityType::Paragraph,
            "Paragraph 1",
            "Paragraph C text.",
            Some(vec![1.0, 0.0]),
        )
        .await;
        let d = add(db, EntityType::Claim, "Claim D", "D holds.", None).await;
        create_relationship(db, &a.entity_id, &b.entity_id, RelationType::HasSection)
            .await
            .unwrap();
        create_relationship(db, &b.entity_id, &c.entity_id, RelationType::ContainsParagraph)
            .await
            .unwrap();
        create_relationship(db, &c.entity_id, &d.entity_id, RelationType::States)
            .await
            .unwrap();
        (a, b, c, d)
    }

    #[tokio::test]
    async fn test_empty_graph_returns_no_matches_sentinel() {
        let (db, _temp) = setup_test_db().await;
        let results = search_and_explain(&db, &embedder(), "anything", &cfg())
            .await
            .unwrap();
        assert_eq!(results, vec![NO_MATCHES_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_isolated_paragraph_returns_no_connections_sentinel() {
        let (db, _temp) = setup_test_db().await;
        add(
            &db,
            EntityType::Paragraph,
            "Paragraph 1",
            "Lonely paragraph.",
            Some(vec![1.0, 0.0]),
        )
        .await;
        let results = search_and_explain(&db, &embedder(), "anything", &cfg())
            .await
            .unwrap();
        assert_eq!(results, vec![NO_CONNECTIONS_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_embedding_failure_surfaces_as_result() {
        let (db, _temp) = setup_test_db().await;
        let failing = StubEmbedder {
            vector: vec![],
            fail: true,
        };
        let results = search_and_explain(&db, &failing, "anything", &cfg())
            .await
            .unwrap();
        assert_eq!(results, vec![EMBEDDING_FAILED_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_linear_chain_ancestor_sentence_reads_root_first() {
        let (db, _temp) = setup_test_db().await;
        build_linear_chain(&db).await;

        let results = search_and_explain(&db, &embedder(), "query", &cfg())
            .await
            .unwrap();

        // Ancestor path [C, B, A] is presented reversed: A has section B,
        // which contains paragraph C.
        let ancestor = results
            .iter()
            .find(|s| s.contains("has section"))
            .expect("ancestor sentence present");
        assert_eq!(
            ancestor,
            "The research paper 'Paper A' has section the section 'Section B', \
             which contains paragraph the paragraph 'Paragraph C text.'."
        );
        // Descendant sentence for the claim edge is present as well
        assert!(results
            .iter()
            .any(|s| s.contains("states the claim 'Claim D'")));
    }

    #[tokio::test]
    async fn test_results_sorted_lexicographically_and_deterministic() {
        let (db, _temp) = setup_test_db().await;
        build_linear_chain(&db).await;

        let first = search_and_explain(&db, &embedder(), "query", &cfg())
            .await
            .unwrap();
        let second = search_and_explain(&db, &embedder(), "query", &cfg())
            .await
            .unwrap();
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(first, sorted);
    }

    #[tokio::test]
    async fn test_duplicate_relationships_deduplicated_by_sentence() {
        let (db, _temp) = setup_test_db().await;
        let (_a, _b, c, d) = build_linear_chain(&db).await;
        // Second identical (C, D, STATES) row
        create_relationship(&db, &c.entity_id, &d.entity_id, RelationType::States)
            .await
            .unwrap();

        let results = search_and_explain(&db, &embedder(), "query", &cfg())
            .await
            .unwrap();
        let claim_sentences: Vec<_> = results
            .iter()
            .filter(|s| s.contains("states the claim 'Claim D'"))
            .collect();
        assert_eq!(claim_sentences.len(), 1);
    }

    #[tokio::test]
    async fn test_broken_link_path_silently_dropped() {
        let (db, _temp) = setup_test_db().await;
        let c = add(
            &db,
            EntityType::Paragraph,
            "Paragraph 1",
            "Paragraph C text.",
            Some(vec![1.0, 0.0]),
        )
        .await;
        // Edge to an entity id that does not exist in the store
        db.with_connection({
            let c_id = c.entity_id.clone();
            move |conn| {
                conn.execute(
                    "INSERT INTO relationships (relationship_id, source_entity_id, target_entity_id, relationship_type) \
                     VALUES ('r-broken', ?1, 'ghost-id', 'STATES')",
                    [&c_id],
                )?;
                Ok(())
            }
        })
        .await
        .unwrap();

        let results = search_and_explain(&db, &embedder(), "query", &cfg())
            .await
            .unwrap();
        // The only candidate path is unexplainable; no error is raised
        assert_eq!(results, vec![NO_CONNECTIONS_MESSAGE.to_string()]);
        assert!(!results.iter().any(|s| s.contains("ghost")));
    }
}
