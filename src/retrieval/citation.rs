//! Citation-oriented search: for each semantic seed, walk the fixed chain
//! paragraph -> section -> research paper and package the result as a
//! citable record with provenance metadata and a context summary.

use crate::config::RetrievalConfig;
use crate::db::Db;
use crate::error::{PaperkgError, Result};
use crate::gateways::{generate_typed, schemas, Embedder, Extractor};
use crate::graph::{Entity, EntityType, RelationType};
use crate::retrieval::paths::GraphPath;
use crate::retrieval::subgraph::SubgraphSnapshot;
use crate::retrieval::{load_subgraph, seed, synthesize_path};
use serde::Serialize;

/// Entity types that qualify as citation seeds.
const SEED_TYPES: [EntityType; 5] = [
    EntityType::Paragraph,
    EntityType::Claim,
    EntityType::Methodology,
    EntityType::KeyConcept,
    EntityType::Result,
];

/// Entity types worth mentioning in the context summary alongside the
/// matched paragraph.
const RELATED_TYPES: [EntityType; 5] = [
    EntityType::Citation,
    EntityType::Claim,
    EntityType::Result,
    EntityType::Methodology,
    EntityType::KeyConcept,
];

/// One citable search hit: the source paper's metadata, the matched
/// paragraph, and a short summary of its graph context.
#[derive(Debug, Clone, Serialize)]
pub struct CitationResult {
    pub paper_title: String,
    pub paper_authors: String,
    pub paper_year: String,
    pub paper_venue: String,
    pub paragraph_text: String,
    pub relevance_score: f32,
    pub context_summary: String,
}

/// Find the top-k citable passages for a query.
///
/// Seeds are drawn from paragraphs and the entity types extracted from
/// them; a non-paragraph seed is resolved to its containing paragraph
/// before the upward walk. Seeds whose paragraph/section/paper chain is
/// incomplete are skipped, never reported as partial records.
pub async fn citation_search<E, X>(
    db: &Db,
    embedder: &E,
    extractor: &X,
    query: &str,
    k: usize,
    cfg: &RetrievalConfig,
) -> Result<Vec<CitationResult>>
where
    E: Embedder + ?Sized,
    X: Extractor + ?Sized,
{
    let seeds = seed::find_seeds(db, embedder, query, &SEED_TYPES, k).await?;
    if seeds.is_empty() {
        return Ok(Vec::new());
    }

    let seed_ids: Vec<String> = seeds.iter().map(|(e, _)| e.entity_id.clone()).collect();
    // The upward chain alone needs up to 3 hops from a non-paragraph seed;
    // one more covers the seed's outgoing context entities.
    let snap = load_subgraph(db, &seed_ids, cfg.hop_budget.max(4)).await?;

    let mut results = Vec::new();
    for (seed_entity, score) in &seeds {
        let Some(paragraph) = context_paragraph(&snap, seed_entity) else {
            log::debug!(
                "Skipping seed {}: no containing paragraph",
                seed_entity.entity_id
            );
            continue;
        };
        let Some(section) = parent_of_type(
            &snap,
            &paragraph.entity_id,
            RelationType::ContainsParagraph,
            EntityType::Section,
        ) else {
            log::debug!("Skipping seed {}: paragraph has no section", seed_entity.entity_id);
            continue;
        };
        let Some(paper) = parent_of_type(
            &snap,
            &section.entity_id,
            RelationType::HasSection,
            EntityType::ResearchPaper,
        ) else {
            log::debug!("Skipping seed {}: section has no paper", seed_entity.entity_id);
            continue;
        };

        let related = related_entities(&snap, paragraph);
        let context_summary = summarize_context(extractor, &snap, paragraph, &related).await;

        let metadata = parse_paper_metadata(&paper.content);
        results.push(CitationResult {
            paper_title: metadata.title,
            paper_authors: metadata.authors,
            paper_year: metadata.year,
            paper_venue: metadata.venue,
            paragraph_text: paragraph.content.clone(),
            relevance_score: *score,
            context_summary,
        });
    }
    Ok(results)
}

/// The paragraph providing textual context for a seed: the seed itself when
/// it is a paragraph, otherwise the paragraph it was extracted from.
fn context_paragraph<'a>(snap: &'a SubgraphSnapshot, seed: &'a Entity) -> Option<&'a Entity> {
    if seed.entity_type == EntityType::Paragraph {
        return Some(seed);
    }
    snap.incoming(&seed.entity_id)
        .iter()
        .filter_map(|(source, _)| snap.entity(source))
        .find(|e| e.entity_type == EntityType::Paragraph)
}

fn parent_of_type<'a>(
    snap: &'a SubgraphSnapshot,
    id: &str,
    rel_type: RelationType,
    entity_type: EntityType,
) -> Option<&'a Entity> {
    snap.incoming(id)
        .iter()
        .filter(|(_, rt)| *rt == rel_type)
        .filter_map(|(source, _)| snap.entity(source))
        .find(|e| e.entity_type == entity_type)
}

/// One-hop outgoing neighbors of the context paragraph that carry
/// citation-relevant context. Anchored on the paragraph rather than the
/// seed: a non-paragraph seed is itself one of these children and has no
/// outgoing edges of its own.
fn related_entities<'a>(snap: &'a SubgraphSnapshot, paragraph: &Entity) -> Vec<&'a Entity> {
    snap.outgoing(&paragraph.entity_id)
        .iter()
        .filter_map(|(target, _)| snap.entity(target))
        .filter(|e| RELATED_TYPES.contains(&e.entity_type))
        .collect()
}

/// Ask the extractor for a one-sentence summary of how the related entities
/// connect to the paragraph. Gateway failure degrades to a deterministic
/// synthesis of the paragraph's outgoing edges rather than failing the
/// search.
async fn summarize_context<X>(
    extractor: &X,
    snap: &SubgraphSnapshot,
    paragraph: &Entity,
    related: &[&Entity],
) -> String
where
    X: Extractor + ?Sized,
{
    if related.is_empty() {
        return String::new();
    }

    let related_lines: Vec<String> = related
        .iter()
        .map(|e| format!("- {} '{}': {}", e.entity_type.display_phrase(), e.name, e.content))
        .collect();
    let prompt = format!(
        "Summarize in one sentence how the following extracted entities relate \
         to this paragraph.\n\nParagraph:\n{}\n\nEntities:\n{}",
        paragraph.content,
        related_lines.join("\n")
    );

    match generate_typed::<schemas::ContextSummary, X>(
        extractor,
        &prompt,
        "context_summary",
        schemas::context_summary_schema(),
    )
    .await
    {
        Ok(summary) => summary.summary,
        Err(e) => {
            log::warn!("Context summary generation failed, using fallback: {}", e);
            fallback_summary(snap, paragraph)
        }
    }
}

/// Deterministic fallback: synthesize each outgoing paragraph edge as a
/// single sentence and join them.
fn fallback_summary(snap: &SubgraphSnapshot, paragraph: &Entity) -> String {
    let mut sentences = Vec::new();
    for (target, rel_type) in snap.outgoing(&paragraph.entity_id) {
        let path = GraphPath {
            nodes: vec![paragraph.entity_id.clone(), target.clone()],
            edges: vec![*rel_type],
        };
        if let Some(sentence) = synthesize_path(snap, &path) {
            sentences.push(sentence);
        }
    }
    sentences.join(" ")
}

/// Paper provenance fields parsed back out of canonical paper content.
struct PaperMetadata {
    title: String,
    authors: String,
    venue: String,
    year: String,
}

/// Parse the `Title: ...\nAuthors: ...\nVenue: ...\nYear: ...` content
/// stored on ResearchPaper entities. Missing or unlabeled lines fall back
/// to "Unknown"; reference papers often carry only a title.
fn parse_paper_metadata(content: &str) -> PaperMetadata {
    let mut metadata = PaperMetadata {
        title: "Unknown".to_string(),
        authors: "Unknown".to_string(),
        venue: "Unknown".to_string(),
        year: "Unknown".to_string(),
    };
    for line in content.lines() {
        if let Some(rest) = line.strip_prefix("Title:") {
            metadata.title = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("Authors:") {
            metadata.authors = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("Venue:") {
            metadata.venue = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("Year:") {
            metadata.year = rest.trim().to_string();
        }
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use crate::graph::{create_entity, create_relationship, NewEntity};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::path::Path;
    use tempfile::TempDir;

    struct StubEmbedder {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.vector.clone())
        }
    }

    struct StubExtractor {
        fail: bool,
    }

    #[async_trait]
    impl Extractor for StubExtractor {
        async fn generate_structured(
            &self,
            _prompt: &str,
            schema_name: &str,
            _schema: Value,
        ) -> Result<Value> {
            if self.fail {
                return Err(PaperkgError::Extraction("stub failure".to_string()));
            }
            assert_eq!(schema_name, "context_summary");
            Ok(json!({ "summary": "The paragraph states the main claim." }))
        }
    }

    fn embedder() -> StubEmbedder {
        StubEmbedder {
            vector: vec![1.0, 0.0],
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

    /// Paper -> Section -> Paragraph (embedded) -> Claim (embedded, weaker).
    async fn build_corpus(db: &Db) -> (Entity, Entity, Entity, Entity) {
        let paper = add(
            db,
            EntityType::ResearchPaper,
            "Graph Reasoning at Scale",
            "Title: Graph Reasoning at Scale\nAuthors: Ada Lovelace, Alan Turing\nVenue: NeurIPS\nYear: 2024",
            None,
        )
        .await;
        let section = add(db, EntityType::Section, "Results", "Summary of results.", None).await;
        let paragraph = add(
            db,
            EntityType::Paragraph,
            "Paragraph 1",
            "Our method improves recall by 12 points.",
            Some(vec![1.0, 0.0]),
        )
        .await;
        let claim = add(
            db,
            EntityType::Claim,
            "Recall Claim",
            "Recall improves by 12 points.",
            Some(vec![0.9, 0.1]),
        )
        .await;
        create_relationship(db, &paper.entity_id, &section.entity_id, RelationType::HasSection)
            .await
            .unwrap();
        create_relationship(
            db,
            &section.entity_id,
            &paragraph.entity_id,
            RelationType::ContainsParagraph,
        )
        .await
        .unwrap();
        create_relationship(db, &paragraph.entity_id, &claim.entity_id, RelationType::States)
            .await
            .unwrap();
        (paper, section, paragraph, claim)
    }

    #[tokio::test]
    async fn test_paragraph_seed_yields_full_record() {
        let (db, _temp) = setup_test_db().await;
        build_corpus(&db).await;

        let results = citation_search(
            &db,
            &embedder(),
            &StubExtractor { fail: false },
            "recall improvements",
            1,
            &cfg(),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.paper_title, "Graph Reasoning at Scale");
        assert_eq!(hit.paper_authors, "Ada Lovelace, Alan Turing");
        assert_eq!(hit.paper_venue, "NeurIPS");
        assert_eq!(hit.paper_year, "2024");
        assert_eq!(hit.paragraph_text, "Our method improves recall by 12 points.");
        assert!((hit.relevance_score - 1.0).abs() < 1e-5);
        assert_eq!(hit.context_summary, "The paragraph states the main claim.");
    }

    #[tokio::test]
    async fn test_non_paragraph_seed_resolves_containing_paragraph() {
        let (db, _temp) = setup_test_db().await;
        let (_paper, _section, paragraph, _claim) = build_corpus(&db).await;

        // Top 2 seeds are the paragraph and the claim; both resolve to the
        // same context paragraph and full provenance chain.
        let results = citation_search(
            &db,
            &embedder(),
            &StubExtractor { fail: false },
            "recall improvements",
            2,
            &cfg(),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 2);
        for hit in &results {
            assert_eq!(hit.paragraph_text, paragraph.content);
            assert_eq!(hit.paper_title, "Graph Reasoning at Scale");
        }
        assert!(results[0].relevance_score >= results[1].relevance_score);
    }

    #[tokio::test]
    async fn test_broken_chain_seed_skipped() {
        let (db, _temp) = setup_test_db().await;
        // Paragraph with no section or paper above it
        add(
            &db,
            EntityType::Paragraph,
            "Paragraph 1",
            "Orphan paragraph.",
            Some(vec![1.0, 0.0]),
        )
        .await;

        let results = citation_search(
            &db,
            &embedder(),
            &StubExtractor { fail: false },
            "anything",
            1,
            &cfg(),
        )
        .await
        .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_summary_failure_falls_back_to_synthesis() {
        let (db, _temp) = setup_test_db().await;
        build_corpus(&db).await;

        let results = citation_search(
            &db,
            &embedder(),
            &StubExtractor { fail: true },
            "recall improvements",
            1,
            &cfg(),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].context_summary,
            "The paragraph 'Our method improves recall by 12 points.' states \
             the claim 'Recall Claim'."
        );
    }

    #[tokio::test]
    async fn test_claim_seed_summary_covers_paragraph_children() {
        let (db, _temp) = setup_test_db().await;
        let (_paper, _section, paragraph, claim) = build_corpus(&db).await;
        // A second extracted child of the same paragraph; unembedded so the
        // claim stays the top seed.
        let method = add(
            &db,
            EntityType::Methodology,
            "Ablation Protocol",
            "Leave-one-out ablation.",
            None,
        )
        .await;
        create_relationship(&db, &paragraph.entity_id, &method.entity_id, RelationType::Uses)
            .await
            .unwrap();

        // Seed on the claim, not the paragraph
        let claim_embedder = StubEmbedder {
            vector: vec![0.9, 0.1],
        };
        let results = citation_search(
            &db,
            &claim_embedder,
            &StubExtractor { fail: true },
            "recall claim",
            1,
            &cfg(),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].paragraph_text, paragraph.content);
        // The claim has no outgoing edges of its own; the summary still
        // covers the paragraph's extracted children.
        let summary = &results[0].context_summary;
        assert!(!summary.is_empty());
        assert!(summary.contains(&claim.name));
        assert!(summary.contains("Ablation Protocol"));
    }

    #[tokio::test]
    async fn test_no_related_entities_yields_empty_summary() {
        let (db, _temp) = setup_test_db().await;
        let paper = add(
            &db,
            EntityType::ResearchPaper,
            "P",
            "Title: P\nAuthors: A\nVenue: V\nYear: 2020",
            None,
        )
        .await;
        let section = add(&db, EntityType::Section, "Intro", "Summary.", None).await;
        let paragraph = add(
            &db,
            EntityType::Paragraph,
            "Paragraph 1",
            "Plain paragraph.",
            Some(vec![1.0, 0.0]),
        )
        .await;
        create_relationship(&db, &paper.entity_id, &section.entity_id, RelationType::HasSection)
            .await
            .unwrap();
        create_relationship(
            &db,
            &section.entity_id,
            &paragraph.entity_id,
            RelationType::ContainsParagraph,
        )
        .await
        .unwrap();

        let results = citation_search(
            &db,
            &embedder(),
            &StubExtractor { fail: false },
            "anything",
            1,
            &cfg(),
        )
        .await
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].context_summary, "");
    }

    #[test]
    fn test_parse_paper_metadata_defaults_to_unknown() {
        let metadata = parse_paper_metadata("Title: Only A Title");
        assert_eq!(metadata.title, "Only A Title");
        assert_eq!(metadata.authors, "Unknown");
        assert_eq!(metadata.venue, "Unknown");
        assert_eq!(metadata.year, "Unknown");

        let empty = parse_paper_metadata("");
        assert_eq!(empty.title, "Unknown");
    }
}
