//! Graph construction pipeline: turns one ingested document's text into a
//! connected, typed subgraph rooted at a ResearchPaper entity.
//!
//! Four ordered rounds, each depending on the previous round's output:
//! 1. paper metadata -> root ResearchPaper entity (failure is fatal)
//! 2. section splitting + summaries -> Section entities
//! 3. paragraph splitting + classification -> Paragraph and typed sub-entities
//! 4. citation parsing -> Citation entities and external reference papers
//!
//! Gateway failures after Round 1 skip the single item being processed and
//! are recorded on the report, never aborting the document.

pub mod segment;

use crate::config::ExtractionConfig;
use crate::db::Db;
use crate::error::Result;
use crate::gateways::schemas::{
    paper_details_schema, paragraph_analysis_schema, section_chunk_list_schema,
    section_summary_schema, PaperDetails, ParagraphAnalysis, ReferenceDetails, SectionChunk,
    SectionChunkList, SectionSummary,
};
use crate::gateways::{generate_typed, Embedder, Extractor};
use crate::graph::{self, Entity, EntityType, NewEntity, RelationType};

/// Which round an item was skipped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Round {
    PaperMetadata,
    Sections,
    Paragraphs,
    Citations,
}

/// One skipped item: which round, what was being processed, why.
#[derive(Debug, Clone)]
pub struct Skip {
    pub round: Round,
    pub item: String,
    pub reason: String,
}

/// Per-document construction outcome: what was created and what was skipped.
/// A report with skips is a partial success, not a failure; only a Round 1
/// abort surfaces as an error.
#[derive(Debug, Default)]
pub struct ConstructionReport {
    pub document_id: String,
    pub paper_entity_id: String,
    pub sections_created: usize,
    pub paragraphs_created: usize,
    pub entities_created: usize,
    pub citations_created: usize,
    pub references_resolved: usize,
    pub skips: Vec<Skip>,
}

impl ConstructionReport {
    fn skip(&mut self, round: Round, item: &str, reason: impl ToString) {
        let reason = reason.to_string();
        log::warn!("Construction skip ({:?}) {}: {}", round, item, reason);
        self.skips.push(Skip {
            round,
            item: item.to_string(),
            reason,
        });
    }
}

/// Run the full construction pipeline for one document.
///
/// Writes commit per entity/relationship; a mid-pipeline abort can leave a
/// partially constructed subtree, but every committed entity after Round 1
/// is reachable from the paper root, and a Round 1 abort writes nothing.
pub async fn construct_document<E, X>(
    db: &Db,
    embedder: &E,
    extractor: &X,
    cfg: &ExtractionConfig,
    document_id: &str,
    text: &str,
) -> Result<ConstructionReport>
where
    E: Embedder + ?Sized,
    X: Extractor + ?Sized,
{
    let mut report = ConstructionReport {
        document_id: document_id.to_string(),
        ..Default::default()
    };

    // Round 1: no usable graph without a root entity, so any failure here
    // propagates and nothing is written.
    let paper = round_1_paper(db, embedder, extractor, cfg, document_id, text).await?;
    report.paper_entity_id = paper.entity_id.clone();
    log::info!(
        "Round 1 complete for {}: paper entity '{}'",
        document_id,
        paper.name
    );

    // Round 2: sections
    let sections =
        round_2_sections(db, embedder, extractor, cfg, document_id, text, &paper, &mut report)
            .await;
    log::info!(
        "Round 2 complete for {}: {} sections",
        document_id,
        report.sections_created
    );

    // Rounds 3 and 4: paragraphs, classified sub-entities, citations
    for (section_entity, section_text) in &sections {
        round_3_paragraphs(
            db,
            embedder,
            extractor,
            cfg,
            document_id,
            section_entity,
            section_text,
            &mut report,
        )
        .await;
    }
    log::info!(
        "Construction complete for {}: {} paragraphs, {} entities, {} citations ({} resolved), {} skips",
        document_id,
        report.paragraphs_created,
        report.entities_created,
        report.citations_created,
        report.references_resolved,
        report.skips.len()
    );

    Ok(report)
}

async fn round_1_paper<E, X>(
    db: &Db,
    embedder: &E,
    extractor: &X,
    cfg: &ExtractionConfig,
    document_id: &str,
    text: &str,
) -> Result<Entity>
where
    E: Embedder + ?Sized,
    X: Extractor + ?Sized,
{
    let prefix = segment::truncate_chars(text, cfg.metadata_prefix_chars);
    let prompt = format!(
        "Extract the metadata of this research paper: its full title, all author \
         names, the publication venue, and the publication year.\n\n{}",
        prefix
    );
    let details: PaperDetails =
        generate_typed(extractor, &prompt, "paper_details", paper_details_schema()).await?;

    let content = details.canonical_content();
    let embedding = embedder.embed(&content).await?;
    graph::create_entity(
        db,
        NewEntity {
            entity_type: EntityType::ResearchPaper,
            source_document_id: Some(document_id.to_string()),
            name: details.title,
            content,
            embedding: Some(embedding),
        },
    )
    .await
}

/// Returns the created Section entities paired with their raw section text,
/// which Round 3 consumes.
#[allow(clippy::too_many_arguments)]
async fn round_2_sections<E, X>(
    db: &Db,
    embedder: &E,
    extractor: &X,
    cfg: &ExtractionConfig,
    document_id: &str,
    text: &str,
    paper: &Entity,
    report: &mut ConstructionReport,
) -> Vec<(Entity, String)>
where
    E: Embedder + ?Sized,
    X: Extractor + ?Sized,
{
    // Prefer heading markers; fall back to gateway segmentation when the
    // document carries no structure.
    let mut chunks = segment::split_sections(text);
    if chunks.is_empty() {
        let prompt = format!(
            "Split the following research paper text into its main sections \
             (e.g. Abstract, Introduction, Methodology, Results, Conclusion, References). \
             The section_text field must contain the full text of that section.\n\n{}",
            text
        );
        match generate_typed::<SectionChunkList, _>(
            extractor,
            &prompt,
            "section_chunk_list",
            section_chunk_list_schema(),
        )
        .await
        {
            Ok(list) => chunks = list.sections,
            Err(e) => {
                report.skip(Round::Sections, "section segmentation fallback", e);
                return Vec::new();
            }
        }
    }

    let mut sections = Vec::new();
    for chunk in chunks {
        if chunk.section_text.chars().count() < cfg.min_section_chars {
            log::debug!(
                "Skipping short section '{}' in {}",
                chunk.section_title,
                document_id
            );
            continue;
        }
        match summarize_section(db, embedder, extractor, document_id, paper, &chunk).await {
            Ok(entity) => {
                report.sections_created += 1;
                sections.push((entity, chunk.section_text));
            }
            Err(e) => report.skip(Round::Sections, &chunk.section_title, e),
        }
    }
    sections
}

async fn summarize_section<E, X>(
    db: &Db,
    embedder: &E,
    extractor: &X,
    document_id: &str,
    paper: &Entity,
    chunk: &SectionChunk,
) -> Result<Entity>
where
    E: Embedder + ?Sized,
    X: Extractor + ?Sized,
{
    let prompt = format!(
        "Summarize the following section of a research paper in one paragraph.\n\n\
         Section title: {}\n\n{}",
        chunk.section_title, chunk.section_text
    );
    let summary: SectionSummary = generate_typed(
        extractor,
        &prompt,
        "section_summary",
        section_summary_schema(),
    )
    .await?;

    let embedding = embedder.embed(&summary.summary).await?;
    let entity = graph::create_entity(
        db,
        NewEntity {
            entity_type: EntityType::Section,
            source_document_id: Some(document_id.to_string()),
            name: chunk.section_title.clone(),
            content: summary.summary,
            embedding: Some(embedding),
        },
    )
    .await?;
    graph::create_relationship(db, &paper.entity_id, &entity.entity_id, RelationType::HasSection)
        .await?;
    Ok(entity)
}

#[allow(clippy::too_many_arguments)]
async fn round_3_paragraphs<E, X>(
    db: &Db,
    embedder: &E,
    extractor: &X,
    cfg: &ExtractionConfig,
    document_id: &str,
    section: &Entity,
    section_text: &str,
    report: &mut ConstructionReport,
) where
    E: Embedder + ?Sized,
    X: Extractor + ?Sized,
{
    let paragraphs = segment::split_paragraphs(section_text, cfg.min_paragraph_chars);

    for (idx, para_text) in paragraphs.iter().enumerate() {
        let label = format!("{} / Paragraph {}", section.name, idx + 1);

        // An embedding failure aborts this one paragraph, not the round.
        let embedding = match embedder.embed(para_text).await {
            Ok(v) => v,
            Err(e) => {
                report.skip(Round::Paragraphs, &label, e);
                continue;
            }
        };
        let paragraph = match graph::create_entity(
            db,
            NewEntity {
                entity_type: EntityType::Paragraph,
                source_document_id: Some(document_id.to_string()),
                name: format!("Paragraph {}", idx + 1),
                content: para_text.clone(),
                embedding: Some(embedding),
            },
        )
        .await
        {
            Ok(p) => p,
            Err(e) => {
                report.skip(Round::Paragraphs, &label, e);
                continue;
            }
        };
        if let Err(e) = graph::create_relationship(
            db,
            &section.entity_id,
            &paragraph.entity_id,
            RelationType::ContainsParagraph,
        )
        .await
        {
            report.skip(Round::Paragraphs, &label, e);
            continue;
        }
        report.paragraphs_created += 1;

        // Classification failure leaves a bare paragraph node behind, which
        // is still useful to retrieval.
        let prompt = format!(
            "Classify the entities discussed in this paragraph of a research paper. \
             For each, return its type, the relationship from the paragraph to it, a \
             short name, and a content summary (for a Citation, the full citation text).\n\n{}",
            para_text
        );
        let analysis = match generate_typed::<ParagraphAnalysis, _>(
            extractor,
            &prompt,
            "paragraph_analysis",
            paragraph_analysis_schema(),
        )
        .await
        {
            Ok(a) => a,
            Err(e) => {
                report.skip(Round::Paragraphs, &label, e);
                continue;
            }
        };

        for classified in analysis.classified_entities {
            let entity_type: EntityType = match classified.entity_type.parse() {
                Ok(t) => t,
                Err(e) => {
                    report.skip(Round::Paragraphs, &label, e);
                    continue;
                }
            };
            let relationship_type: RelationType = match classified.relationship_type.parse() {
                Ok(t) => t,
                Err(e) => {
                    report.skip(Round::Paragraphs, &label, e);
                    continue;
                }
            };

            if entity_type == EntityType::Citation {
                round_4_citation(
                    db,
                    embedder,
                    extractor,
                    &paragraph,
                    &classified.name,
                    &classified.content,
                    report,
                )
                .await;
                continue;
            }

            match create_embedded(
                db,
                embedder,
                entity_type,
                Some(document_id.to_string()),
                &classified.name,
                &classified.content,
            )
            .await
            {
                Ok(entity) => {
                    if let Err(e) = graph::create_relationship(
                        db,
                        &paragraph.entity_id,
                        &entity.entity_id,
                        relationship_type,
                    )
                    .await
                    {
                        report.skip(Round::Paragraphs, &classified.name, e);
                        continue;
                    }
                    report.entities_created += 1;
                }
                Err(e) => report.skip(Round::Paragraphs, &classified.name, e),
            }
        }
    }
}

/// Round 4: materialize a citation found in a paragraph and try to resolve
/// it into an external reference paper. Reference papers are deliberately
/// not deduplicated; repeated citations of the same work create distinct
/// entities.
async fn round_4_citation<E, X>(
    db: &Db,
    embedder: &E,
    extractor: &X,
    paragraph: &Entity,
    name: &str,
    citation_text: &str,
    report: &mut ConstructionReport,
) where
    E: Embedder + ?Sized,
    X: Extractor + ?Sized,
{
    let citation = match create_embedded(
        db,
        embedder,
        EntityType::Citation,
        paragraph.source_document_id.clone(),
        name,
        citation_text,
    )
    .await
    {
        Ok(c) => c,
        Err(e) => {
            report.skip(Round::Citations, name, e);
            return;
        }
    };
    if let Err(e) =
        graph::create_relationship(db, &paragraph.entity_id, &citation.entity_id, RelationType::Cites)
            .await
    {
        report.skip(Round::Citations, name, e);
        return;
    }
    report.citations_created += 1;

    let prompt = format!(
        "Parse this citation into the referenced paper's metadata: full title, \
         author names, publication venue, and year.\n\n{}",
        citation_text
    );
    let details = match generate_typed::<ReferenceDetails, _>(
        extractor,
        &prompt,
        "paper_details",
        paper_details_schema(),
    )
    .await
    {
        Ok(d) => d,
        Err(e) => {
            // The citation node stands alone; only the resolution is lost.
            report.skip(Round::Citations, name, e);
            return;
        }
    };

    let reference_content = details.canonical_content();
    match create_embedded(
        db,
        embedder,
        EntityType::ResearchPaper,
        None,
        &details.title,
        &reference_content,
    )
    .await
    {
        Ok(reference) => {
            match graph::create_relationship(
                db,
                &citation.entity_id,
                &reference.entity_id,
                RelationType::References,
            )
            .await
            {
                Ok(_) => report.references_resolved += 1,
                Err(e) => report.skip(Round::Citations, name, e),
            }
        }
        Err(e) => report.skip(Round::Citations, name, e),
    }
}

async fn create_embedded<E>(
    db: &Db,
    embedder: &E,
    entity_type: EntityType,
    source_document_id: Option<String>,
    name: &str,
    content: &str,
) -> Result<Entity>
where
    E: Embedder + ?Sized,
{
    let embedding = embedder.embed(content).await?;
    graph::create_entity(
        db,
        NewEntity {
            entity_type,
            source_document_id,
            name: name.to_string(),
            content: content.to_string(),
            embedding: Some(embedding),
        },
    )
    .await
}
