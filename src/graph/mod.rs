//! Knowledge graph data model: closed entity/relationship vocabularies and
//! the persisted node/edge types.
//!
//! The vocabularies are enums rather than free strings so that a typo in an
//! extraction result fails at parse time instead of silently producing an
//! unexplainable dead node.

mod store;

pub use store::{
    count_entities_by_type, count_relationships_by_type, create_entity, create_relationship,
    fetch_entities, fetch_entity, fetch_relationships_touching, find_nearest, NewEntity,
};

use crate::error::PaperkgError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed vocabulary of entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    ResearchPaper,
    Section,
    Paragraph,
    Citation,
    Claim,
    Methodology,
    Result,
    KeyConcept,
    Experiment,
    Terminology,
    Limitation,
    FutureWork,
    Hypothesis,
    Challenge,
    Metric,
}

impl EntityType {
    /// Canonical string form, as stored in the entities table.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::ResearchPaper => "ResearchPaper",
            EntityType::Section => "Section",
            EntityType::Paragraph => "Paragraph",
            EntityType::Citation => "Citation",
            EntityType::Claim => "Claim",
            EntityType::Methodology => "Methodology",
            EntityType::Result => "Result",
            EntityType::KeyConcept => "KeyConcept",
            EntityType::Experiment => "Experiment",
            EntityType::Terminology => "Terminology",
            EntityType::Limitation => "Limitation",
            EntityType::FutureWork => "FutureWork",
            EntityType::Hypothesis => "Hypothesis",
            EntityType::Challenge => "Challenge",
            EntityType::Metric => "Metric",
        }
    }

    /// Human-readable phrase used in synthesized sentences
    /// ("KeyConcept" -> "key concept").
    pub fn display_phrase(&self) -> &'static str {
        match self {
            EntityType::ResearchPaper => "research paper",
            EntityType::Section => "section",
            EntityType::Paragraph => "paragraph",
            EntityType::Citation => "citation",
            EntityType::Claim => "claim",
            EntityType::Methodology => "methodology",
            EntityType::Result => "result",
            EntityType::KeyConcept => "key concept",
            EntityType::Experiment => "experiment",
            EntityType::Terminology => "terminology",
            EntityType::Limitation => "limitation",
            EntityType::FutureWork => "future work",
            EntityType::Hypothesis => "hypothesis",
            EntityType::Challenge => "challenge",
            EntityType::Metric => "metric",
        }
    }

    /// All variants, for stats reporting.
    pub fn all() -> &'static [EntityType] {
        &[
            EntityType::ResearchPaper,
            EntityType::Section,
            EntityType::Paragraph,
            EntityType::Citation,
            EntityType::Claim,
            EntityType::Methodology,
            EntityType::Result,
            EntityType::KeyConcept,
            EntityType::Experiment,
            EntityType::Terminology,
            EntityType::Limitation,
            EntityType::FutureWork,
            EntityType::Hypothesis,
            EntityType::Challenge,
            EntityType::Metric,
        ]
    }
}

impl FromStr for EntityType {
    type Err = PaperkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both canonical form and the spaced form older extraction
        // prompts produced ("Key Concept", "Future Work").
        match s {
            "ResearchPaper" => Ok(EntityType::ResearchPaper),
            "Section" => Ok(EntityType::Section),
            "Paragraph" => Ok(EntityType::Paragraph),
            "Citation" => Ok(EntityType::Citation),
            "Claim" => Ok(EntityType::Claim),
            "Methodology" => Ok(EntityType::Methodology),
            "Result" => Ok(EntityType::Result),
            "KeyConcept" | "Key Concept" => Ok(EntityType::KeyConcept),
            "Experiment" => Ok(EntityType::Experiment),
            "Terminology" => Ok(EntityType::Terminology),
            "Limitation" => Ok(EntityType::Limitation),
            "FutureWork" | "Future Work" => Ok(EntityType::FutureWork),
            "Hypothesis" => Ok(EntityType::Hypothesis),
            "Challenge" => Ok(EntityType::Challenge),
            "Metric" => Ok(EntityType::Metric),
            other => Err(PaperkgError::Parse(format!(
                "Unknown entity type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed vocabulary of relationship types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    HasSection,
    ContainsParagraph,
    Cites,
    References,
    States,
    Uses,
    Presents,
    Discusses,
    Involves,
    UsesTerm,
    Defines,
    Identifies,
    Suggests,
}

impl RelationType {
    /// Canonical string form, as stored in the relationships table.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::HasSection => "HAS_SECTION",
            RelationType::ContainsParagraph => "CONTAINS_PARAGRAPH",
            RelationType::Cites => "CITES",
            RelationType::References => "REFERENCES",
            RelationType::States => "STATES",
            RelationType::Uses => "USES",
            RelationType::Presents => "PRESENTS",
            RelationType::Discusses => "DISCUSSES",
            RelationType::Involves => "INVOLVES",
            RelationType::UsesTerm => "USES_TERM",
            RelationType::Defines => "DEFINES",
            RelationType::Identifies => "IDENTIFIES",
            RelationType::Suggests => "SUGGESTS",
        }
    }

    /// Relation phrase for synthesized sentences: underscores become spaces,
    /// lower-cased ("HAS_SECTION" -> "has section").
    pub fn display_phrase(&self) -> &'static str {
        match self {
            RelationType::HasSection => "has section",
            RelationType::ContainsParagraph => "contains paragraph",
            RelationType::Cites => "cites",
            RelationType::References => "references",
            RelationType::States => "states",
            RelationType::Uses => "uses",
            RelationType::Presents => "presents",
            RelationType::Discusses => "discusses",
            RelationType::Involves => "involves",
            RelationType::UsesTerm => "uses term",
            RelationType::Defines => "defines",
            RelationType::Identifies => "identifies",
            RelationType::Suggests => "suggests",
        }
    }

    /// All variants, for stats reporting.
    pub fn all() -> &'static [RelationType] {
        &[
            RelationType::HasSection,
            RelationType::ContainsParagraph,
            RelationType::Cites,
            RelationType::References,
            RelationType::States,
            RelationType::Uses,
            RelationType::Presents,
            RelationType::Discusses,
            RelationType::Involves,
            RelationType::UsesTerm,
            RelationType::Defines,
            RelationType::Identifies,
            RelationType::Suggests,
        ]
    }
}

impl FromStr for RelationType {
    type Err = PaperkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HAS_SECTION" => Ok(RelationType::HasSection),
            "CONTAINS_PARAGRAPH" => Ok(RelationType::ContainsParagraph),
            "CITES" => Ok(RelationType::Cites),
            "REFERENCES" => Ok(RelationType::References),
            "STATES" => Ok(RelationType::States),
            "USES" => Ok(RelationType::Uses),
            "PRESENTS" => Ok(RelationType::Presents),
            "DISCUSSES" => Ok(RelationType::Discusses),
            "INVOLVES" => Ok(RelationType::Involves),
            "USES_TERM" => Ok(RelationType::UsesTerm),
            "DEFINES" => Ok(RelationType::Defines),
            "IDENTIFIES" => Ok(RelationType::Identifies),
            "SUGGESTS" => Ok(RelationType::Suggests),
            other => Err(PaperkgError::Parse(format!(
                "Unknown relationship type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed node in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier (UUID v4), assigned at creation, never reused.
    pub entity_id: String,
    pub entity_type: EntityType,
    /// Ingested document this entity was derived from. None for entities
    /// representing externally-cited papers.
    pub source_document_id: Option<String>,
    /// Short human-readable label (title, section heading, or generated name).
    pub name: String,
    /// Canonical textual representation: a summary, a quoted span, or the
    /// Title/Authors/Venue/Year block for papers.
    pub content: String,
    /// Fixed-length vector over `content`; None when embedding failed or was
    /// never computed (such entities are invisible to similarity search).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Entity {
    /// Text used when rendering this entity into a sentence.
    /// Papers and sections read best by title; paragraphs need their full
    /// text; everything else prefers the short name.
    pub fn display_text(&self) -> &str {
        match self.entity_type {
            EntityType::ResearchPaper | EntityType::Section => &self.name,
            EntityType::Paragraph => &self.content,
            _ => {
                if self.name.is_empty() {
                    &self.content
                } else {
                    &self.name
                }
            }
        }
    }
}

/// A typed, directed edge between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub relationship_id: String,
    pub source_entity_id: String,
    pub target_entity_id: String,
    pub relationship_type: RelationType,
}
