//! Typed payloads and JSON schemas for each construction round's
//! structured-extraction call.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Round 1 and Round 4: paper/reference metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperDetails {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub publication_venue: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl PaperDetails {
    /// Canonical `content` serialization for ResearchPaper entities.
    /// The citation flow parses this line format back out, so the field
    /// labels are load-bearing.
    pub fn canonical_content(&self) -> String {
        let authors = if self.authors.is_empty() {
            "Unknown".to_string()
        } else {
            self.authors.join(", ")
        };
        let venue = self.publication_venue.as_deref().unwrap_or("Unknown");
        let year = self
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        format!(
            "Title: {}\nAuthors: {}\nVenue: {}\nYear: {}",
            self.title, authors, venue, year
        )
    }
}

/// Round 4 parses a raw citation string into the same metadata shape.
pub type ReferenceDetails = PaperDetails;

/// A single section of the paper: title plus full text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionChunk {
    pub section_title: String,
    pub section_text: String,
}

/// Gateway fallback result when heading-based segmentation finds nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionChunkList {
    pub sections: Vec<SectionChunk>,
}

/// Round 2: one-paragraph summary of a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSummary {
    pub summary: String,
}

/// One entity classified out of a paragraph. Types arrive as strings from
/// the gateway and are parsed against the closed vocabularies by the
/// pipeline; unknown strings skip the tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedEntity {
    pub entity_type: String,
    pub relationship_type: String,
    pub name: String,
    pub content: String,
}

/// Round 3: full classification result for one paragraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParagraphAnalysis {
    #[serde(default)]
    pub classified_entities: Vec<ClassifiedEntity>,
}

/// One-sentence synthesis of how related entities connect to a paragraph
/// (citation flow context summary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSummary {
    pub summary: String,
}

pub fn paper_details_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string", "description": "The full title of the research paper." },
            "authors": {
                "type": "array",
                "items": { "type": "string" },
                "description": "All author names."
            },
            "publication_venue": {
                "type": ["string", "null"],
                "description": "Journal, conference, or publication venue."
            },
            "year": { "type": ["integer", "null"], "description": "Publication year." }
        },
        "required": ["title", "authors", "publication_venue", "year"],
        "additionalProperties": false
    })
}

pub fn section_chunk_list_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "sections": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "section_title": { "type": "string" },
                        "section_text": { "type": "string" }
                    },
                    "required": ["section_title", "section_text"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["sections"],
        "additionalProperties": false
    })
}

pub fn section_summary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string", "description": "A concise summary of the section." }
        },
        "required": ["summary"],
        "additionalProperties": false
    })
}

pub fn paragraph_analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "classified_entities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "entity_type": {
                            "type": "string",
                            "enum": [
                                "Methodology", "Claim", "Result", "KeyConcept", "Experiment",
                                "Terminology", "Limitation", "FutureWork", "Hypothesis",
                                "Challenge", "Metric", "Citation"
                            ]
                        },
                        "relationship_type": {
                            "type": "string",
                            "enum": [
                                "USES", "STATES", "PRESENTS", "DISCUSSES", "INVOLVES",
                                "USES_TERM", "DEFINES", "IDENTIFIES", "SUGGESTS", "CITES"
                            ]
                        },
                        "name": {
                            "type": "string",
                            "description": "Short name, e.g. 'SVM' or 'Author et al. [2023]'."
                        },
                        "content": {
                            "type": "string",
                            "description": "Summary of the entity, or the full citation text for a Citation."
                        }
                    },
                    "required": ["entity_type", "relationship_type", "name", "content"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["classified_entities"],
        "additionalProperties": false
    })
}

pub fn context_summary_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string" }
        },
        "required": ["summary"],
        "additionalProperties": false
    })
}
