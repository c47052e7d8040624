//! Document segmentation heuristics: heading-based section splitting and
//! blank-line paragraph splitting.

use crate::gateways::schemas::SectionChunk;
use regex::Regex;
use std::sync::OnceLock;

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#{1,6}\s+(.+?)\s*$").expect("Invalid regex pattern"))
}

/// Split a document into sections on markdown heading markers.
/// Text before the first heading becomes an "Abstract" section.
/// Returns an empty vec when the document has no headings at all, in which
/// case the caller falls back to gateway segmentation.
pub fn split_sections(text: &str) -> Vec<SectionChunk> {
    let re = heading_regex();
    let mut sections = Vec::new();
    let mut current_title: Option<String> = None;
    let mut current_lines: Vec<&str> = Vec::new();
    let mut saw_heading = false;

    let flush = |title: Option<String>, lines: &mut Vec<&str>, out: &mut Vec<SectionChunk>| {
        let body = lines.join("\n");
        let body = body.trim();
        if !body.is_empty() {
            out.push(SectionChunk {
                section_title: title.unwrap_or_else(|| "Abstract".to_string()),
                section_text: body.to_string(),
            });
        }
        lines.clear();
    };

    for line in text.lines() {
        if let Some(cap) = re.captures(line) {
            saw_heading = true;
            flush(current_title.take(), &mut current_lines, &mut sections);
            current_title = Some(cap[1].to_string());
        } else {
            current_lines.push(line);
        }
    }
    flush(current_title.take(), &mut current_lines, &mut sections);

    if !saw_heading {
        return Vec::new();
    }
    sections
}

/// Split section text into paragraphs on blank-line boundaries, discarding
/// fragments shorter than `min_chars`.
pub fn split_paragraphs(text: &str, min_chars: usize) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| p.chars().count() >= min_chars.max(1))
        .map(str::to_string)
        .collect()
}

/// Prefix of `text` containing at most `max_chars` characters, always cut at
/// a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
