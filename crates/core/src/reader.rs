//! Paragraph extraction from summary documents.

use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Fragments shorter than this are folded into the previous paragraph;
/// headings and page numbers carry no standalone signal for the QA model.
const MIN_PARAGRAPH_LEN: usize = 40;

/// Extract cleaned paragraphs from a summary document. `.txt` is split on
/// blank lines; `.pdf` needs the `pdf` cargo feature. Unsupported or
/// unreadable files yield an empty list, which the pipeline treats as a
/// degraded (not fatal) state.
pub fn extract_paragraphs(path: &Path) -> anyhow::Result<Vec<String>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let text = match ext.as_str() {
        "txt" | "text" => fs::read_to_string(path)?,
        "pdf" => pdf_text(path)?,
        other => {
            warn!(path = %path.display(), ext = other, "unsupported summary format");
            return Ok(Vec::new());
        }
    };

    let paragraphs = split_paragraphs(&text);
    debug!(path = %path.display(), count = paragraphs.len(), "extracted paragraphs");
    Ok(paragraphs)
}

/// Split on blank lines, collapse internal whitespace, and merge short
/// fragments forward into their preceding paragraph.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush(&mut paragraphs, &mut current);
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(line.trim());
        }
    }
    flush(&mut paragraphs, &mut current);
    paragraphs
}

fn flush(paragraphs: &mut Vec<String>, current: &mut String) {
    if current.is_empty() {
        return;
    }
    let cleaned = current.split_whitespace().collect::<Vec<_>>().join(" ");
    current.clear();
    if cleaned.is_empty() {
        return;
    }
    match paragraphs.last_mut() {
        Some(last) if cleaned.len() < MIN_PARAGRAPH_LEN => {
            last.push(' ');
            last.push_str(&cleaned);
        }
        _ => paragraphs.push(cleaned),
    }
}

#[cfg(feature = "pdf")]
fn pdf_text(path: &Path) -> anyhow::Result<String> {
    Ok(pdf_extract::extract_text(path)?)
}

#[cfg(not(feature = "pdf"))]
fn pdf_text(path: &Path) -> anyhow::Result<String> {
    warn!(path = %path.display(), "pdf support not compiled in, skipping");
    Ok(String::new())
}
