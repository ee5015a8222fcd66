use std::collections::BTreeSet;
use std::path::Path;
use serde::Serialize;
use tracing::warn;
use ja_core::{JobPosting, Result};
use crate::tokens::content_words;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeMatch {
    /// Index into the matched postings slice
    pub index: usize,
    /// Keyword overlap, 0-100, two decimals
    pub percentage: f64,
}

/// Alphabetic, lower-cased, non-stop-word terms of at least two letters.
pub fn extract_keywords(text: &str) -> BTreeSet<String> {
    content_words(text)
        .filter(|w| w.len() >= 2 && w.chars().all(char::is_alphabetic))
        .collect()
}

/// Reads a plain-text or PDF resume. Returns `Ok(None)` (after logging why)
/// when the file is missing, unreadable as a PDF, or yields no text.
pub fn load_resume(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        warn!("Resume file not found at {}, skipping resume matching", path.display());
        return Ok(None);
    }
    let is_pdf = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    let text = if is_pdf {
        match read_pdf(path) {
            Some(text) => text,
            None => return Ok(None),
        }
    } else {
        std::fs::read_to_string(path)?
    };
    if text.trim().is_empty() {
        warn!("No text could be read from the resume at {}", path.display());
        return Ok(None);
    }
    Ok(Some(text))
}

fn read_pdf(path: &Path) -> Option<String> {
    // pdf-extract panics on some malformed files instead of returning an error.
    match std::panic::catch_unwind(|| pdf_extract::extract_text(path)) {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            warn!("Error reading PDF resume {}: {}", path.display(), e);
            None
        }
        Err(_) => {
            warn!("Error reading PDF resume {}: malformed document", path.display());
            None
        }
    }
}

/// Scores every posting by Jaccard overlap between its description keywords
/// and the resume keywords, best match first.
pub fn match_resume(resume: &str, postings: &[JobPosting]) -> Vec<ResumeMatch> {
    let resume_keywords = extract_keywords(resume);
    if resume_keywords.is_empty() {
        warn!("No keywords could be extracted from the resume");
        return Vec::new();
    }

    let mut matches: Vec<ResumeMatch> = postings
        .iter()
        .enumerate()
        .filter_map(|(index, posting)| {
            let description = posting.description.trim();
            if description.is_empty() {
                return None;
            }
            let keywords = extract_keywords(description);
            if keywords.is_empty() {
                return None;
            }
            let shared = resume_keywords.intersection(&keywords).count();
            let union = resume_keywords.union(&keywords).count();
            let percentage = shared as f64 / union as f64 * 100.0;
            Some(ResumeMatch {
                index,
                percentage: (percentage * 100.0).round() / 100.0,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    matches
}
