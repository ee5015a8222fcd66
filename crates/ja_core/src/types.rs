use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single job posting extracted from a board page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    /// `None` when the page carries no date or the date text did not parse.
    pub posted_date: Option<NaiveDate>,
    pub description: String,
    pub url: String,
    /// Name of the board configuration the posting was extracted with.
    #[serde(default)]
    pub board: String,
}

impl JobPosting {
    /// An empty posting for `url`; extraction fills in the other fields.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            company: String::new(),
            posted_date: None,
            description: String::new(),
            url: url.into(),
            board: String::new(),
        }
    }

    pub fn with_board(mut self, board: impl Into<String>) -> Self {
        self.board = board.into();
        self
    }

    /// Postings without a URL are never emitted.
    pub fn is_emittable(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Cosine similarity of two embeddings, clamped to `[0, 1]`.
///
/// Mismatched lengths, empty vectors and zero vectors score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_posting_is_blank() {
        let posting = JobPosting::new("https://jobs.lever.co/acme/123").with_board("Lever");
        assert_eq!(posting.url, "https://jobs.lever.co/acme/123");
        assert_eq!(posting.board, "Lever");
        assert!(posting.title.is_empty());
        assert!(posting.posted_date.is_none());
        assert!(posting.is_emittable());
    }

    #[test]
    fn test_blank_url_is_not_emittable() {
        assert!(!JobPosting::new("").is_emittable());
        assert!(!JobPosting::new("   ").is_emittable());
    }

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);

        let a = [0.3, 0.5, 0.1];
        let b = [0.9, 0.2, 0.4];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_posting_serializes_date_as_iso() {
        let mut posting = JobPosting::new("https://boards.greenhouse.io/acme/jobs/1");
        posting.posted_date = NaiveDate::from_ymd_opt(2024, 3, 9);
        let json = serde_json::to_value(&posting).unwrap();
        assert_eq!(json["posted_date"], "2024-03-09");
    }
}
