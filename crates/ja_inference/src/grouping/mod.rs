//! Clusters postings whose descriptions are semantically close.
//!
//! Every pair scoring at or above the threshold is linked and links are
//! followed transitively (union-find), so `A~B` and `B~C` put `A`, `B` and
//! `C` in one group even when `A~C` falls below the threshold.

use std::fmt;
use serde::Serialize;
use ja_core::{Error, JobPosting, Result, SimilarityModel};
use crate::embeddings::{score, EmbeddingGenerator};

/// A link between two postings, by index into the grouped slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPair {
    pub left: usize,
    pub right: usize,
    pub score: f32,
}

/// Postings sharing similarity above the threshold. Members are indices into
/// the slice passed to [`SimilarityGrouper::group`], ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityGroup {
    pub members: Vec<usize>,
    pub links: Vec<ScoredPair>,
}

impl SimilarityGroup {
    pub fn postings<'a>(&self, postings: &'a [JobPosting]) -> Vec<&'a JobPosting> {
        self.members.iter().filter_map(|&i| postings.get(i)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPosting {
    pub index: usize,
    pub score: f32,
}

pub struct SimilarityGrouper<'m> {
    model: &'m dyn SimilarityModel,
    threshold: f32,
}

impl fmt::Debug for SimilarityGrouper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimilarityGrouper")
            .field("model", &self.model.name())
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl<'m> SimilarityGrouper<'m> {
    pub fn new(model: &'m dyn SimilarityModel, threshold: f32) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self { model, threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Similarity of two descriptions in `[0, 1]`.
    pub async fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        Ok(self.model.similarity(a, b).await?.clamp(0.0, 1.0))
    }

    pub async fn group(&self, postings: &[JobPosting]) -> Result<Vec<SimilarityGroup>> {
        if postings.len() < 2 {
            return Ok(Vec::new());
        }

        let mut generator = EmbeddingGenerator::new(self.model);
        let embeddings = generator.generate_all(postings).await?;

        let mut sets = DisjointSet::new(postings.len());
        let mut links = Vec::new();
        for i in 0..postings.len() {
            for j in (i + 1)..postings.len() {
                let s = score(&postings[i], &embeddings[i], &postings[j], &embeddings[j]);
                if s >= self.threshold {
                    sets.union(i, j);
                    links.push(ScoredPair { left: i, right: j, score: s });
                }
            }
        }

        // Roots in order of their smallest member keep groups ordered by
        // first appearance.
        let mut groups: Vec<(usize, SimilarityGroup)> = Vec::new();
        for i in 0..postings.len() {
            let root = sets.find(i);
            match groups.iter_mut().find(|(r, _)| *r == root) {
                Some((_, group)) => group.members.push(i),
                None => groups.push((root, SimilarityGroup { members: vec![i], links: Vec::new() })),
            }
        }
        for link in links {
            let root = sets.find(link.left);
            if let Some((_, group)) = groups.iter_mut().find(|(r, _)| *r == root) {
                group.links.push(link);
            }
        }

        Ok(groups
            .into_iter()
            .map(|(_, group)| group)
            .filter(|group| group.members.len() > 1)
            .collect())
    }

    /// Postings similar to `reference`, best match first. The reference
    /// itself (same URL) is never included.
    pub async fn rank_against(
        &self,
        reference: &JobPosting,
        postings: &[JobPosting],
    ) -> Result<Vec<RankedPosting>> {
        let mut generator = EmbeddingGenerator::new(self.model);
        let reference_embedding = generator.generate_posting_embedding(reference).await?;

        let mut ranked = Vec::new();
        for (index, posting) in postings.iter().enumerate() {
            if posting.url == reference.url {
                continue;
            }
            let embedding = generator.generate_posting_embedding(posting).await?;
            let s = score(reference, &reference_embedding, posting, &embedding);
            if s >= self.threshold {
                ranked.push(RankedPosting { index, score: s });
            }
        }

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranked)
    }
}

pub fn validate_threshold(threshold: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::Configuration(format!(
            "similarity threshold must be within [0, 1], got {}",
            threshold
        )));
    }
    Ok(())
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self { parent: (0..len).collect() }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // smaller index wins so roots stay stable
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[merge] = keep;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Embeds a description written as comma-separated floats.
    struct VectorModel;

    #[async_trait::async_trait]
    impl SimilarityModel for VectorModel {
        fn name(&self) -> &str {
            "vector"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(text
                .split(',')
                .map(|v| v.trim().parse::<f32>().unwrap_or(0.0))
                .collect())
        }
    }

    fn posting(url: &str, description: &str) -> JobPosting {
        let mut posting = JobPosting::new(url);
        posting.description = description.to_string();
        posting
    }

    #[tokio::test]
    async fn test_fewer_than_two_postings_yield_no_groups() {
        let model = VectorModel;
        let grouper = SimilarityGrouper::new(&model, 0.5).unwrap();
        assert!(grouper.group(&[]).await.unwrap().is_empty());
        assert!(grouper
            .group(&[posting("https://a/1", "1,0")])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_groups_are_transitive() {
        let model = VectorModel;
        let grouper = SimilarityGrouper::new(&model, 0.9).unwrap();
        // a~b and b~d clear the threshold, a~d is ~0.71
        let postings = vec![
            posting("https://a/1", "1,0,0"),
            posting("https://a/2", "1,0.4,0"),
            posting("https://a/3", "0,0,1"),
            posting("https://a/4", "1,1,0"),
        ];

        let groups = grouper.group(&postings).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec![0, 1, 3]);
        assert_eq!(groups[0].links.len(), 2);
        assert!(groups[0].links.iter().all(|l| l.score >= 0.9));
        assert!(!groups[0].links.iter().any(|l| l.left == 0 && l.right == 3));

        let grouped: Vec<_> = groups[0].postings(&postings).iter().map(|p| p.url.as_str()).collect();
        assert_eq!(grouped, vec!["https://a/1", "https://a/2", "https://a/4"]);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let model = VectorModel;
        let grouper = SimilarityGrouper::new(&model, 1.0).unwrap();
        let postings = vec![
            posting("https://a/1", "same text"),
            posting("https://a/2", "same text"),
            posting("https://a/3", "other"),
        ];
        let groups = grouper.group(&postings).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec![0, 1]);
        assert_eq!(groups[0].links[0].score, 1.0);
    }

    #[tokio::test]
    async fn test_rank_against_skips_reference_and_sorts() {
        let model = VectorModel;
        let grouper = SimilarityGrouper::new(&model, 0.5).unwrap();
        let postings = vec![
            posting("https://a/1", "1,0"),
            posting("https://a/2", "1,1"),
            posting("https://a/3", "0,1"),
            posting("https://a/4", "1,0.1"),
        ];

        let ranked = grouper.rank_against(&postings[0], &postings).await.unwrap();
        let order: Vec<usize> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![3, 1]);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[tokio::test]
    async fn test_similarity_identity_and_symmetry() {
        let model = VectorModel;
        let grouper = SimilarityGrouper::new(&model, 0.5).unwrap();
        assert_eq!(grouper.similarity("0.2,0.7", "0.2,0.7").await.unwrap(), 1.0);
        let ab = grouper.similarity("0.2,0.7", "0.9,0.1").await.unwrap();
        let ba = grouper.similarity("0.9,0.1", "0.2,0.7").await.unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_threshold_validation() {
        let model = VectorModel;
        assert!(SimilarityGrouper::new(&model, 0.0).is_ok());
        assert!(SimilarityGrouper::new(&model, 1.0).is_ok());
        assert!(matches!(
            SimilarityGrouper::new(&model, 1.5),
            Err(Error::Configuration(_))
        ));
        assert!(SimilarityGrouper::new(&model, -0.1).is_err());
        assert!(SimilarityGrouper::new(&model, f32::NAN).is_err());
    }
}
