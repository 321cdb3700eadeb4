//! Similarity retriever.
//!
//! Scores a bounded candidate pool of successful patterns against an issue's
//! feature record. The pool is the top rows by success rate and usage, so
//! retrieval is approximate nearest-neighbor rather than exhaustive.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{FeatureRecord, RetrievalConfig, ScoredPattern, VOCABULARY_VERSION};
use crate::domain::ports::PatternRepository;

/// Cosine similarity. Zero when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0)
}

/// Similarity of two feature records over their flattened form.
pub fn record_similarity(a: &FeatureRecord, b: &FeatureRecord) -> f64 {
    cosine_similarity(&a.similarity_vector(), &b.similarity_vector())
}

pub struct SimilarityRetriever {
    patterns: Arc<dyn PatternRepository>,
    candidate_pool: usize,
    max_results: usize,
}

impl SimilarityRetriever {
    pub fn new(patterns: Arc<dyn PatternRepository>, config: &RetrievalConfig) -> Self {
        Self {
            patterns,
            candidate_pool: config.candidate_pool,
            max_results: config.max_results,
        }
    }

    /// Successful patterns with similarity strictly above `threshold`,
    /// most similar first. Each returned pattern has its usage count bumped.
    #[instrument(skip(self, features), fields(pool = self.candidate_pool))]
    pub async fn find_similar(
        &self,
        features: &FeatureRecord,
        threshold: f64,
    ) -> DomainResult<Vec<ScoredPattern>> {
        let candidates = self.patterns.top_successful(self.candidate_pool).await?;

        let mut scored: Vec<ScoredPattern> = candidates
            .into_iter()
            .filter(|p| {
                if p.vocabulary_version == VOCABULARY_VERSION {
                    true
                } else {
                    debug!(pattern_id = %p.id, version = p.vocabulary_version, "Skipping pattern with stale vocabulary");
                    false
                }
            })
            .map(|p| {
                let similarity = record_similarity(features, &p.issue_features);
                ScoredPattern {
                    pattern: p,
                    similarity,
                }
            })
            .filter(|s| s.similarity > threshold)
            .collect();

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(self.max_results);

        for s in &mut scored {
            match self.patterns.increment_usage(s.pattern.id).await {
                Ok(()) => s.pattern.usage_count += 1,
                Err(e) => warn!(pattern_id = %s.pattern.id, error = %e, "Failed to bump pattern usage"),
            }
        }

        debug!(matches = scored.len(), threshold, "Similarity retrieval complete");
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqlitePatternRepository};
    use crate::domain::models::{
        Complexity, IssueCategory, IssueCharacteristics, LearningPattern, PatternKind,
        SolutionApproach,
    };
    use crate::services::vectorizer::FeatureVectorizer;

    #[test]
    fn test_zero_vectors_have_zero_similarity() {
        assert_eq!(cosine_similarity(&[0.0; 4], &[0.0; 4]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_self_similarity_is_one() {
        let a = [0.3, 0.7, 0.0, 1.0, 2.0, 0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &a), 1.0);
    }

    #[test]
    fn test_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < f64::EPSILON);
    }

    async fn setup() -> (SimilarityRetriever, Arc<SqlitePatternRepository>, FeatureVectorizer) {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqlitePatternRepository::new(pool));
        let retriever = SimilarityRetriever::new(repo.clone(), &RetrievalConfig::default());
        (retriever, repo, FeatureVectorizer::new())
    }

    fn stored(v: &FeatureVectorizer, kind: PatternKind, chars: IssueCharacteristics) -> LearningPattern {
        let features = v.vectorize_issue(&chars);
        LearningPattern::new(kind, chars, SolutionApproach::default(), features, 0.9)
    }

    #[tokio::test]
    async fn test_identical_issue_matches_with_full_similarity() {
        let (retriever, repo, v) = setup().await;
        let chars = IssueCharacteristics::new(Complexity::Low, IssueCategory::Bug).with_language("javascript");
        let p = stored(&v, PatternKind::Success, chars.clone());
        repo.insert(&p).await.unwrap();

        let found = retriever.find_similar(&v.vectorize_issue(&chars), 0.6).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pattern.id, p.id);
        assert!((found[0].similarity - 1.0).abs() < 1e-12);
        assert_eq!(found[0].pattern.usage_count, 2);
        assert_eq!(repo.get(p.id).await.unwrap().unwrap().usage_count, 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_candidates() {
        let (retriever, repo, v) = setup().await;
        let chars = IssueCharacteristics::new(Complexity::Low, IssueCategory::Bug);
        repo.insert(&stored(&v, PatternKind::Failure, chars.clone())).await.unwrap();

        let found = retriever.find_similar(&v.vectorize_issue(&chars), 0.6).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_threshold_is_exclusive() {
        let (retriever, repo, v) = setup().await;
        let chars = IssueCharacteristics::new(Complexity::Medium, IssueCategory::Feature);
        repo.insert(&stored(&v, PatternKind::Success, chars.clone())).await.unwrap();

        let found = retriever.find_similar(&v.vectorize_issue(&chars), 1.0).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_results_truncated_and_sorted() {
        let (retriever, repo, v) = setup().await;
        for complexity in [Complexity::Low, Complexity::Medium, Complexity::High] {
            for _ in 0..3 {
                let chars = IssueCharacteristics::new(complexity, IssueCategory::Bug).with_language("go");
                repo.insert(&stored(&v, PatternKind::Success, chars)).await.unwrap();
            }
        }

        let query = IssueCharacteristics::new(Complexity::High, IssueCategory::Bug).with_language("go");
        let found = retriever.find_similar(&v.vectorize_issue(&query), 0.6).await.unwrap();
        assert!(found.len() <= 5);
        assert!(found.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    }
}
