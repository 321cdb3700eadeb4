//! Recommendation engine.
//!
//! Runs the request path (vectorize, retrieve, predict, select) and ingests
//! outcomes back into the pattern store and predictor. Learning-path
//! failures degrade to rule-only selection; persistence failures propagate.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::optimization::keys;
use crate::domain::models::{LearningPattern, OutcomeReport, ScoredPattern, TaskAnalysis};
use crate::domain::ports::PatternRepository;
use crate::services::predictor::Predictor;
use crate::services::runtime_parameters::RuntimeParameters;
use crate::services::session_counters::SessionCounters;
use crate::services::similarity::SimilarityRetriever;
use crate::services::tool_selector::{PatternHints, RankedTool, SelectionAdjustments, ToolSelector};
use crate::services::vectorizer::FeatureVectorizer;

/// Whether the recommendation is backed by history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    /// Similar successes exist and confidence meets the threshold.
    Suggested,
    /// No similar successful pattern was found.
    NoMatch,
    /// Similar patterns exist but confidence is below the threshold.
    LowConfidence,
}

/// Effective execution limits the caller applies while running the
/// selection. Read from the tuned runtime parameters at recommendation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutionLimits {
    pub max_concurrent_agents: usize,
    pub max_parallel_tools: usize,
    pub agent_timeout_ms: u64,
    pub session_timeout_ms: u64,
}

impl ExecutionLimits {
    async fn load(runtime: &RuntimeParameters) -> Self {
        let count = |v: f64| v.round().max(1.0) as usize;
        let millis = |v: f64| v.round().max(0.0) as u64;
        Self {
            max_concurrent_agents: count(runtime.get_or(keys::MAX_CONCURRENT_AGENTS, 8.0).await),
            max_parallel_tools: count(runtime.get_or(keys::MAX_PARALLEL_TOOLS, 4.0).await),
            agent_timeout_ms: millis(runtime.get_or(keys::AGENT_TIMEOUT, 1_800_000.0).await),
            session_timeout_ms: millis(runtime.get_or(keys::SESSION_TIMEOUT, 3_600_000.0).await),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub selection_id: Uuid,
    pub tools: Vec<RankedTool>,
    pub agents: Vec<String>,
    /// Predicted success probability.
    pub confidence: f64,
    pub suggestion: SuggestionStatus,
    pub similar: Vec<ScoredPattern>,
    pub limits: ExecutionLimits,
}

pub struct RecommendationEngine {
    vectorizer: FeatureVectorizer,
    retriever: SimilarityRetriever,
    predictor: Arc<Predictor>,
    selector: ToolSelector,
    patterns: Arc<dyn PatternRepository>,
    runtime: RuntimeParameters,
    counters: Arc<SessionCounters>,
}

impl RecommendationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vectorizer: FeatureVectorizer,
        retriever: SimilarityRetriever,
        predictor: Arc<Predictor>,
        selector: ToolSelector,
        patterns: Arc<dyn PatternRepository>,
        runtime: RuntimeParameters,
        counters: Arc<SessionCounters>,
    ) -> Self {
        Self {
            vectorizer,
            retriever,
            predictor,
            selector,
            patterns,
            runtime,
            counters,
        }
    }

    pub fn predictor(&self) -> &Arc<Predictor> {
        &self.predictor
    }

    pub fn runtime_parameters(&self) -> &RuntimeParameters {
        &self.runtime
    }

    #[instrument(skip_all, fields(issue = ?analysis.issue_number, category = %analysis.characteristics.category))]
    pub async fn recommend(&self, analysis: &TaskAnalysis) -> DomainResult<Recommendation> {
        let features = self.vectorizer.vectorize_issue(&analysis.characteristics);

        let similarity_threshold = self.runtime.get_or(keys::SIMILARITY_THRESHOLD, 0.6).await;
        let confidence_threshold = self.runtime.get_or(keys::CONFIDENCE_THRESHOLD, 0.7).await;

        let similar = match self.retriever.find_similar(&features, similarity_threshold).await {
            Ok(similar) => similar,
            Err(e) => {
                warn!(error = %e, "Similarity retrieval failed, continuing with rules only");
                Vec::new()
            }
        };

        let confidence = self.predictor.predict(&features).await;
        let suggestion = if similar.is_empty() {
            SuggestionStatus::NoMatch
        } else if confidence >= confidence_threshold {
            SuggestionStatus::Suggested
        } else {
            SuggestionStatus::LowConfidence
        };

        let hints = if suggestion == SuggestionStatus::Suggested {
            PatternHints::from_patterns(&similar)
        } else {
            PatternHints::default()
        };
        let limits = ExecutionLimits::load(&self.runtime).await;
        let adjustments = SelectionAdjustments {
            hints,
            tool_factors: self.predictor.tool_factors().await,
            max_concurrent_agents: Some(limits.max_concurrent_agents),
        };

        let selection = self
            .selector
            .select(analysis, &adjustments, Some(confidence))
            .await?;
        self.counters.session_started();

        info!(
            selection_id = %selection.id,
            tools = selection.tools.len(),
            agents = selection.agents.len(),
            similar = similar.len(),
            confidence,
            suggestion = ?suggestion,
            "Recommendation ready"
        );

        Ok(Recommendation {
            selection_id: selection.id,
            tools: selection.tools,
            agents: selection.agents,
            confidence,
            suggestion,
            similar,
            limits,
        })
    }

    /// Ingest the outcome of a real-world attempt.
    #[instrument(skip_all, fields(outcome = %report.outcome))]
    pub async fn record_outcome(&self, report: &OutcomeReport) -> DomainResult<LearningPattern> {
        if !(0.0..=1.0).contains(&report.confidence) {
            return Err(DomainError::ValidationFailed(format!(
                "confidence must be within [0, 1], got {}",
                report.confidence
            )));
        }

        let issue_features = self.vectorizer.vectorize_issue(&report.issue_characteristics);
        let pattern = LearningPattern::new(
            report.outcome,
            report.issue_characteristics.clone(),
            report.solution_approach.clone(),
            issue_features,
            report.confidence,
        );
        self.patterns.insert(&pattern).await?;

        let attempt = self
            .vectorizer
            .vectorize_attempt(&report.issue_characteristics, &report.solution_approach);
        let learning_rate = self.runtime.get_or(keys::LEARNING_RATE, 0.01).await;
        let update = self.predictor.update(&attempt, report.outcome, learning_rate).await;

        self.counters.session_finished();

        info!(
            pattern_id = %pattern.id,
            error = update.error,
            learning_rate,
            "Outcome recorded"
        );
        Ok(pattern)
    }

    /// Rebuild predictor state by replaying the most recent stored outcomes.
    pub async fn warm_start(&self, limit: usize) -> DomainResult<usize> {
        let patterns = self.patterns.recent(limit).await?;
        let records: Vec<_> = patterns
            .iter()
            .map(|p| {
                (
                    self.vectorizer
                        .vectorize_attempt(&p.issue_characteristics, &p.solution_approach),
                    p.kind,
                )
            })
            .collect();

        let learning_rate = self.runtime.get_or(keys::LEARNING_RATE, 0.01).await;
        let replayed = self
            .predictor
            .rebuild(records.iter().map(|(r, k)| (r, *k)), learning_rate)
            .await;
        info!(replayed, "Predictor warm start complete");
        Ok(replayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{
        create_migrated_test_pool, SqliteParameterRepository, SqlitePatternRepository,
        SqliteSelectionRepository, SqliteToolStatsRepository,
    };
    use crate::domain::models::{
        Complexity, Config, IssueCategory, IssueCharacteristics, PatternKind, SolutionApproach,
        TOOL_CATALOG,
    };
    use crate::domain::ports::{ParameterRepository, SelectionRepository, ToolStatsRepository};
    use crate::services::runtime_parameters::seed_parameters;

    struct Fixture {
        engine: RecommendationEngine,
        selections: Arc<SqliteSelectionRepository>,
        counters: Arc<SessionCounters>,
    }

    async fn setup_engine() -> Fixture {
        let pool = create_migrated_test_pool().await.unwrap();
        let config = Config::default();

        let patterns = Arc::new(SqlitePatternRepository::new(pool.clone()));
        let stats = Arc::new(SqliteToolStatsRepository::new(pool.clone()));
        let selections = Arc::new(SqliteSelectionRepository::new(pool.clone()));
        let params = SqliteParameterRepository::new(pool);
        stats.seed(TOOL_CATALOG).await.unwrap();
        params.seed(&seed_parameters(&config)).await.unwrap();

        let vectorizer = FeatureVectorizer::new();
        let predictor = Arc::new(Predictor::new(&config.learning, vectorizer.tool_vocabulary()));
        let counters = Arc::new(SessionCounters::new());
        let engine = RecommendationEngine::new(
            vectorizer,
            SimilarityRetriever::new(patterns.clone(), &config.retrieval),
            predictor,
            ToolSelector::new(stats, selections.clone(), config.selector.clone()),
            patterns,
            RuntimeParameters::load(&params).await.unwrap(),
            counters.clone(),
        );

        Fixture {
            engine,
            selections,
            counters,
        }
    }

    fn bug_issue() -> IssueCharacteristics {
        IssueCharacteristics::new(Complexity::Medium, IssueCategory::Bug)
            .with_language("javascript")
            .with_framework("react")
    }

    fn success_report() -> OutcomeReport {
        OutcomeReport {
            issue_characteristics: bug_issue(),
            solution_approach: SolutionApproach {
                agent_types: vec!["debugger".to_string(), "tester".to_string()],
                tools_used: ["file_read", "test_runner"].iter().map(|t| t.to_string()).collect(),
                duration_ms: 600_000,
            },
            outcome: PatternKind::Success,
            confidence: 0.9,
        }
    }

    #[tokio::test]
    async fn test_recommend_without_history() {
        let fx = setup_engine().await;
        let rec = fx
            .engine
            .recommend(&TaskAnalysis::new(bug_issue()))
            .await
            .unwrap();

        assert_eq!(rec.suggestion, SuggestionStatus::NoMatch);
        assert!(rec.similar.is_empty());
        assert!(!rec.tools.is_empty());
        assert!(!rec.agents.is_empty());
        assert!(rec.confidence > 0.0 && rec.confidence < 1.0);
        assert_eq!(fx.counters.active(), 1);

        let saved = fx.selections.get(rec.selection_id).await.unwrap().unwrap();
        assert_eq!(saved.tools.len(), rec.tools.len());
    }

    #[tokio::test]
    async fn test_recorded_success_is_suggested_next_time() {
        let fx = setup_engine().await;
        fx.engine.record_outcome(&success_report()).await.unwrap();

        let rec = fx
            .engine
            .recommend(&TaskAnalysis::new(bug_issue()))
            .await
            .unwrap();
        assert_eq!(rec.suggestion, SuggestionStatus::Suggested);
        assert_eq!(rec.similar.len(), 1);
        assert!((rec.similar[0].similarity - 1.0).abs() < 1e-9);
        assert_eq!(rec.similar[0].pattern.kind, PatternKind::Success);
        assert!(rec.agents.contains(&"debugger".to_string()));
    }

    #[tokio::test]
    async fn test_recommendation_carries_tuned_limits() {
        let fx = setup_engine().await;
        let analysis = TaskAnalysis::new(bug_issue());

        let rec = fx.engine.recommend(&analysis).await.unwrap();
        assert_eq!(
            rec.limits,
            ExecutionLimits {
                max_concurrent_agents: 8,
                max_parallel_tools: 4,
                agent_timeout_ms: 1_800_000,
                session_timeout_ms: 3_600_000,
            }
        );

        let runtime = fx.engine.runtime_parameters();
        runtime.set(keys::MAX_PARALLEL_TOOLS, 2.4).await;
        runtime.set(keys::AGENT_TIMEOUT, 600_000.0).await;
        runtime.set(keys::MAX_CONCURRENT_AGENTS, 1.0).await;

        let rec = fx.engine.recommend(&analysis).await.unwrap();
        assert_eq!(rec.limits.max_parallel_tools, 2);
        assert_eq!(rec.limits.agent_timeout_ms, 600_000);
        assert_eq!(rec.limits.session_timeout_ms, 3_600_000);
        assert!(rec.agents.len() <= 1);
    }

    #[tokio::test]
    async fn test_record_outcome_rejects_bad_confidence() {
        let fx = setup_engine().await;
        let mut report = success_report();
        report.confidence = 1.5;
        let err = fx.engine.record_outcome(&report).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
        assert_eq!(fx.engine.predictor().snapshot().await.updates, 0);
    }

    #[tokio::test]
    async fn test_failures_lower_confidence() {
        let fx = setup_engine().await;
        let analysis = TaskAnalysis::new(bug_issue());
        let before = fx.engine.recommend(&analysis).await.unwrap().confidence;

        let mut report = success_report();
        report.outcome = PatternKind::Failure;
        for _ in 0..5 {
            fx.engine.record_outcome(&report).await.unwrap();
        }

        let after = fx.engine.recommend(&analysis).await.unwrap();
        assert!(after.confidence < before);
        // Failures never become retrieval candidates.
        assert!(after.similar.is_empty());
    }

    #[tokio::test]
    async fn test_warm_start_replays_history() {
        let fx = setup_engine().await;
        for _ in 0..3 {
            fx.engine.record_outcome(&success_report()).await.unwrap();
        }
        let replayed = fx.engine.warm_start(2).await.unwrap();
        assert_eq!(replayed, 2);
        assert_eq!(fx.engine.predictor().snapshot().await.updates, 2);
    }
}
