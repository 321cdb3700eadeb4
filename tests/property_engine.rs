//! Property-based tests for the learning and selection invariants
//!
//! Tests the following properties:
//! 1. Vectorization is deterministic
//! 2. Similarity is symmetric and every non-empty record matches itself
//! 3. Predictions stay in [0, 1] and biases stay in [-0.5, 0.5]
//! 4. Tool selections respect the complexity limit and never repeat a tool
//! 5. Proposed parameter values never leave [min, max]
//! 6. Replaying the same history always yields the same predictor

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use autoresolve::domain::models::features::{
    CATEGORY_VOCABULARY, FRAMEWORK_VOCABULARY, LANGUAGE_VOCABULARY,
};
use autoresolve::domain::models::{
    default_parameters, Complexity, IssueCharacteristics, LearningConfig, PatternKind, Priority,
    SelectorConfig, SolutionApproach, TOOL_CATALOG,
};
use autoresolve::services::predictor::{PredictorState, BIAS_LIMIT};
use autoresolve::services::similarity::record_similarity;
use autoresolve::services::tool_selector::{rank_candidates, truncate_with_backfill};
use autoresolve::services::trend::propose_adjustment;
use autoresolve::services::{FeatureVectorizer, Predictor, SelectionAdjustments};

fn complexity_strategy() -> impl Strategy<Value = Complexity> {
    prop_oneof![
        Just(Complexity::Low),
        Just(Complexity::Medium),
        Just(Complexity::High)
    ]
}

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)]
}

/// Issues drawn from the known vocabularies, plus the odd unknown language.
fn issue_strategy() -> impl Strategy<Value = IssueCharacteristics> {
    (
        complexity_strategy(),
        prop::sample::select(CATEGORY_VOCABULARY.to_vec()),
        priority_strategy(),
        prop::sample::subsequence(LANGUAGE_VOCABULARY.to_vec(), 0..=3),
        prop::sample::subsequence(FRAMEWORK_VOCABULARY.to_vec(), 0..=2),
        prop::option::of("[a-z]{3,8}"),
    )
        .prop_map(|(complexity, category, priority, languages, frameworks, extra)| {
            let mut issue = IssueCharacteristics::new(complexity, category).with_priority(priority);
            for language in languages {
                issue = issue.with_language(language);
            }
            for framework in frameworks {
                issue = issue.with_framework(framework);
            }
            if let Some(language) = extra {
                issue = issue.with_language(language);
            }
            issue
        })
}

fn solution_strategy() -> impl Strategy<Value = SolutionApproach> {
    let tools: Vec<&'static str> = TOOL_CATALOG.iter().map(|t| t.name).collect();
    (
        prop::sample::subsequence(tools, 0..=6),
        0u64..7_200_000,
    )
        .prop_map(|(tools, duration_ms)| SolutionApproach {
            agent_types: vec!["coder".to_string()],
            tools_used: tools.into_iter().map(str::to_string).collect(),
            duration_ms,
        })
}

fn outcome_strategy() -> impl Strategy<Value = PatternKind> {
    prop_oneof![Just(PatternKind::Success), Just(PatternKind::Failure)]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("Failed to build runtime")
}

proptest! {
    /// Property 1: the same issue always encodes to the same record
    #[test]
    fn proptest_vectorizer_determinism(issue in issue_strategy(), solution in solution_strategy()) {
        let vectorizer = FeatureVectorizer::new();
        prop_assert_eq!(vectorizer.vectorize_issue(&issue), vectorizer.vectorize_issue(&issue));
        prop_assert_eq!(
            vectorizer.vectorize_attempt(&issue, &solution),
            vectorizer.vectorize_attempt(&issue, &solution)
        );
    }

    /// Property 2: similarity is symmetric, bounded and reflexive
    #[test]
    fn proptest_similarity_symmetry(a in issue_strategy(), b in issue_strategy()) {
        let vectorizer = FeatureVectorizer::new();
        let ra = vectorizer.vectorize_issue(&a);
        let rb = vectorizer.vectorize_issue(&b);

        let ab = record_similarity(&ra, &rb);
        let ba = record_similarity(&rb, &ra);
        prop_assert!((ab - ba).abs() < 1e-12);
        prop_assert!((-1.0..=1.0).contains(&ab));
        // Complexity is always non-zero, so no record has zero magnitude.
        prop_assert!((record_similarity(&ra, &ra) - 1.0).abs() < 1e-9);
    }

    /// Property 3: probabilities and biases stay bounded under any history
    #[test]
    fn proptest_predictor_bounds(
        history in prop::collection::vec((issue_strategy(), solution_strategy(), outcome_strategy()), 1..60),
        learning_rate in 0.001f64..0.1,
    ) {
        let vectorizer = FeatureVectorizer::new();
        let mut state = PredictorState::new(50, 25);
        for (issue, solution, outcome) in &history {
            let record = vectorizer.vectorize_attempt(issue, solution);
            let features = record.named_features(vectorizer.tool_vocabulary());
            state.update(&features, *outcome, learning_rate);

            let p = state.predict(&features);
            prop_assert!((0.0..=1.0).contains(&p));
            let biases = state.biases();
            for bias in [biases.complexity, biases.language, biases.category] {
                prop_assert!(bias.abs() <= BIAS_LIMIT);
            }
            prop_assert!(state.history().len() <= 50);
        }
    }

    /// Property 4: selections are bounded by complexity and duplicate-free
    #[test]
    fn proptest_selection_limits(issue in issue_strategy()) {
        let limits = SelectorConfig::default();
        let limit = match issue.complexity {
            Complexity::Low => limits.low_limit,
            Complexity::Medium => limits.medium_limit,
            Complexity::High => limits.high_limit,
        };

        let ranked = rank_candidates(&issue, &HashMap::new(), &SelectionAdjustments::default());
        let selected = truncate_with_backfill(&ranked, limit);

        prop_assert!(selected.len() <= limit);
        let names: HashSet<&str> = selected.iter().map(|t| t.name.as_str()).collect();
        prop_assert_eq!(names.len(), selected.len());
        for tool in &selected {
            prop_assert!((0.0..=1.0).contains(&tool.priority));
        }
    }

    /// Property 5: adjustments never leave the parameter's bounds
    #[test]
    fn proptest_adjustment_clamped(
        index in 0usize..7,
        position in 0.0f64..=1.0,
        score in -1.0f64..=1.0,
        step_fraction in 0.001f64..=1.0,
    ) {
        let mut parameter = default_parameters().swap_remove(index);
        parameter.current_value = parameter.min + position * parameter.range();

        if let Some(adjustment) = propose_adjustment(&parameter, score, 0.05, step_fraction) {
            prop_assert!(adjustment.proposed_value >= parameter.min);
            prop_assert!(adjustment.proposed_value <= parameter.max);
            prop_assert!(adjustment.score.abs() > 0.05);
            prop_assert!(adjustment.proposed_value != adjustment.previous_value);
        } else {
            let target = parameter.clamp(parameter.current_value + score * parameter.range() * step_fraction);
            prop_assert!(score.abs() <= 0.05 || (target - parameter.current_value).abs() < f64::EPSILON);
        }
    }

    /// Property 6: rebuilding from the same history is reproducible
    #[test]
    fn proptest_replay_stability(
        history in prop::collection::vec((issue_strategy(), solution_strategy(), outcome_strategy()), 0..30),
    ) {
        let vectorizer = FeatureVectorizer::new();
        let records: Vec<_> = history
            .iter()
            .map(|(issue, solution, outcome)| (vectorizer.vectorize_attempt(issue, solution), *outcome))
            .collect();
        let probe = vectorizer.vectorize_issue(&history.first().map_or_else(
            || IssueCharacteristics::new(Complexity::Medium, CATEGORY_VOCABULARY[0]),
            |(issue, _, _)| issue.clone(),
        ));

        let rt = runtime();
        let (first, second) = rt.block_on(async {
            let predictor = Predictor::new(&LearningConfig::default(), vectorizer.tool_vocabulary());
            predictor.rebuild(records.iter().map(|(r, k)| (r, *k)), 0.01).await;
            let first = (predictor.predict(&probe).await, predictor.snapshot().await.biases);

            predictor.rebuild(records.iter().map(|(r, k)| (r, *k)), 0.01).await;
            let second = (predictor.predict(&probe).await, predictor.snapshot().await.biases);
            (first, second)
        });

        prop_assert_eq!(first.0, second.0);
        prop_assert_eq!(first.1, second.1);
    }
}
