//! Online linear success predictor.
//!
//! A single-layer weighted sum squashed through a sigmoid, updated with one
//! gradient step per recorded outcome. The state is owned by [`Predictor`]
//! and every mutation goes through its mutex, so concurrent outcome
//! recordings are serialized.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::models::{FeatureRecord, LearningConfig, PatternKind};

/// Weight assumed for features that have never been updated.
pub const DEFAULT_WEIGHT: f64 = 0.5;
/// Fixed per-outcome bias shift.
pub const BIAS_STEP: f64 = 0.001;
pub const BIAS_LIMIT: f64 = 0.5;

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Biases {
    pub complexity: f64,
    pub language: f64,
    pub category: f64,
}

impl Biases {
    fn sum(&self) -> f64 {
        self.complexity + self.language + self.category
    }

    fn shift(&mut self, delta: f64) {
        self.complexity = (self.complexity + delta).clamp(-BIAS_LIMIT, BIAS_LIMIT);
        self.language = (self.language + delta).clamp(-BIAS_LIMIT, BIAS_LIMIT);
        self.category = (self.category + delta).clamp(-BIAS_LIMIT, BIAS_LIMIT);
    }
}

/// Diagnostic entry. Never replayed.
#[derive(Debug, Clone, Serialize)]
pub struct LearningEvent {
    pub timestamp: DateTime<Utc>,
    pub outcome: PatternKind,
    pub features: Vec<(String, f64)>,
    pub learning_rate: f64,
    pub prediction: f64,
}

#[derive(Debug, Clone)]
pub struct PredictorState {
    feature_weights: HashMap<String, f64>,
    biases: Biases,
    history: VecDeque<LearningEvent>,
    history_capacity: usize,
    history_trim_to: usize,
    updates: u64,
}

impl PredictorState {
    pub fn new(history_capacity: usize, history_trim_to: usize) -> Self {
        Self {
            feature_weights: HashMap::new(),
            biases: Biases::default(),
            history: VecDeque::with_capacity(history_capacity.min(1024)),
            history_capacity: history_capacity.max(1),
            history_trim_to: history_trim_to.min(history_capacity),
            updates: 0,
        }
    }

    pub fn weight(&self, feature: &str) -> f64 {
        self.feature_weights
            .get(feature)
            .copied()
            .unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn biases(&self) -> Biases {
        self.biases
    }

    pub fn history(&self) -> &VecDeque<LearningEvent> {
        &self.history
    }

    pub fn weights(&self) -> &HashMap<String, f64> {
        &self.feature_weights
    }

    pub fn update_count(&self) -> u64 {
        self.updates
    }

    pub fn predict(&self, features: &[(String, f64)]) -> f64 {
        let activation: f64 = features
            .iter()
            .map(|(name, value)| self.weight(name) * sigmoid(*value))
            .sum::<f64>()
            + self.biases.sum();

        let p = sigmoid(activation);
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    /// One online gradient step. Returns the prediction error before the step.
    pub fn update(&mut self, features: &[(String, f64)], outcome: PatternKind, learning_rate: f64) -> f64 {
        let prediction = self.predict(features);
        let error = outcome.target() - prediction;

        for (name, value) in features {
            let w = self.weight(name) + learning_rate * error * sigmoid(*value);
            self.feature_weights.insert(name.clone(), w);
        }

        let delta = if outcome.is_success() {
            BIAS_STEP
        } else {
            -BIAS_STEP
        };
        self.biases.shift(delta);
        self.updates += 1;

        self.history.push_back(LearningEvent {
            timestamp: Utc::now(),
            outcome,
            features: features.to_vec(),
            learning_rate,
            prediction,
        });
        if self.history.len() > self.history_capacity {
            let excess = self.history.len() - self.history_trim_to;
            self.history.drain(..excess);
        }

        error
    }
}

/// Summary of the predictor state for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct PredictorSnapshot {
    pub biases: Biases,
    pub weight_count: usize,
    pub history_len: usize,
    pub updates: u64,
}

/// Result of one recorded outcome.
#[derive(Debug, Clone, Copy)]
pub struct UpdateReport {
    pub error: f64,
    pub learning_rate: f64,
}

/// Owner of the process-wide [`PredictorState`].
pub struct Predictor {
    state: Mutex<PredictorState>,
    tool_vocabulary: Vec<&'static str>,
    history_capacity: usize,
    history_trim_to: usize,
}

impl Predictor {
    pub fn new(config: &LearningConfig, tool_vocabulary: &[&'static str]) -> Self {
        Self {
            state: Mutex::new(PredictorState::new(
                config.history_capacity,
                config.history_trim_to,
            )),
            tool_vocabulary: tool_vocabulary.to_vec(),
            history_capacity: config.history_capacity,
            history_trim_to: config.history_trim_to,
        }
    }

    fn named(&self, record: &FeatureRecord) -> Vec<(String, f64)> {
        record.named_features(&self.tool_vocabulary)
    }

    /// Success probability in [0, 1].
    pub async fn predict(&self, record: &FeatureRecord) -> f64 {
        let features = self.named(record);
        self.state.lock().await.predict(&features)
    }

    pub async fn update(
        &self,
        record: &FeatureRecord,
        outcome: PatternKind,
        learning_rate: f64,
    ) -> UpdateReport {
        let features = self.named(record);
        let error = self.state.lock().await.update(&features, outcome, learning_rate);
        debug!(outcome = %outcome, error, learning_rate, "Predictor updated");
        UpdateReport {
            error,
            learning_rate,
        }
    }

    /// Replay outcomes oldest first into a fresh state, replacing the
    /// current one. Returns the number of outcomes replayed.
    pub async fn rebuild<'a>(
        &self,
        outcomes: impl IntoIterator<Item = (&'a FeatureRecord, PatternKind)>,
        learning_rate: f64,
    ) -> usize {
        let mut fresh = PredictorState::new(self.history_capacity, self.history_trim_to);
        let mut replayed = 0;
        for (record, outcome) in outcomes {
            fresh.update(&self.named(record), outcome, learning_rate);
            replayed += 1;
        }
        *self.state.lock().await = fresh;
        replayed
    }

    /// Multiplier the selector applies for a tool, from its learned weight.
    /// Neutral (1.0) for tools without a one-hot slot.
    pub async fn tool_factors(&self) -> HashMap<String, f64> {
        let state = self.state.lock().await;
        self.tool_vocabulary
            .iter()
            .map(|tool| {
                let w = state.weight(&format!("tool.{tool}"));
                ((*tool).to_string(), (w / DEFAULT_WEIGHT).clamp(0.5, 1.5))
            })
            .collect()
    }

    pub async fn snapshot(&self) -> PredictorSnapshot {
        let state = self.state.lock().await;
        PredictorSnapshot {
            biases: state.biases(),
            weight_count: state.weights().len(),
            history_len: state.history().len(),
            updates: state.update_count(),
        }
    }

    pub async fn weight(&self, feature: &str) -> f64 {
        self.state.lock().await.weight(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features() -> Vec<(String, f64)> {
        vec![
            ("complexity".to_string(), 0.3),
            ("priority".to_string(), 0.7),
            ("duration".to_string(), 0.0),
            ("category.bug".to_string(), 1.0),
            ("language.javascript".to_string(), 1.0),
        ]
    }

    #[test]
    fn test_default_prediction() {
        let state = PredictorState::new(1000, 500);
        let p = state.predict(&features());
        assert!(p > 0.8 && p < 0.85, "got {p}");
    }

    #[test]
    fn test_success_raises_weights_and_biases() {
        let mut state = PredictorState::new(1000, 500);
        let before = state.predict(&features());
        state.update(&features(), PatternKind::Success, 0.1);

        assert!(state.weight("category.bug") > DEFAULT_WEIGHT);
        assert!((state.biases().language - BIAS_STEP).abs() < 1e-12);
        assert!(state.predict(&features()) > before);
    }

    #[test]
    fn test_failure_lowers_prediction() {
        let mut state = PredictorState::new(1000, 500);
        let before = state.predict(&features());
        state.update(&features(), PatternKind::Failure, 0.1);
        assert!(state.predict(&features()) < before);
        assert!(state.biases().category < 0.0);
    }

    #[test]
    fn test_biases_are_clamped() {
        let mut state = PredictorState::new(10, 5);
        for _ in 0..2000 {
            state.update(&features(), PatternKind::Failure, 0.001);
        }
        assert!((state.biases().complexity + BIAS_LIMIT).abs() < 1e-12);
    }

    #[test]
    fn test_history_trims_on_overflow() {
        let mut state = PredictorState::new(10, 5);
        for _ in 0..11 {
            state.update(&features(), PatternKind::Success, 0.01);
        }
        assert_eq!(state.history().len(), 5);
        assert_eq!(state.update_count(), 11);
    }

    #[test]
    fn test_unseen_feature_uses_default_weight() {
        let state = PredictorState::new(10, 5);
        assert!((state.weight("framework.rails") - DEFAULT_WEIGHT).abs() < f64::EPSILON);
    }

    fn record() -> FeatureRecord {
        FeatureRecord {
            complexity: 0.3,
            priority: 0.7,
            duration: 0.1,
            category: vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            languages: vec![0.0; 10],
            frameworks: vec![0.0; 10],
            agent_types: vec![0.0; 8],
            tools: vec![1.0, 0.0],
        }
    }

    #[tokio::test]
    async fn test_tool_factors_follow_weights() {
        let predictor = Predictor::new(&LearningConfig::default(), &["file_read", "file_write"]);
        let neutral = predictor.tool_factors().await;
        assert!((neutral["file_read"] - 1.0).abs() < f64::EPSILON);

        predictor.update(&record(), PatternKind::Success, 0.1).await;
        let factors = predictor.tool_factors().await;
        assert!(factors["file_read"] > 1.0);
        assert!((factors["file_write"] - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_state() {
        let predictor = Predictor::new(&LearningConfig::default(), &["file_read", "file_write"]);
        predictor.update(&record(), PatternKind::Failure, 0.1).await;

        let r = record();
        let replayed = predictor
            .rebuild([(&r, PatternKind::Success), (&r, PatternKind::Success)], 0.01)
            .await;
        assert_eq!(replayed, 2);

        let snapshot = predictor.snapshot().await;
        assert_eq!(snapshot.updates, 2);
        assert!(snapshot.biases.category > 0.0);
    }
}
