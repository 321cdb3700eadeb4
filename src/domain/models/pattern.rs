//! Learning patterns: the stored history of (issue, solution, outcome).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::features::{FeatureRecord, VOCABULARY_VERSION};
use super::issue::{IssueCharacteristics, SolutionApproach};

/// Outcome of a completed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Success,
    Failure,
}

impl PatternKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Training target for the predictor.
    pub const fn target(self) -> f64 {
        match self {
            Self::Success => 1.0,
            Self::Failure => 0.0,
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            other => Err(format!("unknown pattern kind: {other}")),
        }
    }
}

/// One completed attempt.
///
/// `issue_characteristics`, `solution_approach` and `issue_features` are
/// immutable once written; the store only ever raises `usage_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPattern {
    pub id: Uuid,
    pub kind: PatternKind,
    pub issue_characteristics: IssueCharacteristics,
    pub solution_approach: SolutionApproach,
    /// Issue-only feature vector captured at insert time, used for retrieval.
    pub issue_features: FeatureRecord,
    pub vocabulary_version: u32,
    pub confidence: f64,
    pub success_rate: f64,
    pub usage_count: u64,
    pub created_at: DateTime<Utc>,
}

impl LearningPattern {
    pub fn new(
        kind: PatternKind,
        issue_characteristics: IssueCharacteristics,
        solution_approach: SolutionApproach,
        issue_features: FeatureRecord,
        confidence: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            issue_characteristics,
            solution_approach,
            issue_features,
            vocabulary_version: VOCABULARY_VERSION,
            confidence: confidence.clamp(0.0, 1.0),
            success_rate: kind.target(),
            usage_count: 1,
            created_at: Utc::now(),
        }
    }
}

/// A pattern with its similarity to a query issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPattern {
    pub pattern: LearningPattern,
    pub similarity: f64,
}

/// What callers must report after every real-world attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub issue_characteristics: IssueCharacteristics,
    pub solution_approach: SolutionApproach,
    pub outcome: PatternKind,
    pub confidence: f64,
}

/// Outcome counts aggregated over a time range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeTotals {
    pub completed: u64,
    pub failed: u64,
    /// Sum of reported attempt durations.
    pub duration_ms: u64,
}

impl OutcomeTotals {
    pub const fn finished(&self) -> u64 {
        self.completed + self.failed
    }
}

/// Persisted record of one selector invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub id: Uuid,
    pub issue_characteristics: IssueCharacteristics,
    pub tools: Vec<String>,
    pub agents: Vec<String>,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}
