//! Feature vectorizer.
//!
//! Maps issue characteristics, optionally with the solution that was applied,
//! onto the fixed-schema [`FeatureRecord`]. Pure and total: unknown
//! categorical values encode as zeros instead of failing.

use crate::domain::models::features::{
    AGENT_TYPE_VOCABULARY, CATEGORY_VOCABULARY, FRAMEWORK_VOCABULARY, LANGUAGE_VOCABULARY,
    TOP_TOOLS,
};
use crate::domain::models::{FeatureRecord, IssueCharacteristics, SolutionApproach, TOOL_CATALOG};

/// Duration at which the normalized duration feature saturates.
pub const DURATION_SATURATION_MS: f64 = 3_600_000.0;

/// Input to [`FeatureVectorizer::vectorize`].
#[derive(Debug, Clone, Copy)]
pub struct FeatureContext<'a> {
    pub issue: &'a IssueCharacteristics,
    pub solution: Option<&'a SolutionApproach>,
}

impl<'a> FeatureContext<'a> {
    /// Context for an incoming issue with no solution yet.
    pub fn issue(issue: &'a IssueCharacteristics) -> Self {
        Self {
            issue,
            solution: None,
        }
    }

    /// Context for a completed attempt.
    pub fn attempt(issue: &'a IssueCharacteristics, solution: &'a SolutionApproach) -> Self {
        Self {
            issue,
            solution: Some(solution),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeatureVectorizer {
    tool_vocabulary: Vec<&'static str>,
}

impl Default for FeatureVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureVectorizer {
    pub fn new() -> Self {
        Self {
            tool_vocabulary: TOOL_CATALOG.iter().take(TOP_TOOLS).map(|t| t.name).collect(),
        }
    }

    /// Names of the tools that own a one-hot slot, in slot order.
    pub fn tool_vocabulary(&self) -> &[&'static str] {
        &self.tool_vocabulary
    }

    pub fn vectorize(&self, context: &FeatureContext<'_>) -> FeatureRecord {
        let issue = context.issue;

        let category = CATEGORY_VOCABULARY
            .iter()
            .map(|c| indicator(*c == issue.category))
            .collect();
        let languages = LANGUAGE_VOCABULARY
            .iter()
            .map(|l| indicator(issue.languages.contains(*l)))
            .collect();
        let frameworks = FRAMEWORK_VOCABULARY
            .iter()
            .map(|f| indicator(issue.frameworks.contains(*f)))
            .collect();

        let (duration, agent_types, tools) = match context.solution {
            Some(solution) => (
                normalize_duration(solution.duration_ms),
                AGENT_TYPE_VOCABULARY
                    .iter()
                    .map(|a| indicator(solution.agent_types.iter().any(|t| t == a)))
                    .collect(),
                self.tool_vocabulary
                    .iter()
                    .map(|t| indicator(solution.tools_used.contains(*t)))
                    .collect(),
            ),
            None => (
                0.0,
                vec![0.0; AGENT_TYPE_VOCABULARY.len()],
                vec![0.0; self.tool_vocabulary.len()],
            ),
        };

        FeatureRecord {
            complexity: issue.complexity.scale(),
            priority: issue.priority.scale(),
            duration,
            category,
            languages,
            frameworks,
            agent_types,
            tools,
        }
    }

    /// Issue-only record, as used for retrieval.
    pub fn vectorize_issue(&self, issue: &IssueCharacteristics) -> FeatureRecord {
        self.vectorize(&FeatureContext::issue(issue))
    }

    /// Full record of a completed attempt, as used for learning.
    pub fn vectorize_attempt(
        &self,
        issue: &IssueCharacteristics,
        solution: &SolutionApproach,
    ) -> FeatureRecord {
        self.vectorize(&FeatureContext::attempt(issue, solution))
    }
}

fn indicator(present: bool) -> f64 {
    if present {
        1.0
    } else {
        0.0
    }
}

pub fn normalize_duration(duration_ms: u64) -> f64 {
    (duration_ms as f64 / DURATION_SATURATION_MS).min(1.0)
}
