//! Fixed-schema numeric feature records and their vocabularies.

use serde::{Deserialize, Serialize};

use super::issue::IssueCategory;

/// Version of the one-hot vocabularies below. Any change to a vocabulary
/// must bump this and ship a migration for stored feature vectors.
pub const VOCABULARY_VERSION: u32 = 1;

/// Category one-hot vocabulary. `other` is intentionally absent so it
/// encodes as an all-zero slice.
pub const CATEGORY_VOCABULARY: [IssueCategory; 8] = [
    IssueCategory::Bug,
    IssueCategory::Feature,
    IssueCategory::Enhancement,
    IssueCategory::Documentation,
    IssueCategory::Refactor,
    IssueCategory::Performance,
    IssueCategory::Security,
    IssueCategory::Testing,
];

pub const LANGUAGE_VOCABULARY: [&str; 10] = [
    "javascript",
    "typescript",
    "python",
    "rust",
    "go",
    "java",
    "csharp",
    "cpp",
    "ruby",
    "php",
];

pub const FRAMEWORK_VOCABULARY: [&str; 10] = [
    "react", "vue", "angular", "express", "nextjs", "django", "flask", "spring", "rails", "tokio",
];

pub const AGENT_TYPE_VOCABULARY: [&str; 8] = [
    "coder",
    "reviewer",
    "tester",
    "researcher",
    "architect",
    "debugger",
    "documenter",
    "security-auditor",
];

/// Number of catalog tools that get a one-hot slot.
pub const TOP_TOOLS: usize = 16;

/// Fixed-schema numeric encoding of an issue or attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub complexity: f64,
    pub priority: f64,
    pub duration: f64,
    pub category: Vec<f64>,
    pub languages: Vec<f64>,
    pub frameworks: Vec<f64>,
    pub agent_types: Vec<f64>,
    pub tools: Vec<f64>,
}

impl FeatureRecord {
    /// Flatten to the compact vector used for cosine similarity: scalars as
    /// they are, each one-hot slice summed to a single component.
    pub fn similarity_vector(&self) -> [f64; 8] {
        [
            self.complexity,
            self.priority,
            self.duration,
            self.category.iter().sum(),
            self.languages.iter().sum(),
            self.frameworks.iter().sum(),
            self.agent_types.iter().sum(),
            self.tools.iter().sum(),
        ]
    }

    /// Named features for the predictor. Scalars are always present; one-hot
    /// dimensions are present only when set.
    pub fn named_features(&self, tool_vocabulary: &[&str]) -> Vec<(String, f64)> {
        let mut features = vec![
            ("complexity".to_string(), self.complexity),
            ("priority".to_string(), self.priority),
            ("duration".to_string(), self.duration),
        ];

        push_present(
            &mut features,
            "category",
            &self.category,
            CATEGORY_VOCABULARY.iter().map(|c| c.as_str()),
        );
        push_present(&mut features, "language", &self.languages, LANGUAGE_VOCABULARY.iter().copied());
        push_present(&mut features, "framework", &self.frameworks, FRAMEWORK_VOCABULARY.iter().copied());
        push_present(&mut features, "agent", &self.agent_types, AGENT_TYPE_VOCABULARY.iter().copied());
        push_present(&mut features, "tool", &self.tools, tool_vocabulary.iter().copied());

        features
    }
}

fn push_present<'a>(
    out: &mut Vec<(String, f64)>,
    prefix: &str,
    slice: &[f64],
    names: impl Iterator<Item = &'a str>,
) {
    for (value, name) in slice.iter().zip(names) {
        if *value != 0.0 {
            out.push((format!("{prefix}.{name}"), *value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FeatureRecord {
        FeatureRecord {
            complexity: 0.3,
            priority: 0.7,
            duration: 0.0,
            category: vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            languages: vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            frameworks: vec![0.0; FRAMEWORK_VOCABULARY.len()],
            agent_types: vec![0.0; AGENT_TYPE_VOCABULARY.len()],
            tools: vec![0.0; TOP_TOOLS],
        }
    }

    #[test]
    fn test_similarity_vector_sums_slices() {
        let v = record().similarity_vector();
        assert!((v[3] - 1.0).abs() < f64::EPSILON);
        assert!((v[4] - 2.0).abs() < f64::EPSILON);
        assert!(v[5].abs() < f64::EPSILON);
    }

    #[test]
    fn test_named_features_skip_unset_dimensions() {
        let names: Vec<String> = record()
            .named_features(&[])
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert!(names.contains(&"complexity".to_string()));
        assert!(names.contains(&"duration".to_string()));
        assert!(names.contains(&"category.bug".to_string()));
        assert!(names.contains(&"language.typescript".to_string()));
        assert!(!names.iter().any(|n| n.starts_with("framework.")));
    }
}
