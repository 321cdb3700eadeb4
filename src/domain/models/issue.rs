//! Issue-side domain models: what an incoming ticket looks like and how it
//! is characterized for selection and learning.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Coarse complexity classification of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Default for Complexity {
    fn default() -> Self {
        Self::Medium
    }
}

impl Complexity {
    /// Normalized complexity scale used by the vectorizer, the selector's
    /// tier gating and its complexity scaling factor.
    pub const fn scale(self) -> f64 {
        match self {
            Self::Low => 0.3,
            Self::Medium => 0.7,
            Self::High => 1.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Bug,
    Feature,
    Enhancement,
    Documentation,
    Refactor,
    Performance,
    Security,
    Testing,
    Other,
}

impl Default for IssueCategory {
    fn default() -> Self {
        Self::Other
    }
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 9] = [
        Self::Bug,
        Self::Feature,
        Self::Enhancement,
        Self::Documentation,
        Self::Refactor,
        Self::Performance,
        Self::Security,
        Self::Testing,
        Self::Other,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Enhancement => "enhancement",
            Self::Documentation => "documentation",
            Self::Refactor => "refactor",
            Self::Performance => "performance",
            Self::Security => "security",
            Self::Testing => "testing",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bug" | "bugfix" | "defect" => Ok(Self::Bug),
            "feature" | "feature-request" => Ok(Self::Feature),
            "enhancement" | "improvement" => Ok(Self::Enhancement),
            "documentation" | "docs" => Ok(Self::Documentation),
            "refactor" | "refactoring" | "cleanup" => Ok(Self::Refactor),
            "performance" | "perf" => Ok(Self::Performance),
            "security" => Ok(Self::Security),
            "testing" | "test" | "tests" => Ok(Self::Testing),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown issue category: {other}")),
        }
    }
}

/// Issue priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl Priority {
    pub const fn scale(self) -> f64 {
        match self {
            Self::Low => 0.3,
            Self::Medium => 0.7,
            Self::High => 1.0,
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Deserialize a name set the way the builders insert names, dropping blanks.
fn normalized_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let names = Vec::<String>::deserialize(deserializer)?;
    Ok(names
        .iter()
        .map(|n| normalize_name(n))
        .filter(|n| !n.is_empty())
        .collect())
}

/// Structured characteristics of an issue, as stored with every pattern.
///
/// Language and framework names are always trimmed and lowercase, whether
/// they arrive through the builders or through deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IssueCharacteristics {
    pub complexity: Complexity,
    pub category: IssueCategory,
    #[serde(default, deserialize_with = "normalized_set")]
    pub languages: BTreeSet<String>,
    #[serde(default, deserialize_with = "normalized_set")]
    pub frameworks: BTreeSet<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl IssueCharacteristics {
    pub fn new(complexity: Complexity, category: IssueCategory) -> Self {
        Self {
            complexity,
            category,
            ..Default::default()
        }
    }

    pub fn with_language(mut self, language: impl AsRef<str>) -> Self {
        self.languages.insert(normalize_name(language.as_ref()));
        self
    }

    pub fn with_framework(mut self, framework: impl AsRef<str>) -> Self {
        self.frameworks.insert(normalize_name(framework.as_ref()));
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// How an attempt was carried out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SolutionApproach {
    /// Agent roles, in the order they were engaged.
    #[serde(default)]
    pub agent_types: Vec<String>,
    #[serde(default)]
    pub tools_used: BTreeSet<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

/// Raw ticket as received from the version-control platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueTicket {
    #[serde(default)]
    pub number: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Classified issue handed to the selector.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskAnalysis {
    #[serde(default)]
    pub issue_number: Option<u64>,
    #[serde(default)]
    pub title: String,
    pub characteristics: IssueCharacteristics,
}

impl TaskAnalysis {
    pub fn new(characteristics: IssueCharacteristics) -> Self {
        Self {
            issue_number: None,
            title: String::new(),
            characteristics,
        }
    }
}
