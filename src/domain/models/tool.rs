//! Tool catalog and per-tool usage statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Functional category of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    FileOperations,
    CodeAnalysis,
    VersionControl,
    Memory,
    Testing,
    Documentation,
    Security,
    Performance,
    Search,
    Build,
    Coordination,
}

impl ToolCategory {
    /// Categories the selector always keeps represented.
    pub const ESSENTIAL: [ToolCategory; 3] = [
        Self::FileOperations,
        Self::CodeAnalysis,
        Self::VersionControl,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FileOperations => "file_operations",
            Self::CodeAnalysis => "code_analysis",
            Self::VersionControl => "version_control",
            Self::Memory => "memory",
            Self::Testing => "testing",
            Self::Documentation => "documentation",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Search => "search",
            Self::Build => "build",
            Self::Coordination => "coordination",
        }
    }

    pub fn is_essential(self) -> bool {
        Self::ESSENTIAL.contains(&self)
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file_operations" => Ok(Self::FileOperations),
            "code_analysis" => Ok(Self::CodeAnalysis),
            "version_control" => Ok(Self::VersionControl),
            "memory" => Ok(Self::Memory),
            "testing" => Ok(Self::Testing),
            "documentation" => Ok(Self::Documentation),
            "security" => Ok(Self::Security),
            "performance" => Ok(Self::Performance),
            "search" => Ok(Self::Search),
            "build" => Ok(Self::Build),
            "coordination" => Ok(Self::Coordination),
            other => Err(format!("unknown tool category: {other}")),
        }
    }
}

/// Static description of a tool in the catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub category: ToolCategory,
    /// Base selection priority in [0, 1].
    pub base_priority: f64,
}

const fn tool(name: &'static str, category: ToolCategory, base_priority: f64) -> ToolDefinition {
    ToolDefinition {
        name,
        category,
        base_priority,
    }
}

/// The static tool catalog. Order matters: the first
/// [`crate::domain::models::features::TOP_TOOLS`] entries form the tool
/// one-hot vocabulary.
pub const TOOL_CATALOG: &[ToolDefinition] = &[
    tool("file_read", ToolCategory::FileOperations, 1.0),
    tool("file_write", ToolCategory::FileOperations, 1.0),
    tool("memory_store", ToolCategory::Memory, 0.9),
    tool("memory_retrieve", ToolCategory::Memory, 0.9),
    tool("git_commit", ToolCategory::VersionControl, 1.0),
    tool("code_analysis", ToolCategory::CodeAnalysis, 0.9),
    tool("file_edit", ToolCategory::FileOperations, 0.9),
    tool("git_diff", ToolCategory::VersionControl, 0.8),
    tool("grep_search", ToolCategory::Search, 0.7),
    tool("test_runner", ToolCategory::Testing, 0.8),
    tool("linter", ToolCategory::CodeAnalysis, 0.7),
    tool("ast_parser", ToolCategory::CodeAnalysis, 0.7),
    tool("dependency_analyzer", ToolCategory::CodeAnalysis, 0.6),
    tool("test_generator", ToolCategory::Testing, 0.7),
    tool("pull_request_create", ToolCategory::VersionControl, 0.8),
    tool("doc_generator", ToolCategory::Documentation, 0.7),
    tool("file_search", ToolCategory::Search, 0.8),
    tool("semantic_search", ToolCategory::Search, 0.6),
    tool("git_branch", ToolCategory::VersionControl, 0.7),
    tool("issue_comment", ToolCategory::VersionControl, 0.6),
    tool("type_checker", ToolCategory::CodeAnalysis, 0.6),
    tool("complexity_analyzer", ToolCategory::CodeAnalysis, 0.6),
    tool("architecture_reviewer", ToolCategory::CodeAnalysis, 0.6),
    tool("coverage_analyzer", ToolCategory::Testing, 0.6),
    tool("markdown_formatter", ToolCategory::Documentation, 0.5),
    tool("security_scanner", ToolCategory::Security, 0.8),
    tool("vulnerability_checker", ToolCategory::Security, 0.7),
    tool("secret_detector", ToolCategory::Security, 0.6),
    tool("profiler", ToolCategory::Performance, 0.7),
    tool("benchmark_runner", ToolCategory::Performance, 0.6),
    tool("memory_profiler", ToolCategory::Performance, 0.5),
    tool("swarm_coordinator", ToolCategory::Coordination, 0.6),
    tool("task_orchestrator", ToolCategory::Coordination, 0.6),
    tool("npm_runner", ToolCategory::Build, 0.6),
    tool("eslint", ToolCategory::CodeAnalysis, 0.7),
    tool("prettier", ToolCategory::Documentation, 0.4),
    tool("tsc", ToolCategory::CodeAnalysis, 0.7),
    tool("pytest", ToolCategory::Testing, 0.8),
    tool("pylint", ToolCategory::CodeAnalysis, 0.6),
    tool("black", ToolCategory::Documentation, 0.4),
    tool("cargo", ToolCategory::Build, 0.8),
    tool("clippy", ToolCategory::CodeAnalysis, 0.7),
    tool("rustfmt", ToolCategory::Documentation, 0.4),
    tool("go_test", ToolCategory::Testing, 0.7),
    tool("gofmt", ToolCategory::Documentation, 0.4),
    tool("maven", ToolCategory::Build, 0.6),
    tool("junit", ToolCategory::Testing, 0.7),
];

/// Look up a catalog entry by name.
pub fn find_tool(name: &str) -> Option<&'static ToolDefinition> {
    TOOL_CATALOG.iter().find(|t| t.name == name)
}

/// Per-tool performance statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUsageStat {
    pub name: String,
    pub category: ToolCategory,
    pub success_rate: f64,
    pub performance_score: f64,
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ToolUsageStat {
    /// Neutral starting statistics for a catalog tool.
    pub fn seed(definition: &ToolDefinition) -> Self {
        Self {
            name: definition.name.to_string(),
            category: definition.category,
            success_rate: 0.5,
            performance_score: 0.5,
            usage_count: 0,
            last_used_at: None,
        }
    }

    /// Saturating usage component of the selector's ranking score.
    pub fn usage_factor(&self) -> f64 {
        (self.usage_count as f64 / 100.0).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_unique() {
        let names: HashSet<_> = TOOL_CATALOG.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), TOOL_CATALOG.len());
    }

    #[test]
    fn test_catalog_priorities_in_range() {
        for t in TOOL_CATALOG {
            assert!((0.0..=1.0).contains(&t.base_priority), "{} out of range", t.name);
        }
    }

    #[test]
    fn test_every_essential_category_has_a_tool() {
        for category in ToolCategory::ESSENTIAL {
            assert!(TOOL_CATALOG.iter().any(|t| t.category == category));
        }
    }

    #[test]
    fn test_category_round_trip_names() {
        for t in TOOL_CATALOG {
            assert_eq!(t.category.as_str().parse::<ToolCategory>().unwrap(), t.category);
        }
    }

    #[test]
    fn test_usage_factor_saturates() {
        let mut stat = ToolUsageStat::seed(find_tool("file_read").unwrap());
        stat.usage_count = 50;
        assert!((stat.usage_factor() - 0.5).abs() < f64::EPSILON);
        stat.usage_count = 5000;
        assert!((stat.usage_factor() - 1.0).abs() < f64::EPSILON);
    }
}
