//! Tool and agent selection.
//!
//! Candidates come from four rule tables (base, category, language and
//! complexity tier), are merged and re-weighted, ranked against recorded tool
//! statistics and truncated to a complexity-dependent limit. Essential tool
//! categories are backfilled after truncation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    find_tool, Complexity, IssueCategory, IssueCharacteristics, ScoredPattern, SelectionRecord,
    SelectorConfig, TaskAnalysis, ToolCategory, ToolUsageStat,
};
use crate::domain::ports::{SelectionRepository, ToolStatsRepository};

/// Always-included essentials.
pub const BASE_TOOLS: [&str; 5] = [
    "file_read",
    "file_write",
    "memory_store",
    "memory_retrieve",
    "git_commit",
];

/// Complexity tiers: a tier unlocks once the complexity scale reaches its
/// threshold.
const COMPLEXITY_TIERS: [(f64, &[&str]); 3] = [
    (0.3, &["file_edit", "git_diff", "grep_search"]),
    (
        0.7,
        &[
            "ast_parser",
            "dependency_analyzer",
            "test_generator",
            "semantic_search",
            "pull_request_create",
        ],
    ),
    (
        1.0,
        &[
            "swarm_coordinator",
            "task_orchestrator",
            "architecture_reviewer",
            "complexity_analyzer",
        ],
    ),
];

/// Priority boost per additional rule source.
const SOURCE_BOOST: f64 = 0.1;
/// Multiplier per matching language affinity.
const LANGUAGE_AFFINITY_BONUS: f64 = 1.1;

pub fn category_tools(category: IssueCategory) -> &'static [&'static str] {
    match category {
        IssueCategory::Bug => &["code_analysis", "grep_search", "test_runner", "git_diff", "linter"],
        IssueCategory::Feature => &[
            "code_analysis",
            "file_edit",
            "test_generator",
            "test_runner",
            "git_branch",
            "pull_request_create",
        ],
        IssueCategory::Enhancement => &[
            "code_analysis",
            "file_edit",
            "test_runner",
            "complexity_analyzer",
            "git_diff",
        ],
        IssueCategory::Documentation => &[
            "doc_generator",
            "markdown_formatter",
            "file_search",
            "file_edit",
        ],
        IssueCategory::Refactor => &[
            "code_analysis",
            "ast_parser",
            "complexity_analyzer",
            "dependency_analyzer",
            "test_runner",
            "git_diff",
        ],
        IssueCategory::Performance => &[
            "profiler",
            "benchmark_runner",
            "memory_profiler",
            "code_analysis",
        ],
        IssueCategory::Security => &[
            "security_scanner",
            "vulnerability_checker",
            "secret_detector",
            "code_analysis",
            "dependency_analyzer",
        ],
        IssueCategory::Testing => &[
            "test_runner",
            "test_generator",
            "coverage_analyzer",
            "code_analysis",
        ],
        IssueCategory::Other => &[],
    }
}

pub fn language_tools(language: &str) -> &'static [&'static str] {
    match language {
        "javascript" => &["npm_runner", "eslint", "prettier"],
        "typescript" => &["npm_runner", "eslint", "prettier", "tsc"],
        "python" => &["pytest", "pylint", "black"],
        "rust" => &["cargo", "clippy", "rustfmt"],
        "go" => &["go_test", "gofmt"],
        "java" => &["maven", "junit"],
        _ => &[],
    }
}

/// Weight of a tool category for an issue category, where one is defined.
pub fn category_weight(category: IssueCategory, tool: ToolCategory) -> Option<f64> {
    use ToolCategory as T;
    match (category, tool) {
        (IssueCategory::Bug, T::CodeAnalysis) => Some(1.2),
        (IssueCategory::Bug, T::Testing | T::Search) => Some(1.1),
        (IssueCategory::Feature, T::FileOperations) => Some(1.1),
        (IssueCategory::Feature, T::Testing) => Some(1.1),
        (IssueCategory::Enhancement, T::CodeAnalysis) => Some(1.1),
        (IssueCategory::Documentation, T::Documentation) => Some(1.3),
        (IssueCategory::Documentation, T::Testing) => Some(0.7),
        (IssueCategory::Refactor, T::CodeAnalysis) => Some(1.3),
        (IssueCategory::Performance, T::Performance) => Some(1.3),
        (IssueCategory::Security, T::Security) => Some(1.3),
        (IssueCategory::Testing, T::Testing) => Some(1.3),
        _ => None,
    }
}

/// Whether a language has affinity with a tool category.
fn language_affinity(language: &str, tool: ToolCategory) -> bool {
    use ToolCategory as T;
    match language {
        "javascript" | "typescript" => matches!(tool, T::Build | T::CodeAnalysis),
        "python" => matches!(tool, T::Testing | T::CodeAnalysis),
        "rust" => matches!(tool, T::Build | T::CodeAnalysis | T::Performance),
        "go" => matches!(tool, T::Testing | T::Performance),
        "java" => matches!(tool, T::Build | T::Testing),
        _ => false,
    }
}

pub fn category_agents(category: IssueCategory) -> &'static [&'static str] {
    match category {
        IssueCategory::Bug => &["debugger", "coder", "tester"],
        IssueCategory::Feature => &["architect", "coder", "tester", "reviewer"],
        IssueCategory::Enhancement => &["coder", "reviewer", "tester"],
        IssueCategory::Documentation => &["documenter", "reviewer"],
        IssueCategory::Refactor => &["architect", "coder", "reviewer", "tester"],
        IssueCategory::Performance => &["researcher", "coder", "tester"],
        IssueCategory::Security => &["security-auditor", "coder", "reviewer"],
        IssueCategory::Testing => &["tester", "coder"],
        IssueCategory::Other => &["coder"],
    }
}

pub const fn agent_limit(complexity: Complexity) -> usize {
    match complexity {
        Complexity::Low => 2,
        Complexity::Medium => 3,
        Complexity::High => 5,
    }
}

/// A tool in the final, ranked selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTool {
    pub name: String,
    pub category: ToolCategory,
    /// Re-weighted priority in [0, 1].
    pub priority: f64,
    /// Combined ranking score.
    pub score: f64,
    /// Number of rule tables (and pattern hints) that proposed the tool.
    pub sources: u32,
}

/// Tool and role suggestions carried over from similar past successes.
#[derive(Debug, Clone, Default)]
pub struct PatternHints {
    tools: BTreeMap<String, f64>,
    agents: Vec<String>,
}

impl PatternHints {
    pub fn from_patterns(similar: &[ScoredPattern]) -> Self {
        let mut hints = Self::default();
        for scored in similar {
            for tool in &scored.pattern.solution_approach.tools_used {
                let entry = hints.tools.entry(tool.clone()).or_insert(0.0);
                *entry = entry.max(scored.similarity);
            }
            for agent in &scored.pattern.solution_approach.agent_types {
                if !hints.agents.contains(agent) {
                    hints.agents.push(agent.clone());
                }
            }
        }
        hints
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.agents.is_empty()
    }
}

/// Everything that adjusts the static rules for one request.
#[derive(Debug, Clone, Default)]
pub struct SelectionAdjustments {
    pub hints: PatternHints,
    /// Per-tool multipliers learned by the predictor.
    pub tool_factors: HashMap<String, f64>,
    pub max_concurrent_agents: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSelection {
    pub id: Uuid,
    pub tools: Vec<RankedTool>,
    pub agents: Vec<String>,
}

impl ToolSelection {
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    category: ToolCategory,
    priority: f64,
    sources: u32,
}

fn gather_candidates(
    chars: &IssueCharacteristics,
    hints: &PatternHints,
) -> BTreeMap<&'static str, Candidate> {
    let mut candidates: BTreeMap<&'static str, Candidate> = BTreeMap::new();

    let mut add = |name: &str| {
        let Some(def) = find_tool(name) else {
            debug!(tool = name, "Ignoring tool missing from catalog");
            return;
        };
        candidates
            .entry(def.name)
            .and_modify(|c| {
                c.sources += 1;
                c.priority = (c.priority + SOURCE_BOOST).min(1.0);
            })
            .or_insert(Candidate {
                category: def.category,
                priority: def.base_priority,
                sources: 1,
            });
    };

    for name in BASE_TOOLS {
        add(name);
    }
    for name in category_tools(chars.category).iter().copied() {
        add(name);
    }
    for language in &chars.languages {
        for name in language_tools(language).iter().copied() {
            add(name);
        }
    }
    let scale = chars.complexity.scale();
    for (threshold, tier) in COMPLEXITY_TIERS {
        if scale >= threshold {
            for name in tier.iter().copied() {
                add(name);
            }
        }
    }
    for name in hints.tools.keys() {
        add(name.as_str());
    }

    candidates
}

/// Rank every candidate. Pure; the result is sorted best first and not yet
/// truncated.
pub fn rank_candidates(
    chars: &IssueCharacteristics,
    stats: &HashMap<String, ToolUsageStat>,
    adjustments: &SelectionAdjustments,
) -> Vec<RankedTool> {
    let complexity_scale = chars.complexity.scale();

    let mut ranked: Vec<RankedTool> = gather_candidates(chars, &adjustments.hints)
        .into_iter()
        .map(|(name, c)| {
            let mut priority = c.priority;
            if let Some(w) = category_weight(chars.category, c.category) {
                priority *= w;
            }
            for language in &chars.languages {
                if language_affinity(language, c.category) {
                    priority *= LANGUAGE_AFFINITY_BONUS;
                }
            }
            priority *= complexity_scale;
            if let Some(similarity) = adjustments.hints.tools.get(name) {
                priority *= 1.0 + 0.2 * similarity;
            }
            if let Some(factor) = adjustments.tool_factors.get(name) {
                priority *= factor;
            }
            let priority = priority.clamp(0.0, 1.0);

            let (success_rate, performance, usage) = match stats.get(name) {
                Some(s) => (s.success_rate, s.performance_score, s.usage_factor()),
                None => (0.5, 0.5, 0.0),
            };
            let score = 0.4 * priority + 0.3 * success_rate + 0.2 * performance + 0.1 * usage;

            RankedTool {
                name: name.to_string(),
                category: c.category,
                priority,
                score,
                sources: c.sources,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    ranked
}

/// Truncate to `limit`, then make sure every essential category is present.
pub fn truncate_with_backfill(ranked: &[RankedTool], limit: usize) -> Vec<RankedTool> {
    let mut selected: Vec<RankedTool> = ranked.iter().take(limit).cloned().collect();

    for essential in ToolCategory::ESSENTIAL {
        if selected.iter().any(|t| t.category == essential) {
            continue;
        }
        let Some(backfill) = ranked
            .iter()
            .skip(limit)
            .find(|t| t.category == essential)
        else {
            debug!(category = %essential, "No candidate available to backfill essential category");
            continue;
        };

        if selected.len() < limit {
            selected.push(backfill.clone());
            continue;
        }

        let replaceable = (0..selected.len()).rev().find(|&i| {
            let category = selected[i].category;
            !category.is_essential() || selected.iter().filter(|t| t.category == category).count() > 1
        });
        if let Some(i) = replaceable {
            selected[i] = backfill.clone();
        }
    }

    selected.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    selected
}

/// Ordered, deduplicated roles bounded by complexity and the concurrency cap.
pub fn select_agents(
    chars: &IssueCharacteristics,
    hints: &PatternHints,
    max_concurrent_agents: Option<usize>,
) -> Vec<String> {
    let mut limit = agent_limit(chars.complexity);
    if let Some(cap) = max_concurrent_agents {
        limit = limit.min(cap.max(1));
    }

    let mut agents: Vec<String> = Vec::new();
    for role in category_agents(chars.category)
        .iter()
        .map(|r| (*r).to_string())
        .chain(hints.agents.iter().cloned())
    {
        if agents.len() >= limit {
            break;
        }
        if !agents.contains(&role) {
            agents.push(role);
        }
    }
    agents
}

pub struct ToolSelector {
    stats: Arc<dyn ToolStatsRepository>,
    selections: Arc<dyn SelectionRepository>,
    limits: SelectorConfig,
}

impl ToolSelector {
    pub fn new(
        stats: Arc<dyn ToolStatsRepository>,
        selections: Arc<dyn SelectionRepository>,
        limits: SelectorConfig,
    ) -> Self {
        Self {
            stats,
            selections,
            limits,
        }
    }

    pub fn limit_for(&self, complexity: Complexity) -> usize {
        match complexity {
            Complexity::Low => self.limits.low_limit,
            Complexity::Medium => self.limits.medium_limit,
            Complexity::High => self.limits.high_limit,
        }
    }

    /// Select tools and agents, record their usage and persist the selection.
    #[instrument(skip_all, fields(category = %analysis.characteristics.category, complexity = %analysis.characteristics.complexity))]
    pub async fn select(
        &self,
        analysis: &TaskAnalysis,
        adjustments: &SelectionAdjustments,
        confidence: Option<f64>,
    ) -> DomainResult<ToolSelection> {
        let chars = &analysis.characteristics;
        let stats: HashMap<String, ToolUsageStat> = self
            .stats
            .list()
            .await?
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();

        let ranked = rank_candidates(chars, &stats, adjustments);
        let tools = truncate_with_backfill(&ranked, self.limit_for(chars.complexity));
        let agents = select_agents(chars, &adjustments.hints, adjustments.max_concurrent_agents);

        let now = Utc::now();
        let names: Vec<String> = tools.iter().map(|t| t.name.clone()).collect();
        self.stats.record_usage(&names, now).await?;

        let record = SelectionRecord {
            id: Uuid::new_v4(),
            issue_characteristics: chars.clone(),
            tools: names,
            agents: agents.clone(),
            confidence,
            created_at: now,
        };
        self.selections.save(&record).await?;

        debug!(
            selection_id = %record.id,
            candidates = ranked.len(),
            selected = tools.len(),
            agents = agents.len(),
            "Tool selection complete"
        );

        Ok(ToolSelection {
            id: record.id,
            tools,
            agents,
        })
    }
}
