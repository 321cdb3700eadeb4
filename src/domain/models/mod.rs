pub mod config;
pub mod features;
pub mod issue;
pub mod optimization;
pub mod pattern;
pub mod telemetry;
pub mod tool;

pub use config::{
    Config, DatabaseConfig, LearningConfig, LoggingConfig, OptimizerConfig, RetrievalConfig,
    SelectorConfig,
};
pub use features::{FeatureRecord, VOCABULARY_VERSION};
pub use issue::{
    Complexity, IssueCategory, IssueCharacteristics, IssueTicket, Priority, SolutionApproach,
    TaskAnalysis,
};
pub use optimization::{
    default_parameters, AdjustmentDirection, AdjustmentRecord, AdjustmentStatus,
    OptimizationParameter, ParameterAdjustment, ReactiveSignal, Response,
};
pub use pattern::{
    LearningPattern, OutcomeReport, OutcomeTotals, PatternKind, ScoredPattern, SelectionRecord,
};
pub use telemetry::{MetricTrend, MetricType, Polarity, TelemetrySample};
pub use tool::{find_tool, ToolCategory, ToolDefinition, ToolUsageStat, TOOL_CATALOG};
