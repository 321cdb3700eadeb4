pub mod issue_classifier;
pub mod optimizer;
pub mod outcome_telemetry;
pub mod predictor;
pub mod recommendation_engine;
pub mod runtime_parameters;
pub mod session_counters;
pub mod similarity;
pub mod tool_selector;
pub mod trend;
pub mod vectorizer;

pub use optimizer::{
    CycleOutcome, CycleReport, DaemonHandle, DaemonStatus, Optimizer, OptimizerDaemon,
    OptimizerEvent, OptimizerState, StopReason,
};
pub use outcome_telemetry::OutcomeTelemetrySource;
pub use predictor::{Predictor, PredictorSnapshot};
pub use recommendation_engine::{
    ExecutionLimits, Recommendation, RecommendationEngine, SuggestionStatus,
};
pub use runtime_parameters::{seed_parameters, RuntimeParameters};
pub use session_counters::SessionCounters;
pub use similarity::SimilarityRetriever;
pub use tool_selector::{RankedTool, SelectionAdjustments, ToolSelection, ToolSelector};
pub use vectorizer::FeatureVectorizer;
