//! Port trait definitions (Hexagonal Architecture)
//!
//! Async interfaces the SQLite adapters and telemetry probes implement:
//! - PatternRepository: learning pattern storage
//! - ToolStatsRepository: per-tool statistics
//! - ParameterRepository: tunable parameters and adjustment history
//! - TelemetryRepository: metric time series
//! - SelectionRepository: selection history
//! - TelemetrySource: metric producers

pub mod parameter_repository;
pub mod pattern_repository;
pub mod selection_repository;
pub mod telemetry_repository;
pub mod telemetry_source;
pub mod tool_stats_repository;

pub use parameter_repository::ParameterRepository;
pub use pattern_repository::PatternRepository;
pub use selection_repository::SelectionRepository;
pub use telemetry_repository::TelemetryRepository;
pub use telemetry_source::TelemetrySource;
pub use tool_stats_repository::ToolStatsRepository;
