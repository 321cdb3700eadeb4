//! autoresolve - adaptive selection and self-optimization engine
//!
//! Picks tools and agent roles for automated issue resolution, learns from
//! recorded outcomes, and tunes its own runtime parameters from telemetry.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, repository ports and errors
//! - **Adapters** (`adapters`): SQLite persistence
//! - **Service Layer** (`services`): vectorizer, retriever, predictor,
//!   selector, optimizer and the recommendation facade
//! - **Infrastructure Layer** (`infrastructure`): config, logging, telemetry
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, IssueCharacteristics, IssueTicket, LearningPattern, OutcomeReport, PatternKind,
    SolutionApproach, TaskAnalysis,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{Recommendation, RecommendationEngine, SuggestionStatus};
