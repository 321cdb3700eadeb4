//! Wiring shared by every command: database, repositories and services.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use crate::adapters::sqlite::{
    initialize_database, SqliteParameterRepository, SqlitePatternRepository,
    SqliteSelectionRepository, SqliteTelemetryRepository, SqliteToolStatsRepository,
};
use crate::domain::models::{Config, TOOL_CATALOG};
use crate::domain::ports::{ParameterRepository, TelemetrySource, ToolStatsRepository};
use crate::infrastructure::telemetry::{CompositeTelemetrySource, SystemTelemetrySource};
use crate::services::{
    seed_parameters, FeatureVectorizer, Optimizer, OutcomeTelemetrySource, Predictor,
    RecommendationEngine, RuntimeParameters, SessionCounters, SimilarityRetriever, ToolSelector,
};

pub struct EngineContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub patterns: Arc<SqlitePatternRepository>,
    pub tool_stats: Arc<SqliteToolStatsRepository>,
    pub parameters: Arc<SqliteParameterRepository>,
    pub selections: Arc<SqliteSelectionRepository>,
    pub telemetry: Arc<SqliteTelemetryRepository>,
    pub runtime: RuntimeParameters,
    pub counters: Arc<SessionCounters>,
    pub engine: RecommendationEngine,
}

/// Seed the tool catalog and tunable parameters. Existing rows are kept.
pub async fn seed(pool: &SqlitePool, config: &Config) -> Result<(usize, usize)> {
    let tools = SqliteToolStatsRepository::new(pool.clone())
        .seed(TOOL_CATALOG)
        .await
        .context("Failed to seed tool statistics")?;
    let params = SqliteParameterRepository::new(pool.clone())
        .seed(&seed_parameters(config))
        .await
        .context("Failed to seed parameters")?;
    Ok((tools, params))
}

impl EngineContext {
    /// Open the database, seed missing rows, load runtime parameters and
    /// warm-start the predictor from stored outcomes.
    pub async fn build(config: Config) -> Result<Self> {
        let pool = initialize_database(&config.database)
            .await
            .context("Failed to initialize database. Run 'autoresolve init' first.")?;
        Self::from_pool(config, pool).await
    }

    pub async fn from_pool(config: Config, pool: SqlitePool) -> Result<Self> {
        seed(&pool, &config).await?;

        let patterns = Arc::new(SqlitePatternRepository::new(pool.clone()));
        let tool_stats = Arc::new(SqliteToolStatsRepository::new(pool.clone()));
        let parameters = Arc::new(SqliteParameterRepository::new(pool.clone()));
        let selections = Arc::new(SqliteSelectionRepository::new(pool.clone()));
        let telemetry = Arc::new(SqliteTelemetryRepository::new(pool.clone()));

        let runtime = RuntimeParameters::load(parameters.as_ref())
            .await
            .context("Failed to load runtime parameters")?;
        let counters = Arc::new(SessionCounters::new());

        let vectorizer = FeatureVectorizer::new();
        let predictor = Arc::new(Predictor::new(&config.learning, vectorizer.tool_vocabulary()));
        let engine = RecommendationEngine::new(
            vectorizer,
            SimilarityRetriever::new(patterns.clone(), &config.retrieval),
            predictor,
            ToolSelector::new(tool_stats.clone(), selections.clone(), config.selector.clone()),
            patterns.clone(),
            runtime.clone(),
            counters.clone(),
        );

        let replayed = engine
            .warm_start(config.learning.warm_start_limit)
            .await
            .context("Failed to warm-start predictor")?;
        debug!(replayed, "Engine context ready");

        Ok(Self {
            config,
            pool,
            patterns,
            tool_stats,
            parameters,
            selections,
            telemetry,
            runtime,
            counters,
            engine,
        })
    }

    /// Host metrics, outcome rates read back from the shared store, and this
    /// process's open sessions.
    pub fn telemetry_source(&self) -> Arc<dyn TelemetrySource> {
        let window = chrono::Duration::seconds(self.config.optimizer.interval_secs as i64);
        let outcomes = OutcomeTelemetrySource::new(self.patterns.clone(), window);

        Arc::new(
            CompositeTelemetrySource::new()
                .with_source("system", Arc::new(SystemTelemetrySource::new()))
                .with_source("outcomes", Arc::new(outcomes))
                .with_source("sessions", self.counters.clone()),
        )
    }

    pub fn optimizer(&self) -> Optimizer {
        Optimizer::new(
            self.telemetry_source(),
            self.telemetry.clone(),
            self.parameters.clone(),
            self.patterns.clone(),
            self.tool_stats.clone(),
            self.runtime.clone(),
            self.config.optimizer.clone(),
        )
    }
}
