//! Shared flat map of the current tunable parameter values.
//!
//! The optimizer writes; selection, retrieval and learning read on every
//! invocation, so an applied adjustment is visible to the next request.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::optimization::keys;
use crate::domain::models::{default_parameters, Config, OptimizationParameter};
use crate::domain::ports::ParameterRepository;

#[derive(Debug, Clone, Default)]
pub struct RuntimeParameters {
    values: Arc<RwLock<HashMap<String, f64>>>,
}

impl RuntimeParameters {
    pub fn from_parameters(parameters: &[OptimizationParameter]) -> Self {
        let values = parameters
            .iter()
            .map(|p| (p.key(), p.current_value))
            .collect();
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }

    /// Load current values from the parameter table.
    pub async fn load(repo: &dyn ParameterRepository) -> DomainResult<Self> {
        let parameters = repo.list().await?;
        Ok(Self::from_parameters(&parameters))
    }

    pub async fn get(&self, key: &str) -> Option<f64> {
        self.values.read().await.get(key).copied()
    }

    pub async fn get_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).await.unwrap_or(default)
    }

    pub async fn set(&self, key: &str, value: f64) {
        self.values.write().await.insert(key.to_string(), value);
    }

    pub async fn snapshot(&self) -> BTreeMap<String, f64> {
        self.values
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

/// Factory parameters with the configured starting values applied.
///
/// Only affects parameters that do not exist yet; seeding never overwrites
/// values the optimizer has already tuned.
pub fn seed_parameters(config: &Config) -> Vec<OptimizationParameter> {
    let overrides: [(&str, f64); 3] = [
        (keys::LEARNING_RATE, config.learning.learning_rate),
        (keys::SIMILARITY_THRESHOLD, config.retrieval.similarity_threshold),
        (keys::CONFIDENCE_THRESHOLD, config.retrieval.confidence_threshold),
    ];

    default_parameters()
        .into_iter()
        .map(|mut p| {
            let key = p.key();
            if let Some((_, value)) = overrides.iter().find(|(k, _)| *k == key) {
                p.current_value = p.clamp(*value);
                p.optimal = p.current_value;
            }
            p
        })
        .collect()
}
