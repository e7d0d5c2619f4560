//! Core client implementation
//!
//! This module provides a client implementation that wraps Core directly,
//! providing the same interface as HttpClientImpl but without HTTP overhead.

use serde_json::Value;

use super::{Client, ClientError};
use crate::models::{RawTask, ScoredTask, Strategy, Suggestion, Weights};
use crate::validation::validate_tasks;
use crate::Core;

/// A client implementation that wraps Core directly
#[derive(Debug, Clone)]
pub struct CoreClient {
    core: Core,
}

impl CoreClient {
    /// Create a new CoreClient with the given Core instance
    pub fn new(core: Core) -> Self {
        Self { core }
    }
}

#[async_trait::async_trait]
impl Client for CoreClient {
    async fn analyze(
        &self,
        tasks: Vec<Value>,
        weights: Option<Weights>,
    ) -> Result<Vec<ScoredTask>, ClientError> {
        if let Some(weights) = &weights {
            weights
                .validate()
                .map_err(|e| ClientError::Validation(Value::String(e.to_string())))?;
        }

        // Same validation pass the HTTP server applies
        let tasks = match validate_tasks(&tasks) {
            Ok(tasks) => tasks,
            Err(failures) => return Err(ClientError::Validation(serde_json::to_value(failures)?)),
        };

        Ok(self.core.analyze(&tasks, weights)?)
    }

    async fn suggest(
        &self,
        tasks: Vec<Value>,
        strategy: Strategy,
    ) -> Result<Vec<Suggestion>, ClientError> {
        let tasks = tasks
            .into_iter()
            .map(RawTask::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ClientError::Api("invalid_tasks_json".to_string()))?;

        Ok(self.core.suggest(&tasks, strategy)?)
    }
}
