//! Client trait definition
//!
//! This module defines the `Client` trait that abstracts over different client implementations.

use serde_json::Value;

use super::ClientError;
use crate::models::{ScoredTask, Strategy, Suggestion, Weights};

/// Trait defining the API client interface for the taskrank service
#[async_trait::async_trait]
pub trait Client: Send + Sync {
    /// Rank every task, highest score first
    ///
    /// `weights` overrides the weights the service was configured with.
    async fn analyze(
        &self,
        tasks: Vec<Value>,
        weights: Option<Weights>,
    ) -> Result<Vec<ScoredTask>, ClientError>;

    /// Get the top three suggestions under a strategy
    async fn suggest(
        &self,
        tasks: Vec<Value>,
        strategy: Strategy,
    ) -> Result<Vec<Suggestion>, ClientError>;
}
