//! HTTP client implementation
//!
//! Talks to a running taskrank server.

use std::sync::Arc;

use reqwest::{Client as ReqwestClient, Error as ReqwestError, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Client;
use crate::models::{ScoredTask, ScoringError, Strategy, Suggestion, Weights};

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] ReqwestError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("validation failed: {0}")]
    Validation(Value),

    /// The path is empty when the server only reported the error code
    #[error("{}", describe_cycle(.0))]
    CircularDependency(Vec<String>),

    #[error("Missing data in response")]
    MissingData,
}

fn describe_cycle(path: &[String]) -> String {
    if path.is_empty() {
        "circular dependency detected".to_string()
    } else {
        format!("circular dependency detected: {}", path.join(" -> "))
    }
}

impl From<ScoringError> for ClientError {
    fn from(error: ScoringError) -> Self {
        match error {
            ScoringError::CircularDependency(path) => ClientError::CircularDependency(path),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    details: Option<Value>,
}

impl From<ErrorResponse> for ClientError {
    fn from(response: ErrorResponse) -> Self {
        match response.error.as_str() {
            "circular_dependency_detected" => ClientError::CircularDependency(Vec::new()),
            "validation_failed" => {
                ClientError::Validation(response.details.unwrap_or(Value::Null))
            }
            _ => match response.details {
                Some(details) => ClientError::Api(format!("{} ({})", response.error, details)),
                None => ClientError::Api(response.error),
            },
        }
    }
}

/// HTTP client for the taskrank service
#[derive(Debug, Clone)]
pub struct HttpClientImpl {
    http_client: Arc<ReqwestClient>,
    config: ClientConfig,
}

impl HttpClientImpl {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http_client: Arc::new(ReqwestClient::new()),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Decodes a success body, or turns an error body into a `ClientError`
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            return Ok(serde_json::from_slice(&bytes)?);
        }

        match serde_json::from_slice::<ErrorResponse>(&bytes) {
            Ok(error) => Err(error.into()),
            Err(_) => Err(ClientError::Api(format!(
                "HTTP {}: {}",
                status,
                String::from_utf8_lossy(&bytes)
            ))),
        }
    }
}

impl Default for HttpClientImpl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Client for HttpClientImpl {
    async fn analyze(
        &self,
        tasks: Vec<Value>,
        weights: Option<Weights>,
    ) -> Result<Vec<ScoredTask>, ClientError> {
        #[derive(Serialize)]
        struct AnalyzeRequest {
            tasks: Vec<Value>,
            #[serde(skip_serializing_if = "Option::is_none")]
            weights: Option<Weights>,
        }

        #[derive(Deserialize)]
        struct AnalyzeResponse {
            tasks: Vec<ScoredTask>,
        }

        let request = AnalyzeRequest { tasks, weights };
        let response = self
            .http_client
            .post(self.url("/api/tasks/analyze"))
            .json(&request)
            .send()
            .await?;

        let body: AnalyzeResponse = Self::decode(response).await?;
        Ok(body.tasks)
    }

    async fn suggest(
        &self,
        tasks: Vec<Value>,
        strategy: Strategy,
    ) -> Result<Vec<Suggestion>, ClientError> {
        #[derive(Deserialize)]
        struct SuggestResponse {
            suggestions: Vec<Suggestion>,
        }

        let encoded = serde_json::to_string(&tasks)?;
        let response = self
            .http_client
            .get(self.url("/api/tasks/suggest"))
            .query(&[("tasks", encoded.as_str()), ("strategy", strategy.as_str())])
            .send()
            .await?;

        let body: SuggestResponse = Self::decode(response).await?;
        Ok(body.suggestions)
    }
}
