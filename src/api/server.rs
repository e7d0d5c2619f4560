//! API Server module
//!
//! This module provides the HTTP API server functionality for the taskrank tool.

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::models::{RawTask, ScoredTask, ScoringError, Strategy, Suggestion};
use crate::validation::{validate_tasks, validate_weights, ItemErrors};
use crate::Core;

pub const MISSING_TASKS_MESSAGE: &str = "Missing 'tasks' list in body.";
pub const NO_TASKS_MESSAGE: &str =
    "Provide tasks via query string param 'tasks' (JSON array). Example: ?tasks=[{...}]";

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddr,
    /// Largest batch a single request may submit
    pub max_tasks: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 3000).into(),
            max_tasks: 500,
        }
    }
}

#[derive(Clone)]
struct AppState {
    core: Core,
    max_tasks: usize,
}

/// Query parameters of the suggest endpoint.
///
/// `data` is accepted as an older spelling of `tasks`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SuggestQuery {
    pub tasks: Option<String>,
    pub data: Option<String>,
    pub strategy: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub tasks: Vec<ScoredTask>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<Suggestion>,
}

/// Body of every non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Everything a request can fail with, before or inside the core
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request body is not JSON: {0}")]
    InvalidBody(#[from] JsonRejection),

    #[error("request body has no 'tasks' list")]
    MissingTasks,

    #[error("no tasks were supplied")]
    NoTasksSupplied,

    #[error("tasks parameter is not a JSON array of objects")]
    InvalidTasksJson,

    #[error("batch of {received} tasks exceeds the limit of {max}")]
    TooManyTasks { max: usize, received: usize },

    #[error("{} task(s) failed validation", .0.len())]
    Validation(Vec<ItemErrors>),

    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl ApiError {
    pub fn body(&self) -> ErrorBody {
        let (error, details) = match self {
            ApiError::InvalidBody(rejection) => (
                "invalid_json_body".to_string(),
                Some(Value::String(rejection.body_text())),
            ),
            ApiError::MissingTasks => (MISSING_TASKS_MESSAGE.to_string(), None),
            ApiError::NoTasksSupplied => (NO_TASKS_MESSAGE.to_string(), None),
            ApiError::InvalidTasksJson => ("invalid_tasks_json".to_string(), None),
            ApiError::TooManyTasks { max, received } => (
                "too_many_tasks".to_string(),
                Some(json!({ "max": max, "received": received })),
            ),
            ApiError::Validation(failures) => (
                "validation_failed".to_string(),
                Some(json!(failures)),
            ),
            ApiError::InvalidWeights(message) => (
                "validation_failed".to_string(),
                Some(json!([{ "field": "weights", "errors": [message] }])),
            ),
            ApiError::Scoring(e) => (e.code().to_string(), None),
        };
        ErrorBody { error, details }
    }

    /// 400 for everything except a body that was not sent as JSON
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(rejection) => rejection.status(),
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::info!(error = %self, "rejecting request");
        (self.status(), Json(self.body())).into_response()
    }
}

/// Builds the application router around a core
pub fn router(core: Core, config: &ServerConfig) -> Router {
    // The browser frontend is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState {
        core,
        max_tasks: config.max_tasks,
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/tasks/analyze", post(analyze_handler))
        .route("/api/tasks/suggest", get(suggest_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the API server
pub async fn serve(core: Core, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing; a subscriber may already be installed by the embedding program
    let _ = tracing_subscriber::fmt::try_init();

    let app = router(core.clone(), &config);

    tracing::info!(
        address = %config.address,
        max_tasks = config.max_tasks,
        weights = %core.weights(),
        "Starting server"
    );
    let listener = TcpListener::bind(config.address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn check_batch_size(received: usize, max: usize) -> Result<(), ApiError> {
    if received > max {
        return Err(ApiError::TooManyTasks { max, received });
    }
    Ok(())
}

async fn analyze_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(body) = body?;
    let items = body
        .get("tasks")
        .and_then(Value::as_array)
        .ok_or(ApiError::MissingTasks)?;
    check_batch_size(items.len(), state.max_tasks)?;

    let weights = validate_weights(body.get("weights")).map_err(ApiError::InvalidWeights)?;
    let tasks = validate_tasks(items).map_err(ApiError::Validation)?;

    let scored = state.core.analyze(&tasks, weights)?;
    Ok(Json(AnalyzeResponse { tasks: scored }))
}

async fn suggest_handler(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
    let raw = non_empty(query.tasks)
        .or_else(|| non_empty(query.data))
        .ok_or(ApiError::NoTasksSupplied)?;

    let tasks = parse_task_list(&raw)?;
    check_batch_size(tasks.len(), state.max_tasks)?;

    let strategy = resolve_strategy(query.strategy.as_deref());
    let suggestions = state.core.suggest(&tasks, strategy)?;
    Ok(Json(SuggestResponse { suggestions }))
}

/// Parses the JSON task list carried in the query string
fn parse_task_list(raw: &str) -> Result<Vec<RawTask>, ApiError> {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) else {
        return Err(ApiError::InvalidTasksJson);
    };
    items
        .into_iter()
        .map(|item| RawTask::try_from(item).map_err(|_| ApiError::InvalidTasksJson))
        .collect()
}

/// Unknown names fall back to the default strategy
fn resolve_strategy(name: Option<&str>) -> Strategy {
    match name.map(str::parse::<Strategy>) {
        None => Strategy::default(),
        Some(Ok(strategy)) => strategy,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "falling back to the default strategy");
            Strategy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*; // Import items from parent module (server)
    use crate::models::Weights;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{Duration, Local, NaiveDate};
    use http_body_util::BodyExt; // for `collect`
    use pretty_assertions::assert_eq;
    use tower::ServiceExt; // for `oneshot`

    fn setup_test_app() -> Router {
        router(Core::default(), &ServerConfig::default())
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn days_from_today(days: i64) -> String {
        (today() + Duration::days(days)).to_string()
    }

    // Minimal query-string encoding for test URIs
    fn encode(raw: &str) -> String {
        raw.bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    (b as char).to_string()
                }
                _ => format!("%{:02X}", b),
            })
            .collect()
    }

    // Helper to make requests and decode the JSON response body
    async fn request_json(app: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&body_bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&body_bytes).into_owned())
        });
        (status, value)
    }

    async fn analyze(app: &Router, body: Value) -> (StatusCode, Value) {
        request_json(app, "POST", "/api/tasks/analyze", Body::from(body.to_string())).await
    }

    async fn suggest(app: &Router, query: &str) -> (StatusCode, Value) {
        request_json(app, "GET", &format!("/api/tasks/suggest{}", query), Body::empty()).await
    }

    #[tokio::test]
    async fn test_health() {
        let app = setup_test_app();
        let (status, body) = request_json(&app, "GET", "/health", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!("ok"));
    }

    #[tokio::test]
    async fn test_analyze_ranks_overdue_first() {
        let app = setup_test_app();
        let body = json!({
            "tasks": [
                { "id": "1", "title": "Old task", "due_date": days_from_today(-3), "estimated_hours": 2, "importance": 5, "dependencies": [] },
                { "id": "2", "title": "Future task", "due_date": days_from_today(10), "estimated_hours": 1, "importance": 5, "dependencies": [] }
            ]
        });

        let (status, body) = analyze(&app, body).await;
        assert_eq!(status, StatusCode::OK);

        let ranked: AnalyzeResponse = serde_json::from_value(body).unwrap();
        assert_eq!(ranked.tasks.len(), 2);
        assert_eq!(ranked.tasks[0].task.id, "1");
        assert_eq!(ranked.tasks[0].explanation.len(), 5);
        assert_eq!(ranked.tasks[0].explanation[0], "urgency: 10.00 (overdue by 3 day(s))");
    }

    #[tokio::test]
    async fn test_analyze_defaults_missing_ids_to_position() {
        let app = setup_test_app();
        let (status, body) = analyze(&app, json!({ "tasks": [{ "title": "a" }, { "title": "b", "importance": 9 }] })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tasks"][0]["id"], json!("1"));
        assert_eq!(body["tasks"][1]["id"], json!("0"));
        assert_eq!(body["tasks"][1]["due_date"], Value::Null);
    }

    #[tokio::test]
    async fn test_analyze_malformed_body_is_structured() {
        let app = setup_test_app();
        let (status, body) =
            request_json(&app, "POST", "/api/tasks/analyze", Body::from("{\"tasks\": [")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("invalid_json_body"));
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_analyze_wrong_content_type_is_structured() {
        let app = setup_test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tasks/analyze")
                    .header("Content-Type", "text/plain")
                    .body(Body::from(json!({ "tasks": [] }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], json!("invalid_json_body"));
    }

    #[tokio::test]
    async fn test_analyze_missing_tasks() {
        let app = setup_test_app();
        let (status, body) = analyze(&app, json!({ "items": [] })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": MISSING_TASKS_MESSAGE }));
    }

    #[tokio::test]
    async fn test_analyze_validation_failed() {
        let app = setup_test_app();
        let body = json!({
            "tasks": [
                { "title": "fine" },
                { "title": "bad", "importance": 42 },
                { "due_date": "not-a-date" }
            ]
        });

        let (status, body) = analyze(&app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("validation_failed"));

        let details = body["details"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0]["index"], json!(1));
        assert_eq!(
            details[0]["errors"]["importance"],
            json!(["Ensure this value is less than or equal to 10."])
        );
        assert_eq!(details[1]["index"], json!(2));
        assert_eq!(details[1]["errors"]["title"], json!(["This field is required."]));
        assert!(details[1]["errors"]["due_date"].is_array());
    }

    #[tokio::test]
    async fn test_analyze_circular_dependency() {
        let app = setup_test_app();
        let body = json!({
            "tasks": [
                { "id": "A", "title": "A", "dependencies": ["B"] },
                { "id": "B", "title": "B", "dependencies": ["C"] },
                { "id": "C", "title": "C", "dependencies": ["A"] }
            ]
        });

        let (status, body) = analyze(&app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "circular_dependency_detected" }));
    }

    #[tokio::test]
    async fn test_analyze_with_request_weights() {
        let app = setup_test_app();
        let body = json!({
            "tasks": [
                { "id": "big", "title": "Big", "estimated_hours": 12, "importance": 10 },
                { "id": "small", "title": "Small", "estimated_hours": 0.5, "importance": 1 }
            ],
            "weights": { "urgency": 0, "importance": 0, "effort": 1, "dependency": 0 }
        });

        let (status, body) = analyze(&app, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tasks"][0]["id"], json!("small"));
        assert_eq!(
            body["tasks"][0]["explanation"][4],
            json!("weights: urgency=0, importance=0, effort=1, dependency=0")
        );
    }

    #[tokio::test]
    async fn test_analyze_rejects_invalid_weights() {
        let app = setup_test_app();
        let body = json!({
            "tasks": [{ "title": "t" }],
            "weights": { "urgency": -1, "importance": 0, "effort": 1, "dependency": 0 }
        });

        let (status, body) = analyze(&app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("validation_failed"));
        assert_eq!(body["details"][0]["field"], json!("weights"));
    }

    #[tokio::test]
    async fn test_analyze_enforces_batch_limit() {
        let config = ServerConfig {
            max_tasks: 2,
            ..ServerConfig::default()
        };
        let app = router(Core::default(), &config);
        let body = json!({ "tasks": [{ "title": "a" }, { "title": "b" }, { "title": "c" }] });

        let (status, body) = analyze(&app, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "error": "too_many_tasks", "details": { "max": 2, "received": 3 } })
        );
    }

    #[tokio::test]
    async fn test_analyze_uses_configured_weights() {
        let core = Core::new(Weights::new(0.0, 1.0, 0.0, 0.0).unwrap()).unwrap();
        let app = router(core, &ServerConfig::default());
        let body = json!({
            "tasks": [
                { "id": "quick", "title": "Quick", "estimated_hours": 0.1, "importance": 2 },
                { "id": "vital", "title": "Vital", "estimated_hours": 40, "importance": 9 }
            ]
        });

        let (_, body) = analyze(&app, body).await;
        assert_eq!(body["tasks"][0]["id"], json!("vital"));
        assert_eq!(body["tasks"][0]["score"], json!(9.0));
    }

    #[tokio::test]
    async fn test_suggest_top_three() {
        let app = setup_test_app();
        let tasks = json!([
            { "id": "a", "title": "A", "importance": 1 },
            { "id": "b", "title": "B", "importance": 9 },
            { "id": "c", "title": "C", "importance": 5, "due_date": days_from_today(-1) },
            { "id": "d", "title": "D", "importance": 7 }
        ]);

        let (status, body) = suggest(&app, &format!("?tasks={}", encode(&tasks.to_string()))).await;
        assert_eq!(status, StatusCode::OK);

        let response: SuggestResponse = serde_json::from_value(body).unwrap();
        let ids: Vec<_> = response.suggestions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "d"]);
        assert_eq!(
            response.suggestions[0].reason_summary,
            "urgency: 10.00 (overdue by 1 day(s)); importance: 5.00 (importance 5/10)"
        );
    }

    #[tokio::test]
    async fn test_suggest_accepts_data_param_and_strategy() {
        let app = setup_test_app();
        let tasks = json!([
            { "id": "long", "title": "Long", "importance": 10, "estimated_hours": 30 },
            { "id": "short", "title": "Short", "importance": 1, "estimated_hours": 0.2 }
        ]);
        let query = format!("?data={}&strategy=fastest", encode(&tasks.to_string()));

        let (status, body) = suggest(&app, &query).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["suggestions"][0]["id"], json!("short"));
    }

    #[tokio::test]
    async fn test_suggest_unknown_strategy_falls_back() {
        let app = setup_test_app();
        let tasks = json!([{ "id": "only", "title": "Only" }]);
        let query = format!("?tasks={}&strategy=coinflip", encode(&tasks.to_string()));

        let (status, body) = suggest(&app, &query).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["suggestions"][0]["id"], json!("only"));
    }

    #[tokio::test]
    async fn test_suggest_without_tasks() {
        let app = setup_test_app();
        let (status, body) = suggest(&app, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": NO_TASKS_MESSAGE }));
    }

    #[tokio::test]
    async fn test_suggest_invalid_json() {
        let app = setup_test_app();
        for payload in ["[{oops", "{\"id\": 1}", "[1, 2]"] {
            let (status, body) = suggest(&app, &format!("?tasks={}", encode(payload))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "error": "invalid_tasks_json" }));
        }
    }

    #[tokio::test]
    async fn test_suggest_circular_dependency() {
        let app = setup_test_app();
        let tasks = json!([{ "id": "X", "dependencies": ["X"] }]);
        let (status, body) = suggest(&app, &format!("?tasks={}", encode(&tasks.to_string()))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "circular_dependency_detected" }));
    }

    #[tokio::test]
    async fn test_suggest_empty_list() {
        let app = setup_test_app();
        let (status, body) = suggest(&app, &format!("?tasks={}", encode("[]"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "suggestions": [] }));
    }
}
