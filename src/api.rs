//! HTTP surface for Drill Bot.
//!
//! This module exposes a compact Axum router over the indicator registry:
//!
//! - `POST /drill-bot/start` – Start all three indicators with their fixed bulk speeds.
//! - `POST /drill-bot/stop` – Stop all three indicators and wait for their blink loops to exit.
//! - `GET /drill-bot/indicators` – Snapshot of every indicator.
//! - `GET /drill-bot/indicators/:index` – Snapshot of one indicator.
//! - `GET /drill-bot/indicators/:index/identifier` – Output identifier (pin) of one indicator.
//! - `PUT /drill-bot/indicators/:index/status` – Move one indicator to `offline`/`idle`/`busy`.
//! - `GET /metrics` – Blink and status counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//! - `GET /nyi` – Placeholder endpoint.

use crate::indicator::{IndicatorError, IndicatorSnapshot, Status};
use crate::metrics::MetricsSnapshot;
use crate::registry::{BulkConfirmation, IndicatorRegistry};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the indicator API surface.
pub fn create_router(registry: Arc<IndicatorRegistry>) -> Router {
    Router::new()
        .route("/drill-bot/start", post(start_all_indicators))
        .route("/drill-bot/stop", post(stop_all_indicators))
        .route("/drill-bot/indicators", get(list_indicators))
        .route("/drill-bot/indicators/:index", get(get_indicator))
        .route(
            "/drill-bot/indicators/:index/identifier",
            get(get_indicator_identifier),
        )
        .route("/drill-bot/indicators/:index/status", put(set_status))
        .route("/metrics", get(get_metrics))
        .route("/commands", get(get_commands))
        .route("/nyi", get(nyi))
        .with_state(registry)
}

/// Start all indicators with their fixed speeds (red=1, yellow=0.75, green=0.5).
async fn start_all_indicators(
    State(registry): State<Arc<IndicatorRegistry>>,
) -> Json<BulkConfirmation> {
    Json(registry.start_all().await)
}

/// Stop all indicators.
async fn stop_all_indicators(
    State(registry): State<Arc<IndicatorRegistry>>,
) -> Json<BulkConfirmation> {
    Json(registry.stop_all().await)
}

/// Response body for `GET /drill-bot/indicators`.
#[derive(Serialize)]
struct IndicatorsResponse {
    indicators: Vec<IndicatorSnapshot>,
}

async fn list_indicators(
    State(registry): State<Arc<IndicatorRegistry>>,
) -> Json<IndicatorsResponse> {
    Json(IndicatorsResponse {
        indicators: registry.snapshot().await,
    })
}

async fn get_indicator(
    State(registry): State<Arc<IndicatorRegistry>>,
    Path(index): Path<usize>,
) -> Result<Json<IndicatorSnapshot>, AppError> {
    let bot = registry.get(index).ok_or(AppError::NotFound(index))?;
    Ok(Json(bot.snapshot(index).await))
}

/// Response body for `GET /drill-bot/indicators/:index/identifier`.
#[derive(Serialize)]
struct IdentifierResponse {
    index: usize,
    identifier: u8,
}

async fn get_indicator_identifier(
    State(registry): State<Arc<IndicatorRegistry>>,
    Path(index): Path<usize>,
) -> Result<Json<IdentifierResponse>, AppError> {
    let identifier = registry
        .identifier(index)
        .ok_or(AppError::NotFound(index))?;
    Ok(Json(IdentifierResponse { index, identifier }))
}

/// Request body for `PUT /drill-bot/indicators/:index/status`.
#[derive(Deserialize)]
struct StatusRequest {
    /// Target status (`offline` | `idle` | `busy`).
    status: String,
}

/// Apply a status transition and return the resulting snapshot.
async fn set_status(
    State(registry): State<Arc<IndicatorRegistry>>,
    Path(index): Path<usize>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<IndicatorSnapshot>, AppError> {
    let bot = registry.get(index).ok_or(AppError::NotFound(index))?;
    let status: Status = request.status.parse()?;
    bot.apply(status).await;
    tracing::info!(index, %status, "Status request completed");
    Ok(Json(bot.snapshot(index).await))
}

async fn get_metrics(State(registry): State<Arc<IndicatorRegistry>>) -> Json<MetricsResponse> {
    let snapshot = registry.metrics().snapshot();
    Json(MetricsResponse {
        active_loops: snapshot.active_loops(),
        counters: snapshot,
    })
}

/// Response body for `GET /metrics`.
#[derive(Serialize)]
struct MetricsResponse {
    active_loops: u64,
    #[serde(flatten)]
    counters: MetricsSnapshot,
}

async fn nyi() -> Json<serde_json::Value> {
    Json(json!({ "output": "nyi" }))
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "start_all",
                method: "POST",
                path: "/drill-bot/start",
                description: "Start blinking every indicator (red=1s, yellow=0.75s, green=0.5s). Response returns { \"status\": \"started\" }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "stop_all",
                method: "POST",
                path: "/drill-bot/stop",
                description: "Stop every indicator; returns once all lights are off.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list_indicators",
                method: "GET",
                path: "/drill-bot/indicators",
                description: "Return color, identifier, status, and blink state for each indicator.",
                request_example: None,
            },
            CommandDescriptor {
                name: "get_identifier",
                method: "GET",
                path: "/drill-bot/indicators/{index}/identifier",
                description: "Return the output identifier (pin) wired to one indicator.",
                request_example: None,
            },
            CommandDescriptor {
                name: "set_status",
                method: "PUT",
                path: "/drill-bot/indicators/{index}/status",
                description: "Move one indicator to offline, idle (slow blink), or busy (fast blink).",
                request_example: Some(json!({ "status": "busy" })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return blink loop and status transition counters.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    NotFound(usize),
    Indicator(IndicatorError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(index) => (
                StatusCode::NOT_FOUND,
                format!("No indicator at index {index}"),
            )
                .into_response(),
            AppError::Indicator(err @ IndicatorError::InvalidArgument(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()).into_response()
            }
            AppError::Indicator(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

impl From<IndicatorError> for AppError {
    fn from(inner: IndicatorError) -> Self {
        Self::Indicator(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::indicator::SimulatedOutput;
    use crate::metrics::IndicatorMetrics;
    use crate::registry::IndicatorRegistry;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<IndicatorRegistry>) {
        let registry = Arc::new(
            IndicatorRegistry::new(
                Arc::new(SimulatedOutput::new()),
                Arc::new(IndicatorMetrics::new()),
            )
            .expect("registry"),
        );
        (create_router(registry.clone()), registry)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = app.clone().oneshot(request).await.expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn commands_catalog_exposes_bulk_endpoints() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let start = commands
            .iter()
            .find(|cmd| cmd.name == "start_all")
            .expect("start command present");

        assert_eq!(start.method, "POST");
        assert_eq!(start.path, "/drill-bot/start");
        assert!(commands.iter().any(|cmd| cmd.name == "stop_all"));
    }

    #[tokio::test]
    async fn bulk_start_and_stop_round_trip() {
        let (app, registry) = app();

        let (status, body) = send(&app, Method::POST, "/drill-bot/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "started");
        assert!(
            registry
                .indicators()
                .iter()
                .all(|bot| bot.indicator().is_running())
        );

        let (_, listing) = send(&app, Method::GET, "/drill-bot/indicators", None).await;
        let speeds: Vec<f64> = listing["indicators"]
            .as_array()
            .expect("indicator list")
            .iter()
            .map(|entry| entry["speed"].as_f64().expect("speed"))
            .collect();
        assert_eq!(speeds, vec![1.0, 0.75, 0.5]);

        let (status, body) = send(&app, Method::POST, "/drill-bot/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "stopped");
        assert!(
            registry
                .indicators()
                .iter()
                .all(|bot| !bot.indicator().is_running())
        );
    }

    #[tokio::test]
    async fn identifier_route_reports_pins() {
        let (app, _) = app();
        let (status, body) =
            send(&app, Method::GET, "/drill-bot/indicators/1/identifier", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["identifier"], 27);

        let (status, _) =
            send(&app, Method::GET, "/drill-bot/indicators/3/identifier", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_route_applies_transition() {
        let (app, registry) = app();
        let (status, body) = send(
            &app,
            Method::PUT,
            "/drill-bot/indicators/0/status",
            Some(json!({ "status": "busy" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "busy");
        assert_eq!(body["color"], "red");
        assert_eq!(body["running"], true);

        let (status, _) = send(
            &app,
            Method::PUT,
            "/drill-bot/indicators/0/status",
            Some(json!({ "status": "asleep" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        registry.shutdown().await.expect("shutdown");
    }

    #[tokio::test]
    async fn metrics_route_counts_loops() {
        let (app, _) = app();
        send(&app, Method::POST, "/drill-bot/start", None).await;
        let (_, body) = send(&app, Method::GET, "/metrics", None).await;
        assert_eq!(body["loops_started"], 3);
        assert_eq!(body["active_loops"], 3);

        send(&app, Method::POST, "/drill-bot/stop", None).await;
        let (_, body) = send(&app, Method::GET, "/metrics", None).await;
        assert_eq!(body["active_loops"], 0);
    }

    #[tokio::test]
    async fn placeholder_route_answers() {
        let (app, _) = app();
        let (status, body) = send(&app, Method::GET, "/nyi", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"], "nyi");
    }
}
