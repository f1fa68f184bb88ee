//! HTTP service for agentready
//!
//! Routes:
//! - `POST /api/assess` with `{"inputUrl": ..., "inputType"?: ..., "legacy"?: bool}`
//! - `GET /health`

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use agentready_core::{
    AssessError, AssessmentInput, InputType, ScoringEngine, convert_to_legacy_format,
};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScoringEngine>,
}

impl AppState {
    pub fn new(engine: ScoringEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessRequest {
    pub input_url: String,
    /// Inferred from the URL when absent
    #[serde(default)]
    pub input_type: Option<InputType>,
    #[serde(default)]
    pub legacy: bool,
}

/// Assessment failure rendered as `{"error", "kind"}` with the mapped status
#[derive(Debug)]
pub struct ApiError(pub AssessError);

impl From<AssessError> for ApiError {
    fn from(err: AssessError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "assessment request failed");
        } else {
            warn!(error = %self.0, status = status.as_u16(), "assessment request rejected");
        }

        let body = json!({
            "error": self.0.to_string(),
            "kind": self.0.kind().code(),
        });
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/assess", post(assess_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn assess_handler(
    State(state): State<AppState>,
    payload: Result<Json<AssessRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError(AssessError::Validation(rejection.body_text()))
    })?;

    let input = match request.input_type {
        Some(input_type) => AssessmentInput::new(input_type, &request.input_url)?,
        None => AssessmentInput::infer(&request.input_url)?,
    };

    let result = state.engine.assess(&input).await?;
    info!(
        url = %result.url,
        overall = result.scores.overall.value,
        fallback = result.metadata.fallback_used,
        "assessment served"
    );

    let response = if request.legacy {
        Json(convert_to_legacy_format(&result)).into_response()
    } else {
        Json(result).into_response()
    };
    Ok(response)
}
