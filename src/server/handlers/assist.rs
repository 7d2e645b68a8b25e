use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::server::state::ServerState;

#[derive(Debug, Deserialize)]
pub(crate) struct CompleteRequest {
  #[serde(default)]
  code: String,
  #[serde(default = "default_language")]
  language: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExplainRequest {
  #[serde(default)]
  code: String,
}

fn default_language() -> String {
  "javascript".into()
}

pub(crate) async fn complete(
  State(state): State<ServerState>,
  Json(request): Json<CompleteRequest>,
) -> impl IntoResponse {
  match state.assistant.complete(&request.code, &request.language).await {
    Ok(completion) => (StatusCode::OK, Json(json!({ "success": true, "completion": completion }))),
    Err(e) => failure("completion", e),
  }
}

pub(crate) async fn explain(
  State(state): State<ServerState>,
  Json(request): Json<ExplainRequest>,
) -> impl IntoResponse {
  match state.assistant.explain(&request.code).await {
    Ok(explanation) => {
      (StatusCode::OK, Json(json!({ "success": true, "explanation": explanation })))
    }
    Err(e) => failure("explanation", e),
  }
}

fn failure(kind: &str, e: anyhow::Error) -> (StatusCode, Json<serde_json::Value>) {
  error!("{kind} failed: {e:#}");
  (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "success": false, "error": format!("{e:#}") })))
}
