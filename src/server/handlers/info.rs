use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::server::state::ServerState;

pub(crate) async fn info(State(state): State<ServerState>) -> impl IntoResponse {
  Json(state.gateway.info())
}
