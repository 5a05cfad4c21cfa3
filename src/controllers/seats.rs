use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::load_available_seats;
use crate::controllers::{error_body, ApiError};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/seats", get(get_seats))
}

#[derive(Debug, Deserialize)]
struct SeatsQuery {
    event_id: Uuid,
}

// GET /api/seats?event_id=...
async fn get_seats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SeatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let seats = load_available_seats(state.cache.as_ref(), state.seats.as_ref(), params.event_id)
        .await
        .map_err(|e| {
            tracing::error!(event_id = %params.event_id, error = %e, "get_seats failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })?;

    Ok((StatusCode::OK, Json(seats)))
}
