use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::controllers::{error_body, reservation_error, ApiError};
use crate::error::StoreError;
use crate::services::ReserveRequest;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/{id}", get(get_booking))
        .route("/stats", get(get_stats))
}

// POST /api/bookings
async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReserveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(e) = req.validate() {
        return Err(error_body(StatusCode::BAD_REQUEST, e.to_string()));
    }

    let summary = state
        .reservations
        .reserve(req)
        .await
        .map_err(|e| reservation_error(&e))?;

    Ok((StatusCode::CREATED, Json(summary)))
}

// GET /api/bookings/{id}
async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    match state.bookings.get_by_id(booking_id).await {
        Ok(booking) => Ok((StatusCode::OK, Json(booking))),
        Err(StoreError::NotFound { .. }) => {
            Err(error_body(StatusCode::NOT_FOUND, "booking not found"))
        }
        Err(e) => {
            tracing::error!(%booking_id, error = %e, "get_booking failed");
            Err(error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error"))
        }
    }
}

// GET /api/stats
async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.reservations.stats())
}
