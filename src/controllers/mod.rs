pub mod bookings;
pub mod seats;

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::{ErrorClass, ReservationError};
use crate::AppState;

pub type ApiError = (StatusCode, Json<Value>);

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(bookings::routes())
        .merge(seats::routes())
}

/// Полное приложение: служебные маршруты и /api
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Seat Reservation API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// Внутренние ошибки отдаём без подробностей, они уже в логах
pub fn reservation_error(err: &ReservationError) -> ApiError {
    match err.class() {
        ErrorClass::BadInput => error_body(StatusCode::BAD_REQUEST, err.to_string()),
        ErrorClass::Conflict => error_body(StatusCode::CONFLICT, err.to_string()),
        ErrorClass::Internal => {
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}
