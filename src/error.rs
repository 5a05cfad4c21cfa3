use thiserror::Error;
use uuid::Uuid;

/// Ошибки слоя хранения (Postgres или in-memory)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("optimistic lock failed: seat {seat_id} was modified by another transaction")]
    Conflict { seat_id: Uuid },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn seat_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "seat", id }
    }

    pub fn booking_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "booking", id }
    }
}

/// Ошибки кеша никогда не доходят до клиента, только логируются
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache payload error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Класс ошибки, который видит вызывающая сторона
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadInput,
    Conflict,
    Internal,
}

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("invalid {0}")]
    InvalidInput(String),

    #[error("seat not found: {0}")]
    SeatNotFound(Uuid),

    #[error("seat {0} is not available")]
    SeatUnavailable(Uuid),

    #[error("seat {seat_id} does not belong to event {event_id}")]
    WrongEvent { seat_id: Uuid, event_id: Uuid },

    #[error("failed to lock seat {0}: maybe taken by another user")]
    Conflict(Uuid),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ReservationError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidInput(_) => ErrorClass::BadInput,
            Self::SeatNotFound(_)
            | Self::SeatUnavailable(_)
            | Self::WrongEvent { .. }
            | Self::Conflict(_) => ErrorClass::Conflict,
            Self::Internal(_) => ErrorClass::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors_for_the_caller() {
        let id = Uuid::new_v4();
        assert_eq!(
            ReservationError::InvalidInput("user id".into()).class(),
            ErrorClass::BadInput
        );
        assert_eq!(ReservationError::SeatNotFound(id).class(), ErrorClass::Conflict);
        assert_eq!(ReservationError::Conflict(id).class(), ErrorClass::Conflict);
        assert_eq!(
            ReservationError::Internal("db down".into()).class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn invalid_input_message_names_the_field() {
        let err = ReservationError::InvalidInput("event id".into());
        assert_eq!(err.to_string(), "invalid event id");
    }
}
