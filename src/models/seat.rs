use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "seat_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SeatStatus {
    Available,
    Locked,
    Booked,
    Sold,
}

/// Место на событии. `version` меняется при каждой записи и служит
/// ключом compare-and-swap для блокировки.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub event_id: Uuid,
    pub tier_id: Uuid,
    pub section: String,
    pub row_number: String,
    pub seat_number: String,
    pub status: SeatStatus,
    pub version: i32,
    pub locked_by_booking_id: Option<Uuid>,
    pub locked_at: Option<DateTime<Utc>>,
}

impl Seat {
    /// Свободное место с версией 1, как его создаёт настройка события
    pub fn available(
        event_id: Uuid,
        tier_id: Uuid,
        section: impl Into<String>,
        row_number: impl Into<String>,
        seat_number: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            tier_id,
            section: section.into(),
            row_number: row_number.into(),
            seat_number: seat_number.into(),
            status: SeatStatus::Available,
            version: 1,
            locked_by_booking_id: None,
            locked_at: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }

    pub fn is_locked_by(&self, booking_id: Uuid) -> bool {
        self.status == SeatStatus::Locked && self.locked_by_booking_id == Some(booking_id)
    }
}

/// Место, освобождённое фоновой очисткой (нужен event_id для инвалидации кеша)
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct ReleasedSeat {
    pub seat_id: Uuid,
    pub event_id: Uuid,
}
