use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    // Позиции грузятся отдельным запросом
    #[sqlx(skip)]
    pub items: Vec<BookingItem>,
}

/// Позиция брони: цена фиксируется в момент резервирования
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct BookingItem {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub seat_id: Uuid,
    pub price_at_booking: f64,
}

impl BookingItem {
    pub fn new(booking_id: Uuid, seat_id: Uuid, price_at_booking: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            seat_id,
            price_at_booking,
        }
    }
}

impl Booking {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending && self.expires_at < now
    }

    pub fn seat_ids(&self) -> Vec<Uuid> {
        self.items.iter().map(|item| item.seat_id).collect()
    }
}

/// Ответ на успешное резервирование
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSummary {
    pub booking_id: Uuid,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub expires_at: DateTime<Utc>,
}

impl From<&Booking> for BookingSummary {
    fn from(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id,
            total_amount: booking.total_amount,
            status: booking.status,
            expires_at: booking.expires_at,
        }
    }
}

/// Результат отмены просроченной брони
#[derive(Debug, Clone, PartialEq)]
pub struct CancelOutcome {
    pub booking_id: Uuid,
    pub event_id: Uuid,
    pub released_seats: Vec<Uuid>,
}
