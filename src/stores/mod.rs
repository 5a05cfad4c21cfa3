//! Хранилища мест и броней.
//!
//! Каждая операция трейта атомарна на уровне хранилища: `lock` это один
//! условный UPDATE, `create`, `cancel` и `release_orphaned_locks` это одна
//! транзакция. Оркестратор и фоновая очистка не держат никаких
//! внутрипроцессных блокировок и полагаются только на это.

use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Booking, BookingStatus, CancelOutcome, ReleasedSeat, Seat};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgBookingStore, PgSeatStore};

#[async_trait]
pub trait SeatStore: Send + Sync {
    async fn get_by_id(&self, seat_id: Uuid) -> Result<Seat, StoreError>;

    async fn get_available_by_event(&self, event_id: Uuid) -> Result<Vec<Seat>, StoreError>;

    /// AVAILABLE -> LOCKED только если версия совпадает с `expected_version`.
    /// Иначе `StoreError::Conflict`.
    async fn lock(
        &self,
        seat_id: Uuid,
        booking_id: Uuid,
        expected_version: i32,
    ) -> Result<(), StoreError>;

    /// LOCKED -> AVAILABLE без проверки версии. Для уже свободного места ничего не делает.
    async fn unlock(&self, seat_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Шапка брони и все позиции в одной транзакции
    async fn create(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn update_status(&self, booking_id: Uuid, status: BookingStatus)
        -> Result<(), StoreError>;

    async fn get_by_id(&self, booking_id: Uuid) -> Result<Booking, StoreError>;

    /// PENDING брони с истёкшим `expires_at`, не больше `limit` за вызов
    async fn get_expired(&self, limit: i64) -> Result<Vec<Uuid>, StoreError>;

    /// PENDING -> EXPIRED и освобождение всех мест брони в одной транзакции.
    /// `None`, если бронь уже не PENDING.
    async fn cancel(&self, booking_id: Uuid) -> Result<Option<CancelOutcome>, StoreError>;

    /// Освобождает места, заблокированные дольше `older_than` бронью,
    /// которой нет среди живых (PENDING/CONFIRMED)
    async fn release_orphaned_locks(
        &self,
        older_than: Duration,
        limit: i64,
    ) -> Result<Vec<ReleasedSeat>, StoreError>;
}
