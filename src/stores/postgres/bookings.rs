use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Booking, BookingItem, BookingStatus, CancelOutcome, ReleasedSeat};
use crate::stores::BookingStore;

#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn create(&self, booking: &Booking) -> Result<(), StoreError> {
        // Без commit транзакция откатывается при drop, частичной брони не будет
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO bookings (id, user_id, event_id, total_amount, status, created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.event_id)
        .bind(booking.total_amount)
        .bind(booking.status)
        .bind(booking.created_at)
        .bind(booking.expires_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in booking.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO booking_items (id, booking_id, seat_id, price_at_booking, position)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(item.id)
            .bind(item.booking_id)
            .bind(item.seat_id)
            .bind(item.price_at_booking)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        let confirmed_at = (status == BookingStatus::Confirmed).then(Utc::now);

        let result = sqlx::query(
            "UPDATE bookings
             SET status = $1, confirmed_at = COALESCE($2, confirmed_at)
             WHERE id = $3",
        )
        .bind(status)
        .bind(confirmed_at)
        .bind(booking_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::booking_not_found(booking_id));
        }
        Ok(())
    }

    async fn get_by_id(&self, booking_id: Uuid) -> Result<Booking, StoreError> {
        let mut booking = sqlx::query_as::<_, Booking>(
            "SELECT id, user_id, event_id, total_amount, status, created_at, expires_at, confirmed_at
             FROM bookings
             WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::booking_not_found(booking_id))?;

        booking.items = sqlx::query_as::<_, BookingItem>(
            "SELECT id, booking_id, seat_id, price_at_booking
             FROM booking_items
             WHERE booking_id = $1
             ORDER BY position",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(booking)
    }

    async fn get_expired(&self, limit: i64) -> Result<Vec<Uuid>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM bookings
             WHERE status = 'PENDING' AND expires_at < NOW()
             ORDER BY expires_at
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn cancel(&self, booking_id: Uuid) -> Result<Option<CancelOutcome>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let event_id: Option<Uuid> = sqlx::query_scalar(
            "UPDATE bookings SET status = 'EXPIRED'
             WHERE id = $1 AND status = 'PENDING'
             RETURNING event_id",
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(event_id) = event_id else {
            debug!(%booking_id, "booking is no longer pending, nothing to cancel");
            tx.rollback().await?;
            return Ok(None);
        };

        let released_seats: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE seats
             SET status = 'AVAILABLE',
                 locked_by_booking_id = NULL,
                 locked_at = NULL,
                 version = version + 1
             WHERE locked_by_booking_id = $1 AND status = 'LOCKED'
             RETURNING id",
        )
        .bind(booking_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(CancelOutcome {
            booking_id,
            event_id,
            released_seats,
        }))
    }

    async fn release_orphaned_locks(
        &self,
        older_than: Duration,
        limit: i64,
    ) -> Result<Vec<ReleasedSeat>, StoreError> {
        let older_than_secs = older_than.num_milliseconds() as f64 / 1000.0;

        let released = sqlx::query_as::<_, ReleasedSeat>(
            "UPDATE seats
             SET status = 'AVAILABLE',
                 locked_by_booking_id = NULL,
                 locked_at = NULL,
                 version = version + 1
             WHERE status = 'LOCKED' AND id IN (
                 SELECT s.id FROM seats s
                 WHERE s.status = 'LOCKED'
                   AND s.locked_at < NOW() - make_interval(secs => $1)
                   AND NOT EXISTS (
                       SELECT 1 FROM bookings b
                       WHERE b.id = s.locked_by_booking_id
                         AND b.status IN ('PENDING', 'CONFIRMED')
                   )
                 ORDER BY s.locked_at
                 LIMIT $2
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING id AS seat_id, event_id",
        )
        .bind(older_than_secs)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(released)
    }
}
