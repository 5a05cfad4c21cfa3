use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::Seat;
use crate::stores::SeatStore;

const SEAT_COLUMNS: &str = "id, event_id, tier_id, section, row_number, seat_number, \
                            status, version, locked_by_booking_id, locked_at";

#[derive(Clone)]
pub struct PgSeatStore {
    pool: PgPool,
}

impl PgSeatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SeatStore for PgSeatStore {
    async fn get_by_id(&self, seat_id: Uuid) -> Result<Seat, StoreError> {
        sqlx::query_as::<_, Seat>(&format!("SELECT {SEAT_COLUMNS} FROM seats WHERE id = $1"))
            .bind(seat_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::seat_not_found(seat_id))
    }

    async fn get_available_by_event(&self, event_id: Uuid) -> Result<Vec<Seat>, StoreError> {
        let seats = sqlx::query_as::<_, Seat>(&format!(
            "SELECT {SEAT_COLUMNS} FROM seats
             WHERE event_id = $1 AND status = 'AVAILABLE'
             ORDER BY section, row_number, seat_number"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(seats)
    }

    async fn lock(
        &self,
        seat_id: Uuid,
        booking_id: Uuid,
        expected_version: i32,
    ) -> Result<(), StoreError> {
        // Один условный UPDATE: проверка и запись не разделяются
        let result = sqlx::query(
            "UPDATE seats
             SET status = 'LOCKED',
                 locked_by_booking_id = $1,
                 locked_at = NOW(),
                 version = version + 1
             WHERE id = $2 AND version = $3 AND status = 'AVAILABLE'",
        )
        .bind(booking_id)
        .bind(seat_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!(%seat_id, expected_version, "seat lock lost the race");
            return Err(StoreError::Conflict { seat_id });
        }

        Ok(())
    }

    async fn unlock(&self, seat_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE seats
             SET status = 'AVAILABLE',
                 locked_by_booking_id = NULL,
                 locked_at = NULL,
                 version = version + 1
             WHERE id = $1 AND status = 'LOCKED'",
        )
        .bind(seat_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Ничего не обновили: место уже свободно или его нет
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM seats WHERE id = $1)")
            .bind(seat_id)
            .fetch_one(&self.pool)
            .await?;

        if exists {
            Ok(())
        } else {
            Err(StoreError::seat_not_found(seat_id))
        }
    }
}
