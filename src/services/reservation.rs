//! reservation.rs
//!
//! Оркестратор резервирования нескольких мест.
//!
//! 1.  Места захватываются строго по одному и в порядке запроса, поэтому
//!     при ошибке откатывать нужно ровно уже захваченный префикс.
//! 2.  Единственная синхронизация это условная запись `SeatStore::lock`.
//!     Никаких внутрипроцессных блокировок здесь нет.
//! 3.  Откат выполняется по возможности: сбои логируются и считаются,
//!     а оставшиеся блокировки подбирает фоновая очистка брошенных мест.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::stream::{self, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::cache::SeatCache;
use crate::config::ReservationConfig;
use crate::error::{ErrorClass, ReservationError, StoreError};
use crate::models::{Booking, BookingItem, BookingStatus, BookingSummary};
use crate::stores::{BookingStore, SeatStore};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReserveRequest {
    pub user_id: String,
    pub event_id: String,
    #[validate(length(min = 1, message = "no seats selected"))]
    pub seat_ids: Vec<String>,
}

#[derive(Debug, Default)]
struct ReservationStats {
    succeeded: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
    seats_released: AtomicU64,
    release_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub succeeded: u64,
    pub rejected: u64,
    pub failed: u64,
    pub seats_released: u64,
    pub release_failures: u64,
}

/// Уже захваченный префикс запроса
#[derive(Debug, Default)]
struct Held {
    seat_ids: Vec<Uuid>,
    items: Vec<BookingItem>,
    total: f64,
}

impl Held {
    fn push(&mut self, booking_id: Uuid, seat_id: Uuid, price: f64) {
        self.seat_ids.push(seat_id);
        self.items.push(BookingItem::new(booking_id, seat_id, price));
        self.total += price;
    }
}

pub struct ReservationService {
    seats: Arc<dyn SeatStore>,
    bookings: Arc<dyn BookingStore>,
    cache: Arc<dyn SeatCache>,
    hold_duration: Duration,
    seat_price: f64,
    stats: ReservationStats,
}

impl ReservationService {
    pub fn new(
        seats: Arc<dyn SeatStore>,
        bookings: Arc<dyn BookingStore>,
        cache: Arc<dyn SeatCache>,
        config: &ReservationConfig,
    ) -> Self {
        Self {
            seats,
            bookings,
            cache,
            hold_duration: config.hold_duration(),
            seat_price: config.seat_price,
            stats: ReservationStats::default(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            succeeded: self.stats.succeeded.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            seats_released: self.stats.seats_released.load(Ordering::Relaxed),
            release_failures: self.stats.release_failures.load(Ordering::Relaxed),
        }
    }

    /// Резервирует места запроса целиком или не резервирует ни одного.
    pub async fn reserve(
        &self,
        request: ReserveRequest,
    ) -> Result<BookingSummary, ReservationError> {
        let result = self.try_reserve(&request).await;

        match &result {
            Ok(summary) => {
                self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                info!(
                    booking_id = %summary.booking_id,
                    event_id = %request.event_id,
                    seats = request.seat_ids.len(),
                    total_amount = summary.total_amount,
                    "Reservation created"
                );
            }
            Err(e) if e.class() == ErrorClass::Internal => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(event_id = %request.event_id, error = %e, "Reservation failed");
            }
            Err(e) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(event_id = %request.event_id, error = %e, "Reservation rejected");
            }
        }

        result
    }

    async fn try_reserve(
        &self,
        request: &ReserveRequest,
    ) -> Result<BookingSummary, ReservationError> {
        let (user_id, event_id, seat_ids) = parse_request(request)?;
        let booking_id = Uuid::new_v4();

        let held = match self.acquire_seats(booking_id, event_id, &seat_ids).await {
            Ok(held) => held,
            Err((held, err)) => {
                self.compensate(booking_id, &held.seat_ids).await;
                return Err(err);
            }
        };

        let Held {
            seat_ids: held_ids,
            items,
            total,
        } = held;

        let created_at = Utc::now();
        let booking = Booking {
            id: booking_id,
            user_id,
            event_id,
            total_amount: total,
            status: BookingStatus::Pending,
            created_at,
            expires_at: created_at + self.hold_duration,
            confirmed_at: None,
            items,
        };

        if let Err(e) = self.bookings.create(&booking).await {
            error!(%booking_id, error = %e, "failed to persist booking");
            self.compensate(booking_id, &held_ids).await;
            return Err(ReservationError::Internal(
                "failed to create booking".to_string(),
            ));
        }

        // Бронь уже создана: сбой кеша не должен её отменять
        if let Err(e) = self.cache.invalidate_seats(event_id).await {
            warn!(%event_id, error = %e, "failed to invalidate seats cache");
        }

        Ok(BookingSummary::from(&booking))
    }

    /// Свёртка по местам запроса: либо все места захвачены,
    /// либо захваченный префикс вместе с ошибкой, которая его прервала.
    async fn acquire_seats(
        &self,
        booking_id: Uuid,
        event_id: Uuid,
        seat_ids: &[Uuid],
    ) -> Result<Held, (Held, ReservationError)> {
        stream::iter(seat_ids.iter().copied().map(Ok::<Uuid, (Held, ReservationError)>))
            .try_fold(Held::default(), move |mut held, seat_id| async move {
                match self.acquire_seat(booking_id, event_id, seat_id).await {
                    Ok(()) => {
                        held.push(booking_id, seat_id, self.seat_price);
                        Ok(held)
                    }
                    Err(e) => Err((held, e)),
                }
            })
            .await
    }

    async fn acquire_seat(
        &self,
        booking_id: Uuid,
        event_id: Uuid,
        seat_id: Uuid,
    ) -> Result<(), ReservationError> {
        let seat = self.seats.get_by_id(seat_id).await.map_err(|e| match e {
            StoreError::NotFound { .. } => ReservationError::SeatNotFound(seat_id),
            other => internal(other),
        })?;

        if !seat.is_available() {
            return Err(ReservationError::SeatUnavailable(seat_id));
        }
        if seat.event_id != event_id {
            return Err(ReservationError::WrongEvent { seat_id, event_id });
        }

        self.seats
            .lock(seat.id, booking_id, seat.version)
            .await
            .map_err(|e| match e {
                StoreError::Conflict { .. } => ReservationError::Conflict(seat_id),
                StoreError::NotFound { .. } => ReservationError::SeatNotFound(seat_id),
                other => internal(other),
            })
    }

    /// Освобождает захваченные места. Ошибки не поднимаются наверх:
    /// резервирование уже провалилось по своей причине.
    async fn compensate(&self, booking_id: Uuid, seat_ids: &[Uuid]) {
        let mut released = 0u64;
        let mut failed = 0u64;

        for &seat_id in seat_ids {
            match self.seats.unlock(seat_id).await {
                Ok(()) => {
                    info!(%booking_id, %seat_id, "Released seat of failed reservation");
                    released += 1;
                }
                Err(e) => {
                    error!(
                        %booking_id,
                        %seat_id,
                        error = %e,
                        "Failed to release seat, lock is left for the orphan sweep"
                    );
                    failed += 1;
                }
            }
        }

        self.stats
            .seats_released
            .fetch_add(released, Ordering::Relaxed);
        self.stats
            .release_failures
            .fetch_add(failed, Ordering::Relaxed);

        if failed > 0 {
            warn!(%booking_id, released, failed, "Rollback left orphaned seat locks");
        }
    }
}

fn internal(err: StoreError) -> ReservationError {
    ReservationError::Internal(err.to_string())
}

fn parse_request(request: &ReserveRequest) -> Result<(Uuid, Uuid, Vec<Uuid>), ReservationError> {
    let user_id = Uuid::parse_str(&request.user_id)
        .map_err(|_| ReservationError::InvalidInput("user id".to_string()))?;
    let event_id = Uuid::parse_str(&request.event_id)
        .map_err(|_| ReservationError::InvalidInput("event id".to_string()))?;

    if request.seat_ids.is_empty() {
        return Err(ReservationError::InvalidInput(
            "seat selection: no seats selected".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(request.seat_ids.len());
    let mut seat_ids = Vec::with_capacity(request.seat_ids.len());
    for raw in &request.seat_ids {
        let seat_id = Uuid::parse_str(raw)
            .map_err(|_| ReservationError::InvalidInput(format!("seat id: {raw}")))?;
        if !seen.insert(seat_id) {
            return Err(ReservationError::InvalidInput(format!(
                "seat selection: seat {seat_id} requested twice"
            )));
        }
        seat_ids.push(seat_id);
    }

    Ok((user_id, event_id, seat_ids))
}
