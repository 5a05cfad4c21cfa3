//! In-memory backend with the same per-operation atomicity as Postgres.
//!
//! Один мьютекс держится только внутри вызова, как блокировка строк в БД.
//! Оркестратор и очистка его не видят. Есть хуки для внедрения сбоев,
//! чтобы проверять компенсацию и изоляцию ошибок.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Booking, BookingStatus, CancelOutcome, ReleasedSeat, Seat, SeatStatus,
};
use crate::stores::{BookingStore, SeatStore};

#[derive(Default)]
struct MemoryState {
    seats: HashMap<Uuid, Seat>,
    bookings: HashMap<Uuid, Booking>,
    failing_creates: usize,
    failing_unlocks: HashSet<Uuid>,
    failing_cancels: HashSet<Uuid>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_seat(&self, seat: Seat) {
        self.state().seats.insert(seat.id, seat);
    }

    pub fn insert_booking(&self, booking: Booking) {
        self.state().bookings.insert(booking.id, booking);
    }

    pub fn seat(&self, seat_id: Uuid) -> Option<Seat> {
        self.state().seats.get(&seat_id).cloned()
    }

    pub fn booking(&self, booking_id: Uuid) -> Option<Booking> {
        self.state().bookings.get(&booking_id).cloned()
    }

    pub fn booking_count(&self) -> usize {
        self.state().bookings.len()
    }

    /// Следующие `count` вызовов `create` вернут ошибку
    pub fn fail_creates(&self, count: usize) {
        self.state().failing_creates = count;
    }

    pub fn fail_unlock(&self, seat_id: Uuid) {
        self.state().failing_unlocks.insert(seat_id);
    }

    pub fn fail_cancel(&self, booking_id: Uuid) {
        self.state().failing_cancels.insert(booking_id);
    }

    pub fn clear_faults(&self) {
        let mut state = self.state();
        state.failing_creates = 0;
        state.failing_unlocks.clear();
        state.failing_cancels.clear();
    }
}

fn release(seat: &mut Seat) {
    seat.status = SeatStatus::Available;
    seat.locked_by_booking_id = None;
    seat.locked_at = None;
    seat.version += 1;
}

#[async_trait]
impl SeatStore for MemoryStore {
    async fn get_by_id(&self, seat_id: Uuid) -> Result<Seat, StoreError> {
        self.seat(seat_id)
            .ok_or_else(|| StoreError::seat_not_found(seat_id))
    }

    async fn get_available_by_event(&self, event_id: Uuid) -> Result<Vec<Seat>, StoreError> {
        let mut seats: Vec<Seat> = self
            .state()
            .seats
            .values()
            .filter(|seat| seat.event_id == event_id && seat.is_available())
            .cloned()
            .collect();

        seats.sort_by(|a, b| {
            (&a.section, &a.row_number, &a.seat_number)
                .cmp(&(&b.section, &b.row_number, &b.seat_number))
        });
        Ok(seats)
    }

    async fn lock(
        &self,
        seat_id: Uuid,
        booking_id: Uuid,
        expected_version: i32,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        match state.seats.get_mut(&seat_id) {
            Some(seat) if seat.is_available() && seat.version == expected_version => {
                seat.status = SeatStatus::Locked;
                seat.locked_by_booking_id = Some(booking_id);
                seat.locked_at = Some(Utc::now());
                seat.version += 1;
                Ok(())
            }
            _ => Err(StoreError::Conflict { seat_id }),
        }
    }

    async fn unlock(&self, seat_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.failing_unlocks.contains(&seat_id) {
            return Err(StoreError::Backend(format!("injected unlock failure for seat {seat_id}")));
        }

        let seat = state
            .seats
            .get_mut(&seat_id)
            .ok_or_else(|| StoreError::seat_not_found(seat_id))?;

        if seat.status == SeatStatus::Locked {
            release(seat);
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn create(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut state = self.state();

        if state.failing_creates > 0 {
            state.failing_creates -= 1;
            return Err(StoreError::Backend("injected create failure".to_string()));
        }
        if state.bookings.contains_key(&booking.id) {
            return Err(StoreError::Backend(format!(
                "duplicate key value violates unique constraint: booking {}",
                booking.id
            )));
        }
        // Аналог внешнего ключа booking_items.seat_id: проверяем всё до записи
        if let Some(item) = booking
            .items
            .iter()
            .find(|item| !state.seats.contains_key(&item.seat_id))
        {
            return Err(StoreError::Backend(format!(
                "foreign key violation: seat {} does not exist",
                item.seat_id
            )));
        }

        state.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| StoreError::booking_not_found(booking_id))?;

        booking.status = status;
        if status == BookingStatus::Confirmed {
            booking.confirmed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_by_id(&self, booking_id: Uuid) -> Result<Booking, StoreError> {
        self.booking(booking_id)
            .ok_or_else(|| StoreError::booking_not_found(booking_id))
    }

    async fn get_expired(&self, limit: i64) -> Result<Vec<Uuid>, StoreError> {
        let now = Utc::now();
        let state = self.state();

        let mut expired: Vec<&Booking> = state
            .bookings
            .values()
            .filter(|booking| booking.is_expired_at(now))
            .collect();
        expired.sort_by_key(|booking| booking.expires_at);

        Ok(expired
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|booking| booking.id)
            .collect())
    }

    async fn cancel(&self, booking_id: Uuid) -> Result<Option<CancelOutcome>, StoreError> {
        let mut state = self.state();
        if state.failing_cancels.contains(&booking_id) {
            return Err(StoreError::Backend(format!(
                "injected cancel failure for booking {booking_id}"
            )));
        }

        let event_id = match state.bookings.get_mut(&booking_id) {
            Some(booking) if booking.status == BookingStatus::Pending => {
                booking.status = BookingStatus::Expired;
                booking.event_id
            }
            _ => return Ok(None),
        };

        let mut released_seats = Vec::new();
        for seat in state.seats.values_mut() {
            if seat.is_locked_by(booking_id) {
                release(seat);
                released_seats.push(seat.id);
            }
        }

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
        let cutoff = Utc::now() - older_than;
        let mut state = self.state();
        let MemoryState {
            seats, bookings, ..
        } = &mut *state;

        let live = |booking_id: Option<Uuid>| {
            booking_id
                .and_then(|id| bookings.get(&id))
                .is_some_and(|booking| {
                    matches!(booking.status, BookingStatus::Pending | BookingStatus::Confirmed)
                })
        };

        let mut orphaned: Vec<&mut Seat> = seats
            .values_mut()
            .filter(|seat| {
                seat.status == SeatStatus::Locked
                    && seat.locked_at.is_some_and(|at| at < cutoff)
                    && !live(seat.locked_by_booking_id)
            })
            .collect();
        orphaned.sort_by_key(|seat| seat.locked_at);

        Ok(orphaned
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|seat| {
                release(seat);
                ReleasedSeat {
                    seat_id: seat.id,
                    event_id: seat.event_id,
                }
            })
            .collect())
    }
}
