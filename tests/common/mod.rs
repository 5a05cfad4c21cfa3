#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use seat_reservation::cache::SeatCache;
use seat_reservation::config::ReservationConfig;
use seat_reservation::error::CacheError;
use seat_reservation::models::{Booking, BookingItem, BookingStatus, Seat, SeatStatus};
use seat_reservation::services::{
    ExpirySweeper, ReservationService, ReserveRequest, SweeperSettings,
};
use seat_reservation::stores::MemoryStore;

pub const UNIT_PRICE: f64 = 100000.00;

/// Кеш, который запоминает инвалидации
#[derive(Default)]
pub struct RecordingCache {
    invalidated: Mutex<Vec<Uuid>>,
    failing: bool,
}

impl RecordingCache {
    pub fn failing() -> Self {
        Self {
            invalidated: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn invalidated(&self) -> Vec<Uuid> {
        self.invalidated.lock().unwrap().clone()
    }
}

#[async_trait]
impl SeatCache for RecordingCache {
    async fn invalidate_seats(&self, event_id: Uuid) -> Result<(), CacheError> {
        self.invalidated.lock().unwrap().push(event_id);
        if self.failing {
            let err = redis::RedisError::from((redis::ErrorKind::IoError, "connection refused"));
            return Err(err.into());
        }
        Ok(())
    }

    async fn get_seats(&self, _event_id: Uuid) -> Result<Option<Vec<Seat>>, CacheError> {
        Ok(None)
    }

    async fn save_seats(&self, _event_id: Uuid, _seats: &[Seat]) -> Result<(), CacheError> {
        Ok(())
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub cache: Arc<RecordingCache>,
    pub service: Arc<ReservationService>,
    pub event_id: Uuid,
    pub tier_id: Uuid,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_cache(RecordingCache::default())
    }

    pub fn with_cache(cache: RecordingCache) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(cache);
        let service = Arc::new(ReservationService::new(
            store.clone(),
            store.clone(),
            cache.clone(),
            &ReservationConfig::default(),
        ));

        Self {
            store,
            cache,
            service,
            event_id: Uuid::new_v4(),
            tier_id: Uuid::new_v4(),
        }
    }

    /// Свободное место события с версией 1
    pub fn seat(&self, label: &str) -> Seat {
        let seat = Seat::available(self.event_id, self.tier_id, "A", "1", label);
        self.store.insert_seat(seat.clone());
        seat
    }

    pub fn seat_with(&self, label: &str, status: SeatStatus, version: i32) -> Seat {
        let mut seat = Seat::available(self.event_id, self.tier_id, "A", "1", label);
        seat.status = status;
        seat.version = version;
        if status == SeatStatus::Locked {
            seat.locked_by_booking_id = Some(Uuid::new_v4());
            seat.locked_at = Some(Utc::now());
        }
        self.store.insert_seat(seat.clone());
        seat
    }

    /// Место, заблокированное бронью `booking_id` в момент `locked_at`
    pub fn locked_seat(
        &self,
        label: &str,
        booking_id: Uuid,
        version: i32,
        locked_at: DateTime<Utc>,
    ) -> Seat {
        let mut seat = Seat::available(self.event_id, self.tier_id, "B", "3", label);
        seat.status = SeatStatus::Locked;
        seat.version = version;
        seat.locked_by_booking_id = Some(booking_id);
        seat.locked_at = Some(locked_at);
        self.store.insert_seat(seat.clone());
        seat
    }

    /// PENDING бронь с `expires_at = now + expires_in` и заблокированными ею местами
    pub fn pending_booking(&self, expires_in: Duration, seats: &[&str]) -> (Booking, Vec<Seat>) {
        let booking_id = Uuid::new_v4();
        let expires_at = Utc::now() + expires_in;
        let created_at = expires_at - Duration::minutes(10);

        let seats: Vec<Seat> = seats
            .iter()
            .map(|label| self.locked_seat(label, booking_id, 2, created_at))
            .collect();

        let booking = Booking {
            id: booking_id,
            user_id: Uuid::new_v4(),
            event_id: self.event_id,
            total_amount: UNIT_PRICE * seats.len() as f64,
            status: BookingStatus::Pending,
            created_at,
            expires_at,
            confirmed_at: None,
            items: seats
                .iter()
                .map(|seat| BookingItem::new(booking_id, seat.id, UNIT_PRICE))
                .collect(),
        };
        self.store.insert_booking(booking.clone());

        (booking, seats)
    }

    pub fn request(&self, seats: &[Uuid]) -> ReserveRequest {
        ReserveRequest {
            user_id: Uuid::new_v4().to_string(),
            event_id: self.event_id.to_string(),
            seat_ids: seats.iter().map(Uuid::to_string).collect(),
        }
    }

    pub fn sweeper(&self, settings: SweeperSettings) -> (ExpirySweeper, tokio::sync::watch::Sender<bool>) {
        ExpirySweeper::new(self.store.clone(), self.cache.clone(), settings)
    }

    pub fn stored(&self, seat: &Seat) -> Seat {
        self.store.seat(seat.id).expect("seat exists")
    }
}

pub fn sweep_settings(batch_size: i64, orphan_lock_age: Duration) -> SweeperSettings {
    SweeperSettings {
        interval: std::time::Duration::from_secs(3600),
        batch_size,
        orphan_lock_age,
    }
}
