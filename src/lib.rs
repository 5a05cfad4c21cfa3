pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod stores;

use std::sync::Arc;

use cache::SeatCache;
use services::ReservationService;
use stores::{BookingStore, SeatStore};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub reservations: Arc<ReservationService>,
    pub seats: Arc<dyn SeatStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub cache: Arc<dyn SeatCache>,
    pub config: config::Config,
}

impl AppState {
    pub fn new(
        seats: Arc<dyn SeatStore>,
        bookings: Arc<dyn BookingStore>,
        cache: Arc<dyn SeatCache>,
        config: config::Config,
    ) -> Arc<Self> {
        let reservations = Arc::new(ReservationService::new(
            seats.clone(),
            bookings.clone(),
            cache.clone(),
            &config.reservation,
        ));

        Arc::new(Self {
            reservations,
            seats,
            bookings,
            cache,
            config,
        })
    }
}
