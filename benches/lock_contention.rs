//! Reservation throughput against the in-memory store.
//!
//! Run with: `cargo bench`

#![allow(clippy::expect_used)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use uuid::Uuid;

use seat_reservation::cache::NoopCache;
use seat_reservation::config::ReservationConfig;
use seat_reservation::models::Seat;
use seat_reservation::services::{ReservationService, ReserveRequest};
use seat_reservation::stores::{MemoryStore, SeatStore};

struct Venue {
    store: Arc<MemoryStore>,
    service: Arc<ReservationService>,
    event_id: Uuid,
}

impl Venue {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(ReservationService::new(
            store.clone(),
            store.clone(),
            Arc::new(NoopCache),
            &ReservationConfig::default(),
        ));

        Self {
            store,
            service,
            event_id: Uuid::new_v4(),
        }
    }

    fn add_seats(&self, count: usize) -> Vec<Uuid> {
        let tier_id = Uuid::new_v4();
        (0..count)
            .map(|n| {
                let seat = Seat::available(self.event_id, tier_id, "A", "1", &n.to_string());
                let id = seat.id;
                self.store.insert_seat(seat);
                id
            })
            .collect()
    }

    fn request(&self, seat_ids: &[Uuid]) -> ReserveRequest {
        ReserveRequest {
            user_id: Uuid::new_v4().to_string(),
            event_id: self.event_id.to_string(),
            seat_ids: seat_ids.iter().map(Uuid::to_string).collect(),
        }
    }
}

fn benchmark_lock(c: &mut Criterion) {
    let mut group = c.benchmark_group("seat_lock");
    group.throughput(Throughput::Elements(1));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    group.bench_function("lock_unlock", |b| {
        let venue = Venue::new();
        let seat_id = venue.add_seats(1)[0];

        b.to_async(&runtime).iter(|| async {
            let version = venue
                .store
                .seat(seat_id)
                .expect("seat exists")
                .version;
            venue
                .store
                .lock(black_box(seat_id), Uuid::new_v4(), version)
                .await
                .expect("lock");
            venue.store.unlock(seat_id).await.expect("unlock");
        });
    });

    group.finish();
}

fn benchmark_reserve(c: &mut Criterion) {
    let mut group = c.benchmark_group("reserve");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    for seats in [1usize, 4, 8] {
        group.throughput(Throughput::Elements(seats as u64));

        // Последнее место занято: полный захват и откат префикса
        group.bench_with_input(BenchmarkId::new("rollback", seats), &seats, |b, &seats| {
            let venue = Venue::new();
            let mut ids = venue.add_seats(seats);
            let taken = venue.add_seats(1)[0];
            runtime
                .block_on(venue.service.reserve(venue.request(&[taken])))
                .expect("first reservation");
            ids.push(taken);

            b.to_async(&runtime).iter(|| async {
                let _ = venue.service.reserve(black_box(venue.request(&ids))).await;
            });
        });
    }

    group.finish();
}

fn benchmark_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");
    group.sample_size(20);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("Failed to build runtime");

    group.bench_function("16_requests_one_seat", |b| {
        b.to_async(&runtime).iter(|| async {
            let venue = Arc::new(Venue::new());
            let seat_id = venue.add_seats(1)[0];

            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let venue = venue.clone();
                    tokio::spawn(async move { venue.service.reserve(venue.request(&[seat_id])).await })
                })
                .collect();

            let winners = futures::future::join_all(handles)
                .await
                .into_iter()
                .filter(|result| matches!(result, Ok(Ok(_))))
                .count();
            assert_eq!(winners, 1);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_lock,
    benchmark_reserve,
    benchmark_contention
);
criterion_main!(benches);
