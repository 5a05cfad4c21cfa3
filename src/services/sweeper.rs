use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::SeatCache;
use crate::config::ReservationConfig;
use crate::stores::BookingStore;

#[derive(Debug, Clone)]
pub struct SweeperSettings {
    pub interval: Duration,
    pub batch_size: i64,
    pub orphan_lock_age: chrono::Duration,
}

impl From<&ReservationConfig> for SweeperSettings {
    fn from(config: &ReservationConfig) -> Self {
        Self {
            interval: config.sweep_interval(),
            batch_size: config.sweep_batch_size,
            orphan_lock_age: config.orphan_lock_age(),
        }
    }
}

/// Итог одного цикла очистки
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub skipped: usize,
    pub failed: usize,
    pub seats_released: usize,
    pub orphans_released: usize,
    pub interrupted: bool,
}

impl SweepReport {
    pub fn is_idle(&self) -> bool {
        self.expired == 0 && self.skipped == 0 && self.failed == 0 && self.orphans_released == 0
    }
}

/// Фоновая задача, возвращающая места просроченных броней.
///
/// Циклы выполняются последовательно в одной задаче, поэтому два цикла
/// никогда не отменяют одну бронь одновременно. Неудачная отмена
/// повторится в следующем цикле: бронь остаётся PENDING.
pub struct ExpirySweeper {
    bookings: Arc<dyn BookingStore>,
    cache: Arc<dyn SeatCache>,
    settings: SweeperSettings,
    shutdown: watch::Receiver<bool>,
}

impl ExpirySweeper {
    /// Возвращает очистку и отправитель сигнала остановки.
    /// `send(true)` останавливает `run` после текущей отмены.
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        cache: Arc<dyn SeatCache>,
        settings: SweeperSettings,
    ) -> (Self, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let sweeper = Self {
            bookings,
            cache,
            settings,
            shutdown: shutdown_rx,
        };

        (sweeper, shutdown_tx)
    }

    fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub async fn run(mut self) {
        info!(
            interval = ?self.settings.interval,
            batch_size = self.settings.batch_size,
            "🧹 Expiry sweeper started"
        );

        let mut ticker = interval(self.settings.interval);
        // Пропущенные тики не копятся: следующий цикл только после текущего
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Первый тик срабатывает сразу, первый цикл через один период
        ticker.tick().await;

        loop {
            if self.is_shutting_down() {
                break;
            }

            tokio::select! {
                changed = self.shutdown.changed() => {
                    // Err: отправитель удалён, тоже считаем остановкой
                    if changed.is_err() || self.is_shutting_down() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let report = self.sweep_once().await;
                    if !report.is_idle() {
                        info!(?report, "🧹 Sweep cycle finished");
                    }
                }
            }
        }

        info!("🧹 Expiry sweeper stopped");
    }

    /// Один цикл: просроченные брони, затем брошенные блокировки.
    pub async fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        self.expire_bookings(&mut report).await;

        if report.interrupted {
            return report;
        }

        self.release_orphaned_locks(&mut report).await;
        report
    }

    async fn expire_bookings(&self, report: &mut SweepReport) {
        let ids = match self.bookings.get_expired(self.settings.batch_size).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "Error fetching expired bookings");
                return;
            }
        };

        if ids.is_empty() {
            return;
        }

        info!("🎫 Found {} expired bookings. Cleaning up...", ids.len());

        for booking_id in ids {
            if self.is_shutting_down() {
                report.interrupted = true;
                warn!("Shutdown requested, leaving the rest of the batch for the next run");
                break;
            }

            match self.bookings.cancel(booking_id).await {
                Ok(Some(outcome)) => {
                    report.expired += 1;
                    report.seats_released += outcome.released_seats.len();
                    info!(
                        %booking_id,
                        seats = outcome.released_seats.len(),
                        "🎫 Booking expired and seats released"
                    );
                    self.invalidate(outcome.event_id).await;
                }
                Ok(None) => {
                    report.skipped += 1;
                    debug!(%booking_id, "Booking is no longer pending, skipped");
                }
                Err(e) => {
                    report.failed += 1;
                    error!(%booking_id, error = %e, "Failed to cancel booking");
                }
            }
        }
    }

    async fn release_orphaned_locks(&self, report: &mut SweepReport) {
        let released = match self
            .bookings
            .release_orphaned_locks(self.settings.orphan_lock_age, self.settings.batch_size)
            .await
        {
            Ok(released) => released,
            Err(e) => {
                error!(error = %e, "Failed to release orphaned seat locks");
                return;
            }
        };

        if released.is_empty() {
            return;
        }

        report.orphans_released = released.len();
        warn!("🔑 Released {} orphaned seat locks", released.len());

        let events: BTreeSet<Uuid> = released.iter().map(|seat| seat.event_id).collect();
        for event_id in events {
            self.invalidate(event_id).await;
        }
    }

    async fn invalidate(&self, event_id: Uuid) {
        if let Err(e) = self.cache.invalidate_seats(event_id).await {
            warn!(%event_id, error = %e, "failed to invalidate seats cache");
        }
    }
}
