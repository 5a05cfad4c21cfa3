use std::sync::Arc;
use std::time::Duration;

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::stores::{PgBookingStore, PgSeatStore};

/// Схема мест и броней. Тот же набор миграций используют `#[sqlx::test]`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./src/migrations");

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .max_lifetime(Duration::from_secs(300))
            .connect(&config.url)
            .await?;

        info!(pool_size = config.pool_size, "Database pool ready");
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        info!("Running database migrations...");
        MIGRATOR.run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }

    /// Хранилища мест и броней поверх общего пула
    pub fn stores(&self) -> (Arc<PgSeatStore>, Arc<PgBookingStore>) {
        (
            Arc::new(PgSeatStore::new(self.pool.clone())),
            Arc::new(PgBookingStore::new(self.pool.clone())),
        )
    }
}
